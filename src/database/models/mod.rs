pub mod admin_fee;
pub mod audit;
pub mod client;
pub mod invoice;
pub(crate) mod macros;
pub mod recurrence_day;
pub mod requisition;
pub mod timesheet;
pub mod user;
pub mod workday;

// Re-export all models for easy importing
pub use admin_fee::*;
pub use audit::*;
pub use client::*;
pub use invoice::*;
pub use recurrence_day::*;
pub use requisition::*;
pub use timesheet::*;
pub use user::*;
pub use workday::*;
