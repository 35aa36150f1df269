pub mod admin_fee;
pub mod audit;
pub mod client;
pub mod invoice;
pub mod recurrence_day;
pub mod requisition;
pub mod timesheet;
pub mod user;
pub mod workday;

// Re-export all repositories for easy importing
pub use admin_fee::AdminFeeRepository;
pub use audit::AuditRepository;
pub use client::ClientRepository;
pub use invoice::InvoiceRepository;
pub use recurrence_day::{NewRecurrenceDay, RecurrenceDayRepository};
pub use requisition::{RequisitionAgingSnapshot, RequisitionRepository};
pub use timesheet::TimesheetRepository;
pub use user::UserRepository;
pub use workday::WorkdayRepository;
