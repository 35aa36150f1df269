pub mod admin;
pub mod auth;
pub mod invoices;
pub mod jobs;
pub mod recurrence_days;
pub mod requisitions;
pub mod shared;
pub mod timesheets;
pub mod workdays;
