pub mod aging;
pub mod audit;
pub mod auth;
pub mod billing;
pub mod claims;
pub mod notification;
pub mod settlement;
pub mod time_conversion;
pub mod user_context;
pub mod validation;

pub use aging::AgingService;
pub use audit::AuditLogger;
pub use auth::AuthService;
pub use billing::{BillingProvider, HostedBillingClient};
pub use claims::ClaimService;
pub use notification::Notifier;
pub use settlement::SettlementService;
pub use user_context::{UserContext, UserContextService};
