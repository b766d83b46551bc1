pub mod user;
pub mod alert;
pub mod triggered_alert;

pub use user::{CurrentUser, User};
pub use alert::{Alert, AlertCondition, AlertPatch};
pub use triggered_alert::TriggeredAlert;
