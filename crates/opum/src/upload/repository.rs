use super::domain::{Employee, Role};

/// Authoritative employee directory consulted during validation.
pub trait DirectoryLookup: Send + Sync {
    fn serial_exists(&self, serial: &str) -> Result<bool, DirectoryError>;
    fn email_exists(&self, serial: &str, email: &str) -> Result<bool, DirectoryError>;
}

/// Directory transport failure. Not a verdict on the employee.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Storage abstraction for validated employees.
///
/// `save_or_update` must persist the whole batch or nothing.
pub trait EmployeeStore: Send + Sync {
    fn save_or_update(&self, batch: &[Employee], role: Role) -> Result<usize, StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("employee {serial} already exists")]
    Conflict { serial: String },
    #[error("employee store unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook that mails password reset links to freshly uploaded users.
pub trait Notifier: Send + Sync {
    fn send_password_reset_emails(&self, recipients: &[String]) -> Result<(), NotifyError>;
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("could not notify {recipient}: {reason}")]
    Delivery { recipient: String, reason: String },
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
