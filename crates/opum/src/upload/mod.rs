//! Admin roster uploads.
//!
//! A super administrator posts a CSV roster; every row is checked against the
//! formatting rules and the employee directory, the batch is saved in one call,
//! and each new admin receives a password reset link.

pub mod domain;
pub mod parser;
pub mod repository;
pub mod response;
pub mod router;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{Employee, ParsedRows, Role, UploadRow, ROSTER_FIELD_COUNT};
pub use parser::{parse_rows, DEFAULT_DELIMITER};
pub use repository::{
    DirectoryError, DirectoryLookup, EmployeeStore, Notifier, NotifyError, StoreError,
};
pub use router::upload_router;
pub use service::{EmployeeUploadService, UploadError, UploadReceipt, ADMIN_UPLOAD_ROLE};
pub use validation::{
    AdminEmployeeValidator, CheckError, ErrorCategory, ValidationError, ValidationReason,
    Validator,
};
