//! Row validation for roster uploads.
//!
//! Pure format checks live in [`rules`]; [`AdminEmployeeValidator`] chains them
//! with the directory existence checks in a fixed order and stops at the first
//! failure.

mod admin;
pub mod rules;

use std::fmt;

use serde::Serialize;

use super::domain::Employee;
use super::repository::DirectoryError;

pub use admin::AdminEmployeeValidator;

/// Capability shared by entity validators.
pub trait Validator<T>: Send + Sync {
    fn validate(&self, entity: &T) -> Result<(), CheckError>;
}

/// Fixed reasons a roster row can be rejected for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationReason {
    MalformedRow,
    EmptyField,
    InvalidSerial,
    UnknownSerial,
    InvalidName,
    InvalidEmail,
    UnknownEmail,
    InvalidDate,
    InvalidDateRange,
    DuplicateEntry,
}

impl ValidationReason {
    pub const fn message(self) -> &'static str {
        match self {
            Self::MalformedRow => "row must contain exactly 5 fields",
            Self::EmptyField => "CSV row contains an empty field",
            Self::InvalidSerial => "invalid employee serial format",
            Self::UnknownSerial => "employee serial does not exist in the directory",
            Self::InvalidName => "invalid employee name format",
            Self::InvalidEmail => "invalid intranet email address format",
            Self::UnknownEmail => "intranet email does not exist in the directory",
            Self::InvalidDate => "invalid date format",
            Self::InvalidDateRange => "roll-in date must not be later than roll-off date",
            Self::DuplicateEntry => "duplicate entry",
        }
    }

    pub const fn category(self) -> ErrorCategory {
        match self {
            Self::MalformedRow | Self::EmptyField => ErrorCategory::MalformedRow,
            Self::InvalidSerial | Self::InvalidName | Self::InvalidEmail => {
                ErrorCategory::PatternMismatch
            }
            Self::UnknownSerial | Self::UnknownEmail => ErrorCategory::UnknownReference,
            Self::InvalidDate | Self::InvalidDateRange => ErrorCategory::DateError,
            Self::DuplicateEntry => ErrorCategory::DuplicateEntry,
        }
    }
}

impl fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Coarse grouping of upload failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    MalformedRow,
    PatternMismatch,
    UnknownReference,
    DateError,
    DuplicateEntry,
    StorageError,
    EmptyInput,
}

/// A rejected row: the employee snapshot (absent when the row could not be
/// read as an employee) and why it was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct ValidationError {
    pub employee: Option<Employee>,
    pub reason: ValidationReason,
}

impl ValidationError {
    pub fn new(employee: &Employee, reason: ValidationReason) -> Self {
        Self {
            employee: Some(employee.clone()),
            reason,
        }
    }

    pub fn malformed() -> Self {
        Self {
            employee: None,
            reason: ValidationReason::MalformedRow,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.reason.category()
    }
}

/// Outcome of a failed validator run.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}
