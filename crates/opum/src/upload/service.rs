use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use super::domain::{Employee, Role, UploadRow};
use super::parser::{parse_rows, DEFAULT_DELIMITER};
use super::repository::{DirectoryError, EmployeeStore, Notifier, NotifyError, StoreError};
use super::validation::rules::check_integrity;
use super::validation::{CheckError, ErrorCategory, ValidationError, ValidationReason, Validator};
use crate::config::NotificationPolicy;

/// Role attached to every batch uploaded through the admin roster.
pub const ADMIN_UPLOAD_ROLE: Role = Role::Admin;

/// Service composing the row validator, employee store and reset notifier.
///
/// A batch is accepted whole or not at all: the first rejected row aborts the
/// upload and later rows are never validated.
pub struct EmployeeUploadService<V, S, N> {
    validator: Arc<V>,
    store: Arc<S>,
    notifier: Arc<N>,
    policy: NotificationPolicy,
}

impl<V, S, N> EmployeeUploadService<V, S, N>
where
    V: Validator<Employee> + 'static,
    S: EmployeeStore + 'static,
    N: Notifier + 'static,
{
    pub fn new(validator: Arc<V>, store: Arc<S>, notifier: Arc<N>) -> Self {
        Self::with_policy(validator, store, notifier, NotificationPolicy::default())
    }

    pub fn with_policy(
        validator: Arc<V>,
        store: Arc<S>,
        notifier: Arc<N>,
        policy: NotificationPolicy,
    ) -> Self {
        Self {
            validator,
            store,
            notifier,
            policy,
        }
    }

    pub fn policy(&self) -> NotificationPolicy {
        self.policy
    }

    /// Parse, validate, persist and notify for one uploaded roster.
    pub fn upload(&self, raw: &str) -> Result<UploadReceipt, UploadError> {
        let rows = parse_rows(raw, DEFAULT_DELIMITER);
        if rows.is_empty() {
            warn!("roster upload contained no employee rows");
            return Err(UploadError::EmptyInput);
        }

        let mut batch = Vec::with_capacity(rows.len());
        for row in &rows {
            batch.push(self.check_row(row)?);
        }

        let saved = self
            .store
            .save_or_update(&batch, ADMIN_UPLOAD_ROLE)
            .map_err(|err| match err {
                StoreError::Conflict { serial } => {
                    warn!(%serial, "roster upload hit an existing employee");
                    let employee = batch
                        .iter()
                        .find(|employee| employee.serial.trim() == serial)
                        .cloned();
                    UploadError::Duplicate { employee }
                }
                other => {
                    error!(error = %other, "roster upload could not be saved");
                    UploadError::Storage(other)
                }
            })?;

        let recipients: Vec<String> = batch
            .iter()
            .map(|employee| employee.intranet_id.trim().to_string())
            .collect();

        let notification_error = match self.notifier.send_password_reset_emails(&recipients) {
            Ok(()) => None,
            Err(err) => match self.policy {
                NotificationPolicy::Strict => {
                    error!(error = %err, "reset emails failed after roster was saved");
                    return Err(UploadError::Notification(err));
                }
                NotificationPolicy::BestEffort => {
                    warn!(error = %err, "reset emails failed; upload still accepted");
                    Some(err.to_string())
                }
            },
        };

        info!(
            saved,
            recipients = recipients.len(),
            role = ADMIN_UPLOAD_ROLE.label(),
            "roster uploaded"
        );

        Ok(UploadReceipt {
            saved,
            role: ADMIN_UPLOAD_ROLE,
            recipients,
            notification_error,
        })
    }

    fn check_row(&self, row: &UploadRow) -> Result<Employee, UploadError> {
        let rejected = |error: ValidationError| {
            warn!(line = row.line, reason = %error.reason, "roster row rejected");
            UploadError::InvalidRow {
                line: row.line,
                error,
            }
        };

        let employee = check_integrity(row).map_err(rejected)?;
        match self.validator.validate(&employee) {
            Ok(()) => Ok(employee),
            Err(CheckError::Invalid(error)) => Err(rejected(error)),
            Err(CheckError::Directory(err)) => {
                error!(line = row.line, error = %err, "directory lookup failed");
                Err(UploadError::Directory(err))
            }
        }
    }
}

/// Result of an accepted roster upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReceipt {
    pub saved: usize,
    pub role: Role,
    pub recipients: Vec<String>,
    /// Delivery failure swallowed under [`NotificationPolicy::BestEffort`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_error: Option<String>,
}

/// Error raised by the upload service.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("upload contains no employee rows")]
    EmptyInput,
    #[error("line {line}: {error}")]
    InvalidRow { line: usize, error: ValidationError },
    #[error("{}", ValidationReason::DuplicateEntry)]
    Duplicate { employee: Option<Employee> },
    #[error("directory lookup failed: {0}")]
    Directory(#[source] DirectoryError),
    #[error("could not save employees: {0}")]
    Storage(#[source] StoreError),
    #[error("employees saved but reset emails failed: {0}")]
    Notification(#[source] NotifyError),
}

impl UploadError {
    /// Taxonomy bucket, absent for infrastructure failures outside the store.
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            UploadError::EmptyInput => Some(ErrorCategory::EmptyInput),
            UploadError::InvalidRow { error, .. } => Some(error.category()),
            UploadError::Duplicate { .. } => Some(ErrorCategory::DuplicateEntry),
            UploadError::Storage(_) => Some(ErrorCategory::StorageError),
            UploadError::Directory(_) | UploadError::Notification(_) => None,
        }
    }
}
