use std::sync::Arc;

use tracing::debug;

use super::rules;
use super::{CheckError, ValidationError, ValidationReason, Validator};
use crate::config::DEFAULT_DATE_FORMAT;
use crate::upload::domain::Employee;
use crate::upload::repository::DirectoryLookup;

/// Validator for admin roster rows: format checks interleaved with directory
/// lookups, stopping at the first failure.
pub struct AdminEmployeeValidator<D> {
    directory: Arc<D>,
    date_format: String,
}

impl<D> AdminEmployeeValidator<D>
where
    D: DirectoryLookup,
{
    pub fn new(directory: Arc<D>) -> Self {
        Self::with_date_format(directory, DEFAULT_DATE_FORMAT)
    }

    pub fn with_date_format(directory: Arc<D>, date_format: impl Into<String>) -> Self {
        Self {
            directory,
            date_format: date_format.into(),
        }
    }

    pub fn date_format(&self) -> &str {
        &self.date_format
    }

    fn require_known_serial(&self, employee: &Employee) -> Result<(), CheckError> {
        if self.directory.serial_exists(employee.serial.trim())? {
            return Ok(());
        }
        debug!(serial = %employee.serial, "serial not found in directory");
        Err(ValidationError::new(employee, ValidationReason::UnknownSerial).into())
    }

    fn require_known_email(&self, employee: &Employee) -> Result<(), CheckError> {
        if self
            .directory
            .email_exists(employee.serial.trim(), employee.intranet_id.trim())?
        {
            return Ok(());
        }
        debug!(serial = %employee.serial, "intranet id not found in directory");
        Err(ValidationError::new(employee, ValidationReason::UnknownEmail).into())
    }
}

impl<D> Validator<Employee> for AdminEmployeeValidator<D>
where
    D: DirectoryLookup,
{
    fn validate(&self, employee: &Employee) -> Result<(), CheckError> {
        rules::require_non_empty(employee)?;
        rules::require_serial_format(employee)?;
        self.require_known_serial(employee)?;
        rules::require_name_format(employee)?;
        rules::require_email_format(employee)?;
        self.require_known_email(employee)?;
        rules::require_date_range(employee, &self.date_format)?;
        Ok(())
    }
}
