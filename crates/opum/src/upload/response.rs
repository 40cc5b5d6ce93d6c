use super::domain::Employee;
use super::service::UploadError;
use super::validation::ValidationReason;

pub const UPLOAD_SUCCESS_MESSAGE: &str = "uploaded successfully";
pub const EMPTY_UPLOAD_MESSAGE: &str = "Invalid CSV: the file does not contain any employee rows.";
pub const SERVER_ERROR_MESSAGE: &str =
    "The roster could not be processed because of a server error. Please try again later.";

/// User-facing text for a rejected employee row.
pub fn invalid_csv_message(employee: Option<&Employee>, reason: ValidationReason) -> String {
    match employee {
        Some(employee) => format!(
            "Invalid CSV for employee!\n\n\
             Serial No: {}\n\
             Full Name: {}\n\
             Intranet Id: {}\n\
             Roll In Date: {}\n\
             Roll Off Date: {}\n\n\
             Error message: {}",
            employee.serial,
            employee.full_name,
            employee.intranet_id,
            employee.roll_in_date,
            employee.roll_off_date,
            reason
        ),
        None => format!("Invalid CSV for employee!\n\nError message: {}", reason),
    }
}

/// Renders any upload failure into the message returned to the uploader.
pub fn render_error(error: &UploadError) -> String {
    match error {
        UploadError::EmptyInput => EMPTY_UPLOAD_MESSAGE.to_string(),
        UploadError::InvalidRow { line, error } => format!(
            "{}\n(line {})",
            invalid_csv_message(error.employee.as_ref(), error.reason),
            line
        ),
        UploadError::Duplicate { employee } => {
            invalid_csv_message(employee.as_ref(), ValidationReason::DuplicateEntry)
        }
        UploadError::Directory(_) | UploadError::Storage(_) => SERVER_ERROR_MESSAGE.to_string(),
        UploadError::Notification(err) => format!(
            "The roster was saved, but password reset emails could not be sent: {}",
            err
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::repository::StoreError;
    use crate::upload::validation::ValidationError;

    fn employee() -> Employee {
        Employee {
            serial: "12345".to_string(),
            full_name: "Jane Doe".to_string(),
            intranet_id: "jane@x.com".to_string(),
            roll_in_date: "2024-01-01".to_string(),
            roll_off_date: "2024-06-01".to_string(),
        }
    }

    #[test]
    fn invalid_row_message_echoes_fields_reason_and_line() {
        let error = UploadError::InvalidRow {
            line: 7,
            error: ValidationError::new(&employee(), ValidationReason::UnknownSerial),
        };
        let message = render_error(&error);
        assert!(message.starts_with("Invalid CSV for employee!"));
        assert!(message.contains("Serial No: 12345"));
        assert!(message.contains("Roll Off Date: 2024-06-01"));
        assert!(message.contains("serial does not exist"));
        assert!(message.contains("(line 7)"));
    }

    #[test]
    fn malformed_row_message_has_no_employee_block() {
        let error = UploadError::InvalidRow {
            line: 3,
            error: ValidationError::malformed(),
        };
        let message = render_error(&error);
        assert!(!message.contains("Serial No"));
        assert!(message.contains("exactly 5 fields"));
    }

    #[test]
    fn duplicate_and_storage_messages_use_fixed_templates() {
        let duplicate = render_error(&UploadError::Duplicate {
            employee: Some(employee()),
        });
        assert!(duplicate.contains("duplicate entry"));
        assert!(duplicate.contains("Intranet Id: jane@x.com"));

        let storage = render_error(&UploadError::Storage(StoreError::Unavailable(
            "pool exhausted".to_string(),
        )));
        assert_eq!(storage, SERVER_ERROR_MESSAGE);
        assert!(!storage.contains("pool exhausted"));
    }
}
