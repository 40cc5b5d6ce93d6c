//! Side-effect free checks used by the roster validators.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use super::{ValidationError, ValidationReason};
use crate::upload::domain::{Employee, UploadRow, ROSTER_FIELD_COUNT};

const SERIAL_PATTERN: &str = r"^[A-Za-z0-9]{5,10}$";
const NAME_PATTERN: &str = r"^\p{L}[\p{L} .'\-]*$";
const EMAIL_PATTERN: &str = r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$";

fn serial_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(SERIAL_PATTERN).expect("serial pattern compiles"))
}

fn name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(NAME_PATTERN).expect("name pattern compiles"))
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern compiles"))
}

pub fn is_valid_serial(value: &str) -> bool {
    serial_regex().is_match(value.trim())
}

pub fn is_valid_name(value: &str) -> bool {
    name_regex().is_match(value.trim())
}

pub fn is_valid_email(value: &str) -> bool {
    email_regex().is_match(value.trim())
}

pub fn parse_date(value: &str, format: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), format).ok()
}

pub fn require_non_empty(employee: &Employee) -> Result<(), ValidationError> {
    let fields = [
        &employee.serial,
        &employee.full_name,
        &employee.intranet_id,
        &employee.roll_in_date,
        &employee.roll_off_date,
    ];
    if fields.iter().any(|value| value.trim().is_empty()) {
        return Err(ValidationError::new(employee, ValidationReason::EmptyField));
    }
    Ok(())
}

pub fn require_serial_format(employee: &Employee) -> Result<(), ValidationError> {
    if is_valid_serial(&employee.serial) {
        Ok(())
    } else {
        Err(ValidationError::new(employee, ValidationReason::InvalidSerial))
    }
}

pub fn require_name_format(employee: &Employee) -> Result<(), ValidationError> {
    if is_valid_name(&employee.full_name) {
        Ok(())
    } else {
        Err(ValidationError::new(employee, ValidationReason::InvalidName))
    }
}

pub fn require_email_format(employee: &Employee) -> Result<(), ValidationError> {
    if is_valid_email(&employee.intranet_id) {
        Ok(())
    } else {
        Err(ValidationError::new(employee, ValidationReason::InvalidEmail))
    }
}

/// Both dates parse under `format` and roll-in does not come after roll-off.
pub fn require_date_range(employee: &Employee, format: &str) -> Result<(), ValidationError> {
    let roll_in = parse_date(&employee.roll_in_date, format)
        .ok_or_else(|| ValidationError::new(employee, ValidationReason::InvalidDate))?;
    let roll_off = parse_date(&employee.roll_off_date, format)
        .ok_or_else(|| ValidationError::new(employee, ValidationReason::InvalidDate))?;

    if roll_in > roll_off {
        return Err(ValidationError::new(
            employee,
            ValidationReason::InvalidDateRange,
        ));
    }
    Ok(())
}

/// Row shape check run before any field rule: exactly five fields, none blank.
pub fn check_integrity(row: &UploadRow) -> Result<Employee, ValidationError> {
    if row.fields.len() != ROSTER_FIELD_COUNT {
        return Err(ValidationError::malformed());
    }

    let employee = row.to_employee();
    if !row.is_complete() {
        return Err(ValidationError::new(&employee, ValidationReason::EmptyField));
    }
    Ok(employee)
}

/// Every check that needs no directory, in validator order.
pub fn check_offline(employee: &Employee, date_format: &str) -> Result<(), ValidationError> {
    require_non_empty(employee)?;
    require_serial_format(employee)?;
    require_name_format(employee)?;
    require_email_format(employee)?;
    require_date_range(employee, date_format)
}
