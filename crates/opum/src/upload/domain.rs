use serde::{Deserialize, Serialize};

/// Number of positional fields in a roster row.
pub const ROSTER_FIELD_COUNT: usize = 5;

/// One data line of an uploaded roster, before any validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRow {
    /// 1-based line number in the uploaded text.
    pub line: usize,
    pub fields: Vec<String>,
}

impl UploadRow {
    /// Row identity: the first field, which is the employee serial.
    pub fn key(&self) -> &str {
        self.fields.first().map(String::as_str).unwrap_or_default()
    }

    /// Exactly five fields, none of them blank.
    pub fn is_complete(&self) -> bool {
        self.fields.len() == ROSTER_FIELD_COUNT
            && self.fields.iter().all(|field| !field.trim().is_empty())
    }

    /// Positional projection onto an employee. Missing trailing fields become
    /// empty strings so the failure report can still echo what was sent.
    pub fn to_employee(&self) -> Employee {
        let field = |index: usize| self.fields.get(index).cloned().unwrap_or_default();
        Employee {
            serial: field(0),
            full_name: field(1),
            intranet_id: field(2),
            roll_in_date: field(3),
            roll_off_date: field(4),
        }
    }
}

/// Parsed roster rows in upload order, addressable by row key.
///
/// Rows sharing a key are all kept; the store reports them as duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRows {
    rows: Vec<UploadRow>,
}

impl ParsedRows {
    pub(crate) fn push(&mut self, row: UploadRow) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, UploadRow> {
        self.rows.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(UploadRow::key)
    }

    /// Fields of the first row with the given key.
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.rows
            .iter()
            .find(|row| row.key() == key)
            .map(|row| row.fields.as_slice())
    }
}

impl<'a> IntoIterator for &'a ParsedRows {
    type Item = &'a UploadRow;
    type IntoIter = std::slice::Iter<'a, UploadRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Employee projection of a roster row. Values are kept as uploaded so a
/// rejected row can be reported verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub serial: String,
    pub full_name: String,
    pub intranet_id: String,
    pub roll_in_date: String,
    pub roll_off_date: String,
}

/// Role attached to a persisted batch of employees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SystemAdmin,
    Admin,
    User,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::SystemAdmin => "SYS_ADMIN",
            Role::Admin => "ADMIN",
            Role::User => "USER",
        }
    }

    const fn privilege(self) -> u8 {
        match self {
            Role::SystemAdmin => 2,
            Role::Admin => 1,
            Role::User => 0,
        }
    }

    /// The more privileged of the two roles. Re-uploading an account never
    /// demotes it.
    pub const fn max_privilege(self, other: Role) -> Role {
        if other.privilege() > self.privilege() {
            other
        } else {
            self
        }
    }
}
