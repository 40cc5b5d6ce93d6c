use metrics_exporter_prometheus::PrometheusHandle;
use opum::reset::{
    CredentialStore, MailError, MailTransport, OutboundEmail, PasswordResetService,
    SmtpMailTransport,
};
use opum::upload::{
    AdminEmployeeValidator, DirectoryError, DirectoryLookup, Employee, EmployeeStore,
    EmployeeUploadService, Role, StoreError,
};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

pub(crate) type ResetService = PasswordResetService<InMemoryEmployeeStore, Mailer>;
pub(crate) type UploadService =
    EmployeeUploadService<AdminEmployeeValidator<RosterDirectory>, InMemoryEmployeeStore, ResetService>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Debug, Clone)]
pub(crate) struct Account {
    pub(crate) employee: Employee,
    pub(crate) role: Role,
    pub(crate) salt: String,
    pub(crate) password_hash: Option<String>,
}

/// Accounts keyed by serial. Also serves as the credential store for resets.
#[derive(Default, Clone)]
pub(crate) struct InMemoryEmployeeStore {
    accounts: Arc<Mutex<HashMap<String, Account>>>,
}

impl InMemoryEmployeeStore {
    pub(crate) fn account(&self, serial: &str) -> Option<Account> {
        self.accounts
            .lock()
            .expect("employee store mutex poisoned")
            .get(serial)
            .cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.accounts
            .lock()
            .expect("employee store mutex poisoned")
            .len()
    }
}

impl EmployeeStore for InMemoryEmployeeStore {
    /// Inserts new serials and updates known ones, keeping the higher of the
    /// stored and requested role. The batch conflicts when a
    /// serial repeats inside it or an intranet id already belongs to another
    /// serial; nothing is written in that case.
    fn save_or_update(&self, batch: &[Employee], role: Role) -> Result<usize, StoreError> {
        let mut guard = self.accounts.lock().expect("employee store mutex poisoned");

        let mut serials = HashSet::new();
        let mut emails: HashMap<String, &str> = HashMap::new();
        for employee in batch {
            let serial = employee.serial.trim();
            let email = employee.intranet_id.trim().to_ascii_lowercase();
            if !serials.insert(serial) {
                return Err(StoreError::Conflict {
                    serial: serial.to_string(),
                });
            }

            let taken_by_other = guard.values().any(|account| {
                account.employee.serial != serial
                    && account.employee.intranet_id.eq_ignore_ascii_case(&email)
            });
            if taken_by_other || emails.insert(email, serial).is_some() {
                return Err(StoreError::Conflict {
                    serial: serial.to_string(),
                });
            }
        }

        for employee in batch {
            let serial = employee.serial.trim().to_string();
            let mut stored = employee.clone();
            stored.serial = serial.clone();
            stored.intranet_id = employee.intranet_id.trim().to_string();

            match guard.get_mut(&serial) {
                Some(account) => {
                    account.employee = stored;
                    account.role = account.role.max_privilege(role);
                }
                None => {
                    let account = Account {
                        employee: stored,
                        role,
                        salt: uuid::Uuid::new_v4().simple().to_string(),
                        password_hash: None,
                    };
                    guard.insert(serial, account);
                }
            }
        }

        Ok(batch.len())
    }
}

impl CredentialStore for InMemoryEmployeeStore {
    fn retrieve_salt(&self, email: &str) -> Result<Option<String>, StoreError> {
        let guard = self.accounts.lock().expect("employee store mutex poisoned");
        Ok(guard
            .values()
            .find(|account| account.employee.intranet_id.eq_ignore_ascii_case(email.trim()))
            .map(|account| account.salt.clone()))
    }

    fn update_password(&self, email: &str, password_hash: &str) -> Result<(), StoreError> {
        let mut guard = self.accounts.lock().expect("employee store mutex poisoned");
        let account = guard
            .values_mut()
            .find(|account| account.employee.intranet_id.eq_ignore_ascii_case(email.trim()))
            .ok_or_else(|| StoreError::Unavailable(format!("no account for {email}")))?;
        account.password_hash = Some(password_hash.to_string());
        account.salt = uuid::Uuid::new_v4().simple().to_string();
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct RosterEntry {
    serial: String,
    email: String,
}

/// Directory backed by a `serial,email` CSV. Without a roster every lookup
/// succeeds.
#[derive(Debug, Clone, Default)]
pub(crate) struct RosterDirectory {
    entries: Option<HashMap<String, String>>,
}

impl RosterDirectory {
    pub(crate) fn open() -> Self {
        Self { entries: None }
    }

    pub(crate) fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, csv::Error> {
        let mut csv = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut entries = HashMap::new();
        for record in csv.deserialize::<RosterEntry>() {
            let entry = record?;
            entries.insert(entry.serial, entry.email.to_ascii_lowercase());
        }
        Ok(Self {
            entries: Some(entries),
        })
    }

    pub(crate) fn from_path(path: &Path) -> Result<Self, csv::Error> {
        let file = std::fs::File::open(path)?;
        let directory = Self::from_reader(file)?;
        info!(
            path = %path.display(),
            employees = directory.len(),
            "directory roster loaded"
        );
        Ok(directory)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, HashMap::len)
    }
}

impl DirectoryLookup for RosterDirectory {
    fn serial_exists(&self, serial: &str) -> Result<bool, DirectoryError> {
        Ok(match &self.entries {
            Some(entries) => entries.contains_key(serial.trim()),
            None => true,
        })
    }

    fn email_exists(&self, serial: &str, email: &str) -> Result<bool, DirectoryError> {
        Ok(match &self.entries {
            Some(entries) => entries
                .get(serial.trim())
                .is_some_and(|known| known.eq_ignore_ascii_case(email.trim())),
            None => true,
        })
    }
}

/// Captures outbound mail when no SMTP relay is configured.
#[derive(Default, Clone)]
pub(crate) struct InMemoryOutbox {
    sent: Arc<Mutex<Vec<OutboundEmail>>>,
}

impl InMemoryOutbox {
    pub(crate) fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().expect("outbox mutex poisoned").clone()
    }
}

impl MailTransport for InMemoryOutbox {
    fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        info!(to = %email.to, subject = %email.subject, "reset email captured in outbox");
        self.sent
            .lock()
            .expect("outbox mutex poisoned")
            .push(email.clone());
        Ok(())
    }
}

pub(crate) enum Mailer {
    Smtp(SmtpMailTransport),
    Outbox(InMemoryOutbox),
}

impl MailTransport for Mailer {
    fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        match self {
            Mailer::Smtp(transport) => transport.send(email),
            Mailer::Outbox(outbox) => outbox.send(email),
        }
    }
}

pub(crate) fn load_directory(path: Option<&Path>) -> Result<RosterDirectory, csv::Error> {
    match path {
        Some(path) => RosterDirectory::from_path(path),
        None => {
            warn!("DIRECTORY_ROSTER not set; every serial and email is accepted");
            Ok(RosterDirectory::open())
        }
    }
}
