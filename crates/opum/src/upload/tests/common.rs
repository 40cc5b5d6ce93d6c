use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::config::NotificationPolicy;
use crate::upload::domain::{Employee, Role};
use crate::upload::repository::{
    DirectoryError, DirectoryLookup, EmployeeStore, Notifier, NotifyError, StoreError,
};
use crate::upload::validation::{AdminEmployeeValidator, CheckError, Validator};
use crate::upload::EmployeeUploadService;

pub(super) const HEADER: &str = "serial,name,email,rollin,rolloff";

pub(super) fn roster(rows: &[String]) -> String {
    let mut raw = String::from(HEADER);
    for row in rows {
        raw.push('\n');
        raw.push_str(row);
    }
    raw
}

pub(super) fn valid_row(index: usize) -> String {
    format!(
        "{serial},Employee {name},{email},2024-01-01,2024-06-01",
        serial = serial(index),
        name = name(index),
        email = email(index)
    )
}

pub(super) fn serial(index: usize) -> String {
    format!("{:06}", 100_000 + index)
}

pub(super) fn email(index: usize) -> String {
    format!("employee{index}@ph.ibm.com")
}

fn name(index: usize) -> String {
    let letters = ["Alpha", "Bravo", "Charlie", "Delta", "Echo", "Foxtrot"];
    letters[index % letters.len()].to_string()
}

pub(super) type EventLog = Arc<Mutex<Vec<&'static str>>>;

pub(super) fn events(log: &EventLog) -> Vec<&'static str> {
    log.lock().expect("event mutex poisoned").clone()
}

#[derive(Default)]
pub(super) struct MemoryDirectory {
    serials: HashSet<String>,
    emails: HashSet<(String, String)>,
}

impl MemoryDirectory {
    pub(super) fn knowing(entries: &[(String, String)]) -> Self {
        Self {
            serials: entries.iter().map(|(serial, _)| serial.clone()).collect(),
            emails: entries.iter().cloned().collect(),
        }
    }

    pub(super) fn knowing_indexes(count: usize) -> Self {
        let entries: Vec<(String, String)> =
            (1..=count).map(|index| (serial(index), email(index))).collect();
        Self::knowing(&entries)
    }
}

impl DirectoryLookup for MemoryDirectory {
    fn serial_exists(&self, serial: &str) -> Result<bool, DirectoryError> {
        Ok(self.serials.contains(serial))
    }

    fn email_exists(&self, serial: &str, email: &str) -> Result<bool, DirectoryError> {
        Ok(self
            .emails
            .contains(&(serial.to_string(), email.to_string())))
    }
}

/// Fails the test on any lookup.
pub(super) struct PanickingDirectory;

impl DirectoryLookup for PanickingDirectory {
    fn serial_exists(&self, serial: &str) -> Result<bool, DirectoryError> {
        panic!("directory must not be consulted (serial {serial})")
    }

    fn email_exists(&self, serial: &str, _email: &str) -> Result<bool, DirectoryError> {
        panic!("directory must not be consulted (serial {serial})")
    }
}

pub(super) struct OfflineDirectory;

impl DirectoryLookup for OfflineDirectory {
    fn serial_exists(&self, _serial: &str) -> Result<bool, DirectoryError> {
        Err(DirectoryError::Unavailable("bluepages timeout".to_string()))
    }

    fn email_exists(&self, _serial: &str, _email: &str) -> Result<bool, DirectoryError> {
        Err(DirectoryError::Unavailable("bluepages timeout".to_string()))
    }
}

/// Wraps a validator and records which serials reached it.
pub(super) struct CountingValidator<V> {
    inner: V,
    seen: Mutex<Vec<String>>,
}

impl<V> CountingValidator<V> {
    pub(super) fn new(inner: V) -> Self {
        Self {
            inner,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn seen(&self) -> Vec<String> {
        self.seen.lock().expect("validator mutex poisoned").clone()
    }
}

impl<V: Validator<Employee>> Validator<Employee> for CountingValidator<V> {
    fn validate(&self, employee: &Employee) -> Result<(), CheckError> {
        self.seen
            .lock()
            .expect("validator mutex poisoned")
            .push(employee.serial.clone());
        self.inner.validate(employee)
    }
}

#[derive(Default)]
pub(super) struct RecordingStore {
    batches: Mutex<Vec<(Vec<Employee>, Role)>>,
    log: EventLog,
}

impl RecordingStore {
    pub(super) fn with_log(log: EventLog) -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            log,
        }
    }

    pub(super) fn batches(&self) -> Vec<(Vec<Employee>, Role)> {
        self.batches.lock().expect("store mutex poisoned").clone()
    }
}

impl EmployeeStore for RecordingStore {
    fn save_or_update(&self, batch: &[Employee], role: Role) -> Result<usize, StoreError> {
        self.log.lock().expect("event mutex poisoned").push("store");
        self.batches
            .lock()
            .expect("store mutex poisoned")
            .push((batch.to_vec(), role));
        Ok(batch.len())
    }
}

pub(super) struct ConflictStore {
    pub(super) serial: String,
}

impl EmployeeStore for ConflictStore {
    fn save_or_update(&self, _batch: &[Employee], _role: Role) -> Result<usize, StoreError> {
        Err(StoreError::Conflict {
            serial: self.serial.clone(),
        })
    }
}

pub(super) struct UnavailableStore;

impl EmployeeStore for UnavailableStore {
    fn save_or_update(&self, _batch: &[Employee], _role: Role) -> Result<usize, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct RecordingNotifier {
    calls: Mutex<Vec<Vec<String>>>,
    log: EventLog,
}

impl RecordingNotifier {
    pub(super) fn with_log(log: EventLog) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            log,
        }
    }

    pub(super) fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().expect("notifier mutex poisoned").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn send_password_reset_emails(&self, recipients: &[String]) -> Result<(), NotifyError> {
        self.log.lock().expect("event mutex poisoned").push("notify");
        self.calls
            .lock()
            .expect("notifier mutex poisoned")
            .push(recipients.to_vec());
        Ok(())
    }
}

pub(super) struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn send_password_reset_emails(&self, recipients: &[String]) -> Result<(), NotifyError> {
        Err(NotifyError::Delivery {
            recipient: recipients.first().cloned().unwrap_or_default(),
            reason: "mailbox unavailable".to_string(),
        })
    }
}

pub(super) type DefaultService =
    EmployeeUploadService<AdminEmployeeValidator<MemoryDirectory>, RecordingStore, RecordingNotifier>;

pub(super) fn build_service(
    directory: MemoryDirectory,
) -> (DefaultService, Arc<RecordingStore>, Arc<RecordingNotifier>, EventLog) {
    let log: EventLog = Arc::default();
    let store = Arc::new(RecordingStore::with_log(log.clone()));
    let notifier = Arc::new(RecordingNotifier::with_log(log.clone()));
    let validator = Arc::new(AdminEmployeeValidator::new(Arc::new(directory)));
    let service = EmployeeUploadService::new(validator, store.clone(), notifier.clone());
    (service, store, notifier, log)
}

pub(super) fn service_with<S, N>(
    directory: MemoryDirectory,
    store: S,
    notifier: N,
    policy: NotificationPolicy,
) -> EmployeeUploadService<AdminEmployeeValidator<MemoryDirectory>, S, N>
where
    S: EmployeeStore + 'static,
    N: Notifier + 'static,
{
    EmployeeUploadService::with_policy(
        Arc::new(AdminEmployeeValidator::new(Arc::new(directory))),
        Arc::new(store),
        Arc::new(notifier),
        policy,
    )
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
