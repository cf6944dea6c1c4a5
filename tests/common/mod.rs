#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use admission_wizard::{
    schema::FieldSchema,
    store::{DraftStore, KeyValueStore, MemoryStore},
    time::FixedClock,
    wizard::WizardSession,
    Result, WizardError,
};
use chrono::{TimeZone, Utc};

pub const TEST_YEAR: i32 = 2025;

pub fn fixed_clock() -> Arc<FixedClock> {
    let now = Utc
        .with_ymd_and_hms(TEST_YEAR, 3, 14, 9, 26, 53)
        .single()
        .expect("valid timestamp");
    Arc::new(FixedClock::new(now))
}

pub fn schema() -> Arc<FieldSchema> {
    Arc::new(FieldSchema::admission(TEST_YEAR))
}

/// Session over a memory store; the returned handle shares the store's contents.
pub fn memory_session() -> (WizardSession, MemoryStore) {
    let store = MemoryStore::new();
    let session = session_over(Box::new(store.clone()));
    (session, store)
}

pub fn session_over(backend: Box<dyn KeyValueStore>) -> WizardSession {
    WizardSession::start(schema(), DraftStore::new(backend), fixed_clock())
}

#[derive(Debug, Default)]
struct Faults {
    reads: bool,
    writes: bool,
    write_key: Option<&'static str>,
}

/// Memory-backed store whose reads and writes can be made to fail from a shared handle.
#[derive(Debug, Default, Clone)]
pub struct FlakyStore {
    inner: MemoryStore,
    faults: Arc<Mutex<Faults>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn fail_reads(&self, fail: bool) {
        self.faults.lock().expect("faults lock").reads = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.faults.lock().expect("faults lock").writes = fail;
    }

    /// Fails writes and removals of one key only, like a quota hit on one large value.
    pub fn fail_writes_to(&self, key: Option<&'static str>) {
        self.faults.lock().expect("faults lock").write_key = key;
    }

    fn check_write(&self, key: &str) -> Result<()> {
        let faults = self.faults.lock().expect("faults lock");
        if faults.writes || faults.write_key == Some(key) {
            return Err(WizardError::Storage(format!("quota exceeded writing `{}`", key)));
        }
        Ok(())
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        if self.faults.lock().expect("faults lock").reads {
            return Err(WizardError::Storage(format!("cannot read `{}`", key)));
        }
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.check_write(key)?;
        self.inner.set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.check_write(key)?;
        self.inner.remove(key)
    }
}

/// Session over a [`FlakyStore`]; the returned handle controls its faults.
pub fn flaky_session() -> (WizardSession, FlakyStore) {
    let store = FlakyStore::new();
    let session = session_over(Box::new(store.clone()));
    (session, store)
}

pub fn personal_details() -> Vec<(&'static str, &'static str)> {
    vec![
        ("firstName", "Ada"),
        ("lastName", "Lovelace"),
        ("email", "ada@example.org"),
        ("phone", "+1 (555) 123-4567"),
        ("dateOfBirth", "2007-12-10"),
        ("gender", "female"),
        ("address", "12 Analytical Row"),
        ("city", "London"),
        ("state", "LDN"),
        ("zipCode", "10001"),
    ]
}

pub fn academic_history() -> Vec<(&'static str, &'static str)> {
    vec![
        ("highSchoolName", "Engine High"),
        ("graduationYear", "2025"),
        ("gpa", "3.9"),
        ("intendedMajor", "Mathematics"),
    ]
}

pub fn guardian_information() -> Vec<(&'static str, &'static str)> {
    vec![
        ("guardianFirstName", "Anne"),
        ("guardianLastName", "Byron"),
        ("relationship", "Mother"),
        ("guardianPhone", "555-987-6543"),
        ("guardianEmail", "anne@example.org"),
        ("emergencyContact", "Mary Somerville"),
        ("emergencyPhone", "555.222.3333"),
    ]
}

pub fn fill(session: &mut WizardSession, values: &[(&str, &str)]) {
    for (id, value) in values {
        session.set_field(id, *value).expect("known field");
    }
}

/// Walks a session through every input step so it lands on the review step.
pub fn advance_to_review(session: &mut WizardSession) {
    for values in [personal_details(), academic_history(), guardian_information()] {
        fill(session, &values);
        assert!(session.next().accepted(), "step should validate");
    }
}
