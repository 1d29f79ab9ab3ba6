//! Test fixtures.
//!
//! A sample person record, recording persistence hooks and temporary
//! file-backed stores.

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use recordkit_core::{
    BackendHooks, DateBounds, IntegerBounds, PersistedObject, PersistenceHooks, StringLength,
};
use recordkit_storage::{FileBackend, StorageError, StorageResult};
use recordkit_value::Document;
use std::sync::Arc;
use tempfile::TempDir;

/// Name property of the sample person.
pub const NAME: &str = "Name";
/// Age property of the sample person.
pub const AGE: &str = "Age";
/// Birthday property of the sample person.
pub const BIRTHDAY: &str = "Birthday";
/// Key property used with [`BackendHooks`].
pub const ID: &str = "Id";

/// Longest accepted name.
pub const MAX_NAME_LEN: usize = 20;
/// Oldest accepted age.
pub const MAX_AGE: i64 = 150;

/// Builds a UTC timestamp at midnight.
pub fn date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .expect("valid calendar date")
}

/// Creates a `New` person with the standard rules:
/// - `Name`: 0 to 20 characters
/// - `Age`: 0 to 150
/// - `Birthday`: 1900-01-01 to 2100-01-01
pub fn person<H: PersistenceHooks + 'static>(hooks: H) -> PersistedObject<H> {
    let object = PersistedObject::new(hooks);
    add_person_rules(&object);
    object
}

/// Registers the person rules on an existing object.
pub fn add_person_rules<H: PersistenceHooks + 'static>(object: &PersistedObject<H>) {
    object.add_rule(NAME, StringLength::new(0, MAX_NAME_LEN));
    object.add_rule(AGE, IntegerBounds::new(0, MAX_AGE));
    object.add_rule(BIRTHDAY, DateBounds::new(date(1900, 1, 1), date(2100, 1, 1)));
}

/// Creates a person with `name` and `age`, saved so it is `Unmodified`.
pub fn saved_person<H: PersistenceHooks + 'static>(
    hooks: H,
    name: &str,
    age: i64,
) -> PersistedObject<H> {
    let object = person(hooks);
    object.set_property(NAME, name).expect("valid name");
    object.set_property(AGE, age).expect("valid age");
    object.save().expect("save succeeds");
    object
}

/// A hook invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookCall {
    /// `create_data`
    Create,
    /// `update_data`
    Update,
    /// `fetch_data`
    Fetch,
    /// `delete_data`
    Delete,
}

#[derive(Debug, Default)]
struct HookLog {
    calls: Vec<HookCall>,
    fail_on: Option<HookCall>,
    stored: Option<Document>,
}

/// Hooks that remember every call and the last persisted document.
///
/// Clones share the log, so a test keeps one clone to inspect calls made
/// through the object. `fetch_data` returns the last created or updated
/// document. A failure can be armed for one kind of call.
#[derive(Debug, Clone, Default)]
pub struct RecordingHooks {
    log: Arc<Mutex<HookLog>>,
}

impl RecordingHooks {
    /// Creates hooks with an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls made so far, in order.
    pub fn calls(&self) -> Vec<HookCall> {
        self.log.lock().calls.clone()
    }

    /// Makes every later `call` fail until [`heal`](Self::heal).
    pub fn fail_on(&self, call: HookCall) {
        self.log.lock().fail_on = Some(call);
    }

    /// Stops failing.
    pub fn heal(&self) {
        self.log.lock().fail_on = None;
    }

    /// The last document passed to create or update.
    pub fn stored(&self) -> Option<Document> {
        self.log.lock().stored.clone()
    }

    /// Replaces the stored document, as if another writer had saved it.
    pub fn set_stored(&self, data: Document) {
        self.log.lock().stored = Some(data);
    }

    fn record(&self, call: HookCall) -> StorageResult<()> {
        let mut log = self.log.lock();
        log.calls.push(call);
        if log.fail_on == Some(call) {
            return Err(StorageError::adapter(format!("{call:?} failed")));
        }
        Ok(())
    }
}

impl PersistenceHooks for RecordingHooks {
    fn create_data(&mut self, data: &mut Document) -> StorageResult<()> {
        self.record(HookCall::Create)?;
        self.set_stored(data.clone());
        Ok(())
    }

    fn update_data(&mut self, data: &mut Document) -> StorageResult<()> {
        self.record(HookCall::Update)?;
        self.set_stored(data.clone());
        Ok(())
    }

    fn fetch_data(&mut self, data: &Document) -> StorageResult<Document> {
        self.record(HookCall::Fetch)?;
        Ok(self.stored().unwrap_or_else(|| data.clone()))
    }

    fn delete_data(&mut self, _data: &Document) -> StorageResult<()> {
        self.record(HookCall::Delete)?;
        self.log.lock().stored = None;
        Ok(())
    }
}

/// A [`FileBackend`] in a temporary directory.
pub struct TempStore {
    backend: Arc<FileBackend>,
    dir: TempDir,
}

impl TempStore {
    /// Opens a fresh store.
    pub fn open() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let backend = FileBackend::open(dir.path()).expect("Failed to open file backend");
        Self {
            backend: Arc::new(backend),
            dir,
        }
    }

    /// Closes and reopens the store on the same directory.
    ///
    /// Outstanding hooks keep the old backend alive, so drop every object
    /// using it first.
    pub fn reopen(self) -> Self {
        let Self { backend, dir } = self;
        drop(backend);
        let backend = FileBackend::open(dir.path()).expect("Failed to reopen file backend");
        Self {
            backend: Arc::new(backend),
            dir,
        }
    }

    /// The shared backend.
    pub fn backend(&self) -> &Arc<FileBackend> {
        &self.backend
    }

    /// Hooks keyed by [`ID`].
    pub fn hooks(&self) -> BackendHooks<FileBackend> {
        BackendHooks::new(Arc::clone(&self.backend), ID)
    }
}
