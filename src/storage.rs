//! Schema Storage
//!
//! Async storage behind the registry service. Backends assign ids, dedupe
//! resubmissions of a topic's latest schema and run the compatibility rules
//! before anything is stored.
//!
//! Two backends ship with the crate:
//! - [`InMemorySchemaStorage`]: state behind one lock, for tests and tools
//! - [`FileSchemaStorage`]: the same state persisted under a directory

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::checksum::Checksum;
use crate::compatibility::CompatibilityChecker;
use crate::error::{Result, SchemaError};

// =============================================================================
// Types
// =============================================================================

/// One registered schema version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSchema {
    pub id: i64,
    pub topic: String,
    /// Exact submitted bytes; kept out of the index file
    #[serde(skip)]
    pub schema: Vec<u8>,
    pub checksum: Checksum,
    pub registered_at: DateTime<Utc>,
}

/// Outcome of a registration that reached the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    Accepted { id: i64 },
    /// Never empty
    Rejected { errors: Vec<String> },
}

/// Storage interface used by the registry service.
#[async_trait]
pub trait SchemaStorage: Send + Sync {
    /// Schema bytes for an id, or `None` when no such id exists
    async fn get_schema(&self, id: i64) -> Result<Option<Vec<u8>>>;

    /// Validate and store a schema under a topic
    async fn register_schema(&self, topic: &str, schema: &[u8]) -> Result<Registration>;
}

// =============================================================================
// Registry State
// =============================================================================

/// What a registration would do, decided before anything is written
enum Prepared {
    Existing(i64),
    Rejected(Vec<String>),
    New(StoredSchema),
}

#[derive(Debug)]
struct RegistryState {
    schemas: BTreeMap<i64, StoredSchema>,
    latest_by_topic: HashMap<String, i64>,
    next_id: i64,
}

impl Default for RegistryState {
    fn default() -> Self {
        Self {
            schemas: BTreeMap::new(),
            latest_by_topic: HashMap::new(),
            next_id: 1,
        }
    }
}

impl RegistryState {
    fn latest(&self, topic: &str) -> Option<&StoredSchema> {
        self.latest_by_topic
            .get(topic)
            .and_then(|id| self.schemas.get(id))
    }

    fn commit(&mut self, stored: StoredSchema) {
        self.next_id = self.next_id.max(stored.id + 1);
        let is_latest = self
            .latest_by_topic
            .get(&stored.topic)
            .map_or(true, |current| *current < stored.id);
        if is_latest {
            self.latest_by_topic.insert(stored.topic.clone(), stored.id);
        }
        self.schemas.insert(stored.id, stored);
    }
}

fn lock_error<E: std::fmt::Display>(e: E) -> SchemaError {
    SchemaError::Storage(format!("Lock error: {}", e))
}

fn rejected(topic: &str, errors: Vec<String>) -> Registration {
    warn!("Rejected schema for '{}': {}", topic, errors.join("; "));
    Registration::Rejected { errors }
}

// =============================================================================
// In-Memory Backend
// =============================================================================

/// In-memory schema storage.
///
/// The state lock is only held for lookups and the final insert; the
/// compatibility check runs on the blocking pool between the two, with
/// `register_lock` keeping registrations in order.
#[derive(Debug, Default)]
pub struct InMemorySchemaStorage {
    state: RwLock<RegistryState>,
    register_lock: Mutex<()>,
}

impl InMemorySchemaStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state(state: RegistryState) -> Self {
        Self {
            state: RwLock::new(state),
            register_lock: Mutex::new(()),
        }
    }

    /// Latest stored version of a topic
    pub fn latest(&self, topic: &str) -> Result<Option<StoredSchema>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.latest(topic).cloned())
    }

    /// Every stored version, ordered by id
    pub fn list(&self) -> Result<Vec<StoredSchema>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.schemas.values().cloned().collect())
    }

    /// Decide what registering `schema` would do. Callers serialize
    /// registrations so the id handed out here is still free at commit.
    async fn prepare(&self, topic: &str, schema: &[u8]) -> Result<Prepared> {
        let checksum = Checksum::from_bytes(schema);

        let (latest, id) = {
            let state = self.state.read().map_err(lock_error)?;
            match state.latest(topic) {
                Some(latest) if latest.checksum == checksum => {
                    debug!("Schema for '{}' matches version {}", topic, latest.id);
                    return Ok(Prepared::Existing(latest.id));
                }
                latest => (latest.map(|stored| stored.schema.clone()), state.next_id),
            }
        };

        // Compiling goes through a scratch directory on disk
        let submitted = schema.to_vec();
        let report = tokio::task::spawn_blocking(move || {
            CompatibilityChecker::check(latest.as_deref(), &submitted)
        })
        .await
        .map_err(|e| SchemaError::Storage(format!("Compatibility check failed: {}", e)))?;

        for warning in &report.warnings {
            debug!("Schema change for '{}': {}", topic, warning);
        }
        if !report.is_compatible() {
            return Ok(Prepared::Rejected(report.errors));
        }

        Ok(Prepared::New(StoredSchema {
            id,
            topic: topic.to_string(),
            schema: schema.to_vec(),
            checksum,
            registered_at: Utc::now(),
        }))
    }

    fn commit(&self, stored: StoredSchema) -> Result<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.commit(stored);
        Ok(())
    }
}

#[async_trait]
impl SchemaStorage for InMemorySchemaStorage {
    async fn get_schema(&self, id: i64) -> Result<Option<Vec<u8>>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.schemas.get(&id).map(|stored| stored.schema.clone()))
    }

    async fn register_schema(&self, topic: &str, schema: &[u8]) -> Result<Registration> {
        let _guard = self.register_lock.lock().await;

        match self.prepare(topic, schema).await? {
            Prepared::Existing(id) => Ok(Registration::Accepted { id }),
            Prepared::Rejected(errors) => Ok(rejected(topic, errors)),
            Prepared::New(stored) => {
                let id = stored.id;
                self.commit(stored)?;
                info!("Registered schema {} for '{}'", id, topic);
                Ok(Registration::Accepted { id })
            }
        }
    }
}

// =============================================================================
// File Backend
// =============================================================================

const INDEX_FILE: &str = "index.json";
const SCHEMA_DIR: &str = "schemas";

/// File-backed schema storage.
///
/// ```text
/// {root}/
/// ├── index.json        # ids, topics, checksums, timestamps
/// └── schemas/
///     └── {id}.proto    # exact submitted bytes
/// ```
///
/// A schema file is written before the index mentions it, so a registration
/// interrupted midway leaves at most an unreferenced file behind.
pub struct FileSchemaStorage {
    root: PathBuf,
    cache: InMemorySchemaStorage,
    /// Serializes registrations across their awaits
    write_lock: Mutex<()>,
}

impl FileSchemaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        info!("Initializing schema storage at {:?}", root);
        Self {
            root,
            cache: InMemorySchemaStorage::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// Create a storage and load whatever already exists under `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let mut storage = Self::new(root);
        storage.load().await?;
        Ok(storage)
    }

    /// Restore state from disk. Ids continue after the highest stored id.
    pub async fn load(&mut self) -> Result<()> {
        let index_path = self.root.join(INDEX_FILE);
        let exists = fs::try_exists(&index_path)
            .await
            .map_err(|e| SchemaError::Storage(format!("Failed to check index {:?}: {}", index_path, e)))?;
        if !exists {
            info!("No existing schema index found, starting fresh");
            return Ok(());
        }

        let content = fs::read_to_string(&index_path)
            .await
            .map_err(|e| SchemaError::Storage(format!("Failed to read index: {}", e)))?;
        let entries: Vec<StoredSchema> = serde_json::from_str(&content)?;

        info!("Loading {} schemas from {:?}", entries.len(), self.root);

        let mut state = RegistryState::default();
        for mut entry in entries {
            let path = self.schema_path(entry.id);
            entry.schema = fs::read(&path).await.map_err(|e| {
                SchemaError::Storage(format!("Failed to read schema {}: {}", entry.id, e))
            })?;
            if !entry.checksum.verify(&entry.schema) {
                return Err(SchemaError::Storage(format!(
                    "Schema file {:?} does not match its checksum",
                    path
                )));
            }
            state.commit(entry);
        }

        self.cache = InMemorySchemaStorage::with_state(state);
        Ok(())
    }

    pub fn latest(&self, topic: &str) -> Result<Option<StoredSchema>> {
        self.cache.latest(topic)
    }

    pub fn list(&self) -> Result<Vec<StoredSchema>> {
        self.cache.list()
    }

    fn schema_path(&self, id: i64) -> PathBuf {
        self.root.join(SCHEMA_DIR).join(format!("{}.proto", id))
    }

    /// Write the index including `pending`, via a temp file and rename.
    async fn save_index(&self, pending: &StoredSchema) -> Result<()> {
        let mut entries = self.cache.list()?;
        entries.push(pending.clone());
        let json = serde_json::to_string_pretty(&entries)?;

        let index_path = self.root.join(INDEX_FILE);
        let scratch_path = self.root.join(format!("{}.tmp", INDEX_FILE));
        fs::write(&scratch_path, json)
            .await
            .map_err(|e| SchemaError::Storage(format!("Failed to write index: {}", e)))?;
        fs::rename(&scratch_path, &index_path)
            .await
            .map_err(|e| SchemaError::Storage(format!("Failed to replace index: {}", e)))?;

        debug!("Saved schema index to {:?}", index_path);
        Ok(())
    }
}

#[async_trait]
impl SchemaStorage for FileSchemaStorage {
    async fn get_schema(&self, id: i64) -> Result<Option<Vec<u8>>> {
        self.cache.get_schema(id).await
    }

    async fn register_schema(&self, topic: &str, schema: &[u8]) -> Result<Registration> {
        let _guard = self.write_lock.lock().await;

        let stored = match self.cache.prepare(topic, schema).await? {
            Prepared::Existing(id) => return Ok(Registration::Accepted { id }),
            Prepared::Rejected(errors) => return Ok(rejected(topic, errors)),
            Prepared::New(stored) => stored,
        };

        let path = self.schema_path(stored.id);
        fs::create_dir_all(self.root.join(SCHEMA_DIR))
            .await
            .map_err(|e| SchemaError::Storage(format!("Failed to create directory: {}", e)))?;
        fs::write(&path, &stored.schema)
            .await
            .map_err(|e| SchemaError::Storage(format!("Failed to write schema: {}", e)))?;
        debug!("Saved schema to {:?}", path);

        self.save_index(&stored).await?;

        let id = stored.id;
        self.cache.commit(stored)?;
        info!("Registered schema {} for '{}'", id, topic);
        Ok(Registration::Accepted { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn schema_text(fields: &str) -> Vec<u8> {
        format!(
            "syntax = \"proto3\";\npackage gen;\nmessage record {{\n{}}}\n",
            fields
        )
        .into_bytes()
    }

    #[tokio::test]
    async fn test_in_memory_register_and_get() {
        let storage = InMemorySchemaStorage::new();
        let schema = schema_text("\tstring name = 1;\n");

        let registration = storage.register_schema("users", &schema).await.unwrap();
        assert_eq!(registration, Registration::Accepted { id: 1 });
        assert_eq!(storage.get_schema(1).await.unwrap(), Some(schema));
        assert_eq!(storage.get_schema(2).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_ids_are_global_across_topics() {
        let storage = InMemorySchemaStorage::new();

        let a = storage.register_schema("a", &schema_text("\tstring x = 1;\n")).await.unwrap();
        let b = storage.register_schema("b", &schema_text("\tstring y = 1;\n")).await.unwrap();
        assert_eq!(a, Registration::Accepted { id: 1 });
        assert_eq!(b, Registration::Accepted { id: 2 });
    }

    #[tokio::test]
    async fn test_identical_resubmission_returns_existing_id() {
        let storage = InMemorySchemaStorage::new();
        let schema = schema_text("\tstring name = 1;\n");

        storage.register_schema("users", &schema).await.unwrap();
        let again = storage.register_schema("users", &schema).await.unwrap();
        assert_eq!(again, Registration::Accepted { id: 1 });
        assert_eq!(storage.list().unwrap().len(), 1);

        // Same bytes under another topic is a new version there
        let other = storage.register_schema("accounts", &schema).await.unwrap();
        assert_eq!(other, Registration::Accepted { id: 2 });
    }

    #[tokio::test]
    async fn test_compatible_evolution_becomes_latest() {
        let storage = InMemorySchemaStorage::new();
        storage
            .register_schema("users", &schema_text("\tstring name = 1;\n"))
            .await
            .unwrap();
        let next = storage
            .register_schema("users", &schema_text("\tstring name = 1;\n\tint32 age = 2;\n"))
            .await
            .unwrap();

        assert_eq!(next, Registration::Accepted { id: 2 });
        assert_eq!(storage.latest("users").unwrap().unwrap().id, 2);
    }

    #[tokio::test]
    async fn test_breaking_change_rejected_without_consuming_id() {
        let storage = InMemorySchemaStorage::new();
        storage
            .register_schema("users", &schema_text("\tstring name = 1;\n\tint32 age = 2;\n"))
            .await
            .unwrap();

        let registration = storage
            .register_schema("users", &schema_text("\tstring name = 1;\n"))
            .await
            .unwrap();
        match registration {
            Registration::Rejected { errors } => {
                assert_eq!(errors, vec!["Message 'gen.record' field 'age' (number 2) was removed"]);
            }
            other => panic!("Expected rejection, got {:?}", other),
        }

        let next = storage
            .register_schema("other", &schema_text("\tbool ok = 1;\n"))
            .await
            .unwrap();
        assert_eq!(next, Registration::Accepted { id: 2 });
    }

    #[tokio::test]
    async fn test_invalid_bytes_rejected() {
        let storage = InMemorySchemaStorage::new();
        let registration = storage.register_schema("users", &[0x9, 0x7, 0x5]).await.unwrap();
        assert!(matches!(registration, Registration::Rejected { errors } if !errors.is_empty()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registrations_get_distinct_ids() {
        let storage = std::sync::Arc::new(InMemorySchemaStorage::new());

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let storage = storage.clone();
                tokio::spawn(async move {
                    let schema = schema_text(&format!("\tstring field_{} = 1;\n", n));
                    storage.register_schema(&format!("topic-{}", n), &schema).await.unwrap()
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            match handle.await.unwrap() {
                Registration::Accepted { id } => ids.push(id),
                other => panic!("Expected acceptance, got {:?}", other),
            }
        }
        ids.sort();
        assert_eq!(ids, (1..=8).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn test_recursive_root_schema_accepted() {
        let storage = InMemorySchemaStorage::new();
        let schema = b"syntax = \"proto3\";\npackage gen;\nmessage record {\n\trepeated v1_Node children = 1;\n}\n";

        let registration = storage.register_schema("tree", schema).await.unwrap();
        assert_eq!(registration, Registration::Accepted { id: 1 });
        assert_eq!(storage.get_schema(1).await.unwrap(), Some(schema.to_vec()));
    }

    #[tokio::test]
    async fn test_file_storage_layout() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileSchemaStorage::new(temp_dir.path());
        let schema = schema_text("\tstring name = 1;\n");

        storage.register_schema("users", &schema).await.unwrap();

        assert!(temp_dir.path().join("index.json").exists());
        let content = std::fs::read(temp_dir.path().join("schemas/1.proto")).unwrap();
        assert_eq!(content, schema);
    }

    #[tokio::test]
    async fn test_file_storage_load_and_id_continuity() {
        let temp_dir = TempDir::new().unwrap();
        let first = schema_text("\tstring name = 1;\n");

        {
            let storage = FileSchemaStorage::new(temp_dir.path());
            storage.register_schema("users", &first).await.unwrap();
            storage
                .register_schema("orders", &schema_text("\tint64 total = 1;\n"))
                .await
                .unwrap();
        }

        let storage = FileSchemaStorage::open(temp_dir.path()).await.unwrap();
        assert_eq!(storage.get_schema(1).await.unwrap(), Some(first.clone()));
        assert_eq!(storage.list().unwrap().len(), 2);

        let again = storage.register_schema("users", &first).await.unwrap();
        assert_eq!(again, Registration::Accepted { id: 1 });

        let next = storage
            .register_schema("users", &schema_text("\tstring name = 1;\n\tbool vip = 2;\n"))
            .await
            .unwrap();
        assert_eq!(next, Registration::Accepted { id: 3 });
    }

    #[tokio::test]
    async fn test_file_storage_unreadable_root_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let not_a_dir = temp_dir.path().join("registry");
        std::fs::write(&not_a_dir, b"").unwrap();

        let result = FileSchemaStorage::open(&not_a_dir).await;
        assert!(matches!(result, Err(SchemaError::Storage(_))));
    }

    #[tokio::test]
    async fn test_file_storage_detects_tampering() {
        let temp_dir = TempDir::new().unwrap();
        {
            let storage = FileSchemaStorage::new(temp_dir.path());
            storage
                .register_schema("users", &schema_text("\tstring name = 1;\n"))
                .await
                .unwrap();
        }
        std::fs::write(temp_dir.path().join("schemas/1.proto"), b"changed").unwrap();

        let result = FileSchemaStorage::open(temp_dir.path()).await;
        assert!(matches!(result, Err(SchemaError::Storage(_))));
    }
}
