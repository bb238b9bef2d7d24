//! Proto Schema Registry
//!
//! Canonical proto3 schema extraction for protobuf message types, plus a
//! small topic-keyed registry that stores the extracted text.
//!
//! ## Features
//!
//! - **Deterministic Extraction**: the same message type always yields the
//!   same bytes, so schemas can be hashed and deduplicated
//! - **Self-Contained Output**: every dependency is flattened into package
//!   `gen` with the root renamed to `record`, no imports needed
//! - **Full Structure**: cycles, maps, oneofs, nested and top-level enums
//! - **Registry**: sequential ids, per-topic dedup and compatibility checks
//!
//! ## Pipeline
//!
//! ```text
//! MessageDescriptor
//!   └── extract::walker   (DFS, cycle-safe, post-order)
//!         ├── names       (record / pkg_Outer_Inner, collisions)
//!         ├── map_entry   (map<K,V> → repeated XEntry)
//!         └── oneof       (oneof_0, oneof_1, ...)
//!   └── extract::emit     (proto3 text)
//!         └── storage     (validate, id, persist)
//! ```

pub mod api;
pub mod checksum;
pub mod compatibility;
pub mod compile;
pub mod config;
pub mod error;
pub mod extract;
pub mod service;
pub mod storage;

pub use checksum::Checksum;
pub use compatibility::{CompatibilityChecker, CompatibilityReport};
pub use config::RegistryConfig;
pub use error::{Result, SchemaError};
pub use extract::{extract_definitions, extract_schema, extract_schema_of, extract_schema_with, ExtractOptions};
pub use service::RegistryService;
pub use storage::{FileSchemaStorage, InMemorySchemaStorage, Registration, SchemaStorage, StoredSchema};
