//! Canonical Schema Extraction
//!
//! Turns a message type's descriptor graph into self-contained proto3 text:
//!
//! ```text
//! descriptor graph --walker--> [Definition] --emit--> "syntax = ...; package gen; ..."
//! ```
//!
//! The root message is always named `record` and every dependency is
//! flattened into the `gen` package, so the output needs no imports.

pub mod definition;
pub mod descriptor;
pub mod emit;
pub mod map_entry;
pub mod names;
pub mod oneof;
pub mod walker;

use prost_reflect::ReflectMessage;
use tracing::{debug, info};

pub use definition::{BodyEntry, Definition, EnumDef, FieldDef, MessageDef, OneofDef};
pub use descriptor::{EnumType, EnumValue, FieldInfo, FieldKind, MessageType, ScalarKind, TypePath};
pub use names::ROOT_NAME;

use crate::error::Result;
use walker::Walker;

/// Package every extracted schema is declared in
pub const PACKAGE: &str = "gen";

/// Knobs for one extraction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Render references back to the root as `record` instead of the root's
    /// path-derived name. Needed when the text must compile on its own and
    /// the root is recursive.
    pub alias_root_references: bool,
}

/// Ordered, deduplicated definitions for everything reachable from `root`.
pub fn extract_definitions<M: MessageType>(root: &M, options: &ExtractOptions) -> Result<Vec<Definition>> {
    let root_name = root.path().full_name();
    debug!("Extracting schema for {}", root_name);

    let definitions = Walker::new(root, options).run(root)?;

    info!(
        root = %root_name,
        definitions = definitions.len(),
        "Extracted schema"
    );
    Ok(definitions)
}

/// Canonical schema text for `root` with default options.
pub fn extract_schema<M: MessageType>(root: &M) -> Result<String> {
    extract_schema_with(root, &ExtractOptions::default())
}

pub fn extract_schema_with<M: MessageType>(root: &M, options: &ExtractOptions) -> Result<String> {
    let definitions = extract_definitions(root, options)?;
    Ok(emit::render(&definitions))
}

/// Schema text for the type of a reflectable message value
pub fn extract_schema_of<R: ReflectMessage>(message: &R) -> Result<String> {
    extract_schema(&message.descriptor())
}
