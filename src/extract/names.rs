//! Name Resolution
//!
//! Builds canonical, flattened type names for schema text:
//! - the extraction root is always `record`
//! - every other type is `<package_with_underscores>_<Outer>_<Inner>`
//! - enums nested in a message stay local (`Owner.Local` from elsewhere)
//!
//! Every name handed out is registered against the identity of the type it
//! names, so two distinct types that flatten to the same text are reported
//! instead of silently merged.

use std::collections::HashMap;

use super::descriptor::{EnumType, MessageType, TypePath};
use crate::error::{Result, SchemaError};

/// Fixed name of the root message in every extracted schema
pub const ROOT_NAME: &str = "record";

/// Resolves type paths to canonical names with collision detection.
pub struct TypeNamer {
    /// Identity (full name) of the extraction root
    root_key: String,

    /// Render references to the root as `record` instead of its path name
    alias_root_references: bool,

    /// canonical name -> identity of the type that claimed it
    claimed: HashMap<String, String>,
}

impl TypeNamer {
    pub fn new(root: &TypePath, alias_root_references: bool) -> Self {
        let root_key = root.full_name();
        let mut claimed = HashMap::new();
        claimed.insert(ROOT_NAME.to_string(), root_key.clone());

        Self {
            root_key,
            alias_root_references,
            claimed,
        }
    }

    pub fn is_root(&self, path: &TypePath) -> bool {
        path.full_name() == self.root_key
    }

    /// Name a type is declared under.
    pub fn canonical_name(&mut self, path: &TypePath, is_root: bool) -> Result<String> {
        if is_root {
            return Ok(ROOT_NAME.to_string());
        }
        let name = flatten(path);
        self.claim(&name, &path.full_name())?;
        Ok(name)
    }

    /// Name of a message type as it appears in a definition header
    pub fn definition_name(&mut self, path: &TypePath) -> Result<String> {
        let is_root = self.is_root(path);
        self.canonical_name(path, is_root)
    }

    /// Name used when another definition refers to this type.
    ///
    /// Back-references to the root keep the root's path-derived name unless
    /// root aliasing is enabled.
    pub fn reference_name(&mut self, path: &TypePath) -> Result<String> {
        let is_root = self.alias_root_references && self.is_root(path);
        self.canonical_name(path, is_root)
    }

    /// Reference to an enum from inside the message `context`.
    pub fn enum_reference<M: MessageType>(
        &mut self,
        enum_type: &M::Enum,
        context: &TypePath,
    ) -> Result<String> {
        let path = enum_type.path();
        match M::owner_of(enum_type) {
            Some(owner) => {
                let owner_path = owner.path();
                if owner_path == *context {
                    Ok(path.name().to_string())
                } else {
                    // Declared inside the owner's definition, which for the root is `record`
                    let owner_name = self.definition_name(&owner_path)?;
                    Ok(format!("{}.{}", owner_name, path.name()))
                }
            }
            None => self.reference_name(&path),
        }
    }

    /// Register a name for a synthetic type (map entries)
    pub fn claim_synthetic(&mut self, name: &str, identity: &str) -> Result<()> {
        self.claim(name, identity)
    }

    fn claim(&mut self, name: &str, identity: &str) -> Result<()> {
        match self.claimed.get(name) {
            Some(existing) if existing != identity => Err(SchemaError::NameCollision {
                name: name.to_string(),
                first: existing.clone(),
                second: identity.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.claimed.insert(name.to_string(), identity.to_string());
                Ok(())
            }
        }
    }
}

/// Whether an enum is declared inside a message rather than hoisted
pub fn is_local_enum<M: MessageType>(enum_type: &M::Enum) -> bool {
    M::owner_of(enum_type).is_some()
}

/// Flatten a type path: package dots and nesting become underscores
pub fn flatten(path: &TypePath) -> String {
    let nested = path.nesting.join("_");
    if path.package.is_empty() {
        nested
    } else {
        format!("{}_{}", path.package.replace('.', "_"), nested)
    }
}
