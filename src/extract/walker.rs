//! Descriptor Walker
//!
//! Depth-first traversal of the type graph reachable from a root message.
//! Each type is tracked as unvisited, in progress or emitted, keyed by its
//! fully-qualified name:
//! - emitted types are skipped
//! - an in-progress type closes a cycle and is only referenced by name; when
//!   that type is the root, its definition is flushed on the spot
//! - unvisited types recurse into their fields and are appended post-order
//!
//! Enums declared inside a message are never emitted on their own. They are
//! folded into their owner's body, and referencing one from elsewhere pulls
//! the owner into the walk.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::definition::{BodyEntry, Definition, EnumDef, FieldDef, MessageDef, OneofDef};
use super::descriptor::{EnumType, EnumValue, FieldInfo, FieldKind, MessageType, ScalarKind, TypePath};
use super::map_entry::{entry_name, synthesize_entry};
use super::names::{is_local_enum, TypeNamer};
use super::oneof::{group_fields, FieldGroup};
use super::ExtractOptions;
use crate::error::{Result, SchemaError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    InProgress,
    Emitted,
}

/// Local enum found during the walk, waiting to be placed in its owner
struct PendingEnum {
    owner_key: String,
    def: EnumDef,
}

/// One extraction's traversal state. Never shared between extractions.
pub struct Walker<M: MessageType> {
    namer: TypeNamer,
    root_key: String,
    root_flushed: bool,
    states: HashMap<String, VisitState>,
    seen_enums: HashSet<String>,
    pending_enums: Vec<PendingEnum>,
    /// message identity -> index of its definition in `output`
    slots: HashMap<String, usize>,
    output: Vec<Definition>,
    _marker: std::marker::PhantomData<M>,
}

impl<M: MessageType> Walker<M> {
    pub fn new(root: &M, options: &ExtractOptions) -> Self {
        let root_path = root.path();
        Self {
            namer: TypeNamer::new(&root_path, options.alias_root_references),
            root_key: root_path.full_name(),
            root_flushed: false,
            states: HashMap::new(),
            seen_enums: HashSet::new(),
            pending_enums: Vec::new(),
            slots: HashMap::new(),
            output: Vec::new(),
            _marker: std::marker::PhantomData,
        }
    }

    /// Walk the graph from `root` and return the ordered definitions.
    pub fn run(mut self, root: &M) -> Result<Vec<Definition>> {
        self.visit_message(root)?;
        self.attach_pending_enums()?;
        Ok(self.output)
    }

    // ===== Messages =====

    fn visit_message(&mut self, message: &M) -> Result<()> {
        let path = message.path();
        let key = path.full_name();

        match self.states.get(&key).copied() {
            Some(VisitState::Emitted) => return Ok(()),
            Some(VisitState::InProgress) => {
                if key == self.root_key && !self.root_flushed {
                    debug!("Cycle back to root {}, flushing its definition", key);
                    let fields = message.fields()?;
                    let def = self.build_message_def(&path, &fields)?;
                    self.push_message(key, def);
                    self.root_flushed = true;
                }
                return Ok(());
            }
            None => {}
        }

        self.states.insert(key.clone(), VisitState::InProgress);

        let fields = message.fields()?;
        for field in &fields {
            self.visit_field(&path, field)?;
        }

        self.states.insert(key.clone(), VisitState::Emitted);

        if key == self.root_key && self.root_flushed {
            return Ok(());
        }
        let def = self.build_message_def(&path, &fields)?;
        self.push_message(key, def);
        Ok(())
    }

    fn visit_field(&mut self, parent: &TypePath, field: &FieldInfo<M>) -> Result<()> {
        match &field.kind {
            FieldKind::Scalar(_) => Ok(()),
            FieldKind::Message(message) => self.visit_message(message),
            FieldKind::Enum(enum_type) => self.visit_enum(enum_type),
            FieldKind::Map { key, value } => self.visit_map_entry(parent, &field.name, *key, value),
        }
    }

    fn push_message(&mut self, key: String, def: MessageDef) {
        self.slots.insert(key, self.output.len());
        self.output.push(Definition::Message(def));
    }

    // ===== Map Entries =====

    fn visit_map_entry(
        &mut self,
        parent: &TypePath,
        field_name: &str,
        key: ScalarKind,
        value: &FieldKind<M>,
    ) -> Result<()> {
        match value {
            FieldKind::Message(message) => self.visit_message(message)?,
            FieldKind::Enum(enum_type) => self.visit_enum(enum_type)?,
            FieldKind::Scalar(_) => {}
            FieldKind::Map { .. } => {
                return Err(SchemaError::UnsupportedFieldKind {
                    field: format!("{}.{}", parent.full_name(), field_name),
                    kind: "map value of map type".to_string(),
                })
            }
        }

        let identity = entry_identity(parent, field_name);
        if self.states.contains_key(&identity) {
            return Ok(());
        }

        let parent_name = self.namer.definition_name(parent)?;
        let entry_path = entry_path(parent, &parent_name, field_name);
        let value_type = self.type_reference(value, &entry_path, field_name)?;
        let entry = synthesize_entry(&parent_name, field_name, key, &value_type);
        self.namer.claim_synthetic(&entry.name, &identity)?;

        self.states.insert(identity.clone(), VisitState::Emitted);
        self.push_message(identity, entry);
        Ok(())
    }

    // ===== Enums =====

    fn visit_enum(&mut self, enum_type: &M::Enum) -> Result<()> {
        let path = enum_type.path();
        let key = path.full_name();
        if !self.seen_enums.insert(key) {
            return Ok(());
        }

        match M::owner_of(enum_type) {
            Some(owner) => {
                let def = EnumDef {
                    name: path.name().to_string(),
                    values: sorted_values(enum_type)?,
                };
                let owner_key = owner.path().full_name();
                let owner_unvisited = !self.states.contains_key(&owner_key);
                self.pending_enums.push(PendingEnum { owner_key, def });
                if owner_unvisited {
                    self.visit_message(&owner)?;
                }
            }
            None => {
                let def = EnumDef {
                    name: self.namer.reference_name(&path)?,
                    values: sorted_values(enum_type)?,
                };
                self.output.push(Definition::Enum(def));
            }
        }
        Ok(())
    }

    /// Place local enums the owner's own fields never mentioned.
    fn attach_pending_enums(&mut self) -> Result<()> {
        for pending in std::mem::take(&mut self.pending_enums) {
            let slot = self.slots.get(&pending.owner_key).copied().ok_or_else(|| {
                SchemaError::descriptor_unavailable(
                    &pending.owner_key,
                    format!("owner of enum {} was never emitted", pending.def.name),
                )
            })?;
            if let Definition::Message(owner) = &mut self.output[slot] {
                if !owner.declares_enum(&pending.def.name) {
                    owner.body.push(BodyEntry::Enum(pending.def));
                }
            }
        }
        Ok(())
    }

    // ===== Definition Building =====

    fn build_message_def(&mut self, path: &TypePath, fields: &[FieldInfo<M>]) -> Result<MessageDef> {
        let name = self.namer.definition_name(path)?;
        let mut body = Vec::new();
        let mut inlined: HashSet<String> = HashSet::new();

        for group in group_fields(fields) {
            let entry = match &group {
                FieldGroup::Single(field) => BodyEntry::Field(self.field_def(path, field)?),
                FieldGroup::Oneof { index, members } => {
                    let mut oneof_fields = Vec::with_capacity(members.len());
                    for field in members {
                        oneof_fields.push(self.field_def(path, field)?);
                    }
                    BodyEntry::Oneof(OneofDef {
                        index: *index,
                        fields: oneof_fields,
                    })
                }
            };
            body.push(entry);

            for field in group.members() {
                let FieldKind::Enum(enum_type) = &field.kind else {
                    continue;
                };
                if !is_owned_by::<M>(enum_type, path) {
                    continue;
                }
                let enum_path = enum_type.path();
                if inlined.insert(enum_path.full_name()) {
                    body.push(BodyEntry::Enum(EnumDef {
                        name: enum_path.name().to_string(),
                        values: sorted_values(enum_type)?,
                    }));
                }
            }
        }

        Ok(MessageDef { name, body })
    }

    fn field_def(&mut self, parent: &TypePath, field: &FieldInfo<M>) -> Result<FieldDef> {
        let repeated = field.repeated || matches!(field.kind, FieldKind::Map { .. });
        let type_name = match &field.kind {
            FieldKind::Map { .. } => {
                let parent_name = self.namer.definition_name(parent)?;
                let name = entry_name(&parent_name, &field.name);
                self.namer.claim_synthetic(&name, &entry_identity(parent, &field.name))?;
                name
            }
            kind => self.type_reference(kind, parent, &field.name)?,
        };

        Ok(FieldDef {
            name: field.name.clone(),
            type_name,
            number: field.number,
            repeated,
        })
    }

    /// Type name for a non-map field kind, as seen from `context`
    fn type_reference(&mut self, kind: &FieldKind<M>, context: &TypePath, field_name: &str) -> Result<String> {
        match kind {
            FieldKind::Scalar(scalar) => Ok(scalar.keyword().to_string()),
            FieldKind::Message(message) => self.namer.reference_name(&message.path()),
            FieldKind::Enum(enum_type) => self.namer.enum_reference::<M>(enum_type, context),
            FieldKind::Map { .. } => Err(SchemaError::UnsupportedFieldKind {
                field: format!("{}.{}", context.full_name(), field_name),
                kind: "nested map".to_string(),
            }),
        }
    }
}

fn is_owned_by<M: MessageType>(enum_type: &M::Enum, path: &TypePath) -> bool {
    is_local_enum::<M>(enum_type) && M::owner_of(enum_type).map(|owner| owner.path()).as_ref() == Some(path)
}

/// Identity of a synthesized map entry; never equal to a declared type's name
fn entry_identity(parent: &TypePath, field_name: &str) -> String {
    format!("{}#{}", parent.full_name(), field_name)
}

/// Path of a map entry, used only as a naming context for its value type
fn entry_path(parent: &TypePath, parent_name: &str, field_name: &str) -> TypePath {
    let mut nesting = parent.nesting.clone();
    nesting.push(entry_name(parent_name, field_name));
    TypePath::new(parent.package.clone(), nesting)
}

/// Enum values with 0 first, then ascending. Aliases keep declaration order.
fn sorted_values<E: EnumType>(enum_type: &E) -> Result<Vec<EnumValue>> {
    let mut values = enum_type.values()?;
    if !values.iter().any(|value| value.number == 0) {
        return Err(SchemaError::MissingZeroValue {
            enum_name: enum_type.path().full_name(),
        });
    }
    values.sort_by_key(|value| (value.number != 0, value.number));
    Ok(values)
}
