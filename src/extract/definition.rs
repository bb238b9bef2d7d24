//! Definition List
//!
//! The walker's output: an ordered list of message and enum definitions with
//! every type name already resolved. The emitter renders these without ever
//! touching a descriptor.

use super::descriptor::EnumValue;

/// A top-level schema definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Definition {
    Message(MessageDef),
    Enum(EnumDef),
}

impl Definition {
    pub fn name(&self) -> &str {
        match self {
            Definition::Message(message) => &message.name,
            Definition::Enum(enum_def) => &enum_def.name,
        }
    }

    pub fn as_message(&self) -> Option<&MessageDef> {
        match self {
            Definition::Message(message) => Some(message),
            Definition::Enum(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDef {
    pub name: String,
    pub body: Vec<BodyEntry>,
}

impl MessageDef {
    /// Plain and oneof fields, in body order
    pub fn fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.body.iter().flat_map(|entry| match entry {
            BodyEntry::Field(field) => std::slice::from_ref(field),
            BodyEntry::Oneof(oneof) => oneof.fields.as_slice(),
            BodyEntry::Enum(_) => &[][..],
        })
    }

    pub fn declares_enum(&self, local_name: &str) -> bool {
        self.body
            .iter()
            .any(|entry| matches!(entry, BodyEntry::Enum(e) if e.name == local_name))
    }
}

/// One statement inside a message body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyEntry {
    Field(FieldDef),
    Oneof(OneofDef),
    /// Enum declared inside its owning message
    Enum(EnumDef),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    /// Scalar keyword or canonical type name
    pub type_name: String,
    pub number: u32,
    pub repeated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneofDef {
    /// Position among this message's oneof blocks (`oneof_<index>`)
    pub index: usize,
    pub fields: Vec<FieldDef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDef {
    pub name: String,
    /// Zero value first, then ascending by number
    pub values: Vec<EnumValue>,
}
