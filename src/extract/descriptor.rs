//! Descriptor Capability Layer
//!
//! The canonicalization algorithm never talks to a reflection library
//! directly. It sees message and enum types only through the two traits in
//! this module:
//! - [`MessageType`]: type path, ordered fields, owner lookup for enums
//! - [`EnumType`]: type path, declared values
//!
//! The `prost-reflect` descriptors implement both, which is what the rest of
//! the crate uses. Tests plug in hand-built descriptor graphs the same way.

use std::fmt::Debug;

use prost_reflect::{EnumDescriptor, FieldDescriptor, Kind, MessageDescriptor, OneofDescriptor};

use crate::error::{Result, SchemaError};

// =============================================================================
// Type Path
// =============================================================================

/// Location of a type: its package plus the outer-to-inner nesting segments,
/// ending with the type's own name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypePath {
    pub package: String,
    pub nesting: Vec<String>,
}

impl TypePath {
    pub fn new(package: impl Into<String>, nesting: Vec<String>) -> Self {
        Self {
            package: package.into(),
            nesting,
        }
    }

    /// Split a fully-qualified name (`pkg.Outer.Inner`) given its package.
    pub fn from_full_name(package: &str, full_name: &str) -> Self {
        let relative = if package.is_empty() {
            full_name
        } else {
            full_name
                .strip_prefix(package)
                .and_then(|rest| rest.strip_prefix('.'))
                .unwrap_or(full_name)
        };

        Self {
            package: package.to_string(),
            nesting: relative.split('.').map(String::from).collect(),
        }
    }

    /// Fully-qualified dotted name; also serves as the type's identity.
    pub fn full_name(&self) -> String {
        let relative = self.nesting.join(".");
        if self.package.is_empty() {
            relative
        } else {
            format!("{}.{}", self.package, relative)
        }
    }

    /// The type's own (innermost) name
    pub fn name(&self) -> &str {
        self.nesting.last().map(String::as_str).unwrap_or_default()
    }
}

// =============================================================================
// Field Model
// =============================================================================

/// Scalar field kinds, rendered with their proto3 keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
}

impl ScalarKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            ScalarKind::Double => "double",
            ScalarKind::Float => "float",
            ScalarKind::Int32 => "int32",
            ScalarKind::Int64 => "int64",
            ScalarKind::Uint32 => "uint32",
            ScalarKind::Uint64 => "uint64",
            ScalarKind::Sint32 => "sint32",
            ScalarKind::Sint64 => "sint64",
            ScalarKind::Fixed32 => "fixed32",
            ScalarKind::Fixed64 => "fixed64",
            ScalarKind::Sfixed32 => "sfixed32",
            ScalarKind::Sfixed64 => "sfixed64",
            ScalarKind::Bool => "bool",
            ScalarKind::String => "string",
            ScalarKind::Bytes => "bytes",
        }
    }
}

/// What a field holds
#[derive(Debug, Clone)]
pub enum FieldKind<M: MessageType> {
    Scalar(ScalarKind),
    Message(M),
    Enum(M::Enum),
    /// `map<K, V>`; the value is never itself a map
    Map {
        key: ScalarKind,
        value: Box<FieldKind<M>>,
    },
}

/// One declared field of a message
#[derive(Debug, Clone)]
pub struct FieldInfo<M: MessageType> {
    pub name: String,
    pub number: u32,
    pub kind: FieldKind<M>,
    /// Repeated (list) cardinality; map fields report `false`
    pub repeated: bool,
    /// Index of the (non-synthetic) oneof this field belongs to
    pub oneof_index: Option<usize>,
}

/// A declared enum value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub name: String,
    pub number: i32,
}

// =============================================================================
// Capability Traits
// =============================================================================

/// Structural view of a message type.
pub trait MessageType: Clone + Debug + Sized {
    type Enum: EnumType;

    fn path(&self) -> TypePath;

    /// Fields in declaration order
    fn fields(&self) -> Result<Vec<FieldInfo<Self>>>;

    /// The message an enum is nested in, if any
    fn owner_of(enum_type: &Self::Enum) -> Option<Self>;
}

/// Structural view of an enum type.
pub trait EnumType: Clone + Debug {
    fn path(&self) -> TypePath;

    /// Values in declaration order
    fn values(&self) -> Result<Vec<EnumValue>>;
}

// =============================================================================
// prost-reflect
// =============================================================================

impl MessageType for MessageDescriptor {
    type Enum = EnumDescriptor;

    fn path(&self) -> TypePath {
        TypePath::from_full_name(self.package_name(), self.full_name())
    }

    fn fields(&self) -> Result<Vec<FieldInfo<Self>>> {
        let oneofs: Vec<String> = self
            .oneofs()
            .filter(|oneof| !is_synthetic_oneof(oneof))
            .map(|oneof| oneof.name().to_string())
            .collect();

        self.fields()
            .map(|field| {
                let oneof_index = field
                    .containing_oneof()
                    .filter(|oneof| !is_synthetic_oneof(oneof))
                    .and_then(|oneof| oneofs.iter().position(|name| name == oneof.name()));

                Ok(FieldInfo {
                    name: field.name().to_string(),
                    number: field.number(),
                    kind: reflect_field_kind(&field)?,
                    repeated: field.is_list(),
                    oneof_index,
                })
            })
            .collect()
    }

    fn owner_of(enum_type: &EnumDescriptor) -> Option<Self> {
        enum_type.parent_message()
    }
}

impl EnumType for EnumDescriptor {
    fn path(&self) -> TypePath {
        TypePath::from_full_name(self.package_name(), self.full_name())
    }

    /// Read from the descriptor proto; `EnumDescriptor::values` is sorted by number.
    fn values(&self) -> Result<Vec<EnumValue>> {
        Ok(self
            .enum_descriptor_proto()
            .value
            .iter()
            .map(|value| EnumValue {
                name: value.name().to_string(),
                number: value.number(),
            })
            .collect())
    }
}

/// A proto3 `optional` field sits alone in a compiler-generated oneof.
fn is_synthetic_oneof(oneof: &OneofDescriptor) -> bool {
    oneof
        .fields()
        .any(|field| field.field_descriptor_proto().proto3_optional())
}

fn reflect_field_kind(field: &FieldDescriptor) -> Result<FieldKind<MessageDescriptor>> {
    if field.is_group() {
        return Err(SchemaError::UnsupportedFieldKind {
            field: field.full_name().to_string(),
            kind: "group".to_string(),
        });
    }

    if !field.is_map() {
        return Ok(reflect_kind(field.kind()));
    }

    let Kind::Message(entry) = field.kind() else {
        return Err(SchemaError::descriptor_unavailable(
            field.full_name(),
            "map field does not reference an entry message",
        ));
    };

    let key_field = entry.get_field(1).ok_or_else(|| {
        SchemaError::descriptor_unavailable(entry.full_name(), "map entry has no key field")
    })?;
    let value_field = entry.get_field(2).ok_or_else(|| {
        SchemaError::descriptor_unavailable(entry.full_name(), "map entry has no value field")
    })?;

    let FieldKind::Scalar(key) = reflect_kind(key_field.kind()) else {
        return Err(SchemaError::UnsupportedFieldKind {
            field: field.full_name().to_string(),
            kind: "non-scalar map key".to_string(),
        });
    };

    Ok(FieldKind::Map {
        key,
        value: Box::new(reflect_kind(value_field.kind())),
    })
}

fn reflect_kind(kind: Kind) -> FieldKind<MessageDescriptor> {
    match kind {
        Kind::Double => FieldKind::Scalar(ScalarKind::Double),
        Kind::Float => FieldKind::Scalar(ScalarKind::Float),
        Kind::Int32 => FieldKind::Scalar(ScalarKind::Int32),
        Kind::Int64 => FieldKind::Scalar(ScalarKind::Int64),
        Kind::Uint32 => FieldKind::Scalar(ScalarKind::Uint32),
        Kind::Uint64 => FieldKind::Scalar(ScalarKind::Uint64),
        Kind::Sint32 => FieldKind::Scalar(ScalarKind::Sint32),
        Kind::Sint64 => FieldKind::Scalar(ScalarKind::Sint64),
        Kind::Fixed32 => FieldKind::Scalar(ScalarKind::Fixed32),
        Kind::Fixed64 => FieldKind::Scalar(ScalarKind::Fixed64),
        Kind::Sfixed32 => FieldKind::Scalar(ScalarKind::Sfixed32),
        Kind::Sfixed64 => FieldKind::Scalar(ScalarKind::Sfixed64),
        Kind::Bool => FieldKind::Scalar(ScalarKind::Bool),
        Kind::String => FieldKind::Scalar(ScalarKind::String),
        Kind::Bytes => FieldKind::Scalar(ScalarKind::Bytes),
        Kind::Message(message) => FieldKind::Message(message),
        Kind::Enum(enum_type) => FieldKind::Enum(enum_type),
    }
}
