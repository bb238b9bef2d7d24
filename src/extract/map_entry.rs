//! Map Entry Synthesis
//!
//! On the wire a `map<K, V>` field is a repeated message with `key = 1` and
//! `value = 2`. Schemas spell that message out explicitly so the extracted
//! text describes exactly what travels over the wire.

use super::definition::{BodyEntry, FieldDef, MessageDef};
use super::descriptor::ScalarKind;

/// Name of the entry message for `field_name` declared in `parent`
pub fn entry_name(parent_canonical_name: &str, field_name: &str) -> String {
    format!("{}_{}Entry", parent_canonical_name, pascal_case(field_name))
}

/// Build the entry message for a map field.
///
/// `value_type` is the already-resolved scalar keyword or type name.
pub fn synthesize_entry(
    parent_canonical_name: &str,
    field_name: &str,
    key: ScalarKind,
    value_type: &str,
) -> MessageDef {
    MessageDef {
        name: entry_name(parent_canonical_name, field_name),
        body: vec![
            BodyEntry::Field(FieldDef {
                name: "key".to_string(),
                type_name: key.keyword().to_string(),
                number: 1,
                repeated: false,
            }),
            BodyEntry::Field(FieldDef {
                name: "value".to_string(),
                type_name: value_type.to_string(),
                number: 2,
                repeated: false,
            }),
        ],
    }
}

/// protoc's map-entry casing: upper-case the first character and every
/// character following an underscore, dropping the underscores.
pub fn pascal_case(field_name: &str) -> String {
    let mut result = String::with_capacity(field_name.len());
    let mut capitalize_next = true;

    for c in field_name.chars() {
        if c == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            result.push(c.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }

    result
}
