//! Schema Compatibility Rules
//!
//! Validates a submitted schema on its own and against the latest schema of
//! its topic. Problems are collected as human-readable strings; they are
//! data for the caller, not errors.

use std::collections::{BTreeSet, HashSet};

use prost_reflect::{DescriptorPool, FieldDescriptor, Kind, MessageDescriptor};

use crate::compile::{compile_text, find_message};
use crate::extract::{PACKAGE, ROOT_NAME};

/// Outcome of validating one submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompatibilityReport {
    /// Reasons the submission must be rejected
    pub errors: Vec<String>,
    /// Accepted changes worth logging (added fields, added or dropped messages)
    pub warnings: Vec<String>,
}

impl CompatibilityReport {
    pub fn is_compatible(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Checks submissions for validity and breaking changes.
pub struct CompatibilityChecker;

impl CompatibilityChecker {
    /// Validate `new` bytes, and compare with `latest` when the topic has one.
    pub fn check(latest: Option<&[u8]>, new: &[u8]) -> CompatibilityReport {
        let mut report = CompatibilityReport::default();

        let new_pool = match Self::parse(new) {
            Ok(pool) => pool,
            Err(reason) => {
                report.errors.push(reason);
                return report;
            }
        };

        let root_name = format!("{}.{}", PACKAGE, ROOT_NAME);
        if find_message(&new_pool, &root_name).is_err() {
            report
                .errors
                .push(format!("Schema does not declare root message '{}'", root_name));
            return report;
        }

        let Some(latest) = latest else {
            return report;
        };

        match Self::parse(latest) {
            Ok(latest_pool) => Self::check_backward(&latest_pool, &new_pool, &mut report),
            Err(reason) => report
                .errors
                .push(format!("Failed to parse existing schema: {}", reason)),
        }

        report
    }

    fn parse(bytes: &[u8]) -> Result<DescriptorPool, String> {
        let text = std::str::from_utf8(bytes).map_err(|e| format!("Schema is not valid UTF-8: {}", e))?;
        match compile_text(text) {
            Ok(pool) => Ok(pool),
            Err(e) => {
                let reason = format!("Schema does not compile: {}", e);
                let aliased = alias_root_reference(text).ok_or_else(|| reason.clone())?;
                compile_text(&aliased).map_err(|_| reason)
            }
        }
    }

    /// New schema must still read data written with the latest one.
    fn check_backward(latest: &DescriptorPool, new: &DescriptorPool, report: &mut CompatibilityReport) {
        for old_message in latest.all_messages().filter(in_schema_package) {
            let Some(new_message) = new.get_message_by_name(old_message.full_name()) else {
                report
                    .warnings
                    .push(format!("Message '{}' was removed", old_message.full_name()));
                continue;
            };

            for old_field in old_message.fields() {
                match new_message.get_field(old_field.number()) {
                    None => report.errors.push(format!(
                        "Message '{}' field '{}' (number {}) was removed",
                        old_message.full_name(),
                        old_field.name(),
                        old_field.number()
                    )),
                    Some(new_field) => compare_fields(&old_message, &old_field, &new_field, report),
                }
            }

            for new_field in new_message.fields() {
                if old_message.get_field(new_field.number()).is_none() {
                    report.warnings.push(format!(
                        "Message '{}' field '{}' (number {}) was added",
                        new_message.full_name(),
                        new_field.name(),
                        new_field.number()
                    ));
                }
            }
        }

        for new_message in new.all_messages().filter(in_schema_package) {
            if latest.get_message_by_name(new_message.full_name()).is_none() {
                report
                    .warnings
                    .push(format!("Message '{}' was added", new_message.full_name()));
            }
        }
    }
}

const SCALAR_TYPES: [&str; 15] = [
    "double", "float", "int32", "int64", "uint32", "uint64", "sint32", "sint64", "fixed32",
    "fixed64", "sfixed32", "sfixed64", "bool", "string", "bytes",
];

/// Extracted text refers back to the root by its path-derived name, which no
/// message declares. When exactly one undeclared name is used as a field type,
/// return the text with that name read as the root.
fn alias_root_reference(text: &str) -> Option<String> {
    let mut declared = HashSet::new();
    let mut used = BTreeSet::new();

    for line in text.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            ["message" | "enum", name, ..] => {
                declared.insert(name.trim_end_matches('{'));
            }
            _ => used.extend(field_type(&tokens)),
        }
    }

    let mut undeclared = used
        .into_iter()
        .filter(|name| !declared.contains(name) && !SCALAR_TYPES.contains(name));
    let root_reference = undeclared.next()?;
    if undeclared.next().is_some() {
        return None;
    }

    let aliased = text
        .lines()
        .map(|line| {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if field_type(&tokens) == Some(root_reference) {
                line.replacen(root_reference, ROOT_NAME, 1)
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    Some(aliased)
}

/// Type of a `[repeated] <type> <name> = <number>;` line, for plain identifiers
fn field_type<'a>(tokens: &[&'a str]) -> Option<&'a str> {
    let tokens = match tokens {
        ["repeated" | "optional", rest @ ..] => rest,
        _ => tokens,
    };
    match tokens {
        [type_name, _, "=", ..] if *type_name != "option" && is_identifier(type_name) => Some(*type_name),
        _ => None,
    }
}

fn is_identifier(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn compare_fields(
    message: &MessageDescriptor,
    old_field: &FieldDescriptor,
    new_field: &FieldDescriptor,
    report: &mut CompatibilityReport,
) {
    let number = old_field.number();

    if old_field.name() != new_field.name() {
        report.errors.push(format!(
            "Message '{}' field {} was renamed from '{}' to '{}'",
            message.full_name(),
            number,
            old_field.name(),
            new_field.name()
        ));
    }

    let (old_type, new_type) = (type_label(&old_field.kind()), type_label(&new_field.kind()));
    if old_type != new_type {
        report.errors.push(format!(
            "Message '{}' field {} type changed from {} to {}",
            message.full_name(),
            number,
            old_type,
            new_type
        ));
    }

    let (old_card, new_card) = (cardinality(old_field), cardinality(new_field));
    if old_card != new_card {
        report.errors.push(format!(
            "Message '{}' field {} cardinality changed from {} to {}",
            message.full_name(),
            number,
            old_card,
            new_card
        ));
    }
}

fn in_schema_package(message: &MessageDescriptor) -> bool {
    message.package_name() == PACKAGE
}

fn cardinality(field: &FieldDescriptor) -> &'static str {
    if field.is_map() {
        "map"
    } else if field.is_list() {
        "repeated"
    } else {
        "singular"
    }
}

fn type_label(kind: &Kind) -> String {
    match kind {
        Kind::Double => "double".to_string(),
        Kind::Float => "float".to_string(),
        Kind::Int32 => "int32".to_string(),
        Kind::Int64 => "int64".to_string(),
        Kind::Uint32 => "uint32".to_string(),
        Kind::Uint64 => "uint64".to_string(),
        Kind::Sint32 => "sint32".to_string(),
        Kind::Sint64 => "sint64".to_string(),
        Kind::Fixed32 => "fixed32".to_string(),
        Kind::Fixed64 => "fixed64".to_string(),
        Kind::Sfixed32 => "sfixed32".to_string(),
        Kind::Sfixed64 => "sfixed64".to_string(),
        Kind::Bool => "bool".to_string(),
        Kind::String => "string".to_string(),
        Kind::Bytes => "bytes".to_string(),
        Kind::Message(message) => message.full_name().to_string(),
        Kind::Enum(enum_type) => enum_type.full_name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "syntax = \"proto3\";
package gen;
message v1_Item {
\tstring name = 1;
}
message record {
\tint64 id = 1;
\tv1_Item item = 2;
}
";

    #[test]
    fn test_first_version_accepted() {
        let report = CompatibilityChecker::check(None, BASE.as_bytes());
        assert!(report.is_compatible(), "{:?}", report.errors);
    }

    #[test]
    fn test_non_utf8_rejected() {
        let report = CompatibilityChecker::check(None, &[0x9, 0xff, 0x5]);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("UTF-8"));
    }

    #[test]
    fn test_garbage_rejected() {
        let report = CompatibilityChecker::check(None, b"not a schema");
        assert!(report.errors[0].starts_with("Schema does not compile"));
    }

    const RECURSIVE: &str = "syntax = \"proto3\";
package gen;
message record {
\toneof oneof_0 {
\t\tv1_ArrayValue array_value = 1;
\t\tstring string_value = 2;
\t}
}
message v1_ArrayValue {
\trepeated v1_AnyValue values = 1;
}
";

    #[test]
    fn test_back_reference_to_root_accepted() {
        let report = CompatibilityChecker::check(None, RECURSIVE.as_bytes());
        assert!(report.is_compatible(), "{:?}", report.errors);

        let report = CompatibilityChecker::check(Some(RECURSIVE.as_bytes()), RECURSIVE.as_bytes());
        assert!(report.is_compatible(), "{:?}", report.errors);
    }

    #[test]
    fn test_second_undeclared_type_rejected() {
        let broken = RECURSIVE.replace("\tstring string_value = 2;", "\tv1_Missing missing = 2;");
        let report = CompatibilityChecker::check(None, broken.as_bytes());
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("Schema does not compile"));
    }

    #[test]
    fn test_field_type_tokens() {
        assert_eq!(field_type(&["repeated", "v1_AnyValue", "values", "=", "1;"]), Some("v1_AnyValue"));
        assert_eq!(field_type(&["record.Status", "value", "=", "2;"]), None);
        assert_eq!(field_type(&["option", "allow_alias", "=", "true;"]), None);
        assert_eq!(field_type(&["UNKNOWN", "=", "0;"]), None);
    }

    #[test]
    fn test_missing_root_rejected() {
        let report = CompatibilityChecker::check(None, b"syntax = \"proto3\";\npackage gen;\nmessage other {}\n");
        assert_eq!(report.errors, vec!["Schema does not declare root message 'gen.record'"]);
    }

    #[test]
    fn test_added_field_accepted() {
        let next = BASE.replace("\tv1_Item item = 2;\n", "\tv1_Item item = 2;\n\tbool active = 3;\n");
        let report = CompatibilityChecker::check(Some(BASE.as_bytes()), next.as_bytes());
        assert!(report.is_compatible(), "{:?}", report.errors);
        assert_eq!(report.warnings, vec!["Message 'gen.record' field 'active' (number 3) was added"]);
    }

    #[test]
    fn test_removed_field_rejected() {
        let next = BASE.replace("\tv1_Item item = 2;\n", "");
        let report = CompatibilityChecker::check(Some(BASE.as_bytes()), next.as_bytes());
        assert_eq!(
            report.errors,
            vec!["Message 'gen.record' field 'item' (number 2) was removed"]
        );
    }

    #[test]
    fn test_type_and_cardinality_changes_rejected() {
        let next = BASE
            .replace("\tint64 id = 1;", "\tstring id = 1;")
            .replace("\tstring name = 1;", "\trepeated string name = 1;");
        let report = CompatibilityChecker::check(Some(BASE.as_bytes()), next.as_bytes());
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors.iter().any(|e| e.contains("type changed from int64 to string")));
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("cardinality changed from singular to repeated")));
    }

    #[test]
    fn test_renamed_field_rejected() {
        let next = BASE.replace("\tint64 id = 1;", "\tint64 key = 1;");
        let report = CompatibilityChecker::check(Some(BASE.as_bytes()), next.as_bytes());
        assert_eq!(
            report.errors,
            vec!["Message 'gen.record' field 1 was renamed from 'id' to 'key'"]
        );
    }
}
