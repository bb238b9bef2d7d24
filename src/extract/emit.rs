//! Text Emitter
//!
//! Renders a definition list as proto3 text. Pure formatting: every name is
//! already resolved, so identical definition lists give identical bytes.

use super::definition::{BodyEntry, Definition, EnumDef, FieldDef, MessageDef};
use super::PACKAGE;

const INDENT: &str = "\t";

/// Render definitions in order under the fixed header.
pub fn render(definitions: &[Definition]) -> String {
    let mut output = String::new();

    output.push_str("syntax = \"proto3\";\n");
    output.push_str(&format!("package {};\n", PACKAGE));

    for definition in definitions {
        match definition {
            Definition::Message(message) => render_message(&mut output, message),
            Definition::Enum(enum_def) => render_enum(&mut output, enum_def, 0),
        }
    }

    output
}

fn render_message(output: &mut String, message: &MessageDef) {
    output.push_str(&format!("message {} {{\n", message.name));

    for entry in &message.body {
        match entry {
            BodyEntry::Field(field) => render_field(output, field, 1),
            BodyEntry::Oneof(oneof) => {
                output.push_str(&format!("{}oneof oneof_{} {{\n", INDENT, oneof.index));
                for field in &oneof.fields {
                    render_field(output, field, 2);
                }
                output.push_str(&format!("{}}}\n", INDENT));
            }
            BodyEntry::Enum(enum_def) => render_enum(output, enum_def, 1),
        }
    }

    output.push_str("}\n");
}

fn render_field(output: &mut String, field: &FieldDef, depth: usize) {
    let label = if field.repeated { "repeated " } else { "" };
    output.push_str(&format!(
        "{}{}{} {} = {};\n",
        INDENT.repeat(depth),
        label,
        field.type_name,
        field.name,
        field.number
    ));
}

fn render_enum(output: &mut String, enum_def: &EnumDef, depth: usize) {
    let indent = INDENT.repeat(depth);
    output.push_str(&format!("{}enum {} {{\n", indent, enum_def.name));
    if has_aliases(enum_def) {
        output.push_str(&format!("{}{}option allow_alias = true;\n", indent, INDENT));
    }
    for value in &enum_def.values {
        output.push_str(&format!("{}{}{} = {};\n", indent, INDENT, value.name, value.number));
    }
    output.push_str(&format!("{}}}\n", indent));
}

/// Values sharing a number only compile with `allow_alias`
fn has_aliases(enum_def: &EnumDef) -> bool {
    enum_def
        .values
        .windows(2)
        .any(|pair| pair[0].number == pair[1].number)
}
