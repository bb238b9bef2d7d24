//! Oneof Grouping
//!
//! Collapses the members of each oneof into a single block placed where its
//! first member was declared. Everything else keeps its declared slot.

use std::collections::HashMap;

use super::descriptor::{FieldInfo, MessageType};

/// A field or a oneof block, in body order
#[derive(Debug)]
pub enum FieldGroup<'a, M: MessageType> {
    Single(&'a FieldInfo<M>),
    Oneof {
        /// Sequential block number, by first encounter
        index: usize,
        members: Vec<&'a FieldInfo<M>>,
    },
}

impl<'a, M: MessageType> FieldGroup<'a, M> {
    pub fn members(&self) -> &[&'a FieldInfo<M>] {
        match self {
            FieldGroup::Single(field) => std::slice::from_ref(field),
            FieldGroup::Oneof { members, .. } => members,
        }
    }
}

/// Partition declared fields into standalone fields and oneof blocks.
pub fn group_fields<M: MessageType>(fields: &[FieldInfo<M>]) -> Vec<FieldGroup<'_, M>> {
    let mut groups: Vec<FieldGroup<'_, M>> = Vec::with_capacity(fields.len());
    // oneof index -> position of its block in `groups`
    let mut slots: HashMap<usize, usize> = HashMap::new();
    let mut next_index = 0;

    for field in fields {
        let Some(oneof) = field.oneof_index else {
            groups.push(FieldGroup::Single(field));
            continue;
        };

        match slots.get(&oneof) {
            Some(&slot) => {
                if let FieldGroup::Oneof { members, .. } = &mut groups[slot] {
                    members.push(field);
                }
            }
            None => {
                slots.insert(oneof, groups.len());
                groups.push(FieldGroup::Oneof {
                    index: next_index,
                    members: vec![field],
                });
                next_index += 1;
            }
        }
    }

    groups
}
