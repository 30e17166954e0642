//! Column-to-field binding resolution.
//!
//! Each column is resolved against the record's field table in three passes:
//! explicit tag, canonical underscore form, then underscore-stripped form.
//! Tagged fields only take part in the first pass. A field binds at most one
//! column; a column no field claims is bound to a discard placeholder.

use crate::naming::{normalized_eq, stripped_eq};
use crate::record::FieldDef;
use tracing::trace;

/// Where one column's value goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Index into the record's field table.
    Field(usize),
    /// Read and dropped.
    Discard,
}

/// Bindings for every column of one result, in column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bindings {
    slots: Vec<Binding>,
}

impl Bindings {
    /// Resolves `columns` against `fields`.
    pub fn resolve(columns: &[String], fields: &[FieldDef]) -> Self {
        let mut claimed = vec![false; fields.len()];

        let slots = columns
            .iter()
            .map(|column| match resolve_column(column, fields, &claimed) {
                Some(index) => {
                    claimed[index] = true;
                    Binding::Field(index)
                }
                None => {
                    trace!("column {column:?} has no matching field; discarding");
                    Binding::Discard
                }
            })
            .collect();

        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.slots.iter()
    }

    /// Number of columns bound to a field.
    pub fn bound(&self) -> usize {
        self.slots
            .iter()
            .filter(|b| matches!(b, Binding::Field(_)))
            .count()
    }
}

fn resolve_column(column: &str, fields: &[FieldDef], claimed: &[bool]) -> Option<usize> {
    let lowered = column.to_lowercase();
    unclaimed(fields, claimed)
        .find(|(_, f)| f.tag.is_some_and(|tag| tag.to_lowercase() == lowered))
        .or_else(|| {
            unclaimed(fields, claimed).find(|(_, f)| f.tag.is_none() && normalized_eq(column, f.name))
        })
        .or_else(|| {
            unclaimed(fields, claimed).find(|(_, f)| f.tag.is_none() && stripped_eq(column, f.name))
        })
        .map(|(i, _)| i)
}

fn unclaimed<'f>(
    fields: &'f [FieldDef],
    claimed: &'f [bool],
) -> impl Iterator<Item = (usize, &'f FieldDef)> + 'f {
    fields.iter().enumerate().filter(move |(i, _)| !claimed[*i])
}
