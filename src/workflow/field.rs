//! Field Expressions
//!
//! A data column header describes where a cell value lands inside the
//! record being built. The grammar is small:
//!
//! - `name` writes `name` directly into the record
//! - `a.b.c` descends through (lazily created) mappings `a` and `a.b`
//! - `[]a.b` treats `a` as an array and descends into one of its slots
//! - `[]a` writes `a` into the mapping held by one slot of array `a`
//!
//! Each array node consumes the next index of the `indexes` passed to
//! [`FieldExpression::set`], so a column can address several nested
//! arrays at once.

use serde_json::{Map, Value};

use super::tag::ARRAY_MARKER;

/// Parsed column header describing a nested write path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldExpression {
    /// Field name of this node (without the array marker)
    pub field: String,

    /// True when this node itself is an array slot (`[]` prefix)
    pub is_array: bool,

    /// True when a `.` follows the field name
    pub has_sub_path: bool,

    /// True when `[]` appears anywhere in the expression, enabling
    /// multi-line capture of the column
    pub has_array_component: bool,

    /// Remainder of the path after the first `.`
    pub child: Option<Box<FieldExpression>>,
}

impl FieldExpression {
    /// Parses a column header. Any text is accepted.
    pub fn parse(expression: &str) -> Self {
        let has_array_component = expression.contains(ARRAY_MARKER);
        let (is_array, path) = match expression.strip_prefix(ARRAY_MARKER) {
            Some(rest) => (true, rest),
            None => (false, expression),
        };

        match path.split_once('.') {
            Some((field, sub_path)) => Self {
                field: field.to_string(),
                is_array,
                has_sub_path: true,
                has_array_component,
                child: Some(Box::new(Self::parse(sub_path))),
            },
            None => Self {
                field: path.to_string(),
                is_array,
                has_sub_path: false,
                has_array_component,
                child: None,
            },
        }
    }

    /// Writes `value` at this path, rooted at `target`.
    ///
    /// Missing containers are created on the way down. Arrays only ever
    /// grow, padded with empty mappings. The final write replaces any
    /// existing value.
    pub fn set(&self, value: Value, target: &mut Map<String, Value>, indexes: &[usize]) {
        if self.is_array {
            let (index, rest) = match indexes.split_first() {
                Some((index, rest)) => (*index, rest),
                None => (0, indexes),
            };
            let entry = target
                .entry(self.field.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
            let items = as_array(entry);
            if items.len() <= index {
                items.resize_with(index + 1, || Value::Object(Map::new()));
            }
            let slot = as_object(&mut items[index]);
            match &self.child {
                Some(child) => child.set(value, slot, rest),
                None => {
                    slot.insert(self.field.clone(), value);
                }
            }
            return;
        }

        match &self.child {
            Some(child) => {
                let entry = target
                    .entry(self.field.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                child.set(value, as_object(entry), indexes);
            }
            None => {
                target.insert(self.field.clone(), value);
            }
        }
    }
}

/// Returns the mapping held by `value`, replacing any other kind of value.
fn as_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was replaced by an object"),
    }
}

/// Returns the array held by `value`, replacing any other kind of value.
fn as_array(value: &mut Value) -> &mut Vec<Value> {
    if !value.is_array() {
        *value = Value::Array(Vec::new());
    }
    match value {
        Value::Array(items) => items,
        _ => unreachable!("value was replaced by an array"),
    }
}
