//! Section Tags
//!
//! The first cell of a header line names the section the following data
//! rows belong to. A leading `[]` marks an array section, where every data
//! row appends a new record.

/// Marker prefix shared by array tags and array field expressions.
pub const ARRAY_MARKER: &str = "[]";

/// A named, possibly array-typed, section of a tabular document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub is_array: bool,
}

impl Tag {
    /// Parses a header line's first cell.
    pub fn parse(cell: &str) -> Self {
        match cell.strip_prefix(ARRAY_MARKER) {
            Some(name) => Self {
                name: name.to_string(),
                is_array: true,
            },
            None => Self {
                name: cell.to_string(),
                is_array: false,
            },
        }
    }
}
