//! Cell Value Normalization
//!
//! Classifies a raw cell by its first character:
//!
//! | Prefix | Meaning                                                  |
//! |--------|----------------------------------------------------------|
//! | `#`    | external reference, fetched and then classified again     |
//! | `%`    | internal reference to a section defined later            |
//! | `{`    | inline JSON object                                        |
//! | `[`    | inline JSON array of objects                              |
//! | other  | plain string                                              |

use log::debug;
use serde_json::{Map, Value};

use super::error::WorkflowError;
use crate::resource::{Resource, ResourceFetcher};

const EXTERNAL_REFERENCE_PREFIX: char = '#';
const INTERNAL_REFERENCE_PREFIX: char = '%';
const JSON_OBJECT_PREFIX: char = '{';
const JSON_ARRAY_PREFIX: char = '[';

/// Result of normalizing a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Concrete value to write into the record
    Value(Value),

    /// Name of a section that will be linked in once it is defined
    Reference(String),
}

/// Normalizes raw cell text, fetching external references through `fetcher`.
pub struct ValueNormalizer<'a> {
    fetcher: &'a dyn ResourceFetcher,
}

impl<'a> ValueNormalizer<'a> {
    pub fn new(fetcher: &'a dyn ResourceFetcher) -> Self {
        Self { fetcher }
    }

    /// Normalizes a non-empty cell read from the document at `resource`.
    pub fn normalize(&self, raw: &str, resource: &Resource) -> Result<CellValue, WorkflowError> {
        match raw.strip_prefix(EXTERNAL_REFERENCE_PREFIX) {
            Some(specifier) => {
                let external = resource.resolve(specifier)?;
                debug!("Fetching external value from {}", external);
                let content = self.fetcher.fetch(&external)?;
                classify(content.trim_start())
            }
            None => classify(raw),
        }
    }
}

/// Classifies already fetched text.
fn classify(text: &str) -> Result<CellValue, WorkflowError> {
    if let Some(name) = text.strip_prefix(INTERNAL_REFERENCE_PREFIX) {
        return Ok(CellValue::Reference(name.trim().to_string()));
    }

    if text.starts_with(JSON_OBJECT_PREFIX) {
        let object: Map<String, Value> =
            serde_json::from_str(text).map_err(WorkflowError::Decode)?;
        return Ok(CellValue::Value(Value::Object(object)));
    }

    if text.starts_with(JSON_ARRAY_PREFIX) {
        let items: Vec<Map<String, Value>> =
            serde_json::from_str(text).map_err(WorkflowError::Decode)?;
        return Ok(CellValue::Value(Value::Array(
            items.into_iter().map(Value::Object).collect(),
        )));
    }

    Ok(CellValue::Value(Value::String(text.to_string())))
}
