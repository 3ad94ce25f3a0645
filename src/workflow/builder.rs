//! Document Builder
//!
//! Turns the lines of a tabular workflow file into a nested document in a
//! single forward scan.
//!
//! # Format
//!
//! ```text
//! // comment
//! import shared/common.csv
//! Workflow,Name,Tasks
//! ,deploy,%Tasks
//! []Tasks,Name,[]Args
//! ,build,-v
//! ,,-x
//! ```
//!
//! - a line starting with a letter (or `[` for array tags) is a header: its
//!   first cell is the section tag, the other cells are field expressions
//! - other lines are data rows decoded against the last header
//! - `%name` links the section `name` defined further down
//! - a column containing `[]` keeps reading values from the following lines
//!   until its cell is empty
//!
//! The first tag is the root section and becomes the parsed document.

use std::collections::HashMap;

use log::{debug, warn};
use serde_json::{Map, Value};

use super::error::WorkflowError;
use super::field::FieldExpression;
use super::references::{RecordLocation, ReferenceRegistry};
use super::tag::Tag;
use super::value::{CellValue, ValueNormalizer};
use crate::resource::{Resource, ResourceFetcher, RowTokenizer};

const IMPORT_PREFIX: &str = "import";
const COMMENT_PREFIX: &str = "//";

/// Handles `import` lines found while building a document.
pub trait ImportHandler {
    /// Loads the workflow named by `specifier`, relative to `document`,
    /// and registers it.
    fn import(&mut self, document: &Resource, specifier: &str) -> Result<(), WorkflowError>;
}

/// Kind of a document line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind<'l> {
    Blank,
    Import(&'l str),
    Comment,
    Header,
    Data,
}

fn classify_line(line: &str) -> LineKind<'_> {
    if line.trim().is_empty() {
        return LineKind::Blank;
    }
    if let Some(rest) = line.strip_prefix(IMPORT_PREFIX) {
        if rest.starts_with(char::is_whitespace) {
            return LineKind::Import(rest.trim());
        }
    }
    if line.starts_with(COMMENT_PREFIX) {
        return LineKind::Comment;
    }
    match line.chars().next() {
        Some(c) if c.is_ascii_alphabetic() || c == '[' => LineKind::Header,
        _ => LineKind::Data,
    }
}

/// Scan state for one document. Build a new instance per document.
pub struct DocumentBuilder<'a> {
    resource: &'a Resource,
    normalizer: ValueNormalizer<'a>,
    tokenizer: RowTokenizer,
    sections: HashMap<String, Value>,
    references: ReferenceRegistry,
    root_tag: Option<String>,
    tag: Option<Tag>,
    columns: Vec<String>,
}

impl<'a> DocumentBuilder<'a> {
    /// Creates a builder for the document stored at `resource`.
    ///
    /// `fetcher` serves external (`#path`) cell references.
    pub fn new(resource: &'a Resource, fetcher: &'a dyn ResourceFetcher) -> Self {
        Self {
            resource,
            normalizer: ValueNormalizer::new(fetcher),
            tokenizer: RowTokenizer::default(),
            sections: HashMap::new(),
            references: ReferenceRegistry::new(),
            root_tag: None,
            tag: None,
            columns: Vec::new(),
        }
    }

    pub fn with_tokenizer(mut self, tokenizer: RowTokenizer) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Scans `lines` and returns the root section.
    pub fn build<S: AsRef<str>>(
        mut self,
        lines: &[S],
        imports: &mut dyn ImportHandler,
    ) -> Result<Map<String, Value>, WorkflowError> {
        let lines: Vec<&str> = lines.iter().map(|line| line.as_ref()).collect();

        let mut index = 0;
        while index < lines.len() {
            let line = lines[index];
            let line_number = index + 1;

            match classify_line(line) {
                LineKind::Blank | LineKind::Comment => {}
                LineKind::Import(specifier) => {
                    debug!("Importing {} (line {})", specifier, line_number);
                    imports
                        .import(self.resource, specifier)
                        .map_err(|e| WorkflowError::import(specifier, &self.resource.url, e))?;
                }
                LineKind::Header => self.process_header(line, line_number)?,
                LineKind::Data => {
                    index += self.process_data(&lines, index)?;
                }
            }
            index += 1;
        }

        self.finish()
    }

    /// Activates the tag of a header line, creating its section on first sight.
    fn process_header(&mut self, line: &str, line_number: usize) -> Result<(), WorkflowError> {
        let columns = self.tokenizer.header(line, line_number)?;
        let tag = Tag::parse(columns.first().map(String::as_str).unwrap_or_default());

        if self.sections.contains_key(&tag.name) {
            debug!("Section {} continues (line {})", tag.name, line_number);
        } else if self.root_tag.is_none() {
            if tag.is_array {
                return Err(WorkflowError::ArrayRoot(tag.name));
            }
            debug!("Root section {} (line {})", tag.name, line_number);
            self.root_tag = Some(tag.name.clone());
            self.sections
                .insert(tag.name.clone(), Value::Object(Map::new()));
        } else {
            if !self.references.resolve(&tag.name) {
                return Err(WorkflowError::MissingReference {
                    name: tag.name,
                    line: line_number,
                });
            }
            self.reserve_link(&tag.name);
            debug!("Section {} created (line {})", tag.name, line_number);
            let container = if tag.is_array {
                Value::Array(Vec::new())
            } else {
                Value::Object(Map::new())
            };
            self.sections.insert(tag.name.clone(), container);
        }

        self.tag = Some(tag);
        self.columns = columns;
        Ok(())
    }

    /// Puts a placeholder under the referencing field so the linked section
    /// keeps the position the header gave it.
    fn reserve_link(&mut self, name: &str) {
        let Some(reference) = self.references.get(name) else {
            return;
        };
        if let Some(target) = record_mut(&mut self.sections, &reference.location) {
            FieldExpression::parse(&reference.field).set(Value::Null, target, &[]);
        }
    }

    /// Writes one data row into the active section.
    ///
    /// Returns the number of following lines consumed by multi-line capture.
    fn process_data(&mut self, lines: &[&str], index: usize) -> Result<usize, WorkflowError> {
        let line_number = index + 1;
        let Some(tag) = &self.tag else {
            warn!("Ignoring line {} before the first header", line_number);
            return Ok(0);
        };

        let record = self
            .tokenizer
            .decode(lines[index], &self.columns, line_number)?;
        if record.is_empty() {
            return Ok(0);
        }

        let location = open_record(&mut self.sections, tag);
        let mut height = 0;

        for (column_index, column) in self.columns.iter().enumerate().skip(1) {
            let raw = record.value(column_index);
            if column.is_empty() || raw.is_empty() {
                continue;
            }

            let field = FieldExpression::parse(column);
            match self.normalizer.normalize(raw, self.resource)? {
                CellValue::Reference(name) => {
                    self.references
                        .register(&name, location.clone(), column, line_number)?;
                }
                CellValue::Value(value) => {
                    let captured = if field.has_array_component {
                        capture_column(&self.tokenizer, &self.columns, lines, index, column_index)?
                    } else {
                        Vec::new()
                    };
                    if let Some(target) = record_mut(&mut self.sections, &location) {
                        field.set(value, target, &[]);
                        for (offset, item) in captured.iter().enumerate() {
                            field.set(Value::String(item.clone()), target, &[offset + 1]);
                        }
                    }
                    if !captured.is_empty() {
                        debug!(
                            "Captured {} extra values for {} (line {})",
                            captured.len(),
                            column,
                            line_number
                        );
                    }
                    height = height.max(captured.len());
                }
            }
        }

        Ok(height)
    }

    /// Verifies every reference fired and links the sections into the root.
    fn finish(mut self) -> Result<Map<String, Value>, WorkflowError> {
        self.references.check_all_resolved()?;

        let Some(root) = self.root_tag.take() else {
            return Ok(Map::new());
        };
        match assemble(&mut self.sections, &self.references, &root) {
            Value::Object(document) => Ok(document),
            _ => Ok(Map::new()),
        }
    }
}

/// Selects the record a data row writes into, appending one for array sections.
fn open_record(sections: &mut HashMap<String, Value>, tag: &Tag) -> RecordLocation {
    let index = match sections.get_mut(&tag.name) {
        Some(Value::Array(items)) => {
            items.push(Value::Object(Map::new()));
            Some(items.len() - 1)
        }
        _ => None,
    };
    RecordLocation {
        section: tag.name.clone(),
        index,
    }
}

fn record_mut<'s>(
    sections: &'s mut HashMap<String, Value>,
    location: &RecordLocation,
) -> Option<&'s mut Map<String, Value>> {
    let section = sections.get_mut(&location.section)?;
    match location.index {
        Some(index) => section.get_mut(index)?.as_object_mut(),
        None => section.as_object_mut(),
    }
}

/// Reads the values of one column from the data lines following `index`,
/// up to the first empty cell.
fn capture_column(
    tokenizer: &RowTokenizer,
    columns: &[String],
    lines: &[&str],
    index: usize,
    column_index: usize,
) -> Result<Vec<String>, WorkflowError> {
    let mut values = Vec::new();
    for (offset, line) in lines.iter().enumerate().skip(index + 1) {
        if classify_line(line) != LineKind::Data {
            break;
        }
        let record = tokenizer.decode(line, columns, offset + 1)?;
        let value = record.value(column_index);
        if value.is_empty() {
            break;
        }
        values.push(value.to_string());
    }
    Ok(values)
}

/// Takes section `name` and writes every section it references into it.
fn assemble(
    sections: &mut HashMap<String, Value>,
    references: &ReferenceRegistry,
    name: &str,
) -> Value {
    let mut container = sections.remove(name).unwrap_or(Value::Null);
    for reference in references.resolved_in(name) {
        let child = assemble(sections, references, &reference.name);
        let target = match reference.location.index {
            Some(index) => container.get_mut(index).and_then(Value::as_object_mut),
            None => container.as_object_mut(),
        };
        if let Some(target) = target {
            FieldExpression::parse(&reference.field).set(child, target, &[]);
        }
    }
    container
}
