//! Row Tokenizer
//!
//! Splits a single delimited line into cells. Header lines establish the
//! column layout; data lines are decoded against that layout.

use crate::workflow::error::WorkflowError;

/// Delimiter used by tabular workflow files.
pub const DEFAULT_DELIMITER: u8 = b',';

/// Quote-aware splitter for single delimited lines.
#[derive(Debug, Clone, Copy)]
pub struct RowTokenizer {
    delimiter: u8,
}

impl Default for RowTokenizer {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER)
    }
}

impl RowTokenizer {
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }

    /// Reads the column layout from a header line. Column names are trimmed.
    pub fn header(&self, line: &str, line_number: usize) -> Result<Vec<String>, WorkflowError> {
        let cells = self.split(line, line_number)?;
        Ok(cells.into_iter().map(|c| c.trim().to_string()).collect())
    }

    /// Decodes a data line against an established column layout.
    ///
    /// Missing trailing cells read as empty; cells beyond the layout are dropped.
    pub fn decode<'a>(
        &self,
        line: &str,
        columns: &'a [String],
        line_number: usize,
    ) -> Result<Record<'a>, WorkflowError> {
        let mut values = self.split(line, line_number)?;
        values.resize(columns.len(), String::new());
        Ok(Record { columns, values })
    }

    fn split(&self, line: &str, line_number: usize) -> Result<Vec<String>, WorkflowError> {
        // The csv reader accepts a quoted cell running to the end of input.
        if has_unterminated_quote(line.as_bytes(), self.delimiter) {
            return Err(WorkflowError::Tokenize {
                line: line_number,
                reason: "unterminated quoted cell".to_string(),
            });
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(line.as_bytes());

        let mut record = csv::StringRecord::new();
        let has_record = reader
            .read_record(&mut record)
            .map_err(|e| WorkflowError::Tokenize {
                line: line_number,
                reason: e.to_string(),
            })?;
        if !has_record {
            return Ok(Vec::new());
        }
        Ok(record.iter().map(str::to_string).collect())
    }
}

/// True when a cell opens with a quote that is never closed.
///
/// Quotes inside an unquoted cell are literal text.
fn has_unterminated_quote(line: &[u8], delimiter: u8) -> bool {
    let mut bytes = line.iter().copied().peekable();
    let mut cell_start = true;
    let mut quoted = false;

    while let Some(byte) = bytes.next() {
        if quoted {
            if byte == b'"' {
                if bytes.peek() == Some(&b'"') {
                    bytes.next();
                } else {
                    quoted = false;
                }
            }
            continue;
        }
        if byte == delimiter {
            cell_start = true;
            continue;
        }
        if cell_start && byte == b'"' {
            quoted = true;
        }
        cell_start = false;
    }

    quoted
}

/// A data line decoded against a column layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record<'a> {
    columns: &'a [String],
    values: Vec<String>,
}

impl Record<'_> {
    /// Value of the cell at `index`, empty when out of range.
    pub fn value(&self, index: usize) -> &str {
        self.values.get(index).map(String::as_str).unwrap_or("")
    }

    /// Value of the first column named `column`.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|index| self.value(index))
    }

    /// True when every cell is empty.
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(|v| v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_header_trims_column_names() {
        let header = RowTokenizer::default().header("Workflow, Name ,Tasks", 1).unwrap();
        assert_eq!(header, columns(&["Workflow", "Name", "Tasks"]));
    }

    #[test]
    fn test_decode_by_name_and_index() {
        let layout = columns(&["request", "name", "value"]);
        let record = RowTokenizer::default().decode(",abc,1", &layout, 2).unwrap();

        assert_eq!(record.value(0), "");
        assert_eq!(record.value(1), "abc");
        assert_eq!(record.get("value"), Some("1"));
        assert_eq!(record.get("missing"), None);
        assert!(!record.is_empty());
    }

    #[test]
    fn test_decode_pads_and_truncates() {
        let layout = columns(&["a", "b", "c"]);
        let tokenizer = RowTokenizer::default();

        let short = tokenizer.decode(",x", &layout, 1).unwrap();
        assert_eq!(short.value(2), "");

        let long = tokenizer.decode(",x,y,z,extra", &layout, 1).unwrap();
        assert_eq!(long.value(2), "y");
        assert_eq!(long.value(3), "");
    }

    #[test]
    fn test_decode_quoted_cell() {
        let layout = columns(&["tag", "body"]);
        let line = r#","{""id"":1,""name"":""abc""}""#;
        let record = RowTokenizer::default().decode(line, &layout, 1).unwrap();
        assert_eq!(record.get("body"), Some(r#"{"id":1,"name":"abc"}"#));
    }

    #[test]
    fn test_decode_unterminated_quote_fails() {
        let layout = columns(&["tag", "body"]);
        let err = RowTokenizer::default()
            .decode(r#","{""id"":1"#, &layout, 7)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Tokenize { line: 7, .. }));
    }

    #[test]
    fn test_decode_inner_quote_is_literal() {
        let layout = columns(&["tag", "size"]);
        let record = RowTokenizer::default().decode(r#",5" tall"#, &layout, 1).unwrap();
        assert_eq!(record.value(1), r#"5" tall"#);
    }

    #[test]
    fn test_decode_empty_line() {
        let layout = columns(&["a", "b"]);
        let record = RowTokenizer::default().decode("", &layout, 1).unwrap();
        assert!(record.is_empty());
    }

    #[test]
    fn test_custom_delimiter() {
        let layout = columns(&["a", "b"]);
        let record = RowTokenizer::new(b';').decode("x;y,z", &layout, 1).unwrap();
        assert_eq!(record.value(1), "y,z");
    }
}
