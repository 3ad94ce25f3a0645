//! Workflow error types

use thiserror::Error;

/// Errors that can occur while loading a tabular workflow definition.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("failed to tokenize line {line}: {reason}")]
    Tokenize { line: usize, reason: String },

    #[error("missing reference {name} in the previous rows (line {line})")]
    MissingReference { name: String, line: usize },

    #[error("unresolved references: {}", .0.join(", "))]
    UnresolvedReferences(Vec<String>),

    #[error("reference {name} is already registered (line {line})")]
    DuplicateReference { name: String, line: usize },

    #[error("root tag {0} can not be an array")]
    ArrayRoot(String),

    #[error("invalid resource: {0}")]
    InvalidResource(String),

    #[error("failed to fetch {url}: {reason}")]
    ResourceFetch { url: String, reason: String },

    #[error("failed to decode JSON literal: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to import workflow: {import} (from {document}): {source}")]
    Import {
        import: String,
        document: String,
        #[source]
        source: Box<WorkflowError>,
    },

    #[error("import cycle detected: {}", .0.join(" -> "))]
    ImportCycle(Vec<String>),

    #[error("failed to register workflow {name}: {reason}")]
    Registration { name: String, reason: String },

    #[error("failed to convert document into a workflow: {0}")]
    Convert(#[source] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkflowError {
    /// Wraps an error raised while loading an imported document.
    pub fn import(
        import: impl Into<String>,
        document: impl Into<String>,
        source: WorkflowError,
    ) -> Self {
        WorkflowError::Import {
            import: import.into(),
            document: document.into(),
            source: Box::new(source),
        }
    }
}
