//! Workflow Definition Module
//!
//! Parses tabular workflow definitions into nested documents and typed
//! workflows.
//!
//! # Structure
//!
//! - [`tag`]: Section tags from header lines
//! - [`field`]: Column field expressions and nested writes
//! - [`value`]: Cell value classification
//! - [`references`]: Deferred `%name` reference tracking
//! - [`builder`]: Single-pass document scan
//! - [`parser`]: Loading, macro expansion and imports
//! - [`model`]: Typed workflow and registry

pub mod builder;
pub mod error;
pub mod field;
pub mod model;
pub mod parser;
pub mod references;
pub mod tag;
pub mod value;

pub use builder::{DocumentBuilder, ImportHandler};
pub use error::WorkflowError;
pub use field::FieldExpression;
pub use model::{Action, InMemoryRegistry, Task, Workflow, WorkflowRegistry};
pub use parser::{load_workflow, save_workflow, LoaderOptions, WorkflowLoader};
pub use references::{DeferredReference, RecordLocation, ReferenceRegistry};
pub use tag::Tag;
pub use value::{CellValue, ValueNormalizer};
