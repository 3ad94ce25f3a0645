//! Tabflow - Tabular Workflow Definitions
//!
//! Parses the spreadsheet-like text format used to describe pipelines of
//! tasks. Rows and columns map onto nested objects, arrays and
//! cross-references, which are resolved in a single forward scan.
//!
//! # Architecture
//!
//! The library is organized into two modules:
//!
//! - [`workflow`]: Document parsing, reference linking and the typed model
//! - [`resource`]: Resource addressing and fetching, row tokenizing and
//!   `$variable` expansion
//!
//! # Example
//!
//! ```rust,no_run
//! use tabflow::resource::{FileFetcher, Resource};
//! use tabflow::workflow::{InMemoryRegistry, LoaderOptions, WorkflowLoader};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let resource = Resource::from_path("deploy.csv")?;
//!     let options = LoaderOptions::default().with_variable("env", "prod");
//!     let mut registry = InMemoryRegistry::new();
//!
//!     let workflow = WorkflowLoader::new(&FileFetcher)
//!         .with_options(options)
//!         .load(&resource, &mut registry)?;
//!
//!     println!("{}: {} tasks", workflow.name, workflow.tasks.len());
//!     Ok(())
//! }
//! ```

pub mod resource;
pub mod workflow;

// Re-export commonly used types
pub use resource::{FileFetcher, Resource, ResourceFetcher};
pub use workflow::error::WorkflowError;
pub use workflow::model::{Task, Workflow};
pub use workflow::parser::{load_workflow, WorkflowLoader};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "Tabflow";
