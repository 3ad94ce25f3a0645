//! Workflow Loader
//!
//! Loads tabular workflow definitions from resources:
//!
//! 1. Fetches the document text
//! 2. Expands `$variable` macros
//! 3. Builds the nested document, following `import` lines recursively
//! 4. Converts the document into a typed [`Workflow`]
//!
//! Imported workflows are added to a [`WorkflowRegistry`]. An import that
//! leads back to a document still being loaded is rejected.

use std::collections::HashMap;
use std::fs;

use log::{debug, info};
use serde_json::{Map, Value};

use super::builder::{DocumentBuilder, ImportHandler};
use super::error::WorkflowError;
use super::model::{InMemoryRegistry, Workflow, WorkflowRegistry};
use crate::resource::macros;
use crate::resource::{FileFetcher, Resource, ResourceFetcher, RowTokenizer, DEFAULT_DELIMITER};

/// Loader configuration.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Cell delimiter of the tabular rows
    pub delimiter: u8,

    /// Variables substituted for `$name` placeholders before parsing
    pub variables: HashMap<String, String>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            variables: HashMap::new(),
        }
    }
}

impl LoaderOptions {
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn with_variables(mut self, variables: HashMap<String, String>) -> Self {
        self.variables.extend(variables);
        self
    }
}

/// Loads workflow documents through a [`ResourceFetcher`].
pub struct WorkflowLoader<'a> {
    fetcher: &'a dyn ResourceFetcher,
    options: LoaderOptions,
}

impl<'a> WorkflowLoader<'a> {
    pub fn new(fetcher: &'a dyn ResourceFetcher) -> Self {
        Self {
            fetcher,
            options: LoaderOptions::default(),
        }
    }

    pub fn with_options(mut self, options: LoaderOptions) -> Self {
        self.options = options;
        self
    }

    /// Loads and converts the workflow stored at `resource`.
    pub fn load(
        &self,
        resource: &Resource,
        registry: &mut dyn WorkflowRegistry,
    ) -> Result<Workflow, WorkflowError> {
        let document = self.load_document(resource, registry)?;
        Workflow::from_document(document)
    }

    /// Loads the generic document stored at `resource`.
    pub fn load_document(
        &self,
        resource: &Resource,
        registry: &mut dyn WorkflowRegistry,
    ) -> Result<Map<String, Value>, WorkflowError> {
        let mut chain = Vec::new();
        self.load_chained(resource, registry, &mut chain)
    }

    /// Loads a document while `chain` holds the documents being loaded above it.
    fn load_chained(
        &self,
        resource: &Resource,
        registry: &mut dyn WorkflowRegistry,
        chain: &mut Vec<String>,
    ) -> Result<Map<String, Value>, WorkflowError> {
        info!("Loading workflow from: {}", resource);

        let content = self.fetcher.fetch(resource)?;
        let content = macros::expand(&content, &self.options.variables);
        debug!("Document content loaded ({} bytes)", content.len());
        let lines: Vec<&str> = content.lines().collect();

        chain.push(resource.url.clone());
        let mut importer = Importer {
            loader: self,
            registry,
            chain,
        };
        let result = DocumentBuilder::new(resource, self.fetcher)
            .with_tokenizer(RowTokenizer::new(self.options.delimiter))
            .build(&lines, &mut importer);
        importer.chain.pop();

        let document = result?;
        info!("Parsed {} top-level fields from {}", document.len(), resource);
        Ok(document)
    }
}

/// Import handler that loads nested documents with the same loader.
struct Importer<'l, 'a, 'r, 'c> {
    loader: &'l WorkflowLoader<'a>,
    registry: &'r mut dyn WorkflowRegistry,
    chain: &'c mut Vec<String>,
}

impl ImportHandler for Importer<'_, '_, '_, '_> {
    fn import(&mut self, document: &Resource, specifier: &str) -> Result<(), WorkflowError> {
        let resource = document.resolve(specifier)?;
        if self.chain.contains(&resource.url) {
            let mut cycle = self.chain.clone();
            cycle.push(resource.url);
            return Err(WorkflowError::ImportCycle(cycle));
        }

        let imported = self
            .loader
            .load_chained(&resource, &mut *self.registry, &mut *self.chain)?;
        let workflow = Workflow::from_document(imported)?;
        info!("Imported workflow '{}' from {}", workflow.name, resource);
        self.registry.register(workflow)
    }
}

/// Loads a workflow from a local tabular file.
///
/// Imports are resolved relative to the file and registered in a
/// throwaway registry.
///
/// # Example
///
/// ```rust,no_run
/// use tabflow::workflow::load_workflow;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let workflow = load_workflow("deploy.csv")?;
///     println!("Loaded {} tasks", workflow.tasks.len());
///     Ok(())
/// }
/// ```
pub fn load_workflow(path: &str) -> Result<Workflow, WorkflowError> {
    let resource = Resource::from_path(path)?;
    let mut registry = InMemoryRegistry::new();
    WorkflowLoader::new(&FileFetcher).load(&resource, &mut registry)
}

/// Saves a workflow to a YAML file.
pub fn save_workflow(workflow: &Workflow, path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let yaml_content = serde_yaml::to_string(workflow)?;
    fs::write(path, yaml_content)?;
    info!("Workflow saved to: {}", path);
    Ok(())
}
