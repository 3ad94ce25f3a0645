//! Resource Access Module
//!
//! Collaborators the document parser relies on but does not own:
//!
//! - [`Resource`]: an addressable piece of text (local file or URL)
//! - [`ResourceFetcher`]: retrieves the text behind a resource
//! - [`tokenizer`]: splits delimited rows into cells
//! - [`macros`]: `$variable` substitution applied before parsing

pub mod macros;
pub mod tokenizer;

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::workflow::error::WorkflowError;

pub use tokenizer::{Record, RowTokenizer, DEFAULT_DELIMITER};

/// Handle to a text resource.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Absolute URL of the resource (`file://`, `https://`, ...)
    pub url: String,

    /// Credentials used to access the resource, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_file: Option<String>,
}

impl Resource {
    /// Creates a resource for an absolute URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            credential_file: None,
        }
    }

    /// Sets the credential file for this resource.
    pub fn with_credential_file(mut self, credential_file: impl Into<String>) -> Self {
        self.credential_file = Some(credential_file.into());
        self
    }

    /// Creates a `file://` resource for a local path.
    ///
    /// Relative paths are taken relative to the current directory.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, WorkflowError> {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };
        let url = Url::from_file_path(&absolute)
            .map_err(|_| WorkflowError::InvalidResource(absolute.display().to_string()))?;
        Ok(Self::new(url))
    }

    /// Parses the resource URL.
    pub fn parsed_url(&self) -> Result<Url, WorkflowError> {
        Url::parse(&self.url)
            .map_err(|e| WorkflowError::InvalidResource(format!("{}: {}", self.url, e)))
    }

    /// Resolves a reference specifier against this resource.
    ///
    /// Supported forms:
    /// - `scheme://...`: absolute URL, no credentials
    /// - `/abs/path`: local file, no credentials
    /// - `location, credentialFile`: `location` resolved by these rules,
    ///   with an explicit credential file
    /// - anything else: path relative to this resource's directory,
    ///   inheriting its credential file
    pub fn resolve(&self, specifier: &str) -> Result<Resource, WorkflowError> {
        let specifier = specifier.trim();

        if let Some((location, credential_file)) = specifier.split_once(',') {
            let mut resource = self.resolve(location)?;
            let credential_file = credential_file.trim();
            resource.credential_file =
                (!credential_file.is_empty()).then(|| credential_file.to_string());
            return Ok(resource);
        }

        if specifier.contains("://") {
            return Ok(Resource::new(specifier));
        }

        if specifier.starts_with('/') {
            let url = Url::from_file_path(specifier)
                .map_err(|_| WorkflowError::InvalidResource(specifier.to_string()))?;
            return Ok(Resource::new(url));
        }

        let base = self.parsed_url()?;
        let url = base
            .join(specifier)
            .map_err(|e| WorkflowError::InvalidResource(format!("{}: {}", specifier, e)))?;
        Ok(Resource {
            url: url.into(),
            credential_file: self.credential_file.clone(),
        })
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// Retrieves the text content of a resource.
pub trait ResourceFetcher {
    fn fetch(&self, resource: &Resource) -> Result<String, WorkflowError>;
}

/// Fetches `file://` resources from the local file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileFetcher;

impl ResourceFetcher for FileFetcher {
    fn fetch(&self, resource: &Resource) -> Result<String, WorkflowError> {
        let fetch_error = |reason: String| WorkflowError::ResourceFetch {
            url: resource.url.clone(),
            reason,
        };

        let url = resource.parsed_url()?;
        if url.scheme() != "file" {
            return Err(fetch_error(format!("unsupported scheme '{}'", url.scheme())));
        }
        let path = url
            .to_file_path()
            .map_err(|_| fetch_error("not a local file path".to_string()))?;

        let content = fs::read_to_string(&path).map_err(|e| fetch_error(e.to_string()))?;
        debug!("Fetched {} ({} bytes)", path.display(), content.len());
        Ok(content)
    }
}

/// Serves resources registered in memory, keyed by URL.
#[derive(Debug, Default, Clone)]
pub struct MemoryFetcher {
    contents: HashMap<String, String>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the content served for `url`.
    pub fn insert(&mut self, url: impl Into<String>, content: impl Into<String>) {
        self.contents.insert(url.into(), content.into());
    }

    /// Builder-style variant of [`MemoryFetcher::insert`].
    pub fn with(mut self, url: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(url, content);
        self
    }
}

impl ResourceFetcher for MemoryFetcher {
    fn fetch(&self, resource: &Resource) -> Result<String, WorkflowError> {
        self.contents
            .get(&resource.url)
            .cloned()
            .ok_or_else(|| WorkflowError::ResourceFetch {
                url: resource.url.clone(),
                reason: "resource not found".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Resource {
        Resource::new("file:///work/flows/main.csv").with_credential_file("secret.json")
    }

    #[test]
    fn test_resolve_relative_path() {
        let resource = base().resolve("req/build.json").unwrap();
        assert_eq!(resource.url, "file:///work/flows/req/build.json");
        assert_eq!(resource.credential_file.as_deref(), Some("secret.json"));
    }

    #[test]
    fn test_resolve_parent_directory() {
        let resource = base().resolve("../shared/common.csv").unwrap();
        assert_eq!(resource.url, "file:///work/shared/common.csv");
    }

    #[test]
    fn test_resolve_absolute_path() {
        let resource = base().resolve("/etc/flows/other.csv").unwrap();
        assert_eq!(resource.url, "file:///etc/flows/other.csv");
        assert!(resource.credential_file.is_none());
    }

    #[test]
    fn test_resolve_absolute_url() {
        let resource = base().resolve(" https://example.com/flow.csv ").unwrap();
        assert_eq!(resource.url, "https://example.com/flow.csv");
        assert!(resource.credential_file.is_none());
    }

    #[test]
    fn test_resolve_with_credentials() {
        let resource = base()
            .resolve("https://example.com/flow.csv, other.json")
            .unwrap();
        assert_eq!(resource.url, "https://example.com/flow.csv");
        assert_eq!(resource.credential_file.as_deref(), Some("other.json"));
    }

    #[test]
    fn test_resolve_relative_keeps_host() {
        let base = Resource::new("https://example.com/flows/main.csv");
        let resource = base.resolve("sub.csv").unwrap();
        assert_eq!(resource.url, "https://example.com/flows/sub.csv");
    }

    #[test]
    fn test_resolve_invalid_base() {
        let base = Resource::new("not a url");
        assert!(matches!(
            base.resolve("sub.csv"),
            Err(WorkflowError::InvalidResource(_))
        ));
    }

    #[test]
    fn test_file_fetcher_reads_file() {
        use tempfile::tempdir;

        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("value.txt");
        std::fs::write(&path, "hello").unwrap();

        let resource = Resource::from_path(&path).unwrap();
        assert!(resource.url.starts_with("file://"));
        assert_eq!(FileFetcher.fetch(&resource).unwrap(), "hello");
    }

    #[test]
    fn test_file_fetcher_missing_file() {
        let resource = Resource::new("file:///nonexistent/path/value.txt");
        assert!(matches!(
            FileFetcher.fetch(&resource),
            Err(WorkflowError::ResourceFetch { .. })
        ));
    }

    #[test]
    fn test_file_fetcher_rejects_remote() {
        let resource = Resource::new("https://example.com/flow.csv");
        let err = FileFetcher.fetch(&resource).unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[test]
    fn test_memory_fetcher() {
        let fetcher = MemoryFetcher::new().with("mem://a.txt", "abc");
        assert_eq!(fetcher.fetch(&Resource::new("mem://a.txt")).unwrap(), "abc");
        assert!(fetcher.fetch(&Resource::new("mem://b.txt")).is_err());
    }
}
