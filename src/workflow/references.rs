//! Deferred Reference Registry
//!
//! A `%name` cell names a section that appears later in the document.
//! Instead of a callback, each reference records *where* the section must
//! be written once it exists: the owning record and the column's field
//! expression. The document builder fires a reference when the matching
//! header line is reached, reserving the field, and links the containers
//! after the scan.

use std::collections::HashMap;

use log::debug;

use super::error::WorkflowError;

/// Record that owns a deferred write.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordLocation {
    /// Section (tag name) holding the record
    pub section: String,

    /// Position of the record inside an array section
    pub index: Option<usize>,
}

/// A registered link between a reference name and its write location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredReference {
    pub name: String,
    pub location: RecordLocation,
    /// Column header the section is written under
    pub field: String,
    /// Document line the reference was read from
    pub line: usize,
    resolved: bool,
}

impl DeferredReference {
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }
}

/// Tracks deferred references for a single document.
#[derive(Debug, Default)]
pub struct ReferenceRegistry {
    references: Vec<DeferredReference>,
    by_name: HashMap<String, usize>,
}

impl ReferenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pending reference.
    ///
    /// Each name can be registered once per document; a second `%name`
    /// cell is rejected rather than silently redirecting the link.
    pub fn register(
        &mut self,
        name: &str,
        location: RecordLocation,
        field: &str,
        line: usize,
    ) -> Result<(), WorkflowError> {
        if self.by_name.contains_key(name) {
            return Err(WorkflowError::DuplicateReference {
                name: name.to_string(),
                line,
            });
        }

        debug!(
            "Registered reference {} at {}{}.{} (line {})",
            name,
            location.section,
            location.index.map(|i| format!("[{}]", i)).unwrap_or_default(),
            field,
            line
        );
        self.by_name.insert(name.to_string(), self.references.len());
        self.references.push(DeferredReference {
            name: name.to_string(),
            location,
            field: field.to_string(),
            line,
            resolved: false,
        });
        Ok(())
    }

    /// Fires the reference for `name`, returning whether one was registered.
    pub fn resolve(&mut self, name: &str) -> bool {
        match self.by_name.get(name) {
            Some(&index) => {
                self.references[index].resolved = true;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&DeferredReference> {
        self.by_name.get(name).map(|&index| &self.references[index])
    }

    /// Names registered but never resolved, in registration order.
    pub fn pending(&self) -> Vec<&str> {
        self.references
            .iter()
            .filter(|r| !r.resolved)
            .map(|r| r.name.as_str())
            .collect()
    }

    /// Fails with every unresolved name at once.
    pub fn check_all_resolved(&self) -> Result<(), WorkflowError> {
        let pending = self.pending();
        if pending.is_empty() {
            return Ok(());
        }
        Err(WorkflowError::UnresolvedReferences(
            pending.into_iter().map(str::to_string).collect(),
        ))
    }

    /// Resolved references owned by records of `section`, in registration order.
    pub fn resolved_in<'a>(
        &'a self,
        section: &'a str,
    ) -> impl Iterator<Item = &'a DeferredReference> + 'a {
        self.references
            .iter()
            .filter(move |r| r.resolved && r.location.section == section)
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(section: &str, index: Option<usize>) -> RecordLocation {
        RecordLocation {
            section: section.to_string(),
            index,
        }
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = ReferenceRegistry::new();
        registry
            .register("detail", location("request", None), "body", 2)
            .unwrap();

        assert!(!registry.get("detail").unwrap().is_resolved());
        assert!(registry.resolve("detail"));
        assert!(registry.get("detail").unwrap().is_resolved());
        assert!(registry.check_all_resolved().is_ok());
    }

    #[test]
    fn test_resolve_unknown_name() {
        let mut registry = ReferenceRegistry::new();
        assert!(!registry.resolve("detail"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unresolved_names_reported_together() {
        let mut registry = ReferenceRegistry::new();
        registry.register("a", location("root", None), "x", 2).unwrap();
        registry.register("b", location("root", None), "y", 2).unwrap();
        registry.register("c", location("root", None), "z", 2).unwrap();
        registry.resolve("b");

        match registry.check_all_resolved() {
            Err(WorkflowError::UnresolvedReferences(names)) => {
                assert_eq!(names, vec!["a", "c"]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = ReferenceRegistry::new();
        registry.register("a", location("root", None), "x", 2).unwrap();
        registry.resolve("a");

        let err = registry
            .register("a", location("root", None), "y", 5)
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::DuplicateReference { ref name, line: 5 } if name == "a"
        ));
        assert_eq!(registry.get("a").unwrap().field, "x");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_resolved_in_section() {
        let mut registry = ReferenceRegistry::new();
        registry.register("a", location("root", None), "x", 2).unwrap();
        registry.register("b", location("tasks", Some(1)), "y", 4).unwrap();
        registry.register("c", location("root", None), "z", 2).unwrap();
        registry.resolve("a");
        registry.resolve("b");

        let names: Vec<_> = registry.resolved_in("root").map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a"]);
        let tasks: Vec<_> = registry.resolved_in("tasks").collect();
        assert_eq!(tasks[0].location.index, Some(1));
    }
}
