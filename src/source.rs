//! Collaborator-facing data access.
//!
//! The engine pulls per-file facts (statements, exclusions, executed
//! lines, arcs, contexts, regions) through the [`FactSource`] trait
//! rather than reading anything itself. [`MemorySource`] is the bundled
//! implementation for callers that already hold the facts in memory.

use anyhow::{anyhow, Result};

use crate::model::FileFacts;

/// A source of per-file coverage facts.
pub trait FactSource {
    /// Measured file paths, in the order files should be processed.
    fn files(&self) -> Vec<String>;

    /// Fetch the facts for one file. An error here fails only that
    /// file; the report continues with the remaining ones.
    fn facts(&self, path: &str) -> Result<FileFacts>;
}

/// Fact source backed by facts held in memory.
#[derive(Debug, Default)]
pub struct MemorySource {
    files: Vec<(String, FileFacts)>,
}

impl MemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file's facts. Files are reported in insertion order.
    pub fn insert(&mut self, path: impl Into<String>, facts: FileFacts) {
        self.files.push((path.into(), facts));
    }
}

impl FactSource for MemorySource {
    fn files(&self) -> Vec<String> {
        self.files.iter().map(|(path, _)| path.clone()).collect()
    }

    fn facts(&self, path: &str) -> Result<FileFacts> {
        self.files
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, facts)| facts.clone())
            .ok_or_else(|| anyhow!("no coverage facts recorded for {path}"))
    }
}
