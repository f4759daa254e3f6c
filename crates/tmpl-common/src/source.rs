//! Source file management.
//!
//! A registry of the template files under check. Assigns `FileId`s, serves
//! source text, and translates byte offsets into line/column locations.

use std::path::Path;

use codespan_reporting::files::{Files, SimpleFiles};

use crate::span::Span;

/// A unique identifier for a registered source file.
pub type FileId = usize;

/// Registry of template source files.
pub struct SourceManager {
    files: SimpleFiles<String, String>,
}

impl SourceManager {
    /// Creates an empty source manager.
    pub fn new() -> Self {
        Self {
            files: SimpleFiles::new(),
        }
    }

    /// Registers a file with the given name and content.
    pub fn add_file(&mut self, name: impl Into<String>, source: impl Into<String>) -> FileId {
        self.files.add(name.into(), source.into())
    }

    /// Registers a file read from disk.
    pub fn add_file_from_path(&mut self, path: &Path) -> std::io::Result<FileId> {
        let source = std::fs::read_to_string(path)?;
        Ok(self.add_file(path.display().to_string(), source))
    }

    /// Returns the source text of a file.
    pub fn source(&self, id: FileId) -> Option<&str> {
        self.files.get(id).ok().map(|f| f.source().as_str())
    }

    /// Returns the registered name of a file.
    pub fn name(&self, id: FileId) -> Option<&str> {
        self.files.get(id).ok().map(|f| f.name().as_str())
    }

    /// Returns the source text covered by `span`.
    pub fn snippet(&self, id: FileId, span: Span) -> Option<&str> {
        self.source(id)?.get(span.start..span.end)
    }

    /// Returns 1-indexed `(line, column)` for a byte offset.
    pub fn location(&self, id: FileId, offset: usize) -> Option<(usize, usize)> {
        let line_idx = self.files.line_index(id, offset).ok()?;
        let line_range = self.files.line_range(id, line_idx).ok()?;
        Some((line_idx + 1, offset - line_range.start + 1))
    }

    /// Formats a location like `tmpl.html:3:14`. Unregistered files render
    /// as `-`, matching the convention for stdin input.
    pub fn format_location(&self, id: FileId, offset: usize) -> String {
        let name = match self.name(id) {
            Some(n) if !n.is_empty() => n,
            _ => "-",
        };
        match self.location(id, offset) {
            Some((line, col)) => format!("{}:{}:{}", name, line, col),
            None => name.to_string(),
        }
    }

    /// Access to the underlying file database for codespan rendering.
    pub fn files(&self) -> &SimpleFiles<String, String> {
        &self.files
    }
}

impl Default for SourceManager {
    fn default() -> Self {
        Self::new()
    }
}
