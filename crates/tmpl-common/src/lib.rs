//! # tmpl-common
//!
//! Shared infrastructure for the tmplcheck template checker:
//! - Byte-offset spans for locating template constructs
//! - Source file management and location formatting
//! - Diagnostic collection and rendering

pub mod diagnostics;
pub mod source;
pub mod span;

pub use diagnostics::{Diagnostic, DiagnosticEmitter, DiagnosticSink, Label, Severity};
pub use source::{FileId, SourceManager};
pub use span::Span;
