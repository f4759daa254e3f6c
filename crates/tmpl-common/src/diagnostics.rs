//! Diagnostic reporting.
//!
//! Checker findings are collected in a [`DiagnosticSink`] and rendered either
//! as compact one-line locations (the default CLI output) or as labelled
//! source excerpts via `codespan-reporting`.

use std::fmt;

use codespan_reporting::diagnostic::{
    Diagnostic as CsDiagnostic, Label as CsLabel, LabelStyle, Severity as CsSeverity,
};
use codespan_reporting::term::{
    self,
    termcolor::{Buffer, ColorChoice, StandardStream, WriteColor},
    Config,
};

use crate::source::{FileId, SourceManager};
use crate::span::Span;

/// Severity of a diagnostic.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Severity {
    /// A finding that fails the check.
    Error,
    /// A downgraded finding that does not fail the check.
    Warning,
    /// Additional information.
    Note,
}

impl Severity {
    /// Reports whether this is an error.
    #[inline]
    pub const fn is_error(self) -> bool {
        matches!(self, Severity::Error)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

impl From<Severity> for CsSeverity {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Error => CsSeverity::Error,
            Severity::Warning => CsSeverity::Warning,
            Severity::Note => CsSeverity::Note,
        }
    }
}

/// A label pointing at a location in a registered file.
#[derive(Clone, Debug)]
pub struct Label {
    pub style: LabelStyle,
    pub file: FileId,
    pub span: Span,
    pub message: Option<String>,
}

impl Label {
    /// Creates a primary label (the main location of the diagnostic).
    pub fn primary(file: FileId, span: impl Into<Span>) -> Self {
        Self {
            style: LabelStyle::Primary,
            file,
            span: span.into(),
            message: None,
        }
    }

    /// Creates a secondary label (additional context).
    pub fn secondary(file: FileId, span: impl Into<Span>) -> Self {
        Self {
            style: LabelStyle::Secondary,
            file,
            span: span.into(),
            message: None,
        }
    }

    /// Attaches a message to this label.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// A single checker finding.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Stable numeric code of the error kind.
    pub code: Option<u16>,
    pub message: String,
    /// The template action the finding occurred in, e.g. `{{.Foo.Bar}}`.
    pub context: Option<String>,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    /// Creates a diagnostic with the given severity and message.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: None,
            message: message.into(),
            context: None,
            labels: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Creates an error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// Creates a warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// Sets the error-kind code.
    pub fn with_code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }

    /// Sets the enclosing-action context string.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Adds a label.
    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    /// Adds a note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Downgrades an error to a warning, leaving other severities alone.
    pub fn downgraded(mut self) -> Self {
        if self.severity == Severity::Error {
            self.severity = Severity::Warning;
        }
        self
    }

    /// Reports whether this is an error.
    #[inline]
    pub fn is_error(&self) -> bool {
        self.severity.is_error()
    }

    /// Returns the primary label, if any.
    pub fn primary_label(&self) -> Option<&Label> {
        self.labels
            .iter()
            .find(|l| l.style == LabelStyle::Primary)
            .or_else(|| self.labels.first())
    }
}

/// Collects diagnostics in encounter order.
#[derive(Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
}

impl DiagnosticSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a diagnostic.
    pub fn emit(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_error() {
            self.error_count += 1;
        }
        self.diagnostics.push(diagnostic);
    }

    /// Number of error diagnostics.
    #[inline]
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Reports whether any error was emitted.
    #[inline]
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    /// Reports whether the sink holds no diagnostics at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Total number of diagnostics.
    #[inline]
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Iterates over the diagnostics in encounter order.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// Returns all diagnostics.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Takes all diagnostics, leaving the sink empty.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        self.error_count = 0;
        std::mem::take(&mut self.diagnostics)
    }

    /// Merges another sink into this one, preserving order.
    pub fn extend(&mut self, other: DiagnosticSink) {
        self.error_count += other.error_count;
        self.diagnostics.extend(other.diagnostics);
    }
}

impl fmt::Debug for DiagnosticSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticSink")
            .field("errors", &self.error_count)
            .field("total", &self.diagnostics.len())
            .finish()
    }
}

/// Renders diagnostics against a [`SourceManager`].
pub struct DiagnosticEmitter<'a> {
    sources: &'a SourceManager,
    config: Config,
}

impl<'a> DiagnosticEmitter<'a> {
    /// Creates an emitter over the given sources.
    pub fn new(sources: &'a SourceManager) -> Self {
        Self {
            sources,
            config: Config::default(),
        }
    }

    /// Renders one diagnostic as a compact line:
    /// `<file>:<line>:<col>: in <action>: <message>`.
    pub fn format_compact(&self, diagnostic: &Diagnostic) -> String {
        let location = diagnostic
            .primary_label()
            .map(|l| self.sources.format_location(l.file, l.span.start))
            .unwrap_or_else(|| "-".to_string());
        match &diagnostic.context {
            Some(ctx) => format!("{}: in {}: {}", location, ctx, diagnostic.message),
            None => format!("{}: {}", location, diagnostic.message),
        }
    }

    /// Writes every diagnostic in the sink as compact lines.
    pub fn emit_compact<W: std::io::Write>(
        &self,
        writer: &mut W,
        sink: &DiagnosticSink,
    ) -> std::io::Result<()> {
        for diagnostic in sink.iter() {
            writeln!(writer, "{}", self.format_compact(diagnostic))?;
        }
        Ok(())
    }

    /// Renders one diagnostic with labelled source excerpts to stderr.
    pub fn emit_pretty(&self, diagnostic: &Diagnostic) {
        let writer = StandardStream::stderr(ColorChoice::Auto);
        self.emit_pretty_to(&mut writer.lock(), diagnostic);
    }

    /// Renders every diagnostic in the sink to stderr.
    pub fn emit_all_pretty(&self, sink: &DiagnosticSink) {
        for diagnostic in sink.iter() {
            self.emit_pretty(diagnostic);
        }
    }

    /// Renders one diagnostic to a plain string (used by tests).
    pub fn emit_pretty_to_string(&self, diagnostic: &Diagnostic) -> String {
        let mut buffer = Buffer::no_color();
        self.emit_pretty_to(&mut buffer, diagnostic);
        String::from_utf8_lossy(buffer.as_slice()).into_owned()
    }

    fn emit_pretty_to<W: WriteColor>(&self, writer: &mut W, diagnostic: &Diagnostic) {
        let cs = self.to_codespan(diagnostic);
        let _ = term::emit(writer, &self.config, self.sources.files(), &cs);
    }

    fn to_codespan(&self, diagnostic: &Diagnostic) -> CsDiagnostic<usize> {
        let mut cs = CsDiagnostic::new(diagnostic.severity.into()).with_message(&diagnostic.message);
        if let Some(code) = diagnostic.code {
            cs = cs.with_code(format!("T{:04}", code));
        }
        let labels = diagnostic
            .labels
            .iter()
            .map(|label| {
                let mut cs_label = CsLabel::new(label.style, label.file, label.span);
                if let Some(msg) = &label.message {
                    cs_label = cs_label.with_message(msg);
                }
                cs_label
            })
            .collect();
        cs = cs.with_labels(labels);

        let mut notes = diagnostic.notes.clone();
        if let Some(ctx) = &diagnostic.context {
            notes.push(format!("in {}", ctx));
        }
        cs.with_notes(notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_counts() {
        let mut sink = DiagnosticSink::new();
        assert!(sink.is_empty());

        sink.emit(Diagnostic::error("first"));
        sink.emit(Diagnostic::warning("second"));
        sink.emit(Diagnostic::error("third"));

        assert_eq!(sink.len(), 3);
        assert_eq!(sink.error_count(), 2);
        assert!(sink.has_errors());
    }

    #[test]
    fn test_sink_extend_preserves_order() {
        let mut outer = DiagnosticSink::new();
        outer.emit(Diagnostic::error("a"));

        let mut inner = DiagnosticSink::new();
        inner.emit(Diagnostic::error("b"));
        inner.emit(Diagnostic::warning("c"));

        outer.extend(inner);
        let messages: Vec<_> = outer.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["a", "b", "c"]);
        assert_eq!(outer.error_count(), 2);
    }

    #[test]
    fn test_downgraded() {
        let diag = Diagnostic::error("soft").downgraded();
        assert_eq!(diag.severity, Severity::Warning);
        let warn = Diagnostic::warning("already").downgraded();
        assert_eq!(warn.severity, Severity::Warning);
    }

    #[test]
    fn test_compact_format() {
        let mut sources = SourceManager::new();
        let id = sources.add_file("x.tmpl", "{{.Foo}}\n{{.Bar}}\n");

        let diag = Diagnostic::error("can't evaluate field Bar")
            .with_context("{{.Bar}}")
            .with_label(Label::primary(id, Span::new(11, 15)));

        let emitter = DiagnosticEmitter::new(&sources);
        assert_eq!(
            emitter.format_compact(&diag),
            "x.tmpl:2:3: in {{.Bar}}: can't evaluate field Bar"
        );
    }

    #[test]
    fn test_pretty_contains_message() {
        let mut sources = SourceManager::new();
        let id = sources.add_file("x.tmpl", "{{.Foo}}");

        let diag = Diagnostic::error("no such field")
            .with_code(2500)
            .with_label(Label::primary(id, Span::new(2, 6)).with_message("here"));

        let emitter = DiagnosticEmitter::new(&sources);
        let rendered = emitter.emit_pretty_to_string(&diag);
        assert!(rendered.contains("no such field"));
        assert!(rendered.contains("T2500"));
    }
}
