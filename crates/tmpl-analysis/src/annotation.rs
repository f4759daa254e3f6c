//! Annotation directives embedded in template comments.
//!
//! A comment of the form `{{/* @key value */}}` carries a checker directive.
//! Recognised keys are `type` (rebind the current dot) and `debug`
//! (introspection); anything else is ignored by the caller.

use std::sync::LazyLock;

use regex::Regex;

/// `{{/* @key value */}}`
static ANNOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^/\*\s*@(\w+)\s+(.*?)\s*\*/$").expect("annotation pattern"));

/// A parsed `@key value` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub key: String,
    pub value: String,
}

/// Parses the text of a comment node (delimiters included) into an
/// annotation. Ordinary comments yield `None`.
pub fn parse_annotation(text: &str) -> Option<Annotation> {
    let captures = ANNOTATION.captures(text)?;
    Some(Annotation {
        key: captures[1].to_string(),
        value: captures[2].to_string(),
    })
}

/// Splits a qualified `pkg/path.Name` at the final dot.
pub fn split_qualified(value: &str) -> Option<(&str, &str)> {
    let dot = value.rfind('.')?;
    let (pkg, name) = value.split_at(dot);
    if pkg.is_empty() || name.len() < 2 {
        return None;
    }
    Some((pkg, &name[1..]))
}
