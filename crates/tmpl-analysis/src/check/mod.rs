//! The template type checker.

mod builtin;
mod checker;

#[cfg(test)]
mod tests;

pub use builtin::Builtin;
pub use checker::{add_trees, CheckError, CheckOptions, Checker, DuplicateTemplate, NamedTreeMap};
