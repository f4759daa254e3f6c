//! # tmpl-analysis
//!
//! Static type checking for `text/template`-style templates.
//!
//! The crate models the slice of the host type system a template can touch
//! (`typ`, `store`, `lookup`), resolves `pkg.Name` references through an
//! injected loader (`loader`, `manifest`), and walks parsed trees with a
//! checker that mirrors template execution at the type level (`check`).

#[macro_use]
pub mod arena;
pub mod annotation;
pub mod check;
pub mod errors;
pub mod loader;
pub mod lookup;
pub mod manifest;
pub mod store;
pub mod typ;

pub use check::{add_trees, CheckError, CheckOptions, Checker, NamedTreeMap};
pub use errors::TypeError;
pub use loader::{LoadError, NullLoader, RegistryLoader, TypeLoader};
pub use manifest::ManifestLoader;
pub use store::TypeStore;
pub use typ::{BasicType, Type, TypeKey};
