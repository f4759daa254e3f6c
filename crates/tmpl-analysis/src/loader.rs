//! The host type loader contract.
//!
//! The checker never resolves `pkg.Name` strings itself; it asks an injected
//! [`TypeLoader`]. The CLI provides a manifest-backed implementation; tests
//! register types programmatically and use [`NullLoader`] where no loading
//! should happen.

use std::collections::BTreeMap;
use std::fmt;

use crate::store::TypeStore;
use crate::typ::TypeKey;

/// Why a load failed.
#[derive(Debug, Clone)]
pub enum LoadError {
    /// The qualified name does not exist in the loader's world.
    NotFound(String),
    /// The loader's input was malformed (bad manifest, bad type expression).
    Malformed(String),
    /// An I/O failure while reading loader input.
    Io(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::NotFound(name) => write!(f, "{} not found", name),
            LoadError::Malformed(msg) => write!(f, "malformed type description: {}", msg),
            LoadError::Io(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for LoadError {}

/// Resolves qualified names to host types.
pub trait TypeLoader {
    /// Resolves `pkg/path.Name` to a type, interning it in `store`.
    fn load_type(&mut self, store: &mut TypeStore, qualified: &str)
        -> Result<TypeKey, LoadError>;

    /// Resolves a variable whose value is a template function map, returning
    /// its function name → signature contents.
    fn load_func_map(
        &mut self,
        store: &mut TypeStore,
        qualified: &str,
    ) -> Result<BTreeMap<String, TypeKey>, LoadError>;
}

/// A loader over pre-registered types, for embedders that build their host
/// types programmatically instead of reading a manifest.
#[derive(Default)]
pub struct RegistryLoader {
    types: BTreeMap<String, TypeKey>,
    func_maps: BTreeMap<String, BTreeMap<String, TypeKey>>,
}

impl RegistryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a type under its qualified name.
    pub fn register_type(&mut self, qualified: impl Into<String>, key: TypeKey) {
        self.types.insert(qualified.into(), key);
    }

    /// Registers a function map under its qualified variable name.
    pub fn register_func_map(
        &mut self,
        qualified: impl Into<String>,
        funcs: BTreeMap<String, TypeKey>,
    ) {
        self.func_maps.insert(qualified.into(), funcs);
    }
}

impl TypeLoader for RegistryLoader {
    fn load_type(
        &mut self,
        _store: &mut TypeStore,
        qualified: &str,
    ) -> Result<TypeKey, LoadError> {
        self.types
            .get(qualified)
            .copied()
            .ok_or_else(|| LoadError::NotFound(qualified.to_string()))
    }

    fn load_func_map(
        &mut self,
        _store: &mut TypeStore,
        qualified: &str,
    ) -> Result<BTreeMap<String, TypeKey>, LoadError> {
        self.func_maps
            .get(qualified)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(qualified.to_string()))
    }
}

/// A loader that knows nothing; every lookup is a [`LoadError::NotFound`].
#[derive(Default)]
pub struct NullLoader;

impl TypeLoader for NullLoader {
    fn load_type(
        &mut self,
        _store: &mut TypeStore,
        qualified: &str,
    ) -> Result<TypeKey, LoadError> {
        Err(LoadError::NotFound(qualified.to_string()))
    }

    fn load_func_map(
        &mut self,
        _store: &mut TypeStore,
        qualified: &str,
    ) -> Result<BTreeMap<String, TypeKey>, LoadError> {
        Err(LoadError::NotFound(qualified.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typ::BasicType;

    #[test]
    fn test_registry_loader() {
        let mut store = TypeStore::new();
        let mut loader = RegistryLoader::new();
        let page = store.new_named("p.Page");
        loader.register_type("p.Page", page);

        let str_t = store.basic(BasicType::Str);
        let sig = store.new_signature(vec![], vec![str_t], false);
        let mut funcs = BTreeMap::new();
        funcs.insert("shout".to_string(), sig);
        loader.register_func_map("p.Funcs", funcs);

        assert_eq!(loader.load_type(&mut store, "p.Page").unwrap(), page);
        assert!(matches!(
            loader.load_type(&mut store, "p.Missing"),
            Err(LoadError::NotFound(_))
        ));
        let loaded = loader.load_func_map(&mut store, "p.Funcs").unwrap();
        assert_eq!(loaded["shout"], sig);
    }

    #[test]
    fn test_null_loader_knows_nothing() {
        let mut store = TypeStore::new();
        let mut loader = NullLoader;
        assert!(loader.load_type(&mut store, "p.T").is_err());
        assert!(loader.load_func_map(&mut store, "p.V").is_err());
    }
}
