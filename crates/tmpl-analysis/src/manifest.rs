//! Manifest-backed type loading.
//!
//! A manifest is a JSON description of the host packages a template run can
//! see: named types (structs with embedded fields, interfaces, other named
//! types) and function-map variables. Type references inside the manifest
//! use the host language's surface syntax (`[]p.T`, `map[string]T`,
//! `func(int) string`, ...), parsed by a small recursive parser.
//!
//! ```json
//! {
//!   "packages": {
//!     "example.com/p": {
//!       "types": {
//!         "Page": {
//!           "kind": "struct",
//!           "fields": [{"name": "Title", "type": "string"}],
//!           "methods": [{"name": "URL", "signature": "func() string"}]
//!         }
//!       },
//!       "funcmaps": {"Funcs": {"shout": "func(string) string"}}
//!     }
//!   }
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;

use crate::loader::{LoadError, TypeLoader};
use crate::store::TypeStore;
use crate::typ::{BasicType, Field, Method, TypeKey};

/// Root of a type manifest.
#[derive(Debug, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub packages: BTreeMap<String, PackageDef>,
}

/// One host package.
#[derive(Debug, Deserialize)]
pub struct PackageDef {
    #[serde(default)]
    pub types: BTreeMap<String, TypeDef>,
    #[serde(default)]
    pub funcmaps: BTreeMap<String, BTreeMap<String, String>>,
}

/// Definition of one named type.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TypeDef {
    Struct {
        #[serde(default)]
        fields: Vec<FieldDef>,
        #[serde(default)]
        methods: Vec<MethodDef>,
    },
    Interface {
        #[serde(default)]
        methods: Vec<MethodDef>,
    },
    /// A named type over an arbitrary underlying type, e.g. `type Names []string`.
    Named {
        #[serde(rename = "type")]
        underlying: String,
        #[serde(default)]
        methods: Vec<MethodDef>,
    },
}

#[derive(Debug, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub typ: String,
    #[serde(default)]
    pub embedded: bool,
}

#[derive(Debug, Deserialize)]
pub struct MethodDef {
    pub name: String,
    /// A `func(...) ...` type expression.
    pub signature: String,
}

/// A [`TypeLoader`] backed by a [`Manifest`].
pub struct ManifestLoader {
    manifest: Manifest,
    cache: HashMap<String, TypeKey>,
}

impl ManifestLoader {
    pub fn new(manifest: Manifest) -> Self {
        Self {
            manifest,
            cache: HashMap::new(),
        }
    }

    /// Parses a manifest from JSON text.
    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        let manifest: Manifest =
            serde_json::from_str(json).map_err(|e| LoadError::Malformed(e.to_string()))?;
        Ok(Self::new(manifest))
    }

    /// Reads and parses a manifest file.
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| LoadError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// Resolves `name` within package `pkg`, loading it on first use.
    fn resolve(
        &mut self,
        store: &mut TypeStore,
        pkg: &str,
        name: &str,
    ) -> Result<TypeKey, LoadError> {
        let qualified = format!("{}.{}", pkg, name);
        if let Some(&key) = self.cache.get(&qualified) {
            return Ok(key);
        }
        if !self
            .manifest
            .packages
            .get(pkg)
            .is_some_and(|p| p.types.contains_key(name))
        {
            return Err(LoadError::NotFound(qualified));
        }

        // Insert the placeholder before descending so recursive and mutually
        // recursive definitions resolve to the same key.
        let key = store.new_named(qualified.clone());
        self.cache.insert(qualified.clone(), key);

        // Definitions are only read, but the borrow checker cannot see that
        // through `&mut self`; take the definition out and put it back.
        let def = self
            .manifest
            .packages
            .get_mut(pkg)
            .and_then(|p| p.types.remove(name))
            .ok_or_else(|| LoadError::NotFound(qualified.clone()))?;

        let result = self.build_named(store, pkg, key, &def);
        if let Some(package) = self.manifest.packages.get_mut(pkg) {
            package.types.insert(name.to_string(), def);
        }
        result?;
        Ok(key)
    }

    fn build_named(
        &mut self,
        store: &mut TypeStore,
        pkg: &str,
        key: TypeKey,
        def: &TypeDef,
    ) -> Result<(), LoadError> {
        match def {
            TypeDef::Struct { fields, methods } => {
                let mut built = Vec::with_capacity(fields.len());
                for field in fields {
                    built.push(Field {
                        name: field.name.clone(),
                        typ: self.parse_type(store, pkg, &field.typ)?,
                        embedded: field.embedded,
                    });
                }
                let underlying = store.new_struct(built);
                store.set_underlying(key, underlying);
                self.attach_methods(store, pkg, key, methods)
            }
            TypeDef::Interface { methods } => {
                let mut built = Vec::with_capacity(methods.len());
                for method in methods {
                    built.push(Method {
                        name: method.name.clone(),
                        sig: self.parse_signature_expr(store, pkg, &method.signature)?,
                    });
                }
                let underlying = store.new_interface(built);
                store.set_underlying(key, underlying);
                Ok(())
            }
            TypeDef::Named {
                underlying,
                methods,
            } => {
                let underlying = self.parse_type(store, pkg, underlying)?;
                store.set_underlying(key, underlying);
                self.attach_methods(store, pkg, key, methods)
            }
        }
    }

    fn attach_methods(
        &mut self,
        store: &mut TypeStore,
        pkg: &str,
        key: TypeKey,
        methods: &[MethodDef],
    ) -> Result<(), LoadError> {
        for method in methods {
            let sig = self.parse_signature_expr(store, pkg, &method.signature)?;
            store.add_method(key, method.name.clone(), sig);
        }
        Ok(())
    }

    fn parse_signature_expr(
        &mut self,
        store: &mut TypeStore,
        pkg: &str,
        expr: &str,
    ) -> Result<TypeKey, LoadError> {
        let key = self.parse_type(store, pkg, expr)?;
        if store[key].try_as_signature().is_none() {
            return Err(LoadError::Malformed(format!(
                "expected a func type, got {:?}",
                expr
            )));
        }
        Ok(key)
    }

    // ------------------------------------------------------------------
    // Type expression parsing
    // ------------------------------------------------------------------

    /// Parses a complete type expression like `map[string][]p.T`.
    pub fn parse_type(
        &mut self,
        store: &mut TypeStore,
        pkg: &str,
        expr: &str,
    ) -> Result<TypeKey, LoadError> {
        let (key, rest) = self.parse_prefix(store, pkg, expr)?;
        if !rest.trim().is_empty() {
            return Err(LoadError::Malformed(format!(
                "trailing input {:?} in type expression {:?}",
                rest.trim(),
                expr
            )));
        }
        Ok(key)
    }

    /// Parses one type from the front of `input`, returning the remainder.
    fn parse_prefix<'s>(
        &mut self,
        store: &mut TypeStore,
        pkg: &str,
        input: &'s str,
    ) -> Result<(TypeKey, &'s str), LoadError> {
        let input = input.trim_start();

        if let Some(rest) = input.strip_prefix('*') {
            let (base, rest) = self.parse_prefix(store, pkg, rest)?;
            return Ok((store.new_pointer(base), rest));
        }
        if let Some(rest) = input.strip_prefix("[]") {
            let (elem, rest) = self.parse_prefix(store, pkg, rest)?;
            return Ok((store.new_slice(elem), rest));
        }
        if let Some(rest) = input.strip_prefix("map[") {
            let (key, rest) = self.parse_prefix(store, pkg, rest)?;
            let rest = expect_prefix(rest, ']')?;
            let (elem, rest) = self.parse_prefix(store, pkg, rest)?;
            return Ok((store.new_map(key, elem), rest));
        }
        if input.starts_with('[') {
            let close = input
                .find(']')
                .ok_or_else(|| LoadError::Malformed(format!("unclosed [ in {:?}", input)))?;
            let len: u64 = input[1..close].trim().parse().map_err(|_| {
                LoadError::Malformed(format!("bad array length in {:?}", input))
            })?;
            let (elem, rest) = self.parse_prefix(store, pkg, &input[close + 1..])?;
            return Ok((store.new_array(elem, Some(len)), rest));
        }
        if let Some(rest) = strip_word(input, "chan") {
            let (elem, rest) = self.parse_prefix(store, pkg, rest)?;
            return Ok((store.new_chan(elem), rest));
        }
        if let Some(rest) = strip_word(input, "func") {
            return self.parse_func(store, pkg, rest);
        }
        if let Some(rest) = strip_word(input, "interface{}") {
            return Ok((store.empty_interface(), rest));
        }

        let end = input
            .find(|c: char| !(c.is_alphanumeric() || matches!(c, '_' | '.' | '/' | '-')))
            .unwrap_or(input.len());
        let ident = &input[..end];
        let rest = &input[end..];
        if ident.is_empty() {
            return Err(LoadError::Malformed(format!(
                "expected a type at {:?}",
                input
            )));
        }

        if let Some(basic) = basic_by_name(ident) {
            return Ok((store.basic(basic), rest));
        }
        if ident == "any" {
            return Ok((store.empty_interface(), rest));
        }

        let key = match ident.rfind('.') {
            Some(dot) => self.resolve(store, &ident[..dot], &ident[dot + 1..])?,
            None => self.resolve(store, pkg, ident)?,
        };
        Ok((key, rest))
    }

    /// Parses the parameter and result lists after the `func` keyword.
    fn parse_func<'s>(
        &mut self,
        store: &mut TypeStore,
        pkg: &str,
        input: &'s str,
    ) -> Result<(TypeKey, &'s str), LoadError> {
        let mut rest = expect_prefix(input, '(')?;
        let mut params = Vec::new();
        let mut variadic = false;

        loop {
            rest = rest.trim_start();
            if let Some(after) = rest.strip_prefix(')') {
                rest = after;
                break;
            }
            if !params.is_empty() {
                rest = expect_prefix(rest, ',')?;
            }
            rest = rest.trim_start();
            if let Some(after) = rest.strip_prefix("...") {
                variadic = true;
                rest = after;
            }
            let (param, after) = self.parse_prefix(store, pkg, rest)?;
            params.push(param);
            rest = after;
        }

        let mut results = Vec::new();
        let trimmed = rest.trim_start();
        if let Some(mut list) = trimmed.strip_prefix('(') {
            loop {
                list = list.trim_start();
                if let Some(after) = list.strip_prefix(')') {
                    rest = after;
                    break;
                }
                if !results.is_empty() {
                    list = expect_prefix(list, ',')?;
                }
                let (result, after) = self.parse_prefix(store, pkg, list)?;
                results.push(result);
                list = after;
            }
        } else if starts_type(trimmed) {
            let (result, after) = self.parse_prefix(store, pkg, trimmed)?;
            results.push(result);
            rest = after;
        }

        Ok((store.new_signature(params, results, variadic), rest))
    }
}

impl TypeLoader for ManifestLoader {
    fn load_type(
        &mut self,
        store: &mut TypeStore,
        qualified: &str,
    ) -> Result<TypeKey, LoadError> {
        match crate::annotation::split_qualified(qualified) {
            Some((pkg, name)) => self.resolve(store, pkg, name),
            None => Err(LoadError::Malformed(format!(
                "{:?} is not a qualified type name",
                qualified
            ))),
        }
    }

    fn load_func_map(
        &mut self,
        store: &mut TypeStore,
        qualified: &str,
    ) -> Result<BTreeMap<String, TypeKey>, LoadError> {
        let (pkg, var) = crate::annotation::split_qualified(qualified).ok_or_else(|| {
            LoadError::Malformed(format!("{:?} is not a qualified variable name", qualified))
        })?;
        let signatures = self
            .manifest
            .packages
            .get(pkg)
            .and_then(|p| p.funcmaps.get(var))
            .cloned()
            .ok_or_else(|| LoadError::NotFound(qualified.to_string()))?;

        let mut funcs = BTreeMap::new();
        for (name, expr) in signatures {
            let sig = self.parse_signature_expr(store, pkg, &expr)?;
            funcs.insert(name, sig);
        }
        Ok(funcs)
    }
}

fn expect_prefix(input: &str, c: char) -> Result<&str, LoadError> {
    input
        .trim_start()
        .strip_prefix(c)
        .ok_or_else(|| LoadError::Malformed(format!("expected {:?} at {:?}", c, input)))
}

/// Strips a keyword and requires it not to run into a longer identifier.
fn strip_word<'s>(input: &'s str, word: &str) -> Option<&'s str> {
    let rest = input.strip_prefix(word)?;
    match rest.chars().next() {
        Some(c) if c.is_alphanumeric() || c == '_' => None,
        _ => Some(rest),
    }
}

/// Reports whether the remainder could begin a type (used for optional
/// single function results).
fn starts_type(input: &str) -> bool {
    match input.chars().next() {
        None => false,
        Some(c) => c.is_alphanumeric() || matches!(c, '*' | '[' | '_'),
    }
}

fn basic_by_name(name: &str) -> Option<BasicType> {
    Some(match name {
        "bool" => BasicType::Bool,
        "int" => BasicType::Int,
        "int8" => BasicType::Int8,
        "int16" => BasicType::Int16,
        "int32" => BasicType::Int32,
        "int64" => BasicType::Int64,
        "uint" => BasicType::Uint,
        "uint8" => BasicType::Uint8,
        "uint16" => BasicType::Uint16,
        "uint32" => BasicType::Uint32,
        "uint64" => BasicType::Uint64,
        "float32" => BasicType::Float32,
        "float64" => BasicType::Float64,
        "string" => BasicType::Str,
        "byte" => BasicType::Byte,
        "rune" => BasicType::Rune,
        "error" => BasicType::Error,
        _ => return None,
    })
}
