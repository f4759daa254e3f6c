//! Type storage and the universe of predeclared types.
//!
//! A [`TypeStore`] owns the arena all host types live in, plus one interned
//! key per basic kind. Constructors for composite types go through the store
//! so everything referencing a type does so by key.

use std::collections::HashMap;
use std::ops::Index;

use crate::arena::Arena;
use crate::typ::{
    ArrayDetail, BasicDetail, BasicType, ChanDetail, Field, InterfaceDetail, MapDetail, Method,
    NamedDetail, PointerDetail, SignatureDetail, SliceDetail, StructDetail, Type, TypeKey,
};

/// Owner of all host types for one checking session.
pub struct TypeStore {
    types: Arena<TypeKey, Type>,
    basics: HashMap<BasicType, TypeKey>,
    empty_interface: TypeKey,
}

impl TypeStore {
    /// Creates a store with every predeclared basic type interned.
    pub fn new() -> Self {
        let mut types = Arena::new();
        let mut basics = HashMap::new();
        for kind in [
            BasicType::Invalid,
            BasicType::Bool,
            BasicType::Int,
            BasicType::Int8,
            BasicType::Int16,
            BasicType::Int32,
            BasicType::Int64,
            BasicType::Uint,
            BasicType::Uint8,
            BasicType::Uint16,
            BasicType::Uint32,
            BasicType::Uint64,
            BasicType::Float32,
            BasicType::Float64,
            BasicType::Str,
            BasicType::Error,
            BasicType::UntypedBool,
            BasicType::UntypedInt,
            BasicType::UntypedFloat,
            BasicType::UntypedNil,
            BasicType::Byte,
            BasicType::Rune,
        ] {
            basics.insert(kind, types.insert(Type::Basic(BasicDetail::new(kind))));
        }
        let empty_interface = types.insert(Type::Interface(InterfaceDetail::new_empty()));
        Self {
            types,
            basics,
            empty_interface,
        }
    }

    /// The interned key for a basic kind.
    pub fn basic(&self, kind: BasicType) -> TypeKey {
        self.basics[&kind]
    }

    /// The interned empty interface (`any`).
    pub fn empty_interface(&self) -> TypeKey {
        self.empty_interface
    }

    /// Number of stored types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    // ------------------------------------------------------------------
    // Constructors
    // ------------------------------------------------------------------

    pub fn new_pointer(&mut self, base: TypeKey) -> TypeKey {
        self.types.insert(Type::Pointer(PointerDetail::new(base)))
    }

    pub fn new_slice(&mut self, elem: TypeKey) -> TypeKey {
        self.types.insert(Type::Slice(SliceDetail::new(elem)))
    }

    pub fn new_array(&mut self, elem: TypeKey, len: Option<u64>) -> TypeKey {
        self.types.insert(Type::Array(ArrayDetail::new(elem, len)))
    }

    pub fn new_map(&mut self, key: TypeKey, elem: TypeKey) -> TypeKey {
        self.types.insert(Type::Map(MapDetail::new(key, elem)))
    }

    pub fn new_chan(&mut self, elem: TypeKey) -> TypeKey {
        self.types.insert(Type::Chan(ChanDetail::new(elem)))
    }

    pub fn new_struct(&mut self, fields: Vec<Field>) -> TypeKey {
        self.types.insert(Type::Struct(StructDetail::new(fields)))
    }

    pub fn new_interface(&mut self, methods: Vec<Method>) -> TypeKey {
        self.types
            .insert(Type::Interface(InterfaceDetail::new(methods)))
    }

    pub fn new_signature(
        &mut self,
        params: Vec<TypeKey>,
        results: Vec<TypeKey>,
        variadic: bool,
    ) -> TypeKey {
        self.types
            .insert(Type::Signature(SignatureDetail::new(params, results, variadic)))
    }

    /// Inserts a named type as a placeholder; the underlying type is patched
    /// in later so cyclic definitions can be built in two phases.
    pub fn new_named(&mut self, qualified: impl Into<String>) -> TypeKey {
        self.types
            .insert(Type::Named(NamedDetail::new(qualified.into())))
    }

    /// Sets the underlying type of a named placeholder.
    pub fn set_underlying(&mut self, named: TypeKey, underlying: TypeKey) {
        match self.types.get_mut(named) {
            Some(Type::Named(n)) => n.set_underlying(underlying),
            _ => panic!("set_underlying on a non-named type"),
        }
    }

    /// Appends a method to a named type.
    pub fn add_method(&mut self, named: TypeKey, name: impl Into<String>, sig: TypeKey) {
        match self.types.get_mut(named) {
            Some(Type::Named(n)) => n.add_method(name.into(), sig),
            _ => panic!("add_method on a non-named type"),
        }
    }
}

impl Default for TypeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<TypeKey> for TypeStore {
    type Output = Type;

    #[inline]
    fn index(&self, key: TypeKey) -> &Type {
        &self.types[key]
    }
}
