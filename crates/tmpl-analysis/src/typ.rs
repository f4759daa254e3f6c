//! Host type representations.
//!
//! Models the slice of the host language's type system a template can
//! observe: basic types, named types with methods, pointers, structs with
//! embedded fields, interfaces, maps, slices, arrays, channels and function
//! signatures. Types are arena-allocated and referenced by [`TypeKey`].

use std::collections::HashSet;
use std::fmt::Write;

use crate::define_key;
use crate::store::TypeStore;

define_key! {
    /// Key of a type in the [`TypeStore`] arena.
    pub struct TypeKey;
}

/// A host type.
#[derive(Debug)]
pub enum Type {
    Basic(BasicDetail),
    Named(NamedDetail),
    Pointer(PointerDetail),
    Struct(StructDetail),
    Interface(InterfaceDetail),
    Map(MapDetail),
    Slice(SliceDetail),
    Array(ArrayDetail),
    Chan(ChanDetail),
    Signature(SignatureDetail),
}

impl Type {
    pub fn try_as_basic(&self) -> Option<&BasicDetail> {
        match self {
            Type::Basic(b) => Some(b),
            _ => None,
        }
    }

    pub fn try_as_named(&self) -> Option<&NamedDetail> {
        match self {
            Type::Named(n) => Some(n),
            _ => None,
        }
    }

    pub fn try_as_struct(&self) -> Option<&StructDetail> {
        match self {
            Type::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn try_as_interface(&self) -> Option<&InterfaceDetail> {
        match self {
            Type::Interface(i) => Some(i),
            _ => None,
        }
    }

    pub fn try_as_map(&self) -> Option<&MapDetail> {
        match self {
            Type::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn try_as_signature(&self) -> Option<&SignatureDetail> {
        match self {
            Type::Signature(s) => Some(s),
            _ => None,
        }
    }
}

/// Basic type kinds, including the untyped kinds template literals produce.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BasicType {
    Invalid,
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    Str,
    /// The host language's error interface, kept as a basic kind because the
    /// checker only ever asks "is this the error type".
    Error,
    // untyped literal kinds
    UntypedBool,
    UntypedInt,
    UntypedFloat,
    UntypedNil,
    // aliases
    Byte, // = Uint8
    Rune, // = Int32
}

impl BasicType {
    pub fn is_untyped(&self) -> bool {
        matches!(
            self,
            BasicType::UntypedBool
                | BasicType::UntypedInt
                | BasicType::UntypedFloat
                | BasicType::UntypedNil
        )
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            BasicType::Int
                | BasicType::Int8
                | BasicType::Int16
                | BasicType::Int32
                | BasicType::Int64
                | BasicType::Uint
                | BasicType::Uint8
                | BasicType::Uint16
                | BasicType::Uint32
                | BasicType::Uint64
                | BasicType::Byte
                | BasicType::Rune
        )
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || matches!(self, BasicType::Float32 | BasicType::Float64)
    }

    /// Resolves aliases to their canonical kind.
    pub fn real_type(&self) -> BasicType {
        match self {
            BasicType::Byte => BasicType::Uint8,
            BasicType::Rune => BasicType::Int32,
            _ => *self,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BasicType::Invalid => "invalid type",
            BasicType::Bool => "bool",
            BasicType::Int => "int",
            BasicType::Int8 => "int8",
            BasicType::Int16 => "int16",
            BasicType::Int32 => "int32",
            BasicType::Int64 => "int64",
            BasicType::Uint => "uint",
            BasicType::Uint8 => "uint8",
            BasicType::Uint16 => "uint16",
            BasicType::Uint32 => "uint32",
            BasicType::Uint64 => "uint64",
            BasicType::Float32 => "float32",
            BasicType::Float64 => "float64",
            BasicType::Str => "string",
            BasicType::Error => "error",
            BasicType::UntypedBool => "untyped bool",
            BasicType::UntypedInt => "untyped int",
            BasicType::UntypedFloat => "untyped float",
            BasicType::UntypedNil => "untyped nil",
            BasicType::Byte => "byte",
            BasicType::Rune => "rune",
        }
    }
}

/// A basic type.
#[derive(Copy, Clone, Debug)]
pub struct BasicDetail {
    typ: BasicType,
}

impl BasicDetail {
    pub fn new(typ: BasicType) -> BasicDetail {
        BasicDetail { typ }
    }

    pub fn typ(&self) -> BasicType {
        self.typ
    }

    pub fn name(&self) -> &'static str {
        self.typ.name()
    }
}

/// A method of a named type or an interface.
#[derive(Debug, Clone)]
pub struct Method {
    pub name: String,
    /// Always a `Signature` type.
    pub sig: TypeKey,
}

/// A named (defined) type with its method set.
#[derive(Debug)]
pub struct NamedDetail {
    qualified: String,
    underlying: Option<TypeKey>,
    methods: Vec<Method>,
}

impl NamedDetail {
    pub fn new(qualified: String) -> NamedDetail {
        NamedDetail {
            qualified,
            underlying: None,
            methods: Vec::new(),
        }
    }

    /// The qualified name, e.g. `example.com/p.Dot1`.
    pub fn qualified(&self) -> &str {
        &self.qualified
    }

    /// The underlying type; panics if the type is still a placeholder.
    pub fn underlying(&self) -> TypeKey {
        self.underlying.expect("named type without underlying")
    }

    pub fn try_underlying(&self) -> Option<TypeKey> {
        self.underlying
    }

    pub fn set_underlying(&mut self, t: TypeKey) {
        self.underlying = Some(t);
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn add_method(&mut self, name: String, sig: TypeKey) {
        self.methods.push(Method { name, sig });
    }
}

/// A pointer type.
#[derive(Debug)]
pub struct PointerDetail {
    base: TypeKey,
}

impl PointerDetail {
    pub fn new(base: TypeKey) -> PointerDetail {
        PointerDetail { base }
    }

    pub fn base(&self) -> TypeKey {
        self.base
    }
}

/// A struct field. Embedded fields carry the name of their type and are
/// searched for promoted members during lookup.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub typ: TypeKey,
    pub embedded: bool,
}

/// A struct type with ordered named fields.
#[derive(Debug)]
pub struct StructDetail {
    fields: Vec<Field>,
}

impl StructDetail {
    pub fn new(fields: Vec<Field>) -> StructDetail {
        StructDetail { fields }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }
}

/// An interface type with ordered named methods.
#[derive(Debug)]
pub struct InterfaceDetail {
    methods: Vec<Method>,
}

impl InterfaceDetail {
    pub fn new(methods: Vec<Method>) -> InterfaceDetail {
        InterfaceDetail { methods }
    }

    pub fn new_empty() -> InterfaceDetail {
        InterfaceDetail {
            methods: Vec::new(),
        }
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// A map type.
#[derive(Debug)]
pub struct MapDetail {
    key: TypeKey,
    elem: TypeKey,
}

impl MapDetail {
    pub fn new(key: TypeKey, elem: TypeKey) -> MapDetail {
        MapDetail { key, elem }
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn elem(&self) -> TypeKey {
        self.elem
    }
}

/// A slice type.
#[derive(Debug)]
pub struct SliceDetail {
    elem: TypeKey,
}

impl SliceDetail {
    pub fn new(elem: TypeKey) -> SliceDetail {
        SliceDetail { elem }
    }

    pub fn elem(&self) -> TypeKey {
        self.elem
    }
}

/// An array type.
#[derive(Debug)]
pub struct ArrayDetail {
    len: Option<u64>,
    elem: TypeKey,
}

impl ArrayDetail {
    pub fn new(elem: TypeKey, len: Option<u64>) -> ArrayDetail {
        ArrayDetail { len, elem }
    }

    pub fn len(&self) -> Option<u64> {
        self.len
    }

    pub fn elem(&self) -> TypeKey {
        self.elem
    }
}

/// A channel type. Direction is irrelevant to template checking.
#[derive(Debug)]
pub struct ChanDetail {
    elem: TypeKey,
}

impl ChanDetail {
    pub fn new(elem: TypeKey) -> ChanDetail {
        ChanDetail { elem }
    }

    pub fn elem(&self) -> TypeKey {
        self.elem
    }
}

/// A function signature.
#[derive(Debug)]
pub struct SignatureDetail {
    params: Vec<TypeKey>,
    results: Vec<TypeKey>,
    variadic: bool,
}

impl SignatureDetail {
    pub fn new(params: Vec<TypeKey>, results: Vec<TypeKey>, variadic: bool) -> SignatureDetail {
        SignatureDetail {
            params,
            results,
            variadic,
        }
    }

    pub fn params(&self) -> &[TypeKey] {
        &self.params
    }

    pub fn results(&self) -> &[TypeKey] {
        &self.results
    }

    pub fn variadic(&self) -> bool {
        self.variadic
    }
}

// ----------------------------------------------------------------------------
// Utility functions

/// Returns the underlying type of `t`: one step of `Named` unwrapping.
pub fn underlying_type(t: TypeKey, store: &TypeStore) -> TypeKey {
    match &store[t] {
        Type::Named(n) => n.try_underlying().unwrap_or(t),
        _ => t,
    }
}

/// Peels `Named` and `Pointer` wrappers until a structural type remains.
pub fn peel(t: TypeKey, store: &TypeStore) -> TypeKey {
    let mut t = t;
    loop {
        match &store[t] {
            Type::Named(n) => match n.try_underlying() {
                Some(u) => t = u,
                None => return t,
            },
            Type::Pointer(p) => t = p.base(),
            _ => return t,
        }
    }
}

/// Unwraps one pointer level, reporting whether it was a pointer.
pub fn try_deref(t: TypeKey, store: &TypeStore) -> (TypeKey, bool) {
    match &store[t] {
        Type::Pointer(p) => (p.base(), true),
        _ => (t, false),
    }
}

pub fn is_string(t: TypeKey, store: &TypeStore) -> bool {
    matches!(
        &store[peel(t, store)],
        Type::Basic(b) if b.typ().real_type() == BasicType::Str
    )
}

pub fn is_error(t: TypeKey, store: &TypeStore) -> bool {
    matches!(&store[t], Type::Basic(b) if b.typ() == BasicType::Error)
}

/// Reports whether the nil value inhabits `t`.
pub fn has_nil(t: TypeKey, store: &TypeStore) -> bool {
    matches!(
        &store[underlying_type(t, store)],
        Type::Slice(_)
            | Type::Map(_)
            | Type::Chan(_)
            | Type::Signature(_)
            | Type::Interface(_)
            | Type::Pointer(_)
    )
}

/// Reports whether `x` and `y` are identical types.
pub fn identical(x: TypeKey, y: TypeKey, store: &TypeStore) -> bool {
    identical_impl(x, y, &mut HashSet::new(), store)
}

fn identical_impl(
    x: TypeKey,
    y: TypeKey,
    assumed: &mut HashSet<(TypeKey, TypeKey)>,
    store: &TypeStore,
) -> bool {
    if x == y {
        return true;
    }
    match (&store[x], &store[y]) {
        (Type::Basic(bx), Type::Basic(by)) => bx.typ().real_type() == by.typ().real_type(),
        (Type::Named(nx), Type::Named(ny)) => nx.qualified() == ny.qualified(),
        (Type::Pointer(px), Type::Pointer(py)) => {
            identical_impl(px.base(), py.base(), assumed, store)
        }
        (Type::Slice(sx), Type::Slice(sy)) => identical_impl(sx.elem(), sy.elem(), assumed, store),
        (Type::Array(ax), Type::Array(ay)) => {
            ax.len() == ay.len() && identical_impl(ax.elem(), ay.elem(), assumed, store)
        }
        (Type::Map(mx), Type::Map(my)) => {
            identical_impl(mx.key(), my.key(), assumed, store)
                && identical_impl(mx.elem(), my.elem(), assumed, store)
        }
        (Type::Chan(cx), Type::Chan(cy)) => identical_impl(cx.elem(), cy.elem(), assumed, store),
        (Type::Struct(sx), Type::Struct(sy)) => {
            if sx.fields().len() != sy.fields().len() {
                return false;
            }
            if !assumed.insert((x, y)) {
                return true;
            }
            sx.fields().iter().zip(sy.fields()).all(|(fx, fy)| {
                fx.name == fy.name
                    && fx.embedded == fy.embedded
                    && identical_impl(fx.typ, fy.typ, assumed, store)
            })
        }
        (Type::Interface(ix), Type::Interface(iy)) => {
            if ix.methods().len() != iy.methods().len() {
                return false;
            }
            if !assumed.insert((x, y)) {
                return true;
            }
            ix.methods().iter().zip(iy.methods()).all(|(mx, my)| {
                mx.name == my.name && identical_impl(mx.sig, my.sig, assumed, store)
            })
        }
        (Type::Signature(fx), Type::Signature(fy)) => {
            if fx.variadic() != fy.variadic()
                || fx.params().len() != fy.params().len()
                || fx.results().len() != fy.results().len()
            {
                return false;
            }
            if !assumed.insert((x, y)) {
                return true;
            }
            fx.params()
                .iter()
                .zip(fy.params())
                .chain(fx.results().iter().zip(fy.results()))
                .all(|(&px, &py)| identical_impl(px, py, assumed, store))
        }
        _ => false,
    }
}

/// Reports whether a value of type `from` is assignable to `to`.
///
/// This follows the host language's assignability relation where templates
/// can observe it; untyped literal kinds are assignable to every concrete
/// type of their class.
pub fn assignable(from: TypeKey, to: TypeKey, store: &TypeStore) -> bool {
    if identical(from, to, store) {
        return true;
    }

    // Invalid types assign anywhere so one failure does not cascade.
    if matches!(&store[from], Type::Basic(b) if b.typ() == BasicType::Invalid)
        || matches!(&store[to], Type::Basic(b) if b.typ() == BasicType::Invalid)
    {
        return true;
    }

    let to_peeled = peel(to, store);

    if let Type::Basic(b) = &store[from] {
        match b.typ() {
            BasicType::UntypedNil => return has_nil(to, store),
            BasicType::UntypedInt => {
                if let Type::Basic(t) = &store[to_peeled] {
                    return t.typ().is_numeric();
                }
                return false;
            }
            BasicType::UntypedFloat => {
                if let Type::Basic(t) = &store[to_peeled] {
                    return matches!(t.typ(), BasicType::Float32 | BasicType::Float64);
                }
                return false;
            }
            BasicType::UntypedBool => {
                if let Type::Basic(t) = &store[to_peeled] {
                    return t.typ() == BasicType::Bool;
                }
                return false;
            }
            _ => {}
        }
    }

    // Identical underlying types where at least one side is unnamed.
    let from_under = underlying_type(from, store);
    let to_under = underlying_type(to, store);
    if identical(from_under, to_under, store)
        && (store[from].try_as_named().is_none() || store[to].try_as_named().is_none())
    {
        return true;
    }

    // Interface satisfaction by method presence.
    if let Type::Interface(iface) = &store[to_peeled] {
        if iface.is_empty() {
            return true;
        }
        return iface.methods().iter().all(|want| {
            match crate::lookup::lookup_field_or_method(store, from, &want.name) {
                crate::lookup::LookupResult::Method(sig) => identical(sig, want.sig, store),
                _ => false,
            }
        });
    }

    false
}

// ----------------------------------------------------------------------------
// Formatting

/// Renders `t` the way the host language spells it. Named types print their
/// qualified name; recursion through the type graph is cycle-guarded.
pub fn type_string(t: TypeKey, store: &TypeStore) -> String {
    let mut out = String::new();
    write_type(&mut out, t, &mut HashSet::new(), store);
    out
}

fn write_type(out: &mut String, t: TypeKey, visited: &mut HashSet<TypeKey>, store: &TypeStore) {
    match &store[t] {
        Type::Basic(b) => {
            out.push_str(b.name());
        }
        Type::Named(n) => {
            out.push_str(n.qualified());
        }
        Type::Pointer(p) => {
            out.push('*');
            write_type(out, p.base(), visited, store);
        }
        Type::Slice(s) => {
            out.push_str("[]");
            write_type(out, s.elem(), visited, store);
        }
        Type::Array(a) => {
            match a.len() {
                Some(n) => {
                    let _ = write!(out, "[{}]", n);
                }
                None => out.push_str("[?]"),
            }
            write_type(out, a.elem(), visited, store);
        }
        Type::Map(m) => {
            out.push_str("map[");
            write_type(out, m.key(), visited, store);
            out.push(']');
            write_type(out, m.elem(), visited, store);
        }
        Type::Chan(c) => {
            out.push_str("chan ");
            write_type(out, c.elem(), visited, store);
        }
        Type::Struct(s) => {
            if !visited.insert(t) {
                out.push_str("struct{...}");
                return;
            }
            out.push_str("struct{");
            for (i, field) in s.fields().iter().enumerate() {
                if i > 0 {
                    out.push_str("; ");
                }
                if !field.embedded {
                    out.push_str(&field.name);
                    out.push(' ');
                }
                write_type(out, field.typ, visited, store);
            }
            out.push('}');
        }
        Type::Interface(iface) => {
            if !visited.insert(t) {
                out.push_str("interface{...}");
                return;
            }
            out.push_str("interface{");
            for (i, method) in iface.methods().iter().enumerate() {
                if i > 0 {
                    out.push_str("; ");
                }
                out.push_str(&method.name);
                write_signature(out, method.sig, visited, store);
            }
            out.push('}');
        }
        Type::Signature(_) => {
            out.push_str("func");
            write_signature(out, t, visited, store);
        }
    }
}

fn write_signature(
    out: &mut String,
    t: TypeKey,
    visited: &mut HashSet<TypeKey>,
    store: &TypeStore,
) {
    let Type::Signature(sig) = &store[t] else {
        out.push_str("(?)");
        return;
    };
    out.push('(');
    for (i, &param) in sig.params().iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        if sig.variadic() && i == sig.params().len() - 1 {
            out.push_str("...");
        }
        write_type(out, param, visited, store);
    }
    out.push(')');
    match sig.results() {
        [] => {}
        [result] => {
            out.push(' ');
            write_type(out, *result, visited, store);
        }
        results => {
            out.push_str(" (");
            for (i, &result) in results.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_type(out, result, visited, store);
            }
            out.push(')');
        }
    }
}
