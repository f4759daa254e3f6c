//! Field and method lookup.
//!
//! Resolves a name against a receiver type the way template execution does:
//! the method set of the named type first, then struct fields, then
//! promoted members of embedded fields, breadth-first so shallower members
//! shadow deeper ones. A seen-set guards against cyclic type graphs.

use std::collections::HashSet;

use crate::store::TypeStore;
use crate::typ::{try_deref, Type, TypeKey};

/// The result of [`lookup_field_or_method`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupResult {
    /// A field with the given type.
    Field(TypeKey),
    /// A method; the key is its signature type.
    Method(TypeKey),
    /// Nothing found.
    NotFound,
}

/// Looks up `name` as a field or method of `receiver`.
///
/// Promotion through embedded fields follows the host language: candidates
/// are scanned level by level, and within a level in declaration order, so
/// the first hit at the shallowest depth wins. Ambiguous promotions at equal
/// depth resolve to the first embedded parent in declaration order.
pub fn lookup_field_or_method(store: &TypeStore, receiver: TypeKey, name: &str) -> LookupResult {
    let (receiver, _) = try_deref(receiver, store);

    let mut current = vec![receiver];
    let mut seen: HashSet<TypeKey> = HashSet::new();

    while !current.is_empty() {
        let mut next = Vec::new();
        for candidate in current {
            let mut t = candidate;
            // Unwrap named/pointer layers, collecting named method sets on
            // the way down.
            loop {
                match &store[t] {
                    Type::Named(named) => {
                        if !seen.insert(t) {
                            t = candidate; // cycle; nothing more on this path
                            break;
                        }
                        if let Some(method) = named.methods().iter().find(|m| m.name == name) {
                            return LookupResult::Method(method.sig);
                        }
                        match named.try_underlying() {
                            Some(u) => t = u,
                            None => break,
                        }
                    }
                    Type::Pointer(p) => t = p.base(),
                    _ => break,
                }
            }
            match &store[t] {
                Type::Struct(s) => {
                    for field in s.fields() {
                        if field.name == name {
                            return LookupResult::Field(field.typ);
                        }
                        if field.embedded {
                            let (ft, _) = try_deref(field.typ, store);
                            if matches!(
                                &store[ft],
                                Type::Named(_) | Type::Struct(_) | Type::Interface(_)
                            ) {
                                next.push(ft);
                            }
                        }
                    }
                }
                Type::Interface(iface) => {
                    if let Some(method) = iface.methods().iter().find(|m| m.name == name) {
                        return LookupResult::Method(method.sig);
                    }
                }
                _ => {}
            }
        }
        current = next;
    }
    LookupResult::NotFound
}
