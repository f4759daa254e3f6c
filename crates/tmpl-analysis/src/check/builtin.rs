//! Builtin template functions and their type relations.
//!
//! Each builtin maps `(dot, argument types)` to a result type or a
//! diagnostic. Arguments whose types are already unknown short-circuit the
//! relation without a second diagnostic.

use tmpl_common::Span;

use super::checker::Checker;
use crate::errors::TypeError;
use crate::typ::{self, peel, type_string, BasicType, Type, TypeKey};

/// The builtin functions of the template language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    And,
    Call,
    Html,
    Index,
    Slice,
    Js,
    Len,
    Not,
    Or,
    Print,
    Printf,
    Println,
    Urlquery,
    // comparisons
    Eq,
    Ge,
    Gt,
    Le,
    Lt,
    Ne,
}

impl Builtin {
    /// Maps a function name to its builtin, if it is one.
    pub fn from_name(name: &str) -> Option<Builtin> {
        Some(match name {
            "and" => Builtin::And,
            "call" => Builtin::Call,
            "html" => Builtin::Html,
            "index" => Builtin::Index,
            "slice" => Builtin::Slice,
            "js" => Builtin::Js,
            "len" => Builtin::Len,
            "not" => Builtin::Not,
            "or" => Builtin::Or,
            "print" => Builtin::Print,
            "printf" => Builtin::Printf,
            "println" => Builtin::Println,
            "urlquery" => Builtin::Urlquery,
            "eq" => Builtin::Eq,
            "ge" => Builtin::Ge,
            "gt" => Builtin::Gt,
            "le" => Builtin::Le,
            "lt" => Builtin::Lt,
            "ne" => Builtin::Ne,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::And => "and",
            Builtin::Call => "call",
            Builtin::Html => "html",
            Builtin::Index => "index",
            Builtin::Slice => "slice",
            Builtin::Js => "js",
            Builtin::Len => "len",
            Builtin::Not => "not",
            Builtin::Or => "or",
            Builtin::Print => "print",
            Builtin::Printf => "printf",
            Builtin::Println => "println",
            Builtin::Urlquery => "urlquery",
            Builtin::Eq => "eq",
            Builtin::Ge => "ge",
            Builtin::Gt => "gt",
            Builtin::Le => "le",
            Builtin::Lt => "lt",
            Builtin::Ne => "ne",
        }
    }
}

impl<'a> Checker<'a> {
    /// Applies a builtin's type relation to already-checked argument types.
    pub(super) fn check_builtin(
        &mut self,
        builtin: Builtin,
        span: Span,
        arg_types: &[Option<TypeKey>],
    ) -> Option<TypeKey> {
        // An absent argument type means the failure is already reported.
        let mut args = Vec::with_capacity(arg_types.len());
        for arg in arg_types {
            args.push((*arg)?);
        }

        match builtin {
            Builtin::Index => self.builtin_index(span, &args),
            Builtin::Len => self.builtin_len(span, &args),
            Builtin::Call => self.builtin_call(span, &args),
            Builtin::Slice => self.builtin_slice(span, &args),
            Builtin::And | Builtin::Or | Builtin::Not => {
                Some(self.store().basic(BasicType::Bool))
            }
            Builtin::Eq | Builtin::Ge | Builtin::Gt | Builtin::Le | Builtin::Lt | Builtin::Ne => {
                Some(self.store().basic(BasicType::Bool))
            }
            Builtin::Print
            | Builtin::Printf
            | Builtin::Println
            | Builtin::Html
            | Builtin::Js
            | Builtin::Urlquery => Some(self.store().basic(BasicType::Str)),
        }
    }

    /// `index item key1 key2 ...` digs through maps, slices, arrays and
    /// strings; the result is the value type of the innermost container.
    fn builtin_index(&mut self, span: Span, args: &[TypeKey]) -> Option<TypeKey> {
        if args.len() < 2 {
            self.report(
                span,
                TypeError::TooFewArgs,
                "function index: too few arguments".to_string(),
            );
            return None;
        }
        let mut item = args[0];
        for &key in &args[1..] {
            let Some(index_type) = self.index_type_of(item) else {
                self.report(
                    span,
                    TypeError::NotIndexable,
                    format!("can't index item of type {}", type_string(item, self.store())),
                );
                return None;
            };
            if !typ::assignable(key, index_type, self.store()) {
                self.report(
                    span,
                    TypeError::InvalidArg,
                    format!(
                        "index {} is not assignable to {}",
                        type_string(key, self.store()),
                        type_string(index_type, self.store())
                    ),
                );
                return None;
            }
            item = self.value_type_of(item)?;
        }
        Some(item)
    }

    /// `len x` for strings, slices, arrays, maps and channels.
    fn builtin_len(&mut self, span: Span, args: &[TypeKey]) -> Option<TypeKey> {
        if args.len() != 1 {
            self.report(
                span,
                TypeError::TooFewArgs,
                format!("function len: expected 1 argument, got {}", args.len()),
            );
            return None;
        }
        let arg = args[0];
        match &self.store()[peel(arg, self.store())] {
            Type::Slice(_) | Type::Array(_) | Type::Map(_) | Type::Chan(_) => {
                Some(self.store().basic(BasicType::Int))
            }
            Type::Basic(b) if b.typ().real_type() == BasicType::Str => {
                Some(self.store().basic(BasicType::Int))
            }
            _ => {
                self.report(
                    span,
                    TypeError::InvalidArg,
                    format!(
                        "function len: invalid argument type {}",
                        type_string(arg, self.store())
                    ),
                );
                None
            }
        }
    }

    /// `call fn args...` where `fn` follows the template calling convention:
    /// one result, or a result plus error.
    fn builtin_call(&mut self, span: Span, args: &[TypeKey]) -> Option<TypeKey> {
        let Some(&callee) = args.first() else {
            self.report(
                span,
                TypeError::TooFewArgs,
                "function call: too few arguments".to_string(),
            );
            return None;
        };
        let peeled = peel(callee, self.store());
        let results: Vec<TypeKey> = match &self.store()[peeled] {
            Type::Signature(sig) => sig.results().to_vec(),
            _ => {
                self.report(
                    span,
                    TypeError::InvalidArg,
                    format!(
                        "function call: non-function argument of type {}",
                        type_string(callee, self.store())
                    ),
                );
                return None;
            }
        };
        match results[..] {
            [result] => Some(result),
            [result, second] if typ::is_error(second, self.store()) => Some(result),
            _ => {
                self.report(
                    span,
                    TypeError::BadReturnArity,
                    format!(
                        "function call: callee has {} return values; expected 1 or 2 with trailing error",
                        results.len()
                    ),
                );
                None
            }
        }
    }

    /// `slice x i j k` keeps its operand's type. Index bounds are a
    /// runtime property; only the operand is typed here.
    fn builtin_slice(&mut self, span: Span, args: &[TypeKey]) -> Option<TypeKey> {
        let Some(&item) = args.first() else {
            self.report(
                span,
                TypeError::TooFewArgs,
                "function slice: too few arguments".to_string(),
            );
            return None;
        };
        Some(item)
    }

    /// The type a container is indexed by, if it is indexable.
    fn index_type_of(&self, item: TypeKey) -> Option<TypeKey> {
        match &self.store()[peel(item, self.store())] {
            Type::Map(m) => Some(m.key()),
            Type::Slice(_) | Type::Array(_) => Some(self.store().basic(BasicType::UntypedInt)),
            Type::Basic(b) if b.typ().real_type() == BasicType::Str => {
                Some(self.store().basic(BasicType::UntypedInt))
            }
            _ => None,
        }
    }

    /// The element type an index access on a container yields.
    fn value_type_of(&self, item: TypeKey) -> Option<TypeKey> {
        match &self.store()[peel(item, self.store())] {
            Type::Map(m) => Some(m.elem()),
            Type::Slice(s) => Some(s.elem()),
            Type::Array(a) => Some(a.elem()),
            Type::Basic(b) if b.typ().real_type() == BasicType::Str => {
                Some(self.store().basic(BasicType::Byte))
            }
            _ => None,
        }
    }
}
