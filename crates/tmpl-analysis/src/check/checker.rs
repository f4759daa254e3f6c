//! The checker state machine.
//!
//! A [`Checker`] walks parsed template trees against the current dot type,
//! mirroring template execution at the type level: pipelines thread a
//! `final` value left to right, `range`/`with` re-scope the dot and the
//! variable stack, and `template` invocations recurse into sub-templates
//! with a fresh `$`.
//!
//! The walker never aborts on a type error. It records a diagnostic,
//! substitutes an absent type and keeps going, so one run reports as many
//! findings as possible; absent types suppress dependent findings.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use tmpl_common::{DiagnosticSink, FileId, Label, SourceManager, Span};
use tmpl_syntax::ast::{
    BranchNode, ChainNode, CommandNode, CommentNode, Expr, IdentNode, ListNode, Node, PipeNode,
    TemplateNode, Tree, TreeSet, VariableNode,
};

use super::builtin::Builtin;
use crate::annotation::parse_annotation;
use crate::errors::TypeError;
use crate::loader::{LoadError, TypeLoader};
use crate::lookup::{lookup_field_or_method, LookupResult};
use crate::store::TypeStore;
use crate::typ::{self, peel, type_string, BasicType, Type, TypeKey};

/// Checker options, typically filled from CLI flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckOptions {
    /// Downgrade unknown functions to warnings.
    pub allow_undefined_funcs: bool,
    /// Downgrade unknown templates to warnings.
    pub allow_undefined_templates: bool,
    /// Emit `debug:` logs to stderr.
    pub verbose: bool,
}

/// All trees available to one check, each with the file it was parsed from.
pub type NamedTreeMap = BTreeMap<String, (FileId, Tree)>;

/// Two files defined the same template name.
#[derive(Debug)]
pub struct DuplicateTemplate(pub String);

impl fmt::Display for DuplicateTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "template {:?} defined in multiple files", self.0)
    }
}

impl std::error::Error for DuplicateTemplate {}

/// Merges the trees of one parsed file into the named tree map.
pub fn add_trees(
    map: &mut NamedTreeMap,
    file: FileId,
    set: TreeSet,
) -> Result<(), DuplicateTemplate> {
    for (name, tree) in set {
        if map.contains_key(&name) {
            return Err(DuplicateTemplate(name));
        }
        map.insert(name, (file, tree));
    }
    Ok(())
}

/// A fatal condition that prevents checking entirely.
#[derive(Debug)]
pub enum CheckError {
    /// The requested entry template does not exist in the tree map.
    EntryNotFound(String),
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckError::EntryNotFound(name) => write!(f, "entry template {:?} not found", name),
        }
    }
}

impl std::error::Error for CheckError {}

/// A named variable binding. Slot 0 of the stack is always `$`.
#[derive(Debug, Clone)]
struct Variable {
    name: String,
    typ: Option<TypeKey>,
}

impl Variable {
    fn dollar(typ: Option<TypeKey>) -> Variable {
        Variable {
            name: "$".to_string(),
            typ,
        }
    }
}

/// The template type checker.
pub struct Checker<'a> {
    store: &'a mut TypeStore,
    loader: &'a mut dyn TypeLoader,
    sources: &'a SourceManager,
    trees: &'a NamedTreeMap,
    opts: CheckOptions,
    /// User-defined function name → signature.
    func_map: BTreeMap<String, TypeKey>,

    /// Variable stack; grows in range/with/pipe declarations, truncated on
    /// scope exit.
    vars: Vec<Variable>,
    /// Names of trees already walked (or being walked) in this run.
    visited: HashSet<String>,
    /// Accumulated findings.
    sink: DiagnosticSink,
    /// File of the tree currently being walked.
    file: FileId,
    /// Span of the enclosing action, quoted in diagnostics.
    action: Option<Span>,
    /// Number of `@type` annotations seen in the current tree.
    annotations_seen: usize,
}

impl<'a> Checker<'a> {
    pub fn new(
        store: &'a mut TypeStore,
        loader: &'a mut dyn TypeLoader,
        sources: &'a SourceManager,
        trees: &'a NamedTreeMap,
        opts: CheckOptions,
    ) -> Self {
        Self {
            store,
            loader,
            sources,
            trees,
            opts,
            func_map: BTreeMap::new(),
            vars: Vec::new(),
            visited: HashSet::new(),
            sink: DiagnosticSink::new(),
            file: 0,
            action: None,
            annotations_seen: 0,
        }
    }

    /// Installs the user-defined function table.
    pub fn with_func_map(mut self, func_map: BTreeMap<String, TypeKey>) -> Self {
        self.func_map = func_map;
        self
    }

    /// Checks the entry template, then any never-invoked named templates,
    /// and returns every diagnostic in encounter order.
    pub fn check(
        mut self,
        entry: &str,
        initial_dot: Option<TypeKey>,
    ) -> Result<DiagnosticSink, CheckError> {
        if !self.trees.contains_key(entry) {
            return Err(CheckError::EntryNotFound(entry.to_string()));
        }
        self.check_tree(entry, initial_dot);

        // `define`-only trees that nothing invoked still get a pass, with an
        // unannotated dot. BTreeMap order keeps this deterministic.
        let trees = self.trees;
        let names: Vec<&'a String> = trees.keys().collect();
        for name in names {
            if !self.visited.contains(name.as_str()) {
                self.check_tree(name, None);
            }
        }
        Ok(self.sink)
    }

    fn check_tree(&mut self, name: &str, dot: Option<TypeKey>) {
        let trees = self.trees;
        let Some((file, tree)) = trees.get(name) else {
            return;
        };
        self.visited.insert(name.to_string());
        self.file = *file;
        self.annotations_seen = 0;
        self.action = None;
        self.vars = vec![Variable::dollar(dot)];
        self.walk_list(dot, &tree.root);
    }

    // ------------------------------------------------------------------
    // Variable stack
    // ------------------------------------------------------------------

    /// Returns the binding for `name`, innermost first. Outer `None` means
    /// the variable is not in scope at all.
    fn lookup_var(&self, name: &str) -> Option<Option<TypeKey>> {
        self.vars.iter().rev().find(|v| v.name == name).map(|v| v.typ)
    }

    /// Rebinds the nearest binding of `name`; false if there is none.
    fn set_var(&mut self, name: &str, typ: Option<TypeKey>) -> bool {
        for var in self.vars.iter_mut().rev() {
            if var.name == name {
                var.typ = typ;
                return true;
            }
        }
        false
    }

    fn push_var(&mut self, name: &str, typ: Option<TypeKey>) {
        self.vars.push(Variable {
            name: name.to_string(),
            typ,
        });
    }

    /// `$` tracks the annotated dot while we are still at the top level.
    fn set_top_dot(&mut self, typ: TypeKey) {
        if self.vars.len() == 1 && self.vars[0].name == "$" {
            self.vars[0].typ = Some(typ);
        }
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    fn emit_at(&mut self, span: Span, kind: TypeError, message: String, downgrade: bool) {
        let mut diag = kind.diagnostic(message);
        if downgrade {
            diag = diag.downgraded();
        }
        diag = diag.with_label(Label::primary(self.file, span));
        if let Some(action) = self.action {
            if let Some(snippet) = self.sources.snippet(self.file, action) {
                diag = diag.with_context(snippet.trim().to_string());
            }
        }
        self.sink.emit(diag);
    }

    fn error_at(&mut self, span: Span, kind: TypeError, message: String) {
        self.emit_at(span, kind, message, false);
    }

    fn debugf(&self, span: Option<Span>, message: &str) {
        if !self.opts.verbose {
            return;
        }
        match span {
            Some(s) => eprintln!(
                "{}: debug: {}",
                self.sources.format_location(self.file, s.start),
                message
            ),
            None => eprintln!("debug: {}", message),
        }
    }

    fn type_name(&self, typ: Option<TypeKey>) -> String {
        match typ {
            Some(t) => type_string(t, self.store),
            None => "<nil>".to_string(),
        }
    }

    // ------------------------------------------------------------------
    // Walking
    // ------------------------------------------------------------------

    /// Walks one node. The returned dot differs from the passed one only
    /// when a `@type` annotation rebinds it.
    fn walk(&mut self, dot: Option<TypeKey>, node: &Node) -> Option<TypeKey> {
        match node {
            Node::Text(_) | Node::Break(_) | Node::Continue(_) => dot,
            Node::Comment(comment) => self.walk_comment(dot, comment),
            Node::Action(action) => {
                let saved = self.action.replace(action.span);
                self.check_pipeline(dot, &action.pipe);
                self.action = saved;
                dot
            }
            Node::If(branch) => {
                self.walk_if(dot, branch);
                dot
            }
            Node::Range(branch) => {
                self.walk_range(dot, branch);
                dot
            }
            Node::With(branch) => {
                self.walk_with(dot, branch);
                dot
            }
            Node::Template(node) => {
                self.walk_template(dot, node);
                dot
            }
        }
    }

    fn walk_list(&mut self, dot: Option<TypeKey>, list: &ListNode) -> Option<TypeKey> {
        let mut dot = dot;
        for node in &list.nodes {
            dot = self.walk(dot, node);
        }
        dot
    }

    fn walk_comment(&mut self, dot: Option<TypeKey>, node: &CommentNode) -> Option<TypeKey> {
        let Some(annotation) = parse_annotation(&node.text) else {
            return dot;
        };
        match annotation.key.as_str() {
            "type" => {
                self.annotations_seen += 1;
                if self.annotations_seen > 1 {
                    let saved = self.action.replace(node.span);
                    self.error_at(
                        node.span,
                        TypeError::MultipleTypeAnnotations,
                        "multiple @type annotations".to_string(),
                    );
                    self.action = saved;
                    return dot;
                }
                match self.loader.load_type(self.store, &annotation.value) {
                    Ok(t) => {
                        self.set_top_dot(t);
                        Some(t)
                    }
                    Err(err) => {
                        let message = match err {
                            LoadError::NotFound(_) => {
                                format!("cannot load type {}", annotation.value)
                            }
                            other => {
                                format!("failed to load type {}: {}", annotation.value, other)
                            }
                        };
                        let saved = self.action.replace(node.span);
                        self.error_at(node.span, TypeError::TypeLoadFailed, message);
                        self.action = saved;
                        dot
                    }
                }
            }
            "debug" => {
                if annotation.value == "show ." {
                    let rendered = self.type_name(dot);
                    self.debugf(Some(node.span), &format!("show .: {}", rendered));
                }
                dot
            }
            _ => dot,
        }
    }

    /// The if pipeline runs for its effects on variables and diagnostics;
    /// both branches see the unchanged dot.
    fn walk_if(&mut self, dot: Option<TypeKey>, branch: &BranchNode) {
        let mark = self.vars.len();
        let saved = self.action.replace(branch.span);
        self.check_pipeline(dot, &branch.pipe);
        self.action = saved;

        self.walk_list(dot, &branch.list);
        if let Some(else_list) = &branch.else_list {
            self.walk_list(dot, else_list);
        }
        self.vars.truncate(mark);
    }

    /// The with body sees the pipeline's type as dot; the else branch keeps
    /// the outer dot. An unresolvable pipeline still walks the body, with an
    /// absent dot, so findings inside are not lost entirely.
    fn walk_with(&mut self, dot: Option<TypeKey>, branch: &BranchNode) {
        let mark = self.vars.len();
        let saved = self.action.replace(branch.span);
        let new_dot = self.check_pipeline(dot, &branch.pipe);
        self.action = saved;

        self.walk_list(new_dot, &branch.list);
        if let Some(else_list) = &branch.else_list {
            self.walk_list(dot, else_list);
        }
        self.vars.truncate(mark);
    }

    fn walk_range(&mut self, dot: Option<TypeKey>, branch: &BranchNode) {
        let mark = self.vars.len();
        let saved = self.action.replace(branch.span);
        let collection = self.check_pipeline(dot, &branch.pipe);

        let (key_type, elem_type) = match collection {
            // Upstream failure already reported; suppress the cascade.
            None => (None, None),
            Some(c) => match &self.store[peel(c, self.store)] {
                Type::Slice(s) => (
                    Some(self.store.basic(BasicType::UntypedInt)),
                    Some(s.elem()),
                ),
                Type::Array(a) => (
                    Some(self.store.basic(BasicType::UntypedInt)),
                    Some(a.elem()),
                ),
                Type::Map(m) => (Some(m.key()), Some(m.elem())),
                Type::Chan(ch) => (None, Some(ch.elem())),
                _ => {
                    let message = format!(
                        "range can't iterate over {}, pipe: {}",
                        type_string(c, self.store),
                        branch.pipe
                    );
                    self.error_at(branch.pipe.span, TypeError::RangeNotIterable, message);
                    (None, None)
                }
            },
        };

        // The pipeline bound the declared variables to the pipe value;
        // iteration rebinds them to the key/element types.
        let decls = &branch.pipe.decls;
        match decls.len() {
            0 => {}
            1 => {
                self.set_var(&decls[0].name, elem_type);
            }
            _ => {
                self.set_var(&decls[0].name, key_type);
                self.set_var(&decls[1].name, elem_type);
            }
        }
        self.action = saved;

        self.walk_list(elem_type, &branch.list);
        if let Some(else_list) = &branch.else_list {
            self.walk_list(dot, else_list);
        }
        self.vars.truncate(mark);
    }

    /// Invokes a named sub-template with a derived state: fresh `$`, fresh
    /// error buffer, shared tree set and visited set. Trees already being
    /// walked are skipped, which both terminates cycles and bounds work to
    /// one walk per tree per run.
    fn walk_template(&mut self, dot: Option<TypeKey>, node: &TemplateNode) {
        let saved_action = self.action.replace(node.span);
        let arg = node
            .pipe
            .as_ref()
            .and_then(|pipe| self.check_pipeline(dot, pipe));

        let trees = self.trees;
        let Some((file, tree)) = trees.get(&node.name) else {
            let message = format!("template {:?} not defined", node.name);
            self.emit_at(
                node.span,
                TypeError::UndefinedTemplate,
                message,
                self.opts.allow_undefined_templates,
            );
            self.action = saved_action;
            return;
        };
        if !self.visited.insert(node.name.clone()) {
            self.action = saved_action;
            return;
        }

        let saved_file = self.file;
        let saved_vars = std::mem::replace(&mut self.vars, vec![Variable::dollar(arg)]);
        let saved_annotations = std::mem::replace(&mut self.annotations_seen, 0);
        let saved_sink = std::mem::take(&mut self.sink);
        self.file = *file;
        self.action = None;

        self.walk_list(arg, &tree.root);

        let sub_sink = std::mem::replace(&mut self.sink, saved_sink);
        self.sink.extend(sub_sink);
        self.vars = saved_vars;
        self.file = saved_file;
        self.annotations_seen = saved_annotations;
        self.action = saved_action;
    }

    // ------------------------------------------------------------------
    // Pipelines and commands
    // ------------------------------------------------------------------

    /// Checks a pipeline left to right: each command's result becomes the
    /// final argument of the next. Declarations bind after the last command.
    fn check_pipeline(&mut self, dot: Option<TypeKey>, pipe: &PipeNode) -> Option<TypeKey> {
        let mut final_type = None;
        for cmd in &pipe.cmds {
            final_type = self.check_command(dot, cmd, final_type);
        }

        if !pipe.decls.is_empty() {
            if pipe.is_assign {
                for decl in &pipe.decls {
                    if !self.set_var(&decl.name, final_type) {
                        self.debugf(
                            Some(decl.span),
                            &format!("TODO: assignment to undeclared variable {}", decl.name),
                        );
                    }
                }
            } else {
                for decl in &pipe.decls {
                    self.push_var(&decl.name, final_type);
                }
            }
        }
        final_type
    }

    fn check_command(
        &mut self,
        dot: Option<TypeKey>,
        cmd: &CommandNode,
        final_type: Option<TypeKey>,
    ) -> Option<TypeKey> {
        let Some(first) = cmd.args.first() else {
            self.error_at(
                cmd.span,
                TypeError::InternalError,
                "internal error: empty command".to_string(),
            );
            return None;
        };
        match first {
            Expr::Field(field) => self.check_field_chain(
                dot,
                dot,
                field.span,
                &field.idents,
                Some(&cmd.args),
                final_type,
            ),
            Expr::Chain(chain) => self.check_chain(dot, chain, Some(&cmd.args), final_type),
            Expr::Ident(ident) => self.check_function(dot, ident, Some(&cmd.args), final_type),
            Expr::Pipe(pipe) => self.check_pipeline(dot, pipe),
            Expr::Variable(var) => self.check_variable(dot, var, Some(&cmd.args), final_type),
            Expr::Dot(_) => dot,
            Expr::Nil(_) => Some(self.store.basic(BasicType::UntypedNil)),
            Expr::Bool(_) => Some(self.store.basic(BasicType::UntypedBool)),
            Expr::Number(n) => Some(self.store.basic(if n.is_int {
                BasicType::UntypedInt
            } else {
                BasicType::UntypedFloat
            })),
            Expr::Str(_) => Some(self.store.basic(BasicType::Str)),
        }
    }

    /// Like [`check_command`] for argument positions: literals yield their
    /// types, everything else resolves without a final value.
    fn check_arg(&mut self, dot: Option<TypeKey>, arg: &Expr) -> Option<TypeKey> {
        match arg {
            Expr::Dot(_) => dot,
            Expr::Nil(_) => Some(self.store.basic(BasicType::UntypedNil)),
            Expr::Bool(_) => Some(self.store.basic(BasicType::UntypedBool)),
            Expr::Number(n) => Some(self.store.basic(if n.is_int {
                BasicType::UntypedInt
            } else {
                BasicType::UntypedFloat
            })),
            Expr::Str(_) => Some(self.store.basic(BasicType::Str)),
            Expr::Field(field) => {
                self.check_field_chain(dot, dot, field.span, &field.idents, None, None)
            }
            Expr::Variable(var) => self.check_variable(dot, var, None, None),
            Expr::Pipe(pipe) => self.check_pipeline(dot, pipe),
            Expr::Ident(ident) => self.check_function(dot, ident, None, None),
            Expr::Chain(chain) => self.check_chain(dot, chain, None, None),
        }
    }

    // ------------------------------------------------------------------
    // Fields, chains, variables, functions
    // ------------------------------------------------------------------

    /// Applies `.A.B.C` to a receiver: intermediate identifiers resolve bare,
    /// the last one receives the command's arguments and final value.
    fn check_field_chain(
        &mut self,
        dot: Option<TypeKey>,
        receiver: Option<TypeKey>,
        span: Span,
        idents: &[String],
        args: Option<&[Expr]>,
        final_type: Option<TypeKey>,
    ) -> Option<TypeKey> {
        let Some((last, init)) = idents.split_last() else {
            self.error_at(
                span,
                TypeError::InternalError,
                "internal error: empty field chain".to_string(),
            );
            return None;
        };
        let mut receiver = receiver;
        for name in init {
            receiver = self.check_field(dot, name, span, None, None, receiver);
        }
        self.check_field(dot, last, span, args, final_type, receiver)
    }

    /// Resolves one field or method access on a receiver.
    fn check_field(
        &mut self,
        dot: Option<TypeKey>,
        name: &str,
        span: Span,
        args: Option<&[Expr]>,
        final_type: Option<TypeKey>,
        receiver: Option<TypeKey>,
    ) -> Option<TypeKey> {
        // An absent receiver means an upstream failure already reported.
        let receiver = receiver?;
        let has_args = args.map_or(false, |a| a.len() > 1) || final_type.is_some();

        match lookup_field_or_method(self.store, receiver, name) {
            LookupResult::Method(sig) => {
                self.check_call(dot, sig, span, name, args, final_type)
            }
            LookupResult::Field(field_type) => {
                if has_args {
                    self.error_at(
                        span,
                        TypeError::FieldTakesNoArgs,
                        format!("field {:?} does not take any arguments", name),
                    );
                }
                Some(field_type)
            }
            LookupResult::NotFound => {
                let peeled = peel(receiver, self.store);
                if let Type::Map(map) = &self.store[peeled] {
                    // Unknown names on a map are key accesses.
                    return Some(map.elem());
                }
                self.error_at(
                    span,
                    TypeError::NoSuchField,
                    format!(
                        "can't evaluate field {} in type {}",
                        name,
                        type_string(receiver, self.store)
                    ),
                );
                None
            }
        }
    }

    /// Checks a call of `sig`; `args[0]` is the callee itself and the piped
    /// final value, if any, arrives as the trailing argument.
    ///
    /// Parameter-to-argument assignability is not enforced here; the result
    /// convention (one value, or a value plus error) is.
    fn check_call(
        &mut self,
        dot: Option<TypeKey>,
        sig: TypeKey,
        span: Span,
        name: &str,
        args: Option<&[Expr]>,
        final_type: Option<TypeKey>,
    ) -> Option<TypeKey> {
        let mut arg_types = Vec::new();
        if let Some(args) = args {
            for arg in &args[1..] {
                arg_types.push(self.check_arg(dot, arg));
            }
        }
        if let Some(final_type) = final_type {
            arg_types.push(Some(final_type));
        }
        if arg_types.iter().any(Option::is_none) {
            return None;
        }

        let Type::Signature(detail) = &self.store[sig] else {
            self.error_at(
                span,
                TypeError::InternalError,
                format!("internal error: method {} has a non-function type", name),
            );
            return None;
        };
        let results: Vec<TypeKey> = detail.results().to_vec();
        match results[..] {
            [result] => Some(result),
            [result, second] if typ::is_error(second, self.store) => Some(result),
            _ => {
                self.error_at(
                    span,
                    TypeError::BadReturnArity,
                    format!(
                        "function {} has {} return values; expected 1 or 2 with trailing error",
                        name,
                        results.len()
                    ),
                );
                None
            }
        }
    }

    /// Resolves `$x` or `$x.Field...` against the variable stack.
    fn check_variable(
        &mut self,
        dot: Option<TypeKey>,
        var: &VariableNode,
        args: Option<&[Expr]>,
        final_type: Option<TypeKey>,
    ) -> Option<TypeKey> {
        let Some(typ) = self.lookup_var(&var.name) else {
            self.error_at(
                var.span,
                TypeError::UndefinedVariable,
                format!("undefined variable: {}", var.name),
            );
            return None;
        };
        if var.fields.is_empty() {
            return typ;
        }
        self.check_field_chain(dot, typ, var.span, &var.fields, args, final_type)
    }

    /// `(pipeline).Field1.Field2`: evaluate the pipeline, then the fields.
    fn check_chain(
        &mut self,
        dot: Option<TypeKey>,
        chain: &ChainNode,
        args: Option<&[Expr]>,
        final_type: Option<TypeKey>,
    ) -> Option<TypeKey> {
        if chain.fields.is_empty() {
            self.error_at(
                chain.span,
                TypeError::InternalError,
                "internal error: no fields in chain".to_string(),
            );
            return None;
        }
        if matches!(chain.node, Expr::Nil(_)) {
            self.error_at(
                chain.span,
                TypeError::IndirectionThroughNil,
                format!("indirection through explicit nil in {}", chain),
            );
            return None;
        }
        let base = self.check_arg(dot, &chain.node);
        self.check_field_chain(dot, base, chain.span, &chain.fields, args, final_type)
    }

    /// Dispatches a function-name command: builtins, then the user function
    /// map. Unknown functions still have their arguments checked.
    fn check_function(
        &mut self,
        dot: Option<TypeKey>,
        ident: &IdentNode,
        args: Option<&[Expr]>,
        final_type: Option<TypeKey>,
    ) -> Option<TypeKey> {
        if let Some(builtin) = Builtin::from_name(&ident.name) {
            let mut arg_types = Vec::new();
            if let Some(args) = args {
                for arg in &args[1..] {
                    arg_types.push(self.check_arg(dot, arg));
                }
            }
            if let Some(final_type) = final_type {
                arg_types.push(Some(final_type));
            }
            return self.check_builtin(builtin, ident.span, &arg_types);
        }

        if let Some(sig) = self.func_map.get(&ident.name).copied() {
            return self.check_call(dot, sig, ident.span, &ident.name, args, final_type);
        }

        if let Some(args) = args {
            for arg in &args[1..] {
                self.check_arg(dot, arg);
            }
        }
        self.emit_at(
            ident.span,
            TypeError::UndefinedFunction,
            format!("function {:?} not defined", ident.name),
            self.opts.allow_undefined_funcs,
        );
        None
    }

    pub(super) fn store(&self) -> &TypeStore {
        self.store
    }

    pub(super) fn report(&mut self, span: Span, kind: TypeError, message: String) {
        self.error_at(span, kind, message);
    }
}
