//! AST for parsed templates.
//!
//! The node set mirrors the shape produced by Go's template parser: a tree
//! per named template, each holding a list of text, comment, action and
//! control nodes. Expression nodes keep their source spans so the checker
//! can point diagnostics at the offending subexpression.

use std::collections::BTreeMap;
use std::fmt;

use tmpl_common::Span;

/// A parsed named template.
#[derive(Debug, Clone)]
pub struct Tree {
    /// The template name (the file-level template or a `define` name).
    pub name: String,
    /// The root node list.
    pub root: ListNode,
}

/// All templates produced by one or more parses, keyed by name.
///
/// A `BTreeMap` keeps iteration deterministic, so diagnostics come out in a
/// stable order across runs.
pub type TreeSet = BTreeMap<String, Tree>;

/// A sequence of nodes.
#[derive(Debug, Clone)]
pub struct ListNode {
    pub span: Span,
    pub nodes: Vec<Node>,
}

/// A single template node.
#[derive(Debug, Clone)]
pub enum Node {
    /// Literal output text.
    Text(TextNode),
    /// A `{{/* ... */}}` comment.
    Comment(CommentNode),
    /// A `{{pipeline}}` action.
    Action(ActionNode),
    /// `{{if pipeline}} ... {{else}} ... {{end}}`
    If(BranchNode),
    /// `{{range pipeline}} ... {{else}} ... {{end}}`
    Range(BranchNode),
    /// `{{with pipeline}} ... {{else}} ... {{end}}`
    With(BranchNode),
    /// `{{template "name" pipeline}}`
    Template(TemplateNode),
    /// `{{break}}`
    Break(Span),
    /// `{{continue}}`
    Continue(Span),
}

impl Node {
    /// The source span of the node. For control nodes this is the span of
    /// the opening action, which is what diagnostics want to quote.
    pub fn span(&self) -> Span {
        match self {
            Node::Text(n) => n.span,
            Node::Comment(n) => n.span,
            Node::Action(n) => n.span,
            Node::If(n) | Node::Range(n) | Node::With(n) => n.span,
            Node::Template(n) => n.span,
            Node::Break(span) | Node::Continue(span) => *span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextNode {
    pub span: Span,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct CommentNode {
    pub span: Span,
    /// Comment text including the `/* */` delimiters.
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct ActionNode {
    /// Span of the whole `{{ ... }}` action, delimiters included.
    pub span: Span,
    pub pipe: PipeNode,
}

/// Body of `if`, `range` and `with`.
#[derive(Debug, Clone)]
pub struct BranchNode {
    /// Span of the opening `{{if ...}}` / `{{range ...}}` / `{{with ...}}`.
    pub span: Span,
    pub pipe: PipeNode,
    pub list: ListNode,
    pub else_list: Option<ListNode>,
}

#[derive(Debug, Clone)]
pub struct TemplateNode {
    pub span: Span,
    pub name: String,
    pub pipe: Option<PipeNode>,
}

/// A pipeline: optional variable declarations and `|`-separated commands.
#[derive(Debug, Clone)]
pub struct PipeNode {
    pub span: Span,
    /// Variables declared or assigned by the pipeline.
    pub decls: Vec<VariableNode>,
    /// True for `=` (rebinding), false for `:=` (new binding).
    pub is_assign: bool,
    pub cmds: Vec<CommandNode>,
}

/// One command of a pipeline: an operand and its arguments.
#[derive(Debug, Clone)]
pub struct CommandNode {
    pub span: Span,
    pub args: Vec<Expr>,
}

/// An operand or argument expression.
#[derive(Debug, Clone)]
pub enum Expr {
    /// `.`
    Dot(Span),
    /// `nil`
    Nil(Span),
    Bool(BoolNode),
    Number(NumberNode),
    Str(StringNode),
    /// `.A.B`
    Field(FieldNode),
    /// `$x` or `$x.A.B`
    Variable(VariableNode),
    /// A function name.
    Ident(IdentNode),
    /// A parenthesised pipeline.
    Pipe(Box<PipeNode>),
    /// `(pipeline).A.B`
    Chain(Box<ChainNode>),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Dot(span) | Expr::Nil(span) => *span,
            Expr::Bool(n) => n.span,
            Expr::Number(n) => n.span,
            Expr::Str(n) => n.span,
            Expr::Field(n) => n.span,
            Expr::Variable(n) => n.span,
            Expr::Ident(n) => n.span,
            Expr::Pipe(n) => n.span,
            Expr::Chain(n) => n.span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BoolNode {
    pub span: Span,
    pub value: bool,
}

#[derive(Debug, Clone)]
pub struct NumberNode {
    pub span: Span,
    /// The literal as written.
    pub text: String,
    /// True for integer literals (including character constants).
    pub is_int: bool,
}

#[derive(Debug, Clone)]
pub struct StringNode {
    pub span: Span,
    /// The unquoted value.
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct FieldNode {
    pub span: Span,
    /// The identifiers of `.A.B`, in order.
    pub idents: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct VariableNode {
    pub span: Span,
    /// The variable name including the `$`, e.g. `$` or `$x`.
    pub name: String,
    /// Trailing field accesses, as in `$x.A.B`.
    pub fields: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct IdentNode {
    pub span: Span,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct ChainNode {
    pub span: Span,
    /// The chained-on operand; always a parenthesised pipeline or literal.
    pub node: Expr,
    pub fields: Vec<String>,
}

// ----------------------------------------------------------------------
// Display, matching the way templates quote their own source.

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Dot(_) => f.write_str("."),
            Expr::Nil(_) => f.write_str("nil"),
            Expr::Bool(n) => write!(f, "{}", n.value),
            Expr::Number(n) => f.write_str(&n.text),
            Expr::Str(n) => write!(f, "{:?}", n.value),
            Expr::Field(n) => {
                for ident in &n.idents {
                    write!(f, ".{}", ident)?;
                }
                Ok(())
            }
            Expr::Variable(n) => {
                f.write_str(&n.name)?;
                for field in &n.fields {
                    write!(f, ".{}", field)?;
                }
                Ok(())
            }
            Expr::Ident(n) => f.write_str(&n.name),
            Expr::Pipe(p) => write!(f, "({})", p),
            Expr::Chain(c) => write!(f, "{}", c),
        }
    }
}

impl fmt::Display for ChainNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node {
            pipe @ Expr::Pipe(_) => write!(f, "{}", pipe)?,
            other => write!(f, "({})", other)?,
        }
        for field in &self.fields {
            write!(f, ".{}", field)?;
        }
        Ok(())
    }
}

impl fmt::Display for PipeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, decl) in self.decls.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(&decl.name)?;
        }
        if !self.decls.is_empty() {
            f.write_str(if self.is_assign { " = " } else { " := " })?;
        }
        for (i, cmd) in self.cmds.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{}", cmd)?;
        }
        Ok(())
    }
}

impl fmt::Display for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", arg)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_field_chain() {
        let expr = Expr::Field(FieldNode {
            span: Span::default(),
            idents: vec!["Foo".into(), "Bar".into()],
        });
        assert_eq!(expr.to_string(), ".Foo.Bar");
    }

    #[test]
    fn test_display_variable() {
        let expr = Expr::Variable(VariableNode {
            span: Span::default(),
            name: "$item".into(),
            fields: vec!["Value".into()],
        });
        assert_eq!(expr.to_string(), "$item.Value");
    }
}
