//! Recursive-descent parser for template files.
//!
//! Parsing one file yields a [`TreeSet`]: the file's own tree plus one tree
//! per `define`/`block`. The grammar follows Go's template parser; `block`
//! desugars into a definition plus an in-place `template` invocation.

use tmpl_common::Span;

use crate::ast::*;
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

/// A fatal parse failure.
///
/// Parse errors abort the run; they are not accumulated the way checker
/// diagnostics are.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "template parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

pub type ParseResult<T> = Result<T, ParseError>;

/// What closes the pipeline currently being parsed.
#[derive(Clone, Copy, PartialEq, Eq)]
enum PipeEnd {
    /// `}}`
    Delim,
    /// `)`
    Paren,
}

/// How a node list ended.
enum ListEnd {
    /// `{{end}}`, fully consumed.
    End,
    /// `{{else}}`, fully consumed.
    Else,
    /// `{{else if`; the parser is positioned on the `if` keyword.
    ElseIf,
}

/// The template parser.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    peek: Token,
    trees: TreeSet,
    range_depth: usize,
}

impl<'a> Parser<'a> {
    /// Creates a parser over the given source.
    pub fn new(source: &'a str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token();
        let peek = lexer.next_token();
        Self {
            lexer,
            current,
            peek,
            trees: TreeSet::new(),
            range_depth: 0,
        }
    }

    // ------------------------------------------------------------------
    // Token management
    // ------------------------------------------------------------------

    fn next_token(&mut self) {
        self.current = std::mem::replace(&mut self.peek, self.lexer.next_token());
    }

    fn cur_is(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    fn peek_is(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek.kind) == std::mem::discriminant(kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.cur_is(kind) {
            self.next_token();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, context: &str) -> ParseResult<Span> {
        self.bail_on_lex_error()?;
        if self.cur_is(kind) {
            let span = self.current.span;
            self.next_token();
            Ok(span)
        } else {
            Err(self.error(format!(
                "expected {} in {}, found {}",
                kind.name(),
                context,
                self.current.kind.name()
            )))
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.current.span)
    }

    /// Turns a lexer error token into a parse failure.
    fn bail_on_lex_error(&self) -> ParseResult<()> {
        if let TokenKind::Error(msg) = &self.current.kind {
            return Err(ParseError::new(msg.clone(), self.current.span));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Entry point
    // ------------------------------------------------------------------

    /// Parses the whole input as the template named `name`, registering any
    /// `define`/`block` templates encountered along the way.
    pub fn parse_root(mut self, name: &str) -> ParseResult<TreeSet> {
        let start = self.current.span;
        let mut nodes = Vec::new();

        loop {
            self.bail_on_lex_error()?;
            match &self.current.kind {
                TokenKind::Eof => break,
                TokenKind::Text(_) | TokenKind::Comment(_) => nodes.push(self.text_or_comment()),
                TokenKind::LeftDelim => {
                    if self.peek_is(&TokenKind::Define) {
                        self.parse_definition()?;
                    } else {
                        nodes.push(self.parse_action()?);
                    }
                }
                _ => return Err(self.error("unexpected token at top level")),
            }
        }

        let span = start.to(self.current.span);
        self.add_tree(
            name.to_string(),
            Tree {
                name: name.to_string(),
                root: ListNode { span, nodes },
            },
            span,
        )?;
        Ok(self.trees)
    }

    fn add_tree(&mut self, name: String, tree: Tree, span: Span) -> ParseResult<()> {
        if self.trees.contains_key(&name) {
            return Err(ParseError::new(
                format!("multiple definition of template {:?}", name),
                span,
            ));
        }
        self.trees.insert(name, tree);
        Ok(())
    }

    fn text_or_comment(&mut self) -> Node {
        let span = self.current.span;
        let node = match &self.current.kind {
            TokenKind::Text(text) => Node::Text(TextNode {
                span,
                text: text.clone(),
            }),
            TokenKind::Comment(text) => Node::Comment(CommentNode {
                span,
                text: text.clone(),
            }),
            _ => unreachable!("caller checked for text or comment"),
        };
        self.next_token();
        node
    }

    // ------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------

    /// Parses one `{{ ... }}` action (current token is the left delimiter).
    fn parse_action(&mut self) -> ParseResult<Node> {
        let open = self.expect(&TokenKind::LeftDelim, "action")?;
        self.bail_on_lex_error()?;
        match self.current.kind {
            TokenKind::If => self.parse_control(open, ControlKind::If),
            TokenKind::Range => self.parse_control(open, ControlKind::Range),
            TokenKind::With => self.parse_control(open, ControlKind::With),
            TokenKind::Template => self.parse_template(open),
            TokenKind::Block => self.parse_block(open),
            TokenKind::Break => {
                self.next_token();
                let close = self.expect(&TokenKind::RightDelim, "break action")?;
                if self.range_depth == 0 {
                    return Err(ParseError::new("{{break}} outside {{range}}", open));
                }
                Ok(Node::Break(open.to(close)))
            }
            TokenKind::Continue => {
                self.next_token();
                let close = self.expect(&TokenKind::RightDelim, "continue action")?;
                if self.range_depth == 0 {
                    return Err(ParseError::new("{{continue}} outside {{range}}", open));
                }
                Ok(Node::Continue(open.to(close)))
            }
            TokenKind::Define => Err(self.error("unexpected {{define}} inside template body")),
            TokenKind::Else => Err(self.error("unexpected {{else}}")),
            TokenKind::End => Err(self.error("unexpected {{end}}")),
            _ => {
                let pipe = self.parse_pipeline(1, PipeEnd::Delim)?;
                let close = self.expect(&TokenKind::RightDelim, "action")?;
                Ok(Node::Action(ActionNode {
                    span: open.to(close),
                    pipe,
                }))
            }
        }
    }

    /// Parses the node list of a control body, up to `{{end}}`, `{{else}}`
    /// or `{{else if`.
    fn item_list(&mut self) -> ParseResult<(ListNode, ListEnd)> {
        let start = self.current.span;
        let mut nodes = Vec::new();
        loop {
            self.bail_on_lex_error()?;
            match &self.current.kind {
                TokenKind::Eof => return Err(self.error("unexpected EOF: missing {{end}}")),
                TokenKind::Text(_) | TokenKind::Comment(_) => nodes.push(self.text_or_comment()),
                TokenKind::LeftDelim if self.peek_is(&TokenKind::End) => {
                    let open = self.current.span;
                    self.next_token(); // {{
                    self.next_token(); // end
                    let close = self.expect(&TokenKind::RightDelim, "end action")?;
                    let span = start.to(open).to(close);
                    return Ok((ListNode { span, nodes }, ListEnd::End));
                }
                TokenKind::LeftDelim if self.peek_is(&TokenKind::Else) => {
                    self.next_token(); // {{
                    self.next_token(); // else
                    self.bail_on_lex_error()?;
                    if self.cur_is(&TokenKind::If) {
                        let span = start.to(self.current.span);
                        return Ok((ListNode { span, nodes }, ListEnd::ElseIf));
                    }
                    let close = self.expect(&TokenKind::RightDelim, "else action")?;
                    let span = start.to(close);
                    return Ok((ListNode { span, nodes }, ListEnd::Else));
                }
                TokenKind::LeftDelim if self.peek_is(&TokenKind::Define) => {
                    return Err(self.error("unexpected {{define}} inside template body"));
                }
                TokenKind::LeftDelim => nodes.push(self.parse_action()?),
                _ => return Err(self.error("unexpected token in template body")),
            }
        }
    }

    /// Parses `if`/`range`/`with` from the keyword token onward.
    fn parse_control(&mut self, open: Span, kind: ControlKind) -> ParseResult<Node> {
        self.next_token(); // keyword
        let max_decls = match kind {
            ControlKind::Range => 2,
            _ => 1,
        };
        let pipe = self.parse_pipeline(max_decls, PipeEnd::Delim)?;
        let close = self.expect(&TokenKind::RightDelim, "control action")?;
        let span = open.to(close);

        if kind == ControlKind::Range {
            self.range_depth += 1;
        }
        let (list, terminator) = self.item_list()?;
        if kind == ControlKind::Range {
            self.range_depth -= 1;
        }

        let else_list = match terminator {
            ListEnd::End => None,
            ListEnd::Else => {
                let (else_list, terminator) = self.item_list()?;
                if !matches!(terminator, ListEnd::End) {
                    return Err(self.error("expected {{end}} after {{else}}"));
                }
                Some(else_list)
            }
            ListEnd::ElseIf => {
                // `{{else if pipe}}` nests an if inside the else list; the
                // shared {{end}} closes both.
                let nested_open = self.current.span;
                let nested = self.parse_control(nested_open, ControlKind::If)?;
                let nested_span = nested.span();
                Some(ListNode {
                    span: nested_span,
                    nodes: vec![nested],
                })
            }
        };

        let branch = BranchNode {
            span,
            pipe,
            list,
            else_list,
        };
        Ok(match kind {
            ControlKind::If => Node::If(branch),
            ControlKind::Range => Node::Range(branch),
            ControlKind::With => Node::With(branch),
        })
    }

    /// Parses `{{template "name"}}` or `{{template "name" pipeline}}`.
    fn parse_template(&mut self, open: Span) -> ParseResult<Node> {
        self.next_token(); // template
        let name = self.parse_template_name()?;
        let pipe = if self.cur_is(&TokenKind::RightDelim) {
            None
        } else {
            Some(self.parse_pipeline(0, PipeEnd::Delim)?)
        };
        let close = self.expect(&TokenKind::RightDelim, "template invocation")?;
        Ok(Node::Template(TemplateNode {
            span: open.to(close),
            name,
            pipe,
        }))
    }

    /// Parses `{{block "name" pipeline}}body{{end}}`: registers the body as
    /// a named template and leaves an invocation in place.
    fn parse_block(&mut self, open: Span) -> ParseResult<Node> {
        self.next_token(); // block
        let name = self.parse_template_name()?;
        let pipe = if self.cur_is(&TokenKind::RightDelim) {
            None
        } else {
            Some(self.parse_pipeline(0, PipeEnd::Delim)?)
        };
        let close = self.expect(&TokenKind::RightDelim, "block action")?;

        let (body, terminator) = self.item_list()?;
        if !matches!(terminator, ListEnd::End) {
            return Err(self.error("expected {{end}} to close {{block}}"));
        }
        let body_span = body.span;
        self.add_tree(
            name.clone(),
            Tree {
                name: name.clone(),
                root: body,
            },
            body_span,
        )?;

        Ok(Node::Template(TemplateNode {
            span: open.to(close),
            name,
            pipe,
        }))
    }

    /// Parses `{{define "name"}}body{{end}}` and registers the tree.
    fn parse_definition(&mut self) -> ParseResult<()> {
        self.next_token(); // {{
        self.next_token(); // define
        let name = self.parse_template_name()?;
        self.expect(&TokenKind::RightDelim, "define action")?;
        let (body, terminator) = self.item_list()?;
        if !matches!(terminator, ListEnd::End) {
            return Err(self.error("expected {{end}} to close {{define}}"));
        }
        let body_span = body.span;
        self.add_tree(
            name.clone(),
            Tree {
                name,
                root: body,
            },
            body_span,
        )
    }

    fn parse_template_name(&mut self) -> ParseResult<String> {
        self.bail_on_lex_error()?;
        match &self.current.kind {
            TokenKind::Str(name) => {
                let name = name.clone();
                self.next_token();
                Ok(name)
            }
            _ => Err(self.error("expected quoted template name")),
        }
    }

    // ------------------------------------------------------------------
    // Pipelines
    // ------------------------------------------------------------------

    fn parse_pipeline(&mut self, max_decls: usize, end: PipeEnd) -> ParseResult<PipeNode> {
        let start = self.current.span;
        let mut decls = Vec::new();
        let mut is_assign = false;

        // Variable declarations: `$v :=`, `$v =`, `$k, $v :=`.
        if self.cur_is(&TokenKind::Variable(String::new())) {
            let is_decl = self.peek_is(&TokenKind::Declare)
                || self.peek_is(&TokenKind::Assign)
                || self.peek_is(&TokenKind::Comma);
            if is_decl {
                decls.push(self.parse_decl_variable()?);
                while self.eat(&TokenKind::Comma) {
                    decls.push(self.parse_decl_variable()?);
                }
                if self.eat(&TokenKind::Declare) {
                    // new bindings
                } else if self.eat(&TokenKind::Assign) {
                    is_assign = true;
                } else {
                    return Err(self.error("expected := or = after variable list"));
                }
                if decls.len() > max_decls {
                    return Err(ParseError::new("too many declarations in pipeline", start));
                }
            }
        }

        let mut cmds = Vec::new();
        loop {
            cmds.push(self.parse_command(end)?);
            if !self.eat(&TokenKind::Pipe) {
                break;
            }
        }

        let span = start.to(Span::point(self.current.span.start));
        Ok(PipeNode {
            span,
            decls,
            is_assign,
            cmds,
        })
    }

    fn parse_decl_variable(&mut self) -> ParseResult<VariableNode> {
        self.bail_on_lex_error()?;
        match &self.current.kind {
            TokenKind::Variable(name) => {
                let node = VariableNode {
                    span: self.current.span,
                    name: format!("${}", name),
                    fields: Vec::new(),
                };
                self.next_token();
                Ok(node)
            }
            _ => Err(self.error("expected variable in declaration")),
        }
    }

    fn parse_command(&mut self, end: PipeEnd) -> ParseResult<CommandNode> {
        let start = self.current.span;
        let mut args = Vec::new();
        loop {
            self.bail_on_lex_error()?;
            match &self.current.kind {
                TokenKind::Pipe => break,
                TokenKind::RightDelim => {
                    if end == PipeEnd::Paren {
                        return Err(self.error("unclosed parenthesised pipeline"));
                    }
                    break;
                }
                TokenKind::RParen => {
                    if end == PipeEnd::Delim {
                        return Err(self.error("unexpected right paren"));
                    }
                    break;
                }
                TokenKind::Eof => return Err(self.error("unclosed action")),
                _ => args.push(self.parse_operand()?),
            }
        }
        if args.is_empty() {
            return Err(ParseError::new("missing value for command", start));
        }
        let span = start.to(args.last().map(|a| a.span()).unwrap_or(start));
        Ok(CommandNode { span, args })
    }

    /// Parses one operand, merging trailing `.Field` accesses.
    fn parse_operand(&mut self) -> ParseResult<Expr> {
        let start = self.current.span;
        let base = match &self.current.kind {
            TokenKind::Field(name) => {
                let mut idents = vec![name.clone()];
                let mut span = start;
                self.next_token();
                while let TokenKind::Field(next) = &self.current.kind {
                    idents.push(next.clone());
                    span = span.to(self.current.span);
                    self.next_token();
                }
                return Ok(Expr::Field(FieldNode { span, idents }));
            }
            TokenKind::Variable(name) => {
                let mut node = VariableNode {
                    span: start,
                    name: format!("${}", name),
                    fields: Vec::new(),
                };
                self.next_token();
                while let TokenKind::Field(next) = &self.current.kind {
                    node.fields.push(next.clone());
                    node.span = node.span.to(self.current.span);
                    self.next_token();
                }
                return Ok(Expr::Variable(node));
            }
            TokenKind::Ident(name) => {
                let node = Expr::Ident(IdentNode {
                    span: start,
                    name: name.clone(),
                });
                self.next_token();
                node
            }
            TokenKind::Dot => {
                self.next_token();
                Expr::Dot(start)
            }
            TokenKind::Nil => {
                self.next_token();
                Expr::Nil(start)
            }
            TokenKind::Bool(value) => {
                let node = Expr::Bool(BoolNode {
                    span: start,
                    value: *value,
                });
                self.next_token();
                node
            }
            TokenKind::Number(text) => {
                let is_int = !text.contains('.')
                    && !(text.contains(['e', 'E']) && !text.starts_with("0x") && !text.starts_with("0X"));
                let node = Expr::Number(NumberNode {
                    span: start,
                    text: text.clone(),
                    is_int,
                });
                self.next_token();
                node
            }
            TokenKind::Char(c) => {
                let node = Expr::Number(NumberNode {
                    span: start,
                    text: format!("{:?}", c),
                    is_int: true,
                });
                self.next_token();
                node
            }
            TokenKind::Str(value) => {
                let node = Expr::Str(StringNode {
                    span: start,
                    value: value.clone(),
                });
                self.next_token();
                node
            }
            TokenKind::LParen => {
                self.next_token();
                let pipe = self.parse_pipeline(1, PipeEnd::Paren)?;
                let close = self.expect(&TokenKind::RParen, "parenthesised pipeline")?;
                Expr::Pipe(Box::new(PipeNode {
                    span: start.to(close),
                    ..pipe
                }))
            }
            other => {
                return Err(self.error(format!("unexpected {} in operand", other.name())));
            }
        };

        // `(pipe).A.B` and similar: trailing fields chain onto the operand.
        if matches!(self.current.kind, TokenKind::Field(_)) {
            let mut fields = Vec::new();
            let mut span = base.span();
            while let TokenKind::Field(next) = &self.current.kind {
                fields.push(next.clone());
                span = span.to(self.current.span);
                self.next_token();
            }
            return Ok(Expr::Chain(Box::new(ChainNode {
                span,
                node: base,
                fields,
            })));
        }
        Ok(base)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ControlKind {
    If,
    Range,
    With,
}

/// Parses `source` as the template named `name`.
///
/// Returns the resulting tree set: the file's own tree plus any
/// `define`/`block` trees.
pub fn parse(name: &str, source: &str) -> ParseResult<TreeSet> {
    Parser::new(source).parse_root(name)
}
