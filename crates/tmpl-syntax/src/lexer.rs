//! Lexer for template files.
//!
//! Splits input into literal text and `{{ }}` actions, and tokenizes the
//! action language: fields, variables, literals, pipes and keywords.
//! Trim markers (`{{- ` and ` -}}`) are applied here so the parser only
//! ever sees already-trimmed text.

use tmpl_common::Span;

use crate::token::{Token, TokenKind};

/// The template lexer.
pub struct Lexer<'a> {
    /// The full template source.
    input: &'a str,
    /// Current byte position.
    pos: usize,
    /// Whether we are between `{{` and `}}`.
    in_action: bool,
    /// Whether a right trim marker asked us to skip leading whitespace
    /// of the next text segment.
    trim_next_text: bool,
    /// Set once EOF or an error token has been produced.
    done: bool,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer over the given source.
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            in_action: false,
            trim_next_text: false,
            done: false,
        }
    }

    /// Produces the next token.
    pub fn next_token(&mut self) -> Token {
        if self.done {
            return Token::new(TokenKind::Eof, Span::point(self.pos));
        }
        if self.in_action {
            self.lex_in_action()
        } else {
            self.lex_text()
        }
    }

    fn rest(&self) -> &str {
        &self.input[self.pos..]
    }

    fn ch(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn advance(&mut self) {
        if let Some(c) = self.ch() {
            self.pos += c.len_utf8();
        }
    }

    fn eof_token(&mut self) -> Token {
        self.done = true;
        Token::new(TokenKind::Eof, Span::point(self.pos))
    }

    fn error_token(&mut self, start: usize, msg: impl Into<String>) -> Token {
        self.done = true;
        Token::new(TokenKind::Error(msg.into()), Span::new(start, self.pos))
    }

    // ------------------------------------------------------------------
    // Outside actions
    // ------------------------------------------------------------------

    /// Lexes literal text up to the next `{{`, handling trim markers.
    fn lex_text(&mut self) -> Token {
        if self.trim_next_text {
            self.trim_next_text = false;
            while matches!(self.ch(), Some(c) if c.is_whitespace()) {
                self.advance();
            }
        }
        let start = self.pos;
        let (text_end, delim_pos) = match self.rest().find("{{") {
            Some(off) => (start + off, Some(start + off)),
            None => (self.input.len(), None),
        };

        let mut text = &self.input[start..text_end];
        if let Some(dp) = delim_pos {
            if has_left_trim_marker(&self.input[dp + 2..]) {
                text = text.trim_end();
            }
        }

        if !text.is_empty() {
            self.pos = text_end;
            return Token::new(
                TokenKind::Text(text.to_string()),
                Span::new(start, text_end),
            );
        }

        match delim_pos {
            None => {
                self.pos = self.input.len();
                self.eof_token()
            }
            Some(dp) => {
                self.pos = dp;
                self.lex_left_delim()
            }
        }
    }

    /// Lexes `{{`, a trim marker, and whole comment actions.
    fn lex_left_delim(&mut self) -> Token {
        let start = self.pos;
        self.pos += 2; // consume "{{"
        if has_left_trim_marker(self.rest()) {
            self.pos += 2;
        }
        // Skip spaces so a comment opener directly follows.
        let mut probe = self.pos;
        while self.input[probe..].starts_with(' ') || self.input[probe..].starts_with('\t') {
            probe += 1;
        }
        if self.input[probe..].starts_with("/*") {
            self.pos = probe;
            return self.lex_comment(start);
        }
        self.in_action = true;
        Token::new(TokenKind::LeftDelim, Span::new(start, self.pos))
    }

    /// Lexes a full `{{/* ... */}}` action into one comment token.
    fn lex_comment(&mut self, action_start: usize) -> Token {
        let text_start = self.pos;
        let close = match self.rest().find("*/") {
            Some(off) => self.pos + off + 2,
            None => return self.error_token(action_start, "unclosed comment"),
        };
        let text = self.input[text_start..close].to_string();
        self.pos = close;
        // Optional spaces, optional trim marker, then the closing delimiter.
        while matches!(self.ch(), Some(' ') | Some('\t')) {
            self.advance();
        }
        if self.rest().starts_with("-}}") {
            self.pos += 3;
            self.trim_next_text = true;
        } else if self.rest().starts_with("}}") {
            self.pos += 2;
        } else {
            return self.error_token(action_start, "comment ends before closing delimiter");
        }
        Token::new(TokenKind::Comment(text), Span::new(action_start, self.pos))
    }

    // ------------------------------------------------------------------
    // Inside actions
    // ------------------------------------------------------------------

    fn lex_in_action(&mut self) -> Token {
        while matches!(self.ch(), Some(c) if c.is_whitespace()) {
            self.advance();
        }
        let start = self.pos;

        let c = match self.ch() {
            None => return self.error_token(start, "unclosed action"),
            Some(c) => c,
        };

        // Closing delimiter, with or without a trim marker.
        if self.rest().starts_with("-}}") {
            self.pos += 3;
            self.in_action = false;
            self.trim_next_text = true;
            return Token::new(TokenKind::RightDelim, Span::new(start, self.pos));
        }
        if self.rest().starts_with("}}") {
            self.pos += 2;
            self.in_action = false;
            return Token::new(TokenKind::RightDelim, Span::new(start, self.pos));
        }

        match c {
            '|' => self.single(start, TokenKind::Pipe),
            '(' => self.single(start, TokenKind::LParen),
            ')' => self.single(start, TokenKind::RParen),
            ',' => self.single(start, TokenKind::Comma),
            '=' => self.single(start, TokenKind::Assign),
            ':' => {
                self.advance();
                if self.ch() == Some('=') {
                    self.advance();
                    Token::new(TokenKind::Declare, Span::new(start, self.pos))
                } else {
                    self.error_token(start, "expected := in declaration")
                }
            }
            '$' => {
                self.advance();
                let name = self.read_word();
                Token::new(TokenKind::Variable(name), Span::new(start, self.pos))
            }
            '.' => {
                // .Name is a field; a bare dot is the current context; .5 is
                // a number.
                match self.peek_at(1) {
                    Some(n) if n.is_alphabetic() || n == '_' => {
                        self.advance();
                        let name = self.read_word();
                        Token::new(TokenKind::Field(name), Span::new(start, self.pos))
                    }
                    Some(n) if n.is_ascii_digit() => self.lex_number(start),
                    _ => self.single(start, TokenKind::Dot),
                }
            }
            '"' => self.lex_string(start),
            '`' => self.lex_raw_string(start),
            '\'' => self.lex_char(start),
            '+' | '-' => self.lex_number(start),
            _ if c.is_ascii_digit() => self.lex_number(start),
            _ if c.is_alphabetic() || c == '_' => {
                let word = self.read_word();
                let kind = TokenKind::keyword(&word).unwrap_or(TokenKind::Ident(word));
                Token::new(kind, Span::new(start, self.pos))
            }
            _ => {
                self.advance();
                self.error_token(start, format!("unrecognized character in action: {:?}", c))
            }
        }
    }

    fn single(&mut self, start: usize, kind: TokenKind) -> Token {
        self.advance();
        Token::new(kind, Span::new(start, self.pos))
    }

    fn read_word(&mut self) -> String {
        let start = self.pos;
        while matches!(self.ch(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.advance();
        }
        self.input[start..self.pos].to_string()
    }

    fn lex_number(&mut self, start: usize) -> Token {
        if matches!(self.ch(), Some('+') | Some('-')) {
            self.advance();
        }
        if self.rest().starts_with("0x") || self.rest().starts_with("0X") {
            self.pos += 2;
            while matches!(self.ch(), Some(c) if c.is_ascii_hexdigit()) {
                self.advance();
            }
        } else {
            while matches!(self.ch(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
            if self.ch() == Some('.') {
                self.advance();
                while matches!(self.ch(), Some(c) if c.is_ascii_digit()) {
                    self.advance();
                }
            }
            if matches!(self.ch(), Some('e') | Some('E')) {
                self.advance();
                if matches!(self.ch(), Some('+') | Some('-')) {
                    self.advance();
                }
                while matches!(self.ch(), Some(c) if c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }
        let text = &self.input[start..self.pos];
        if matches!(self.ch(), Some(c) if c.is_alphanumeric())
            || text.is_empty()
            || text == "+"
            || text == "-"
        {
            while matches!(self.ch(), Some(c) if c.is_alphanumeric()) {
                self.advance();
            }
            let bad = self.input[start..self.pos].to_string();
            return self.error_token(start, format!("bad number syntax: {:?}", bad));
        }
        Token::new(
            TokenKind::Number(text.to_string()),
            Span::new(start, self.pos),
        )
    }

    fn lex_string(&mut self, start: usize) -> Token {
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.ch() {
                None | Some('\n') => return self.error_token(start, "unterminated quoted string"),
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.ch() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('r') => value.push('\r'),
                        Some('\\') => value.push('\\'),
                        Some('"') => value.push('"'),
                        Some('\'') => value.push('\''),
                        Some(c) => {
                            return self.error_token(
                                start,
                                format!("unknown escape sequence: \\{}", c),
                            )
                        }
                        None => return self.error_token(start, "unterminated quoted string"),
                    }
                    self.advance();
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }
        Token::new(TokenKind::Str(value), Span::new(start, self.pos))
    }

    fn lex_raw_string(&mut self, start: usize) -> Token {
        self.advance(); // opening backquote
        let text_start = self.pos;
        loop {
            match self.ch() {
                None => return self.error_token(start, "unterminated raw quoted string"),
                Some('`') => {
                    let value = self.input[text_start..self.pos].to_string();
                    self.advance();
                    return Token::new(TokenKind::Str(value), Span::new(start, self.pos));
                }
                _ => self.advance(),
            }
        }
    }

    fn lex_char(&mut self, start: usize) -> Token {
        self.advance(); // opening quote
        let c = match self.ch() {
            None => return self.error_token(start, "unterminated character constant"),
            Some('\\') => {
                self.advance();
                let escaped = match self.ch() {
                    Some('n') => '\n',
                    Some('t') => '\t',
                    Some('r') => '\r',
                    Some('\\') => '\\',
                    Some('\'') => '\'',
                    Some('"') => '"',
                    _ => return self.error_token(start, "unknown escape in character constant"),
                };
                escaped
            }
            Some(c) => c,
        };
        self.advance();
        if self.ch() != Some('\'') {
            return self.error_token(start, "unterminated character constant");
        }
        self.advance();
        Token::new(TokenKind::Char(c), Span::new(start, self.pos))
    }
}

/// Reports whether the text directly after `{{` carries a trim marker:
/// a dash followed by whitespace.
fn has_left_trim_marker(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next() == Some('-') && matches!(chars.next(), Some(c) if c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token();
            let is_eof = tok.kind == TokenKind::Eof;
            out.push(tok.kind);
            if is_eof {
                break;
            }
        }
        out
    }

    #[test]
    fn test_text_and_action() {
        assert_eq!(
            kinds("a{{.Foo}}b"),
            vec![
                TokenKind::Text("a".into()),
                TokenKind::LeftDelim,
                TokenKind::Field("Foo".into()),
                TokenKind::RightDelim,
                TokenKind::Text("b".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_variable_and_fields() {
        assert_eq!(
            kinds("{{$x.A.B}}"),
            vec![
                TokenKind::LeftDelim,
                TokenKind::Variable("x".into()),
                TokenKind::Field("A".into()),
                TokenKind::Field("B".into()),
                TokenKind::RightDelim,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_declaration_tokens() {
        assert_eq!(
            kinds("{{$i, $v := .Items}}"),
            vec![
                TokenKind::LeftDelim,
                TokenKind::Variable("i".into()),
                TokenKind::Comma,
                TokenKind::Variable("v".into()),
                TokenKind::Declare,
                TokenKind::Field("Items".into()),
                TokenKind::RightDelim,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comment_token() {
        assert_eq!(
            kinds("{{/* @type p.T */}}"),
            vec![
                TokenKind::Comment("/* @type p.T */".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_trim_markers() {
        assert_eq!(
            kinds("a \n{{- .X -}}\n b"),
            vec![
                TokenKind::Text("a".into()),
                TokenKind::LeftDelim,
                TokenKind::Field("X".into()),
                TokenKind::RightDelim,
                TokenKind::Text("b".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            kinds(r#"{{fn 42 -7 3.5 "s\n" `raw` 'c' true nil}}"#),
            vec![
                TokenKind::LeftDelim,
                TokenKind::Ident("fn".into()),
                TokenKind::Number("42".into()),
                TokenKind::Number("-7".into()),
                TokenKind::Number("3.5".into()),
                TokenKind::Str("s\n".into()),
                TokenKind::Str("raw".into()),
                TokenKind::Char('c'),
                TokenKind::Bool(true),
                TokenKind::Nil,
                TokenKind::RightDelim,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            kinds("{{range .S}}{{break}}{{end}}"),
            vec![
                TokenKind::LeftDelim,
                TokenKind::Range,
                TokenKind::Field("S".into()),
                TokenKind::RightDelim,
                TokenKind::LeftDelim,
                TokenKind::Break,
                TokenKind::RightDelim,
                TokenKind::LeftDelim,
                TokenKind::End,
                TokenKind::RightDelim,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unclosed_action_is_error() {
        let out = kinds("{{.Foo");
        assert!(matches!(out[..], [TokenKind::LeftDelim, TokenKind::Field(_), TokenKind::Error(_), ..]));
    }

    #[test]
    fn test_bad_number() {
        let out = kinds("{{3k}}");
        assert!(out.iter().any(|k| matches!(k, TokenKind::Error(_))));
    }

    #[test]
    fn test_paren_pipeline_tokens() {
        assert_eq!(
            kinds(r#"{{(index .Map "k").Value}}"#),
            vec![
                TokenKind::LeftDelim,
                TokenKind::LParen,
                TokenKind::Ident("index".into()),
                TokenKind::Field("Map".into()),
                TokenKind::Str("k".into()),
                TokenKind::RParen,
                TokenKind::Field("Value".into()),
                TokenKind::RightDelim,
                TokenKind::Eof,
            ]
        );
    }
}
