//! Template expression syntax
//!
//! String leaves of a template mix literal text with `{{ ... }}` tags. A tag
//! holds one expression:
//!
//! ```text
//! expr  := STRING | NUMBER | path | call
//! path  := IDENT ('.' IDENT)*
//! call  := IDENT '(' [expr (',' expr)*] ')'
//! ```
//!
//! Strings are single- or double-quoted and may contain commas, parentheses
//! and `}}`. Calls nest. `\{{` in text produces a literal `{{`.

use serde_json::{Number, Value as JsonValue};
use std::fmt;
use thiserror::Error;

/// Deepest call nesting a tag may use
pub const MAX_NESTING: usize = 64;

/// One piece of a scanned string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Literal text, emitted as-is
    Text(&'a str),
    /// A `{{ ... }}` tag; `raw` includes the braces, `body` excludes them
    Tag { raw: &'a str, body: &'a str },
}

/// A parsed tag expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(JsonValue),
    Path(Vec<String>),
    Call { name: String, args: Vec<Expr> },
}

impl Expr {
    /// Collect the dotted names of every variable the expression reads
    pub fn collect_paths(&self, out: &mut Vec<String>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Path(segments) => out.push(segments.join(".")),
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.collect_paths(out);
                }
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(value) => write!(f, "{}", value),
            Expr::Path(segments) => write!(f, "{}", segments.join(".")),
            Expr::Call { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Error parsing a tag body
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message} at offset {offset} in '{body}'")]
pub struct SyntaxError {
    pub message: String,
    pub offset: usize,
    pub body: String,
}

/// Split a string into literal text and tags
///
/// An unterminated `{{` is kept as text.
pub fn scan(input: &str) -> Vec<Segment<'_>> {
    let bytes = input.as_bytes();
    let mut segments = Vec::new();
    let mut text_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' && input[i + 1..].starts_with("{{") {
            if text_start < i {
                segments.push(Segment::Text(&input[text_start..i]));
            }
            segments.push(Segment::Text("{{"));
            i += 3;
            text_start = i;
            continue;
        }

        if bytes[i] == b'{' && bytes.get(i + 1) == Some(&b'{') {
            if let Some(end) = find_tag_end(input, i + 2) {
                if text_start < i {
                    segments.push(Segment::Text(&input[text_start..i]));
                }
                segments.push(Segment::Tag {
                    raw: &input[i..end + 2],
                    body: &input[i + 2..end],
                });
                i = end + 2;
                text_start = i;
                continue;
            }
            break;
        }

        i += 1;
    }

    if text_start < input.len() {
        segments.push(Segment::Text(&input[text_start..]));
    }
    segments
}

/// Find the byte offset of the `}}` closing a tag whose body starts at `from`
///
/// Braces inside quoted strings do not close the tag.
fn find_tag_end(input: &str, from: usize) -> Option<usize> {
    let bytes = input.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = from;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => {
                if b == b'"' || b == b'\'' {
                    quote = Some(b);
                } else if b == b'}' && bytes.get(i + 1) == Some(&b'}') {
                    return Some(i);
                }
            }
        }
        i += 1;
    }
    None
}

/// Parse a tag body into an expression
pub fn parse_expr(body: &str) -> Result<Expr, SyntaxError> {
    let mut parser = Parser {
        body,
        chars: body.char_indices().collect(),
        pos: 0,
        depth: 0,
    };
    parser.skip_ws();
    if parser.at_end() {
        return Err(parser.error("empty expression"));
    }
    let expr = parser.expr()?;
    parser.skip_ws();
    if !parser.at_end() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(expr)
}

/// Check a single name against identifier syntax `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

struct Parser<'a> {
    body: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map(|(offset, _)| *offset)
            .unwrap_or(self.body.len())
    }

    fn error(&self, message: &str) -> SyntaxError {
        SyntaxError {
            message: message.to_string(),
            offset: self.offset(),
            body: self.body.to_string(),
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expr(&mut self) -> Result<Expr, SyntaxError> {
        match self.peek() {
            Some('"') | Some('\'') => self.string(),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' => self.number(),
            Some(c) if c.is_ascii_alphabetic() || c == '_' => self.path_or_call(),
            Some(_) => Err(self.error("unexpected character")),
            None => Err(self.error("expected an expression")),
        }
    }

    fn string(&mut self) -> Result<Expr, SyntaxError> {
        let quote = self.peek().unwrap_or('"');
        self.pos += 1;
        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string")),
                Some('\\') => {
                    self.pos += 1;
                    match self.peek() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some(c) => value.push(c),
                        None => return Err(self.error("unterminated string")),
                    }
                    self.pos += 1;
                }
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(Expr::Literal(JsonValue::String(value)));
                }
                Some(c) => {
                    value.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn number(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.pos;
        if matches!(self.peek(), Some('-') | Some('+')) {
            self.pos += 1;
        }
        let mut seen_dot = false;
        let mut seen_digit = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                seen_digit = true;
            } else if c == '.' && !seen_dot {
                seen_dot = true;
            } else {
                break;
            }
            self.pos += 1;
        }
        if self.peek().is_some_and(|c| c.is_ascii_alphabetic() || c == '_') {
            return Err(self.error("invalid number"));
        }
        if !seen_digit {
            return Err(self.error("expected digits"));
        }

        let text: String = self.chars[start..self.pos].iter().map(|(_, c)| *c).collect();
        let number = if seen_dot {
            text.parse::<f64>().ok().and_then(Number::from_f64)
        } else {
            text.trim_start_matches('+').parse::<i64>().ok().map(Number::from)
        };
        number
            .map(|n| Expr::Literal(JsonValue::Number(n)))
            .ok_or_else(|| self.error("number out of range"))
    }

    fn identifier(&mut self) -> Result<String, SyntaxError> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => self.pos += 1,
            _ => return Err(self.error("expected an identifier")),
        }
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        Ok(self.chars[start..self.pos].iter().map(|(_, c)| *c).collect())
    }

    fn path_or_call(&mut self) -> Result<Expr, SyntaxError> {
        let first = self.identifier()?;

        self.skip_ws();
        if self.peek() == Some('(') {
            if self.depth >= MAX_NESTING {
                return Err(self.error("expression nested too deeply"));
            }
            self.pos += 1;
            self.depth += 1;
            let args = self.args()?;
            self.depth -= 1;
            return Ok(Expr::Call { name: first, args });
        }

        let mut segments = vec![first];
        while self.peek() == Some('.') {
            self.pos += 1;
            segments.push(self.identifier()?);
        }

        if segments.len() == 1 {
            match segments[0].as_str() {
                "true" => return Ok(Expr::Literal(JsonValue::Bool(true))),
                "false" => return Ok(Expr::Literal(JsonValue::Bool(false))),
                "null" | "None" => return Ok(Expr::Literal(JsonValue::Null)),
                _ => {}
            }
        }
        Ok(Expr::Path(segments))
    }

    fn args(&mut self) -> Result<Vec<Expr>, SyntaxError> {
        let mut args = Vec::new();
        self.skip_ws();
        if self.peek() == Some(')') {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            self.skip_ws();
            args.push(self.expr()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(')') => {
                    self.pos += 1;
                    return Ok(args);
                }
                Some(_) => return Err(self.error("expected ',' or ')'")),
                None => return Err(self.error("unclosed argument list")),
            }
        }
    }
}
