//! Minimal GraphQL lexer shared by the schema check and document analysis.
//!
//! Only what the checks need: names, punctuators and opaque values. Comments,
//! commas and whitespace are dropped; strings and numbers collapse into
//! [`Token::Value`].

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Name(&'a str),
    Punct(char),
    /// `...`
    Spread,
    /// String, block string or number literal.
    Value,
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Name(name) => f.write_str(name),
            Token::Punct(c) => write!(f, "{c}"),
            Token::Spread => f.write_str("..."),
            Token::Value => f.write_str("<value>"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Spanned<'a> {
    pub token: Token<'a>,
    pub line: usize,
}

pub fn tokenize(src: &str) -> Vec<Spanned<'_>> {
    let bytes = src.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    let mut line = 1;

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'\n' => {
                line += 1;
                i += 1;
            }
            b' ' | b'\t' | b'\r' | b',' => i += 1,
            b'#' => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'"' if bytes[i..].starts_with(b"\"\"\"") => {
                let start_line = line;
                i += 3;
                while i < bytes.len() && !bytes[i..].starts_with(b"\"\"\"") {
                    if bytes[i..].starts_with(b"\\\"\"\"") {
                        i += 4;
                        continue;
                    }
                    if bytes[i] == b'\n' {
                        line += 1;
                    }
                    i += 1;
                }
                i = (i + 3).min(bytes.len());
                out.push(Spanned { token: Token::Value, line: start_line });
            }
            b'"' => {
                i += 1;
                while i < bytes.len() && bytes[i] != b'"' && bytes[i] != b'\n' {
                    i += if bytes[i] == b'\\' { 2 } else { 1 };
                }
                i = (i + 1).min(bytes.len());
                out.push(Spanned { token: Token::Value, line });
            }
            b'.' if bytes[i..].starts_with(b"...") => {
                out.push(Spanned { token: Token::Spread, line });
                i += 3;
            }
            b'-' | b'0'..=b'9' => {
                i += 1;
                while i < bytes.len()
                    && matches!(bytes[i], b'0'..=b'9' | b'.' | b'e' | b'E' | b'+' | b'-')
                {
                    i += 1;
                }
                out.push(Spanned { token: Token::Value, line });
            }
            b'_' | b'a'..=b'z' | b'A'..=b'Z' => {
                let start = i;
                while i < bytes.len() && matches!(bytes[i], b'_' | b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9') {
                    i += 1;
                }
                out.push(Spanned { token: Token::Name(&src[start..i]), line });
            }
            _ if b.is_ascii() => {
                out.push(Spanned { token: Token::Punct(b as char), line });
                i += 1;
            }
            _ => {
                // BOM or another non-ASCII character outside a string.
                let width = src[i..].chars().next().map_or(1, char::len_utf8);
                i += width;
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// TypeRef
// ---------------------------------------------------------------------------

/// A type reference such as `[ID!]!`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    /// Innermost named type.
    pub fn base(&self) -> &str {
        match self {
            TypeRef::Named(name) => name,
            TypeRef::List(inner) | TypeRef::NonNull(inner) => inner.base(),
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, TypeRef::NonNull(_))
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(name) => f.write_str(name),
            TypeRef::List(inner) => write!(f, "[{inner}]"),
            TypeRef::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

// ---------------------------------------------------------------------------
// Cursor
// ---------------------------------------------------------------------------

/// Forward-only cursor over a token list.
pub struct Cursor<'t, 'a> {
    tokens: &'t [Spanned<'a>],
    pos: usize,
}

impl<'t, 'a> Cursor<'t, 'a> {
    pub fn new(tokens: &'t [Spanned<'a>]) -> Self {
        Cursor { tokens, pos: 0 }
    }

    pub fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).map(|s| s.token)
    }

    pub fn bump(&mut self) -> Option<Token<'a>> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    pub fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |s| s.line)
    }

    pub fn is_punct(&self, c: char) -> bool {
        self.peek() == Some(Token::Punct(c))
    }

    pub fn is_name(&self, name: &str) -> bool {
        self.peek() == Some(Token::Name(name))
    }

    /// Consume `c` if it is next.
    pub fn eat(&mut self, c: char) -> bool {
        if self.is_punct(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub fn expect(&mut self, c: char) -> Result<(), String> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("Expected \"{c}\"")))
        }
    }

    pub fn expect_name(&mut self) -> Result<&'a str, String> {
        match self.peek() {
            Some(Token::Name(name)) => {
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected("Expected Name")),
        }
    }

    /// Syntax error at the current token.
    pub fn unexpected(&self, expected: &str) -> String {
        let found = match self.peek() {
            Some(token) => format!("\"{token}\""),
            None => "<EOF>".to_string(),
        };
        format!("Syntax Error: {expected}, found {found} (line {}).", self.line())
    }

    /// `Name`, `[T]`, and either with a trailing `!`.
    pub fn type_ref(&mut self) -> Result<TypeRef, String> {
        let ty = if self.eat('[') {
            let inner = self.type_ref()?;
            self.expect(']')?;
            TypeRef::List(Box::new(inner))
        } else {
            TypeRef::Named(self.expect_name()?.to_string())
        };
        if self.eat('!') {
            Ok(TypeRef::NonNull(Box::new(ty)))
        } else {
            Ok(ty)
        }
    }

    /// Skip any number of `@name(args)` directives.
    pub fn skip_directives(&mut self) -> Result<(), String> {
        while self.eat('@') {
            self.expect_name()?;
            if self.is_punct('(') {
                self.skip_balanced('(', ')')?;
            }
        }
        Ok(())
    }

    /// Skip a constant or variable value.
    pub fn skip_value(&mut self) -> Result<(), String> {
        match self.peek() {
            Some(Token::Punct('[')) => self.skip_balanced('[', ']'),
            Some(Token::Punct('{')) => self.skip_balanced('{', '}'),
            Some(Token::Punct('$')) => {
                self.pos += 1;
                self.expect_name().map(|_| ())
            }
            Some(Token::Name(_)) | Some(Token::Value) => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(self.unexpected("Expected value")),
        }
    }

    /// Skip from an `open` token to its matching `close`.
    pub fn skip_balanced(&mut self, open: char, close: char) -> Result<(), String> {
        self.expect(open)?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.bump() {
                Some(Token::Punct(c)) if c == open => depth += 1,
                Some(Token::Punct(c)) if c == close => depth -= 1,
                Some(_) => {}
                None => return Err(self.unexpected(&format!("Expected \"{close}\""))),
            }
        }
        Ok(())
    }
}
