//! Go tokenizer with automatic semicolon insertion.
//!
//! The scanner produces a flat token stream over the source bytes. Two
//! departures from a naive lexer matter to everything downstream:
//!
//! - **Semicolon insertion**: a newline after certain token kinds (see
//!   [`TokenKind::triggers_asi`]) yields a zero-width `Semicolon` token, so
//!   the parser never deals with line boundaries itself. A general comment
//!   spanning a newline counts as a newline.
//! - **Comments** never enter the token stream; they are collected into a
//!   side table with spans, which the parser uses for doc attachment.

use gadfly_core::patch::Span;
use thiserror::Error;

use crate::token::{Comment, Token, TokenKind};

/// Error produced when the scanner encounters malformed input.
#[derive(Debug, Error)]
#[error("scan error at offset {offset}: {message}")]
pub struct ScanError {
    pub message: String,
    pub offset: u32,
}

/// Output of a successful scan.
#[derive(Debug)]
pub struct ScanOutput {
    pub tokens: Vec<Token>,
    pub comments: Vec<Comment>,
}

/// Tokenize Go source, inserting semicolons per the language rules.
pub fn tokenize(src: &str) -> Result<ScanOutput, ScanError> {
    let mut scanner = Scanner {
        src,
        bytes: src.as_bytes(),
        pos: 0,
        tokens: Vec::new(),
        comments: Vec::new(),
        last: None,
    };
    scanner.run()?;
    Ok(ScanOutput {
        tokens: scanner.tokens,
        comments: scanner.comments,
    })
}

struct Scanner<'s> {
    src: &'s str,
    bytes: &'s [u8],
    pos: usize,
    tokens: Vec<Token>,
    comments: Vec<Comment>,
    /// Kind of the last emitted token, for semicolon insertion.
    last: Option<TokenKind>,
}

impl<'s> Scanner<'s> {
    fn run(&mut self) -> Result<(), ScanError> {
        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            match b {
                b' ' | b'\t' | b'\r' => self.pos += 1,
                b'\n' => {
                    self.maybe_insert_semi(self.pos);
                    self.pos += 1;
                }
                b'/' if self.peek(1) == Some(b'/') => self.line_comment(),
                b'/' if self.peek(1) == Some(b'*') => self.block_comment()?,
                b'0'..=b'9' => self.number(),
                b'"' => self.string_lit()?,
                b'`' => self.raw_string_lit()?,
                b'\'' => self.char_lit()?,
                _ if is_ident_start(b) => self.ident(),
                _ => self.operator()?,
            }
        }
        // Rule 2: a semicolon is inserted at EOF after a terminating token.
        self.maybe_insert_semi(self.pos);
        self.emit_at(TokenKind::Eof, self.pos, self.pos);
        Ok(())
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn emit_at(&mut self, kind: TokenKind, start: usize, end: usize) {
        self.tokens.push(Token {
            kind,
            span: Span::new(start as u32, end as u32),
        });
        self.last = Some(kind);
    }

    fn maybe_insert_semi(&mut self, at: usize) {
        if self.last.map(|k| k.triggers_asi()).unwrap_or(false) {
            self.emit_at(TokenKind::Semicolon, at, at);
        }
    }

    fn error(&self, message: impl Into<String>, offset: usize) -> ScanError {
        ScanError {
            message: message.into(),
            offset: offset as u32,
        }
    }

    // ------------------------------------------------------------------
    // Comments
    // ------------------------------------------------------------------

    fn line_comment(&mut self) {
        let start = self.pos;
        let end = memchr::memchr(b'\n', &self.bytes[start..])
            .map(|i| start + i)
            .unwrap_or(self.bytes.len());
        self.comments.push(Comment {
            text: self.src[start..end].to_string(),
            span: Span::new(start as u32, end as u32),
        });
        // The newline itself is left in place so semicolon insertion
        // still sees it.
        self.pos = end;
    }

    fn block_comment(&mut self) -> Result<(), ScanError> {
        let start = self.pos;
        let mut i = start + 2;
        loop {
            match memchr::memchr(b'*', &self.bytes[i..]) {
                Some(off) if self.bytes.get(i + off + 1) == Some(&b'/') => {
                    let end = i + off + 2;
                    let text = &self.src[start..end];
                    self.comments.push(Comment {
                        text: text.to_string(),
                        span: Span::new(start as u32, end as u32),
                    });
                    // A general comment containing newlines acts as a newline.
                    if text.contains('\n') {
                        self.maybe_insert_semi(start);
                    }
                    self.pos = end;
                    return Ok(());
                }
                Some(off) => i += off + 1,
                None => return Err(self.error("unterminated block comment", start)),
            }
        }
    }

    // ------------------------------------------------------------------
    // Literals and identifiers
    // ------------------------------------------------------------------

    fn ident(&mut self) {
        let start = self.pos;
        while self.pos < self.bytes.len() && is_ident_continue(self.bytes[self.pos]) {
            self.pos += 1;
        }
        let text = &self.src[start..self.pos];
        let kind = TokenKind::keyword(text).unwrap_or(TokenKind::Ident);
        self.emit_at(kind, start, self.pos);
    }

    fn number(&mut self) {
        let start = self.pos;
        let mut kind = TokenKind::Int;

        if self.bytes[self.pos] == b'0'
            && matches!(self.peek(1), Some(b'x' | b'X' | b'b' | b'B' | b'o' | b'O'))
        {
            self.pos += 2;
            while self
                .peek(0)
                .map(|b| b.is_ascii_hexdigit() || b == b'_')
                .unwrap_or(false)
            {
                self.pos += 1;
            }
            self.emit_at(kind, start, self.pos);
            return;
        }

        while self
            .peek(0)
            .map(|b| b.is_ascii_digit() || b == b'_')
            .unwrap_or(false)
        {
            self.pos += 1;
        }
        if self.peek(0) == Some(b'.') && self.peek(1).map(|b| b.is_ascii_digit()).unwrap_or(false) {
            kind = TokenKind::Float;
            self.pos += 1;
            while self
                .peek(0)
                .map(|b| b.is_ascii_digit() || b == b'_')
                .unwrap_or(false)
            {
                self.pos += 1;
            }
        }
        if matches!(self.peek(0), Some(b'e' | b'E')) {
            kind = TokenKind::Float;
            self.pos += 1;
            if matches!(self.peek(0), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            while self.peek(0).map(|b| b.is_ascii_digit()).unwrap_or(false) {
                self.pos += 1;
            }
        }
        self.emit_at(kind, start, self.pos);
    }

    fn string_lit(&mut self) -> Result<(), ScanError> {
        let start = self.pos;
        self.pos += 1;
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'"' => {
                    self.pos += 1;
                    self.emit_at(TokenKind::Str, start, self.pos);
                    return Ok(());
                }
                b'\\' => self.pos += 2,
                b'\n' => return Err(self.error("newline in string literal", start)),
                _ => self.pos += 1,
            }
        }
        Err(self.error("unterminated string literal", start))
    }

    fn raw_string_lit(&mut self) -> Result<(), ScanError> {
        let start = self.pos;
        match memchr::memchr(b'`', &self.bytes[start + 1..]) {
            Some(i) => {
                self.pos = start + 1 + i + 1;
                self.emit_at(TokenKind::Str, start, self.pos);
                Ok(())
            }
            None => Err(self.error("unterminated raw string literal", start)),
        }
    }

    fn char_lit(&mut self) -> Result<(), ScanError> {
        let start = self.pos;
        self.pos += 1;
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'\'' => {
                    self.pos += 1;
                    self.emit_at(TokenKind::Char, start, self.pos);
                    return Ok(());
                }
                b'\\' => self.pos += 2,
                b'\n' => return Err(self.error("newline in char literal", start)),
                _ => self.pos += 1,
            }
        }
        Err(self.error("unterminated char literal", start))
    }

    // ------------------------------------------------------------------
    // Operators
    // ------------------------------------------------------------------

    fn operator(&mut self) -> Result<(), ScanError> {
        use TokenKind::*;
        let start = self.pos;
        let b = self.bytes[start];
        let b1 = self.peek(1);
        let b2 = self.peek(2);

        // Longest-match first per leading byte.
        let (kind, len) = match b {
            b'+' => match b1 {
                Some(b'+') => (Inc, 2),
                Some(b'=') => (AddAssign, 2),
                _ => (Add, 1),
            },
            b'-' => match b1 {
                Some(b'-') => (Dec, 2),
                Some(b'=') => (SubAssign, 2),
                _ => (Sub, 1),
            },
            b'*' => match b1 {
                Some(b'=') => (MulAssign, 2),
                _ => (Mul, 1),
            },
            b'/' => match b1 {
                Some(b'=') => (QuoAssign, 2),
                _ => (Quo, 1),
            },
            b'%' => match b1 {
                Some(b'=') => (RemAssign, 2),
                _ => (Rem, 1),
            },
            b'^' => match b1 {
                Some(b'=') => (XorAssign, 2),
                _ => (Xor, 1),
            },
            b'&' => match (b1, b2) {
                (Some(b'^'), Some(b'=')) => (AndNotAssign, 3),
                (Some(b'^'), _) => (AndNot, 2),
                (Some(b'&'), _) => (LAnd, 2),
                (Some(b'='), _) => (AndAssign, 2),
                _ => (And, 1),
            },
            b'|' => match b1 {
                Some(b'|') => (LOr, 2),
                Some(b'=') => (OrAssign, 2),
                _ => (Or, 1),
            },
            b'<' => match (b1, b2) {
                (Some(b'<'), Some(b'=')) => (ShlAssign, 3),
                (Some(b'<'), _) => (Shl, 2),
                (Some(b'='), _) => (Leq, 2),
                (Some(b'-'), _) => (Arrow, 2),
                _ => (Lss, 1),
            },
            b'>' => match (b1, b2) {
                (Some(b'>'), Some(b'=')) => (ShrAssign, 3),
                (Some(b'>'), _) => (Shr, 2),
                (Some(b'='), _) => (Geq, 2),
                _ => (Gtr, 1),
            },
            b'=' => match b1 {
                Some(b'=') => (Eql, 2),
                _ => (Assign, 1),
            },
            b'!' => match b1 {
                Some(b'=') => (Neq, 2),
                _ => (Not, 1),
            },
            b':' => match b1 {
                Some(b'=') => (Define, 2),
                _ => (Colon, 1),
            },
            b'.' => match (b1, b2) {
                (Some(b'.'), Some(b'.')) => (Ellipsis, 3),
                _ => (Period, 1),
            },
            b'(' => (LParen, 1),
            b'[' => (LBracket, 1),
            b'{' => (LBrace, 1),
            b')' => (RParen, 1),
            b']' => (RBracket, 1),
            b'}' => (RBrace, 1),
            b',' => (Comma, 1),
            b';' => (Semicolon, 1),
            _ => return Err(self.error(format!("unexpected character {:?}", b as char), start)),
        };
        self.pos = start + len;
        self.emit_at(kind, start, self.pos);
        Ok(())
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

// ============================================================================
// Tests
// ============================================================================
