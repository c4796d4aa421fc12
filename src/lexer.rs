//! Expression lexer.
//!
//! Tokenization is deliberately permissive: apart from an unterminated string
//! literal, malformed input still produces a best-effort token stream so that
//! the parser can report errors with grammar context instead of character
//! classes.

use crate::error::{Span, SyntaxError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Number,
    Identifier,
    Operator,
    /// A `'`-quoted string literal; the token text excludes the quotes and
    /// has escape sequences resolved.
    Str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Slice of the source for `Number`/`Identifier`/`Operator`; owned,
    /// unescaped text for `Str`.
    pub text: std::borrow::Cow<'a, str>,
    pub span: Span,
}

impl Token<'_> {
    pub fn is_op(&self, sym: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == sym
    }
}

/// Punctuation characters that terminate an identifier run. Everything else
/// (including digits and underscores) may appear inside an identifier.
const PUNCTUATION: &str = "+-*/%^=<>!?:,()[].'";

/// Two-character operators lexed as a single token when adjacent.
const DIGRAPHS: [&str; 11] = [
    "++", "--", "==", "!=", "<=", ">=", "+=", "-=", "*=", "/=", "%=",
];

pub fn tokenize(src: &str) -> Result<Vec<Token<'_>>, SyntaxError> {
    Lexer::new(src).run()
}

struct Lexer<'a> {
    src: &'a str,
    idx: usize,
    tokens: Vec<Token<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            idx: 0,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token<'a>>, SyntaxError> {
        while let Some(ch) = self.peek() {
            let start = self.idx;
            if ch.is_whitespace() {
                self.bump(ch);
            } else if ch.is_ascii_digit() || (ch == '.' && self.peek_second_is_digit()) {
                self.number(start);
            } else if ch == '\'' {
                self.string(start)?;
            } else if PUNCTUATION.contains(ch) {
                self.operator(start, ch);
            } else {
                self.identifier(start);
            }
        }
        Ok(self.tokens)
    }

    fn peek(&self) -> Option<char> {
        self.src[self.idx..].chars().next()
    }

    fn peek_second_is_digit(&self) -> bool {
        self.src[self.idx..]
            .chars()
            .nth(1)
            .is_some_and(|c| c.is_ascii_digit())
    }

    fn bump(&mut self, ch: char) {
        self.idx += ch.len_utf8();
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token {
            kind,
            text: std::borrow::Cow::Borrowed(&self.src[start..self.idx]),
            span: Span::new(start, self.idx),
        });
    }

    /// Digits with at most one decimal point and one exponent marker. The
    /// decimal point is always `.`, independent of the process locale.
    fn number(&mut self, start: usize) {
        let mut seen_dot = false;
        let mut seen_exp = false;
        while let Some(ch) = self.peek() {
            match ch {
                '0'..='9' => self.bump(ch),
                '.' if !seen_dot && !seen_exp => {
                    seen_dot = true;
                    self.bump(ch);
                }
                'e' | 'E' if !seen_exp && self.exponent_follows() => {
                    seen_exp = true;
                    self.bump(ch);
                    if matches!(self.peek(), Some('+' | '-')) {
                        self.bump('+');
                    }
                }
                _ => break,
            }
        }
        self.push(TokenKind::Number, start);
    }

    fn exponent_follows(&self) -> bool {
        let mut it = self.src[self.idx..].chars();
        it.next(); // the e/E itself
        match it.next() {
            Some('+' | '-') => it.next().is_some_and(|c| c.is_ascii_digit()),
            Some(c) => c.is_ascii_digit(),
            None => false,
        }
    }

    /// Consume until the next unescaped `'`. The quotes are not part of the
    /// token text; `\'` and `\\` escapes are resolved here.
    fn string(&mut self, start: usize) -> Result<(), SyntaxError> {
        self.bump('\'');
        let mut text = String::new();
        loop {
            let Some(ch) = self.peek() else {
                return Err(SyntaxError::new(
                    "Unterminated string",
                    Span::new(start, self.idx),
                ));
            };
            self.bump(ch);
            match ch {
                '\'' => break,
                '\\' => match self.peek() {
                    Some(esc @ ('\'' | '\\')) => {
                        self.bump(esc);
                        text.push(esc);
                    }
                    _ => text.push('\\'),
                },
                _ => text.push(ch),
            }
        }
        self.tokens.push(Token {
            kind: TokenKind::Str,
            text: std::borrow::Cow::Owned(text),
            span: Span::new(start, self.idx),
        });
        Ok(())
    }

    fn operator(&mut self, start: usize, ch: char) {
        self.bump(ch);
        if let Some(next) = self.peek() {
            let mut pair = [0u8; 8];
            let pair = {
                let a = ch.encode_utf8(&mut pair).len();
                let _ = next.encode_utf8(&mut pair[a..]);
                &pair[..a + next.len_utf8()]
            };
            if let Ok(pair) = std::str::from_utf8(pair) {
                if DIGRAPHS.contains(&pair) {
                    self.bump(next);
                }
            }
        }
        self.push(TokenKind::Operator, start);
    }

    fn identifier(&mut self, start: usize) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() || PUNCTUATION.contains(ch) {
                break;
            }
            self.bump(ch);
        }
        self.push(TokenKind::Identifier, start);
    }
}
