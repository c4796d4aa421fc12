use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Byte range into the original expression source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn add_offset(self, delta: usize) -> Self {
        Self {
            start: self.start.saturating_add(delta),
            end: self.end.saturating_add(delta),
        }
    }
}

/// Error raised while compiling an expression.
///
/// Parsing stops at the first error; no partial AST is produced. Embedders
/// that prefer robustness over strictness typically log the error and
/// substitute a constant-zero expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub span: Option<Span>,
}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.span {
            Some(span) => write!(f, "{} (at {}..{})", self.message, span.start, span.end),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for SyntaxError {}

impl SyntaxError {
    #[must_use]
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span: Some(span),
        }
    }

    #[must_use]
    pub fn unspanned(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span: None,
        }
    }

    /// Render the error with a caret line pointing at the offending token,
    /// centering the window when the expression is longer than a screen.
    #[must_use]
    pub fn annotate(&self, src: &str) -> String {
        let Some(span) = self.span else {
            return format!("{}\n\n{src}", self.message);
        };
        let mut offset = span.start.min(src.len());
        let mut window = src;
        if offset > 80 {
            let cut = floor_char_boundary(src, offset - 40);
            window = &src[cut..];
            offset -= cut;
        }
        let window: String = window.chars().take(80).collect();
        let pad = window
            .char_indices()
            .take_while(|(i, _)| *i < offset)
            .count();
        format!("{}\n\n{}\n{:pad$}^", self.message, window, "", pad = pad)
    }
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    idx = idx.min(s.len());
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Error raised while evaluating a compiled expression.
///
/// Runtime errors bubble up to the top-level caller; the evaluator performs
/// no local recovery.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// A non-empty string was used where a number is required.
    #[error("expected a numeric value, got \"{0}\"")]
    NotANumber(String),
    /// A string literal or array reached numeric evaluation.
    #[error("{0} cannot be evaluated as a number")]
    NonNumericOperand(&'static str),
    /// A host function rejected its arguments.
    #[error("{fn_name}(): {message}")]
    BadArgument { fn_name: &'static str, message: String },
    /// An invariant of the evaluator itself was violated. Always a bug in
    /// this crate, never content-driven.
    #[error("internal error: {0}")]
    Internal(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn annotate_points_at_token() {
        let err = SyntaxError::new("Expected operator, got operand", Span::new(4, 5));
        let rendered = err.annotate("1 + 2 3");
        assert_eq!(rendered, "Expected operator, got operand\n\n1 + 2 3\n    ^");
    }

    #[test]
    fn annotate_centers_long_sources() {
        let src = format!("{}bad", "1+".repeat(60));
        let err = SyntaxError::new("boom", Span::new(120, 123));
        let rendered = err.annotate(&src);
        let caret_line = rendered.lines().last().unwrap();
        assert_eq!(caret_line.len(), 41);
        assert!(caret_line.ends_with('^'));
    }
}
