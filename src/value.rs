//! Runtime value model.
//!
//! [`Value`] only exists at the boundary between the parser/AST and host
//! functions: a host function receives its arguments as raw `Value`s and
//! decides lazily whether to evaluate them as numbers or strings, dereference
//! them as variables, or inspect them structurally.

use crate::ast::Expr;
use crate::error::RuntimeError;
use crate::eval::Evaluator;
use std::fmt;

/// One of the two actors bound to an evaluation context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Who {
    /// The actor that owns the expression (the `u_` scope).
    Alpha,
    /// The opposite party (the `n_`/`npc_` scope).
    Beta,
}

/// Storage class of a scoped variable or host-function call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Alpha,
    Beta,
    Global,
    /// Per-evaluation transient variables supplied by the caller.
    Context,
    /// The stored string names a further scoped variable.
    Indirect,
}

impl Scope {
    /// The actor a scope letter refers to; global-scoped host functions
    /// default to the alpha actor, matching the original engine.
    #[must_use]
    pub fn who(self) -> Who {
        match self {
            Scope::Beta => Who::Beta,
            _ => Who::Alpha,
        }
    }

    pub(crate) fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'u' => Some(Scope::Alpha),
            'n' => Some(Scope::Beta),
            'g' => Some(Scope::Global),
            'v' => Some(Scope::Indirect),
            _ => None,
        }
    }
}

/// A variable name with its storage scope resolved from the spelling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopedName {
    pub scope: Scope,
    pub key: String,
}

/// Recognized prefixes, longest first so stripping is greedy and unambiguous.
const PREFIXES: [(&str, Scope); 8] = [
    ("context_", Scope::Context),
    ("global_", Scope::Global),
    ("npc_", Scope::Beta),
    ("u_", Scope::Alpha),
    ("n_", Scope::Beta),
    ("g_", Scope::Global),
    ("v_", Scope::Indirect),
    ("_", Scope::Context),
];

impl ScopedName {
    #[must_use]
    pub fn new(scope: Scope, key: impl Into<String>) -> Self {
        Self {
            scope,
            key: key.into(),
        }
    }

    /// Resolve an identifier's scope from its prefix. An unrecognized prefix
    /// is not an error: the whole identifier becomes a global name, so
    /// content may use names that merely look prefixed.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        for (prefix, scope) in PREFIXES {
            if let Some(key) = name.strip_prefix(prefix) {
                if !key.is_empty() {
                    return Self::new(scope, key);
                }
            }
        }
        Self::new(Scope::Global, name)
    }
}

impl fmt::Display for ScopedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.scope {
            Scope::Alpha => "u_",
            Scope::Beta => "n_",
            Scope::Global => "",
            Scope::Context => "_",
            Scope::Indirect => "v_",
        };
        write!(f, "{prefix}{}", self.key)
    }
}

/// A raw host-function argument.
#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    Str(String),
    Array(Vec<Value>),
    /// A bare variable name; the host function may read or write it.
    VarRef(ScopedName),
    /// An unevaluated sub-expression; evaluated on demand via [`Value::dbl`].
    Expr(Box<Expr>),
}

impl Value {
    /// Evaluate this value as a number.
    ///
    /// Variable references read through the context (unset is 0); strings
    /// must parse as numbers; arrays are a type error.
    pub fn dbl(&self, ev: &mut Evaluator<'_>) -> Result<f64, RuntimeError> {
        match self {
            Value::Number(n) => Ok(*n),
            Value::Str(s) => s
                .trim()
                .parse()
                .map_err(|_| RuntimeError::NotANumber(s.clone())),
            Value::VarRef(name) => ev.read_var_num(name),
            Value::Expr(expr) => ev.eval(expr),
            Value::Array(_) => Err(RuntimeError::NonNumericOperand("an array")),
        }
    }

    /// Evaluate this value as a string.
    ///
    /// Variable references read the raw stored string (unset is empty);
    /// numbers and sub-expressions are formatted.
    pub fn str(&self, ev: &mut Evaluator<'_>) -> Result<String, RuntimeError> {
        match self {
            Value::Str(s) => Ok(s.clone()),
            Value::Number(n) => Ok(fmt_f64(*n)),
            Value::VarRef(name) => Ok(ev.read_var_raw(name).unwrap_or_default()),
            Value::Expr(expr) => Ok(fmt_f64(ev.eval(expr)?)),
            Value::Array(_) => Err(RuntimeError::NonNumericOperand("an array")),
        }
    }

    /// The variable this value names, if it is a bare reference.
    #[must_use]
    pub fn var_ref(&self) -> Option<&ScopedName> {
        match self {
            Value::VarRef(name) => Some(name),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

/// Format a number the way variable stores expect it: integral values print
/// without a fractional part, everything else uses the shortest round-trip
/// representation.
#[must_use]
pub(crate) fn fmt_f64(value: f64) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn prefix_stripping_is_greedy() {
        assert_eq!(ScopedName::parse("u_str"), ScopedName::new(Scope::Alpha, "str"));
        assert_eq!(ScopedName::parse("npc_x"), ScopedName::new(Scope::Beta, "x"));
        assert_eq!(ScopedName::parse("n_x"), ScopedName::new(Scope::Beta, "x"));
        assert_eq!(
            ScopedName::parse("global_kills"),
            ScopedName::new(Scope::Global, "kills")
        );
        assert_eq!(
            ScopedName::parse("context_here"),
            ScopedName::new(Scope::Context, "here")
        );
        assert_eq!(ScopedName::parse("_here"), ScopedName::new(Scope::Context, "here"));
        assert_eq!(ScopedName::parse("v_ptr"), ScopedName::new(Scope::Indirect, "ptr"));
    }

    #[test]
    fn unknown_prefixes_fall_through_to_global() {
        assert_eq!(ScopedName::parse("x_val"), ScopedName::new(Scope::Global, "x_val"));
        assert_eq!(ScopedName::parse("score"), ScopedName::new(Scope::Global, "score"));
        // A bare prefix with no key is a name, not a scope.
        assert_eq!(ScopedName::parse("u_"), ScopedName::new(Scope::Global, "u_"));
    }
}
