//! An embedded math expression language for data-driven scripting.
//!
//! Content files carry small arithmetic expressions — conditions, formulas,
//! variable updates — as strings: `u_strength + rng(1, 3) > 10`. This crate
//! compiles such a string once into an immutable tree and evaluates it any
//! number of times against a host-supplied [`Context`].
//!
//! Three function tiers are available inside an expression:
//!
//! * pure built-ins (`min`, `clamp`, `rng`, ...), evaluated eagerly;
//! * custom formulas loaded from content data into a [`FormulaRegistry`];
//! * scoped host functions (`u_val('key')`, `n_has_var('key')`, ...),
//!   which receive raw [`Value`] arguments and talk to the context.
//!
//! Variables are plain strings in the context, scoped by spelling: `u_`/`n_`
//! pick an actor, `g_`/`global_` the global store, `_`/`context_` the
//! per-evaluation transients, and `v_` reads a variable whose *name* is
//! stored in another variable.
//!
//! ```
//! use dialogue_math::{compile, ScriptContext};
//!
//! let expr = compile("1 + 2 * 3").unwrap();
//! let mut ctx = ScriptContext::new();
//! assert_eq!(expr.eval(&mut ctx).unwrap(), 7.0);
//! ```
//!
//! Compiled expressions are immutable and shareable; evaluation is
//! single-threaded by design, one [`Context`] at a time.

#![forbid(unsafe_code)]

pub mod ast;
pub mod context;
pub mod error;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod ops;
pub mod value;

mod parser;
mod vars;

pub use ast::{AssignTarget, Expr, HostCall, MathExpr};
pub use context::{Context, ScriptContext};
pub use error::{RuntimeError, Span, SyntaxError};
pub use eval::Evaluator;
pub use functions::{
    CustomFormula, FormulaDef, FormulaRegistry, HostFnSpec, Kwargs, MathFnSpec,
};
pub use value::{Scope, ScopedName, Value, Who};
pub use vars::MAX_INDIRECTION;

/// Compile an expression that uses no custom formulas.
pub fn compile(src: &str) -> Result<MathExpr, SyntaxError> {
    MathExpr::compile(src, FormulaRegistry::empty())
}

/// Compile an assignment target (see [`MathExpr::compile_assign_target`])
/// that uses no custom formulas.
pub fn compile_assign_target(src: &str) -> Result<MathExpr, SyntaxError> {
    MathExpr::compile_assign_target(src, FormulaRegistry::empty())
}
