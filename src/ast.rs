//! Compiled expression tree.
//!
//! The node set is a closed sum type so the evaluator's `match` is checked
//! exhaustively by the compiler. Trees are built once by the parser, own all
//! of their children, and are immutable afterwards: re-evaluating a
//! [`MathExpr`] never mutates it, so compiled expressions can be shared and
//! reused freely.

use crate::context::Context;
use crate::error::{RuntimeError, SyntaxError};
use crate::eval::Evaluator;
use crate::functions::{CustomFormula, FormulaRegistry, HostFnSpec, Kwargs, MathFnSpec};
use crate::ops::{AssignOp, BinOp, UnaryOp};
use crate::parser;
use crate::value::{Scope, ScopedName, Value};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum Expr {
    Const(f64),
    /// Only meaningful as a function argument; a string in numeric position
    /// is a runtime error.
    Str(String),
    Var(ScopedName),
    Unary {
        op: &'static UnaryOp,
        rhs: Box<Expr>,
    },
    Binary {
        op: &'static BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Ternary {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// Pure built-in call; arity was validated at parse time.
    Builtin {
        spec: &'static MathFnSpec,
        args: Vec<Expr>,
    },
    /// Data-loaded named formula; arguments bind to its numbered parameters.
    Custom {
        formula: Arc<CustomFormula>,
        args: Vec<Expr>,
    },
    /// Scoped host-function call with raw, lazily evaluated arguments.
    Host(HostCall),
    /// Only meaningful as a function argument, like `Str`.
    Array(Vec<Expr>),
    /// Top-level assignment; always the root when present.
    Assign {
        target: AssignTarget,
        op: &'static AssignOp,
        /// Current value of the target, used by compound operators
        /// (duplicated from the target at parse time).
        current: Option<Box<Expr>>,
        rhs: Box<Expr>,
    },
}

/// A resolved call to a scoped host function. The same call site can resolve
/// in evaluation mode or assignment mode; the parser checks that the
/// function declares the handler the mode requires.
#[derive(Debug, Clone)]
pub struct HostCall {
    pub spec: &'static HostFnSpec,
    pub scope: Scope,
    pub args: Vec<Value>,
    pub kwargs: Kwargs,
}

/// Left-hand side of an assignment: a bare variable, or a host function that
/// declares an assignment handler.
#[derive(Debug, Clone)]
pub enum AssignTarget {
    Var(ScopedName),
    Host(HostCall),
}

/// A compiled expression, ready for repeated evaluation.
#[derive(Debug, Clone)]
pub struct MathExpr {
    root: Expr,
}

impl MathExpr {
    /// Compile an expression for evaluation.
    pub fn compile(src: &str, formulas: &FormulaRegistry) -> Result<Self, SyntaxError> {
        parser::parse(src, formulas, parser::TreeMode::Eval).map(|root| Self { root })
    }

    /// Compile an expression that will be written through with
    /// [`MathExpr::assign`]: the whole expression must be a bare variable or
    /// a host-function call with an assignment handler.
    pub fn compile_assign_target(
        src: &str,
        formulas: &FormulaRegistry,
    ) -> Result<Self, SyntaxError> {
        parser::parse(src, formulas, parser::TreeMode::AssignTarget).map(|root| Self { root })
    }

    /// A constant expression; the conventional substitute when an embedder
    /// chooses to log a compile error instead of failing.
    #[must_use]
    pub fn constant(value: f64) -> Self {
        Self {
            root: Expr::Const(value),
        }
    }

    /// Evaluate against a context. Operands evaluate left-to-right, each
    /// node exactly once, so host-function side effects are ordered and
    /// visible to later siblings.
    pub fn eval(&self, ctx: &mut dyn Context) -> Result<f64, RuntimeError> {
        Evaluator::new(ctx).eval(&self.root)
    }

    /// Write `value` through a tree compiled with
    /// [`MathExpr::compile_assign_target`].
    pub fn assign(&self, ctx: &mut dyn Context, value: f64) -> Result<(), RuntimeError> {
        let mut ev = Evaluator::new(ctx);
        match &self.root {
            Expr::Var(name) => ev.write_var_num(name, value),
            Expr::Host(call) => ev.host_assign(call, value),
            _ => Err(RuntimeError::Internal("assignment called on an eval tree")),
        }
    }

    /// The root node, for embedders that inspect compiled trees.
    #[must_use]
    pub fn root(&self) -> &Expr {
        &self.root
    }
}
