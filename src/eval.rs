//! Tree-walking evaluator.
//!
//! One [`Evaluator`] lives for exactly one top-level evaluation. It carries
//! the context plus the stack of formula-parameter frames, which is why host
//! functions receive `&mut Evaluator` rather than the bare context: a lazy
//! argument evaluated inside a custom formula must still see the formula's
//! parameters.

use crate::ast::{AssignTarget, Expr, HostCall};
use crate::context::Context;
use crate::error::RuntimeError;
use crate::functions::CustomFormula;
use crate::ops::AssignOp;
use crate::value::{fmt_f64, ScopedName};
use crate::vars::{self, Frames};
use ahash::AHashMap;

pub struct Evaluator<'a> {
    ctx: &'a mut dyn Context,
    frames: Frames,
}

impl<'a> Evaluator<'a> {
    #[must_use]
    pub fn new(ctx: &'a mut dyn Context) -> Self {
        Self {
            ctx,
            frames: Frames::new(),
        }
    }

    /// Evaluate a subtree. Operands run left-to-right, each exactly once;
    /// only ternary branches and host-function lazy arguments are skipped.
    pub fn eval(&mut self, expr: &Expr) -> Result<f64, RuntimeError> {
        match expr {
            Expr::Const(n) => Ok(*n),
            Expr::Str(_) => Err(RuntimeError::NonNumericOperand("a string literal")),
            Expr::Array(_) => Err(RuntimeError::NonNumericOperand("an array")),
            Expr::Var(name) => self.read_var_num(name),
            Expr::Unary { op, rhs } => {
                let r = self.eval(rhs)?;
                Ok((op.f)(r))
            }
            Expr::Binary { op, lhs, rhs } => {
                let l = self.eval(lhs)?;
                let r = self.eval(rhs)?;
                Ok((op.f)(l, r))
            }
            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => {
                if self.eval(cond)? > 0.0 {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
            Expr::Builtin { spec, args } => {
                let mut vals = Vec::with_capacity(args.len());
                for a in args {
                    vals.push(self.eval(a)?);
                }
                Ok((spec.f)(&vals))
            }
            Expr::Custom { formula, args } => self.eval_custom(formula, args),
            Expr::Host(call) => self.host_eval(call),
            Expr::Assign {
                target,
                op,
                current,
                rhs,
            } => {
                self.eval_assign(target, op, current.as_deref(), rhs)?;
                // Assignments are statements; their value is a fixed 0.
                Ok(0.0)
            }
        }
    }

    /// Call a custom formula: evaluate the arguments eagerly, bind them to
    /// the numbered parameters in a fresh frame, evaluate the body, pop.
    fn eval_custom(
        &mut self,
        formula: &CustomFormula,
        args: &[Expr],
    ) -> Result<f64, RuntimeError> {
        let Some(body) = formula.body() else {
            return Err(RuntimeError::Internal(
                "custom formula called before its registry was finalized",
            ));
        };
        let mut frame = AHashMap::with_capacity(args.len());
        for (i, a) in args.iter().enumerate() {
            let v = self.eval(a)?;
            frame.insert(i.to_string(), fmt_f64(v));
        }
        self.frames.push(frame);
        let out = self.eval(body);
        self.frames.pop();
        out
    }

    pub(crate) fn host_eval(&mut self, call: &HostCall) -> Result<f64, RuntimeError> {
        let Some(f) = call.spec.eval else {
            return Err(RuntimeError::Internal(
                "host function without an eval handler reached evaluation",
            ));
        };
        f(self, call.scope, &call.args, &call.kwargs)
    }

    pub(crate) fn host_assign(
        &mut self,
        call: &HostCall,
        value: f64,
    ) -> Result<(), RuntimeError> {
        let Some(f) = call.spec.assign else {
            return Err(RuntimeError::Internal(
                "host function without an assign handler reached assignment",
            ));
        };
        f(self, call.scope, &call.args, &call.kwargs, value)
    }

    fn eval_assign(
        &mut self,
        target: &AssignTarget,
        op: &AssignOp,
        current: Option<&Expr>,
        rhs: &Expr,
    ) -> Result<(), RuntimeError> {
        let value = match op.combine {
            Some(combine) => {
                // Read-modify-write: the target's current value first, then
                // the right-hand side.
                let cur = current
                    .ok_or(RuntimeError::Internal("compound assignment without a read"))?;
                let l = self.eval(cur)?;
                let r = self.eval(rhs)?;
                combine(l, r)
            }
            None => self.eval(rhs)?,
        };
        match target {
            AssignTarget::Var(name) => self.write_var_num(name, value),
            AssignTarget::Host(call) => self.host_assign(call, value),
        }
    }

    /// Raw stored string of a scoped variable, following indirection.
    #[must_use]
    pub fn read_var_raw(&self, name: &ScopedName) -> Option<String> {
        vars::read_var(&*self.ctx, &self.frames, name)
    }

    /// Numeric read: unset (or stored-empty) is 0, any other unparsable
    /// string is a runtime error.
    pub fn read_var_num(&self, name: &ScopedName) -> Result<f64, RuntimeError> {
        match self.read_var_raw(name) {
            Some(raw) if !raw.is_empty() => raw
                .trim()
                .parse()
                .map_err(|_| RuntimeError::NotANumber(raw)),
            _ => Ok(0.0),
        }
    }

    pub fn write_var_num(&mut self, name: &ScopedName, value: f64) -> Result<(), RuntimeError> {
        vars::write_var(self.ctx, &self.frames, name, fmt_f64(value));
        Ok(())
    }

    /// Direct context access for embedder-defined host functions.
    pub fn ctx(&mut self) -> &mut dyn Context {
        self.ctx
    }
}
