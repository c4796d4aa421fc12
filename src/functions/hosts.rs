//! Standard host functions for scoped variable access.
//!
//! These cover the variable plumbing every embedder needs; game-specific
//! functions are registered the same way from the embedding crate with
//! `inventory::submit!`.

use super::{arg, HostFnSpec, Kwargs};
use crate::error::RuntimeError;
use crate::eval::Evaluator;
use crate::value::{Scope, ScopedName, Value};

inventory::submit! {
    HostFnSpec {
        name: "val",
        scopes: "ungv",
        num_params: 1,
        eval: Some(val_eval),
        assign: Some(val_assign),
        kwargs: &["default"],
    }
}

inventory::submit! {
    HostFnSpec {
        name: "has_var",
        scopes: "ungv",
        num_params: 1,
        eval: Some(has_var_eval),
        assign: None,
        kwargs: &[],
    }
}

inventory::submit! {
    HostFnSpec {
        name: "value_or",
        scopes: "ungv",
        num_params: 2,
        eval: Some(value_or_eval),
        assign: None,
        kwargs: &[],
    }
}

fn named(
    ev: &mut Evaluator<'_>,
    scope: Scope,
    args: &[Value],
) -> Result<ScopedName, RuntimeError> {
    let key = arg(args, 0)?.str(ev)?;
    Ok(ScopedName::new(scope, key))
}

/// `u_val('key')`: read the named variable as a number; unset reads the
/// `default` keyword argument if given, 0 otherwise. Assignable.
fn val_eval(
    ev: &mut Evaluator<'_>,
    scope: Scope,
    args: &[Value],
    kwargs: &Kwargs,
) -> Result<f64, RuntimeError> {
    let name = named(ev, scope, args)?;
    match ev.read_var_raw(&name) {
        Some(raw) if !raw.is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| RuntimeError::NotANumber(raw)),
        _ => match kwargs.get("default") {
            Some(default) => default.dbl(ev),
            None => Ok(0.0),
        },
    }
}

fn val_assign(
    ev: &mut Evaluator<'_>,
    scope: Scope,
    args: &[Value],
    _kwargs: &Kwargs,
    value: f64,
) -> Result<(), RuntimeError> {
    let name = named(ev, scope, args)?;
    ev.write_var_num(&name, value)
}

/// `u_has_var('key')`: 1 if the variable is set at all, 0 otherwise. Unlike
/// `val`, an unparsable stored string still counts as set.
fn has_var_eval(
    ev: &mut Evaluator<'_>,
    scope: Scope,
    args: &[Value],
    _kwargs: &Kwargs,
) -> Result<f64, RuntimeError> {
    let name = named(ev, scope, args)?;
    Ok(if ev.read_var_raw(&name).is_some() {
        1.0
    } else {
        0.0
    })
}

/// `u_value_or('key', fallback)`: like `val` with a positional fallback. The
/// fallback expression is only evaluated when the variable is unset.
fn value_or_eval(
    ev: &mut Evaluator<'_>,
    scope: Scope,
    args: &[Value],
    _kwargs: &Kwargs,
) -> Result<f64, RuntimeError> {
    let name = named(ev, scope, args)?;
    match ev.read_var_raw(&name) {
        Some(raw) if !raw.is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| RuntimeError::NotANumber(raw)),
        _ => arg(args, 1)?.dbl(ev),
    }
}
