//! Function registries: pure built-ins, data-loaded custom formulas, and
//! scoped host functions.
//!
//! Built-ins are a fixed table. Host functions are static [`HostFnSpec`]s
//! collected through [`inventory`], so embedding crates can register their
//! own alongside the standard ones in [`hosts`]. Custom formulas live in an
//! explicit [`FormulaRegistry`] — one per loaded content set — and are
//! finalized exactly once after loading.

use crate::ast::Expr;
use crate::error::{RuntimeError, SyntaxError};
use crate::eval::Evaluator;
use crate::value::{Scope, Value};
use ahash::AHashMap;
use serde::Deserialize;
use std::sync::{Arc, OnceLock};

pub mod builtins;
pub mod hosts;

pub use builtins::{get_builtin, get_constant, MathFnSpec};

/// Resolved keyword arguments of a host-function call. Names were validated
/// against the callee's declared list at compile time.
#[derive(Debug, Clone, Default)]
pub struct Kwargs {
    pairs: Vec<(String, Value)>,
}

impl Kwargs {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.pairs
            .iter()
            .find_map(|(k, v)| (k.as_str() == name).then_some(v))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub(crate) fn from_pairs(pairs: Vec<(String, Value)>) -> Self {
        Self { pairs }
    }
}

pub type HostEvalFn =
    fn(&mut Evaluator<'_>, Scope, &[Value], &Kwargs) -> Result<f64, RuntimeError>;
pub type HostAssignFn =
    fn(&mut Evaluator<'_>, Scope, &[Value], &Kwargs, f64) -> Result<(), RuntimeError>;

/// A scoped host function.
///
/// `scopes` lists the accepted scope letters (`u`, `n`, `g`, `v`);
/// `num_params` counts positional arguments, with `-1` meaning variadic and
/// keyword arguments never counted. A spec without an `assign` handler
/// cannot be used as an assignment target; one without `eval` cannot be used
/// as a value.
#[derive(Debug)]
pub struct HostFnSpec {
    pub name: &'static str,
    pub scopes: &'static str,
    pub num_params: i32,
    pub eval: Option<HostEvalFn>,
    pub assign: Option<HostAssignFn>,
    pub kwargs: &'static [&'static str],
}

inventory::collect!(HostFnSpec);

/// Iterate every registered host function, standard and embedder-provided.
pub fn iter_host_specs() -> impl Iterator<Item = &'static HostFnSpec> {
    inventory::iter::<HostFnSpec>.into_iter()
}

fn host_registry() -> &'static AHashMap<&'static str, &'static HostFnSpec> {
    static REGISTRY: OnceLock<AHashMap<&'static str, &'static HostFnSpec>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut map = AHashMap::new();
        for spec in inventory::iter::<HostFnSpec> {
            map.insert(spec.name, spec);
        }
        map
    })
}

#[must_use]
pub fn lookup_host(name: &str) -> Option<&'static HostFnSpec> {
    host_registry().get(name).copied()
}

/// Resolve an identifier into a host function plus the scope its prefix
/// selects. `u_val` is the `val` function in alpha scope; an unprefixed name
/// runs in global scope. A matched function with a scope letter it does not
/// accept is a hard error; an unmatched name is simply not a host call.
pub(crate) fn lookup_scoped_host(
    token: &str,
) -> Result<Option<(&'static HostFnSpec, Scope)>, String> {
    let (letter, name) = if token.len() > 2 && token.as_bytes()[1] == b'_' {
        (token.as_bytes()[0] as char, &token[2..])
    } else {
        ('g', token)
    };
    let Some(spec) = lookup_host(name) else {
        return Ok(None);
    };
    match Scope::from_letter(letter) {
        Some(scope) if spec.scopes.contains(letter) => Ok(Some((spec, scope))),
        _ => Err(format!(
            "Scope {letter} is not valid for host function {name}() ({})",
            spec.scopes
        )),
    }
}

/// External definition of a custom formula, as loaded from content data.
#[derive(Debug, Clone, Deserialize)]
pub struct FormulaDef {
    pub id: String,
    pub num_params: usize,
    pub expression: String,
}

/// A named user-defined formula. The body is itself a compiled expression
/// whose parameters arrive as numbered context variables (`_0`, `_1`, ...).
#[derive(Debug)]
pub struct CustomFormula {
    name: String,
    num_params: usize,
    body: OnceLock<Expr>,
}

impl CustomFormula {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn num_params(&self) -> usize {
        self.num_params
    }

    pub(crate) fn body(&self) -> Option<&Expr> {
        self.body.get()
    }
}

/// Registry of custom formulas for one content set.
///
/// Definitions are inserted (or loaded from JSON) first; [`finalize`] then
/// parses every body and discards the source text. Formula handles are
/// created before any body is parsed, so formulas may call each other in any
/// order.
///
/// [`finalize`]: FormulaRegistry::finalize
#[derive(Debug, Default)]
pub struct FormulaRegistry {
    formulas: AHashMap<String, Arc<CustomFormula>>,
    sources: AHashMap<String, String>,
    finalized: bool,
}

impl FormulaRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared empty registry used by [`crate::compile`].
    pub(crate) fn empty() -> &'static Self {
        static EMPTY: OnceLock<FormulaRegistry> = OnceLock::new();
        EMPTY.get_or_init(|| {
            let mut registry = FormulaRegistry::new();
            // Nothing to parse, but keep the invariant that a usable
            // registry is a finalized one.
            registry.finalized = true;
            registry
        })
    }

    pub fn insert(&mut self, def: FormulaDef) -> Result<(), SyntaxError> {
        if self.finalized {
            return Err(SyntaxError::unspanned(format!(
                "Formula '{}' inserted after the registry was finalized",
                def.id
            )));
        }
        if self.formulas.contains_key(&def.id) {
            return Err(SyntaxError::unspanned(format!(
                "Duplicate formula '{}'",
                def.id
            )));
        }
        self.formulas.insert(
            def.id.clone(),
            Arc::new(CustomFormula {
                name: def.id.clone(),
                num_params: def.num_params,
                body: OnceLock::new(),
            }),
        );
        self.sources.insert(def.id, def.expression);
        Ok(())
    }

    /// Load a JSON array of [`FormulaDef`]s.
    pub fn load_json(&mut self, json: &str) -> Result<(), SyntaxError> {
        let defs: Vec<FormulaDef> = serde_json::from_str(json)
            .map_err(|e| SyntaxError::unspanned(format!("Invalid formula definitions: {e}")))?;
        for def in defs {
            self.insert(def)?;
        }
        Ok(())
    }

    /// Parse every formula body and drop the sources. Must be called exactly
    /// once, after all definitions are loaded and before any expression that
    /// calls a formula is evaluated.
    pub fn finalize(&mut self) -> Result<(), SyntaxError> {
        if self.finalized {
            return Err(SyntaxError::unspanned(
                "Formula registry already finalized",
            ));
        }
        self.finalized = true;
        let sources = std::mem::take(&mut self.sources);
        for (id, src) in sources {
            let body = crate::parser::parse(&src, self, crate::parser::TreeMode::Eval)
                .map_err(|e| {
                    SyntaxError {
                        message: format!("In formula '{id}': {}", e.message),
                        span: e.span,
                    }
                })?;
            let formula = self
                .formulas
                .get(&id)
                .ok_or_else(|| SyntaxError::unspanned("Formula registry out of sync"))?;
            let _ = formula.body.set(body);
        }
        Ok(())
    }

    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<CustomFormula>> {
        self.formulas.get(name).cloned()
    }
}

/// Fetch a positional argument, reporting an internal error if the parser's
/// arity check was somehow bypassed.
pub fn arg<'a>(args: &'a [Value], index: usize) -> Result<&'a Value, RuntimeError> {
    args.get(index)
        .ok_or(RuntimeError::Internal("missing host-function argument"))
}
