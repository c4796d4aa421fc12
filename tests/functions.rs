//! Built-ins, custom formulas, host functions and keyword arguments.

use dialogue_math::{
    compile, Context, Evaluator, FormulaRegistry, HostFnSpec, Kwargs, MathExpr, RuntimeError,
    Scope, ScriptContext, Value, Who,
};
use pretty_assertions::assert_eq;

fn eval(src: &str) -> f64 {
    compile(src).unwrap().eval(&mut ScriptContext::new()).unwrap()
}

fn compile_err(src: &str) -> String {
    compile(src).unwrap_err().message
}

#[test]
fn builtins_evaluate() {
    assert_eq!(eval("abs(-3)"), 3.0);
    assert_eq!(eval("sqrt(9)"), 3.0);
    assert_eq!(eval("floor(2.7)"), 2.0);
    assert_eq!(eval("ceil(2.1)"), 3.0);
    assert_eq!(eval("round(2.5)"), 3.0);
    assert_eq!(eval("trunc(-2.7)"), -2.0);
    assert_eq!(eval("clamp(15, 0, 10)"), 10.0);
    assert_eq!(eval("log(e)"), 1.0);
}

#[test]
fn variadic_min_max() {
    assert_eq!(eval("min(3, 1, 2)"), 1.0);
    assert_eq!(eval("max(3, 1, 2)"), 3.0);
    assert_eq!(eval("min(5)"), 5.0);
    // Empty variadic calls are 0, not an infinity.
    assert_eq!(eval("min()"), 0.0);
    assert_eq!(eval("max()"), 0.0);
}

#[test]
fn dice_rolls_stay_in_bounds() {
    let expr = compile("rng(1, 3)").unwrap();
    let mut ctx = ScriptContext::new();
    for _ in 0..50 {
        let v = expr.eval(&mut ctx).unwrap();
        assert!((1.0..=3.0).contains(&v), "{v}");
        assert_eq!(v, v.trunc());
    }
    assert_eq!(eval("rng(4, 4)"), 4.0);
    let v = eval("rand(2)");
    assert!((0.0..=2.0).contains(&v));
}

#[test]
fn arity_is_checked_at_compile_time() {
    assert_eq!(compile_err("clamp(1, 2)"), "Not enough arguments for clamp()");
    assert_eq!(compile_err("abs(1, 2)"), "Too many arguments for abs()");
    assert_eq!(compile_err("abs()"), "Not enough arguments for abs()");
}

#[test]
fn calls_nest_and_mix_with_operators() {
    assert_eq!(eval("min(3, max(1, 2)) + 1"), 3.0);
    assert_eq!(eval("abs(-(2 + 3)) * 2"), 10.0);
}

fn formulas() -> FormulaRegistry {
    let mut registry = FormulaRegistry::new();
    registry
        .load_json(
            r#"[
                {"id": "double", "num_params": 1, "expression": "_0 * 2"},
                {"id": "quad", "num_params": 1, "expression": "double(double(_0))"},
                {"id": "lerp", "num_params": 3, "expression": "_0 + (_1 - _0) * _2"}
            ]"#,
        )
        .unwrap();
    registry.finalize().unwrap();
    registry
}

#[test]
fn custom_formulas_bind_numbered_parameters() {
    let registry = formulas();
    let mut ctx = ScriptContext::new();
    let eval = |src: &str, ctx: &mut ScriptContext| {
        MathExpr::compile(src, &registry).unwrap().eval(ctx).unwrap()
    };
    assert_eq!(eval("double(21)", &mut ctx), 42.0);
    assert_eq!(eval("lerp(0, 10, 0.5)", &mut ctx), 5.0);
    // Definition order does not matter: quad was defined before double's
    // body was parsed.
    assert_eq!(eval("quad(3)", &mut ctx), 12.0);
}

#[test]
fn formula_parameters_shadow_context_variables() {
    let registry = formulas();
    let mut ctx = ScriptContext::new();
    ctx.set_context_var("0", "99".into());
    let expr = MathExpr::compile("double(5)", &registry).unwrap();
    assert_eq!(expr.eval(&mut ctx).unwrap(), 10.0);
    // Outside any formula the context variable shows through.
    let expr = MathExpr::compile("_0", &registry).unwrap();
    assert_eq!(expr.eval(&mut ctx).unwrap(), 99.0);
}

#[test]
fn formula_arity_and_lifecycle_errors() {
    let registry = formulas();
    let err = MathExpr::compile("double(1, 2)", &registry).unwrap_err();
    assert_eq!(err.message, "Too many arguments for double()");

    let mut registry = formulas();
    assert!(registry.finalize().is_err());
    assert!(registry
        .load_json(r#"[{"id": "late", "num_params": 0, "expression": "1"}]"#)
        .is_err());

    let mut registry = FormulaRegistry::new();
    registry
        .load_json(r#"[{"id": "broken", "num_params": 0, "expression": "1 +"}]"#)
        .unwrap();
    let err = registry.finalize().unwrap_err();
    assert!(err.message.contains("broken"), "{}", err.message);
}

#[test]
fn val_reads_writes_and_defaults() {
    let mut ctx = ScriptContext::new();
    ctx.set_actor_var(Who::Alpha, "x", "7".into());

    assert_eq!(compile("u_val('x')").unwrap().eval(&mut ctx).unwrap(), 7.0);
    assert_eq!(compile("u_val('missing')").unwrap().eval(&mut ctx).unwrap(), 0.0);
    assert_eq!(
        compile("u_val('missing', default: 42)")
            .unwrap()
            .eval(&mut ctx)
            .unwrap(),
        42.0
    );
    // The default is ignored when the variable is set.
    assert_eq!(
        compile("u_val('x', default: 42)").unwrap().eval(&mut ctx).unwrap(),
        7.0
    );
}

#[test]
fn host_scope_prefixes_route_like_variables() {
    let mut ctx = ScriptContext::new();
    ctx.set_actor_var(Who::Beta, "x", "4".into());
    ctx.set_global_var("x", "9".into());

    assert_eq!(compile("n_val('x')").unwrap().eval(&mut ctx).unwrap(), 4.0);
    assert_eq!(compile("g_val('x')").unwrap().eval(&mut ctx).unwrap(), 9.0);
    // Unprefixed host calls default to global scope.
    assert_eq!(compile("val('x')").unwrap().eval(&mut ctx).unwrap(), 9.0);
}

#[test]
fn has_var_distinguishes_set_from_parsable() {
    let mut ctx = ScriptContext::new();
    ctx.set_global_var("word", "hello".into());
    assert_eq!(compile("has_var('word')").unwrap().eval(&mut ctx).unwrap(), 1.0);
    assert_eq!(compile("has_var('nope')").unwrap().eval(&mut ctx).unwrap(), 0.0);
}

#[test]
fn value_or_evaluates_its_fallback_lazily() {
    let mut ctx = ScriptContext::new();
    ctx.set_global_var("k", "3".into());
    ctx.set_global_var("bad", "zzz".into());
    // `bad` would fail to parse, but the fallback is never touched.
    assert_eq!(
        compile("value_or('k', bad)").unwrap().eval(&mut ctx).unwrap(),
        3.0
    );
    assert_eq!(
        compile("value_or('unset', 9)").unwrap().eval(&mut ctx).unwrap(),
        9.0
    );
}

#[test]
fn keyword_argument_misuse_is_a_compile_error() {
    assert_eq!(
        compile_err("u_val('x', foo: 1)"),
        "Unknown keyword argument 'foo' for val()"
    );
    assert_eq!(
        compile_err("u_val('x', default: 1, default: 2)"),
        "Duplicate keyword argument 'default'"
    );
    assert_eq!(
        compile_err("u_val(default: 1, 'x')"),
        "Positional argument after keyword argument"
    );
    assert_eq!(compile_err("min(1, k: 2)"), "min() does not accept keyword arguments");
}

#[test]
fn invalid_scope_letters_are_rejected() {
    let message = compile_err("x_val('a')");
    assert!(message.starts_with("Scope x is not valid"), "{message}");
}

// An embedder-registered host function, exercising array arguments and the
// registration path content mods use.
inventory::submit! {
    HostFnSpec {
        name: "total",
        scopes: "g",
        num_params: 1,
        eval: Some(total_eval),
        assign: None,
        kwargs: &[],
    }
}

fn total_eval(
    ev: &mut Evaluator<'_>,
    _scope: Scope,
    args: &[Value],
    _kwargs: &Kwargs,
) -> Result<f64, RuntimeError> {
    let Some(items) = args[0].as_array() else {
        return Err(RuntimeError::BadArgument {
            fn_name: "total",
            message: "expected an array".into(),
        });
    };
    let mut sum = 0.0;
    for item in items {
        sum += item.dbl(ev)?;
    }
    Ok(sum)
}

#[test]
fn embedder_host_functions_see_raw_arguments() {
    let mut ctx = ScriptContext::new();
    ctx.set_global_var("bonus", "4".into());
    assert_eq!(
        compile("total([1, 2, bonus])").unwrap().eval(&mut ctx).unwrap(),
        7.0
    );
    assert_eq!(compile("total([])").unwrap().eval(&mut ctx).unwrap(), 0.0);

    let err = compile("total(5)").unwrap().eval(&mut ctx).unwrap_err();
    assert!(matches!(err, RuntimeError::BadArgument { .. }));
}
