//! Operator and grammar coverage for plain arithmetic expressions.

use dialogue_math::{compile, Context, RuntimeError, ScriptContext};
use pretty_assertions::assert_eq;

fn eval(src: &str) -> f64 {
    let expr = compile(src).unwrap_or_else(|e| panic!("{}", e.annotate(src)));
    expr.eval(&mut ScriptContext::new()).unwrap()
}

fn compile_err(src: &str) -> String {
    compile(src).unwrap_err().message
}

#[test]
fn precedence_and_grouping() {
    assert_eq!(eval("1 + 2 * 3"), 7.0);
    assert_eq!(eval("(1 + 2) * 3"), 9.0);
    assert_eq!(eval("10 - 4 - 3"), 3.0);
    assert_eq!(eval("7 / 2"), 3.5);
    assert_eq!(eval("10 % 3"), 1.0);
    assert_eq!(eval("2 + 3 % 2"), 3.0);
}

#[test]
fn power_is_right_associative() {
    assert_eq!(eval("2 ^ 3 ^ 2"), 512.0);
    assert_eq!(eval("(2 ^ 3) ^ 2"), 64.0);
}

#[test]
fn unary_binds_looser_than_power() {
    assert_eq!(eval("-2 ^ 2"), -4.0);
    assert_eq!(eval("(-2) ^ 2"), 4.0);
    assert_eq!(eval("-2 * 3"), -6.0);
    assert_eq!(eval("+5"), 5.0);
    assert_eq!(eval("2 * -3"), -6.0);
}

#[test]
fn comparisons_yield_zero_or_one() {
    assert_eq!(eval("1 < 2"), 1.0);
    assert_eq!(eval("2 <= 2"), 1.0);
    assert_eq!(eval("3 > 4"), 0.0);
    assert_eq!(eval("2 == 2"), 1.0);
    assert_eq!(eval("2 != 2"), 0.0);
    assert_eq!(eval("1 + 1 == 2"), 1.0);
}

#[test]
fn logical_not_uses_positive_truthiness() {
    assert_eq!(eval("!0"), 1.0);
    assert_eq!(eval("!3"), 0.0);
    assert_eq!(eval("!-1"), 1.0);
}

#[test]
fn ternary_selects_and_nests() {
    assert_eq!(eval("1 ? 2 : 3"), 2.0);
    assert_eq!(eval("0 ? 2 : 3"), 3.0);
    // Branch chains are right-associative and nest in either position.
    assert_eq!(eval("0 ? 1 : 0 ? 3 : 4"), 4.0);
    assert_eq!(eval("1 ? 0 ? 3 : 4 : 5"), 4.0);
    assert_eq!(eval("1?2?3:4:5"), 3.0);
    assert_eq!(eval("0?2?3:4:5"), 5.0);
    // Condition uses the same truthiness as `!`.
    assert_eq!(eval("0.5 ? 1 : 2"), 1.0);
    assert_eq!(eval("-1 ? 1 : 2"), 2.0);
}

#[test]
fn ternary_branches_are_lazy() {
    let mut ctx = ScriptContext::new();
    let expr = compile("0 ? u_bad : 7").unwrap();
    ctx.set_actor_var(dialogue_math::Who::Alpha, "bad", "zzz".into());
    assert_eq!(expr.eval(&mut ctx).unwrap(), 7.0);

    let expr = compile("1 ? u_bad : 7").unwrap();
    assert_eq!(
        expr.eval(&mut ctx).unwrap_err(),
        RuntimeError::NotANumber("zzz".into())
    );
}

#[test]
fn number_literal_forms() {
    assert_eq!(eval("2.5"), 2.5);
    assert_eq!(eval(".5"), 0.5);
    assert_eq!(eval("1e3"), 1000.0);
    assert_eq!(eval("1.5e-2"), 0.015);
}

#[test]
fn named_constants() {
    assert_eq!(eval("pi"), std::f64::consts::PI);
    assert_eq!(eval("e ^ 1"), std::f64::consts::E);
}

#[test]
fn division_by_zero_follows_ieee() {
    assert_eq!(eval("1 / 0"), f64::INFINITY);
    assert!(eval("0 / 0").is_nan());
}

#[test]
fn strings_and_arrays_are_not_numbers() {
    let expr = compile("'abc'").unwrap();
    assert!(matches!(
        expr.eval(&mut ScriptContext::new()),
        Err(RuntimeError::NonNumericOperand(_))
    ));
    let expr = compile("[1, 2]").unwrap();
    assert!(matches!(
        expr.eval(&mut ScriptContext::new()),
        Err(RuntimeError::NonNumericOperand(_))
    ));
}

#[test]
fn grammar_errors_name_what_was_expected() {
    assert_eq!(compile_err("1 +"), "Expected operand, got end of expression");
    assert_eq!(compile_err("1 2"), "Expected operator, got operand");
    assert_eq!(compile_err(""), "Expected operand, got end of expression");
    assert_eq!(compile_err("(1"), "Unterminated left parenthesis");
    assert_eq!(compile_err("()"), "Expected operand, got right parenthesis");
    assert_eq!(compile_err("1)"), "Misplaced right parenthesis");
    assert_eq!(compile_err("1 ? 2"), "Ternary '?' is missing its ':'");
    assert_eq!(compile_err("1 : 2"), "Misplaced colon");
    assert_eq!(compile_err("1, 2"), "Misplaced comma");
    assert_eq!(compile_err("a . b"), "The '.' operator is reserved");
}

#[test]
fn unknown_call_target_is_named() {
    let message = compile_err("foo(1)");
    assert!(message.contains("unknown function foo()"), "{message}");
}

#[test]
fn errors_carry_spans_into_annotations() {
    let src = "1 + + 2 2";
    let err = compile(src).unwrap_err();
    assert!(err.span.is_some());
    let rendered = err.annotate(src);
    assert!(rendered.contains('^'), "{rendered}");
}
