//! Pure built-in functions and named constants.
//!
//! Built-ins take fully evaluated numeric arguments and touch no context, so
//! their implementations are plain `fn(&[f64]) -> f64`. Arity is validated by
//! the parser against `num_params` (`-1` is variadic); by the time `f` runs
//! the slice length is already correct.

use rand::Rng;

#[derive(Debug)]
pub struct MathFnSpec {
    pub symbol: &'static str,
    pub num_params: i32,
    pub f: fn(&[f64]) -> f64,
}

struct MathConst {
    symbol: &'static str,
    value: f64,
}

static CONSTANTS: &[MathConst] = &[
    MathConst { symbol: "pi", value: std::f64::consts::PI },
    MathConst { symbol: "e", value: std::f64::consts::E },
];

static FUNCTIONS: &[MathFnSpec] = &[
    MathFnSpec { symbol: "abs", num_params: 1, f: |a| a[0].abs() },
    MathFnSpec { symbol: "sqrt", num_params: 1, f: |a| a[0].sqrt() },
    MathFnSpec { symbol: "log", num_params: 1, f: |a| a[0].ln() },
    MathFnSpec { symbol: "sin", num_params: 1, f: |a| a[0].sin() },
    MathFnSpec { symbol: "cos", num_params: 1, f: |a| a[0].cos() },
    MathFnSpec { symbol: "tan", num_params: 1, f: |a| a[0].tan() },
    MathFnSpec { symbol: "floor", num_params: 1, f: |a| a[0].floor() },
    MathFnSpec { symbol: "ceil", num_params: 1, f: |a| a[0].ceil() },
    MathFnSpec { symbol: "trunc", num_params: 1, f: |a| a[0].trunc() },
    MathFnSpec { symbol: "round", num_params: 1, f: |a| a[0].round() },
    MathFnSpec { symbol: "clamp", num_params: 3, f: clamp },
    MathFnSpec { symbol: "min", num_params: -1, f: fold_min },
    MathFnSpec { symbol: "max", num_params: -1, f: fold_max },
    MathFnSpec { symbol: "rand", num_params: 1, f: |a| roll(0.0, a[0]) },
    MathFnSpec { symbol: "rng", num_params: 2, f: |a| roll(a[0], a[1]) },
];

pub fn get_constant(symbol: &str) -> Option<f64> {
    CONSTANTS
        .iter()
        .find_map(|c| (c.symbol == symbol).then_some(c.value))
}

pub fn get_builtin(symbol: &str) -> Option<&'static MathFnSpec> {
    FUNCTIONS.iter().find(|spec| spec.symbol == symbol)
}

// Stays well defined when the bounds arrive reversed.
fn clamp(args: &[f64]) -> f64 {
    let lo = args[1].min(args[2]);
    let hi = args[1].max(args[2]);
    args[0].max(lo).min(hi)
}

// Variadic min/max return 0 for an empty argument list rather than an
// infinity, which would leak into variable stores as "inf".
fn fold_min(args: &[f64]) -> f64 {
    if args.is_empty() {
        return 0.0;
    }
    args.iter().copied().fold(f64::INFINITY, f64::min)
}

fn fold_max(args: &[f64]) -> f64 {
    if args.is_empty() {
        return 0.0;
    }
    args.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Uniform integer roll over the inclusive range spanned by the rounded
/// bounds, in either order. Non-finite bounds roll 0.
fn roll(a: f64, b: f64) -> f64 {
    if !a.is_finite() || !b.is_finite() {
        return 0.0;
    }
    let lo = a.round().min(b.round()) as i64;
    let hi = a.round().max(b.round()) as i64;
    rand::thread_rng().gen_range(lo..=hi) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn variadic_fold_handles_empty_input() {
        assert_eq!(fold_min(&[]), 0.0);
        assert_eq!(fold_max(&[]), 0.0);
        assert_eq!(fold_min(&[3.0, 1.0, 2.0]), 1.0);
        assert_eq!(fold_max(&[3.0, 1.0, 2.0]), 3.0);
    }

    #[test]
    fn clamp_accepts_reversed_bounds() {
        assert_eq!(clamp(&[5.0, 0.0, 10.0]), 5.0);
        assert_eq!(clamp(&[5.0, 10.0, 0.0]), 5.0);
        assert_eq!(clamp(&[-1.0, 0.0, 10.0]), 0.0);
    }

    #[test]
    fn roll_stays_in_range() {
        for _ in 0..100 {
            let v = roll(1.0, 3.0);
            assert!((1.0..=3.0).contains(&v), "{v}");
            assert_eq!(v, v.trunc());
        }
        assert_eq!(roll(4.0, 4.0), 4.0);
        // Reversed bounds are accepted.
        let v = roll(3.0, 1.0);
        assert!((1.0..=3.0).contains(&v));
    }
}
