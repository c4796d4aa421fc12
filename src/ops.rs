//! Static operator tables: symbol, precedence, associativity and the pure
//! implementation function. Read-only, process-wide data.

/// Precedence levels, low to high. Assignment sits below everything and is
/// handled specially by the parser; `.` is reserved for future member access.
pub const PREC_TERNARY: u8 = 1;
pub const PREC_COMPARE: u8 = 2;
pub const PREC_ADDITIVE: u8 = 3;
pub const PREC_MULTIPLICATIVE: u8 = 4;
pub const PREC_POWER: u8 = 5;
pub const PREC_UNARY: u8 = 5;

#[derive(Debug)]
pub struct BinOp {
    pub symbol: &'static str,
    pub precedence: u8,
    pub right_assoc: bool,
    pub f: fn(f64, f64) -> f64,
}

#[derive(Debug)]
pub struct UnaryOp {
    pub symbol: &'static str,
    pub f: fn(f64) -> f64,
}

/// In-language assignment operator. `combine` is the read-modify-write
/// function for compound forms; plain `=` stores the right-hand side as is.
#[derive(Debug)]
pub struct AssignOp {
    pub symbol: &'static str,
    pub combine: Option<fn(f64, f64) -> f64>,
    /// `++`/`--` style: no right-hand operand follows; the parser supplies
    /// an implicit constant 1.
    pub postfix: bool,
}

fn bool_num(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

// Comparisons are exact; content that needs tolerance compares against
// thresholds instead.
pub static BINARY_OPS: &[BinOp] = &[
    BinOp { symbol: "<", precedence: PREC_COMPARE, right_assoc: false, f: |l, r| bool_num(l < r) },
    BinOp { symbol: "<=", precedence: PREC_COMPARE, right_assoc: false, f: |l, r| bool_num(l <= r) },
    BinOp { symbol: ">", precedence: PREC_COMPARE, right_assoc: false, f: |l, r| bool_num(l > r) },
    BinOp { symbol: ">=", precedence: PREC_COMPARE, right_assoc: false, f: |l, r| bool_num(l >= r) },
    BinOp { symbol: "==", precedence: PREC_COMPARE, right_assoc: false, f: |l, r| bool_num(l == r) },
    BinOp { symbol: "!=", precedence: PREC_COMPARE, right_assoc: false, f: |l, r| bool_num(l != r) },
    BinOp { symbol: "+", precedence: PREC_ADDITIVE, right_assoc: false, f: |l, r| l + r },
    BinOp { symbol: "-", precedence: PREC_ADDITIVE, right_assoc: false, f: |l, r| l - r },
    BinOp { symbol: "*", precedence: PREC_MULTIPLICATIVE, right_assoc: false, f: |l, r| l * r },
    BinOp { symbol: "/", precedence: PREC_MULTIPLICATIVE, right_assoc: false, f: |l, r| l / r },
    BinOp { symbol: "%", precedence: PREC_MULTIPLICATIVE, right_assoc: false, f: |l, r| l % r },
    BinOp { symbol: "^", precedence: PREC_POWER, right_assoc: true, f: f64::powf },
];

pub static PREFIX_UNARY_OPS: &[UnaryOp] = &[
    UnaryOp { symbol: "+", f: |v| v },
    UnaryOp { symbol: "-", f: |v| -v },
    // Truthiness matches the ternary condition: anything > 0 is true.
    UnaryOp { symbol: "!", f: |v| if v > 0.0 { 0.0 } else { 1.0 } },
];

pub static ASSIGN_OPS: &[AssignOp] = &[
    AssignOp { symbol: "=", combine: None, postfix: false },
    AssignOp { symbol: "+=", combine: Some(|l, r| l + r), postfix: false },
    AssignOp { symbol: "-=", combine: Some(|l, r| l - r), postfix: false },
    AssignOp { symbol: "*=", combine: Some(|l, r| l * r), postfix: false },
    AssignOp { symbol: "/=", combine: Some(|l, r| l / r), postfix: false },
    AssignOp { symbol: "%=", combine: Some(|l, r| l % r), postfix: false },
    AssignOp { symbol: "++", combine: Some(|l, r| l + r), postfix: true },
    AssignOp { symbol: "--", combine: Some(|l, r| l - r), postfix: true },
];

pub fn get_binary_op(symbol: &str) -> Option<&'static BinOp> {
    BINARY_OPS.iter().find(|op| op.symbol == symbol)
}

pub fn get_unary_op(symbol: &str) -> Option<&'static UnaryOp> {
    PREFIX_UNARY_OPS.iter().find(|op| op.symbol == symbol)
}

pub fn get_assign_op(symbol: &str) -> Option<&'static AssignOp> {
    ASSIGN_OPS.iter().find(|op| op.symbol == symbol)
}
