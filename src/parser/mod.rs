//! Shunting-yard parser.
//!
//! Two value-free stacks drive the whole grammar: `ops` holds operators,
//! group/call openers and ternary markers; `output` holds finished subtrees
//! plus *pending* host calls whose eval-vs-assign mode is not yet known. A
//! third stack of [`Frame`]s tracks argument counts and keyword arguments
//! for every open call, array or parenthesized group.
//!
//! Grammar validity is enforced by a small expect-state machine
//! ([`ParseState`]) rather than by lookahead: every token checks what the
//! previous token said may come next. This is what turns stack underflow
//! into readable errors like "Expected operand, got operator".

use crate::ast::{AssignTarget, Expr, HostCall};
use crate::error::{Span, SyntaxError};
use crate::functions::{
    get_builtin, get_constant, lookup_scoped_host, CustomFormula, FormulaRegistry, HostFnSpec,
    Kwargs, MathFnSpec,
};
use crate::lexer::{tokenize, TokenKind};
use crate::ops::{
    get_assign_op, get_binary_op, get_unary_op, AssignOp, BinOp, UnaryOp, PREC_TERNARY, PREC_UNARY,
};
use crate::value::{Scope, ScopedName, Value};
use smallvec::SmallVec;
use std::sync::Arc;

/// What kind of tree the caller wants at the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TreeMode {
    Eval,
    /// The whole expression must resolve to something writable: a bare
    /// variable or a host call with an assignment handler.
    AssignTarget,
}

pub(crate) fn parse(
    src: &str,
    formulas: &FormulaRegistry,
    mode: TreeMode,
) -> Result<Expr, SyntaxError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser::new(formulas, mode);
    for token in &tokens {
        parser.last_span = token.span;
        if parser.assign_complete {
            return Err(parser.err("Unexpected token after assignment"));
        }
        match token.kind {
            TokenKind::Number => parser.number(&token.text)?,
            TokenKind::Str => parser.string(token.text.to_string())?,
            TokenKind::Identifier => parser.identifier(&token.text)?,
            TokenKind::Operator => parser.operator(&token.text)?,
        }
    }
    parser.last_span = Span::new(src.len(), src.len());
    parser.finish()
}

/// What the grammar allows next (or, for `validate`, what a token is).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Oper,
    Operand,
    Lparen,
    Rparen,
    Eof,
}

fn describe(e: Expect) -> &'static str {
    match e {
        Expect::Oper => "operator",
        Expect::Operand => "operand",
        Expect::Lparen => "left parenthesis",
        Expect::Rparen => "right parenthesis",
        Expect::Eof => "end of expression",
    }
}

/// The expect-state machine. `previous` remembers the expectation that was
/// in force before the last token, which is how an empty argument list
/// (`)` directly after a callee's `(`) stays legal while an empty group
/// `()` does not.
struct ParseState {
    expected: Expect,
    previous: Expect,
    allows_prefix_unary: bool,
}

impl ParseState {
    fn new() -> Self {
        Self {
            expected: Expect::Operand,
            previous: Expect::Eof,
            allows_prefix_unary: true,
        }
    }

    fn validate(&self, next: Expect, span: Span) -> Result<(), SyntaxError> {
        if self.previous == Expect::Lparen && next == Expect::Rparen {
            return Ok(());
        }
        // A closer is an operator as far as the grammar cares.
        let alias = match next {
            Expect::Rparen => Expect::Oper,
            other => other,
        };
        if self.expected != alias
            && !(self.expected == Expect::Operand && alias == Expect::Lparen)
            && !(self.expected == Expect::Oper && alias == Expect::Eof)
        {
            return Err(SyntaxError::new(
                format!(
                    "Expected {}, got {}",
                    describe(self.expected),
                    describe(next)
                ),
                span,
            ));
        }
        Ok(())
    }

    fn set(&mut self, current: Expect, unary_ok: bool) {
        self.previous = self.expected;
        self.expected = current;
        self.allows_prefix_unary = unary_ok;
    }
}

/// The callee recorded under a call's opening parenthesis.
#[derive(Clone)]
enum Callee {
    Builtin(&'static MathFnSpec),
    Custom(Arc<CustomFormula>),
    Host {
        spec: &'static HostFnSpec,
        scope: Scope,
    },
}

fn callee_name(callee: &Callee) -> &str {
    match callee {
        Callee::Builtin(spec) => spec.symbol,
        Callee::Custom(formula) => formula.name(),
        Callee::Host { spec, .. } => spec.name,
    }
}

enum OpEntry {
    Bin(&'static BinOp),
    Unary(&'static UnaryOp),
    Paren,
    Bracket,
    /// `?` seen, collecting the then-branch.
    TernaryThen,
    /// `:` seen, then-branch captured, collecting the else-branch.
    TernaryElse { then: Expr },
    Func(Callee),
}

impl OpEntry {
    /// Openers report a precedence below every real operator so folds stop
    /// at group boundaries.
    fn prec(&self) -> i16 {
        match self {
            OpEntry::Bin(op) => i16::from(op.precedence),
            OpEntry::Unary(_) => i16::from(PREC_UNARY),
            OpEntry::TernaryThen | OpEntry::TernaryElse { .. } => i16::from(PREC_TERNARY),
            OpEntry::Paren | OpEntry::Bracket | OpEntry::Func(_) => -1,
        }
    }
}

/// A host call parked on the output stack. Whether it needs an eval or an
/// assign handler is only known once its syntactic role is: argument and
/// operand positions resolve to eval, assignment targets to assign.
#[derive(Clone)]
struct PendingCall {
    spec: &'static HostFnSpec,
    scope: Scope,
    args: Vec<Value>,
    kwargs: Kwargs,
    span: Span,
}

enum OutNode {
    Expr(Expr),
    Pending(PendingCall),
}

fn resolve_eval(p: PendingCall) -> Result<HostCall, SyntaxError> {
    if p.spec.eval.is_none() {
        return Err(SyntaxError::new(
            format!("Host function {}() cannot be used as a value", p.spec.name),
            p.span,
        ));
    }
    Ok(HostCall {
        spec: p.spec,
        scope: p.scope,
        args: p.args,
        kwargs: p.kwargs,
    })
}

fn resolve_assign(p: PendingCall) -> Result<HostCall, SyntaxError> {
    if p.spec.assign.is_none() {
        return Err(SyntaxError::new(
            format!("Host function {}() is not assignable", p.spec.name),
            p.span,
        ));
    }
    Ok(HostCall {
        spec: p.spec,
        scope: p.scope,
        args: p.args,
        kwargs: p.kwargs,
    })
}

fn to_value(node: OutNode) -> Result<Value, SyntaxError> {
    match node {
        OutNode::Pending(p) => Ok(Value::Expr(Box::new(Expr::Host(resolve_eval(p)?)))),
        OutNode::Expr(e) => Ok(expr_to_value(e)),
    }
}

/// Keep literals and bare names structural so host functions can inspect
/// them; everything else stays a lazy sub-expression.
fn expr_to_value(e: Expr) -> Value {
    match e {
        Expr::Const(n) => Value::Number(n),
        Expr::Str(s) => Value::Str(s),
        Expr::Var(name) => Value::VarRef(name),
        Expr::Array(items) => Value::Array(items.into_iter().map(expr_to_value).collect()),
        other => Value::Expr(Box::new(other)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Call,
    Array,
    Group,
}

/// Bookkeeping for one open call, array or group.
struct Frame {
    kind: FrameKind,
    /// Declared positional arity; -1 is variadic.
    expected: i32,
    /// Completed positional arguments sitting on the output stack.
    positional: usize,
    /// An operand has been produced since the frame opened or since the
    /// last separator.
    has_value: bool,
    seen_kwarg: bool,
    /// Keyword name whose value is currently being parsed.
    pending_kwarg: Option<String>,
    kwargs: Vec<(String, Value)>,
    span: Span,
}

impl Frame {
    fn new(kind: FrameKind, expected: i32, span: Span) -> Self {
        Self {
            kind,
            expected,
            positional: 0,
            has_value: false,
            seen_kwarg: false,
            pending_kwarg: None,
            kwargs: Vec::new(),
            span,
        }
    }

    fn group(span: Span) -> Self {
        Self::new(FrameKind::Group, 0, span)
    }

    fn call(expected: i32, span: Span) -> Self {
        Self::new(FrameKind::Call, expected, span)
    }

    fn array(span: Span) -> Self {
        Self::new(FrameKind::Array, -1, span)
    }
}

struct PendingAssign {
    op: &'static AssignOp,
    target: AssignTarget,
    /// Eval-mode duplicate of the target, for compound read-modify-write.
    current: Option<Expr>,
}

struct Parser<'f> {
    formulas: &'f FormulaRegistry,
    mode: TreeMode,
    ops: Vec<OpEntry>,
    output: Vec<OutNode>,
    frames: SmallVec<[Frame; 4]>,
    state: ParseState,
    last_span: Span,
    assign: Option<PendingAssign>,
    /// Set by postfix `++`/`--`; any further token is an error.
    assign_complete: bool,
}

impl<'f> Parser<'f> {
    fn new(formulas: &'f FormulaRegistry, mode: TreeMode) -> Self {
        Self {
            formulas,
            mode,
            ops: Vec::new(),
            output: Vec::new(),
            frames: SmallVec::new(),
            state: ParseState::new(),
            last_span: Span::new(0, 0),
            assign: None,
            assign_complete: false,
        }
    }

    fn err(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(message, self.last_span)
    }

    fn internal(&self, message: &str) -> SyntaxError {
        SyntaxError::new(format!("Internal parser error: {message}"), self.last_span)
    }

    /// Mark the operand just produced as the current argument of the
    /// nearest enclosing call or array.
    fn note_operand(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            if frame.kind != FrameKind::Group {
                frame.has_value = true;
            }
        }
    }

    fn pop_out(&mut self) -> Result<OutNode, SyntaxError> {
        match self.output.pop() {
            Some(node) => Ok(node),
            None => Err(self.err("Invalid expression")),
        }
    }

    fn pop_expr(&mut self) -> Result<Expr, SyntaxError> {
        match self.pop_out()? {
            OutNode::Expr(e) => Ok(e),
            OutNode::Pending(p) => Ok(Expr::Host(resolve_eval(p)?)),
        }
    }

    fn pop_args(&mut self, n: usize) -> Result<Vec<Expr>, SyntaxError> {
        let mut args = Vec::with_capacity(n);
        for _ in 0..n {
            args.push(self.pop_expr()?);
        }
        args.reverse();
        Ok(args)
    }

    fn pop_values(&mut self, n: usize) -> Result<Vec<Value>, SyntaxError> {
        let mut args = Vec::with_capacity(n);
        for _ in 0..n {
            let node = self.pop_out()?;
            args.push(to_value(node)?);
        }
        args.reverse();
        Ok(args)
    }

    /// Pop and apply the top operator. Openers and bare `?` markers are
    /// unfoldable; reaching one here means the expression ended inside them.
    fn fold_top(&mut self) -> Result<(), SyntaxError> {
        let Some(top) = self.ops.pop() else {
            return Err(self.internal("operator stack underflow"));
        };
        match top {
            OpEntry::Bin(op) => {
                let rhs = self.pop_expr()?;
                let lhs = self.pop_expr()?;
                self.output.push(OutNode::Expr(Expr::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                }));
            }
            OpEntry::Unary(op) => {
                let rhs = self.pop_expr()?;
                self.output.push(OutNode::Expr(Expr::Unary {
                    op,
                    rhs: Box::new(rhs),
                }));
            }
            OpEntry::TernaryElse { then } => {
                let otherwise = self.pop_expr()?;
                let cond = self.pop_expr()?;
                self.output.push(OutNode::Expr(Expr::Ternary {
                    cond: Box::new(cond),
                    then: Box::new(then),
                    otherwise: Box::new(otherwise),
                }));
            }
            OpEntry::TernaryThen => return Err(self.err("Ternary '?' is missing its ':'")),
            OpEntry::Paren => return Err(self.err("Unterminated left parenthesis")),
            OpEntry::Bracket => return Err(self.err("Unterminated array")),
            OpEntry::Func(callee) => {
                return Err(self.err(format!(
                    "Unterminated function call {}()",
                    callee_name(&callee)
                )))
            }
        }
        Ok(())
    }

    /// Fold everything down to the nearest group/call/array opener.
    fn flush_group(&mut self) -> Result<(), SyntaxError> {
        loop {
            match self.ops.last().map(OpEntry::prec) {
                Some(p) if p >= 0 => self.fold_top()?,
                _ => break,
            }
        }
        Ok(())
    }

    fn number(&mut self, text: &str) -> Result<(), SyntaxError> {
        self.state.validate(Expect::Operand, self.last_span)?;
        let value: f64 = text
            .parse()
            .map_err(|_| SyntaxError::new(format!("Invalid number {text}"), self.last_span))?;
        self.note_operand();
        self.output.push(OutNode::Expr(Expr::Const(value)));
        self.state.set(Expect::Oper, false);
        Ok(())
    }

    fn string(&mut self, text: String) -> Result<(), SyntaxError> {
        self.state.validate(Expect::Operand, self.last_span)?;
        self.note_operand();
        self.output.push(OutNode::Expr(Expr::Str(text)));
        self.state.set(Expect::Oper, false);
        Ok(())
    }

    /// Resolution order for names: constant, built-in, custom formula,
    /// scoped host function, and finally a scoped variable read.
    fn identifier(&mut self, text: &str) -> Result<(), SyntaxError> {
        if let Some(value) = get_constant(text) {
            self.state.validate(Expect::Operand, self.last_span)?;
            self.note_operand();
            self.output.push(OutNode::Expr(Expr::Const(value)));
            self.state.set(Expect::Oper, false);
            return Ok(());
        }
        if let Some(spec) = get_builtin(text) {
            return self.begin_call(Callee::Builtin(spec));
        }
        if let Some(formula) = self.formulas.get(text) {
            return self.begin_call(Callee::Custom(formula));
        }
        match lookup_scoped_host(text) {
            Ok(Some((spec, scope))) => return self.begin_call(Callee::Host { spec, scope }),
            Ok(None) => {}
            Err(message) => return Err(self.err(message)),
        }
        self.state.validate(Expect::Operand, self.last_span)?;
        self.note_operand();
        self.output
            .push(OutNode::Expr(Expr::Var(ScopedName::parse(text))));
        self.state.set(Expect::Oper, false);
        Ok(())
    }

    fn begin_call(&mut self, callee: Callee) -> Result<(), SyntaxError> {
        self.state.validate(Expect::Operand, self.last_span)?;
        self.note_operand();
        let expected = match &callee {
            Callee::Builtin(spec) => spec.num_params,
            Callee::Custom(formula) => formula.num_params() as i32,
            Callee::Host { spec, .. } => spec.num_params,
        };
        self.frames.push(Frame::call(expected, self.last_span));
        self.ops.push(OpEntry::Func(callee));
        self.state.set(Expect::Lparen, false);
        Ok(())
    }

    fn operator(&mut self, text: &str) -> Result<(), SyntaxError> {
        match text {
            "(" => self.lparen(),
            ")" => self.rparen(),
            "[" => self.lbracket(),
            "]" => self.rbracket(),
            "," => self.comma(),
            "?" => self.question(),
            ":" => self.colon(),
            "." => Err(self.err("The '.' operator is reserved")),
            _ => {
                if self.state.allows_prefix_unary {
                    if let Some(op) = get_unary_op(text) {
                        self.state.validate(Expect::Operand, self.last_span)?;
                        self.ops.push(OpEntry::Unary(op));
                        self.state.set(Expect::Operand, false);
                        return Ok(());
                    }
                }
                if let Some(op) = get_binary_op(text) {
                    return self.binary(op);
                }
                if let Some(op) = get_assign_op(text) {
                    return self.assignment(op);
                }
                Err(self.err(format!("Unknown operator {text}")))
            }
        }
    }

    fn binary(&mut self, op: &'static BinOp) -> Result<(), SyntaxError> {
        self.state.validate(Expect::Oper, self.last_span)?;
        let prec = i16::from(op.precedence);
        loop {
            match self.ops.last().map(OpEntry::prec) {
                Some(p) if p > prec || (p == prec && !op.right_assoc) => self.fold_top()?,
                _ => break,
            }
        }
        self.ops.push(OpEntry::Bin(op));
        self.state.set(Expect::Operand, true);
        Ok(())
    }

    fn lparen(&mut self) -> Result<(), SyntaxError> {
        if let Err(e) = self.state.validate(Expect::Lparen, self.last_span) {
            // `foo(` where foo resolved to a variable reads much better as
            // a bad function name than as a misplaced parenthesis.
            if self.state.expected == Expect::Oper {
                if let Some(OutNode::Expr(Expr::Var(name))) = self.output.last() {
                    return Err(SyntaxError::new(
                        format!("{} (or unknown function {name}())", e.message),
                        self.last_span,
                    ));
                }
            }
            return Err(e);
        }
        let is_call = matches!(self.ops.last(), Some(OpEntry::Func(_)));
        if !is_call {
            self.frames.push(Frame::group(self.last_span));
        }
        self.ops.push(OpEntry::Paren);
        self.state.set(Expect::Operand, true);
        Ok(())
    }

    fn rparen(&mut self) -> Result<(), SyntaxError> {
        self.state.validate(Expect::Rparen, self.last_span)?;
        self.flush_group()?;
        match self.ops.pop() {
            Some(OpEntry::Paren) => {}
            _ => return Err(self.err("Misplaced right parenthesis")),
        }
        if matches!(
            self.frames.last(),
            Some(f) if f.has_value || f.pending_kwarg.is_some()
        ) {
            self.finish_arg()?;
        }
        let Some(frame) = self.frames.pop() else {
            return Err(self.err("Misplaced right parenthesis"));
        };
        match frame.kind {
            FrameKind::Group => {}
            FrameKind::Call => self.close_call(frame)?,
            FrameKind::Array => return Err(self.internal("array frame closed by parenthesis")),
        }
        self.note_operand();
        self.state.set(Expect::Oper, false);
        Ok(())
    }

    fn lbracket(&mut self) -> Result<(), SyntaxError> {
        if self.state.expected == Expect::Lparen {
            return Err(self.err("Expected left parenthesis, got left bracket"));
        }
        self.state.validate(Expect::Lparen, self.last_span)?;
        self.frames.push(Frame::array(self.last_span));
        self.ops.push(OpEntry::Bracket);
        self.state.set(Expect::Operand, true);
        // Arrays may be empty, unlike groups.
        self.state.previous = Expect::Lparen;
        Ok(())
    }

    fn rbracket(&mut self) -> Result<(), SyntaxError> {
        self.state.validate(Expect::Rparen, self.last_span)?;
        self.flush_group()?;
        match self.ops.pop() {
            Some(OpEntry::Bracket) => {}
            _ => return Err(self.err("Misplaced right bracket")),
        }
        if matches!(
            self.frames.last(),
            Some(f) if f.has_value || f.pending_kwarg.is_some()
        ) {
            self.finish_arg()?;
        }
        let Some(frame) = self.frames.pop() else {
            return Err(self.err("Misplaced right bracket"));
        };
        if frame.kind != FrameKind::Array {
            return Err(self.internal("non-array frame closed by bracket"));
        }
        let items = self.pop_args(frame.positional)?;
        self.output.push(OutNode::Expr(Expr::Array(items)));
        self.note_operand();
        self.state.set(Expect::Oper, false);
        Ok(())
    }

    fn comma(&mut self) -> Result<(), SyntaxError> {
        self.state.validate(Expect::Oper, self.last_span)?;
        if !matches!(self.frames.last(), Some(f) if f.kind != FrameKind::Group) {
            return Err(self.err("Misplaced comma"));
        }
        self.flush_group()?;
        self.finish_arg()?;
        self.state.set(Expect::Operand, true);
        Ok(())
    }

    /// Complete the argument whose operand sits on top of the output stack:
    /// either attach it to the pending keyword or count it as positional.
    fn finish_arg(&mut self) -> Result<(), SyntaxError> {
        let pending = match self.frames.last_mut() {
            Some(frame) => frame.pending_kwarg.take(),
            None => return Err(self.internal("argument outside any frame")),
        };
        if let Some(key) = pending {
            let node = self.pop_out()?;
            let value = to_value(node)?;
            let Some(frame) = self.frames.last_mut() else {
                return Err(self.internal("argument outside any frame"));
            };
            frame.kwargs.push((key, value));
            frame.has_value = false;
        } else {
            let span = self.last_span;
            let Some(frame) = self.frames.last_mut() else {
                return Err(self.internal("argument outside any frame"));
            };
            if frame.seen_kwarg {
                return Err(SyntaxError::new(
                    "Positional argument after keyword argument",
                    span,
                ));
            }
            frame.positional += 1;
            frame.has_value = false;
        }
        Ok(())
    }

    fn question(&mut self) -> Result<(), SyntaxError> {
        self.state.validate(Expect::Oper, self.last_span)?;
        loop {
            match self.ops.last().map(OpEntry::prec) {
                Some(p) if p > i16::from(PREC_TERNARY) => self.fold_top()?,
                _ => break,
            }
        }
        self.ops.push(OpEntry::TernaryThen);
        self.state.set(Expect::Operand, true);
        Ok(())
    }

    /// `:` is ambiguous: it either closes the then-branch of the innermost
    /// open `?`, or names a keyword argument. Ternary wins whenever a `?`
    /// marker is open in the current group.
    fn colon(&mut self) -> Result<(), SyntaxError> {
        self.state.validate(Expect::Oper, self.last_span)?;
        loop {
            enum Action {
                Fold,
                TakeThen,
                Kwarg,
            }
            let action = match self.ops.last() {
                Some(OpEntry::TernaryThen) => Action::TakeThen,
                Some(e) if e.prec() >= i16::from(PREC_TERNARY) => Action::Fold,
                _ => Action::Kwarg,
            };
            match action {
                Action::Fold => self.fold_top()?,
                Action::TakeThen => {
                    let then = self.pop_expr()?;
                    self.ops.pop();
                    self.ops.push(OpEntry::TernaryElse { then });
                    self.state.set(Expect::Operand, true);
                    return Ok(());
                }
                Action::Kwarg => break,
            }
        }
        match self.frames.last() {
            Some(f) if f.kind == FrameKind::Call && f.pending_kwarg.is_none() && f.has_value => {}
            Some(f) if f.kind == FrameKind::Array => {
                return Err(self.err("Keyword arguments are only valid in function calls"))
            }
            _ => return Err(self.err("Misplaced colon")),
        }
        let key = match self.pop_out()? {
            OutNode::Expr(Expr::Str(s)) => s,
            OutNode::Expr(Expr::Var(name)) => name.to_string(),
            _ => return Err(self.err("Keyword argument names must be plain names or strings")),
        };
        let span = self.last_span;
        let Some(frame) = self.frames.last_mut() else {
            return Err(self.internal("argument outside any frame"));
        };
        if frame.kwargs.iter().any(|(k, _)| *k == key) {
            return Err(SyntaxError::new(
                format!("Duplicate keyword argument '{key}'"),
                span,
            ));
        }
        frame.pending_kwarg = Some(key);
        frame.seen_kwarg = true;
        frame.has_value = false;
        self.state.set(Expect::Operand, true);
        Ok(())
    }

    fn close_call(&mut self, frame: Frame) -> Result<(), SyntaxError> {
        let Some(OpEntry::Func(callee)) = self.ops.pop() else {
            return Err(self.internal("call frame without a callee"));
        };
        let n = frame.positional;
        if frame.expected >= 0 {
            let name = callee_name(&callee);
            if (n as i32) < frame.expected {
                return Err(self.err(format!("Not enough arguments for {name}()")));
            }
            if (n as i32) > frame.expected {
                return Err(self.err(format!("Too many arguments for {name}()")));
            }
        }
        match callee {
            Callee::Builtin(spec) => {
                if !frame.kwargs.is_empty() {
                    return Err(self.err(format!(
                        "{}() does not accept keyword arguments",
                        spec.symbol
                    )));
                }
                let args = self.pop_args(n)?;
                self.output.push(OutNode::Expr(Expr::Builtin { spec, args }));
            }
            Callee::Custom(formula) => {
                if !frame.kwargs.is_empty() {
                    return Err(self.err(format!(
                        "{}() does not accept keyword arguments",
                        formula.name()
                    )));
                }
                let args = self.pop_args(n)?;
                self.output
                    .push(OutNode::Expr(Expr::Custom { formula, args }));
            }
            Callee::Host { spec, scope } => {
                for (key, _) in &frame.kwargs {
                    if !spec.kwargs.contains(&key.as_str()) {
                        return Err(self.err(format!(
                            "Unknown keyword argument '{key}' for {}()",
                            spec.name
                        )));
                    }
                }
                let args = self.pop_values(n)?;
                self.output.push(OutNode::Pending(PendingCall {
                    spec,
                    scope,
                    args,
                    kwargs: Kwargs::from_pairs(frame.kwargs),
                    span: Span::new(frame.span.start, self.last_span.end),
                }));
            }
        }
        Ok(())
    }

    /// Assignment is not an expression: it may only appear once, with the
    /// entire text to its left being the target.
    fn assignment(&mut self, op: &'static AssignOp) -> Result<(), SyntaxError> {
        self.state.validate(Expect::Oper, self.last_span)?;
        if self.mode == TreeMode::AssignTarget {
            return Err(self.err("Assignment is not allowed in an assignment target"));
        }
        if self.assign.is_some() {
            return Err(self.err("Only one assignment per expression"));
        }
        if !self.frames.is_empty() || !self.ops.is_empty() || self.output.len() != 1 {
            return Err(self.err("Assignment must be the entire expression"));
        }
        let node = self.pop_out()?;
        let compound = op.combine.is_some();
        let (target, current) = match node {
            OutNode::Expr(Expr::Var(name)) => {
                let current = compound.then(|| Expr::Var(name.clone()));
                (AssignTarget::Var(name), current)
            }
            OutNode::Pending(p) => {
                let current = if compound {
                    Some(Expr::Host(resolve_eval(p.clone())?))
                } else {
                    None
                };
                (AssignTarget::Host(resolve_assign(p)?), current)
            }
            _ => {
                return Err(
                    self.err("Assignment target must be a variable or an assignable function")
                )
            }
        };
        self.assign = Some(PendingAssign {
            op,
            target,
            current,
        });
        if op.postfix {
            self.assign_complete = true;
            self.state.set(Expect::Oper, false);
        } else {
            self.state.set(Expect::Operand, true);
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Expr, SyntaxError> {
        self.state.validate(Expect::Eof, self.last_span)?;
        while !self.ops.is_empty() {
            self.fold_top()?;
        }
        if let Some(pending) = self.assign.take() {
            let rhs = if pending.op.postfix {
                Expr::Const(1.0)
            } else {
                self.pop_expr()?
            };
            if !self.output.is_empty() {
                return Err(self.err("Invalid expression"));
            }
            return Ok(Expr::Assign {
                target: pending.target,
                op: pending.op,
                current: pending.current.map(Box::new),
                rhs: Box::new(rhs),
            });
        }
        let node = self.pop_out()?;
        if !self.output.is_empty() {
            return Err(self.err("Invalid expression"));
        }
        match self.mode {
            TreeMode::Eval => match node {
                OutNode::Expr(e) => Ok(e),
                OutNode::Pending(p) => Ok(Expr::Host(resolve_eval(p)?)),
            },
            TreeMode::AssignTarget => match node {
                OutNode::Expr(Expr::Var(name)) => Ok(Expr::Var(name)),
                OutNode::Pending(p) => Ok(Expr::Host(resolve_assign(p)?)),
                _ => Err(
                    self.err("Assignment target must be a variable or an assignable function")
                ),
            },
        }
    }
}
