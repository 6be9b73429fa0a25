use crate::error::{MathError, Result};
use crate::traits::ScalarFunction;
use std::fmt;
use std::str::FromStr;

/// Value returned in place of NaN or an infinity.
pub const SATURATED: f64 = f64::MAX;

/// Value returned without evaluating when `|x|` exceeds [`X_LIMIT`].
pub const OUT_OF_RANGE: f64 = f64::MAX / 1000.0;

/// Arguments beyond this magnitude are never fed to the formula.
pub const X_LIMIT: f64 = 1e10;

/// True for values that carry no numeric information: NaN, infinities and
/// the [`SATURATED`] sentinel.
pub fn is_saturated(value: f64) -> bool {
    !value.is_finite() || value.abs() >= SATURATED
}

/// Built-in functions. Each variant has a fixed arity; `log` is split into
/// its one- and two-argument forms at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Sin,
    Cos,
    Tan,
    Atan,
    Exp,
    Sqrt,
    Abs,
    /// `log(x)`, natural logarithm.
    Ln,
    /// `log(x, base)`.
    LogBase,
    Log10,
    Pow,
}

impl Builtin {
    /// Resolves a lowercased function name called with `argc` arguments.
    pub fn resolve(name: &str, argc: usize) -> Result<Self> {
        let expect = |builtin: Builtin| {
            if argc == builtin.arity() {
                Ok(builtin)
            } else {
                Err(MathError::argument(format!(
                    "function {name} expects {} argument(s), got {argc}",
                    builtin.arity()
                )))
            }
        };
        match name {
            "sin" => expect(Builtin::Sin),
            "cos" => expect(Builtin::Cos),
            "tan" => expect(Builtin::Tan),
            "atan" => expect(Builtin::Atan),
            "exp" => expect(Builtin::Exp),
            "sqrt" => expect(Builtin::Sqrt),
            "abs" => expect(Builtin::Abs),
            "log" => match argc {
                1 => Ok(Builtin::Ln),
                2 => Ok(Builtin::LogBase),
                _ => Err(MathError::argument(format!(
                    "function log expects 1 or 2 arguments, got {argc}"
                ))),
            },
            "log10" => expect(Builtin::Log10),
            "pow" => expect(Builtin::Pow),
            _ => Err(MathError::argument(format!("unknown function: {name}"))),
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Builtin::LogBase | Builtin::Pow => 2,
            _ => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Sin => "sin",
            Builtin::Cos => "cos",
            Builtin::Tan => "tan",
            Builtin::Atan => "atan",
            Builtin::Exp => "exp",
            Builtin::Sqrt => "sqrt",
            Builtin::Abs => "abs",
            Builtin::Ln | Builtin::LogBase => "log",
            Builtin::Log10 => "log10",
            Builtin::Pow => "pow",
        }
    }

    fn apply1(self, a: f64) -> f64 {
        match self {
            Builtin::Sin => a.sin(),
            Builtin::Cos => a.cos(),
            Builtin::Tan => a.tan(),
            Builtin::Atan => a.atan(),
            Builtin::Exp => a.exp(),
            Builtin::Sqrt => a.sqrt(),
            Builtin::Abs => a.abs(),
            Builtin::Ln => a.ln(),
            Builtin::Log10 => a.log10(),
            Builtin::LogBase | Builtin::Pow => f64::NAN,
        }
    }

    fn apply2(self, a: f64, b: f64) -> f64 {
        match self {
            Builtin::LogBase => a.ln() / b.ln(),
            Builtin::Pow => a.powf(b),
            _ => f64::NAN,
        }
    }
}

/// OpCodes for the stack-based evaluator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OpCode {
    /// Pushes a constant onto the stack.
    LoadConst(f64),
    /// Pushes the current value of `x`.
    LoadX,
    /// Pops top two values (b, a), pushes (a + b).
    Add,
    /// Pops top two values (b, a), pushes (a - b).
    Sub,
    /// Pops top two values (b, a), pushes (a * b).
    Mul,
    /// Pops top two values (b, a), pushes (a / b).
    Div,
    /// Pops top value (a), pushes -a.
    Neg,
    /// Pops `arity` values and pushes the function result.
    Call(Builtin),
}

/// A compiled sequence of operations.
#[derive(Debug, Clone, PartialEq)]
pub struct Bytecode {
    pub ops: Vec<OpCode>,
    /// Deepest stack the program reaches.
    pub max_depth: usize,
}

/// Stack-based virtual machine.
///
/// The VM is stateless; `execute` takes the bytecode, the binding for `x`
/// and a scratch stack, so one compiled function can be evaluated from
/// several places without shared mutable state.
pub struct VM;

impl VM {
    pub fn execute(bytecode: &Bytecode, x: f64, stack: &mut Vec<f64>) -> f64 {
        stack.clear();

        for op in &bytecode.ops {
            match *op {
                OpCode::LoadConst(value) => stack.push(value),
                OpCode::LoadX => stack.push(x),
                OpCode::Add => {
                    let (a, b) = pop2(stack);
                    stack.push(a + b);
                }
                OpCode::Sub => {
                    let (a, b) = pop2(stack);
                    stack.push(a - b);
                }
                OpCode::Mul => {
                    let (a, b) = pop2(stack);
                    stack.push(a * b);
                }
                OpCode::Div => {
                    let (a, b) = pop2(stack);
                    stack.push(a / b);
                }
                OpCode::Neg => {
                    let a = stack.pop().unwrap_or(f64::NAN);
                    stack.push(-a);
                }
                OpCode::Call(builtin) => {
                    let value = if builtin.arity() == 2 {
                        let (a, b) = pop2(stack);
                        builtin.apply2(a, b)
                    } else {
                        let a = stack.pop().unwrap_or(f64::NAN);
                        builtin.apply1(a)
                    };
                    stack.push(value);
                }
            }
        }

        // Compiled programs always leave exactly one value.
        stack.pop().unwrap_or(f64::NAN)
    }
}

fn pop2(stack: &mut Vec<f64>) -> (f64, f64) {
    let b = stack.pop().unwrap_or(f64::NAN);
    let a = stack.pop().unwrap_or(f64::NAN);
    (a, b)
}

// --- AST & Parser ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Abstract syntax tree of a formula. Names are already resolved: constants
/// are folded into `Number` and every call carries a checked [`Builtin`].
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    X,
    Neg(Box<Expr>),
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
    Call(Builtin, Vec<Expr>),
}

/// Compiles an AST into [`Bytecode`].
pub fn compile(expr: &Expr) -> Bytecode {
    let mut ops = Vec::new();
    let max_depth = compile_recursive(expr, &mut ops, 0);
    Bytecode { ops, max_depth }
}

/// Emits `expr` assuming `depth` values are already on the stack and returns
/// the deepest stack reached.
fn compile_recursive(expr: &Expr, ops: &mut Vec<OpCode>, depth: usize) -> usize {
    match expr {
        Expr::Number(n) => {
            ops.push(OpCode::LoadConst(*n));
            depth + 1
        }
        Expr::X => {
            ops.push(OpCode::LoadX);
            depth + 1
        }
        Expr::Neg(operand) => {
            let max = compile_recursive(operand, ops, depth);
            ops.push(OpCode::Neg);
            max
        }
        Expr::Binary(left, op, right) => {
            let left_max = compile_recursive(left, ops, depth);
            let right_max = compile_recursive(right, ops, depth + 1);
            ops.push(match op {
                BinaryOp::Add => OpCode::Add,
                BinaryOp::Sub => OpCode::Sub,
                BinaryOp::Mul => OpCode::Mul,
                BinaryOp::Div => OpCode::Div,
            });
            left_max.max(right_max)
        }
        Expr::Call(builtin, args) => {
            let mut max = depth;
            for (i, arg) in args.iter().enumerate() {
                max = max.max(compile_recursive(arg, ops, depth + i));
            }
            ops.push(OpCode::Call(*builtin));
            max
        }
    }
}

/// Parses a formula over `x` into an AST.
///
/// Names are case-insensitive. `pi` and `e` are constants. The power
/// operators `^` and `**` are rejected; write `pow(x, y)` instead.
pub fn parse(input: &str) -> Result<Expr> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(MathError::parse("formula is empty", 0));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: input.len(),
    };
    let expr = parser.parse_expression()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(MathError::parse(
            format!("unexpected {}", token.kind),
            token.offset,
        )),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Number(f64),
    Identifier(String),
    Plus,
    Minus,
    Star,
    Slash,
    Comma,
    LParen,
    RParen,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "number {n}"),
            TokenKind::Identifier(name) => write!(f, "identifier '{name}'"),
            TokenKind::Plus => f.write_str("'+'"),
            TokenKind::Minus => f.write_str("'-'"),
            TokenKind::Star => f.write_str("'*'"),
            TokenKind::Slash => f.write_str("'/'"),
            TokenKind::Comma => f.write_str("','"),
            TokenKind::LParen => f.write_str("'('"),
            TokenKind::RParen => f.write_str("')'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    kind: TokenKind,
    offset: usize,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_digit() || c == '.' {
            let mut num_str = String::new();
            while let Some(&(_, d)) = chars.peek() {
                if d.is_ascii_digit() || d == '.' {
                    num_str.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            // Exponent part, only when digits follow so that `2*e` still
            // reads as the constant.
            if let Some(&(_, marker)) = chars.peek() {
                if marker == 'e' || marker == 'E' {
                    let rest = &input[offset + num_str.len() + 1..];
                    let mut rest_chars = rest.chars();
                    let has_exponent = match rest_chars.next() {
                        Some(d) if d.is_ascii_digit() => true,
                        Some('+') | Some('-') => {
                            matches!(rest_chars.next(), Some(d) if d.is_ascii_digit())
                        }
                        _ => false,
                    };
                    if has_exponent {
                        num_str.push('e');
                        chars.next();
                        if let Some(&(_, sign)) = chars.peek() {
                            if sign == '+' || sign == '-' {
                                num_str.push(sign);
                                chars.next();
                            }
                        }
                        while let Some(&(_, d)) = chars.peek() {
                            if d.is_ascii_digit() {
                                num_str.push(d);
                                chars.next();
                            } else {
                                break;
                            }
                        }
                    }
                }
            }
            let value = num_str.parse::<f64>().map_err(|_| {
                MathError::parse(format!("malformed number '{num_str}'"), offset)
            })?;
            tokens.push(Token {
                kind: TokenKind::Number(value),
                offset,
            });
        } else if c.is_alphabetic() || c == '_' {
            let mut ident = String::new();
            while let Some(&(_, d)) = chars.peek() {
                if d.is_alphanumeric() || d == '_' {
                    ident.extend(d.to_lowercase());
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token {
                kind: TokenKind::Identifier(ident),
                offset,
            });
        } else {
            chars.next();
            let kind = match c {
                '+' => TokenKind::Plus,
                '-' => TokenKind::Minus,
                '*' => {
                    if let Some(&(_, '*')) = chars.peek() {
                        return Err(MathError::parse(
                            "operator '**' is not supported, use pow(x, y)",
                            offset,
                        ));
                    }
                    TokenKind::Star
                }
                '/' => TokenKind::Slash,
                ',' => TokenKind::Comma,
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                '^' => {
                    return Err(MathError::parse(
                        "operator '^' is not supported, use pow(x, y)",
                        offset,
                    ))
                }
                other => {
                    return Err(MathError::parse(
                        format!("unexpected character '{other}'"),
                        offset,
                    ))
                }
            };
            tokens.push(Token { kind, offset });
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn consume(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind) -> Result<()> {
        match self.consume() {
            Some(token) if token.kind == kind => Ok(()),
            Some(token) => Err(MathError::parse(
                format!("expected {kind}, found {}", token.kind),
                token.offset,
            )),
            None => Err(MathError::parse(
                format!("expected {kind}, found end of formula"),
                self.end,
            )),
        }
    }

    fn parse_expression(&mut self) -> Result<Expr> {
        let mut left = self.parse_term()?;

        while let Some(token) = self.peek() {
            let op = match token.kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.consume();
            let right = self.parse_term()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;

        while let Some(token) = self.peek() {
            let op = match token.kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => break,
            };
            self.consume();
            let right = self.parse_unary()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Minus) => {
                self.consume();
                let expr = self.parse_unary()?;
                Ok(Expr::Neg(Box::new(expr)))
            }
            Some(TokenKind::Plus) => {
                self.consume();
                self.parse_unary()
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let end = self.end;
        let token = self
            .consume()
            .ok_or_else(|| MathError::parse("unexpected end of formula", end))?;
        match token.kind {
            TokenKind::Number(n) => Ok(Expr::Number(n)),
            TokenKind::Identifier(name) => {
                if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::LParen)) {
                    self.consume();
                    let args = self.parse_arguments()?;
                    let builtin = Builtin::resolve(&name, args.len())?;
                    Ok(Expr::Call(builtin, args))
                } else {
                    match name.as_str() {
                        "x" => Ok(Expr::X),
                        "pi" => Ok(Expr::Number(std::f64::consts::PI)),
                        "e" => Ok(Expr::Number(std::f64::consts::E)),
                        _ => Err(MathError::parse(
                            format!("unknown variable '{name}'"),
                            token.offset,
                        )),
                    }
                }
            }
            TokenKind::LParen => {
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            other => Err(MathError::parse(
                format!("unexpected {other}"),
                token.offset,
            )),
        }
    }

    /// Parses a comma separated list after an opening parenthesis, up to and
    /// including the closing one.
    fn parse_arguments(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();
        if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::RParen)) {
            self.consume();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression()?);
            match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Comma) => {
                    self.consume();
                }
                _ => break,
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(args)
    }
}

// --- Function ---

/// A parsed and compiled formula `f(x)`.
///
/// Immutable once built; evaluation only uses a local scratch stack, so a
/// `Function` can be shared freely between threads.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    source: String,
    bytecode: Bytecode,
}

impl Function {
    pub fn parse(formula: &str) -> Result<Self> {
        let expr = parse(formula)?;
        Ok(Self {
            source: formula.to_string(),
            bytecode: compile(&expr),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn bytecode(&self) -> &Bytecode {
        &self.bytecode
    }

    /// Evaluates with saturation: arguments beyond [`X_LIMIT`] return
    /// [`OUT_OF_RANGE`] without running the program, and NaN or infinite
    /// results become [`SATURATED`].
    pub fn evaluate(&self, x: f64) -> f64 {
        if x.abs() > X_LIMIT {
            return OUT_OF_RANGE;
        }
        let value = self.evaluate_raw(x);
        if value.is_finite() {
            value
        } else {
            SATURATED
        }
    }

    /// Evaluates the program as is, NaN and infinities included.
    pub fn evaluate_raw(&self, x: f64) -> f64 {
        let mut stack = Vec::with_capacity(self.bytecode.max_depth);
        VM::execute(&self.bytecode, x, &mut stack)
    }
}

impl FromStr for Function {
    type Err = MathError;

    fn from_str(s: &str) -> Result<Self> {
        Function::parse(s)
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl ScalarFunction for Function {
    fn value(&self, x: f64) -> f64 {
        self.evaluate(x)
    }

    fn raw_value(&self, x: f64) -> f64 {
        self.evaluate_raw(x)
    }
}

/// Parses `formula` and evaluates it once at `x`.
pub fn evaluate(formula: &str, x: f64) -> Result<f64> {
    Ok(Function::parse(formula)?.evaluate(x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{E, PI};

    fn eval(formula: &str, x: f64) -> f64 {
        Function::parse(formula)
            .expect("formula should parse")
            .evaluate(x)
    }

    fn assert_err_contains<T: std::fmt::Debug>(result: Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn evaluates_arithmetic_with_precedence() {
        assert_eq!(eval("1 + 2 * 3", 0.0), 7.0);
        assert_eq!(eval("(1 + 2) * 3", 0.0), 9.0);
        assert_eq!(eval("10 - 4 - 3", 0.0), 3.0);
        assert_eq!(eval("8 / 4 / 2", 0.0), 1.0);
        assert_eq!(eval("-x * 2", 3.0), -6.0);
        assert_eq!(eval("--x", 3.0), 3.0);
        assert_eq!(eval("+x", 3.0), 3.0);
    }

    #[test]
    fn evaluates_builtins_and_constants() {
        assert!((eval("sin(pi / 2)", 0.0) - 1.0).abs() < 1e-15);
        assert!((eval("cos(0)", 0.0) - 1.0).abs() < 1e-15);
        assert!((eval("tan(pi / 4)", 0.0) - 1.0).abs() < 1e-12);
        assert!((eval("atan(1)", 0.0) - PI / 4.0).abs() < 1e-15);
        assert!((eval("exp(1)", 0.0) - E).abs() < 1e-15);
        assert_eq!(eval("sqrt(x)", 16.0), 4.0);
        assert_eq!(eval("abs(x)", -2.5), 2.5);
        assert!((eval("log(e)", 0.0) - 1.0).abs() < 1e-15);
        assert!((eval("log(8, 2)", 0.0) - 3.0).abs() < 1e-12);
        assert!((eval("log10(1000)", 0.0) - 3.0).abs() < 1e-12);
        assert_eq!(eval("pow(x, 2)", 3.0), 9.0);
    }

    #[test]
    fn names_are_case_insensitive() {
        assert_eq!(eval("POW(X, 2) + Abs(-1)", 2.0), 5.0);
        assert!((eval("PI", 0.0) - PI).abs() < 1e-15);
    }

    #[test]
    fn parses_scientific_notation_without_eating_constant_e() {
        assert_eq!(eval("1e3", 0.0), 1000.0);
        assert_eq!(eval("2.5E-1", 0.0), 0.25);
        assert!((eval("2*e", 0.0) - 2.0 * E).abs() < 1e-15);
        assert!((eval("x - e", E).abs()) < 1e-15);
    }

    #[test]
    fn saturates_non_finite_results() {
        assert_eq!(eval("1 / x", 0.0), SATURATED);
        assert_eq!(eval("sqrt(x)", -1.0), SATURATED);
        assert_eq!(eval("log(x)", 0.0), SATURATED);
        let f = Function::parse("sqrt(x)").unwrap();
        assert!(f.evaluate_raw(-1.0).is_nan());
    }

    #[test]
    fn short_circuits_huge_arguments() {
        let f = Function::parse("x").unwrap();
        assert_eq!(f.evaluate(2e10), OUT_OF_RANGE);
        assert_eq!(f.evaluate(-2e10), OUT_OF_RANGE);
        assert_eq!(f.evaluate(1e10), 1e10);
    }

    #[test]
    fn rejects_unknown_function_and_wrong_arity() {
        assert_err_contains(Function::parse("foo(x)"), "unknown function: foo");
        assert_err_contains(Function::parse("log(x, 2, 3)"), "1 or 2 arguments");
        assert_err_contains(Function::parse("log10(x, 10)"), "log10 expects 1");
        assert_err_contains(Function::parse("pow(x)"), "pow expects 2");
        assert!(matches!(
            Function::parse("sin()"),
            Err(MathError::Argument(_))
        ));
    }

    #[test]
    fn rejects_malformed_syntax() {
        assert!(matches!(Function::parse(""), Err(MathError::Parse { .. })));
        assert_err_contains(Function::parse("x +"), "end of formula");
        assert_err_contains(Function::parse("(x + 1"), "expected ')'");
        assert_err_contains(Function::parse("x 2"), "unexpected number");
        assert_err_contains(Function::parse("y + 1"), "unknown variable 'y'");
        assert_err_contains(Function::parse("x # 1"), "unexpected character");
        assert_err_contains(Function::parse("1..2"), "malformed number");
    }

    #[test]
    fn rejects_power_operators() {
        assert_err_contains(Function::parse("x^2"), "use pow(x, y)");
        assert_err_contains(Function::parse("x**2"), "use pow(x, y)");
    }

    #[test]
    fn reports_error_position() {
        match Function::parse("x + $") {
            Err(MathError::Parse { position, .. }) => assert_eq!(position, 4),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn compiler_tracks_stack_depth() {
        let f = Function::parse("pow(x, 2) + 1").unwrap();
        assert_eq!(f.bytecode().max_depth, 2);
        let g = Function::parse("x").unwrap();
        assert_eq!(g.bytecode().ops, vec![OpCode::LoadX]);
        assert_eq!(g.bytecode().max_depth, 1);
    }

    #[test]
    fn free_evaluate_parses_and_evaluates() {
        assert_eq!(evaluate("x * x", 4.0).unwrap(), 16.0);
        assert!(evaluate("x^2", 4.0).is_err());
    }

    #[test]
    fn function_is_usable_across_threads() {
        let f = Function::parse("x * 2").unwrap();
        let handle = std::thread::spawn(move || f.evaluate(21.0));
        assert_eq!(handle.join().unwrap(), 42.0);
    }
}
