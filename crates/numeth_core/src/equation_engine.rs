use crate::error::EvaluationError;
use crate::traits::{Scalar, SlopeFunction, UnivariateFunction};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};

/// Whitelisted named constants. Nothing outside this table and the declared
/// variables can ever be resolved by the compiler.
pub const CONSTANTS: [(&str, f64); 2] = [("pi", std::f64::consts::PI), ("e", std::f64::consts::E)];

fn lookup_constant(name: &str) -> Option<f64> {
    CONSTANTS
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, value)| *value)
}

/// Whitelisted unary functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Exp,
    Sqrt,
    Log,
}

impl Function {
    pub const ALL: [Function; 6] = [
        Function::Sin,
        Function::Cos,
        Function::Tan,
        Function::Exp,
        Function::Sqrt,
        Function::Log,
    ];

    pub fn lookup(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::Sin => "sin",
            Function::Cos => "cos",
            Function::Tan => "tan",
            Function::Exp => "exp",
            Function::Sqrt => "sqrt",
            Function::Log => "log",
        }
    }

    /// Applies the function, rejecting arguments outside its real domain.
    pub fn apply<T: Scalar>(self, a: T) -> Result<T, EvaluationError> {
        let domain_error = || EvaluationError::Domain {
            function: self.name(),
            argument: a.to_f64().unwrap_or(f64::NAN),
        };
        let value = match self {
            Function::Sin => a.sin(),
            Function::Cos => a.cos(),
            Function::Tan => a.tan(),
            Function::Exp => a.exp(),
            Function::Sqrt => {
                if a < T::zero() {
                    return Err(domain_error());
                }
                a.sqrt()
            }
            Function::Log => {
                if a <= T::zero() {
                    return Err(domain_error());
                }
                a.ln()
            }
        };
        finite(value)
    }
}

fn is_reserved(name: &str) -> bool {
    lookup_constant(name).is_some() || Function::lookup(name).is_some()
}

fn finite<T: Scalar>(value: T) -> Result<T, EvaluationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EvaluationError::NonFinite)
    }
}

/// OpCodes for the Stack-based Virtual Machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OpCode {
    /// Pushes a constant value onto the stack.
    LoadConst(f64),
    /// Pushes the value of a variable (by index) onto the stack.
    /// Indices follow the order the variables were declared (e.g., 0=t, 1=x).
    LoadVar(usize),
    /// Pops top two values (b, a), pushes (a + b).
    Add,
    /// Pops top two values (b, a), pushes (a - b).
    Sub,
    /// Pops top two values (b, a), pushes (a * b).
    Mul,
    /// Pops top two values (b, a), pushes (a / b). Fails if b == 0.
    Div,
    /// Pops top two values (b, a), pushes (a ^ b).
    Pow,
    /// Pops top value (a), pushes -a.
    Neg,
    /// Pops top value (a), pushes f(a).
    Call(Function),
}

/// Represents a compiled sequence of operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bytecode {
    pub ops: Vec<OpCode>,
}

impl Bytecode {
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }
}

/// Stack-based Virtual Machine for evaluating expressions.
///
/// The VM is stateless; `execute` takes all necessary context:
/// - `bytecode`: Instructions to run.
/// - `vars`: Variable values, indexed as declared at compile time.
/// - `stack`: A mutable buffer for intermediate computations.
///
/// Every intermediate result is checked: division by zero, domain errors and
/// non-finite values abort the evaluation.
pub struct VM;

impl VM {
    pub fn execute<T: Scalar>(
        bytecode: &Bytecode,
        vars: &[T],
        stack: &mut Vec<T>,
    ) -> Result<T, EvaluationError> {
        stack.clear();

        for op in &bytecode.ops {
            let value = match *op {
                OpCode::LoadConst(val) => T::from_f64(val).ok_or(EvaluationError::NonFinite)?,
                OpCode::LoadVar(idx) => *vars.get(idx).ok_or(EvaluationError::ArityMismatch {
                    expected: idx + 1,
                    got: vars.len(),
                })?,
                OpCode::Add => {
                    let (a, b) = pop_pair(stack)?;
                    finite(a + b)?
                }
                OpCode::Sub => {
                    let (a, b) = pop_pair(stack)?;
                    finite(a - b)?
                }
                OpCode::Mul => {
                    let (a, b) = pop_pair(stack)?;
                    finite(a * b)?
                }
                OpCode::Div => {
                    let (a, b) = pop_pair(stack)?;
                    if b == T::zero() {
                        return Err(EvaluationError::DivisionByZero);
                    }
                    finite(a / b)?
                }
                OpCode::Pow => {
                    let (a, b) = pop_pair(stack)?;
                    power(a, b)?
                }
                OpCode::Neg => -pop(stack)?,
                OpCode::Call(function) => function.apply(pop(stack)?)?,
            };
            stack.push(value);
        }

        let result = pop(stack)?;
        if !stack.is_empty() {
            return Err(EvaluationError::syntax("malformed bytecode"));
        }
        Ok(result)
    }
}

fn pop<T: Scalar>(stack: &mut Vec<T>) -> Result<T, EvaluationError> {
    stack
        .pop()
        .ok_or_else(|| EvaluationError::syntax("malformed bytecode"))
}

fn pop_pair<T: Scalar>(stack: &mut Vec<T>) -> Result<(T, T), EvaluationError> {
    let b = pop(stack)?;
    let a = pop(stack)?;
    Ok((a, b))
}

fn power<T: Scalar>(a: T, b: T) -> Result<T, EvaluationError> {
    if a == T::zero() && b < T::zero() {
        return Err(EvaluationError::DivisionByZero);
    }
    if a < T::zero() && b.fract() != T::zero() {
        return Err(EvaluationError::Domain {
            function: "pow",
            argument: a.to_f64().unwrap_or(f64::NAN),
        });
    }
    finite(a.powf(b))
}

// --- AST & Parser ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

/// Abstract Syntax Tree nodes for expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(String),
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
    Neg(Box<Expr>),
    Call(String, Box<Expr>),
}

impl Expr {
    /// Names referenced as values, excluding the whitelisted constants.
    pub fn free_variables(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables(&self, names: &mut BTreeSet<String>) {
        match self {
            Expr::Number(_) => {}
            Expr::Variable(name) => {
                if lookup_constant(name).is_none() {
                    names.insert(name.clone());
                }
            }
            Expr::Binary(left, _, right) => {
                left.collect_variables(names);
                right.collect_variables(names);
            }
            Expr::Neg(operand) | Expr::Call(_, operand) => operand.collect_variables(names),
        }
    }
}

/// Compiles an AST (`Expr`) into `Bytecode`.
/// Resolves variable names to indices and function names to the whitelist;
/// any other identifier is a compile error.
pub struct Compiler {
    pub var_map: HashMap<String, usize>,
}

impl Compiler {
    pub fn new<S: AsRef<str>>(var_names: &[S]) -> Result<Self, EvaluationError> {
        let mut var_map = HashMap::new();
        for (i, name) in var_names.iter().enumerate() {
            let name = name.as_ref();
            if is_reserved(name) {
                return Err(EvaluationError::ReservedName(name.to_string()));
            }
            if var_map.insert(name.to_string(), i).is_some() {
                return Err(EvaluationError::DuplicateVariable(name.to_string()));
            }
        }
        Ok(Self { var_map })
    }

    pub fn compile(&self, expr: &Expr) -> Result<Bytecode, EvaluationError> {
        let mut ops = Vec::new();
        self.compile_recursive(expr, &mut ops)?;
        Ok(Bytecode { ops })
    }

    fn compile_recursive(&self, expr: &Expr, ops: &mut Vec<OpCode>) -> Result<(), EvaluationError> {
        match expr {
            Expr::Number(n) => ops.push(OpCode::LoadConst(*n)),
            Expr::Variable(name) => {
                if let Some(&idx) = self.var_map.get(name) {
                    ops.push(OpCode::LoadVar(idx));
                } else if let Some(value) = lookup_constant(name) {
                    ops.push(OpCode::LoadConst(value));
                } else if Function::lookup(name).is_some() {
                    return Err(EvaluationError::FunctionAsValue(name.clone()));
                } else {
                    return Err(EvaluationError::UnknownSymbol(name.clone()));
                }
            }
            Expr::Binary(left, op, right) => {
                self.compile_recursive(left, ops)?;
                self.compile_recursive(right, ops)?;
                ops.push(match op {
                    BinaryOp::Add => OpCode::Add,
                    BinaryOp::Sub => OpCode::Sub,
                    BinaryOp::Mul => OpCode::Mul,
                    BinaryOp::Div => OpCode::Div,
                    BinaryOp::Pow => OpCode::Pow,
                });
            }
            Expr::Neg(operand) => {
                self.compile_recursive(operand, ops)?;
                ops.push(OpCode::Neg);
            }
            Expr::Call(func, arg) => {
                let function = Function::lookup(func)
                    .ok_or_else(|| EvaluationError::UnknownFunction(func.clone()))?;
                self.compile_recursive(arg, ops)?;
                ops.push(OpCode::Call(function));
            }
        }
        Ok(())
    }
}

/// Limits on user input. Every AST pass recurses on the tree, so both the
/// nesting depth and the overall size are bounded.
const MAX_NESTING_DEPTH: usize = 256;
const MAX_TOKENS: usize = 4096;

/// Parses a string expression into an AST.
pub fn parse(input: &str) -> Result<Expr, EvaluationError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(EvaluationError::syntax("empty expression"));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.parse_expression()?;
    if let Some(token) = parser.peek() {
        return Err(EvaluationError::syntax(format!(
            "unexpected {:?} after end of expression",
            token
        )));
    }
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Identifier(String),
    Plus,
    Minus,
    Star,
    Slash,
    Power,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, EvaluationError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        if tokens.len() >= MAX_TOKENS {
            return Err(EvaluationError::syntax(format!(
                "expression longer than {} tokens",
                MAX_TOKENS
            )));
        }
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_digit() || c == '.' {
            let mut num_str = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_ascii_digit() || d == '.' {
                    num_str.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            // Exponent part, only when an integer actually follows the marker;
            // otherwise `e` is left for the identifier branch.
            if matches!(chars.peek(), Some(&'e') | Some(&'E')) {
                let mut lookahead = chars.clone();
                let marker = lookahead.next();
                let mut exponent = String::new();
                if let Some(&sign) = lookahead.peek() {
                    if sign == '+' || sign == '-' {
                        exponent.push(sign);
                        lookahead.next();
                    }
                }
                if lookahead.peek().map_or(false, |d| d.is_ascii_digit()) {
                    while let Some(&d) = lookahead.peek() {
                        if !d.is_ascii_digit() {
                            break;
                        }
                        exponent.push(d);
                        lookahead.next();
                    }
                    if let Some(marker) = marker {
                        num_str.push(marker);
                    }
                    num_str.push_str(&exponent);
                    chars = lookahead;
                }
            }
            let value = num_str
                .parse()
                .map_err(|_| EvaluationError::syntax(format!("invalid number '{}'", num_str)))?;
            tokens.push(Token::Number(value));
        } else if c.is_ascii_alphabetic() {
            let mut ident = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_ascii_alphanumeric() || d == '_' {
                    ident.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Identifier(ident));
        } else {
            chars.next();
            let token = match c {
                '+' => Token::Plus,
                '-' => Token::Minus,
                '*' => {
                    if chars.peek() == Some(&'*') {
                        chars.next();
                        Token::Power
                    } else {
                        Token::Star
                    }
                }
                '/' => Token::Slash,
                '^' => Token::Power,
                '(' => Token::LParen,
                ')' => Token::RParen,
                other => {
                    return Err(EvaluationError::syntax(format!(
                        "unexpected character '{}'",
                        other
                    )))
                }
            };
            tokens.push(token);
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
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

    fn expect_rparen(&mut self) -> Result<(), EvaluationError> {
        match self.consume() {
            Some(Token::RParen) => Ok(()),
            _ => Err(EvaluationError::syntax("expected ')'")),
        }
    }

    fn parse_expression(&mut self) -> Result<Expr, EvaluationError> {
        let mut left = self.parse_term()?;

        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.consume();
            let right = self.parse_term()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, EvaluationError> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => break,
            };
            self.consume();
            let right = self.parse_unary()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    // Every recursive path (parentheses, calls, exponents, signs) passes
    // through here, so this is where nesting is counted.
    fn parse_unary(&mut self) -> Result<Expr, EvaluationError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(EvaluationError::syntax(format!(
                "expression nested deeper than {} levels",
                MAX_NESTING_DEPTH
            )));
        }
        self.depth += 1;
        let result = self.parse_signed();
        self.depth -= 1;
        result
    }

    // Unary signs bind looser than `**`, so `-x**2` is `-(x**2)`.
    fn parse_signed(&mut self) -> Result<Expr, EvaluationError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.consume();
                let operand = self.parse_unary()?;
                Ok(Expr::Neg(Box::new(operand)))
            }
            Some(Token::Plus) => {
                self.consume();
                self.parse_unary()
            }
            _ => self.parse_power(),
        }
    }

    // Right-associative: `2**3**2` is `2**(3**2)`.
    fn parse_power(&mut self) -> Result<Expr, EvaluationError> {
        let base = self.parse_primary()?;
        if let Some(Token::Power) = self.peek() {
            self.consume();
            let exponent = self.parse_unary()?;
            return Ok(Expr::Binary(Box::new(base), BinaryOp::Pow, Box::new(exponent)));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Expr, EvaluationError> {
        match self.consume() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Identifier(name)) => {
                if let Some(Token::LParen) = self.peek() {
                    self.consume();
                    let arg = self.parse_expression()?;
                    self.expect_rparen()?;
                    Ok(Expr::Call(name, Box::new(arg)))
                } else {
                    Ok(Expr::Variable(name))
                }
            }
            Some(Token::LParen) => {
                let expr = self.parse_expression()?;
                self.expect_rparen()?;
                Ok(expr)
            }
            Some(token) => Err(EvaluationError::syntax(format!("unexpected {:?}", token))),
            None => Err(EvaluationError::syntax("unexpected end of expression")),
        }
    }
}

// --- CompiledExpression ---

/// A user expression compiled against a fixed list of variables.
///
/// Cheap to evaluate repeatedly: parsing and symbol resolution happen once,
/// and the VM stack is reused between calls.
#[derive(Debug)]
pub struct CompiledExpression {
    source: String,
    var_names: Vec<String>,
    bytecode: Bytecode,
    // Interior mutability for VM stack to avoid allocation per evaluation.
    // Note: This makes the expression !Sync.
    stack: RefCell<Vec<f64>>,
}

impl CompiledExpression {
    pub fn compile<S: AsRef<str>>(source: &str, var_names: &[S]) -> Result<Self, EvaluationError> {
        let parsed = parse(source)?;
        let compiler = Compiler::new(var_names)?;
        let bytecode = compiler.compile(&parsed)?;
        Ok(Self {
            source: source.to_string(),
            var_names: var_names.iter().map(|s| s.as_ref().to_string()).collect(),
            bytecode,
            stack: RefCell::new(Vec::with_capacity(32)),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn var_names(&self) -> &[String] {
        &self.var_names
    }

    pub fn bytecode(&self) -> &Bytecode {
        &self.bytecode
    }

    /// Evaluates with one value per declared variable, in declaration order.
    pub fn eval(&self, values: &[f64]) -> Result<f64, EvaluationError> {
        if values.len() != self.var_names.len() {
            return Err(EvaluationError::ArityMismatch {
                expected: self.var_names.len(),
                got: values.len(),
            });
        }
        let mut stack = self.stack.borrow_mut();
        VM::execute(&self.bytecode, values, &mut stack)
    }
}

impl UnivariateFunction for CompiledExpression {
    fn value(&self, x: f64) -> Result<f64, EvaluationError> {
        self.eval(&[x])
    }
}

/// Variables are (independent, dependent), e.g. `["t", "x"]` or `["x", "y"]`.
impl SlopeFunction for CompiledExpression {
    fn slope(&self, t: f64, x: f64) -> Result<f64, EvaluationError> {
        self.eval(&[t, x])
    }
}

/// Evaluates `expr` once with the given variable bindings.
pub fn evaluate(expr: &str, bindings: &HashMap<String, f64>) -> Result<f64, EvaluationError> {
    let (names, values): (Vec<&str>, Vec<f64>) = bindings
        .iter()
        .map(|(name, value)| (name.as_str(), *value))
        .unzip();
    CompiledExpression::compile(expr, &names)?.eval(&values)
}
