// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Transform Expressions
//!
//! Small arithmetic language used by computed translation rules, e.g.
//! `"c + a"` forward and `"C - A"` reverse.
//!
//! ## Lifecycle
//!
//! ```text
//! parse   (table build)   syntax errors        → TranslationError::Syntax
//! bind    (translate)     unresolved names     → TranslationError::UndefinedName
//! evaluate (ParameterSpace::evaluate)
//!                         arithmetic failures  → DivideByZero / Domain
//! ```
//!
//! Binding replaces every name with the parameter value it refers to, so a
//! bound expression no longer depends on the namespace it was bound against
//! and can be evaluated lazily, once the target shape is known.
//!
//! ## Grammar
//!
//! ```text
//! expr  := term (('+' | '-') term)*
//! term  := unary (('*' | '/') unary)*
//! unary := ('-' | '+') unary | power
//! power := atom ('**' unary)?
//! atom  := number | name | function '(' expr ')' | '(' expr ')'
//! ```
//!
//! Functions: `exp`, `log`, `sqrt`, `abs`, `round` (half to even).

use crate::error::{ParameterResult, TranslationError, TranslationResult};
use crate::parameter_space::{ParameterValue, Value};
use ndarray::Array1;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "**",
        }
    }

    fn apply(self, lhs: f64, rhs: f64, source: &str) -> TranslationResult<f64> {
        match self {
            BinaryOp::Add => Ok(lhs + rhs),
            BinaryOp::Sub => Ok(lhs - rhs),
            BinaryOp::Mul => Ok(lhs * rhs),
            BinaryOp::Div => {
                if rhs == 0.0 {
                    Err(TranslationError::DivideByZero {
                        expression: source.to_string(),
                    })
                } else {
                    Ok(lhs / rhs)
                }
            }
            BinaryOp::Pow => {
                if lhs == 0.0 && rhs < 0.0 {
                    Err(TranslationError::DivideByZero {
                        expression: source.to_string(),
                    })
                } else {
                    Ok(lhs.powf(rhs))
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Exp,
    Log,
    Sqrt,
    Abs,
    Round,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "exp" => Some(Function::Exp),
            "log" => Some(Function::Log),
            "sqrt" => Some(Function::Sqrt),
            "abs" => Some(Function::Abs),
            "round" => Some(Function::Round),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::Exp => "exp",
            Function::Log => "log",
            Function::Sqrt => "sqrt",
            Function::Abs => "abs",
            Function::Round => "round",
        }
    }

    fn apply(self, value: f64, source: &str) -> TranslationResult<f64> {
        let domain_error = || TranslationError::Domain {
            function: self.name(),
            value,
            expression: source.to_string(),
        };
        match self {
            Function::Exp => Ok(value.exp()),
            Function::Log if value <= 0.0 => Err(domain_error()),
            Function::Log => Ok(value.ln()),
            Function::Sqrt if value < 0.0 => Err(domain_error()),
            Function::Sqrt => Ok(value.sqrt()),
            Function::Abs => Ok(value.abs()),
            Function::Round => Ok(value.round_ties_even()),
        }
    }
}

/// Unbound syntax tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Name(String),
    Negate(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(Function, Box<Expr>),
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", n),
            Expr::Name(name) => f.write_str(name),
            Expr::Negate(inner) => write!(f, "-({})", inner),
            Expr::Binary(op, lhs, rhs) => write!(f, "({} {} {})", lhs, op.symbol(), rhs),
            Expr::Call(func, arg) => write!(f, "{}({})", func.name(), arg),
        }
    }
}

/// A parsed transform expression
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    root: Expr,
}

impl Expression {
    /// Parse an expression
    ///
    /// # Example
    /// ```
    /// use neurobridge_parameters::Expression;
    ///
    /// let expr = Expression::parse("c + a").unwrap();
    /// assert_eq!(expr.free_names(), vec!["a".to_string(), "c".to_string()]);
    /// assert!(Expression::parse("c +").is_err());
    /// ```
    pub fn parse(source: &str) -> TranslationResult<Self> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            source,
            tokens,
            pos: 0,
        };
        let root = parser.parse_expr()?;
        if let Some((_, offset)) = parser.peek_with_offset() {
            return Err(parser.syntax_error(offset, "unexpected trailing input"));
        }
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }

    /// Names referenced by the expression, sorted and deduplicated
    pub fn free_names(&self) -> Vec<String> {
        let mut names = BTreeSet::new();
        collect_names(&self.root, &mut names);
        names.into_iter().collect()
    }

    /// Resolve every name through `lookup`, producing a lazily evaluable expression
    pub fn bind<F>(&self, mut lookup: F) -> TranslationResult<LazyExpression>
    where
        F: FnMut(&str) -> Option<ParameterValue>,
    {
        let root = bind_node(&self.root, &mut lookup, &self.source)?;
        Ok(LazyExpression {
            source: self.source.clone(),
            root,
        })
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn collect_names(expr: &Expr, names: &mut BTreeSet<String>) {
    match expr {
        Expr::Number(_) => {}
        Expr::Name(name) => {
            names.insert(name.clone());
        }
        Expr::Negate(inner) | Expr::Call(_, inner) => collect_names(inner, names),
        Expr::Binary(_, lhs, rhs) => {
            collect_names(lhs, names);
            collect_names(rhs, names);
        }
    }
}

fn bind_node<F>(expr: &Expr, lookup: &mut F, source: &str) -> TranslationResult<BoundExpr>
where
    F: FnMut(&str) -> Option<ParameterValue>,
{
    Ok(match expr {
        Expr::Number(n) => BoundExpr::Constant(*n),
        Expr::Name(name) => match lookup(name) {
            Some(value) => BoundExpr::Operand(value),
            None => {
                return Err(TranslationError::UndefinedName {
                    name: name.clone(),
                    expression: source.to_string(),
                })
            }
        },
        Expr::Negate(inner) => BoundExpr::Negate(Box::new(bind_node(inner, lookup, source)?)),
        Expr::Binary(op, lhs, rhs) => BoundExpr::Binary(
            *op,
            Box::new(bind_node(lhs, lookup, source)?),
            Box::new(bind_node(rhs, lookup, source)?),
        ),
        Expr::Call(func, arg) => BoundExpr::Call(*func, Box::new(bind_node(arg, lookup, source)?)),
    })
}

/// Expression tree whose names have been replaced by parameter values
#[derive(Debug, Clone)]
pub enum BoundExpr {
    Constant(f64),
    Operand(ParameterValue),
    Negate(Box<BoundExpr>),
    Binary(BinaryOp, Box<BoundExpr>, Box<BoundExpr>),
    Call(Function, Box<BoundExpr>),
}

impl BoundExpr {
    fn is_homogeneous(&self) -> bool {
        match self {
            BoundExpr::Constant(_) => true,
            BoundExpr::Operand(value) => value.is_homogeneous(),
            BoundExpr::Negate(inner) | BoundExpr::Call(_, inner) => inner.is_homogeneous(),
            BoundExpr::Binary(_, lhs, rhs) => lhs.is_homogeneous() && rhs.is_homogeneous(),
        }
    }

    fn evaluate(&self, shape: Option<usize>, name: &str, source: &str) -> ParameterResult<Value> {
        match self {
            BoundExpr::Constant(n) => Ok(Value::Scalar(*n)),
            BoundExpr::Operand(value) => value.evaluate(shape, name),
            BoundExpr::Negate(inner) => {
                let value = inner.evaluate(shape, name, source)?;
                Ok(map_value(value, |x| Ok(-x))?)
            }
            BoundExpr::Call(func, inner) => {
                let value = inner.evaluate(shape, name, source)?;
                Ok(map_value(value, |x| func.apply(x, source))?)
            }
            BoundExpr::Binary(op, lhs, rhs) => {
                let lhs = lhs.evaluate(shape, name, source)?;
                let rhs = rhs.evaluate(shape, name, source)?;
                zip_values(lhs, rhs, name, |a, b| op.apply(a, b, source))
            }
        }
    }
}

/// A bound expression, evaluated on demand
#[derive(Debug, Clone)]
pub struct LazyExpression {
    source: String,
    root: BoundExpr,
}

impl LazyExpression {
    /// `operand <op> constant`, used for deferred scale factors
    pub(crate) fn with_constant(operand: ParameterValue, op: BinaryOp, constant: f64) -> Self {
        Self {
            source: format!("x {} {}", op.symbol(), constant),
            root: BoundExpr::Binary(
                op,
                Box::new(BoundExpr::Operand(operand)),
                Box::new(BoundExpr::Constant(constant)),
            ),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// True when every operand is homogeneous
    pub fn is_homogeneous(&self) -> bool {
        self.root.is_homogeneous()
    }

    /// Evaluate to a scalar or an array of length `shape`
    pub fn evaluate(&self, shape: Option<usize>, name: &str) -> ParameterResult<Value> {
        self.root.evaluate(shape, name, &self.source)
    }
}

fn map_value<F>(value: Value, f: F) -> TranslationResult<Value>
where
    F: Fn(f64) -> TranslationResult<f64>,
{
    match value {
        Value::Scalar(x) => Ok(Value::Scalar(f(x)?)),
        Value::Array(values) => {
            let mapped = values.iter().map(|&x| f(x)).collect::<TranslationResult<Vec<_>>>()?;
            Ok(Value::Array(Array1::from(mapped)))
        }
    }
}

fn zip_values<F>(lhs: Value, rhs: Value, name: &str, f: F) -> ParameterResult<Value>
where
    F: Fn(f64, f64) -> TranslationResult<f64>,
{
    let result = match (lhs, rhs) {
        (Value::Scalar(a), Value::Scalar(b)) => Value::Scalar(f(a, b)?),
        (Value::Array(a), Value::Scalar(b)) => Value::Array(Array1::from(
            a.iter().map(|&x| f(x, b)).collect::<TranslationResult<Vec<_>>>()?,
        )),
        (Value::Scalar(a), Value::Array(b)) => Value::Array(Array1::from(
            b.iter().map(|&y| f(a, y)).collect::<TranslationResult<Vec<_>>>()?,
        )),
        (Value::Array(a), Value::Array(b)) => {
            if a.len() != b.len() {
                return Err(crate::error::ParameterError::ShapeMismatch {
                    name: name.to_string(),
                    expected: a.len(),
                    actual: b.len(),
                });
            }
            Value::Array(Array1::from(
                a.iter()
                    .zip(b.iter())
                    .map(|(&x, &y)| f(x, y))
                    .collect::<TranslationResult<Vec<_>>>()?,
            ))
        }
    };
    Ok(result)
}

// ---------------------------------------------------------------------------
// Lexer / parser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    LParen,
    RParen,
}

fn tokenize(source: &str) -> TranslationResult<Vec<(Token, usize)>> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        let start = i;
        let token = match c {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '/' => Token::Slash,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '*' if bytes.get(i + 1) == Some(&b'*') => {
                i += 1;
                Token::StarStar
            }
            '*' => Token::Star,
            c if c.is_ascii_digit() || c == '.' => {
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                    i += 1;
                }
                if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
                    let mut j = i + 1;
                    if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
                        j += 1;
                    }
                    if j < bytes.len() && bytes[j].is_ascii_digit() {
                        while j < bytes.len() && bytes[j].is_ascii_digit() {
                            j += 1;
                        }
                        i = j;
                    }
                }
                let text = &source[start..i];
                let value = text.parse::<f64>().map_err(|_| TranslationError::Syntax {
                    expression: source.to_string(),
                    offset: start,
                    message: format!("invalid number '{}'", text),
                })?;
                tokens.push((Token::Number(value), start));
                continue;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                tokens.push((Token::Ident(source[start..i].to_string()), start));
                continue;
            }
            other => {
                return Err(TranslationError::Syntax {
                    expression: source.to_string(),
                    offset: start,
                    message: format!("unexpected character '{}'", other),
                })
            }
        };
        tokens.push((token, start));
        i += 1;
    }
    Ok(tokens)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_with_offset(&self) -> Option<(&Token, usize)> {
        self.tokens.get(self.pos).map(|(t, o)| (t, *o))
    }

    fn advance(&mut self) -> Option<(Token, usize)> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn syntax_error(&self, offset: usize, message: &str) -> TranslationError {
        TranslationError::Syntax {
            expression: self.source.to_string(),
            offset,
            message: message.to_string(),
        }
    }

    fn parse_expr(&mut self) -> TranslationResult<Expr> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_term(&mut self) -> TranslationResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_unary(&mut self) -> TranslationResult<Expr> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(Expr::Negate(Box::new(self.parse_unary()?)))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.parse_unary()
            }
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> TranslationResult<Expr> {
        let base = self.parse_atom()?;
        if let Some(Token::StarStar) = self.peek() {
            self.pos += 1;
            let exponent = self.parse_unary()?;
            return Ok(Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn parse_atom(&mut self) -> TranslationResult<Expr> {
        let end = self.source.len();
        match self.advance() {
            Some((Token::Number(n), _)) => Ok(Expr::Number(n)),
            Some((Token::Ident(name), offset)) => {
                if let Some(Token::LParen) = self.peek() {
                    let func = Function::from_name(&name)
                        .ok_or_else(|| self.syntax_error(offset, &format!("unknown function '{}'", name)))?;
                    self.pos += 1;
                    let arg = self.parse_expr()?;
                    self.expect_rparen()?;
                    Ok(Expr::Call(func, Box::new(arg)))
                } else {
                    Ok(Expr::Name(name))
                }
            }
            Some((Token::LParen, _)) => {
                let inner = self.parse_expr()?;
                self.expect_rparen()?;
                Ok(inner)
            }
            Some((_, offset)) => Err(self.syntax_error(offset, "expected a number, name or '('")),
            None => Err(self.syntax_error(end, "unexpected end of expression")),
        }
    }

    fn expect_rparen(&mut self) -> TranslationResult<()> {
        let end = self.source.len();
        match self.advance() {
            Some((Token::RParen, _)) => Ok(()),
            Some((_, offset)) => Err(self.syntax_error(offset, "expected ')'")),
            None => Err(self.syntax_error(end, "expected ')'")),
        }
    }
}
