//! Integer/boolean expression evaluation shared by the preprocessor and the
//! elaborators.
//!
//! The language covers arbitrary-precision integer arithmetic (`+ - * ** //
//! / % << >>`), boolean logic (`and or not`), comparisons (`== != < <= > >=`),
//! parentheses, string and list literals, and the `range(..)` builtin used by
//! `#for` iterables. `/` is a legacy synonym for floor division `//`.
//! Identifiers resolve through a caller-supplied [`Resolver`]; evaluation is
//! strict.

use num_bigint::BigInt;
use num_traits::{Pow, Signed, ToPrimitive, Zero};
use std::fmt;

/// The result of evaluating an expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    /// An arbitrary-precision integer.
    Int(BigInt),
    /// A boolean.
    Bool(bool),
    /// A string (from a quoted literal or a string-valued binding).
    Str(String),
    /// A finite list, produced by a list literal or `range(..)`.
    List(Vec<Value>),
}

impl Value {
    /// Convenience constructor for small integer values.
    pub fn int(v: i64) -> Self {
        Value::Int(BigInt::from(v))
    }

    /// Coerces the value to an integer, treating booleans as 0/1.
    ///
    /// Returns an error for strings and lists.
    pub fn as_int(&self) -> Result<BigInt, EvalError> {
        match self {
            Value::Int(v) => Ok(v.clone()),
            Value::Bool(b) => Ok(BigInt::from(*b as u8)),
            other => Err(EvalError::Type(format!(
                "expected an integer, found {other}"
            ))),
        }
    }

    /// Interprets the value as a predicate.
    ///
    /// Zero, `false`, the empty string, and the empty list are falsy.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Int(v) => !v.is_zero(),
            Value::Bool(b) => *b,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Resolves identifiers encountered during evaluation.
///
/// Returning `Ok(None)` means the name is unbound, which surfaces as an
/// [`EvalError::UnknownName`]. Resolvers that evaluate bindings recursively
/// may return their own errors (for example a recursion limit).
pub trait Resolver {
    /// Looks up a name, returning its value if bound.
    fn resolve(&self, name: &str) -> Result<Option<Value>, EvalError>;
}

/// The empty resolver: every name is unbound.
impl Resolver for () {
    fn resolve(&self, _name: &str) -> Result<Option<Value>, EvalError> {
        Ok(None)
    }
}

impl Resolver for std::collections::HashMap<String, Value> {
    fn resolve(&self, name: &str) -> Result<Option<Value>, EvalError> {
        Ok(self.get(name).cloned())
    }
}

/// Errors raised while evaluating an expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    /// The expression text could not be parsed.
    #[error("syntax error in expression: {0}")]
    Syntax(String),
    /// An identifier did not resolve to a value.
    #[error("unknown name `{0}` in expression")]
    UnknownName(String),
    /// An operand had the wrong type for its operator.
    #[error("type error: {0}")]
    Type(String),
    /// Division or modulo by zero.
    #[error("division by zero")]
    DivideByZero,
    /// Recursive binding resolution exceeded the depth limit.
    #[error("recursion limit exceeded while resolving `{0}`")]
    Recursion(String),
}

/// Evaluates an expression string against a resolver.
pub fn evaluate(text: &str, resolver: &dyn Resolver) -> Result<Value, EvalError> {
    let tokens = tokenize(text)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        resolver,
    };
    let value = parser.parse_or()?;
    if parser.pos != parser.tokens.len() {
        return Err(EvalError::Syntax(format!(
            "trailing input in expression `{text}`"
        )));
    }
    Ok(value)
}

/// Evaluates an expression string, requiring an integer result.
pub fn evaluate_int(text: &str, resolver: &dyn Resolver) -> Result<BigInt, EvalError> {
    evaluate(text, resolver)?.as_int()
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Int(BigInt),
    Str(String),
    Ident(String),
    And,
    Or,
    Not,
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    Shl,
    Shr,
    EqEq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
}

fn tokenize(text: &str) -> Result<Vec<Token>, EvalError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' => i += 1,
            '0'..='9' => {
                let start = i;
                // Hex and binary literals
                let radix = if c == '0' && i + 1 < chars.len() {
                    match chars[i + 1] {
                        'x' | 'X' => 16,
                        'b' | 'B' => 2,
                        _ => 10,
                    }
                } else {
                    10
                };
                if radix != 10 {
                    i += 2;
                    let digits_start = i;
                    while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                        i += 1;
                    }
                    let digits: String =
                        chars[digits_start..i].iter().filter(|c| **c != '_').collect();
                    let value = BigInt::parse_bytes(digits.as_bytes(), radix).ok_or_else(|| {
                        EvalError::Syntax(format!(
                            "bad literal `{}`",
                            chars[start..i].iter().collect::<String>()
                        ))
                    })?;
                    tokens.push(Token::Int(value));
                } else {
                    while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '_') {
                        i += 1;
                    }
                    let digits: String = chars[start..i].iter().filter(|c| **c != '_').collect();
                    let value = BigInt::parse_bytes(digits.as_bytes(), 10)
                        .ok_or_else(|| EvalError::Syntax(format!("bad literal `{digits}`")))?;
                    tokens.push(Token::Int(value));
                }
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(match word.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    _ => Token::Ident(word),
                });
            }
            '"' | '\'' => {
                let quote = c;
                i += 1;
                let start = i;
                while i < chars.len() && chars[i] != quote {
                    i += 1;
                }
                if i >= chars.len() {
                    return Err(EvalError::Syntax("unterminated string literal".into()));
                }
                tokens.push(Token::Str(chars[start..i].iter().collect()));
                i += 1;
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                if chars.get(i + 1) == Some(&'*') {
                    tokens.push(Token::DoubleStar);
                    i += 2;
                } else {
                    tokens.push(Token::Star);
                    i += 1;
                }
            }
            '/' => {
                if chars.get(i + 1) == Some(&'/') {
                    tokens.push(Token::DoubleSlash);
                    i += 2;
                } else {
                    tokens.push(Token::Slash);
                    i += 1;
                }
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::EqEq);
                    i += 2;
                } else {
                    return Err(EvalError::Syntax("single `=` is not an operator".into()));
                }
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Ne);
                    i += 2;
                } else {
                    return Err(EvalError::Syntax("stray `!`".into()));
                }
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Le);
                    i += 2;
                } else if chars.get(i + 1) == Some(&'<') {
                    tokens.push(Token::Shl);
                    i += 2;
                } else if let Some(end) = bracketed_name_end(&chars, i) {
                    // `<NAME>` is an explicit reference to a defined value
                    let word: String = chars[i + 1..end].iter().collect();
                    tokens.push(Token::Ident(word));
                    i = end + 1;
                } else {
                    tokens.push(Token::Lt);
                    i += 1;
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Ge);
                    i += 2;
                } else if chars.get(i + 1) == Some(&'>') {
                    tokens.push(Token::Shr);
                    i += 2;
                } else {
                    tokens.push(Token::Gt);
                    i += 1;
                }
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            other => {
                return Err(EvalError::Syntax(format!("unexpected character `{other}`")));
            }
        }
    }
    Ok(tokens)
}

/// Recognizes `<NAME>` starting at `chars[start] == '<'`, returning the index
/// of the closing `>`.
fn bracketed_name_end(chars: &[char], start: usize) -> Option<usize> {
    let mut i = start + 1;
    if i >= chars.len() || !(chars[i].is_ascii_alphabetic() || chars[i] == '_') {
        return None;
    }
    while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
        i += 1;
    }
    if i < chars.len() && chars[i] == '>' {
        Some(i)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Parser / evaluator
// ---------------------------------------------------------------------------

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    resolver: &'a dyn Resolver,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<Value, EvalError> {
        let mut lhs = self.parse_and()?;
        while self.eat(&Token::Or) {
            let rhs = self.parse_and()?;
            lhs = Value::Bool(lhs.truthy() || rhs.truthy());
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Value, EvalError> {
        let mut lhs = self.parse_not()?;
        while self.eat(&Token::And) {
            let rhs = self.parse_not()?;
            lhs = Value::Bool(lhs.truthy() && rhs.truthy());
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Value, EvalError> {
        if self.eat(&Token::Not) {
            let operand = self.parse_not()?;
            Ok(Value::Bool(!operand.truthy()))
        } else {
            self.parse_cmp()
        }
    }

    fn parse_cmp(&mut self) -> Result<Value, EvalError> {
        let lhs = self.parse_shift()?;
        let op = match self.peek() {
            Some(Token::EqEq) => Token::EqEq,
            Some(Token::Ne) => Token::Ne,
            Some(Token::Lt) => Token::Lt,
            Some(Token::Le) => Token::Le,
            Some(Token::Gt) => Token::Gt,
            Some(Token::Ge) => Token::Ge,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.parse_shift()?;
        compare(&op, &lhs, &rhs)
    }

    fn parse_shift(&mut self) -> Result<Value, EvalError> {
        let mut lhs = self.parse_add()?;
        loop {
            let shl = match self.peek() {
                Some(Token::Shl) => true,
                Some(Token::Shr) => false,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_add()?;
            let amount = rhs
                .as_int()?
                .to_usize()
                .ok_or_else(|| EvalError::Type("shift amount out of range".into()))?;
            let base = lhs.as_int()?;
            lhs = Value::Int(if shl { base << amount } else { base >> amount });
        }
        Ok(lhs)
    }

    fn parse_add(&mut self) -> Result<Value, EvalError> {
        let mut lhs = self.parse_mul()?;
        loop {
            let plus = match self.peek() {
                Some(Token::Plus) => true,
                Some(Token::Minus) => false,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_mul()?;
            lhs = if plus {
                match (&lhs, &rhs) {
                    (Value::Str(a), Value::Str(b)) => Value::Str(format!("{a}{b}")),
                    _ => Value::Int(lhs.as_int()? + rhs.as_int()?),
                }
            } else {
                Value::Int(lhs.as_int()? - rhs.as_int()?)
            };
        }
        Ok(lhs)
    }

    fn parse_mul(&mut self) -> Result<Value, EvalError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => Token::Star,
                Some(Token::Slash) => Token::Slash,
                Some(Token::DoubleSlash) => Token::DoubleSlash,
                Some(Token::Percent) => Token::Percent,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_unary()?;
            let a = lhs.as_int()?;
            let b = rhs.as_int()?;
            lhs = Value::Int(match op {
                Token::Star => a * b,
                // `/` is a legacy synonym for floor division
                Token::Slash | Token::DoubleSlash => floor_div(&a, &b)?,
                Token::Percent => floor_mod(&a, &b)?,
                _ => unreachable!(),
            });
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Value, EvalError> {
        if self.eat(&Token::Minus) {
            let operand = self.parse_unary()?;
            Ok(Value::Int(-operand.as_int()?))
        } else {
            self.parse_power()
        }
    }

    fn parse_power(&mut self) -> Result<Value, EvalError> {
        let base = self.parse_atom()?;
        if self.eat(&Token::DoubleStar) {
            let exponent = self.parse_unary()?.as_int()?;
            if exponent.is_negative() {
                return Err(EvalError::Type("negative exponent".into()));
            }
            let exponent = exponent
                .to_u32()
                .ok_or_else(|| EvalError::Type("exponent out of range".into()))?;
            Ok(Value::Int(Pow::pow(base.as_int()?, exponent)))
        } else {
            Ok(base)
        }
    }

    fn parse_atom(&mut self) -> Result<Value, EvalError> {
        match self.bump() {
            Some(Token::Int(v)) => Ok(Value::Int(v)),
            Some(Token::Str(s)) => Ok(Value::Str(s)),
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    return self.parse_call(&name);
                }
                match name.as_str() {
                    "true" | "True" => Ok(Value::Bool(true)),
                    "false" | "False" => Ok(Value::Bool(false)),
                    _ => match self.resolver.resolve(&name)? {
                        Some(value) => Ok(value),
                        None => Err(EvalError::UnknownName(name)),
                    },
                }
            }
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                if !self.eat(&Token::RParen) {
                    return Err(EvalError::Syntax("expected `)`".into()));
                }
                Ok(inner)
            }
            Some(Token::LBracket) => {
                let mut items = Vec::new();
                if !self.eat(&Token::RBracket) {
                    loop {
                        items.push(self.parse_or()?);
                        if self.eat(&Token::RBracket) {
                            break;
                        }
                        if !self.eat(&Token::Comma) {
                            return Err(EvalError::Syntax("expected `,` or `]`".into()));
                        }
                    }
                }
                Ok(Value::List(items))
            }
            other => Err(EvalError::Syntax(format!(
                "unexpected token {other:?} in expression"
            ))),
        }
    }

    fn parse_call(&mut self, name: &str) -> Result<Value, EvalError> {
        let mut args = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                args.push(self.parse_or()?);
                if self.eat(&Token::RParen) {
                    break;
                }
                if !self.eat(&Token::Comma) {
                    return Err(EvalError::Syntax("expected `,` or `)`".into()));
                }
            }
        }
        match name {
            "range" => {
                let (start, end) = match args.len() {
                    1 => (BigInt::from(0), args[0].as_int()?),
                    2 => (args[0].as_int()?, args[1].as_int()?),
                    n => {
                        return Err(EvalError::Type(format!(
                            "range() takes 1 or 2 arguments, got {n}"
                        )))
                    }
                };
                let mut items = Vec::new();
                let mut current = start;
                while current < end {
                    items.push(Value::Int(current.clone()));
                    current += 1;
                }
                Ok(Value::List(items))
            }
            other => Err(EvalError::UnknownName(format!("{other}()"))),
        }
    }
}

fn compare(op: &Token, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    // Equality works across all types; ordering requires integers.
    let result = match op {
        Token::EqEq | Token::Ne => {
            let equal = match (lhs, rhs) {
                (Value::Str(a), Value::Str(b)) => a == b,
                (Value::Str(_), _) | (_, Value::Str(_)) => false,
                (Value::List(a), Value::List(b)) => a == b,
                (Value::List(_), _) | (_, Value::List(_)) => false,
                _ => lhs.as_int()? == rhs.as_int()?,
            };
            if matches!(op, Token::EqEq) {
                equal
            } else {
                !equal
            }
        }
        _ => {
            let a = lhs.as_int()?;
            let b = rhs.as_int()?;
            match op {
                Token::Lt => a < b,
                Token::Le => a <= b,
                Token::Gt => a > b,
                Token::Ge => a >= b,
                _ => unreachable!(),
            }
        }
    };
    Ok(Value::Bool(result))
}

fn floor_div(a: &BigInt, b: &BigInt) -> Result<BigInt, EvalError> {
    if b.is_zero() {
        return Err(EvalError::DivideByZero);
    }
    let q = a / b;
    let r = a - &q * b;
    if !r.is_zero() && (r.is_negative() != b.is_negative()) {
        Ok(q - 1)
    } else {
        Ok(q)
    }
}

fn floor_mod(a: &BigInt, b: &BigInt) -> Result<BigInt, EvalError> {
    let q = floor_div(a, b)?;
    Ok(a - q * b)
}
