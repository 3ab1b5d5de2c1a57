use std::f64;
use std::fmt;
use crate::errors::{EvalError, Result};


// Binding strength of operators, weakest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Precedence {
    None,
    Brace,
    Addition,
    Multiply,
    Unary,
    Power,
}


// Operators can be implemented using functions that take various numbers of parameters.
pub enum OpFunction {
    Nullary (fn()           -> f64),
    Unary   (fn(f64)        -> Result<f64>),
    Binary  (fn(f64, f64)   -> Result<f64>),
    Variadic(fn(&[f64])     -> Result<f64>),
    Invalid,
}


// Implementation of an operator, builtin function or named constant.
pub struct Operator {
    pub name:                 &'static str,
    pub precedence:           Precedence,
    pub min_arity:            usize,
    pub max_arity:            usize,
    pub is_right_associative: bool,
    pub function:             OpFunction,
}


pub type OperatorRef = &'static Operator;


impl Operator {
    pub fn accepts(&self, count: usize) -> bool {
        (self.min_arity ..= self.max_arity).contains(&count)
    }


    pub fn is_binary(&self) -> bool {
        matches!(self.function, OpFunction::Binary(_))
    }


    // Human readable argument count, eg. "1 argument" or "1 to 2 arguments".
    pub fn arity_description(&self) -> String {
        let noun = if self.max_arity == 1 { "argument" } else { "arguments" };

        if self.min_arity == self.max_arity {
            format!("{} {}", self.min_arity, noun)
        }
        else {
            format!("{} to {} {}", self.min_arity, self.max_arity, noun)
        }
    }


    pub fn apply(&self, args: &[f64]) -> Result<f64> {
        match (&self.function, args) {
            (OpFunction::Nullary(function),  [])     => Ok(function()),
            (OpFunction::Unary(function),    [x])    => function(*x),
            (OpFunction::Binary(function),   [x, y]) => function(*x, *y),
            (OpFunction::Variadic(function), args) if self.accepts(args.len()) => function(args),

            _ => Err(EvalError::Syntax(format!("'{}' cannot be applied to {} argument(s)", self.name, args.len())))
        }
    }
}


impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Operator({})", self.name)
    }
}


// Macros reduce repetitititiveness of filling in the operator table.
macro_rules! operators {
    ($($element:tt),*) => {
        [ $(operator! $element),* ]
    };
}


macro_rules! operator {
    // Matches a named constant.
    ($name:literal, || $expression:expr) => {
        Operator { name: $name, precedence: Precedence::None, min_arity: 0, max_arity: 0, is_right_associative: false, function: OpFunction::Nullary(|| -> f64 { $expression }) }
    };

    // Matches a unary function.
    ($name:literal, |$x:ident| $expression:expr) => {
        Operator { name: $name, precedence: Precedence::None, min_arity: 1, max_arity: 1, is_right_associative: false, function: OpFunction::Unary(|$x: f64| -> Result<f64> { $expression }) }
    };

    // Matches a function with optional trailing arguments. Must come before the
    // operator arms, which would otherwise read the arity range as a precedence.
    ($name:literal, $min:literal ..= $max:literal, |$args:ident| $expression:expr) => {
        Operator { name: $name, precedence: Precedence::None, min_arity: $min, max_arity: $max, is_right_associative: false, function: OpFunction::Variadic(|$args: &[f64]| -> Result<f64> { $expression }) }
    };

    // Matches a unary operator.
    ($name:literal, $precedence:expr, |$x:ident| $expression:expr) => {
        Operator { name: $name, precedence: $precedence, min_arity: 1, max_arity: 1, is_right_associative: false, function: OpFunction::Unary(|$x: f64| -> Result<f64> { $expression }) }
    };

    // Matches a binary operator.
    ($name:literal, $precedence:expr, |$x:ident, $y:ident| $expression:expr) => {
        Operator { name: $name, precedence: $precedence, min_arity: 2, max_arity: 2, is_right_associative: false, function: OpFunction::Binary(|$x: f64, $y: f64| -> Result<f64> { $expression }) }
    };

    // Matches a right associative binary operator, identified by "right" marker keyword.
    ($name:literal, $precedence:expr, right |$x:ident, $y:ident| $expression:expr) => {
        Operator { name: $name, precedence: $precedence, min_arity: 2, max_arity: 2, is_right_associative: true, function: OpFunction::Binary(|$x: f64, $y: f64| -> Result<f64> { $expression }) }
    };

    // Matches punctuation that does not have any evaluation function.
    ($name:literal, $precedence:expr) => {
        Operator { name: $name, precedence: $precedence, min_arity: 0, max_arity: 0, is_right_associative: false, function: OpFunction::Invalid }
    };
}


// Fails with a domain error unless the precondition holds.
fn require(condition: bool, message: &str) -> Result<()> {
    if condition {
        Ok(())
    }
    else {
        Err(EvalError::Domain(String::from(message)))
    }
}


// Floored modulo: the result takes the sign of the divisor.
fn modulo(x: f64, y: f64) -> Result<f64> {
    require(y != 0.0, "division by zero")?;

    let remainder = x % y;

    if remainder != 0.0 && (remainder < 0.0) != (y < 0.0) {
        Ok(remainder + y)
    }
    else {
        Ok(remainder)
    }
}


fn power(x: f64, y: f64) -> Result<f64> {
    require(x != 0.0 || y >= 0.0, "zero cannot be raised to a negative power")?;
    require(x >= 0.0 || y.fract() == 0.0, "negative base requires an integral exponent")?;

    Ok(x.powf(y))
}


fn logarithm(args: &[f64]) -> Result<f64> {
    match *args {
        [x] => {
            require(x > 0.0, "log requires a positive argument")?;
            Ok(x.log10())
        }

        [x, base] => {
            require(x > 0.0, "log requires a positive argument")?;
            require(base > 0.0 && base != 1.0, "log base must be positive and not equal to 1")?;
            Ok(x.log(base))
        }

        _ => Err(EvalError::Syntax(format!("log takes 1 or 2 arguments, not {}", args.len())))
    }
}


// Largest n whose factorial fits in an f64.
const MAX_FACTORIAL: f64 = 170.0;


fn factorial(x: f64) -> Result<f64> {
    require(x >= 0.0 && x.fract() == 0.0, "factorial requires a non-negative integer")?;
    require(x <= MAX_FACTORIAL, "factorial argument is too large")?;

    Ok((2 ..= x as u32).fold(1.0, |product, k| product * f64::from(k)))
}


pub static OPERATORS: [Operator; 9] = operators![
    // Punctuation, never evaluated.
    { "(",   Precedence::Brace },
    { ")",   Precedence::Brace },
    { ",",   Precedence::Brace },

    // Arithmetic.
    { "+",   Precedence::Addition,       |x, y| Ok(x + y) },
    { "-",   Precedence::Addition,       |x, y| Ok(x - y) },
    { "*",   Precedence::Multiply,       |x, y| Ok(x * y) },
    { "/",   Precedence::Multiply,       |x, y| { require(y != 0.0, "division by zero")?; Ok(x / y) } },
    { "%",   Precedence::Multiply,       |x, y| modulo(x, y) },
    { "**",  Precedence::Power,    right |x, y| power(x, y) }
];


// Alternate spellings, mapped onto their canonical operator.
pub static ALIASES: [(&str, &str); 1] = [
    ( "^", "**" ),
];


pub static FUNCTIONS: [Operator; 13] = operators![
    // Math functions.
    { "sqrt",      |x| { require(x >= 0.0, "sqrt requires a non-negative argument")?; Ok(x.sqrt()) } },
    { "exp",       |x| Ok(x.exp()) },
    { "ln",        |x| { require(x > 0.0, "ln requires a positive argument")?; Ok(x.ln()) } },
    { "log",       1 ..= 2, |args| logarithm(args) },
    { "abs",       |x| Ok(x.abs()) },
    { "ceil",      |x| Ok(x.ceil()) },
    { "floor",     |x| Ok(x.floor()) },
    { "factorial", |x| factorial(x) },

    // Trig, always in radians.
    { "sin",       |x| Ok(x.sin()) },
    { "cos",       |x| Ok(x.cos()) },
    { "tan",       |x| Ok(x.tan()) },

    // Angle conversions.
    { "radians",   |x| Ok(x.to_radians()) },
    { "degrees",   |x| Ok(x.to_degrees()) }
];


pub static CONSTANTS: [Operator; 3] = operators![
    { "pi", || f64::consts::PI },
    { "π",  || f64::consts::PI },
    { "e",  || f64::consts::E  }
];


// Names the most recent result, supplied by the caller rather than the table.
pub const ANSWER: &str = "ans";


// Special operators, not accessible by name.
pub static NEGATE: Operator = operator!{ "-", Precedence::Unary, |x| Ok(-x) };
pub static PLUS:   Operator = operator!{ "+", Precedence::Unary, |x| Ok(x) };


// Resolves aliases such as ^ to their canonical spelling.
pub fn canonical_symbol(symbol: &str) -> &str {
    ALIASES.iter()
           .find(|(alias, _)| *alias == symbol)
           .map_or(symbol, |(_, canonical)| *canonical)
}


pub fn find_operator(symbol: &str) -> Option<OperatorRef> {
    let symbol = canonical_symbol(symbol);

    OPERATORS.iter().find(|op| op.name == symbol)
}

pub fn find_function(name: &str) -> Option<OperatorRef> {
    FUNCTIONS.iter().find(|op| op.name == name)
}

pub fn find_constant(name: &str) -> Option<OperatorRef> {
    CONSTANTS.iter().find(|op| op.name == name)
}


pub fn find_unary_operator(symbol: &str) -> Option<OperatorRef> {
    match symbol {
        "-" => Some(&NEGATE),
        "+" => Some(&PLUS),
        _   => None
    }
}


fn symbols() -> impl Iterator<Item = &'static str> {
    OPERATORS.iter()
             .map(|op| op.name)
             .chain(ALIASES.iter().map(|(alias, _)| *alias))
}


pub fn is_symbol(text: &str) -> bool {
    symbols().any(|symbol| symbol == text)
}


// Could more input still turn this text into an operator?
pub fn is_symbol_prefix(text: &str) -> bool {
    symbols().any(|symbol| symbol.starts_with(text))
}


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AngleUnit {
    Radians,
    Degrees,
}


// Degree-aware trig for callers outside the expression grammar, which only ever sees radians.
pub fn trig(name: &str, angle: f64, unit: AngleUnit) -> Result<f64> {
    let function = match name {
        "sin" | "cos" | "tan" => find_function(name),
        _ => None
    };

    let function = function.ok_or_else(|| EvalError::UnknownName(String::from(name)))?;

    let angle = match unit {
        AngleUnit::Radians => angle,
        AngleUnit::Degrees => angle.to_radians(),
    };

    function.apply(&[ angle ])
}
