use std::iter::Peekable;
use tracing::trace;
use crate::errors::{EvalError, Result};
use crate::ops::{self, OperatorRef, Precedence};
use crate::tokens::{Lexeme, Token, Tokenizer};


// Parentheses, function calls and unary signs deeper than this are rejected.
pub const MAX_DEPTH: usize = 128;

// Bounds the size of the tree, and with it the height of a flat chain such as 1+1+...+1.
pub const MAX_NODES: usize = 2048;


// Expressions are represented as a tree of nodes.
#[derive(Debug)]
pub enum ExpressionNode {
    Constant { value: f64 },
    Operator { op: OperatorRef, args: Vec<ExpressionNode> },
    Function { op: OperatorRef, args: Vec<ExpressionNode> },
}


// The parser turns a series of tokens into an expression tree, by recursive descent
// with one level per precedence.
struct Parser<'a> {
    tokenizer:   Peekable<Tokenizer<'a>>,
    last_answer: f64,
    depth:       usize,
    nodes:       usize,
}


impl<'a> Parser<'a> {
    // Peeks the next token, surfacing tokenizer errors.
    fn peek(&mut self) -> Result<Option<Lexeme<'a>>> {
        match self.tokenizer.peek() {
            Some(Ok(lexeme)) => Ok(Some(*lexeme)),
            Some(Err(error)) => Err(error.clone()),
            None             => Ok(None),
        }
    }


    // Checks whether the next token is the specified operator.
    fn peek_operator(&mut self, symbol: &str) -> Result<bool> {
        Ok(matches!(self.peek()?, Some(Lexeme { token: Token::Operator(op), .. }) if op == symbol))
    }


    fn peek_binary_operator(&mut self, precedence: Precedence) -> Result<Option<OperatorRef>> {
        Ok(match self.peek()? {
            Some(Lexeme { token: Token::Operator(symbol), .. }) => {
                ops::find_operator(symbol).filter(|op| op.is_binary() && op.precedence == precedence)
            }
            _ => None
        })
    }


    fn peek_unary_operator(&mut self) -> Result<Option<OperatorRef>> {
        Ok(match self.peek()? {
            Some(Lexeme { token: Token::Operator(symbol), .. }) => ops::find_unary_operator(symbol),
            _ => None
        })
    }


    // Runs a nested parse, enforcing the depth limit.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_DEPTH {
            return Err(EvalError::Syntax(format!("expression is nested more than {} levels deep", MAX_DEPTH)));
        }

        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;

        result
    }


    // Counts a new tree node against the size limit.
    fn node(&mut self, node: ExpressionNode) -> Result<ExpressionNode> {
        if self.nodes >= MAX_NODES {
            return Err(EvalError::Syntax(format!("expression has more than {} terms", MAX_NODES)));
        }

        self.nodes += 1;

        Ok(node)
    }


    fn parse_expression(&mut self) -> Result<ExpressionNode> {
        self.parse_binary(Precedence::Addition)
    }


    // Parses a chain of binary operators that all share one precedence level.
    fn parse_binary(&mut self, precedence: Precedence) -> Result<ExpressionNode> {
        let mut left = self.parse_operand(precedence)?;

        while let Some(op) = self.peek_binary_operator(precedence)? {
            self.tokenizer.next();

            // The right side of ** may carry its own sign, and recursing through
            // the unary level is what makes it right associative.
            let right = if op.is_right_associative {
                self.nested(Self::parse_unary)?
            }
            else {
                self.parse_operand(precedence)?
            };

            left = self.node(ExpressionNode::Operator { op, args: vec![ left, right ] })?;
        }

        Ok(left)
    }


    // Parses whatever binds tighter than the given precedence level.
    fn parse_operand(&mut self, precedence: Precedence) -> Result<ExpressionNode> {
        match precedence {
            Precedence::Addition => self.parse_binary(Precedence::Multiply),
            Precedence::Multiply => self.parse_unary(),
            _                    => self.parse_primary(),
        }
    }


    // Unary signs bind looser than **, so -2 ** 2 is -(2 ** 2).
    fn parse_unary(&mut self) -> Result<ExpressionNode> {
        match self.peek_unary_operator()? {
            Some(op) => {
                self.tokenizer.next();

                let operand = self.nested(Self::parse_unary)?;

                self.node(ExpressionNode::Operator { op, args: vec![ operand ] })
            }

            None => self.parse_binary(Precedence::Power)
        }
    }


    fn parse_primary(&mut self) -> Result<ExpressionNode> {
        let lexeme = match self.tokenizer.next() {
            Some(lexeme) => lexeme?,
            None => return Err(EvalError::Syntax(String::from("unexpected end of expression"))),
        };

        match lexeme.token {
            Token::Number(value) => self.node(ExpressionNode::Constant { value }),

            Token::Name(name) => self.parse_name(name, lexeme.position),

            Token::Operator("(") => {
                let inner = self.nested(Self::parse_expression)?;

                self.expect_close(lexeme.position)?;

                Ok(inner)
            }

            Token::Operator(_) => Err(unexpected(&lexeme)),
        }
    }


    // Resolves a name against the closed set of constants and functions.
    fn parse_name(&mut self, name: &str, position: usize) -> Result<ExpressionNode> {
        if name == ops::ANSWER {
            let value = self.last_answer;

            return self.node(ExpressionNode::Constant { value });
        }

        if let Some(constant) = ops::find_constant(name) {
            return self.node(ExpressionNode::Constant { value: constant.apply(&[])? });
        }

        let op = ops::find_function(name).ok_or_else(|| EvalError::UnknownName(String::from(name)))?;

        if !self.peek_operator("(")? {
            return Err(EvalError::Syntax(format!("function '{}' at position {} must be followed by '('", name, position)));
        }

        self.tokenizer.next();

        let args = self.nested(|parser| parser.parse_arguments(name))?;

        if !op.accepts(args.len()) {
            return Err(EvalError::Syntax(format!("function '{}' takes {} but was given {}", name, op.arity_description(), args.len())));
        }

        self.node(ExpressionNode::Function { op, args })
    }


    // Parses the arguments of a function call, up to and including the closing brace.
    fn parse_arguments(&mut self, name: &str) -> Result<Vec<ExpressionNode>> {
        let mut args = vec![];

        if self.peek_operator(")")? {
            self.tokenizer.next();
            return Ok(args);
        }

        loop {
            args.push(self.parse_expression()?);

            match self.tokenizer.next() {
                Some(Ok(Lexeme { token: Token::Operator(","), position, .. })) => {
                    if self.peek_operator(")")? {
                        return Err(EvalError::Syntax(format!("missing argument after ',' at position {}", position)));
                    }
                }
                Some(Ok(Lexeme { token: Token::Operator(")"), .. })) => return Ok(args),
                Some(Ok(lexeme)) => return Err(unexpected(&lexeme)),
                Some(Err(error)) => return Err(error),
                None => return Err(EvalError::Syntax(format!("missing ')' after arguments of '{}'", name))),
            }
        }
    }


    fn expect_close(&mut self, open_position: usize) -> Result<()> {
        match self.tokenizer.next() {
            Some(Ok(Lexeme { token: Token::Operator(")"), .. })) => Ok(()),
            Some(Ok(lexeme)) => Err(unexpected(&lexeme)),
            Some(Err(error)) => Err(error),
            None => Err(EvalError::Syntax(format!("missing ')' for '(' at position {}", open_position))),
        }
    }
}


fn unexpected(lexeme: &Lexeme) -> EvalError {
    let what = if lexeme.text == ")" { "unmatched" } else { "unexpected" };

    EvalError::Syntax(format!("{} '{}' at position {}", what, lexeme.text, lexeme.position))
}


// The main expression parser. Constants, including the last answer, are folded
// into the tree as they are read.
pub fn parse(text: &str, last_answer: f64) -> Result<ExpressionNode> {
    let mut parser = Parser {
        tokenizer: Tokenizer::new(text).peekable(),
        last_answer,
        depth: 0,
        nodes: 0,
    };

    if parser.peek()?.is_none() {
        return Err(EvalError::Syntax(String::from("empty expression")));
    }

    let expression = parser.parse_expression()?;

    // Anything left over was not part of the expression.
    match parser.tokenizer.next() {
        None => {},
        Some(Ok(lexeme)) => return Err(unexpected(&lexeme)),
        Some(Err(error)) => return Err(error),
    }

    trace!(?expression, "parsed");

    Ok(expression)
}


// Walks the tree bottom up.
pub fn evaluate(expression: &ExpressionNode) -> Result<f64> {
    match expression {
        ExpressionNode::Constant { value } => Ok(*value),

        ExpressionNode::Operator { op, args } | ExpressionNode::Function { op, args } => {
            let mut values = Vec::with_capacity(args.len());

            for arg in args {
                values.push(evaluate(arg)?);
            }

            let value = op.apply(&values)?;

            if value.is_finite() {
                Ok(value)
            }
            else {
                Err(EvalError::Domain(format!("result of '{}' is too large to represent", op.name)))
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;


    fn eval(text: &str) -> Result<f64> {
        evaluate(&parse(text, 0.0)?)
    }


    fn syntax_error(text: &str) -> String {
        match eval(text) {
            Err(EvalError::Syntax(message)) => message,
            other => panic!("expected a syntax error for {:?}, got {:?}", text, other),
        }
    }


    #[test]
    fn precedence() {
        assert_eq!(eval("2 + 3 * 4"),   Ok(14.0));
        assert_eq!(eval("(2 + 3) * 4"), Ok(20.0));
        assert_eq!(eval("10 - 4 - 3"),  Ok(3.0));
        assert_eq!(eval("100 / 10 / 5"), Ok(2.0));
        assert_eq!(eval("7 % 4 * 2"),   Ok(6.0));
        assert_eq!(eval("2 * 3 ** 2"),  Ok(18.0));
    }


    #[test]
    fn power_is_right_associative() {
        assert_eq!(eval("2 ** 3 ** 2"), Ok(512.0));
        assert_eq!(eval("2 ^ 3 ^ 2"),   Ok(512.0));
        assert_eq!(eval("(2 ** 3) ** 2"), Ok(64.0));
    }


    #[test]
    fn unary_signs() {
        assert_eq!(eval("-2 ** 2"),  Ok(-4.0));
        assert_eq!(eval("(-2) ** 2"), Ok(4.0));
        assert_eq!(eval("2 ** -1"),  Ok(0.5));
        assert_eq!(eval("2 * -3"),   Ok(-6.0));
        assert_eq!(eval("--3"),      Ok(3.0));
        assert_eq!(eval("+3 - -3"),  Ok(6.0));
        assert_eq!(eval("-3 * 2"),   Ok(-6.0));
    }


    #[test]
    fn function_calls() {
        assert_eq!(eval("sqrt(16) + 5"), Ok(9.0));
        assert_eq!(eval("abs(-2 * 3)"), Ok(6.0));
        assert_eq!(eval("factorial(5)"), Ok(120.0));
        assert_eq!(eval("floor(sqrt(10))"), Ok(3.0));
        assert!((eval("log(8, 2)").unwrap() - 3.0).abs() < 1e-12);
        assert!((eval("exp(1)").unwrap() - std::f64::consts::E).abs() < 1e-12);
    }


    #[test]
    fn constants_are_whole_words() {
        assert_eq!(eval("pi"), Ok(std::f64::consts::PI));
        assert_eq!(eval("π * 2"), Ok(std::f64::consts::PI * 2.0));
        assert_eq!(eval("e"), Ok(std::f64::consts::E));
        assert!(matches!(eval("pie"), Err(EvalError::UnknownName(_))));
    }


    #[test]
    fn last_answer() {
        assert_eq!(evaluate(&parse("ans * 10", 4.0).unwrap()), Ok(40.0));
        assert_eq!(evaluate(&parse("ans ** 2", -3.0).unwrap()), Ok(9.0));
        assert_eq!(eval("ans"), Ok(0.0));
    }


    #[test]
    fn unknown_names() {
        assert_eq!(eval("foo(1)"), Err(EvalError::UnknownName(String::from("foo"))));
        assert_eq!(eval("x + 1"),  Err(EvalError::UnknownName(String::from("x"))));
        assert!(matches!(eval("__import__(1)"), Err(EvalError::UnknownName(_))));
    }


    #[test]
    fn syntax_errors() {
        assert_eq!(syntax_error(""),         "empty expression");
        assert_eq!(syntax_error("2 +"),      "unexpected end of expression");
        assert_eq!(syntax_error("(1 + 2"),   "missing ')' for '(' at position 0");
        assert_eq!(syntax_error("1 + 2)"),   "unmatched ')' at position 5");
        assert_eq!(syntax_error("2 3"),      "unexpected '3' at position 2");
        assert_eq!(syntax_error("* 2"),      "unexpected '*' at position 0");
        assert_eq!(syntax_error("sqrt 4"),   "function 'sqrt' at position 0 must be followed by '('");
        assert_eq!(syntax_error("sqrt(4"),   "missing ')' after arguments of 'sqrt'");
        assert_eq!(syntax_error("2pi"),      "unexpected 'pi' at position 1");
        assert_eq!(syntax_error("()"),       "unmatched ')' at position 1");
    }


    #[test]
    fn wrong_arity() {
        assert_eq!(syntax_error("sqrt(1, 2)"), "function 'sqrt' takes 1 argument but was given 2");
        assert_eq!(syntax_error("sqrt()"),     "function 'sqrt' takes 1 argument but was given 0");
        assert_eq!(syntax_error("log(1, 2, 3)"), "function 'log' takes 1 to 2 arguments but was given 3");
        assert_eq!(syntax_error("(1, 2)"),     "unexpected ',' at position 2");
        assert_eq!(syntax_error("log(8,)"),    "missing argument after ',' at position 5");
        assert_eq!(syntax_error("log(8, )"),   "missing argument after ',' at position 5");
        assert_eq!(syntax_error("sqrt(,4)"),   "unexpected ',' at position 5");
    }


    #[test]
    fn domain_errors() {
        assert_eq!(eval("1 / 0"), Err(EvalError::Domain(String::from("division by zero"))));
        assert_eq!(eval("5 % (2 - 2)"), Err(EvalError::Domain(String::from("division by zero"))));
        assert!(matches!(eval("sqrt(-1)"),      Err(EvalError::Domain(_))));
        assert!(matches!(eval("factorial(-3)"), Err(EvalError::Domain(_))));
        assert!(matches!(eval("factorial(2.5)"), Err(EvalError::Domain(_))));
        assert!(matches!(eval("ln(0)"),          Err(EvalError::Domain(_))));
        assert!(matches!(eval("log(-10)"),       Err(EvalError::Domain(_))));
    }


    #[test]
    fn overflow_is_a_domain_error() {
        assert_eq!(eval("10 ** 400"), Err(EvalError::Domain(String::from("result of '**' is too large to represent"))));
        assert!(matches!(eval("exp(1000)"), Err(EvalError::Domain(_))));
    }


    #[test]
    fn nesting_is_bounded() {
        let deep = "(".repeat(MAX_DEPTH + 1) + "1" + &")".repeat(MAX_DEPTH + 1);
        assert!(syntax_error(&deep).contains("nested"));

        let shallow = "(".repeat(100) + "1" + &")".repeat(100);
        assert_eq!(eval(&shallow), Ok(1.0));

        let signs = "-".repeat(MAX_DEPTH + 1) + "1";
        assert!(syntax_error(&signs).contains("nested"));

        let powers = vec![ "1"; MAX_DEPTH + 2 ].join(" ** ");
        assert!(syntax_error(&powers).contains("nested"));
    }


    #[test]
    fn long_flat_chains_are_bounded() {
        let long = vec![ "1"; 200_000 ].join("+");
        assert_eq!(syntax_error(&long), format!("expression has more than {} terms", MAX_NODES));

        let products = vec![ "2"; 100_000 ].join(" * ");
        assert!(syntax_error(&products).contains("terms"));

        let within = vec![ "1"; 1000 ].join(" + ");
        assert_eq!(eval(&within), Ok(1000.0));

        // The limit covers the whole tree, not each group.
        let half = vec![ "1"; 500 ].join(" + ");
        assert_eq!(eval(&format!("({}) - ({})", half, half)), Ok(0.0));
        assert!(syntax_error(&format!("({}) - ({})", within, within)).contains("terms"));
    }


    #[test]
    fn tree_shape() {
        match parse("1 - 2 - 3", 0.0).unwrap() {
            ExpressionNode::Operator { op, args } => {
                assert_eq!(op.name, "-");
                assert!(matches!(args[0], ExpressionNode::Operator { .. }));
                assert!(matches!(args[1], ExpressionNode::Constant { value } if value == 3.0));
            }
            other => panic!("unexpected tree {:?}", other),
        }

        match parse("-sqrt(4)", 0.0).unwrap() {
            ExpressionNode::Operator { op, args } => {
                assert!(std::ptr::eq(op, &ops::NEGATE));
                assert!(matches!(args[0], ExpressionNode::Function { op, .. } if op.name == "sqrt"));
            }
            other => panic!("unexpected tree {:?}", other),
        }
    }
}
