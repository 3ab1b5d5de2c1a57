use std::str;
use crate::errors::{EvalError, Result};
use crate::ops;


#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Token<'a> {
    Number(f64),
    Name(&'a str),
    Operator(&'a str),
}


// A token plus where it came from, for error messages and text substitution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lexeme<'a> {
    pub token:    Token<'a>,
    pub text:     &'a str,
    pub position: usize,
}


pub struct Tokenizer<'a> {
    input: &'a str,
    iterator: str::Chars<'a>,
    remainder: &'a str,
    peeked: Option<char>
}


impl<'a> Iterator for Tokenizer<'a> {
    type Item = Result<Lexeme<'a>>;


    fn next(&mut self) -> Option<Self::Item> {
        // Skip whitespace.
        loop {
            match self.peek() {
                Some(char) if char.is_whitespace() => { self.get(); }
                _ => break
            }
        }

        let position = self.offset();
        let start_slice = self.remainder;

        let char = self.peek()?;

        let token = if char.is_ascii_digit() || char == '.' {
            // Numbers.
            self.read_number(position)
        }
        else if char.is_alphabetic() || char == '_' {
            // Barewords.
            Ok(Token::Name(self.read_bareword()))
        }
        else {
            // Anything else has to be an operator or punctuation.
            self.read_operator(position)
        };

        Some(token.map(|token| Lexeme { token, text: self.consumed_since(start_slice), position }))
    }
}


impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Tokenizer<'a> {
        Tokenizer {
            input,
            iterator: input.chars(),
            remainder: input,
            peeked: None
        }
    }


    // Reads the next character, advancing the input position.
    fn get(&mut self) -> Option<char> {
        let result = match self.peeked {
            // Consume a previously peeked value.
            Some(char) => {
                self.peeked = None;
                Some(char)
            }

            // Read a new value.
            None => self.iterator.next()
        };

        self.remainder = self.iterator.as_str();

        result
    }


    // Peeks the next character, without advancing the input position.
    fn peek(&mut self) -> Option<char> {
        if self.peeked.is_none() {
            self.peeked = self.iterator.next();
        }

        self.peeked
    }


    // Byte offset of the next unconsumed character.
    fn offset(&self) -> usize {
        self.input.len() - self.remainder.len()
    }


    fn consumed_since(&self, start_slice: &'a str) -> &'a str {
        &start_slice[.. start_slice.len() - self.remainder.len()]
    }


    fn skip_while(&mut self, predicate: impl Fn(char) -> bool) {
        while let Some(char) = self.peek() {
            if !predicate(char) {
                break;
            }

            self.get();
        }
    }


    // Reads a decimal floating point constant, with optional exponent.
    fn read_number(&mut self, position: usize) -> Result<Token<'a>> {
        let start_slice = self.remainder;

        self.skip_while(|char| char.is_ascii_digit() || char == '.');

        if let Some('e') | Some('E') = self.peek() {
            if self.exponent_follows() {
                self.get();

                if let Some('+') | Some('-') = self.peek() {
                    self.get();
                }

                self.skip_while(|char| char.is_ascii_digit());
            }
        }

        let text = self.consumed_since(start_slice);

        match text.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Token::Number(value)),
            Ok(_)  => Err(EvalError::Syntax(format!("number '{}' at position {} is out of range", text, position))),
            Err(_) => Err(EvalError::Syntax(format!("malformed number '{}' at position {}", text, position))),
        }
    }


    // With the remainder sitting on an 'e', checks for digits (optionally signed) after it.
    // A bare 'e' is left alone so it reads as the next token.
    fn exponent_follows(&self) -> bool {
        let mut rest = self.remainder[1..].chars();

        match rest.next() {
            Some(char) if char.is_ascii_digit() => true,
            Some('+') | Some('-') => rest.next().map_or(false, |char| char.is_ascii_digit()),
            _ => false
        }
    }


    // Reads an alphanumeric bareword.
    fn read_bareword(&mut self) -> &'a str {
        let start_slice = self.remainder;

        self.skip_while(|char| char.is_alphanumeric() || char == '_');

        self.consumed_since(start_slice)
    }


    // Reads the longest run of characters that spells a known operator.
    fn read_operator(&mut self, position: usize) -> Result<Token<'a>> {
        let start_slice = self.remainder;

        while let Some(char) = self.peek() {
            let length = start_slice.len() - self.remainder.len() + char.len_utf8();

            if !ops::is_symbol_prefix(&start_slice[.. length]) {
                break;
            }

            self.get();
        }

        let symbol = self.consumed_since(start_slice);

        if ops::is_symbol(symbol) {
            return Ok(Token::Operator(symbol));
        }

        // Unknown character: consume it so the message can quote it.
        if symbol.is_empty() {
            self.get();
        }

        Err(EvalError::Syntax(format!("unexpected character '{}' at position {}", self.consumed_since(start_slice), position)))
    }
}


#[cfg(test)]
mod tests {
    use super::*;


    fn tokens(input: &str) -> Vec<Token> {
        Tokenizer::new(input).map(|lexeme| lexeme.unwrap().token).collect()
    }


    #[test]
    fn numbers() {
        assert_eq!(tokens("42"),     vec![ Token::Number(42.0) ]);
        assert_eq!(tokens("3.25"),   vec![ Token::Number(3.25) ]);
        assert_eq!(tokens(".5"),     vec![ Token::Number(0.5) ]);
        assert_eq!(tokens("1.5e3"),  vec![ Token::Number(1500.0) ]);
        assert_eq!(tokens("2E-2"),   vec![ Token::Number(0.02) ]);
        assert_eq!(tokens("2e+1"),   vec![ Token::Number(20.0) ]);
    }


    #[test]
    fn trailing_e_is_not_an_exponent() {
        assert_eq!(tokens("2e"),   vec![ Token::Number(2.0), Token::Name("e") ]);
        assert_eq!(tokens("2exp"), vec![ Token::Number(2.0), Token::Name("exp") ]);
        assert_eq!(tokens("2e-x"), vec![ Token::Number(2.0), Token::Name("e"), Token::Operator("-"), Token::Name("x") ]);
    }


    #[test]
    fn names_and_operators() {
        assert_eq!(tokens("sqrt(x_1) ** π ^ 2 % 3, -"), vec![
            Token::Name("sqrt"),
            Token::Operator("("),
            Token::Name("x_1"),
            Token::Operator(")"),
            Token::Operator("**"),
            Token::Name("π"),
            Token::Operator("^"),
            Token::Number(2.0),
            Token::Operator("%"),
            Token::Number(3.0),
            Token::Operator(","),
            Token::Operator("-"),
        ]);
    }


    #[test]
    fn star_pairs() {
        assert_eq!(tokens("2***3"), vec![ Token::Number(2.0), Token::Operator("**"), Token::Operator("*"), Token::Number(3.0) ]);
        assert_eq!(tokens("2* *3"), vec![ Token::Number(2.0), Token::Operator("*"), Token::Operator("*"), Token::Number(3.0) ]);
    }


    #[test]
    fn positions_and_text() {
        let lexemes: Vec<Lexeme> = Tokenizer::new("  pi *  12.5").map(Result::unwrap).collect();

        assert_eq!(lexemes.iter().map(|lexeme| lexeme.position).collect::<Vec<_>>(), vec![ 2, 5, 8 ]);
        assert_eq!(lexemes.iter().map(|lexeme| lexeme.text).collect::<Vec<_>>(), vec![ "pi", "*", "12.5" ]);
    }


    #[test]
    fn positions_are_byte_offsets() {
        let lexemes: Vec<Lexeme> = Tokenizer::new("π+1").map(Result::unwrap).collect();

        assert_eq!(lexemes[1].position, 'π'.len_utf8());
    }


    #[test]
    fn malformed_numbers() {
        assert_eq!(Tokenizer::new("1.2.3").next(), Some(Err(EvalError::Syntax(String::from("malformed number '1.2.3' at position 0")))));
        assert!(matches!(Tokenizer::new(".").next(), Some(Err(EvalError::Syntax(_)))));
        assert!(matches!(Tokenizer::new("1e999").next(), Some(Err(EvalError::Syntax(_)))));
    }


    #[test]
    fn unknown_characters() {
        let mut tokenizer = Tokenizer::new("1 $ 2");

        assert_eq!(tokenizer.next(), Some(Ok(Lexeme { token: Token::Number(1.0), text: "1", position: 0 })));
        assert_eq!(tokenizer.next(), Some(Err(EvalError::Syntax(String::from("unexpected character '$' at position 2")))));

        assert!(matches!(Tokenizer::new("a.b").nth(1), Some(Err(EvalError::Syntax(_)))));
        assert!(matches!(Tokenizer::new("x = 1").nth(1), Some(Err(EvalError::Syntax(_)))));
    }


    #[test]
    fn empty_input() {
        assert!(Tokenizer::new("").next().is_none());
        assert!(Tokenizer::new(" \t ").next().is_none());
    }
}
