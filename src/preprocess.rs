use crate::errors::Result;
use crate::ops;
use crate::tokens::{Token, Tokenizer};


// Rewrites the aliases and named constants in an expression into canonical text,
// eg. "2 ^ pi" becomes "2 ** 3.141592653589793". Substitution works on whole tokens,
// so names that merely contain a constant (such as exp) are left alone.
pub fn preprocess(text: &str, last_answer: f64) -> Result<String> {
    let mut output = String::with_capacity(text.len());
    let mut copied = 0;

    for lexeme in Tokenizer::new(text) {
        let lexeme = lexeme?;

        if let Some(replacement) = replacement(lexeme.token, last_answer) {
            let end = lexeme.position + lexeme.text.len();

            // Keep a substituted number from fusing with a neighbouring token.
            let is_number = !matches!(lexeme.token, Token::Operator(_));

            output.push_str(&text[copied .. lexeme.position]);

            if is_number && output.ends_with(is_word_char) {
                output.push(' ');
            }

            output.push_str(&replacement);

            if is_number && text[end ..].starts_with(is_word_char) {
                output.push(' ');
            }

            copied = end;
        }
    }

    output.push_str(&text[copied ..]);

    Ok(output)
}


fn replacement(token: Token, last_answer: f64) -> Option<String> {
    match token {
        Token::Operator(symbol) => {
            let canonical = ops::canonical_symbol(symbol);

            if canonical != symbol { Some(String::from(canonical)) } else { None }
        }

        Token::Name(ops::ANSWER) => Some(format_value(last_answer)),

        Token::Name(name) => ops::find_constant(name).and_then(|constant| constant.apply(&[]).ok()).map(format_value),

        Token::Number(_) => None,
    }
}


// Negative values are parenthesized so that eg. "ans ** 2" keeps its meaning.
fn format_value(value: f64) -> String {
    if value.is_sign_negative() && value != 0.0 {
        format!("({})", value)
    }
    else {
        format!("{}", value.abs())
    }
}


fn is_word_char(char: char) -> bool {
    char.is_alphanumeric() || char == '_' || char == '.'
}
