use thiserror::Error;


// Everything that can go wrong while turning text into a number.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum EvalError {
    // Malformed tokens, unbalanced parentheses, wrong argument counts.
    #[error("SyntaxError: {0}")]
    Syntax(String),

    // A name that is neither a function nor a constant.
    #[error("UnknownNameError: unknown name '{0}'")]
    UnknownName(String),

    // Well formed input whose result is mathematically undefined.
    #[error("DomainError: {0}")]
    Domain(String),
}


pub type Result<T> = std::result::Result<T, EvalError>;
