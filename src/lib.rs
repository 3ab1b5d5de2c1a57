pub mod errors;
pub mod expr;
pub mod ops;
pub mod preprocess;
pub mod session;
pub mod tokens;

use tracing::debug;

pub use errors::{EvalError, Result};
pub use preprocess::preprocess;
pub use session::Session;


/// Evaluates an arithmetic expression.
///
/// The grammar is closed: numbers, `+ - * / % **` (with `^` as an alias for `**`),
/// parentheses, the constants `pi`, `π` and `e`, and the builtin functions in
/// [`ops::FUNCTIONS`]. The name `ans` refers to `last_answer`. Nothing else can
/// be named, so no input can reach anything beyond arithmetic.
///
/// The evaluator keeps no state of its own: the same text and last answer always
/// give the same result.
pub fn evaluate(text: &str, last_answer: f64) -> Result<f64> {
    let expression = expr::parse(text, last_answer)?;
    let value = expr::evaluate(&expression)?;

    // A bare `ans` can still carry a non-finite value in from the caller.
    if !value.is_finite() {
        return Err(EvalError::Domain(String::from("result is not a finite number")));
    }

    // Negative zero (from eg. ceil(-0.5)) is reported as plain zero.
    let value = if value == 0.0 { 0.0 } else { value };

    debug!(expression = text, value, "evaluated");

    Ok(value)
}
