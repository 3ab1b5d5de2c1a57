use tracing::debug;
use crate::errors::Result;
use crate::preprocess::preprocess;


// Per-user calculator state. The evaluator itself is stateless, so everything that
// persists between expressions (last answer, history, memory register) lives here.
#[derive(Debug, Default)]
pub struct Session {
    last_answer: f64,
    history:     Vec<String>,
    memory:      f64,
}


impl Session {
    pub fn new() -> Session {
        Session::default()
    }


    // Evaluates an expression against the last answer. On success the result becomes
    // the new last answer and is recorded as "<expr> = <result>". Failures leave the
    // session untouched.
    pub fn evaluate(&mut self, text: &str) -> Result<f64> {
        let value = crate::evaluate(text, self.last_answer)?;
        let expression = preprocess(text, self.last_answer)?;

        self.history.push(format!("{} = {}", expression.trim(), value));
        self.last_answer = value;

        Ok(value)
    }


    pub fn last_answer(&self) -> f64 {
        self.last_answer
    }


    // The most recent count history records, oldest first.
    pub fn history(&self, count: usize) -> &[String] {
        &self.history[self.history.len().saturating_sub(count) ..]
    }


    pub fn clear_history(&mut self) {
        self.history.clear();
    }


    // Memory register.
    pub fn memory_store(&mut self, value: f64) {
        debug!(value, "memory store");
        self.memory = value;
    }

    pub fn memory_recall(&self) -> f64 {
        self.memory
    }

    pub fn memory_clear(&mut self) {
        debug!("memory clear");
        self.memory = 0.0;
    }

    pub fn memory_add(&mut self, value: f64) {
        debug!(value, "memory add");
        self.memory += value;
    }

    pub fn memory_subtract(&mut self, value: f64) {
        debug!(value, "memory subtract");
        self.memory -= value;
    }
}
