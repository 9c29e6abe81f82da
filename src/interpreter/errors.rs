use super::object::Object;

use std::fmt;

#[derive(Debug, PartialEq, Clone)]
pub struct RuntimeError {
    pub message: String,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>) -> Self {
        RuntimeError {
            message: message.into(),
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Non-local control flow, threaded through `Result`. `return` and `break`
/// unwind to the construct that handles them; errors unwind to the top.
#[derive(Debug, PartialEq, Clone)]
pub enum Signal {
    Return(Object),
    Break,
    Error(RuntimeError),
}

impl Signal {
    pub fn error(message: impl Into<String>) -> Signal {
        Signal::Error(RuntimeError::new(message))
    }
}

pub type EvalResult = Result<Object, Signal>;
