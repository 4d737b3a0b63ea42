use thiserror::Error;

use crate::lexer::Token;
use crate::runtime::value::Value;

/// An evaluation failure. `value` carries whatever a `raise` statement raised so
/// `except` handlers can dispatch on its type.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RuntimeError {
    pub token: Token,
    pub message: String,
    pub value: Option<Value>,
}

impl RuntimeError {
    pub fn new(token: &Token, message: impl Into<String>) -> Self {
        Self {
            token: token.clone(),
            message: message.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }
}

/// Non-local control flow out of statement execution.
#[derive(Debug, Clone, Error)]
pub enum Signal {
    #[error("'break' escaped its loop")]
    Break,
    #[error("exit")]
    Exit(Value),
    #[error(transparent)]
    Error(#[from] RuntimeError),
}
