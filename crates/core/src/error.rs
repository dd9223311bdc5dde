use thiserror::Error;

use crate::model::QuestionError;

/// Failures while obtaining or decoding a question bank.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BankError {
    #[error("question bank unavailable: {0}")]
    Unavailable(String),

    #[error("question bank contains no usable questions")]
    Empty,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Bank(#[from] BankError),
    #[error(transparent)]
    Question(#[from] QuestionError),
}
