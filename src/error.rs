use thiserror::Error;

use crate::quiz::OptionKey;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {key} is not set")]
    Missing { key: &'static str },

    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum QuizHelperError {
    #[error("AI request failed: {0}")]
    ChatGpt(#[from] chatgpt::err::Error),

    #[error("question has no correct answer to explain")]
    NoCorrectAnswer,

    #[error("question has no option {0})")]
    UnknownOption(OptionKey),
}
