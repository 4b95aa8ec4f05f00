use miette::Diagnostic;
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("HTTP error: {0}")]
    #[diagnostic(code(daily_digest::http))]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(daily_digest::config))]
    Config(String),

    #[error("Calendar error: {0}")]
    #[diagnostic(code(daily_digest::calendar))]
    Calendar(String),

    #[error("Digest source error: {0}")]
    #[diagnostic(code(daily_digest::source))]
    Source(String),

    #[error(transparent)]
    #[diagnostic(code(daily_digest::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(daily_digest::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(daily_digest::other))]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type DigestResult<T> = Result<T, Error>;

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create calendar errors
pub fn calendar_error(message: &str) -> Error {
    Error::Calendar(message.to_string())
}

/// Helper to create digest source errors
pub fn source_error(message: &str) -> Error {
    Error::Source(message.to_string())
}
