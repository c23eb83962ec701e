use thiserror::Error;

/// The single error kind produced by a failed backend call.
///
/// Callers only ever show `message` to the user; there is no status-code
/// branching.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct RequestError {
    pub message: String,
}

impl RequestError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Use a response body verbatim as the message, or `fallback` when it is empty
    pub fn from_body(body: &str, fallback: &str) -> Self {
        if body.is_empty() {
            Self::new(fallback)
        } else {
            Self::new(body)
        }
    }

    /// The message, or `fallback` if it is empty
    pub fn message_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        if self.message.is_empty() {
            fallback
        } else {
            &self.message
        }
    }
}

pub type Result<T> = std::result::Result<T, RequestError>;
