//! Tagged result type handed to display code.

use std::future::Future;

use crate::error::WeatherError;

/// Result of a data request as seen by display code.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// Request in flight
    Loading,
    Success(T),
    /// Request failed; the message is ready for display
    Error(String),
}

impl<T> Outcome<T> {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// The success value, if any.
    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Self::Loading => Outcome::Loading,
            Self::Success(value) => Outcome::Success(f(value)),
            Self::Error(msg) => Outcome::Error(msg),
        }
    }
}

impl<T> From<Result<T, WeatherError>> for Outcome<T> {
    fn from(result: Result<T, WeatherError>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(e) => Self::Error(e.user_message()),
        }
    }
}

/// Run a remote call and fold any failure into `Outcome::Error`.
///
/// Nothing escapes this boundary: transport, server and decoding failures
/// all become display messages.
pub async fn safe_call<T, F>(call: F) -> Outcome<T>
where
    F: Future<Output = Result<T, WeatherError>>,
{
    match call.await {
        Ok(value) => Outcome::Success(value),
        Err(e) => {
            tracing::warn!("Remote call failed: {}", e);
            Outcome::Error(e.user_message())
        }
    }
}
