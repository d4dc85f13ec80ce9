//! Weather-specific error types.

use nimbus_core::{AppError, DatabaseError, NetworkError, ReqwestErrorExt};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WeatherError {
    /// The request never produced a response.
    #[error("Transport error: {0}")]
    Transport(#[from] NetworkError),

    /// The server answered with a non-2xx status.
    #[error("Server returned {status}: {body}")]
    Server { status: u16, body: String },

    /// Anything else, e.g. a payload that does not decode.
    #[error("Unexpected error: {0}")]
    Unexpected(String),

    #[error("Cache error: {0}")]
    Cache(#[from] DatabaseError),
}

impl From<reqwest::Error> for WeatherError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() || e.is_builder() {
            Self::Unexpected(e.to_string())
        } else {
            Self::Transport(e.into_network_error())
        }
    }
}

impl WeatherError {
    /// User-friendly error message for display.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(_) => "Couldn't reach server. Check your connection.".to_string(),
            Self::Server { status, body } => server_message(*status, body),
            Self::Unexpected(desc) if desc.trim().is_empty() => {
                "Unexpected error: Unknown error".to_string()
            }
            Self::Unexpected(desc) => format!("Unexpected error: {}", desc),
            Self::Cache(e) => e.user_message().to_string(),
        }
    }

    /// Whether the failure happened before any response arrived.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Extract the server-supplied `message` field from an error body.
///
/// A JSON body without the field yields a generic message; a body that is
/// not JSON at all yields the generic message with the status code.
fn server_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => {
            let message = json
                .get("message")
                .and_then(|m| m.as_str())
                .filter(|m| !m.is_empty())
                .unwrap_or("Something went wrong");
            capitalize_first(message)
        }
        Err(_) => format!("Something went wrong: {}", status),
    }
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl From<WeatherError> for AppError {
    fn from(e: WeatherError) -> Self {
        match e {
            WeatherError::Transport(net) => AppError::Network(net),
            WeatherError::Cache(db) => AppError::Database(db),
            other => AppError::Weather(other.user_message()),
        }
    }
}
