mod client;
pub mod types;

use reqwest::StatusCode;
use thiserror::Error;

pub use client::*;
pub use types::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmErrorKind {
    RateLimited,
    Server,
    Network,
    Timeout,
    Client,
    Deserialize,
    Unknown,
}

/// Non-2xx reply from the chat endpoint.
#[derive(Debug, Error)]
#[error("chat error: {status} - {body}")]
pub struct ChatStatusError {
    pub status: StatusCode,
    pub body: String,
}

pub fn classify_error(status: Option<StatusCode>, err: &anyhow::Error) -> LlmErrorKind {
    let status = status.or_else(|| err.downcast_ref::<ChatStatusError>().map(|e| e.status));
    if let Some(st) = status {
        if st == StatusCode::TOO_MANY_REQUESTS {
            return LlmErrorKind::RateLimited;
        }
        if st.is_server_error() {
            return LlmErrorKind::Server;
        }
        if st.is_client_error() {
            return LlmErrorKind::Client;
        }
    }
    if let Some(e) = err.downcast_ref::<reqwest::Error>() {
        if e.is_timeout() {
            return LlmErrorKind::Timeout;
        }
        if e.is_decode() {
            return LlmErrorKind::Deserialize;
        }
        if e.is_connect() || e.is_body() || e.is_request() {
            return LlmErrorKind::Network;
        }
    }
    if err.downcast_ref::<serde_json::Error>().is_some() {
        return LlmErrorKind::Deserialize;
    }
    LlmErrorKind::Unknown
}
