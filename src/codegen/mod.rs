//! Code-generation collaborators: a remote chat-completions backend and a
//! deterministic local generator keyed by lexical patterns.
mod local;
mod parser;
mod remote;

use thiserror::Error;

pub use local::*;
pub use remote::*;

/// What a generator is asked to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationRequest {
    pub description: String,
    /// Declared name of the target callable
    pub function_name: String,
    pub args: Vec<String>,
    pub kwargs: Vec<(String, String)>,
}

impl GenerationRequest {
    #[cfg(test)]
    pub fn new(description: impl Into<String>, function_name: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            function_name: function_name.into(),
            ..Default::default()
        }
    }

    /// Positional then keyword arguments, joined as `a, b, k=v`.
    pub fn flattened_args(&self) -> String {
        self.args
            .iter()
            .cloned()
            .chain(self.kwargs.iter().map(|(k, v)| format!("{k}={v}")))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCode {
    pub result: String,
    pub source: String,
}

impl GeneratedCode {
    pub fn new(result: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            result: result.into(),
            source: source.into(),
        }
    }
}

/// Every variant means the collaborator is unavailable for this call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodegenError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
    #[error("endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("generator unavailable: {0}")]
    Unavailable(String),
}

#[async_trait::async_trait]
pub trait CodeGenerator: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    async fn generate(&self, req: &GenerationRequest) -> Result<GeneratedCode, CodegenError>;
}
