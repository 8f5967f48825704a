use anyhow::Result;
use tracing::{debug, info};

use super::parser::{REPLY_SEPARATOR, parse_reply};
use super::{CodeGenerator, CodegenError, GeneratedCode, GenerationRequest};
use crate::config::AppConfig;
use crate::llm::{ChatMessage, ChatStatusError, LlmErrorKind, OpenAIClient, classify_error};

/// Generates code through an OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct RemoteCodeGenerator {
    client: OpenAIClient,
    model: String,
}

impl RemoteCodeGenerator {
    pub fn new(client: OpenAIClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Returns `Ok(None)` when AI is disabled or no API key is configured.
    pub fn from_config(cfg: &AppConfig) -> Result<Option<Self>> {
        if !cfg.ai_enabled {
            return Ok(None);
        }
        let Some(api_key) = cfg.api_key.as_deref() else {
            return Ok(None);
        };
        let client = OpenAIClient::new(&cfg.base_url, api_key)?.with_llm_config(cfg.llm.clone());
        Ok(Some(Self::new(client, &cfg.model)))
    }

    pub(crate) fn build_prompt(req: &GenerationRequest) -> String {
        let args = req.flattened_args();
        let args = if args.is_empty() { "(none)" } else { args.as_str() };
        format!(
            "Write a short function that performs the task below, run it mentally, and report the result.\n\
             \n\
             Task: {desc}\n\
             Function name: {name}\n\
             Arguments: {args}\n\
             \n\
             Requirements:\n\
             1. Produce a complete, self-contained function.\n\
             2. Return the value the function would produce.\n\
             3. Reply exactly as: <result>{sep}<function source>\n\
             \n\
             Example:\n\
             Task: compute the factorial of 5\n\
             Reply: 120{sep}fn factorial() -> u64 {{\n    (1..=5).product()\n}}",
            desc = req.description,
            name = req.function_name,
            sep = REPLY_SEPARATOR,
        )
    }
}

/// Maps a transport-level failure onto the collaborator error taxonomy.
pub(crate) fn map_llm_error(err: anyhow::Error) -> CodegenError {
    if let Some(status_err) = err.downcast_ref::<ChatStatusError>() {
        return CodegenError::Status {
            status: status_err.status.as_u16(),
            body: status_err.body.clone(),
        };
    }
    match classify_error(None, &err) {
        LlmErrorKind::Timeout => CodegenError::Timeout,
        LlmErrorKind::Deserialize => CodegenError::MalformedResponse(format!("{err:#}")),
        LlmErrorKind::Unknown => CodegenError::Unavailable(format!("{err:#}")),
        _ => CodegenError::Transport(format!("{err:#}")),
    }
}

#[async_trait::async_trait]
impl CodeGenerator for RemoteCodeGenerator {
    fn name(&self) -> &str {
        "remote"
    }

    async fn generate(&self, req: &GenerationRequest) -> Result<GeneratedCode, CodegenError> {
        let prompt = Self::build_prompt(req);
        debug!(model = %self.model, function = %req.function_name, "requesting generated code");

        let msg = self
            .client
            .chat_once(&self.model, vec![ChatMessage::user(prompt)])
            .await
            .map_err(map_llm_error)?;

        let out = parse_reply(&msg.content)?;
        info!(result = %out.result, source_len = out.source.len(), "remote generation succeeded");
        Ok(out)
    }
}
