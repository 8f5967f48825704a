use anyhow::{Context, Result, anyhow};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, RETRY_AFTER};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::LlmConfig;
use crate::llm::types::{ChatMessage, ChatRequest, ChatResponse, ChoiceMessage};
use crate::llm::{ChatStatusError, LlmErrorKind, classify_error};

#[derive(Debug, Clone)]
pub struct OpenAIClient {
    pub base_url: String,
    pub api_key: String,
    pub(crate) inner: reqwest::Client,
    pub llm_cfg: LlmConfig,
}

/// One failed round trip, with what the retry loop needs to decide.
struct AttemptFailure {
    error: anyhow::Error,
    kind: LlmErrorKind,
    retry_after: Option<u64>,
}

impl AttemptFailure {
    fn new(error: anyhow::Error, retry_after: Option<u64>) -> Self {
        let kind = classify_error(None, &error);
        Self {
            error,
            kind,
            retry_after,
        }
    }
}

impl OpenAIClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let inner = reqwest::Client::builder().build()?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            inner,
            llm_cfg: LlmConfig::default(),
        })
    }

    pub fn with_llm_config(mut self, cfg: LlmConfig) -> Self {
        let builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(cfg.connect_timeout_ms))
            .timeout(Duration::from_millis(cfg.request_timeout_ms));
        // keep the untimed client if the builder rejects the settings
        if let Ok(c) = builder.build() {
            self.inner = c;
        }
        self.llm_cfg = cfg;
        self
    }

    pub(crate) fn endpoint(&self) -> String {
        let mut base = self.base_url.trim_end_matches('/').to_string();
        if let Some(pos) = base.rfind("/v1") {
            base.truncate(pos);
            base = base.trim_end_matches('/').to_string();
        }
        format!("{base}/v1/chat/completions")
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .context("api key is not a valid header value")?,
        );
        Ok(headers)
    }

    pub async fn chat_once(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
    ) -> Result<ChoiceMessage> {
        let url = self.endpoint();
        let req = ChatRequest {
            model: model.to_string(),
            messages,
            temperature: Some(self.llm_cfg.temperature),
            max_tokens: Some(self.llm_cfg.max_tokens),
        };
        let headers = self.headers()?;

        if let Ok(payload) = serde_json::to_string(&req) {
            debug!(target: "llm", payload=%payload, endpoint=%url, "sending chat.completions payload");
        }

        let max_attempts = self.llm_cfg.max_retries.saturating_add(1);
        let mut last_err: Option<anyhow::Error> = None;

        for attempt in 1..=max_attempts {
            let failure = match self.send_once(&url, &headers, &req).await {
                Ok(msg) => return Ok(msg),
                Err(failure) => failure,
            };

            if !should_retry(&failure.kind) || attempt == max_attempts {
                return Err(failure.error);
            }

            let wait = self.backoff_delay(attempt, failure.retry_after);
            info!(attempt, kind=?failure.kind, wait_ms=%wait.as_millis(), "retrying chat_once");
            tokio::time::sleep(wait).await;
            last_err = Some(failure.error);
        }

        Err(last_err.unwrap_or_else(|| anyhow!("no request attempted")))
    }

    async fn send_once(
        &self,
        url: &str,
        headers: &HeaderMap,
        req: &ChatRequest,
    ) -> std::result::Result<ChoiceMessage, AttemptFailure> {
        let resp = self
            .inner
            .post(url)
            .headers(headers.clone())
            .json(req)
            .send()
            .await
            .map_err(|e| {
                AttemptFailure::new(anyhow::Error::new(e).context("send chat request"), None)
            })?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = resp
                .headers()
                .get(RETRY_AFTER)
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            let body = resp.text().await.unwrap_or_default();
            return Err(AttemptFailure::new(
                anyhow::Error::new(ChatStatusError { status, body }),
                retry_after,
            ));
        }

        let body: ChatResponse = resp.json().await.map_err(|e| {
            AttemptFailure::new(anyhow::Error::new(e).context("parse chat response"), None)
        })?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| AttemptFailure {
                error: anyhow!("no choices returned"),
                kind: LlmErrorKind::Deserialize,
                retry_after: None,
            })
    }

    pub(crate) fn backoff_delay(&self, attempt: usize, retry_after_secs: Option<u64>) -> Duration {
        if self.llm_cfg.respect_retry_after {
            if let Some(secs) = retry_after_secs {
                return Duration::from_secs(secs);
            }
        }
        let base = self.llm_cfg.retry_base_ms;
        let exp = base.saturating_mul(1u64 << (attempt.saturating_sub(1).min(16) as u32));
        let jitter = self.llm_cfg.retry_jitter_ms as i64;
        let half = jitter / 2;
        let rnd = fastrand::i64(-half..=half).max(0) as u64;
        Duration::from_millis(exp.saturating_add(rnd))
    }
}

fn should_retry(kind: &LlmErrorKind) -> bool {
    matches!(
        kind,
        LlmErrorKind::RateLimited
            | LlmErrorKind::Server
            | LlmErrorKind::Network
            | LlmErrorKind::Timeout
    )
}
