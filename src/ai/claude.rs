use crate::ai::openai::excerpt;
use crate::ai::registry::Provider;
use crate::ai::resilience::{Endpoint, Fault, Transport};
use crate::ai::types::{
    Adapter, Answer, AskError, DiagnosticKind, SYSTEM_INSTRUCTION, TEMPERATURE,
};
use async_trait::async_trait;
use log::error;
use reqwest::StatusCode;
use serde_json::Value;

const SERVICE: &str = "Claude AI service";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// 免费/低额度账户预算紧，输出上限压低
const MAX_TOKENS: u32 = 256;
const CREDIT_EXHAUSTED: &str = "credit balance is too low";

pub const INSUFFICIENT_CREDITS_MESSAGE: &str = "Claude is unavailable for this account right now (insufficient credits). Add credits in Anthropic Billing or pass a fallback_provider to continue.";

#[derive(Clone)]
pub struct ClaudeAdapter {
    transport: Transport,
    endpoint: Endpoint,
}

impl ClaudeAdapter {
    pub fn new(transport: Transport, endpoint: Endpoint) -> Self {
        Self {
            transport,
            endpoint,
        }
    }
}

#[async_trait]
impl Adapter for ClaudeAdapter {
    async fn ask(
        &self,
        question: &str,
        api_key: &str,
        model: Option<&str>,
    ) -> Result<Answer, AskError> {
        if api_key.trim().is_empty() {
            return Err(AskError::MissingCredential("Claude"));
        }

        let model = model.unwrap_or(Provider::Claude.config().default_model());
        let url = self.endpoint.join("messages");
        let body = serde_json::json!({
            "model": model,
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
            "system": SYSTEM_INSTRUCTION,
            "messages": [
                {"role": "user", "content": question}
            ]
        });

        let client = self.transport.client();
        let (url, body) = (&url, &body);
        let answer = self
            .transport
            .run(self.endpoint.host(), SERVICE, move || async move {
                let resp = client
                    .post(url.as_str())
                    .header("x-api-key", api_key)
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .header("Content-Type", "application/json")
                    .json(body)
                    .send()
                    .await
                    .map_err(|e| Fault::classify(&e))?;
                let status = resp.status();
                let raw = resp.text().await.map_err(|e| Fault::classify(&e))?;
                Ok(interpret(status, &raw))
            })
            .await;

        Ok(answer)
    }
}

fn interpret(status: StatusCode, raw: &str) -> Answer {
    match status {
        StatusCode::UNAUTHORIZED => Answer::failed(
            DiagnosticKind::InvalidCredential,
            "Invalid Claude API key. Please check your API key.",
        ),
        StatusCode::TOO_MANY_REQUESTS => Answer::failed(
            DiagnosticKind::RateLimited,
            "Claude API rate limit exceeded. Please try again later.",
        ),
        StatusCode::INTERNAL_SERVER_ERROR => Answer::failed(
            DiagnosticKind::Unavailable,
            "Claude service is temporarily unavailable. Please try again later.",
        ),
        StatusCode::BAD_REQUEST => {
            let parsed = serde_json::from_str::<Value>(raw).ok();
            let message = parsed
                .as_ref()
                .and_then(|v| v.get("error"))
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .unwrap_or(raw);
            if message.to_lowercase().contains(CREDIT_EXHAUSTED) {
                return Answer::failed(
                    DiagnosticKind::InsufficientCredit,
                    INSUFFICIENT_CREDITS_MESSAGE,
                );
            }
            let details = parsed
                .map(|v| v.to_string())
                .unwrap_or_else(|| serde_json::json!({ "message": raw }).to_string());
            error!("Claude 400 error: {}", details);
            Answer::failed(
                DiagnosticKind::InvalidRequest,
                format!("Claude request was invalid. Details: {}", details),
            )
        }
        s if !s.is_success() => {
            error!("Claude HTTP error: {} {}", s.as_u16(), raw);
            Answer::failed(
                DiagnosticKind::ProviderError,
                format!("{} error: {} {}", SERVICE, s.as_u16(), excerpt(raw)),
            )
        }
        _ => content_text(raw)
            .map(Answer::text)
            .unwrap_or_else(|| {
                Answer::failed(
                    DiagnosticKind::NoResponse,
                    "No response received from the Claude AI service.",
                )
            }),
    }
}

/// Messages API 返回内容块列表：优先第一个 text 块，否则拼接所有 text
fn content_text(raw: &str) -> Option<String> {
    let v: Value = serde_json::from_str(raw).ok()?;
    let blocks = v.get("content")?.as_array()?;

    let first_text = blocks.iter().find_map(|b| {
        if b.get("type").and_then(|t| t.as_str()) == Some("text") {
            b.get("text").and_then(|t| t.as_str())
        } else {
            None
        }
    });
    if let Some(text) = first_text {
        return Some(text.to_string());
    }

    let joined = blocks
        .iter()
        .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
        .collect::<Vec<_>>()
        .join(" ");
    let joined = joined.trim();
    if joined.is_empty() {
        None
    } else {
        Some(joined.to_string())
    }
}
