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

const SERVICE: &str = "AI service";
const MAX_OUTPUT_TOKENS: u32 = 1000;
const TOP_P: f32 = 0.8;

#[derive(Clone)]
pub struct GeminiAdapter {
    transport: Transport,
    endpoint: Endpoint,
}

impl GeminiAdapter {
    pub fn new(transport: Transport, endpoint: Endpoint) -> Self {
        Self {
            transport,
            endpoint,
        }
    }
}

#[async_trait]
impl Adapter for GeminiAdapter {
    async fn ask(
        &self,
        question: &str,
        api_key: &str,
        model: Option<&str>,
    ) -> Result<Answer, AskError> {
        if api_key.trim().is_empty() {
            return Err(AskError::MissingCredential("Google Gemini"));
        }

        let model = model.unwrap_or(Provider::Gemini.config().default_model());
        let url = self
            .endpoint
            .join(&format!("models/{}:generateContent", model));
        // Gemini 没有独立的 system 字段，指令拼在正文前
        let body = serde_json::json!({
            "contents": [{
                "parts": [{
                    "text": format!("{}\n\nQuestion: {}", SYSTEM_INSTRUCTION, question)
                }]
            }],
            "generationConfig": {
                "temperature": TEMPERATURE,
                "topP": TOP_P,
                "maxOutputTokens": MAX_OUTPUT_TOKENS
            }
        });

        let client = self.transport.client();
        let (url, body) = (&url, &body);
        let answer = self
            .transport
            .run(self.endpoint.host(), SERVICE, move || async move {
                let resp = client
                    .post(url.as_str())
                    .header("x-goog-api-key", api_key)
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
        StatusCode::TOO_MANY_REQUESTS => Answer::failed(
            DiagnosticKind::RateLimited,
            "API rate limit exceeded. Please try again later.",
        ),
        StatusCode::UNAUTHORIZED => Answer::failed(
            DiagnosticKind::InvalidCredential,
            "Invalid API key. Please check your Google Gemini API key.",
        ),
        StatusCode::INTERNAL_SERVER_ERROR => Answer::failed(
            DiagnosticKind::Unavailable,
            "Google Gemini service is temporarily unavailable. Please try again later.",
        ),
        s if !s.is_success() => {
            error!("Gemini HTTP error: {} {}", s.as_u16(), raw);
            Answer::failed(
                DiagnosticKind::ProviderError,
                format!("AI service error: {} {}", s.as_u16(), excerpt(raw)),
            )
        }
        _ => first_candidate_text(raw)
            .map(Answer::text)
            .unwrap_or_else(|| {
                Answer::failed(
                    DiagnosticKind::NoResponse,
                    "No response received from the AI service.",
                )
            }),
    }
}

/// `candidates[0].content.parts[0].text`
fn first_candidate_text(raw: &str) -> Option<String> {
    let v: Value = serde_json::from_str(raw).ok()?;
    let text = v
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()?;
    Some(text.to_string())
}
