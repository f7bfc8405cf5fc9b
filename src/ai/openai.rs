use crate::ai::registry::Provider;
use crate::ai::resilience::{Endpoint, Fault, Transport};
use crate::ai::types::{
    Adapter, Answer, AskError, DiagnosticKind, SYSTEM_INSTRUCTION, TEMPERATURE,
};
use async_trait::async_trait;
use log::error;
use reqwest::StatusCode;
use serde_json::Value;

const SERVICE: &str = "OpenAI service";
const MAX_TOKENS: u32 = 1000;

#[derive(Clone)]
pub struct OpenAiAdapter {
    transport: Transport,
    endpoint: Endpoint,
}

impl OpenAiAdapter {
    pub fn new(transport: Transport, endpoint: Endpoint) -> Self {
        Self {
            transport,
            endpoint,
        }
    }
}

#[async_trait]
impl Adapter for OpenAiAdapter {
    async fn ask(
        &self,
        question: &str,
        api_key: &str,
        model: Option<&str>,
    ) -> Result<Answer, AskError> {
        if api_key.trim().is_empty() {
            return Err(AskError::MissingCredential("OpenAI"));
        }

        let model = model.unwrap_or(Provider::OpenAi.config().default_model());
        let url = self.endpoint.join("chat/completions");
        let body = serde_json::json!({
            "model": model,
            "messages": [
                {"role": "system", "content": SYSTEM_INSTRUCTION},
                {"role": "user", "content": question}
            ],
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE
        });

        let client = self.transport.client();
        let (url, body) = (&url, &body);
        let answer = self
            .transport
            .run(self.endpoint.host(), SERVICE, move || async move {
                let resp = client
                    .post(url.as_str())
                    .bearer_auth(api_key)
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

pub(crate) fn interpret(status: StatusCode, raw: &str) -> Answer {
    match status {
        StatusCode::UNAUTHORIZED => Answer::failed(
            DiagnosticKind::InvalidCredential,
            "Invalid OpenAI API key. Please check your API key and try again.",
        ),
        StatusCode::TOO_MANY_REQUESTS => Answer::failed(
            DiagnosticKind::RateLimited,
            "OpenAI API rate limit exceeded. Please try again later.",
        ),
        StatusCode::INTERNAL_SERVER_ERROR => Answer::failed(
            DiagnosticKind::Unavailable,
            "OpenAI service is temporarily unavailable. Please try again later.",
        ),
        s if !s.is_success() => {
            error!("OpenAI HTTP error: {} {}", s.as_u16(), raw);
            Answer::failed(
                DiagnosticKind::ProviderError,
                format!("OpenAI service error: {} {}", s.as_u16(), excerpt(raw)),
            )
        }
        _ => first_choice_text(raw)
            .map(Answer::text)
            .unwrap_or_else(|| {
                Answer::failed(
                    DiagnosticKind::NoResponse,
                    "No response received from the OpenAI service.",
                )
            }),
    }
}

/// `choices[0].message.content`，兼容 content 为文本片段数组的情况
pub(crate) fn first_choice_text(raw: &str) -> Option<String> {
    let v: Value = serde_json::from_str(raw).ok()?;
    let content = v.get("choices")?.get(0)?.get("message")?.get("content")?;
    let text = match content {
        Value::String(s) => s.clone(),
        Value::Array(arr) => arr
            .iter()
            .filter_map(|it| it.get("text").and_then(|x| x.as_str()))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => return None,
    };
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

pub(crate) fn excerpt(raw: &str) -> String {
    const LIMIT: usize = 300;
    let trimmed = raw.trim();
    match trimmed.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_choice() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"Drink water."}}]}"#;
        assert_eq!(interpret(StatusCode::OK, raw), Answer::text("Drink water."));
    }

    #[test]
    fn empty_choices_is_no_response() {
        let answer = interpret(StatusCode::OK, r#"{"choices":[]}"#);
        assert_eq!(answer.diagnostic().unwrap().kind, DiagnosticKind::NoResponse);
        let answer = interpret(StatusCode::OK, "<html>gateway</html>");
        assert_eq!(answer.diagnostic().unwrap().kind, DiagnosticKind::NoResponse);
    }

    #[test]
    fn maps_status_codes() {
        let kind = |s| interpret(s, "{}").diagnostic().unwrap().kind;
        assert_eq!(kind(StatusCode::UNAUTHORIZED), DiagnosticKind::InvalidCredential);
        assert_eq!(kind(StatusCode::TOO_MANY_REQUESTS), DiagnosticKind::RateLimited);
        assert_eq!(kind(StatusCode::INTERNAL_SERVER_ERROR), DiagnosticKind::Unavailable);
        assert_eq!(kind(StatusCode::BAD_GATEWAY), DiagnosticKind::ProviderError);
    }

    #[test]
    fn excerpt_is_char_safe() {
        let long = "é".repeat(400);
        let out = excerpt(&long);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), 303);
    }
}
