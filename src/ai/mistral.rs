use crate::ai::openai::{excerpt, first_choice_text};
use crate::ai::registry::Provider;
use crate::ai::resilience::{Endpoint, Fault, Transport};
use crate::ai::types::{
    Adapter, Answer, AskError, DiagnosticKind, SYSTEM_INSTRUCTION, TEMPERATURE,
};
use async_trait::async_trait;
use log::error;
use reqwest::StatusCode;
use serde_json::Value;

const SERVICE: &str = "Mistral AI service";
const MAX_TOKENS: u32 = 1000;

#[derive(Clone)]
pub struct MistralAdapter {
    transport: Transport,
    endpoint: Endpoint,
}

impl MistralAdapter {
    pub fn new(transport: Transport, endpoint: Endpoint) -> Self {
        Self {
            transport,
            endpoint,
        }
    }
}

#[async_trait]
impl Adapter for MistralAdapter {
    async fn ask(
        &self,
        question: &str,
        api_key: &str,
        model: Option<&str>,
    ) -> Result<Answer, AskError> {
        if api_key.trim().is_empty() {
            return Err(AskError::MissingCredential("Mistral"));
        }

        let model = model.unwrap_or(Provider::Mistral.config().default_model());
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

fn interpret(status: StatusCode, raw: &str) -> Answer {
    match status {
        StatusCode::UNAUTHORIZED => Answer::failed(
            DiagnosticKind::InvalidCredential,
            "Invalid Mistral API key. Please check your API key and try again.",
        ),
        StatusCode::TOO_MANY_REQUESTS => Answer::failed(
            DiagnosticKind::RateLimited,
            "Mistral API rate limit exceeded. Please try again later.",
        ),
        StatusCode::INTERNAL_SERVER_ERROR => Answer::failed(
            DiagnosticKind::Unavailable,
            "Mistral service is temporarily unavailable. Please try again later.",
        ),
        StatusCode::BAD_REQUEST => {
            // 非 JSON 的错误体原样带回
            let details = serde_json::from_str::<Value>(raw)
                .map(|v| v.to_string())
                .unwrap_or_else(|_| serde_json::json!({ "message": raw }).to_string());
            error!("Mistral 400 error: {}", details);
            Answer::failed(
                DiagnosticKind::InvalidRequest,
                format!("Mistral request was invalid. Details: {}", details),
            )
        }
        s if !s.is_success() => {
            error!("Mistral HTTP error: {} {}", s.as_u16(), raw);
            Answer::failed(
                DiagnosticKind::ProviderError,
                format!("Mistral AI service error: {} {}", s.as_u16(), excerpt(raw)),
            )
        }
        _ => first_choice_text(raw)
            .map(Answer::text)
            .unwrap_or_else(|| {
                Answer::failed(
                    DiagnosticKind::NoResponse,
                    "No response received from the Mistral AI service.",
                )
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_request_carries_details() {
        let raw = r#"{"object":"error","message":"Invalid model: mistral-tiny-9000"}"#;
        let answer = interpret(StatusCode::BAD_REQUEST, raw);
        let d = answer.diagnostic().unwrap();
        assert_eq!(d.kind, DiagnosticKind::InvalidRequest);
        assert!(d.message.starts_with("Mistral request was invalid. Details: "));
        assert!(d.message.contains("mistral-tiny-9000"));

        let answer = interpret(StatusCode::BAD_REQUEST, "plain text");
        assert!(answer.as_str().contains(r#""message":"plain text""#));
    }

    #[test]
    fn success_reads_choices() {
        let raw = r#"{"choices":[{"index":0,"message":{"content":"Rest and fluids."}}]}"#;
        assert_eq!(interpret(StatusCode::OK, raw), Answer::text("Rest and fluids."));
        assert_eq!(
            interpret(StatusCode::OK, "{}").as_str(),
            "No response received from the Mistral AI service."
        );
    }
}
