use crate::ai::registry;
use crate::ai::{Answer, AskError, Dispatcher, Provider};
use crate::consult::prompt::PromptBuilder;
use crate::crypto;
use log::info;
use serde::Deserialize;
use std::sync::Arc;

/// 一次健康咨询的入参
#[derive(Clone, Debug, Deserialize)]
pub struct ConsultRequest {
    pub query: String,
    pub api_key: String,
    #[serde(default = "default_provider")]
    pub provider: String,
    pub email: Option<String>,
    pub member_data: Option<String>,
    pub fallback_provider: Option<String>,
}

fn default_provider() -> String {
    registry::DEFAULT_PROVIDER.id().to_string()
}

#[derive(Clone)]
pub struct ConsultService {
    dispatcher: Arc<Dispatcher>,
}

impl ConsultService {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    pub async fn ask(&self, req: &ConsultRequest) -> Result<Answer, AskError> {
        let prompt = PromptBuilder::new(&req.query)
            .member_data(req.member_data.as_deref())
            .build();
        let model = registry::lookup(&req.provider).default_model();

        // 带邮箱时密钥可能是加密后的令牌；明文密钥解密失败会原样返回
        let api_key = match req.email.as_deref().filter(|e| !e.is_empty()) {
            Some(email) => crypto::decrypt(&req.api_key, email),
            None => req.api_key.clone(),
        };

        info!(
            "consult via {} ({}), fallback={:?}",
            req.provider, model, req.fallback_provider
        );
        self.dispatcher
            .dispatch(
                &prompt,
                &api_key,
                &req.provider,
                Some(model),
                req.fallback_provider.as_deref(),
            )
            .await
    }

    /// 固定走 OpenAI 的简短问答
    pub async fn quick_prompt(&self, query: &str, api_key: &str) -> Result<Answer, AskError> {
        self.dispatcher
            .dispatch(
                &PromptBuilder::quick(query),
                api_key,
                Provider::OpenAi.id(),
                None,
                None,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::{dispatcher_at, success_body};
    use mockito::{Matcher, Server};
    use std::collections::HashMap;

    fn request(provider: &str) -> ConsultRequest {
        ConsultRequest {
            query: "Is my blood pressure fine?".to_string(),
            api_key: "sk-plain".to_string(),
            provider: provider.to_string(),
            email: None,
            member_data: None,
            fallback_provider: None,
        }
    }

    #[tokio::test]
    async fn uses_registry_default_model_and_patient_prompt() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-plain")
            .match_body(Matcher::AllOf(vec![
                Matcher::PartialJson(serde_json::json!({"model": "mistral-small-latest"})),
                Matcher::Regex("Patient Details:".to_string()),
                Matcher::Regex("Name: Jane Doe".to_string()),
            ]))
            .with_status(200)
            .with_body(success_body(Provider::Mistral, "Looks fine."))
            .create_async()
            .await;

        let service = ConsultService::new(Arc::new(dispatcher_at(&server.url(), HashMap::new())));
        let mut req = request("mistral");
        req.member_data = Some(r#"{"firstName":"Jane","lastName":"Doe"}"#.to_string());

        let answer = service.ask(&req).await.unwrap();
        assert_eq!(answer, Answer::text("Looks fine."));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn decrypts_key_when_email_given() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-real")
            .with_status(200)
            .with_body(success_body(Provider::OpenAi, "ok"))
            .expect(2)
            .create_async()
            .await;

        let service = ConsultService::new(Arc::new(dispatcher_at(&server.url(), HashMap::new())));

        let mut req = request("openai");
        req.email = Some("jane@example.com".to_string());
        req.api_key = crypto::encrypt("sk-real", "jane@example.com").unwrap();
        assert_eq!(service.ask(&req).await.unwrap(), Answer::text("ok"));

        // 旧的明文密钥依旧可用
        req.api_key = "sk-real".to_string();
        assert_eq!(service.ask(&req).await.unwrap(), Answer::text("ok"));

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unknown_provider_is_rejected() {
        let service = ConsultService::new(Arc::new(dispatcher_at(
            "http://127.0.0.1:9",
            HashMap::new(),
        )));
        let err = service.ask(&request("bard")).await.unwrap_err();
        assert!(matches!(err, AskError::UnsupportedProvider(_)));
    }

    #[tokio::test]
    async fn quick_prompt_requires_openai_key() {
        let service = ConsultService::new(Arc::new(dispatcher_at(
            "http://127.0.0.1:9",
            HashMap::new(),
        )));
        let err = service.quick_prompt("headache", "").await.unwrap_err();
        assert_eq!(err.to_string(), "OpenAI API key is required");
    }

    #[tokio::test]
    async fn quick_prompt_goes_to_openai() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::AllOf(vec![
                Matcher::PartialJson(serde_json::json!({"model": "gpt-3.5-turbo"})),
                Matcher::Regex("only health related question".to_string()),
            ]))
            .with_status(200)
            .with_body(success_body(Provider::OpenAi, "Rest and hydrate."))
            .create_async()
            .await;

        let service = ConsultService::new(Arc::new(dispatcher_at(&server.url(), HashMap::new())));
        let answer = service.quick_prompt("headache", "sk").await.unwrap();
        assert_eq!(answer.as_str(), "Rest and hydrate.");
        mock.assert_async().await;
    }
}
