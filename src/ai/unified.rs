use crate::ai::claude::ClaudeAdapter;
use crate::ai::gemini::GeminiAdapter;
use crate::ai::mistral::MistralAdapter;
use crate::ai::openai::OpenAiAdapter;
use crate::ai::registry::Provider;
use crate::ai::resilience::{Endpoint, Transport};
use crate::ai::types::{Adapter, Answer, AskError};
use async_trait::async_trait;

/// 每个供应商一个变体；新增供应商即新增变体与适配器
#[derive(Clone)]
pub enum AnyAdapter {
    OpenAi(OpenAiAdapter),
    Gemini(GeminiAdapter),
    Mistral(MistralAdapter),
    Claude(ClaudeAdapter),
}

impl AnyAdapter {
    pub fn new(provider: Provider, transport: Transport, endpoint: Endpoint) -> Self {
        match provider {
            Provider::OpenAi => AnyAdapter::OpenAi(OpenAiAdapter::new(transport, endpoint)),
            Provider::Gemini => AnyAdapter::Gemini(GeminiAdapter::new(transport, endpoint)),
            Provider::Mistral => AnyAdapter::Mistral(MistralAdapter::new(transport, endpoint)),
            Provider::Claude => AnyAdapter::Claude(ClaudeAdapter::new(transport, endpoint)),
        }
    }
}

#[async_trait]
impl Adapter for AnyAdapter {
    async fn ask(
        &self,
        question: &str,
        api_key: &str,
        model: Option<&str>,
    ) -> Result<Answer, AskError> {
        match self {
            AnyAdapter::OpenAi(a) => a.ask(question, api_key, model).await,
            AnyAdapter::Gemini(a) => a.ask(question, api_key, model).await,
            AnyAdapter::Mistral(a) => a.ask(question, api_key, model).await,
            AnyAdapter::Claude(a) => a.ask(question, api_key, model).await,
        }
    }
}
