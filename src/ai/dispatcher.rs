use crate::ai::registry::Provider;
use crate::ai::resilience::{Endpoint, Transport};
use crate::ai::types::{Adapter, Answer, AskError};
use crate::ai::unified::AnyAdapter;
use log::{info, warn};
use std::collections::HashMap;
use std::sync::Arc;

/// 回退供应商的凭据来源
pub trait CredentialSource: Send + Sync {
    fn api_key(&self, provider: Provider) -> Option<String>;
}

/// 从 `{PROVIDER}_API_KEY` 环境变量读取，空值视为缺失
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn api_key(&self, provider: Provider) -> Option<String> {
        std::env::var(provider.credential_env())
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    adapters: HashMap<Provider, AnyAdapter>,
    credentials: Arc<dyn CredentialSource>,
}

impl Dispatcher {
    pub fn new(
        transport: Transport,
        credentials: Arc<dyn CredentialSource>,
    ) -> Result<Self, AskError> {
        Self::with_endpoints(transport, credentials, &HashMap::new())
    }

    /// `overrides` 中的基础 URL 替换注册表默认值
    pub fn with_endpoints(
        transport: Transport,
        credentials: Arc<dyn CredentialSource>,
        overrides: &HashMap<Provider, String>,
    ) -> Result<Self, AskError> {
        let mut adapters = HashMap::new();
        for provider in Provider::ALL {
            let base_url = overrides
                .get(&provider)
                .map(String::as_str)
                .unwrap_or(provider.config().base_url);
            let endpoint = Endpoint::parse(base_url)?;
            adapters.insert(
                provider,
                AnyAdapter::new(provider, transport.clone(), endpoint),
            );
        }
        Ok(Self {
            adapters,
            credentials,
        })
    }

    pub fn adapter(&self, provider: Provider) -> Option<&AnyAdapter> {
        self.adapters.get(&provider)
    }

    /// 调用 `provider_id` 对应的适配器
    ///
    /// 未知供应商直接报错。Claude 报告额度不足且给出了可用的回退供应商与凭据时，
    /// 改用回退供应商作答；回退路径上的任何失败都保留原始结果。
    pub async fn dispatch(
        &self,
        question: &str,
        api_key: &str,
        provider_id: &str,
        model: Option<&str>,
        fallback_id: Option<&str>,
    ) -> Result<Answer, AskError> {
        let provider: Provider = provider_id.parse()?;
        let adapter = self
            .adapter(provider)
            .ok_or_else(|| AskError::UnsupportedProvider(provider_id.to_string()))?;

        let primary = adapter.ask(question, api_key, model).await?;

        if provider != Provider::Claude || !primary.signals_insufficient_credit() {
            return Ok(primary);
        }

        let Some(fallback) = fallback_id.and_then(|id| id.parse::<Provider>().ok()) else {
            return Ok(primary);
        };
        let Some(fallback_key) = self.credentials.api_key(fallback) else {
            info!(
                "Claude out of credits, no {} set for fallback",
                fallback.credential_env()
            );
            return Ok(primary);
        };
        let Some(fallback_adapter) = self.adapter(fallback) else {
            return Ok(primary);
        };

        info!("Claude out of credits, falling back to {}", fallback);
        match fallback_adapter.ask(question, &fallback_key, None).await {
            Ok(answer @ Answer::Text(_)) => Ok(answer),
            Ok(Answer::Failed(d)) => {
                warn!("fallback {} failed: {}", fallback, d.message);
                Ok(primary)
            }
            Err(e) => {
                warn!("fallback {} failed: {}", fallback, e);
                Ok(primary)
            }
        }
    }
}
