use crate::ai::types::AskError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Gemini,
    Mistral,
    Claude,
}

pub const DEFAULT_PROVIDER: Provider = Provider::OpenAi;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub provider: Provider,
    pub name: &'static str,
    pub base_url: &'static str,
    /// 第一个为默认（最便宜）模型
    pub models: &'static [&'static str],
}

impl ProviderConfig {
    pub fn default_model(&self) -> &'static str {
        self.models[0]
    }
}

static REGISTRY: [ProviderConfig; 4] = [
    ProviderConfig {
        provider: Provider::OpenAi,
        name: "OpenAI",
        base_url: "https://api.openai.com/v1",
        models: &["gpt-3.5-turbo", "gpt-4", "gpt-4-turbo-preview"],
    },
    ProviderConfig {
        provider: Provider::Gemini,
        name: "Google Gemini",
        base_url: "https://generativelanguage.googleapis.com/v1beta",
        models: &["gemini-2.0-flash", "gemini-2.0", "gemini-pro"],
    },
    ProviderConfig {
        provider: Provider::Mistral,
        name: "Mistral AI",
        base_url: "https://api.mistral.ai/v1",
        models: &[
            "mistral-small-latest",
            "mistral-large-latest",
            "open-mistral-7b",
        ],
    },
    // Claude 低价模型排在最前
    ProviderConfig {
        provider: Provider::Claude,
        name: "Anthropic Claude",
        base_url: "https://api.anthropic.com/v1",
        models: &[
            "claude-3-haiku-20240307",
            "claude-3-5-sonnet-latest",
            "claude-3-opus-20240229",
        ],
    },
];

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::OpenAi,
        Provider::Gemini,
        Provider::Mistral,
        Provider::Claude,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Gemini => "gemini",
            Provider::Mistral => "mistral",
            Provider::Claude => "claude",
        }
    }

    pub fn config(&self) -> &'static ProviderConfig {
        match self {
            Provider::OpenAi => &REGISTRY[0],
            Provider::Gemini => &REGISTRY[1],
            Provider::Mistral => &REGISTRY[2],
            Provider::Claude => &REGISTRY[3],
        }
    }

    /// 回退凭据的环境变量名，如 `OPENAI_API_KEY`
    pub fn credential_env(&self) -> String {
        format!("{}_API_KEY", self.id().to_uppercase())
    }

    /// 覆盖端点的环境变量名，如 `CLAUDE_BASE_URL`
    pub fn base_url_env(&self) -> String {
        format!("{}_BASE_URL", self.id().to_uppercase())
    }
}

impl FromStr for Provider {
    type Err = AskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provider::ALL
            .into_iter()
            .find(|p| p.id() == s)
            .ok_or_else(|| AskError::UnsupportedProvider(s.to_string()))
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// 元数据查询：未知标识回落到默认供应商，不报错
pub fn lookup(id: &str) -> &'static ProviderConfig {
    id.parse::<Provider>()
        .unwrap_or(DEFAULT_PROVIDER)
        .config()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_identifier_resolves_to_default() {
        assert_eq!(lookup("openia"), Provider::OpenAi.config());
        assert_eq!(lookup(""), Provider::OpenAi.config());
        assert_eq!(lookup("claude").name, "Anthropic Claude");
    }

    #[test]
    fn parse_is_strict() {
        assert_eq!("mistral".parse::<Provider>().unwrap(), Provider::Mistral);
        assert!(matches!(
            "Mistral".parse::<Provider>(),
            Err(AskError::UnsupportedProvider(_))
        ));
    }

    #[test]
    fn registry_is_indexed_by_provider() {
        for p in Provider::ALL {
            assert_eq!(p.config().provider, p);
            assert!(!p.config().models.is_empty());
        }
        assert_eq!(Provider::Claude.config().default_model(), "claude-3-haiku-20240307");
        assert_eq!(Provider::Gemini.credential_env(), "GEMINI_API_KEY");
    }
}
