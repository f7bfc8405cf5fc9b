use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

/// 所有供应商共用的系统指令
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful healthcare AI assistant. Provide accurate, helpful medical information while reminding users to consult healthcare professionals for medical advice.";

/// 额度耗尽诊断中的稳定标记，调度器据此触发回退
pub const INSUFFICIENT_CREDITS_MARKER: &str = "insufficient credits";

pub const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    DnsUnresolved,     // 域名解析失败（环境问题，不重试）
    Unreachable,       // 连接失败，重试耗尽
    Timeout,           // 超时，重试耗尽
    InvalidCredential, // 401
    RateLimited,       // 429
    Unavailable,       // 500
    InsufficientCredit,
    InvalidRequest, // 400
    NoResponse,     // 成功响应但结构不完整
    ProviderError,  // 其他状态码
    Unexpected,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::DnsUnresolved => "dns_unresolved",
            DiagnosticKind::Unreachable => "unreachable",
            DiagnosticKind::Timeout => "timeout",
            DiagnosticKind::InvalidCredential => "invalid_credential",
            DiagnosticKind::RateLimited => "rate_limited",
            DiagnosticKind::Unavailable => "unavailable",
            DiagnosticKind::InsufficientCredit => "insufficient_credit",
            DiagnosticKind::InvalidRequest => "invalid_request",
            DiagnosticKind::NoResponse => "no_response",
            DiagnosticKind::ProviderError => "provider_error",
            DiagnosticKind::Unexpected => "unexpected",
        }
    }
}

/// 面向用户的诊断信息：`message` 保持原有展示文本，`kind` 用于程序判断
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// 一次提问的结果：模型回答，或一条可直接展示的诊断
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Text(String),
    Failed(Diagnostic),
}

impl Answer {
    pub fn text(text: impl Into<String>) -> Self {
        Answer::Text(text.into())
    }

    pub fn failed(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Answer::Failed(Diagnostic::new(kind, message))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Answer::Text(t) => t,
            Answer::Failed(d) => &d.message,
        }
    }

    pub fn into_string(self) -> String {
        match self {
            Answer::Text(t) => t,
            Answer::Failed(d) => d.message,
        }
    }

    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Answer::Text(_) => None,
            Answer::Failed(d) => Some(d),
        }
    }

    /// `answer` 或诊断类别，供 HTTP 层透出
    pub fn outcome(&self) -> &'static str {
        match self {
            Answer::Text(_) => "answer",
            Answer::Failed(d) => d.kind.as_str(),
        }
    }

    pub fn signals_insufficient_credit(&self) -> bool {
        match self {
            Answer::Text(_) => false,
            Answer::Failed(d) => d
                .message
                .to_lowercase()
                .contains(INSUFFICIENT_CREDITS_MARKER),
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum AskError {
    #[error("{0} API key is required")]
    MissingCredential(&'static str),
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),
    #[error("invalid endpoint {0}")]
    InvalidEndpoint(String),
    #[error("http error: {0}")]
    Http(String),
}

#[async_trait]
pub trait Adapter: Send + Sync {
    /// 缺少 API key 时直接返回 `AskError::MissingCredential`，其余失败都以 `Answer::Failed` 返回
    async fn ask(
        &self,
        question: &str,
        api_key: &str,
        model: Option<&str>,
    ) -> Result<Answer, AskError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_marker_only_matches_failures() {
        let failed = Answer::failed(
            DiagnosticKind::InsufficientCredit,
            "Claude is unavailable for this account right now (Insufficient Credits).",
        );
        assert!(failed.signals_insufficient_credit());

        let text = Answer::text("you may have insufficient credits of vitamin D");
        assert!(!text.signals_insufficient_credit());
    }

    #[test]
    fn display_keeps_diagnostic_text() {
        let answer = Answer::failed(DiagnosticKind::RateLimited, "slow down");
        assert_eq!(answer.to_string(), "slow down");
        assert_eq!(answer.outcome(), "rate_limited");
        assert_eq!(Answer::text("ok").outcome(), "answer");
    }
}
