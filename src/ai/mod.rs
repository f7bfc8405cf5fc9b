pub mod claude;
pub mod dispatcher;
pub mod gemini;
pub mod mistral;
pub mod openai;
pub mod registry;
pub mod resilience;
pub mod types;
pub mod unified;

#[cfg(test)]
pub(crate) mod testing;

pub use dispatcher::{CredentialSource, Dispatcher, EnvCredentials};
pub use registry::Provider;
pub use resilience::{HostResolver, RetryPolicy, SystemResolver, Transport};
pub use types::{Adapter, Answer, AskError, DiagnosticKind};
pub use unified::AnyAdapter;

use std::time::Duration;

/// 构建供应商共用的 HTTP 客户端；`proxy` 未写协议时按 socks5h 处理
pub(crate) fn build_llm_http_client(
    timeout: Duration,
    proxy: Option<&str>,
) -> Result<reqwest::Client, AskError> {
    let mut builder = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("medlife/", env!("CARGO_PKG_VERSION")));

    if let Some(raw) = proxy {
        let t = raw.trim();
        if !t.is_empty() {
            let url = if t.contains("://") {
                t.to_string()
            } else {
                format!("socks5h://{}", t)
            };
            let proxy = reqwest::Proxy::all(&url).map_err(|e| AskError::Http(e.to_string()))?;
            builder = builder.proxy(proxy);
        }
    }

    builder.build().map_err(|e| AskError::Http(e.to_string()))
}
