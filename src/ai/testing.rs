//! 测试共用的解析器桩、静态凭据与指向本地 mock 的调度器

use super::resilience::Endpoint;
use super::*;
use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub struct StubResolver {
    fail: bool,
    calls: AtomicUsize,
}

impl StubResolver {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HostResolver for StubResolver {
    async fn resolve(&self, host: &str) -> io::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("failed to lookup address information for {}", host),
            ))
        } else {
            Ok(())
        }
    }
}

pub struct StaticCredentials(pub HashMap<Provider, String>);

impl CredentialSource for StaticCredentials {
    fn api_key(&self, provider: Provider) -> Option<String> {
        self.0.get(&provider).cloned()
    }
}

pub fn transport(resolver: Arc<StubResolver>) -> Transport {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(150))
        .no_proxy()
        .build()
        .unwrap();
    Transport::new(
        client,
        resolver,
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(10),
        },
    )
}

pub fn adapter_at(provider: Provider, url: &str, resolver: Arc<StubResolver>) -> AnyAdapter {
    AnyAdapter::new(provider, transport(resolver), Endpoint::parse(url).unwrap())
}

/// 所有供应商都指向 `url`
pub fn dispatcher_at(url: &str, credentials: HashMap<Provider, String>) -> Dispatcher {
    let overrides = Provider::ALL
        .into_iter()
        .map(|p| (p, url.to_string()))
        .collect::<HashMap<_, _>>();
    Dispatcher::with_endpoints(
        transport(StubResolver::ok()),
        Arc::new(StaticCredentials(credentials)),
        &overrides,
    )
    .unwrap()
}

/// 各供应商成功响应的最小信封
pub fn success_body(provider: Provider, text: &str) -> String {
    match provider {
        Provider::OpenAi | Provider::Mistral => serde_json::json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": text}}]
        }),
        Provider::Gemini => serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": text}]}}]
        }),
        Provider::Claude => serde_json::json!({
            "content": [{"type": "text", "text": text}]
        }),
    }
    .to_string()
}
