use crate::ai::types::{Answer, AskError, DiagnosticKind};
use async_trait::async_trait;
use log::{error, info, warn};
use regex::Regex;
use std::fmt;
use std::future::Future;
use std::io;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

pub const MAX_ATTEMPTS: u32 = 3;
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// 指数退避：第 n 次失败后等待 `base_delay * 2^n`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }
}

#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn resolve(&self, host: &str) -> io::Result<()>;
}

/// 使用系统 DNS 解析
pub struct SystemResolver;

#[async_trait]
impl HostResolver for SystemResolver {
    async fn resolve(&self, host: &str) -> io::Result<()> {
        let mut addrs = tokio::net::lookup_host((host, 443)).await?;
        if addrs.next().is_none() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no addresses found for {}", host),
            ));
        }
        Ok(())
    }
}

/// 单次请求的传输层失败
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    Dns(String),
    Connect(String),
    Timeout(String),
    Other(String),
}

impl Fault {
    pub fn classify(err: &reqwest::Error) -> Self {
        let detail = error_chain(err);
        if err.is_timeout() {
            Fault::Timeout(detail)
        } else if err.is_connect() {
            if looks_like_dns(&detail) {
                Fault::Dns(detail)
            } else {
                Fault::Connect(detail)
            }
        } else {
            Fault::Other(detail)
        }
    }

    fn is_transient(&self) -> bool {
        matches!(self, Fault::Connect(_) | Fault::Timeout(_))
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::Dns(m) => write!(f, "dns: {}", m),
            Fault::Connect(m) => write!(f, "connect: {}", m),
            Fault::Timeout(m) => write!(f, "timeout: {}", m),
            Fault::Other(m) => write!(f, "{}", m),
        }
    }
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(s) = source {
        parts.push(s.to_string());
        source = s.source();
    }
    parts.join(": ")
}

fn looks_like_dns(detail: &str) -> bool {
    static DNS_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    DNS_PATTERN
        .get_or_init(|| {
            Regex::new(
                r"(?i)dns error|failed to lookup address|name or service not known|nodename nor servname|no such host|getaddrinfo|name resolution",
            )
            .ok()
        })
        .as_ref()
        .map(|re| re.is_match(detail))
        .unwrap_or(false)
}

/// 供应商请求的端点：基础 URL 和用于 DNS 预检的主机名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base_url: String,
    host: String,
}

impl Endpoint {
    pub fn parse(base_url: &str) -> Result<Self, AskError> {
        let url = reqwest::Url::parse(base_url)
            .map_err(|e| AskError::InvalidEndpoint(format!("{}: {}", base_url, e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| AskError::InvalidEndpoint(format!("{}: missing host", base_url)))?
            .to_string();
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            host,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn join(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

pub fn dns_failure(detail: &str) -> Answer {
    Answer::failed(
        DiagnosticKind::DnsUnresolved,
        format!(
            "DNS resolution failed. Please check your internet connection or DNS settings. Error: {}",
            detail
        ),
    )
}

pub fn unexpected_failure() -> Answer {
    Answer::failed(
        DiagnosticKind::Unexpected,
        "An unexpected error occurred while processing your request. Please try again later.",
    )
}

/// 所有适配器共享的 HTTP 客户端、解析器与重试策略
#[derive(Clone)]
pub struct Transport {
    client: reqwest::Client,
    resolver: Arc<dyn HostResolver>,
    retry: RetryPolicy,
}

impl Transport {
    pub fn new(client: reqwest::Client, resolver: Arc<dyn HostResolver>, retry: RetryPolicy) -> Self {
        Self {
            client,
            resolver,
            retry,
        }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// 执行一次带 DNS 预检与重试的调用
    ///
    /// * `host` - 每次尝试前预检的主机名
    /// * `service` - 诊断文本中的服务名，如 "Claude AI service"
    /// * `attempt` - 单次请求；返回 `Ok` 即结束（包括供应商报告的错误）
    ///
    /// 只有超时和非 DNS 的连接失败会重试；结果永远是 `Answer`。
    pub async fn run<F, Fut>(&self, host: &str, service: &str, mut attempt: F) -> Answer
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Answer, Fault>>,
    {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut last = None;

        for try_num in 0..max_attempts {
            if let Err(e) = self.resolver.resolve(host).await {
                error!("DNS resolution failed for {}: {}", host, e);
                return dns_failure(&e.to_string());
            }

            match attempt().await {
                Ok(answer) => {
                    if try_num > 0 {
                        info!("{} request(...) [{} tries]", service, try_num + 1);
                    }
                    return answer;
                }
                Err(Fault::Dns(detail)) => {
                    error!("DNS resolution error on attempt {}: {}", try_num + 1, detail);
                    return dns_failure(&detail);
                }
                Err(fault) if fault.is_transient() => {
                    warn!(
                        "{} attempt {}/{} failed: {}",
                        service,
                        try_num + 1,
                        max_attempts,
                        fault
                    );
                    last = Some(fault);
                    if try_num + 1 < max_attempts {
                        tokio::time::sleep(self.retry.delay_for(try_num)).await;
                    }
                }
                Err(fault) => {
                    error!("Unexpected error calling {}: {}", service, fault);
                    return unexpected_failure();
                }
            }
        }

        warn!("{} request(...) [max {} tries ran out]", service, max_attempts);
        match last {
            Some(Fault::Timeout(_)) => Answer::failed(
                DiagnosticKind::Timeout,
                format!(
                    "Request timeout. The {} is taking longer than expected to respond.",
                    service
                ),
            ),
            Some(Fault::Connect(_)) => Answer::failed(
                DiagnosticKind::Unreachable,
                format!(
                    "Unable to connect to the {}. Please check your internet connection.",
                    service
                ),
            ),
            _ => Answer::failed(
                DiagnosticKind::Unexpected,
                "Maximum retry attempts reached. Please try again later.",
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    struct CountingResolver {
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HostResolver for CountingResolver {
        async fn resolve(&self, _host: &str) -> io::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(io::Error::new(io::ErrorKind::Other, "simulated lookup failure"))
            } else {
                Ok(())
            }
        }
    }

    fn transport(fail_dns: bool) -> (Transport, Arc<CountingResolver>) {
        let resolver = Arc::new(CountingResolver {
            fail: fail_dns,
            calls: AtomicUsize::new(0),
        });
        let t = Transport::new(
            reqwest::Client::new(),
            resolver.clone(),
            RetryPolicy::default(),
        );
        (t, resolver)
    }

    #[test]
    fn backoff_doubles() {
        let p = RetryPolicy::default();
        assert_eq!(p.delay_for(0), Duration::from_secs(1));
        assert_eq!(p.delay_for(1), Duration::from_secs(2));
        assert_eq!(p.delay_for(2), Duration::from_secs(4));
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let ep = Endpoint::parse("https://api.anthropic.com/v1/").unwrap();
        assert_eq!(ep.host(), "api.anthropic.com");
        assert_eq!(ep.join("/messages"), "https://api.anthropic.com/v1/messages");
        assert!(Endpoint::parse("not a url").is_err());
    }

    #[test]
    fn dns_messages_are_recognized() {
        assert!(looks_like_dns(
            "error sending request: client error (Connect): dns error: failed to lookup address information"
        ));
        assert!(!looks_like_dns("tcp connect error: Connection refused (os error 111)"));
    }

    #[tokio::test(start_paused = true)]
    async fn timeouts_retry_with_growing_delay() {
        let (t, resolver) = transport(false);
        let stamps = Mutex::new(Vec::new());

        let answer = t
            .run("example.test", "Mistral AI service", || {
                stamps.lock().unwrap().push(Instant::now());
                async { Err(Fault::Timeout("timed out".to_string())) }
            })
            .await;

        let stamps = stamps.into_inner().unwrap();
        assert_eq!(stamps.len(), 3);
        let first_gap = stamps[1] - stamps[0];
        let second_gap = stamps[2] - stamps[1];
        assert!(second_gap > first_gap);
        assert_eq!(first_gap, Duration::from_secs(1));
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 3);

        let d = answer.diagnostic().unwrap();
        assert_eq!(d.kind, DiagnosticKind::Timeout);
        assert_eq!(
            d.message,
            "Request timeout. The Mistral AI service is taking longer than expected to respond."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn connect_errors_are_transient() {
        let (t, _) = transport(false);
        let calls = AtomicUsize::new(0);

        let answer = t
            .run("example.test", "OpenAI service", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(Fault::Connect("connection refused".to_string()))
                    } else {
                        Ok(Answer::text("recovered"))
                    }
                }
            })
            .await;

        assert_eq!(answer, Answer::text("recovered"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn failed_precheck_skips_the_call() {
        let (t, resolver) = transport(true);
        let calls = AtomicUsize::new(0);

        let answer = t
            .run("example.test", "AI service", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(Answer::text("unreachable")) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
        assert_eq!(answer.diagnostic().unwrap().kind, DiagnosticKind::DnsUnresolved);
        assert!(answer.as_str().starts_with("DNS resolution failed."));
    }

    #[tokio::test]
    async fn dns_fault_during_call_is_not_retried() {
        let (t, _) = transport(false);
        let calls = AtomicUsize::new(0);

        let answer = t
            .run("example.test", "AI service", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Fault::Dns("dns error".to_string())) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(answer.diagnostic().unwrap().kind, DiagnosticKind::DnsUnresolved);
    }

    #[tokio::test]
    async fn other_faults_become_generic_diagnostic() {
        let (t, _) = transport(false);
        let answer = t
            .run("example.test", "AI service", || async {
                Err(Fault::Other("builder error".to_string()))
            })
            .await;
        assert_eq!(answer, unexpected_failure());
    }
}
