mod ai;
mod chat;
mod config;
mod consult;
mod crypto;
mod server;
mod storage;

use crate::ai::{build_llm_http_client, Dispatcher, EnvCredentials, RetryPolicy, SystemResolver, Transport};
use crate::chat::TranscriptStore;
use crate::config::AppConfig;
use crate::consult::ConsultService;
use crate::server::AppState;
use anyhow::Context;
use chrono::Local;
use log::{info, warn};
use std::sync::Arc;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    // 加载 .env（不存在时只用系统环境变量）
    let env_loaded = dotenv::dotenv().is_ok();

    let cfg = AppConfig::from_env()?;

    let ts = Local::now().format("%Y%m%d-%H%M%S").to_string();
    std::fs::create_dir_all(&cfg.log_dir)
        .with_context(|| format!("创建日志目录失败: {}", cfg.log_dir.display()))?;
    let log_path = cfg.log_dir.join(format!("app-{}.log", ts));
    let log_file = std::fs::File::create(&log_path)?;
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file))) // 输出重定向到文件
        .filter_level(log::LevelFilter::Warn)
        .filter_module("medlife", log::LevelFilter::Info)
        .filter_module("sqlx", log::LevelFilter::Error)
        .filter_module("sea_orm", log::LevelFilter::Error)
        .init();

    if !env_loaded {
        warn!("未找到 .env 文件，使用系统环境变量");
    }
    println!("medlife listening on {} (logs: {})", cfg.bind_addr, log_path.display());

    // 初始化数据库
    let db = storage::establish_connection(&cfg.database_url)
        .await
        .with_context(|| format!("数据库连接失败: {}", cfg.database_url))?;

    let client = build_llm_http_client(cfg.llm_timeout, cfg.llm_proxy.as_deref())?;
    if cfg.llm_proxy.is_some() {
        info!("LLM requests go through proxy");
    }
    let transport = Transport::new(
        client,
        Arc::new(SystemResolver),
        RetryPolicy {
            base_delay: cfg.retry_base,
            ..RetryPolicy::default()
        },
    );
    let dispatcher = Dispatcher::with_endpoints(
        transport,
        Arc::new(EnvCredentials),
        &cfg.endpoint_overrides,
    )?;
    for (provider, url) in &cfg.endpoint_overrides {
        info!("{} endpoint overridden: {}", provider, url);
    }

    let state = AppState::new(
        db,
        ConsultService::new(Arc::new(dispatcher)),
        TranscriptStore::new(&cfg.chat_data_dir),
    );

    server::serve(Arc::new(state), cfg.bind_addr, &cfg.cors_origin).await?;
    Ok(())
}
