//! Mule - 容器搬运智能体
//!
//! 入口：初始化日志、加载配置、启动存活探针，然后把控制权交给会话生命周期。

use std::sync::Arc;

use anyhow::Context;
use mule::config::{load_config, AppConfig};
use mule::core::SessionLifecycle;
use mule::world::sim::SimConnector;
use mule::{observability, status};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let config = match load_config(None) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Config load failed ({}), using defaults", e);
            AppConfig::default()
        }
    };
    tracing::info!(
        "Connecting to {}:{} as {}",
        config.server.host,
        config.server.port,
        config.account.username
    );

    // 存活探针与主循环独立运行，互不影响对方的失败域
    let bind_addr = config.status.bind_addr.clone();
    tokio::spawn(async move {
        if let Err(e) = status::serve(&bind_addr).await {
            tracing::error!("Status endpoint failed: {}", e);
        }
    });

    let connector = Arc::new(SimConnector::demo());
    SessionLifecycle::new(connector, config)
        .run()
        .await
        .context("Session lifecycle terminated with error")?;

    Ok(())
}
