//! 存活探针：单路由 HTTP 端点
//!
//! 只回一行文本表明进程在跑，供容器平台 / 进程看护做存活检查。
//! 不暴露会话内部状态，失败域与主循环完全独立。

use axum::routing::get;
use axum::Router;

async fn index() -> &'static str {
    "Container transfer bot is running"
}

/// 绑定并持续服务存活探针；绑定失败直接带错返回
pub async fn serve(bind_addr: &str) -> anyhow::Result<()> {
    let app = Router::new().route("/", get(index));

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("Status endpoint listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
