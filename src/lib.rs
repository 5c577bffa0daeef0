//! Mule - 容器搬运智能体
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 连接健康、容器发现、搬运编排、循环调度、会话生命周期
//! - **observability**: tracing 日志初始化
//! - **status**: 运行状态 HTTP 端点（存活确认）
//! - **world**: 世界协作者接口（会话 / 导航 / 容器）与进程内模拟实现

pub mod config;
pub mod core;
pub mod observability;
pub mod status;
pub mod world;
