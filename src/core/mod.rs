//! 核心运行时：会话状态、健康监视、容器发现、搬运编排与调度
//!
//! 分层约定：health/session 是纯状态层；discovery/transfer 通过 world 的
//! trait 做实际交互；scheduler 负责周期触发；lifecycle 在最外层拥有会话。

pub mod discovery;
pub mod error;
pub mod health;
pub mod lifecycle;
pub mod scheduler;
pub mod session;
pub mod transfer;

pub use error::BotError;
pub use health::ConnectionHealth;
pub use lifecycle::SessionLifecycle;
pub use scheduler::CycleScheduler;
pub use session::{SessionState, TransferGuard};
pub use transfer::TransferOrchestrator;
