//! 搬运循环内的步骤错误
//!
//! 任一变体都只终止当前这一轮：编排器记录日志、尽力关闭已开容器、清掉在途标志，
//! 错误不会越过循环边界。连接类错误走事件流（DisconnectCategory），不经过这里。

use thiserror::Error;

use crate::world::{NavigationError, WorldError};

/// 单轮搬运中可能失败的步骤（导航 / 世界交互）
#[derive(Error, Debug)]
pub enum BotError {
    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error(transparent)]
    World(#[from] WorldError),
}
