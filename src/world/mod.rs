//! 世界协作者接口
//!
//! 核心只依赖这里的窄接口：会话（方块查询 / 容器开关 / 背包 / 等待）、
//! 导航（移动到交互距离内）、容器句柄（读取 / 取出 / 存入）。
//! 协议编码与寻路算法都在接口另一侧，核心不关心。

pub mod sim;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::AppConfig;

pub use types::{
    BlockHandle, ContainerKind, ContainerRef, DisconnectCategory, ItemId, ItemStack,
    SessionEvent, Vec3i,
};

/// 世界交互错误（单轮搬运内的步骤错误来源之一）
#[derive(Error, Debug)]
pub enum WorldError {
    #[error("block search failed: {0}")]
    Search(String),

    #[error("failed to open container: {0}")]
    OpenContainer(String),

    #[error("withdraw failed: {0}")]
    Withdraw(String),

    #[error("deposit failed: {0}")]
    Deposit(String),

    #[error("failed to close container: {0}")]
    CloseContainer(String),
}

/// 导航失败（到达不了目标、寻路中断等）
#[derive(Error, Debug)]
#[error("navigation failed: {0}")]
pub struct NavigationError(pub String);

/// 建立会话失败
#[derive(Error, Debug)]
#[error("connect failed: {0}")]
pub struct ConnectError(pub String);

/// 一条活动会话：方块查询、容器开启、背包读取与世界内等待
#[async_trait]
pub trait WorldSession: Send + Sync {
    /// 在 radius 范围内查找种类匹配的方块位置，至多 limit 个；顺序由实现决定
    async fn find_matching_blocks(
        &self,
        kinds: &[ContainerKind],
        radius: u32,
        limit: usize,
    ) -> Result<Vec<Vec3i>, WorldError>;

    /// 查询指定位置的容器方块；位置上不是容器时返回 None
    async fn block_at(&self, position: Vec3i) -> Result<Option<ContainerRef>, WorldError>;

    /// 打开容器，返回可读写的窗口句柄
    async fn open_container(
        &self,
        container: &ContainerRef,
    ) -> Result<Box<dyn ContainerHandle>, WorldError>;

    /// 角色随身背包当前内容
    fn inventory_items(&self) -> Vec<ItemStack>;

    /// 等待 n 个世界刻（挂起点，用于让世界状态收敛）
    async fn wait_ticks(&self, ticks: u32);

    /// 角色当前位置
    fn position(&self) -> Vec3i;

    /// 角色当前是否在世界中（已出生且未死亡中）
    fn is_spawned(&self) -> bool;
}

/// 已打开容器的窗口句柄；同一时刻最多一个容器处于打开状态
#[async_trait]
pub trait ContainerHandle: Send + Sync {
    /// 容器区槽位内容（不含角色随身背包槽位）
    fn container_slots(&self) -> Vec<Option<ItemStack>>;

    /// 从容器取出指定物品到背包
    async fn withdraw(
        &self,
        item: ItemId,
        metadata: Option<i32>,
        count: u32,
    ) -> Result<(), WorldError>;

    /// 从背包存入指定物品到容器
    async fn deposit(
        &self,
        item: ItemId,
        metadata: Option<i32>,
        count: u32,
    ) -> Result<(), WorldError>;

    /// 关闭窗口
    async fn close(&self) -> Result<(), WorldError>;
}

/// 导航协作者：移动到目标坐标的交互距离内，到达前挂起
#[async_trait]
pub trait Navigator: Send + Sync {
    async fn move_to_near(&self, position: Vec3i, tolerance: u32) -> Result<(), NavigationError>;
}

/// 一次成功连接的产物：会话、导航器与事件流
pub struct WorldConnection {
    pub world: Arc<dyn WorldSession>,
    pub navigator: Arc<dyn Navigator>,
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
}

/// 会话工厂：生命周期管理器用它建立（和重建）会话
#[async_trait]
pub trait WorldConnector: Send + Sync {
    async fn connect(&self, config: &AppConfig) -> Result<WorldConnection, ConnectError>;
}
