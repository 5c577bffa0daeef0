//! 世界侧基础类型：坐标、物品、容器引用与会话事件

use std::fmt;

/// 三维整数坐标（方块位置）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Vec3i {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Vec3i {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// 到另一坐标的欧氏距离
    pub fn distance_to(&self, other: Vec3i) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        let dz = f64::from(self.z - other.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl fmt::Display for Vec3i {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// 物品类型 ID（世界协议中的数值类型）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ItemId(pub u32);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 一叠物品：类型、数量（正整数）、展示名。核心只读取，不自行构造。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemStack {
    pub item: ItemId,
    pub count: u32,
    pub name: String,
}

/// 储物容器种类（封闭集合）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Chest,
    TrappedChest,
    EnderChest,
}

impl ContainerKind {
    /// 搬运目标接受的全部容器种类
    pub const ALL: [ContainerKind; 3] = [
        ContainerKind::Chest,
        ContainerKind::TrappedChest,
        ContainerKind::EnderChest,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ContainerKind::Chest => "chest",
            ContainerKind::TrappedChest => "trapped_chest",
            ContainerKind::EnderChest => "ender_chest",
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 世界会话内打开方块用的不透明句柄
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockHandle(pub u64);

/// 一次发现得到的容器引用；每轮搬运重新查询，不跨轮缓存
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerRef {
    pub kind: ContainerKind,
    pub position: Vec3i,
    pub handle: BlockHandle,
}

/// 底层连接错误类别（由会话协作者归类）
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisconnectCategory {
    /// 对端重置连接
    Reset,
    /// 服务器地址无法解析
    NotFound,
    /// 连接超时
    Timeout,
    /// 连接被拒绝
    Refused,
    /// 其余未归类错误码
    Other(String),
}

impl DisconnectCategory {
    /// 面向运维的类别诊断文案
    pub fn diagnostic(&self) -> String {
        match self {
            DisconnectCategory::Reset => {
                "Server reset the connection - reconnecting automatically".to_string()
            }
            DisconnectCategory::NotFound => {
                "Server not found - check the server address".to_string()
            }
            DisconnectCategory::Timeout => "Connection timed out - retrying".to_string(),
            DisconnectCategory::Refused => {
                "Connection refused - server may be offline".to_string()
            }
            DisconnectCategory::Other(code) => format!("Connection error: {}", code),
        }
    }
}

impl fmt::Display for DisconnectCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectCategory::Reset => f.write_str("reset"),
            DisconnectCategory::NotFound => f.write_str("not-found"),
            DisconnectCategory::Timeout => f.write_str("timeout"),
            DisconnectCategory::Refused => f.write_str("refused"),
            DisconnectCategory::Other(code) => f.write_str(code),
        }
    }
}

/// 会话协作者推送的事件
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// 任意入站底层网络活动
    Activity,
    /// 角色在世界中出生 / 重生
    Spawned,
    /// 导航到达目标点
    GoalReached,
    /// 角色死亡（随后会重生）
    Death,
    /// 被服务器踢出
    Kicked(String),
    /// 底层连接错误（不终止会话）
    ConnectionError(DisconnectCategory),
    /// 会话结束（唯一的终止信号）
    Ended(Option<String>),
}
