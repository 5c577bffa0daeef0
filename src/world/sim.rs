//! 进程内模拟世界（默认后端，测试亦用）
//!
//! 实现全部协作者接口：SimWorld（会话）、SimNavigator（导航）、SimConnector（工厂）。
//! 测试通过故障开关注入各步骤失败，并用交互计数器断言行为；
//! 二进制入口用 demo 布局直接跑通整个搬运循环。

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::world::{
    BlockHandle, ConnectError, ContainerHandle, ContainerKind, ContainerRef, ItemId, ItemStack,
    NavigationError, Navigator, SessionEvent, Vec3i, WorldConnection, WorldConnector, WorldError,
    WorldSession,
};

/// 单个容器的容器区槽位数
pub const CONTAINER_SLOTS: usize = 27;

/// 锁中毒时继续使用内部值（模拟世界里没有需要保护的不变量会因此破坏）
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
struct Faults {
    search: AtomicBool,
    withdraw: AtomicBool,
    deposit: AtomicBool,
    close: AtomicBool,
    /// 取出成功但物品不落入背包（用于验证入库异常路径）
    swallow_withdrawals: AtomicBool,
}

#[derive(Default)]
struct Counters {
    searches: AtomicUsize,
    opens: AtomicUsize,
    closes: AtomicUsize,
}

struct SimContainer {
    kind: ContainerKind,
    position: Vec3i,
    slots: Vec<Option<ItemStack>>,
}

struct SimInner {
    next_handle: AtomicU64,
    containers: Mutex<Vec<(u64, SimContainer)>>,
    denied_opens: Mutex<Vec<u64>>,
    inventory: Mutex<Vec<ItemStack>>,
    withdrawals: Mutex<Vec<(ItemId, u32)>>,
    position: Mutex<Vec3i>,
    spawned: AtomicBool,
    tick: Duration,
    faults: Faults,
    counters: Counters,
}

/// 模拟世界会话；Clone 共享同一份世界状态
#[derive(Clone)]
pub struct SimWorld {
    inner: Arc<SimInner>,
}

impl SimWorld {
    /// tick 为单个世界刻的真实时长；测试传 Duration::ZERO 跳过等待
    pub fn new(tick: Duration) -> Self {
        Self {
            inner: Arc::new(SimInner {
                next_handle: AtomicU64::new(1),
                containers: Mutex::new(Vec::new()),
                denied_opens: Mutex::new(Vec::new()),
                inventory: Mutex::new(Vec::new()),
                withdrawals: Mutex::new(Vec::new()),
                position: Mutex::new(Vec3i::new(0, 64, 0)),
                spawned: AtomicBool::new(true),
                tick,
                faults: Faults::default(),
                counters: Counters::default(),
            }),
        }
    }

    /// 放置一个容器，物品从容器区前部开始摆放
    pub fn add_container(
        &self,
        kind: ContainerKind,
        position: Vec3i,
        stacks: Vec<ItemStack>,
    ) -> BlockHandle {
        let id = self.inner.next_handle.fetch_add(1, Ordering::SeqCst);
        let mut slots: Vec<Option<ItemStack>> = stacks.into_iter().map(Some).collect();
        slots.resize(CONTAINER_SLOTS, None);
        lock(&self.inner.containers).push((
            id,
            SimContainer {
                kind,
                position,
                slots,
            },
        ));
        BlockHandle(id)
    }

    /// 指定容器的当前非空槽位内容
    pub fn container_contents(&self, handle: BlockHandle) -> Vec<ItemStack> {
        lock(&self.inner.containers)
            .iter()
            .find(|(id, _)| *id == handle.0)
            .map(|(_, c)| c.slots.iter().flatten().cloned().collect())
            .unwrap_or_default()
    }

    pub fn set_spawned(&self, spawned: bool) {
        self.inner.spawned.store(spawned, Ordering::SeqCst);
    }

    // --- 故障注入 ---

    pub fn fail_searches(&self, on: bool) {
        self.inner.faults.search.store(on, Ordering::SeqCst);
    }

    pub fn deny_open(&self, handle: BlockHandle) {
        lock(&self.inner.denied_opens).push(handle.0);
    }

    pub fn fail_withdrawals(&self, on: bool) {
        self.inner.faults.withdraw.store(on, Ordering::SeqCst);
    }

    pub fn fail_deposits(&self, on: bool) {
        self.inner.faults.deposit.store(on, Ordering::SeqCst);
    }

    pub fn fail_closes(&self, on: bool) {
        self.inner.faults.close.store(on, Ordering::SeqCst);
    }

    pub fn swallow_withdrawals(&self, on: bool) {
        self.inner.faults.swallow_withdrawals.store(on, Ordering::SeqCst);
    }

    // --- 交互计数 ---

    pub fn search_count(&self) -> usize {
        self.inner.counters.searches.load(Ordering::SeqCst)
    }

    pub fn open_count(&self) -> usize {
        self.inner.counters.opens.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.inner.counters.closes.load(Ordering::SeqCst)
    }

    /// 每次成功取出的 (物品, 数量) 记录
    pub fn withdrawals(&self) -> Vec<(ItemId, u32)> {
        lock(&self.inner.withdrawals).clone()
    }
}

#[async_trait]
impl WorldSession for SimWorld {
    async fn find_matching_blocks(
        &self,
        kinds: &[ContainerKind],
        radius: u32,
        limit: usize,
    ) -> Result<Vec<Vec3i>, WorldError> {
        self.inner.counters.searches.fetch_add(1, Ordering::SeqCst);
        if self.inner.faults.search.load(Ordering::SeqCst) {
            return Err(WorldError::Search("simulated search failure".to_string()));
        }
        let origin = self.position();
        let positions = lock(&self.inner.containers)
            .iter()
            .filter(|(_, c)| {
                kinds.contains(&c.kind) && c.position.distance_to(origin) <= f64::from(radius)
            })
            .map(|(_, c)| c.position)
            .take(limit)
            .collect();
        Ok(positions)
    }

    async fn block_at(&self, position: Vec3i) -> Result<Option<ContainerRef>, WorldError> {
        Ok(lock(&self.inner.containers)
            .iter()
            .find(|(_, c)| c.position == position)
            .map(|(id, c)| ContainerRef {
                kind: c.kind,
                position: c.position,
                handle: BlockHandle(*id),
            }))
    }

    async fn open_container(
        &self,
        container: &ContainerRef,
    ) -> Result<Box<dyn ContainerHandle>, WorldError> {
        self.inner.counters.opens.fetch_add(1, Ordering::SeqCst);
        if lock(&self.inner.denied_opens).contains(&container.handle.0) {
            return Err(WorldError::OpenContainer(
                "simulated open failure".to_string(),
            ));
        }
        let exists = lock(&self.inner.containers)
            .iter()
            .any(|(id, _)| *id == container.handle.0);
        if !exists {
            return Err(WorldError::OpenContainer(format!(
                "no container at {}",
                container.position
            )));
        }
        Ok(Box::new(SimContainerWindow {
            inner: self.inner.clone(),
            handle: container.handle.0,
        }))
    }

    fn inventory_items(&self) -> Vec<ItemStack> {
        lock(&self.inner.inventory).clone()
    }

    async fn wait_ticks(&self, ticks: u32) {
        if !self.inner.tick.is_zero() {
            tokio::time::sleep(self.inner.tick * ticks).await;
        }
    }

    fn position(&self) -> Vec3i {
        *lock(&self.inner.position)
    }

    fn is_spawned(&self) -> bool {
        self.inner.spawned.load(Ordering::SeqCst)
    }
}

/// 已打开的模拟容器窗口
struct SimContainerWindow {
    inner: Arc<SimInner>,
    handle: u64,
}

#[async_trait]
impl ContainerHandle for SimContainerWindow {
    fn container_slots(&self) -> Vec<Option<ItemStack>> {
        lock(&self.inner.containers)
            .iter()
            .find(|(id, _)| *id == self.handle)
            .map(|(_, c)| c.slots.clone())
            .unwrap_or_default()
    }

    async fn withdraw(
        &self,
        item: ItemId,
        _metadata: Option<i32>,
        count: u32,
    ) -> Result<(), WorldError> {
        if self.inner.faults.withdraw.load(Ordering::SeqCst) {
            return Err(WorldError::Withdraw(
                "simulated withdraw failure".to_string(),
            ));
        }
        let mut containers = lock(&self.inner.containers);
        let container = containers
            .iter_mut()
            .find(|(id, _)| *id == self.handle)
            .map(|(_, c)| c)
            .ok_or_else(|| WorldError::Withdraw("container is gone".to_string()))?;
        let slot = container
            .slots
            .iter_mut()
            .find(|s| s.as_ref().is_some_and(|stack| stack.item == item))
            .ok_or_else(|| WorldError::Withdraw(format!("item {} not in container", item)))?;
        let Some(stack) = slot.as_mut() else {
            return Err(WorldError::Withdraw(format!("item {} not in container", item)));
        };
        if stack.count < count {
            return Err(WorldError::Withdraw(format!(
                "only {}x {} available",
                stack.count, stack.name
            )));
        }
        let name = stack.name.clone();
        stack.count -= count;
        if stack.count == 0 {
            *slot = None;
        }
        drop(containers);

        lock(&self.inner.withdrawals).push((item, count));
        if !self.inner.faults.swallow_withdrawals.load(Ordering::SeqCst) {
            let mut inventory = lock(&self.inner.inventory);
            match inventory.iter_mut().find(|s| s.item == item) {
                Some(held) => held.count += count,
                None => inventory.push(ItemStack { item, count, name }),
            }
        }
        Ok(())
    }

    async fn deposit(
        &self,
        item: ItemId,
        _metadata: Option<i32>,
        count: u32,
    ) -> Result<(), WorldError> {
        if self.inner.faults.deposit.load(Ordering::SeqCst) {
            return Err(WorldError::Deposit("simulated deposit failure".to_string()));
        }
        let name = {
            let mut inventory = lock(&self.inner.inventory);
            let index = inventory
                .iter()
                .position(|s| s.item == item && s.count >= count)
                .ok_or_else(|| WorldError::Deposit(format!("item {} not in inventory", item)))?;
            let name = inventory[index].name.clone();
            inventory[index].count -= count;
            if inventory[index].count == 0 {
                inventory.remove(index);
            }
            name
        };

        let mut containers = lock(&self.inner.containers);
        let container = containers
            .iter_mut()
            .find(|(id, _)| *id == self.handle)
            .map(|(_, c)| c)
            .ok_or_else(|| WorldError::Deposit("container is gone".to_string()))?;
        if let Some(stack) = container
            .slots
            .iter_mut()
            .flatten()
            .find(|stack| stack.item == item)
        {
            stack.count += count;
            return Ok(());
        }
        match container.slots.iter_mut().find(|s| s.is_none()) {
            Some(empty) => {
                *empty = Some(ItemStack { item, count, name });
                Ok(())
            }
            None => Err(WorldError::Deposit("container is full".to_string())),
        }
    }

    async fn close(&self) -> Result<(), WorldError> {
        self.inner.counters.closes.fetch_add(1, Ordering::SeqCst);
        if self.inner.faults.close.load(Ordering::SeqCst) {
            return Err(WorldError::CloseContainer(
                "simulated close failure".to_string(),
            ));
        }
        Ok(())
    }
}

/// 模拟导航器：瞬移到目标并记录轨迹
pub struct SimNavigator {
    world: SimWorld,
    goals: Mutex<Vec<Vec3i>>,
    fail: AtomicBool,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
}

impl SimNavigator {
    pub fn new(world: &SimWorld) -> Self {
        Self {
            world: world.clone(),
            goals: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
            events: None,
        }
    }

    /// 到达目标后向事件流推送 GoalReached
    pub fn with_events(world: &SimWorld, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self {
            events: Some(events),
            ..Self::new(world)
        }
    }

    pub fn fail_moves(&self, on: bool) {
        self.fail.store(on, Ordering::SeqCst);
    }

    /// 已到达过的目标位置
    pub fn goals(&self) -> Vec<Vec3i> {
        lock(&self.goals).clone()
    }
}

#[async_trait]
impl Navigator for SimNavigator {
    async fn move_to_near(&self, position: Vec3i, _tolerance: u32) -> Result<(), NavigationError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NavigationError(
                "simulated navigation failure".to_string(),
            ));
        }
        *lock(&self.world.inner.position) = position;
        lock(&self.goals).push(position);
        if let Some(events) = &self.events {
            let _ = events.send(SessionEvent::GoalReached);
        }
        Ok(())
    }
}

/// 模拟连接工厂：每次 connect 构建一个全新世界并推送事件流
pub struct SimConnector {
    tick: Duration,
}

impl SimConnector {
    /// demo 布局：出生点周围三个箱子，各装少量物品
    pub fn demo() -> Self {
        Self {
            tick: Duration::from_millis(50),
        }
    }

    fn build_demo_world(tick: Duration) -> SimWorld {
        let world = SimWorld::new(tick);
        world.add_container(
            ContainerKind::Chest,
            Vec3i::new(2, 64, 0),
            vec![
                ItemStack { item: ItemId(1), count: 5, name: "stone".to_string() },
                ItemStack { item: ItemId(17), count: 3, name: "oak_log".to_string() },
            ],
        );
        world.add_container(
            ContainerKind::Chest,
            Vec3i::new(-2, 64, 1),
            vec![ItemStack { item: ItemId(265), count: 2, name: "iron_ingot".to_string() }],
        );
        world.add_container(ContainerKind::TrappedChest, Vec3i::new(0, 64, 3), vec![]);
        world
    }
}

#[async_trait]
impl WorldConnector for SimConnector {
    async fn connect(&self, _config: &AppConfig) -> Result<WorldConnection, ConnectError> {
        let world = Self::build_demo_world(self.tick);
        let (tx, rx) = mpsc::unbounded_channel();
        let navigator = Arc::new(SimNavigator::with_events(&world, tx.clone()));

        // 模拟服务器心跳：短暂延迟后出生，此后周期性网络活动；事件流一关即停
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if tx.send(SessionEvent::Spawned).is_err() {
                return;
            }
            let mut ticker = tokio::time::interval(Duration::from_secs(2));
            loop {
                ticker.tick().await;
                if tx.send(SessionEvent::Activity).is_err() {
                    break;
                }
            }
        });

        Ok(WorldConnection {
            world: Arc::new(world),
            navigator,
            events: rx,
        })
    }
}
