//! 搬运循环编排：一次端到端的容器间搬运
//!
//! 定位 → 走近源容器 → 开箱取物 → 关箱 → 走近目标容器 → 开箱入库 → 关箱。
//! 全程串行，靠在途守卫保证同一会话同时最多一轮；任一步骤失败只终止本轮，
//! 尽力关闭当前打开的容器（关闭失败只记日志，独立失败域），下一轮调度自然重试。

use std::sync::Arc;

use rand::Rng;

use crate::core::{discovery, BotError, SessionState};
use crate::world::{ContainerHandle, ContainerRef, ItemStack, Navigator, WorldSession};

/// 发现半径
pub const SEARCH_RADIUS: u32 = 10;
/// 单次发现最多候选数
pub const MAX_CANDIDATES: usize = 10;
/// 与容器交互所需的接近距离
pub const INTERACT_RANGE: u32 = 1;
/// 单轮最多搬运数量
pub const MAX_AMOUNT_PER_CYCLE: u32 = 3;
/// 导航到位后等待世界状态收敛的刻数
const SETTLE_TICKS_AFTER_MOVE: u32 = 10;
/// 取出后的短暂等待刻数
const SETTLE_TICKS_AFTER_WITHDRAW: u32 = 5;

/// 一轮搬运的内存内计划；轮末即弃，不跨轮保留
struct TransferPlan {
    stack: ItemStack,
    amount: u32,
}

/// 本轮结束方式（用于收尾日志）
enum CycleOutcome {
    /// 验证入库成功
    Completed { name: String, amount: u32 },
    /// 附近容器不足两个，本轮直接放弃
    NotEnoughContainers(usize),
    /// 源容器为空
    SourceEmpty,
    /// 取出后背包里找不到该物品（异常态，不计数）
    ItemVanished,
}

/// 搬运循环编排器：同一会话内互斥执行
pub struct TransferOrchestrator {
    session: Arc<SessionState>,
    world: Arc<dyn WorldSession>,
    navigator: Arc<dyn Navigator>,
}

impl TransferOrchestrator {
    pub fn new(
        session: Arc<SessionState>,
        world: Arc<dyn WorldSession>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            session,
            world,
            navigator,
        }
    }

    /// 执行一轮搬运。前置条件（连接稳定、无在途搬运）不满足时静默返回。
    pub async fn run_cycle(&self) {
        if !self.session.health.is_stable() {
            return;
        }
        let Some(_guard) = self.session.try_begin_transfer() else {
            return;
        };

        tracing::info!(
            "Starting transfer cycle #{}",
            self.session.transfer_count() + 1
        );

        let mut open_container: Option<Box<dyn ContainerHandle>> = None;
        match self.execute(&mut open_container).await {
            Ok(CycleOutcome::Completed { name, amount }) => {
                tracing::info!(
                    "Transfer cycle completed: {}x {} moved, total transfers: {}",
                    amount,
                    name,
                    self.session.transfer_count()
                );
            }
            Ok(CycleOutcome::NotEnoughContainers(found)) => {
                tracing::info!("Need at least 2 containers nearby, found {}", found);
            }
            Ok(CycleOutcome::SourceEmpty) => {
                tracing::info!("Source container is empty, trying next cycle");
            }
            Ok(CycleOutcome::ItemVanished) => {
                tracing::warn!("Item not found in inventory after withdrawal");
            }
            Err(e) => {
                tracing::warn!("Transfer cycle aborted: {}", e);
                // 次级清理：尽力关闭当前打开的容器，失败只记日志、不再上抛
                if let Some(window) = open_container.take() {
                    if let Err(close_err) = window.close().await {
                        tracing::warn!(
                            "Failed to close container during recovery: {}",
                            close_err
                        );
                    }
                }
            }
        }
    }

    /// 本轮主序列。出错返回时把仍在打开状态的容器留在 open_container 里交给恢复路径。
    async fn execute(
        &self,
        open_container: &mut Option<Box<dyn ContainerHandle>>,
    ) -> Result<CycleOutcome, BotError> {
        let candidates =
            discovery::find_nearby_containers(self.world.as_ref(), SEARCH_RADIUS, MAX_CANDIDATES)
                .await;
        if candidates.len() < 2 {
            return Ok(CycleOutcome::NotEnoughContainers(candidates.len()));
        }

        let (source, target) = select_pair(&candidates);
        tracing::info!("Source: {} at {}", source.kind, source.position);
        tracing::info!("Target: {} at {}", target.kind, target.position);

        self.navigator
            .move_to_near(source.position, INTERACT_RANGE)
            .await?;
        self.world.wait_ticks(SETTLE_TICKS_AFTER_MOVE).await;

        let window = self.world.open_container(&source).await?;
        tracing::debug!("Opened source container");
        let plan = match self.withdraw_phase(window.as_ref()).await {
            Ok(plan) => {
                window.close().await?;
                tracing::debug!("Closed source container");
                plan
            }
            Err(e) => {
                *open_container = Some(window);
                return Err(e);
            }
        };
        let Some(plan) = plan else {
            return Ok(CycleOutcome::SourceEmpty);
        };

        self.navigator
            .move_to_near(target.position, INTERACT_RANGE)
            .await?;
        self.world.wait_ticks(SETTLE_TICKS_AFTER_MOVE).await;

        let window = self.world.open_container(&target).await?;
        tracing::debug!("Opened target container");
        let deposited = match self.deposit_phase(window.as_ref(), &plan).await {
            Ok(deposited) => {
                window.close().await?;
                tracing::debug!("Closed target container");
                deposited
            }
            Err(e) => {
                *open_container = Some(window);
                return Err(e);
            }
        };

        match deposited {
            Some(amount) => Ok(CycleOutcome::Completed {
                name: plan.stack.name,
                amount,
            }),
            None => Ok(CycleOutcome::ItemVanished),
        }
    }

    /// 源容器阶段：读容器区、选物品、取出。容器为空返回 Ok(None)。
    async fn withdraw_phase(
        &self,
        window: &dyn ContainerHandle,
    ) -> Result<Option<TransferPlan>, BotError> {
        let stacks: Vec<ItemStack> = window.container_slots().into_iter().flatten().collect();
        let Some(stack) = choose_stack(&stacks) else {
            return Ok(None);
        };
        let amount = draw_amount(stack.count);

        tracing::info!("Taking {}x {} from source container", amount, stack.name);
        window.withdraw(stack.item, None, amount).await?;
        self.world.wait_ticks(SETTLE_TICKS_AFTER_WITHDRAW).await;

        Ok(Some(TransferPlan {
            stack: stack.clone(),
            amount,
        }))
    }

    /// 目标容器阶段：在背包中核对取出的物品并入库。
    /// 背包里没有（取出未落袋的异常态）返回 Ok(None)，不计数。
    async fn deposit_phase(
        &self,
        window: &dyn ContainerHandle,
        plan: &TransferPlan,
    ) -> Result<Option<u32>, BotError> {
        let held = self
            .world
            .inventory_items()
            .into_iter()
            .find(|stack| stack.item == plan.stack.item);
        let Some(held) = held else {
            return Ok(None);
        };

        let amount = plan.amount.min(held.count);
        window.deposit(held.item, None, amount).await?;
        let total = self.session.record_transfer();
        tracing::info!(
            "Deposited {}x {} into target container (total transfers: {})",
            amount,
            held.name,
            total
        );
        Ok(Some(amount))
    }
}

/// 随机选取互不相同的源与目标：目标在去掉源后的剩余候选里等概率抽取
/// （不重复抽样，结构上保证终止；调用前已确认候选 ≥ 2）
fn select_pair(candidates: &[ContainerRef]) -> (ContainerRef, ContainerRef) {
    debug_assert!(candidates.len() >= 2);
    let mut rng = rand::thread_rng();
    let source = rng.gen_range(0..candidates.len());
    let mut target = rng.gen_range(0..candidates.len() - 1);
    if target >= source {
        target += 1;
    }
    (candidates[source].clone(), candidates[target].clone())
}

/// 优先选可搬多件的叠（count > 1），否则退回第一叠
fn choose_stack(stacks: &[ItemStack]) -> Option<&ItemStack> {
    stacks
        .iter()
        .find(|stack| stack.count > 1)
        .or_else(|| stacks.first())
}

/// 单轮搬运量：[1, MAX_AMOUNT_PER_CYCLE] 内随机，再按余量截断
fn draw_amount(available: u32) -> u32 {
    let wanted = rand::thread_rng().gen_range(1..=MAX_AMOUNT_PER_CYCLE);
    wanted.min(available)
}
