//! 循环调度：抖动间隔的搬运触发 + 固定间隔的状态心跳
//!
//! 搬运间隔在会话启动时从 [4s, 8s) 抽一次（固定间隔近似，逐刻不重抽）；
//! 每刻先检查连接稳定、角色在场、无在途搬运，任一不满足则本刻跳过。
//! 两个循环任务都挂在会话的 CancellationToken 上，会话结束即停。

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::core::{SessionState, TransferOrchestrator};
use crate::world::WorldSession;

/// 状态心跳间隔
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
/// 搬运间隔下界（含）
const MIN_CYCLE_MS: u64 = 4000;
/// 搬运间隔上界（不含）
const MAX_CYCLE_MS: u64 = 8000;

/// 会话内两类周期触发的持有者；spawn 后任务归 token 管
pub struct CycleScheduler {
    session: Arc<SessionState>,
    world: Arc<dyn WorldSession>,
    orchestrator: Arc<TransferOrchestrator>,
    cycle_interval: Duration,
}

impl CycleScheduler {
    pub fn new(
        session: Arc<SessionState>,
        world: Arc<dyn WorldSession>,
        orchestrator: Arc<TransferOrchestrator>,
    ) -> Self {
        let cycle_interval =
            Duration::from_millis(rand::thread_rng().gen_range(MIN_CYCLE_MS..MAX_CYCLE_MS));
        Self {
            session,
            world,
            orchestrator,
            cycle_interval,
        }
    }

    /// 本会话抽中的搬运间隔
    pub fn cycle_interval(&self) -> Duration {
        self.cycle_interval
    }

    /// 启动搬运触发与状态心跳两个循环任务
    pub fn spawn(self, cancel: CancellationToken) {
        let Self {
            session,
            world,
            orchestrator,
            cycle_interval,
        } = self;

        tracing::info!(
            "Transfer loop scheduled every {}ms",
            cycle_interval.as_millis()
        );

        {
            let session = session.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let start = tokio::time::Instant::now() + cycle_interval;
                let mut ticker = tokio::time::interval_at(start, cycle_interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = ticker.tick() => {
                            if session.health.is_stable()
                                && world.is_spawned()
                                && !session.is_transferring()
                            {
                                orchestrator.run_cycle().await;
                            }
                        }
                    }
                }
            });
        }

        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + HEARTBEAT_INTERVAL;
            let mut ticker = tokio::time::interval_at(start, HEARTBEAT_INTERVAL);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if session.health.is_stable() {
                            tracing::info!(
                                "Bot is running, total transfers completed: {}",
                                session.transfer_count()
                            );
                        }
                    }
                }
            }
        });
    }
}
