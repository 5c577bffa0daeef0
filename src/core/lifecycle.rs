//! 会话生命周期：建连、事件接线、结束后的延迟重连
//!
//! 尾循环驱动：连接 → 消费事件直到 Ended → 取消本会话全部定时器 →
//! （若启用自动重连）等待配置延迟后重建会话。重建失败再用同一延迟补偿重试一次，
//! 仍失败则带错返回（不做无界退避）。连接类错误只降级健康状态，从不终止会话；
//! 终止只由会话自己的 Ended 信号驱动。

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::core::{health, CycleScheduler, SessionState, TransferOrchestrator};
use crate::world::{
    ConnectError, Navigator, SessionEvent, WorldConnection, WorldConnector, WorldSession,
};

/// 首次出生后到搬运启动的等待
pub const START_DELAY: Duration = Duration::from_secs(3);

/// 事件处理结果：继续消费 / 首次出生需启动搬运 / 会话结束
enum EventOutcome {
    Continue,
    StartOperations,
    End,
}

/// 会话生命周期管理器：唯一持有会话的创建与销毁权
pub struct SessionLifecycle {
    connector: Arc<dyn WorldConnector>,
    config: AppConfig,
}

impl SessionLifecycle {
    pub fn new(connector: Arc<dyn WorldConnector>, config: AppConfig) -> Self {
        Self { connector, config }
    }

    /// 运行到自动重连被禁用，或某次重连在补偿重试后仍失败
    pub async fn run(&self) -> Result<(), ConnectError> {
        loop {
            let connection = self.connect_with_retry().await?;
            self.run_session(connection).await;

            if !self.config.reconnect.enabled {
                tracing::info!("Auto-reconnect disabled, stopping");
                return Ok(());
            }
            let delay = self.config.reconnect.delay();
            tracing::info!("Reconnecting in {}s...", delay.as_secs());
            tokio::time::sleep(delay).await;
            tracing::info!("Attempting to reconnect...");
        }
    }

    /// 建连；失败后等同一延迟补偿重试恰好一次
    async fn connect_with_retry(&self) -> Result<WorldConnection, ConnectError> {
        match self.connector.connect(&self.config).await {
            Ok(connection) => Ok(connection),
            Err(e) => {
                let delay = self.config.reconnect.delay();
                tracing::warn!(
                    "Connection attempt failed: {}, retrying once in {}s",
                    e,
                    delay.as_secs()
                );
                tokio::time::sleep(delay).await;
                self.connector.connect(&self.config).await.map_err(|e| {
                    tracing::error!("Reconnection failed: {}", e);
                    e
                })
            }
        }
    }

    /// 消费一条会话的事件流直到结束；返回前取消该会话的全部定时器
    async fn run_session(&self, connection: WorldConnection) {
        let WorldConnection {
            world,
            navigator,
            mut events,
        } = connection;

        let session = Arc::new(SessionState::new());
        tracing::info!("Session {} created", session.id());
        let cancel = CancellationToken::new();
        health::spawn_monitor(session.clone(), cancel.child_token());

        let mut operations_started = false;
        while let Some(event) = events.recv().await {
            match apply_event(&session, &event) {
                EventOutcome::Continue => {}
                EventOutcome::StartOperations => {
                    // 死亡重生会再次出生，搬运循环每会话只启动一次
                    if !operations_started {
                        operations_started = true;
                        start_operations(
                            session.clone(),
                            world.clone(),
                            navigator.clone(),
                            cancel.child_token(),
                        );
                    }
                }
                EventOutcome::End => break,
            }
        }

        // 事件流关闭等同会话结束；先断定时器再走重连
        cancel.cancel();
        tracing::info!("Session {} closed, timers cancelled", session.id());
    }
}

/// 出生后延迟启动搬运调度；期间会话若已结束则不再启动
fn start_operations(
    session: Arc<SessionState>,
    world: Arc<dyn WorldSession>,
    navigator: Arc<dyn Navigator>,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(START_DELAY) => {}
        }
        tracing::info!("Starting continuous container transfer operations");
        let orchestrator = Arc::new(TransferOrchestrator::new(
            session.clone(),
            world.clone(),
            navigator,
        ));
        CycleScheduler::new(session, world, orchestrator).spawn(cancel);
    });
}

/// 把单个会话事件落到会话状态上；纯状态 + 日志，无 IO
fn apply_event(session: &SessionState, event: &SessionEvent) -> EventOutcome {
    match event {
        SessionEvent::Activity => {
            if session.health.record_activity() {
                tracing::info!("Connection stabilized");
            }
            EventOutcome::Continue
        }
        SessionEvent::Spawned => {
            if session.health.record_activity() {
                tracing::info!("Connection stabilized");
            }
            tracing::info!("Bot spawned, starting container transfer operations");
            EventOutcome::StartOperations
        }
        SessionEvent::GoalReached => {
            tracing::debug!("Reached target position");
            EventOutcome::Continue
        }
        SessionEvent::Death => {
            session.reset_transfer_count();
            tracing::warn!("Bot died and respawned, transfer counter reset");
            EventOutcome::Continue
        }
        SessionEvent::Kicked(reason) => {
            tracing::warn!("Bot was kicked: {}", reason);
            EventOutcome::Continue
        }
        SessionEvent::ConnectionError(category) => {
            session.health.mark_unstable();
            tracing::warn!("{}", category.diagnostic());
            EventOutcome::Continue
        }
        SessionEvent::Ended(reason) => {
            tracing::info!(
                "Connection ended: {}",
                reason.as_deref().unwrap_or("unknown reason")
            );
            EventOutcome::End
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::DisconnectCategory;

    #[test]
    fn test_activity_stabilizes_and_stays_stable() {
        let session = SessionState::new();
        assert!(matches!(
            apply_event(&session, &SessionEvent::Activity),
            EventOutcome::Continue
        ));
        assert!(session.health.is_stable());
        apply_event(&session, &SessionEvent::Activity);
        assert!(session.health.is_stable());
    }

    #[test]
    fn test_spawned_requests_operations_start() {
        let session = SessionState::new();
        assert!(matches!(
            apply_event(&session, &SessionEvent::Spawned),
            EventOutcome::StartOperations
        ));
        assert!(session.health.is_stable());
    }

    #[test]
    fn test_death_resets_counter_but_not_session() {
        let session = SessionState::new();
        session.record_transfer();
        session.record_transfer();
        assert!(matches!(
            apply_event(&session, &SessionEvent::Death),
            EventOutcome::Continue
        ));
        assert_eq!(session.transfer_count(), 0);
    }

    #[test]
    fn test_connection_error_downgrades_health_only() {
        let session = SessionState::new();
        session.health.record_activity();
        let outcome = apply_event(
            &session,
            &SessionEvent::ConnectionError(DisconnectCategory::Reset),
        );
        assert!(matches!(outcome, EventOutcome::Continue));
        assert!(!session.health.is_stable());
    }

    #[test]
    fn test_only_ended_terminates() {
        let session = SessionState::new();
        assert!(matches!(
            apply_event(&session, &SessionEvent::Kicked("afk".to_string())),
            EventOutcome::Continue
        ));
        assert!(matches!(
            apply_event(&session, &SessionEvent::Ended(Some("socket closed".to_string()))),
            EventOutcome::End
        ));
    }
}
