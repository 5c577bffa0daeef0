//! 连接健康监视：{unstable, stable} 两态机
//!
//! 任意入站活动盖时间戳并在必要时翻转到 stable（一次性转变，重复活动为 no-op）；
//! 周期检查发现长时间静默则翻转到 unstable。只改状态、发日志，不开关会话。

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::core::SessionState;

/// 周期检查间隔
pub const CHECK_INTERVAL: Duration = Duration::from_secs(30);
/// 静默超过该时长即视为连接不稳定
pub const STALE_AFTER: Duration = Duration::from_secs(60);

/// 连接健康状态：稳定标志 + 最近活动时间（相对基准的毫秒数，免锁）
pub struct ConnectionHealth {
    stable: AtomicBool,
    epoch: Instant,
    last_activity_ms: AtomicU64,
    /// 测试用时钟偏移，运行时恒为 0
    skew_ms: AtomicU64,
}

impl ConnectionHealth {
    pub fn new() -> Self {
        Self {
            stable: AtomicBool::new(false),
            epoch: Instant::now(),
            last_activity_ms: AtomicU64::new(0),
            skew_ms: AtomicU64::new(0),
        }
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64 + self.skew_ms.load(Ordering::SeqCst)
    }

    /// 记录一次入站活动；发生 unstable → stable 转变时返回 true（调用方打一次日志）
    pub fn record_activity(&self) -> bool {
        self.last_activity_ms.store(self.now_ms(), Ordering::SeqCst);
        !self.stable.swap(true, Ordering::SeqCst)
    }

    /// 静默超过阈值则翻转到 unstable；发生转变时返回 true
    pub fn mark_stale_if_silent(&self, threshold: Duration) -> bool {
        if self.silent_for() <= threshold {
            return false;
        }
        self.stable.swap(false, Ordering::SeqCst)
    }

    /// 连接类错误直接降级（事件路径，无需静默判断）
    pub fn mark_unstable(&self) {
        self.stable.store(false, Ordering::SeqCst);
    }

    pub fn is_stable(&self) -> bool {
        self.stable.load(Ordering::SeqCst)
    }

    /// 距最近一次活动的时长
    pub fn silent_for(&self) -> Duration {
        let last_ms = self.last_activity_ms.load(Ordering::SeqCst);
        Duration::from_millis(self.now_ms().saturating_sub(last_ms))
    }

    /// 测试辅助：把时钟向前拨 d，模拟一段静默
    #[cfg(test)]
    fn advance_clock(&self, d: Duration) {
        self.skew_ms
            .fetch_add(d.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Default for ConnectionHealth {
    fn default() -> Self {
        Self::new()
    }
}

/// 启动周期健康检查任务；会话结束时由 cancel 停止
pub fn spawn_monitor(session: Arc<SessionState>, cancel: CancellationToken) {
    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + CHECK_INTERVAL;
        let mut ticker = tokio::time::interval_at(start, CHECK_INTERVAL);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if session.health.mark_stale_if_silent(STALE_AFTER) {
                        tracing::warn!(
                            "No activity for {}s, connection may be lost",
                            STALE_AFTER.as_secs()
                        );
                    }
                }
            }
        }
    });
}
