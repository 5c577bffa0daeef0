//! 会话状态：稳定性、在途标志、累计搬运计数
//!
//! 所有可变状态都挂在单个 SessionState 上，归属组件各管各的：
//! 健康监视器管稳定标志，编排器管在途标志与计数，生命周期管重生清零。

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use uuid::Uuid;

use crate::core::ConnectionHealth;

/// 一条活动会话的共享状态；会话终止时整体丢弃、重连后全新创建
pub struct SessionState {
    id: Uuid,
    pub health: ConnectionHealth,
    transferring: AtomicBool,
    transfer_count: AtomicU64,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            health: ConnectionHealth::new(),
            transferring: AtomicBool::new(false),
            transfer_count: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 抢占在途标志；已有搬运在途时返回 None，调用方静默跳过
    pub fn try_begin_transfer(&self) -> Option<TransferGuard<'_>> {
        self.transferring
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| TransferGuard { session: self })
    }

    pub fn is_transferring(&self) -> bool {
        self.transferring.load(Ordering::SeqCst)
    }

    /// 记一次验证成功的入库，返回新累计值
    pub fn record_transfer(&self) -> u64 {
        self.transfer_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn transfer_count(&self) -> u64 {
        self.transfer_count.load(Ordering::SeqCst)
    }

    /// 死亡重生时清零；会话与定时器保持存活
    pub fn reset_transfer_count(&self) {
        self.transfer_count.store(0, Ordering::SeqCst);
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// 在途标志的作用域守卫：无论成功、失败还是 panic 展开，Drop 都会清标志
pub struct TransferGuard<'a> {
    session: &'a SessionState,
}

impl Drop for TransferGuard<'_> {
    fn drop(&mut self) {
        self.session.transferring.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_is_exclusive() {
        let session = SessionState::new();
        let guard = session.try_begin_transfer();
        assert!(guard.is_some());
        assert!(session.is_transferring());
        assert!(session.try_begin_transfer().is_none());
    }

    #[test]
    fn test_guard_clears_flag_on_drop() {
        let session = SessionState::new();
        {
            let _guard = session.try_begin_transfer();
            assert!(session.is_transferring());
        }
        assert!(!session.is_transferring());
        assert!(session.try_begin_transfer().is_some());
    }

    #[test]
    fn test_counter_increments_and_resets() {
        let session = SessionState::new();
        assert_eq!(session.record_transfer(), 1);
        assert_eq!(session.record_transfer(), 2);
        assert_eq!(session.transfer_count(), 2);
        session.reset_transfer_count();
        assert_eq!(session.transfer_count(), 0);
    }
}
