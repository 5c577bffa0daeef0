//! 搬运循环集成测试：完整链路与各步骤故障注入
//!
//! 用模拟世界跑真实编排器，靠交互计数器与容器内容断言行为；
//! 每个故障场景对应编排器的一条恢复路径。

use std::sync::Arc;
use std::time::Duration;

use mule::core::{SessionState, TransferOrchestrator};
use mule::world::sim::{SimNavigator, SimWorld};
use mule::world::{ContainerKind, ItemId, ItemStack, Vec3i};

fn stack(id: u32, count: u32, name: &str) -> ItemStack {
    ItemStack {
        item: ItemId(id),
        count,
        name: name.to_string(),
    }
}

struct Fixture {
    world: SimWorld,
    session: Arc<SessionState>,
    navigator: Arc<SimNavigator>,
    orchestrator: TransferOrchestrator,
}

/// 稳定连接 + 空世界的基线环境；容器由各测试自行布置
fn fixture() -> Fixture {
    let world = SimWorld::new(Duration::ZERO);
    let session = Arc::new(SessionState::new());
    session.health.record_activity();
    let navigator = Arc::new(SimNavigator::new(&world));
    let orchestrator = TransferOrchestrator::new(
        session.clone(),
        Arc::new(world.clone()),
        navigator.clone(),
    );
    Fixture {
        world,
        session,
        navigator,
        orchestrator,
    }
}

#[tokio::test]
async fn test_full_cycle_moves_items_between_containers() {
    let f = fixture();
    f.world
        .add_container(ContainerKind::Chest, Vec3i::new(2, 64, 0), vec![stack(1, 5, "stone")]);
    f.world
        .add_container(ContainerKind::Chest, Vec3i::new(-2, 64, 0), vec![stack(1, 5, "stone")]);
    f.world
        .add_container(ContainerKind::TrappedChest, Vec3i::new(0, 64, 3), vec![stack(1, 5, "stone")]);

    f.orchestrator.run_cycle().await;

    assert_eq!(f.session.transfer_count(), 1);
    assert!(!f.session.is_transferring());
    // 源与目标各开合一次
    assert_eq!(f.world.open_count(), 2);
    assert_eq!(f.world.close_count(), 2);
    // 走近了源和目标两个位置
    assert_eq!(f.navigator.goals().len(), 2);

    let withdrawals = f.world.withdrawals();
    assert_eq!(withdrawals.len(), 1);
    let (item, amount) = withdrawals[0];
    assert_eq!(item, ItemId(1));
    assert!((1..=3).contains(&amount));
}

#[tokio::test]
async fn test_requires_two_containers() {
    let f = fixture();
    f.world
        .add_container(ContainerKind::Chest, Vec3i::new(2, 64, 0), vec![stack(1, 5, "stone")]);

    f.orchestrator.run_cycle().await;

    assert_eq!(f.world.search_count(), 1);
    assert_eq!(f.world.open_count(), 0);
    assert!(f.navigator.goals().is_empty());
    assert_eq!(f.session.transfer_count(), 0);
}

#[tokio::test]
async fn test_empty_source_closes_and_skips() {
    let f = fixture();
    f.world
        .add_container(ContainerKind::Chest, Vec3i::new(2, 64, 0), vec![]);
    f.world
        .add_container(ContainerKind::Chest, Vec3i::new(-2, 64, 0), vec![]);

    f.orchestrator.run_cycle().await;

    // 源打开后发现为空：关箱放弃，不去目标
    assert_eq!(f.world.open_count(), 1);
    assert_eq!(f.world.close_count(), 1);
    assert_eq!(f.session.transfer_count(), 0);
    assert!(!f.session.is_transferring());
}

#[tokio::test]
async fn test_withdraw_failure_recovers_open_container() {
    let f = fixture();
    f.world
        .add_container(ContainerKind::Chest, Vec3i::new(2, 64, 0), vec![stack(1, 5, "stone")]);
    f.world
        .add_container(ContainerKind::Chest, Vec3i::new(-2, 64, 0), vec![stack(1, 5, "stone")]);
    f.world.fail_withdrawals(true);

    f.orchestrator.run_cycle().await;

    // 取出失败后恢复路径把还开着的源容器关掉
    assert_eq!(f.world.open_count(), 1);
    assert_eq!(f.world.close_count(), 1);
    assert_eq!(f.session.transfer_count(), 0);
    assert!(!f.session.is_transferring());
}

#[tokio::test]
async fn test_deposit_failure_closes_target() {
    let f = fixture();
    f.world
        .add_container(ContainerKind::Chest, Vec3i::new(2, 64, 0), vec![stack(1, 5, "stone")]);
    f.world
        .add_container(ContainerKind::Chest, Vec3i::new(-2, 64, 0), vec![stack(1, 5, "stone")]);
    f.world.fail_deposits(true);

    f.orchestrator.run_cycle().await;

    // 源正常关闭一次，目标在恢复路径里关闭一次
    assert_eq!(f.world.open_count(), 2);
    assert_eq!(f.world.close_count(), 2);
    assert_eq!(f.session.transfer_count(), 0);
}

#[tokio::test]
async fn test_close_failure_aborts_cycle() {
    let f = fixture();
    f.world
        .add_container(ContainerKind::Chest, Vec3i::new(2, 64, 0), vec![stack(1, 5, "stone")]);
    f.world
        .add_container(ContainerKind::Chest, Vec3i::new(-2, 64, 0), vec![stack(1, 5, "stone")]);
    f.world.fail_closes(true);

    f.orchestrator.run_cycle().await;

    // 源关闭失败终止本轮；物品已取出但不计数
    assert_eq!(f.world.open_count(), 1);
    assert_eq!(f.session.transfer_count(), 0);
    assert!(!f.session.is_transferring());
}

#[tokio::test]
async fn test_navigation_failure_aborts_before_open() {
    let f = fixture();
    f.world
        .add_container(ContainerKind::Chest, Vec3i::new(2, 64, 0), vec![stack(1, 5, "stone")]);
    f.world
        .add_container(ContainerKind::Chest, Vec3i::new(-2, 64, 0), vec![stack(1, 5, "stone")]);
    f.navigator.fail_moves(true);

    f.orchestrator.run_cycle().await;

    assert_eq!(f.world.search_count(), 1);
    assert_eq!(f.world.open_count(), 0);
    assert_eq!(f.world.close_count(), 0);
    assert!(!f.session.is_transferring());
}

#[tokio::test]
async fn test_unstable_connection_skips_cycle() {
    let world = SimWorld::new(Duration::ZERO);
    world.add_container(ContainerKind::Chest, Vec3i::new(2, 64, 0), vec![stack(1, 5, "stone")]);
    world.add_container(ContainerKind::Chest, Vec3i::new(-2, 64, 0), vec![stack(1, 5, "stone")]);
    // 从未有过活动：连接保持 unstable
    let session = Arc::new(SessionState::new());
    let orchestrator = TransferOrchestrator::new(
        session.clone(),
        Arc::new(world.clone()),
        Arc::new(SimNavigator::new(&world)),
    );

    orchestrator.run_cycle().await;

    assert_eq!(world.search_count(), 0);
    assert_eq!(session.transfer_count(), 0);
}

#[tokio::test]
async fn test_in_flight_guard_blocks_second_cycle() {
    let f = fixture();
    f.world
        .add_container(ContainerKind::Chest, Vec3i::new(2, 64, 0), vec![stack(1, 5, "stone")]);
    f.world
        .add_container(ContainerKind::Chest, Vec3i::new(-2, 64, 0), vec![stack(1, 5, "stone")]);

    let guard = f.session.try_begin_transfer();
    assert!(guard.is_some());
    f.orchestrator.run_cycle().await;
    assert_eq!(f.world.search_count(), 0);

    drop(guard);
    f.orchestrator.run_cycle().await;
    assert_eq!(f.world.search_count(), 1);
}

#[tokio::test]
async fn test_vanished_item_is_not_counted() {
    let f = fixture();
    f.world
        .add_container(ContainerKind::Chest, Vec3i::new(2, 64, 0), vec![stack(1, 5, "stone")]);
    f.world
        .add_container(ContainerKind::Chest, Vec3i::new(-2, 64, 0), vec![stack(1, 5, "stone")]);
    // 取出成功但物品不落入背包
    f.world.swallow_withdrawals(true);

    f.orchestrator.run_cycle().await;

    assert_eq!(f.world.withdrawals().len(), 1);
    // 两个容器都正常关闭，但入库核对失败，不计数
    assert_eq!(f.world.close_count(), 2);
    assert_eq!(f.session.transfer_count(), 0);
    assert!(!f.session.is_transferring());
}

#[tokio::test]
async fn test_amounts_stay_within_bounds_over_many_cycles() {
    let f = fixture();
    f.world
        .add_container(ContainerKind::Chest, Vec3i::new(2, 64, 0), vec![stack(1, 100, "stone")]);
    f.world
        .add_container(ContainerKind::Chest, Vec3i::new(-2, 64, 0), vec![stack(1, 100, "stone")]);

    for _ in 0..20 {
        f.orchestrator.run_cycle().await;
    }

    assert_eq!(f.session.transfer_count(), 20);
    let withdrawals = f.world.withdrawals();
    assert_eq!(withdrawals.len(), 20);
    for (_, amount) in withdrawals {
        assert!((1..=3).contains(&amount), "amount {} out of bounds", amount);
    }
}
