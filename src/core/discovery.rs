//! 容器发现：按种类查找附近的储物容器
//!
//! 协作者出错时软失败返回空列表——调用方对「没找到」和「查询失败」一视同仁，
//! 下一轮调度自然重试。不保证除协作者返回顺序之外的任何排序。

use crate::world::{ContainerKind, ContainerRef, WorldSession};

/// 查找附近可搬运的容器；任何协作者错误都降级为空结果
pub async fn find_nearby_containers(
    world: &dyn WorldSession,
    radius: u32,
    limit: usize,
) -> Vec<ContainerRef> {
    let positions = match world
        .find_matching_blocks(&ContainerKind::ALL, radius, limit)
        .await
    {
        Ok(positions) => positions,
        Err(e) => {
            tracing::warn!("Container search failed: {}", e);
            return Vec::new();
        }
    };

    let mut found = Vec::with_capacity(positions.len());
    for position in positions {
        match world.block_at(position).await {
            Ok(Some(container)) => found.push(container),
            // 查询与读取之间方块消失，跳过
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Block lookup at {} failed: {}", position, e);
                return Vec::new();
            }
        }
    }
    found
}
