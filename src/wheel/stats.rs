//! 时间轮层级统计信息。
//! Wheel hierarchy statistics.

use crate::task::types::Tick;
use std::time::Duration;

/// Statistics of one hierarchy level.
/// 单个层级的统计信息。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelStats {
    /// 本层一个 tick 的长度（第 0 层 tick 数）。
    /// Length of one tick of this level, in level-0 ticks.
    pub tick_ticks: Tick,
    /// 槽位总数。
    /// Total number of slots.
    pub slot_count: usize,
    /// 非空槽位数。
    /// Number of non-empty slots.
    pub occupied_slots: usize,
    /// 本层驻留的任务数。
    /// Number of tasks resident at this level.
    pub task_count: usize,
}

/// Statistics of the whole wheel hierarchy.
/// 整个时间轮层级结构的统计信息。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyStats {
    /// 各层统计，第 0 层（最细）在前。
    /// Per-level statistics, level 0 (finest) first.
    pub levels: Vec<LevelStats>,
    /// 活跃任务总数。
    /// Total number of live tasks.
    pub active_tasks: usize,
    /// 到期队列中等待排空的桶条目数。
    /// Number of bucket entries pending in the expiry queue.
    pub pending_buckets: usize,
    /// 当前游标位置（第 0 层 tick 数）。
    /// Current cursor position in level-0 ticks.
    pub current_tick: Tick,
    /// 第 0 层 tick 时长。
    /// Level-0 tick duration.
    pub tick_duration: Duration,
}

impl HierarchyStats {
    /// 全部层级驻留任务数之和。
    /// Sum of resident task counts across all levels.
    pub fn resident_tasks(&self) -> usize {
        self.levels.iter().map(|l| l.task_count).sum()
    }
}

impl std::fmt::Display for HierarchyStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "HierarchyStats {{ tick: {}, active: {}, pending_buckets: {}, levels: [",
            self.current_tick, self.active_tasks, self.pending_buckets
        )?;
        for (index, level) in self.levels.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(
                f,
                "{}/{} slots, {} tasks",
                level.occupied_slots, level.slot_count, level.task_count
            )?;
        }
        write!(f, "] }}")
    }
}
