//! 调度器驱动命令定义
//! Scheduler driver command definitions

use crate::error::Result;
use crate::task::types::{TaskId, TaskPayload};
use crate::wheel::HierarchyStats;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// How a schedule request expresses its deadline.
/// 调度请求表达截止时间的方式。
#[derive(Debug)]
pub enum ScheduleWhen {
    /// 相对当前时间的延迟。
    /// Delay relative to now.
    After(Duration),
    /// 绝对时间点。
    /// Absolute point in time.
    At(Instant),
}

/// 驱动器命令枚举
/// Driver command enum
#[derive(Debug)]
pub enum DriverCommand<P: TaskPayload> {
    /// 调度任务
    /// Schedule a task
    Schedule {
        /// 截止时间
        /// Deadline
        when: ScheduleWhen,
        /// 周期任务的重复间隔，`None` 为一次性任务
        /// Repeat interval for periodic tasks, `None` for one-shot
        repeat: Option<Duration>,
        /// 任务载荷
        /// Task payload
        payload: P,
        /// 响应通道
        /// Response channel
        response_tx: oneshot::Sender<Result<TaskId>>,
    },
    /// 取消任务
    /// Cancel a task
    Cancel {
        id: TaskId,
        response_tx: oneshot::Sender<bool>,
    },
    /// 查询任务当前驻留的层级（观测用）
    /// Query the level a task currently resides in (instrumentation)
    LevelOf {
        id: TaskId,
        response_tx: oneshot::Sender<Option<usize>>,
    },
    /// 获取统计信息
    /// Get statistics
    GetStats {
        response_tx: oneshot::Sender<SchedulerStats>,
    },
    /// 关闭驱动器
    /// Shut the driver down
    Shutdown,
}

/// 调度器统计信息
/// Scheduler statistics
#[derive(Debug, Clone)]
pub struct SchedulerStats {
    /// 已接受的调度请求数
    /// Accepted schedule requests
    pub scheduled: u64,
    /// 已触发的任务数（含周期任务的每次触发）
    /// Fired tasks (each periodic firing counts)
    pub fired: u64,
    /// 已取消的任务数
    /// Cancelled tasks
    pub cancelled: u64,
    /// 移交被执行方拒绝的次数
    /// Handoffs rejected by the executor
    pub handoff_failures: u64,
    /// 当前驻留在时间轮中的任务数
    /// Tasks currently resident in the wheel
    pub active_tasks: usize,
    /// 时间轮层级统计
    /// Wheel hierarchy statistics
    pub wheel: HierarchyStats,
}

impl std::fmt::Display for SchedulerStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SchedulerStats {{ scheduled: {}, fired: {}, cancelled: {}, handoff_failures: {}, active: {} }}",
            self.scheduled, self.fired, self.cancelled, self.handoff_failures, self.active_tasks
        )
    }
}
