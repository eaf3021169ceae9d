//! 任务相关的基础类型定义。
//! Basic type definitions for tasks.

/// 时间轮的整数时间单位：自时间轮纪元起经过的第 0 层 tick 数。
/// 所有时间运算都使用整数 tick，绝不使用浮点数，以避免长期运行时的漂移。
///
/// The integer time unit of the wheel: the number of level-0 ticks elapsed
/// since the wheel epoch. All time arithmetic uses integer ticks, never
/// floating point, to avoid drift across long-running processes.
pub type Tick = u64;

/// 调度载荷需要满足的 trait，自动为所有符合条件的类型实现。
/// Trait that schedulable payloads must satisfy, implemented automatically
/// for every qualifying type.
pub trait TaskPayload: Clone + Send + 'static {}

impl<T: Clone + Send + 'static> TaskPayload for T {}

/// Stable handle of one scheduled task.
///
/// The index addresses an arena slot; the generation guards against slot
/// reuse, so operations on a stale handle degrade to benign no-ops.
///
/// 一个已调度任务的稳定句柄。
///
/// 索引指向竞技场槽位；代数用于防止槽位复用带来的 ABA 问题，
/// 因此对过期句柄的操作会退化为无害的空操作。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

/// 任务类别。
/// Task kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Fires exactly once, then the record is released.
    /// 只触发一次，之后释放记录。
    OneShot,
    /// Fires repeatedly; the record and its [`TaskId`] persist across
    /// revolutions and the task is rescheduled at `deadline + interval`
    /// after each firing.
    ///
    /// 重复触发；记录及其 [`TaskId`] 跨越多圈持续存在，
    /// 每次触发后任务会被重新调度到 `deadline + interval`。
    Periodic {
        /// Firing interval, in level-0 ticks. Always at least 1.
        /// 触发间隔（第 0 层 tick 数），至少为 1。
        interval_ticks: Tick,
    },
}

/// What crosses the execution boundary when a task fires.
/// 任务触发时穿过执行边界的数据。
#[derive(Debug, Clone)]
pub struct FiredTask<P> {
    /// The handle of the task that fired.
    /// 触发任务的句柄。
    pub id: TaskId,
    /// The opaque payload supplied at scheduling time.
    /// 调度时提供的不透明载荷。
    pub payload: P,
    /// The deadline the task was scheduled for, in level-0 ticks.
    /// 任务调度的截止时间（第 0 层 tick 数）。
    pub deadline_tick: Tick,
}

/// Identifies the bucket currently owning a task record.
/// 标识当前拥有某任务记录的桶。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BucketRef {
    pub(crate) level: u8,
    pub(crate) slot: u32,
}
