//! 分层时间轮核心实现。
//! Hierarchical timing-wheel core implementation.

use crate::config::WheelConfig;
use crate::error::{Error, Result};
use crate::task::arena::{TaskArena, TaskRecord};
use crate::task::types::{FiredTask, TaskId, TaskKind, TaskPayload, Tick};
use crate::wheel::level::{AddOutcome, WheelLevel};
use crate::wheel::stats::{HierarchyStats, LevelStats};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Duration;
use tracing::{debug, trace};

/// Outcome of a schedule call.
/// 一次调度调用的结果。
#[derive(Debug)]
pub enum ScheduleOutcome<P> {
    /// The task is resident in the wheel and will fire later.
    /// 任务已驻留在时间轮中，稍后触发。
    Pending(TaskId),
    /// The deadline was not after the current time, so the task fired on the
    /// spot (a deadline equal to "now" counts as already expired). For a
    /// periodic task the record stays alive, rescheduled one interval ahead.
    ///
    /// 截止时间不晚于当前时间，任务当场触发
    /// （截止时间恰好等于“现在”视为已到期）。
    /// 周期任务的记录继续存活，并被重新调度到一个间隔之后。
    Immediate(FiredTask<P>),
}

/// An entry in the delay-ordered expiry queue: one bucket awaiting drain.
/// Ordering is by expiry tick first, making `Reverse<PendingBucket>` a
/// min-heap key.
///
/// 延迟有序到期队列中的一个条目：一个等待排空的桶。
/// 排序以到期 tick 为先，使 `Reverse<PendingBucket>` 成为最小堆键。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct PendingBucket {
    expiry: Tick,
    level: u8,
    slot: u32,
}

/// The hierarchical timing wheel.
///
/// A chain of wheels where level k+1's tick equals level k's span. A task is
/// always resident in the lowest level whose span covers its remaining delay
/// and is demoted to finer levels as time advances; it is never promoted.
/// The level array is built once at construction and its shape is read-only
/// thereafter.
///
/// 分层时间轮。
///
/// 由一串时间轮组成，第 k+1 层的 tick 等于第 k 层的跨度。
/// 任务始终驻留在跨度能覆盖其剩余延迟的最低层，并随时间推进被降级到更细的层；
/// 绝不会被升级。层数组在构建时一次成型，此后形状只读。
#[derive(Debug)]
pub struct HierarchicalWheel<P> {
    /// 各层时间轮，第 0 层分辨率最细。
    /// The wheel levels, level 0 being the finest resolution.
    levels: Vec<WheelLevel>,
    /// 任务记录竞技场。
    /// Task record arena.
    arena: TaskArena<P>,
    /// 当前游标（第 0 层 tick 数），只向前移动。
    /// Current cursor in level-0 ticks, moving forward only.
    current_tick: Tick,
    /// 延迟有序的待排空桶队列。
    /// Delay-ordered queue of buckets pending drain.
    expiry_queue: BinaryHeap<Reverse<PendingBucket>>,
    /// 可表示的最大跨度（第 0 层 tick 数）。
    /// Maximum representable span in level-0 ticks.
    max_span: Tick,
    /// 第 0 层 tick 时长。
    /// Level-0 tick duration.
    tick_duration: Duration,
    /// tick 时长的纳秒缓存，避免重复转换。
    /// Cached tick duration in nanoseconds to avoid repeated conversion.
    tick_nanos: u64,
}

impl<P: TaskPayload> HierarchicalWheel<P> {
    /// Create a new hierarchy from a validated configuration.
    ///
    /// 从验证过的配置创建一个新的层级结构。
    pub fn new(config: &WheelConfig) -> Result<Self> {
        config.validate()?;
        let mut levels = Vec::with_capacity(config.slot_counts.len());
        let mut tick: Tick = 1;
        for &slot_count in &config.slot_counts {
            levels.push(WheelLevel::new(tick, slot_count));
            tick = tick
                .checked_mul(slot_count as Tick)
                .ok_or_else(|| Error::InvalidConfig("total span overflows".to_string()))?;
        }
        Ok(Self {
            levels,
            arena: TaskArena::new(),
            current_tick: 0,
            expiry_queue: BinaryHeap::new(),
            max_span: tick,
            tick_duration: config.tick_duration,
            tick_nanos: config.tick_duration.as_nanos() as u64,
        })
    }

    /// Convert a wall-clock delay into level-0 ticks, rounding up so the
    /// resulting deadline is never before the requested one.
    ///
    /// 把真实时钟延迟换算为第 0 层 tick 数，向上取整，
    /// 保证换算后的截止时间绝不早于请求值。
    pub fn delay_to_ticks(&self, delay: Duration) -> Tick {
        let nanos = delay.as_nanos();
        (nanos.div_ceil(self.tick_nanos as u128)) as Tick
    }

    /// Schedule a task at a delay relative to the current cursor.
    ///
    /// 以相对当前游标的延迟调度一个任务。
    pub fn schedule(&mut self, delay: Duration, kind: TaskKind, payload: P) -> Result<ScheduleOutcome<P>> {
        let deadline_tick = self.current_tick.saturating_add(self.delay_to_ticks(delay));
        self.schedule_at_tick(deadline_tick, kind, payload)
    }

    /// Schedule a task at an absolute deadline expressed in level-0 ticks.
    ///
    /// A delay larger than the hierarchy's maximum representable span is a
    /// configuration error reported synchronously; the task is not enqueued.
    ///
    /// 以第 0 层 tick 表示的绝对截止时间调度一个任务。
    ///
    /// 超出层级结构最大可表示跨度的延迟属于配置错误，同步报告给调用方；
    /// 任务不会入队。
    pub fn schedule_at_tick(
        &mut self,
        deadline_tick: Tick,
        kind: TaskKind,
        payload: P,
    ) -> Result<ScheduleOutcome<P>> {
        let remaining = deadline_tick.saturating_sub(self.current_tick);
        if remaining >= self.max_span {
            return Err(Error::DelayExceedsSpan {
                requested: self.ticks_to_duration(remaining),
                max_span: self.ticks_to_duration(self.max_span),
            });
        }
        if let TaskKind::Periodic { interval_ticks } = kind
            && (interval_ticks == 0 || interval_ticks >= self.max_span)
        {
            return Err(Error::DelayExceedsSpan {
                requested: self.ticks_to_duration(interval_ticks),
                max_span: self.ticks_to_duration(self.max_span),
            });
        }

        let id = self.arena.insert(TaskRecord::new(deadline_tick, kind, payload));
        if deadline_tick <= self.current_tick {
            // 截止时间等于当前时间的任务按已到期处理，立即触发，
            // 避免边界情况多等整整一圈。
            // A deadline equal to the current time counts as already
            // expired and fires now, sparing borderline tasks a full
            // revolution of extra wait.
            let now = self.current_tick;
            return match self.fire_task(id, now) {
                Some(fired) => Ok(ScheduleOutcome::Immediate(fired)),
                None => Ok(ScheduleOutcome::Pending(id)),
            };
        }

        match self.insert_at_level(id, deadline_tick) {
            Some(level) => {
                trace!(
                    task = ?id,
                    deadline_tick,
                    level,
                    "Task scheduled into wheel"
                );
                Ok(ScheduleOutcome::Pending(id))
            }
            None => {
                // 插入竞争中截止时间已成为过去：立即触发而不是丢失任务。
                // The deadline slipped into the past during insertion:
                // fire immediately rather than lose the task.
                let now = self.current_tick;
                match self.fire_task(id, now) {
                    Some(fired) => Ok(ScheduleOutcome::Immediate(fired)),
                    None => Ok(ScheduleOutcome::Pending(id)),
                }
            }
        }
    }

    /// Cancel a task.
    ///
    /// Marks the cancellation tombstone, unlinks the record from its
    /// currently owning bucket and releases it. Idempotent: a second call,
    /// or a call racing a completed firing, returns `false` as a benign
    /// no-op.
    ///
    /// 取消一个任务。
    ///
    /// 先打上取消墓碑，再把记录从当前拥有它的桶中摘除并释放。
    /// 幂等：重复调用或与已完成触发竞争的调用返回 `false`，属于无害空操作。
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let Some(record) = self.arena.get_mut(id) else {
            trace!(task = ?id, "Cancel on unknown or finished task");
            return false;
        };
        record.cancelled = true;
        let owner = record.owner;
        if let Some(owner) = owner
            && let Some(bucket) = self.levels[owner.level as usize].bucket_mut(owner.slot)
        {
            bucket.remove(&mut self.arena, id, owner);
        }
        let cancelled = self.arena.remove(id).is_some();
        if cancelled {
            trace!(task = ?id, "Task cancelled");
        }
        cancelled
    }

    /// Advance the wheel to `now_tick`, draining every due bucket in one
    /// pass and returning the tasks that fired.
    ///
    /// A no-op when `now_tick` is not after the cursor. When several ticks
    /// elapsed at once (driver stall, clock jump) all intervening buckets
    /// are drained from the expiry queue in a single pass, bounding catch-up
    /// cost; the cursor never iterates tick by tick.
    ///
    /// 把时间轮推进到 `now_tick`，一趟排空所有到期的桶并返回触发的任务。
    ///
    /// `now_tick` 不晚于游标时为空操作。当一次经过多个 tick
    /// （驱动器停顿、时钟跳变）时，所有途经的桶在一趟内从到期队列排空，
    /// 从而限定追赶开销；游标绝不逐 tick 迭代。
    pub fn advance_to(&mut self, now_tick: Tick) -> Vec<FiredTask<P>> {
        if now_tick <= self.current_tick {
            return Vec::new();
        }
        self.current_tick = now_tick;

        let mut fired = Vec::new();
        let mut drained_buckets = 0usize;
        while let Some(&Reverse(pending)) = self.expiry_queue.peek() {
            if pending.expiry > now_tick {
                break;
            }
            self.expiry_queue.pop();
            let Some(bucket) = self.levels[pending.level as usize].bucket_mut(pending.slot) else {
                continue;
            };
            // 桶被排空后复用时会留下过期的队列条目；
            // 到期标签不匹配的条目直接跳过，否则会提前排空新一圈的任务。
            // Bucket recycling leaves stale queue entries behind; entries
            // whose expiration tag no longer matches are skipped, or a
            // later revolution's tasks would drain early.
            if bucket.expiration() != Some(pending.expiry) {
                continue;
            }
            drained_buckets += 1;
            let detached = bucket.drain(&mut self.arena);
            for id in detached {
                if let Some(task) = self.fire_or_demote(id, now_tick) {
                    fired.push(task);
                }
            }
        }

        if !fired.is_empty() || drained_buckets > 0 {
            debug!(
                now_tick,
                drained_buckets,
                fired = fired.len(),
                "Wheel advanced"
            );
        }
        fired
    }

    /// 到期队列中最早的桶到期时间。
    /// Earliest bucket expiry in the queue.
    pub fn next_expiry_tick(&self) -> Option<Tick> {
        self.expiry_queue.peek().map(|Reverse(p)| p.expiry)
    }

    /// Instrumentation hook: the level a task is currently resident in.
    ///
    /// 观测钩子：任务当前驻留的层级。
    pub fn level_of(&self, id: TaskId) -> Option<usize> {
        self.arena
            .get(id)
            .and_then(|record| record.owner)
            .map(|owner| owner.level as usize)
    }

    /// 当前游标（第 0 层 tick 数）。
    /// Current cursor in level-0 ticks.
    pub fn current_tick(&self) -> Tick {
        self.current_tick
    }

    /// 第 0 层 tick 时长。
    /// Level-0 tick duration.
    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    /// 最大可表示跨度（第 0 层 tick 数）。
    /// Maximum representable span in level-0 ticks.
    pub fn max_span(&self) -> Tick {
        self.max_span
    }

    /// 活跃任务数。
    /// Number of live tasks.
    pub fn task_count(&self) -> usize {
        self.arena.len()
    }

    /// 是否没有任何活跃任务。
    /// Whether no tasks are live.
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// 获取层级结构统计信息。
    /// Get hierarchy statistics.
    pub fn stats(&self) -> HierarchyStats {
        HierarchyStats {
            levels: self
                .levels
                .iter()
                .map(|level| LevelStats {
                    tick_ticks: level.tick(),
                    slot_count: level.slot_count(),
                    occupied_slots: level.occupied_slots(),
                    task_count: level.task_count(),
                })
                .collect(),
            active_tasks: self.arena.len(),
            pending_buckets: self.expiry_queue.len(),
            current_tick: self.current_tick,
            tick_duration: self.tick_duration,
        }
    }

    fn ticks_to_duration(&self, ticks: Tick) -> Duration {
        Duration::from_nanos(ticks.saturating_mul(self.tick_nanos))
    }

    /// Route a detached record into the lowest level whose span covers it.
    ///
    /// # Returns
    /// The accepting level, or `None` when the deadline is already due and
    /// the caller must fire the task instead.
    ///
    /// 把已脱离的记录路由到跨度能覆盖它的最低层。
    ///
    /// # 返回值
    /// 接受任务的层级；截止时间已到期时返回 `None`，调用方应转为触发任务。
    fn insert_at_level(&mut self, id: TaskId, deadline_tick: Tick) -> Option<usize> {
        let current_tick = self.current_tick;
        for (index, level) in self.levels.iter_mut().enumerate() {
            match level.add(&mut self.arena, id, deadline_tick, current_tick, index as u8) {
                AddOutcome::Inserted {
                    expiry,
                    slot,
                    newly_scheduled,
                } => {
                    if newly_scheduled {
                        self.expiry_queue.push(Reverse(PendingBucket {
                            expiry,
                            level: index as u8,
                            slot,
                        }));
                    }
                    return Some(index);
                }
                AddOutcome::AlreadyDue => return None,
                AddOutcome::OutOfRange => continue,
            }
        }
        // 跨度检查保证不会走到这里；即便走到也触发任务而不是丢失它。
        // The span check keeps this unreachable; even then the task fires
        // instead of being lost.
        None
    }

    /// Decide the fate of one freshly drained task: release it if it carries
    /// the cancellation tombstone, fire it if its deadline has arrived, or
    /// demote it into a finer level otherwise. Demotion is a plain loop over
    /// the level array, bounded by hierarchy depth.
    ///
    /// 决定一个刚排空任务的去向：带取消墓碑的直接释放，
    /// 截止时间已到的触发，其余降级到更细的层。
    /// 降级是对层数组的普通循环，深度受层级数限制。
    fn fire_or_demote(&mut self, id: TaskId, now_tick: Tick) -> Option<FiredTask<P>> {
        let record = self.arena.get(id)?;
        if record.cancelled {
            // 触发路径在摘除之后、移交之前检查墓碑。
            // The firing path checks the tombstone after detach and
            // before handoff.
            self.arena.remove(id);
            return None;
        }
        let deadline_tick = record.deadline_tick;
        if deadline_tick <= now_tick {
            return self.fire_task(id, now_tick);
        }
        match self.insert_at_level(id, deadline_tick) {
            Some(level) => {
                trace!(task = ?id, deadline_tick, level, "Task demoted");
                None
            }
            None => self.fire_task(id, now_tick),
        }
    }

    /// Fire one task. One-shot records are released; periodic records stay
    /// alive under the same handle and are relinked one interval past their
    /// old deadline (skipping intervals that already elapsed, so a stalled
    /// driver does not produce a burst of catch-up firings).
    ///
    /// 触发一个任务。一次性记录被释放；周期记录在同一句柄下继续存活，
    /// 并被重新链接到旧截止时间一个间隔之后
    /// （跳过已经流逝的间隔，驱动器停顿不会造成补偿性的连环触发）。
    fn fire_task(&mut self, id: TaskId, now_tick: Tick) -> Option<FiredTask<P>> {
        let record = self.arena.get_mut(id)?;
        match record.kind {
            TaskKind::OneShot => {
                let record = self.arena.remove(id)?;
                trace!(task = ?id, deadline_tick = record.deadline_tick, "Task fired");
                Some(FiredTask {
                    id,
                    payload: record.payload,
                    deadline_tick: record.deadline_tick,
                })
            }
            TaskKind::Periodic { interval_ticks } => {
                let payload = record.payload.clone();
                let deadline_tick = record.deadline_tick;
                let mut next_deadline = deadline_tick.saturating_add(interval_ticks);
                while next_deadline <= now_tick {
                    next_deadline = next_deadline.saturating_add(interval_ticks);
                }
                record.deadline_tick = next_deadline;
                let _ = self.insert_at_level(id, next_deadline);
                trace!(
                    task = ?id,
                    deadline_tick,
                    next_deadline,
                    "Periodic task fired and rescheduled"
                );
                Some(FiredTask {
                    id,
                    payload,
                    deadline_tick,
                })
            }
        }
    }
}
