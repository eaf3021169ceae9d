//! 单层时间轮实现。
//! Single wheel level implementation.

use crate::task::arena::TaskArena;
use crate::task::types::{BucketRef, TaskId, Tick};
use crate::wheel::bucket::Bucket;

/// Result of attempting to place a task into one level.
/// 尝试把任务放入某一层的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AddOutcome {
    /// 已插入对应桶。
    /// Inserted into the matching bucket.
    Inserted {
        /// 桶的到期 tick（截断到本层 tick 边界的桶起点）。
        /// The bucket's expiry tick (bucket start, truncated to this
        /// level's tick boundary).
        expiry: Tick,
        /// 槽位索引。
        /// Slot index.
        slot: u32,
        /// 到期标签发生了变化，桶需要被排入到期队列。
        /// The expiration tag changed; the bucket must be enqueued.
        newly_scheduled: bool,
    },
    /// 截止时间不晚于当前时间，调用方应立即触发而不是丢失任务。
    /// The deadline is not after the current time; the caller should fire
    /// immediately rather than lose the task.
    AlreadyDue,
    /// 截止时间超出本层跨度，调用方应升级到更粗的一层。
    /// The deadline exceeds this level's span; the caller should escalate to
    /// the next coarser level.
    OutOfRange,
}

/// One level of the hierarchy: a fixed circular array of buckets with a tick
/// length expressed in level-0 ticks.
///
/// The slot count must be a power of 2 so the modulo reduces to a bitmask.
///
/// 层级结构中的一层：固定大小的环形桶数组，tick 长度以第 0 层 tick 表示。
///
/// 槽位数量必须是 2 的幂，使取模运算退化为位掩码。
#[derive(Debug)]
pub(crate) struct WheelLevel {
    /// 本层一个 tick 等于多少个第 0 层 tick。
    /// Length of one tick of this level, in level-0 ticks.
    tick: Tick,
    /// 本层总跨度 = tick × 槽位数。
    /// Total span of this level = tick × slot count.
    span: Tick,
    /// 槽位掩码（slot_count - 1），用于快速取模。
    /// Slot mask (slot_count - 1) for fast modulo.
    slot_mask: u64,
    /// 槽位数组，构建后形状不再变化。
    /// Slot array, shape immutable after construction.
    buckets: Vec<Bucket>,
}

impl WheelLevel {
    pub(crate) fn new(tick: Tick, slot_count: usize) -> Self {
        debug_assert!(slot_count.is_power_of_two());
        Self {
            tick,
            span: tick * slot_count as Tick,
            slot_mask: slot_count as u64 - 1,
            buckets: vec![Bucket::default(); slot_count],
        }
    }

    /// Place a task at this level.
    ///
    /// A deadline `d` is accepted only while it falls within
    /// `[current_tick, current_tick + span)`; the slot is `(d / tick) mod
    /// slot_count` and the bucket's expiration is the truncated bucket start
    /// `(d / tick) * tick`, so a task never fires before its deadline.
    ///
    /// 把任务放入本层。
    ///
    /// 截止时间 `d` 只有落在 `[current_tick, current_tick + span)` 内才被接受；
    /// 槽位为 `(d / tick) mod slot_count`，桶的到期值是截断后的桶起点
    /// `(d / tick) * tick`，因此任务绝不会早于截止时间触发。
    pub(crate) fn add<P>(
        &mut self,
        arena: &mut TaskArena<P>,
        id: TaskId,
        deadline_tick: Tick,
        current_tick: Tick,
        level_index: u8,
    ) -> AddOutcome {
        if deadline_tick <= current_tick {
            return AddOutcome::AlreadyDue;
        }
        if deadline_tick >= current_tick.saturating_add(self.span) {
            return AddOutcome::OutOfRange;
        }
        let bucket_index = deadline_tick / self.tick;
        let slot = (bucket_index & self.slot_mask) as u32;
        let expiry = bucket_index * self.tick;
        let bucket = &mut self.buckets[slot as usize];
        bucket.insert(
            arena,
            id,
            BucketRef {
                level: level_index,
                slot,
            },
        );
        let newly_scheduled = bucket.set_expiration(expiry);
        AddOutcome::Inserted {
            expiry,
            slot,
            newly_scheduled,
        }
    }

    pub(crate) fn bucket_mut(&mut self, slot: u32) -> Option<&mut Bucket> {
        self.buckets.get_mut(slot as usize)
    }

    /// 本层一个 tick 的长度（第 0 层 tick 数）。
    /// Length of one tick of this level, in level-0 ticks.
    pub(crate) fn tick(&self) -> Tick {
        self.tick
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.buckets.len()
    }

    pub(crate) fn occupied_slots(&self) -> usize {
        self.buckets.iter().filter(|b| !b.is_empty()).count()
    }

    pub(crate) fn task_count(&self) -> usize {
        self.buckets.iter().map(|b| b.len()).sum()
    }
}
