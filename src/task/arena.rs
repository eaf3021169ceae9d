//! 任务记录竞技场实现。
//! Task-record arena implementation.

use crate::task::types::{BucketRef, TaskId, TaskKind, Tick};

/// One scheduled task as stored in the arena.
///
/// The `prev`/`next` fields are arena indices forming the intrusive list of
/// the owning bucket; `owner` tags which bucket that is. A record is owned by
/// at most one bucket at any instant.
///
/// 竞技场中存放的一个已调度任务。
///
/// `prev`/`next` 字段是竞技场索引，构成所属桶的侵入式链表；
/// `owner` 标记所属的桶。任何时刻一条记录至多被一个桶拥有。
#[derive(Debug)]
pub(crate) struct TaskRecord<P> {
    /// 绝对截止时间（第 0 层 tick 数）。
    /// Absolute deadline in level-0 ticks.
    pub(crate) deadline_tick: Tick,
    /// 任务类别。
    /// Task kind.
    pub(crate) kind: TaskKind,
    /// 不透明载荷。
    /// Opaque payload.
    pub(crate) payload: P,
    /// 取消墓碑标记。触发路径在移交前必须检查该标记。
    /// Cancellation tombstone. The firing path must check it before handoff.
    pub(crate) cancelled: bool,
    /// 当前拥有该记录的桶，未入桶时为 `None`。
    /// The bucket currently owning this record, `None` while detached.
    pub(crate) owner: Option<BucketRef>,
    /// 桶内链表的前驱（竞技场索引）。
    /// Predecessor in the bucket list (arena index).
    pub(crate) prev: Option<u32>,
    /// 桶内链表的后继（竞技场索引）。
    /// Successor in the bucket list (arena index).
    pub(crate) next: Option<u32>,
}

impl<P> TaskRecord<P> {
    pub(crate) fn new(deadline_tick: Tick, kind: TaskKind, payload: P) -> Self {
        Self {
            deadline_tick,
            kind,
            payload,
            cancelled: false,
            owner: None,
            prev: None,
            next: None,
        }
    }
}

#[derive(Debug)]
enum SlotState<P> {
    Occupied(TaskRecord<P>),
    Vacant { next_free: Option<u32> },
}

#[derive(Debug)]
struct Slot<P> {
    /// 槽位代数，释放时递增，用于识别过期句柄。
    /// Slot generation, bumped on release, used to detect stale handles.
    generation: u32,
    state: SlotState<P>,
}

/// Arena of task records with a free list.
///
/// Allocation and release are O(1); slots are recycled, so scheduling churn
/// does not grow the arena beyond its peak occupancy.
///
/// 带空闲链表的任务记录竞技场。
///
/// 分配与释放都是 O(1)；槽位会被回收，
/// 因此调度的增删不会让竞技场超过峰值占用继续增长。
#[derive(Debug, Default)]
pub struct TaskArena<P> {
    slots: Vec<Slot<P>>,
    free_head: Option<u32>,
    len: usize,
}

impl<P> TaskArena<P> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
            len: 0,
        }
    }

    /// 分配一条记录并返回其稳定句柄。
    /// Allocate a record and return its stable handle.
    pub(crate) fn insert(&mut self, record: TaskRecord<P>) -> TaskId {
        self.len += 1;
        match self.free_head {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                self.free_head = match slot.state {
                    SlotState::Vacant { next_free } => next_free,
                    // 空闲链表只含空槽；保险起见直接截断链表。
                    // The free list only holds vacant slots; truncate it otherwise.
                    SlotState::Occupied(_) => None,
                };
                slot.state = SlotState::Occupied(record);
                TaskId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    state: SlotState::Occupied(record),
                });
                TaskId {
                    index,
                    generation: 0,
                }
            }
        }
    }

    /// Release the record behind `id`, returning it.
    ///
    /// Returns `None` for a stale or unknown handle; that is a benign no-op,
    /// not an error.
    ///
    /// 释放 `id` 对应的记录并返回它。
    ///
    /// 对过期或未知句柄返回 `None`；这是无害的空操作，不是错误。
    pub(crate) fn remove(&mut self, id: TaskId) -> Option<TaskRecord<P>> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation
            || !matches!(slot.state, SlotState::Occupied(_))
        {
            return None;
        }
        slot.generation = slot.generation.wrapping_add(1);
        let state = std::mem::replace(
            &mut slot.state,
            SlotState::Vacant {
                next_free: self.free_head,
            },
        );
        self.free_head = Some(id.index);
        self.len -= 1;
        match state {
            SlotState::Occupied(record) => Some(record),
            SlotState::Vacant { .. } => None,
        }
    }

    /// 按句柄取记录（代数校验）。
    /// Get a record by handle (generation-checked).
    pub(crate) fn get(&self, id: TaskId) -> Option<&TaskRecord<P>> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        match &slot.state {
            SlotState::Occupied(record) => Some(record),
            SlotState::Vacant { .. } => None,
        }
    }

    /// 按句柄取可变记录（代数校验）。
    /// Get a mutable record by handle (generation-checked).
    pub(crate) fn get_mut(&mut self, id: TaskId) -> Option<&mut TaskRecord<P>> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        match &mut slot.state {
            SlotState::Occupied(record) => Some(record),
            SlotState::Vacant { .. } => None,
        }
    }

    /// 按裸索引取可变记录，供侵入式链表操作使用。
    /// Get a mutable record by raw index, for intrusive-list maintenance.
    pub(crate) fn get_index_mut(&mut self, index: u32) -> Option<&mut TaskRecord<P>> {
        match &mut self.slots.get_mut(index as usize)?.state {
            SlotState::Occupied(record) => Some(record),
            SlotState::Vacant { .. } => None,
        }
    }

    /// 重建裸索引对应的当前句柄。
    /// Reconstruct the current handle for a raw index.
    pub(crate) fn id_for_index(&self, index: u32) -> Option<TaskId> {
        let slot = self.slots.get(index as usize)?;
        match slot.state {
            SlotState::Occupied(_) => Some(TaskId {
                index,
                generation: slot.generation,
            }),
            SlotState::Vacant { .. } => None,
        }
    }

    /// 当前活跃记录数。
    /// Number of live records.
    pub fn len(&self) -> usize {
        self.len
    }

    /// 是否没有任何活跃记录。
    /// Whether no records are live.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
