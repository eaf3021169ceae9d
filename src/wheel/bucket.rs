//! 时间槽桶实现。
//! Time-slot bucket implementation.

use crate::task::arena::TaskArena;
use crate::task::types::{BucketRef, TaskId, Tick};

/// A bucket holds every task whose deadline falls into one time slot of one
/// wheel level, as an intrusive list threaded through the task arena.
///
/// Buckets are allocated once per (level, slot) at wheel construction and are
/// recycled across revolutions: the expiration tag is meaningful only while
/// the bucket holds at least one task or is pending drain, and is reset to
/// unset once fully drained.
///
/// 一个桶容纳截止时间落在某一层某个时间槽内的全部任务，
/// 以穿过任务竞技场的侵入式链表组织。
///
/// 桶在时间轮构建时按（层，槽位）一次性分配，并跨圈复用：
/// 到期标签只在桶内至少有一个任务或等待排空时才有意义，
/// 完全排空后被重置为未设置状态。
#[derive(Debug, Clone, Default)]
pub(crate) struct Bucket {
    /// 链表头（竞技场索引）。
    /// List head (arena index).
    head: Option<u32>,
    /// 桶内任务数。
    /// Number of tasks in the bucket.
    len: usize,
    /// 到期 tick，`None` 表示未设置（空闲可复用）。
    /// Expiration tick, `None` meaning unset (idle and reusable).
    expiration: Option<Tick>,
}

impl Bucket {
    /// Link a task into this bucket and stamp its owner tag.
    ///
    /// Ownership transfer is atomic under the hierarchy's exclusive access:
    /// the record is linked and tagged in one step.
    ///
    /// 把任务链入该桶并打上归属标记。
    ///
    /// 归属转移在层级结构的独占访问下是原子的：记录在一步内完成链接与打标。
    pub(crate) fn insert<P>(&mut self, arena: &mut TaskArena<P>, id: TaskId, me: BucketRef) {
        let old_head = self.head;
        let Some(record) = arena.get_mut(id) else {
            // 过期句柄，无事可做
            // Stale handle, nothing to link
            return;
        };
        record.owner = Some(me);
        record.prev = None;
        record.next = old_head;
        if let Some(head_index) = old_head
            && let Some(head_record) = arena.get_index_mut(head_index)
        {
            head_record.prev = Some(id.index);
        }
        self.head = Some(id.index);
        self.len += 1;
    }

    /// Unlink a task from this bucket.
    ///
    /// # Returns
    /// `false` when the task is no longer owned by this bucket (already moved
    /// or fired). Callers must treat that as a benign no-op, not an error.
    ///
    /// 把任务从该桶摘除。
    ///
    /// # 返回值
    /// 当任务已不属于该桶（已被移动或触发）时返回 `false`。
    /// 调用方必须把它当作无害的空操作而不是错误。
    pub(crate) fn remove<P>(&mut self, arena: &mut TaskArena<P>, id: TaskId, me: BucketRef) -> bool {
        let Some(record) = arena.get(id) else {
            return false;
        };
        if record.owner != Some(me) {
            return false;
        }
        let (prev, next) = (record.prev, record.next);
        match prev {
            Some(prev_index) => {
                if let Some(prev_record) = arena.get_index_mut(prev_index) {
                    prev_record.next = next;
                }
            }
            None => self.head = next,
        }
        if let Some(next_index) = next
            && let Some(next_record) = arena.get_index_mut(next_index)
        {
            next_record.prev = prev;
        }
        if let Some(record) = arena.get_mut(id) {
            record.owner = None;
            record.prev = None;
            record.next = None;
        }
        self.len = self.len.saturating_sub(1);
        true
    }

    /// Update the expiration tag.
    ///
    /// # Returns
    /// `true` iff the previous expiration differed from `expiry`. The caller
    /// uses this to decide whether the bucket must be (re)scheduled in the
    /// driver's expiry structure, preventing duplicate scheduling of the same
    /// bucket.
    ///
    /// 更新到期标签。
    ///
    /// # 返回值
    /// 当且仅当之前的到期值与 `expiry` 不同时返回 `true`。
    /// 调用方据此决定是否需要把桶（重新）排入驱动器的到期结构，
    /// 避免同一个桶被重复排队。
    pub(crate) fn set_expiration(&mut self, expiry: Tick) -> bool {
        if self.expiration == Some(expiry) {
            return false;
        }
        self.expiration = Some(expiry);
        true
    }

    /// 当前到期标签。
    /// Current expiration tag.
    pub(crate) fn expiration(&self) -> Option<Tick> {
        self.expiration
    }

    /// Atomically detach and return all member tasks, clearing the expiration
    /// to unset. The bucket is immediately reusable afterwards without
    /// reallocation.
    ///
    /// 原子地摘下并返回全部成员任务，同时把到期标签清为未设置。
    /// 之后桶立即可复用，无需重新分配。
    pub(crate) fn drain<P>(&mut self, arena: &mut TaskArena<P>) -> Vec<TaskId> {
        let mut detached = Vec::with_capacity(self.len);
        let mut cursor = self.head.take();
        while let Some(index) = cursor {
            let Some(id) = arena.id_for_index(index) else {
                break;
            };
            let Some(record) = arena.get_index_mut(index) else {
                break;
            };
            cursor = record.next;
            record.owner = None;
            record.prev = None;
            record.next = None;
            detached.push(id);
        }
        self.len = 0;
        self.expiration = None;
        detached
    }

    /// 桶内任务数。
    /// Number of tasks in the bucket.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// 桶是否为空。
    /// Whether the bucket is empty.
    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::arena::TaskRecord;
    use crate::task::types::TaskKind;

    fn setup() -> (TaskArena<u8>, Bucket, BucketRef) {
        (TaskArena::new(), Bucket::default(), BucketRef { level: 0, slot: 3 })
    }

    fn schedule(arena: &mut TaskArena<u8>, deadline: Tick) -> TaskId {
        arena.insert(TaskRecord::new(deadline, TaskKind::OneShot, 0))
    }

    #[test]
    fn test_insert_and_drain() {
        let (mut arena, mut bucket, me) = setup();
        let a = schedule(&mut arena, 4);
        let b = schedule(&mut arena, 4);
        bucket.insert(&mut arena, a, me);
        bucket.insert(&mut arena, b, me);
        assert!(bucket.set_expiration(4));
        assert_eq!(bucket.len(), 2);

        let drained = bucket.drain(&mut arena);
        assert_eq!(drained.len(), 2);
        assert!(bucket.is_empty());
        assert_eq!(bucket.expiration(), None);
        // 排空后的任务处于脱离状态
        // Drained tasks are detached
        for id in drained {
            assert_eq!(arena.get(id).unwrap().owner, None);
        }
    }

    #[test]
    fn test_remove_middle_element() {
        let (mut arena, mut bucket, me) = setup();
        let ids: Vec<_> = (0..3).map(|_| schedule(&mut arena, 4)).collect();
        for &id in &ids {
            bucket.insert(&mut arena, id, me);
        }
        assert!(bucket.remove(&mut arena, ids[1], me));
        assert_eq!(bucket.len(), 2);
        let drained = bucket.drain(&mut arena);
        assert_eq!(drained.len(), 2);
        assert!(!drained.contains(&ids[1]));
    }

    #[test]
    fn test_remove_foreign_task_is_noop() {
        let (mut arena, mut bucket, me) = setup();
        let other = BucketRef { level: 1, slot: 0 };
        let id = schedule(&mut arena, 4);
        bucket.insert(&mut arena, id, me);
        let mut foreign = Bucket::default();
        // 任务不属于 foreign 桶，移除必须失败且不破坏链表
        // The task is not owned by the foreign bucket; removal must fail
        // without corrupting the list
        assert!(!foreign.remove(&mut arena, id, other));
        assert_eq!(bucket.len(), 1);
        assert_eq!(bucket.drain(&mut arena).len(), 1);
    }

    #[test]
    fn test_set_expiration_deduplicates() {
        let (_, mut bucket, _) = setup();
        assert!(bucket.set_expiration(10));
        assert!(!bucket.set_expiration(10));
        assert!(bucket.set_expiration(20));
    }

    #[test]
    fn test_bucket_reusable_after_drain() {
        let (mut arena, mut bucket, me) = setup();
        let first = schedule(&mut arena, 4);
        bucket.insert(&mut arena, first, me);
        bucket.set_expiration(4);
        bucket.drain(&mut arena);

        let second = schedule(&mut arena, 12);
        bucket.insert(&mut arena, second, me);
        // 复用的桶必须把新一圈的到期值视为变化
        // A recycled bucket must see the next revolution's expiry as a change
        assert!(bucket.set_expiration(12));
        assert_eq!(bucket.len(), 1);
    }
}
