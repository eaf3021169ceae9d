//! 分层时间轮模块
//! Hierarchical timing wheel module
//!
//! 提供由多层时间轮组成的调度核心：上层轮的一个 tick 等于下层轮的整个跨度，
//! 任务随时间推进从粗层降级到细层，插入、取消、触发均为 O(1) 摊销开销。
//! 到期桶由一个按延迟排序的队列统一驱动，驱动器停顿后可一趟追平。
//!
//! Provides the scheduling core built from stacked wheels: one tick of an
//! upper wheel equals the whole span of the wheel below, tasks demote from
//! coarse to fine levels as time advances, and insert, cancel and expiry
//! are amortized O(1). Due buckets are driven off one delay-ordered queue,
//! so a stalled driver catches up in a single pass.

mod bucket;
mod hierarchy;
mod level;
mod stats;

pub use hierarchy::{HierarchicalWheel, ScheduleOutcome};
pub use stats::{HierarchyStats, LevelStats};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WheelConfig;
    use crate::error::Error;
    use crate::task::types::{TaskId, TaskKind};
    use std::time::Duration;

    /// 三层、每层 4 槽的小型配置，方便手推降级路径。
    /// Tiny three-level, four-slot config for hand-traceable demotion paths.
    fn tiny_config() -> WheelConfig {
        WheelConfig {
            tick_duration: Duration::from_millis(10),
            slot_counts: vec![4, 4, 4],
        }
    }

    fn wheel() -> HierarchicalWheel<&'static str> {
        HierarchicalWheel::new(&tiny_config()).unwrap()
    }

    fn pending_id(outcome: ScheduleOutcome<&'static str>) -> TaskId {
        match outcome {
            ScheduleOutcome::Pending(id) => id,
            ScheduleOutcome::Immediate(task) => {
                panic!("expected pending task, fired immediately: {:?}", task.id)
            }
        }
    }

    #[test]
    fn short_delay_lands_in_level_zero() {
        let mut wheel = wheel();
        let id = pending_id(
            wheel
                .schedule(Duration::from_millis(20), TaskKind::OneShot, "a")
                .unwrap(),
        );
        assert_eq!(wheel.level_of(id), Some(0));
        assert_eq!(wheel.task_count(), 1);
    }

    #[test]
    fn long_delay_lands_in_coarse_level_and_demotes_downward() {
        let mut wheel = wheel();
        // 21 ticks：超过第 0 层跨度 (4) 和第 1 层跨度 (16)，落在第 2 层。
        // 21 ticks: beyond level 0's span (4) and level 1's (16), lands
        // in level 2.
        let id = pending_id(
            wheel
                .schedule_at_tick(21, TaskKind::OneShot, "deep")
                .unwrap(),
        );
        assert_eq!(wheel.level_of(id), Some(2));

        // 第 2 层桶在 tick 16 到期，任务降级到第 1 层。
        // The level-2 bucket expires at tick 16; the task demotes to
        // level 1.
        assert!(wheel.advance_to(16).is_empty());
        assert_eq!(wheel.level_of(id), Some(1));

        // 第 1 层桶在 tick 20 到期，任务降级到第 0 层。
        // The level-1 bucket expires at tick 20; demote to level 0.
        assert!(wheel.advance_to(20).is_empty());
        assert_eq!(wheel.level_of(id), Some(0));

        let fired = wheel.advance_to(21);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].id, id);
        assert_eq!(fired[0].payload, "deep");
        assert!(wheel.is_empty());
    }

    #[test]
    fn deadline_equal_to_now_fires_immediately() {
        let mut wheel = wheel();
        let id = pending_id(wheel.schedule_at_tick(5, TaskKind::OneShot, "x").unwrap());
        let fired = wheel.advance_to(5);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].id, id);

        // 游标已在 5，截止时间等于“现在”的新任务当场触发。
        // The cursor sits at 5; a new task whose deadline equals "now"
        // fires on the spot.
        match wheel.schedule_at_tick(5, TaskKind::OneShot, "now").unwrap() {
            ScheduleOutcome::Immediate(task) => assert_eq!(task.payload, "now"),
            ScheduleOutcome::Pending(id) => panic!("expected immediate firing, got {id:?}"),
        }
    }

    #[test]
    fn zero_delay_fires_immediately() {
        let mut wheel = wheel();
        match wheel
            .schedule(Duration::ZERO, TaskKind::OneShot, "zero")
            .unwrap()
        {
            ScheduleOutcome::Immediate(task) => assert_eq!(task.payload, "zero"),
            ScheduleOutcome::Pending(id) => panic!("expected immediate firing, got {id:?}"),
        }
    }

    #[test]
    fn delay_to_ticks_rounds_up() {
        let wheel = wheel();
        assert_eq!(wheel.delay_to_ticks(Duration::from_millis(10)), 1);
        assert_eq!(wheel.delay_to_ticks(Duration::from_millis(11)), 2);
        assert_eq!(wheel.delay_to_ticks(Duration::from_millis(1)), 1);
        assert_eq!(wheel.delay_to_ticks(Duration::ZERO), 0);
    }

    #[test]
    fn delay_beyond_total_span_is_rejected() {
        let mut wheel = wheel();
        // 总跨度 4*4*4 = 64 ticks。
        // Total span is 4*4*4 = 64 ticks.
        let err = wheel
            .schedule_at_tick(64, TaskKind::OneShot, "too far")
            .unwrap_err();
        assert!(matches!(err, Error::DelayExceedsSpan { .. }));
        assert!(wheel.is_empty());

        assert!(wheel.schedule_at_tick(63, TaskKind::OneShot, "edge").is_ok());
    }

    #[test]
    fn cancel_is_idempotent_and_prevents_firing() {
        let mut wheel = wheel();
        let id = pending_id(wheel.schedule_at_tick(3, TaskKind::OneShot, "c").unwrap());
        assert!(wheel.cancel(id));
        assert!(!wheel.cancel(id));
        assert!(wheel.advance_to(10).is_empty());
        assert!(wheel.is_empty());
    }

    #[test]
    fn cancel_after_firing_is_a_noop() {
        let mut wheel = wheel();
        let id = pending_id(wheel.schedule_at_tick(2, TaskKind::OneShot, "f").unwrap());
        assert_eq!(wheel.advance_to(2).len(), 1);
        assert!(!wheel.cancel(id));
    }

    #[test]
    fn stale_handle_does_not_cancel_successor() {
        let mut wheel = wheel();
        let first = pending_id(wheel.schedule_at_tick(2, TaskKind::OneShot, "a").unwrap());
        assert!(wheel.cancel(first));
        // 竞技场复用槽位后，旧句柄因代数不匹配而失效。
        // After the arena recycles the slot, the old handle fails the
        // generation check.
        let second = pending_id(wheel.schedule_at_tick(3, TaskKind::OneShot, "b").unwrap());
        assert!(!wheel.cancel(first));
        assert_eq!(wheel.advance_to(3).len(), 1);
        let _ = second;
    }

    #[test]
    fn thousand_tasks_on_one_tick_drain_exactly_once() {
        let mut wheel = wheel();
        for _ in 0..1000 {
            pending_id(wheel.schedule_at_tick(3, TaskKind::OneShot, "burst").unwrap());
        }
        assert_eq!(wheel.task_count(), 1000);
        let fired = wheel.advance_to(3);
        assert_eq!(fired.len(), 1000);
        assert!(wheel.is_empty());
        // 重复推进不产生第二次触发。
        // Repeated advancing yields no second firing.
        assert!(wheel.advance_to(4).is_empty());
    }

    #[test]
    fn advance_is_a_noop_for_past_times() {
        let mut wheel = wheel();
        pending_id(wheel.schedule_at_tick(3, TaskKind::OneShot, "t").unwrap());
        assert_eq!(wheel.advance_to(5).len(), 1);
        assert_eq!(wheel.current_tick(), 5);
        assert!(wheel.advance_to(5).is_empty());
        assert!(wheel.advance_to(2).is_empty());
        assert_eq!(wheel.current_tick(), 5);
    }

    #[test]
    fn stalled_advance_catches_up_in_one_pass() {
        let mut wheel = wheel();
        let mut ids = Vec::new();
        for tick in [1, 2, 5, 17, 40] {
            ids.push(pending_id(
                wheel.schedule_at_tick(tick, TaskKind::OneShot, "s").unwrap(),
            ));
        }
        // 一次大步跳过所有截止时间，途经的桶全部排空。
        // One big step past every deadline drains all intervening
        // buckets.
        let fired = wheel.advance_to(50);
        assert_eq!(fired.len(), ids.len());
        assert!(wheel.is_empty());
        assert_eq!(wheel.next_expiry_tick(), None);
    }

    #[test]
    fn slot_wraps_around_after_full_revolution() {
        let mut wheel = wheel();
        let a = pending_id(wheel.schedule_at_tick(2, TaskKind::OneShot, "a").unwrap());
        assert_eq!(wheel.advance_to(2)[0].id, a);
        // tick 6 超出第 0 层从游标 2 起的窗口，先落第 1 层，再经降级
        // 复用第 0 层的槽位。
        // Tick 6 is past level 0's window from cursor 2, lands in level
        // 1 first and reuses a level-0 slot through demotion.
        let b = pending_id(wheel.schedule_at_tick(6, TaskKind::OneShot, "b").unwrap());
        assert_eq!(wheel.level_of(b), Some(1));
        assert!(wheel.advance_to(5).is_empty());
        assert_eq!(wheel.level_of(b), Some(0));
        let fired = wheel.advance_to(6);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].id, b);
    }

    #[test]
    fn cancelled_bucket_is_reused_cleanly() {
        let mut wheel = wheel();
        let a = pending_id(wheel.schedule_at_tick(2, TaskKind::OneShot, "a").unwrap());
        assert!(wheel.cancel(a));
        // 取消后桶为空但队列条目仍在；推进时该条目排空不出任何任务，
        // 之后同一槽位可被新任务干净复用。
        // After the cancel the bucket is empty but its queue entry
        // remains; advancing drains it to nothing and the slot is
        // reused cleanly by a later task.
        assert!(wheel.advance_to(3).is_empty());
        let b = pending_id(wheel.schedule_at_tick(6, TaskKind::OneShot, "b").unwrap());
        assert_eq!(wheel.level_of(b), Some(0));
        let fired = wheel.advance_to(6);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].id, b);
    }

    #[test]
    fn capacity_is_task_count_not_slot_count() {
        let mut wheel = wheel();
        let mut ids = Vec::new();
        for i in 0..100 {
            // 全部挤进少数几个槽位。
            // All crowded into a handful of slots.
            ids.push(pending_id(
                wheel
                    .schedule_at_tick(1 + (i % 3), TaskKind::OneShot, "n")
                    .unwrap(),
            ));
        }
        let stats = wheel.stats();
        assert_eq!(stats.active_tasks, 100);
        assert!(stats.levels[0].occupied_slots <= 3);

        for id in ids.iter().skip(1) {
            assert!(wheel.cancel(*id));
        }
        let stats = wheel.stats();
        assert_eq!(stats.active_tasks, 1);
        let fired = wheel.advance_to(4);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].id, ids[0]);
    }

    #[test]
    fn periodic_task_refires_under_the_same_handle() {
        let mut wheel = wheel();
        let id = pending_id(
            wheel
                .schedule_at_tick(2, TaskKind::Periodic { interval_ticks: 3 }, "p")
                .unwrap(),
        );
        let fired = wheel.advance_to(2);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].id, id);
        // 记录继续存活，重新调度到 2 + 3 = 5。
        // The record stays alive, rescheduled to 2 + 3 = 5.
        assert_eq!(wheel.task_count(), 1);
        assert!(wheel.advance_to(4).is_empty());
        let fired = wheel.advance_to(5);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].id, id);

        assert!(wheel.cancel(id));
        assert!(wheel.advance_to(20).is_empty());
    }

    #[test]
    fn periodic_task_skips_missed_intervals_after_stall() {
        let mut wheel = wheel();
        let id = pending_id(
            wheel
                .schedule_at_tick(2, TaskKind::Periodic { interval_ticks: 2 }, "p")
                .unwrap(),
        );
        // 停顿跨过多个间隔：只触发一次，下一次截止时间跳到未来。
        // A stall across several intervals fires once; the next deadline
        // jumps into the future.
        let fired = wheel.advance_to(9);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].id, id);
        assert!(wheel.advance_to(9).is_empty());
        let fired = wheel.advance_to(10);
        assert_eq!(fired.len(), 1);
        assert!(wheel.cancel(id));
    }

    #[test]
    fn zero_interval_periodic_is_rejected() {
        let mut wheel = wheel();
        let err = wheel
            .schedule_at_tick(2, TaskKind::Periodic { interval_ticks: 0 }, "p")
            .unwrap_err();
        assert!(matches!(err, Error::DelayExceedsSpan { .. }));
    }

    #[test]
    fn next_expiry_tracks_the_earliest_bucket() {
        let mut wheel = wheel();
        pending_id(wheel.schedule_at_tick(3, TaskKind::OneShot, "late").unwrap());
        pending_id(wheel.schedule_at_tick(2, TaskKind::OneShot, "soon").unwrap());
        assert_eq!(wheel.next_expiry_tick(), Some(2));
        assert_eq!(wheel.advance_to(2).len(), 1);
        assert_eq!(wheel.next_expiry_tick(), Some(3));
        // 粗层桶的到期时间是桶起点，早于其中任务的截止时间。
        // A coarse bucket's expiry is the bucket start, earlier than
        // the deadlines inside it.
        pending_id(wheel.schedule_at_tick(7, TaskKind::OneShot, "coarse").unwrap());
        assert_eq!(wheel.next_expiry_tick(), Some(3));
        assert_eq!(wheel.advance_to(3).len(), 1);
        assert_eq!(wheel.next_expiry_tick(), Some(4));
    }
}
