//! 调度器驱动核心实现
//! Scheduler driver core implementation
//!
//! 驱动器是一个独占拥有时间轮的 actor：它是 `advance_to` 的唯一调用方，
//! 持有权威时钟，在命令通道与下一次到期之间 select，
//! 并把触发的任务批量移交给执行方。
//!
//! The driver is an actor with exclusive ownership of the wheel: it is the
//! sole caller of `advance_to`, holds the authoritative clock, selects
//! between the command channel and the next expiry, and hands fired tasks
//! off to the executor in batches.

use crate::config::{DriverConfig, WheelConfig};
use crate::error::Result;
use crate::executor::TaskExecutor;
use crate::task::types::{TaskId, TaskKind, TaskPayload, Tick};
use crate::wheel::{HierarchicalWheel, ScheduleOutcome};
use std::time::Duration;
use tokio::{
    sync::mpsc,
    time::{Instant, sleep_until},
};
use tracing::{debug, info, trace, warn};

use super::commands::{DriverCommand, ScheduleWhen, SchedulerStats};

/// 唤醒时间的下限间隔，避免忙等待。
/// Minimum wakeup interval, avoiding busy-waiting.
const MIN_SLEEP: Duration = Duration::from_millis(1);

/// 调度器驱动
/// Scheduler driver
pub struct SchedulerDriver<P: TaskPayload, X: TaskExecutor<P>> {
    /// 分层时间轮
    /// Hierarchical timing wheel
    wheel: HierarchicalWheel<P>,
    /// 时间轮纪元，tick 0 对应的时刻
    /// Wheel epoch, the instant of tick 0
    epoch: Instant,
    /// 命令接收通道
    /// Command receiver channel
    command_rx: mpsc::Receiver<DriverCommand<P>>,
    /// 任务执行方
    /// Task executor
    executor: X,
    /// 无任务时的空转唤醒间隔
    /// Idle wakeup interval when no task is resident
    idle_wakeup: Duration,
    /// tick 时长的纳秒缓存
    /// Cached tick duration in nanoseconds
    tick_nanos: u64,
    /// 统计：已接受的调度请求数
    /// Stats: accepted schedule requests
    scheduled: u64,
    /// 统计：已触发的任务数
    /// Stats: fired tasks
    fired: u64,
    /// 统计：已取消的任务数
    /// Stats: cancelled tasks
    cancelled: u64,
    /// 统计：移交被拒绝的次数
    /// Stats: rejected handoffs
    handoff_failures: u64,
}

impl<P: TaskPayload, X: TaskExecutor<P>> SchedulerDriver<P, X> {
    /// 创建新的调度器驱动
    /// Create new scheduler driver
    pub fn new(
        wheel_config: &WheelConfig,
        driver_config: &DriverConfig,
        executor: X,
    ) -> Result<(Self, mpsc::Sender<DriverCommand<P>>)> {
        let wheel = HierarchicalWheel::new(wheel_config)?;
        let (command_tx, command_rx) = mpsc::channel(driver_config.command_channel_capacity);
        let tick_nanos = wheel.tick_duration().as_nanos() as u64;
        let driver = Self {
            wheel,
            epoch: Instant::now(),
            command_rx,
            executor,
            idle_wakeup: driver_config.idle_wakeup,
            tick_nanos,
            scheduled: 0,
            fired: 0,
            cancelled: 0,
            handoff_failures: 0,
        };
        Ok((driver, command_tx))
    }

    /// 运行驱动主循环
    /// Run the driver main loop
    pub async fn run(mut self) {
        info!("Scheduler driver started");

        loop {
            let next_wakeup = self.next_wakeup();

            tokio::select! {
                // 处理命令
                // Process commands
                Some(command) = self.command_rx.recv() => {
                    if !self.handle_command(command).await {
                        break; // 收到关闭命令
                    }
                }

                // 在下一个到期点推进时间轮
                // Advance the wheel at the next expiry
                _ = sleep_until(next_wakeup) => {
                    self.advance().await;
                }
            }
        }

        info!("Scheduler driver shutdown completed");
    }

    /// 处理驱动命令
    /// Handle a driver command
    ///
    /// # Returns
    /// 返回 false 表示应该关闭驱动
    /// Returns false if the driver should shut down
    async fn handle_command(&mut self, command: DriverCommand<P>) -> bool {
        match command {
            DriverCommand::Schedule {
                when,
                repeat,
                payload,
                response_tx,
            } => {
                let result = self.schedule(when, repeat, payload).await;
                if let Err(err) = response_tx.send(result) {
                    warn!(error = ?err, "Failed to send schedule response");
                }
            }

            DriverCommand::Cancel { id, response_tx } => {
                let cancelled = self.wheel.cancel(id);
                if cancelled {
                    self.cancelled += 1;
                }
                if response_tx.send(cancelled).is_err() {
                    warn!(task = ?id, "Failed to send cancel response");
                }
            }

            DriverCommand::LevelOf { id, response_tx } => {
                if response_tx.send(self.wheel.level_of(id)).is_err() {
                    warn!(task = ?id, "Failed to send level query response");
                }
            }

            DriverCommand::GetStats { response_tx } => {
                let stats = SchedulerStats {
                    scheduled: self.scheduled,
                    fired: self.fired,
                    cancelled: self.cancelled,
                    handoff_failures: self.handoff_failures,
                    active_tasks: self.wheel.task_count(),
                    wheel: self.wheel.stats(),
                };
                if response_tx.send(stats).is_err() {
                    warn!("Failed to send stats response");
                }
            }

            DriverCommand::Shutdown => {
                info!("Received shutdown command");
                return false;
            }
        }

        true
    }

    /// 执行一次调度请求。
    ///
    /// 截止时间不晚于当前时间的任务当场触发并移交；
    /// 返回的句柄此后用于取消时退化为无害空操作。
    ///
    /// Execute one schedule request.
    ///
    /// A task whose deadline is not after now fires and is handed off on
    /// the spot; its handle degrades to a benign no-op for later cancels.
    async fn schedule(
        &mut self,
        when: ScheduleWhen,
        repeat: Option<Duration>,
        payload: P,
    ) -> Result<TaskId> {
        let now_tick = self.now_tick();
        let deadline_tick = match when {
            ScheduleWhen::After(delay) => now_tick.saturating_add(self.wheel.delay_to_ticks(delay)),
            ScheduleWhen::At(instant) => self.instant_to_tick(instant),
        };
        let kind = match repeat {
            Some(interval) => TaskKind::Periodic {
                interval_ticks: self.wheel.delay_to_ticks(interval),
            },
            None => TaskKind::OneShot,
        };

        // 先把游标追到当前时间，调度决策基于新鲜的“现在”。
        // Catch the cursor up first so the decision is based on a fresh
        // "now".
        self.advance().await;

        match self.wheel.schedule_at_tick(deadline_tick, kind, payload)? {
            ScheduleOutcome::Pending(id) => {
                self.scheduled += 1;
                trace!(task = ?id, deadline_tick, "Task scheduled");
                Ok(id)
            }
            ScheduleOutcome::Immediate(task) => {
                self.scheduled += 1;
                self.fired += 1;
                let id = task.id;
                trace!(task = ?id, "Task fired immediately on schedule");
                if !self.executor.submit(task).await {
                    self.handoff_failures += 1;
                    warn!(task = ?id, "Executor rejected immediately fired task");
                }
                Ok(id)
            }
        }
    }

    /// 推进时间轮并批量移交到期任务
    /// Advance the wheel and hand off expired tasks in a batch
    async fn advance(&mut self) {
        let now_tick = self.now_tick();
        let expired = self.wheel.advance_to(now_tick);
        if expired.is_empty() {
            return;
        }

        // 并发移交所有到期任务
        // Hand off all expired tasks concurrently
        let executor = self.executor.clone();
        let handoff_futures: Vec<_> = expired
            .into_iter()
            .map(|task| {
                let executor = executor.clone();
                async move {
                    let id = task.id;
                    let accepted = executor.submit(task).await;
                    (id, accepted)
                }
            })
            .collect();

        let results = futures::future::join_all(handoff_futures).await;

        let processed_count = results.len();
        self.fired += processed_count as u64;

        for (id, accepted) in results {
            if accepted {
                trace!(task = ?id, "Fired task handed off");
            } else {
                // 被拒绝的任务处于已触发但移交失败的终态，绝不重新排队。
                // A rejected task is terminal fired-and-failed, never
                // re-queued.
                self.handoff_failures += 1;
                warn!(task = ?id, "Executor rejected fired task");
            }
        }

        if processed_count > 1 {
            debug!(processed_count, "Batch processed expired tasks");
        }
    }

    /// 当前时刻对应的 tick（向下取整，保证绝不提前触发）。
    /// The tick of the current instant (floored, so firing is never early).
    fn now_tick(&self) -> Tick {
        let elapsed = Instant::now().saturating_duration_since(self.epoch);
        (elapsed.as_nanos() / self.tick_nanos as u128) as Tick
    }

    /// 绝对时刻换算为 tick（向上取整）。
    /// Convert an absolute instant to a tick (rounded up).
    fn instant_to_tick(&self, instant: Instant) -> Tick {
        let offset = instant.saturating_duration_since(self.epoch);
        (offset.as_nanos().div_ceil(self.tick_nanos as u128)) as Tick
    }

    /// tick 换算为绝对时刻。
    /// Convert a tick to an absolute instant.
    fn tick_to_instant(&self, tick: Tick) -> Instant {
        self.epoch + Duration::from_nanos(tick.saturating_mul(self.tick_nanos))
    }

    /// 下一次唤醒时刻：最早的桶到期点，空轮时退化为空转间隔。
    /// Next wakeup: the earliest bucket expiry, degrading to the idle
    /// interval when the wheel is empty.
    fn next_wakeup(&self) -> Instant {
        let now = Instant::now();
        match self.wheel.next_expiry_tick() {
            Some(tick) => {
                let target = self.tick_to_instant(tick);
                // 到期点过近或已过去时强制最小睡眠，避免忙等待。
                // Clamp to a minimum sleep when the expiry is too close
                // or past, avoiding busy-waiting.
                if target <= now + MIN_SLEEP {
                    now + MIN_SLEEP
                } else {
                    target
                }
            }
            None => now + self.idle_wakeup,
        }
    }
}
