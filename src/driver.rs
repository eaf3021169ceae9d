//! 调度器驱动模块
//! Scheduler driver module
//!
//! 驱动器是系统中唯一推进时间的组件：一个 tokio actor 独占时间轮，
//! 通过命令通道接收调度与取消请求，在最早到期点醒来推进游标，
//! 并把触发的任务经执行边界移交出去。
//!
//! The driver is the only component that advances time: a tokio actor owns
//! the wheel exclusively, receives schedule and cancel requests over a
//! command channel, wakes at the earliest expiry to move the cursor, and
//! hands fired tasks off across the execution boundary.

pub mod commands;
pub mod core;
pub mod handle;

pub use commands::{DriverCommand, ScheduleWhen, SchedulerStats};
pub use core::SchedulerDriver;
pub use handle::{SchedulerHandle, TaskToken, start_scheduler};
