#![deny(clippy::expect_used, clippy::unwrap_used)]

//! 分层时间轮调度器库的根。
//! The root of the hierarchical timing-wheel scheduler library.
//!
//! 该库实现了一个多层时间轮：O(1) 的定时任务注册、取消与到期触发，
//! 由一个独立的驱动任务推进时间并把到期任务移交给外部执行边界。
//!
//! This library implements a multi-level timing wheel: O(1) registration,
//! cancellation and expiration of timed tasks, driven by a dedicated driver
//! task that advances time and hands expired tasks to an external execution
//! boundary.

pub mod config;
pub mod driver;
pub mod error;
pub mod executor;
pub mod task;
pub mod wheel;

pub use config::{DriverConfig, WheelConfig};
pub use driver::{SchedulerHandle, SchedulerStats, TaskToken, start_scheduler};
pub use error::{Error, Result};
pub use executor::{NoOpExecutor, RejectingExecutor, SenderExecutor, TaskExecutor};
pub use task::{FiredTask, TaskId, TaskKind, TaskPayload, Tick};
pub use wheel::{HierarchicalWheel, HierarchyStats, ScheduleOutcome};
