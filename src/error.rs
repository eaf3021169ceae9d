//! 定义了库中所有可能的错误类型。
//! Defines all possible error types in the library.

use std::time::Duration;
use thiserror::Error;

/// The primary error type for the timing-wheel scheduler library.
/// 时间轮调度器库的主要错误类型。
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The requested delay exceeds the maximum span representable by the
    /// configured wheel hierarchy. Reported synchronously to the scheduling
    /// caller; the task is not enqueued.
    ///
    /// 请求的延迟超出了当前层级配置所能表示的最大跨度。
    /// 同步报告给调度调用方，任务不会入队。
    #[error("requested delay {requested:?} exceeds the maximum representable span {max_span:?}")]
    DelayExceedsSpan {
        /// The delay the caller asked for.
        /// 调用方请求的延迟。
        requested: Duration,
        /// The hierarchy's maximum representable span.
        /// 层级结构可表示的最大跨度。
        max_span: Duration,
    },

    /// The wheel or driver configuration is invalid.
    /// 时间轮或驱动器配置无效。
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The scheduler driver task has been shut down.
    /// 调度驱动任务已经关闭。
    #[error("scheduler driver has been shut down")]
    DriverShutdown,

    /// An internal channel for communication with the driver was closed
    /// unexpectedly.
    ///
    /// 与驱动器通信的内部通道意外关闭。
    #[error("internal channel is broken")]
    ChannelClosed,
}

/// A specialized `Result` type for this library.
/// 本库专用的 `Result` 类型。
pub type Result<T> = std::result::Result<T, Error>;
