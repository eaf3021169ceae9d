//! 执行边界定义
//! Execution boundary definitions
//!
//! 调度器只负责判定“何时”，不负责运行任务本体。到期任务经由
//! [`TaskExecutor`] 移交给外部执行方；移交必须是非阻塞的，
//! 拒绝接收属于软失败，由驱动器计数并记录。
//!
//! The scheduler decides only "when", never runs the task body itself.
//! Expired tasks are handed off to an external executor through
//! [`TaskExecutor`]; handoff must be non-blocking, and a rejected handoff
//! is a soft failure the driver counts and logs.

use crate::task::types::{FiredTask, TaskPayload};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Execution boundary trait, fully generic over the payload.
///
/// `submit` must not block the caller: a saturated or unavailable executor
/// returns `false` instead of applying back-pressure to the timing loop.
///
/// 执行边界 trait，对载荷完全泛型。
///
/// `submit` 不得阻塞调用方：执行方饱和或不可用时返回 `false`，
/// 而不是对计时循环施加背压。
#[async_trait]
pub trait TaskExecutor<P: TaskPayload>: Send + Sync + Clone + std::fmt::Debug + 'static {
    /// 移交一个到期任务。
    /// Hand off one expired task.
    ///
    /// # Returns
    /// `true` 表示执行方已接收；`false` 表示拒绝（任务进入已触发但移交
    /// 失败的终态，绝不会被重新排队）。
    /// `true` when accepted; `false` when rejected (the task reaches the
    /// fired-but-handoff-failed terminal state and is never re-queued).
    async fn submit(&self, task: FiredTask<P>) -> bool;
}

/// 基于 mpsc::Sender 的执行方实现
/// mpsc::Sender-based executor implementation
pub struct SenderExecutor<P> {
    sender: mpsc::Sender<FiredTask<P>>,
}

impl<P> std::fmt::Debug for SenderExecutor<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SenderExecutor")
            .field("sender", &self.sender)
            .finish()
    }
}

impl<P> Clone for SenderExecutor<P> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<P> SenderExecutor<P> {
    /// 创建新的发送者执行方
    /// Create new sender executor
    pub fn new(sender: mpsc::Sender<FiredTask<P>>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl<P: TaskPayload> TaskExecutor<P> for SenderExecutor<P> {
    async fn submit(&self, task: FiredTask<P>) -> bool {
        // 使用 try_send 避免阻塞，发送失败时记录警告
        // Use try_send to avoid blocking, log a warning on failure
        if let Err(e) = self.sender.try_send(task) {
            tracing::warn!("Failed to hand off fired task: {:?}", e);
            return false;
        }
        true
    }
}

/// 空执行方实现（用于测试或只关心计时的场景）
/// No-op executor implementation (for tests or timing-only scenarios)
#[derive(Debug, Clone, Default)]
pub struct NoOpExecutor;

impl NoOpExecutor {
    /// 创建新的空执行方
    /// Create new no-op executor
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl<P: TaskPayload> TaskExecutor<P> for NoOpExecutor {
    async fn submit(&self, _task: FiredTask<P>) -> bool {
        // 什么都不做
        // Do nothing
        true
    }
}

/// 总是拒绝的执行方，用于验证移交失败路径。
/// Always-rejecting executor for exercising the handoff-failure path.
#[derive(Debug, Clone, Default)]
pub struct RejectingExecutor;

impl RejectingExecutor {
    /// 创建新的拒绝执行方
    /// Create new rejecting executor
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl<P: TaskPayload> TaskExecutor<P> for RejectingExecutor {
    async fn submit(&self, _task: FiredTask<P>) -> bool {
        false
    }
}
