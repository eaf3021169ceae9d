//! 调度器句柄与启动接口
//! Scheduler handle and startup interface
//!
//! 提供显式的启动/关闭生命周期：每次 [`start_scheduler`] 都会生成一个
//! 独立的驱动任务并返回其句柄，不存在全局单例。
//!
//! Provides an explicit start/stop lifecycle: each [`start_scheduler`] call
//! spawns an independent driver task and returns its handle; there is no
//! global singleton.

use crate::config::{DriverConfig, WheelConfig};
use crate::error::{Error, Result};
use crate::executor::TaskExecutor;
use crate::task::types::{TaskId, TaskPayload};
use std::time::Duration;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::Instant,
};

use super::commands::{DriverCommand, ScheduleWhen, SchedulerStats};
use super::core::SchedulerDriver;

/// 调度器客户端句柄，可克隆，跨任务共享。
/// Cloneable scheduler client handle, shared across tasks.
#[derive(Debug)]
pub struct SchedulerHandle<P: TaskPayload> {
    command_tx: mpsc::Sender<DriverCommand<P>>,
}

impl<P: TaskPayload> Clone for SchedulerHandle<P> {
    fn clone(&self) -> Self {
        Self {
            command_tx: self.command_tx.clone(),
        }
    }
}

impl<P: TaskPayload> SchedulerHandle<P> {
    /// 调度一次性任务，延迟相对当前时间。
    /// Schedule a one-shot task at a delay relative to now.
    pub async fn schedule(&self, delay: Duration, payload: P) -> Result<TaskToken<P>> {
        self.send_schedule(ScheduleWhen::After(delay), None, payload)
            .await
    }

    /// 调度一次性任务，截止时间为绝对时刻。
    /// Schedule a one-shot task at an absolute deadline.
    pub async fn schedule_at(&self, deadline: Instant, payload: P) -> Result<TaskToken<P>> {
        self.send_schedule(ScheduleWhen::At(deadline), None, payload)
            .await
    }

    /// Schedule a periodic task: first firing after `delay`, then every
    /// `interval`. The token stays valid across firings until cancelled.
    ///
    /// 调度周期任务：`delay` 后首次触发，此后每 `interval` 一次。
    /// 令牌在历次触发之间保持有效，直到被取消。
    pub async fn schedule_periodic(
        &self,
        delay: Duration,
        interval: Duration,
        payload: P,
    ) -> Result<TaskToken<P>> {
        self.send_schedule(ScheduleWhen::After(delay), Some(interval), payload)
            .await
    }

    async fn send_schedule(
        &self,
        when: ScheduleWhen,
        repeat: Option<Duration>,
        payload: P,
    ) -> Result<TaskToken<P>> {
        let (response_tx, response_rx) = oneshot::channel();
        self.command_tx
            .send(DriverCommand::Schedule {
                when,
                repeat,
                payload,
                response_tx,
            })
            .await
            .map_err(|_| Error::DriverShutdown)?;
        let id = response_rx.await.map_err(|_| Error::ChannelClosed)??;
        Ok(TaskToken {
            id,
            command_tx: self.command_tx.clone(),
        })
    }

    /// 取消任务。对已触发或已取消的任务返回 `Ok(false)`。
    /// Cancel a task. Returns `Ok(false)` for already fired or cancelled
    /// tasks.
    pub async fn cancel(&self, id: TaskId) -> Result<bool> {
        let (response_tx, response_rx) = oneshot::channel();
        self.command_tx
            .send(DriverCommand::Cancel { id, response_tx })
            .await
            .map_err(|_| Error::DriverShutdown)?;
        response_rx.await.map_err(|_| Error::ChannelClosed)
    }

    /// 查询任务当前驻留的层级（观测用）。
    /// Query the level a task currently resides in (instrumentation).
    pub async fn level_of(&self, id: TaskId) -> Result<Option<usize>> {
        let (response_tx, response_rx) = oneshot::channel();
        self.command_tx
            .send(DriverCommand::LevelOf { id, response_tx })
            .await
            .map_err(|_| Error::DriverShutdown)?;
        response_rx.await.map_err(|_| Error::ChannelClosed)
    }

    /// 获取调度器统计信息。
    /// Get scheduler statistics.
    pub async fn stats(&self) -> Result<SchedulerStats> {
        let (response_tx, response_rx) = oneshot::channel();
        self.command_tx
            .send(DriverCommand::GetStats { response_tx })
            .await
            .map_err(|_| Error::DriverShutdown)?;
        response_rx.await.map_err(|_| Error::ChannelClosed)
    }

    /// 关闭驱动任务。已驻留而未触发的任务被丢弃。
    /// Shut the driver task down. Resident unfired tasks are dropped.
    pub async fn shutdown(&self) -> Result<()> {
        self.command_tx
            .send(DriverCommand::Shutdown)
            .await
            .map_err(|_| Error::DriverShutdown)
    }
}

/// 任务令牌，用于定向取消单个任务。
/// Task token for targeted cancellation of one task.
#[derive(Debug)]
pub struct TaskToken<P: TaskPayload> {
    /// 任务句柄
    /// Task handle
    id: TaskId,
    /// 向驱动任务发送取消请求的通道
    /// Channel for sending cancel requests to the driver task
    command_tx: mpsc::Sender<DriverCommand<P>>,
}

impl<P: TaskPayload> TaskToken<P> {
    /// 任务句柄。
    /// The task handle.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// 取消该任务。
    /// Cancel this task.
    pub async fn cancel(&self) -> Result<bool> {
        let (response_tx, response_rx) = oneshot::channel();
        self.command_tx
            .send(DriverCommand::Cancel {
                id: self.id,
                response_tx,
            })
            .await
            .map_err(|_| Error::DriverShutdown)?;
        response_rx.await.map_err(|_| Error::ChannelClosed)
    }
}

/// Start a scheduler: build the driver, spawn its task and return the client
/// handle together with the join handle of the spawned task.
///
/// 启动一个调度器：构建驱动器，生成其任务，
/// 返回客户端句柄和所生成任务的 join 句柄。
pub fn start_scheduler<P, X>(
    wheel_config: WheelConfig,
    driver_config: DriverConfig,
    executor: X,
) -> Result<(SchedulerHandle<P>, JoinHandle<()>)>
where
    P: TaskPayload,
    X: TaskExecutor<P>,
{
    let (driver, command_tx) = SchedulerDriver::new(&wheel_config, &driver_config, executor)?;
    let join_handle = tokio::spawn(driver.run());
    Ok((SchedulerHandle { command_tx }, join_handle))
}
