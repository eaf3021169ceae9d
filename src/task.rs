//! 任务句柄与任务记录竞技场模块。
//! Task handle and task-record arena module.
//!
//! 定时任务以稳定整数句柄（[`TaskId`]）标识，记录存放在一个带空闲链表的
//! 竞技场中；桶成员关系通过记录内的侵入式双向链接表达，
//! 从而在不使用指针的情况下保持 O(1) 的插入与摘除。
//!
//! Timed tasks are identified by stable integer handles ([`TaskId`]); records
//! live in an arena with a free list, and bucket membership is expressed as
//! intrusive doubly-linked links stored inside the records, preserving O(1)
//! splice/remove without language-level pointers.

pub mod arena;
pub mod types;

pub use arena::TaskArena;
pub use types::{FiredTask, TaskId, TaskKind, TaskPayload, Tick};
