//! 投递任务执行器。
//!
//! # 教案式说明
//! - **意图 (Why)**：每个触发周期都会派生一个投递任务，它在虚拟时钟就绪与释放信号之间竞速。
//!   任务跑在哪里由调用方决定：默认交给独立线程，确定性测试则交给手动驱动的队列。
//! - **契约 (What)**：[`DeliveryExecutor::spawn`] 只负责“让任务最终被轮询”，不得在调用栈内同步阻塞等待任务结束；
//!   失败时返回 [`TimeError::Spawn`]，由定时器负责回滚本周期。
//! - **实现 (How)**：
//!   - [`ThreadDeliveryExecutor`]：每个任务一个命名线程，用 `futures::executor::block_on` 驱动；
//!   - [`ManualDeliveryExecutor`]：任务进入就绪队列，测试调用 [`ManualDeliveryExecutor::run_until_stalled`] 推进。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::thread;

use futures::future::BoxFuture;
use futures::task::{ArcWake, waker_ref};
use parking_lot::Mutex;
use tracing::trace;

use crate::config::DeliveryConfig;
use crate::error::{Result, TimeError};

/// 单个触发周期的投递任务。
pub type DeliveryFuture = BoxFuture<'static, ()>;

/// 投递任务的调度契约。
///
/// # 契约说明（What）
/// - `spawn` 可以在任意线程被调用，但定时器保证调用时不持有自身门闩；
/// - 实现可以选择立即轮询（内联执行）、入队或交给线程，均不影响协议正确性。
pub trait DeliveryExecutor: Send + Sync + 'static {
    /// 提交一个投递任务。
    fn spawn(&self, task: DeliveryFuture) -> Result<()>;
}

/// 基于系统线程的默认执行器。
///
/// # 设计取舍（Trade-offs）
/// - 每个触发周期占用一个线程，被抢占的任务会在收到释放信号后立即退出；
/// - 对测试场景而言线程数量与活跃定时器数量同阶，足够简单可靠；高频重置场景应改用
///   [`ManualDeliveryExecutor`] 或自定义执行器。
#[derive(Debug)]
pub struct ThreadDeliveryExecutor {
    name_prefix: String,
    stack_size: Option<usize>,
    next_seq: AtomicU64,
    spawned: AtomicU64,
}

impl ThreadDeliveryExecutor {
    /// 使用默认配置构造。
    pub fn new() -> Self {
        let defaults = DeliveryConfig::default();
        Self {
            name_prefix: defaults.thread_name_prefix,
            stack_size: defaults.stack_size,
            next_seq: AtomicU64::new(0),
            spawned: AtomicU64::new(0),
        }
    }

    /// 按配置构造；配置会先经过校验。
    pub fn from_config(config: &DeliveryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            name_prefix: config.thread_name_prefix.clone(),
            stack_size: config.stack_size,
            next_seq: AtomicU64::new(0),
            spawned: AtomicU64::new(0),
        })
    }

    /// 迄今成功启动的投递线程数量。
    pub fn spawned(&self) -> u64 {
        self.spawned.load(Ordering::Relaxed)
    }
}

impl Default for ThreadDeliveryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl DeliveryExecutor for ThreadDeliveryExecutor {
    fn spawn(&self, task: DeliveryFuture) -> Result<()> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let mut builder = thread::Builder::new().name(format!("{}-{seq}", self.name_prefix));
        if let Some(stack_size) = self.stack_size {
            builder = builder.stack_size(stack_size);
        }
        builder
            .spawn(move || futures::executor::block_on(task))
            .map_err(TimeError::Spawn)?;
        self.spawned.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// 手动驱动的确定性执行器。
///
/// # 教案式说明
/// - **意图 (Why)**：让测试精确控制投递任务何时被轮询，从而稳定复现“虚拟时钟已就绪、但投递任务尚未运行”
///   这类竞态窗口，例如同一虚拟时刻的触发与重置。
/// - **逻辑 (How)**：任务以 `ArcWake` 包装，被唤醒时重新进入就绪队列；`run_until_stalled` 反复弹出并轮询，
///   直到队列为空。
/// - **契约 (What)**：`spawn` 从不失败也从不轮询；任务只在 `run_until_stalled` 的调用栈中运行。
#[derive(Clone, Debug, Default)]
pub struct ManualDeliveryExecutor {
    queue: Arc<ReadyQueue>,
}

#[derive(Debug, Default)]
struct ReadyQueue {
    ready: Mutex<VecDeque<Arc<ManualTask>>>,
    live: AtomicUsize,
}

struct ManualTask {
    future: Mutex<Option<DeliveryFuture>>,
    queue: Weak<ReadyQueue>,
    scheduled: AtomicBool,
}

impl std::fmt::Debug for ManualTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualTask")
            .field("scheduled", &self.scheduled.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl ArcWake for ManualTask {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        if arc_self.scheduled.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(queue) = arc_self.queue.upgrade() {
            queue.ready.lock().push_back(Arc::clone(arc_self));
        }
    }
}

impl ManualDeliveryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 轮询所有就绪任务直到没有任务可以推进，返回本次运行结束的任务数。
    pub fn run_until_stalled(&self) -> usize {
        let mut completed = 0;
        loop {
            let Some(task) = self.queue.ready.lock().pop_front() else {
                break;
            };
            task.scheduled.store(false, Ordering::Release);

            let mut slot = task.future.lock();
            let Some(mut future) = slot.take() else {
                continue;
            };
            let waker = waker_ref(&task);
            let mut cx = Context::from_waker(&waker);
            match future.as_mut().poll(&mut cx) {
                Poll::Pending => *slot = Some(future),
                Poll::Ready(()) => {
                    completed += 1;
                    self.queue.live.fetch_sub(1, Ordering::AcqRel);
                }
            }
        }
        if completed > 0 {
            trace!(completed, "manual executor stalled");
        }
        completed
    }

    /// 已提交但尚未结束的任务数量。
    pub fn live_tasks(&self) -> usize {
        self.queue.live.load(Ordering::Acquire)
    }
}

impl DeliveryExecutor for ManualDeliveryExecutor {
    fn spawn(&self, task: DeliveryFuture) -> Result<()> {
        let task = Arc::new(ManualTask {
            future: Mutex::new(Some(task)),
            queue: Arc::downgrade(&self.queue),
            scheduled: AtomicBool::new(true),
        });
        self.queue.live.fetch_add(1, Ordering::AcqRel);
        self.queue.ready.lock().push_back(task);
        Ok(())
    }
}
