// 教案级说明：本文件实现 `MockTimer` 的同步协议，是整个 crate 唯一真正困难的部分。
//
// - **门闩 (gate)**：`parking_lot::Mutex<TimerState>`，串行化 `reset`、`stop` 与投递任务的失活步骤；
// - **释放信号 (release)**：每个触发周期持有一个 `oneshot::Sender`，新的 `reset`/`stop` 通过它叫醒旧任务，
//   令其放弃等待并注销在虚拟时钟上的登记；
// - **周期号 (cycle)**：每次开启或取消周期都会推进计数；投递任务在门闩内比对周期号，
//   不一致即说明释放已经发生，本次触发作废。释放信号只负责“尽快唤醒”，正确性由周期号保证。
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::channel::oneshot;
use futures::future::{self, Either};
use parking_lot::Mutex;
use tracing::{debug, error, trace};

use super::channel::FiringChannel;
use super::executor::{DeliveryExecutor, ThreadDeliveryExecutor};
use super::Timer;
use crate::time::{Sleep, VirtualClock};

/// 虚拟时间驱动的单槽可重置定时器。
///
/// # 设计背景（Why）
/// - 生产代码依赖 [`Timer`] 能力而非系统时钟；测试注入 `MockTimer`，时间只在测试显式推进时流动；
/// - 定时器可能在任意线程上被并发地重置、停止，同时虚拟时钟在另一线程推进，协议必须保证
///   每个触发周期至多一次有效触发，且取消之后绝不投递。
///
/// # 逻辑解析（How）
/// - `reset`：持门闩读取并置位 `active`，以“当前虚拟时间 + duration”计算目标，释放旧周期，
///   登记新的虚拟等待，随后在门闩外提交投递任务；
/// - `stop`：持门闩清除 `active` 并释放当前周期；
/// - 投递任务在“虚拟等待就绪”与“释放信号”之间竞速；若等待先就绪，需再次持门闩确认周期仍为当前周期，
///   先失活再投递，任何已发生的释放都会让本次触发作废（新周期优先）。
///
/// # 契约说明（What）
/// - 构造后处于未激活状态；
/// - `reset`/`stop` 返回调用前是否处于激活状态；
/// - 触发事件通过 [`MockTimer::channel`] 的单槽通道投递，投递永不阻塞；
/// - Drop 时会释放仍在等待的投递任务，之后不再有任何投递。
///
/// # 风险提示（Trade-offs）
/// - 投递任务的提交失败（例如线程资源耗尽）会回滚本周期并记录错误日志，`reset` 的返回值仍然准确，
///   但本周期不会触发。
pub struct MockTimer {
    shared: Arc<TimerShared>,
}

struct TimerShared {
    gate: Mutex<TimerState>,
    channel: FiringChannel,
    clock: Arc<dyn VirtualClock>,
    executor: Arc<dyn DeliveryExecutor>,
}

#[derive(Default)]
struct TimerState {
    active: bool,
    target: Option<Instant>,
    cycle: u64,
    release: Option<oneshot::Sender<()>>,
}

impl TimerState {
    /// 结束当前周期：推进周期号并叫醒仍在等待的投递任务。
    fn release_current(&mut self) {
        self.cycle = self.cycle.wrapping_add(1);
        if let Some(release) = self.release.take() {
            // 任务可能已经退出，接收端被丢弃时发送失败无需处理。
            let _ = release.send(());
        }
    }
}

impl MockTimer {
    /// 创建绑定 `clock` 的定时器，投递任务运行在独立线程上。
    pub fn new(clock: Arc<dyn VirtualClock>) -> Self {
        Self::with_executor(clock, Arc::new(ThreadDeliveryExecutor::default()))
    }

    /// 创建绑定 `clock` 并使用指定执行器的定时器。
    pub fn with_executor(clock: Arc<dyn VirtualClock>, executor: Arc<dyn DeliveryExecutor>) -> Self {
        Self {
            shared: Arc::new(TimerShared {
                gate: Mutex::new(TimerState::default()),
                channel: FiringChannel::new(),
                clock,
                executor,
            }),
        }
    }

    /// 返回触发通道句柄。
    pub fn channel(&self) -> FiringChannel {
        self.shared.channel.clone()
    }

    /// 重新装填定时器，返回调用前是否处于激活状态。
    pub fn reset(&self, duration: Duration) -> bool {
        let (was_active, cycle, wait, release) = {
            let mut state = self.shared.gate.lock();
            let was_active = state.active;
            let now = self.shared.clock.now();
            if was_active {
                state.release_current();
            } else {
                state.cycle = state.cycle.wrapping_add(1);
            }
            state.active = true;
            state.target = now.checked_add(duration);

            let (release_tx, release_rx) = oneshot::channel();
            state.release = Some(release_tx);
            let wait = self.shared.clock.after(now, duration);
            debug!(cycle = state.cycle, ?duration, was_active, "timer armed");
            (was_active, state.cycle, wait, release_rx)
        };

        let task = deliver(Arc::clone(&self.shared), cycle, wait, release);
        if let Err(err) = self.shared.executor.spawn(Box::pin(task)) {
            error!(cycle, error = %err, "failed to start delivery task, cycle rolled back");
            let mut state = self.shared.gate.lock();
            if state.cycle == cycle {
                state.active = false;
                state.target = None;
                state.release = None;
            }
        }
        was_active
    }

    /// 停止定时器，返回调用前是否处于激活状态。
    pub fn stop(&self) -> bool {
        let mut state = self.shared.gate.lock();
        let was_active = state.active;
        if was_active {
            state.release_current();
            state.active = false;
            state.target = None;
            debug!(cycle = state.cycle, "timer stopped");
        }
        was_active
    }

    /// 当前是否处于激活状态。
    pub fn is_active(&self) -> bool {
        self.shared.gate.lock().active
    }

    /// 当前周期的目标虚拟时间。
    ///
    /// 未激活时为 `None`。激活但 `now + duration` 无法用 [`Instant`] 表示时同样为 `None`：
    /// 这样的周期保持激活，虚拟时钟也永远走不到它的目标，只能被 `reset`/`stop` 结束。
    pub fn deadline(&self) -> Option<Instant> {
        let state = self.shared.gate.lock();
        if state.active { state.target } else { None }
    }
}

impl Timer for MockTimer {
    fn channel(&self) -> FiringChannel {
        MockTimer::channel(self)
    }

    fn reset(&self, duration: Duration) -> bool {
        MockTimer::reset(self, duration)
    }

    fn stop(&self) -> bool {
        MockTimer::stop(self)
    }
}

impl Drop for MockTimer {
    fn drop(&mut self) {
        let mut state = self.shared.gate.lock();
        if state.active {
            state.release_current();
            state.active = false;
            state.target = None;
            trace!(cycle = state.cycle, "timer dropped while armed");
        }
    }
}

impl std::fmt::Debug for MockTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.gate.lock();
        f.debug_struct("MockTimer")
            .field("active", &state.active)
            .field("target", &state.target)
            .field("cycle", &state.cycle)
            .finish_non_exhaustive()
    }
}

/// 单个触发周期的投递任务。
async fn deliver(
    shared: Arc<TimerShared>,
    cycle: u64,
    wait: Sleep,
    release: oneshot::Receiver<()>,
) {
    match future::select(wait, release).await {
        Either::Left(((), _release)) => shared.fire(cycle),
        // 收到释放或发送端被丢弃，二者都意味着本周期已结束。
        Either::Right((_, _wait)) => trace!(cycle, "delivery task preempted"),
    }
}

impl TimerShared {
    /// 失活并投递；若周期已被替换或取消则静默放弃。
    fn fire(&self, cycle: u64) {
        let mut state = self.gate.lock();
        if state.cycle != cycle || !state.active {
            trace!(cycle, current = state.cycle, "stale firing discarded");
            return;
        }
        state.active = false;
        state.target = None;
        state.release = None;

        let at = self.clock.now();
        let delivered = self.channel.offer(at);
        debug!(cycle, delivered, "timer fired");
    }
}
