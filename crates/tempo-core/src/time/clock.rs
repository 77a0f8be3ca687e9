// 教案级说明：本文件承载虚拟时钟协作者契约与参考实现。
//
// - **意图 (Why)**：定时器核心只需要“读取当前虚拟时间”与“登记一个未来时间点的等待”两项能力，
//   因此将其抽象为 [`VirtualClock`]，生产代码与测试可以注入不同实现；
// - **契约 (What)**：[`VirtualClock::after`] 在返回时即完成登记，等待 Future 在虚拟时间到达
//   `from + delay` 后就绪；被提前 Drop 的等待会自动注销；
// - **实现提示 (How)**：[`MockClock`] 以“原点 + 累计偏移”表示当前时间，`advance`/`set` 推进偏移并
//   在释放内部锁之后统一唤醒到期的等待者。
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::trace;

use crate::error::{Result, TimeError};
use crate::timer::{DeliveryExecutor, MockTimer};

/// `Sleep` 为虚拟时钟返回的统一等待 Future 类型。
///
/// # 契约说明（What）
/// - Future 完成时表示虚拟时间已到达登记的截止点；
/// - 必须满足 `Send + 'static`，以便投递任务在任意执行器上运行；
/// - 调用方应遵守标准 Future 契约：返回 `Poll::Pending` 后，截止点到达时由时钟唤醒登记的 waker。
pub type Sleep = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// 定时器核心依赖的虚拟时钟能力。
///
/// # 设计背景（Why）
/// - 定时器不关心时间如何存储、如何推进，只需要读取“现在”和登记“将来”；
/// - 通过 trait 注入，`MockTimer` 可以与任何满足契约的虚拟时钟协作。
///
/// # 接口约束（What）
/// - `now`：返回当前虚拟时间，必须单调不减；
/// - `after`：以 `from` 为锚点登记 `from + delay` 的等待，返回的 Future 在虚拟时间到达后就绪；
/// - 实现者必须允许多个定时器并发登记等待。
///
/// # 使用指引（How）
/// - 推荐通过 `Arc<dyn VirtualClock>` 传递；
/// - 测试中使用 [`MockClock`] 并调用 [`MockClock::advance`] 推进时间。
pub trait VirtualClock: Send + Sync + 'static {
    /// 返回当前虚拟时间。
    fn now(&self) -> Instant;

    /// 登记一个在 `from + delay` 就绪的等待。
    fn after(&self, from: Instant, delay: Duration) -> Sleep;
}

/// 虚拟时钟：通过手动推进时间以在测试中复现确定性的唤醒序列。
///
/// # 行为概览（How）
/// - 内部维护 `elapsed`（自原点起的偏移量）与待触发的等待列表；
/// - `advance`/`set` 增加偏移量并唤醒到期的等待 Future；
/// - `after` 立即登记截止点，不依赖首次轮询。
///
/// # 契约说明（What）
/// - 偏移量单调增加，`set` 试图倒退时返回 [`TimeError::ClockRegression`]；
/// - 唤醒顺序按照登记顺序稳定排序，确保测试序列可复现；
/// - 若等待 Future 被提前 Drop，将从列表中移除。
#[derive(Clone, Debug)]
pub struct MockClock {
    inner: Arc<MockClockInner>,
}

impl MockClock {
    /// 创建原点为当前系统时间的虚拟时钟。
    pub fn new() -> Self {
        Self::with_start(Instant::now())
    }

    /// 以指定原点构造虚拟时钟，便于在测试中固定初始时间。
    pub fn with_start(origin: Instant) -> Self {
        let state = ClockState {
            origin,
            horizon: representable_horizon(origin),
            elapsed: Duration::ZERO,
            sleepers: Vec::new(),
            next_id: 0,
        };
        Self {
            inner: Arc::new(MockClockInner {
                state: Mutex::new(state),
            }),
        }
    }

    /// 手动推进虚拟时钟。
    ///
    /// # 契约说明（What）
    /// - `delta` 为零时直接返回；
    /// - 偏移量封顶于原点之后可表示的最远时刻，超出部分被截断，`now` 永不溢出；
    /// - 函数返回前，所有到期的等待都已被标记完成并唤醒；
    /// - 唤醒在释放内部锁之后执行，被唤醒的任务可以立即重新访问时钟。
    pub fn advance(&self, delta: Duration) {
        if delta.is_zero() {
            return;
        }
        let mut guard = self.inner.state.lock();
        let target = guard.elapsed.saturating_add(delta);
        let to_wake = guard.advance_to(target);
        drop(guard);

        trace!(?delta, offset = ?target, woken = to_wake.len(), "virtual clock advanced");
        for waker in to_wake {
            waker.wake();
        }
    }

    /// 将虚拟时钟跳转到绝对时间点。
    ///
    /// # 契约说明（What）
    /// - `to` 早于当前虚拟时间时返回 [`TimeError::ClockRegression`]，状态保持不变；
    /// - `to` 等于当前时间时不做任何事；
    /// - 其余情况等价于 `advance(to - now)`。
    pub fn set(&self, to: Instant) -> Result<()> {
        let mut guard = self.inner.state.lock();
        let requested = to.saturating_duration_since(guard.origin);
        if to < guard.origin || requested < guard.elapsed {
            return Err(TimeError::ClockRegression {
                current: guard.elapsed,
                requested,
            });
        }
        if requested == guard.elapsed {
            return Ok(());
        }
        // `to` 本身可表示，截断上限至少要覆盖它。
        guard.horizon = guard.horizon.max(requested);
        let to_wake = guard.advance_to(requested);
        drop(guard);

        trace!(offset = ?requested, woken = to_wake.len(), "virtual clock set");
        for waker in to_wake {
            waker.wake();
        }
        Ok(())
    }

    /// 返回自原点以来的虚拟时间偏移。
    pub fn elapsed(&self) -> Duration {
        self.inner.state.lock().elapsed
    }

    /// 返回时钟原点。
    pub fn origin(&self) -> Instant {
        self.inner.state.lock().origin
    }

    /// 已登记、尚未到期且未被注销的等待数量。
    pub fn pending_waits(&self) -> usize {
        self.inner.state.lock().sleepers.len()
    }

    /// 创建绑定本时钟的 [`MockTimer`]，投递任务运行在独立线程上。
    pub fn new_timer(&self) -> MockTimer {
        MockTimer::new(Arc::new(self.clone()))
    }

    /// 创建绑定本时钟并使用指定执行器的 [`MockTimer`]。
    pub fn new_timer_with(&self, executor: Arc<dyn DeliveryExecutor>) -> MockTimer {
        MockTimer::with_executor(Arc::new(self.clone()), executor)
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualClock for MockClock {
    fn now(&self) -> Instant {
        self.inner.state.lock().now()
    }

    fn after(&self, from: Instant, delay: Duration) -> Sleep {
        let state = {
            let mut guard = self.inner.state.lock();
            let deadline = from
                .saturating_duration_since(guard.origin)
                .saturating_add(delay);
            let id = guard.next_id;
            guard.next_id += 1;
            let state = Arc::new(SleepState::new(id, deadline));
            if guard.elapsed >= deadline {
                state.completed.store(true, Ordering::SeqCst);
            } else {
                guard.sleepers.push(Arc::clone(&state));
            }
            state
        };

        Box::pin(MockSleep {
            inner: Arc::clone(&self.inner),
            state,
        })
    }
}

#[derive(Debug)]
struct MockClockInner {
    state: Mutex<ClockState>,
}

#[derive(Debug)]
struct ClockState {
    origin: Instant,
    /// `origin + horizon` 是平台可表示的最远时刻，`elapsed` 永不超过它。
    horizon: Duration,
    elapsed: Duration,
    sleepers: Vec<Arc<SleepState>>,
    next_id: u64,
}

impl ClockState {
    fn now(&self) -> Instant {
        self.origin
            .checked_add(self.elapsed)
            .unwrap_or(self.origin + self.horizon)
    }

    /// 推进偏移并摘除到期的等待，返回需要在锁外唤醒的 waker。
    fn advance_to(&mut self, elapsed: Duration) -> Vec<Waker> {
        let elapsed = elapsed.min(self.horizon);
        self.elapsed = elapsed;
        let mut to_wake = Vec::new();
        self.sleepers.retain(|entry| {
            if entry.cancelled.load(Ordering::SeqCst) {
                return false;
            }
            if elapsed >= entry.deadline {
                entry.completed.store(true, Ordering::SeqCst);
                if let Some(waker) = entry.take_waker() {
                    to_wake.push(waker);
                }
                false
            } else {
                true
            }
        });
        to_wake
    }
}

/// 二分查找 `origin` 之后仍可表示的最大整秒偏移。
fn representable_horizon(origin: Instant) -> Duration {
    let (mut lo, mut hi) = (0u64, u64::MAX);
    while lo < hi {
        let mid = lo + (hi - lo).div_ceil(2);
        if origin.checked_add(Duration::from_secs(mid)).is_some() {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    Duration::from_secs(lo)
}

#[derive(Debug)]
struct SleepState {
    id: u64,
    deadline: Duration,
    waker: Mutex<Option<Waker>>,
    completed: AtomicBool,
    cancelled: AtomicBool,
}

impl SleepState {
    fn new(id: u64, deadline: Duration) -> Self {
        Self {
            id,
            deadline,
            waker: Mutex::new(None),
            completed: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
        }
    }

    fn take_waker(&self) -> Option<Waker> {
        self.waker.lock().take()
    }

    fn store_waker(&self, waker: &Waker) {
        let mut guard = self.waker.lock();
        if guard
            .as_ref()
            .is_some_and(|existing| existing.will_wake(waker))
        {
            return;
        }
        *guard = Some(waker.clone());
    }
}

struct MockSleep {
    inner: Arc<MockClockInner>,
    state: Arc<SleepState>,
}

impl Future for MockSleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.state.completed.load(Ordering::SeqCst) {
            return Poll::Ready(());
        }

        // waker 必须在持有时钟锁期间登记：`advance` 在同一把锁内标记完成并取走 waker，
        // 二者互斥后不会出现“已到期但 waker 晚到”的丢失唤醒。
        let guard = self.inner.state.lock();
        if self.state.completed.load(Ordering::SeqCst) || guard.elapsed >= self.state.deadline {
            self.state.completed.store(true, Ordering::SeqCst);
            return Poll::Ready(());
        }
        self.state.store_waker(cx.waker());
        drop(guard);
        Poll::Pending
    }
}

impl Drop for MockSleep {
    fn drop(&mut self) {
        if !self.state.completed.load(Ordering::SeqCst) {
            self.state.cancelled.store(true, Ordering::SeqCst);
            self.state.take_waker();
            self.inner
                .state
                .lock()
                .sleepers
                .retain(|entry| entry.id != self.state.id);
        }
    }
}
