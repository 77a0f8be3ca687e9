use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use futures::task::{ArcWake, noop_waker, waker};
use tempo_core::Sleep;

use crate::case::{TckCase, TckSuite};
use crate::support::ClockHarness;

const CASES: &[TckCase] = &[
    TckCase {
        name: "after_ready_only_at_deadline",
        test: after_ready_only_at_deadline,
    },
    TckCase {
        name: "after_anchored_at_from",
        test: after_anchored_at_from,
    },
    TckCase {
        name: "advance_wakes_registered_waiter",
        test: advance_wakes_registered_waiter,
    },
    TckCase {
        name: "dropped_wait_is_released",
        test: dropped_wait_is_released,
    },
    TckCase {
        name: "now_is_monotonic",
        test: now_is_monotonic,
    },
];

const SUITE: TckSuite = TckSuite {
    name: "clock",
    cases: CASES,
};

/// 返回“虚拟时钟”主题的测试套件。
pub const fn suite() -> &'static TckSuite {
    &SUITE
}

fn poll(sleep: &mut Sleep) -> Poll<()> {
    let waker = noop_waker();
    let mut cx = Context::from_waker(&waker);
    sleep.as_mut().poll(&mut cx)
}

/// 等待在截止点之前保持 Pending，到达后就绪。
fn after_ready_only_at_deadline(harness: &dyn ClockHarness) {
    let clock = harness.clock();
    let mut sleep = clock.after(clock.now(), Duration::from_millis(10));

    assert!(poll(&mut sleep).is_pending(), "登记后立即轮询应为 Pending");
    harness.advance(Duration::from_millis(9));
    assert!(poll(&mut sleep).is_pending(), "截止点之前不得就绪");
    harness.advance(Duration::from_millis(1));
    assert!(poll(&mut sleep).is_ready(), "到达截止点必须就绪");
}

/// 截止点以 `from` 为锚点，而不是登记时刻。
///
/// 定时器在门闩内读取 `now` 后才登记等待，锚点语义保证两者之间的时间推进不会被重复计算。
fn after_anchored_at_from(harness: &dyn ClockHarness) {
    let clock = harness.clock();
    let anchor = clock.now();
    harness.advance(Duration::from_millis(6));
    let mut sleep = clock.after(anchor, Duration::from_millis(10));

    harness.advance(Duration::from_millis(3));
    assert!(poll(&mut sleep).is_pending());
    harness.advance(Duration::from_millis(1));
    assert!(poll(&mut sleep).is_ready(), "锚点 + 10ms 已到达");
}

/// 记录被唤醒次数的 waker。
#[derive(Default)]
struct WakeCount(AtomicUsize);

impl WakeCount {
    fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl ArcWake for WakeCount {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// 先轮询登记 waker，再推进时间，waker 必须被调用。
fn advance_wakes_registered_waiter(harness: &dyn ClockHarness) {
    let clock = harness.clock();
    let counter = Arc::new(WakeCount::default());
    let waker = waker(Arc::clone(&counter));
    let mut cx = Context::from_waker(&waker);
    let mut sleep = clock.after(clock.now(), Duration::from_millis(5));

    assert!(sleep.as_mut().poll(&mut cx).is_pending());
    harness.advance(Duration::from_millis(5));
    assert_eq!(counter.get(), 1, "到期时应唤醒一次");
    assert!(sleep.as_mut().poll(&mut cx).is_ready());
}

/// 已轮询但未到期的等待被 Drop 后，推进越过其截止点既不唤醒旧 waker，也不影响其他等待。
fn dropped_wait_is_released(harness: &dyn ClockHarness) {
    let clock = harness.clock();
    let dropped = Arc::new(WakeCount::default());
    let kept = Arc::new(WakeCount::default());
    let dropped_waker = waker(Arc::clone(&dropped));
    let kept_waker = waker(Arc::clone(&kept));

    let mut abandoned = clock.after(clock.now(), Duration::from_millis(5));
    let mut survivor = clock.after(clock.now(), Duration::from_millis(8));
    assert!(
        abandoned
            .as_mut()
            .poll(&mut Context::from_waker(&dropped_waker))
            .is_pending()
    );
    assert!(
        survivor
            .as_mut()
            .poll(&mut Context::from_waker(&kept_waker))
            .is_pending()
    );
    drop(abandoned);

    harness.advance(Duration::from_millis(10));
    assert_eq!(dropped.get(), 0, "已注销的等待不得被唤醒");
    assert_eq!(kept.get(), 1, "其他等待照常唤醒");
    assert!(
        survivor
            .as_mut()
            .poll(&mut Context::from_waker(&kept_waker))
            .is_ready()
    );
}

/// `now` 单调不减，且按推进量前进。
fn now_is_monotonic(harness: &dyn ClockHarness) {
    let clock = harness.clock();
    let before = clock.now();
    assert_eq!(clock.now(), before, "不推进时虚拟时间保持不变");
    harness.advance(Duration::from_millis(7));
    assert_eq!(clock.now(), before + Duration::from_millis(7));
}
