//! “定时器”主题：在被测虚拟时钟上验证 `MockTimer` 的全部行为承诺。
//!
//! 投递任务由手动执行器驱动；`step` 推进时间后总是把执行器跑到停滞，
//! 只有需要制造同刻竞态的用例才直接调用 `harness.advance`。

use std::time::Duration;

use tempo_core::ManualDeliveryExecutor;

use crate::case::{TckCase, TckSuite};
use crate::support::{ClockHarness, manual_timer};

const CASES: &[TckCase] = &[
    TckCase {
        name: "fires_once_at_deadline",
        test: fires_once_at_deadline,
    },
    TckCase {
        name: "stop_suppresses_cycle",
        test: stop_suppresses_cycle,
    },
    TckCase {
        name: "reset_rebases_on_current_time",
        test: reset_rebases_on_current_time,
    },
    TckCase {
        name: "rearm_wins_exact_tie",
        test: rearm_wins_exact_tie,
    },
    TckCase {
        name: "stop_wins_exact_tie",
        test: stop_wins_exact_tie,
    },
    TckCase {
        name: "superseded_wait_stays_silent",
        test: superseded_wait_stays_silent,
    },
    TckCase {
        name: "return_values_reflect_prior_state",
        test: return_values_reflect_prior_state,
    },
];

const SUITE: TckSuite = TckSuite {
    name: "timer",
    cases: CASES,
};

/// 返回“定时器”主题的测试套件。
pub const fn suite() -> &'static TckSuite {
    &SUITE
}

const MS: Duration = Duration::from_millis(1);

fn step(harness: &dyn ClockHarness, executor: &ManualDeliveryExecutor, ms: u32) {
    harness.advance(MS * ms);
    executor.run_until_stalled();
}

fn fires_once_at_deadline(harness: &dyn ClockHarness) {
    let (executor, timer) = manual_timer(harness);
    let channel = timer.channel();
    let start = harness.clock().now();

    timer.reset(MS * 10);
    executor.run_until_stalled();
    step(harness, &executor, 9);
    assert!(channel.is_empty(), "目标之前不得触发");

    step(harness, &executor, 1);
    let fired = channel.try_recv().expect("到达目标必须触发");
    assert!(fired >= start + MS * 10, "触发时间戳不得早于目标");

    step(harness, &executor, 50);
    assert!(channel.is_empty(), "每个周期至多触发一次");
}

fn stop_suppresses_cycle(harness: &dyn ClockHarness) {
    let (executor, timer) = manual_timer(harness);
    let channel = timer.channel();

    timer.reset(MS * 10);
    step(harness, &executor, 4);
    assert!(timer.stop());
    step(harness, &executor, 100);
    assert!(channel.is_empty(), "停止后的周期永不触发");
}

/// 0 时刻装填 10，5 时刻重置 10：10 时刻不触发，15 时刻恰好触发一次。
fn reset_rebases_on_current_time(harness: &dyn ClockHarness) {
    let (executor, timer) = manual_timer(harness);
    let channel = timer.channel();
    let start = harness.clock().now();

    timer.reset(MS * 10);
    step(harness, &executor, 5);
    assert!(channel.is_empty());
    assert!(timer.reset(MS * 10));
    step(harness, &executor, 5);
    assert!(channel.is_empty(), "旧的绝对目标已被替换");
    step(harness, &executor, 5);
    let fired = channel.try_recv().expect("新目标到达必须触发");
    assert!(fired >= start + MS * 15);
    step(harness, &executor, 20);
    assert!(channel.is_empty());
}

/// 时钟已就绪而投递任务尚未运行时重置：旧触发被丢弃，新周期照常触发。
fn rearm_wins_exact_tie(harness: &dyn ClockHarness) {
    let (executor, timer) = manual_timer(harness);
    let channel = timer.channel();

    timer.reset(MS * 10);
    executor.run_until_stalled();
    harness.advance(MS * 10);
    assert!(timer.reset(MS * 5), "失活尚未发生，定时器仍处于激活状态");
    executor.run_until_stalled();
    assert!(channel.is_empty(), "同刻竞态下新周期优先");

    step(harness, &executor, 5);
    assert!(channel.try_recv().is_some());
}

/// 时钟已就绪而投递任务尚未运行时停止：不得投递。
fn stop_wins_exact_tie(harness: &dyn ClockHarness) {
    let (executor, timer) = manual_timer(harness);
    let channel = timer.channel();

    timer.reset(MS * 10);
    executor.run_until_stalled();
    harness.advance(MS * 10);
    assert!(timer.stop());
    executor.run_until_stalled();
    assert!(channel.is_empty(), "同刻竞态下停止优先");
    assert_eq!(executor.live_tasks(), 0);
}

/// 被替换周期的等待随投递任务退出而注销：越过旧目标不触发，只有新目标触发一次。
fn superseded_wait_stays_silent(harness: &dyn ClockHarness) {
    let (executor, timer) = manual_timer(harness);
    let channel = timer.channel();
    let start = harness.clock().now();

    timer.reset(MS * 3);
    executor.run_until_stalled();
    assert!(timer.reset(MS * 20));
    executor.run_until_stalled();
    assert_eq!(executor.live_tasks(), 1, "旧周期的投递任务已退出");

    step(harness, &executor, 10);
    assert!(channel.is_empty(), "越过旧目标不得触发");
    step(harness, &executor, 10);
    let fired = channel.try_recv().expect("新目标到达必须触发");
    assert!(fired >= start + MS * 20);
    assert_eq!(executor.live_tasks(), 0);
    step(harness, &executor, 30);
    assert!(channel.is_empty());
}

fn return_values_reflect_prior_state(harness: &dyn ClockHarness) {
    let (executor, timer) = manual_timer(harness);

    assert!(!timer.stop(), "未激活时停止返回 false");
    assert!(!timer.reset(MS * 3));
    assert!(timer.reset(MS * 3));
    assert!(timer.stop());
    assert!(!timer.reset(MS * 3));
    step(harness, &executor, 3);
    assert!(!timer.stop(), "已触发的周期不再处于激活状态");
}
