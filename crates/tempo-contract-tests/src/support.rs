use std::any::Any;
use std::panic;
use std::sync::Arc;
use std::time::Duration;

use tempo_core::{ManualDeliveryExecutor, MockTimer, VirtualClock};

/// 被测虚拟时钟的驱动接口。
///
/// # 教案式说明
/// - **意图 (Why)**：TCK 只通过 [`VirtualClock`] 契约观察时钟，但推进时间的方式属于实现细节，
///   因此由实现方提供一个最小的驱动适配。
/// - **契约 (What)**：
///   - `clock`：返回被测时钟，可多次调用，必须指向同一时间线；
///   - `advance`：把虚拟时间向前推进 `delta`，返回前所有到期的等待都必须已被唤醒。
pub trait ClockHarness: Send + Sync {
    fn clock(&self) -> Arc<dyn VirtualClock>;

    fn advance(&self, delta: Duration);
}

/// 产生全新驱动实例的工厂；每个用例独享一条时间线。
pub type HarnessFactory<'a> = &'a dyn Fn() -> Box<dyn ClockHarness>;

/// 以 `[tempo-tck::套件::用例]` 为前缀重新抛出用例中捕获的 panic。
///
/// 断言失败的载荷通常是 `&str`（字面量信息）或 `String`（格式化信息），其余类型只保留占位描述。
/// 重新抛出使用 [`panic::resume_unwind`]，不会再次触发 panic hook。
pub fn panic_with_context(suite: &str, case: &str, payload: Box<dyn Any + Send>) -> ! {
    let detail = payload_text(payload.as_ref());
    panic::resume_unwind(Box::new(format!("[tempo-tck::{suite}::{case}] {detail}")))
}

fn payload_text(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<非字符串 panic 载荷>")
}

/// 在被测时钟上构造由手动执行器驱动的定时器。
pub fn manual_timer(harness: &dyn ClockHarness) -> (ManualDeliveryExecutor, MockTimer) {
    let executor = ManualDeliveryExecutor::new();
    let timer = MockTimer::with_executor(harness.clock(), Arc::new(executor.clone()));
    (executor, timer)
}
