//! 定时器集成测试入口。
//!
//! # 模块目的（Why）
//! - 汇集 `MockTimer` 在虚拟时钟下的行为测试，便于统一运行与过滤（`cargo test -p tempo-core --test timer`）；
//! - 确定性场景使用 [`ManualDeliveryExecutor`](tempo_core::ManualDeliveryExecutor) 精确控制投递任务的轮询时机，
//!   线程化场景验证默认执行器下的端到端行为。
//!
//! # 结构概览（What）
//! - `deterministic`：触发时机、取消、重置、同刻竞态；
//! - `threaded`：默认线程执行器与多线程并发重置；
//! - `observability`：协议关键节点的日志事件。

pub mod support {
    use std::sync::Arc;

    use tempo_core::{ManualDeliveryExecutor, MockClock, MockTimer};

    /// 确定性测试夹具：虚拟时钟 + 手动执行器 + 定时器。
    pub struct Rig {
        pub clock: MockClock,
        pub executor: ManualDeliveryExecutor,
        pub timer: MockTimer,
    }

    impl Rig {
        pub fn new() -> Self {
            let clock = MockClock::new();
            let executor = ManualDeliveryExecutor::new();
            let timer = clock.new_timer_with(Arc::new(executor.clone()));
            Self {
                clock,
                executor,
                timer,
            }
        }

        /// 推进虚拟时间并让所有投递任务跑到停滞。
        pub fn advance(&self, delta: std::time::Duration) {
            self.clock.advance(delta);
            self.executor.run_until_stalled();
        }

        pub fn settle(&self) {
            self.executor.run_until_stalled();
        }
    }
}

pub mod tests {
    //! 集成测试命名空间。
    pub mod timer {
        include!("deterministic.rs");
        include!("threaded.rs");
        include!("observability.rs");
    }
}
