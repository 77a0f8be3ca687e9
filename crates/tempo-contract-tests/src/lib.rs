//! tempo 契约测试套件（TCK）入口。
//!
//! # 教案式综述（Why / How / What）
//! - **为什么存在**：`MockTimer` 的正确性依赖虚拟时钟协作者遵守 `now`/`after` 契约。第三方若自研虚拟时钟，
//!   可以用本 crate 一次性验证：时钟自身的登记/唤醒语义，以及定时器在其之上的全部行为承诺。
//! - **如何集成**：实现 [`ClockHarness`]，在目标仓库的 `tests` 目录下调用 [`run_all`]（或按主题调用 `run_*`）。
//! - **测试对象**：`clock` 主题只经由 [`VirtualClock`](tempo_core::VirtualClock) 观察时钟；`timer` 主题在被测时钟上
//!   构造 `MockTimer` 并以手动执行器驱动投递，覆盖同刻竞态在内的全部行为。
//!
//! # 契约说明（What）
//! - 每个用例获得工厂新建的驱动实例，用例之间不共享时间线；
//! - 任一用例失败都会以 `[tempo-tck::套件::用例]` 前缀重新 panic。

mod clock;
mod support;
mod timer;

use case::run_suite;
pub use case::{TckCase, TckSuite};
pub use support::{ClockHarness, HarnessFactory, panic_with_context};

const ALL_SUITES: [&TckSuite; 2] = [clock::suite(), timer::suite()];

mod case {
    use super::support::{self, ClockHarness, HarnessFactory};
    use std::panic;

    /// 单个 TCK 用例。
    ///
    /// # 教案式说明
    /// - **逻辑 (How)**：`name` 采用 `'static` 字符串，`test` 接收被测驱动；组合后可在 `const` 数组中定义。
    /// - **契约 (What)**：`test` 必须在失败时 `panic`；名称会用于错误提示。
    #[derive(Clone, Copy)]
    pub struct TckCase {
        /// 用例的人类可读名称。
        pub name: &'static str,
        /// 实际执行的断言逻辑。
        pub test: fn(&dyn ClockHarness),
    }

    /// 同一主题的一组用例。
    #[derive(Clone, Copy)]
    pub struct TckSuite {
        pub name: &'static str,
        pub cases: &'static [TckCase],
    }

    /// 在捕获 panic 的前提下执行整个套件，每个用例使用新的驱动实例。
    pub fn run_suite(suite: &TckSuite, factory: HarnessFactory<'_>) {
        assert!(!suite.cases.is_empty(), "TCK 套件不应为空");
        for case in suite.cases {
            let harness = factory();
            let outcome = panic::catch_unwind(panic::AssertUnwindSafe(|| (case.test)(&*harness)));
            if let Err(payload) = outcome {
                support::panic_with_context(suite.name, case.name, payload);
            }
        }
    }
}

/// 返回所有已注册的套件，顺序与 [`run_all`] 一致。
pub fn all_suites() -> &'static [&'static TckSuite] {
    &ALL_SUITES
}

/// 运行全部套件。
pub fn run_all(factory: HarnessFactory<'_>) {
    for suite in all_suites() {
        run_suite(suite, factory);
    }
}

/// 运行“虚拟时钟”主题：登记、锚点、唤醒与注销。
pub fn run_clock_suite(factory: HarnessFactory<'_>) {
    run_suite(clock::suite(), factory);
}

/// 运行“定时器”主题：触发时机、取消、重置、同刻竞态与单槽投递。
pub fn run_timer_suite(factory: HarnessFactory<'_>) {
    run_suite(timer::suite(), factory);
}
