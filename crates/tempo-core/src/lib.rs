#![deny(unsafe_code)]
#![doc = "tempo-core: 虚拟时间驱动的确定性定时器。"]
#![doc = ""]
#![doc = "生产代码依赖 [`timer::Timer`] 与 [`time::VirtualClock`] 抽象；测试中由 [`time::MockClock`] 提供只在显式推进时流动的虚拟时间，"]
#![doc = "[`timer::MockTimer`] 在此之上保证每个触发周期至多一次有效触发、取消之后绝不投递。"]

pub mod config;
pub mod error;
pub mod time;
pub mod timer;

pub use config::DeliveryConfig;
pub use error::{Result, TimeError};
pub use time::{MockClock, Sleep, VirtualClock};
pub use timer::{
    DeliveryExecutor, DeliveryFuture, FiringChannel, ManualDeliveryExecutor, MockTimer,
    ThreadDeliveryExecutor, Timer,
};
