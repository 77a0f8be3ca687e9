//! 时间抽象模块，提供可注入的虚拟时钟接口，使定时器相关逻辑在测试中完全确定。
//!
//! # 模块定位（Why）
//! - 定时器核心只读取“现在”并登记“将来”，不决定时间何时推进；
//! - 推进时间的权力完全交给测试，由 [`MockClock::advance`] / [`MockClock::set`] 显式驱动。
//!
//! # 结构概览（What）
//! - [`clock::VirtualClock`]：定时器消费的协作者契约，暴露 `now`/`after` 两个原语；
//! - [`clock::MockClock`]：参考实现，提供手动推进与确定性唤醒序列。

pub mod clock;

pub use clock::{MockClock, Sleep, VirtualClock};
