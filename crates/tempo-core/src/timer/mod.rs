//! 定时器能力与虚拟时间实现。
//!
//! # 模块定位（Why）
//! - 生产代码只依赖 [`Timer`] 能力：读取触发通道、重置、停止；
//! - 测试注入 [`MockTimer`]，触发完全由虚拟时钟的推进决定，既无真实延迟也无抖动。
//!
//! # 结构概览（What）
//! - [`Timer`]：对外契约；
//! - [`FiringChannel`]：单槽、非阻塞投递的触发通道；
//! - [`DeliveryExecutor`] 及其两个实现：决定投递任务在哪里运行；
//! - [`MockTimer`]：门闩 + 周期号 + 释放信号组成的同步协议。

mod channel;
mod executor;
mod mock;

use std::time::Duration;

pub use channel::{FiringChannel, Recv};
pub use executor::{
    DeliveryExecutor, DeliveryFuture, ManualDeliveryExecutor, ThreadDeliveryExecutor,
};
pub use mock::MockTimer;

/// 通用定时器能力。
///
/// # 契约说明（What）
/// - `channel`：返回触发通道，不阻塞、不改变状态；
/// - `reset`：以“当前时间 + duration”重新装填，返回调用前是否处于激活状态；旧周期不会再触发；
/// - `stop`：取消当前周期，返回调用前是否处于激活状态；对未激活的定时器调用返回 `false`，不是错误。
pub trait Timer: Send + Sync {
    fn channel(&self) -> FiringChannel;

    fn reset(&self, duration: Duration) -> bool;

    fn stop(&self) -> bool;
}
