//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 定时器协议本身（`reset`/`stop`/`channel`）是全函数，不存在可恢复错误；
//! - 但围绕协议的环境能力（配置解析、虚拟时钟跳转、投递线程创建）仍可能失败，需要统一的错误域。
//!
//! ## 设计要求（What）
//! - 所有变体实现 `thiserror::Error`，满足 `Send + Sync + 'static`，可跨线程传播；
//! - 错误不会穿透到 [`Timer::reset`](crate::timer::Timer::reset) 与 [`Timer::stop`](crate::timer::Timer::stop)，
//!   它们在失败时回滚状态并记录日志。

use std::time::Duration;

use thiserror::Error;

/// 统一的结果别名。
pub type Result<T, E = TimeError> = core::result::Result<T, E>;

/// `tempo-core` 的错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：把配置、时钟与执行器三类失败集中表达，调用方可据此决定是重试、修正配置还是直接终止测试。
/// - **契约 (What)**：变体均携带足以排障的上下文；`ConfigParse` 与 `Spawn` 通过 `source` 保留底层错误链。
/// - **权衡 (Trade-offs)**：`InvalidConfig` 使用 `&'static str` 标识字段，避免为字段名分配堆内存。
#[derive(Debug, Error)]
pub enum TimeError {
    /// 配置字段取值非法。
    #[error("invalid delivery config `{field}`: {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: String,
    },

    /// TOML 文本无法解析为配置结构。
    #[error("failed to parse delivery config")]
    ConfigParse(#[from] toml::de::Error),

    /// 试图让虚拟时钟倒退。
    ///
    /// 两个字段均为相对时钟原点的偏移量。
    #[error("virtual clock cannot move backwards: current offset {current:?}, requested {requested:?}")]
    ClockRegression {
        current: Duration,
        requested: Duration,
    },

    /// 投递任务所需的线程无法启动。
    #[error("failed to spawn timer delivery thread")]
    Spawn(#[source] std::io::Error),
}

impl TimeError {
    /// 便捷构造 [`TimeError::InvalidConfig`]。
    pub(crate) fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}
