//! 投递执行器配置。
//!
//! # 模块定位（Why）
//! - 默认的线程化投递需要少量可调参数（线程名前缀、栈大小），便于在 CI 日志与调试器中识别定时器线程；
//! - 配置既可来自 TOML 片段（嵌入测试夹具），也可来自环境变量（CI 上临时调整）。
//!
//! # 契约（What）
//! - 所有入口在返回前都会调用 [`DeliveryConfig::validate`]；
//! - 未出现的字段取默认值，出现未知字段视为错误，避免拼写错误被静默忽略。

use serde::Deserialize;

use crate::error::{Result, TimeError};

/// 线程名前缀的环境变量。
pub const ENV_THREAD_PREFIX: &str = "TEMPO_TIMER_THREAD_PREFIX";
/// 线程栈大小（字节）的环境变量。
pub const ENV_STACK_SIZE: &str = "TEMPO_TIMER_STACK_SIZE";

const DEFAULT_THREAD_PREFIX: &str = "tempo-timer";
const MIN_STACK_SIZE: usize = 16 * 1024;

/// 投递线程配置。
///
/// # 字段说明（What）
/// - `thread_name_prefix`：线程名为 `{prefix}-{seq}`，不得为空或包含 NUL；
/// - `stack_size`：可选的线程栈大小，设置时不得小于 16 KiB。
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct DeliveryConfig {
    pub thread_name_prefix: String,
    pub stack_size: Option<usize>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: DEFAULT_THREAD_PREFIX.to_owned(),
            stack_size: None,
        }
    }
}

impl DeliveryConfig {
    /// 解析 TOML 片段并校验。
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// 以默认值为底，叠加进程环境变量。
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// 以默认值为底，叠加 `lookup` 提供的变量；便于测试注入而不污染进程环境。
    pub fn from_env_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(prefix) = lookup(ENV_THREAD_PREFIX) {
            config.thread_name_prefix = prefix;
        }
        if let Some(raw) = lookup(ENV_STACK_SIZE) {
            let size = raw.trim().parse::<usize>().map_err(|err| {
                TimeError::invalid_config("stack_size", format!("`{raw}` is not a byte count: {err}"))
            })?;
            config.stack_size = Some(size);
        }
        config.validate()?;
        Ok(config)
    }

    /// 校验字段取值。
    pub fn validate(&self) -> Result<()> {
        if self.thread_name_prefix.is_empty() {
            return Err(TimeError::invalid_config(
                "thread_name_prefix",
                "must not be empty",
            ));
        }
        if self.thread_name_prefix.contains('\0') {
            return Err(TimeError::invalid_config(
                "thread_name_prefix",
                "must not contain NUL bytes",
            ));
        }
        if let Some(size) = self.stack_size
            && size < MIN_STACK_SIZE
        {
            return Err(TimeError::invalid_config(
                "stack_size",
                format!("{size} bytes is below the {MIN_STACK_SIZE} byte minimum"),
            ));
        }
        Ok(())
    }
}
