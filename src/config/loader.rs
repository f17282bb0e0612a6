//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（dermalens.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["dermalens", "dermalens.local"];

/// 环境变量前缀
const ENV_PREFIX: &str = "DERMALENS";

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `DERMALENS_`，层级分隔符 `__`）
/// 2. 配置文件（dermalens.toml 或 dermalens.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `DERMALENS_API__BASE_URL=https://api.example.com`
/// - `DERMALENS_API__API_KEY=...`
/// - `DERMALENS_POLL__MAX_WAIT_SECS=0`
/// - `DERMALENS_LOG__LEVEL=debug`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("api.base_url", "http://localhost:8000")?
        .set_default("api.api_key", "")?
        .set_default("api.timeout_secs", 10)?
        .set_default("poll.slow_interval_ms", 2000)?
        .set_default("poll.fast_interval_ms", 1000)?
        .set_default("poll.slow_phase_ms", 4000)?
        .set_default("poll.max_wait_secs", 600)?
        .set_default("stream.max_wait_secs", 300)?
        .set_default("upload.max_image_bytes", 10 * 1024 * 1024)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    // 例如: DERMALENS_API__BASE_URL=http://backend:8000
    // 注意: 环境变量名会被转换为小写
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    let base_url = config.api.base_url.trim();
    if base_url.is_empty() {
        return Err(ConfigError::ValidationError(
            "API base URL cannot be empty".to_string(),
        ));
    }
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::ValidationError(format!(
            "API base URL must start with http:// or https://: {}",
            base_url
        )));
    }

    if config.api.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "API timeout cannot be 0".to_string(),
        ));
    }

    if config.poll.slow_interval_ms == 0 || config.poll.fast_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "Poll intervals cannot be 0".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== DermaLens Configuration ===");
    tracing::info!("API Base URL: {}", config.api.base_url);
    tracing::info!(
        "API Key: {}",
        if config.api.api_key.is_empty() {
            "(not set)"
        } else {
            "(set)"
        }
    );
    tracing::info!("API Timeout: {}s", config.api.timeout_secs);
    tracing::info!(
        "Poll Interval: {}ms for first {}ms, then {}ms",
        config.poll.slow_interval_ms,
        config.poll.slow_phase_ms,
        config.poll.fast_interval_ms
    );
    tracing::info!("Poll Max Wait: {}s", config.poll.max_wait_secs);
    tracing::info!("Stream Max Wait: {}s", config.stream.max_wait_secs);
    tracing::info!("Max Image Size: {} bytes", config.upload.max_image_bytes);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("===============================");
}
