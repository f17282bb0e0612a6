//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::time::Duration;

use crate::application::pipeline::{PollSchedule, WizardConfig};
use crate::infrastructure::adapters::HttpDiagnosisClientConfig;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 后端 API 配置
    #[serde(default)]
    pub api: ApiConfig,

    /// 任务状态轮询配置
    #[serde(default)]
    pub poll: PollConfig,

    /// 报告推送配置
    #[serde(default)]
    pub stream: StreamConfig,

    /// 图片上传配置
    #[serde(default)]
    pub upload: UploadConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

impl AppConfig {
    /// 转换为向导配置
    pub fn wizard_config(&self) -> WizardConfig {
        WizardConfig {
            poll: self.poll.schedule(),
            stream_max_wait: self.stream.max_wait(),
            max_image_bytes: self.upload.max_image_bytes,
        }
    }
}

/// 后端 API 配置
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// 后端基础 URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API Key（通过 X-API-Key 发送），为空时不发送
    #[serde(default)]
    pub api_key: String,

    /// 单次请求超时时间（秒）
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiConfig {
    /// 转换为 HTTP 客户端配置
    pub fn client_config(&self) -> HttpDiagnosisClientConfig {
        HttpDiagnosisClientConfig::new(self.base_url.clone())
            .with_api_key(self.api_key.clone())
            .with_timeout(self.timeout_secs)
    }
}

/// 任务状态轮询配置
#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    /// 慢速阶段轮询间隔（毫秒）
    #[serde(default = "default_slow_interval_ms")]
    pub slow_interval_ms: u64,

    /// 快速阶段轮询间隔（毫秒）
    #[serde(default = "default_fast_interval_ms")]
    pub fast_interval_ms: u64,

    /// 慢速阶段时长（毫秒）
    #[serde(default = "default_slow_phase_ms")]
    pub slow_phase_ms: u64,

    /// 最长等待时间（秒），0 表示不限制
    #[serde(default = "default_poll_max_wait")]
    pub max_wait_secs: u64,
}

fn default_slow_interval_ms() -> u64 {
    2000
}

fn default_fast_interval_ms() -> u64 {
    1000
}

fn default_slow_phase_ms() -> u64 {
    4000
}

fn default_poll_max_wait() -> u64 {
    600 // 10 分钟
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            slow_interval_ms: default_slow_interval_ms(),
            fast_interval_ms: default_fast_interval_ms(),
            slow_phase_ms: default_slow_phase_ms(),
            max_wait_secs: default_poll_max_wait(),
        }
    }
}

impl PollConfig {
    pub fn schedule(&self) -> PollSchedule {
        PollSchedule {
            slow_interval: Duration::from_millis(self.slow_interval_ms),
            fast_interval: Duration::from_millis(self.fast_interval_ms),
            slow_phase: Duration::from_millis(self.slow_phase_ms),
            max_wait: non_zero_secs(self.max_wait_secs),
        }
    }
}

/// 报告推送配置
#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    /// 推送通道最长存活时间（秒），0 表示不限制
    #[serde(default = "default_stream_max_wait")]
    pub max_wait_secs: u64,
}

fn default_stream_max_wait() -> u64 {
    300 // 5 分钟
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_wait_secs: default_stream_max_wait(),
        }
    }
}

impl StreamConfig {
    pub fn max_wait(&self) -> Option<Duration> {
        non_zero_secs(self.max_wait_secs)
    }
}

/// 图片上传配置
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// 图片最大大小（字节），0 表示不限制，默认 10MB
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: u64,
}

fn default_max_image_bytes() -> u64 {
    10 * 1024 * 1024 // 10 MB
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: default_max_image_bytes(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}
