//! DermaLens - 皮肤诊断流程客户端
//!
//! 架构设计: DDD + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Analysis Context: 后端分析任务及其状态迁移
//! - Intake Context: 图片与症状问卷校验
//! - Report Context: 分节流式报告
//! - Wizard Context: 向导步骤与上下文
//!
//! 应用层 (application/):
//! - Ports: 端口定义（DiagnosisApi, AuthContext, ReportExporter）
//! - Commands: 提交分析、保存报告、导出报告
//! - Pipeline: 状态轮询、报告推送、向导状态机
//!
//! 基础设施层 (infrastructure/):
//! - Adapters: HTTP/SSE 诊断客户端、Fake 客户端、文件导出
//! - Memory: 内存身份会话

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
