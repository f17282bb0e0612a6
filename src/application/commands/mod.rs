//! 应用层 - 命令（写操作）
//!
//! 一次性的后端写操作：提交分析、保存报告、导出报告

mod analysis_commands;
mod report_commands;

pub mod handlers;

pub use analysis_commands::*;
pub use report_commands::*;
