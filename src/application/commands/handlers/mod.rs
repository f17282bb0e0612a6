//! Command Handlers 实现
//!
//! 所有 CommandHandler 的具体实现

mod analysis_handlers;
mod report_handlers;

pub use analysis_handlers::*;
pub use report_handlers::*;
