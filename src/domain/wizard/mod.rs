//! Wizard Context - 诊断向导状态
//!
//! 职责:
//! - 向导步骤及合法迁移
//! - 步骤间传递的上下文（WizardContext）

mod context;
mod state;

pub use context::WizardContext;
pub use state::WizardState;
