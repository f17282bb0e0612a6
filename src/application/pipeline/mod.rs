//! 诊断流程编排
//!
//! - poller: 任务状态轮询（自适应间隔、可取消）
//! - streamer: 报告推送通道（同时最多一个）
//! - wizard: 向导状态机，串联上述两者与保存/导出

pub mod poller;
pub mod streamer;
pub mod wizard;

pub use poller::{poll_until_terminal, PollHandle, PollSchedule};
pub use streamer::{ReportStreamClient, StreamHandle, StreamUpdate};
pub use wizard::{DiagnosisWizard, SaveOutcome, WizardConfig, WizardSnapshot};
