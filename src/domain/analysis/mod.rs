//! Analysis Context - 诊断任务限界上下文
//!
//! 职责:
//! - 后端异步分析任务（AnalysisTask）的状态演进
//! - 分析结果（AnalysisResult）的校验

mod aggregate;
mod errors;
mod value_objects;

pub use aggregate::{AnalysisResult, AnalysisTask, StatusObservation};
pub use errors::AnalysisError;
pub use value_objects::{TaskId, TaskState};
