//! Report Context - 流式报告限界上下文
//!
//! 职责:
//! - 报告分节（summary / description / precautions / management）
//! - 流式片段的追加与冻结

mod aggregate;
mod errors;
mod value_objects;

pub use aggregate::{ComposedReport, StreamingReport};
pub use errors::ReportError;
pub use value_objects::{ReportEvent, ReportSection};
