//! Diagnosis API Adapter - 后端诊断服务客户端实现

mod dto;
mod fake_client;
mod http_client;
mod sse;

pub use fake_client::FakeDiagnosisApi;
pub use http_client::{HttpDiagnosisClient, HttpDiagnosisClientConfig, API_KEY_HEADER};
pub use sse::{decode_report_events, to_report_event};
