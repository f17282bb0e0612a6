//! Fake Diagnosis API - 用于测试的后端
//!
//! 按脚本返回任务状态和推送事件，不发起任何网络请求

use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use crate::application::ports::{
    DiagnosisApiPort, DiagnosisRecord, GatewayError, ReportEventStream, ReportStreamRequest,
    SavedReport, SubmitAnalysisRequest,
};
use crate::domain::analysis::{StatusObservation, TaskId};
use crate::domain::report::ReportEvent;

type StatusStep = Result<StatusObservation, GatewayError>;
type EventStep = Result<ReportEvent, GatewayError>;

/// 单个任务的状态脚本
///
/// 按顺序返回，最后一项在耗尽后重复返回
#[derive(Debug, Default)]
struct StatusScript {
    steps: VecDeque<StatusStep>,
}

impl StatusScript {
    fn next(&mut self) -> Option<StatusStep> {
        if self.steps.len() > 1 {
            self.steps.pop_front()
        } else {
            self.steps.front().cloned()
        }
    }
}

/// 调用记录
#[derive(Debug, Default)]
struct CallLog {
    submissions: Vec<SubmitAnalysisRequest>,
    stream_requests: Vec<ReportStreamRequest>,
    saved: Vec<DiagnosisRecord>,
}

/// Fake Diagnosis API
///
/// 通过 `with_*` 构建脚本，通过查询方法断言调用情况
#[derive(Default)]
pub struct FakeDiagnosisApi {
    scripts: DashMap<String, StatusScript>,
    status_calls: DashMap<String, Vec<Instant>>,
    default_statuses: Vec<StatusStep>,
    status_delay: Option<Duration>,
    stream_events: Vec<EventStep>,
    stream_held_open: bool,
    stream_error: Option<GatewayError>,
    event_delay: Option<Duration>,
    submit_error: Mutex<Option<GatewayError>>,
    submit_delay: Option<Duration>,
    save_error: Mutex<Option<GatewayError>>,
    save_delay: Option<Duration>,
    calls: Mutex<CallLog>,
}

impl FakeDiagnosisApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为指定任务设置状态脚本
    pub fn script_task(&self, task_id: &str, steps: Vec<StatusStep>) {
        self.scripts.insert(
            task_id.to_string(),
            StatusScript {
                steps: steps.into(),
            },
        );
    }

    /// 通过 submit 新建的任务使用的状态脚本
    pub fn with_default_statuses(mut self, steps: Vec<StatusStep>) -> Self {
        self.default_statuses = steps;
        self
    }

    /// 每次状态查询的响应延迟
    pub fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = Some(delay);
        self
    }

    pub fn with_stream_events(mut self, events: Vec<EventStep>) -> Self {
        self.stream_events = events;
        self
    }

    /// 事件发完后保持通道打开
    pub fn with_stream_held_open(mut self) -> Self {
        self.stream_held_open = true;
        self
    }

    /// 打开推送通道即失败
    pub fn with_stream_error(mut self, error: GatewayError) -> Self {
        self.stream_error = Some(error);
        self
    }

    /// 每个事件之前的延迟
    pub fn with_event_delay(mut self, delay: Duration) -> Self {
        self.event_delay = Some(delay);
        self
    }

    pub fn with_submit_error(self, error: GatewayError) -> Self {
        *lock(&self.submit_error) = Some(error);
        self
    }

    pub fn clear_submit_error(&self) {
        *lock(&self.submit_error) = None;
    }

    /// 提交请求的响应延迟
    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = Some(delay);
        self
    }

    pub fn with_save_error(self, error: GatewayError) -> Self {
        *lock(&self.save_error) = Some(error);
        self
    }

    pub fn clear_save_error(&self) {
        *lock(&self.save_error) = None;
    }

    pub fn with_save_delay(mut self, delay: Duration) -> Self {
        self.save_delay = Some(delay);
        self
    }

    pub fn submit_calls(&self) -> usize {
        lock(&self.calls).submissions.len()
    }

    pub fn last_submission(&self) -> Option<SubmitAnalysisRequest> {
        lock(&self.calls).submissions.last().cloned()
    }

    /// 指定任务的状态查询次数（含在途请求）
    pub fn status_calls(&self, task_id: &str) -> usize {
        self.status_calls
            .get(task_id)
            .map(|calls| calls.len())
            .unwrap_or(0)
    }

    /// 指定任务每次状态查询发起的时刻
    pub fn status_call_times(&self, task_id: &str) -> Vec<Instant> {
        self.status_calls
            .get(task_id)
            .map(|calls| calls.value().clone())
            .unwrap_or_default()
    }

    pub fn total_status_calls(&self) -> usize {
        self.status_calls.iter().map(|entry| entry.len()).sum()
    }

    pub fn open_stream_calls(&self) -> usize {
        lock(&self.calls).stream_requests.len()
    }

    pub fn last_stream_request(&self) -> Option<ReportStreamRequest> {
        lock(&self.calls).stream_requests.last().cloned()
    }

    pub fn saved_records(&self) -> Vec<DiagnosisRecord> {
        lock(&self.calls).saved.clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl DiagnosisApiPort for FakeDiagnosisApi {
    async fn submit_analysis(&self, request: SubmitAnalysisRequest) -> Result<TaskId, GatewayError> {
        tracing::debug!(
            user_id = %request.user_id,
            image_len = request.image.len(),
            "FakeDiagnosisApi: submit"
        );
        lock(&self.calls).submissions.push(request);

        if let Some(delay) = self.submit_delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = lock(&self.submit_error).clone() {
            return Err(err);
        }

        let task_id = TaskId::new(format!("fake-{}", uuid::Uuid::new_v4()))
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        self.script_task(task_id.as_str(), self.default_statuses.clone());
        Ok(task_id)
    }

    async fn task_status(&self, task_id: &TaskId) -> Result<StatusObservation, GatewayError> {
        self.status_calls
            .entry(task_id.as_str().to_string())
            .or_default()
            .push(Instant::now());

        if let Some(delay) = self.status_delay {
            tokio::time::sleep(delay).await;
        }

        let step = self
            .scripts
            .get_mut(task_id.as_str())
            .and_then(|mut script| script.next());
        step.unwrap_or_else(|| {
            Err(GatewayError::HttpError {
                status: 404,
                body: format!("task {} not found", task_id),
            })
        })
    }

    async fn open_report_stream(
        &self,
        request: ReportStreamRequest,
    ) -> Result<ReportEventStream, GatewayError> {
        tracing::debug!(
            task_id = %request.task_id,
            disease_name = %request.disease_name,
            "FakeDiagnosisApi: open stream"
        );
        lock(&self.calls).stream_requests.push(request);

        if let Some(err) = &self.stream_error {
            return Err(err.clone());
        }

        let delay = self.event_delay;
        let events = stream::iter(self.stream_events.clone()).then(move |event| async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            event
        });

        if self.stream_held_open {
            Ok(events.chain(stream::pending()).boxed())
        } else {
            Ok(events.boxed())
        }
    }

    async fn save_report(&self, record: DiagnosisRecord) -> Result<SavedReport, GatewayError> {
        if let Some(delay) = self.save_delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = lock(&self.save_error).clone() {
            return Err(err);
        }

        let mut calls = lock(&self.calls);
        calls.saved.push(record);
        Ok(SavedReport {
            report_id: format!("report-{}", calls.saved.len()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_repeats_last_step() {
        let api = FakeDiagnosisApi::new();
        api.script_task(
            "t-1",
            vec![Ok(StatusObservation::pending()), Ok(StatusObservation::progress())],
        );
        let id = TaskId::new("t-1").unwrap();

        assert_eq!(api.task_status(&id).await.unwrap(), StatusObservation::pending());
        assert_eq!(api.task_status(&id).await.unwrap(), StatusObservation::progress());
        assert_eq!(api.task_status(&id).await.unwrap(), StatusObservation::progress());
        assert_eq!(api.status_calls("t-1"), 3);
    }

    #[tokio::test]
    async fn test_unknown_task_is_not_found() {
        let api = FakeDiagnosisApi::new();
        let err = api
            .task_status(&TaskId::new("missing").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::HttpError { status: 404, .. }));
    }
}
