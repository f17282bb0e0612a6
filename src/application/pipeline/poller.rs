//! Task Status Poller - 轮询后端任务直到终态
//!
//! 轮询策略:
//! 1. 立即发起第一次查询
//! 2. 非终态时按自适应间隔再次查询：前 `slow_phase` 内用 `slow_interval`，之后用 `fast_interval`
//! 3. 传输错误视为"仍在进行中"，记录日志后按同一间隔重试
//! 4. 终态只回调一次，之后不再查询
//! 5. 超过 `max_wait` 时以超时失败结束

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::application::ports::DiagnosisApiPort;
use crate::domain::analysis::AnalysisTask;

/// 自适应轮询间隔
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    /// 慢速阶段的间隔
    pub slow_interval: Duration,
    /// 慢速阶段结束后的间隔
    pub fast_interval: Duration,
    /// 慢速阶段时长（从开始轮询算起）
    pub slow_phase: Duration,
    /// 最长等待时间，None 表示不限制
    pub max_wait: Option<Duration>,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            slow_interval: Duration::from_secs(2),
            fast_interval: Duration::from_secs(1),
            slow_phase: Duration::from_secs(4),
            max_wait: Some(Duration::from_secs(600)),
        }
    }
}

impl PollSchedule {
    /// 根据已经过的时间选择下一次轮询前的等待时长
    pub fn interval_at(&self, elapsed: Duration) -> Duration {
        if elapsed < self.slow_phase {
            self.slow_interval
        } else {
            self.fast_interval
        }
    }
}

/// 轮询句柄
///
/// `cancel()` 或 drop 之后不会再发起查询，也不会再触发回调
#[derive(Debug)]
pub struct PollHandle {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl PollHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// 启动轮询
///
/// - `on_tick`: 每次观测到非终态后调用
/// - `on_done`: 任务进入终态（含超时失败）时调用且仅调用一次
pub fn poll_until_terminal<T, D>(
    api: Arc<dyn DiagnosisApiPort>,
    task: AnalysisTask,
    schedule: PollSchedule,
    on_tick: T,
    on_done: D,
) -> PollHandle
where
    T: Fn(&AnalysisTask) + Send + 'static,
    D: FnOnce(AnalysisTask) + Send + 'static,
{
    let token = CancellationToken::new();
    let join = tokio::spawn(run_poll_loop(
        api,
        task,
        schedule,
        token.clone(),
        on_tick,
        on_done,
    ));
    PollHandle { token, join }
}

async fn run_poll_loop<T, D>(
    api: Arc<dyn DiagnosisApiPort>,
    mut task: AnalysisTask,
    schedule: PollSchedule,
    token: CancellationToken,
    on_tick: T,
    on_done: D,
) where
    T: Fn(&AnalysisTask) + Send + 'static,
    D: FnOnce(AnalysisTask) + Send + 'static,
{
    let started = Instant::now();
    let mut attempts: u32 = 0;

    tracing::debug!(task_id = %task.task_id(), "Polling started");

    loop {
        attempts += 1;
        let response = tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::debug!(task_id = %task.task_id(), "Polling cancelled in flight");
                return;
            }
            response = api.task_status(task.task_id()) => response,
        };

        // 查询返回前已被取消：丢弃结果
        if token.is_cancelled() {
            tracing::debug!(task_id = %task.task_id(), "Dropping stale poll response");
            return;
        }

        match response {
            Ok(observation) => match task.apply(observation) {
                Ok(_) if task.is_terminal() => {
                    tracing::info!(
                        task_id = %task.task_id(),
                        state = %task.state(),
                        attempts = attempts,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Task reached terminal state"
                    );
                    on_done(task);
                    return;
                }
                Ok(changed) => {
                    if changed {
                        tracing::debug!(
                            task_id = %task.task_id(),
                            state = %task.state(),
                            "Task state changed"
                        );
                    }
                    on_tick(&task);
                }
                Err(e) => {
                    tracing::error!(task_id = %task.task_id(), error = %e, "Rejected status observation");
                    return;
                }
            },
            Err(e) => {
                tracing::warn!(
                    task_id = %task.task_id(),
                    attempt = attempts,
                    error = %e,
                    "Status poll failed, will retry"
                );
            }
        }

        let elapsed = started.elapsed();
        if let Some(max_wait) = schedule.max_wait {
            if elapsed >= max_wait {
                tracing::warn!(
                    task_id = %task.task_id(),
                    max_wait_secs = max_wait.as_secs(),
                    "Gave up waiting for analysis"
                );
                let message = format!(
                    "Timed out after {}s waiting for the analysis to finish",
                    max_wait.as_secs()
                );
                if let Err(e) = task.fail(message) {
                    tracing::error!(task_id = %task.task_id(), error = %e, "Failed to mark task as timed out");
                    return;
                }
                on_done(task);
                return;
            }
        }

        let delay = schedule.interval_at(elapsed);
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::debug!(task_id = %task.task_id(), "Polling cancelled");
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::GatewayError;
    use crate::domain::analysis::{AnalysisResult, StatusObservation, TaskId, TaskState};
    use crate::infrastructure::adapters::FakeDiagnosisApi;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    fn task(id: &str) -> AnalysisTask {
        AnalysisTask::pending(TaskId::new(id).unwrap())
    }

    fn success() -> StatusObservation {
        StatusObservation::success(
            AnalysisResult::new("Atopic Dermatitis", 87.0, Default::default()).unwrap(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_callback_fires_once() {
        let api = Arc::new(FakeDiagnosisApi::new());
        api.script_task(
            "t-1",
            vec![
                Ok(StatusObservation::pending()),
                Ok(StatusObservation::progress()),
                Ok(StatusObservation::progress()),
                Ok(success()),
            ],
        );

        let ticks = Arc::new(AtomicUsize::new(0));
        let ticks_cb = ticks.clone();
        let (done_tx, done_rx) = oneshot::channel();

        let handle = poll_until_terminal(
            api.clone(),
            task("t-1"),
            PollSchedule::default(),
            move |_| {
                ticks_cb.fetch_add(1, Ordering::SeqCst);
            },
            move |task| {
                let _ = done_tx.send(task);
            },
        );

        let done = done_rx.await.unwrap();
        assert_eq!(done.state(), TaskState::Success);
        assert_eq!(done.result().unwrap().disease_name(), "Atopic Dermatitis");
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert_eq!(api.status_calls("t-1"), 4);

        // 终态后不再轮询
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(api.status_calls("t-1"), 4);
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_reports_backend_error() {
        let api = Arc::new(FakeDiagnosisApi::new());
        api.script_task(
            "t-2",
            vec![
                Ok(StatusObservation::progress()),
                Ok(StatusObservation::failure("image unreadable")),
            ],
        );

        let (done_tx, done_rx) = oneshot::channel();
        let _handle = poll_until_terminal(
            api.clone(),
            task("t-2"),
            PollSchedule::default(),
            |_| {},
            move |task| {
                let _ = done_tx.send(task);
            },
        );

        let done = done_rx.await.unwrap();
        assert_eq!(done.state(), TaskState::Failure);
        assert_eq!(done.error(), Some("image unreadable"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_adaptive_interval() {
        let api = Arc::new(FakeDiagnosisApi::new());
        api.script_task(
            "t-3",
            vec![
                Ok(StatusObservation::pending()),
                Ok(StatusObservation::progress()),
                Ok(StatusObservation::progress()),
                Ok(StatusObservation::progress()),
                Ok(StatusObservation::progress()),
                Ok(success()),
            ],
        );

        let (done_tx, done_rx) = oneshot::channel();
        let _handle = poll_until_terminal(
            api.clone(),
            task("t-3"),
            PollSchedule::default(),
            |_| {},
            move |task| {
                let _ = done_tx.send(task);
            },
        );
        done_rx.await.unwrap();

        let times = api.status_call_times("t-3");
        let gaps: Vec<u64> = times
            .windows(2)
            .map(|w| (w[1] - w[0]).as_millis() as u64)
            .collect();
        // 0s, 2s, 4s 之后切换到 1s 间隔
        assert_eq!(gaps, vec![2000, 2000, 1000, 1000, 1000]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_errors_are_retried() {
        let api = Arc::new(FakeDiagnosisApi::new());
        api.script_task(
            "t-4",
            vec![
                Err(GatewayError::NetworkError("connection reset".to_string())),
                Err(GatewayError::Timeout),
                Ok(success()),
            ],
        );

        let (done_tx, done_rx) = oneshot::channel();
        let _handle = poll_until_terminal(
            api.clone(),
            task("t-4"),
            PollSchedule::default(),
            |_| {},
            move |task| {
                let _ = done_tx.send(task);
            },
        );

        let done = done_rx.await.unwrap();
        assert_eq!(done.state(), TaskState::Success);
        assert_eq!(api.status_calls("t-4"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_suppresses_in_flight_response() {
        let api = Arc::new(FakeDiagnosisApi::new().with_status_delay(Duration::from_secs(3)));
        api.script_task("t-5", vec![Ok(success())]);

        let fired = Arc::new(Mutex::new(false));
        let fired_cb = fired.clone();
        let handle = poll_until_terminal(
            api.clone(),
            task("t-5"),
            PollSchedule::default(),
            |_| {},
            move |_| {
                *fired_cb.lock().unwrap() = true;
            },
        );

        // 第一次查询已发出，但尚未返回
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(api.status_calls("t-5"), 1);
        handle.cancel();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!*fired.lock().unwrap());
        assert_eq!(api.status_calls("t-5"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_wait_turns_into_failure() {
        let api = Arc::new(FakeDiagnosisApi::new());
        api.script_task("t-6", vec![Ok(StatusObservation::progress())]);

        let schedule = PollSchedule {
            max_wait: Some(Duration::from_secs(10)),
            ..PollSchedule::default()
        };
        let (done_tx, done_rx) = oneshot::channel();
        let _handle = poll_until_terminal(
            api.clone(),
            task("t-6"),
            schedule,
            |_| {},
            move |task| {
                let _ = done_tx.send(task);
            },
        );

        let done = done_rx.await.unwrap();
        assert_eq!(done.state(), TaskState::Failure);
        assert!(done.error().unwrap().contains("Timed out"));
    }

    #[test]
    fn test_interval_at() {
        let schedule = PollSchedule::default();
        assert_eq!(schedule.interval_at(Duration::ZERO), Duration::from_secs(2));
        assert_eq!(
            schedule.interval_at(Duration::from_millis(3999)),
            Duration::from_secs(2)
        );
        assert_eq!(
            schedule.interval_at(Duration::from_secs(4)),
            Duration::from_secs(1)
        );
    }
}
