//! Streaming Report Client - 报告推送通道
//!
//! 同一客户端同时最多只有一个活动通道；重复 `start` 是 no-op。
//! 通道出错时直接失败，不做静默重连。

use futures_util::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{DiagnosisApiPort, ReportStreamRequest};
use crate::domain::report::{ReportEvent, ReportSection};

/// 没有活动通道
const NO_STREAM: u64 = 0;

/// 推送给调用方的更新
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamUpdate {
    /// 某分节的新片段（按到达顺序）
    Progress {
        section: ReportSection,
        content: String,
    },
    /// 报告完成
    Completed,
    /// 通道或生成失败
    Failed(String),
}

/// 报告推送客户端
pub struct ReportStreamClient {
    api: Arc<dyn DiagnosisApiPort>,
    /// 当前活动通道的 ID，NO_STREAM 表示空闲
    active: Arc<AtomicU64>,
    next_id: AtomicU64,
    max_wait: Option<Duration>,
}

impl ReportStreamClient {
    pub fn new(api: Arc<dyn DiagnosisApiPort>, max_wait: Option<Duration>) -> Self {
        Self {
            api,
            active: Arc::new(AtomicU64::new(NO_STREAM)),
            next_id: AtomicU64::new(1),
            max_wait,
        }
    }

    /// 是否有通道正在进行
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst) != NO_STREAM
    }

    /// 打开通道并开始接收
    ///
    /// 已有活动通道时返回 None。`on_update` 按事件到达顺序调用，
    /// 最后一次调用一定是 `Completed` 或 `Failed`（除非通道被关闭）。
    /// 丢弃返回的句柄会关闭通道。
    pub fn start<F>(&self, request: ReportStreamRequest, on_update: F) -> Option<StreamHandle>
    where
        F: FnMut(StreamUpdate) + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        if self
            .active
            .compare_exchange(NO_STREAM, id, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!(
                task_id = %request.task_id,
                "Report stream already active, ignoring start"
            );
            return None;
        }

        tracing::info!(
            stream_id = id,
            task_id = %request.task_id,
            disease_name = %request.disease_name,
            "Opening report stream"
        );

        let token = CancellationToken::new();
        tokio::spawn(run_stream(
            self.api.clone(),
            request,
            id,
            self.active.clone(),
            token.clone(),
            self.max_wait,
            on_update,
        ));

        Some(StreamHandle {
            id,
            token,
            active: self.active.clone(),
        })
    }
}

/// 通道句柄
///
/// `close()` 或 drop 后立即释放"进行中"标记。`close()` 返回后不会再开始新的回调；
/// 在多线程运行时上，已经在另一线程执行中的那一次回调仍会执行完毕，
/// 需要严格丢弃的调用方应在回调内自行校验（向导用 epoch 校验）。
#[derive(Debug)]
pub struct StreamHandle {
    id: u64,
    token: CancellationToken,
    active: Arc<AtomicU64>,
}

impl StreamHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn close(&self) {
        if !self.token.is_cancelled() {
            tracing::debug!(stream_id = self.id, "Closing report stream");
        }
        self.token.cancel();
        release(&self.active, self.id);
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// 只释放自己持有的标记，避免误清后来者
fn release(active: &AtomicU64, id: u64) {
    let _ = active.compare_exchange(id, NO_STREAM, Ordering::SeqCst, Ordering::SeqCst);
}

async fn run_stream<F>(
    api: Arc<dyn DiagnosisApiPort>,
    request: ReportStreamRequest,
    id: u64,
    active: Arc<AtomicU64>,
    token: CancellationToken,
    max_wait: Option<Duration>,
    mut on_update: F,
) where
    F: FnMut(StreamUpdate) + Send + 'static,
{
    let outcome = {
        let pump = pump_events(api, request, &token, &mut on_update);
        tokio::select! {
            biased;
            _ = token.cancelled() => None,
            outcome = async {
                match max_wait {
                    Some(limit) => tokio::time::timeout(limit, pump).await.unwrap_or_else(|_| {
                        StreamUpdate::Failed(format!(
                            "Report stream timed out after {}s",
                            limit.as_secs()
                        ))
                    }),
                    None => pump.await,
                }
            } => Some(outcome),
        }
    };

    match outcome {
        Some(update) if !token.is_cancelled() => {
            match &update {
                StreamUpdate::Failed(message) => {
                    tracing::warn!(stream_id = id, error = %message, "Report stream failed")
                }
                _ => tracing::info!(stream_id = id, "Report stream completed"),
            }
            on_update(update);
        }
        _ => tracing::debug!(stream_id = id, "Report stream closed by consumer"),
    }

    release(&active, id);
}

/// 读取事件直到 complete / error / 通道结束，返回终止更新
async fn pump_events<F>(
    api: Arc<dyn DiagnosisApiPort>,
    request: ReportStreamRequest,
    token: &CancellationToken,
    on_update: &mut F,
) -> StreamUpdate
where
    F: FnMut(StreamUpdate) + Send + 'static,
{
    let mut events = match api.open_report_stream(request).await {
        Ok(events) => events,
        Err(e) => return StreamUpdate::Failed(e.to_string()),
    };

    let mut fragments: u64 = 0;
    while let Some(event) = events.next().await {
        match event {
            Ok(ReportEvent::Progress { section, content }) => {
                // 回调前再次检查关闭状态
                if token.is_cancelled() {
                    return StreamUpdate::Failed("Report stream closed".to_string());
                }
                fragments += 1;
                on_update(StreamUpdate::Progress { section, content });
            }
            Ok(ReportEvent::Complete) => {
                tracing::debug!(fragments = fragments, "Report stream signalled completion");
                return StreamUpdate::Completed;
            }
            Ok(ReportEvent::Error { message }) => return StreamUpdate::Failed(message),
            Err(e) => return StreamUpdate::Failed(e.to_string()),
        }
    }

    StreamUpdate::Failed("Report stream ended before completion".to_string())
}
