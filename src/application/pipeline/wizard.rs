//! Diagnosis Wizard - 诊断向导编排
//!
//! 串联 上传 -> 问卷 -> 等待（轮询）-> 流式报告 -> 完成 各步骤，
//! 并提供 save / export / restart。
//!
//! 所有异步回调都带着启动时的 epoch，restart 之后 epoch 变化，
//! 迟到的轮询结果或推送事件直接丢弃。

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;

use crate::application::commands::handlers::{
    ExportReportHandler, SaveReportHandler, SubmitAnalysisHandler,
};
use crate::application::commands::{ExportReportCommand, SaveReportCommand, SubmitAnalysisCommand};
use crate::application::error::ApplicationError;
use crate::application::pipeline::poller::{poll_until_terminal, PollHandle, PollSchedule};
use crate::application::pipeline::streamer::{ReportStreamClient, StreamHandle, StreamUpdate};
use crate::application::ports::{
    AuthContext, DiagnosisApiPort, ExportFormat, ReportExporterPort, ReportStreamRequest,
    SavedReport,
};
use crate::domain::analysis::{AnalysisTask, TaskState};
use crate::domain::intake::{AdditionalInfo, ImageUpload};
use crate::domain::report::StreamingReport;
use crate::domain::wizard::{WizardContext, WizardState};

/// 向导配置
#[derive(Debug, Clone)]
pub struct WizardConfig {
    pub poll: PollSchedule,
    /// 报告推送的最长等待时间，None 表示不限制
    pub stream_max_wait: Option<Duration>,
    /// 上传图片大小上限（字节），0 表示不限制
    pub max_image_bytes: u64,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            poll: PollSchedule::default(),
            stream_max_wait: Some(Duration::from_secs(300)),
            max_image_bytes: 10 * 1024 * 1024,
        }
    }
}

/// save() 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(SavedReport),
    /// 本次会话已保存过，未重复写入
    AlreadySaved,
}

/// 向导当前状态的只读快照
#[derive(Debug, Clone)]
pub struct WizardSnapshot {
    pub state: WizardState,
    pub context: WizardContext,
    pub report: StreamingReport,
    pub is_saved: bool,
}

struct WizardInner {
    epoch: u64,
    state: WizardState,
    context: WizardContext,
    report: StreamingReport,
    poller: Option<PollHandle>,
    stream: Option<StreamHandle>,
    submitting: bool,
    is_saved: bool,
}

impl WizardInner {
    fn new() -> Self {
        Self {
            epoch: 0,
            state: WizardState::Upload,
            context: WizardContext::default(),
            report: StreamingReport::new(),
            poller: None,
            stream: None,
            submitting: false,
            is_saved: false,
        }
    }
}

struct Shared {
    api: Arc<dyn DiagnosisApiPort>,
    auth: Arc<dyn AuthContext>,
    config: WizardConfig,
    streamer: ReportStreamClient,
    inner: Mutex<WizardInner>,
    state_tx: watch::Sender<WizardState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, WizardInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 按迁移表切换状态并通知订阅者
    fn transition(&self, inner: &mut WizardInner, next: WizardState) -> bool {
        if !inner.state.can_transition_to(&next) {
            tracing::warn!(
                from = %inner.state,
                to = %next,
                "Ignoring invalid wizard transition"
            );
            return false;
        }
        tracing::info!(from = %inner.state, to = %next, "Wizard transition");
        inner.state = next.clone();
        self.state_tx.send_replace(next);
        true
    }

    fn start_polling(self: &Arc<Self>, inner: &mut WizardInner, task: AnalysisTask) {
        let epoch = inner.epoch;
        let tick_shared = Arc::downgrade(self);
        let done_shared = Arc::downgrade(self);

        let handle = poll_until_terminal(
            self.api.clone(),
            task,
            self.config.poll,
            move |task| Self::on_poll_tick(&tick_shared, epoch, task),
            move |task| Self::on_poll_done(&done_shared, epoch, task),
        );
        inner.poller = Some(handle);
    }

    fn on_poll_tick(weak: &Weak<Self>, epoch: u64, task: &AnalysisTask) {
        let Some(shared) = weak.upgrade() else { return };
        let mut inner = shared.lock();
        if inner.epoch != epoch {
            return;
        }
        inner.context.task = Some(task.clone());
    }

    fn on_poll_done(weak: &Weak<Self>, epoch: u64, task: AnalysisTask) {
        let Some(shared) = weak.upgrade() else { return };
        let mut inner = shared.lock();
        if inner.epoch != epoch {
            tracing::debug!(task_id = %task.task_id(), "Discarding poll result from a previous session");
            return;
        }
        inner.poller = None;

        match task.state() {
            TaskState::Success => {
                let disease_name = task
                    .result()
                    .map(|r| r.disease_name().to_string())
                    .unwrap_or_default();
                let task_id = task.task_id().clone();
                inner.context.task = Some(task);

                if !shared.transition(&mut inner, WizardState::Streaming) {
                    return;
                }
                let Some(user_id) = shared.auth.ready_user() else {
                    shared.transition(
                        &mut inner,
                        WizardState::Error(ApplicationError::Unauthenticated.to_string()),
                    );
                    return;
                };
                let request = ReportStreamRequest {
                    user_id,
                    task_id,
                    disease_name,
                };
                shared.start_streaming(&mut inner, request);
            }
            _ => {
                let message = task
                    .error()
                    .unwrap_or("Analysis failed")
                    .to_string();
                inner.context.task = Some(task);
                shared.transition(&mut inner, WizardState::Error(message));
            }
        }
    }

    fn start_streaming(self: &Arc<Self>, inner: &mut WizardInner, request: ReportStreamRequest) {
        let epoch = inner.epoch;
        let weak = Arc::downgrade(self);
        inner.report = StreamingReport::new();

        match self
            .streamer
            .start(request, move |update| Self::on_stream_update(&weak, epoch, update))
        {
            Some(handle) => inner.stream = Some(handle),
            None => {
                tracing::warn!("Report stream already active, cannot open another");
                self.transition(
                    inner,
                    WizardState::Error("report stream already active".to_string()),
                );
            }
        }
    }

    fn on_stream_update(weak: &Weak<Self>, epoch: u64, update: StreamUpdate) {
        let Some(shared) = weak.upgrade() else { return };
        let mut inner = shared.lock();
        if inner.epoch != epoch {
            return;
        }

        match update {
            StreamUpdate::Progress { section, content } => {
                if let Err(e) = inner.report.append(section, &content) {
                    tracing::warn!(section = %section, error = %e, "Dropping report fragment");
                }
            }
            StreamUpdate::Completed => {
                if let Err(e) = inner.report.complete() {
                    tracing::warn!(error = %e, "Report already complete");
                }
                inner.stream = None;
                shared.transition(&mut inner, WizardState::Complete);
            }
            StreamUpdate::Failed(message) => {
                inner.stream = None;
                shared.transition(&mut inner, WizardState::Error(message));
            }
        }
    }
}

/// 诊断向导
///
/// 身份会话与后端均由外部注入，便于独立测试
pub struct DiagnosisWizard {
    shared: Arc<Shared>,
    submit_handler: SubmitAnalysisHandler,
    save_handler: SaveReportHandler,
    export_handler: ExportReportHandler,
}

impl DiagnosisWizard {
    pub fn new(
        api: Arc<dyn DiagnosisApiPort>,
        auth: Arc<dyn AuthContext>,
        exporter: Arc<dyn ReportExporterPort>,
        config: WizardConfig,
    ) -> Self {
        let (state_tx, _) = watch::channel(WizardState::Upload);
        let streamer = ReportStreamClient::new(api.clone(), config.stream_max_wait);
        let submit_handler =
            SubmitAnalysisHandler::new(api.clone(), auth.clone(), config.max_image_bytes);
        let save_handler = SaveReportHandler::new(api.clone(), auth.clone());
        let export_handler = ExportReportHandler::new(exporter);

        Self {
            shared: Arc::new(Shared {
                api,
                auth,
                config,
                streamer,
                inner: Mutex::new(WizardInner::new()),
                state_tx,
            }),
            submit_handler,
            save_handler,
            export_handler,
        }
    }

    /// 当前状态
    pub fn state(&self) -> WizardState {
        self.shared.lock().state.clone()
    }

    /// 订阅状态变化
    pub fn subscribe(&self) -> watch::Receiver<WizardState> {
        self.shared.state_tx.subscribe()
    }

    pub fn snapshot(&self) -> WizardSnapshot {
        let inner = self.shared.lock();
        WizardSnapshot {
            state: inner.state.clone(),
            context: inner.context.clone(),
            report: inner.report.clone(),
            is_saved: inner.is_saved,
        }
    }

    /// 等待进入 Complete 或 Error
    pub async fn wait_until_settled(&self) -> Result<WizardState, ApplicationError> {
        let mut rx = self.subscribe();
        let state = rx
            .wait_for(|state| state.is_settled())
            .await
            .map_err(|e| ApplicationError::internal(e.to_string()))?;
        Ok(state.clone())
    }

    /// Upload -> Questionnaire
    pub fn select_image(&self, image: ImageUpload) -> Result<(), ApplicationError> {
        image.ensure_within(self.shared.config.max_image_bytes)?;

        let mut inner = self.shared.lock();
        if inner.state != WizardState::Upload {
            return Err(ApplicationError::invalid_state(format!(
                "cannot select an image in {} state",
                inner.state
            )));
        }
        tracing::debug!(file_name = %image.file_name(), size = image.len(), "Image selected");
        inner.context.image = Some(image);
        self.shared.transition(&mut inner, WizardState::Questionnaire);
        Ok(())
    }

    /// Questionnaire -> Waiting，提交任务并开始轮询
    pub async fn submit(
        &self,
        additional_info: Option<AdditionalInfo>,
    ) -> Result<(), ApplicationError> {
        let (image, epoch) = {
            let mut inner = self.shared.lock();
            if inner.state != WizardState::Questionnaire {
                return Err(ApplicationError::invalid_state(format!(
                    "cannot submit in {} state",
                    inner.state
                )));
            }
            if inner.submitting {
                return Err(ApplicationError::invalid_state(
                    "submission already in progress",
                ));
            }
            inner.submitting = true;
            (inner.context.image.clone(), inner.epoch)
        };

        let additional_info = match additional_info.map(|i| i.validated()).transpose() {
            Ok(info) => info,
            Err(e) => {
                self.finish_submitting(epoch);
                return Err(e.into());
            }
        };

        let result = self
            .submit_handler
            .handle(SubmitAnalysisCommand {
                image,
                additional_info: additional_info.clone(),
            })
            .await;

        let mut inner = self.shared.lock();
        if inner.epoch != epoch {
            tracing::debug!("Wizard restarted during submission, discarding task");
            return Err(ApplicationError::invalid_state(
                "wizard was restarted during submission",
            ));
        }
        inner.submitting = false;

        let task = result?;
        inner.context.additional_info = additional_info;
        inner.context.task = Some(task.clone());
        self.shared.transition(&mut inner, WizardState::Waiting);
        self.shared.start_polling(&mut inner, task);
        Ok(())
    }

    fn finish_submitting(&self, epoch: u64) {
        let mut inner = self.shared.lock();
        if inner.epoch == epoch {
            inner.submitting = false;
        }
    }

    /// 保存报告，同一会话最多写入一次
    pub async fn save(&self) -> Result<SaveOutcome, ApplicationError> {
        let (cmd, epoch) = {
            let mut inner = self.shared.lock();
            if inner.state != WizardState::Complete {
                return Err(ApplicationError::invalid_state(format!(
                    "cannot save in {} state",
                    inner.state
                )));
            }
            if inner.is_saved {
                tracing::debug!("Report already saved, skipping");
                return Ok(SaveOutcome::AlreadySaved);
            }
            let cmd = Self::save_command(&inner)?;
            inner.is_saved = true;
            (cmd, inner.epoch)
        };

        match self.save_handler.handle(cmd).await {
            Ok(saved) => Ok(SaveOutcome::Saved(saved)),
            Err(e) => {
                let mut inner = self.shared.lock();
                if inner.epoch == epoch {
                    inner.is_saved = false;
                }
                Err(e)
            }
        }
    }

    fn save_command(inner: &WizardInner) -> Result<SaveReportCommand, ApplicationError> {
        let image = inner
            .context
            .image
            .clone()
            .ok_or_else(|| ApplicationError::internal("completed session has no image"))?;
        let task = inner
            .context
            .task
            .clone()
            .ok_or_else(|| ApplicationError::internal("completed session has no task"))?;
        let report = inner
            .report
            .compose()
            .map_err(|e| ApplicationError::internal(e.to_string()))?;
        Ok(SaveReportCommand {
            image,
            task,
            report,
            additional_info: inner.context.additional_info.clone(),
        })
    }

    /// 导出（下载）报告到本地文件
    pub async fn export(
        &self,
        path: impl Into<PathBuf>,
        format: Option<ExportFormat>,
    ) -> Result<PathBuf, ApplicationError> {
        let cmd = {
            let inner = self.shared.lock();
            if inner.state != WizardState::Complete {
                return Err(ApplicationError::invalid_state(format!(
                    "cannot export in {} state",
                    inner.state
                )));
            }
            let task = inner
                .context
                .task
                .clone()
                .ok_or_else(|| ApplicationError::internal("completed session has no task"))?;
            let report = inner
                .report
                .compose()
                .map_err(|e| ApplicationError::internal(e.to_string()))?;
            ExportReportCommand {
                task,
                report,
                path: path.into(),
                format,
            }
        };

        self.export_handler.handle(cmd).await
    }

    /// 任意状态 -> Upload，清空所有上下文并停止轮询/推送
    pub fn restart(&self) {
        let mut inner = self.shared.lock();
        inner.epoch += 1;

        if let Some(poller) = inner.poller.take() {
            poller.cancel();
        }
        if let Some(stream) = inner.stream.take() {
            stream.close();
        }

        inner.context.clear();
        inner.report = StreamingReport::new();
        inner.submitting = false;
        inner.is_saved = false;
        inner.state = WizardState::Upload;
        self.shared.state_tx.send_replace(WizardState::Upload);

        tracing::info!(epoch = inner.epoch, "Wizard restarted");
    }
}

impl Drop for DiagnosisWizard {
    fn drop(&mut self) {
        let mut inner = self.shared.lock();
        inner.epoch += 1;
        drop(inner.poller.take());
        drop(inner.stream.take());
    }
}
