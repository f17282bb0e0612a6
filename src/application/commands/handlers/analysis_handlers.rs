//! Analysis Command Handlers

use std::sync::Arc;

use crate::application::commands::SubmitAnalysisCommand;
use crate::application::error::ApplicationError;
use crate::application::ports::{AuthContext, DiagnosisApiPort, SubmitAnalysisRequest};
use crate::domain::analysis::AnalysisTask;
use crate::domain::intake::IntakeError;

/// SubmitAnalysis Handler - 上传图片并创建后端任务
///
/// 校验失败不会发起网络请求；网络错误直接上抛，不重试
pub struct SubmitAnalysisHandler {
    api: Arc<dyn DiagnosisApiPort>,
    auth: Arc<dyn AuthContext>,
    max_image_bytes: u64,
}

impl SubmitAnalysisHandler {
    pub fn new(
        api: Arc<dyn DiagnosisApiPort>,
        auth: Arc<dyn AuthContext>,
        max_image_bytes: u64,
    ) -> Self {
        Self {
            api,
            auth,
            max_image_bytes,
        }
    }

    pub async fn handle(&self, cmd: SubmitAnalysisCommand) -> Result<AnalysisTask, ApplicationError> {
        let image = cmd.image.ok_or(IntakeError::MissingImage)?;
        image.ensure_within(self.max_image_bytes)?;

        let additional_info = cmd
            .additional_info
            .map(|info| info.validated())
            .transpose()?;

        let user_id = self
            .auth
            .ready_user()
            .ok_or(ApplicationError::Unauthenticated)?;

        tracing::info!(
            user_id = %user_id,
            file_name = %image.file_name(),
            image_size = image.len(),
            has_questionnaire = additional_info.is_some(),
            "Submitting analysis"
        );

        let task_id = self
            .api
            .submit_analysis(SubmitAnalysisRequest {
                user_id,
                image,
                additional_info,
            })
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Analysis submission failed");
                ApplicationError::from(e)
            })?;

        tracing::info!(task_id = %task_id, "Analysis task created");
        Ok(AnalysisTask::pending(task_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::GatewayError;
    use crate::domain::analysis::TaskState;
    use crate::domain::intake::{AdditionalInfo, DurationBucket, ImageUpload};
    use crate::infrastructure::adapters::FakeDiagnosisApi;
    use crate::infrastructure::memory::InMemoryAuthSession;

    fn image() -> ImageUpload {
        ImageUpload::new("arm.jpg", vec![0xFF, 0xD8, 0xFF]).unwrap()
    }

    fn handler(api: Arc<FakeDiagnosisApi>, auth: InMemoryAuthSession) -> SubmitAnalysisHandler {
        SubmitAnalysisHandler::new(api, Arc::new(auth), 1024)
    }

    #[tokio::test]
    async fn test_submit_returns_pending_task() {
        let api = Arc::new(FakeDiagnosisApi::new());
        let handler = handler(api.clone(), InMemoryAuthSession::signed_in("user-1"));

        let task = handler
            .handle(SubmitAnalysisCommand {
                image: Some(image()),
                additional_info: Some(AdditionalInfo {
                    symptoms: vec!["itching".to_string()],
                    itch_level: 4,
                    duration: DurationBucket::LessThanWeek,
                    notes: None,
                }),
            })
            .await
            .unwrap();

        assert_eq!(task.state(), TaskState::Pending);
        assert_eq!(api.submit_calls(), 1);
        let submitted = api.last_submission().unwrap();
        assert_eq!(submitted.user_id, "user-1");
        assert!(submitted.additional_info.is_some());
    }

    #[tokio::test]
    async fn test_validation_never_reaches_network() {
        let api = Arc::new(FakeDiagnosisApi::new());
        let handler = handler(api.clone(), InMemoryAuthSession::signed_in("user-1"));

        let missing = handler
            .handle(SubmitAnalysisCommand {
                image: None,
                additional_info: None,
            })
            .await;
        assert!(matches!(missing, Err(ApplicationError::ValidationError(_))));

        let bad_questionnaire = handler
            .handle(SubmitAnalysisCommand {
                image: Some(image()),
                additional_info: Some(AdditionalInfo {
                    symptoms: vec![],
                    itch_level: 4,
                    duration: DurationBucket::LessThanWeek,
                    notes: None,
                }),
            })
            .await;
        assert!(matches!(
            bad_questionnaire,
            Err(ApplicationError::ValidationError(_))
        ));

        let too_large = handler
            .handle(SubmitAnalysisCommand {
                image: Some(ImageUpload::new("big.png", vec![0; 2048]).unwrap()),
                additional_info: None,
            })
            .await;
        assert!(matches!(too_large, Err(ApplicationError::ValidationError(_))));

        assert_eq!(api.submit_calls(), 0);
    }

    #[tokio::test]
    async fn test_requires_ready_auth() {
        let api = Arc::new(FakeDiagnosisApi::new());
        let handler = handler(api.clone(), InMemoryAuthSession::new());

        let result = handler
            .handle(SubmitAnalysisCommand {
                image: Some(image()),
                additional_info: None,
            })
            .await;
        assert!(matches!(result, Err(ApplicationError::Unauthenticated)));
        assert_eq!(api.submit_calls(), 0);
    }

    #[tokio::test]
    async fn test_network_error_surfaces_without_retry() {
        let api = Arc::new(FakeDiagnosisApi::new().with_submit_error(GatewayError::Timeout));
        let handler = handler(api.clone(), InMemoryAuthSession::signed_in("user-1"));

        let result = handler
            .handle(SubmitAnalysisCommand {
                image: Some(image()),
                additional_info: None,
            })
            .await;
        assert!(matches!(
            result,
            Err(ApplicationError::ExternalServiceError(GatewayError::Timeout))
        ));
        assert_eq!(api.submit_calls(), 1);
    }
}
