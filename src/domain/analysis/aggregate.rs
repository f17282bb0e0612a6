//! Analysis Context - Aggregate Root

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{AnalysisError, TaskId, TaskState};

/// 后端未给出原因时的失败描述
const DEFAULT_FAILURE_MESSAGE: &str = "Analysis failed";

/// 分析结果
///
/// 不变量:
/// - disease_name 非空
/// - confidence 在 0..=100 之间
/// - 附着到终态任务后不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawAnalysisResult")]
pub struct AnalysisResult {
    disease_name: String,
    confidence: f64,
    /// 其余分析字段，原样保留
    #[serde(flatten)]
    details: Map<String, Value>,
}

#[derive(Deserialize)]
struct RawAnalysisResult {
    disease_name: String,
    confidence: f64,
    #[serde(flatten)]
    details: Map<String, Value>,
}

impl TryFrom<RawAnalysisResult> for AnalysisResult {
    type Error = AnalysisError;

    fn try_from(raw: RawAnalysisResult) -> Result<Self, Self::Error> {
        Self::new(raw.disease_name, raw.confidence, raw.details)
    }
}

impl AnalysisResult {
    pub fn new(
        disease_name: impl Into<String>,
        confidence: f64,
        details: Map<String, Value>,
    ) -> Result<Self, AnalysisError> {
        let disease_name = disease_name.into();
        if disease_name.trim().is_empty() {
            return Err(AnalysisError::InvalidResult(
                "disease_name 不能为空".to_string(),
            ));
        }
        if !confidence.is_finite() || !(0.0..=100.0).contains(&confidence) {
            return Err(AnalysisError::InvalidResult(format!(
                "confidence 必须在 0 到 100 之间: {}",
                confidence
            )));
        }
        Ok(Self {
            disease_name,
            confidence,
            details,
        })
    }

    pub fn disease_name(&self) -> &str {
        &self.disease_name
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn details(&self) -> &Map<String, Value> {
        &self.details
    }
}

/// 一次状态查询的观测结果
///
/// 构造时校验形状：SUCCESS 必须携带 result，其余状态不得携带 result
#[derive(Debug, Clone, PartialEq)]
pub struct StatusObservation {
    state: TaskState,
    result: Option<AnalysisResult>,
    error: Option<String>,
}

impl StatusObservation {
    pub fn new(
        state: TaskState,
        result: Option<AnalysisResult>,
        error: Option<String>,
    ) -> Result<Self, AnalysisError> {
        match state {
            TaskState::Success => {
                if result.is_none() {
                    return Err(AnalysisError::InvalidResult(
                        "SUCCESS 状态缺少 result".to_string(),
                    ));
                }
                Ok(Self {
                    state,
                    result,
                    error: None,
                })
            }
            TaskState::Failure => {
                let error = error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());
                Ok(Self {
                    state,
                    result: None,
                    error: Some(error),
                })
            }
            TaskState::Pending | TaskState::Progress => Ok(Self {
                state,
                result: None,
                error: None,
            }),
        }
    }

    pub fn pending() -> Self {
        Self {
            state: TaskState::Pending,
            result: None,
            error: None,
        }
    }

    pub fn progress() -> Self {
        Self {
            state: TaskState::Progress,
            result: None,
            error: None,
        }
    }

    pub fn success(result: AnalysisResult) -> Self {
        Self {
            state: TaskState::Success,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            state: TaskState::Failure,
            result: None,
            error: Some(error.into()),
        }
    }

    pub fn state(&self) -> TaskState {
        self.state
    }
}

/// 分析任务聚合根
///
/// 不变量:
/// - 状态单向演进，终态只进入一次
/// - result 仅在 Success 时存在，error 仅在 Failure 时存在
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisTask {
    task_id: TaskId,
    state: TaskState,
    result: Option<AnalysisResult>,
    error: Option<String>,
    submitted_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl AnalysisTask {
    /// 提交成功后创建的待处理任务
    pub fn pending(task_id: TaskId) -> Self {
        Self {
            task_id,
            state: TaskState::Pending,
            result: None,
            error: None,
            submitted_at: Utc::now(),
            finished_at: None,
        }
    }

    /// 应用一次状态观测
    ///
    /// 返回状态是否发生变化。`Progress` 之后再观测到 `Pending` 不会回退。
    pub fn apply(&mut self, observation: StatusObservation) -> Result<bool, AnalysisError> {
        if self.state.is_terminal() {
            return Err(AnalysisError::AlreadyTerminal {
                task_id: self.task_id.clone(),
                state: self.state,
            });
        }

        match observation.state {
            TaskState::Pending => Ok(false),
            TaskState::Progress => {
                let changed = self.state != TaskState::Progress;
                self.state = TaskState::Progress;
                Ok(changed)
            }
            TaskState::Success | TaskState::Failure => {
                self.state = observation.state;
                self.result = observation.result;
                self.error = observation.error;
                self.finished_at = Some(Utc::now());
                Ok(true)
            }
        }
    }

    /// 在客户端侧将任务标记为失败（例如等待超时）
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), AnalysisError> {
        self.apply(StatusObservation::failure(error)).map(|_| ())
    }

    // Getters
    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result() -> AnalysisResult {
        AnalysisResult::new("Atopic Dermatitis", 87.0, Map::new()).unwrap()
    }

    #[test]
    fn test_result_validation() {
        assert!(AnalysisResult::new("", 50.0, Map::new()).is_err());
        assert!(AnalysisResult::new("Eczema", 100.5, Map::new()).is_err());
        assert!(AnalysisResult::new("Eczema", f64::NAN, Map::new()).is_err());
        assert!(AnalysisResult::new("Eczema", 0.0, Map::new()).is_ok());
    }

    #[test]
    fn test_result_keeps_opaque_fields() {
        let value = json!({
            "disease_name": "Psoriasis",
            "confidence": 72.5,
            "skin_type": {"oiliness": 3}
        });
        let parsed: AnalysisResult = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.disease_name(), "Psoriasis");
        assert_eq!(parsed.details()["skin_type"]["oiliness"], 3);

        let round = serde_json::to_value(&parsed).unwrap();
        assert_eq!(round["skin_type"]["oiliness"], 3);
        assert_eq!(round["confidence"], 72.5);
    }

    #[test]
    fn test_result_rejects_bad_shape() {
        let missing = json!({"confidence": 10});
        assert!(serde_json::from_value::<AnalysisResult>(missing).is_err());

        let out_of_range = json!({"disease_name": "Acne", "confidence": 140});
        assert!(serde_json::from_value::<AnalysisResult>(out_of_range).is_err());
    }

    #[test]
    fn test_observation_shape() {
        assert!(StatusObservation::new(TaskState::Success, None, None).is_err());

        let failure = StatusObservation::new(TaskState::Failure, None, None).unwrap();
        assert_eq!(failure.error.as_deref(), Some(DEFAULT_FAILURE_MESSAGE));

        let pending =
            StatusObservation::new(TaskState::Pending, Some(result()), None).unwrap();
        assert!(pending.result.is_none());
    }

    #[test]
    fn test_task_lifecycle() {
        let mut task = AnalysisTask::pending(TaskId::new("t-1").unwrap());
        assert_eq!(task.state(), TaskState::Pending);

        assert!(!task.apply(StatusObservation::pending()).unwrap());
        assert!(task.apply(StatusObservation::progress()).unwrap());
        assert!(!task.apply(StatusObservation::progress()).unwrap());

        // Pending after Progress does not regress
        assert!(!task.apply(StatusObservation::pending()).unwrap());
        assert_eq!(task.state(), TaskState::Progress);

        assert!(task.apply(StatusObservation::success(result())).unwrap());
        assert_eq!(task.state(), TaskState::Success);
        assert_eq!(task.result().unwrap().disease_name(), "Atopic Dermatitis");
        assert!(task.error().is_none());
        assert!(task.finished_at().is_some());
    }

    #[test]
    fn test_terminal_only_once() {
        let mut task = AnalysisTask::pending(TaskId::new("t-2").unwrap());
        task.fail("backend crashed").unwrap();
        assert_eq!(task.state(), TaskState::Failure);
        assert_eq!(task.error(), Some("backend crashed"));

        let err = task.apply(StatusObservation::success(result())).unwrap_err();
        assert!(matches!(err, AnalysisError::AlreadyTerminal { .. }));
        assert!(task.result().is_none());
    }
}
