//! Intake Context - 症状问卷

use serde::{Deserialize, Serialize};

use super::IntakeError;

/// 瘙痒程度上限
pub const MAX_ITCH_LEVEL: u8 = 10;

/// 补充说明最大长度（字符）
pub const MAX_NOTES_LEN: usize = 2000;

/// 症状持续时间区间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationBucket {
    LessThanWeek,
    OneToFourWeeks,
    OneToSixMonths,
    MoreThanSixMonths,
}

impl DurationBucket {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "less_than_week" | "<1w" => Some(Self::LessThanWeek),
            "one_to_four_weeks" | "1-4w" => Some(Self::OneToFourWeeks),
            "one_to_six_months" | "1-6m" => Some(Self::OneToSixMonths),
            "more_than_six_months" | ">6m" => Some(Self::MoreThanSixMonths),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::LessThanWeek => "less than a week",
            Self::OneToFourWeeks => "1 to 4 weeks",
            Self::OneToSixMonths => "1 to 6 months",
            Self::MoreThanSixMonths => "more than 6 months",
        }
    }
}

/// 用户填写的症状问卷
///
/// 提交到下一步后不再修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalInfo {
    pub symptoms: Vec<String>,
    pub itch_level: u8,
    pub duration: DurationBucket,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl AdditionalInfo {
    /// 校验问卷，返回规范化后的副本
    pub fn validated(mut self) -> Result<Self, IntakeError> {
        self.symptoms = self
            .symptoms
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if self.symptoms.is_empty() {
            return Err(IntakeError::MissingField("symptoms"));
        }

        if self.itch_level > MAX_ITCH_LEVEL {
            return Err(IntakeError::InvalidAnswer(format!(
                "瘙痒程度必须在 0 到 {} 之间: {}",
                MAX_ITCH_LEVEL, self.itch_level
            )));
        }

        self.notes = self
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        if let Some(notes) = &self.notes {
            if notes.chars().count() > MAX_NOTES_LEN {
                return Err(IntakeError::InvalidAnswer(format!(
                    "补充说明不能超过 {} 字符",
                    MAX_NOTES_LEN
                )));
            }
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> AdditionalInfo {
        AdditionalInfo {
            symptoms: vec![" itching ".to_string(), "".to_string(), "redness".to_string()],
            itch_level: 6,
            duration: DurationBucket::OneToFourWeeks,
            notes: Some("  ".to_string()),
        }
    }

    #[test]
    fn test_validation_normalizes() {
        let info = info().validated().unwrap();
        assert_eq!(info.symptoms, vec!["itching", "redness"]);
        assert_eq!(info.notes, None);
    }

    #[test]
    fn test_missing_symptoms() {
        let mut info = info();
        info.symptoms = vec!["   ".to_string()];
        assert_eq!(
            info.validated().unwrap_err(),
            IntakeError::MissingField("symptoms")
        );
    }

    #[test]
    fn test_itch_level_bound() {
        let mut info = info();
        info.itch_level = 11;
        assert!(matches!(
            info.validated(),
            Err(IntakeError::InvalidAnswer(_))
        ));
    }

    #[test]
    fn test_notes_too_long() {
        let mut info = info();
        info.notes = Some("x".repeat(MAX_NOTES_LEN + 1));
        assert!(info.validated().is_err());
    }

    #[test]
    fn test_duration_bucket_parsing() {
        assert_eq!(DurationBucket::from_str("1-6m"), Some(DurationBucket::OneToSixMonths));
        assert_eq!(DurationBucket::from_str("forever"), None);

        let json = serde_json::to_string(&DurationBucket::LessThanWeek).unwrap();
        assert_eq!(json, "\"less_than_week\"");
    }
}
