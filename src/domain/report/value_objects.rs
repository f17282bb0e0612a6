//! Report Context - Value Objects

use serde::{Deserialize, Serialize};

use super::ReportError;

/// 报告分节
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportSection {
    Summary,
    Description,
    Precautions,
    Management,
}

impl ReportSection {
    pub const ALL: [ReportSection; 4] = [
        ReportSection::Summary,
        ReportSection::Description,
        ReportSection::Precautions,
        ReportSection::Management,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Description => "description",
            Self::Precautions => "precautions",
            Self::Management => "management",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ReportError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "summary" => Ok(Self::Summary),
            "description" => Ok(Self::Description),
            "precautions" => Ok(Self::Precautions),
            "management" => Ok(Self::Management),
            _ => Err(ReportError::UnknownSection(s.to_string())),
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Summary => "Summary",
            Self::Description => "Description",
            Self::Precautions => "Precautions",
            Self::Management => "Management",
        }
    }

    pub(super) fn index(&self) -> usize {
        match self {
            Self::Summary => 0,
            Self::Description => 1,
            Self::Precautions => 2,
            Self::Management => 3,
        }
    }
}

impl std::fmt::Display for ReportSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 推送通道上的单个事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    /// 某一分节的文本片段
    Progress {
        section: ReportSection,
        content: String,
    },
    /// 不再有后续片段
    Complete,
    /// 服务端报告的生成错误
    Error { message: String },
}
