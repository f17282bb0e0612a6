//! Report Context - Aggregate Root

use serde::{Deserialize, Serialize};

use super::{ReportError, ReportEvent, ReportSection};

/// 流式拼装中的报告
///
/// 不变量:
/// - 各分节内容只追加、不覆盖
/// - 收到 complete 后冻结，之后的追加被拒绝
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamingReport {
    sections: [String; 4],
    active: Option<ReportSection>,
    complete: bool,
}

impl StreamingReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加片段并切换当前活动分节
    pub fn append(&mut self, section: ReportSection, fragment: &str) -> Result<(), ReportError> {
        if self.complete {
            return Err(ReportError::AlreadyComplete);
        }
        self.sections[section.index()].push_str(fragment);
        self.active = Some(section);
        Ok(())
    }

    /// 冻结报告
    pub fn complete(&mut self) -> Result<(), ReportError> {
        if self.complete {
            return Err(ReportError::AlreadyComplete);
        }
        self.complete = true;
        Ok(())
    }

    /// 应用推送事件；Error 事件不改变报告
    pub fn apply(&mut self, event: &ReportEvent) -> Result<(), ReportError> {
        match event {
            ReportEvent::Progress { section, content } => self.append(*section, content),
            ReportEvent::Complete => self.complete(),
            ReportEvent::Error { .. } => Ok(()),
        }
    }

    pub fn section(&self, section: ReportSection) -> &str {
        &self.sections[section.index()]
    }

    pub fn active_section(&self) -> Option<ReportSection> {
        self.active
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(String::is_empty)
    }

    /// 取出已完成报告的快照
    pub fn compose(&self) -> Result<ComposedReport, ReportError> {
        if !self.complete {
            return Err(ReportError::NotComplete);
        }
        Ok(ComposedReport {
            summary: self.section(ReportSection::Summary).to_string(),
            description: self.section(ReportSection::Description).to_string(),
            precautions: self.section(ReportSection::Precautions).to_string(),
            management: self.section(ReportSection::Management).to_string(),
        })
    }
}

/// 完成后的报告（保存/导出用）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposedReport {
    pub summary: String,
    pub description: String,
    pub precautions: String,
    pub management: String,
}

impl ComposedReport {
    pub fn section(&self, section: ReportSection) -> &str {
        match section {
            ReportSection::Summary => &self.summary,
            ReportSection::Description => &self.description,
            ReportSection::Precautions => &self.precautions,
            ReportSection::Management => &self.management,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(section: ReportSection, content: &str) -> ReportEvent {
        ReportEvent::Progress {
            section,
            content: content.to_string(),
        }
    }

    #[test]
    fn test_append_only_in_event_order() {
        let events = vec![
            progress(ReportSection::Summary, "Likely "),
            progress(ReportSection::Precautions, "Avoid hot water. "),
            progress(ReportSection::Summary, "atopic "),
            progress(ReportSection::Precautions, "Moisturize."),
            progress(ReportSection::Summary, "dermatitis."),
        ];

        let mut report = StreamingReport::new();
        for event in &events {
            report.apply(event).unwrap();
        }

        for section in ReportSection::ALL {
            let expected: String = events
                .iter()
                .filter_map(|e| match e {
                    ReportEvent::Progress { section: s, content } if *s == section => {
                        Some(content.as_str())
                    }
                    _ => None,
                })
                .collect();
            assert_eq!(report.section(section), expected);
        }
        assert_eq!(report.active_section(), Some(ReportSection::Summary));
    }

    #[test]
    fn test_frozen_after_complete() {
        let mut report = StreamingReport::new();
        report.append(ReportSection::Management, "Rest.").unwrap();
        report.apply(&ReportEvent::Complete).unwrap();

        assert_eq!(
            report.append(ReportSection::Management, " More."),
            Err(ReportError::AlreadyComplete)
        );
        assert_eq!(report.section(ReportSection::Management), "Rest.");

        let composed = report.compose().unwrap();
        assert_eq!(composed.management, "Rest.");
        assert_eq!(composed.section(ReportSection::Summary), "");
    }

    #[test]
    fn test_compose_requires_complete() {
        let mut report = StreamingReport::new();
        assert!(report.is_empty());
        report.append(ReportSection::Summary, "x").unwrap();
        assert_eq!(report.compose(), Err(ReportError::NotComplete));
    }
}
