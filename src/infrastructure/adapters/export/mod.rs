//! Export Adapter - 报告本地导出实现

mod file_exporter;

pub use file_exporter::FileReportExporter;
