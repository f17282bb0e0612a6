//! DermaLens - 皮肤诊断流程命令行客户端
//!
//! 上传图片 -> 问卷 -> 等待分析 -> 接收报告 -> 保存/导出

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use dermalens::application::pipeline::{DiagnosisWizard, SaveOutcome};
use dermalens::application::ports::ExportFormat;
use dermalens::config::{load_config, load_config_from_path, print_config, AppConfig};
use dermalens::domain::intake::{AdditionalInfo, DurationBucket, ImageUpload};
use dermalens::domain::report::ReportSection;
use dermalens::domain::wizard::WizardState;
use dermalens::infrastructure::adapters::{FileReportExporter, HttpDiagnosisClient};
use dermalens::infrastructure::memory::InMemoryAuthSession;

/// Submit a skin photo for analysis and stream the diagnosis report.
#[derive(Debug, Parser)]
#[command(name = "dermalens", version, about)]
struct Cli {
    /// Image to analyse (jpg, png or webp)
    image: PathBuf,

    /// User the diagnosis belongs to
    #[arg(long)]
    user_id: String,

    /// Configuration file (defaults to dermalens.toml in the working directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Symptom observed (repeatable); enables the questionnaire
    #[arg(long = "symptom")]
    symptoms: Vec<String>,

    /// Itch level from 0 to 10
    #[arg(long, default_value_t = 0)]
    itch_level: u8,

    /// How long the symptoms have lasted: <1w, 1-4w, 1-6m, >6m
    #[arg(long)]
    duration: Option<String>,

    /// Free-form notes for the questionnaire
    #[arg(long)]
    notes: Option<String>,

    /// Save the completed report to the backend
    #[arg(long)]
    save: bool,

    /// Write the completed report to a local file
    #[arg(long)]
    export: Option<PathBuf>,

    /// Export format (json or markdown); inferred from the file extension if omitted
    #[arg(long)]
    format: Option<String>,
}

impl Cli {
    /// 未给出任何症状时跳过问卷
    fn questionnaire(&self) -> anyhow::Result<Option<AdditionalInfo>> {
        if self.symptoms.is_empty() {
            return Ok(None);
        }
        let duration = self
            .duration
            .as_deref()
            .context("--duration is required when symptoms are given")?;
        let duration = DurationBucket::from_str(duration)
            .with_context(|| format!("unknown duration: {}", duration))?;
        Ok(Some(AdditionalInfo {
            symptoms: self.symptoms.clone(),
            itch_level: self.itch_level,
            duration,
            notes: self.notes.clone(),
        }))
    }
}

fn init_tracing(config: &AppConfig) {
    let log_filter = format!("{},dermalens={}", config.log.level, config.log.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn read_image(path: &Path) -> anyhow::Result<ImageUpload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    Ok(ImageUpload::new(file_name, bytes)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = match &cli.config {
        Some(path) => load_config_from_path(Some(path.as_path())),
        None => load_config(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);
    tracing::info!("DermaLens - 皮肤诊断客户端");
    print_config(&config);

    let questionnaire = cli.questionnaire()?;
    let export_format = cli
        .format
        .as_deref()
        .map(ExportFormat::from_str)
        .transpose()?;
    let image = read_image(&cli.image).await?;

    let api = Arc::new(HttpDiagnosisClient::new(config.api.client_config())?);
    let auth = InMemoryAuthSession::signed_in(cli.user_id.clone()).arc();
    let wizard = DiagnosisWizard::new(
        api,
        auth,
        Arc::new(FileReportExporter::new()),
        config.wizard_config(),
    );

    // 状态变化写到日志
    let mut states = wizard.subscribe();
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = states.borrow_and_update().clone();
            tracing::info!(state = %state, "Wizard state changed");
        }
    });

    wizard.select_image(image)?;
    wizard.submit(questionnaire).await?;

    let settled = tokio::select! {
        settled = wizard.wait_until_settled() => settled?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received interrupt, abandoning session");
            wizard.restart();
            return Ok(());
        }
    };

    if let WizardState::Error(message) = settled {
        anyhow::bail!("diagnosis failed: {}", message);
    }

    let snapshot = wizard.snapshot();
    if let Some(result) = snapshot.context.result() {
        println!(
            "# {} ({:.1}%)",
            result.disease_name(),
            result.confidence()
        );
    }
    for section in ReportSection::ALL {
        let text = snapshot.report.section(section).trim();
        if !text.is_empty() {
            println!("\n## {}\n\n{}", section.title(), text);
        }
    }

    if cli.save {
        match wizard.save().await? {
            SaveOutcome::Saved(saved) => {
                tracing::info!(report_id = %saved.report_id, "Report saved");
                eprintln!("saved report {}", saved.report_id);
            }
            SaveOutcome::AlreadySaved => tracing::info!("Report already saved"),
        }
    }

    if let Some(path) = &cli.export {
        let written = wizard.export(path.clone(), export_format).await?;
        eprintln!("exported report to {}", written.display());
    }

    Ok(())
}
