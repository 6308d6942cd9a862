//! Report sinks: console text or JSON, to stdout or a file

use std::io::Write;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::info;

use super::types::RunReport;

/// Output format of the final report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Report sink configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub format: ReportFormat,
    /// Write the report here instead of stdout
    pub path: Option<PathBuf>,
}

fn render(report: &RunReport, format: ReportFormat) -> String {
    match format {
        ReportFormat::Text => report.summary(),
        ReportFormat::Json => report.to_json(),
    }
}

/// Write the report where `config` says
pub fn emit(report: &RunReport, config: &ReportConfig) -> std::io::Result<()> {
    let body = render(report, config.format);
    match &config.path {
        Some(path) => {
            std::fs::write(path, body)?;
            info!("Report written to {:?}", path);
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", body)?;
        }
    }
    Ok(())
}
