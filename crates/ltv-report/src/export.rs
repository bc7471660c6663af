//! JSON export of a computed report.

use std::fs;
use std::path::Path;

use ltv_core::Result;
use ltv_data::analysis::AnalysisResult;
use tracing::info;

/// Serialise `result` as pretty JSON.
pub fn report_json(result: &AnalysisResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}

/// Write `result` as pretty JSON to `path`, creating parent directories.
pub fn write_json_report(result: &AnalysisResult, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = report_json(result)?;
    fs::write(path, json)?;
    info!("Wrote JSON report to {}", path.display());
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
