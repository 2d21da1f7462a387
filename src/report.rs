use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::models::Decision;
use crate::render::render_report_markdown;

pub struct Report {
    pub artifact_json: String,
    pub narrative: String,
}

#[derive(Debug, Clone)]
pub struct PersistedReport {
    pub artifact_path: PathBuf,
    pub report_path: PathBuf,
}

/// Lossless JSON of the whole decision plus the markdown narrative.
pub fn synthesize(decision: &Decision, source_kinds: &[&str]) -> Result<Report> {
    let artifact_json =
        serde_json::to_string_pretty(decision).context("serializing decision artifact")?;
    let narrative = render_report_markdown(decision, source_kinds);
    Ok(Report {
        artifact_json,
        narrative,
    })
}

/// Writes `analysis_<run_id>.json` and `report_<run_id>.md`. Each file goes
/// through a temp file in the same directory and an atomic rename, so an
/// interrupted run never leaves a half-written artifact.
pub fn persist(report: &Report, output_dir: &Path, run_id: &str) -> Result<PersistedReport> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("create {}", output_dir.display()))?;

    let artifact_path = output_dir.join(format!("analysis_{}.json", run_id));
    let report_path = output_dir.join(format!("report_{}.md", run_id));

    write_atomic(&artifact_path, report.artifact_json.as_bytes())?;
    debug!("Wrote {}", artifact_path.display());
    write_atomic(&report_path, report.narrative.as_bytes())?;
    debug!("Wrote {}", report_path.display());

    Ok(PersistedReport {
        artifact_path,
        report_path,
    })
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("create temp file in {}", dir.display()))?;
    tmp.write_all(bytes)
        .with_context(|| format!("write {}", path.display()))?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .with_context(|| format!("rename into {}", path.display()))?;
    Ok(())
}
