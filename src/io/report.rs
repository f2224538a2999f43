use std::path::Path;

use anyhow::{Context, Result};

use crate::Report;

/// Writes `report` as pretty JSON, creating parent directories as needed.
pub fn write_report(path: &Path, report: &Report) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!("Report written to {}", path.display());
    Ok(())
}
