//! Report and DKIM-config persistence.

use std::fs;
use std::path::{Path, PathBuf};

use mailguard_core::{DesiredDkimConfig, GuardError, Result, RunReport};
use tracing::{debug, info};

/// Load the desired DKIM mapping; a missing file is an empty mapping
pub fn load_dkim_config(path: &Path) -> Result<DesiredDkimConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "no DKIM configuration file, starting empty");
        return Ok(DesiredDkimConfig::new());
    }
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(DesiredDkimConfig::new());
    }
    Ok(serde_json::from_str(&content)?)
}

/// Write the desired DKIM mapping, domains and selectors in alphabetical order
pub fn save_dkim_config(path: &Path, config: &DesiredDkimConfig) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut content = serde_json::to_string_pretty(config)?;
    content.push('\n');
    fs::write(path, content)?;
    info!(path = %path.display(), domains = config.len(), "DKIM configuration saved");
    Ok(())
}

/// Write a run report as `mailguard-<UTC timestamp>.json` under `dir`
pub fn write_report(dir: &Path, report: &RunReport) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let name = format!("mailguard-{}.json", report.generated_at.format("%Y%m%dT%H%M%SZ"));
    let path = dir.join(name);
    let content = serde_json::to_string_pretty(report)?;
    fs::write(&path, content).map_err(|e| {
        GuardError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {e}", path.display()),
        ))
    })?;
    info!(path = %path.display(), "report written");
    Ok(path)
}
