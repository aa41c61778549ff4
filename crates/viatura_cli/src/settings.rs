//! Resolves fleet settings from defaults, an optional JSON file and flags.

use crate::args::CommandLine;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use viatura_core::FleetConfig;

/// Builds the effective config: defaults, then file, then CLI overrides.
pub fn resolve_config(cli: &CommandLine) -> Result<FleetConfig> {
    let mut config = match cli.config.as_deref() {
        Some(path) => load_config_file(path)?,
        None => FleetConfig::default(),
    };
    if let Some(value) = cli.max_operators {
        config.max_operators_per_vehicle = value;
    }
    if let Some(value) = cli.default_threshold {
        config.default_material_threshold = value;
    }
    config.validate().context("invalid fleet configuration")?;
    Ok(config)
}

fn load_config_file(path: &Path) -> Result<FleetConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path)),
        other => anyhow::bail!("unsupported config extension: {other}"),
    }
}

/// Absolute log directory; relative input is anchored at the working directory.
pub fn resolve_log_dir(requested: Option<&Path>) -> Result<PathBuf> {
    let dir = match requested {
        Some(path) => path.to_path_buf(),
        None => std::env::temp_dir().join("viatura").join("logs"),
    };
    if dir.is_absolute() {
        return Ok(dir);
    }
    let cwd = std::env::current_dir().context("failed to read working directory")?;
    Ok(cwd.join(dir))
}
