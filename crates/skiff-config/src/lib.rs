pub mod error;
pub mod settings;

pub use error::*;
pub use settings::{MetadataItem, MetadataSettings, PollSettings, Settings};

use std::path::PathBuf;
use tracing::debug;

const CANDIDATES: [&str; 4] = [
    "skiff.local.yaml",
    ".skiff.local.yaml",
    "skiff.yaml",
    ".skiff.yaml",
];

/// Global configuration directory (`~/.config/skiff`)
pub fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("skiff"))
}

/// Find the skiff configuration file
///
/// Search order:
/// 1. `SKIFF_CONFIG_PATH` (direct path)
/// 2. current directory: skiff.local.yaml, .skiff.local.yaml, skiff.yaml, .skiff.yaml
/// 3. `./.skiff/` with the same names
/// 4. `~/.config/skiff/skiff.yaml` (global)
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var("SKIFF_CONFIG_PATH") {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;

    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let skiff_dir = current_dir.join(".skiff");
    if skiff_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = skiff_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    if let Some(config_dir) = get_config_dir() {
        let global_config = config_dir.join("skiff.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

/// Load settings from the discovered file (defaults if there is none) and
/// apply environment overrides.
pub fn load() -> Result<Settings> {
    let mut settings = match find_config_file() {
        Ok(path) => Settings::load_from(&path)?,
        Err(ConfigError::ConfigFileNotFound) => {
            debug!("No configuration file found, using defaults");
            Settings::default()
        }
        Err(e) => return Err(e),
    };
    settings.apply_env_overrides()?;
    Ok(settings)
}
