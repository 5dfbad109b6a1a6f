//! Optional `launchpad.toml` defaults.
//!
//! Looked up in the working directory first, then the platform config dir.
//! Values act as defaults the command line overrides. Unknown fields are
//! tolerated and a file that fails to parse degrades to defaults rather
//! than blocking startup.

use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

#[derive(Debug, Deserialize, Default, Clone)]
pub struct SessionDefaults {
    /// Executable image to load when the command line names none.
    #[serde(default)]
    pub executable: Option<PathBuf>,
    /// Core spec string (`all | n | a:b | a,b,c`) applied when `-c` is absent.
    #[serde(default)]
    pub cores: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct FileDefaults {
    #[serde(default)]
    pub session: SessionDefaults,
}

/// Best-effort config path following platform conventions.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("launchpad.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("launchpad").join("launchpad.toml");
    }
    PathBuf::from("launchpad.toml")
}

pub fn load_from(path: Option<PathBuf>) -> FileDefaults {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        return FileDefaults::default();
    };
    match toml::from_str::<FileDefaults>(&content) {
        Ok(file) => {
            info!(target: "config", file = %path.display(), "defaults_loaded");
            file
        }
        Err(e) => {
            warn!(target: "config", file = %path.display(), error = %e, "defaults_parse_failed");
            FileDefaults::default()
        }
    }
}
