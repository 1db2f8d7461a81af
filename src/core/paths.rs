use crate::error::{Error, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Config file name, looked up in the working directory and the config dir.
pub const CONFIG_FILE: &str = "skillflow.json";

/// Base skillflow config directory (~/.config/skillflow/ on Unix-like systems)
pub fn skillflow() -> Result<PathBuf> {
    #[cfg(windows)]
    {
        let appdata = env::var("APPDATA").map_err(|_| {
            Error::internal_unexpected(
                "APPDATA environment variable not set on Windows".to_string(),
            )
        })?;
        Ok(PathBuf::from(appdata).join("skillflow"))
    }

    #[cfg(not(windows))]
    {
        let home = env::var("HOME").map_err(|_| {
            Error::internal_unexpected(
                "HOME environment variable not set on Unix-like system".to_string(),
            )
        })?;
        Ok(PathBuf::from(home).join(".config").join("skillflow"))
    }
}

/// Global skillflow.json path
pub fn global_config() -> Result<PathBuf> {
    Ok(skillflow()?.join(CONFIG_FILE))
}

/// Project-local skillflow.json path
pub fn local_config(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE)
}

/// Lookup order when no explicit path is given: local, then global.
pub fn config_candidates(dir: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![local_config(dir)];
    if let Ok(global) = global_config() {
        candidates.push(global);
    }
    candidates
}
