use std::path::PathBuf;

use tracing::{debug, info};

/// Which .env files were read, for logging once tracing is up.
#[derive(Debug, Default)]
pub struct DotenvFiles {
    pub loaded: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Load environment variables from .env files
///
/// Priority order (highest to lowest):
/// 1. Environment variables already set
/// 2. Current directory .env (searched upward from the working directory)
/// 3. ~/.dbhandle/.env
///
/// dotenvy never overwrites a variable that is already set, so the first
/// source to define a variable wins. Runs before the subscriber is installed,
/// so nothing is logged here; see [`log_dotenv`].
pub fn load_dotenv() -> DotenvFiles {
    let mut files = DotenvFiles::default();

    if let Ok(path) = dotenvy::dotenv() {
        files.loaded.push(path);
    }

    if let Some(env_file) = config_dir().map(|dir| dir.join(".env")) {
        if env_file.exists() {
            match dotenvy::from_path(&env_file) {
                Ok(()) => files.loaded.push(env_file),
                Err(e) => files.failed.push((env_file, e.to_string())),
            }
        }
    }

    files
}

pub fn log_dotenv(files: &DotenvFiles) {
    for (path, err) in &files.failed {
        debug!("Failed to load {}: {}", path.display(), err);
    }

    if files.loaded.is_empty() {
        debug!("No .env files found (current dir or ~/.dbhandle)");
    } else {
        let paths: Vec<String> = files
            .loaded
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        info!("Loaded configuration from: {}", paths.join(", "));
    }
}

/// Get the dbhandle config directory path (~/.dbhandle)
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".dbhandle"))
}
