// src/infra/paths.rs - Config path resolution
//
// DOJO_HOME overrides everything. Otherwise config lives in ~/.dojo/.

use std::path::PathBuf;

fn dojo_home() -> Option<PathBuf> {
    std::env::var_os("DOJO_HOME").map(PathBuf::from)
}

/// Configuration directory: $DOJO_HOME/ or ~/.dojo/
pub fn config_dir() -> PathBuf {
    if let Some(home) = dojo_home() {
        return home;
    }
    match directories::BaseDirs::new() {
        Some(dirs) => dirs.home_dir().join(".dojo"),
        // No resolvable home (minimal containers): fall back to the cwd
        None => PathBuf::from(".dojo"),
    }
}

pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}
