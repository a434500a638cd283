//! Where Pindrop keeps its files.
//!
//! Running under cargo (or any debug build) everything lands in the working
//! directory, so a checkout stays self-contained. Installed builds follow the
//! platform conventions: config under the OS config directory on Linux, data
//! under the OS data directory everywhere, logs inside the data directory.

use std::path::PathBuf;

/// True for `cargo run` and debug builds; switches all paths to local ones.
pub fn is_dev_mode() -> bool {
    std::env::var("CARGO").is_ok() || cfg!(debug_assertions)
}

/// Directory holding `config.json`.
///
/// Linux separates config from data (`~/.config/pindrop/`); Windows and macOS
/// keep both together.
pub fn config_dir() -> Option<PathBuf> {
    if is_dev_mode() {
        return Some(PathBuf::from("."));
    }

    #[cfg(target_os = "linux")]
    {
        dirs::config_dir().map(|p| p.join("pindrop"))
    }

    #[cfg(not(target_os = "linux"))]
    {
        data_dir()
    }
}

/// Directory holding the stop board and logs.
pub fn data_dir() -> Option<PathBuf> {
    if is_dev_mode() {
        return Some(PathBuf::from("."));
    }

    dirs::data_dir().map(|p| p.join("pindrop"))
}

pub fn config_file() -> PathBuf {
    named_file(config_dir(), "config.json")
}

pub fn stops_file() -> PathBuf {
    named_file(data_dir(), "stops.json")
}

pub fn logs_dir() -> PathBuf {
    data_dir()
        .map(|p| p.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// A file inside `dir`, or a bare relative path when the platform gives us
/// nothing to anchor to.
fn named_file(dir: Option<PathBuf>, name: &str) -> PathBuf {
    dir.map(|p| p.join(name))
        .unwrap_or_else(|| PathBuf::from(name))
}

/// Create the config, data, and log directories if missing. Dev-mode paths
/// are the working directory and need no setup.
pub fn ensure_directories() -> std::io::Result<()> {
    if is_dev_mode() {
        return Ok(());
    }

    if let Some(config) = config_dir() {
        std::fs::create_dir_all(&config)?;
    }
    if let Some(data) = data_dir() {
        std::fs::create_dir_all(&data)?;
        std::fs::create_dir_all(data.join("logs"))?;
    }
    Ok(())
}
