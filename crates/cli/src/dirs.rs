//! Platform-specific directory utilities

use std::path::PathBuf;

/// Get the platform-specific log directory
///
/// - macOS: `~/Library/Caches/vtm-sheet/logs`
/// - Linux: `~/.cache/vtm-sheet/logs` (or `$XDG_CACHE_HOME/vtm-sheet/logs`)
/// - Windows: `%LOCALAPPDATA%\vtm-sheet\cache\logs`
/// - Fallback: `/tmp/vtm-sheet/logs`
pub fn log_dir() -> PathBuf {
    let base_dir = directories::ProjectDirs::from("", "", "vtm-sheet")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("/tmp/vtm-sheet"));

    base_dir.join("logs")
}
