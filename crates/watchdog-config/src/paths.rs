//! Filesystem locations for configuration and the IPC socket (§6.5).

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

/// Resolves the default config/runtime locations for the watchdog daemon.
pub struct Paths;

impl Paths {
    /// `~/.config/watchdog/config.toml` (or platform equivalent).
    pub fn user_config_file() -> Option<PathBuf> {
        ProjectDirs::from("dev", "watchdog", "watchdog")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// `<project_dir>/watchdog.toml`.
    pub fn project_config_file(project_dir: impl AsRef<Path>) -> PathBuf {
        project_dir.as_ref().join("watchdog.toml")
    }

    /// Default IPC socket path, unlinked at startup if stale (§6.5, §5).
    pub fn default_ipc_socket() -> PathBuf {
        PathBuf::from("/tmp/.s.watchdog.ipc")
    }
}
