//! Multi-source configuration merging, in the style of
//! `kimberlite-config::ConfigLoader`.

use std::env;
use std::path::{Path, PathBuf};

use crate::{ConfigError, Paths, Result, WatchdogConfig};

/// Builder for loading [`WatchdogConfig`] from layered sources.
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "WD".to_string(),
        }
    }

    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Loads configuration with precedence: defaults, user config,
    /// project config, environment variables.
    pub fn load(self) -> Result<WatchdogConfig> {
        let mut builder = config::Config::builder();

        let defaults = WatchdogConfig::default();
        builder = builder.add_source(
            config::Config::try_from(&defaults).map_err(ConfigError::BuildError)?,
        );

        if let Some(user_config_file) = Paths::user_config_file() {
            if user_config_file.exists() {
                builder = builder.add_source(
                    config::File::from(user_config_file)
                        .required(false)
                        .format(config::FileFormat::Toml),
                );
            }
        }

        let project_config_file = Paths::project_config_file(&self.project_dir);
        if project_config_file.exists() {
            builder = builder.add_source(
                config::File::from(project_config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .separator("_")
                .try_parsing(true),
        );

        let built = builder.build().map_err(ConfigError::BuildError)?;
        let config: WatchdogConfig = built.try_deserialize().map_err(ConfigError::BuildError)?;
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn load_defaults_when_no_file_present() {
        let temp = tempdir().unwrap();
        let config = ConfigLoader::new()
            .with_project_dir(temp.path())
            .load()
            .unwrap();
        assert_eq!(config.node.watchdog_port, 9000);
    }

    #[test]
    fn project_file_overrides_defaults() {
        let temp = tempdir().unwrap();
        fs::write(
            temp.path().join("watchdog.toml"),
            "[node]\nwatchdog_port = 9999\n",
        )
        .unwrap();
        let config = ConfigLoader::new()
            .with_project_dir(temp.path())
            .load()
            .unwrap();
        assert_eq!(config.node.watchdog_port, 9999);
    }
}
