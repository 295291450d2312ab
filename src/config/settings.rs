//! Service settings for the binary
//!
//! Layered from built-in defaults, an optional settings file and
//! `INVENTORY_DIFFER_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix for settings overrides
pub const ENV_PREFIX: &str = "INVENTORY_DIFFER";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Address the HTTP API binds to
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Rules document; the per-user config directory is used when unset
    #[serde(default)]
    pub rules_path: Option<PathBuf>,
    /// Reload rules automatically when the file changes
    #[serde(default)]
    pub watch_rules: bool,
    /// Allow cross-origin requests to the HTTP API
    #[serde(default = "default_cors")]
    pub cors: bool,
}

fn default_listen() -> String {
    "127.0.0.1:8390".to_string()
}

fn default_cors() -> bool {
    true
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            rules_path: None,
            watch_rules: false,
            cors: default_cors(),
        }
    }
}

impl ServiceSettings {
    /// Load settings from defaults, an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&ServiceSettings::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true));

        builder.build()?.try_deserialize()
    }

    /// The rules path to use: explicit setting, else the per-user default
    pub fn resolved_rules_path(&self) -> Option<PathBuf> {
        self.rules_path.clone().or_else(default_rules_path)
    }
}

/// `<config dir>/inventory-differ/rules.yaml`
pub fn default_rules_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("inventory-differ").join("rules.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = ServiceSettings::default();
        assert_eq!(settings.listen, "127.0.0.1:8390");
        assert!(settings.rules_path.is_none());
        assert!(!settings.watch_rules);
        assert!(settings.cors);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "listen: \"0.0.0.0:9000\"").unwrap();
        writeln!(file, "rules_path: /etc/inventory-differ/rules.yaml").unwrap();
        writeln!(file, "watch_rules: true").unwrap();

        let settings = ServiceSettings::load(Some(file.path())).unwrap();
        assert_eq!(settings.listen, "0.0.0.0:9000");
        assert_eq!(
            settings.rules_path,
            Some(PathBuf::from("/etc/inventory-differ/rules.yaml"))
        );
        assert!(settings.watch_rules);
        assert!(settings.cors);
    }

    #[test]
    fn test_explicit_rules_path_wins() {
        let settings = ServiceSettings {
            rules_path: Some(PathBuf::from("custom.yaml")),
            ..Default::default()
        };
        assert_eq!(settings.resolved_rules_path(), Some(PathBuf::from("custom.yaml")));
    }
}
