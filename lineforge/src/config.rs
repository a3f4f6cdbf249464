use config::{Config as ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::guard::ShellKind;

/// Configuration shared by the edit tools.
///
/// # Configuration Locations
///
/// The configuration can be loaded from multiple locations in order of precedence:
/// 1. Custom config file specified via `--config` flag
/// 2. Local `.lineforge.yaml` in the current directory
/// 3. Global `$HOME/.config/lineforge/config.yaml`
///
/// # Configuration Format
///
/// The configuration uses YAML format. Example:
/// ```yaml
/// # Create <name>.backup copies before overwriting files
/// backup_enabled: true
///
/// # Default glob for directory targets
/// file_pattern: "*"
///
/// # Matches shown per file when rendering search trees
/// max_matches_per_file: 10
///
/// # Shell policy for command validation (auto, unix, powershell)
/// shell: "auto"
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "warn"
/// ```
///
/// CLI arguments take precedence over config file values; the merging
/// behavior is defined in `merge_with_cli`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditConfig {
    /// Whether apply-mode overwrites create a backup copy first
    #[serde(default = "default_backup_enabled")]
    pub backup_enabled: bool,

    /// Default glob applied when a directory target is expanded
    #[serde(default = "default_file_pattern")]
    pub file_pattern: String,

    /// Maximum matches displayed per file in search output
    #[serde(default = "default_max_matches")]
    pub max_matches_per_file: usize,

    /// Shell policy used for command validation
    #[serde(default)]
    pub shell: ShellKind,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_backup_enabled() -> bool {
    true
}

fn default_file_pattern() -> String {
    "*".to_string()
}

fn default_max_matches() -> usize {
    10
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            backup_enabled: default_backup_enabled(),
            file_pattern: default_file_pattern(),
            max_matches_per_file: default_max_matches(),
            shell: ShellKind::default(),
            log_level: default_log_level(),
        }
    }
}

impl EditConfig {
    /// Loads configuration from the default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Loads configuration from a specific file
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        // Default config locations
        let config_files = [
            // Global config
            dirs::config_dir().map(|p| p.join("lineforge/config.yaml")),
            // Local config
            Some(PathBuf::from(".lineforge.yaml")),
            // Custom config
            config_path.map(PathBuf::from),
        ];

        // Add existing config files
        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        builder.build()?.try_deserialize()
    }

    /// Merges CLI arguments with configuration file values. A `Some`
    /// override wins in either direction; `None` keeps the file value.
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> Self {
        if let Some(backup_enabled) = cli.backup_enabled {
            self.backup_enabled = backup_enabled;
        }
        if let Some(file_pattern) = cli.file_pattern {
            self.file_pattern = file_pattern;
        }
        if let Some(max_matches_per_file) = cli.max_matches_per_file {
            self.max_matches_per_file = max_matches_per_file;
        }
        if let Some(shell) = cli.shell {
            self.shell = shell;
        }
        if let Some(log_level) = cli.log_level {
            self.log_level = log_level;
        }
        self
    }
}

/// CLI-supplied configuration overrides. `None` means the flag was not
/// given, so the config file value stands.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub backup_enabled: Option<bool>,
    pub file_pattern: Option<String>,
    pub max_matches_per_file: Option<usize>,
    pub shell: Option<ShellKind>,
    pub log_level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_load_config_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        let config_content = r#"
            backup_enabled: false
            file_pattern: "*.rs"
            max_matches_per_file: 5
            shell: "unix"
            log_level: "debug"
        "#;

        let mut file = File::create(&config_path).unwrap();
        file.write_all(config_content.as_bytes()).unwrap();

        let config = EditConfig::load_from(Some(&config_path)).unwrap();
        assert!(!config.backup_enabled);
        assert_eq!(config.file_pattern, "*.rs");
        assert_eq!(config.max_matches_per_file, 5);
        assert_eq!(config.shell, ShellKind::Unix);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_default_values() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        let mut file = File::create(&config_path).unwrap();
        file.write_all(b"log_level: \"info\"\n").unwrap();

        let config = EditConfig::load_from(Some(&config_path)).unwrap();
        assert!(config.backup_enabled);
        assert_eq!(config.file_pattern, "*");
        assert_eq!(config.max_matches_per_file, 10);
        assert_eq!(config.shell, ShellKind::Auto);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_merge_with_cli() {
        let file_config = EditConfig {
            backup_enabled: true,
            file_pattern: "*.rs".to_string(),
            max_matches_per_file: 10,
            shell: ShellKind::Auto,
            log_level: "warn".to_string(),
        };

        let overrides = CliOverrides {
            backup_enabled: None,
            file_pattern: Some("*.toml".to_string()),
            max_matches_per_file: Some(3),
            shell: Some(ShellKind::PowerShell),
            log_level: Some("debug".to_string()),
        };

        let merged = file_config.merge_with_cli(overrides);
        assert_eq!(merged.file_pattern, "*.toml"); // CLI value
        assert_eq!(merged.max_matches_per_file, 3); // CLI value
        assert_eq!(merged.shell, ShellKind::PowerShell); // CLI value
        assert_eq!(merged.log_level, "debug"); // CLI value
        assert!(merged.backup_enabled); // File value (no override)
    }

    #[test]
    fn test_merge_can_re_enable_backups() {
        let file_config = EditConfig {
            backup_enabled: false,
            ..EditConfig::default()
        };

        let merged = file_config.merge_with_cli(CliOverrides {
            backup_enabled: Some(true),
            ..CliOverrides::default()
        });
        assert!(merged.backup_enabled);

        // No override leaves the file value alone
        let file_config = EditConfig {
            backup_enabled: false,
            ..EditConfig::default()
        };
        let merged = file_config.merge_with_cli(CliOverrides::default());
        assert!(!merged.backup_enabled);
    }
}
