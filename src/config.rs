use crate::error::{ExportError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub tracker: TrackerConfig,
    pub mapping: MappingConfig,
    pub export: ExportConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Result-count ceiling the server enforces on a single search.
    pub max_issues: usize,
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Column headers whose cells hold semicolon-delimited sub-records.
    pub nested_columns: Vec<String>,
    /// Verify that the exporting account uses the en_US locale before
    /// downloading (header names in the CSV export are locale-dependent).
    pub verify_locale: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct UserRename {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MappingConfig {
    /// User renames applied to the export, in declaration order.
    pub users: Vec<UserRename>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Base URL written into rewritten attachment links.
    pub destination_base_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub base_directory: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tracker: TrackerConfig::default(),
            mapping: MappingConfig::default(),
            export: ExportConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_issues: 500,
            timeout: 300, // 5 minutes
            nested_columns: vec!["Attachment".to_string()],
            verify_locale: true,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            destination_base_url: "http://localhost/jira".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_directory: PathBuf::from("downloads"),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ExportError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ExportError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ExportError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["jiradump.toml", ".jiradump.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(max_issues) = cli_args.max_issues {
            self.tracker.max_issues = max_issues;
        }

        if let Some(timeout) = cli_args.timeout {
            self.tracker.timeout = timeout;
        }

        if let Some(ref destination) = cli_args.destination_base_url {
            self.export.destination_base_url = destination.clone();
        }

        if let Some(ref output_dir) = cli_args.output_dir {
            self.output.base_directory = output_dir.clone();
        }

        if let Some(ref users) = cli_args.user_renames {
            // CLI-supplied renames replace the file-based table outright so the
            // applied order stays exactly what the operator typed.
            self.mapping.users = users.clone();
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| ExportError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| ExportError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.tracker.max_issues == 0 {
            return Err(ExportError::Config {
                message: "max_issues must be greater than 0".to_string(),
            });
        }

        if self.tracker.timeout == 0 {
            return Err(ExportError::Config {
                message: "Request timeout must be greater than 0".to_string(),
            });
        }

        if self.tracker.nested_columns.is_empty() {
            return Err(ExportError::Config {
                message: "At least one nested column header must be configured".to_string(),
            });
        }

        if self.export.destination_base_url.trim().is_empty() {
            return Err(ExportError::Config {
                message: "destination_base_url must not be empty".to_string(),
            });
        }

        for rename in &self.mapping.users {
            if rename.from.is_empty() || rename.to.is_empty() {
                return Err(ExportError::Config {
                    message: "User renames need both an old and a new username".to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.tracker.timeout)
    }

    pub fn create_sample_config() -> String {
        let mut sample_config = Self::default();
        sample_config.mapping.users = vec![UserRename {
            from: "old.username".to_string(),
            to: "new.username".to_string(),
        }];
        toml::to_string_pretty(&sample_config).unwrap_or_else(|_| String::new())
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub max_issues: Option<usize>,
    pub timeout: Option<u64>,
    pub destination_base_url: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub user_renames: Option<Vec<UserRename>>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_issues(mut self, max_issues: Option<usize>) -> Self {
        self.max_issues = max_issues;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<u64>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_destination_base_url(mut self, destination: Option<String>) -> Self {
        self.destination_base_url = destination;
        self
    }

    pub fn with_output_dir(mut self, output_dir: Option<PathBuf>) -> Self {
        self.output_dir = output_dir;
        self
    }

    pub fn with_user_renames(mut self, renames: Option<Vec<UserRename>>) -> Self {
        self.user_renames = renames;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.tracker.max_issues, 500);
        assert_eq!(config.tracker.nested_columns, vec!["Attachment"]);
        assert_eq!(config.output.base_directory, PathBuf::from("downloads"));
        assert!(config.mapping.users.is_empty());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.tracker.max_issues = 0;
        assert!(config.validate().is_err());

        config.tracker.max_issues = 500;
        config.export.destination_base_url = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_operations() {
        let config = Config::default();
        let temp_file = NamedTempFile::new().unwrap();

        config.save_to_file(temp_file.path()).unwrap();

        let loaded_config = Config::load_from_file(temp_file.path()).unwrap();
        assert_eq!(config.tracker.max_issues, loaded_config.tracker.max_issues);
        assert_eq!(
            config.export.destination_base_url,
            loaded_config.export.destination_base_url
        );
    }

    #[test]
    fn test_partial_config_file_uses_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[tracker]\nmax_issues = 250").unwrap();

        let config = Config::load_from_file(temp_file.path()).unwrap();
        assert_eq!(config.tracker.max_issues, 250);
        assert_eq!(config.tracker.nested_columns, vec!["Attachment"]);
        assert_eq!(config.export.destination_base_url, "http://localhost/jira");
    }

    #[test]
    fn test_mapping_order_preserved() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            "[[mapping.users]]\nfrom = \"alice\"\nto = \"bob\"\n\n\
             [[mapping.users]]\nfrom = \"carol\"\nto = \"dave\""
        )
        .unwrap();

        let config = Config::load_from_file(temp_file.path()).unwrap();
        assert_eq!(config.mapping.users.len(), 2);
        assert_eq!(config.mapping.users[0].from, "alice");
        assert_eq!(config.mapping.users[1].from, "carol");
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = Config::default();
        let original_timeout = config.tracker.timeout;

        let overrides = CliOverrides::new()
            .with_timeout(Some(600))
            .with_max_issues(Some(100))
            .with_destination_base_url(Some("https://wiki.example.com/jira".to_string()));

        config.merge_with_cli_args(&overrides);

        assert_eq!(config.tracker.timeout, 600);
        assert_ne!(config.tracker.timeout, original_timeout);
        assert_eq!(config.tracker.max_issues, 100);
        assert_eq!(
            config.export.destination_base_url,
            "https://wiki.example.com/jira"
        );
    }

    #[test]
    fn test_sample_config_generation() {
        let sample = Config::create_sample_config();
        assert!(!sample.is_empty());
        assert!(sample.contains("[tracker]"));
        assert!(sample.contains("[export]"));
        assert!(sample.contains("[output]"));
        assert!(sample.contains("[[mapping.users]]"));
    }
}
