use crate::client::Credentials;
use crate::config::{CliOverrides, Config, UserRename};
use crate::error::{ExportError, Result};
use crate::partition::Query;
use crate::ui::prompt;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "jiradump")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Export Jira projects to CSV archives including attachments")]
#[command(
    long_about = "JiraDump logs into a Jira server, splits a filter into sub-queries that \
                       stay below the server's result-size limit, and downloads every part as a \
                       CSV file together with the referenced attachments."
)]
#[command(after_help = "EXAMPLES:\n  \
    jiradump --jira https://jira.example.com --project DEMO\n  \
    jiradump --jira https://jira.example.com --filter 'assignee = bob ORDER BY key'\n  \
    jiradump --project DEMO --map old.name=new.name --output ./demo-export\n  \
    JIRA_URL=https://jira.example.com JIRA_USER=admin jiradump --project DEMO --quiet\n\n\
    Every value can also come from the environment (JIRA_URL, JIRA_USER, JIRA_PASS, ...);\n\
    whatever is still missing is asked for interactively.")]
pub struct Cli {
    /// Base URL of the Jira server
    #[arg(short = 'j', long = "jira", env = "JIRA_URL", value_parser = validate_tracker_url)]
    pub jira_url: Option<String>,

    /// Username used for the login form
    #[arg(short, long, env = "JIRA_USER")]
    pub username: Option<String>,

    /// Password used for the login form
    #[arg(short, long, env = "JIRA_PASS", hide_env_values = true)]
    pub password: Option<String>,

    /// Session cookies as a JSON object, as an alternative to a password login
    #[arg(long, env = "JIRA_COOKIES", hide_env_values = true)]
    pub cookies: Option<String>,

    /// Key of the project to export
    #[arg(short = 'x', long, env = "JIRA_PROJECT")]
    pub project: Option<String>,

    /// Custom JQL filter instead of a whole project (must end with `ORDER BY key`)
    #[arg(short, long, env = "JIRA_JQL", conflicts_with = "project")]
    pub filter: Option<String>,

    /// Result-count ceiling the server enforces on a single search
    #[arg(long, env = "JIRA_MAX_ISSUES")]
    pub max_issues: Option<usize>,

    /// Base URL written into rewritten attachment links
    #[arg(long, env = "DOWNLOAD_URL")]
    pub destination: Option<String>,

    /// User renames applied to the export (old=new, comma-separated)
    #[arg(long = "map", env = "JIRA_USER_MAPPING", value_delimiter = ',')]
    pub map: Option<Vec<String>>,

    /// Output directory for CSV artifacts and attachments
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Verbose output level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet / headless mode (no prompts, suppress non-essential output)
    #[arg(short, long, env = "JIRA_QUIET", conflicts_with = "verbose")]
    pub quiet: bool,

    /// Dry run (show what would be exported without executing)
    #[arg(long, help = "Show the resolved export plan without contacting the tracker")]
    pub dry_run: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

/// Everything the pipeline needs to know about one export run: where the
/// tracker lives, how to authenticate, and which query to split.
#[derive(Debug, Clone)]
pub struct ExportTarget {
    pub base_url: String,
    pub credentials: Credentials,
    pub base_label: String,
    pub query: Query,
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides()?;
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> Result<CliOverrides> {
        let user_renames = self
            .map
            .as_deref()
            .map(parse_mapping_entries)
            .transpose()
            .map_err(|message| ExportError::Config { message })?;

        Ok(CliOverrides::new()
            .with_max_issues(self.max_issues)
            .with_timeout(self.timeout)
            .with_destination_base_url(self.destination.clone())
            .with_output_dir(self.output.clone())
            .with_user_renames(user_renames))
    }

    /// Resolves the tracker URL, credentials, and query, consulting each
    /// source in a fixed order: CLI flag, then environment (both handled by
    /// clap), then an interactive prompt. Quiet mode never prompts; a value
    /// missing there is a configuration error.
    pub fn resolve_target(&self) -> Result<ExportTarget> {
        let base_url = match &self.jira_url {
            Some(url) => url.clone(),
            None if self.quiet => {
                return Err(ExportError::Config {
                    message: "No tracker URL given (use --jira or JIRA_URL)".to_string(),
                })
            }
            None => {
                let answer = prompt::input("Jira URL")?;
                validate_tracker_url(&answer).map_err(|msg| ExportError::InvalidUrl { url: msg })?
            }
        };

        let cookies = match &self.cookies {
            Some(json) => Credentials::parse_cookie_json(json)?,
            None => Vec::new(),
        };

        let username = match &self.username {
            Some(name) => Some(name.clone()),
            // A cookie-seeded session can run without a username; it only
            // loses the locale precondition check.
            None if self.quiet || !cookies.is_empty() => None,
            None => Some(prompt::input("Username")?),
        };

        let password = match &self.password {
            Some(pass) => Some(pass.clone()),
            None if self.quiet || !cookies.is_empty() => None,
            None => Some(prompt::password("Password")?),
        };

        let (base_label, query) = self.resolve_query()?;

        Ok(ExportTarget {
            base_url,
            credentials: Credentials {
                username,
                password,
                cookies,
            },
            base_label,
            query,
        })
    }

    fn resolve_query(&self) -> Result<(String, Query)> {
        if let Some(ref filter) = self.filter {
            // Custom filters can span projects, so their artifacts get a
            // generic label.
            return Ok(("custom".to_string(), Query::new(filter)?));
        }

        let project = match &self.project {
            Some(key) => key.clone(),
            None if self.quiet => {
                return Err(ExportError::Config {
                    message: "No project key or filter given (use --project or --filter)"
                        .to_string(),
                })
            }
            None => prompt::input("Project key of the project to be exported")?,
        };

        Ok((project.clone(), Query::for_project(&project)))
    }
}

pub fn validate_tracker_url(s: &str) -> std::result::Result<String, String> {
    let url =
        Url::parse(s).map_err(|_| "Invalid URL format. Please provide a valid URL.".to_string())?;

    match url.scheme() {
        "http" | "https" => {}
        _ => return Err("Only HTTP and HTTPS tracker URLs are supported".to_string()),
    }

    if url.host_str().is_none() {
        return Err("URL must include a valid hostname".to_string());
    }

    if url.query().is_some() || url.fragment().is_some() {
        return Err(
            "Provide the bare base URL of the tracker, without query or fragment".to_string(),
        );
    }

    Ok(s.to_string())
}

pub fn parse_mapping_entries(entries: &[String]) -> std::result::Result<Vec<UserRename>, String> {
    entries
        .iter()
        .map(|entry| {
            let (from, to) = entry
                .split_once('=')
                .ok_or_else(|| format!("Invalid user mapping '{}', expected old=new", entry))?;

            if from.is_empty() || to.is_empty() {
                return Err(format!(
                    "Invalid user mapping '{}', both usernames must be non-empty",
                    entry
                ));
            }

            Ok(UserRename {
                from: from.to_string(),
                to: to.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cli() -> Cli {
        Cli {
            jira_url: Some("https://jira.example.com".to_string()),
            username: Some("exporter".to_string()),
            password: Some("secret".to_string()),
            cookies: None,
            project: Some("DEMO".to_string()),
            filter: None,
            max_issues: None,
            destination: None,
            map: None,
            output: None,
            config: None,
            output_format: OutputFormat::Human,
            timeout: None,
            verbose: 0,
            quiet: true,
            dry_run: false,
            generate_config: false,
        }
    }

    #[test]
    fn test_valid_tracker_urls() {
        let valid_urls = [
            "https://jira.example.com",
            "https://example.com/jira",
            "http://localhost:8080/jira",
        ];

        for url in &valid_urls {
            assert!(validate_tracker_url(url).is_ok(), "Should accept: {}", url);
        }
    }

    #[test]
    fn test_invalid_tracker_urls() {
        let invalid_urls = [
            "not-a-url",
            "ftp://jira.example.com",
            "https://jira.example.com/issues/?jql=project%20%3D%20X",
        ];

        for url in &invalid_urls {
            assert!(validate_tracker_url(url).is_err(), "Should reject: {}", url);
        }
    }

    #[test]
    fn test_resolve_target_for_project() {
        let cli = test_cli();
        let target = cli.resolve_target().unwrap();

        assert_eq!(target.base_url, "https://jira.example.com");
        assert_eq!(target.base_label, "DEMO");
        assert_eq!(target.query.as_str(), "project = DEMO ORDER BY key");
        assert_eq!(target.credentials.username.as_deref(), Some("exporter"));
    }

    #[test]
    fn test_resolve_target_for_custom_filter() {
        let mut cli = test_cli();
        cli.project = None;
        cli.filter = Some("assignee = bob ORDER BY key".to_string());

        let target = cli.resolve_target().unwrap();
        assert_eq!(target.base_label, "custom");
        assert_eq!(target.query.as_str(), "assignee = bob ORDER BY key");
    }

    #[test]
    fn test_resolve_target_rejects_unordered_filter() {
        let mut cli = test_cli();
        cli.project = None;
        cli.filter = Some("assignee = bob".to_string());

        let result = cli.resolve_target();
        assert!(matches!(
            result,
            Err(ExportError::MissingOrderClause { .. })
        ));
    }

    #[test]
    fn test_quiet_mode_requires_url() {
        let mut cli = test_cli();
        cli.jira_url = None;

        let result = cli.resolve_target();
        assert!(matches!(result, Err(ExportError::Config { .. })));
    }

    #[test]
    fn test_parse_mapping_entries() {
        let entries = vec!["alice=bob".to_string(), "carol=dave".to_string()];
        let renames = parse_mapping_entries(&entries).unwrap();

        assert_eq!(renames.len(), 2);
        assert_eq!(renames[0].from, "alice");
        assert_eq!(renames[0].to, "bob");
        assert_eq!(renames[1].from, "carol");

        assert!(parse_mapping_entries(&["broken".to_string()]).is_err());
        assert!(parse_mapping_entries(&["=bob".to_string()]).is_err());
    }

    #[test]
    fn test_cli_overrides_from_map_flag() {
        let mut cli = test_cli();
        cli.map = Some(vec!["alice=bob".to_string()]);

        let overrides = cli.create_cli_overrides().unwrap();
        let renames = overrides.user_renames.unwrap();
        assert_eq!(renames[0].from, "alice");
        assert_eq!(renames[0].to, "bob");
    }
}
