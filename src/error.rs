use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Query is not ordered by issue key: {query}")]
    MissingOrderClause { query: String },

    #[error("Invalid tracker URL: {url}")]
    InvalidUrl { url: String },

    #[error("Authentication failed for: {url}")]
    Authentication { url: String },

    #[error("Request to {url} failed with HTTP status {status}")]
    Fetch { url: String, status: u16 },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Result markup from {url} could not be interpreted: {message}")]
    Markup { url: String, message: String },

    #[error("CSV processing failed: {message}")]
    CsvParse { message: String },

    #[error("Export is not valid UTF-8: {message}")]
    Encoding { message: String },

    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Operation was cancelled by user")]
    Cancelled,

    #[error("Interactive prompt failed: {message}")]
    Prompt { message: String },
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for ExportError {
    fn user_message(&self) -> String {
        match self {
            ExportError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            ExportError::MissingOrderClause { query } => {
                format!("The filter is not ordered by issue key: {}", query)
            }
            ExportError::InvalidUrl { url } => {
                format!("Invalid tracker URL: {}", url)
            }
            ExportError::Authentication { url } => {
                format!("Authentication failed for: {}", url)
            }
            ExportError::Fetch { url, status } => {
                format!("The tracker answered HTTP {} for: {}", status, url)
            }
            ExportError::Network { message } => {
                format!("Network error: {}", message)
            }
            ExportError::Markup { url, message } => {
                format!("Unexpected search result markup from {}: {}", url, message)
            }
            ExportError::CsvParse { message } => {
                format!("CSV processing failed: {}", message)
            }
            ExportError::Encoding { message } => {
                format!("The CSV export is not valid UTF-8: {}", message)
            }
            ExportError::Cancelled => "Operation was cancelled by user".to_string(),
            ExportError::Prompt { message } => {
                format!("Interactive prompt failed: {}", message)
            }
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            ExportError::MissingOrderClause { .. } => Some(
                "Append ` ORDER BY key` to the end of your JQL filter. The exporter splits \
                 large result sets on the issue key and needs a deterministic ordering."
                    .to_string(),
            ),
            ExportError::InvalidUrl { .. } => Some(
                "Provide the base URL of your Jira server, e.g. https://jira.example.com or \
                 https://example.com/jira."
                    .to_string(),
            ),
            ExportError::Authentication { .. } => Some(
                "Check the username and password (or the session cookies) and make sure the \
                 account is allowed to log in via the web form."
                    .to_string(),
            ),
            ExportError::Fetch { .. } => Some(
                "Verify the account has browse permission for the exported project(s) and that \
                 the tracker is reachable. Re-run to retry; finished partitions are overwritten."
                    .to_string(),
            ),
            ExportError::Network { .. } => Some(
                "Check your connection to the tracker and try again. If the problem persists, \
                 the server might be temporarily unavailable."
                    .to_string(),
            ),
            ExportError::Markup { .. } => Some(
                "Make sure the issue navigator renders results as a list for this account; the \
                 exporter reads the result count and issue keys from that page."
                    .to_string(),
            ),
            ExportError::Config { .. } => Some(
                "Check your configuration file syntax and ensure all required fields are present."
                    .to_string(),
            ),
            _ => None,
        }
    }
}

impl From<url::ParseError> for ExportError {
    fn from(error: url::ParseError) -> Self {
        ExportError::InvalidUrl {
            url: error.to_string(),
        }
    }
}

impl From<toml::de::Error> for ExportError {
    fn from(error: toml::de::Error) -> Self {
        ExportError::Config {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for ExportError {
    fn from(error: csv::Error) -> Self {
        ExportError::CsvParse {
            message: error.to_string(),
        }
    }
}

impl From<std::string::FromUtf8Error> for ExportError {
    fn from(error: std::string::FromUtf8Error) -> Self {
        ExportError::Encoding {
            message: error.to_string(),
        }
    }
}

impl From<reqwest::Error> for ExportError {
    fn from(error: reqwest::Error) -> Self {
        ExportError::Network {
            message: error.to_string(),
        }
    }
}

impl From<dialoguer::Error> for ExportError {
    fn from(error: dialoguer::Error) -> Self {
        ExportError::Prompt {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;
