use thiserror::Error;

use crate::validate::ConfigIssue;

fn join_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Application-wide error types.
///
/// This enum represents all possible errors that can occur in the Thoth
/// application. It uses the `thiserror` crate for ergonomic error handling
/// and automatic conversion from underlying library errors.
///
/// Fatal variants (`Config`, `NoValidStatus`, `Auth`, `NoValidCollection`)
/// abort a run before any file is written; the remaining variants describe
/// per-item failures that the pipeline records and isolates to the
/// collection, document or page they concern.
///
/// # Examples
///
/// ```no_run
/// use thoth_core::error::AppError;
///
/// fn example() -> Result<(), AppError> {
///     Err(AppError::Generic("Something went wrong".to_string()))
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// One or more configuration values have the wrong shape.
    ///
    /// Carries every violation found so the operator sees all problems in
    /// one pass instead of fixing them one run at a time.
    #[error("Invalid input: {}", join_issues(.0))]
    Config(Vec<ConfigIssue>),

    /// The configured status list contains no recognized value.
    ///
    /// Raised before authentication; the rejected raw entries are kept for
    /// the error message.
    #[error("No valid status to work with (rejected: {})", .invalid.join(", "))]
    NoValidStatus {
        /// Raw configuration entries that matched no canonical status.
        invalid: Vec<String>,
    },

    /// Credentials were rejected or the login response was malformed.
    ///
    /// This error is fatal: nothing can be exported without a session.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// None of the configured collection names resolved against the
    /// collections accessible to the authenticated user.
    #[error("No valid collection to work with")]
    NoValidCollection,

    /// A remote listing or metadata call failed.
    ///
    /// This error occurs when an API request returns an unexpected status
    /// or an unparsable body. It is confined to the collection or document
    /// sub-tree being processed.
    #[error("API error: {0}")]
    Api(String),

    /// A transcript retrieval returned a non-success HTTP status.
    #[error("status code {status} when fetching {url}")]
    Fetch {
        /// HTTP status code of the failed response.
        status: u16,
        /// The transcript URL that was requested.
        url: String,
    },

    /// Network or connection error.
    ///
    /// This error occurs when a request fails due to connectivity issues,
    /// DNS resolution failures, or the remote server being unreachable.
    #[error("Network error: {0}")]
    Network(String),

    /// Request timeout.
    ///
    /// This error occurs when a request takes longer than the configured timeout.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// URL parsing failed.
    ///
    /// This error occurs when attempting to parse an invalid URL string,
    /// typically when constructing API endpoints from the base URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The transcript body could not be read as XML.
    #[error("Transcript XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The transcript parsed as XML but lacks the structure the metadata
    /// injection needs.
    #[error("Invalid transcript: {0}")]
    InvalidTranscript(String),

    /// The external transformer could not be spawned or exited non-zero.
    #[error("Transform failed: {0}")]
    Transform(String),

    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic application error for cases not covered by specific variants.
    ///
    /// Use this sparingly - prefer creating specific error variants
    /// for better error handling and debugging.
    #[error("Error: {0}")]
    Generic(String),
}

impl AppError {
    /// Returns a user-friendly error message suitable for CLI output.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Config(issues) => {
                format!(
                    "Invalid input: {}\n   Correct the export configuration file.",
                    join_issues(issues)
                )
            }
            AppError::NoValidStatus { .. } => {
                "No valid status to work with.\n   Allowed values: NEW, IN_PROGRESS, DONE, FINAL."
                    .to_string()
            }
            AppError::Auth(msg) => {
                format!(
                    "Authentication failed: {}\n   Check the username and password in the configuration file\n   or the TRANSKRIBUS_USERNAME / TRANSKRIBUS_PASSWORD environment variables.",
                    msg
                )
            }
            AppError::NoValidCollection => {
                "No valid collection to work with.\n   Correct the list of collection names in the configuration file.".to_string()
            }
            AppError::Network(msg) => {
                format!("Network error: {}\n   Check your internet connection.", msg)
            }
            AppError::Timeout(secs) => {
                format!("Request timed out after {} seconds.\n   The server may be overloaded. Try again later.", secs)
            }
            AppError::Transform(msg) => {
                format!(
                    "Transform failed: {}\n   Check the java binary and the Saxon jar / stylesheet paths.",
                    msg
                )
            }
            _ => self.to_string(),
        }
    }
}
