//! Configuration types for Thoth components.
//!
//! An export run is described by a TOML file (see [`ExportFileConfig`] for
//! the accepted keys) plus optional credential overrides from the command
//! line or environment. The file is parsed into a [`toml::Value`] first so
//! the validator can report every shape violation in one pass, then
//! converted into the typed form.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::AppError;
use crate::models::{Credentials, TranscriptStatus};

/// HTTP client configuration for platform API calls.
pub struct HttpConfig {
    pub timeout: Duration,
}

impl HttpConfig {
    /// Timeout applied to every request, in seconds. Exposed so timeout
    /// errors can name the limit that was hit.
    pub fn timeout_secs(&self) -> u64 {
        self.timeout.as_secs()
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

/// The export configuration file as written by the user.
///
/// All keys are optional at parse time; the validator decides which
/// omissions are fatal. `username` and `password` may also arrive via
/// command line or environment, in which case the file may omit them.
/// `documents` restricts the export to the listed document ids; leaving it
/// out (or empty) exports every document of every selected collection.
///
/// ```toml
/// username = "reader@example.org"
/// password = "..."
/// collections = ["Letters 1820", "Charters"]
/// status = ["DONE", "FINAL"]
/// documents = ["4711", "4712"]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportFileConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub collections: Option<Vec<String>>,
    pub status: Option<Vec<String>>,
    pub documents: Option<Vec<String>>,
}

/// Credentials supplied outside the configuration file.
///
/// Values given here win over the file so secrets can stay out of it
/// entirely.
#[derive(Debug, Clone, Default)]
pub struct CredentialOverrides {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// A fully validated export job.
///
/// Produced by [`crate::validate::job_from_config`]; every field is already
/// normalized, so the pipeline never has to re-check shapes.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub credentials: Credentials,
    /// Collection names to export, as written in the configuration.
    pub collections: Vec<String>,
    /// Normalized status filter, duplicates removed, file order kept.
    pub statuses: Vec<TranscriptStatus>,
    /// Document id allow-list; empty means every document. Blank entries
    /// from the file are already stripped.
    pub documents: Vec<String>,
}

/// Default location of the export configuration file, platform dependent
/// (`~/.config/thoth/export.toml` on Linux).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("thoth").join("export.toml"))
}

/// Reads the configuration file, keeping the path in the error message
/// since the default location is easy to get wrong.
pub fn load_config_source(path: &Path) -> Result<String, AppError> {
    std::fs::read_to_string(path).map_err(|e| {
        AppError::Generic(format!(
            "cannot read configuration file {}: {}",
            path.display(),
            e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_config_defaults() {
        let config = HttpConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.timeout_secs(), 30);
    }

    #[test]
    fn test_file_config_accepts_partial_files() {
        let value: ExportFileConfig = toml::from_str(
            r#"
            collections = ["Letters 1820"]
            status = ["DONE", "FINAL"]
            "#,
        )
        .unwrap();
        assert!(value.username.is_none());
        assert!(value.documents.is_none());
        assert_eq!(
            value.collections.as_deref(),
            Some(&["Letters 1820".to_string()][..])
        );
    }

    #[test]
    fn test_load_config_source_names_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = load_config_source(&path).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn test_load_config_source_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.toml");
        std::fs::write(&path, "status = [\"DONE\"]").unwrap();
        assert_eq!(load_config_source(&path).unwrap(), "status = [\"DONE\"]");
    }

    #[test]
    fn test_default_config_path_ends_with_app_dir() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("thoth/export.toml"));
        }
    }
}
