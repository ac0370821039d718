//! Shape checking and normalization of export configuration.
//!
//! Validation runs in two stages. [`check_value`] inspects the untyped TOML
//! document and collects every violation instead of stopping at the first,
//! so a broken file is fixed in one edit. Only when the shape is clean does
//! [`job_from_config`] build the typed [`JobSpec`] and normalize the status
//! filter. Collection names and document ids can only be checked against the
//! remote service, so [`resolve_collections`] and [`resolve_documents`] run
//! later, after authentication.

use std::fmt;

use tracing::{debug, warn};

use crate::config::{CredentialOverrides, ExportFileConfig, JobSpec};
use crate::error::AppError;
use crate::models::{Collection, Credentials, TranscriptStatus};

/// A single configuration violation, named after the offending key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub field: String,
    pub message: String,
}

impl ConfigIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.message)
    }
}

fn is_string_list(value: &toml::Value) -> bool {
    value
        .as_array()
        .map(|items| items.iter().all(|item| item.as_str().is_some()))
        .unwrap_or(false)
}

/// Checks the shape of every configuration key and returns all violations.
///
/// Credentials provided through `overrides` satisfy the corresponding file
/// key, so a file without a password is fine as long as the environment or
/// command line supplies one. No network traffic happens until this returns
/// empty.
pub fn check_value(value: &toml::Value, overrides: &CredentialOverrides) -> Vec<ConfigIssue> {
    let mut issues = Vec::new();

    if overrides.username.is_none() {
        match value.get("username") {
            None => issues.push(ConfigIssue::new("username", "is missing")),
            Some(v) if v.as_str().is_none() => {
                issues.push(ConfigIssue::new("username", "must be a string"))
            }
            _ => {}
        }
    }
    if overrides.password.is_none() {
        match value.get("password") {
            None => issues.push(ConfigIssue::new("password", "is missing")),
            Some(v) if v.as_str().is_none() => {
                issues.push(ConfigIssue::new("password", "must be a string"))
            }
            _ => {}
        }
    }
    match value.get("status") {
        None => issues.push(ConfigIssue::new("status", "is missing")),
        Some(v) if !is_string_list(v) => {
            issues.push(ConfigIssue::new("status", "must be a list of strings"))
        }
        _ => {}
    }
    match value.get("collections") {
        None => issues.push(ConfigIssue::new("collections", "is missing")),
        Some(v) if !is_string_list(v) => {
            issues.push(ConfigIssue::new("collections", "must be a list of strings"))
        }
        _ => {}
    }
    // The document allow-list is optional.
    if let Some(v) = value.get("documents") {
        if !is_string_list(v) {
            issues.push(ConfigIssue::new("documents", "must be a list of strings"));
        }
    }

    issues
}

/// Normalizes the raw status filter into the canonical enum set.
///
/// Order follows the configuration, duplicates collapse onto their first
/// occurrence, unknown values are logged and dropped. An empty result is
/// fatal because the pipeline would export nothing.
pub fn normalize_statuses(raw: &[String]) -> Result<Vec<TranscriptStatus>, AppError> {
    let mut valid: Vec<TranscriptStatus> = Vec::new();
    let mut invalid: Vec<String> = Vec::new();

    for entry in raw {
        match TranscriptStatus::parse(entry) {
            Some(status) => {
                if !valid.contains(&status) {
                    valid.push(status);
                }
            }
            None => invalid.push(entry.clone()),
        }
    }

    if !invalid.is_empty() {
        warn!("Invalid status input: {}", invalid.join(", "));
    }
    if valid.is_empty() {
        return Err(AppError::NoValidStatus { invalid });
    }
    Ok(valid)
}

/// Builds a validated [`JobSpec`] from the raw configuration file text.
///
/// Returns [`AppError::Config`] with the full list of shape violations, or
/// [`AppError::NoValidStatus`] when the status filter normalizes to nothing.
pub fn job_from_config(raw: &str, overrides: &CredentialOverrides) -> Result<JobSpec, AppError> {
    let value: toml::Value = toml::from_str(raw).map_err(|e| {
        AppError::Config(vec![ConfigIssue::new(
            "configuration file",
            format!("is not valid TOML: {}", e),
        )])
    })?;

    let issues = check_value(&value, overrides);
    if !issues.is_empty() {
        return Err(AppError::Config(issues));
    }

    // The shape was just checked, so the typed parse only fails on issues
    // check_value does not model; report those through the same channel.
    let file: ExportFileConfig = toml::from_str(raw).map_err(|e| {
        AppError::Config(vec![ConfigIssue::new("configuration file", e.to_string())])
    })?;

    let username = overrides
        .username
        .clone()
        .or(file.username)
        .ok_or_else(|| AppError::Config(vec![ConfigIssue::new("username", "is missing")]))?;
    let password = overrides
        .password
        .clone()
        .or(file.password)
        .ok_or_else(|| AppError::Config(vec![ConfigIssue::new("password", "is missing")]))?;

    let statuses = normalize_statuses(&file.status.unwrap_or_default())?;
    let documents = file
        .documents
        .unwrap_or_default()
        .into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect();

    Ok(JobSpec {
        credentials: Credentials::new(username, password),
        collections: file.collections.unwrap_or_default(),
        statuses,
        documents,
    })
}

/// Matches the configured collection names against the accessible ones.
///
/// Lookup is an exact string match; the first accessible collection with a
/// matching name wins. Unresolved names are warned about and returned so the
/// caller can report them, and the run keeps going as long as at least one
/// name resolves.
pub fn resolve_collections(
    requested: &[String],
    accessible: &[Collection],
) -> Result<(Vec<Collection>, Vec<String>), AppError> {
    let mut resolved = Vec::new();
    let mut unresolved = Vec::new();

    for name in requested {
        match accessible.iter().find(|c| &c.name == name) {
            Some(collection) => resolved.push(collection.clone()),
            None => {
                warn!(
                    "User has no access to \"{}\" or this collection does not exist.",
                    name
                );
                unresolved.push(name.clone());
            }
        }
    }

    if resolved.is_empty() {
        return Err(AppError::NoValidCollection);
    }
    Ok((resolved, unresolved))
}

/// Intersects a document id allow-list with the ids a collection actually
/// contains.
///
/// An empty allow-list keeps everything. Allow-list entries absent from the
/// listing are dropped without an error, only a debug line records them;
/// remote listing order is preserved.
pub fn resolve_documents(allow_list: &[String], listed: &[i64]) -> Vec<i64> {
    if allow_list.is_empty() {
        return listed.to_vec();
    }
    for wanted in allow_list {
        if !listed.iter().any(|id| id.to_string() == *wanted) {
            debug!("Document id {} is not in the collection listing", wanted);
        }
    }
    listed
        .iter()
        .copied()
        .filter(|id| allow_list.iter().any(|wanted| wanted == &id.to_string()))
        .collect()
}
