//! Run accounting for the export pipeline.
//!
//! This module provides pure bookkeeping for per-page outcomes and the
//! run-level report text, decoupled from I/O operations and CLI
//! orchestration.

use std::path::PathBuf;

use chrono::{DateTime, Datelike, Local, Timelike};

use crate::models::TranscriptStatus;

/// Outcome of processing a single page during an export run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// Transcript fetched, annotated and written to disk
    Exported,
    /// Transcript status not in the configured filter - nothing fetched
    SkippedStatus,
    /// Transcript fetched but not usable (not a PAGE document, broken XML)
    SkippedInvalid,
    /// Fetching or writing this page failed
    Failed,
}

/// Page and document counters for one collection.
#[derive(Debug, Default, Clone)]
pub struct ExportStats {
    pub exported: usize,
    pub skipped_status: usize,
    pub skipped_invalid: usize,
    pub failed: usize,
    /// Documents whose metadata or page list could not be fetched at all.
    pub failed_documents: usize,
}

impl ExportStats {
    /// Creates a new empty stats tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a page outcome, incrementing the appropriate counter.
    pub fn record(&mut self, outcome: PageOutcome) {
        match outcome {
            PageOutcome::Exported => self.exported += 1,
            PageOutcome::SkippedStatus => self.skipped_status += 1,
            PageOutcome::SkippedInvalid => self.skipped_invalid += 1,
            PageOutcome::Failed => self.failed += 1,
        }
    }

    /// Records a document that failed before any of its pages were seen.
    pub fn record_document_failure(&mut self) {
        self.failed_documents += 1;
    }

    /// Returns the total number of pages seen.
    pub fn total_pages(&self) -> usize {
        self.exported + self.skipped_status + self.skipped_invalid + self.failed
    }

    /// Returns true if any page or document in this collection failed.
    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.failed_documents > 0
    }
}

/// Result of exporting a single collection.
#[derive(Debug, Clone)]
pub struct CollectionSummary {
    /// Collection name as configured.
    pub name: String,
    /// Remote collection id.
    pub id: i64,
    /// Page and document counters for this collection.
    pub stats: ExportStats,
    /// Error message if the collection could not be processed at all,
    /// None if its documents were walked.
    pub error: Option<String>,
}

impl CollectionSummary {
    /// Creates a summary for a collection whose documents were walked.
    pub fn walked(name: String, id: i64, stats: ExportStats) -> Self {
        Self {
            name,
            id,
            stats,
            error: None,
        }
    }

    /// Creates a summary for a collection that failed before its first
    /// document, typically because the document listing call failed.
    pub fn failure(name: String, id: i64, error: String) -> Self {
        Self {
            name,
            id,
            stats: ExportStats::default(),
            error: Some(error),
        }
    }

    /// Returns true if the collection was processed (individual pages may
    /// still have failed).
    pub fn is_walked(&self) -> bool {
        self.error.is_none()
    }

    /// Returns true if at least one page of this collection reached disk.
    pub fn exported_any(&self) -> bool {
        self.error.is_none() && self.stats.exported > 0
    }
}

/// Aggregated results of one export run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Timestamped directory all files of this run were written under.
    pub output_dir: PathBuf,
    /// Results for each resolved collection, in processing order.
    pub collections: Vec<CollectionSummary>,
    /// Configured collection names that did not resolve.
    pub unresolved: Vec<String>,
    /// Path of the run report, None when nothing was exported.
    pub report_path: Option<PathBuf>,
}

impl RunSummary {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            collections: Vec::new(),
            unresolved: Vec::new(),
            report_path: None,
        }
    }

    /// Adds a collection result.
    pub fn add(&mut self, result: CollectionSummary) {
        self.collections.push(result);
    }

    /// Names of collections that contributed at least one exported page,
    /// in processing order. These are the ones the run report lists.
    pub fn exported_collection_names(&self) -> Vec<String> {
        self.collections
            .iter()
            .filter(|c| c.exported_any())
            .map(|c| c.name.clone())
            .collect()
    }

    /// Returns the total number of pages written across all collections.
    pub fn exported_pages(&self) -> usize {
        self.collections.iter().map(|c| c.stats.exported).sum()
    }

    /// Returns the total number of failed pages across all collections.
    pub fn failed_pages(&self) -> usize {
        self.collections.iter().map(|c| c.stats.failed).sum()
    }

    /// Returns true if anything went wrong that did not abort the run:
    /// unresolved collection names, failed collections, failed documents
    /// or failed pages.
    pub fn has_failures(&self) -> bool {
        !self.unresolved.is_empty()
            || self
                .collections
                .iter()
                .any(|c| !c.is_walked() || c.stats.has_failures())
    }
}

/// Renders the run report text.
///
/// Layout is fixed: one header line with the date, one line naming the user
/// and the status filter, then one `name;` line per collection that yielded
/// at least one exported page. Date and time fields are written unpadded.
pub fn render_report(
    started: &DateTime<Local>,
    username: &str,
    statuses: &[TranscriptStatus],
    exported_collections: &[String],
) -> String {
    let status_all = statuses
        .iter()
        .map(TranscriptStatus::as_str)
        .collect::<Vec<_>>()
        .join(" ");
    let coll_all = exported_collections
        .iter()
        .map(|name| format!("{};\n", name))
        .collect::<String>();
    format!(
        "Export request ran on {}/{}/{} at {}:{}.\nFrom user '{}', exported transcripts with status '{}' from following collections:\n {}",
        started.day(),
        started.month(),
        started.year(),
        started.hour(),
        started.minute(),
        username,
        status_all,
        coll_all
    )
}
