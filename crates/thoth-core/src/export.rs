//! The export pipeline: walk collections, documents and pages, fetch
//! transcripts, annotate them and write one file per page.
//!
//! The walk is strictly sequential and failure is isolated at the level it
//! occurs: a failed page never aborts its document, a failed document never
//! aborts its collection, a failed collection never aborts the run. Only
//! authentication and collection resolution are fatal, since without them
//! there is nothing to walk. Every outcome is recorded in the returned
//! [`RunSummary`].
//!
//! Filesystem layout produced under the output root:
//!
//! ```text
//! {output_root}/{Y-M-D-H-M}/{collection}/{docId} - {title}/{pageNr} - {STATUS}.xml
//! {output_root}/{Y-M-D-H-M}/general-report.txt
//! ```

use std::path::Path;

use chrono::{DateTime, Datelike, Local, Timelike};
use tracing::{debug, info, warn};

use crate::config::JobSpec;
use crate::error::AppError;
use crate::models::{Collection, DocumentMeta, Page, Session};
use crate::pagexml::annotate_transcript;
use crate::report::{CollectionSummary, ExportStats, PageOutcome, RunSummary, render_report};
use crate::service::TranscriptService;
use crate::validate::{resolve_collections, resolve_documents};

/// Name of the run-level report file inside the run directory.
pub const REPORT_FILE_NAME: &str = "general-report.txt";

/// Directory name for a run started at the given time, unpadded
/// year-month-day-hour-minute.
pub fn run_directory_name(now: &DateTime<Local>) -> String {
    format!(
        "{}-{}-{}-{}-{}",
        now.year(),
        now.month(),
        now.day(),
        now.hour(),
        now.minute()
    )
}

/// Runs a complete export: authenticate, resolve collections, walk them and
/// write the run report.
///
/// The timestamped run directory is created only once collection resolution
/// has succeeded, so a run that aborts early leaves no trace on disk. The
/// report is written only when at least one page was exported.
///
/// # Errors
///
/// Fatal errors are authentication failure, an empty resolved collection
/// set, and I/O failures on the run directory or the report itself. All
/// other failures are recorded in the summary instead.
pub async fn run_export(
    service: &dyn TranscriptService,
    job: &JobSpec,
    output_root: &Path,
) -> Result<RunSummary, AppError> {
    let started = Local::now();

    let session = service.authenticate(&job.credentials).await?;
    info!("User successfully authenticated.");

    let accessible = service.list_collections(&session).await?;
    let (resolved, unresolved) = resolve_collections(&job.collections, &accessible)?;

    let run_dir = output_root.join(run_directory_name(&started));
    tokio::fs::create_dir_all(&run_dir).await?;

    let mut summary = RunSummary::new(run_dir.clone());
    summary.unresolved = unresolved;

    for collection in &resolved {
        match export_collection(service, &session, job, collection, &run_dir).await {
            Ok(stats) => summary.add(CollectionSummary::walked(
                collection.name.clone(),
                collection.id,
                stats,
            )),
            Err(e) => {
                warn!("Failed to process collection \"{}\": {}", collection.name, e);
                summary.add(CollectionSummary::failure(
                    collection.name.clone(),
                    collection.id,
                    e.to_string(),
                ));
            }
        }
    }

    let exported = summary.exported_collection_names();
    if exported.is_empty() {
        warn!("Could not export any transcription.");
    } else {
        let report = render_report(&started, &job.credentials.username, &job.statuses, &exported);
        let report_path = run_dir.join(REPORT_FILE_NAME);
        tokio::fs::write(&report_path, report).await?;
        summary.report_path = Some(report_path);
        info!("Successfully exported transcriptions!");
    }

    Ok(summary)
}

/// Walks one collection. An error here means the collection could not be
/// processed at all; page and document failures are counted in the stats.
async fn export_collection(
    service: &dyn TranscriptService,
    session: &Session,
    job: &JobSpec,
    collection: &Collection,
    run_dir: &Path,
) -> Result<ExportStats, AppError> {
    let listed = service.list_document_ids(session, collection.id).await?;
    let documents = resolve_documents(&job.documents, &listed);

    let mut stats = ExportStats::new();
    if documents.is_empty() {
        warn!(
            "No document in {}, or no valid document IDs in input.",
            collection.name
        );
        return Ok(stats);
    }

    // The collection directory appears as soon as documents are known, even
    // if every page below ends up skipped.
    let collection_dir = run_dir.join(&collection.name);
    tokio::fs::create_dir_all(&collection_dir).await?;

    info!(
        "Exporting {} document(s) from collection \"{}\"",
        documents.len(),
        collection.name
    );
    for document_id in documents {
        if let Err(e) = export_document(
            service,
            session,
            job,
            collection.id,
            document_id,
            &collection_dir,
            &mut stats,
        )
        .await
        {
            warn!("Failed to export document {}: {}", document_id, e);
            stats.record_document_failure();
        }
    }
    Ok(stats)
}

/// Fetches one document and exports its pages in the platform's order.
async fn export_document(
    service: &dyn TranscriptService,
    session: &Session,
    job: &JobSpec,
    collection_id: i64,
    document_id: i64,
    collection_dir: &Path,
    stats: &mut ExportStats,
) -> Result<(), AppError> {
    let document = service
        .fetch_document(session, collection_id, document_id)
        .await?;
    let document_dir = collection_dir.join(document.meta.directory_name());

    debug!(
        "Document {} (\"{}\") has {} page(s)",
        document_id,
        document.meta.title,
        document.pages.len()
    );
    for page in &document.pages {
        let outcome = export_page(service, &document.meta, page, job, &document_dir).await;
        stats.record(outcome);
    }
    Ok(())
}

/// Exports a single page; never fails, every path maps to a [`PageOutcome`].
async fn export_page(
    service: &dyn TranscriptService,
    meta: &DocumentMeta,
    page: &Page,
    job: &JobSpec,
    document_dir: &Path,
) -> PageOutcome {
    if !job.statuses.contains(&page.status) {
        debug!(
            "Skipping page {} of \"{}\" with status {}",
            page.number, meta.title, page.status
        );
        return PageOutcome::SkippedStatus;
    }

    let body = match service.fetch_transcript(&page.transcript_url).await {
        Ok(body) => body,
        Err(e) => {
            warn!(
                "Failed to fetch page {} of \"{}\": {}",
                page.number, meta.title, e
            );
            return PageOutcome::Failed;
        }
    };

    let annotated = match annotate_transcript(&body, meta, page) {
        Ok(Some(annotated)) => annotated,
        Ok(None) => {
            debug!(
                "Page {} of \"{}\" is not a PAGE document, skipping",
                page.number, meta.title
            );
            return PageOutcome::SkippedInvalid;
        }
        Err(e) => {
            warn!(
                "Unusable transcript for page {} of \"{}\": {}",
                page.number, meta.title, e
            );
            return PageOutcome::SkippedInvalid;
        }
    };

    // The document directory only appears once a page is actually written.
    if let Err(e) = tokio::fs::create_dir_all(document_dir).await {
        warn!("Failed to create {}: {}", document_dir.display(), e);
        return PageOutcome::Failed;
    }
    let path = document_dir.join(page.file_name());
    match tokio::fs::write(&path, annotated).await {
        Ok(()) => {
            debug!("Exported {}", path.display());
            PageOutcome::Exported
        }
        Err(e) => {
            warn!("Failed to write {}: {}", path.display(), e);
            PageOutcome::Failed
        }
    }
}
