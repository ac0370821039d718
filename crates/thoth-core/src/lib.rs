//! Thoth Core - Domain types, validation, export pipeline and transform
//! orchestration.

pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod pagexml;
pub mod report;
pub mod service;
pub mod transform;
pub mod validate;

pub use config::{
    default_config_path, load_config_source, CredentialOverrides, ExportFileConfig, HttpConfig,
    JobSpec,
};
pub use error::AppError;
pub use export::{run_directory_name, run_export, REPORT_FILE_NAME};
pub use models::{Collection, Credentials, Document, DocumentMeta, Page, Session, TranscriptStatus};
pub use pagexml::{annotate_transcript, TEMP_NAMESPACE};
pub use report::{render_report, CollectionSummary, ExportStats, PageOutcome, RunSummary};
pub use service::TranscriptService;
pub use transform::{transform_export_tree, TransformSummary, Transformer, TEI_DIR_PREFIX};
pub use validate::{
    check_value, job_from_config, normalize_statuses, resolve_collections, resolve_documents,
    ConfigIssue,
};
