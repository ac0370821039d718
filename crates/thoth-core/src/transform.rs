//! Driving the external PAGE-to-TEI transformer over an export tree.
//!
//! The export pipeline leaves a `run/{collection}/{document}` tree behind;
//! this module walks it and invokes a [`Transformer`] once per document
//! directory, writing into a `TEI - {document}` sibling. Transformer
//! failures are counted, never fatal, so one broken document does not stop
//! the rest of the run from being converted.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::AppError;

/// Prefix of the per-document output directories.
pub const TEI_DIR_PREFIX: &str = "TEI - ";

/// Trait for the external transformation of one document directory.
///
/// The production implementation shells out to Saxon with an XSLT
/// stylesheet; tests substitute an in-process stub.
#[async_trait]
pub trait Transformer: Send + Sync {
    /// Transforms every file in `input_dir`, writing results into
    /// `output_dir`. The output directory already exists when this is
    /// called.
    async fn transform(&self, input_dir: &Path, output_dir: &Path) -> Result<(), AppError>;
}

/// Counters over one transform pass.
#[derive(Debug, Default, Clone)]
pub struct TransformSummary {
    pub transformed: usize,
    pub failed: usize,
}

impl TransformSummary {
    /// Returns the number of transformer invocations.
    pub fn total(&self) -> usize {
        self.transformed + self.failed
    }

    /// Returns true if no invocation failed.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Walks a run directory and transforms every document directory in it.
///
/// Directories whose name starts with [`TEI_DIR_PREFIX`] are outputs of an
/// earlier pass and are left alone, which makes re-running the transform
/// over the same tree safe. Each output directory is created before the
/// transformer runs.
///
/// # Errors
///
/// Only filesystem problems on the tree itself (unreadable run directory,
/// uncreatable output directory) abort the walk; transformer failures are
/// recorded in the summary.
pub async fn transform_export_tree(
    transformer: &dyn Transformer,
    run_dir: &Path,
) -> Result<TransformSummary, AppError> {
    let mut summary = TransformSummary::default();

    for collection_dir in subdirectories(run_dir).await? {
        for document_dir in subdirectories(&collection_dir).await? {
            let name = match document_dir.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            if name.starts_with(TEI_DIR_PREFIX) {
                continue;
            }
            let output_dir = collection_dir.join(format!("{TEI_DIR_PREFIX}{name}"));
            tokio::fs::create_dir_all(&output_dir).await?;
            match transformer.transform(&document_dir, &output_dir).await {
                Ok(()) => summary.transformed += 1,
                Err(e) => {
                    warn!("Failed to transform {}: {}", document_dir.display(), e);
                    summary.failed += 1;
                }
            }
        }
    }

    if summary.total() == 0 {
        info!("Nothing to transform in {}", run_dir.display());
    } else if summary.is_success() {
        info!("Successfully transformed exported PAGE XML files to TEI XML!");
    } else {
        warn!("Errors encountered while transforming exported XML files to TEI XML!");
    }
    Ok(summary)
}

async fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let mut dirs = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            dirs.push(entry.path());
        }
    }
    // read_dir order is platform dependent.
    dirs.sort();
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct StubTransformer {
        calls: Mutex<Vec<(PathBuf, PathBuf)>>,
        fail_marker: Option<String>,
    }

    #[async_trait]
    impl Transformer for StubTransformer {
        async fn transform(&self, input_dir: &Path, output_dir: &Path) -> Result<(), AppError> {
            self.calls
                .lock()
                .unwrap()
                .push((input_dir.to_path_buf(), output_dir.to_path_buf()));
            if let Some(marker) = &self.fail_marker {
                if input_dir.to_string_lossy().contains(marker.as_str()) {
                    return Err(AppError::Transform("java exited with status 2".to_string()));
                }
            }
            Ok(())
        }
    }

    fn build_tree(run_dir: &Path) {
        std::fs::create_dir_all(run_dir.join("ArchiveA/42 - Letter One")).unwrap();
        std::fs::create_dir_all(run_dir.join("ArchiveA/43 - Letter Two")).unwrap();
        std::fs::write(
            run_dir.join("ArchiveA/42 - Letter One/1 - DONE.xml"),
            "<PcGts/>",
        )
        .unwrap();
        std::fs::write(run_dir.join("general-report.txt"), "report").unwrap();
    }

    #[tokio::test]
    async fn test_transforms_each_document_directory() {
        let tmp = tempfile::tempdir().unwrap();
        build_tree(tmp.path());
        let stub = StubTransformer::default();

        let summary = transform_export_tree(&stub, tmp.path()).await.unwrap();
        assert_eq!(summary.transformed, 2);
        assert!(summary.is_success());

        let calls = stub.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[0].1,
            tmp.path().join("ArchiveA").join("TEI - 42 - Letter One")
        );
        // Output directories exist before the transformer runs.
        assert!(calls[0].1.is_dir());
        assert!(calls[1].1.is_dir());
    }

    #[tokio::test]
    async fn test_existing_tei_directories_are_not_inputs() {
        let tmp = tempfile::tempdir().unwrap();
        build_tree(tmp.path());
        std::fs::create_dir_all(tmp.path().join("ArchiveA/TEI - 42 - Letter One")).unwrap();
        let stub = StubTransformer::default();

        let summary = transform_export_tree(&stub, tmp.path()).await.unwrap();
        assert_eq!(summary.transformed, 2);
        let calls = stub.calls.lock().unwrap();
        assert!(calls
            .iter()
            .all(|(input, _)| !input.to_string_lossy().contains("TEI - ")));
    }

    #[tokio::test]
    async fn test_transformer_failure_is_counted_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        build_tree(tmp.path());
        let stub = StubTransformer {
            fail_marker: Some("42".to_string()),
            ..StubTransformer::default()
        };

        let summary = transform_export_tree(&stub, tmp.path()).await.unwrap();
        assert_eq!(summary.transformed, 1);
        assert_eq!(summary.failed, 1);
        assert!(!summary.is_success());
        assert_eq!(summary.total(), 2);
    }

    #[tokio::test]
    async fn test_missing_run_directory_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let stub = StubTransformer::default();
        let err = transform_export_tree(&stub, &tmp.path().join("absent"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }

    #[tokio::test]
    async fn test_empty_tree_transforms_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let stub = StubTransformer::default();
        let summary = transform_export_tree(&stub, tmp.path()).await.unwrap();
        assert_eq!(summary.total(), 0);
        assert!(summary.is_success());
    }
}
