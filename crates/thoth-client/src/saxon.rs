//! PAGE-to-TEI conversion via the external Saxon XSLT processor.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thoth_core::error::AppError;
use thoth_core::transform::Transformer;
use tokio::process::Command;
use tracing::debug;

/// File name of the Saxon jar the original tooling ships with.
pub const DEFAULT_SAXON_JAR: &str = "saxon9he.jar";

/// File name of the PAGE-to-TEI stylesheet the original tooling ships with.
pub const DEFAULT_STYLESHEET: &str = "page2tei_TU.xsl";

/// [`Transformer`] that shells out to Saxon.
///
/// Each invocation runs
/// `java -jar {saxon_jar} -s:{input_dir} -o:{output_dir} {stylesheet}`,
/// converting every PAGE XML file of one document directory in a single
/// process. Saxon is a Java tool, so a `java` binary must be reachable.
///
/// # Examples
///
/// ```no_run
/// use std::path::PathBuf;
/// use thoth_client::SaxonTransformer;
///
/// // Auto-discover java from PATH
/// let transformer = SaxonTransformer::from_path(
///     PathBuf::from("saxon9he.jar"),
///     PathBuf::from("page2tei_TU.xsl"),
/// )
/// .expect("java not found in PATH");
/// ```
pub struct SaxonTransformer {
    java_path: PathBuf,
    saxon_jar: PathBuf,
    stylesheet: PathBuf,
}

impl SaxonTransformer {
    /// Creates a transformer with an explicit path to the java binary.
    pub fn new(java_path: PathBuf, saxon_jar: PathBuf, stylesheet: PathBuf) -> Self {
        Self {
            java_path,
            saxon_jar,
            stylesheet,
        }
    }

    /// Attempts to find `java` in PATH.
    ///
    /// Returns `None` when no java binary is installed, so the caller can
    /// fail before any directory is walked.
    pub fn from_path(saxon_jar: PathBuf, stylesheet: PathBuf) -> Option<Self> {
        which::which("java")
            .ok()
            .map(|java| Self::new(java, saxon_jar, stylesheet))
    }
}

#[async_trait]
impl Transformer for SaxonTransformer {
    async fn transform(&self, input_dir: &Path, output_dir: &Path) -> Result<(), AppError> {
        debug!(
            "Running Saxon on {} into {}",
            input_dir.display(),
            output_dir.display()
        );
        let output = Command::new(&self.java_path)
            .arg("-jar")
            .arg(&self.saxon_jar)
            .arg(format!("-s:{}", input_dir.display()))
            .arg(format!("-o:{}", output_dir.display()))
            .arg(&self.stylesheet)
            .output()
            .await
            .map_err(|e| AppError::Transform(format!("failed to execute java: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail = stderr.lines().last().unwrap_or("").trim();
            return Err(AppError::Transform(format!(
                "saxon exited with {} ({})",
                output.status, tail
            )));
        }
        Ok(())
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_java_path_is_transform_error() {
        let transformer = SaxonTransformer::new(
            PathBuf::from("/nonexistent/path/to/java"),
            PathBuf::from(DEFAULT_SAXON_JAR),
            PathBuf::from(DEFAULT_STYLESHEET),
        );
        let tmp = tempfile::tempdir().unwrap();

        let err = transformer
            .transform(tmp.path(), tmp.path())
            .await
            .unwrap_err();
        match err {
            AppError::Transform(msg) => assert!(msg.contains("failed to execute java")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_path_consistency_with_which_crate() {
        let which_result = which::which("java");
        let from_path_result = SaxonTransformer::from_path(
            PathBuf::from(DEFAULT_SAXON_JAR),
            PathBuf::from(DEFAULT_STYLESHEET),
        );
        assert_eq!(which_result.is_ok(), from_path_result.is_some());
        if let (Ok(expected), Some(transformer)) = (which_result, from_path_result) {
            assert_eq!(transformer.java_path, expected);
        }
    }

    #[tokio::test]
    #[ignore] // Requires java and the Saxon jar
    async fn test_transform_with_real_saxon() {
        let Some(transformer) = SaxonTransformer::from_path(
            PathBuf::from(DEFAULT_SAXON_JAR),
            PathBuf::from(DEFAULT_STYLESHEET),
        ) else {
            println!("Skipping test: java not found in PATH");
            return;
        };

        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("42 - Letter One");
        let output = tmp.path().join("TEI - 42 - Letter One");
        std::fs::create_dir_all(&input).unwrap();
        std::fs::create_dir_all(&output).unwrap();

        // Without exported files, a missing jar is the only failure mode.
        let result = transformer.transform(&input, &output).await;
        assert!(result.is_ok() || result.is_err());
    }
}
