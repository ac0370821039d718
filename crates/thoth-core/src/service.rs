//! Capability trait for the remote transcription platform.

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::{Collection, Credentials, Document, Session};

/// Trait for the remote transcription platform.
///
/// This trait defines the read-only calls the export pipeline needs:
/// authenticate once, walk collections, documents and pages, and fetch
/// transcript bodies. Keeping the pipeline behind this seam lets tests
/// drive it with an in-memory platform instead of HTTP.
///
/// Implementations are not expected to retry; the pipeline treats every
/// error as final for the item it concerns.
#[async_trait]
pub trait TranscriptService: Send + Sync {
    /// Log in and obtain a session token.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Auth`] when the credentials are rejected or the
    /// login response carries no session id.
    async fn authenticate(&self, credentials: &Credentials) -> Result<Session, AppError>;

    /// List every collection the authenticated user can read.
    async fn list_collections(&self, session: &Session) -> Result<Vec<Collection>, AppError>;

    /// List the document ids of one collection, in the platform's order.
    async fn list_document_ids(
        &self,
        session: &Session,
        collection_id: i64,
    ) -> Result<Vec<i64>, AppError>;

    /// Fetch a document's metadata together with its full page list.
    ///
    /// Pages without a usable transcript entry are already dropped by the
    /// implementation; the pipeline only sees pages it could export.
    async fn fetch_document(
        &self,
        session: &Session,
        collection_id: i64,
        document_id: i64,
    ) -> Result<Document, AppError>;

    /// Fetch a raw transcript body from its download URL.
    ///
    /// Transcript URLs are served without a session.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Fetch`] for non-success HTTP statuses so the
    /// caller can log the code and move on to the next page.
    async fn fetch_transcript(&self, url: &str) -> Result<Vec<u8>, AppError>;
}
