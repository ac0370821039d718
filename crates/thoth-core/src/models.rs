use std::fmt;

/// Login credentials for the remote transcription platform.
///
/// The `Debug` implementation redacts the password so the struct can appear
/// in trace output without leaking secrets.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// An authenticated session token.
///
/// The platform expects the token as a `JSESSIONID` query parameter on every
/// listing and metadata call. Like [`Credentials`], the `Debug` output is
/// redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Session(String);

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Session(***)")
    }
}

/// A collection the authenticated user can read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub id: i64,
    pub name: String,
}

/// Review state of a page transcript.
///
/// The wire form is the upper-case snake name (`IN_PROGRESS` for
/// [`TranscriptStatus::InProgress`]); parsing accepts any casing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TranscriptStatus {
    New,
    InProgress,
    Done,
    Final,
}

impl TranscriptStatus {
    /// All statuses a configuration may select, in canonical order.
    pub const ALL: [TranscriptStatus; 4] = [
        TranscriptStatus::New,
        TranscriptStatus::InProgress,
        TranscriptStatus::Done,
        TranscriptStatus::Final,
    ];

    /// Parses a status name case-insensitively. Returns `None` for values
    /// outside the canonical set.
    pub fn parse(raw: &str) -> Option<TranscriptStatus> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "NEW" => Some(TranscriptStatus::New),
            "IN_PROGRESS" => Some(TranscriptStatus::InProgress),
            "DONE" => Some(TranscriptStatus::Done),
            "FINAL" => Some(TranscriptStatus::Final),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptStatus::New => "NEW",
            TranscriptStatus::InProgress => "IN_PROGRESS",
            TranscriptStatus::Done => "DONE",
            TranscriptStatus::Final => "FINAL",
        }
    }
}

impl fmt::Display for TranscriptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Document metadata as delivered by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMeta {
    pub id: i64,
    pub title: String,
    pub uploader: String,
    /// Free-text description; the platform omits it for undocumented
    /// uploads, in which case the client substitutes `"No description"`.
    pub description: String,
    /// Languages split out of the platform's comma-separated field.
    /// Empty when the uploader never set one.
    pub languages: Vec<String>,
}

impl DocumentMeta {
    /// Title with path separators replaced so it is safe as a directory
    /// name component.
    pub fn sanitized_title(&self) -> String {
        self.title.replace(['/', '\\'], "-")
    }

    /// Directory name for this document inside a collection directory.
    pub fn directory_name(&self) -> String {
        format!("{} - {}", self.id, self.sanitized_title())
    }
}

/// A single page of a document, reduced to its latest transcript.
///
/// The platform lists every transcript version per page; only the newest one
/// (the head of the version list) is ever exported, so conversion keeps just
/// that entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub status: TranscriptStatus,
    /// Download URL of the latest transcript. Publicly fetchable, no
    /// session required.
    pub transcript_url: String,
    /// URL of the scanned page image the transcript belongs to.
    pub image_url: String,
}

impl Page {
    /// File name for the exported transcript of this page.
    pub fn file_name(&self) -> String {
        format!("{} - {}.xml", self.number, self.status)
    }
}

/// A document with its metadata and all pages that survived conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub meta: DocumentMeta,
    pub pages: Vec<Page>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!(TranscriptStatus::parse("done"), Some(TranscriptStatus::Done));
        assert_eq!(
            TranscriptStatus::parse("In_Progress"),
            Some(TranscriptStatus::InProgress)
        );
        assert_eq!(TranscriptStatus::parse(" FINAL "), Some(TranscriptStatus::Final));
        assert_eq!(TranscriptStatus::parse("ready"), None);
    }

    #[test]
    fn test_status_display_is_wire_form() {
        assert_eq!(TranscriptStatus::InProgress.to_string(), "IN_PROGRESS");
        assert_eq!(TranscriptStatus::New.to_string(), "NEW");
    }

    #[test]
    fn test_sanitized_title_strips_separators() {
        let meta = DocumentMeta {
            id: 77,
            title: "Letters 1820/1821\\draft".to_string(),
            uploader: "archivist".to_string(),
            description: "No description".to_string(),
            languages: vec![],
        };
        assert_eq!(meta.sanitized_title(), "Letters 1820-1821-draft");
        assert_eq!(meta.directory_name(), "77 - Letters 1820-1821-draft");
    }

    #[test]
    fn test_page_file_name() {
        let page = Page {
            number: 4,
            status: TranscriptStatus::Done,
            transcript_url: "https://files.example/ts/4.xml".to_string(),
            image_url: "https://files.example/img/4.jpg".to_string(),
        };
        assert_eq!(page.file_name(), "4 - DONE.xml");
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("reader", "hunter2");
        let dump = format!("{:?}", creds);
        assert!(dump.contains("reader"));
        assert!(!dump.contains("hunter2"));
    }

    #[test]
    fn test_session_debug_redacts_token() {
        let session = Session::new("8A41C2FF");
        assert!(!format!("{:?}", session).contains("8A41C2FF"));
        assert_eq!(session.as_str(), "8A41C2FF");
    }
}
