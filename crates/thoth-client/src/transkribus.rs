use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::{Client, Url};
use serde::Deserialize;
use thoth_core::config::HttpConfig;
use thoth_core::error::AppError;
use thoth_core::models::{Collection, Credentials, Document, DocumentMeta, Page, Session};
use thoth_core::models::TranscriptStatus;
use thoth_core::service::TranscriptService;
use tracing::warn;

/// Base URL of the hosted Transkribus platform.
pub const DEFAULT_BASE_URL: &str = "https://transkribus.eu/TrpServer";

/// Data Transfer Object for one entry of the collection listing.
///
/// Transkribus API reference: <https://readcoop.eu/transkribus/docu/rest-api/>
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TrpCollection {
    /// Numeric collection id used in subsequent calls
    pub col_id: i64,
    /// Collection name as shown to the user
    pub col_name: String,
}

/// One entry of a collection's document listing. Only the id matters here;
/// everything else comes from the full document call.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TrpDocEntry {
    pub doc_id: i64,
}

/// The `fulldoc` response: document metadata plus the complete page list.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TrpFullDoc {
    pub md: TrpDocMetadata,
    pub page_list: TrpPageList,
}

/// Document metadata as the platform reports it.
///
/// `desc` and `language` are genuinely optional; uploads often carry
/// neither.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TrpDocMetadata {
    pub doc_id: i64,
    pub title: String,
    pub uploader: String,
    pub desc: Option<String>,
    /// Comma-separated language names, e.g. `"German, Latin"`.
    pub language: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TrpPageList {
    pub pages: Vec<TrpPage>,
}

/// One page with its transcript version list, newest first.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TrpPage {
    pub page_nr: u32,
    /// URL of the scanned page image.
    pub url: String,
    pub ts_list: TrpTranscriptList,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TrpTranscriptList {
    pub transcripts: Vec<TrpTranscript>,
}

/// One transcript version of a page.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TrpTranscript {
    pub status: String,
    /// Download URL of the PAGE XML body; served without a session.
    pub url: String,
    pub page_nr: u32,
}

/// HTTP client for the Transkribus REST API.
///
/// Transkribus is a handwritten-text-recognition platform; this client
/// covers the read-only slice the exporter needs: form login, collection
/// and document listings, full document metadata and raw transcript
/// retrieval. Requests are never retried, a failure is final for the item
/// it concerns.
///
/// # Examples
///
/// ```no_run
/// use thoth_client::TranskribusClient;
/// use thoth_core::models::Credentials;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = TranskribusClient::new("https://transkribus.eu/TrpServer")?;
/// let session = client
///     .authenticate(&Credentials::new("reader@example.org", "secret"))
///     .await?;
/// let collections = client.list_collections(&session).await?;
/// println!("{} collections accessible", collections.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TranskribusClient {
    client: Client,
    base_url: Url,
    timeout_secs: u64,
}

impl TranskribusClient {
    /// Creates a client with the default 30 second request timeout.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidUrl` if the base URL is malformed and
    /// `AppError::Network` if the HTTP client cannot be built.
    pub fn new(base_url_str: &str) -> Result<Self, AppError> {
        Self::with_config(base_url_str, &HttpConfig::default())
    }

    /// Creates a client with an explicit HTTP configuration.
    pub fn with_config(base_url_str: &str, http: &HttpConfig) -> Result<Self, AppError> {
        let mut base_url = Url::parse(base_url_str)
            .map_err(|_| AppError::InvalidUrl(base_url_str.to_string()))?;
        // Url::join replaces the last path segment unless the base ends in
        // a slash, and the platform lives under a path prefix.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .user_agent("Thoth/0.1 (transcript-export-bot)")
            .timeout(http.timeout)
            .build()
            .map_err(|e| AppError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            timeout_secs: http.timeout_secs(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        self.base_url
            .join(path)
            .map_err(|e| AppError::InvalidUrl(e.to_string()))
    }

    fn session_endpoint(&self, path: &str, session: &Session) -> Result<Url, AppError> {
        let mut url = self.endpoint(path)?;
        url.query_pairs_mut()
            .append_pair("JSESSIONID", session.as_str());
        Ok(url)
    }

    fn map_request_error(&self, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::Timeout(self.timeout_secs)
        } else if e.is_connect() {
            AppError::Network(format!("Connection failed: {}", e))
        } else {
            AppError::Api(e.to_string())
        }
    }

    /// Makes a GET request and turns non-success statuses into errors.
    async fn get_checked(&self, url: Url) -> Result<reqwest::Response, AppError> {
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::Api(format!(
                "HTTP {} from {}",
                status.as_u16(),
                url
            )));
        }
        Ok(resp)
    }

    /// Logs in with a form-encoded POST and extracts the session id from
    /// the XML response.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<Session, AppError> {
        let url = self.endpoint("rest/auth/login")?;
        let resp = self
            .client
            .post(url)
            .form(&[
                ("user", credentials.username.as_str()),
                ("pw", credentials.password.as_str()),
            ])
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::Auth(format!(
                "login returned HTTP {}",
                status.as_u16()
            )));
        }

        let body = resp.text().await.map_err(|e| self.map_request_error(e))?;
        let session_id = extract_session_id(&body)
            .map_err(|e| AppError::Auth(format!("login response was not XML: {}", e)))?
            .ok_or_else(|| AppError::Auth("no sessionId in login response".to_string()))?;
        Ok(Session::new(session_id))
    }

    /// Lists every collection the session's user can read.
    pub async fn list_collections(&self, session: &Session) -> Result<Vec<Collection>, AppError> {
        let url = self.session_endpoint("rest/collections/list", session)?;
        let resp = self.get_checked(url).await?;
        let collections: Vec<TrpCollection> =
            resp.json().await.map_err(|e| AppError::Api(e.to_string()))?;
        Ok(collections
            .into_iter()
            .map(|c| Collection {
                id: c.col_id,
                name: c.col_name,
            })
            .collect())
    }

    /// Lists the document ids of one collection in the platform's order.
    pub async fn list_document_ids(
        &self,
        session: &Session,
        collection_id: i64,
    ) -> Result<Vec<i64>, AppError> {
        let url =
            self.session_endpoint(&format!("rest/collections/{}/list", collection_id), session)?;
        let resp = self.get_checked(url).await?;
        let entries: Vec<TrpDocEntry> =
            resp.json().await.map_err(|e| AppError::Api(e.to_string()))?;
        Ok(entries.into_iter().map(|e| e.doc_id).collect())
    }

    /// Fetches metadata and the full page list of one document.
    pub async fn fetch_document(
        &self,
        session: &Session,
        collection_id: i64,
        document_id: i64,
    ) -> Result<Document, AppError> {
        let url = self.session_endpoint(
            &format!("rest/collections/{}/{}/fulldoc", collection_id, document_id),
            session,
        )?;
        let resp = self.get_checked(url).await?;
        let full: TrpFullDoc = resp.json().await.map_err(|e| AppError::Api(e.to_string()))?;
        Ok(Self::into_document(full))
    }

    /// Fetches a raw transcript body. Transcript URLs come from the page
    /// list and are served without a session.
    pub async fn fetch_transcript(&self, url: &str) -> Result<Vec<u8>, AppError> {
        let parsed = Url::parse(url).map_err(|_| AppError::InvalidUrl(url.to_string()))?;
        let resp = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::Fetch {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let bytes = resp.bytes().await.map_err(|e| self.map_request_error(e))?;
        Ok(bytes.to_vec())
    }

    /// Converts a `fulldoc` response into the internal document model.
    ///
    /// Only the newest transcript of each page is kept. Pages without any
    /// transcript entry, or whose status is outside the canonical set, are
    /// dropped here with a warning; the pipeline never sees them.
    ///
    /// # Examples
    ///
    /// ```
    /// use thoth_client::transkribus::{
    ///     TranskribusClient, TrpDocMetadata, TrpFullDoc, TrpPageList,
    /// };
    ///
    /// let full = TrpFullDoc {
    ///     md: TrpDocMetadata {
    ///         doc_id: 42,
    ///         title: "Letter One".to_string(),
    ///         uploader: "archivist@example.org".to_string(),
    ///         desc: None,
    ///         language: Some("German, Latin".to_string()),
    ///     },
    ///     page_list: TrpPageList { pages: vec![] },
    /// };
    ///
    /// let document = TranskribusClient::into_document(full);
    /// assert_eq!(document.meta.description, "No description");
    /// assert_eq!(document.meta.languages, vec!["German", "Latin"]);
    /// ```
    pub fn into_document(full: TrpFullDoc) -> Document {
        let meta = DocumentMeta {
            id: full.md.doc_id,
            title: full.md.title,
            uploader: full.md.uploader,
            description: full
                .md
                .desc
                .unwrap_or_else(|| "No description".to_string()),
            languages: full.md.language.map(split_languages).unwrap_or_default(),
        };

        let mut pages = Vec::with_capacity(full.page_list.pages.len());
        for page in full.page_list.pages {
            let Some(latest) = page.ts_list.transcripts.into_iter().next() else {
                warn!(
                    "Page {} of \"{}\" has no transcript, skipping",
                    page.page_nr, meta.title
                );
                continue;
            };
            let Some(status) = TranscriptStatus::parse(&latest.status) else {
                warn!(
                    "Page {} of \"{}\" has unknown status \"{}\", skipping",
                    latest.page_nr, meta.title, latest.status
                );
                continue;
            };
            pages.push(Page {
                number: latest.page_nr,
                status,
                transcript_url: latest.url,
                image_url: page.url,
            });
        }

        Document { meta, pages }
    }
}

#[async_trait::async_trait]
impl TranscriptService for TranskribusClient {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Session, AppError> {
        TranskribusClient::authenticate(self, credentials).await
    }

    async fn list_collections(&self, session: &Session) -> Result<Vec<Collection>, AppError> {
        TranskribusClient::list_collections(self, session).await
    }

    async fn list_document_ids(
        &self,
        session: &Session,
        collection_id: i64,
    ) -> Result<Vec<i64>, AppError> {
        TranskribusClient::list_document_ids(self, session, collection_id).await
    }

    async fn fetch_document(
        &self,
        session: &Session,
        collection_id: i64,
        document_id: i64,
    ) -> Result<Document, AppError> {
        TranskribusClient::fetch_document(self, session, collection_id, document_id).await
    }

    async fn fetch_transcript(&self, url: &str) -> Result<Vec<u8>, AppError> {
        TranskribusClient::fetch_transcript(self, url).await
    }
}

/// Pulls the text of the first `sessionId` element out of the login
/// response.
fn extract_session_id(xml: &str) -> Result<Option<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut inside = false;
    loop {
        match reader.read_event()? {
            Event::Eof => return Ok(None),
            Event::Start(e) if e.local_name().as_ref() == b"sessionId" => inside = true,
            Event::Text(t) if inside => {
                let id = t.unescape()?.trim().to_string();
                if id.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(id));
            }
            Event::End(_) if inside => return Ok(None),
            _ => {}
        }
    }
}

fn split_languages(raw: String) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LOGIN_OK: &str =
        "<trpUserLogin><userId>99</userId><sessionId>SESS123</sessionId></trpUserLogin>";

    fn full_doc_json() -> &'static str {
        r#"{
            "md": {
                "docId": 42,
                "title": "Letter One",
                "uploader": "archivist@example.org",
                "desc": "Estate letters",
                "language": "German, Latin",
                "nrOfPages": 2
            },
            "pageList": {
                "pages": [
                    {
                        "pageNr": 1,
                        "url": "https://files.example/img/1.jpg",
                        "tsList": {
                            "transcripts": [
                                {"status": "DONE", "url": "https://files.example/ts/1.xml", "pageNr": 1, "tsId": 900},
                                {"status": "NEW", "url": "https://files.example/ts/1-old.xml", "pageNr": 1, "tsId": 800}
                            ]
                        }
                    },
                    {
                        "pageNr": 2,
                        "url": "https://files.example/img/2.jpg",
                        "tsList": {"transcripts": []}
                    },
                    {
                        "pageNr": 3,
                        "url": "https://files.example/img/3.jpg",
                        "tsList": {
                            "transcripts": [
                                {"status": "GT", "url": "https://files.example/ts/3.xml", "pageNr": 3, "tsId": 700}
                            ]
                        }
                    }
                ]
            }
        }"#
    }

    fn client_for(server: &MockServer) -> TranskribusClient {
        TranskribusClient::new(&format!("{}/TrpServer", server.uri())).unwrap()
    }

    #[test]
    fn test_new_with_valid_url() {
        let client = TranskribusClient::new(DEFAULT_BASE_URL).unwrap();
        // The base keeps its path prefix and gains the slash join needs.
        assert_eq!(client.base_url.as_str(), "https://transkribus.eu/TrpServer/");
        let url = client.endpoint("rest/auth/login").unwrap();
        assert_eq!(
            url.as_str(),
            "https://transkribus.eu/TrpServer/rest/auth/login"
        );
    }

    #[test]
    fn test_new_with_invalid_url() {
        let result = TranskribusClient::new("not-a-valid-url");
        assert!(matches!(result, Err(AppError::InvalidUrl(_))));
    }

    #[test]
    fn test_extract_session_id() {
        assert_eq!(
            extract_session_id(LOGIN_OK).unwrap(),
            Some("SESS123".to_string())
        );
        assert_eq!(
            extract_session_id("<trpUserLogin><userId>99</userId></trpUserLogin>").unwrap(),
            None
        );
        assert!(extract_session_id("<trpUserLogin><sessionId></broken>").is_err());
    }

    #[test]
    fn test_full_doc_deserialization() {
        let full: TrpFullDoc = serde_json::from_str(full_doc_json()).unwrap();
        assert_eq!(full.md.doc_id, 42);
        assert_eq!(full.page_list.pages.len(), 3);
        assert_eq!(full.page_list.pages[0].ts_list.transcripts.len(), 2);
    }

    #[test]
    fn test_into_document_keeps_newest_and_drops_unusable() {
        let full: TrpFullDoc = serde_json::from_str(full_doc_json()).unwrap();
        let document = TranskribusClient::into_document(full);

        assert_eq!(document.meta.id, 42);
        assert_eq!(document.meta.description, "Estate letters");
        assert_eq!(document.meta.languages, vec!["German", "Latin"]);
        // Page 2 has no transcript, page 3 an unknown status.
        assert_eq!(document.pages.len(), 1);
        let page = &document.pages[0];
        assert_eq!(page.number, 1);
        assert_eq!(page.status, TranscriptStatus::Done);
        assert_eq!(page.transcript_url, "https://files.example/ts/1.xml");
        assert_eq!(page.image_url, "https://files.example/img/1.jpg");
    }

    #[test]
    fn test_into_document_applies_defaults() {
        let full = TrpFullDoc {
            md: TrpDocMetadata {
                doc_id: 7,
                title: "Untitled".to_string(),
                uploader: "archivist".to_string(),
                desc: None,
                language: None,
            },
            page_list: TrpPageList { pages: vec![] },
        };
        let document = TranskribusClient::into_document(full);
        assert_eq!(document.meta.description, "No description");
        assert!(document.meta.languages.is_empty());
    }

    #[tokio::test]
    async fn test_authenticate_posts_form_and_reads_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/TrpServer/rest/auth/login"))
            .and(body_string_contains("user=reader%40example.org"))
            .and(body_string_contains("pw=secret"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LOGIN_OK))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let session = client
            .authenticate(&Credentials::new("reader@example.org", "secret"))
            .await
            .unwrap();
        assert_eq!(session.as_str(), "SESS123");
    }

    #[tokio::test]
    async fn test_authenticate_rejected_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/TrpServer/rest/auth/login"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .authenticate(&Credentials::new("reader", "bad"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
        assert!(err.to_string().contains("403"));
    }

    #[tokio::test]
    async fn test_list_collections_sends_session_param() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/TrpServer/rest/collections/list"))
            .and(query_param("JSESSIONID", "SESS123"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[{"colId": 1, "colName": "ArchiveA"}, {"colId": 2, "colName": "Charters"}]"#,
            ))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let collections = client
            .list_collections(&Session::new("SESS123"))
            .await
            .unwrap();
        assert_eq!(collections.len(), 2);
        assert_eq!(collections[0].id, 1);
        assert_eq!(collections[0].name, "ArchiveA");
    }

    #[tokio::test]
    async fn test_list_document_ids() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/TrpServer/rest/collections/1/list"))
            .and(query_param("JSESSIONID", "SESS123"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"[{"docId": 42, "title": "x"}, {"docId": 43}]"#),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let ids = client
            .list_document_ids(&Session::new("SESS123"), 1)
            .await
            .unwrap();
        assert_eq!(ids, vec![42, 43]);
    }

    #[tokio::test]
    async fn test_fetch_document_converts_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/TrpServer/rest/collections/1/42/fulldoc"))
            .and(query_param("JSESSIONID", "SESS123"))
            .respond_with(ResponseTemplate::new(200).set_body_string(full_doc_json()))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let document = client
            .fetch_document(&Session::new("SESS123"), 1, 42)
            .await
            .unwrap();
        assert_eq!(document.meta.title, "Letter One");
        assert_eq!(document.pages.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_transcript_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/ts/1.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"<PcGts/>".to_vec()))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let body = client
            .fetch_transcript(&format!("{}/files/ts/1.xml", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, b"<PcGts/>");
    }

    #[tokio::test]
    async fn test_fetch_transcript_non_success_is_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/ts/404.xml"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let url = format!("{}/files/ts/404.xml", server.uri());
        let err = client.fetch_transcript(&url).await.unwrap_err();
        match err {
            AppError::Fetch { status, url: u } => {
                assert_eq!(status, 404);
                assert_eq!(u, url);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_listing_error_status_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/TrpServer/rest/collections/list"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .list_collections(&Session::new("SESS123"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Api(_)));
        assert!(err.to_string().contains("HTTP 500"));
    }
}
