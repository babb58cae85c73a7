//! Loading attachment text, either from an inline `data:` URL or over HTTP.
//!
//! Network access happens behind the [`Fetcher`] trait, so that everything
//! above it can be tested without a network.

use std::{error, fmt, time::Duration};

use async_trait::async_trait;
use clap::Args;
use reqwest::StatusCode;

use crate::{
    data_url::parse_data_url,
    prelude::*,
    ui::{ProgressConfig, Ui},
};

/// The user agent we send unless told otherwise.
pub const DEFAULT_USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Options for fetching remote attachments.
#[derive(Args, Clone, Debug)]
pub struct FetchOpts {
    /// A timeout, in seconds, for fetching a remote attachment.
    #[clap(long, env = "MD_ATTACHMENT_TIMEOUT")]
    pub timeout: Option<u64>,

    /// The `User-Agent` header to send when fetching.
    #[clap(long, env = "MD_ATTACHMENT_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,
}

impl Default for FetchOpts {
    fn default() -> Self {
        Self {
            timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

/// Why we couldn't get the text of an attachment.
#[derive(Debug)]
pub enum LoadError {
    /// We were given no attachments at all.
    NoAttachments,

    /// A `data:` URL that we couldn't decode.
    InvalidDataUrl,

    /// The server answered, but not with success.
    HttpStatus {
        /// The URL we fetched.
        url: String,
        /// The status we got back.
        status: StatusCode,
    },

    /// The request or the response body failed.
    Fetch {
        /// The URL we fetched.
        url: String,
        /// The underlying error.
        source: reqwest::Error,
    },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::NoAttachments => write!(f, "no attachments provided"),
            LoadError::InvalidDataUrl => write!(f, "failed to parse data URL"),
            LoadError::HttpStatus { url, status } => {
                write!(f, "HTTP error fetching {url}: status {status}")
            }
            LoadError::Fetch { url, source } => {
                write!(f, "error fetching {url}: {source}")
            }
        }
    }
}

impl error::Error for LoadError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            LoadError::Fetch { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Interface for fetching the text of a non-`data:` URL.
#[async_trait]
pub trait Fetcher: fmt::Debug + Send + Sync + 'static {
    /// Fetch `url` and return its body as text.
    async fn fetch_text(&self, url: &str) -> Result<String, LoadError>;
}

/// Get the text of an attachment. `data:` URLs are decoded locally; anything
/// else goes to `fetcher`.
#[instrument(level = "debug", skip(fetcher))]
pub async fn load_attachment_text(
    url: &str,
    fetcher: &dyn Fetcher,
) -> Result<String, LoadError> {
    if url.starts_with("data:") {
        let payload = parse_data_url(url).ok_or(LoadError::InvalidDataUrl)?;
        debug!(mime_type = %payload.mime_type, "Decoded data URL");
        return Ok(payload.text);
    }
    fetcher.fetch_text(url).await
}

/// A [`Fetcher`] that uses HTTP.
#[derive(Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    ui: Ui,
}

impl HttpFetcher {
    /// Create a new HTTP fetcher.
    pub fn new(ui: Ui, opts: &FetchOpts) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(opts.user_agent.clone());
        if let Some(timeout) = opts.timeout {
            builder = builder.timeout(Duration::from_secs(timeout));
        }
        let client = builder.build().context("failed to create HTTP client")?;
        Ok(Self { client, ui })
    }

    async fn fetch_text_inner(&self, url: &str) -> Result<String, LoadError> {
        let fetch_err = |source| LoadError::Fetch {
            url: url.to_owned(),
            source,
        };
        let response = self.client.get(url).send().await.map_err(fetch_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::HttpStatus {
                url: url.to_owned(),
                status,
            });
        }
        response.text().await.map_err(fetch_err)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch_text(&self, url: &str) -> Result<String, LoadError> {
        let spinner = self.ui.new_spinner(&ProgressConfig {
            emoji: "🌐",
            msg: "Fetching attachment",
            done_msg: "Fetched attachment",
        });
        let result = self.fetch_text_inner(url).await;
        match &result {
            Ok(text) => {
                debug!(bytes = text.len(), "Fetched attachment");
                spinner.finish();
            }
            Err(err) => spinner.abandon_with_message(format!("Failed: {err}")),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tokio::{
        io::{AsyncReadExt as _, AsyncWriteExt as _},
        net::TcpListener,
    };

    use super::*;

    /// A fetcher that records what it was asked for.
    #[derive(Debug, Default)]
    struct RecordingFetcher {
        requested: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Fetcher for RecordingFetcher {
        async fn fetch_text(&self, url: &str) -> Result<String, LoadError> {
            self.requested.lock().unwrap().push(url.to_owned());
            Ok(format!("fetched {url}"))
        }
    }

    #[tokio::test]
    async fn data_urls_never_hit_the_fetcher() {
        let fetcher = RecordingFetcher::default();
        let text = load_attachment_text(
            "data:text/markdown;base64,aGVsbG8KIyBUaXRsZQ==",
            &fetcher,
        )
        .await
        .unwrap();
        assert_eq!(text, "hello\n# Title");

        let err = load_attachment_text("data:text/plain;base64,%%%", &fetcher)
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::InvalidDataUrl));
        assert!(fetcher.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_data_url_is_empty_text() {
        let fetcher = RecordingFetcher::default();
        let text = load_attachment_text("data:text/plain,", &fetcher).await.unwrap();
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn other_urls_go_to_the_fetcher() {
        let fetcher = RecordingFetcher::default();
        let text = load_attachment_text("https://example.com/a.md", &fetcher)
            .await
            .unwrap();
        assert_eq!(text, "fetched https://example.com/a.md");
        assert_eq!(
            *fetcher.requested.lock().unwrap(),
            vec!["https://example.com/a.md".to_owned()]
        );
    }

    /// Serve a single canned HTTP response on a local port, returning its URL.
    async fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0; 4096];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}/input.md")
    }

    #[tokio::test]
    async fn http_fetcher_returns_body() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: text/markdown\r\nContent-Length: 7\r\nConnection: close\r\n\r\n# Hello",
        )
        .await;
        let fetcher = HttpFetcher::new(Ui::init_for_tests(), &FetchOpts::default()).unwrap();
        let text = load_attachment_text(&url, &fetcher).await.unwrap();
        assert_eq!(text, "# Hello");
    }

    #[tokio::test]
    async fn http_fetcher_reports_bad_status() {
        let url = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        let fetcher = HttpFetcher::new(Ui::init_for_tests(), &FetchOpts::default()).unwrap();
        let err = fetcher.fetch_text(&url).await.unwrap_err();
        match &err {
            LoadError::HttpStatus { status, .. } => {
                assert_eq!(*status, StatusCode::NOT_FOUND)
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn http_fetcher_reports_connection_failures() {
        // Bind and immediately drop a listener to get a port nobody is using.
        let addr = TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap()
            .local_addr()
            .unwrap();
        let fetcher = HttpFetcher::new(
            Ui::init_for_tests(),
            &FetchOpts {
                timeout: Some(5),
                ..FetchOpts::default()
            },
        )
        .unwrap();
        let err = fetcher.fetch_text(&format!("http://{addr}/")).await.unwrap_err();
        assert!(matches!(err, LoadError::Fetch { .. }));
    }
}
