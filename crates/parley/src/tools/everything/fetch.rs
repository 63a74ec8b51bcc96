use reqwest::Client;
use url::Url;

/// The default address of the local search service.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5432";

/// An error while fetching a results page.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The configured base URL is not a valid URL.
    #[error("invalid search service URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The request could not be completed.
    #[error("search service request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The service answered with a non-success status.
    #[error("search service returned status {0}")]
    Status(u16),
}

/// A source of results pages for `(query, offset)` pairs.
pub trait PageFetcher: Send + Sync + 'static {
    /// Fetches one results page as HTML.
    ///
    /// The returned future must not borrow `self`.
    fn fetch_page(
        &self,
        query: &str,
        offset: u64,
    ) -> impl Future<Output = Result<String, FetchError>> + Send + 'static;
}

/// Fetches pages from the HTTP interface of the search service.
#[derive(Clone, Debug)]
pub struct HttpPageFetcher {
    client: Client,
    base_url: String,
}

impl HttpPageFetcher {
    /// Creates a fetcher for the service at `base_url`.
    #[inline]
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    fn page_url(&self, query: &str, offset: u64) -> Result<Url, FetchError> {
        let offset = offset.to_string();
        let url = Url::parse_with_params(
            &self.base_url,
            &[("search", query), ("offset", offset.as_str())],
        )?;
        Ok(url)
    }
}

impl Default for HttpPageFetcher {
    #[inline]
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl PageFetcher for HttpPageFetcher {
    fn fetch_page(
        &self,
        query: &str,
        offset: u64,
    ) -> impl Future<Output = Result<String, FetchError>> + Send + 'static {
        let client = self.client.clone();
        let url = self.page_url(query, offset);
        async move {
            let url = url?;
            trace!("fetching {url}");
            let resp = client.get(url).send().await?;
            let status = resp.status();
            if !status.is_success() {
                return Err(FetchError::Status(status.as_u16()));
            }
            Ok(resp.text().await?)
        }
    }
}
