//! Wikipedia lookups through the MediaWiki action API.

use parley_core::tool::{
    Error as ToolError, Parameter, Tool, ToolResult, parameters_of,
};
use reqwest::Client;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

/// The API endpoint of the English Wikipedia.
pub const DEFAULT_API_URL: &str = "https://en.wikipedia.org/w/api.php";

const SEARCH_LIMIT: &str = "10";

/// Input of the Wikipedia tools.
#[derive(Deserialize, JsonSchema)]
pub struct WikipediaParameters {
    /// Search query, or the page title for summaries.
    query: String,
}

#[derive(Deserialize)]
struct QueryResponse<T> {
    query: T,
}

#[derive(Deserialize)]
struct SearchQuery {
    search: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Deserialize)]
struct ExtractsQuery {
    pages: Vec<ExtractPage>,
}

#[derive(Deserialize)]
struct ExtractPage {
    title: String,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    extract: Option<String>,
}

#[derive(Clone, Debug)]
struct ApiClient {
    client: Client,
    api_url: String,
}

impl ApiClient {
    fn new(api_url: String) -> Self {
        Self {
            client: Client::new(),
            api_url,
        }
    }

    async fn query<T: DeserializeOwned>(
        &self,
        params: &[(&str, &str)],
    ) -> Result<T, ToolError> {
        let url = Url::parse_with_params(&self.api_url, params).map_err(|err| {
            ToolError::execution_error().with_reason(err.to_string())
        })?;
        trace!("wikipedia query: {url}");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|err| {
                ToolError::execution_error().with_reason(err.to_string())
            })?;
        let body = resp.bytes().await.map_err(|err| {
            ToolError::execution_error().with_reason(err.to_string())
        })?;
        let resp: QueryResponse<T> =
            serde_json::from_slice(&body).map_err(|err| {
                ToolError::execution_error().with_reason(format!(
                    "unexpected Wikipedia response: {err}"
                ))
            })?;
        Ok(resp.query)
    }

    async fn search(self, query: String) -> ToolResult {
        let found: SearchQuery = self
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srprop", ""),
                ("srlimit", SEARCH_LIMIT),
                ("srsearch", &query),
                ("format", "json"),
            ])
            .await?;
        let titles: Vec<_> =
            found.search.into_iter().map(|hit| hit.title).collect();
        Ok(titles.join(";"))
    }

    async fn summary(self, title: String) -> ToolResult {
        let found: ExtractsQuery = self
            .query(&[
                ("action", "query"),
                ("prop", "extracts"),
                ("exintro", ""),
                ("explaintext", ""),
                ("redirects", ""),
                ("titles", &title),
                ("format", "json"),
                ("formatversion", "2"),
            ])
            .await?;
        match found.pages.into_iter().next() {
            Some(page) if !page.missing => Ok(page.extract.unwrap_or_default()),
            Some(page) => Err(ToolError::execution_error().with_reason(
                format!("Page id \"{}\" does not match any pages.", page.title),
            )),
            None => Err(ToolError::execution_error().with_reason(format!(
                "Page id \"{title}\" does not match any pages."
            ))),
        }
    }
}

/// A tool that searches Wikipedia for page titles.
pub struct WikipediaSearchTool {
    api: ApiClient,
    parameters: Vec<Parameter>,
}

impl WikipediaSearchTool {
    /// Creates a tool that talks to the API at `api_url`.
    #[inline]
    pub fn new<S: Into<String>>(api_url: S) -> Self {
        Self {
            api: ApiClient::new(api_url.into()),
            parameters: parameters_of::<WikipediaParameters>(),
        }
    }
}

impl Default for WikipediaSearchTool {
    #[inline]
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl Tool for WikipediaSearchTool {
    type Input = WikipediaParameters;

    fn name(&self) -> &str {
        "search_wikipedia"
    }

    fn description(&self) -> &str {
        "Search Wikipedia for a given query and return topic IDs."
    }

    fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        self.api.clone().search(input.query)
    }
}

/// A tool that returns the introduction of a Wikipedia page.
pub struct WikipediaSummaryTool {
    api: ApiClient,
    parameters: Vec<Parameter>,
}

impl WikipediaSummaryTool {
    /// Creates a tool that talks to the API at `api_url`.
    #[inline]
    pub fn new<S: Into<String>>(api_url: S) -> Self {
        Self {
            api: ApiClient::new(api_url.into()),
            parameters: parameters_of::<WikipediaParameters>(),
        }
    }
}

impl Default for WikipediaSummaryTool {
    #[inline]
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl Tool for WikipediaSummaryTool {
    type Input = WikipediaParameters;

    fn name(&self) -> &str {
        "get_wikipedia_summary"
    }

    fn description(&self) -> &str {
        "Given a topic ID, return details about the Wikipedia page."
    }

    fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        self.api.clone().summary(input.query)
    }
}
