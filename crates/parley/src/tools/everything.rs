//! File search backed by the HTTP interface of a local "Everything" search
//! service.
//!
//! Results are paginated. The first page tells how far the results go, the
//! rest are fetched concurrently and merged in offset order.

mod aggregate;
mod fetch;
mod page;

use std::sync::Arc;

use parley_core::tool::{
    Error as ToolError, Parameter, Tool, ToolResult, parameters_of,
};
use schemars::JsonSchema;
use serde::Deserialize;

pub use aggregate::{
    MAX_PAGES, PAGE_STRIDE, search_concurrent, search_sequential,
};
pub use fetch::{DEFAULT_BASE_URL, FetchError, HttpPageFetcher, PageFetcher};
pub use page::{Page, PageParser, SearchResult, parse_page};

/// Input of [`SearchFilesTool`].
#[derive(Deserialize, JsonSchema)]
pub struct SearchFilesParameters {
    /// The query to search for files.
    query: String,
}

/// A tool that searches the user's files by name.
pub struct SearchFilesTool<F: PageFetcher = HttpPageFetcher> {
    fetcher: Arc<F>,
    parameters: Vec<Parameter>,
}

impl SearchFilesTool {
    /// Creates a tool that talks to the service at `base_url`.
    #[inline]
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self::with_fetcher(HttpPageFetcher::new(base_url))
    }
}

impl<F: PageFetcher> SearchFilesTool<F> {
    /// Creates a tool that reads pages from `fetcher`.
    #[inline]
    pub fn with_fetcher(fetcher: F) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            parameters: parameters_of::<SearchFilesParameters>(),
        }
    }
}

impl Default for SearchFilesTool {
    #[inline]
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl<F: PageFetcher> Tool for SearchFilesTool<F> {
    type Input = SearchFilesParameters;

    fn name(&self) -> &str {
        "search_files"
    }

    fn description(&self) -> &str {
        r#"Searches for files via "Everything" application using the provided query and returns a list of dictionaries containing the file path, size, and modified date.
This is a preferred way to search for files quickly and efficiently.

:param query: The query to search for files.
:return: A list of dictionaries containing the file path, size, and modified date."#
    }

    fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let fetcher = Arc::clone(&self.fetcher);
        async move {
            let results = search_concurrent(fetcher, &input.query)
                .await
                .map_err(|err| {
                    ToolError::execution_error().with_reason(err.to_string())
                })?;
            debug!("found {} file(s) for {:?}", results.len(), input.query);
            serde_json::to_string(&results).map_err(|err| {
                ToolError::execution_error().with_reason(err.to_string())
            })
        }
    }
}
