use parley_core::tool::{
    Error as ToolError, Parameter, Tool, ToolResult, parameters_of,
};
use reqwest::{Client, StatusCode};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Input of [`FetchWebpageTool`].
#[derive(Deserialize, JsonSchema)]
pub struct FetchWebpageParameters {
    /// URL of the webpage to fetch.
    url: String,
}

/// Input of [`DownloadFileTool`].
#[derive(Deserialize, JsonSchema)]
pub struct DownloadFileParameters {
    /// Target file URL to download from.
    url: String,
    /// Destination file path to download to.
    target_path: String,
}

/// Input of [`DownloadFilesBulkTool`].
#[derive(Deserialize, JsonSchema)]
pub struct DownloadFilesBulkParameters {
    /// Target file URLs to download from.
    urls: Vec<String>,
    /// Destination file paths to download to, one per URL.
    target_paths: Vec<String>,
}

/// A tool that fetches a webpage as text.
///
/// A non-200 status is reported to the model as a regular result, so that it
/// can try another page.
pub struct FetchWebpageTool {
    client: Client,
    parameters: Vec<Parameter>,
}

impl FetchWebpageTool {
    /// Creates a new fetch webpage tool.
    #[inline]
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    /// Creates the tool on top of an existing HTTP client.
    #[inline]
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            parameters: parameters_of::<FetchWebpageParameters>(),
        }
    }
}

impl Default for FetchWebpageTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for FetchWebpageTool {
    type Input = FetchWebpageParameters;

    fn name(&self) -> &str {
        "fetch_webpage"
    }

    fn description(&self) -> &str {
        r#"Fetch the content of a webpage
:param url: URL of the webpage to fetch"#
    }

    fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let client = self.client.clone();
        async move {
            let url = input.url;
            let resp = client.get(&url).send().await.map_err(|err| {
                ToolError::execution_error().with_reason(err.to_string())
            })?;
            let status = resp.status();
            if status != StatusCode::OK {
                debug!("fetching {url} failed with {status}");
                return Ok(format!(
                    "Failed to fetch webpage from '{url}', status code: {}",
                    status.as_u16()
                ));
            }
            resp.text().await.map_err(|err| {
                ToolError::execution_error().with_reason(err.to_string())
            })
        }
    }
}

/// A tool that saves the body of a URL to a file.
pub struct DownloadFileTool {
    client: Client,
    parameters: Vec<Parameter>,
}

impl DownloadFileTool {
    /// Creates a new download tool.
    #[inline]
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    /// Creates the tool on top of an existing HTTP client.
    #[inline]
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            parameters: parameters_of::<DownloadFileParameters>(),
        }
    }
}

impl Default for DownloadFileTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for DownloadFileTool {
    type Input = DownloadFileParameters;

    fn name(&self) -> &str {
        "download_file"
    }

    fn description(&self) -> &str {
        r#"Downloads file from the provided URL to a target path on user's machine

:param url: target file URL to download from
:param target_path: destination file path to download to

:return: Download result"#
    }

    fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let client = self.client.clone();
        async move {
            let DownloadFileParameters { url, target_path } = input;
            download(&client, &url, &target_path).await.map_err(|reason| {
                ToolError::execution_error().with_reason(reason)
            })
        }
    }
}

/// A tool that downloads several URLs, each to its own file.
///
/// A failed download does not stop the others; its entry in the returned map
/// holds the error message instead.
pub struct DownloadFilesBulkTool {
    client: Client,
    parameters: Vec<Parameter>,
}

impl DownloadFilesBulkTool {
    /// Creates a new bulk download tool.
    #[inline]
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    /// Creates the tool on top of an existing HTTP client.
    #[inline]
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            parameters: parameters_of::<DownloadFilesBulkParameters>(),
        }
    }
}

impl Default for DownloadFilesBulkTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for DownloadFilesBulkTool {
    type Input = DownloadFilesBulkParameters;

    fn name(&self) -> &str {
        "download_file_bulk"
    }

    fn description(&self) -> &str {
        r#"Downloads files from the provided URLs to a target paths on user's machine

:param urls: target file URLs to download from
:param target_paths: destination file paths to download to

:return: Download result for each url"#
    }

    fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let client = self.client.clone();
        async move {
            let DownloadFilesBulkParameters { urls, target_paths } = input;
            if urls.len() != target_paths.len() {
                return Err(ToolError::invalid_input().with_reason(format!(
                    "got {} url(s) but {} target path(s)",
                    urls.len(),
                    target_paths.len()
                )));
            }

            let mut results = Map::new();
            for (url, target_path) in urls.into_iter().zip(target_paths) {
                let result = download(&client, &url, &target_path)
                    .await
                    .unwrap_or_else(|reason| reason);
                results.insert(url, Value::String(result));
            }
            serde_json::to_string(&results).map_err(|err| {
                ToolError::execution_error().with_reason(err.to_string())
            })
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum DownloadError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Saves the body of `url` to `target_path`. Both the success and the
/// failure are returned as the message shown to the model.
async fn download(
    client: &Client,
    url: &str,
    target_path: &str,
) -> Result<String, String> {
    let fetch = async {
        let body = client.get(url).send().await?.bytes().await?;
        tokio::fs::write(target_path, &body).await?;
        Ok::<_, DownloadError>(body.len())
    };
    match fetch.await {
        Ok(len) => {
            debug!("downloaded {len} byte(s) to {target_path}");
            Ok(format!("Downloaded {url} successfully"))
        }
        Err(err) => Err(format!("Error while downloading {url}: {err}")),
    }
}
