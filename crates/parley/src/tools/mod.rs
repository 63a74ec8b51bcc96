//! A set of built-in tools that models can use.

/// Defines a tool without state, whose input parameters are derived from
/// `input` and whose body is the async fn `run`.
macro_rules! stateless_tool {
    (
        $(#[$meta:meta])*
        pub struct $tool:ident {
            name: $name:literal,
            input: $input:ty,
            description: $description:expr,
            run: $run:ident $(,)?
        }
    ) => {
        $(#[$meta])*
        pub struct $tool {
            parameters: Vec<parley_core::tool::Parameter>,
        }

        impl $tool {
            /// Creates the tool.
            #[inline]
            pub fn new() -> Self {
                Self {
                    parameters: parley_core::tool::parameters_of::<$input>(),
                }
            }
        }

        impl Default for $tool {
            #[inline]
            fn default() -> Self {
                Self::new()
            }
        }

        impl parley_core::tool::Tool for $tool {
            type Input = $input;

            fn name(&self) -> &str {
                $name
            }

            fn description(&self) -> &str {
                $description
            }

            fn parameters(&self) -> &[parley_core::tool::Parameter] {
                &self.parameters
            }

            fn execute(
                &self,
                input: Self::Input,
            ) -> impl Future<Output = parley_core::tool::ToolResult>
                   + Send
                   + 'static {
                $run(input)
            }
        }
    };
}

pub mod everything;
mod fs;
mod shell;
mod system;
mod web;
mod wikipedia;

pub use everything::SearchFilesTool;
pub use fs::*;
pub use shell::{ExecuteShellBulkTool, ExecuteShellTool};
pub use system::{CurrentDateTool, OsUsernameTool};
pub use web::{DownloadFileTool, DownloadFilesBulkTool, FetchWebpageTool};
pub use wikipedia::{
    DEFAULT_API_URL as DEFAULT_WIKIPEDIA_API_URL, WikipediaSearchTool,
    WikipediaSummaryTool,
};
