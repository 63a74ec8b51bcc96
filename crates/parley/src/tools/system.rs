use std::env;

use chrono::Local;
use parley_core::tool::{Error as ToolError, NoParameters, ToolResult};

stateless_tool! {
    /// A tool that tells today's date.
    pub struct CurrentDateTool {
        name: "get_current_date",
        input: NoParameters,
        description: "Returns the current date in the format YYYY-MM-DD.",
        run: current_date,
    }
}

stateless_tool! {
    /// A tool that tells who is logged in.
    pub struct OsUsernameTool {
        name: "get_os_username",
        input: NoParameters,
        description: "Returns the current username of the operating system.",
        run: os_username,
    }
}

async fn current_date(_: NoParameters) -> ToolResult {
    Ok(Local::now().date_naive().format("%Y-%m-%d").to_string())
}

async fn os_username(_: NoParameters) -> ToolResult {
    ["USER", "USERNAME", "LOGNAME"]
        .into_iter()
        .find_map(|key| env::var(key).ok().filter(|name| !name.is_empty()))
        .ok_or_else(|| {
            ToolError::execution_error()
                .with_reason("the current username is not available")
        })
}
