use std::io;

use parley_core::tool::{Error as ToolError, ToolResult};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::process::Command;

/// Input of [`ExecuteShellTool`].
#[derive(Deserialize, JsonSchema)]
pub struct ExecuteShellParameters {
    /// Shell command to execute.
    command: String,
}

/// Input of [`ExecuteShellBulkTool`].
#[derive(Deserialize, JsonSchema)]
pub struct ExecuteShellBulkParameters {
    /// List of shell commands to execute.
    commands: Vec<String>,
}

stateless_tool! {
    /// A tool for running shell commands.
    pub struct ExecuteShellTool {
        name: "execute_shell",
        input: ExecuteShellParameters,
        description: r#"Execute a shell command and return the output.

:param command: Shell command to execute

:return: stdout output of the shell command"#,
        run: execute_shell,
    }
}

stateless_tool! {
    /// A tool for running several shell commands in one call.
    pub struct ExecuteShellBulkTool {
        name: "execute_shell_bulk",
        input: ExecuteShellBulkParameters,
        description: r#"Execute a shell command and return the output. Preffered way for executing multiple shell commands.

:param commands: List of shell commands to execute

:return: Dictionary of stdout/stderr outputs of the shell commands"#,
        run: execute_shell_bulk,
    }
}

async fn execute_shell(input: ExecuteShellParameters) -> ToolResult {
    let output = run_command_line(&input.command).await.map_err(|err| {
        ToolError::execution_error().with_reason(format!("{err}"))
    })?;
    if output.is_empty() {
        return Ok("OK".to_owned());
    }
    Ok(output)
}

async fn execute_shell_bulk(input: ExecuteShellBulkParameters) -> ToolResult {
    // One at a time, later commands may depend on earlier ones.
    let mut outputs = Map::new();
    for command in input.commands {
        let output = match run_command_line(&command).await {
            Ok(output) => output,
            Err(err) => err.to_string(),
        };
        outputs.insert(command, Value::String(output));
    }
    serde_json::to_string(&outputs)
        .map_err(|err| {
            ToolError::execution_error().with_reason(err.to_string())
        })
}

#[cfg(not(windows))]
#[inline]
fn create_command_with_inferred_shell() -> Command {
    let shell = std::env::var_os("SHELL").unwrap_or_else(|| "/bin/sh".into());
    let mut command = Command::new(shell);
    command.arg("-c");
    command
}

#[cfg(windows)]
#[inline]
fn create_command_with_inferred_shell() -> Command {
    let mut command = Command::new("cmd");
    command.arg("/C");
    command
}

/// Runs `cmdline` and returns its trimmed stdout, or its trimmed stderr when
/// stdout is empty.
async fn run_command_line(cmdline: &str) -> Result<String, io::Error> {
    let output = create_command_with_inferred_shell()
        .arg(cmdline)
        .output()
        .await?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        return Ok(stdout.trim().to_owned());
    }
    Ok(String::from_utf8_lossy(&output.stderr).trim().to_owned())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_command_line() {
        let result = run_command_line("echo 'Hello, World!'").await;
        assert_eq!(result.unwrap(), "Hello, World!");

        let result = run_command_line("echo oops >&2").await;
        assert_eq!(result.unwrap(), "oops");
    }

    #[tokio::test]
    async fn test_execute_shell_falls_back_to_ok() {
        let input = ExecuteShellParameters {
            command: "true".to_owned(),
        };
        assert_eq!(execute_shell(input).await.unwrap(), "OK");
    }

    #[tokio::test]
    async fn test_execute_shell_bulk() {
        let input = ExecuteShellBulkParameters {
            commands: vec!["echo one".to_owned(), "echo two >&2".to_owned()],
        };
        let output = execute_shell_bulk(input).await.unwrap();
        assert_eq!(output, r#"{"echo one":"one","echo two >&2":"two"}"#);
    }
}
