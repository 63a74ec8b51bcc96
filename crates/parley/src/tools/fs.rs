use std::io;
use std::path::Path;

use parley_core::tool::{Error as ToolError, ToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::fs;

/// Input of tools taking a single path.
#[derive(Deserialize, JsonSchema)]
pub struct TargetPathParameters {
    /// Target path.
    target_path: String,
}

/// Input of tools taking several paths.
#[derive(Deserialize, JsonSchema)]
pub struct TargetPathsParameters {
    /// List of target paths.
    target_paths: Vec<String>,
}

/// Input of [`ListFilesTool`].
#[derive(Deserialize, JsonSchema)]
pub struct ListFilesParameters {
    /// Target path to list.
    target_path: String,
    /// If true, returns full paths to files and folders, otherwise names
    /// relative to `target_path`.
    #[serde(default)]
    absolute: bool,
}

/// Input of [`WriteFileTool`].
#[derive(Deserialize, JsonSchema)]
pub struct WriteFileParameters {
    /// Target file path to write content to.
    target_path: String,
    /// Content to write to the file.
    contents: String,
}

/// Input of [`CreateFileTool`].
#[derive(Deserialize, JsonSchema)]
pub struct CreateFileParameters {
    /// Target file path to create.
    target_path: String,
    /// Content to write to the file if any, empty by default.
    #[serde(default)]
    contents: Option<String>,
}

stateless_tool! {
    /// A tool that lists a directory.
    pub struct ListFilesTool {
        name: "list_files_and_folders",
        input: ListFilesParameters,
        description: r#"List user's files and folders in a given path.
This tool is useful when you need to interact with user's filesystem, it allows you to know what OS is it, what's username, where certain folders are and etc.

For Windows, you can get current username by just searching what's inside of 'C:/Users' folder.
For Linux and macOS, you can get current username by searching what's inside of '/home' folder.

:param target_path: Target path to list
:param absolute: If True, returns full paths to files and folders, otherwise relative to the 'target_path' parameter.
:return: List of file and folder names present in the 'target_path'"#,
        run: list_files_and_folders,
    }
}

stateless_tool! {
    /// A tool that reads a text file.
    pub struct ReadFileTool {
        name: "read_file_contents",
        input: TargetPathParameters,
        description: r#"Read file contents

:param target_path: Target file path to read from

:return: File contents as a string"#,
        run: read_file_contents,
    }
}

stateless_tool! {
    /// A tool that reads several text files.
    pub struct ReadFilesBulkTool {
        name: "read_file_contents_bulk",
        input: TargetPathsParameters,
        description: r#"Read file contents for multiple files
:param target_paths: List of target file paths to read from
:return: List of file contents as strings"#,
        run: read_file_contents_bulk,
    }
}

stateless_tool! {
    /// A tool that overwrites a file.
    pub struct WriteFileTool {
        name: "write_file_contents",
        input: WriteFileParameters,
        description: r#"Write content to a file at the specified path
:param target_path: Target file path to write content to
:param contents: Content to write to the file"#,
        run: write_file_contents,
    }
}

stateless_tool! {
    /// A tool that creates a file.
    pub struct CreateFileTool {
        name: "create_file",
        input: CreateFileParameters,
        description: r#"Create a new file at the specified path
:param target_path: Target file path to create
:param contents: Content to write to the file if any, empty by default"#,
        run: create_file,
    }
}

stateless_tool! {
    /// A tool that creates several empty files.
    pub struct CreateFilesBulkTool {
        name: "create_file_bulk",
        input: TargetPathsParameters,
        description: r#"Create multiple files at the specified paths
:param target_paths: List of target file paths to create"#,
        run: create_file_bulk,
    }
}

stateless_tool! {
    /// A tool that deletes a file.
    pub struct DeleteFileTool {
        name: "delete_file",
        input: TargetPathParameters,
        description: r#"Delete a file at the specified path
:param target_path: Target file path to delete"#,
        run: delete_file,
    }
}

stateless_tool! {
    /// A tool that deletes several files.
    pub struct DeleteFilesBulkTool {
        name: "delete_files_bulk",
        input: TargetPathsParameters,
        description: r#"Delete multiple files at the specified paths
:param target_paths: List of target file paths to delete"#,
        run: delete_files_bulk,
    }
}

stateless_tool! {
    /// A tool that creates a folder.
    pub struct CreateFolderTool {
        name: "create_folder",
        input: TargetPathParameters,
        description: r#"Create a new folder at the specified path
:param target_path: Target folder path to create"#,
        run: create_folder,
    }
}

stateless_tool! {
    /// A tool that creates several folders.
    pub struct CreateFoldersBulkTool {
        name: "create_folder_bulk",
        input: TargetPathsParameters,
        description: r#"Create multiple folders at the specified paths
:param target_paths: List of target folder paths to create"#,
        run: create_folder_bulk,
    }
}

stateless_tool! {
    /// A tool that checks whether a path exists.
    pub struct CheckFileExistenceTool {
        name: "check_file_existence",
        input: TargetPathParameters,
        description: r#"Check if a file or folder exists at the specified path
:param target_path: Target file or folder path to check"#,
        run: check_file_existence,
    }
}

#[inline]
fn io_error(path: &str, err: io::Error) -> ToolError {
    ToolError::execution_error().with_reason(format!("{path}: {err}"))
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> ToolResult {
    serde_json::to_string(value)
        .map_err(|err| {
            ToolError::execution_error().with_reason(err.to_string())
        })
}

async fn list_files_and_folders(input: ListFilesParameters) -> ToolResult {
    let ListFilesParameters {
        target_path,
        absolute,
    } = input;
    let mut entries = fs::read_dir(&target_path)
        .await
        .map_err(|err| io_error(&target_path, err))?;

    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|err| io_error(&target_path, err))?
    {
        let name = if absolute {
            Path::new(&target_path).join(entry.file_name())
        } else {
            entry.file_name().into()
        };
        names.push(name.to_string_lossy().into_owned());
    }
    names.sort();
    to_json(&names)
}

async fn read_file_contents(input: TargetPathParameters) -> ToolResult {
    let path = input.target_path;
    fs::read_to_string(&path)
        .await
        .map_err(|err| io_error(&path, err))
}

async fn read_file_contents_bulk(input: TargetPathsParameters) -> ToolResult {
    let mut contents = Vec::with_capacity(input.target_paths.len());
    for path in input.target_paths {
        let text = fs::read_to_string(&path)
            .await
            .map_err(|err| io_error(&path, err))?;
        contents.push(text);
    }
    to_json(&contents)
}

async fn write_file_contents(input: WriteFileParameters) -> ToolResult {
    let path = input.target_path;
    fs::write(&path, input.contents)
        .await
        .map_err(|err| io_error(&path, err))?;
    Ok(format!("Written content to '{path}'"))
}

async fn create_file(input: CreateFileParameters) -> ToolResult {
    let path = input.target_path;
    fs::write(&path, input.contents.unwrap_or_default())
        .await
        .map_err(|err| io_error(&path, err))?;
    Ok(format!("Created file '{path}'"))
}

async fn create_file_bulk(input: TargetPathsParameters) -> ToolResult {
    let mut results = Vec::with_capacity(input.target_paths.len());
    for target_path in input.target_paths {
        let created = create_file(CreateFileParameters {
            target_path,
            contents: None,
        })
        .await?;
        results.push(created);
    }
    to_json(&results)
}

async fn delete_file(input: TargetPathParameters) -> ToolResult {
    let path = input.target_path;
    fs::remove_file(&path)
        .await
        .map_err(|err| io_error(&path, err))?;
    Ok(format!("Deleted file '{path}'"))
}

async fn delete_files_bulk(input: TargetPathsParameters) -> ToolResult {
    let mut results = Vec::with_capacity(input.target_paths.len());
    for target_path in input.target_paths {
        let deleted = delete_file(TargetPathParameters { target_path }).await?;
        results.push(deleted);
    }
    to_json(&results)
}

async fn create_folder(input: TargetPathParameters) -> ToolResult {
    let path = input.target_path;
    fs::create_dir(&path)
        .await
        .map_err(|err| io_error(&path, err))?;
    Ok(format!("Created folder '{path}'"))
}

async fn create_folder_bulk(input: TargetPathsParameters) -> ToolResult {
    let mut results = Vec::with_capacity(input.target_paths.len());
    for target_path in input.target_paths {
        let created =
            create_folder(TargetPathParameters { target_path }).await?;
        results.push(created);
    }
    to_json(&results)
}

async fn check_file_existence(input: TargetPathParameters) -> ToolResult {
    let path = input.target_path;
    let exists = fs::try_exists(&path)
        .await
        .map_err(|err| io_error(&path, err))?;
    Ok(exists.to_string())
}
