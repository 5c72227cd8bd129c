//! List files tool definition.
//!
//! Lists the immediate children of an allow-listed directory, optionally
//! filtered by a shell-style name pattern.

use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, cached_schema_for_type},
    model::{CallToolResult, Content, Tool},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[cfg(feature = "http")]
use crate::domains::tools::ToolError;
use crate::domains::files::{DirectoryLister, FileEntry, ListError};

// ============================================================================
// Tool Parameters
// ============================================================================

/// Parameters for the list files tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListFilesParams {
    /// Directory to list, relative to the base directory (e.g. "www/images").
    /// Its first segment must be one of the allowed top-level directories.
    pub path: String,

    /// Optional shell-style pattern matched against entry names
    /// (e.g. "*.yaml", "icon_??.png", "[ab]*").
    #[serde(default)]
    pub pattern: Option<String>,
}

// ============================================================================
// Tool Response
// ============================================================================

/// JSON body returned for every call, successful or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListFilesResponse {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Echo of the requested path (success only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Echo of the requested pattern (success only). A listing without a
    /// pattern echoes `null`; failures omit the key.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub pattern: Option<Option<String>>,

    pub files: Vec<FileEntry>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl ListFilesResponse {
    pub fn listed(params: &ListFilesParams, files: Vec<FileEntry>) -> Self {
        Self {
            success: true,
            error: None,
            path: Some(params.path.clone()),
            pattern: Some(params.pattern.clone()),
            count: Some(files.len()),
            files,
        }
    }

    pub fn failed(error: &ListError) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            path: None,
            pattern: None,
            files: Vec::new(),
            count: None,
        }
    }
}

/// Keeps an explicit `null` distinct from a missing key.
fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

// ============================================================================
// Tool Definition
// ============================================================================

/// List files tool - read-only listing of allow-listed directories.
pub struct ListFilesTool;

impl ListFilesTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "list_files";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "List files and directories inside an allowed directory \
        of the configuration folder (non-recursive). Directories are listed first, then files, \
        sorted by name. Optionally filter entry names with a shell-style pattern such as '*.yaml'. \
        Returns JSON with name, path, is_dir, size and modified for each entry.";

    /// Execute the tool logic (shared by every transport).
    #[instrument(skip_all, fields(path = %params.path))]
    pub fn execute(params: &ListFilesParams, lister: &DirectoryLister) -> CallToolResult {
        info!("List files tool called for path: {}", params.path);

        let response = match lister.list(&params.path, params.pattern.as_deref()) {
            Ok(files) => ListFilesResponse::listed(params, files),
            Err(e) => {
                warn!("Listing {} failed: {}", params.path, e);
                ListFilesResponse::failed(&e)
            }
        };

        let body = match serde_json::to_string_pretty(&response) {
            Ok(body) => body,
            Err(e) => {
                return CallToolResult::error(vec![Content::text(format!(
                    "Failed to encode listing: {}",
                    e
                ))]);
            }
        };

        if response.success {
            CallToolResult::success(vec![Content::text(body)])
        } else {
            CallToolResult::error(vec![Content::text(body)])
        }
    }

    /// HTTP handler for this tool (for HTTP transport).
    #[cfg(feature = "http")]
    pub fn http_handler(
        arguments: serde_json::Value,
        lister: &DirectoryLister,
    ) -> Result<serde_json::Value, ToolError> {
        let params: ListFilesParams = serde_json::from_value(arguments)
            .map_err(|e| ToolError::invalid_arguments(e.to_string()))?;

        info!("List files tool (HTTP) called for path: {}", params.path);

        let result = Self::execute(&params, lister);

        Ok(serde_json::json!({
            "content": result.content,
            "isError": result.is_error.unwrap_or(false)
        }))
    }

    /// Create a Tool model for this tool (metadata).
    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<ListFilesParams>(),
            annotations: None,
            output_schema: None,
            icons: None,
            meta: None,
            title: Some("List files".into()),
        }
    }

    /// Create a ToolRoute for STDIO/TCP transport.
    pub fn create_route<S>(lister: Arc<DirectoryLister>) -> ToolRoute<S>
    where
        S: Send + Sync + 'static,
    {
        ToolRoute::new_dyn(Self::to_tool(), move |ctx: ToolCallContext<'_, S>| {
            let args = ctx.arguments.clone().unwrap_or_default();
            let lister = lister.clone();
            async move {
                let params: ListFilesParams =
                    serde_json::from_value(serde_json::Value::Object(args))
                        .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
                Ok(Self::execute(&params, &lister))
            }
            .boxed()
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::security::AccessPolicy;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, DirectoryLister) {
        let temp_dir = TempDir::new().unwrap();
        let www = temp_dir.path().join("www");
        fs::create_dir(&www).unwrap();
        fs::write(www.join("b.txt"), "bb").unwrap();
        fs::write(www.join("A.txt"), "a").unwrap();
        fs::create_dir(www.join("sub")).unwrap();

        let policy = AccessPolicy::new(temp_dir.path(), ["www", "themes", "custom_templates"]);
        (temp_dir, DirectoryLister::new(policy, true))
    }

    fn params(path: &str, pattern: Option<&str>) -> ListFilesParams {
        ListFilesParams {
            path: path.to_string(),
            pattern: pattern.map(String::from),
        }
    }

    fn response_of(result: &CallToolResult) -> ListFilesResponse {
        let text = match &result.content[0].raw {
            rmcp::model::RawContent::Text(text) => &text.text,
            _ => panic!("Expected text content"),
        };
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn test_list_files_execute() {
        let (_temp_dir, lister) = setup();

        let result = ListFilesTool::execute(&params("www", None), &lister);
        assert!(!result.is_error.unwrap_or(false));

        let response = response_of(&result);
        assert!(response.success);
        assert_eq!(response.path.as_deref(), Some("www"));
        assert_eq!(response.count, Some(3));
        let names: Vec<_> = response.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["sub", "A.txt", "b.txt"]);
        assert_eq!(response.files[2].path, "www/b.txt");
        assert_eq!(response.files[2].size, 2);
        assert_eq!(response.pattern, Some(None));
    }

    #[test]
    fn test_success_body_echoes_null_pattern() {
        let (_temp_dir, lister) = setup();

        let result = ListFilesTool::execute(&params("www", None), &lister);
        let text = match &result.content[0].raw {
            rmcp::model::RawContent::Text(text) => text.text.clone(),
            _ => panic!("Expected text content"),
        };
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["success"], true);
        assert_eq!(value.get("pattern"), Some(&serde_json::Value::Null));
        assert_eq!(value["path"], "www");
    }

    #[test]
    fn test_list_files_echoes_pattern() {
        let (_temp_dir, lister) = setup();

        let result = ListFilesTool::execute(&params("www", Some("*.txt")), &lister);
        let response = response_of(&result);

        assert_eq!(response.pattern, Some(Some("*.txt".to_string())));
        assert_eq!(response.count, Some(2));
    }

    #[test]
    fn test_list_files_not_allowed() {
        let (_temp_dir, lister) = setup();

        let result = ListFilesTool::execute(&params("../outside", None), &lister);
        assert!(result.is_error.unwrap_or(false));

        let response = response_of(&result);
        assert!(!response.success);
        assert_eq!(
            response.error.as_deref(),
            Some("Path not allowed. Must be in: www, themes, custom_templates")
        );
        assert!(response.files.is_empty());
        assert_eq!(response.count, None);
    }

    #[test]
    fn test_list_files_missing_directory() {
        let (_temp_dir, lister) = setup();

        let result = ListFilesTool::execute(&params("themes", None), &lister);
        let response = response_of(&result);

        assert!(!response.success);
        assert_eq!(
            response.error.as_deref(),
            Some("Directory does not exist: themes")
        );
        assert!(response.files.is_empty());
    }

    #[test]
    fn test_list_files_not_a_directory() {
        let (_temp_dir, lister) = setup();

        let result = ListFilesTool::execute(&params("www/b.txt", None), &lister);
        let response = response_of(&result);

        assert!(!response.success);
        assert_eq!(
            response.error.as_deref(),
            Some("Path is not a directory: www/b.txt")
        );
    }

    #[test]
    fn test_failure_body_omits_success_fields() {
        let (_temp_dir, lister) = setup();

        let result = ListFilesTool::execute(&params("nope", None), &lister);
        let text = match &result.content[0].raw {
            rmcp::model::RawContent::Text(text) => text.text.clone(),
            _ => panic!("Expected text content"),
        };
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["success"], false);
        assert_eq!(value["files"], serde_json::json!([]));
        assert!(value.get("count").is_none());
        assert!(value.get("path").is_none());
        assert!(value.get("pattern").is_none());
    }

    #[test]
    fn test_tool_metadata() {
        let tool = ListFilesTool::to_tool();
        assert_eq!(tool.name, "list_files");

        let schema = serde_json::Value::Object((*tool.input_schema).clone());
        let required = schema["required"].as_array().unwrap();
        assert!(required.contains(&serde_json::json!("path")));
        assert!(!required.contains(&serde_json::json!("pattern")));
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_list_files_http_handler() {
        let (_temp_dir, lister) = setup();

        let args = serde_json::json!({ "path": "www", "pattern": "*.txt" });
        let result = ListFilesTool::http_handler(args, &lister).unwrap();

        assert_eq!(result["isError"], false);
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_list_files_http_handler_missing_param() {
        let (_temp_dir, lister) = setup();

        let args = serde_json::json!({ "pattern": "*.txt" });
        let result = ListFilesTool::http_handler(args, &lister);

        assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
    }
}
