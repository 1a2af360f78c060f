use std::sync::Arc;

use app_insight_backend::BackendClient;
use app_insight_model::{ContentBlock, ModelTool, ToolCallRequest};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::Instrument;

use super::catalog::{AppInput, DataSourceInput, FileInput, FolderInput};
use crate::tool::{Error, ToolCatalog, ToolKind, ToolResult};

/// Routes tool calls from the model to the backend.
///
/// The dispatcher is shared by every turn and never changes after it is
/// built, so cloning it is cheap.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    catalog: Arc<ToolCatalog>,
    backend: BackendClient,
}

impl Dispatcher {
    /// Creates a dispatcher over the given backend.
    pub fn new(catalog: ToolCatalog, backend: BackendClient) -> Self {
        Self {
            catalog: Arc::new(catalog),
            backend,
        }
    }

    /// Returns the catalog this dispatcher serves.
    #[inline]
    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    #[inline]
    pub(crate) fn definitions(&self) -> Vec<ModelTool> {
        self.catalog.definitions().to_vec()
    }

    /// Runs one tool call.
    pub async fn dispatch(&self, name: &str, input: Value) -> ToolResult {
        let Some(kind) = ToolKind::from_name(name) else {
            warn!("tool not found: {name}");
            return Err(Error::unknown_tool(name));
        };

        let backend = &self.backend;
        let value = match kind {
            ToolKind::AppInfo => {
                let input: AppInput = parse_input(input)?;
                backend.app(self.app_id(&input)).await
            }
            ToolKind::ListDataSources => {
                let input: AppInput = parse_input(input)?;
                backend.data_sources(self.app_id(&input)).await
            }
            ToolKind::GetDataSource => {
                let input: DataSourceInput = parse_input(input)?;
                backend.data_source(&input.data_source_id).await
            }
            ToolKind::GetDataSourceEntries => {
                let input: DataSourceInput = parse_input(input)?;
                backend.data_source_entries(&input.data_source_id).await
            }
            ToolKind::ListMediaFolders => {
                let input: AppInput = parse_input(input)?;
                backend.media_folders(self.app_id(&input)).await
            }
            ToolKind::ListFolderFiles => {
                let input: FolderInput = parse_input(input)?;
                backend.folder_files(&input.folder_id).await
            }
            ToolKind::GetFile => {
                let input: FileInput = parse_input(input)?;
                backend.file(&input.file_id).await
            }
        }?;
        Ok(value)
    }

    /// Runs the tool calls of one round, one after another.
    ///
    /// The returned blocks answer the requests in the same order. A failed
    /// call yields an error-tagged result and never stops the others.
    pub async fn handle_requests(
        &self,
        requests: Vec<ToolCallRequest>,
    ) -> Vec<ContentBlock> {
        let mut results = Vec::with_capacity(requests.len());
        for req in requests {
            let ToolCallRequest {
                id,
                name,
                arguments,
            } = req;
            trace!("running a tool ({id}) with args: {arguments:?}");
            let result = self
                .dispatch(&name, arguments)
                .instrument(debug_span!("tool dispatch", tool = %name))
                .await;
            results.push(result_block(id, result));
        }
        results
    }

    #[inline]
    fn app_id<'a>(&'a self, input: &'a AppInput) -> &'a str {
        self.catalog.resolve_app_id(input.app_id.as_deref())
    }
}

fn parse_input<T: DeserializeOwned>(input: Value) -> Result<T, Error> {
    // Some models send `null` instead of an empty object.
    let input = match input {
        Value::Null => json!({}),
        input => input,
    };
    serde_json::from_value(input)
        .map_err(|err| Error::invalid_input().with_reason(format!("{err}")))
}

fn result_block(tool_use_id: String, result: ToolResult) -> ContentBlock {
    match result {
        Ok(value) => ContentBlock::ToolResult {
            tool_use_id,
            content: value.to_string(),
            is_error: false,
        },
        Err(err) => {
            debug!("tool ({tool_use_id}) failed: {err}");
            ContentBlock::ToolResult {
                tool_use_id,
                content: json!({ "error": err.reason() }).to_string(),
                is_error: true,
            }
        }
    }
}
