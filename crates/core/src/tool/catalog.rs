use app_insight_model::ModelTool;
use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Deserializer};
use serde_json::{Number, Value};

/// The tools the model can call.
///
/// The set is closed: adding a tool means adding a variant here, and the
/// compiler points at every place that has to learn about it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ToolKind {
    /// Metadata of an app.
    AppInfo,
    /// Data sources of an app.
    ListDataSources,
    /// A single data source.
    GetDataSource,
    /// Rows of a data source.
    GetDataSourceEntries,
    /// Media folders of an app.
    ListMediaFolders,
    /// Files in a media folder.
    ListFolderFiles,
    /// A single file.
    GetFile,
}

impl ToolKind {
    /// All tools, in the order they are offered to the model.
    pub const ALL: [ToolKind; 7] = [
        ToolKind::AppInfo,
        ToolKind::ListDataSources,
        ToolKind::GetDataSource,
        ToolKind::GetDataSourceEntries,
        ToolKind::ListMediaFolders,
        ToolKind::ListFolderFiles,
        ToolKind::GetFile,
    ];

    /// Returns the name the model calls this tool by.
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::AppInfo => "get_app_info",
            ToolKind::ListDataSources => "list_data_sources",
            ToolKind::GetDataSource => "get_data_source",
            ToolKind::GetDataSourceEntries => "get_data_source_entries",
            ToolKind::ListMediaFolders => "list_media_folders",
            ToolKind::ListFolderFiles => "list_folder_files",
            ToolKind::GetFile => "get_file",
        }
    }

    /// Looks up a tool by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    fn description(self, default_app_id: &str) -> String {
        match self {
            ToolKind::AppInfo => format!(
                "Get the metadata of an app: name, settings, creation and \
                 update dates. Defaults to app {default_app_id}."
            ),
            ToolKind::ListDataSources => format!(
                "List the data sources of an app, with their IDs, names and \
                 columns. Defaults to app {default_app_id}."
            ),
            ToolKind::GetDataSource => "Get the details of a single data \
                source: name, columns, access rules and timestamps."
                .to_owned(),
            ToolKind::GetDataSourceEntries => "Get the rows (entries) of a \
                data source. Large data sources are truncated to the first 50 \
                rows, and the result says so."
                .to_owned(),
            ToolKind::ListMediaFolders => format!(
                "List the media folders of an app. Defaults to app \
                 {default_app_id}."
            ),
            ToolKind::ListFolderFiles => {
                "List the files stored in a media folder.".to_owned()
            }
            ToolKind::GetFile => {
                "Get the metadata of a single media file: name, type, size \
                 and URL."
                    .to_owned()
            }
        }
    }

    fn parameter_schema(self) -> Value {
        match self {
            ToolKind::AppInfo
            | ToolKind::ListDataSources
            | ToolKind::ListMediaFolders => object_schema::<AppInput>(),
            ToolKind::GetDataSource | ToolKind::GetDataSourceEntries => {
                object_schema::<DataSourceInput>()
            }
            ToolKind::ListFolderFiles => object_schema::<FolderInput>(),
            ToolKind::GetFile => object_schema::<FileInput>(),
        }
    }
}

/// The tool definitions offered to the model.
///
/// A catalog is built once for an application context and never changes
/// afterwards.
#[derive(Clone, Debug)]
pub struct ToolCatalog {
    default_app_id: String,
    definitions: Vec<ModelTool>,
}

impl ToolCatalog {
    /// Creates the catalog for the given default app.
    pub fn new<S: Into<String>>(default_app_id: S) -> Self {
        let default_app_id = default_app_id.into();
        let definitions = ToolKind::ALL
            .into_iter()
            .map(|kind| ModelTool {
                name: kind.name().to_owned(),
                description: kind.description(&default_app_id),
                parameters: kind.parameter_schema(),
            })
            .collect();
        Self {
            default_app_id,
            definitions,
        }
    }

    /// Returns the app that tools fall back to.
    #[inline]
    pub fn default_app_id(&self) -> &str {
        &self.default_app_id
    }

    /// Returns the tool definitions, in catalog order.
    #[inline]
    pub fn definitions(&self) -> &[ModelTool] {
        &self.definitions
    }

    /// Picks the requested app, falling back to the default one.
    pub(crate) fn resolve_app_id<'a>(
        &'a self,
        requested: Option<&'a str>,
    ) -> &'a str {
        requested
            .filter(|id| !id.trim().is_empty())
            .unwrap_or(self.default_app_id.as_str())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct AppInput {
    /// The app to query. Leave empty to use the default app.
    #[serde(default, deserialize_with = "optional_id")]
    #[schemars(with = "Option<String>")]
    pub(crate) app_id: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct DataSourceInput {
    /// The data source ID.
    #[serde(deserialize_with = "id")]
    #[schemars(with = "String")]
    pub(crate) data_source_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct FolderInput {
    /// The media folder ID.
    #[serde(deserialize_with = "id")]
    #[schemars(with = "String")]
    pub(crate) folder_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct FileInput {
    /// The media file ID.
    #[serde(deserialize_with = "id")]
    #[schemars(with = "String")]
    pub(crate) file_id: String,
}

/// Models often pass numeric IDs as JSON numbers, accept both.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(Number),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(text) => text,
            RawId::Number(number) => number.to_string(),
        }
    }
}

fn id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    RawId::deserialize(deserializer).map(String::from)
}

fn optional_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Option::<RawId>::deserialize(deserializer)?.map(String::from))
}

fn object_schema<T: JsonSchema>() -> Value {
    let mut schema = schema_for!(T).to_value();
    if let Value::Object(map) = &mut schema {
        map.remove("$schema");
        map.remove("title");
    }
    schema
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_catalog_covers_every_tool() {
        let catalog = ToolCatalog::new("123");
        let names = catalog
            .definitions()
            .iter()
            .map(|def| def.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            [
                "get_app_info",
                "list_data_sources",
                "get_data_source",
                "get_data_source_entries",
                "list_media_folders",
                "list_folder_files",
                "get_file",
            ]
        );
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ToolKind::from_name("delete_app"), None);
    }

    #[test]
    fn test_default_app_is_described() {
        let catalog = ToolCatalog::new("4242");
        let def = &catalog.definitions()[1];
        assert!(def.description.contains("4242"));
        assert_eq!(catalog.default_app_id(), "4242");
    }

    #[test]
    fn test_required_parameters() {
        let catalog = ToolCatalog::new("1");
        let required = |name: &str| {
            let def = catalog
                .definitions()
                .iter()
                .find(|def| def.name == name)
                .unwrap();
            assert_eq!(def.parameters["type"], json!("object"));
            def.parameters
                .get("required")
                .cloned()
                .unwrap_or(json!([]))
        };
        assert_eq!(required("get_app_info"), json!([]));
        assert_eq!(required("get_data_source"), json!(["data_source_id"]));
        assert_eq!(
            required("get_data_source_entries"),
            json!(["data_source_id"])
        );
        assert_eq!(required("list_folder_files"), json!(["folder_id"]));
        assert_eq!(required("get_file"), json!(["file_id"]));
    }

    #[test]
    fn test_ids_accept_numbers() {
        let input: DataSourceInput =
            serde_json::from_value(json!({ "data_source_id": 17 })).unwrap();
        assert_eq!(input.data_source_id, "17");

        let input: AppInput = serde_json::from_value(json!({})).unwrap();
        assert_eq!(input.app_id, None);
        let input: AppInput =
            serde_json::from_value(json!({ "app_id": 99 })).unwrap();
        assert_eq!(input.app_id.as_deref(), Some("99"));

        assert!(serde_json::from_value::<FileInput>(json!({})).is_err());
    }

    #[test]
    fn test_resolve_app_id() {
        let catalog = ToolCatalog::new("1");
        assert_eq!(catalog.resolve_app_id(None), "1");
        assert_eq!(catalog.resolve_app_id(Some("")), "1");
        assert_eq!(catalog.resolve_app_id(Some("2")), "2");
    }
}
