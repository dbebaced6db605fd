/// Core workflow type definitions
///
/// Defines the workflow record exactly as it is persisted and exchanged as JSON.
/// Every field carries an explicit default so partial payloads (imports, API
/// requests, legacy exports) deserialize into a complete record.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Default icon shown for workflows that never picked one
pub const DEFAULT_ICON: &str = "riGlobalLine";

/// Template document stored in `globalData` for new workflows
pub const DEFAULT_GLOBAL_DATA: &str = "{\n\t\"key\": \"value\"\n}";

/// A complete workflow record
///
/// The field names on the wire follow the established export format
/// (`drawflow`, `dataColumns`, `isProtected`, ...), so exported files from older
/// versions can be inserted as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    /// Unique workflow identifier, generated when the payload leaves it empty
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default = "default_icon", deserialize_with = "icon_or_default")]
    pub icon: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Opaque extra payload carried through untouched
    #[serde(default)]
    pub data: Option<Value>,
    /// Weak reference to a folder; the folder does not own the workflow
    #[serde(default)]
    pub folder_id: Option<String>,
    /// Serialized flow graph. Ciphertext while `is_protected` is true.
    #[serde(rename = "drawflow", default, deserialize_with = "graph_data_from_any")]
    pub graph_data: String,
    /// Canonical column schema
    #[serde(default, deserialize_with = "null_as_default")]
    pub table: Vec<TableColumn>,
    /// Legacy column list, migrated into `table` on creation
    #[serde(default, deserialize_with = "null_as_default")]
    pub data_columns: Vec<TableColumn>,
    /// User-facing password token for protected workflows
    #[serde(default, deserialize_with = "null_as_default")]
    pub pass: String,
    #[serde(default)]
    pub trigger: Option<WorkflowTrigger>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub version: String,
    /// Creation time in milliseconds since the Unix epoch
    #[serde(default = "now_millis")]
    pub created_at: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_disabled: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_protected: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub settings: WorkflowSettings,
    #[serde(default = "default_global_data", deserialize_with = "global_data_or_default")]
    pub global_data: String,
}

/// One column of the workflow data table
///
/// Only `id` and `name` are interpreted; everything else (`type`, UI hints)
/// is preserved in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableColumn {
    /// Stable column identifier. Empty means "not assigned yet".
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TableColumn {
    /// Column with a name and no id, the shape legacy `dataColumns` entries have
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            extra: Map::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// What the workflow does when a block fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnError {
    #[default]
    StopWorkflow,
    KeepRunning,
    RestartWorkflow,
}

/// Execution settings recognised by the runtime
///
/// Carried through the lifecycle untouched; unknown keys survive in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowSettings {
    pub public_id: String,
    pub block_delay: u64,
    pub save_log: bool,
    pub debug_mode: bool,
    pub restart_times: u32,
    pub notification: bool,
    pub reuse_last_state: bool,
    pub input_autocomplete: bool,
    pub on_error: OnError,
    pub executed_block_on_web: bool,
    pub insert_default_column: bool,
    pub default_column_name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            public_id: String::new(),
            block_delay: 0,
            save_log: true,
            debug_mode: false,
            restart_times: 3,
            notification: true,
            reuse_last_state: false,
            input_autocomplete: true,
            on_error: OnError::StopWorkflow,
            executed_block_on_web: false,
            insert_default_column: true,
            default_column_name: "column".to_string(),
            extra: Map::new(),
        }
    }
}

/// Descriptor of what starts a workflow
///
/// Only the schedule-bearing kinds (`interval`, `cron-job`) are acted upon by
/// the trigger service; other kinds are kept for the runtime that owns them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTrigger {
    #[serde(rename = "type")]
    pub kind: String,
    /// Repeat interval in minutes (`interval` triggers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
    /// Cron expression, five or six fields (`cron-job` triggers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Parsed schedule of a trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerSchedule {
    EveryMinutes(u64),
    Cron(String),
}

impl WorkflowTrigger {
    pub fn interval(minutes: u64) -> Self {
        Self {
            kind: "interval".to_string(),
            interval: Some(minutes),
            expression: None,
            extra: Map::new(),
        }
    }

    pub fn cron(expression: impl Into<String>) -> Self {
        Self {
            kind: "cron-job".to_string(),
            interval: None,
            expression: Some(expression.into()),
            extra: Map::new(),
        }
    }

    /// Schedule this trigger describes, if it is time-based
    ///
    /// Five-field cron expressions get a leading seconds field so they can be
    /// handed to the scheduler directly.
    pub fn schedule(&self) -> Option<TriggerSchedule> {
        match self.kind.as_str() {
            "interval" => self
                .interval
                .filter(|minutes| *minutes > 0)
                .map(TriggerSchedule::EveryMinutes),
            "cron-job" => {
                let expression = self.expression.as_deref()?.trim();
                match expression.split_whitespace().count() {
                    5 => Some(TriggerSchedule::Cron(format!("0 {}", expression))),
                    6 | 7 => Some(TriggerSchedule::Cron(expression.to_string())),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

/// Partial update applied by `WorkflowStore::update`
///
/// Protection and identity fields are deliberately absent: they are settled at
/// creation time.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowPatch {
    pub name: Option<String>,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub folder_id: Option<String>,
    #[serde(rename = "drawflow")]
    pub graph_data: Option<String>,
    pub table: Option<Vec<TableColumn>>,
    pub trigger: Option<WorkflowTrigger>,
    pub version: Option<String>,
    pub is_disabled: Option<bool>,
    pub settings: Option<WorkflowSettings>,
    pub global_data: Option<String>,
}

impl Workflow {
    /// Fresh, unprotected workflow with every field at its default
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_workflow_id(),
            name: name.into(),
            icon: default_icon(),
            description: String::new(),
            data: None,
            folder_id: None,
            graph_data: String::new(),
            table: Vec::new(),
            data_columns: Vec::new(),
            pass: String::new(),
            trigger: None,
            version: String::new(),
            created_at: now_millis(),
            is_disabled: false,
            is_protected: false,
            settings: WorkflowSettings::default(),
            global_data: default_global_data(),
        }
    }

    /// Apply a patch in place
    pub fn apply(&mut self, patch: WorkflowPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(icon) = patch.icon {
            self.icon = icon;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(folder_id) = patch.folder_id {
            self.folder_id = (!folder_id.is_empty()).then_some(folder_id);
        }
        if let Some(graph_data) = patch.graph_data {
            self.graph_data = graph_data;
        }
        if let Some(table) = patch.table {
            self.table = table;
        }
        if let Some(trigger) = patch.trigger {
            self.trigger = Some(trigger);
        }
        if let Some(version) = patch.version {
            self.version = version;
        }
        if let Some(is_disabled) = patch.is_disabled {
            self.is_disabled = is_disabled;
        }
        if let Some(settings) = patch.settings {
            self.settings = settings;
        }
        if let Some(global_data) = patch.global_data {
            self.global_data = global_data;
        }
    }
}

/// Collision-resistant random identifier for new workflows
pub fn new_workflow_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn default_icon() -> String {
    DEFAULT_ICON.to_string()
}

fn default_global_data() -> String {
    DEFAULT_GLOBAL_DATA.to_string()
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Older exports embed the graph as a JSON object; store it serialized.
fn graph_data_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(text) => Ok(text),
        other => Ok(other.to_string()),
    }
}

/// Explicit `null` means the same as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn icon_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_icon))
}

fn global_data_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_global_data))
}
