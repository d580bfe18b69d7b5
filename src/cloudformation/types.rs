//! CloudFormation data types.
//!
//! These are the shapes the orchestrator works with. They are decoupled from
//! the SDK types so that fakes and mocks can produce them directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Suffix shared by every terminal success-like stack status.
pub const COMPLETE_SUFFIX: &str = "_COMPLETE";

/// Suffix shared by every transitional stack status.
pub const IN_PROGRESS_SUFFIX: &str = "_IN_PROGRESS";

/// A remote stack snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stack {
    /// Stack ARN.
    pub stack_id: String,
    /// Stack name.
    pub stack_name: String,
    /// Stack status, e.g. `UPDATE_COMPLETE`.
    pub status: String,
    /// Free-text reason for the status.
    #[serde(default)]
    pub status_reason: Option<String>,
    /// Outputs, present after a successful create or update.
    #[serde(default)]
    pub outputs: Vec<StackOutput>,
}

impl Stack {
    /// Returns true while the service is still working on the stack.
    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        self.status.ends_with(IN_PROGRESS_SUFFIX)
    }
}

/// A stack output value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackOutput {
    /// Output key.
    pub key: String,
    /// Output value.
    pub value: String,
    /// Optional description from the template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A physical resource belonging to a stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackResource {
    /// Logical id in the template.
    pub logical_id: String,
    /// Physical id, once the resource exists.
    pub physical_id: Option<String>,
    /// Resource type, e.g. `AWS::S3::Bucket`.
    pub resource_type: String,
    /// Resource status.
    pub status: String,
    /// Reason for the status.
    pub status_reason: Option<String>,
}

/// A stack event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackEvent {
    /// Event id.
    pub event_id: String,
    /// When the event happened.
    pub timestamp: DateTime<Utc>,
    /// Logical id of the resource.
    pub logical_id: String,
    /// Resource type.
    pub resource_type: String,
    /// Resource status at this event.
    pub status: String,
    /// Reason for the status.
    pub status_reason: Option<String>,
}

/// One page of stack events, newest first.
#[derive(Debug, Clone, Default)]
pub struct StackEventsPage {
    /// Events on this page.
    pub events: Vec<StackEvent>,
    /// Token for the next (older) page.
    pub next_token: Option<String>,
}

/// A template parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter key.
    pub key: String,
    /// Parameter value.
    pub value: String,
}

/// A stack tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag key.
    pub key: String,
    /// Tag value.
    pub value: String,
}

impl Parameter {
    /// Creates a parameter.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl Tag {
    /// Creates a tag.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Acknowledgements required before the service creates privileged resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// `CAPABILITY_IAM`
    #[serde(rename = "CAPABILITY_IAM")]
    Iam,
    /// `CAPABILITY_NAMED_IAM`
    #[serde(rename = "CAPABILITY_NAMED_IAM")]
    NamedIam,
    /// `CAPABILITY_AUTO_EXPAND`
    #[serde(rename = "CAPABILITY_AUTO_EXPAND")]
    AutoExpand,
}

impl Capability {
    /// Wire name of the capability.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Iam => "CAPABILITY_IAM",
            Self::NamedIam => "CAPABILITY_NAMED_IAM",
            Self::AutoExpand => "CAPABILITY_AUTO_EXPAND",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CAPABILITY_IAM" | "IAM" => Ok(Self::Iam),
            "CAPABILITY_NAMED_IAM" | "NAMED_IAM" => Ok(Self::NamedIam),
            "CAPABILITY_AUTO_EXPAND" | "AUTO_EXPAND" => Ok(Self::AutoExpand),
            _ => Err(ConfigError::UnknownCapability {
                name: s.to_string(),
            }),
        }
    }
}

/// Stack-level operation a change set performs, or the dead-stack delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StackOperation {
    /// Stack creation.
    Create,
    /// Stack update.
    Update,
    /// Stack deletion.
    Delete,
}

impl StackOperation {
    /// Status the stack must reach when this operation succeeds.
    #[must_use]
    pub const fn complete_status(self) -> &'static str {
        match self {
            Self::Create => "CREATE_COMPLETE",
            Self::Update => "UPDATE_COMPLETE",
            Self::Delete => "DELETE_COMPLETE",
        }
    }
}

impl fmt::Display for StackOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "CREATE"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// Change-set type: whether it creates a new stack or updates one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeSetType {
    /// The change set creates the stack.
    Create,
    /// The change set updates an existing stack.
    Update,
}

impl ChangeSetType {
    /// The stack operation the change set results in.
    #[must_use]
    pub const fn operation(self) -> StackOperation {
        match self {
            Self::Create => StackOperation::Create,
            Self::Update => StackOperation::Update,
        }
    }
}

/// Input for creating a change set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateChangeSetInput {
    /// Target stack name.
    pub stack_name: String,
    /// Generated change-set name.
    pub change_set_name: String,
    /// Create or update.
    pub change_set_type: ChangeSetType,
    /// Raw template body.
    pub template_body: String,
    /// Ordered parameters.
    pub parameters: Vec<Parameter>,
    /// Capabilities; `None` means "omitted".
    pub capabilities: Option<Vec<Capability>>,
    /// Stack tags.
    pub tags: Vec<Tag>,
}

/// Identifiers returned by change-set creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSetIds {
    /// Change-set ARN.
    pub id: String,
    /// Stack ARN.
    pub stack_id: String,
}

/// Change-set creation status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeSetStatus {
    /// `CREATE_PENDING`
    CreatePending,
    /// `CREATE_IN_PROGRESS`
    CreateInProgress,
    /// `CREATE_COMPLETE`
    CreateComplete,
    /// `FAILED`
    Failed,
    /// Any other status (deletion states and future additions).
    Other(String),
}

impl ChangeSetStatus {
    /// Returns true while the service is still computing the change set.
    #[must_use]
    pub const fn is_creating(&self) -> bool {
        matches!(self, Self::CreatePending | Self::CreateInProgress)
    }

    /// Wire name of the status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::CreatePending => "CREATE_PENDING",
            Self::CreateInProgress => "CREATE_IN_PROGRESS",
            Self::CreateComplete => "CREATE_COMPLETE",
            Self::Failed => "FAILED",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for ChangeSetStatus {
    fn from(s: &str) -> Self {
        match s {
            "CREATE_PENDING" => Self::CreatePending,
            "CREATE_IN_PROGRESS" => Self::CreateInProgress,
            "CREATE_COMPLETE" => Self::CreateComplete,
            "FAILED" => Self::Failed,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Change-set execution status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// `AVAILABLE`
    Available,
    /// `UNAVAILABLE`
    Unavailable,
    /// Any other status (`EXECUTE_*`, `OBSOLETE`, ...).
    Other(String),
}

impl ExecutionStatus {
    /// Wire name of the status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Unavailable => "UNAVAILABLE",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for ExecutionStatus {
    fn from(s: &str) -> Self {
        match s {
            "AVAILABLE" => Self::Available,
            "UNAVAILABLE" => Self::Unavailable,
            other => Self::Other(other.to_string()),
        }
    }
}

/// What a proposed change does to its resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeAction {
    /// Resource is added.
    Add,
    /// Resource is modified.
    Modify,
    /// Resource is removed.
    Remove,
    /// Resolved at execution time.
    Dynamic,
    /// Resource is imported.
    Import,
    /// Unrecognised action.
    Other(String),
}

impl From<&str> for ChangeAction {
    fn from(s: &str) -> Self {
        match s {
            "Add" => Self::Add,
            "Modify" => Self::Modify,
            "Remove" => Self::Remove,
            "Dynamic" => Self::Dynamic,
            "Import" => Self::Import,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "Add"),
            Self::Modify => write!(f, "Modify"),
            Self::Remove => write!(f, "Remove"),
            Self::Dynamic => write!(f, "Dynamic"),
            Self::Import => write!(f, "Import"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

/// A proposed resource change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// Logical id of the target resource.
    pub logical_id: String,
    /// Physical id, for existing resources.
    #[serde(default)]
    pub physical_id: Option<String>,
    /// Resource type.
    pub resource_type: String,
    /// Add, modify or remove.
    pub action: ChangeAction,
    /// Replacement indicator (`True`, `False`, `Conditional`) for modifications.
    #[serde(default)]
    pub replacement: Option<String>,
    /// Affected scopes, e.g. `Properties`, `Tags`.
    #[serde(default)]
    pub scope: Vec<String>,
    /// Number of detail entries the service reported.
    #[serde(default)]
    pub detail_count: usize,
}

/// One page of a change-set description.
#[derive(Debug, Clone)]
pub struct ChangeSetDescription {
    /// Change-set ARN.
    pub change_set_id: Option<String>,
    /// Stack ARN.
    pub stack_id: Option<String>,
    /// Creation status.
    pub status: ChangeSetStatus,
    /// Execution status.
    pub execution_status: ExecutionStatus,
    /// Reason for the status.
    pub status_reason: Option<String>,
    /// Changes on this page.
    pub changes: Vec<Change>,
    /// Token for the next page.
    pub next_token: Option<String>,
}
