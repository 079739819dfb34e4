use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: String,
    pub organization_id: Option<String>,
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub general: bool,
    pub name: String,
    pub image_name: Option<String>,
    pub state: SnapshotState,
    pub size: Option<f64>,
    pub entrypoint: Option<Vec<String>>,
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub cpu: u32,
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub gpu: u32,
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub mem: u32,
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub disk: u32,
    pub error_reason: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub build_info: Option<BuildInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotState {
    BuildPending,
    Building,
    Pending,
    Pulling,
    PendingValidation,
    Validating,
    Active,
    Inactive,
    Error,
    BuildFailed,
    Removing,
    #[serde(other)]
    Unknown,
}

impl SnapshotState {
    /// The build has finished, one way or the other.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SnapshotState::Active
                | SnapshotState::Inactive
                | SnapshotState::Error
                | SnapshotState::BuildFailed
        )
    }

    pub fn is_failed(self) -> bool {
        matches!(self, SnapshotState::Error | SnapshotState::BuildFailed)
    }
}

impl std::fmt::Display for SnapshotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SnapshotState::BuildPending => "build_pending",
            SnapshotState::Building => "building",
            SnapshotState::Pending => "pending",
            SnapshotState::Pulling => "pulling",
            SnapshotState::PendingValidation => "pending_validation",
            SnapshotState::Validating => "validating",
            SnapshotState::Active => "active",
            SnapshotState::Inactive => "inactive",
            SnapshotState::Error => "error",
            SnapshotState::BuildFailed => "build_failed",
            SnapshotState::Removing => "removing",
            SnapshotState::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub dockerfile_content: String,
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub context_hashes: Vec<String>,
}

/// CPU cores, memory and disk in GB, GPU count. Unset fields take the
/// provider's defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    pub cpu: Option<u32>,
    pub memory: Option<u32>,
    pub disk: Option<u32>,
    pub gpu: Option<u32>,
}

impl Resources {
    pub fn new(cpu: u32, memory: u32, disk: u32) -> Self {
        Self {
            cpu: Some(cpu),
            memory: Some(memory),
            disk: Some(disk),
            gpu: None,
        }
    }

    pub fn gpu(mut self, gpu: u32) -> Self {
        self.gpu = Some(gpu);
        self
    }

    /// Name of the first declared limit that is zero.
    pub fn first_zero(&self) -> Option<&'static str> {
        [
            ("cpu", self.cpu),
            ("memory", self.memory),
            ("disk", self.disk),
            ("gpu", self.gpu),
        ]
        .into_iter()
        .find(|(_, value)| *value == Some(0))
        .map(|(name, _)| name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotCreateRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_info: Option<BuildInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk: Option<u32>,
}
