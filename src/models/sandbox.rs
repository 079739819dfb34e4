use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Label under which the sandbox's code-run language is recorded.
pub const LANGUAGE_LABEL: &str = "code-toolbox-language";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sandbox {
    pub id: String,
    pub organization_id: Option<String>,
    pub snapshot: Option<String>,
    pub user: Option<String>,
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub env: HashMap<String, String>,
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub labels: HashMap<String, String>,
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub public: bool,
    pub target: Option<String>,
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub cpu: u32,
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub gpu: u32,
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub memory: u32,
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub disk: u32,
    pub state: SandboxState,
    pub error_reason: Option<String>,
    /// Minutes of inactivity before the sandbox is stopped. `0` disables it.
    pub auto_stop_interval: Option<u32>,
    pub auto_archive_interval: Option<u32>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Sandbox {
    pub fn language(&self) -> Option<&str> {
        self.labels.get(LANGUAGE_LABEL).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SandboxState {
    Creating,
    Restoring,
    Destroyed,
    Destroying,
    Started,
    Stopped,
    Starting,
    Stopping,
    Error,
    BuildFailed,
    PendingBuild,
    BuildingSnapshot,
    PullingSnapshot,
    Archiving,
    Archived,
    #[serde(other)]
    Unknown,
}

impl SandboxState {
    pub fn is_failed(self) -> bool {
        matches!(self, SandboxState::Error | SandboxState::BuildFailed)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxCreateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_stop_interval: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_archive_interval: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_camel_case_and_skips_unset() {
        let request = SandboxCreateRequest {
            snapshot: Some("scira-analysis".into()),
            auto_stop_interval: Some(0),
            ..Default::default()
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"snapshot": "scira-analysis", "autoStopInterval": 0})
        );
    }

    #[test]
    fn language_comes_from_labels() {
        let sandbox: Sandbox = serde_json::from_value(serde_json::json!({
            "id": "sb-1",
            "state": "started",
            "labels": {"code-toolbox-language": "python"},
            "autoStopInterval": 0
        }))
        .unwrap();
        assert_eq!(sandbox.language(), Some("python"));
        assert_eq!(sandbox.auto_stop_interval, Some(0));
        assert_eq!(sandbox.state, SandboxState::Started);
    }

    #[test]
    fn null_resources_decode_as_zero() {
        let sandbox: Sandbox = serde_json::from_value(serde_json::json!({
            "id": "sb-2",
            "state": "creating",
            "cpu": null,
            "memory": null,
            "env": null,
            "labels": null,
            "public": null
        }))
        .unwrap();
        assert_eq!(sandbox.cpu, 0);
        assert_eq!(sandbox.memory, 0);
        assert!(sandbox.labels.is_empty());
        assert!(!sandbox.public);
    }
}
