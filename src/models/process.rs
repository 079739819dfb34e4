use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    /// Seconds. Omitted or `0` lets the command run unbounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResponse {
    pub exit_code: i32,
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub result: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionArtifacts {
    pub stdout: String,
}

/// What a code run hands back: exit status, combined output and artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResponse {
    pub exit_code: i32,
    pub result: String,
    pub artifacts: ExecutionArtifacts,
}

impl From<ExecuteResponse> for ExecutionResponse {
    fn from(response: ExecuteResponse) -> Self {
        Self {
            exit_code: response.exit_code,
            artifacts: ExecutionArtifacts {
                stdout: response.result.clone(),
            },
            result: response.result,
        }
    }
}

impl std::fmt::Display for ExecutionResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "exit code {}\n{}", self.exit_code, self.result)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CodeRunParams {
    pub argv: Vec<String>,
    pub env: HashMap<String, String>,
    pub timeout: Option<u32>,
}
