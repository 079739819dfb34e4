use crate::{
    api::ProcessApi,
    client::{error_from_response, Client},
    error::{Error, Result},
    models::{ExecutionResponse, Sandbox, SandboxCreateRequest, SandboxState, LANGUAGE_LABEL},
};
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info};

const POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_WAIT_SECONDS: u64 = 60;

#[derive(Deserialize)]
#[serde(untagged)]
enum SandboxList {
    Paginated { items: Vec<Sandbox> },
    Plain(Vec<Sandbox>),
}

#[derive(Debug, Clone)]
pub struct SandboxApi {
    client: Client,
}

impl SandboxApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn snapshot(self, snapshot: impl Into<String>) -> SandboxBuilder {
        SandboxBuilder::new(self.client, snapshot.into())
    }

    pub async fn list(&self) -> Result<Vec<Sandbox>> {
        let url = self.client.build_url("/sandbox");
        let response = self.client.http().get(&url).send().await?;

        match response.status() {
            StatusCode::OK => match response.json::<SandboxList>().await? {
                SandboxList::Paginated { items } => Ok(items),
                SandboxList::Plain(items) => Ok(items),
            },
            _ => Err(error_from_response(response, "Sandboxes").await),
        }
    }

    pub async fn get(&self, sandbox_id: &str) -> Result<Sandbox> {
        let url = self.client.build_url(&format!("/sandbox/{}", sandbox_id));
        let response = self.client.http().get(&url).send().await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            _ => Err(error_from_response(response, &format!("Sandbox {}", sandbox_id)).await),
        }
    }

    async fn create_sandbox(&self, request: &SandboxCreateRequest) -> Result<Sandbox> {
        let url = self.client.build_url("/sandbox");
        let response = self.client.http().post(&url).json(request).send().await?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED => {
                let sandbox: Sandbox = response.json().await?;
                debug!("Sandbox {} created in state {:?}", sandbox.id, sandbox.state);
                Ok(sandbox)
            }
            _ => Err(error_from_response(response, "Sandbox").await),
        }
    }

    async fn post_action(&self, sandbox_id: &str, action: &str) -> Result<()> {
        let url = self
            .client
            .build_url(&format!("/sandbox/{}/{}", sandbox_id, action));
        let response = self.client.http().post(&url).send().await?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT => Ok(()),
            _ => Err(error_from_response(response, &format!("Sandbox {}", sandbox_id)).await),
        }
    }

    /// Polls until the sandbox reaches `target`. `wait_seconds == 0` waits
    /// forever.
    async fn wait_for_state(
        &self,
        sandbox: Sandbox,
        target: SandboxState,
        wait_seconds: u64,
    ) -> Result<Sandbox> {
        let poll = self.poll_until(sandbox, target);

        if wait_seconds == 0 {
            poll.await
        } else {
            timeout(Duration::from_secs(wait_seconds), poll)
                .await
                .map_err(|_| Error::Timeout)?
        }
    }

    async fn poll_until(&self, mut sandbox: Sandbox, target: SandboxState) -> Result<Sandbox> {
        loop {
            if sandbox.state == target {
                return Ok(sandbox);
            }
            if sandbox.state.is_failed() {
                return Err(Error::SandboxFailed {
                    reason: sandbox
                        .error_reason
                        .unwrap_or_else(|| format!("sandbox ended in state {:?}", sandbox.state)),
                    id: sandbox.id,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
            sandbox = self.get(&sandbox.id).await?;
        }
    }
}

#[derive(Debug)]
pub struct SandboxBuilder {
    client: Client,
    request: SandboxCreateRequest,
    wait_seconds: u64,
}

impl SandboxBuilder {
    fn new(client: Client, snapshot: String) -> Self {
        let target = client.config().target.clone();
        Self {
            client,
            request: SandboxCreateRequest {
                snapshot: Some(snapshot),
                target,
                ..Default::default()
            },
            wait_seconds: DEFAULT_WAIT_SECONDS,
        }
    }

    /// Language used by [`SandboxInstance::run_code`]. Recorded as a label.
    pub fn language(self, language: impl Into<String>) -> Self {
        self.label(LANGUAGE_LABEL, language)
    }

    /// Minutes of inactivity before the provider stops the sandbox; `0`
    /// keeps it running until stopped explicitly.
    pub fn auto_stop_interval(mut self, minutes: u32) -> Self {
        self.request.auto_stop_interval = Some(minutes);
        self
    }

    pub fn auto_archive_interval(mut self, minutes: u32) -> Self {
        self.request.auto_archive_interval = Some(minutes);
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.request.user = Some(user.into());
        self
    }

    pub fn public(mut self, public: bool) -> Self {
        self.request.public = Some(public);
        self
    }

    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let labels = self.request.labels.get_or_insert_with(HashMap::new);
        labels.insert(key.into(), value.into());
        self
    }

    pub fn env_vars(mut self, env_vars: HashMap<String, String>) -> Self {
        self.request.env = Some(env_vars);
        self
    }

    pub fn env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let env = self.request.env.get_or_insert_with(HashMap::new);
        env.insert(key.into(), value.into());
        self
    }

    /// Seconds to wait for the sandbox to start. `0` waits without limit.
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.wait_seconds = seconds;
        self
    }

    pub async fn create(self) -> Result<SandboxInstance> {
        let api = SandboxApi::new(self.client.clone());
        let sandbox = api.create_sandbox(&self.request).await?;
        let sandbox = api
            .wait_for_state(sandbox, SandboxState::Started, self.wait_seconds)
            .await?;

        info!("Sandbox {} started", sandbox.id);

        let process = ProcessApi::new(self.client, sandbox.id.clone());
        Ok(SandboxInstance {
            api,
            sandbox,
            process,
        })
    }
}

#[derive(Debug)]
pub struct SandboxInstance {
    api: SandboxApi,
    sandbox: Sandbox,
    process: ProcessApi,
}

impl SandboxInstance {
    pub fn id(&self) -> &str {
        &self.sandbox.id
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    pub fn process(&self) -> &ProcessApi {
        &self.process
    }

    pub async fn run_code(&self, code: &str) -> Result<ExecutionResponse> {
        self.process.code_run(code).await
    }

    pub async fn start(&mut self, wait_seconds: u64) -> Result<()> {
        self.api.post_action(&self.sandbox.id, "start").await?;
        let current = self.api.get(&self.sandbox.id).await?;
        self.sandbox = self
            .api
            .wait_for_state(current, SandboxState::Started, wait_seconds)
            .await?;
        Ok(())
    }

    pub async fn stop(&mut self, wait_seconds: u64) -> Result<()> {
        self.api.post_action(&self.sandbox.id, "stop").await?;
        let current = self.api.get(&self.sandbox.id).await?;
        self.sandbox = self
            .api
            .wait_for_state(current, SandboxState::Stopped, wait_seconds)
            .await?;
        Ok(())
    }

    pub async fn set_auto_stop_interval(&mut self, minutes: u32) -> Result<()> {
        self.api
            .post_action(&self.sandbox.id, &format!("autostop/{}", minutes))
            .await?;
        self.sandbox.auto_stop_interval = Some(minutes);
        Ok(())
    }

    pub async fn delete(self) -> Result<()> {
        let url = self
            .api
            .client
            .build_url(&format!("/sandbox/{}", self.sandbox.id));
        let response = self.api.client.http().delete(&url).send().await?;

        match response.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
            _ => Err(error_from_response(response, &format!("Sandbox {}", self.sandbox.id)).await),
        }
    }

    pub async fn refresh(&mut self) -> Result<()> {
        self.sandbox = self.api.get(&self.sandbox.id).await?;
        Ok(())
    }
}
