use crate::{
    client::{error_from_response, Client},
    error::{Error, Result},
    image::Image,
    models::{BuildInfo, Resources, Snapshot, SnapshotCreateRequest},
    stream,
};
use futures::{Stream, StreamExt};
use reqwest::StatusCode;
use serde::Deserialize;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_secs(1);
/// How long to wait for trailing log lines once the build has settled.
const LOG_DRAIN_GRACE: Duration = Duration::from_secs(2);

type LogLines = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Receives progress messages and build log lines.
pub type LogSink<'a> = Option<&'a mut (dyn FnMut(&str) + Send)>;

/// Where a snapshot's filesystem comes from.
#[derive(Debug, Clone)]
pub enum SnapshotSource {
    /// Built by the provider from a declarative image.
    Image(Image),
    /// An existing registry image, e.g. `python:3.12-slim`.
    Registry(String),
}

#[derive(Debug, Clone)]
pub struct CreateSnapshotParams {
    pub name: String,
    pub source: SnapshotSource,
    pub resources: Option<Resources>,
    pub entrypoint: Option<Vec<String>>,
}

impl CreateSnapshotParams {
    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Configuration("Snapshot name must not be empty".to_string()));
        }
        if let Some(limit) = self.resources.as_ref().and_then(Resources::first_zero) {
            return Err(Error::Configuration(format!(
                "Snapshot {} declares a zero {} limit",
                self.name, limit
            )));
        }
        Ok(())
    }

    fn into_request(self) -> SnapshotCreateRequest {
        let resources = self.resources.unwrap_or_default();
        let (image_name, build_info) = match self.source {
            SnapshotSource::Image(image) => (
                None,
                Some(BuildInfo {
                    dockerfile_content: image.dockerfile(),
                    context_hashes: Vec::new(),
                }),
            ),
            SnapshotSource::Registry(name) => (Some(name), None),
        };

        SnapshotCreateRequest {
            name: self.name,
            image_name,
            build_info,
            entrypoint: self.entrypoint,
            cpu: resources.cpu,
            gpu: resources.gpu,
            memory: resources.memory,
            disk: resources.disk,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotList {
    Paginated { items: Vec<Snapshot> },
    Plain(Vec<Snapshot>),
}

#[derive(Debug, Clone)]
pub struct SnapshotApi {
    client: Client,
}

impl SnapshotApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn name(self, name: impl Into<String>) -> SnapshotBuilder {
        SnapshotBuilder::new(self.client, name.into())
    }

    pub async fn list(&self) -> Result<Vec<Snapshot>> {
        let url = self.client.build_url("/snapshots");
        let response = self.client.http().get(&url).send().await?;

        match response.status() {
            StatusCode::OK => match response.json::<SnapshotList>().await? {
                SnapshotList::Paginated { items } => Ok(items),
                SnapshotList::Plain(items) => Ok(items),
            },
            _ => Err(error_from_response(response, "Snapshots").await),
        }
    }

    /// Looks a snapshot up by id or by name.
    pub async fn get(&self, name_or_id: &str) -> Result<Snapshot> {
        let url = self.client.build_url(&format!("/snapshots/{}", name_or_id));
        let response = self.client.http().get(&url).send().await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            _ => Err(error_from_response(response, &format!("Snapshot {}", name_or_id)).await),
        }
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let url = self.client.build_url(&format!("/snapshots/{}", id));
        let response = self.client.http().delete(&url).send().await?;

        match response.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
            _ => Err(error_from_response(response, &format!("Snapshot {}", id)).await),
        }
    }

    /// Submits a build and blocks until the provider reports a final state.
    ///
    /// With a sink, progress messages and every build log line are handed to
    /// it as they arrive. Losing the log stream is not fatal; a failed build
    /// is, and comes back as [`Error::BuildFailed`].
    pub async fn create(
        &self,
        params: CreateSnapshotParams,
        mut on_logs: LogSink<'_>,
    ) -> Result<Snapshot> {
        params.validate()?;
        let request = params.into_request();
        debug!("Submitting snapshot build for {}", request.name);

        let url = self.client.build_url("/snapshots");
        let response = self.client.http().post(&url).json(&request).send().await?;
        let snapshot: Snapshot = match response.status() {
            StatusCode::OK | StatusCode::CREATED => response.json().await?,
            _ => {
                return Err(error_from_response(response, &format!("Snapshot {}", request.name)).await)
            }
        };

        emit(&mut on_logs, &format!("Creating snapshot {} ({})", snapshot.name, snapshot.state));

        let logs = if on_logs.is_some() && !snapshot.state.is_terminal() {
            self.follow_build_logs(&snapshot.id).await
        } else {
            None
        };

        let snapshot = self.watch(snapshot, logs, &mut on_logs).await?;

        info!("Snapshot {} is {}", snapshot.name, snapshot.state);
        emit(&mut on_logs, &format!("Created snapshot {} ({})", snapshot.name, snapshot.state));
        Ok(snapshot)
    }

    /// Waits for an existing snapshot to finish building.
    pub async fn wait(&self, snapshot: Snapshot) -> Result<Snapshot> {
        self.watch(snapshot, None, &mut None).await
    }

    async fn watch(
        &self,
        mut snapshot: Snapshot,
        mut logs: Option<LogLines>,
        on_logs: &mut LogSink<'_>,
    ) -> Result<Snapshot> {
        if !snapshot.state.is_terminal() {
            let mut ticker = tokio::time::interval(POLL_INTERVAL);
            loop {
                tokio::select! {
                    line = next_line(&mut logs) => match line {
                        Some(Ok(line)) => emit(on_logs, &line),
                        Some(Err(e)) => {
                            warn!("Build log stream for {} broke off: {}", snapshot.name, e);
                            logs = None;
                        }
                        None => logs = None,
                    },
                    _ = ticker.tick() => {
                        let current = self.get(&snapshot.id).await?;
                        if current.state != snapshot.state {
                            debug!("Snapshot {} is now {}", current.name, current.state);
                        }
                        snapshot = current;
                        if snapshot.state.is_terminal() {
                            break;
                        }
                    }
                }
            }
        }

        if let Some(mut rest) = logs.take() {
            while let Ok(Some(Ok(line))) = tokio::time::timeout(LOG_DRAIN_GRACE, rest.next()).await {
                emit(on_logs, &line);
            }
        }

        if snapshot.state.is_failed() {
            return Err(Error::BuildFailed {
                name: snapshot.name,
                reason: snapshot
                    .error_reason
                    .unwrap_or_else(|| format!("snapshot ended in state {}", snapshot.state)),
            });
        }
        Ok(snapshot)
    }

    async fn follow_build_logs(&self, id: &str) -> Option<LogLines> {
        let url = self.client.build_url(&format!("/snapshots/{}/build-logs", id));
        let response = match self
            .client
            .http()
            .get(&url)
            .query(&[("follow", "true")])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Could not open build logs for snapshot {}: {}", id, e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!("Build logs for snapshot {} unavailable: HTTP {}", id, response.status());
            return None;
        }

        Some(Box::pin(stream::lines(response.bytes_stream())))
    }
}

fn emit(sink: &mut LogSink<'_>, line: &str) {
    if let Some(sink) = sink {
        (**sink)(line);
    }
}

async fn next_line(logs: &mut Option<LogLines>) -> Option<Result<String>> {
    match logs {
        Some(lines) => lines.next().await,
        None => futures::future::pending().await,
    }
}

#[derive(Debug)]
pub struct SnapshotBuilder {
    client: Client,
    name: String,
    source: Option<SnapshotSource>,
    resources: Option<Resources>,
    entrypoint: Option<Vec<String>>,
}

impl SnapshotBuilder {
    fn new(client: Client, name: String) -> Self {
        Self {
            client,
            name,
            source: None,
            resources: None,
            entrypoint: None,
        }
    }

    pub fn image(mut self, image: Image) -> Self {
        self.source = Some(SnapshotSource::Image(image));
        self
    }

    pub fn image_name(mut self, image_name: impl Into<String>) -> Self {
        self.source = Some(SnapshotSource::Registry(image_name.into()));
        self
    }

    pub fn resources(mut self, resources: Resources) -> Self {
        self.resources = Some(resources);
        self
    }

    pub fn entrypoint<I, S>(mut self, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entrypoint = Some(argv.into_iter().map(Into::into).collect());
        self
    }

    pub fn params(self) -> Result<CreateSnapshotParams> {
        let source = self.source.ok_or_else(|| {
            Error::Configuration(format!("Snapshot {} has no image", self.name))
        })?;
        Ok(CreateSnapshotParams {
            name: self.name,
            source,
            resources: self.resources,
            entrypoint: self.entrypoint,
        })
    }

    pub async fn create(self) -> Result<Snapshot> {
        let api = SnapshotApi::new(self.client.clone());
        api.create(self.params()?, None).await
    }

    pub async fn create_with_logs<F>(self, mut on_logs: F) -> Result<Snapshot>
    where
        F: FnMut(&str) + Send,
    {
        let api = SnapshotApi::new(self.client.clone());
        let sink: &mut (dyn FnMut(&str) + Send) = &mut on_logs;
        api.create(self.params()?, Some(sink)).await
    }
}
