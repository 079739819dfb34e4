//! Ready-made snapshot recipes for the stock-analysis sandboxes.
//!
//! Each recipe pins down one variant of the analysis environment: how its
//! snapshot is named, where the API key comes from, which Python packages
//! and setup commands go into the image, and the resources it is built with.

use crate::{
    client::Client,
    config::Config,
    error::{Error, Result},
    image::Image,
    models::{Resources, Snapshot},
};
use chrono::{DateTime, Utc};

/// Endpoint the CPU analysis snapshot was first published against.
pub const ANALYSIS_API_URL: &str = "https://api.daytona.ai";

/// Installed by every recipe.
pub const ANALYSIS_PACKAGES: [&str; 8] = [
    "numpy",
    "pandas",
    "matplotlib",
    "scipy",
    "scikit-learn",
    "yfinance",
    "requests",
    "keras",
];

/// Added on top of [`ANALYSIS_PACKAGES`] by [`Recipe::gpu`].
pub const GPU_PACKAGES: [&str; 3] = ["torch", "torchvision", "torchaudio"];

pub const SETUP_COMMANDS: [&str; 3] = [
    "apt-get update && apt-get install -y git",
    "groupadd -r daytona && useradd -r -g daytona -m daytona",
    "mkdir -p /home/daytona/workspace",
];

/// Downloads a year of prices, prints summary statistics and saves a chart.
pub const STOCK_ANALYSIS_CODE: &str = r#"
import matplotlib
matplotlib.use("Agg")
import matplotlib.pyplot as plt
import yfinance as yf

ticker = "AAPL"
data = yf.download(ticker, period="1y", progress=False)
close = data["Close"].squeeze()

returns = close.pct_change().dropna()
print(f"{ticker}: {len(close)} sessions")
print(f"last close:   {close.iloc[-1]:.2f}")
print(f"mean return:  {returns.mean():.4%}")
print(f"volatility:   {returns.std():.4%}")

fig, ax = plt.subplots(figsize=(10, 5))
ax.plot(close.index, close.values, label="Close")
ax.plot(close.index, close.rolling(20).mean().values, label="20-day MA")
ax.set_title(f"{ticker} closing price")
ax.legend()
fig.savefig("/home/daytona/workspace/stock.png")
print("chart saved to /home/daytona/workspace/stock.png")
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotNaming {
    /// `<prefix>:<unix seconds>`.
    Timestamped(String),
    Fixed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Literal(String),
    /// `DAYTONA_API_KEY`, required.
    Env,
    /// An empty key, which falls back to `DAYTONA_API_KEY` when it is set.
    Empty,
}

#[derive(Debug, Clone)]
pub struct Recipe {
    pub naming: SnapshotNaming,
    pub credentials: Credentials,
    pub python_version: String,
    pub packages: Vec<String>,
    pub commands: Vec<String>,
    pub resources: Resources,
    pub entrypoint: Option<Vec<String>>,
    /// Overrides the resolved API URL when set.
    pub api_url: Option<String>,
}

impl Recipe {
    fn base(naming: SnapshotNaming, credentials: Credentials) -> Self {
        Self {
            naming,
            credentials,
            python_version: "3.12".to_string(),
            packages: ANALYSIS_PACKAGES.iter().map(|p| p.to_string()).collect(),
            commands: SETUP_COMMANDS.iter().map(|c| c.to_string()).collect(),
            resources: Resources::new(1, 1, 3),
            entrypoint: None,
            api_url: None,
        }
    }

    /// CPU analysis image with `uv`, timestamped, empty literal key, pinned
    /// to [`ANALYSIS_API_URL`].
    pub fn analysis() -> Self {
        let mut recipe = Self::base(
            SnapshotNaming::Timestamped("scira-analysis".to_string()),
            Credentials::Empty,
        );
        recipe.packages.push("uv".to_string());
        recipe.api_url = Some(ANALYSIS_API_URL.to_string());
        recipe
    }

    /// Adds PyTorch and a GPU; key from the environment.
    pub fn gpu() -> Self {
        let mut recipe = Self::base(
            SnapshotNaming::Timestamped("scira-analysis-gpu".to_string()),
            Credentials::Env,
        );
        recipe.packages.extend(GPU_PACKAGES.iter().map(|p| p.to_string()));
        recipe.resources = Resources::new(4, 8, 10).gpu(1);
        recipe
    }

    pub fn env_keyed() -> Self {
        Self::base(
            SnapshotNaming::Timestamped("scira-analysis-env".to_string()),
            Credentials::Env,
        )
    }

    /// Fixed name: built once by [`Recipe::ensure`], then referenced by name
    /// when creating sandboxes.
    pub fn sandbox_runner() -> Self {
        let mut recipe = Self::base(
            SnapshotNaming::Fixed("scira-analysis-sandbox".to_string()),
            Credentials::Env,
        );
        recipe.entrypoint = Some(vec!["sleep".to_string(), "infinity".to_string()]);
        recipe
    }

    pub fn all() -> [Recipe; 4] {
        [
            Self::analysis(),
            Self::gpu(),
            Self::env_keyed(),
            Self::sandbox_runner(),
        ]
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// `None` falls back to the environment or the default endpoint.
    pub fn with_api_url(mut self, api_url: Option<String>) -> Self {
        self.api_url = api_url;
        self
    }

    pub fn snapshot_name(&self, now: DateTime<Utc>) -> String {
        match &self.naming {
            SnapshotNaming::Timestamped(prefix) => format!("{}:{}", prefix, now.timestamp()),
            SnapshotNaming::Fixed(name) => name.clone(),
        }
    }

    pub fn image(&self) -> Result<Image> {
        Ok(Image::debian_slim(Some(self.python_version.as_str()))?
            .pip_install(self.packages.iter().cloned())
            .run_commands(self.commands.iter().cloned()))
    }

    pub fn config(&self) -> Result<Config> {
        let config = match &self.credentials {
            Credentials::Literal(key) => Config::with_api_key(key.clone()),
            Credentials::Empty => Config::with_api_key(""),
            Credentials::Env => Config::new()?,
        };
        Ok(match &self.api_url {
            Some(url) => config.api_url(url.clone()),
            None => config,
        })
    }

    pub fn client(&self) -> Result<Client> {
        Client::with_config(self.config()?)
    }

    /// Builds this recipe's snapshot, handing progress and build log lines to
    /// `on_logs`.
    pub async fn publish<F>(&self, client: &Client, on_logs: F) -> Result<Snapshot>
    where
        F: FnMut(&str) + Send,
    {
        self.publish_at(client, Utc::now(), on_logs).await
    }

    /// Reuses the snapshot if this recipe has a fixed name and the provider
    /// already has it, waiting out a build still in progress. Builds it
    /// otherwise. Timestamped recipes always build.
    pub async fn ensure<F>(&self, client: &Client, mut on_logs: F) -> Result<Snapshot>
    where
        F: FnMut(&str) + Send,
    {
        let SnapshotNaming::Fixed(name) = &self.naming else {
            return self.publish(client, on_logs).await;
        };

        match client.snapshot().get(name).await {
            Ok(existing) => {
                on_logs(&format!("Using snapshot {} ({})", existing.name, existing.state));
                client.snapshot().wait(existing).await
            }
            Err(Error::NotFound(_)) => self.publish(client, on_logs).await,
            Err(e) => Err(e),
        }
    }

    pub async fn publish_at<F>(&self, client: &Client, now: DateTime<Utc>, on_logs: F) -> Result<Snapshot>
    where
        F: FnMut(&str) + Send,
    {
        let mut builder = client
            .snapshot()
            .name(self.snapshot_name(now))
            .image(self.image()?)
            .resources(self.resources);
        if let Some(entrypoint) = &self.entrypoint {
            builder = builder.entrypoint(entrypoint.iter().cloned());
        }
        builder.create_with_logs(on_logs).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamped_names_use_unix_seconds() {
        let now = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            Recipe::analysis().snapshot_name(now),
            format!("scira-analysis:{}", now.timestamp())
        );
    }

    #[test]
    fn fixed_name_ignores_clock() {
        let a = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let recipe = Recipe::sandbox_runner();
        assert_eq!(recipe.snapshot_name(a), recipe.snapshot_name(b));
    }

    #[test]
    fn analysis_image_renders_setup_commands_last() {
        let dockerfile = Recipe::analysis().image().unwrap().dockerfile();
        let pip = dockerfile.find("RUN python -m pip install keras").unwrap();
        let mkdir = dockerfile.find("RUN mkdir -p /home/daytona/workspace").unwrap();
        assert!(pip < mkdir);
        assert!(dockerfile.contains(" uv"));
    }

    #[test]
    fn literal_credentials_are_used_verbatim() {
        let config = Recipe::env_keyed()
            .with_credentials(Credentials::Literal("dtn_literal".into()))
            .config()
            .unwrap();
        assert_eq!(config.api_key, "dtn_literal");
    }

    #[test]
    fn analysis_recipe_targets_its_pinned_endpoint() {
        let config = Recipe::analysis()
            .with_credentials(Credentials::Literal("dtn_literal".into()))
            .config()
            .unwrap();
        assert_eq!(config.api_url, ANALYSIS_API_URL);

        let config = Recipe::analysis()
            .with_credentials(Credentials::Literal("dtn_literal".into()))
            .with_api_url(Some("http://localhost:3000/api".into()))
            .config()
            .unwrap();
        assert_eq!(config.api_url, "http://localhost:3000/api");
    }
}
