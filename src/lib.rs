//! # Daytona Rust SDK
//!
//! Declarative container images, snapshot builds with streamed logs, and
//! sandboxed code execution against the Daytona API.
//!
//! ## Quick Start
//!
//! ```no_run
//! use daytona::{Client, Image, models::Resources};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), daytona::Error> {
//!     let client = Client::new()?;
//!
//!     let image = Image::debian_slim(Some("3.12"))?.pip_install(["numpy", "pandas"]);
//!     let snapshot = client
//!         .snapshot()
//!         .name("analysis")
//!         .image(image)
//!         .resources(Resources::new(1, 1, 3))
//!         .create_with_logs(|line| println!("{}", line))
//!         .await?;
//!
//!     let sandbox = client
//!         .sandbox()
//!         .snapshot(&snapshot.name)
//!         .language("python")
//!         .auto_stop_interval(0)
//!         .create()
//!         .await?;
//!
//!     let result = sandbox.run_code("print('Hello, Daytona!')").await?;
//!     println!("{}", result.result);
//!
//!     sandbox.delete().await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod image;
pub mod models;
pub mod recipes;
pub mod stream;

pub use client::Client;
pub use error::{Error, Result};
pub use image::Image;

pub mod prelude {
    pub use crate::{Client, Error, Image, Result};
    pub use crate::api::{ProcessApi, SandboxApi, SandboxInstance, SnapshotApi};
    pub use crate::config::Config;
    pub use crate::models::*;
    pub use crate::recipes::Recipe;
}
