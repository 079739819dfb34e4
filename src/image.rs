//! Declarative container images.
//!
//! An [`Image`] is an ordered list of [`Layer`]s rendered to a Dockerfile. It
//! stays local until it is handed to [`crate::api::SnapshotBuilder::image`]
//! and submitted for a build.
//!
//! ```
//! use daytona::Image;
//!
//! let image = Image::debian_slim(Some("3.12"))
//!     .unwrap()
//!     .pip_install(["numpy", "pandas"])
//!     .run_commands(["mkdir -p /home/daytona/workspace"]);
//!
//! assert!(image.dockerfile().contains("RUN python -m pip install numpy pandas"));
//! ```

use crate::error::{Error, Result};
use std::collections::BTreeSet;

/// Python series accepted by [`Image::debian_slim`], with the patch release each
/// one is pinned to.
pub const SUPPORTED_PYTHON_VERSIONS: &[(&str, &str)] = &[
    ("3.9", "3.9.22"),
    ("3.10", "3.10.17"),
    ("3.11", "3.11.12"),
    ("3.12", "3.12.10"),
    ("3.13", "3.13.3"),
];

pub const DEFAULT_PYTHON_VERSION: &str = "3.12";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layer {
    Base(String),
    PipInstall {
        packages: Vec<String>,
        options: PipInstallOptions,
    },
    Run(String),
    Env(Vec<(String, String)>),
    Workdir(String),
    Entrypoint(Vec<String>),
    Cmd(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipInstallOptions {
    pub find_links: Vec<String>,
    pub index_url: Option<String>,
    pub extra_index_urls: Vec<String>,
    pub pre: bool,
    /// Appended verbatim after the generated flags.
    pub extra_options: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    layers: Vec<Layer>,
}

impl Image {
    pub fn base(image: impl Into<String>) -> Self {
        Self {
            layers: vec![Layer::Base(image.into())],
        }
    }

    /// Debian slim image with the given Python series (default 3.12) and a C
    /// toolchain for building wheels.
    pub fn debian_slim(python_version: Option<&str>) -> Result<Self> {
        let series = python_version.unwrap_or(DEFAULT_PYTHON_VERSION);
        let full = SUPPORTED_PYTHON_VERSIONS
            .iter()
            .find(|(s, _)| *s == series)
            .map(|(_, full)| *full)
            .ok_or_else(|| {
                let supported: Vec<&str> = SUPPORTED_PYTHON_VERSIONS.iter().map(|(s, _)| *s).collect();
                Error::Configuration(format!(
                    "Unsupported Python version {}, expected one of {}",
                    series,
                    supported.join(", ")
                ))
            })?;

        Ok(Self::base(format!("python:{}-slim-bookworm", full)).run_commands([
            "apt-get update",
            "apt-get install -y gcc gfortran build-essential",
            "pip install --upgrade pip",
            "echo 'debconf debconf/frontend select Noninteractive' | debconf-set-selections",
        ]))
    }

    pub fn pip_install<I, S>(self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pip_install_with(packages, PipInstallOptions::default())
    }

    pub fn pip_install_with<I, S>(mut self, packages: I, options: PipInstallOptions) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let packages: Vec<String> = packages.into_iter().map(Into::into).collect();
        if packages.is_empty() {
            return self;
        }
        self.layers.push(Layer::PipInstall { packages, options });
        self
    }

    pub fn run_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.layers
            .extend(commands.into_iter().map(|c| Layer::Run(c.into())));
        self
    }

    pub fn env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: Vec<(String, String)> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        if !vars.is_empty() {
            self.layers.push(Layer::Env(vars));
        }
        self
    }

    pub fn workdir(mut self, path: impl Into<String>) -> Self {
        self.layers.push(Layer::Workdir(path.into()));
        self
    }

    pub fn entrypoint<I, S>(mut self, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.layers
            .push(Layer::Entrypoint(argv.into_iter().map(Into::into).collect()));
        self
    }

    pub fn cmd<I, S>(mut self, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.layers
            .push(Layer::Cmd(argv.into_iter().map(Into::into).collect()));
        self
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Every package installed through pip, across all pip layers.
    pub fn packages(&self) -> BTreeSet<&str> {
        self.layers
            .iter()
            .filter_map(|layer| match layer {
                Layer::PipInstall { packages, .. } => Some(packages),
                _ => None,
            })
            .flatten()
            .map(String::as_str)
            .collect()
    }

    pub fn dockerfile(&self) -> String {
        let mut out = String::new();
        for layer in &self.layers {
            out.push_str(&render_layer(layer));
            out.push('\n');
        }
        out
    }
}

fn render_layer(layer: &Layer) -> String {
    match layer {
        Layer::Base(image) => format!("FROM {}", image),
        Layer::PipInstall { packages, options } => {
            let mut sorted: Vec<&str> = packages.iter().map(String::as_str).collect();
            sorted.sort_unstable();
            sorted.dedup();
            format!(
                "RUN python -m pip install {}{}",
                quote_all(&sorted),
                pip_flags(options)
            )
        }
        Layer::Run(command) => format!("RUN {}", command),
        Layer::Env(vars) => {
            let pairs: Vec<String> = vars
                .iter()
                .map(|(k, v)| format!("{}={}", k, quote(v)))
                .collect();
            format!("ENV {}", pairs.join(" "))
        }
        Layer::Workdir(path) => format!("WORKDIR {}", quote(path)),
        Layer::Entrypoint(argv) => format!("ENTRYPOINT {}", exec_form(argv)),
        Layer::Cmd(argv) => format!("CMD {}", exec_form(argv)),
    }
}

fn pip_flags(options: &PipInstallOptions) -> String {
    let mut flags = String::new();
    for link in &options.find_links {
        flags.push_str(&format!(" --find-links {}", quote(link)));
    }
    if let Some(index) = &options.index_url {
        flags.push_str(&format!(" --index-url {}", quote(index)));
    }
    for extra in &options.extra_index_urls {
        flags.push_str(&format!(" --extra-index-url {}", quote(extra)));
    }
    if options.pre {
        flags.push_str(" --pre");
    }
    if let Some(extra) = options.extra_options.as_deref().map(str::trim) {
        if !extra.is_empty() {
            flags.push(' ');
            flags.push_str(extra);
        }
    }
    flags
}

fn quote(word: &str) -> String {
    quote_all(&[word])
}

fn quote_all(words: &[&str]) -> String {
    // try_join only fails on NUL bytes, which a shell can't take either.
    shlex::try_join(words.iter().copied())
        .unwrap_or_else(|_| words.join(" ").replace('\0', ""))
}

fn exec_form(argv: &[String]) -> String {
    serde_json::to_string(argv).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debian_slim_pins_patch_release() {
        let image = Image::debian_slim(Some("3.12")).unwrap();
        let dockerfile = image.dockerfile();
        assert!(dockerfile.starts_with("FROM python:3.12.10-slim-bookworm\n"));
        assert!(dockerfile.contains("RUN apt-get install -y gcc gfortran build-essential\n"));
    }

    #[test]
    fn debian_slim_defaults_to_3_12() {
        let image = Image::debian_slim(None).unwrap();
        assert_eq!(image.layers()[0], Layer::Base("python:3.12.10-slim-bookworm".into()));
    }

    #[test]
    fn unsupported_python_is_rejected() {
        let err = Image::debian_slim(Some("2.7")).unwrap_err();
        assert!(matches!(err, Error::Configuration(ref msg) if msg.contains("2.7")));
    }

    #[test]
    fn pip_packages_are_sorted_and_deduplicated() {
        let image = Image::base("debian").pip_install(["scipy", "numpy", "keras", "numpy"]);
        assert_eq!(
            image.dockerfile(),
            "FROM debian\nRUN python -m pip install keras numpy scipy\n"
        );
    }

    #[test]
    fn pip_specifiers_are_quoted() {
        let image = Image::base("debian").pip_install(["pandas>=2", "numpy"]);
        let dockerfile = image.dockerfile();
        let args = dockerfile
            .lines()
            .find_map(|line| line.strip_prefix("RUN python -m pip install "))
            .unwrap();
        assert_ne!(args, "numpy pandas>=2");
        assert_eq!(shlex::split(args).unwrap(), vec!["numpy", "pandas>=2"]);
    }

    #[test]
    fn empty_pip_install_adds_no_layer() {
        let image = Image::base("debian").pip_install(Vec::<String>::new());
        assert_eq!(image.layers().len(), 1);
    }

    #[test]
    fn pip_options_render_as_flags() {
        let options = PipInstallOptions {
            find_links: vec!["https://download.pytorch.org/whl/torch_stable.html".into()],
            index_url: Some("https://pypi.example/simple".into()),
            extra_index_urls: vec!["https://extra.example/simple".into()],
            pre: true,
            extra_options: Some("--no-cache-dir".into()),
        };
        let image = Image::base("debian").pip_install_with(["torch"], options);
        assert_eq!(
            image.layers().len(),
            2,
            "pip options must not add layers of their own"
        );
        assert!(image.dockerfile().contains(
            "RUN python -m pip install torch \
             --find-links https://download.pytorch.org/whl/torch_stable.html \
             --index-url https://pypi.example/simple \
             --extra-index-url https://extra.example/simple --pre --no-cache-dir"
        ));
    }

    #[test]
    fn run_commands_keep_order() {
        let image = Image::base("debian").run_commands([
            "apt-get update && apt-get install -y git",
            "groupadd -r daytona && useradd -r -g daytona -m daytona",
            "mkdir -p /home/daytona/workspace",
        ]);
        assert_eq!(
            image.dockerfile(),
            "FROM debian\n\
             RUN apt-get update && apt-get install -y git\n\
             RUN groupadd -r daytona && useradd -r -g daytona -m daytona\n\
             RUN mkdir -p /home/daytona/workspace\n"
        );
    }

    #[test]
    fn env_workdir_entrypoint_and_cmd() {
        let image = Image::base("debian")
            .env([("MPLBACKEND", "Agg"), ("GREETING", "hello world")])
            .workdir("/home/daytona/workspace")
            .entrypoint(["sleep", "infinity"])
            .cmd(["python3"]);
        let dockerfile = image.dockerfile();
        let env_line = dockerfile.lines().find(|l| l.starts_with("ENV ")).unwrap();
        assert_eq!(
            shlex::split(env_line).unwrap(),
            vec!["ENV", "MPLBACKEND=Agg", "GREETING=hello world"]
        );
        assert!(dockerfile.contains("WORKDIR /home/daytona/workspace\n"));
        assert!(dockerfile.contains("ENTRYPOINT [\"sleep\",\"infinity\"]\n"));
        assert!(dockerfile.contains("CMD [\"python3\"]\n"));
    }

    #[test]
    fn packages_span_all_pip_layers() {
        let image = Image::base("debian")
            .pip_install(["numpy"])
            .run_commands(["true"])
            .pip_install(["torch", "numpy"]);
        let packages: Vec<&str> = image.packages().into_iter().collect();
        assert_eq!(packages, vec!["numpy", "torch"]);
    }
}
