//! Spec acquisition: local directory, remote URL, GitHub contents API

use std::path::PathBuf;
use std::time::Duration;

use oascheck_core::{ContractError, SourceConfig};
use tracing::debug;

use crate::error::RunnerError;

/// Something that can hand out spec text by name.
pub trait SpecSource: Send + Sync {
    /// Cache key for `name`; two names with the same identity share one parse.
    fn identity(&self, name: &str) -> String;

    /// Raw spec text.
    ///
    /// # Errors
    ///
    /// `MissingSpec` when the spec cannot be fetched.
    fn acquire(&self, name: &str) -> Result<String, ContractError>;
}

/// Build the source described by a config entry.
pub fn from_config(config: &SourceConfig) -> Result<Box<dyn SpecSource>, RunnerError> {
    let source: Box<dyn SpecSource> = match config {
        SourceConfig::Local { path } => Box::new(LocalSource::new(path.clone())),
        SourceConfig::Remote { url, params } => {
            Box::new(RemoteSource::new(url.clone(), params.clone())?)
        }
        SourceConfig::Github {
            token,
            repo,
            git_ref,
            path,
            api_base,
        } => Box::new(GithubSource {
            client: http_client()?,
            token: token.clone(),
            repo: repo.clone(),
            git_ref: git_ref.clone(),
            dir: path.clone(),
            api_base: api_base.clone(),
        }),
    };
    Ok(source)
}

fn http_client() -> Result<reqwest::blocking::Client, RunnerError> {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(10))
        .user_agent(concat!("oascheck/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| RunnerError::Http(e.to_string()))
}

fn missing(name: &str, detail: impl std::fmt::Display) -> ContractError {
    ContractError::MissingSpec(format!("Unable to load spec [{name}]: {detail}"))
}

/// Spec files inside a directory.
#[derive(Debug, Clone)]
pub struct LocalSource {
    root: PathBuf,
}

impl LocalSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SpecSource for LocalSource {
    fn identity(&self, name: &str) -> String {
        self.root.join(name).display().to_string()
    }

    fn acquire(&self, name: &str) -> Result<String, ContractError> {
        let path = self.root.join(name);
        debug!(path = %path.display(), "reading spec");
        std::fs::read_to_string(&path).map_err(|e| missing(name, e))
    }
}

/// Spec files under an HTTP base URL.
#[derive(Debug, Clone)]
pub struct RemoteSource {
    client: reqwest::blocking::Client,
    base: String,
    params: Option<String>,
}

impl RemoteSource {
    pub fn new(base: impl Into<String>, params: Option<String>) -> Result<Self, RunnerError> {
        Ok(Self {
            client: http_client()?,
            base: base.into(),
            params,
        })
    }

    fn url(&self, name: &str) -> String {
        let url = format!(
            "{}/{}",
            self.base.trim_end_matches('/'),
            name.trim_start_matches('/')
        );
        match self.params.as_deref().map(|p| p.trim_start_matches('?')) {
            Some(params) if !params.is_empty() => format!("{url}?{params}"),
            _ => url,
        }
    }
}

impl SpecSource for RemoteSource {
    fn identity(&self, name: &str) -> String {
        self.url(name)
    }

    fn acquire(&self, name: &str) -> Result<String, ContractError> {
        let url = self.url(name);
        debug!(%url, "fetching spec");
        self.client
            .get(&url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .and_then(reqwest::blocking::Response::text)
            .map_err(|e| missing(name, e))
    }
}

/// Spec files in a GitHub repository, fetched raw through the contents API.
#[derive(Debug, Clone)]
pub struct GithubSource {
    client: reqwest::blocking::Client,
    token: String,
    repo: String,
    git_ref: String,
    dir: String,
    api_base: String,
}

impl GithubSource {
    fn url(&self, name: &str) -> String {
        let dir = self.dir.trim_matches('/');
        let file = name.trim_start_matches('/');
        let path = if dir.is_empty() {
            file.to_string()
        } else {
            format!("{dir}/{file}")
        };
        format!(
            "{}/repos/{}/contents/{path}?ref={}",
            self.api_base.trim_end_matches('/'),
            self.repo,
            self.git_ref
        )
    }
}

impl SpecSource for GithubSource {
    fn identity(&self, name: &str) -> String {
        self.url(name)
    }

    fn acquire(&self, name: &str) -> Result<String, ContractError> {
        let url = self.url(name);
        debug!(%url, "fetching spec from GitHub");
        self.client
            .get(&url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/vnd.github.raw")
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .and_then(reqwest::blocking::Response::text)
            .map_err(|e| missing(name, e))
    }
}
