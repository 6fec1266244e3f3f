//! Contract-check configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::StatusPolicy;

/// Project configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source used when a test does not pick one
    pub default_source: String,

    /// Spec name checked when a test does not pick one (unset = passthrough)
    pub default_spec: Option<String>,

    /// Named spec sources
    pub sources: BTreeMap<String, SourceConfig>,

    /// Mount prefix applied to every path template before matching
    pub path_prefix: String,

    /// Leave human-readable failure output to the caller
    pub suppress_pretty_errors: bool,

    /// Return failures as data instead of `Err`
    pub capture_failures: bool,

    /// Report unknown paths as 404 instead of 422
    pub distinguish_not_found: bool,

    /// Server the CLI sends requests to
    pub base_url: Option<String>,
}

/// Where spec files come from. Selected by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Directory on disk; spec names are file names inside it
    Local { path: PathBuf },

    /// HTTP base URL; spec names are appended to it
    Remote {
        url: String,
        /// Raw query string appended to every fetch (`token=abc`)
        #[serde(default)]
        params: Option<String>,
    },

    /// GitHub contents API
    Github {
        token: String,
        /// `owner/name`
        repo: String,
        #[serde(rename = "ref", default = "default_git_ref")]
        git_ref: String,
        /// Directory inside the repository
        #[serde(default)]
        path: String,
        #[serde(default = "default_api_base")]
        api_base: String,
    },
}

fn default_git_ref() -> String {
    "main".to_string()
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

impl Default for Config {
    fn default() -> Self {
        let mut sources = BTreeMap::new();
        sources.insert(
            "local".to_string(),
            SourceConfig::Local {
                path: PathBuf::from("specs"),
            },
        );
        Self {
            default_source: "local".to_string(),
            default_spec: None,
            sources,
            path_prefix: String::new(),
            suppress_pretty_errors: false,
            capture_failures: true,
            distinguish_not_found: false,
            base_url: None,
        }
    }
}

impl Config {
    /// Load config from file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e.to_string()))?;

        if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
        }
    }

    /// Load from default location (.oascheck.toml)
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load_from_dir(Path::new("."))
    }

    /// First default-named config file inside `dir`, or defaults.
    pub fn load_from_dir(dir: &Path) -> Result<Self, ConfigError> {
        let candidates = [".oascheck.toml", ".oascheck.json", "oascheck.toml"];

        for name in candidates {
            let path = dir.join(name);
            if path.exists() {
                return Self::load(&path);
            }
        }

        Ok(Self::default())
    }

    #[must_use]
    pub const fn status_policy(&self) -> StatusPolicy {
        StatusPolicy {
            distinguish_not_found: self.distinguish_not_found,
        }
    }

    /// Create example config file
    pub fn example() -> &'static str {
        r#"# oascheck configuration

# Source and spec used when a test does not choose one.
# Leave default_spec unset to pass requests through unchecked.
default_source = "local"
default_spec = "openapi.yaml"

# Mount prefix applied to every path in the spec ("v1" -> /v1/users)
# path_prefix = "v1"

# Server the `check` command talks to
base_url = "http://localhost:8080"

# Report failures as data (true) or as errors (false)
capture_failures = true

# Unknown paths: 422 (false) or 404 (true)
distinguish_not_found = false

# suppress_pretty_errors = true

[sources.local]
kind = "local"
path = "specs"

# [sources.remote]
# kind = "remote"
# url = "https://example.com/specs"
# params = "token=your-token"

# [sources.github]
# kind = "github"
# token = "ghp_your-token"
# repo = "owner/api-specs"
# ref = "main"
# path = "openapi"
"#
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read {0}: {1}")]
    Io(PathBuf, String),
    #[error("Parse error: {0}")]
    Parse(String),
}
