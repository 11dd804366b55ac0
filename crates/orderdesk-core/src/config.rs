use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use crate::retention::{DEFAULT_WINDOW_DAYS, MissingDeliveryPolicy, RetentionPolicy};
use crate::sync::remote::RepoFile;

/// Directory holding project config and, by default, the data files.
pub const PROJECT_DIR: &str = ".orderdesk";
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Relative paths resolve against the project root.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u32,
    #[serde(default)]
    pub sweep_hidden: bool,
    #[serde(default)]
    pub missing_delivered_at: MissingDeliveryPolicy,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            interval_hours: default_interval_hours(),
            sweep_hidden: false,
            missing_delivered_at: MissingDeliveryPolicy::default(),
        }
    }
}

impl RetentionConfig {
    #[must_use]
    pub fn policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            window: chrono::Duration::days(i64::from(self.window_days)),
            sweep_hidden: self.sweep_hidden,
            missing_delivered_at: self.missing_delivered_at,
        }
    }

    /// Period of the background sweep; never shorter than one hour.
    #[must_use]
    pub fn interval(&self) -> StdDuration {
        StdDuration::from_secs(u64::from(self.interval_hours.max(1)) * 3600)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub push_on_save: bool,
    #[serde(default = "default_commit_message")]
    pub commit_message: String,
    /// Connect, read and write timeout for each remote request.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: None,
            owner: None,
            repo: None,
            path: None,
            branch: None,
            api_base: default_api_base(),
            push_on_save: false,
            commit_message: default_commit_message(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Where remote snapshots come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteTarget {
    /// Read-only JSON document.
    Url(String),
    /// Read-write file in a hosted repository.
    Repo(RepoFile),
}

impl RemoteConfig {
    /// The configured target, or `None` when no remote is set.
    ///
    /// The repository form wins over `url` when both are present.
    ///
    /// # Errors
    ///
    /// Fails when only some of `owner`, `repo`, `path` are set.
    pub fn target(&self) -> Result<Option<RemoteTarget>> {
        match (&self.owner, &self.repo, &self.path) {
            (Some(owner), Some(repo), Some(path)) => Ok(Some(RemoteTarget::Repo(RepoFile {
                api_base: self.api_base.clone(),
                owner: owner.clone(),
                repo: repo.clone(),
                path: path.clone(),
                branch: self.branch.clone(),
            }))),
            (None, None, None) => Ok(self.url.clone().map(RemoteTarget::Url)),
            _ => bail!("[remote] needs all of owner, repo and path"),
        }
    }

    /// Per-request timeout, at least one second.
    #[must_use]
    pub fn timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

/// Read `<root>/.orderdesk/config.toml`; a missing file means defaults.
///
/// # Errors
///
/// Fails if the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(PROJECT_DIR).join(CONFIG_FILE);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Read the per-user config from the platform config directory.
///
/// # Errors
///
/// Fails if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("orderdesk").join(CONFIG_FILE);
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Data directory: `ORDERDESK_DATA_DIR` if set, else the configured one.
#[must_use]
pub fn resolve_data_dir(project_root: &Path, config: &StorageConfig) -> PathBuf {
    resolve_data_dir_inner(project_root, config, env::var_os("ORDERDESK_DATA_DIR").map(PathBuf::from))
}

fn resolve_data_dir_inner(
    project_root: &Path,
    config: &StorageConfig,
    env_override: Option<PathBuf>,
) -> PathBuf {
    let dir = env_override
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| config.data_dir.clone());
    if dir.is_absolute() {
        dir
    } else {
        project_root.join(dir)
    }
}

/// API token: `--token`, then `ORDERDESK_TOKEN`, then `GITHUB_TOKEN`.
#[must_use]
pub fn resolve_token(flag: Option<String>) -> Option<String> {
    resolve_token_inner(
        flag,
        env::var("ORDERDESK_TOKEN").ok(),
        env::var("GITHUB_TOKEN").ok(),
    )
}

fn resolve_token_inner(
    flag: Option<String>,
    orderdesk_env: Option<String>,
    github_env: Option<String>,
) -> Option<String> {
    [flag, orderdesk_env, github_env]
        .into_iter()
        .flatten()
        .map(|token| token.trim().to_string())
        .find(|token| !token.is_empty())
}

/// Default config written by `od init`.
///
/// # Errors
///
/// Fails only if serialization fails.
pub fn render_default_config() -> Result<String> {
    toml::to_string_pretty(&ProjectConfig::default()).context("Failed to render default config")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(PROJECT_DIR).join("data")
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
const fn default_window_days() -> u32 {
    DEFAULT_WINDOW_DAYS as u32
}

const fn default_interval_hours() -> u32 {
    24
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_commit_message() -> String {
    "Update orders".to_string()
}

const fn default_timeout_secs() -> u64 {
    10
}
