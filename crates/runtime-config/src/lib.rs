//! Shared gag configuration types.
//!
//! The CLI reads and writes `gag.toml` using these types. Front ends that
//! embed the publisher (a web layer, a scheduled job) build a [`GagConfig`]
//! themselves and hand it to the core explicitly; nothing in the core reads
//! process-wide settings.

use serde::{Deserialize, Serialize};

/// Canonical config file name.
pub const CONFIG_FILE_NAME: &str = "gag.toml";

/// Environment variable that overrides `identity.secret`.
pub const SECRET_ENV_VAR: &str = "GAG_SCM_SECRET";

/// Top-level configuration (persisted as `gag.toml`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GagConfig {
    #[serde(default)]
    pub identity: IdentitySettings,
    #[serde(default)]
    pub repository: RepositorySettings,
    #[serde(default)]
    pub scm: ScmSettings,
    #[serde(default)]
    pub graphql: GraphqlSettings,
}

/// Who commits and authenticates.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct IdentitySettings {
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub friendly_name: String,
    #[serde(default)]
    pub email: String,
    /// Personal access token. Prefer [`SECRET_ENV_VAR`] over storing it here.
    #[serde(default)]
    pub secret: String,
}

impl std::fmt::Debug for IdentitySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentitySettings")
            .field("user_name", &self.user_name)
            .field("friendly_name", &self.friendly_name)
            .field("email", &self.email)
            .field("secret", &redacted(&self.secret))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositorySettings {
    /// Repository owner. Empty means "same as identity.user_name".
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_host")]
    pub host: String,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            owner: String::new(),
            name: String::new(),
            host: default_host(),
        }
    }
}

/// How git's diagnostic output is compared to the expected confirmation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationMatch {
    /// Byte-for-byte equality with the expected confirmation line.
    #[default]
    Exact,
    /// Output must start with the expected confirmation line.
    Prefix,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScmSettings {
    #[serde(default = "default_git_binary")]
    pub git_binary: String,
    /// Parent directory for checkouts. Empty means a fresh temp dir per run.
    #[serde(default)]
    pub work_dir: String,
    #[serde(default)]
    pub confirmation: ConfirmationMatch,
    /// Kill git after this many seconds. `0` disables the timeout.
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    #[serde(default = "default_commit_message")]
    pub commit_message: String,
    /// Leave the checkout on disk when a publish step fails.
    #[serde(default = "default_false")]
    pub keep_checkout_on_failure: bool,
}

impl Default for ScmSettings {
    fn default() -> Self {
        Self {
            git_binary: default_git_binary(),
            work_dir: String::new(),
            confirmation: ConfirmationMatch::Exact,
            command_timeout_secs: default_command_timeout_secs(),
            commit_message: default_commit_message(),
            keep_checkout_on_failure: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphqlSettings {
    /// Fetch the repository id at session start and allow PR creation.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_graphql_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_graphql_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GraphqlSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_graphql_endpoint(),
            timeout_secs: default_graphql_timeout_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_host() -> String {
    "github.com".to_string()
}
fn default_git_binary() -> String {
    "git".to_string()
}
fn default_command_timeout_secs() -> u64 {
    300
}
fn default_commit_message() -> String {
    "Adding file to repo from gag".to_string()
}
fn default_graphql_endpoint() -> String {
    "https://api.github.com/graphql".to_string()
}
fn default_graphql_timeout_secs() -> u64 {
    30
}

impl GagConfig {
    /// Owner used for the remote URL and GraphQL lookups.
    pub fn effective_owner(&self) -> &str {
        let owner = self.repository.owner.trim();
        if owner.is_empty() {
            self.identity.user_name.trim()
        } else {
            owner
        }
    }
}

/// Replace the configured secret when the environment provides one.
/// Returns true when the secret was replaced.
pub fn apply_secret_override(config: &mut GagConfig, env_secret: Option<String>) -> bool {
    match env_secret {
        Some(secret) if !secret.trim().is_empty() => {
            config.identity.secret = secret.trim().to_string();
            true
        }
        _ => false,
    }
}

/// Mask a secret for display: keep a short prefix, hide the rest.
pub fn redacted(secret: &str) -> String {
    if secret.is_empty() {
        "(not set)".to_string()
    } else {
        format!("{}...", &secret[..secret.char_indices().nth(4).map_or(0, |(i, _)| i)])
    }
}
