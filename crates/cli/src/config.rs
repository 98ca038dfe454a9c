use anyhow::{Context, Result, bail};
use clap::Args;
use gag_runtime_config::{CONFIG_FILE_NAME, GagConfig, SECRET_ENV_VAR, apply_secret_override, redacted};
use std::path::{Path, PathBuf};

/// Identity and repository flags that win over the config file.
#[derive(Debug, Clone, Default, Args)]
pub struct IdentityOverrides {
    /// GitHub user name used for authentication
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Commit author name
    #[arg(long = "author-name", global = true, value_name = "NAME")]
    pub friendly_name: Option<String>,

    /// Commit author email
    #[arg(long, global = true)]
    pub email: Option<String>,

    /// Repository owner (defaults to the user)
    #[arg(long, global = true)]
    pub owner: Option<String>,

    /// Repository name
    #[arg(long, global = true)]
    pub repo: Option<String>,

    /// Git host
    #[arg(long, global = true)]
    pub host: Option<String>,
}

impl IdentityOverrides {
    pub fn apply(&self, config: &mut GagConfig) {
        let pairs = [
            (&self.user, &mut config.identity.user_name),
            (&self.friendly_name, &mut config.identity.friendly_name),
            (&self.email, &mut config.identity.email),
            (&self.owner, &mut config.repository.owner),
            (&self.repo, &mut config.repository.name),
            (&self.host, &mut config.repository.host),
        ];
        for (value, slot) in pairs {
            if let Some(value) = value {
                *slot = value.clone();
            }
        }
    }
}

/// Get the config directory path (~/.config/gag/)
pub fn config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .context("Could not determine home directory")?;
    Ok(PathBuf::from(home).join(".config").join("gag"))
}

/// `explicit` if given, else the canonical config file path.
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(config_dir()?.join(CONFIG_FILE_NAME)),
    }
}

/// Read the config at `path`. A missing file yields the defaults.
pub fn load_config_file(path: &Path) -> Result<GagConfig> {
    if !path.exists() {
        return Ok(GagConfig::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config at {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse config at {}", path.display()))
}

pub fn save_config_file(path: &Path, config: &GagConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let content = toml::to_string_pretty(config).context("Failed to serialize config")?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config at {}", path.display()))
}

/// File, then flags, then the secret from the environment.
pub fn load_effective(explicit: Option<&Path>, overrides: &IdentityOverrides) -> Result<GagConfig> {
    let path = config_path(explicit)?;
    let mut config = load_config_file(&path)?;
    overrides.apply(&mut config);
    if apply_secret_override(&mut config, std::env::var(SECRET_ENV_VAR).ok()) {
        tracing::debug!("secret taken from {SECRET_ENV_VAR}");
    }
    Ok(config)
}

fn masked(config: &GagConfig) -> GagConfig {
    let mut shown = config.clone();
    shown.identity.secret = redacted(&config.identity.secret);
    shown
}

pub fn show_config(explicit: Option<&Path>, overrides: &IdentityOverrides) -> Result<()> {
    let path = config_path(explicit)?;
    let config = load_effective(explicit, overrides)?;
    if !path.exists() {
        println!("# {} does not exist; showing defaults", path.display());
    }
    print!(
        "{}",
        toml::to_string_pretty(&masked(&config)).context("Failed to serialize config")?
    );
    Ok(())
}

pub fn init_config(explicit: Option<&Path>, overrides: &IdentityOverrides, force: bool) -> Result<()> {
    let path = config_path(explicit)?;
    if path.exists() && !force {
        bail!(
            "config already exists: {} (pass --force to replace it)",
            path.display()
        );
    }
    let mut config = GagConfig::default();
    overrides.apply(&mut config);
    save_config_file(&path, &config)?;
    println!("Wrote {}", path.display());
    println!("Set the access token with {SECRET_ENV_VAR} or identity.secret.");
    Ok(())
}

pub fn print_path(explicit: Option<&Path>) -> Result<()> {
    println!("{}", config_path(explicit)?.display());
    Ok(())
}
