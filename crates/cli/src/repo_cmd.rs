use anyhow::{Result, bail};
use gag_runtime_config::GagConfig;
use gag_scm::Session;
use std::path::Path;

use crate::config::{IdentityOverrides, load_effective};
use crate::connect::open_session;

fn graphql_session(config: &GagConfig) -> Result<Session> {
    if !config.graphql.enabled {
        bail!("this command needs graphql.enabled = true");
    }
    open_session(config, true)
}

pub fn run_validate(config_path: Option<&Path>, overrides: &IdentityOverrides) -> Result<()> {
    let config = load_effective(config_path, overrides)?;
    let mut session = open_session(&config, false)?;
    session.validate_credentials()?;
    println!(
        "Credentials for {} can read {}/{}",
        session.identity().user_name,
        session.owner(),
        session.repo_name()
    );
    Ok(())
}

pub fn run_branches(config_path: Option<&Path>, overrides: &IdentityOverrides) -> Result<()> {
    let config = load_effective(config_path, overrides)?;
    let mut session = graphql_session(&config)?;
    let branches = session.list_branches()?;
    if branches.is_empty() {
        println!("No branches found.");
    }
    for (name, id) in branches {
        println!("{name}\t{id}");
    }
    Ok(())
}

pub fn run_pull_request(
    config_path: Option<&Path>,
    overrides: &IdentityOverrides,
    base: &str,
    head: &str,
    title: &str,
    body: &str,
) -> Result<()> {
    let config = load_effective(config_path, overrides)?;
    let session = graphql_session(&config)?;
    let pr = session.open_pull_request(base, head, title, body)?;
    println!("Pull request #{}: {}", pr.number, pr.url);
    Ok(())
}
