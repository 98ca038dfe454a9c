use anyhow::{Context, Result};
use gag_api_client::GraphqlClient;
use gag_runtime_config::GagConfig;
use gag_scm::{Identity, RepoTarget, Session, SessionOptions, SystemGit};
use std::time::Duration;

fn seconds(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Build a session from the effective config. With `graphql` the
/// repository id is fetched before returning.
pub fn open_session(config: &GagConfig, graphql: bool) -> Result<Session> {
    let identity = Identity::new(
        &config.identity.user_name,
        &config.identity.friendly_name,
        &config.identity.email,
        &config.identity.secret,
    );
    let mut target = RepoTarget::new(&config.repository.name).on_host(&config.repository.host);
    if !config.repository.owner.trim().is_empty() {
        target = target.owned_by(&config.repository.owner);
    }

    let git = SystemGit::new(&config.scm.git_binary)
        .with_timeout(seconds(config.scm.command_timeout_secs));
    let session = Session::new(identity, target, git)
        .context("Incomplete identity or repository settings")?
        .with_options(SessionOptions::from(&config.scm));
    if !graphql {
        return Ok(session);
    }

    let client = GraphqlClient::new(
        &config.graphql.endpoint,
        &config.identity.secret,
        seconds(config.graphql.timeout_secs),
    )?;
    let endpoint = client.endpoint().to_string();
    session.with_graphql(client).with_context(|| {
        format!(
            "Failed to look up {}/{} at {endpoint}",
            config.effective_owner(),
            config.repository.name
        )
    })
}
