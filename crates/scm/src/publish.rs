//! The whole publish workflow in one call, with cleanup on every path.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use gag_api_client::PullRequest;
use tracing::{error, info};

use crate::error::ScmError;
use crate::file::{FileData, WriteOptions};
use crate::session::{Session, SessionState};
use crate::url;
use crate::TIMESTAMP_FORMAT;

/// Pull request to open once the branch is pushed. The head is always the
/// published branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestSpec {
    pub base: String,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub data: FileData,
    pub relative_directory: String,
    pub file_name: String,
    pub write: WriteOptions,
    /// Defaults to `<user>-<YYYYMMDD-HHMMSS>`.
    pub branch: Option<String>,
    pub pull_request: Option<PullRequestSpec>,
    /// Leave the checkout on disk when a step fails.
    pub keep_checkout_on_failure: bool,
}

impl PublishRequest {
    pub fn new(
        data: impl Into<FileData>,
        relative_directory: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            data: data.into(),
            relative_directory: relative_directory.into(),
            file_name: file_name.into(),
            write: WriteOptions::default(),
            branch: None,
            pull_request: None,
            keep_checkout_on_failure: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    pub branch: String,
    /// Repository-relative path of the written file.
    pub file: String,
    pub commit: Option<String>,
    /// Web URL of the pushed branch.
    pub branch_url: String,
    pub pull_request: Option<PullRequest>,
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// A workflow step failed. The checkout was removed unless
    /// `left_checkout` says otherwise.
    #[error("the file was not pushed to source control: {source}")]
    Step {
        source: ScmError,
        left_checkout: Option<PathBuf>,
    },

    /// The checkout could not be removed. Reported ahead of any step
    /// failure because it leaves credentials-bearing state on disk.
    /// `outcome` is set when everything up to the delete succeeded.
    #[error("the repo was not deleted: {cleanup}{}", step_suffix(.step))]
    Cleanup {
        #[source]
        cleanup: ScmError,
        step: Option<ScmError>,
        outcome: Option<Box<PublishOutcome>>,
    },
}

fn step_suffix(step: &Option<ScmError>) -> String {
    match step {
        Some(step) => format!(" (after the publish failed: {step})"),
        None => String::new(),
    }
}

/// `alice` at noon on 2024-01-01 → `alice-20240101-120000`.
pub fn default_branch_name(user_name: &str, now: NaiveDateTime) -> String {
    format!("{user_name}-{}", now.format(TIMESTAMP_FORMAT))
}

/// Validate, clone into `work_dir`, branch, write, push, optionally open a
/// pull request, then delete the checkout.
pub fn publish(
    session: &mut Session,
    work_dir: &Path,
    request: &PublishRequest,
) -> Result<PublishOutcome, PublishError> {
    let branch = request
        .branch
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| default_branch_name(&session.identity().user_name, session.now()));

    match run_steps(session, work_dir, request, &branch) {
        Ok(outcome) => {
            if let Err(cleanup) = session.delete_checkout() {
                error!(branch = %outcome.branch, error = %cleanup, "Published, but the checkout was not deleted");
                return Err(PublishError::Cleanup {
                    cleanup,
                    step: None,
                    outcome: Some(Box::new(outcome)),
                });
            }
            info!(branch = %outcome.branch, url = %outcome.branch_url, "Published");
            Ok(outcome)
        }
        Err(step) => {
            error!(error = %step, "Publish failed");
            if request.keep_checkout_on_failure {
                let left_checkout = session.abandon();
                return Err(PublishError::Step {
                    source: step,
                    left_checkout,
                });
            }
            match session.delete_checkout() {
                Ok(()) => Err(PublishError::Step {
                    source: step,
                    left_checkout: None,
                }),
                Err(cleanup) => Err(PublishError::Cleanup {
                    cleanup,
                    step: Some(step),
                    outcome: None,
                }),
            }
        }
    }
}

fn run_steps(
    session: &mut Session,
    work_dir: &Path,
    request: &PublishRequest,
    branch: &str,
) -> Result<PublishOutcome, ScmError> {
    if request.pull_request.is_some() && !session.graphql_enabled() {
        return Err(ScmError::Argument(
            "a pull request was requested but GraphQL is not enabled".to_string(),
        ));
    }

    session.validate_credentials()?;
    session.clone(work_dir)?;
    session.create_branch(branch)?;
    let file = session.write_file(
        &request.data,
        &request.relative_directory,
        &request.file_name,
        request.write,
    )?;
    session.push()?;

    let commit = match session.state() {
        SessionState::Pushed { commit, .. } => commit.clone(),
        _ => None,
    };
    let pull_request = match &request.pull_request {
        Some(spec) => Some(session.open_pull_request(&spec.base, branch, &spec.title, &spec.body)?),
        None => None,
    };

    Ok(PublishOutcome {
        branch: branch.to_string(),
        file,
        commit,
        branch_url: url::tree_url(session.host(), session.owner(), session.repo_name(), branch),
        pull_request,
    })
}
