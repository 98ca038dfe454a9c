//! One publish workflow: validate → clone → branch → write → push → delete.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use gag_api_client::github::{self, NewPullRequest, PullRequest};
use gag_api_client::{GraphqlError, GraphqlTransport};
use gag_runtime_config::{ConfirmationMatch, ScmSettings};
use tracing::{debug, info, warn};

use crate::error::{PushStep, Result, ScmError};
use crate::file::{self, FileData, WriteOptions};
use crate::identity::{self, Identity, RepoTarget};
use crate::ops;
use crate::transport::{CommandOutput, GitTransport};
use crate::url;
use crate::DEFAULT_COMMIT_MESSAGE;

/// Where a [`Session`] is in its lifecycle. Each state carries everything
/// the next step needs, so a step whose predecessor never succeeded has
/// nothing to work with and is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    CredentialsValidated,
    Cloned {
        checkout: PathBuf,
    },
    BranchCreated {
        checkout: PathBuf,
        branch: String,
    },
    FileWritten {
        checkout: PathBuf,
        branch: String,
        /// Repository-relative paths, in write order.
        files: Vec<String>,
    },
    Pushed {
        checkout: PathBuf,
        branch: String,
        files: Vec<String>,
        /// HEAD after the push, when it could be read back.
        commit: Option<String>,
    },
    /// Checkout removed from disk.
    Cleaned,
    /// Checkout intentionally left on disk.
    Abandoned {
        checkout: Option<PathBuf>,
    },
}

impl SessionState {
    pub fn checkout(&self) -> Option<&Path> {
        match self {
            Self::Cloned { checkout }
            | Self::BranchCreated { checkout, .. }
            | Self::FileWritten { checkout, .. }
            | Self::Pushed { checkout, .. } => Some(checkout),
            Self::Abandoned { checkout } => checkout.as_deref(),
            Self::Uninitialized | Self::CredentialsValidated | Self::Cleaned => None,
        }
    }

    pub fn branch(&self) -> Option<&str> {
        match self {
            Self::BranchCreated { branch, .. }
            | Self::FileWritten { branch, .. }
            | Self::Pushed { branch, .. } => Some(branch),
            _ => None,
        }
    }

    pub fn files(&self) -> &[String] {
        match self {
            Self::FileWritten { files, .. } | Self::Pushed { files, .. } => files,
            _ => &[],
        }
    }

    fn is_finished(&self) -> bool {
        matches!(self, Self::Cleaned | Self::Abandoned { .. })
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub confirmation: ConfirmationMatch,
    pub commit_message: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            confirmation: ConfirmationMatch::Exact,
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
        }
    }
}

impl From<&ScmSettings> for SessionOptions {
    fn from(settings: &ScmSettings) -> Self {
        let commit_message = if settings.commit_message.trim().is_empty() {
            DEFAULT_COMMIT_MESSAGE.to_string()
        } else {
            settings.commit_message.clone()
        };
        Self {
            confirmation: settings.confirmation,
            commit_message,
        }
    }
}

/// Stateful wrapper around one checkout of one repository.
///
/// Not safe to point two sessions for the same repository name at the same
/// parent directory: `clone` removes whatever is already there.
pub struct Session {
    identity: Identity,
    owner: String,
    repo_name: String,
    host: String,
    git: Box<dyn GitTransport>,
    graphql: Option<Box<dyn GraphqlTransport>>,
    options: SessionOptions,
    clock: fn() -> NaiveDateTime,
    state: SessionState,
    /// Last path handed to `git clone`, kept so a half-finished clone can
    /// still be cleaned up.
    clone_target: Option<PathBuf>,
    repo_id: Option<String>,
    branches: BTreeMap<String, String>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity)
            .field("owner", &self.owner)
            .field("repo_name", &self.repo_name)
            .field("host", &self.host)
            .field("state", &self.state)
            .field("repo_id", &self.repo_id)
            .finish_non_exhaustive()
    }
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn confirmed(output: &CommandOutput, expected: &str, mode: ConfirmationMatch) -> bool {
    output.success()
        && match mode {
            ConfirmationMatch::Exact => output.stderr == expected.as_bytes(),
            ConfirmationMatch::Prefix => output.stderr.starts_with(expected.as_bytes()),
        }
}

impl Session {
    /// Create a session without GraphQL support.
    ///
    /// Fails with [`ScmError::Construction`] listing every empty field.
    pub fn new<G: GitTransport + 'static>(
        identity: Identity,
        target: RepoTarget,
        git: G,
    ) -> Result<Self> {
        let missing = identity::missing_fields(&identity, &target);
        if !missing.is_empty() {
            return Err(ScmError::Construction { missing });
        }

        let owner = target
            .owner
            .unwrap_or_else(|| identity.user_name.clone())
            .trim()
            .to_string();
        Ok(Self {
            identity,
            owner,
            repo_name: target.name.trim().to_string(),
            host: target.host.trim().to_string(),
            git: Box::new(git),
            graphql: None,
            options: SessionOptions::default(),
            clock: local_now,
            state: SessionState::Uninitialized,
            clone_target: None,
            repo_id: None,
            branches: BTreeMap::new(),
        })
    }

    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Clock used for timestamped file and branch names.
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    /// Enable branch listing and pull requests. Fetches the repository id
    /// right away; the session is not returned if that fails.
    pub fn with_graphql<Q: GraphqlTransport + 'static>(mut self, graphql: Q) -> Result<Self> {
        self.graphql = Some(Box::new(graphql));
        self.fetch_remote_repo_id()?;
        Ok(self)
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo_name(&self) -> &str {
        &self.repo_name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Whether branch listing and pull requests are available.
    pub fn graphql_enabled(&self) -> bool {
        self.graphql.is_some()
    }

    pub fn repo_id(&self) -> Option<&str> {
        self.repo_id.as_deref()
    }

    /// Branch name → ref id, as of the last [`Session::list_branches`].
    pub fn branches(&self) -> &BTreeMap<String, String> {
        &self.branches
    }

    pub(crate) fn now(&self) -> NaiveDateTime {
        (self.clock)()
    }

    fn remote_url(&self) -> String {
        url::authenticated_url(
            &self.host,
            &self.identity.user_name,
            &self.identity.secret,
            &self.owner,
            &self.repo_name,
        )
    }

    fn git(&self, cwd: Option<&Path>, args: &[&OsStr]) -> io::Result<CommandOutput> {
        self.git.run(cwd, args)
    }

    /// Probe `git ls-remote <url> HEAD`. Succeeds iff git exits cleanly and
    /// reports a `HEAD` ref.
    pub fn validate_credentials(&mut self) -> Result<()> {
        let remote = self.remote_url();
        let output = self
            .git(None, &[OsStr::new("ls-remote"), OsStr::new(&remote), OsStr::new("HEAD")])
            .map_err(|e| ScmError::Credential(format!("could not run git: {e}")))?;

        let head_listed = output.stdout.windows(4).any(|w| w == b"HEAD");
        if !(output.success() && head_listed) {
            debug!(
                code = output.code,
                stderr = %url::redact_credentials(&output.stderr_lossy()),
                "ls-remote did not list HEAD"
            );
            return Err(ScmError::Credential(
                "the supplied credentials do not provide access to the given repo".to_string(),
            ));
        }

        if self.state == SessionState::Uninitialized {
            self.state = SessionState::CredentialsValidated;
        }
        info!(owner = %self.owner, repo = %self.repo_name, "Credentials validated");
        Ok(())
    }

    /// Clone into `directory/<repo_name>`, replacing any stale directory
    /// already at that path.
    pub fn clone(&mut self, directory: impl AsRef<Path>) -> Result<()> {
        let directory = directory.as_ref();
        if directory.as_os_str().is_empty() {
            return Err(ScmError::Argument(
                "must pass a directory to clone into".to_string(),
            ));
        }
        match &self.state {
            SessionState::Uninitialized | SessionState::CredentialsValidated => {}
            state if state.is_finished() => {
                return Err(ScmError::Clone("the session has already finished".to_string()));
            }
            state => {
                return Err(ScmError::Clone(format!(
                    "a checkout already exists at {}",
                    state.checkout().unwrap_or(directory).display()
                )));
            }
        }

        let checkout = directory.join(&self.repo_name);
        if checkout.is_dir() {
            warn!(path = %checkout.display(), "Removing stale checkout before clone");
            fs::remove_dir_all(&checkout).map_err(|e| {
                ScmError::Clone(format!(
                    "could not remove stale checkout {}: {e}",
                    checkout.display()
                ))
            })?;
        }

        self.clone_target = Some(checkout.clone());
        let remote = self.remote_url();
        let output = self
            .git(
                None,
                &[OsStr::new("clone"), OsStr::new(&remote), checkout.as_os_str()],
            )
            .map_err(|e| ScmError::Clone(format!("could not run git: {e}")))?;

        // git reports the clone on stderr, not stdout.
        let expected = format!("Cloning into '{}'...\n", checkout.display());
        if !(confirmed(&output, &expected, self.options.confirmation) && checkout.is_dir()) {
            debug!(
                code = output.code,
                stderr = %url::redact_credentials(&output.stderr_lossy()),
                "clone not confirmed"
            );
            return Err(ScmError::Clone("the repo could not be cloned".to_string()));
        }

        info!(path = %checkout.display(), repo = %self.repo_name, "Cloned repository");
        self.state = SessionState::Cloned { checkout };
        Ok(())
    }

    /// `git checkout -b <name>` inside the checkout.
    pub fn create_branch(&mut self, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(ScmError::Argument(
                "must pass a branch name".to_string(),
            ));
        }
        let checkout = match &self.state {
            SessionState::Cloned { checkout } => checkout.clone(),
            SessionState::BranchCreated { branch, .. }
            | SessionState::FileWritten { branch, .. }
            | SessionState::Pushed { branch, .. } => {
                return Err(ScmError::Branch(format!(
                    "branch `{branch}` was already created in this session"
                )));
            }
            _ => {
                return Err(ScmError::Branch(
                    "the repo must be cloned before creating a branch".to_string(),
                ));
            }
        };

        let output = self
            .git(
                Some(&checkout),
                &[OsStr::new("checkout"), OsStr::new("-b"), OsStr::new(name)],
            )
            .map_err(|e| ScmError::Branch(format!("could not run git: {e}")))?;

        let expected = format!("Switched to a new branch '{name}'\n");
        if !confirmed(&output, &expected, self.options.confirmation) {
            debug!(
                code = output.code,
                stderr = %url::redact_credentials(&output.stderr_lossy()),
                "branch not confirmed"
            );
            return Err(ScmError::Branch(format!(
                "branch `{name}` could not be created"
            )));
        }

        info!(branch = name, "Created branch");
        self.state = SessionState::BranchCreated {
            checkout,
            branch: name.to_string(),
        };
        Ok(())
    }

    /// Write `data` to `relative_directory/file_name` inside the checkout and
    /// return the repository-relative path. Never overwrites.
    pub fn write_file(
        &mut self,
        data: &FileData,
        relative_directory: &str,
        file_name: &str,
        options: WriteOptions,
    ) -> Result<String> {
        let dir = file::validate_relative_dir(relative_directory)?;
        file::validate_file_name(file_name)?;
        let contents = file::render(data, options)?;

        let (checkout, branch, mut files) = match &self.state {
            SessionState::BranchCreated { checkout, branch } => {
                (checkout.clone(), branch.clone(), Vec::new())
            }
            SessionState::FileWritten {
                checkout,
                branch,
                files,
            } => (checkout.clone(), branch.clone(), files.clone()),
            SessionState::Cloned { .. } => {
                return Err(ScmError::Write(
                    "a branch must be created before writing a file".to_string(),
                ));
            }
            SessionState::Pushed { .. } => {
                return Err(ScmError::Write(
                    "the changes were already pushed".to_string(),
                ));
            }
            _ => {
                return Err(ScmError::Write(
                    "the repo must be cloned before writing a file".to_string(),
                ));
            }
        };

        let final_name = if options.append_timestamp {
            file::stamped_file_name(file_name, self.now())
        } else {
            file_name.to_string()
        };
        let dir_path = checkout.join(dir);
        let file_path = dir_path.join(&final_name);

        if file_path.exists() {
            return Err(ScmError::Write(format!(
                "this file already exists in the repo: {}",
                file_path.display()
            )));
        }
        if !dir_path.is_dir() {
            return Err(ScmError::Write(format!(
                "the path provided to save the file in does not exist: {}",
                dir_path.display()
            )));
        }

        write_new(&file_path, contents.as_bytes())?;
        if !file_path.is_file() {
            return Err(ScmError::Write(
                "was not able to write the file to the filesystem".to_string(),
            ));
        }

        let relative = format!("{dir}/{final_name}");
        info!(file = %relative, bytes = contents.len(), "Wrote data file");
        files.push(relative.clone());
        self.state = SessionState::FileWritten {
            checkout,
            branch,
            files,
        };
        Ok(relative)
    }

    /// Stage the written files, commit as the session identity and push the
    /// branch. No retries and no rollback: a failed push leaves the local
    /// commit in place for [`Session::delete_checkout`] to discard.
    pub fn push(&mut self) -> Result<()> {
        let (checkout, branch, files) = match &self.state {
            SessionState::FileWritten {
                checkout,
                branch,
                files,
            } => (checkout.clone(), branch.clone(), files.clone()),
            SessionState::Pushed { .. } => {
                return Err(ScmError::Push {
                    step: PushStep::Precondition,
                    code: None,
                    output: "the changes were already pushed".to_string(),
                });
            }
            _ => {
                return Err(ScmError::Push {
                    step: PushStep::Precondition,
                    code: None,
                    output: "a file must be written before pushing".to_string(),
                });
            }
        };

        let mut add: Vec<&OsStr> = vec![OsStr::new("add"), OsStr::new("--")];
        add.extend(files.iter().map(OsStr::new));
        self.push_step(&checkout, PushStep::Add, &add)?;

        let user_name = format!("user.name={}", self.identity.friendly_name);
        let user_email = format!("user.email={}", self.identity.email);
        self.push_step(
            &checkout,
            PushStep::Commit,
            &[
                OsStr::new("-c"),
                OsStr::new(&user_name),
                OsStr::new("-c"),
                OsStr::new(&user_email),
                OsStr::new("commit"),
                OsStr::new("-m"),
                OsStr::new(&self.options.commit_message),
            ],
        )?;

        let remote = self.remote_url();
        self.push_step(
            &checkout,
            PushStep::Push,
            &[OsStr::new("push"), OsStr::new(&remote), OsStr::new(&branch)],
        )?;

        let commit = match ops::head_commit_id(&checkout) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, "Pushed, but could not read back the commit id");
                None
            }
        };
        info!(
            branch = %branch,
            owner = %self.owner,
            repo = %self.repo_name,
            commit = commit.as_deref().unwrap_or("unknown"),
            "Pushed branch"
        );
        self.state = SessionState::Pushed {
            checkout,
            branch,
            files,
            commit,
        };
        Ok(())
    }

    fn push_step(&self, checkout: &Path, step: PushStep, args: &[&OsStr]) -> Result<()> {
        let output = self
            .git(Some(checkout), args)
            .map_err(|e| ScmError::Push {
                step,
                code: None,
                output: format!("could not run git: {e}"),
            })?;
        if !output.success() {
            return Err(ScmError::Push {
                step,
                code: Some(output.code),
                output: output.stderr_lossy(),
            });
        }
        debug!(%step, "push step done");
        Ok(())
    }

    /// Remove the checkout (or a half-finished clone) from disk.
    /// Nothing on disk is not an error.
    pub fn delete_checkout(&mut self) -> Result<()> {
        let path = self
            .state
            .checkout()
            .map(Path::to_path_buf)
            .or_else(|| self.clone_target.clone());

        if let Some(path) = path {
            if path.exists() {
                fs::remove_dir_all(&path).map_err(|source| ScmError::Delete {
                    path: path.clone(),
                    source,
                })?;
                info!(path = %path.display(), "Deleted checkout");
            }
        }

        self.clone_target = None;
        self.state = SessionState::Cleaned;
        Ok(())
    }

    /// Leave the checkout on disk for inspection and return its path.
    pub fn abandon(&mut self) -> Option<PathBuf> {
        let checkout = self
            .state
            .checkout()
            .map(Path::to_path_buf)
            .or_else(|| self.clone_target.take());
        if let Some(path) = &checkout {
            warn!(path = %path.display(), "Leaving checkout on disk");
        }
        self.state = SessionState::Abandoned {
            checkout: checkout.clone(),
        };
        checkout
    }

    fn graphql(&self) -> Result<&dyn GraphqlTransport> {
        self.graphql
            .as_deref()
            .ok_or(ScmError::GraphQl(GraphqlError::NotConfigured))
    }

    /// Look up and cache the repository's opaque id.
    pub fn fetch_remote_repo_id(&mut self) -> Result<&str> {
        let id = github::repository_id(self.graphql()?, &self.owner, &self.repo_name)?;
        debug!(repo_id = %id, "Fetched repository id");
        Ok(self.repo_id.insert(id).as_str())
    }

    /// Replace the branch cache with the 10 most recent branches.
    pub fn list_branches(&mut self) -> Result<&BTreeMap<String, String>> {
        let refs = github::recent_branches(self.graphql()?, &self.owner, &self.repo_name)?;
        self.branches = refs.into_iter().map(|r| (r.name, r.id)).collect();
        Ok(&self.branches)
    }

    /// Open a pull request merging `head_branch` into `base_branch`.
    pub fn open_pull_request(
        &self,
        base_branch: &str,
        head_branch: &str,
        title: &str,
        body: &str,
    ) -> Result<PullRequest> {
        if base_branch.trim().is_empty() || head_branch.trim().is_empty() {
            return Err(ScmError::Argument(
                "must have a source and destination branch to create a pull request".to_string(),
            ));
        }
        let graphql = self.graphql()?;
        let repository_id = self
            .repo_id
            .as_deref()
            .ok_or_else(|| GraphqlError::MissingData("repository id".to_string()))?;

        let pr = github::create_pull_request(
            graphql,
            &NewPullRequest {
                repository_id,
                base: base_branch,
                head: head_branch,
                title,
                body,
            },
        )?;
        info!(number = pr.number, url = %pr.url, "Opened pull request");
        Ok(pr)
    }
}

fn write_new(path: &Path, contents: &[u8]) -> Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => ScmError::Write(format!(
                "this file already exists in the repo: {}",
                path.display()
            )),
            _ => ScmError::Write(format!("could not create {}: {e}", path.display())),
        })?;
    file.write_all(contents)
        .map_err(|e| ScmError::Write(format!("could not write {}: {e}", path.display())))
}
