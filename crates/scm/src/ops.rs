use std::path::{Path, PathBuf};

use gix::Repository;

/// Reading the checkout failed.
#[derive(Debug, thiserror::Error)]
pub enum InspectError {
    #[error("not a git repository: {}", .0.display())]
    NotARepo(PathBuf),

    #[error("git error: {0}")]
    Gix(Box<dyn std::error::Error + Send + Sync>),
}

/// Wrap any gix-compatible error into [`InspectError::Gix`].
pub fn gix_err(e: impl std::error::Error + Send + Sync + 'static) -> InspectError {
    InspectError::Gix(Box::new(e))
}

/// Open the git repository at `repo_path`.
///
/// Returns [`InspectError::NotARepo`] when `.git` is absent.
pub fn open_repo(repo_path: &Path) -> Result<Repository, InspectError> {
    gix::open(repo_path).map_err(|e| {
        if repo_path.join(".git").exists() {
            gix_err(e)
        } else {
            InspectError::NotARepo(repo_path.to_path_buf())
        }
    })
}

/// Hex id of the commit HEAD points at.
pub fn head_commit_id(repo_path: &Path) -> Result<String, InspectError> {
    let repo = open_repo(repo_path)?;
    let id = repo.head_id().map_err(gix_err)?;
    Ok(id.detach().to_string())
}
