pub mod error;
pub mod file;
pub mod identity;
pub mod ops;
pub mod publish;
pub mod session;
pub mod transport;
pub mod url;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::{PushStep, Result, ScmError};
pub use file::{FileData, Record, WriteOptions};
pub use gag_runtime_config::ConfirmationMatch;
pub use identity::{Identity, RepoTarget};
pub use publish::{PublishError, PublishOutcome, PublishRequest, PullRequestSpec, publish};
pub use session::{Session, SessionOptions, SessionState};
pub use transport::{CommandOutput, GitTransport, SystemGit};

/// Commit message used when the caller does not supply one.
pub const DEFAULT_COMMIT_MESSAGE: &str = "Adding file to repo from gag";

/// Timestamp layout used in branch and file names.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";
