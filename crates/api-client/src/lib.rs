pub mod client;
pub mod error;
pub mod github;

pub use client::{GraphqlClient, GraphqlTransport, check_response};
pub use error::{GraphqlError, Result};
pub use github::{BranchRef, NewPullRequest, PullRequest};
