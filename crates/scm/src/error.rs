use std::fmt;
use std::path::PathBuf;

use gag_api_client::GraphqlError;

/// Sub-step of [`crate::Session::push`] that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushStep {
    /// The session had nothing to push yet.
    Precondition,
    Add,
    Commit,
    Push,
}

impl fmt::Display for PushStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Precondition => "precondition",
            Self::Add => "add",
            Self::Commit => "commit",
            Self::Push => "push",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScmError {
    #[error("all values must have data; the following fields are empty: [{}]", .missing.join(", "))]
    Construction { missing: Vec<&'static str> },

    #[error("invalid argument: {0}")]
    Argument(String),

    #[error("credential validation failed: {0}")]
    Credential(String),

    #[error("clone failed: {0}")]
    Clone(String),

    #[error("branch creation failed: {0}")]
    Branch(String),

    #[error("write failed: {0}")]
    Write(String),

    /// `output` is git's stderr, verbatim.
    #[error("push failed during {step}: {}", push_detail(.code, .output))]
    Push {
        step: PushStep,
        code: Option<i32>,
        output: String,
    },

    #[error("could not delete checkout {}: {source}", .path.display())]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    GraphQl(#[from] GraphqlError),
}

fn push_detail(code: &Option<i32>, output: &str) -> String {
    match code {
        Some(code) => format!("returncode: {code} stderr: {output}"),
        None => output.to_string(),
    }
}

pub type Result<T> = std::result::Result<T, ScmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_lists_missing_fields_in_order() {
        let err = ScmError::Construction {
            missing: vec!["user_name", "secret"],
        };
        assert_eq!(
            err.to_string(),
            "all values must have data; the following fields are empty: [user_name, secret]"
        );
    }

    #[test]
    fn push_error_keeps_step_code_and_output() {
        let err = ScmError::Push {
            step: PushStep::Commit,
            code: Some(128),
            output: "fatal: unable to auto-detect email address\n".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "push failed during commit: returncode: 128 stderr: fatal: unable to auto-detect email address\n"
        );
    }

    #[test]
    fn push_precondition_has_no_exit_code() {
        let err = ScmError::Push {
            step: PushStep::Precondition,
            code: None,
            output: "no file has been written".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "push failed during precondition: no file has been written"
        );
    }
}
