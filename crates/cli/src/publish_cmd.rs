use anyhow::{Context, Result, bail};
use clap::Args;
use gag_scm::{
    FileData, PublishError, PublishOutcome, PublishRequest, PullRequestSpec, WriteOptions, publish,
};
use std::path::{Path, PathBuf};

use crate::config::{IdentityOverrides, load_effective};
use crate::connect::open_session;
use crate::input;

#[derive(Debug, Args)]
pub struct PublishArgs {
    /// Directory inside the repository to write into
    #[arg(long, value_name = "DIR")]
    pub dir: String,

    /// Name of the file to create
    #[arg(long, value_name = "NAME")]
    pub file: String,

    /// Field to write, as KEY=VALUE (repeatable)
    #[arg(long = "field", value_name = "KEY=VALUE")]
    pub fields: Vec<String>,

    /// Read the data from a YAML/JSON file instead (`-` for stdin)
    #[arg(long, value_name = "PATH", conflicts_with = "fields")]
    pub data_file: Option<PathBuf>,

    /// Write the data file verbatim instead of as a YAML document
    #[arg(long, requires = "data_file")]
    pub raw: bool,

    /// Insert -YYYYMMDD-HHMMSS before the file extension
    #[arg(long)]
    pub timestamp: bool,

    /// Branch to create (default: <user>-<YYYYMMDD-HHMMSS>)
    #[arg(long)]
    pub branch: Option<String>,

    /// Open a pull request into this branch after pushing
    #[arg(long, value_name = "BRANCH")]
    pub pr_base: Option<String>,

    /// Pull request title (default: "Add <file>")
    #[arg(long, requires = "pr_base")]
    pub pr_title: Option<String>,

    #[arg(long, requires = "pr_base", default_value = "")]
    pub pr_body: String,

    /// Leave the checkout on disk if a step fails
    #[arg(long)]
    pub keep_on_failure: bool,

    /// Parent directory for the checkout (default: a fresh temp dir)
    #[arg(long, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,
}

fn payload(args: &PublishArgs) -> Result<FileData> {
    if let Some(path) = &args.data_file {
        return input::data_from_file(path, args.raw);
    }
    if args.fields.is_empty() {
        bail!("nothing to write: pass --field KEY=VALUE or --data-file PATH");
    }
    Ok(FileData::Record(input::record_from_fields(&args.fields)?))
}

fn build_request(args: &PublishArgs, keep_default: bool) -> Result<PublishRequest> {
    let data = payload(args)?;
    let mut request = PublishRequest::new(data, args.dir.as_str(), args.file.as_str());
    request.write = WriteOptions {
        append_timestamp: args.timestamp,
        serialize_as_structured: !args.raw,
    };
    request.branch = args.branch.clone();
    request.keep_checkout_on_failure = args.keep_on_failure || keep_default;
    request.pull_request = args.pr_base.as_ref().map(|base| PullRequestSpec {
        base: base.clone(),
        title: args
            .pr_title
            .clone()
            .unwrap_or_else(|| format!("Add {}", args.file)),
        body: args.pr_body.clone(),
    });
    Ok(request)
}

fn outcome_lines(outcome: &PublishOutcome) -> Vec<String> {
    let mut lines = vec![format!("Pushed {} to branch {}", outcome.file, outcome.branch)];
    if let Some(commit) = &outcome.commit {
        lines.push(format!("Commit: {commit}"));
    }
    lines.push(outcome.branch_url.clone());
    if let Some(pr) = &outcome.pull_request {
        lines.push(format!("Pull request #{}: {}", pr.number, pr.url));
    }
    lines
}

pub fn run_publish(
    config_path: Option<&Path>,
    overrides: &IdentityOverrides,
    args: PublishArgs,
) -> Result<()> {
    let config = load_effective(config_path, overrides)?;
    // Bad input fails before anything touches the network.
    let request = build_request(&args, config.scm.keep_checkout_on_failure)?;
    if request.pull_request.is_some() && !config.graphql.enabled {
        bail!("--pr-base needs graphql.enabled = true");
    }
    let mut session = open_session(&config, config.graphql.enabled)?;

    let configured_dir = args
        .work_dir
        .clone()
        .or_else(|| (!config.scm.work_dir.trim().is_empty()).then(|| PathBuf::from(&config.scm.work_dir)));
    let (work_dir, scratch) = match configured_dir {
        Some(dir) => (dir, None),
        None => {
            let tmp = tempfile::Builder::new()
                .prefix("gag-")
                .tempdir()
                .context("Failed to create a scratch directory")?;
            (tmp.path().to_path_buf(), Some(tmp))
        }
    };
    if !work_dir.is_dir() {
        bail!("work directory does not exist: {}", work_dir.display());
    }

    match publish(&mut session, &work_dir, &request) {
        Ok(outcome) => {
            for line in outcome_lines(&outcome) {
                println!("{line}");
            }
            Ok(())
        }
        Err(err) => {
            // The push went through even though the checkout could not be removed.
            if let PublishError::Cleanup {
                outcome: Some(outcome),
                ..
            } = &err
            {
                for line in outcome_lines(outcome) {
                    println!("{line}");
                }
            }
            let left = match &err {
                PublishError::Step {
                    left_checkout: Some(path),
                    ..
                } => Some(path.clone()),
                PublishError::Cleanup { .. } => session.state().checkout().map(Path::to_path_buf),
                PublishError::Step { .. } => None,
            };
            if let Some(path) = left {
                // The scratch dir must outlive the process for the checkout to be inspected.
                if let Some(tmp) = scratch {
                    let _ = tmp.keep();
                }
                eprintln!("Checkout left at {}", path.display());
            }
            Err(err.into())
        }
    }
}
