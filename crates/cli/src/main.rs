mod config;
mod connect;
mod input;
mod publish_cmd;
mod repo_cmd;

use clap::{Parser, Subcommand};
use gag_scm::PublishError;
use std::path::PathBuf;

use crate::config::IdentityOverrides;

#[derive(Parser)]
#[command(
    name = "gag",
    version,
    about = "gag CLI - publish data files to a GitHub repository on a fresh branch"
)]
struct Cli {
    /// Config file to use instead of ~/.config/gag/gag.toml
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: IdentityOverrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the credentials can read the repository
    Validate,

    /// Clone, branch, write one data file, commit, push and clean up
    Publish(publish_cmd::PublishArgs),

    /// List the 10 most recent branches of the repository
    Branches,

    /// Open a pull request between two existing branches
    Pr {
        /// Branch the changes merge into
        #[arg(long)]
        base: String,

        /// Branch carrying the changes
        #[arg(long)]
        head: String,

        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        body: String,
    },

    /// Show or initialize configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration with the secret masked
    Show,
    /// Write a config file from the defaults and the identity flags
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the config file path
    Path,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    let result = match cli.command {
        Commands::Validate => repo_cmd::run_validate(config_path, &cli.overrides),
        Commands::Publish(args) => publish_cmd::run_publish(config_path, &cli.overrides, args),
        Commands::Branches => repo_cmd::run_branches(config_path, &cli.overrides),
        Commands::Pr {
            base,
            head,
            title,
            body,
        } => repo_cmd::run_pull_request(config_path, &cli.overrides, &base, &head, &title, &body),
        Commands::Config { action } => match action {
            ConfigAction::Show => config::show_config(config_path, &cli.overrides),
            ConfigAction::Init { force } => config::init_config(config_path, &cli.overrides, force),
            ConfigAction::Path => config::print_path(config_path),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        // A checkout left behind needs attention beyond a normal failure.
        let code = match e.downcast_ref::<PublishError>() {
            Some(PublishError::Cleanup { .. }) => 2,
            _ => 1,
        };
        std::process::exit(code);
    }
}
