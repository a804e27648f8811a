//! Patch Propagator - merge one pull request's diff into every later tutorial chapter
//!
//! Run with `patch-propagator --fork-owner <you> --pull-request-number <n>`.
//! `GITHUB_TOKEN` must be set.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use patch_propagator::{
    APP_NAME, Config, Propagator, RunOptions, VERSION,
    config::{ConfigOverrides, git_timeout, github_token},
    git::{GitExecutor, GitWorkspace},
    github::GitHubClient,
};

#[derive(Parser)]
#[command(name = APP_NAME)]
#[command(version = VERSION)]
#[command(about = "Merge the diff of a tutorial PR into all following chapter branches and open PRs")]
#[command(long_about = None)]
struct Cli {
    /// The upstream owner of the repository, defaults to `canonical`
    #[arg(short, long)]
    upstream_owner: Option<String>,

    /// The forked repo's owner. Normally your own GitHub user name.
    /// Required here unless `fork_owner` is set in config or environment
    #[arg(short, long)]
    fork_owner: Option<String>,

    /// The repository name in the upstream, defaults to `juju-sdk-tutorial-k8s`
    #[arg(long)]
    upstream_repo_name: Option<String>,

    /// The repository name of the forked repo, defaults to `juju-sdk-tutorial-k8s`
    #[arg(long)]
    fork_repo_name: Option<String>,

    /// The PR number from which you want to merge the diff into other branches
    #[arg(short, long)]
    pull_request_number: u64,

    /// Still create the PR (and following PRs) when conflicts occur in the current branch
    #[arg(short, long)]
    ignore_conflicts: bool,

    /// Keep tmp dir and diff file for debugging
    #[arg(long)]
    keep_tmp: bool,

    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl From<&Cli> for ConfigOverrides {
    fn from(cli: &Cli) -> Self {
        Self {
            upstream_owner: cli.upstream_owner.clone(),
            fork_owner: cli.fork_owner.clone(),
            upstream_repo_name: cli.upstream_repo_name.clone(),
            fork_repo_name: cli.fork_repo_name.clone(),
            debug: cli.debug,
        }
    }
}

fn setup_logging(debug: bool) -> Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
            .add_directive("hyper_util=info".parse()?)
            .add_directive("rustls=info".parse()?)
    } else {
        // Use info level for our crate, warn for dependencies
        EnvFilter::new("info")
            .add_directive("hyper=warn".parse()?)
            .add_directive("reqwest=warn".parse()?)
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::config_file_path()?,
    };

    Ok(Config::layered(&config_path, &ConfigOverrides::from(cli))?)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install color-eyre error hooks
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    setup_logging(config.debug)?;

    let token = github_token(|key| std::env::var(key).ok())?;

    info!("Starting {} v{}", APP_NAME, VERSION);
    debug!("Configuration:\n{}", toml::to_string_pretty(&config)?);

    let options = RunOptions::resolve(
        &config,
        cli.pull_request_number,
        cli.ignore_conflicts,
        cli.keep_tmp,
    )?;

    GitExecutor::new().check_installed().await?;

    let client = GitHubClient::new(&config.api_url, token)?;
    let workspace = GitWorkspace::new(&config.working_dir)
        .with_timeout(git_timeout(&config))
        .with_identity(
            config.git_user_name.as_deref(),
            config.git_user_email.as_deref(),
        );
    let clone_url = config.clone_url(&options.fork.to_string());

    let report = Propagator::new(&client, workspace, options, clone_url)?
        .run()
        .await?;

    println!();
    print!("{}", report);

    Ok(())
}
