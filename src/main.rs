mod auth;
mod config;
mod error;
mod event;
mod feed;
mod forge;
mod github;
mod lister;
mod render;
mod stream;
mod types;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{expand_home, Config, DEFAULT_CONFIG_PATH};
use crate::error::Result;
use crate::forge::Forge;
use crate::github::GitHub;
use crate::lister::Lister;
use crate::render::TerminalRenderer;
use crate::types::{ErrorPolicy, StalenessThreshold, Whitelist};

#[derive(Parser)]
#[command(name = "ghprs", version)]
#[command(about = "List the open pull requests of every repository in a GitHub organization")]
struct Cli {
    /// Only list these repositories (all of them when omitted)
    #[arg(value_name = "REPO")]
    repos: Vec<String>,

    /// Configuration file holding `organization` and `token`
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Report failed pages and pull requests but keep listing
    #[arg(long)]
    keep_going: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let path: PathBuf = expand_home(&cli.config)?;
    let config = Config::load(&path)?;
    let token = auth::resolve_token(config.token)?;

    let forge: Arc<dyn Forge> = Arc::new(GitHub::new(token)?);
    let threshold = StalenessThreshold::now();
    let whitelist: Whitelist = cli.repos.into_iter().collect();
    let policy = if cli.keep_going {
        ErrorPolicy::Continue
    } else {
        ErrorPolicy::Abort
    };
    debug!(
        organization = %config.organization,
        stale_before = %threshold.cutoff(),
        all_repositories = whitelist.is_empty(),
        ?policy,
        "starting"
    );

    let mut renderer = TerminalRenderer::new(std::io::stdout().lock(), !cli.no_color);
    renderer.banner(forge.name())?;

    let mut lister = Lister::new(forge, config.organization, renderer, threshold).with_policy(policy);
    let stats = lister.run(&whitelist).await?;

    if stats.errors > 0 {
        eprintln!("Completed with {} errors", stats.errors);
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
