mod telemetry;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{Context, Result};
use tracing::{info, Level};

use tollgate_core::{Config, Outcome, Settings};
use tollgate_review::annotator::{self, Annotator};
use tollgate_review::github::GitHubClient;
use tollgate_review::llm::LlmClient;

const DEFAULT_CONFIG: &str = ".tollgate.toml";

#[derive(Parser)]
#[command(
    name = "tollgate",
    version,
    about = "AI code review step for pull request CI builds",
    long_about = "Tollgate fetches the current pull request's diff, asks an LLM to review it,\n\
                   keeps a single summary comment on the PR up to date, and attaches or removes\n\
                   a blocking label based on the review's final BLOCKING: YES / BLOCKING: NO line.\n\n\
                   Required environment:\n  \
                     CLAUDE_MODEL, GITHUB_TOKEN, ANTHROPIC_API_KEY,\n  \
                     CIRCLE_PULL_REQUEST, CIRCLE_PROJECT_USERNAME, CIRCLE_PROJECT_REPONAME\n\n\
                   Builds without CIRCLE_PULL_REQUEST are not pull requests and exit 0."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .tollgate.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Review the pull request diff and publish the result (default)
    Review,
    /// Delete the review comment and remove the blocking label
    Clear,
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let settings = match path {
        Some(path) => Settings::from_file(path)
            .wrap_err_with(|| format!("failed to load {}", path.display()))?,
        None => {
            let default_path = Path::new(DEFAULT_CONFIG);
            if default_path.exists() {
                Settings::from_file(default_path)
                    .wrap_err_with(|| format!("failed to load {DEFAULT_CONFIG}"))?
            } else {
                Settings::default()
            }
        }
    };
    Ok(settings)
}

fn report(outcome: &Outcome) {
    match outcome {
        Outcome::Reviewed {
            verdict,
            comment,
            label,
        } => info!(%verdict, ?comment, ?label, "code review complete"),
        Outcome::SkippedOversize {
            diff_chars,
            comment,
            label,
        } => info!(diff_chars, ?comment, ?label, "diff too large; posted fallback comment"),
        Outcome::Cleared { comment, label } => info!(?comment, ?label, "review state cleared"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .expect("miette handler");
    human_panic::setup_panic!();

    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    telemetry::init_tracing(cli.log_json, level);

    if !Config::pr_requested(|key| std::env::var(key).ok()) {
        info!("not a pull request, skipping code review");
        return Ok(());
    }

    let settings = load_settings(cli.config.as_deref())?;
    let config = Config::from_env(settings)?;
    let github = GitHubClient::new(&config.github)?;

    let outcome = match cli.command.unwrap_or(Command::Review) {
        Command::Review => {
            let llm = LlmClient::new(&config.llm)?;
            Annotator::new(&config, &github, &llm).run().await?
        }
        Command::Clear => annotator::clear(&config, &github).await?,
    };

    report(&outcome);
    Ok(())
}
