//! coco - CLI entry point.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt, reload};

use coco::commands::{ChangelogSource, ChangelogStrategy, CommitHandler, CommitStrategy};
use coco::config::{ConfigSources, PartialConfig, PartialService, load_config, project_root};
use coco::git::{CommitRange, GitCli, IgnoreRules, RepoStatus};
use coco::llm::LlmClient;
use coco::review::present::{ClipboardHandler, InteractiveHandler, OutputMode, present};
use coco::review::{DialoguerPrompter, ReviewOptions, ReviewOutcome, ReviewStrategy};
use coco::{Config, Provider, generate_and_review};

/// Generate commit messages and changelogs from your git history with an LLM.
#[derive(Parser, Debug)]
#[command(name = "coco")]
#[command(about = "Generate commit messages and changelogs with an LLM")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Show debug logs
    #[arg(long, global = true)]
    verbose: bool,

    /// Where the result goes
    #[arg(long, global = true, value_enum)]
    mode: Option<OutputMode>,

    /// LLM provider
    #[arg(long, global = true, value_enum)]
    provider: Option<Provider>,

    /// Model name for the provider
    #[arg(long, global = true)]
    model: Option<String>,

    /// Provider base URL
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Custom prompt template (must contain {summary})
    #[arg(long, global = true)]
    prompt: Option<String>,

    /// Approximate token budget for the diff summary
    #[arg(long, global = true)]
    token_limit: Option<usize>,

    /// Sampling temperature
    #[arg(long, global = true)]
    temperature: Option<f32>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a commit message for the staged changes
    Commit(CommitArgs),
    /// Write a changelog from commit messages
    Changelog(ChangelogArgs),
}

#[derive(Args, Debug)]
struct CommitArgs {
    /// Review the message and commit it
    #[arg(short, long)]
    interactive: bool,

    /// Extra glob patterns to ignore
    #[arg(long, value_delimiter = ',')]
    ignored_files: Vec<String>,

    /// Extra file extensions to ignore
    #[arg(long, value_delimiter = ',')]
    ignored_extensions: Vec<String>,
}

#[derive(Args, Debug)]
struct ChangelogArgs {
    /// Commit range, e.g. `HEAD~2:HEAD`
    #[arg(short, long)]
    range: Option<String>,

    /// Target branch to compare the current branch against
    #[arg(short, long)]
    branch: Option<String>,

    /// Review the changelog and copy it to the clipboard
    #[arg(short, long)]
    interactive: bool,
}

impl Cli {
    fn flags(&self) -> PartialConfig {
        let (ignored_files, ignored_extensions) = match &self.command {
            Command::Commit(args) => (args.ignored_files.clone(), args.ignored_extensions.clone()),
            Command::Changelog(_) => (Vec::new(), Vec::new()),
        };

        PartialConfig {
            service: PartialService {
                provider: self.provider,
                model: self.model.clone(),
                api_key: None,
                endpoint: self.endpoint.clone(),
            },
            temperature: self.temperature,
            token_limit: self.token_limit,
            mode: self.mode,
            prompt: self.prompt.clone(),
            ignored_files,
            ignored_extensions,
            verbose: self.verbose.then_some(true),
            ..Default::default()
        }
    }

    fn interactive(&self) -> bool {
        match &self.command {
            Command::Commit(args) => args.interactive,
            Command::Changelog(args) => args.interactive,
        }
    }
}

type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// `RUST_LOG` when set, otherwise debug or error level for this crate.
fn log_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "coco=debug" } else { "coco=error" })
    })
}

/// Install the stderr subscriber. The returned handle swaps the filter once
/// the loaded config is known.
fn init_tracing(verbose: bool) -> FilterHandle {
    let (filter, handle) = reload::Layer::new(log_filter(verbose));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
    handle
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let filter_handle = init_tracing(cli.verbose);

    let cwd = std::env::current_dir().context("Failed to read the current directory")?;
    let root = project_root(&cwd);

    let config = load_config(&ConfigSources::discover(&root), cli.flags())
        .context("Failed to load configuration")?;
    if config.verbose
        && !cli.verbose
        && let Err(e) = filter_handle.reload(log_filter(true))
    {
        eprintln!("{} {}", "Warning:".yellow(), e);
    }

    let mode = if cli.interactive() {
        OutputMode::Interactive
    } else {
        config.mode
    };

    let api_key = config.api_key()?;
    let client = LlmClient::new(&config, api_key).context("Failed to create LLM client")?;

    tracing::debug!(
        "Using {} model {} at {}",
        config.service.provider(),
        config.service.model(),
        config.service.endpoint()
    );

    match &cli.command {
        Command::Commit(_) => {
            let vcs = GitCli::new(&root)?;
            let status = RepoStatus::new(&root);
            let rules = IgnoreRules::new(&config.ignored_files, &config.ignored_extensions)
                .and_then(|rules| rules.with_ignore_files(&root, &config.ignore_files))
                .context("Invalid ignore rules")?;
            let strategy = CommitStrategy {
                status: &status,
                vcs: &vcs,
                agent: &client,
                root: root.clone(),
                rules,
                token_limit: config.token_limit,
                summarize_prompt: Some(config.summarize_prompt.clone()),
            };
            review_and_present(&strategy, &config, mode, &CommitHandler::new(&root)).await
        }
        Command::Changelog(args) => {
            let source = match &args.range {
                Some(range) => ChangelogSource::Range(CommitRange::parse(range)?),
                None => ChangelogSource::Branch(
                    args.branch
                        .clone()
                        .unwrap_or_else(|| config.default_branch.clone()),
                ),
            };
            let strategy = ChangelogStrategy {
                root: root.clone(),
                source,
                agent: &client,
            };
            review_and_present(&strategy, &config, mode, &ClipboardHandler::system()).await
        }
    }
}

async fn review_and_present<S: ReviewStrategy>(
    strategy: &S,
    config: &Config,
    mode: OutputMode,
    handler: &dyn InteractiveHandler,
) -> Result<()> {
    let options = ReviewOptions {
        interactive: mode == OutputMode::Interactive,
        prompt: config.prompt.clone(),
    };

    let outcome = generate_and_review(strategy, &mut DialoguerPrompter, &options)
        .await
        .with_context(|| format!("Failed to generate {}", strategy.label().to_lowercase()))?;

    match outcome {
        ReviewOutcome::Accepted(text) => {
            present(&text, mode, handler)?;
        }
        ReviewOutcome::NoInput => {}
        ReviewOutcome::Aborted => eprintln!("{}", "Aborted.".yellow()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_log_filter_follows_verbose_flag() {
        temp_env::with_var_unset("RUST_LOG", || {
            assert_eq!(log_filter(true).to_string(), "coco=debug");
            assert_eq!(log_filter(false).to_string(), "coco=error");
        });
    }

    #[test]
    #[serial]
    fn test_log_filter_prefers_rust_log() {
        temp_env::with_var("RUST_LOG", Some("coco=trace"), || {
            assert_eq!(log_filter(false).to_string(), "coco=trace");
        });
    }

    #[test]
    fn test_verbose_flag_reaches_config() {
        let cli = Cli::parse_from(["coco", "--verbose", "commit", "--ignored-files", "a/**,b"]);
        let flags = cli.flags();
        assert_eq!(flags.verbose, Some(true));
        assert_eq!(flags.ignored_files, vec!["a/**", "b"]);
    }
}
