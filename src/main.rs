//! Command-line admin console for the code-review service.
//!
//! Every read goes through the query cache and every write through a
//! mutation, exactly as a UI consumer would; notifications are drained to
//! stderr in place of toasts.

use clap::Parser;
use tracing::info;

use review_console::api::feedbacks::{FeedbackListParams, FeedbackStatsParams};
use review_console::api::repos::{CreateRepoRequest, RepoListParams, ToggleRepoInput};
use review_console::api::reviews::ReviewListParams;
use review_console::api::Console;
use review_console::config::{Cli, Command, Config, FeedbackAction, RepoAction, ReviewAction};
use review_console::transport::Notifier;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "review_console=debug"
    } else {
        "review_console=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(true)
        .init();

    let mut config = Config::load(&cli.config)?;
    if let Some(base_url) = cli.base_url {
        config.http.base_url = base_url;
    }

    info!(base_url = %config.http.base_url, "review-console v{}", env!("CARGO_PKG_VERSION"));

    let (notifier, mut notifications) = Notifier::channel();
    let console = Console::new(&config, notifier)?;

    match cli.command {
        Command::Repos { action } => run_repo_action(&console, action).await?,
        Command::Reviews { action } => run_review_action(&console, action).await?,
        Command::Feedbacks { action } => run_feedback_action(&console, action).await?,
    }

    // The channel buffers every toast emitted during the command; flush them
    // all to stderr before exiting so none are lost.
    while let Ok(n) = notifications.try_recv() {
        eprintln!("[{}] {}", n.level, n.message);
    }

    Ok(())
}

async fn run_repo_action(console: &Console, action: RepoAction) -> anyhow::Result<()> {
    match action {
        RepoAction::List {
            search,
            page,
            page_size,
        } => {
            let mut handle = console.repos.list(RepoListParams {
                page: Some(page),
                page_size: Some(page_size),
                search,
            });
            print_json(&*handle.resolve().await?)?;
        }
        RepoAction::Get { id } => {
            let mut handle = console.repos.detail(id);
            print_json(&*handle.resolve().await?)?;
        }
        RepoAction::Create {
            full_name,
            webhook_secret,
        } => {
            let created = console
                .repos
                .create()
                .execute(CreateRepoRequest {
                    full_name,
                    webhook_secret,
                    enabled: None,
                    config: None,
                })
                .await?;
            print_json(&created)?;
        }
        RepoAction::Delete { id } => {
            console.repos.delete().execute(id).await?;
        }
        RepoAction::Toggle { id, enabled } => {
            let repo = console
                .repos
                .toggle()
                .execute(ToggleRepoInput { id, enabled })
                .await?;
            print_json(&repo)?;
        }
        RepoAction::Templates => {
            let mut handle = console.repos.templates();
            print_json(&*handle.resolve().await?)?;
        }
    }
    Ok(())
}

async fn run_review_action(console: &Console, action: ReviewAction) -> anyhow::Result<()> {
    match action {
        ReviewAction::List {
            repo,
            status,
            pr_number,
            page,
            page_size,
        } => {
            let mut handle = console.reviews.list(ReviewListParams {
                page: Some(page),
                page_size: Some(page_size),
                repo,
                status,
                pr_number,
                start_date: None,
                end_date: None,
            });
            print_json(&*handle.resolve().await?)?;
        }
        ReviewAction::Get { id } => {
            let mut handle = console.reviews.detail(id);
            print_json(&*handle.resolve().await?)?;
        }
    }
    Ok(())
}

async fn run_feedback_action(console: &Console, action: FeedbackAction) -> anyhow::Result<()> {
    match action {
        FeedbackAction::List {
            repo,
            category,
            severity,
            page,
            page_size,
        } => {
            let mut handle = console.feedbacks.list(FeedbackListParams {
                page: Some(page),
                page_size: Some(page_size),
                repo,
                category,
                severity,
                start_date: None,
                end_date: None,
            });
            print_json(&*handle.resolve().await?)?;
        }
        FeedbackAction::Stats { repo } => {
            let mut handle = console.feedbacks.stats(FeedbackStatsParams {
                repo,
                start_date: None,
                end_date: None,
            });
            print_json(&*handle.resolve().await?)?;
        }
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
