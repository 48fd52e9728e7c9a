//! Runtime configuration for the console client.
//!
//! Configuration can be loaded from a JSON file or constructed
//! programmatically; the CLI surface lives here as well.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "review-console", about = "Admin console for the code-review service")]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// Override the API base URL.
    #[arg(long)]
    pub base_url: Option<String>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Manage registered repositories.
    Repos {
        #[command(subcommand)]
        action: RepoAction,
    },
    /// Inspect review history.
    Reviews {
        #[command(subcommand)]
        action: ReviewAction,
    },
    /// Analyze false-positive feedback.
    Feedbacks {
        #[command(subcommand)]
        action: FeedbackAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum RepoAction {
    /// List repositories.
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: i64,
        #[arg(long, default_value_t = 20)]
        page_size: i64,
    },
    /// Show one repository.
    Get { id: i64 },
    /// Register a repository.
    Create {
        full_name: String,
        #[arg(long)]
        webhook_secret: Option<String>,
    },
    /// Delete a repository.
    Delete { id: i64 },
    /// Enable or disable reviews for a repository.
    Toggle {
        id: i64,
        #[arg(long)]
        enabled: bool,
    },
    /// List configuration presets.
    Templates,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ReviewAction {
    /// List reviews.
    List {
        #[arg(long)]
        repo: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        pr_number: Option<i64>,
        #[arg(long, default_value_t = 1)]
        page: i64,
        #[arg(long, default_value_t = 20)]
        page_size: i64,
    },
    /// Show one review.
    Get { id: i64 },
}

#[derive(Subcommand, Debug, Clone)]
pub enum FeedbackAction {
    /// List feedback entries.
    List {
        #[arg(long)]
        repo: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        severity: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: i64,
        #[arg(long, default_value_t = 20)]
        page_size: i64,
    },
    /// Show aggregate counts.
    Stats {
        #[arg(long)]
        repo: Option<String>,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP transport settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Cache tuning.
    #[serde(default)]
    pub cache: CacheSettings,
}

/// HTTP transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// API base URL including the version prefix.
    pub base_url: String,

    /// Per-request timeout ceiling in seconds.
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080/api/v1".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Cache tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Grace period in seconds before an unsubscribed entry is collected.
    pub gc_grace_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { gc_grace_secs: 300 }
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults when the
    /// file is absent.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&data)?;
            Ok(config)
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }
}
