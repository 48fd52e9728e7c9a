//! Entity types mirrored from the review service's API.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Paginated collection payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

/// Which LLM backend a repository's reviews run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Openai,
    Qwen,
    Azure,
    Ollama,
}

/// Issue severity ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    P0,
    P1,
    P2,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::P0 => write!(f, "P0"),
            Severity::P1 => write!(f, "P1"),
            Severity::P2 => write!(f, "P2"),
        }
    }
}

/// Review focus areas a repository opts into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewFocus {
    Security,
    Performance,
    Logic,
    Style,
}

/// Lifecycle of one pull-request review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

/// A registered repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repo {
    pub id: i64,
    pub full_name: String,
    pub owner: String,
    pub name: String,
    pub enabled: bool,
    pub config: Option<String>,
    pub last_review_at: Option<String>,
    pub review_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Per-repository review configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoConfig {
    pub llm_provider: LlmProvider,
    pub model: String,
    pub max_tokens: i64,
    pub system_prompt: String,
    pub review_focus: Vec<ReviewFocus>,
    pub min_severity: Severity,
    pub languages: Vec<String>,
    pub ignore_files: Vec<String>,
    pub max_diff_lines: i64,
    pub auto_review: bool,

    // Repo-level overrides of the global LLM / GitHub settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,
}

/// A named configuration preset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigTemplate {
    pub name: String,
    pub description: String,
    pub config: RepoConfig,
}

/// Payload of `GET /config-templates`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateList {
    pub templates: Vec<ConfigTemplate>,
}

/// A single pull-request review run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub repo_id: i64,
    pub repo_full_name: String,
    pub pr_number: i64,
    pub pr_title: String,
    pub pr_author: String,
    pub commit_sha: String,
    pub status: ReviewStatus,
    pub result: String,
    pub token_used: i64,
    pub duration_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
    pub created_at: String,
}

/// Operator feedback on one reported issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: i64,
    pub review_id: i64,
    pub repo_full_name: String,
    pub pr_number: i64,
    pub file: String,
    pub line: i64,
    pub issue_index: i64,
    pub severity: Severity,
    pub category: String,
    pub title: String,
    pub ai_content: String,
    pub is_false_positive: bool,
    pub reason: String,
    pub reporter: String,
    pub created_at: String,
}

/// Aggregate false-positive counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackStats {
    pub total: i64,
    pub by_category: HashMap<String, i64>,
    pub by_severity: HashMap<String, i64>,
}
