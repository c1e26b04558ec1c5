//! Deterministic log scripts for simulated skill runs.
//!
//! [`generate`] never reads the clock or a random source: equal inputs give
//! equal step lists, so tests can assert on the script directly and play it
//! back with delays compressed to zero.

use serde::{Deserialize, Serialize};

use crate::run_config::{RunConfig, StringMap};

/// One line of simulated output, emitted after waiting `delay_ms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogStep {
    pub message: String,
    pub delay_ms: u64,
}

fn step(message: impl Into<String>, delay_ms: u64) -> LogStep {
    LogStep {
        message: message.into(),
        delay_ms,
    }
}

pub fn generate(skill_id: &str, config: &RunConfig) -> Vec<LogStep> {
    let mut steps = header(skill_id, config);
    steps.extend(sandbox_init());
    steps.extend(match skill_id {
        "weather" => weather(config),
        "web-scraper" => web_scraper(config),
        "code-review" => code_review(config),
        "pdf-summarizer" => pdf_summarizer(config),
        "sql-query" => sql_query(config),
        other => generic(other),
    });
    steps
}

/// Total scripted wait for a run, before pacing is applied.
pub fn total_delay_ms(steps: &[LogStep]) -> u64 {
    steps.iter().map(|s| s.delay_ms).sum()
}

// ---------------------------------------------------------------------------
// Shared prologue
// ---------------------------------------------------------------------------

fn key_list(map: &StringMap) -> String {
    if map.is_empty() {
        "(none)".to_string()
    } else {
        map.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

fn header(skill_id: &str, config: &RunConfig) -> Vec<LogStep> {
    vec![
        step(format!("Starting skill '{skill_id}'"), 300),
        step(format!("Model: {}", config.model), 200),
        step(format!("Parameters: {}", key_list(&config.parameters)), 200),
        step(format!("Environment: {}", key_list(&config.env)), 200),
    ]
}

fn sandbox_init() -> Vec<LogStep> {
    vec![
        step("Provisioning sandbox container", 400),
        step("Mounting skill manifest and dependencies", 300),
        step("Sandbox ready", 200),
    ]
}

// ---------------------------------------------------------------------------
// Skill bodies
// ---------------------------------------------------------------------------

fn weather(config: &RunConfig) -> Vec<LogStep> {
    let location = config.param_or("location", "Boston");
    let days = config.param_or("days", "3");
    vec![
        step(format!("Resolving coordinates for {location}"), 400),
        step(format!("Fetching {days}-day forecast"), 600),
        step("Normalizing temperature units", 200),
        step("Rendering forecast summary", 300),
    ]
}

fn web_scraper(config: &RunConfig) -> Vec<LogStep> {
    let url = config.param_or("url", "https://example.com");
    let selector = config.param_or("selector", "h1");
    vec![
        step(format!("GET {url}"), 500),
        step("Received 200 OK (text/html)", 300),
        step(format!("Applying selector '{selector}'"), 400),
        step("Extracted 3 matching elements", 200),
    ]
}

fn code_review(config: &RunConfig) -> Vec<LogStep> {
    let repo = config.param_or("repo", "octo/hello-world");
    let branch = config.param_or("branch", "main");
    vec![
        step(format!("Cloning {repo} at {branch}"), 700),
        step("Indexing source files", 400),
        step("Running static analysis", 600),
        step("Drafting review comments", 500),
    ]
}

fn pdf_summarizer(config: &RunConfig) -> Vec<LogStep> {
    let document = config.param_or("document", "report.pdf");
    let max_words = config.param_or("max_words", "150");
    vec![
        step(format!("Loading {document}"), 400),
        step("Extracting text from 12 pages", 500),
        step(format!("Summarizing to at most {max_words} words"), 700),
    ]
}

fn sql_query(config: &RunConfig) -> Vec<LogStep> {
    let database = config.param_or("database", "analytics");
    let query = config.param_or("query", "SELECT 1");
    vec![
        step(format!("Connecting to '{database}' (read-only)"), 400),
        step(format!("Executing: {query}"), 500),
        step("Fetched 3 rows", 200),
    ]
}

fn generic(skill_id: &str) -> Vec<LogStep> {
    vec![
        step(format!("Executing skill '{skill_id}'"), 500),
        step("Collecting output", 300),
    ]
}
