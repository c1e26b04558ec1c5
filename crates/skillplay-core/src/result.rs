use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::Result;
use crate::run_config::{RunConfig, StringMap};

/// Shown in place of env values too short to partially reveal.
pub const SHORT_MASK: &str = "****";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Artifact {
    Markdown { title: String, content: String },
    Json { title: String, data: serde_json::Value },
    Text { title: String, content: String },
}

/// The structured output of a finished simulated run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub skill: String,
    pub model: String,
    pub parameters: StringMap,
    /// Env values with [`mask`] applied; the raw values never leave the config.
    pub env: StringMap,
    pub artifacts: Vec<Artifact>,
    pub generated_at: DateTime<Utc>,
}

impl RunResult {
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// ---------------------------------------------------------------------------
// Masking
// ---------------------------------------------------------------------------

/// Mask a secret-like value: first 3 and last 2 characters survive on long
/// values, short values collapse to [`SHORT_MASK`].
pub fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    match chars.len() {
        0 => String::new(),
        1..=4 => SHORT_MASK.to_string(),
        n => {
            let head: String = chars[..3].iter().collect();
            let tail: String = chars[n - 2..].iter().collect();
            format!("{head}…{tail}")
        }
    }
}

pub fn mask_env(env: &StringMap) -> StringMap {
    env.iter().map(|(k, v)| (k.clone(), mask(v))).collect()
}

// ---------------------------------------------------------------------------
// Synthesis
// ---------------------------------------------------------------------------

pub fn synthesize(skill_id: &str, config: &RunConfig) -> RunResult {
    synthesize_at(skill_id, config, Utc::now())
}

/// [`synthesize`] with an explicit timestamp; everything else is a pure
/// function of the inputs.
pub fn synthesize_at(skill_id: &str, config: &RunConfig, generated_at: DateTime<Utc>) -> RunResult {
    RunResult {
        skill: skill_id.to_string(),
        model: config.model.clone(),
        parameters: config.parameters.clone(),
        env: mask_env(&config.env),
        artifacts: artifacts_for(skill_id, config),
        generated_at,
    }
}

fn artifacts_for(skill_id: &str, config: &RunConfig) -> Vec<Artifact> {
    match skill_id {
        "weather" => {
            let location = config.param_or("location", "Boston");
            let days: usize = config
                .param_or("days", "3")
                .trim()
                .parse::<usize>()
                .unwrap_or(3)
                .clamp(1, 14);
            let forecast: Vec<serde_json::Value> = (0..days)
                .map(|day| {
                    let conditions = ["sunny", "cloudy", "light rain"][day % 3];
                    json!({
                        "day": day + 1,
                        "highC": 18 + (day % 4) as i64,
                        "lowC": 9 + (day % 3) as i64,
                        "conditions": conditions,
                    })
                })
                .collect();
            vec![
                Artifact::Markdown {
                    title: "Summary".into(),
                    content: format!(
                        "## {location}\n\n{days}-day outlook: mild temperatures with a chance of rain midweek."
                    ),
                },
                Artifact::Json {
                    title: "Forecast".into(),
                    data: json!({ "location": location, "days": forecast }),
                },
            ]
        }
        "web-scraper" => {
            let url = config.param_or("url", "https://example.com");
            let selector = config.param_or("selector", "h1");
            vec![Artifact::Json {
                title: "Extracted elements".into(),
                data: json!({
                    "url": url,
                    "selector": selector,
                    "matches": ["Example Domain", "More information", "Contact"],
                }),
            }]
        }
        "code-review" => {
            let repo = config.param_or("repo", "octo/hello-world");
            let branch = config.param_or("branch", "main");
            vec![
                Artifact::Markdown {
                    title: "Review".into(),
                    content: format!(
                        "### {repo} @ {branch}\n\n- 2 suggestions\n- 1 potential bug in error handling\n- Tests cover the main paths"
                    ),
                },
                Artifact::Json {
                    title: "Findings".into(),
                    data: json!([
                        { "file": "src/lib.rs", "line": 42, "severity": "warning", "message": "unused result" },
                        { "file": "src/main.rs", "line": 7, "severity": "info", "message": "consider a named constant" },
                    ]),
                },
            ]
        }
        "pdf-summarizer" => {
            let document = config.param_or("document", "report.pdf");
            let max_words = config.param_or("max_words", "150");
            vec![Artifact::Text {
                title: format!("Summary of {document}"),
                content: format!(
                    "The document reviews quarterly results and outlines three priorities for the next period. (limit: {max_words} words)"
                ),
            }]
        }
        "sql-query" => {
            let database = config.param_or("database", "analytics");
            let query = config.param_or("query", "SELECT 1");
            vec![Artifact::Json {
                title: "Rows".into(),
                data: json!({
                    "database": database,
                    "query": query,
                    "columns": ["id", "name", "total"],
                    "rows": [[1, "alpha", 120], [2, "beta", 95], [3, "gamma", 40]],
                }),
            }]
        }
        other => vec![Artifact::Text {
            title: "Output".into(),
            content: format!("Skill '{other}' completed with mock output."),
        }],
    }
}
