use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Skill / Model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Suggested parameters shown to a user picking this skill for the first time.
    #[serde(default)]
    pub example_parameters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub id: String,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// The skills and models the playground currently knows about.
///
/// Order matters: the first skill and first model are the hard defaults
/// when neither a share link nor a stored configuration provides one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub skills: Vec<Skill>,
    pub models: Vec<Model>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Catalog {
    pub fn builtin() -> Self {
        Self {
            skills: vec![
                skill(
                    "weather",
                    "Weather Forecast",
                    "Multi-day forecast for a location",
                    &[("location", "Boston"), ("days", "3")],
                ),
                skill(
                    "web-scraper",
                    "Web Scraper",
                    "Fetch a page and extract elements by CSS selector",
                    &[("url", "https://example.com"), ("selector", "h1")],
                ),
                skill(
                    "code-review",
                    "Code Review",
                    "Static review of a repository branch",
                    &[("repo", "octo/hello-world"), ("branch", "main")],
                ),
                skill(
                    "pdf-summarizer",
                    "PDF Summarizer",
                    "Summarize a document into a word budget",
                    &[("document", "report.pdf"), ("max_words", "150")],
                ),
                skill(
                    "sql-query",
                    "SQL Query",
                    "Run a read-only query against a sample database",
                    &[("database", "analytics"), ("query", "SELECT 1")],
                ),
            ],
            models: vec![
                model("claude-sonnet", "Claude Sonnet"),
                model("claude-opus", "Claude Opus"),
                model("claude-haiku", "Claude Haiku"),
            ],
        }
    }

    pub fn has_skill(&self, id: &str) -> bool {
        self.skill(id).is_some()
    }

    pub fn has_model(&self, id: &str) -> bool {
        self.models.iter().any(|m| m.id == id)
    }

    pub fn skill(&self, id: &str) -> Option<&Skill> {
        self.skills.iter().find(|s| s.id == id)
    }

    pub fn default_skill(&self) -> Option<&Skill> {
        self.skills.first()
    }

    pub fn default_model(&self) -> Option<&Model> {
        self.models.first()
    }
}

fn skill(id: &str, name: &str, description: &str, params: &[(&str, &str)]) -> Skill {
    Skill {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        example_parameters: params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

fn model(id: &str, name: &str) -> Model {
    Model {
        id: id.to_string(),
        name: name.to_string(),
    }
}
