use tracing::debug;

use crate::catalog::Catalog;
use crate::run_config::{RunConfig, StoredConfig, StringMap};
use crate::share::ShareQuery;

/// Where the initial configuration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    Link,
    Stored,
    Defaults,
}

/// Build the configuration the playground opens with.
///
/// Priority:
/// 1. Share parameters in the page query (any of `skill`, `model`, `params`, `env`)
/// 2. The stored last-used configuration
/// 3. Catalog defaults with empty parameter and env sets
///
/// Whichever source wins, each field falls back to its default on its own:
/// an undecodable `params` token or a skill id missing from `catalog` does
/// not discard the other fields.
pub fn resolve_initial(
    catalog: &Catalog,
    query: Option<&ShareQuery>,
    stored: Option<&StoredConfig>,
) -> (RunConfig, ConfigSource) {
    let (fields, source) = match (query, stored) {
        (Some(q), _) => (
            Fields {
                skill: q.skill.clone(),
                model: q.model.clone(),
                parameters: q.decoded_params(),
                env: q.decoded_env(),
            },
            ConfigSource::Link,
        ),
        (None, Some(s)) => (
            Fields {
                skill: s.skill.clone(),
                model: s.model.clone(),
                parameters: s.parameters.clone(),
                env: s.env.clone(),
            },
            ConfigSource::Stored,
        ),
        (None, None) => (Fields::default(), ConfigSource::Defaults),
    };
    debug!(?source, "resolving initial playground configuration");
    (fields.into_config(catalog), source)
}

#[derive(Default)]
struct Fields {
    skill: Option<String>,
    model: Option<String>,
    parameters: Option<StringMap>,
    env: Option<StringMap>,
}

impl Fields {
    fn into_config(self, catalog: &Catalog) -> RunConfig {
        let skill_id = self
            .skill
            .filter(|s| catalog.has_skill(s))
            .or_else(|| catalog.default_skill().map(|s| s.id.clone()))
            .unwrap_or_default();
        let model = self
            .model
            .filter(|m| catalog.has_model(m))
            .or_else(|| catalog.default_model().map(|m| m.id.clone()))
            .unwrap_or_default();
        RunConfig {
            skill_id,
            model,
            parameters: self.parameters.unwrap_or_default(),
            env: self.env.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::share::{encode, share_query};

    fn catalog() -> Catalog {
        Catalog::builtin()
    }

    #[test]
    fn defaults_when_nothing_provided() {
        let (config, source) = resolve_initial(&catalog(), None, None);
        assert_eq!(source, ConfigSource::Defaults);
        assert_eq!(config.skill_id, "weather");
        assert_eq!(config.model, "claude-sonnet");
        assert!(config.parameters.is_empty());
        assert!(config.env.is_empty());
    }

    #[test]
    fn link_wins_over_stored() {
        let shared = RunConfig::new("sql-query", "claude-opus").with_param("database", "sales");
        let query = ShareQuery::parse(&share_query(&shared)).unwrap();
        let stored = StoredConfig::from(&RunConfig::new("weather", "claude-haiku"));
        let (config, source) = resolve_initial(&catalog(), Some(&query), Some(&stored));
        assert_eq!(source, ConfigSource::Link);
        assert_eq!(config, shared);
    }

    #[test]
    fn stored_used_when_no_link() {
        let saved = RunConfig::new("code-review", "claude-haiku").with_env("TOKEN", "abc");
        let stored = StoredConfig::from(&saved);
        let (config, source) = resolve_initial(&catalog(), None, Some(&stored));
        assert_eq!(source, ConfigSource::Stored);
        assert_eq!(config, saved);
    }

    #[test]
    fn malformed_params_fall_back_to_empty() {
        let query = ShareQuery::parse("skill=weather&params=%%%invalid%%%").unwrap();
        let (config, _) = resolve_initial(&catalog(), Some(&query), None);
        assert_eq!(config.skill_id, "weather");
        assert!(config.parameters.is_empty());
    }

    #[test]
    fn unknown_skill_and_model_fall_back_per_field() {
        let env = encode(&[("K".to_string(), "v".to_string())].into_iter().collect());
        let raw = format!("skill=retired-skill&model=gpt-2&env={env}");
        let query = ShareQuery::parse(&raw).unwrap();
        let (config, source) = resolve_initial(&catalog(), Some(&query), None);
        assert_eq!(source, ConfigSource::Link);
        assert_eq!(config.skill_id, "weather");
        assert_eq!(config.model, "claude-sonnet");
        assert_eq!(config.env.get("K").map(String::as_str), Some("v"));
    }

    #[test]
    fn stored_with_removed_skill_keeps_other_fields() {
        let stored = StoredConfig {
            skill: Some("retired-skill".into()),
            model: Some("claude-opus".into()),
            parameters: None,
            env: None,
        };
        let (config, _) = resolve_initial(&catalog(), None, Some(&stored));
        assert_eq!(config.skill_id, "weather");
        assert_eq!(config.model, "claude-opus");
    }

    #[test]
    fn empty_catalog_yields_blank_selection() {
        let empty = Catalog {
            skills: vec![],
            models: vec![],
        };
        let (config, _) = resolve_initial(&empty, None, None);
        assert!(!config.has_skill());
        assert!(config.model.is_empty());
    }
}
