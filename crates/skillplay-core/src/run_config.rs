use crate::error::{PlaygroundError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type StringMap = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// RunConfig
// ---------------------------------------------------------------------------

/// The canonical configuration of a single skill invocation.
///
/// A run captures its own clone at start, so edits to the working rows
/// afterwards never reach an in-flight or historical run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    pub skill_id: String,
    pub model: String,
    #[serde(default)]
    pub parameters: StringMap,
    #[serde(default)]
    pub env: StringMap,
}

impl RunConfig {
    pub fn new(skill_id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            skill_id: skill_id.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn has_skill(&self) -> bool {
        !self.skill_id.trim().is_empty()
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }

    /// Parameter value, or `default` when absent or blank.
    pub fn param_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        match self.param(key) {
            Some(v) if !v.trim().is_empty() => v,
            _ => default,
        }
    }
}

// ---------------------------------------------------------------------------
// Editable rows
// ---------------------------------------------------------------------------

/// One editable key/value line in the parameter or env editor.
///
/// `id` is synthetic and survives edits to `key` and `value`, so a UI list
/// can diff rows by identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigRow {
    pub id: String,
    pub key: String,
    pub value: String,
}

impl ConfigRow {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Rows reconstructed from a [`RunConfig`], ready for editing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditableConfig {
    pub skill_id: String,
    pub model: String,
    pub parameters: Vec<ConfigRow>,
    pub env: Vec<ConfigRow>,
}

/// Project editable rows into a [`RunConfig`].
///
/// Rows with a blank key are dropped; later rows win on duplicate keys.
pub fn to_config(
    skill_id: &str,
    model: &str,
    params: &[ConfigRow],
    env: &[ConfigRow],
) -> RunConfig {
    RunConfig {
        skill_id: skill_id.trim().to_string(),
        model: model.trim().to_string(),
        parameters: rows_to_map(params),
        env: rows_to_map(env),
    }
}

pub fn from_config(config: &RunConfig) -> EditableConfig {
    EditableConfig {
        skill_id: config.skill_id.clone(),
        model: config.model.clone(),
        parameters: map_to_rows(&config.parameters),
        env: map_to_rows(&config.env),
    }
}

pub fn rows_to_map(rows: &[ConfigRow]) -> StringMap {
    let mut map = StringMap::new();
    for row in rows {
        let key = row.key.trim();
        if key.is_empty() {
            continue;
        }
        map.insert(key.to_string(), row.value.clone());
    }
    map
}

pub fn map_to_rows(map: &StringMap) -> Vec<ConfigRow> {
    map.iter().map(|(k, v)| ConfigRow::new(k, v)).collect()
}

/// Parse a `key=value` assignment into an editor row. The value is kept
/// verbatim and may itself contain `=`; a blank key is left for
/// [`to_config`] to drop.
pub fn parse_row(raw: &str) -> Result<ConfigRow> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| PlaygroundError::InvalidAssignment(raw.to_string()))?;
    Ok(ConfigRow::new(key, value))
}

// ---------------------------------------------------------------------------
// StoredConfig
// ---------------------------------------------------------------------------

/// The persisted "last used" configuration.
///
/// Every field is optional on read so a damaged record degrades one field
/// at a time instead of being discarded wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredConfig {
    #[serde(default)]
    pub skill: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub parameters: Option<StringMap>,
    #[serde(default)]
    pub env: Option<StringMap>,
}

impl From<&RunConfig> for StoredConfig {
    fn from(config: &RunConfig) -> Self {
        Self {
            skill: Some(config.skill_id.clone()),
            model: Some(config.model.clone()),
            parameters: Some(config.parameters.clone()),
            env: Some(config.env.clone()),
        }
    }
}

impl StoredConfig {
    /// Parse a stored record leniently: fields with the wrong shape are
    /// dropped individually, unparseable JSON yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_str(raw).ok()?;
        let obj = value.as_object()?;
        let string_field = |name: &str| obj.get(name).and_then(|v| v.as_str()).map(str::to_string);
        let map_field = |name: &str| {
            obj.get(name)
                .and_then(|v| serde_json::from_value::<StringMap>(v.clone()).ok())
        };
        Some(Self {
            skill: string_field("skill"),
            model: string_field("model"),
            parameters: map_field("parameters"),
            env: map_field("env"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: &str, value: &str) -> ConfigRow {
        ConfigRow::new(key, value)
    }

    #[test]
    fn blank_keys_are_dropped() {
        let params = vec![row("location", "Boston"), row("   ", "ignored"), row("", "x")];
        let config = to_config("weather", "claude-sonnet", &params, &[]);
        assert_eq!(config.parameters.len(), 1);
        assert_eq!(config.param("location"), Some("Boston"));
    }

    #[test]
    fn duplicate_keys_keep_last_value() {
        let env = vec![row("API_KEY", "first"), row("API_KEY", "second")];
        let config = to_config("weather", "claude-sonnet", &[], &env);
        assert_eq!(config.env.get("API_KEY").map(String::as_str), Some("second"));
    }

    #[test]
    fn keys_are_trimmed() {
        let config = to_config("weather", "m", &[row("  days ", "3")], &[]);
        assert_eq!(config.param("days"), Some("3"));
    }

    #[test]
    fn from_config_rows_have_distinct_ids() {
        let config = RunConfig::new("weather", "m")
            .with_param("location", "Boston")
            .with_param("days", "3");
        let editable = from_config(&config);
        assert_eq!(editable.parameters.len(), 2);
        assert_ne!(editable.parameters[0].id, editable.parameters[1].id);
        let back = to_config(
            &editable.skill_id,
            &editable.model,
            &editable.parameters,
            &editable.env,
        );
        assert_eq!(back, config);
    }

    #[test]
    fn captured_config_is_independent_of_rows() {
        let mut rows = vec![row("location", "Boston")];
        let captured = to_config("weather", "m", &rows, &[]);
        rows[0].value = "Denver".into();
        assert_eq!(captured.param("location"), Some("Boston"));
    }

    #[test]
    fn parse_row_cases() {
        let parsed = parse_row("query=SELECT a=1").unwrap();
        assert_eq!((parsed.key.as_str(), parsed.value.as_str()), ("query", "SELECT a=1"));
        assert!(matches!(
            parse_row("novalue"),
            Err(PlaygroundError::InvalidAssignment(raw)) if raw == "novalue"
        ));

        let rows = vec![
            parse_row(" days =3").unwrap(),
            parse_row(" =x").unwrap(),
            parse_row("=orphan").unwrap(),
        ];
        let config = to_config("weather", "m", &rows, &[]);
        assert_eq!(config.parameters.len(), 1);
        assert_eq!(config.param("days"), Some("3"));
    }

    #[test]
    fn param_or_falls_back_on_blank() {
        let config = RunConfig::new("weather", "m").with_param("days", " ");
        assert_eq!(config.param_or("days", "3"), "3");
        assert_eq!(config.param_or("location", "Boston"), "Boston");
    }

    #[test]
    fn stored_config_parse_drops_bad_fields() {
        let stored = StoredConfig::parse(
            r#"{"skill":"weather","model":42,"parameters":{"days":"3"},"env":["bad"]}"#,
        )
        .unwrap();
        assert_eq!(stored.skill.as_deref(), Some("weather"));
        assert!(stored.model.is_none());
        assert_eq!(stored.parameters.unwrap().get("days").unwrap(), "3");
        assert!(stored.env.is_none());
    }

    #[test]
    fn stored_config_parse_rejects_garbage() {
        assert!(StoredConfig::parse("{not json").is_none());
        assert!(StoredConfig::parse("[1,2]").is_none());
    }
}
