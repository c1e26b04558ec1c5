//! Share links: a compact, URL-safe encoding of a configuration's variable
//! parts, plus the query-string layout used by deep links.
//!
//! # Token format
//!
//! ```text
//! v1.<base64url(JSON object of string -> string), no padding>
//! ```
//!
//! The `v1.` tag lets later releases change the payload shape without
//! misreading old links. Untagged tokens (bare base64url JSON, padding
//! optional) are still accepted so links minted before the tag existed keep
//! working. Any token that fails to decode yields `None`; callers fall back
//! to defaults.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use url::form_urlencoded;
use url::Url;

use crate::run_config::{RunConfig, StringMap};

pub const TOKEN_VERSION: &str = "v1";

pub const QUERY_SKILL: &str = "skill";
pub const QUERY_MODEL: &str = "model";
pub const QUERY_PARAMS: &str = "params";
pub const QUERY_ENV: &str = "env";

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

pub fn encode(value: &StringMap) -> String {
    // A map of strings always serializes; the fallback is unreachable in practice.
    let json = serde_json::to_vec(value).unwrap_or_else(|_| b"{}".to_vec());
    format!("{TOKEN_VERSION}.{}", URL_SAFE_NO_PAD.encode(json))
}

pub fn decode(token: &str) -> Option<StringMap> {
    let token = token.trim();
    let payload = match token.split_once('.') {
        Some((version, payload)) if version == TOKEN_VERSION => payload,
        Some(_) => return None,
        None => token,
    };
    let normalized: String = payload
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    let bytes = URL_SAFE_NO_PAD.decode(normalized.as_bytes()).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    serde_json::from_str::<StringMap>(&text).ok()
}

// ---------------------------------------------------------------------------
// ShareQuery
// ---------------------------------------------------------------------------

/// The four share parameters as they appear in a link, still undecoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareQuery {
    pub skill: Option<String>,
    pub model: Option<String>,
    pub params: Option<String>,
    pub env: Option<String>,
}

impl ShareQuery {
    /// Parse a query string (with or without the leading `?`).
    ///
    /// Returns `None` when none of the share parameters are present.
    pub fn parse(query: &str) -> Option<Self> {
        let mut parsed = ShareQuery::default();
        let query = query.trim().trim_start_matches('?');
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let slot = match key.as_ref() {
                QUERY_SKILL => &mut parsed.skill,
                QUERY_MODEL => &mut parsed.model,
                QUERY_PARAMS => &mut parsed.params,
                QUERY_ENV => &mut parsed.env,
                _ => continue,
            };
            *slot = Some(value.into_owned());
        }
        if parsed == ShareQuery::default() {
            None
        } else {
            Some(parsed)
        }
    }

    /// Parse either an absolute link or a bare query string.
    pub fn from_link(link: &str) -> Option<Self> {
        query_of(link).as_deref().and_then(Self::parse)
    }

    pub fn decoded_params(&self) -> Option<StringMap> {
        self.params.as_deref().and_then(decode)
    }

    pub fn decoded_env(&self) -> Option<StringMap> {
        self.env.as_deref().and_then(decode)
    }
}

/// The query part of an absolute link, with its leading `?`. Anything that
/// does not parse as a URL is taken to be a query already.
pub fn query_of(link: &str) -> Option<String> {
    let link = link.trim();
    match Url::parse(link) {
        Ok(url) => url.query().map(|q| format!("?{q}")),
        Err(_) if link.is_empty() => None,
        Err(_) => Some(format!("?{}", link.trim_start_matches('?'))),
    }
}

// ---------------------------------------------------------------------------
// Link building
// ---------------------------------------------------------------------------

/// Relative share query, including the leading `?`.
pub fn share_query(config: &RunConfig) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair(QUERY_SKILL, &config.skill_id)
        .append_pair(QUERY_MODEL, &config.model)
        .append_pair(QUERY_PARAMS, &encode(&config.parameters))
        .append_pair(QUERY_ENV, &encode(&config.env))
        .finish();
    format!("?{query}")
}

/// Absolute share link: `origin` with its query replaced by [`share_query`].
pub fn share_url(origin: &str, config: &RunConfig) -> String {
    let query = share_query(config);
    match Url::parse(origin) {
        Ok(mut url) => {
            url.set_query(Some(query.trim_start_matches('?')));
            url.to_string()
        }
        Err(_) => format!("{}{query}", origin.trim_end_matches('?')),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> StringMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn roundtrip_preserves_unicode_and_symbols() {
        let m = map(&[
            ("location", "São Paulo"),
            ("query", "SELECT * FROM t WHERE a = 'x' && b/c"),
            ("emoji", "☀️ 🌧"),
            ("", "empty key survives the codec"),
        ]);
        assert_eq!(decode(&encode(&m)), Some(m));
    }

    #[test]
    fn roundtrip_empty_map() {
        let m = StringMap::new();
        assert_eq!(decode(&encode(&m)), Some(m));
    }

    #[test]
    fn token_is_url_safe_and_tagged() {
        // Bytes chosen so standard base64 would emit '+' and '/'.
        let m = map(&[("k", "~~~???>>>")]);
        let token = encode(&m);
        assert!(token.starts_with("v1."));
        assert!(!token.contains('+'));
        assert!(!token.contains('/'));
        assert!(!token.contains('='));
    }

    #[test]
    fn legacy_untagged_tokens_decode() {
        // base64 of {"days":"3"}, standard alphabet, no padding needed.
        assert_eq!(decode("eyJkYXlzIjoiMyJ9"), Some(map(&[("days", "3")])));
        // Padded standard-alphabet tokens decode too.
        let padded = base64::engine::general_purpose::STANDARD.encode(br#"{"a":"bc"}"#);
        assert!(padded.ends_with('='));
        assert_eq!(decode(&padded), Some(map(&[("a", "bc")])));
    }

    #[test]
    fn malformed_tokens_yield_none() {
        for bad in [
            "not-base64!!",
            "%%%invalid%%%",
            "",
            "v1.",
            "v2.eyJkYXlzIjoiMyJ9",
            "bm90IGpzb24",     // "not json"
            "WzEsMiwzXQ",      // [1,2,3]
            "eyJkYXlzIjozfQ",  // {"days":3}
            "/w",              // 0xff, invalid UTF-8
        ] {
            assert_eq!(decode(bad), None, "token {bad:?} should not decode");
        }
    }

    #[test]
    fn truncated_token_yields_none() {
        let token = encode(&map(&[("location", "Boston"), ("days", "3")]));
        let truncated = &token[..token.len() - 5];
        assert_eq!(decode(truncated), None);
    }

    #[test]
    fn query_parse_requires_a_share_key() {
        assert!(ShareQuery::parse("?utm_source=newsletter").is_none());
        assert!(ShareQuery::parse("").is_none());
        let q = ShareQuery::parse("?model=claude-opus&utm=x").unwrap();
        assert_eq!(q.model.as_deref(), Some("claude-opus"));
        assert!(q.skill.is_none());
    }

    #[test]
    fn malformed_params_in_query_do_not_decode() {
        let q = ShareQuery::parse("skill=weather&params=%%%invalid%%%").unwrap();
        assert_eq!(q.skill.as_deref(), Some("weather"));
        assert!(q.params.is_some());
        assert_eq!(q.decoded_params(), None);
    }

    #[test]
    fn share_url_roundtrips_through_from_link() {
        let config = RunConfig::new("weather", "claude-sonnet")
            .with_param("location", "New York")
            .with_env("API_KEY", "sk-abcdef123456");
        let link = share_url("https://skillplay.dev/playground", &config);
        assert!(link.starts_with("https://skillplay.dev/playground?skill=weather"));

        let q = ShareQuery::from_link(&link).unwrap();
        assert_eq!(q.skill.as_deref(), Some("weather"));
        assert_eq!(q.model.as_deref(), Some("claude-sonnet"));
        assert_eq!(q.decoded_params(), Some(config.parameters.clone()));
        assert_eq!(q.decoded_env(), Some(config.env.clone()));
    }

    #[test]
    fn share_url_replaces_existing_query() {
        let config = RunConfig::new("weather", "claude-sonnet");
        let link = share_url("https://skillplay.dev/playground?skill=old", &config);
        assert_eq!(link.matches("skill=").count(), 1);
    }

    #[test]
    fn query_of_links_and_bare_queries() {
        assert_eq!(
            query_of("https://skillplay.dev/playground?skill=weather").as_deref(),
            Some("?skill=weather")
        );
        assert_eq!(query_of("https://skillplay.dev/playground"), None);
        assert_eq!(query_of("skill=weather").as_deref(), Some("?skill=weather"));
        assert_eq!(query_of("?skill=weather").as_deref(), Some("?skill=weather"));
        assert_eq!(query_of("   "), None);
    }
}
