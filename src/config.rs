use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_OPENROUTER_MODEL: &str = "anthropic/claude-3.5-sonnet";
pub const DEFAULT_POE_BOT_NAME: &str = "Web-Search";
pub const DEFAULT_POE_API_URL: &str = "https://api.poe.com/bot/";
pub const DEFAULT_OPEN_METEO_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
pub const DEFAULT_SCRIPT_OUTPUT_DIR: &str = "generated_scripts";

const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SOURCE_TIMEOUT_SECS: u64 = 15;
const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 120;

/// Runtime configuration, read once at process start.
///
/// Every credential is optional. A missing key removes the matching provider
/// or search tier from consideration; only the absence of all three LLM keys
/// leaves the agent without capability.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(skip_serializing)]
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    #[serde(skip_serializing)]
    pub groq_api_key: Option<String>,
    pub groq_model: String,
    #[serde(skip_serializing)]
    pub openrouter_api_key: Option<String>,
    pub openrouter_model: String,

    #[serde(skip_serializing)]
    pub poe_api_key: Option<String>,
    pub poe_bot_name: String,
    pub poe_api_url: String,
    pub duckduckgo_enabled: bool,
    pub wikipedia_enabled: bool,

    pub open_meteo_url: String,
    pub geocoding_url: String,

    #[serde(skip_serializing)]
    pub agriculture_api_key: Option<String>,
    pub agriculture_api_url: Option<String>,

    pub script_output_dir: String,

    pub llm_timeout_secs: u64,
    pub source_timeout_secs: u64,
    pub query_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            groq_api_key: None,
            groq_model: DEFAULT_GROQ_MODEL.to_string(),
            openrouter_api_key: None,
            openrouter_model: DEFAULT_OPENROUTER_MODEL.to_string(),
            poe_api_key: None,
            poe_bot_name: DEFAULT_POE_BOT_NAME.to_string(),
            poe_api_url: DEFAULT_POE_API_URL.to_string(),
            duckduckgo_enabled: true,
            wikipedia_enabled: true,
            open_meteo_url: DEFAULT_OPEN_METEO_URL.to_string(),
            geocoding_url: DEFAULT_GEOCODING_URL.to_string(),
            agriculture_api_key: None,
            agriculture_api_url: None,
            script_output_dir: DEFAULT_SCRIPT_OUTPUT_DIR.to_string(),
            llm_timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
            source_timeout_secs: DEFAULT_SOURCE_TIMEOUT_SECS,
            query_timeout_secs: DEFAULT_QUERY_TIMEOUT_SECS,
        }
    }
}

impl AppConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Self {
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!("No .env file loaded: {}", e);
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup. Blank values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| normalize_value(lookup(key));
        let defaults = Self::default();

        let config = Self {
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: get("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            groq_api_key: get("GROQ_API_KEY"),
            groq_model: get("GROQ_MODEL").unwrap_or(defaults.groq_model),
            openrouter_api_key: get("OPENROUTER_API_KEY"),
            openrouter_model: get("OPENROUTER_MODEL").unwrap_or(defaults.openrouter_model),
            poe_api_key: get("POE_API_KEY"),
            poe_bot_name: get("POE_BOT_NAME").unwrap_or(defaults.poe_bot_name),
            poe_api_url: get("POE_API_URL").unwrap_or(defaults.poe_api_url),
            duckduckgo_enabled: parse_flag(get("DUCKDUCKGO_ENABLED"), defaults.duckduckgo_enabled),
            wikipedia_enabled: parse_flag(get("WIKIPEDIA_ENABLED"), defaults.wikipedia_enabled),
            open_meteo_url: get("OPEN_METEO_URL").unwrap_or(defaults.open_meteo_url),
            geocoding_url: get("GEOCODING_URL").unwrap_or(defaults.geocoding_url),
            agriculture_api_key: get("AGRICULTURE_API_KEY"),
            agriculture_api_url: get("AGRICULTURE_API_URL"),
            script_output_dir: get("SCRIPT_OUTPUT_DIR").unwrap_or(defaults.script_output_dir),
            llm_timeout_secs: parse_secs(get("LLM_TIMEOUT_SECS"), defaults.llm_timeout_secs),
            source_timeout_secs: parse_secs(
                get("SOURCE_TIMEOUT_SECS"),
                defaults.source_timeout_secs,
            ),
            query_timeout_secs: parse_secs(get("QUERY_TIMEOUT_SECS"), defaults.query_timeout_secs),
        };

        tracing::info!(
            "Config loaded: gemini={}, groq={}, openrouter={}, poe={}, agriculture={}",
            config.gemini_api_key.is_some(),
            config.valid_groq_key().is_some(),
            config.openrouter_api_key.is_some(),
            config.poe_api_key.is_some(),
            config.agriculture_configured()
        );

        config
    }

    /// Groq keys are only accepted with their `gsk_` prefix.
    pub fn valid_groq_key(&self) -> Option<&str> {
        self.groq_api_key
            .as_deref()
            .filter(|key| key.starts_with("gsk_"))
    }

    pub fn has_any_llm_key(&self) -> bool {
        self.gemini_api_key.is_some()
            || self.valid_groq_key().is_some()
            || self.openrouter_api_key.is_some()
    }

    pub fn agriculture_configured(&self) -> bool {
        self.agriculture_api_key.is_some() && self.agriculture_api_url.is_some()
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

pub fn mask_api_key(api_key: &str) -> String {
    let chars: Vec<char> = api_key.chars().collect();
    if chars.len() <= 10 {
        return "******".to_string();
    }

    let prefix: String = chars[..6].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{}********{}", prefix, suffix)
}

fn normalize_value(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn parse_flag(value: Option<String>, default: bool) -> bool {
    match value.as_deref().map(|v| v.to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

fn parse_secs(value: Option<String>, default: u64) -> u64 {
    value
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = config_from(&[]);
        assert!(!config.has_any_llm_key());
        assert_eq!(config.gemini_model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.poe_bot_name, DEFAULT_POE_BOT_NAME);
        assert!(config.duckduckgo_enabled);
        assert_eq!(config.query_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn blank_keys_are_absent() {
        let config = config_from(&[("GEMINI_API_KEY", "   "), ("OPENROUTER_API_KEY", "")]);
        assert!(config.gemini_api_key.is_none());
        assert!(config.openrouter_api_key.is_none());
    }

    #[test]
    fn groq_key_requires_prefix() {
        let bad = config_from(&[("GROQ_API_KEY", "abc123")]);
        assert!(bad.valid_groq_key().is_none());
        assert!(!bad.has_any_llm_key());

        let good = config_from(&[("GROQ_API_KEY", "gsk_abc123")]);
        assert_eq!(good.valid_groq_key(), Some("gsk_abc123"));
    }

    #[test]
    fn flags_and_timeouts_parse() {
        let config = config_from(&[
            ("WIKIPEDIA_ENABLED", "false"),
            ("SOURCE_TIMEOUT_SECS", "5"),
            ("LLM_TIMEOUT_SECS", "not-a-number"),
            ("QUERY_TIMEOUT_SECS", "0"),
        ]);
        assert!(!config.wikipedia_enabled);
        assert_eq!(config.source_timeout_secs, 5);
        assert_eq!(config.llm_timeout_secs, DEFAULT_LLM_TIMEOUT_SECS);
        assert_eq!(config.query_timeout_secs, DEFAULT_QUERY_TIMEOUT_SECS);
    }

    #[test]
    fn agriculture_needs_key_and_url() {
        let key_only = config_from(&[("AGRICULTURE_API_KEY", "k")]);
        assert!(!key_only.agriculture_configured());

        let both = config_from(&[
            ("AGRICULTURE_API_KEY", "k"),
            ("AGRICULTURE_API_URL", "https://agri.example"),
        ]);
        assert!(both.agriculture_configured());
    }

    #[test]
    fn secrets_are_not_serialized() {
        let config = config_from(&[("GEMINI_API_KEY", "secret-gemini-key")]);
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret-gemini-key"));
        assert!(json.contains("geminiModel"));
    }

    #[test]
    fn masks_api_keys() {
        assert_eq!(mask_api_key("short"), "******");
        assert_eq!(mask_api_key("gsk_1234567890abcd"), "gsk_12********abcd");
    }
}
