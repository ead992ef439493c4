// llm/types.rs — Query analysis model and LLM adapter errors

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::OnceLock;

pub const MAX_SEARCH_KEYWORDS: usize = 5;

const WEB_HINTS: &[&str] = &["latest", "recent", "news", "current", "today"];
const WEATHER_HINTS: &[&str] = &[
    "weather", "rain", "rainy", "raining", "rainfall", "temperature", "forecast",
];
const AGRICULTURE_HINTS: &[&str] = &[
    "crop", "soil", "farm", "farming", "farmer", "plant", "planting",
];
const CODE_HINTS: &[&str] = &["script", "pyqgis", "generate code"];
const SATELLITE_HINTS: &[&str] = &["pyqgis", "satellite"];
const LOCATION_STOPWORDS: &[&str] = &[
    "today", "tomorrow", "tonight", "now", "right", "this", "next", "for", "during",
];
const LOCATION_ARTICLES: &[&str] = &["the", "a", "an"];

/// Whole-word matchers for each hint list. A trailing plural `s` is allowed.
struct Hints {
    web: Regex,
    weather: Regex,
    agriculture: Regex,
    code: Regex,
    satellite: Regex,
}

fn hints() -> &'static Hints {
    static HINTS: OnceLock<Hints> = OnceLock::new();
    HINTS.get_or_init(|| Hints {
        web: word_pattern(WEB_HINTS),
        weather: word_pattern(WEATHER_HINTS),
        agriculture: word_pattern(AGRICULTURE_HINTS),
        code: word_pattern(CODE_HINTS),
        satellite: word_pattern(SATELLITE_HINTS),
    })
}

fn word_pattern(words: &[&str]) -> Regex {
    let alternatives: Vec<String> = words.iter().map(|w| regex::escape(w)).collect();
    Regex::new(&format!(r"(?i)\b(?:{})s?\b", alternatives.join("|")))
        .expect("valid hint regex")
}

/// Kind of code the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeType {
    Pyqgis,
    Python,
    General,
}

impl CodeType {
    fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "pyqgis" => Some(Self::Pyqgis),
            "python" => Some(Self::Python),
            "general" => Some(Self::General),
            _ => None,
        }
    }
}

/// Structured reading of a user query, produced once per query by the active
/// provider. Field names match the JSON the providers are asked to emit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryAnalysis {
    #[serde(deserialize_with = "lenient_string")]
    pub intent: String,
    #[serde(deserialize_with = "lenient_bool")]
    pub needs_web_search: bool,
    #[serde(deserialize_with = "lenient_bool")]
    pub needs_weather_data: bool,
    #[serde(deserialize_with = "lenient_bool")]
    pub needs_agricultural_data: bool,
    #[serde(deserialize_with = "lenient_bool")]
    pub needs_code_generation: bool,
    #[serde(deserialize_with = "lenient_code_type")]
    pub code_type: Option<CodeType>,
    #[serde(deserialize_with = "lenient_optional_string")]
    pub location: Option<String>,
    #[serde(deserialize_with = "lenient_optional_string")]
    pub timeframe: Option<String>,
    #[serde(alias = "keywords", deserialize_with = "lenient_keywords")]
    pub search_keywords: Vec<String>,
    #[serde(deserialize_with = "lenient_bool")]
    pub requires_current_data: bool,
}

impl QueryAnalysis {
    /// Conservative analysis built from literal keyword matches on the raw
    /// query. Used whenever a provider's structured output cannot be parsed.
    pub fn heuristic(query: &str) -> Self {
        let hints = hints();

        let needs_web_search = hints.web.is_match(query);
        let needs_weather_data = hints.weather.is_match(query);
        let needs_agricultural_data = hints.agriculture.is_match(query);
        let needs_code_generation = hints.code.is_match(query);

        let code_type = if !needs_code_generation {
            None
        } else if hints.satellite.is_match(query) {
            Some(CodeType::Pyqgis)
        } else {
            Some(CodeType::General)
        };

        let location = if needs_weather_data || needs_agricultural_data {
            extract_location(query)
        } else {
            None
        };

        let search_keywords = query
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|w| w.chars().count() > 3)
            .take(MAX_SEARCH_KEYWORDS)
            .map(str::to_string)
            .collect();

        Self {
            intent: query.trim().to_string(),
            needs_web_search,
            needs_weather_data,
            needs_agricultural_data,
            needs_code_generation,
            code_type,
            location,
            timeframe: None,
            search_keywords,
            requires_current_data: needs_web_search || needs_weather_data,
        }
    }

    /// Clamp provider output to the shape the pipeline relies on.
    pub fn normalized(mut self, query: &str) -> Self {
        if self.intent.trim().is_empty() {
            self.intent = query.trim().to_string();
        }
        self.search_keywords.retain(|k| !k.trim().is_empty());
        self.search_keywords.truncate(MAX_SEARCH_KEYWORDS);
        self
    }

    pub fn needs_external_data(&self) -> bool {
        self.needs_web_search || self.needs_weather_data || self.needs_agricultural_data
    }

    /// Code requests that the PyQGIS template writer can serve.
    pub fn wants_satellite_script(&self, query: &str) -> bool {
        if !self.needs_code_generation {
            return false;
        }
        self.code_type == Some(CodeType::Pyqgis) || hints().satellite.is_match(query)
    }
}

fn extract_location(query: &str) -> Option<String> {
    let lowered = query.to_lowercase();
    let idx = lowered.rfind(" in ")?;
    let tail = query.get(idx + 4..)?;
    let tail = tail
        .split(|c: char| matches!(c, '?' | '.' | '!' | ',' | ';'))
        .next()
        .unwrap_or_default();

    let is_one_of = |list: &[&str], word: &str| list.contains(&word.to_lowercase().as_str());
    let words: Vec<&str> = tail
        .split_whitespace()
        .skip_while(|w| is_one_of(LOCATION_ARTICLES, w))
        .take_while(|w| !is_one_of(LOCATION_STOPWORDS, w))
        .collect();

    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes"),
        Value::Number(n) => n.as_i64().map(|v| v != 0).unwrap_or(false),
        _ => false,
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn lenient_optional_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        _ => None,
    })
}

fn lenient_code_type<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<CodeType>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => CodeType::from_label(&s),
        _ => None,
    })
}

fn lenient_keywords<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                _ => None,
            })
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect(),
        _ => Vec::new(),
    })
}

/// LLM adapter errors
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimitError(String),

    #[error("Invalid response from LLM")]
    InvalidResponse,

    #[error("Timeout")]
    Timeout,
}
