//! Provider configuration resolution from environment variables.

use std::env;
use std::str::FromStr;

use super::{GenerationParams, ProviderError};

/// Supported model providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Anthropic,
    OpenAi,
    Google,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::Anthropic,
        ProviderKind::OpenAi,
        ProviderKind::Google,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Google => "google",
        }
    }

    /// Environment variable holding the API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Google => "GOOGLE_GENERATIVE_AI_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "claude-3-5-sonnet-latest",
            ProviderKind::OpenAi => "gpt-4o",
            ProviderKind::Google => "gemini-1.5-pro",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "https://api.anthropic.com",
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::Google => "https://generativelanguage.googleapis.com",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" => Ok(ProviderKind::Anthropic),
            "openai" => Ok(ProviderKind::OpenAi),
            "google" | "gemini" => Ok(ProviderKind::Google),
            other => Err(ProviderError::Config(format!("Unknown provider: {other}"))),
        }
    }
}

/// Resolved settings for the outbound model call.
#[derive(Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub model: String,
    pub api_key: Option<String>,
    /// Overrides [`ProviderKind::default_base_url`].
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ProviderConfig {
    /// Defaults for `kind`, without an API key.
    pub fn new(kind: ProviderKind) -> Self {
        let defaults = GenerationParams::default();
        Self {
            kind,
            model: kind.default_model().to_string(),
            api_key: None,
            base_url: None,
            temperature: defaults.temperature,
            max_tokens: defaults.max_tokens,
            timeout_secs: 120,
        }
    }

    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                  | Default                                  |
    /// |---------------------------|------------------------------------------|
    /// | `CHART_PROVIDER`          | first provider with a key, else `anthropic` |
    /// | `CHART_MODEL`             | provider default                         |
    /// | `CHART_PROVIDER_BASE_URL` | provider default                         |
    /// | `CHART_TEMPERATURE`       | `0.3`                                    |
    /// | `CHART_MAX_TOKENS`        | `4096`                                   |
    /// | `CHART_TIMEOUT_SECS`      | `120`                                    |
    pub fn from_env() -> Result<Self, ProviderError> {
        let kind = match env::var("CHART_PROVIDER") {
            Ok(name) => name.parse()?,
            Err(_) => ProviderKind::ALL
                .into_iter()
                .find(|k| env::var(k.api_key_env()).is_ok_and(|v| !v.is_empty()))
                .unwrap_or(ProviderKind::Anthropic),
        };

        let mut config = Self::new(kind);
        config.api_key = env::var(kind.api_key_env()).ok().filter(|v| !v.is_empty());
        if let Ok(model) = env::var("CHART_MODEL") {
            config.model = model;
        }
        config.base_url = env::var("CHART_PROVIDER_BASE_URL").ok();
        config.temperature = parse_env("CHART_TEMPERATURE", config.temperature)?;
        config.max_tokens = parse_env("CHART_MAX_TOKENS", config.max_tokens)?;
        config.timeout_secs = parse_env("CHART_TIMEOUT_SECS", config.timeout_secs)?;
        Ok(config)
    }

    /// Generation parameters for each call.
    pub fn params(&self) -> GenerationParams {
        GenerationParams {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            json_mode: true,
        }
    }
}

fn parse_env<T: FromStr>(name: &str, default: T) -> Result<T, ProviderError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ProviderError::Config(format!("{name} has an invalid value: {raw}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_names_parse() {
        assert_eq!("anthropic".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
        assert_eq!(" OpenAI ".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!("gemini".parse::<ProviderKind>().unwrap(), ProviderKind::Google);
        assert!("azure".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn new_uses_provider_defaults() {
        let config = ProviderConfig::new(ProviderKind::Google);
        assert_eq!(config.model, "gemini-1.5-pro");
        assert!(config.api_key.is_none());
        assert_eq!(config.params(), GenerationParams::default());
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = ProviderConfig {
            api_key: Some("sk-secret".into()),
            ..ProviderConfig::new(ProviderKind::OpenAi)
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn key_env_names() {
        assert_eq!(ProviderKind::Anthropic.api_key_env(), "ANTHROPIC_API_KEY");
        assert_eq!(ProviderKind::OpenAi.api_key_env(), "OPENAI_API_KEY");
        assert_eq!(
            ProviderKind::Google.api_key_env(),
            "GOOGLE_GENERATIVE_AI_API_KEY"
        );
    }
}
