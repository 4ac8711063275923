//! Server configuration read from the environment.

use crowdstory_core::config::{GameConfig, MAX_VOTING_DURATION_MS, TieBreakPolicy};
use crowdstory_core::theme::Theme;
use crowdstory_story::chat::{DEFAULT_BASE_URL, DEFAULT_MODELS};

use crate::error::AppError;

/// Hosted language model settings. Present only when an API key is set.
#[derive(Clone, PartialEq, Eq)]
pub struct ModelBackendConfig {
    /// Bearer key for the provider.
    pub api_key: String,
    /// Provider base URL.
    pub base_url: String,
    /// Models tried in order.
    pub models: Vec<String>,
}

impl std::fmt::Debug for ModelBackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBackendConfig")
            .field("base_url", &self.base_url)
            .field("models", &self.models)
            .finish_non_exhaustive()
    }
}

/// Everything the binary needs to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Settings applied to every room.
    pub game: GameConfig,
    /// Story model backend; the offline story table is used when absent.
    pub model: Option<ModelBackendConfig>,
}

impl ServerConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when a variable holds an invalid value.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`. Unset variables keep their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when a variable holds an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(&lookup, "PORT", 3000)?;

        let defaults = GameConfig::default();
        let max_players: usize = parse_or(&lookup, "CROWDSTORY_MAX_PLAYERS", defaults.max_players)?;
        if max_players == 0 {
            return Err(AppError::Config(
                "CROWDSTORY_MAX_PLAYERS must be at least 1".to_string(),
            ));
        }
        let voting_duration_ms: u64 =
            parse_or(&lookup, "CROWDSTORY_VOTING_MS", defaults.voting_duration_ms)?;
        if voting_duration_ms == 0 || voting_duration_ms > MAX_VOTING_DURATION_MS {
            return Err(AppError::Config(format!(
                "CROWDSTORY_VOTING_MS must be between 1 and {MAX_VOTING_DURATION_MS}"
            )));
        }
        let max_rounds = match lookup("CROWDSTORY_MAX_ROUNDS") {
            None => defaults.max_rounds,
            Some(raw) => match parse_value::<u32>("CROWDSTORY_MAX_ROUNDS", &raw)? {
                0 => None,
                n => Some(n),
            },
        };
        let tie_break = match lookup("CROWDSTORY_TIE_BREAK") {
            None => defaults.tie_break,
            Some(raw) => raw
                .parse::<TieBreakPolicy>()
                .map_err(|e| AppError::Config(format!("CROWDSTORY_TIE_BREAK: {e}")))?,
        };
        let default_theme = match lookup("CROWDSTORY_THEME") {
            None => defaults.default_theme,
            Some(raw) => raw
                .parse::<Theme>()
                .map_err(|e| AppError::Config(format!("CROWDSTORY_THEME: {e}")))?,
        };

        Ok(Self {
            host,
            port,
            game: GameConfig {
                max_players,
                voting_duration_ms,
                max_rounds,
                tie_break,
                default_theme,
            },
            model: model_backend(&lookup),
        })
    }
}

fn model_backend(lookup: &impl Fn(&str) -> Option<String>) -> Option<ModelBackendConfig> {
    let api_key = lookup("CROWDSTORY_MODEL_API_KEY")
        .map(|key| key.trim().to_owned())
        .filter(|key| !key.is_empty())?;
    let base_url = lookup("CROWDSTORY_MODEL_BASE_URL")
        .map(|url| url.trim().to_owned())
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
    let mut models: Vec<String> = lookup("CROWDSTORY_MODELS")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|model| !model.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();
    if models.is_empty() {
        models = DEFAULT_MODELS.iter().map(|model| (*model).to_owned()).collect();
    }
    Some(ModelBackendConfig {
        api_key,
        base_url,
        models,
    })
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| AppError::Config(format!("{key} must be a valid number: {e}")))
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key).map_or(Ok(default), |raw| parse_value(key, &raw))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<ServerConfig, AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_apply_when_nothing_is_set() {
        // Act
        let config = config_from(&[]).unwrap();

        // Assert
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.game, GameConfig::default());
        assert_eq!(config.model, None);
    }

    #[test]
    fn test_model_backend_needs_api_key() {
        // Act
        let config = config_from(&[
            ("CROWDSTORY_MODEL_API_KEY", "  "),
            ("CROWDSTORY_MODELS", "openai/gpt-4o"),
        ])
        .unwrap();

        // Assert
        assert_eq!(config.model, None);
    }

    #[test]
    fn test_model_backend_defaults_endpoint_and_models() {
        // Act
        let config = config_from(&[("CROWDSTORY_MODEL_API_KEY", "secret")]).unwrap();

        // Assert
        let model = config.model.unwrap();
        assert_eq!(model.api_key, "secret");
        assert_eq!(model.base_url, DEFAULT_BASE_URL);
        assert_eq!(model.models.len(), DEFAULT_MODELS.len());
        assert_eq!(model.models[0], DEFAULT_MODELS[0]);
    }

    #[test]
    fn test_model_list_is_read_in_order() {
        // Act
        let config = config_from(&[
            ("CROWDSTORY_MODEL_API_KEY", "secret"),
            ("CROWDSTORY_MODEL_BASE_URL", "https://llm.internal/v1"),
            ("CROWDSTORY_MODELS", "openai/gpt-4o, ,xai/grok-2-latest"),
        ])
        .unwrap();

        // Assert
        let model = config.model.unwrap();
        assert_eq!(model.base_url, "https://llm.internal/v1");
        assert_eq!(model.models, vec!["openai/gpt-4o", "xai/grok-2-latest"]);
    }

    #[test]
    fn test_model_backend_debug_hides_api_key() {
        let config = config_from(&[("CROWDSTORY_MODEL_API_KEY", "secret")]).unwrap();

        assert!(!format!("{config:?}").contains("secret"));
    }

    #[test]
    fn test_game_settings_are_read() {
        // Act
        let config = config_from(&[
            ("PORT", "8080"),
            ("CROWDSTORY_MAX_PLAYERS", "4"),
            ("CROWDSTORY_VOTING_MS", "5000"),
            ("CROWDSTORY_MAX_ROUNDS", "0"),
            ("CROWDSTORY_TIE_BREAK", "first-listed"),
            ("CROWDSTORY_THEME", "Mystery"),
        ])
        .unwrap();

        // Assert
        assert_eq!(config.port, 8080);
        assert_eq!(config.game.max_players, 4);
        assert_eq!(config.game.voting_duration_ms, 5000);
        assert_eq!(config.game.max_rounds, None);
        assert_eq!(config.game.tie_break, TieBreakPolicy::FirstListed);
        assert_eq!(config.game.default_theme, Theme::Mystery);
    }

    #[test]
    fn test_voting_window_accepts_upper_bound() {
        // Act
        let config = config_from(&[("CROWDSTORY_VOTING_MS", "3600000")]).unwrap();

        // Assert
        assert_eq!(config.game.voting_duration_ms, MAX_VOTING_DURATION_MS);
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        for vars in [
            [("PORT", "http")],
            [("CROWDSTORY_MAX_PLAYERS", "0")],
            [("CROWDSTORY_VOTING_MS", "-1")],
            [("CROWDSTORY_VOTING_MS", "100000000000000000")],
            [("CROWDSTORY_VOTING_MS", "3600001")],
            [("CROWDSTORY_TIE_BREAK", "coin")],
            [("CROWDSTORY_THEME", "western")],
        ] {
            assert!(
                matches!(config_from(&vars), Err(AppError::Config(_))),
                "{vars:?}"
            );
        }
    }
}
