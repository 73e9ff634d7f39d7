// Centralized configuration
// All credentials and preferences are read from the environment once at
// startup and threaded into client constructors, never at call sites.

use std::env;
use std::path::PathBuf;

/// Default minimum playtime before achievements are fetched for a game.
pub const DEFAULT_ACHIEVEMENT_MIN_PLAYTIME: u32 = 60;

/// Runtime configuration assembled from the environment (after dotenvy has
/// loaded any `.env` file).
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub steam_api_key: Option<String>,
    pub steam_id: Option<String>,
    pub psn_npsso_token: Option<String>,
    pub openxbl_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    /// Model for the plain OpenAI backend; Azure picks the model via its
    /// deployment instead.
    pub openai_model: String,
    pub azure_openai_api_key: Option<String>,
    pub azure_openai_endpoint: Option<String>,
    pub azure_openai_deployment: String,
    /// Display language for localized names, `en` or `schinese`.
    pub display_language: String,
    /// Override for the data directory (defaults to `~/.ludens`).
    pub data_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            steam_api_key: env_opt("STEAM_API_KEY"),
            steam_id: env_opt("STEAM_ID"),
            psn_npsso_token: env_opt("PSN_NPSSO_TOKEN"),
            openxbl_api_key: env_opt("OPENXBL_API_KEY"),
            openai_api_key: env_opt("OPENAI_API_KEY"),
            openai_model: env_opt("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            azure_openai_api_key: env_opt("AZURE_OPENAI_API_KEY"),
            azure_openai_endpoint: env_opt("AZURE_OPENAI_ENDPOINT"),
            azure_openai_deployment: env_opt("AZURE_OPENAI_DEPLOYMENT")
                .unwrap_or_else(|| "gpt-4o-mini".to_string()),
            display_language: normalize_language(
                &env_opt("DISPLAY_LANGUAGE").unwrap_or_else(|| "en".to_string()),
            ),
            data_dir: env_opt("LUDENS_DATA_DIR").map(PathBuf::from),
        }
    }

    pub fn steam_configured(&self) -> bool {
        self.steam_api_key.is_some() && self.steam_id.is_some()
    }

    pub fn psn_configured(&self) -> bool {
        self.psn_npsso_token.is_some()
    }

    pub fn xbox_configured(&self) -> bool {
        self.openxbl_api_key.is_some()
    }

    pub fn llm_configured(&self) -> bool {
        self.openai_api_key.is_some()
            || (self.azure_openai_api_key.is_some() && self.azure_openai_endpoint.is_some())
    }

    pub fn any_platform_configured(&self) -> bool {
        self.steam_configured() || self.psn_configured() || self.xbox_configured()
    }
}

/// Read an environment variable, treating empty/whitespace values as unset.
fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Map UI language codes to the codes used for localized name lookups.
/// The settings UI uses `zh` while Steam calls the same language `schinese`.
fn normalize_language(lang: &str) -> String {
    match lang {
        "zh" | "schinese" => "schinese".to_string(),
        _ => "en".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_opt_ignores_blank_values() {
        env::set_var("LUDENS_TEST_BLANK", "   ");
        assert_eq!(env_opt("LUDENS_TEST_BLANK"), None);

        env::set_var("LUDENS_TEST_SET", " value ");
        assert_eq!(env_opt("LUDENS_TEST_SET"), Some("value".to_string()));

        assert_eq!(env_opt("LUDENS_TEST_MISSING_VAR"), None);
    }

    #[test]
    fn test_normalize_language() {
        assert_eq!(normalize_language("en"), "en");
        assert_eq!(normalize_language("zh"), "schinese");
        assert_eq!(normalize_language("schinese"), "schinese");
        assert_eq!(normalize_language("fr"), "en");
    }

    #[test]
    fn test_configured_flags() {
        let mut config = Config::default();
        assert!(!config.steam_configured());
        assert!(!config.any_platform_configured());
        assert!(!config.llm_configured());

        config.steam_api_key = Some("key".to_string());
        assert!(!config.steam_configured());
        config.steam_id = Some("76561198000000000".to_string());
        assert!(config.steam_configured());
        assert!(config.any_platform_configured());

        config.openai_api_key = Some("sk-test".to_string());
        assert!(config.llm_configured());
    }
}
