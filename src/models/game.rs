// Library models: platforms and games

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::progress::ProgressStats;

/// Gaming platforms a library entry can originate from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Steam,
    Playstation,
    Xbox,
    Nintendo,
    PcOther,
}

impl Platform {
    /// Prefix used to namespace game ids within a profile, e.g. `steam_440`.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Platform::Steam => "steam",
            Platform::Playstation => "psn",
            Platform::Xbox => "xbox",
            Platform::Nintendo => "nintendo",
            Platform::PcOther => "pc",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Platform::Steam => "Steam",
            Platform::Playstation => "PlayStation",
            Platform::Xbox => "Xbox",
            Platform::Nintendo => "Nintendo",
            Platform::PcOther => "PC",
        }
    }

    /// Word used for this platform's unlockables.
    pub fn progress_noun(&self) -> &'static str {
        match self {
            Platform::Playstation => "trophies",
            _ => "achievements",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A game in the user's library.
///
/// Created fresh on every library sync from platform API data; enrichment
/// calls mutate it in memory before the profile is persisted once per sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    /// Platform-qualified identifier, e.g. `steam_440`.
    pub id: String,
    pub name: String,
    /// Locale code -> localized display name. `en` is seeded from the API name.
    #[serde(default)]
    pub localized_names: HashMap<String, String>,
    pub platform: Platform,
    /// Cumulative playtime. PlayStation and Xbox do not expose playtime via
    /// their APIs, so their games always report 0 here.
    #[serde(default)]
    pub playtime_minutes: u32,
    #[serde(default)]
    pub last_played: Option<NaiveDateTime>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub release_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub header_image_url: Option<String>,
    #[serde(default)]
    pub progress: Option<ProgressStats>,
}

impl Game {
    /// Create a minimally populated game with a platform-qualified id.
    pub fn new(platform: Platform, native_id: impl fmt::Display, name: impl Into<String>) -> Self {
        let name = name.into();
        let mut localized_names = HashMap::new();
        localized_names.insert("en".to_string(), name.clone());

        Self {
            id: format!("{}_{}", platform.id_prefix(), native_id),
            name,
            localized_names,
            platform,
            playtime_minutes: 0,
            last_played: None,
            genres: Vec::new(),
            tags: Vec::new(),
            release_date: None,
            description: None,
            header_image_url: None,
            progress: None,
        }
    }

    /// Display name for a locale, falling back to the default name.
    pub fn display_name(&self, lang: &str) -> &str {
        self.localized_names
            .get(lang)
            .map(String::as_str)
            .unwrap_or(&self.name)
    }

    /// Completion percentage if any progress data is attached.
    pub fn completion_percent(&self) -> Option<f64> {
        self.progress.as_ref().map(|p| p.completion_percent())
    }

    /// Whether the game carries progress data with at least one unlockable.
    pub fn has_progress(&self) -> bool {
        self.progress.as_ref().is_some_and(|p| p.total() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_prefixes() {
        assert_eq!(Game::new(Platform::Steam, 440, "Team Fortress 2").id, "steam_440");
        assert_eq!(
            Game::new(Platform::Playstation, "NPWR12345_00", "Bloodborne").id,
            "psn_NPWR12345_00"
        );
        assert_eq!(Game::new(Platform::Xbox, "1234567", "Halo").id, "xbox_1234567");
    }

    #[test]
    fn test_display_name_fallback() {
        let mut game = Game::new(Platform::Steam, 440, "Team Fortress 2");
        game.localized_names
            .insert("schinese".to_string(), "军团要塞2".to_string());

        assert_eq!(game.display_name("schinese"), "军团要塞2");
        assert_eq!(game.display_name("en"), "Team Fortress 2");
        assert_eq!(game.display_name("fr"), "Team Fortress 2");
    }

    #[test]
    fn test_progress_noun() {
        assert_eq!(Platform::Playstation.progress_noun(), "trophies");
        assert_eq!(Platform::Steam.progress_noun(), "achievements");
        assert_eq!(Platform::Xbox.progress_noun(), "achievements");
    }
}
