// Platform progress models
// One tagged variant per platform so gamerscore and trophy tiers are only
// reachable after matching on the platform's variant.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// How uncommon it is for a player to unlock a given achievement or trophy,
/// ordered from most to least commonly unlocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RarityTier {
    Common,
    Uncommon,
    Rare,
    VeryRare,
    UltraRare,
}

/// Classify a global unlock percentage into a rarity tier.
///
/// Thresholds are strict: exactly 50% is no longer common, exactly 5% is
/// already ultra rare. Values outside `[0, 100]` are classified by the same
/// rule. Platform-native rarity labels take precedence where a platform
/// supplies one; this is the fallback when only a raw percentage is known.
pub fn percent_to_rarity_tier(percent: Option<f64>) -> Option<RarityTier> {
    let percent = percent?;
    Some(if percent > 50.0 {
        RarityTier::Common
    } else if percent > 20.0 {
        RarityTier::Uncommon
    } else if percent > 10.0 {
        RarityTier::Rare
    } else if percent > 5.0 {
        RarityTier::VeryRare
    } else {
        RarityTier::UltraRare
    })
}

/// PlayStation trophy tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrophyTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

/// Per-tier trophy counts, used both for defined and earned totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrophyCounts {
    pub bronze: u32,
    pub silver: u32,
    pub gold: u32,
    pub platinum: u32,
}

impl TrophyCounts {
    pub fn total(&self) -> u32 {
        self.bronze + self.silver + self.gold + self.platinum
    }
}

/// A Steam achievement with localized schema data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SteamAchievement {
    /// Internal achievement identifier from the Steam schema.
    pub api_name: String,
    #[serde(default)]
    pub localized_names: HashMap<String, String>,
    #[serde(default)]
    pub localized_descriptions: HashMap<String, String>,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub icon_gray_url: Option<String>,
    #[serde(default)]
    pub achieved: bool,
    #[serde(default)]
    pub unlock_time: Option<NaiveDateTime>,
    /// Percentage of all players who unlocked this achievement.
    #[serde(default)]
    pub global_percent: Option<f64>,
}

impl SteamAchievement {
    /// Display name in the requested language, falling back to English,
    /// then a placeholder.
    pub fn display_name(&self, lang: &str) -> &str {
        self.localized_names
            .get(lang)
            .or_else(|| self.localized_names.get("en"))
            .map(String::as_str)
            .unwrap_or("Unknown Achievement")
    }

    pub fn rarity(&self) -> Option<RarityTier> {
        percent_to_rarity_tier(self.global_percent)
    }
}

/// A single PlayStation trophy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayStationTrophy {
    pub trophy_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub tier: TrophyTier,
    #[serde(default)]
    pub achieved: bool,
    #[serde(default)]
    pub unlock_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub rarity_percent: Option<f64>,
    /// Platform-native rarity when PSN reports one, otherwise derived from
    /// `rarity_percent`.
    #[serde(default)]
    pub rarity: Option<RarityTier>,
}

/// A single Xbox achievement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XboxAchievement {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub gamerscore: u32,
    #[serde(default)]
    pub achieved: bool,
    #[serde(default)]
    pub unlock_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub rarity_percent: Option<f64>,
    #[serde(default)]
    pub rarity: Option<RarityTier>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SteamProgressStats {
    pub total: u32,
    pub unlocked: u32,
    #[serde(default)]
    pub achievements: Vec<SteamAchievement>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayStationProgressStats {
    pub total: u32,
    pub unlocked: u32,
    /// Trophies defined by the game, split per tier.
    #[serde(default)]
    pub defined: TrophyCounts,
    /// Trophies the user has earned, split per tier.
    #[serde(default)]
    pub earned: TrophyCounts,
    #[serde(default)]
    pub trophies: Vec<PlayStationTrophy>,
}

impl PlayStationProgressStats {
    pub fn has_platinum(&self) -> bool {
        self.earned.platinum > 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct XboxProgressStats {
    pub total: u32,
    pub unlocked: u32,
    #[serde(default)]
    pub total_gamerscore: u32,
    #[serde(default)]
    pub unlocked_gamerscore: u32,
    #[serde(default)]
    pub achievements: Vec<XboxAchievement>,
}

/// Unified progress tracking: achievements, trophies or gamerscore depending
/// on the platform the game came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressStats {
    Steam(SteamProgressStats),
    Playstation(PlayStationProgressStats),
    Xbox(XboxProgressStats),
}

impl ProgressStats {
    pub fn total(&self) -> u32 {
        match self {
            ProgressStats::Steam(s) => s.total,
            ProgressStats::Playstation(s) => s.total,
            ProgressStats::Xbox(s) => s.total,
        }
    }

    pub fn unlocked(&self) -> u32 {
        match self {
            ProgressStats::Steam(s) => s.unlocked,
            ProgressStats::Playstation(s) => s.unlocked,
            ProgressStats::Xbox(s) => s.unlocked,
        }
    }

    /// Completion percentage rounded to one decimal, recomputed from the
    /// counts so all variants stay consistent. 0.0 when nothing is defined.
    pub fn completion_percent(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.unlocked() as f64 / total as f64 * 1000.0).round() / 10.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rarity_tiers() {
        assert_eq!(percent_to_rarity_tier(None), None);
        assert_eq!(percent_to_rarity_tier(Some(51.0)), Some(RarityTier::Common));
        assert_eq!(percent_to_rarity_tier(Some(100.0)), Some(RarityTier::Common));
        assert_eq!(percent_to_rarity_tier(Some(35.0)), Some(RarityTier::Uncommon));
        assert_eq!(percent_to_rarity_tier(Some(12.5)), Some(RarityTier::Rare));
        assert_eq!(percent_to_rarity_tier(Some(7.0)), Some(RarityTier::VeryRare));
        assert_eq!(percent_to_rarity_tier(Some(0.3)), Some(RarityTier::UltraRare));
    }

    #[test]
    fn test_rarity_boundaries_are_exclusive() {
        // Exact threshold values route to the lower tier.
        assert_eq!(percent_to_rarity_tier(Some(50.0)), Some(RarityTier::Uncommon));
        assert_eq!(percent_to_rarity_tier(Some(20.0)), Some(RarityTier::Rare));
        assert_eq!(percent_to_rarity_tier(Some(10.0)), Some(RarityTier::VeryRare));
        assert_eq!(percent_to_rarity_tier(Some(5.0)), Some(RarityTier::UltraRare));
    }

    #[test]
    fn test_rarity_out_of_range_values() {
        assert_eq!(percent_to_rarity_tier(Some(120.0)), Some(RarityTier::Common));
        assert_eq!(percent_to_rarity_tier(Some(-1.0)), Some(RarityTier::UltraRare));
    }

    #[test]
    fn test_completion_percent() {
        let stats = ProgressStats::Steam(SteamProgressStats {
            total: 20,
            unlocked: 7,
            achievements: vec![],
        });
        assert_eq!(stats.completion_percent(), 35.0);

        let empty = ProgressStats::Xbox(XboxProgressStats::default());
        assert_eq!(empty.completion_percent(), 0.0);

        // Rounds to one decimal.
        let stats = ProgressStats::Playstation(PlayStationProgressStats {
            total: 3,
            unlocked: 1,
            ..Default::default()
        });
        assert_eq!(stats.completion_percent(), 33.3);
    }

    #[test]
    fn test_has_platinum() {
        let mut stats = PlayStationProgressStats {
            total: 10,
            unlocked: 10,
            defined: TrophyCounts { bronze: 7, silver: 1, gold: 1, platinum: 1 },
            earned: TrophyCounts { bronze: 7, silver: 1, gold: 1, platinum: 0 },
            trophies: vec![],
        };
        assert!(!stats.has_platinum());
        stats.earned.platinum = 1;
        assert!(stats.has_platinum());
    }

    #[test]
    fn test_trophy_counts_total() {
        let counts = TrophyCounts { bronze: 30, silver: 10, gold: 5, platinum: 1 };
        assert_eq!(counts.total(), 46);
    }

    #[test]
    fn test_steam_achievement_name_fallback() {
        let mut ach = SteamAchievement {
            api_name: "ACH_WIN".to_string(),
            localized_names: HashMap::new(),
            localized_descriptions: HashMap::new(),
            icon_url: None,
            icon_gray_url: None,
            achieved: true,
            unlock_time: None,
            global_percent: Some(42.0),
        };
        assert_eq!(ach.display_name("schinese"), "Unknown Achievement");

        ach.localized_names.insert("en".to_string(), "Winner".to_string());
        assert_eq!(ach.display_name("schinese"), "Winner");

        ach.localized_names.insert("schinese".to_string(), "胜利者".to_string());
        assert_eq!(ach.display_name("schinese"), "胜利者");
    }
}
