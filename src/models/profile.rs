// User profile aggregate
// Root entity persisted as one JSON document. Owns no business logic beyond
// read-only aggregation over the current game and wishlist lists.

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::game::{Game, Platform};
use crate::models::wishlist::WishlistItem;

/// A single historical play session. Currently write-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaySession {
    pub game_id: String,
    pub platform: Platform,
    pub started_at: NaiveDateTime,
    pub duration_minutes: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Gaming preferences learned over time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    pub favorite_genres: Vec<String>,
    pub favorite_tags: Vec<String>,
    pub preferred_session_length_minutes: Option<u32>,
    /// Free-form notes collected from conversations.
    pub notes: String,
}

/// Complete user profile across all platforms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub steam_id: Option<String>,
    pub psn_online_id: Option<String>,
    pub xbox_gamertag: Option<String>,
    pub games: Vec<Game>,
    pub wishlist: Vec<WishlistItem>,
    pub play_history: Vec<PlaySession>,
    pub preferences: UserPreferences,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Default for UserProfile {
    fn default() -> Self {
        let now = Utc::now().naive_utc();
        Self {
            steam_id: None,
            psn_online_id: None,
            xbox_gamertag: None,
            games: Vec::new(),
            wishlist: Vec::new(),
            play_history: Vec::new(),
            preferences: UserPreferences::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl UserProfile {
    pub fn game(&self, id: &str) -> Option<&Game> {
        self.games.iter().find(|g| g.id == id)
    }

    pub fn games_on(&self, platform: Platform) -> impl Iterator<Item = &Game> {
        self.games.iter().filter(move |g| g.platform == platform)
    }

    pub fn platform_count(&self, platform: Platform) -> usize {
        self.games_on(platform).count()
    }

    pub fn total_playtime_minutes(&self) -> u64 {
        self.games.iter().map(|g| u64::from(g.playtime_minutes)).sum()
    }

    /// Games with recorded activity: nonzero playtime or a last-played date
    /// (PlayStation and Xbox never report playtime).
    pub fn played_count(&self) -> usize {
        self.games
            .iter()
            .filter(|g| g.playtime_minutes > 0 || g.last_played.is_some())
            .count()
    }

    pub fn unplayed_count(&self) -> usize {
        self.games.len() - self.played_count()
    }

    /// Sum of (total, unlocked) across all games that carry progress data.
    pub fn progress_totals(&self) -> (u32, u32) {
        self.games
            .iter()
            .filter_map(|g| g.progress.as_ref())
            .fold((0, 0), |(total, unlocked), p| {
                (total + p.total(), unlocked + p.unlocked())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::progress::{ProgressStats, SteamProgressStats, XboxProgressStats};

    fn game_with_progress(platform: Platform, native_id: &str, total: u32, unlocked: u32) -> Game {
        let mut game = Game::new(platform, native_id, format!("Game {native_id}"));
        game.progress = Some(match platform {
            Platform::Xbox => ProgressStats::Xbox(XboxProgressStats {
                total,
                unlocked,
                ..Default::default()
            }),
            _ => ProgressStats::Steam(SteamProgressStats {
                total,
                unlocked,
                achievements: vec![],
            }),
        });
        game
    }

    #[test]
    fn test_aggregation_helpers() {
        let mut profile = UserProfile::default();

        let mut played = Game::new(Platform::Steam, 440, "Team Fortress 2");
        played.playtime_minutes = 600;
        profile.games.push(played);

        let mut psn = game_with_progress(Platform::Playstation, "NPWR00001_00", 30, 12);
        psn.last_played = Some(Utc::now().naive_utc());
        profile.games.push(psn);

        profile.games.push(game_with_progress(Platform::Xbox, "123", 50, 9));

        assert_eq!(profile.platform_count(Platform::Steam), 1);
        assert_eq!(profile.platform_count(Platform::Playstation), 1);
        assert_eq!(profile.platform_count(Platform::Xbox), 1);
        assert_eq!(profile.total_playtime_minutes(), 600);
        assert_eq!(profile.played_count(), 2);
        assert_eq!(profile.unplayed_count(), 1);
        assert_eq!(profile.progress_totals(), (80, 21));
        assert!(profile.game("steam_440").is_some());
        assert!(profile.game("steam_999").is_none());
    }
}
