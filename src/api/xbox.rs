// Xbox Live client via the OpenXBL proxy (https://xbl.io).
// Title history supplies the library with aggregate achievement counts;
// per-title achievement lists come from the achievements endpoint.

use chrono::NaiveDateTime;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::models::{
    Game, Platform, ProgressStats, XboxAchievement, XboxProgressStats, percent_to_rarity_tier,
};
use crate::utils::config::Config;

const OPENXBL_API_BASE: &str = "https://xbl.io/api/v2";

#[derive(Debug, Error)]
pub enum XboxApiError {
    #[error(
        "OpenXBL API key not configured. Set OPENXBL_API_KEY in your .env \
         (create one at https://xbl.io after linking your Xbox account)"
    )]
    MissingApiKey,
    #[error("Xbox authentication failed: {0}. Check your OpenXBL API key at https://xbl.io")]
    Auth(String),
    #[error("Xbox API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Xbox API error: {0}")]
    Api(String),
}

/// Client for Xbox Live data through OpenXBL.
pub struct XboxClient {
    http: reqwest::Client,
    api_key: String,
    gamertag: String,
}

impl XboxClient {
    /// Validate the API key by resolving the linked account.
    pub async fn new(http: reqwest::Client, config: &Config) -> Result<Self, XboxApiError> {
        let api_key = config.openxbl_api_key.clone().ok_or(XboxApiError::MissingApiKey)?;

        let response = http
            .get(format!("{OPENXBL_API_BASE}/account"))
            .header("X-Authorization", &api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(XboxApiError::Auth(format!(
                "account lookup returned {}",
                response.status()
            )));
        }

        let body: AccountResponse = response
            .json()
            .await
            .map_err(|e| XboxApiError::Auth(e.to_string()))?;
        let gamertag = body
            .profile_users
            .into_iter()
            .next()
            .and_then(|user| {
                user.settings
                    .into_iter()
                    .find(|s| s.id == "Gamertag")
                    .map(|s| s.value)
            })
            .ok_or_else(|| XboxApiError::Auth("no linked Xbox profile".to_string()))?;

        Ok(Self { http, api_key, gamertag })
    }

    pub fn gamertag(&self) -> &str {
        &self.gamertag
    }

    /// Fetch the played-title history as games with aggregate achievement
    /// progress. Non-game titles (apps) are skipped.
    pub async fn get_owned_games(&self) -> Result<Vec<Game>, XboxApiError> {
        let response = self
            .http
            .get(format!("{OPENXBL_API_BASE}/player/titleHistory"))
            .header("X-Authorization", &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(XboxApiError::Api(format!(
                "titleHistory returned {}",
                response.status()
            )));
        }

        let body: TitleHistoryResponse = response.json().await?;
        let games = body
            .titles
            .into_iter()
            .filter(|t| t.title_type.as_deref() == Some("Game"))
            .map(|title| {
                let mut game = Game::new(Platform::Xbox, &title.title_id, title.name);
                game.header_image_url = title.display_image;
                game.last_played = title
                    .title_history
                    .and_then(|h| h.last_time_played)
                    .as_deref()
                    .and_then(parse_xbox_datetime);

                if let Some(ach) = title.achievement {
                    let unlocked = ach.current_achievements;
                    let total = estimate_total_achievements(
                        ach.total_achievements,
                        unlocked,
                        ach.progress_percentage,
                        ach.total_gamerscore,
                    );
                    game.progress = Some(ProgressStats::Xbox(XboxProgressStats {
                        total,
                        unlocked,
                        total_gamerscore: ach.total_gamerscore,
                        unlocked_gamerscore: ach.current_gamerscore,
                        achievements: Vec::new(),
                    }));
                }
                game
            })
            .collect();

        Ok(games)
    }

    /// Per-title achievement list, None when the lookup fails.
    pub async fn get_game_achievements(&self, title_id: &str) -> Option<Vec<XboxAchievement>> {
        let response = self
            .http
            .get(format!("{OPENXBL_API_BASE}/achievements/title/{title_id}"))
            .header("X-Authorization", &self.api_key)
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            warn!("achievement fetch for {title_id} returned {}", response.status());
            return None;
        }

        let body: TitleAchievementsResponse = response.json().await.ok()?;
        let achievements = body
            .achievements
            .into_iter()
            .map(|ach| {
                let rarity_percent = ach.rarity.and_then(|r| r.current_percentage);
                XboxAchievement {
                    id: ach.id,
                    name: Some(ach.name),
                    description: ach.description,
                    gamerscore: ach
                        .rewards
                        .iter()
                        .filter(|r| r.reward_type.as_deref() == Some("Gamerscore"))
                        .filter_map(|r| r.value.as_deref())
                        .filter_map(|v| v.parse::<u32>().ok())
                        .sum(),
                    achieved: ach.progress_state.as_deref() == Some("Achieved"),
                    unlock_time: ach
                        .progression
                        .and_then(|p| p.time_unlocked)
                        .as_deref()
                        .and_then(parse_xbox_datetime),
                    rarity_percent,
                    rarity: percent_to_rarity_tier(rarity_percent),
                }
            })
            .collect();

        Some(achievements)
    }

    /// Attach the per-achievement list in place, correcting the estimated
    /// totals from the real list when available. Failures leave the
    /// aggregate counts from the title history untouched.
    pub async fn enrich_game_with_achievements(&self, game: &mut Game) {
        let Some(title_id) = game.id.strip_prefix("xbox_") else {
            return;
        };
        let Some(achievements) = self.get_game_achievements(title_id).await else {
            return;
        };
        if achievements.is_empty() {
            return;
        }

        if let Some(ProgressStats::Xbox(stats)) = &mut game.progress {
            stats.total = achievements.len() as u32;
            stats.unlocked = achievements.iter().filter(|a| a.achieved).count() as u32;
            stats.total_gamerscore = achievements.iter().map(|a| a.gamerscore).sum();
            stats.unlocked_gamerscore = achievements
                .iter()
                .filter(|a| a.achieved)
                .map(|a| a.gamerscore)
                .sum();
            stats.achievements = achievements;
        }
    }
}

/// Best-effort estimate of a title's total achievement count.
///
/// The title history often reports `totalAchievements` as zero, so the total
/// is reconstructed from the unlocked count and the progress percentage,
/// falling back to gamerscore at the conventional 20 points per achievement.
/// The result is never below the unlocked count.
fn estimate_total_achievements(
    total: u32,
    unlocked: u32,
    progress_percent: f64,
    total_gamerscore: u32,
) -> u32 {
    if total > 0 {
        return total.max(unlocked);
    }
    let estimated = if progress_percent >= 100.0 {
        unlocked
    } else if progress_percent > 0.0 && unlocked > 0 {
        (unlocked as f64 * 100.0 / progress_percent).round() as u32
    } else {
        total_gamerscore / 20
    };
    estimated.max(unlocked)
}

/// Xbox timestamps are RFC 3339.
fn parse_xbox_datetime(value: &str) -> Option<NaiveDateTime> {
    chrono::DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.naive_utc())
}

// Request/Response structures

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    #[serde(default)]
    profile_users: Vec<ProfileUser>,
}

#[derive(Debug, Deserialize)]
struct ProfileUser {
    #[serde(default)]
    settings: Vec<ProfileSetting>,
}

#[derive(Debug, Deserialize)]
struct ProfileSetting {
    id: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct TitleHistoryResponse {
    #[serde(default)]
    titles: Vec<TitleEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TitleEntry {
    title_id: String,
    name: String,
    #[serde(rename = "type")]
    title_type: Option<String>,
    display_image: Option<String>,
    achievement: Option<TitleAchievementSummary>,
    title_history: Option<TitleHistoryDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TitleAchievementSummary {
    #[serde(default)]
    current_achievements: u32,
    #[serde(default)]
    total_achievements: u32,
    #[serde(default)]
    current_gamerscore: u32,
    #[serde(default)]
    total_gamerscore: u32,
    #[serde(default)]
    progress_percentage: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TitleHistoryDetail {
    last_time_played: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TitleAchievementsResponse {
    #[serde(default)]
    achievements: Vec<AchievementEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AchievementEntry {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    progress_state: Option<String>,
    progression: Option<AchievementProgression>,
    #[serde(default)]
    rewards: Vec<AchievementReward>,
    rarity: Option<AchievementRarity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AchievementProgression {
    time_unlocked: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AchievementReward {
    #[serde(rename = "type")]
    reward_type: Option<String>,
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AchievementRarity {
    current_percentage: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_from_progress_percentage() {
        // 9 unlocked at 18% -> 50 total.
        assert_eq!(estimate_total_achievements(0, 9, 18.0, 1000), 50);
    }

    #[test]
    fn test_estimate_completed_title() {
        assert_eq!(estimate_total_achievements(0, 12, 100.0, 240), 12);
    }

    #[test]
    fn test_estimate_from_gamerscore() {
        // Nothing unlocked yet, fall back to 20 points per achievement.
        assert_eq!(estimate_total_achievements(0, 0, 0.0, 300), 15);
    }

    #[test]
    fn test_estimate_trusts_reported_total() {
        assert_eq!(estimate_total_achievements(42, 5, 11.9, 1000), 42);
    }

    #[test]
    fn test_estimate_never_below_unlocked() {
        assert_eq!(estimate_total_achievements(3, 5, 100.0, 100), 5);
        assert_eq!(estimate_total_achievements(0, 5, 0.0, 20), 5);
    }

    #[test]
    fn test_parse_xbox_datetime() {
        let dt = parse_xbox_datetime("2024-01-15T20:05:00.000Z").unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2024-01-15");
        assert!(parse_xbox_datetime("").is_none());
    }
}
