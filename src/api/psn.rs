// PlayStation Network client
// Authenticates with an NPSSO cookie through Sony's mobile OAuth flow, then
// talks to the trophy service for title lists and per-title trophies.

use chrono::NaiveDateTime;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{
    Game, PlayStationProgressStats, PlayStationTrophy, Platform, ProgressStats, RarityTier,
    TrophyCounts, TrophyTier, percent_to_rarity_tier,
};
use crate::utils::config::Config;

const AUTH_BASE: &str = "https://ca.account.sony.com/api";
const TROPHY_API_BASE: &str = "https://m.np.playstation.com/api/trophy/v1";
const PROFILE_API_BASE: &str = "https://m.np.playstation.com/api/userProfile/v1";

const CLIENT_ID: &str = "09515159-7237-4370-9b40-3806e67c0891";
const REDIRECT_URI: &str = "com.scee.psxandroid.scecompcall://redirect";
// Basic auth for the token endpoint, client_id:client_secret.
const TOKEN_AUTH: &str = "MDk1MTUxNTktNzIzNy00MzcwLTliNDAtMzgwNmU2N2MwODkxOnVjUGprYTV0bnRCMktxc1A=";

#[derive(Debug, Error)]
pub enum PsnApiError {
    #[error(
        "PSN NPSSO token not configured. Set PSN_NPSSO_TOKEN in your .env \
         (sign in at playstation.com, then visit \
         https://ca.account.sony.com/api/v1/ssocookie to read the token)"
    )]
    MissingToken,
    #[error(
        "PSN authentication failed: {0}. NPSSO tokens expire after about two \
         months; fetch a fresh one from https://ca.account.sony.com/api/v1/ssocookie"
    )]
    Auth(String),
    #[error("PSN API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("PSN API error: {0}")]
    Api(String),
}

/// Client for the PlayStation Network trophy service.
pub struct PsnClient {
    http: reqwest::Client,
    access_token: String,
    online_id: String,
}

impl PsnClient {
    /// Exchange the NPSSO cookie for an access token and resolve the signed-in
    /// user's profile.
    pub async fn new(config: &Config) -> Result<Self, PsnApiError> {
        let npsso = config.psn_npsso_token.as_deref().ok_or(PsnApiError::MissingToken)?;

        // The authorize endpoint answers with a redirect carrying the
        // authorization code; we must not follow it.
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        let code = Self::fetch_authorization_code(&http, npsso).await?;
        let access_token = Self::exchange_code(&http, &code).await?;

        let me: ProfileResponse = http
            .get(format!("{PROFILE_API_BASE}/internal/users/me/profiles"))
            .bearer_auth(&access_token)
            .send()
            .await?
            .json()
            .await
            .map_err(|e| PsnApiError::Auth(e.to_string()))?;

        debug!("authenticated to PSN as {}", me.online_id);

        Ok(Self {
            http,
            access_token,
            online_id: me.online_id,
        })
    }

    pub fn online_id(&self) -> &str {
        &self.online_id
    }

    async fn fetch_authorization_code(
        http: &reqwest::Client,
        npsso: &str,
    ) -> Result<String, PsnApiError> {
        let response = http
            .get(format!("{AUTH_BASE}/authz/v3/oauth/authorize"))
            .query(&[
                ("access_type", "offline"),
                ("client_id", CLIENT_ID),
                ("redirect_uri", REDIRECT_URI),
                ("response_type", "code"),
                ("scope", "psn:mobile.v2.core psn:clientapp"),
            ])
            .header("Cookie", format!("npsso={npsso}"))
            .send()
            .await?;

        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| PsnApiError::Auth("no redirect from authorize endpoint".to_string()))?;

        // Redirect looks like com.scee...://redirect/?code=v3.XXXX&...
        location
            .split("code=")
            .nth(1)
            .map(|rest| rest.split('&').next().unwrap_or(rest).to_string())
            .filter(|code| !code.is_empty())
            .ok_or_else(|| {
                PsnApiError::Auth("authorize redirect carried no code; NPSSO likely expired".to_string())
            })
    }

    async fn exchange_code(http: &reqwest::Client, code: &str) -> Result<String, PsnApiError> {
        let response = http
            .post(format!("{AUTH_BASE}/authz/v3/oauth/token"))
            .header("Authorization", format!("Basic {TOKEN_AUTH}"))
            .form(&[
                ("code", code),
                ("redirect_uri", REDIRECT_URI),
                ("grant_type", "authorization_code"),
                ("token_format", "jwt"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PsnApiError::Auth(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }

        let body: TokenResponse = response.json().await?;
        Ok(body.access_token)
    }

    /// Fetch all trophy titles as games with aggregate trophy counts.
    /// Per-trophy detail is attached separately by [`enrich_game_with_trophies`].
    pub async fn get_owned_games(&self) -> Result<Vec<Game>, PsnApiError> {
        let response = self
            .http
            .get(format!("{TROPHY_API_BASE}/users/me/trophyTitles"))
            .query(&[("limit", "800")])
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(PsnApiError::Auth("access token rejected".to_string()));
        }
        if !response.status().is_success() {
            return Err(PsnApiError::Api(format!(
                "trophyTitles returned {}",
                response.status()
            )));
        }

        let body: TrophyTitlesResponse = response.json().await?;
        let games = body
            .trophy_titles
            .into_iter()
            .map(|title| {
                let mut game =
                    Game::new(Platform::Playstation, &title.np_communication_id, title.trophy_title_name);
                game.header_image_url = title.trophy_title_icon_url;
                game.last_played = title
                    .last_updated_date_time
                    .as_deref()
                    .and_then(parse_psn_datetime);

                let defined = title.defined_trophies.into_counts();
                let earned = title.earned_trophies.into_counts();
                game.progress = Some(ProgressStats::Playstation(PlayStationProgressStats {
                    total: defined.total(),
                    unlocked: earned.total(),
                    defined,
                    earned,
                    trophies: Vec::new(),
                }));
                game
            })
            .collect();

        Ok(games)
    }

    /// Attach the per-trophy list for a title in place. Failure leaves the
    /// aggregate counts from the title list untouched.
    pub async fn enrich_game_with_trophies(&self, game: &mut Game) {
        let Some(np_communication_id) = game.id.strip_prefix("psn_") else {
            return;
        };

        let trophies = match self.fetch_title_trophies(np_communication_id).await {
            Ok(t) => t,
            Err(e) => {
                warn!("trophy detail fetch failed for {np_communication_id}: {e}");
                return;
            }
        };

        if let Some(ProgressStats::Playstation(stats)) = &mut game.progress {
            stats.trophies = trophies;
        }
    }

    /// Trophy definitions joined with the user's earned state by trophy id.
    async fn fetch_title_trophies(
        &self,
        np_communication_id: &str,
    ) -> Result<Vec<PlayStationTrophy>, PsnApiError> {
        let definitions: TitleTrophiesResponse = self
            .http
            .get(format!(
                "{TROPHY_API_BASE}/npCommunicationIds/{np_communication_id}/trophyGroups/all/trophies"
            ))
            .bearer_auth(&self.access_token)
            .send()
            .await?
            .json()
            .await?;

        let earned: TitleTrophiesResponse = self
            .http
            .get(format!(
                "{TROPHY_API_BASE}/users/me/npCommunicationIds/{np_communication_id}/trophyGroups/all/trophies"
            ))
            .bearer_auth(&self.access_token)
            .send()
            .await?
            .json()
            .await?;

        let earned_by_id: std::collections::HashMap<u32, &TrophyEntry> =
            earned.trophies.iter().map(|t| (t.trophy_id, t)).collect();

        let trophies = definitions
            .trophies
            .into_iter()
            .map(|def| {
                let user = earned_by_id.get(&def.trophy_id);
                let rarity_percent = user
                    .and_then(|u| u.trophy_earned_rate.as_deref())
                    .and_then(|r| r.parse::<f64>().ok());

                PlayStationTrophy {
                    trophy_id: def.trophy_id.to_string(),
                    name: def.trophy_name,
                    description: def.trophy_detail,
                    tier: trophy_tier(&def.trophy_type),
                    achieved: user.map(|u| u.earned.unwrap_or(false)).unwrap_or(false),
                    unlock_time: user
                        .and_then(|u| u.earned_date_time.as_deref())
                        .and_then(parse_psn_datetime),
                    rarity_percent,
                    rarity: user
                        .and_then(|u| u.trophy_rare)
                        .and_then(native_rarity)
                        .or_else(|| percent_to_rarity_tier(rarity_percent)),
                }
            })
            .collect();

        Ok(trophies)
    }
}

fn trophy_tier(trophy_type: &str) -> TrophyTier {
    match trophy_type {
        "platinum" => TrophyTier::Platinum,
        "gold" => TrophyTier::Gold,
        "silver" => TrophyTier::Silver,
        _ => TrophyTier::Bronze,
    }
}

/// Sony's own rarity buckets (3 = common .. 0 = ultra rare). These take
/// precedence over the percentage thresholds when present.
fn native_rarity(trophy_rare: u8) -> Option<RarityTier> {
    match trophy_rare {
        3 => Some(RarityTier::Common),
        2 => Some(RarityTier::Rare),
        1 => Some(RarityTier::VeryRare),
        0 => Some(RarityTier::UltraRare),
        _ => None,
    }
}

/// PSN timestamps are RFC 3339 with a zone suffix.
fn parse_psn_datetime(value: &str) -> Option<NaiveDateTime> {
    chrono::DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.naive_utc())
}

// Request/Response structures

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    online_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrophyTitlesResponse {
    #[serde(default)]
    trophy_titles: Vec<TrophyTitleEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrophyTitleEntry {
    np_communication_id: String,
    trophy_title_name: String,
    trophy_title_icon_url: Option<String>,
    last_updated_date_time: Option<String>,
    #[serde(default)]
    defined_trophies: RawTrophyCounts,
    #[serde(default)]
    earned_trophies: RawTrophyCounts,
}

#[derive(Debug, Default, Deserialize)]
struct RawTrophyCounts {
    #[serde(default)]
    bronze: u32,
    #[serde(default)]
    silver: u32,
    #[serde(default)]
    gold: u32,
    #[serde(default)]
    platinum: u32,
}

impl RawTrophyCounts {
    fn into_counts(self) -> TrophyCounts {
        TrophyCounts {
            bronze: self.bronze,
            silver: self.silver,
            gold: self.gold,
            platinum: self.platinum,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TitleTrophiesResponse {
    #[serde(default)]
    trophies: Vec<TrophyEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrophyEntry {
    trophy_id: u32,
    #[serde(default)]
    trophy_type: String,
    trophy_name: Option<String>,
    trophy_detail: Option<String>,
    earned: Option<bool>,
    earned_date_time: Option<String>,
    trophy_earned_rate: Option<String>,
    trophy_rare: Option<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trophy_tier_mapping() {
        assert_eq!(trophy_tier("platinum"), TrophyTier::Platinum);
        assert_eq!(trophy_tier("gold"), TrophyTier::Gold);
        assert_eq!(trophy_tier("silver"), TrophyTier::Silver);
        assert_eq!(trophy_tier("bronze"), TrophyTier::Bronze);
        assert_eq!(trophy_tier("unknown"), TrophyTier::Bronze);
    }

    #[test]
    fn test_native_rarity_precedence() {
        assert_eq!(native_rarity(3), Some(RarityTier::Common));
        assert_eq!(native_rarity(2), Some(RarityTier::Rare));
        assert_eq!(native_rarity(1), Some(RarityTier::VeryRare));
        assert_eq!(native_rarity(0), Some(RarityTier::UltraRare));
        assert_eq!(native_rarity(4), None);
    }

    #[test]
    fn test_parse_psn_datetime() {
        let dt = parse_psn_datetime("2023-06-01T14:30:00Z").unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M").to_string(), "2023-06-01 14:30");
        assert!(parse_psn_datetime("not a date").is_none());
    }
}
