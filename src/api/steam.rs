// Steam Web API client
// Covers the player service (owned/recently played games), user stats
// (achievements, schema, global unlock percentages), the wishlist service
// and the unauthenticated store API used for details and prices.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::models::{
    Game, Platform, PriceInfo, SteamAchievement, SteamProgressStats, WishlistItem,
};
use crate::utils::config::Config;

const STEAM_API_BASE: &str = "https://api.steampowered.com";
const STEAM_STORE_API: &str = "https://store.steampowered.com/api";

/// Languages fetched for localized names and achievement schemas.
const SUPPORTED_LANGUAGES: [&str; 2] = ["english", "schinese"];

#[derive(Debug, Error)]
pub enum SteamApiError {
    #[error(
        "Steam API key not configured. Set STEAM_API_KEY in your .env \
         (get a key at https://steamcommunity.com/dev/apikey)"
    )]
    MissingApiKey,
    #[error(
        "Steam ID not configured. Set STEAM_ID in your .env \
         (find your steamID64 at https://steamid.io)"
    )]
    MissingSteamId,
    #[error("Steam API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Steam API error: {0}")]
    Api(String),
}

/// Client for the Steam Web API.
pub struct SteamClient {
    http: reqwest::Client,
    api_key: String,
    steam_id: String,
}

impl SteamClient {
    /// Build a client from configuration, failing fast when a credential is
    /// missing.
    pub fn new(http: reqwest::Client, config: &Config) -> Result<Self, SteamApiError> {
        let api_key = config.steam_api_key.clone().ok_or(SteamApiError::MissingApiKey)?;
        let steam_id = config.steam_id.clone().ok_or(SteamApiError::MissingSteamId)?;
        Ok(Self { http, api_key, steam_id })
    }

    pub fn steam_id(&self) -> &str {
        &self.steam_id
    }

    /// Fetch all games owned by the user with playtime info.
    pub async fn get_owned_games(&self) -> Result<Vec<Game>, SteamApiError> {
        let url = format!("{STEAM_API_BASE}/IPlayerService/GetOwnedGames/v1/");
        let response = self
            .http
            .get(&url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("steamid", self.steam_id.as_str()),
                ("include_appinfo", "1"),
                ("include_played_free_games", "1"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SteamApiError::Api(format!(
                "GetOwnedGames returned {}",
                response.status()
            )));
        }

        let body: OwnedGamesResponse = response.json().await?;
        let games = body
            .response
            .games
            .into_iter()
            .map(|g| {
                let name = g.name.unwrap_or_else(|| format!("Unknown ({})", g.appid));
                let mut game = Game::new(Platform::Steam, g.appid, name);
                game.playtime_minutes = g.playtime_forever.unwrap_or(0);
                game.last_played = unix_to_naive(g.rtime_last_played);
                game.header_image_url = Some(format!(
                    "https://steamcdn-a.akamaihd.net/steam/apps/{}/header.jpg",
                    g.appid
                ));
                game
            })
            .collect();

        Ok(games)
    }

    /// Fetch the player's achievements for a game as unified progress stats.
    ///
    /// Returns None when the game has no achievements or any lookup fails;
    /// a single game's failure must never abort a library sync.
    pub async fn get_player_achievements(
        &self,
        app_id: u64,
        fetch_localized: bool,
    ) -> Option<SteamProgressStats> {
        let url = format!("{STEAM_API_BASE}/ISteamUserStats/GetPlayerAchievements/v1/");
        let response = self
            .http
            .get(&url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("steamid", self.steam_id.as_str()),
                ("appid", &app_id.to_string()),
            ])
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            debug!("GetPlayerAchievements for {app_id} returned {}", response.status());
            return None;
        }

        let body: PlayerAchievementsResponse = response.json().await.ok()?;
        let stats = body.playerstats;
        if !stats.success.unwrap_or(false) {
            return None;
        }
        let raw = stats.achievements?;
        if raw.is_empty() {
            return None;
        }

        // Schema gives display names/descriptions/icons per language; the
        // global stats give unlock percentages keyed by api name.
        let schema_en = self.get_achievement_schema(app_id, "english").await;
        let schema_zh = if fetch_localized {
            self.get_achievement_schema(app_id, "schinese").await
        } else {
            HashMap::new()
        };
        let global_stats = self.get_global_achievement_stats(app_id).await;

        let mut achievements = Vec::with_capacity(raw.len());
        let mut unlocked = 0u32;

        for ach in raw {
            let achieved = ach.achieved == 1;
            if achieved {
                unlocked += 1;
            }

            let mut localized_names = HashMap::new();
            let mut localized_descriptions = HashMap::new();
            let mut icon_url = None;
            let mut icon_gray_url = None;

            if let Some(entry) = schema_en.get(&ach.apiname) {
                if let Some(name) = &entry.display_name {
                    localized_names.insert("en".to_string(), name.clone());
                }
                if let Some(desc) = &entry.description {
                    localized_descriptions.insert("en".to_string(), desc.clone());
                }
                icon_url = entry.icon.clone();
                icon_gray_url = entry.icongray.clone();
            }
            if let Some(entry) = schema_zh.get(&ach.apiname) {
                if let Some(name) = &entry.display_name {
                    localized_names.insert("schinese".to_string(), name.clone());
                }
                if let Some(desc) = &entry.description {
                    localized_descriptions.insert("schinese".to_string(), desc.clone());
                }
            }

            achievements.push(SteamAchievement {
                api_name: ach.apiname.clone(),
                localized_names,
                localized_descriptions,
                icon_url,
                icon_gray_url,
                achieved,
                unlock_time: unix_to_naive(ach.unlocktime),
                global_percent: global_stats.get(&ach.apiname).copied(),
            });
        }

        Some(SteamProgressStats {
            total: achievements.len() as u32,
            unlocked,
            achievements,
        })
    }

    /// Fetch the achievement schema for one language, keyed by api name.
    /// Empty on any failure.
    async fn get_achievement_schema(
        &self,
        app_id: u64,
        language: &str,
    ) -> HashMap<String, SchemaAchievement> {
        let url = format!("{STEAM_API_BASE}/ISteamUserStats/GetSchemaForGame/v2/");
        let response = match self
            .http
            .get(&url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("appid", &app_id.to_string()),
                ("l", language),
            ])
            .send()
            .await
        {
            Ok(r) => r,
            Err(_) => return HashMap::new(),
        };

        let body: SchemaResponse = match response.json().await {
            Ok(b) => b,
            Err(_) => return HashMap::new(),
        };

        body.game
            .available_game_stats
            .achievements
            .into_iter()
            .map(|a| (a.name.clone(), a))
            .collect()
    }

    /// Global unlock percentages keyed by achievement api name. Empty on
    /// any failure.
    async fn get_global_achievement_stats(&self, app_id: u64) -> HashMap<String, f64> {
        let url =
            format!("{STEAM_API_BASE}/ISteamUserStats/GetGlobalAchievementPercentagesForApp/v2/");
        let response = match self
            .http
            .get(&url)
            .query(&[("gameid", app_id.to_string())])
            .send()
            .await
        {
            Ok(r) => r,
            Err(_) => return HashMap::new(),
        };

        let body: GlobalPercentagesResponse = match response.json().await {
            Ok(b) => b,
            Err(_) => return HashMap::new(),
        };

        body.achievementpercentages
            .achievements
            .into_iter()
            .filter_map(|a| {
                // The API reports percent either as a number or a string.
                let percent = match a.percent {
                    serde_json::Value::Number(n) => n.as_f64()?,
                    serde_json::Value::String(s) => s.parse().ok()?,
                    _ => return None,
                };
                Some((a.name, (percent * 100.0).round() / 100.0))
            })
            .collect()
    }

    /// Attach achievement progress to a Steam game in place.
    pub async fn enrich_game_with_achievements(&self, game: &mut Game, fetch_localized: bool) {
        let Some(app_id) = steam_app_id(&game.id) else {
            return;
        };
        if let Some(progress) = self.get_player_achievements(app_id, fetch_localized).await {
            game.progress = Some(crate::models::ProgressStats::Steam(progress));
        }
    }

    /// Fetch store details for an app in the given language.
    async fn get_game_details(&self, app_id: u64, language: &str) -> Option<StoreDetails> {
        let url = format!("{STEAM_STORE_API}/appdetails");
        let response = self
            .http
            .get(&url)
            .query(&[("appids", app_id.to_string().as_str()), ("l", language)])
            .send()
            .await
            .ok()?;

        let body: serde_json::Value = response.json().await.ok()?;
        let app = body.get(app_id.to_string().as_str())?;
        if !app.get("success").and_then(|v| v.as_bool()).unwrap_or(false) {
            return None;
        }
        serde_json::from_value(app.get("data")?.clone()).ok()
    }

    /// Enrich a Steam game with description, genres and release date from
    /// the store. Failures leave the game unchanged.
    pub async fn enrich_game(&self, game: &mut Game) {
        let Some(app_id) = steam_app_id(&game.id) else {
            return;
        };
        let Some(details) = self.get_game_details(app_id, "english").await else {
            return;
        };
        game.description = details.short_description;
        game.genres = details.genres.into_iter().map(|g| g.description).collect();
        if let Some(release) = details.release_date {
            if !release.coming_soon {
                game.release_date = release.date.as_deref().and_then(parse_store_date);
            }
        }
    }

    /// Add localized store names to a Steam game.
    pub async fn enrich_game_with_localized_names(&self, game: &mut Game) {
        let Some(app_id) = steam_app_id(&game.id) else {
            return;
        };
        for lang in SUPPORTED_LANGUAGES {
            if let Some(details) = self.get_game_details(app_id, lang).await {
                if let Some(name) = details.name {
                    let code = if lang == "english" { "en" } else { lang };
                    game.localized_names.insert(code.to_string(), name);
                }
            }
        }
    }

    /// Fetch the user's wishlist. Names and prices are enriched separately.
    pub async fn get_wishlist(&self) -> Result<Vec<WishlistItem>, SteamApiError> {
        let url = format!("{STEAM_API_BASE}/IWishlistService/GetWishlist/v1/");
        let response = self
            .http
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("steamid", self.steam_id.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SteamApiError::Api(format!(
                "GetWishlist returned {}",
                response.status()
            )));
        }

        let body: WishlistResponse = response.json().await?;
        let items = body
            .response
            .items
            .into_iter()
            .map(|entry| {
                let mut item = WishlistItem::new(entry.appid, format!("Unknown ({})", entry.appid));
                item.added_on = unix_to_naive(entry.date_added);
                item.priority = entry.priority.unwrap_or(0);
                item
            })
            .collect();

        Ok(items)
    }

    /// Current price for an app, None for unlisted/free games.
    pub async fn get_price_info(&self, app_id: u64, country_code: &str) -> Option<PriceInfo> {
        let url = format!("{STEAM_STORE_API}/appdetails");
        let response = self
            .http
            .get(&url)
            .query(&[
                ("appids", app_id.to_string().as_str()),
                ("cc", country_code),
                ("filters", "price_overview"),
            ])
            .send()
            .await
            .ok()?;

        let body: serde_json::Value = response.json().await.ok()?;
        let app = body.get(app_id.to_string().as_str())?;
        if !app.get("success").and_then(|v| v.as_bool()).unwrap_or(false) {
            return None;
        }
        let overview: PriceOverview =
            serde_json::from_value(app.get("data")?.get("price_overview")?.clone()).ok()?;

        Some(PriceInfo {
            currency: overview.currency.unwrap_or_else(|| "USD".to_string()),
            // The store reports prices in minor units.
            initial_price: overview.initial as f64 / 100.0,
            final_price: overview.final_ as f64 / 100.0,
            discount_percent: overview.discount_percent.unwrap_or(0),
            formatted: overview.final_formatted,
        })
    }

    /// Enrich a wishlist item with store details and price. Failures leave
    /// the item with partial data.
    pub async fn enrich_wishlist_item(&self, item: &mut WishlistItem, country_code: &str) {
        if let Some(details) = self.get_game_details(item.app_id, "english").await {
            if let Some(name) = details.name {
                item.name = name;
            }
            item.description = details.short_description;
            item.genres = details.genres.into_iter().map(|g| g.description).collect();
            item.header_image_url = details.header_image;
            if let Some(release) = details.release_date {
                if !release.coming_soon {
                    item.release_date = release.date.as_deref().and_then(parse_store_date);
                }
            }
        }
        item.price = self.get_price_info(item.app_id, country_code).await;
    }
}

/// Extract the numeric app id from a `steam_<appid>` game id.
fn steam_app_id(game_id: &str) -> Option<u64> {
    game_id.strip_prefix("steam_")?.parse().ok()
}

fn unix_to_naive(timestamp: Option<i64>) -> Option<NaiveDateTime> {
    let ts = timestamp.filter(|&t| t > 0)?;
    chrono::DateTime::from_timestamp(ts, 0).map(|dt| dt.naive_utc())
}

/// The store uses a handful of release date formats.
fn parse_store_date(date: &str) -> Option<NaiveDateTime> {
    for fmt in ["%b %d, %Y", "%d %b, %Y"] {
        if let Ok(parsed) = chrono::NaiveDate::parse_from_str(date, fmt) {
            return parsed.and_hms_opt(0, 0, 0);
        }
    }
    // Bare year, e.g. "2015".
    if let Ok(year) = date.parse::<i32>() {
        return chrono::NaiveDate::from_ymd_opt(year, 1, 1)?.and_hms_opt(0, 0, 0);
    }
    None
}

// Request/Response structures

#[derive(Debug, Deserialize)]
struct OwnedGamesResponse {
    #[serde(default)]
    response: OwnedGamesBody,
}

#[derive(Debug, Default, Deserialize)]
struct OwnedGamesBody {
    #[serde(default)]
    games: Vec<OwnedGameEntry>,
}

#[derive(Debug, Deserialize)]
struct OwnedGameEntry {
    appid: u64,
    name: Option<String>,
    playtime_forever: Option<u32>,
    rtime_last_played: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct PlayerAchievementsResponse {
    playerstats: PlayerStatsBody,
}

#[derive(Debug, Deserialize)]
struct PlayerStatsBody {
    success: Option<bool>,
    achievements: Option<Vec<RawPlayerAchievement>>,
}

#[derive(Debug, Deserialize)]
struct RawPlayerAchievement {
    apiname: String,
    achieved: u8,
    unlocktime: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SchemaResponse {
    #[serde(default)]
    game: SchemaGame,
}

#[derive(Debug, Default, Deserialize)]
struct SchemaGame {
    #[serde(rename = "availableGameStats", default)]
    available_game_stats: SchemaGameStats,
}

#[derive(Debug, Default, Deserialize)]
struct SchemaGameStats {
    #[serde(default)]
    achievements: Vec<SchemaAchievement>,
}

#[derive(Debug, Deserialize)]
struct SchemaAchievement {
    name: String,
    #[serde(rename = "displayName")]
    display_name: Option<String>,
    description: Option<String>,
    icon: Option<String>,
    icongray: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GlobalPercentagesResponse {
    #[serde(default)]
    achievementpercentages: GlobalPercentagesBody,
}

#[derive(Debug, Default, Deserialize)]
struct GlobalPercentagesBody {
    #[serde(default)]
    achievements: Vec<GlobalPercentEntry>,
}

#[derive(Debug, Deserialize)]
struct GlobalPercentEntry {
    name: String,
    percent: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct WishlistResponse {
    #[serde(default)]
    response: WishlistBody,
}

#[derive(Debug, Default, Deserialize)]
struct WishlistBody {
    #[serde(default)]
    items: Vec<WishlistEntry>,
}

#[derive(Debug, Deserialize)]
struct WishlistEntry {
    appid: u64,
    date_added: Option<i64>,
    priority: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct StoreDetails {
    name: Option<String>,
    short_description: Option<String>,
    #[serde(default)]
    genres: Vec<StoreGenre>,
    release_date: Option<StoreReleaseDate>,
    header_image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StoreGenre {
    description: String,
}

#[derive(Debug, Deserialize)]
struct StoreReleaseDate {
    #[serde(default)]
    coming_soon: bool,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PriceOverview {
    currency: Option<String>,
    #[serde(default)]
    initial: u64,
    #[serde(rename = "final", default)]
    final_: u64,
    discount_percent: Option<u32>,
    final_formatted: Option<String>,
}
