// Library sync orchestration.
// Each platform syncs independently; a platform's games are replaced
// wholesale in the profile, never merged entry by entry, so removals on the
// platform side propagate. The profile is saved once by the caller.

use anyhow::Result;
use tracing::{info, warn};

use crate::api::psn::PsnClient;
use crate::api::steam::SteamClient;
use crate::api::xbox::XboxClient;
use crate::models::{Game, Platform, UserProfile, WishlistItem};
use crate::utils::config::Config;

/// Options controlling a sync run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Fetch per-achievement detail, not just aggregate counts.
    pub achievements: bool,
    /// Skip achievement detail for games below this playtime (Steam only,
    /// where playtime is known).
    pub min_playtime: u32,
    /// Language for localized names, `en` or `schinese`.
    pub display_language: String,
}

/// Per-platform result of a sync run.
#[derive(Debug)]
pub struct SyncOutcome {
    pub platform: Platform,
    pub games: usize,
    pub with_progress: usize,
    pub wishlist: usize,
    pub on_sale: usize,
    /// Set when the wishlist fetch failed and the stored wishlist was kept.
    pub wishlist_error: Option<String>,
}

/// Aggregate result of a sync run across one or more platforms.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub outcomes: Vec<SyncOutcome>,
    pub errors: Vec<(Platform, String)>,
}

impl SyncReport {
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        for outcome in &self.outcomes {
            let mut line = format!(
                "{}: {} games ({} with {})",
                outcome.platform,
                outcome.games,
                outcome.with_progress,
                outcome.platform.progress_noun()
            );
            if outcome.platform == Platform::Steam && outcome.wishlist > 0 {
                line.push_str(&format!(
                    ", {} wishlist items ({} on sale)",
                    outcome.wishlist, outcome.on_sale
                ));
            }
            if let Some(error) = &outcome.wishlist_error {
                line.push_str(&format!(", wishlist fetch failed ({error}), kept existing"));
            }
            lines.push(line);
        }
        for (platform, error) in &self.errors {
            lines.push(format!("{platform}: sync failed: {error}"));
        }
        lines.join("\n")
    }

    pub fn all_failed(&self) -> bool {
        self.outcomes.is_empty() && !self.errors.is_empty()
    }
}

/// Replace all games of one platform with a freshly fetched list.
pub fn merge_platform_games(profile: &mut UserProfile, platform: Platform, games: Vec<Game>) {
    profile.games.retain(|g| g.platform != platform);
    profile.games.extend(games);
}

/// The wishlist is Steam-only and replaced wholesale when a fetch succeeded.
/// `None` means the fetch failed; the stored wishlist is kept untouched.
pub fn replace_wishlist(profile: &mut UserProfile, items: Option<Vec<WishlistItem>>) {
    if let Some(items) = items {
        profile.wishlist = items;
    }
}

/// Sync the Steam library and wishlist into the profile.
pub async fn sync_steam(
    http: &reqwest::Client,
    config: &Config,
    profile: &mut UserProfile,
    options: &SyncOptions,
) -> Result<SyncOutcome> {
    let client = SteamClient::new(http.clone(), config)?;
    let fetch_localized = options.display_language == "schinese";

    let mut games = client.get_owned_games().await?;
    info!("fetched {} Steam games", games.len());

    for game in &mut games {
        if game.playtime_minutes >= options.min_playtime {
            // Store details (genres, description) feed the recommender.
            client.enrich_game(game).await;
            if options.achievements {
                client.enrich_game_with_achievements(game, fetch_localized).await;
            }
        }
        if fetch_localized {
            client.enrich_game_with_localized_names(game).await;
        }
    }
    let with_progress = games.iter().filter(|g| g.has_progress()).count();

    let (wishlist, wishlist_error) = match client.get_wishlist().await {
        Ok(mut items) => {
            for item in &mut items {
                client.enrich_wishlist_item(item, "us").await;
            }
            (Some(items), None)
        }
        Err(e) => {
            warn!("wishlist fetch failed, keeping stored wishlist: {e}");
            (None, Some(e.to_string()))
        }
    };
    let (count, on_sale) = match &wishlist {
        Some(items) => (items.len(), items.iter().filter(|w| w.is_on_sale()).count()),
        None => (0, 0),
    };

    let outcome = SyncOutcome {
        platform: Platform::Steam,
        games: games.len(),
        with_progress,
        wishlist: count,
        on_sale,
        wishlist_error,
    };

    merge_platform_games(profile, Platform::Steam, games);
    replace_wishlist(profile, wishlist);
    profile.steam_id = Some(client.steam_id().to_string());

    Ok(outcome)
}

/// Sync PlayStation trophy titles into the profile.
pub async fn sync_psn(
    config: &Config,
    profile: &mut UserProfile,
    options: &SyncOptions,
) -> Result<SyncOutcome> {
    let client = PsnClient::new(config).await?;

    let mut games = client.get_owned_games().await?;
    info!("fetched {} PlayStation titles", games.len());

    if options.achievements {
        for game in &mut games {
            client.enrich_game_with_trophies(game).await;
        }
    }
    let with_progress = games.iter().filter(|g| g.has_progress()).count();

    let outcome = SyncOutcome {
        platform: Platform::Playstation,
        games: games.len(),
        with_progress,
        wishlist: 0,
        on_sale: 0,
        wishlist_error: None,
    };

    merge_platform_games(profile, Platform::Playstation, games);
    profile.psn_online_id = Some(client.online_id().to_string());

    Ok(outcome)
}

/// Sync the Xbox title history into the profile.
pub async fn sync_xbox(
    http: &reqwest::Client,
    config: &Config,
    profile: &mut UserProfile,
    options: &SyncOptions,
) -> Result<SyncOutcome> {
    let client = XboxClient::new(http.clone(), config).await?;

    let mut games = client.get_owned_games().await?;
    info!("fetched {} Xbox titles", games.len());

    if options.achievements {
        for game in &mut games {
            client.enrich_game_with_achievements(game).await;
        }
    }
    let with_progress = games.iter().filter(|g| g.has_progress()).count();

    let outcome = SyncOutcome {
        platform: Platform::Xbox,
        games: games.len(),
        with_progress,
        wishlist: 0,
        on_sale: 0,
        wishlist_error: None,
    };

    merge_platform_games(profile, Platform::Xbox, games);
    profile.xbox_gamertag = Some(client.gamertag().to_string());

    Ok(outcome)
}

/// Sync every configured platform, isolating failures so one platform's
/// outage never blocks the others.
pub async fn sync_all(
    http: &reqwest::Client,
    config: &Config,
    profile: &mut UserProfile,
    options: &SyncOptions,
) -> SyncReport {
    let mut report = SyncReport::default();

    if config.steam_configured() {
        match sync_steam(http, config, profile, options).await {
            Ok(outcome) => report.outcomes.push(outcome),
            Err(e) => report.errors.push((Platform::Steam, e.to_string())),
        }
    }
    if config.psn_configured() {
        match sync_psn(config, profile, options).await {
            Ok(outcome) => report.outcomes.push(outcome),
            Err(e) => report.errors.push((Platform::Playstation, e.to_string())),
        }
    }
    if config.xbox_configured() {
        match sync_xbox(http, config, profile, options).await {
            Ok(outcome) => report.outcomes.push(outcome),
            Err(e) => report.errors.push((Platform::Xbox, e.to_string())),
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(platform: Platform, native_id: &str) -> Game {
        Game::new(platform, native_id, format!("Game {native_id}"))
    }

    #[test]
    fn test_merge_replaces_platform_wholesale() {
        let mut profile = UserProfile::default();
        profile.games.push(game(Platform::Steam, "440"));
        profile.games.push(game(Platform::Steam, "620"));
        profile.games.push(game(Platform::Playstation, "NPWR00001_00"));

        // 620 disappeared from the fetched list, 730 is new.
        merge_platform_games(
            &mut profile,
            Platform::Steam,
            vec![game(Platform::Steam, "440"), game(Platform::Steam, "730")],
        );

        let steam_ids: Vec<&str> = profile
            .games_on(Platform::Steam)
            .map(|g| g.id.as_str())
            .collect();
        assert_eq!(steam_ids, vec!["steam_440", "steam_730"]);
        assert_eq!(profile.platform_count(Platform::Playstation), 1);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut profile = UserProfile::default();
        let fetched = vec![game(Platform::Xbox, "123"), game(Platform::Xbox, "456")];

        merge_platform_games(&mut profile, Platform::Xbox, fetched.clone());
        let once = profile.games.clone();
        merge_platform_games(&mut profile, Platform::Xbox, fetched);
        assert_eq!(profile.games, once);
    }

    #[test]
    fn test_report_summary_includes_failures() {
        let report = SyncReport {
            outcomes: vec![SyncOutcome {
                platform: Platform::Steam,
                games: 12,
                with_progress: 4,
                wishlist: 3,
                on_sale: 1,
                wishlist_error: None,
            }],
            errors: vec![(Platform::Playstation, "NPSSO expired".to_string())],
        };
        let summary = report.summary();
        assert!(summary.contains("Steam: 12 games (4 with achievements), 3 wishlist items (1 on sale)"));
        assert!(summary.contains("PlayStation: sync failed: NPSSO expired"));
        assert!(!report.all_failed());
    }

    #[test]
    fn test_failed_wishlist_fetch_keeps_stored_wishlist() {
        let mut profile = UserProfile::default();
        profile.wishlist.push(WishlistItem::new(1091500, "Cyberpunk 2077"));

        replace_wishlist(&mut profile, None);
        assert_eq!(profile.wishlist.len(), 1);
        assert_eq!(profile.wishlist[0].name, "Cyberpunk 2077");

        // A successful fetch still replaces wholesale, including to empty.
        replace_wishlist(&mut profile, Some(vec![WishlistItem::new(1245620, "Elden Ring")]));
        assert_eq!(profile.wishlist[0].name, "Elden Ring");
        replace_wishlist(&mut profile, Some(Vec::new()));
        assert!(profile.wishlist.is_empty());
    }

    #[test]
    fn test_report_summary_notes_kept_wishlist() {
        let report = SyncReport {
            outcomes: vec![SyncOutcome {
                platform: Platform::Steam,
                games: 5,
                with_progress: 2,
                wishlist: 0,
                on_sale: 0,
                wishlist_error: Some("GetWishlist returned 500".to_string()),
            }],
            errors: vec![],
        };
        assert!(report
            .summary()
            .contains("wishlist fetch failed (GetWishlist returned 500), kept existing"));
    }
}
