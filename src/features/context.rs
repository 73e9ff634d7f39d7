// Library digest for the recommender.
// Renders the profile into a compact plain-text summary sent as a system
// message, so the model only ever sees real library data.

use crate::models::{Game, Platform, ProgressStats, RarityTier, UserProfile};
use crate::utils::formatters::format_playtime;

const TOP_PLAYED_LIMIT: usize = 10;
const RECENT_LIMIT: usize = 5;
const NEAR_COMPLETION_LIMIT: usize = 5;
const RARE_UNLOCK_LIMIT: usize = 5;
const BACKLOG_LIMIT: usize = 10;
const SALE_LIMIT: usize = 10;
const WISHLIST_LIMIT: usize = 5;

/// Build the system context describing the user's library, preferences and
/// wishlist. Sections appear in a fixed order so responses stay stable
/// across syncs.
pub fn build_context_prompt(profile: &UserProfile) -> String {
    if profile.games.is_empty() && profile.wishlist.is_empty() {
        return "The user hasn't synced their game library yet.".to_string();
    }

    let mut out = String::new();

    out.push_str(&format!(
        "The user's library has {} games",
        profile.games.len()
    ));
    let mut parts = vec![format!("{} on Steam", profile.platform_count(Platform::Steam))];
    let psn = profile.platform_count(Platform::Playstation);
    if psn > 0 {
        parts.push(format!("{psn} on PlayStation"));
    }
    let xbox = profile.platform_count(Platform::Xbox);
    if xbox > 0 {
        parts.push(format!("{xbox} on Xbox"));
    }
    out.push_str(&format!(" ({}).\n\n", parts.join(", ")));

    // Most played
    out.push_str("Most played games:\n");
    let mut by_playtime: Vec<&Game> =
        profile.games.iter().filter(|g| g.playtime_minutes > 0).collect();
    by_playtime.sort_by(|a, b| b.playtime_minutes.cmp(&a.playtime_minutes));
    if by_playtime.is_empty() {
        out.push_str("  No playtime data available\n");
    } else {
        for game in by_playtime.iter().take(TOP_PLAYED_LIMIT) {
            out.push_str(&format!("{}\n", game_line(game)));
        }
    }

    // Recently played
    out.push_str("\nRecently played:\n");
    let mut recent: Vec<&Game> =
        profile.games.iter().filter(|g| g.last_played.is_some()).collect();
    recent.sort_by(|a, b| b.last_played.cmp(&a.last_played));
    if recent.is_empty() {
        out.push_str("  No recent play data available\n");
    } else {
        for game in recent.iter().take(RECENT_LIMIT) {
            out.push_str(&format!("{}\n", game_line(game)));
        }
    }

    // Near completion
    out.push_str("\nClose to completion:\n");
    let mut near: Vec<&Game> = profile
        .games
        .iter()
        .filter(|g| g.has_progress() && g.completion_percent().unwrap_or(0.0) >= 50.0)
        .collect();
    near.sort_by(|a, b| {
        b.completion_percent()
            .partial_cmp(&a.completion_percent())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    if near.is_empty() {
        out.push_str("  No achievement data available\n");
    } else {
        for game in near.iter().take(NEAR_COMPLETION_LIMIT) {
            out.push_str(&format!("{}\n", game_line(game)));
        }
    }

    // Rare unlocks worth celebrating
    let rare = rare_unlocks(profile);
    if !rare.is_empty() {
        out.push_str("\nRarest unlocks:\n");
        for line in rare.iter().take(RARE_UNLOCK_LIMIT) {
            out.push_str(&format!("  {line}\n"));
        }
    }

    // Backlog. Zero playtime alone decides membership: PlayStation and Xbox
    // never report playtime, so a last-played date must not exclude a game.
    out.push_str("\nUnplayed backlog:\n");
    let backlog: Vec<&Game> = profile
        .games
        .iter()
        .filter(|g| g.playtime_minutes == 0)
        .collect();
    if backlog.is_empty() {
        out.push_str("  All games have been played!\n");
    } else {
        for game in backlog.iter().take(BACKLOG_LIMIT) {
            out.push_str(&format!("  {} {}\n", platform_icon(game.platform), game.name));
        }
    }

    // Preferences
    out.push_str("\nPreferences:\n");
    let prefs = &profile.preferences;
    if prefs.favorite_genres.is_empty() && prefs.favorite_tags.is_empty() && prefs.notes.is_empty()
    {
        out.push_str("  No preference data yet.\n");
    } else {
        if !prefs.favorite_genres.is_empty() {
            out.push_str(&format!(
                "  Favorite genres: {}\n",
                prefs.favorite_genres.join(", ")
            ));
        }
        if !prefs.favorite_tags.is_empty() {
            out.push_str(&format!("  Favorite tags: {}\n", prefs.favorite_tags.join(", ")));
        }
        if !prefs.notes.is_empty() {
            out.push_str(&format!("  Notes: {}\n", prefs.notes));
        }
    }

    // Wishlist, sales first
    if !profile.wishlist.is_empty() {
        let on_sale: Vec<_> = profile.wishlist.iter().filter(|w| w.is_on_sale()).collect();
        if !on_sale.is_empty() {
            out.push_str("\nWishlist games currently on sale:\n");
            for item in on_sale.iter().take(SALE_LIMIT) {
                let price = item.price.as_ref();
                let formatted = price
                    .and_then(|p| p.formatted.clone())
                    .or_else(|| price.map(|p| format!("${:.2}", p.final_price)))
                    .unwrap_or_default();
                let discount = price.map(|p| p.discount_percent).unwrap_or(0);
                let mut line = format!("- {}: {} (-{}%)", item.name, formatted, discount);
                if !item.genres.is_empty() {
                    line.push_str(&format!(" - {}", item.genres.join(", ")));
                }
                out.push_str(&format!("{line}\n"));
            }
        }

        let rest: Vec<_> = profile.wishlist.iter().filter(|w| !w.is_on_sale()).collect();
        if !rest.is_empty() {
            out.push_str("\nOther wishlist games:\n");
            for item in rest.iter().take(WISHLIST_LIMIT) {
                out.push_str(&format!("- {}\n", item.name));
            }
        }
    }

    out
}

/// Unlocked achievements and trophies of Rare tier or better across the
/// library, rarest first.
fn rare_unlocks(profile: &UserProfile) -> Vec<String> {
    let mut found: Vec<(f64, String)> = Vec::new();

    for game in &profile.games {
        match &game.progress {
            Some(ProgressStats::Steam(stats)) => {
                for ach in stats.achievements.iter().filter(|a| a.achieved) {
                    if ach.rarity() >= Some(RarityTier::Rare) {
                        let percent = ach.global_percent.unwrap_or(0.0);
                        found.push((
                            percent,
                            format!(
                                "\"{}\" in {} ({percent}% of players)",
                                ach.display_name("en"),
                                game.name
                            ),
                        ));
                    }
                }
            }
            Some(ProgressStats::Playstation(stats)) => {
                for trophy in stats.trophies.iter().filter(|t| t.achieved) {
                    if trophy.rarity >= Some(RarityTier::Rare) {
                        let percent = trophy.rarity_percent.unwrap_or(0.0);
                        let name = trophy.name.as_deref().unwrap_or("Hidden trophy");
                        found.push((
                            percent,
                            format!("\"{name}\" in {} ({percent}% of players)", game.name),
                        ));
                    }
                }
            }
            Some(ProgressStats::Xbox(stats)) => {
                for ach in stats.achievements.iter().filter(|a| a.achieved) {
                    if ach.rarity >= Some(RarityTier::Rare) {
                        let percent = ach.rarity_percent.unwrap_or(0.0);
                        let name = ach.name.as_deref().unwrap_or("Hidden achievement");
                        found.push((
                            percent,
                            format!("\"{name}\" in {} ({percent}% of players)", game.name),
                        ));
                    }
                }
            }
            None => {}
        }
    }

    found.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    found.into_iter().map(|(_, line)| line).collect()
}

fn platform_icon(platform: Platform) -> &'static str {
    match platform {
        Platform::Steam => "🖥️",
        Platform::Playstation => "🎮",
        Platform::Xbox => "🟢",
        Platform::Nintendo | Platform::PcOther => "🕹️",
    }
}

/// One summary line for a game: icon, name, playtime, progress.
fn game_line(game: &Game) -> String {
    let mut line = format!("  {} {}", platform_icon(game.platform), game.name);
    if game.playtime_minutes > 0 {
        line.push_str(&format!(" - {}", format_playtime(u64::from(game.playtime_minutes))));
    }
    if let Some(progress) = &game.progress {
        if progress.total() > 0 {
            line.push_str(&format!(
                " ({}/{} {}, {}% complete)",
                progress.unlocked(),
                progress.total(),
                game.platform.progress_noun(),
                progress.completion_percent()
            ));
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Game, SteamAchievement, SteamProgressStats, WishlistItem};

    #[test]
    fn test_empty_profile_placeholder() {
        let profile = UserProfile::default();
        assert_eq!(
            build_context_prompt(&profile),
            "The user hasn't synced their game library yet."
        );
    }

    #[test]
    fn test_played_game_without_progress() {
        let mut profile = UserProfile::default();
        let mut game = Game::new(Platform::Steam, 440, "Team Fortress 2");
        game.playtime_minutes = 150;
        profile.games.push(game);

        let prompt = build_context_prompt(&profile);
        assert!(prompt.contains("1 games (1 on Steam)"));
        assert!(prompt.contains("Team Fortress 2 - 2h 30m"));
        assert!(prompt.contains("No achievement data available"));
        assert!(prompt.contains("All games have been played!"));
        assert!(prompt.contains("No preference data yet."));
    }

    #[test]
    fn test_progress_and_sales_sections() {
        let mut profile = UserProfile::default();

        let mut game = Game::new(Platform::Playstation, "NPWR08964_00", "Bloodborne");
        game.last_played = chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(20, 0, 0));
        game.progress = Some(ProgressStats::Playstation(Default::default()));
        profile.games.push(game);

        let mut steam = Game::new(Platform::Steam, 620, "Portal 2");
        steam.playtime_minutes = 900;
        steam.progress = Some(ProgressStats::Steam(SteamProgressStats {
            total: 50,
            unlocked: 40,
            achievements: vec![],
        }));
        profile.games.push(steam);

        let mut item = WishlistItem::new(1091500, "Cyberpunk 2077");
        item.price = Some(crate::models::PriceInfo {
            currency: "USD".to_string(),
            initial_price: 59.99,
            final_price: 29.99,
            discount_percent: 50,
            formatted: Some("$29.99".to_string()),
        });
        profile.wishlist.push(item);
        profile.wishlist.push(WishlistItem::new(1245620, "Elden Ring"));

        let prompt = build_context_prompt(&profile);
        assert!(prompt.contains("Portal 2 - 15h (40/50 achievements, 80% complete)"));
        assert!(prompt.contains("Recently played:\n  🎮 Bloodborne"));
        assert!(prompt.contains("Close to completion:\n  🖥️ Portal 2"));
        assert!(prompt.contains("- Cyberpunk 2077: $29.99 (-50%)"));
        assert!(prompt.contains("Other wishlist games:\n- Elden Ring"));
    }

    fn achievement(api_name: &str, name: &str, achieved: bool, percent: f64) -> SteamAchievement {
        let mut ach = SteamAchievement {
            api_name: api_name.to_string(),
            localized_names: Default::default(),
            localized_descriptions: Default::default(),
            icon_url: None,
            icon_gray_url: None,
            achieved,
            unlock_time: None,
            global_percent: Some(percent),
        };
        ach.localized_names.insert("en".to_string(), name.to_string());
        ach
    }

    #[test]
    fn test_backlog_keyed_on_playtime_only() {
        let mut profile = UserProfile::default();
        let mut game = Game::new(Platform::Playstation, "NPWR08964_00", "Bloodborne");
        // Console games report no playtime even when recently played.
        game.last_played = chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(20, 0, 0));
        profile.games.push(game);

        let prompt = build_context_prompt(&profile);
        assert!(prompt.contains("Unplayed backlog:\n  🎮 Bloodborne"));
        assert!(!prompt.contains("All games have been played!"));
    }

    #[test]
    fn test_rare_unlocks_ordering_and_filtering() {
        let mut profile = UserProfile::default();
        let mut game = Game::new(Platform::Steam, 620, "Portal 2");
        game.progress = Some(ProgressStats::Steam(SteamProgressStats {
            total: 4,
            unlocked: 3,
            achievements: vec![
                // Common and locked achievements never appear.
                achievement("ACH_EASY", "Wake Up Call", true, 85.0),
                achievement("ACH_LOCKED", "Still Alive", false, 0.5),
                achievement("ACH_RARE", "Professor Portal", true, 8.3),
                achievement("ACH_ULTRA", "Talent Show", true, 1.2),
            ],
        }));
        profile.games.push(game);

        let lines = rare_unlocks(&profile);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Talent Show"));
        assert!(lines[1].contains("Professor Portal"));

        let prompt = build_context_prompt(&profile);
        assert!(prompt.contains("Rarest unlocks:\n  \"Talent Show\" in Portal 2 (1.2% of players)"));
    }
}
