// `status` command: show what is connected and what has been synced.

use anyhow::Result;

use crate::models::Platform;
use crate::storage::Storage;
use crate::utils::config::Config;
use crate::utils::formatters::{format_number, format_playtime};

pub fn run(config: &Config) -> Result<()> {
    let storage = Storage::new(config.data_dir.clone())?;
    let profile = storage.load_profile();

    println!("Data directory: {}", storage.data_dir().display());

    println!("\nConnected platforms:");
    print_platform("Steam", config.steam_configured(), profile.steam_id.as_deref());
    print_platform(
        "PlayStation",
        config.psn_configured(),
        profile.psn_online_id.as_deref(),
    );
    print_platform("Xbox", config.xbox_configured(), profile.xbox_gamertag.as_deref());
    println!(
        "  Recommender: {}",
        if config.llm_configured() { "configured" } else { "not configured" }
    );

    if profile.games.is_empty() {
        println!("\nNo games synced yet. Run `ludens sync` first.");
        return Ok(());
    }

    println!("\nLibrary:");
    println!("  {} games total", format_number(profile.games.len() as i64));
    for platform in [Platform::Steam, Platform::Playstation, Platform::Xbox] {
        let count = profile.platform_count(platform);
        if count > 0 {
            println!("    {}: {count}", platform.label());
        }
    }
    println!(
        "  {} played, {} unplayed",
        profile.played_count(),
        profile.unplayed_count()
    );
    println!(
        "  Total playtime: {}",
        format_playtime(profile.total_playtime_minutes())
    );

    let (total, unlocked) = profile.progress_totals();
    if total > 0 {
        println!(
            "  Achievements and trophies: {} / {} unlocked",
            format_number(i64::from(unlocked)),
            format_number(i64::from(total))
        );
    }

    if !profile.wishlist.is_empty() {
        let on_sale = profile.wishlist.iter().filter(|w| w.is_on_sale()).count();
        println!("  Wishlist: {} items ({on_sale} on sale)", profile.wishlist.len());
    }

    let conversations = storage.list_conversations();
    if !conversations.is_empty() {
        println!("\nConversations: {}", conversations.len());
        for meta in conversations.iter().take(5) {
            println!("  {} ({} messages)", meta.title, meta.message_count);
        }
    }

    Ok(())
}

fn print_platform(label: &str, configured: bool, identity: Option<&str>) {
    match (configured, identity) {
        (true, Some(id)) => println!("  {label}: connected as {id}"),
        (true, None) => println!("  {label}: configured, not synced yet"),
        (false, _) => println!("  {label}: not configured"),
    }
}
