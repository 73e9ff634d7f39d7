// `sync` command: pull libraries from the configured platforms and persist
// the merged profile.

use anyhow::{bail, Result};

use crate::features::library::{self, SyncOptions, SyncReport};
use crate::models::Platform;
use crate::storage::Storage;
use crate::utils::config::Config;
use crate::utils::formatters::format_playtime;

pub async fn run(
    config: &Config,
    platform: Option<Platform>,
    options: SyncOptions,
) -> Result<()> {
    if !config.any_platform_configured() {
        bail!(
            "no platform is configured. Set STEAM_API_KEY and STEAM_ID, \
             PSN_NPSSO_TOKEN, or OPENXBL_API_KEY in your .env"
        );
    }

    let http = reqwest::Client::builder().user_agent("ludens/0.1").build()?;
    let storage = Storage::new(config.data_dir.clone())?;
    let mut profile = storage.load_profile();

    println!("Syncing game libraries...");

    let report = match platform {
        Some(Platform::Steam) => {
            let outcome = library::sync_steam(&http, config, &mut profile, &options).await?;
            SyncReport { outcomes: vec![outcome], errors: vec![] }
        }
        Some(Platform::Playstation) => {
            let outcome = library::sync_psn(config, &mut profile, &options).await?;
            SyncReport { outcomes: vec![outcome], errors: vec![] }
        }
        Some(Platform::Xbox) => {
            let outcome = library::sync_xbox(&http, config, &mut profile, &options).await?;
            SyncReport { outcomes: vec![outcome], errors: vec![] }
        }
        Some(other) => bail!("{other} sync is not supported"),
        None => library::sync_all(&http, config, &mut profile, &options).await,
    };

    if report.all_failed() {
        bail!("every platform sync failed:\n{}", report.summary());
    }

    storage.save_profile(&mut profile)?;

    println!("\n{}", report.summary());
    println!(
        "\nLibrary: {} games, {} total playtime",
        profile.games.len(),
        format_playtime(profile.total_playtime_minutes())
    );

    let mut top: Vec<_> = profile.games.iter().filter(|g| g.playtime_minutes > 0).collect();
    top.sort_by(|a, b| b.playtime_minutes.cmp(&a.playtime_minutes));
    if !top.is_empty() {
        println!("\nMost played:");
        for game in top.iter().take(5) {
            println!(
                "  {} - {}",
                game.display_name(&config.display_language),
                format_playtime(u64::from(game.playtime_minutes))
            );
        }
    }

    Ok(())
}
