// Ludens - a personal AI game companion
// Syncs Steam, PlayStation and Xbox libraries into a local profile and chats
// about what to play next.

mod api;
mod commands;
mod features;
mod models;
mod storage;
mod utils;

use std::env;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::features::library::SyncOptions;
use crate::models::Platform;
use crate::utils::config::{Config, DEFAULT_ACHIEVEMENT_MIN_PLAYTIME};

#[derive(Parser)]
#[command(name = "ludens", version, about = "Personal AI game companion for your Steam, PlayStation and Xbox libraries")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sync game libraries from the configured platforms
    Sync {
        /// Sync only this platform (defaults to every configured one)
        #[arg(long, value_enum)]
        platform: Option<SyncPlatform>,
        /// Also fetch per-achievement and per-trophy detail
        #[arg(long, short)]
        achievements: bool,
        /// Minimum Steam playtime in minutes before achievements are fetched
        #[arg(long, default_value_t = DEFAULT_ACHIEVEMENT_MIN_PLAYTIME)]
        min_playtime: u32,
    },
    /// Chat with the recommender about your library
    Chat,
    /// Show connection and library status
    Status,
    /// Delete all local data
    Clear {
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SyncPlatform {
    Steam,
    Playstation,
    Xbox,
}

impl From<SyncPlatform> for Platform {
    fn from(value: SyncPlatform) -> Self {
        match value {
            SyncPlatform::Steam => Platform::Steam,
            SyncPlatform::Playstation => Platform::Playstation,
            SyncPlatform::Xbox => Platform::Xbox,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| "ludens=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Sync { platform, achievements, min_playtime } => {
            let options = SyncOptions {
                achievements,
                min_playtime,
                display_language: config.display_language.clone(),
            };
            commands::sync::run(&config, platform.map(Into::into), options).await
        }
        Command::Chat => commands::chat::run(&config).await,
        Command::Status => commands::status::run(&config),
        Command::Clear { yes } => commands::clear::run(&config, yes),
    };

    if let Err(e) = result {
        error!("{e:#}");
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
