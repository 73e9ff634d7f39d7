// Local file-based storage
// One JSON document for the profile, one per conversation id, plus a
// deprecated single-conversation file that is migrated on first touch.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, warn};

use crate::models::{Conversation, ConversationHistory, ConversationMetadata, UserProfile};

const DATA_DIR_NAME: &str = ".ludens";
const PROFILE_FILE: &str = "profile.json";
const LEGACY_CONVERSATION_FILE: &str = "conversation.json";
const CONVERSATIONS_DIR: &str = "conversations";

/// File-based storage for the user profile and conversations.
pub struct Storage {
    data_dir: PathBuf,
    profile_path: PathBuf,
    legacy_conversation_path: PathBuf,
    conversations_dir: PathBuf,
}

impl Storage {
    /// Open (and create if needed) the data directory. Defaults to
    /// `~/.ludens` when no override is given.
    pub fn new(data_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = match data_dir {
            Some(dir) => dir,
            None => dirs::home_dir()
                .context("could not determine home directory")?
                .join(DATA_DIR_NAME),
        };

        let conversations_dir = data_dir.join(CONVERSATIONS_DIR);
        fs::create_dir_all(&conversations_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        Ok(Self {
            profile_path: data_dir.join(PROFILE_FILE),
            legacy_conversation_path: data_dir.join(LEGACY_CONVERSATION_FILE),
            conversations_dir,
            data_dir,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Load the user profile, or an empty default one.
    ///
    /// A missing or unreadable file never surfaces as an error: if the
    /// stored schema has changed the user's recourse is simply to re-sync.
    pub fn load_profile(&self) -> UserProfile {
        match read_json(&self.profile_path) {
            Some(profile) => profile,
            None => UserProfile::default(),
        }
    }

    /// Persist the profile, refreshing its `updated_at` timestamp.
    pub fn save_profile(&self, profile: &mut UserProfile) -> Result<()> {
        profile.updated_at = Utc::now().naive_utc();
        write_json(&self.profile_path, profile)
    }

    // =========================================================================
    // Conversations
    // =========================================================================

    /// List all conversations, newest first. Corrupt files are skipped.
    pub fn list_conversations(&self) -> Vec<ConversationMetadata> {
        let mut conversations: Vec<ConversationMetadata> = Vec::new();

        let entries = match fs::read_dir(&self.conversations_dir) {
            Ok(entries) => entries,
            Err(_) => return conversations,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let Some(conv) = read_json::<Conversation>(&path) else {
                warn!("Skipping unreadable conversation file {}", path.display());
                continue;
            };
            conversations.push(ConversationMetadata {
                id: conv.id,
                title: conv.title,
                created_at: conv.created_at,
                updated_at: conv.updated_at,
                message_count: conv.messages.len(),
            });
        }

        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        conversations
    }

    pub fn get_conversation(&self, conv_id: &str) -> Option<Conversation> {
        read_json(&self.conversation_path(conv_id))
    }

    /// Persist a conversation, refreshing its `updated_at` timestamp.
    pub fn save_conversation(&self, conversation: &mut Conversation) -> Result<()> {
        conversation.updated_at = Utc::now().naive_utc();
        write_json(&self.conversation_path(&conversation.id), conversation)
    }

    pub fn create_conversation(&self, title: &str) -> Result<Conversation> {
        let mut conversation = Conversation::new(title);
        self.save_conversation(&mut conversation)?;
        Ok(conversation)
    }

    /// Delete a conversation. Returns true if a file was removed.
    pub fn delete_conversation(&self, conv_id: &str) -> bool {
        fs::remove_file(self.conversation_path(conv_id)).is_ok()
    }

    /// Rename a conversation, returning the updated record if it exists.
    pub fn rename_conversation(&self, conv_id: &str, new_title: &str) -> Result<Option<Conversation>> {
        let Some(mut conversation) = self.get_conversation(conv_id) else {
            return Ok(None);
        };
        conversation.title = new_title.to_string();
        self.save_conversation(&mut conversation)?;
        Ok(Some(conversation))
    }

    /// One-time migration of the deprecated single-conversation file into a
    /// conversation titled "Imported Conversation". Idempotent: does nothing
    /// when the legacy file is absent, empty or unreadable.
    pub fn migrate_legacy_conversation(&self) -> Option<Conversation> {
        if !self.legacy_conversation_path.exists() {
            return None;
        }

        let legacy: ConversationHistory = read_json(&self.legacy_conversation_path)?;
        if legacy.messages.is_empty() {
            return None;
        }

        let mut conversation = Conversation::new("Imported Conversation");
        conversation.messages = legacy.messages;
        if self.save_conversation(&mut conversation).is_err() {
            return None;
        }

        // Only remove the legacy file once the import is safely on disk.
        if let Err(e) = fs::remove_file(&self.legacy_conversation_path) {
            warn!("Failed to remove legacy conversation file: {e}");
        }
        debug!(
            "Migrated legacy conversation with {} messages",
            conversation.messages.len()
        );
        Some(conversation)
    }

    /// Delete the profile and every conversation, legacy file included.
    pub fn clear_all(&self) -> Result<()> {
        remove_if_exists(&self.profile_path)?;
        remove_if_exists(&self.legacy_conversation_path)?;
        if let Ok(entries) = fs::read_dir(&self.conversations_dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "json") {
                    remove_if_exists(&path)?;
                }
            }
        }
        Ok(())
    }

    fn conversation_path(&self, conv_id: &str) -> PathBuf {
        self.conversations_dir.join(format!("{conv_id}.json"))
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let content = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("Failed to parse {}: {e}", path.display());
            None
        }
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)
        .with_context(|| format!("failed to serialize {}", path.display()))?;
    fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

fn remove_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("failed to remove {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Game, Platform, PlayStationProgressStats, PriceInfo, ProgressStats, Role,
        SteamProgressStats, TrophyCounts, WishlistItem, XboxProgressStats,
    };
    use tempfile::tempdir;

    fn storage() -> (tempfile::TempDir, Storage) {
        let dir = tempdir().unwrap();
        let storage = Storage::new(Some(dir.path().join("data"))).unwrap();
        (dir, storage)
    }

    fn sample_profile() -> UserProfile {
        let mut profile = UserProfile::default();
        profile.steam_id = Some("76561198000000000".to_string());

        let mut steam = Game::new(Platform::Steam, 440, "Team Fortress 2");
        steam.playtime_minutes = 1200;
        steam.progress = Some(ProgressStats::Steam(SteamProgressStats {
            total: 520,
            unlocked: 260,
            achievements: vec![],
        }));
        profile.games.push(steam);

        let mut psn = Game::new(Platform::Playstation, "NPWR08964_00", "Bloodborne");
        psn.progress = Some(ProgressStats::Playstation(PlayStationProgressStats {
            total: 40,
            unlocked: 34,
            defined: TrophyCounts { bronze: 26, silver: 9, gold: 4, platinum: 1 },
            earned: TrophyCounts { bronze: 24, silver: 7, gold: 3, platinum: 0 },
            trophies: vec![],
        }));
        profile.games.push(psn);

        let mut xbox = Game::new(Platform::Xbox, "1144039928", "Halo Infinite");
        xbox.progress = Some(ProgressStats::Xbox(XboxProgressStats {
            total: 119,
            unlocked: 37,
            total_gamerscore: 1600,
            unlocked_gamerscore: 450,
            achievements: vec![],
        }));
        profile.games.push(xbox);

        let mut on_sale = WishlistItem::new(1091500, "Cyberpunk 2077");
        on_sale.price = Some(PriceInfo {
            currency: "USD".to_string(),
            initial_price: 59.99,
            final_price: 29.99,
            discount_percent: 50,
            formatted: Some("$29.99".to_string()),
        });
        profile.wishlist.push(on_sale);

        let mut full_price = WishlistItem::new(1245620, "Elden Ring");
        full_price.price = Some(PriceInfo {
            currency: "USD".to_string(),
            initial_price: 59.99,
            final_price: 59.99,
            discount_percent: 0,
            formatted: Some("$59.99".to_string()),
        });
        profile.wishlist.push(full_price);

        profile
    }

    #[test]
    fn test_load_profile_defaults_when_missing() {
        let (_dir, storage) = storage();
        let profile = storage.load_profile();
        assert!(profile.games.is_empty());
        assert!(profile.steam_id.is_none());
    }

    #[test]
    fn test_load_profile_defaults_on_corrupt_file() {
        let (_dir, storage) = storage();
        fs::write(&storage.profile_path, "{not json").unwrap();
        let profile = storage.load_profile();
        assert!(profile.games.is_empty());
    }

    #[test]
    fn test_profile_round_trip() {
        let (_dir, storage) = storage();
        let mut profile = sample_profile();
        storage.save_profile(&mut profile).unwrap();

        let loaded = storage.load_profile();
        assert_eq!(loaded, profile);
        // Nested union variants survive the trip.
        assert_eq!(loaded.games[1].progress, profile.games[1].progress);
        assert!(loaded.wishlist[0].is_on_sale());
        assert!(!loaded.wishlist[1].is_on_sale());
    }

    #[test]
    fn test_save_profile_refreshes_updated_at() {
        let (_dir, storage) = storage();
        let mut profile = sample_profile();
        let before = profile.updated_at;
        storage.save_profile(&mut profile).unwrap();
        assert!(profile.updated_at >= before);
    }

    #[test]
    fn test_conversation_crud_and_listing() {
        let (_dir, storage) = storage();
        let mut first = storage.create_conversation("First").unwrap();
        first.add_message(Role::User, "hello");
        storage.save_conversation(&mut first).unwrap();
        let second = storage.create_conversation("Second").unwrap();

        let listed = storage.list_conversations();
        assert_eq!(listed.len(), 2);
        // Newest first.
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].message_count, 1);

        let renamed = storage.rename_conversation(&first.id, "Renamed").unwrap().unwrap();
        assert_eq!(renamed.title, "Renamed");
        assert_eq!(storage.get_conversation(&first.id).unwrap().title, "Renamed");

        assert!(storage.delete_conversation(&second.id));
        assert!(!storage.delete_conversation(&second.id));
        assert_eq!(storage.list_conversations().len(), 1);
    }

    #[test]
    fn test_listing_skips_corrupt_files() {
        let (_dir, storage) = storage();
        storage.create_conversation("Good").unwrap();
        fs::write(storage.conversations_dir.join("bad.json"), "{oops").unwrap();
        assert_eq!(storage.list_conversations().len(), 1);
    }

    #[test]
    fn test_legacy_migration() {
        let (_dir, storage) = storage();

        // Absent legacy file: no-op.
        assert!(storage.migrate_legacy_conversation().is_none());

        let mut legacy = ConversationHistory::default();
        legacy.add_message(Role::User, "old message");
        legacy.add_message(Role::Assistant, "old reply");
        write_json(&storage.legacy_conversation_path, &legacy).unwrap();

        let migrated = storage.migrate_legacy_conversation().unwrap();
        assert_eq!(migrated.title, "Imported Conversation");
        assert_eq!(migrated.messages.len(), 2);
        assert!(!storage.legacy_conversation_path.exists());
        assert!(storage.get_conversation(&migrated.id).is_some());

        // Second call is a no-op.
        assert!(storage.migrate_legacy_conversation().is_none());
    }

    #[test]
    fn test_clear_all() {
        let (_dir, storage) = storage();
        let mut profile = sample_profile();
        storage.save_profile(&mut profile).unwrap();
        storage.create_conversation("One").unwrap();

        storage.clear_all().unwrap();
        assert!(storage.load_profile().games.is_empty());
        assert!(storage.list_conversations().is_empty());
    }
}
