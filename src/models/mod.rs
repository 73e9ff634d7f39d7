// Data model module
pub mod conversation;
pub mod game;
pub mod profile;
pub mod progress;
pub mod wishlist;

pub use conversation::{Conversation, ConversationHistory, ConversationMessage, ConversationMetadata, Role};
pub use game::{Game, Platform};
pub use profile::{PlaySession, UserPreferences, UserProfile};
pub use progress::{
    percent_to_rarity_tier, PlayStationProgressStats, PlayStationTrophy, ProgressStats, RarityTier,
    SteamAchievement, SteamProgressStats, TrophyCounts, TrophyTier, XboxAchievement,
    XboxProgressStats,
};
pub use wishlist::{PriceInfo, WishlistItem};
