// Wishlist models

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Price information for a store listing. Monetary values are in major
/// currency units, already divided from cents by the store client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceInfo {
    pub currency: String,
    pub initial_price: f64,
    pub final_price: f64,
    #[serde(default)]
    pub discount_percent: u32,
    /// Preformatted display string from the store, e.g. "$3.99".
    #[serde(default)]
    pub formatted: Option<String>,
}

/// A game on the user's wishlist. Steam-only; the whole list is replaced on
/// every Steam sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WishlistItem {
    /// Platform-qualified identifier, e.g. `steam_440`.
    pub id: String,
    pub app_id: u64,
    pub name: String,
    #[serde(default)]
    pub added_on: Option<NaiveDateTime>,
    /// 0 = default; lower values rank higher.
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub release_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub header_image_url: Option<String>,
    #[serde(default)]
    pub price: Option<PriceInfo>,
}

impl WishlistItem {
    pub fn new(app_id: u64, name: impl Into<String>) -> Self {
        Self {
            id: format!("steam_{app_id}"),
            app_id,
            name: name.into(),
            added_on: None,
            priority: 0,
            genres: Vec::new(),
            tags: Vec::new(),
            release_date: None,
            description: None,
            header_image_url: None,
            price: None,
        }
    }

    pub fn is_on_sale(&self) -> bool {
        self.price.as_ref().is_some_and(|p| p.discount_percent > 0)
    }
}
