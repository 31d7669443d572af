//! Garment domain models
//!
//! `GarmentRecord` is what the vision model produces; `NewClothingRecord` is
//! the payload forwarded to the downstream wardrobe storage API.

use serde::{Deserialize, Serialize};

/// Season applied when the model does not report one.
pub const DEFAULT_SEASON: &str = "all";

/// One detected clothing item, as described by the vision model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GarmentRecord {
    /// Garment type, e.g. "t-shirt", "jeans", "jacket", "shoes".
    #[serde(rename = "type")]
    pub garment_type: String,
    /// Dominant color.
    pub color: String,
    /// Approximate style: casual, streetwear, chic, sport, ...
    pub style: String,
    /// Detected brand, or "unknown".
    #[serde(default = "default_brand")]
    pub brand: String,
    /// Similar brand suggestions.
    #[serde(default)]
    pub suggested_brands: Vec<String>,
    /// Season the garment suits; absent means all seasons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
}

fn default_brand() -> String {
    "unknown".to_string()
}

impl GarmentRecord {
    /// Season to persist, defaulting to [DEFAULT_SEASON] when absent or blank.
    pub fn season_or_default(&self) -> &str {
        match self.season.as_deref() {
            Some(s) if !s.trim().is_empty() => s,
            _ => DEFAULT_SEASON,
        }
    }
}

/// An image stored in the external host: public URL plus the identifier
/// needed to delete it once a cleaned version supersedes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedImageRef {
    pub url: String,
    pub remote_id: String,
}

/// Create-record payload for the downstream wardrobe storage API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewClothingRecord {
    pub user_id: String,
    #[serde(rename = "type")]
    pub garment_type: String,
    pub color: String,
    pub style: String,
    pub brand: String,
    /// Suggested brands, joined into a single delimited field.
    pub suggested_brands: String,
    pub image_url: String,
    pub season: String,
}

impl NewClothingRecord {
    pub fn from_garment(user_id: &str, garment: &GarmentRecord, image_url: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            garment_type: garment.garment_type.clone(),
            color: garment.color.clone(),
            style: garment.style.clone(),
            brand: garment.brand.clone(),
            suggested_brands: garment.suggested_brands.join(","),
            image_url: image_url.to_string(),
            season: garment.season_or_default().to_string(),
        }
    }
}

/// A garment that could not be persisted downstream. Reported alongside the
/// successes; never fails the batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistenceFailure {
    #[serde(rename = "type")]
    pub garment_type: String,
    pub error: String,
}
