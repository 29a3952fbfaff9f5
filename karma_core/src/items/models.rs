//! Listing data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::db::ParseEnumError;
use crate::valuation::{Condition, ValuationBreakdown, ValuationInput};
use crate::wallet::AccountId;

/// Item ID type
pub type ItemId = Uuid;

/// Listed item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub seller_id: AccountId,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub condition: Condition,
    pub brand: Option<String>,
    /// Fixed at listing time
    pub karma_value: i64,
    pub valuation_breakdown: ValuationBreakdown,
    pub images: Vec<String>,
    pub status: ItemStatus,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Item lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Available,
    Pending,
    Sold,
    Removed,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Available => "available",
            ItemStatus::Pending => "pending",
            ItemStatus::Sold => "sold",
            ItemStatus::Removed => "removed",
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(ItemStatus::Available),
            "pending" => Ok(ItemStatus::Pending),
            "sold" => Ok(ItemStatus::Sold),
            "removed" => Ok(ItemStatus::Removed),
            other => Err(ParseEnumError::new("item status", other)),
        }
    }
}

/// Seller-supplied listing details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewListing {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: String,
    pub condition: Condition,
    #[serde(default)]
    pub brand: Option<String>,
    /// Blob store URLs, in display order
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl NewListing {
    pub fn valuation_input(&self) -> ValuationInput {
        ValuationInput {
            condition: self.condition,
            category: self.category.clone(),
            brand: self.brand.clone(),
            images: self.images.clone(),
        }
    }
}

/// Market browse filter; every field is optional
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemFilter {
    /// Lower-cased category to match exactly
    pub category: Option<String>,
    pub condition: Option<Condition>,
    /// Case-insensitive text to find in the title or description
    pub search: Option<String>,
}

impl ItemFilter {
    /// Whether an item satisfies the filter, ignoring its status
    pub fn matches(&self, item: &Item) -> bool {
        if let Some(category) = &self.category {
            if item.category.to_lowercase() != *category {
                return false;
            }
        }
        if let Some(condition) = self.condition {
            if item.condition != condition {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let in_title = item.title.to_lowercase().contains(&needle);
            let in_description = item
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle));
            if !in_title && !in_description {
                return false;
            }
        }
        true
    }
}

/// Item row to insert, priced and ready to store
#[derive(Debug, Clone)]
pub struct NewItem {
    pub seller_id: AccountId,
    pub listing: NewListing,
    pub valuation: ValuationBreakdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_status_parse() {
        assert_eq!("pending".parse::<ItemStatus>().unwrap(), ItemStatus::Pending);
        assert!("lost".parse::<ItemStatus>().is_err());
    }

    #[test]
    fn test_listing_deserializes_with_defaults() {
        let listing: NewListing = serde_json::from_str(
            r#"{"title":"Camera","category":"electronics","condition":"like_new"}"#,
        )
        .unwrap();
        assert_eq!(listing.condition, Condition::LikeNew);
        assert!(listing.images.is_empty());
        assert!(listing.brand.is_none());
    }
}
