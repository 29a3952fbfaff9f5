//! Listing manager: prices and stores items offered for trade.

use std::sync::Arc;

use super::errors::{ListingError, ListingResult};
use super::models::{Item, ItemFilter, ItemId, ItemStatus, NewItem, NewListing};
use crate::db::KarmaStore;
use crate::valuation::{ValuationBreakdown, ValuationEngine, ValuationInput};
use crate::wallet::AccountId;

/// Longest accepted item title, in characters
pub const MAX_TITLE_LEN: usize = 200;

/// Market page size when the caller does not ask for one
pub const DEFAULT_BROWSE_LIMIT: i64 = 20;

/// Largest market page
pub const MAX_BROWSE_LIMIT: i64 = 50;

/// Listing manager
#[derive(Clone)]
pub struct ListingManager {
    store: Arc<dyn KarmaStore>,
    engine: ValuationEngine,
}

impl ListingManager {
    pub fn new(store: Arc<dyn KarmaStore>, engine: ValuationEngine) -> Self {
        Self { store, engine }
    }

    /// Price an item without listing it
    pub async fn preview(&self, input: &ValuationInput) -> ListingResult<ValuationBreakdown> {
        validate_category(&input.category)?;
        let mut tx = self.store.begin().await?;
        let activity = tx.category_activity(&input.category).await?;
        Ok(self.engine.value(input, &activity))
    }

    /// List an item for trade
    ///
    /// The karma value is always computed here; a client-supplied price is
    /// never trusted. It stays fixed for the life of the listing.
    pub async fn list_item(&self, seller: AccountId, listing: NewListing) -> ListingResult<Item> {
        let listing = normalize(listing)?;

        let mut tx = self.store.begin().await?;
        let activity = tx.category_activity(&listing.category).await?;
        let valuation = self.engine.value(&listing.valuation_input(), &activity);
        let item = tx
            .insert_item(NewItem {
                seller_id: seller,
                listing,
                valuation,
            })
            .await?;
        tx.commit().await?;

        log::info!(
            "Listed item {} by {} in {} for {} karma",
            item.id,
            seller,
            item.category,
            item.karma_value
        );
        Ok(item)
    }

    /// Items on offer, newest first
    ///
    /// Blank filter fields are ignored and `limit` is clamped to
    /// `1..=MAX_BROWSE_LIMIT`.
    pub async fn browse(&self, filter: ItemFilter, limit: Option<i64>) -> ListingResult<Vec<Item>> {
        let filter = ItemFilter {
            category: non_blank(filter.category).map(|c| c.to_lowercase()),
            condition: filter.condition,
            search: non_blank(filter.search),
        };
        let limit = limit
            .unwrap_or(DEFAULT_BROWSE_LIMIT)
            .clamp(1, MAX_BROWSE_LIMIT);

        let mut tx = self.store.begin().await?;
        let items = tx.list_available_items(&filter, limit).await?;
        log::debug!("Market browse {:?} returned {} item(s)", filter, items.len());
        Ok(items)
    }

    /// Get an item by ID
    pub async fn get_item(&self, item_id: ItemId) -> ListingResult<Item> {
        let mut tx = self.store.begin().await?;
        tx.find_item(item_id)
            .await?
            .ok_or(ListingError::ItemNotFound(item_id))
    }

    /// Withdraw an available listing
    pub async fn remove_item(&self, actor: AccountId, item_id: ItemId) -> ListingResult<Item> {
        let mut tx = self.store.begin().await?;
        let mut item = tx
            .find_item(item_id)
            .await?
            .ok_or(ListingError::ItemNotFound(item_id))?;
        if item.seller_id != actor {
            return Err(ListingError::NotSeller);
        }
        if !tx
            .set_item_status(item_id, ItemStatus::Available, ItemStatus::Removed)
            .await?
        {
            return Err(ListingError::InvalidState {
                expected: ItemStatus::Available,
                found: item.status,
            });
        }
        tx.commit().await?;

        log::info!("Removed item {} by {}", item_id, actor);
        item.status = ItemStatus::Removed;
        Ok(item)
    }
}

fn validate_category(category: &str) -> ListingResult<()> {
    if category.trim().is_empty() {
        return Err(ListingError::InvalidListing("category is required".to_string()));
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn normalize(mut listing: NewListing) -> ListingResult<NewListing> {
    listing.title = listing.title.trim().to_string();
    if listing.title.is_empty() {
        return Err(ListingError::InvalidListing("title is required".to_string()));
    }
    if listing.title.chars().count() > MAX_TITLE_LEN {
        return Err(ListingError::InvalidListing(format!(
            "title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    validate_category(&listing.category)?;
    listing.category = listing.category.trim().to_lowercase();
    listing.brand = non_blank(listing.brand);
    Ok(listing)
}
