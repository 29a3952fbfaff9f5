//! Listing error types.

use thiserror::Error;

use super::models::{ItemId, ItemStatus};
use crate::db::StoreError;

/// Listing errors
#[derive(Debug, Error)]
pub enum ListingError {
    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Listing details failed validation
    #[error("Invalid listing: {0}")]
    InvalidListing(String),

    /// Item not found
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    /// Only the seller may change a listing
    #[error("Only the seller can change this listing")]
    NotSeller,

    /// Item is not in a status that allows the change
    #[error("Invalid item state: expected {expected}, found {found}")]
    InvalidState { expected: ItemStatus, found: ItemStatus },
}

impl ListingError {
    /// Get a client-safe error message that doesn't leak sensitive information
    pub fn client_message(&self) -> String {
        match self {
            ListingError::Store(_) => "Something went wrong, please try again".to_string(),
            ListingError::ItemNotFound(_) => "Item not found".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for listing operations
pub type ListingResult<T> = Result<T, ListingError>;
