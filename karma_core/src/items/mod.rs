//! Item listings priced by the valuation engine.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{ListingError, ListingResult};
pub use manager::{DEFAULT_BROWSE_LIMIT, ListingManager, MAX_BROWSE_LIMIT, MAX_TITLE_LEN};
pub use models::{Item, ItemFilter, ItemId, ItemStatus, NewItem, NewListing};
