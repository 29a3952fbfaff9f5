//! Valuation engine converting item attributes into a karma point price.
//!
//! The price is `max(FLOOR_VALUE, round(baseline * condition * brand + demand))`
//! where the demand term comes from an injected [`DemandSignal`]. With a
//! [`FixedDemand`] the result is fully deterministic.
//!
//! ## Example
//!
//! ```
//! use karma_core::valuation::{valuate, Condition, ValuationInput};
//!
//! let input = ValuationInput {
//!     condition: Condition::New,
//!     category: "electronics".to_string(),
//!     brand: Some("apple".to_string()),
//!     images: vec![],
//! };
//! assert_eq!(valuate(&input, 0).total, 750);
//! ```

pub mod demand;
pub mod engine;
pub mod models;
pub mod tables;

pub use demand::{CategoryActivity, DemandSignal, FixedDemand, MarketDemand, RandomDemand};
pub use engine::{valuate, ValuationEngine};
pub use models::{Condition, ValuationBreakdown, ValuationInput};
pub use tables::{FLOOR_VALUE, MAX_DEMAND_ADJUSTMENT};
