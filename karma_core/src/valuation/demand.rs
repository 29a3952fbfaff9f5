//! Supply/demand signals feeding the valuation's demand adjustment.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use super::tables::MAX_DEMAND_ADJUSTMENT;

/// Live market counts for one category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryActivity {
    /// Items currently listed as available
    pub available_listings: i64,
    /// Trades currently held in escrow
    pub open_requests: i64,
}

/// Source of the bounded demand perturbation applied to a valuation
pub trait DemandSignal: Send + Sync {
    /// Adjustment in points for an item in `category`
    ///
    /// Callers clamp the result to `±MAX_DEMAND_ADJUSTMENT`.
    fn adjustment(&self, category: &str, activity: &CategoryActivity) -> i64;
}

/// Constant adjustment, used for reproducible pricing
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedDemand(pub i64);

impl DemandSignal for FixedDemand {
    fn adjustment(&self, _category: &str, _activity: &CategoryActivity) -> i64 {
        self.0
    }
}

/// Uniform random adjustment in `[-MAX_DEMAND_ADJUSTMENT, MAX_DEMAND_ADJUSTMENT]`
///
/// Prices are not reproducible unless the generator is seeded.
pub struct RandomDemand {
    rng: Mutex<StdRng>,
}

impl RandomDemand {
    /// Generator seeded from the operating system
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Deterministic generator for replayable runs
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl DemandSignal for RandomDemand {
    fn adjustment(&self, _category: &str, _activity: &CategoryActivity) -> i64 {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.random_range(-MAX_DEMAND_ADJUSTMENT..=MAX_DEMAND_ADJUSTMENT)
    }
}

/// Adjustment derived from open trade requests versus available listings
///
/// Scarce categories (more requests than listings) price up, saturated
/// categories price down. No activity means no adjustment.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarketDemand;

impl DemandSignal for MarketDemand {
    fn adjustment(&self, _category: &str, activity: &CategoryActivity) -> i64 {
        let listings = activity.available_listings.max(0) as f64;
        let requests = activity.open_requests.max(0) as f64;
        let volume = listings + requests;
        if volume == 0.0 {
            return 0;
        }
        (MAX_DEMAND_ADJUSTMENT as f64 * (requests - listings) / volume).round() as i64
    }
}
