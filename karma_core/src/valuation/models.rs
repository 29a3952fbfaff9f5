//! Valuation data models.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::db::ParseEnumError;

/// Physical condition of a listed item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    New,
    LikeNew,
    Good,
    Fair,
    Poor,
}

impl Condition {
    pub const ALL: [Condition; 5] = [
        Condition::New,
        Condition::LikeNew,
        Condition::Good,
        Condition::Fair,
        Condition::Poor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::New => "new",
            Condition::LikeNew => "like_new",
            Condition::Good => "good",
            Condition::Fair => "fair",
            Condition::Poor => "poor",
        }
    }

    /// Share of the category baseline the item retains
    pub fn multiplier(&self) -> f64 {
        match self {
            Condition::New => 1.0,
            Condition::LikeNew => 0.9,
            Condition::Good => 0.75,
            Condition::Fair => 0.5,
            Condition::Poor => 0.3,
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Condition::New),
            "like_new" => Ok(Condition::LikeNew),
            "good" => Ok(Condition::Good),
            "fair" => Ok(Condition::Fair),
            "poor" => Ok(Condition::Poor),
            other => Err(ParseEnumError::new("condition", other)),
        }
    }
}

/// Attributes the valuation is computed from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationInput {
    pub condition: Condition,
    pub category: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Frozen explanation of how an item's price was derived
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuationBreakdown {
    pub condition_score: i64,
    pub brand_score: i64,
    pub category_baseline: i64,
    pub demand_adjustment: i64,
    pub total: i64,
    pub explanation: String,
}
