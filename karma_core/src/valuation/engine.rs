//! Valuation engine: item attributes to a point price.

use std::sync::Arc;

use super::demand::{CategoryActivity, DemandSignal, FixedDemand};
use super::models::{ValuationBreakdown, ValuationInput};
use super::tables::{brand_multiplier, category_baseline, FLOOR_VALUE, MAX_DEMAND_ADJUSTMENT};

/// Price an item for a given demand adjustment
///
/// Deterministic: identical inputs and adjustment always yield the same
/// breakdown. The adjustment is clamped to `±MAX_DEMAND_ADJUSTMENT` and the
/// total never drops below [`FLOOR_VALUE`].
pub fn valuate(input: &ValuationInput, demand_adjustment: i64) -> ValuationBreakdown {
    let demand_adjustment = demand_adjustment.clamp(-MAX_DEMAND_ADJUSTMENT, MAX_DEMAND_ADJUSTMENT);
    let brand = input
        .brand
        .as_deref()
        .map(str::trim)
        .filter(|brand| !brand.is_empty());

    let baseline = category_baseline(&input.category);
    let condition_multiplier = input.condition.multiplier();
    let brand_multiplier = brand_multiplier(brand);

    let condition_score = (baseline as f64 * condition_multiplier).round() as i64;
    let brand_score = (baseline as f64 * (brand_multiplier - 1.0)).round() as i64;
    let base_value = baseline as f64 * condition_multiplier * brand_multiplier;
    let total = FLOOR_VALUE.max((base_value + demand_adjustment as f64).round() as i64);

    let mut lines = vec![
        "Valuation breakdown:".to_string(),
        format!(
            "• Condition: {} ({:.0}% value retention)",
            input.condition.as_str().replace('_', " "),
            condition_multiplier * 100.0
        ),
        format!("• Category baseline: {baseline} karma"),
    ];
    if let Some(brand) = brand {
        lines.push(format!(
            "• Brand premium: {brand} (+{:.0}%)",
            brand_multiplier * 100.0 - 100.0
        ));
    }
    if !input.images.is_empty() {
        lines.push(format!("• Photos provided: {}", input.images.len()));
    }
    lines.push(format!("• Market demand: {demand_adjustment:+} karma"));

    ValuationBreakdown {
        condition_score,
        brand_score,
        category_baseline: baseline,
        demand_adjustment,
        total,
        explanation: lines.join("\n"),
    }
}

/// Valuation engine with an injected demand signal
#[derive(Clone)]
pub struct ValuationEngine {
    demand: Arc<dyn DemandSignal>,
}

impl ValuationEngine {
    pub fn new(demand: Arc<dyn DemandSignal>) -> Self {
        Self { demand }
    }

    /// Engine whose demand adjustment is always `adjustment`
    pub fn fixed(adjustment: i64) -> Self {
        Self::new(Arc::new(FixedDemand(adjustment)))
    }

    /// Price an item given the live activity of its category
    pub fn value(&self, input: &ValuationInput, activity: &CategoryActivity) -> ValuationBreakdown {
        let adjustment = self.demand.adjustment(&input.category, activity);
        let breakdown = valuate(input, adjustment);
        log::debug!(
            "Valued {} item in '{}' at {} karma (demand {:+})",
            input.condition,
            input.category,
            breakdown.total,
            breakdown.demand_adjustment
        );
        breakdown
    }
}

impl Default for ValuationEngine {
    fn default() -> Self {
        Self::fixed(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::valuation::models::Condition;

    fn input(condition: Condition, category: &str, brand: Option<&str>) -> ValuationInput {
        ValuationInput {
            condition,
            category: category.to_string(),
            brand: brand.map(str::to_string),
            images: Vec::new(),
        }
    }

    #[test]
    fn test_new_apple_electronics() {
        let breakdown = valuate(&input(Condition::New, "electronics", Some("apple")), 0);
        assert_eq!(breakdown.category_baseline, 500);
        assert_eq!(breakdown.condition_score, 500);
        assert_eq!(breakdown.brand_score, 250);
        assert_eq!(breakdown.demand_adjustment, 0);
        assert_eq!(breakdown.total, 750);
    }

    #[test]
    fn test_floor_applies_to_cheap_items() {
        let breakdown = valuate(&input(Condition::Poor, "books", None), -MAX_DEMAND_ADJUSTMENT);
        assert_eq!(breakdown.condition_score, 15);
        assert_eq!(breakdown.total, FLOOR_VALUE);
    }

    #[test]
    fn test_demand_adjustment_is_clamped() {
        let breakdown = valuate(&input(Condition::Good, "tools", None), 1_000);
        assert_eq!(breakdown.demand_adjustment, MAX_DEMAND_ADJUSTMENT);
        assert_eq!(breakdown.total, 150 + MAX_DEMAND_ADJUSTMENT);
    }

    #[test]
    fn test_unknown_brand_and_category() {
        let breakdown = valuate(&input(Condition::LikeNew, "Vinyl", Some("Obscure Co")), 0);
        assert_eq!(breakdown.category_baseline, 100);
        assert_eq!(breakdown.brand_score, 0);
        assert_eq!(breakdown.total, 90);
    }

    #[test]
    fn test_explanation_mentions_components() {
        let breakdown = valuate(&input(Condition::LikeNew, "phones", Some("Samsung")), -4);
        assert!(breakdown.explanation.contains("like new"));
        assert!(breakdown.explanation.contains("600 karma"));
        assert!(breakdown.explanation.contains("Samsung (+30%)"));
        assert!(breakdown.explanation.contains("-4 karma"));
    }

    #[test]
    fn test_blank_brand_is_ignored() {
        let breakdown = valuate(&input(Condition::New, "shoes", Some("  ")), 0);
        assert_eq!(breakdown.brand_score, 0);
        assert!(!breakdown.explanation.contains("Brand premium"));
    }

    #[test]
    fn test_engine_uses_injected_signal() {
        let engine = ValuationEngine::fixed(10);
        let breakdown = engine.value(
            &input(Condition::New, "bags", None),
            &CategoryActivity::default(),
        );
        assert_eq!(breakdown.total, 210);
    }
}
