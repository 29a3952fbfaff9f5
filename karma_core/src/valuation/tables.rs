//! Fixed lookup tables behind the valuation heuristic.

/// Minimum price any item can be listed at
pub const FLOOR_VALUE: i64 = 50;

/// Largest absolute demand perturbation, in points
pub const MAX_DEMAND_ADJUSTMENT: i64 = 25;

/// Baseline used when the category is not in [`CATEGORY_BASELINES`]
pub const DEFAULT_CATEGORY_BASELINE: i64 = 100;

/// Multiplier for brands without a premium
pub const DEFAULT_BRAND_MULTIPLIER: f64 = 1.0;

pub const CATEGORY_BASELINES: &[(&str, i64)] = &[
    ("electronics", 500),
    ("phones", 600),
    ("laptops", 800),
    ("tablets", 400),
    ("watches", 300),
    ("shoes", 150),
    ("clothing", 100),
    ("bags", 200),
    ("accessories", 80),
    ("furniture", 400),
    ("books", 50),
    ("sports", 150),
    ("toys", 80),
    ("tools", 200),
    ("home", 120),
    ("other", DEFAULT_CATEGORY_BASELINE),
];

pub const BRAND_MULTIPLIERS: &[(&str, f64)] = &[
    ("apple", 1.5),
    ("samsung", 1.3),
    ("nike", 1.2),
    ("adidas", 1.2),
    ("gucci", 1.8),
    ("prada", 1.7),
    ("sony", 1.3),
    ("canon", 1.3),
    ("nikon", 1.3),
];

/// Look up a category baseline by case-insensitive name
pub fn category_baseline(category: &str) -> i64 {
    let key = category.trim().to_lowercase();
    CATEGORY_BASELINES
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, baseline)| *baseline)
        .unwrap_or(DEFAULT_CATEGORY_BASELINE)
}

/// Look up a brand multiplier; absent or unknown brands carry no premium
pub fn brand_multiplier(brand: Option<&str>) -> f64 {
    let Some(brand) = brand else {
        return DEFAULT_BRAND_MULTIPLIER;
    };
    let key = brand.trim().to_lowercase();
    BRAND_MULTIPLIERS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, multiplier)| *multiplier)
        .unwrap_or(DEFAULT_BRAND_MULTIPLIER)
}
