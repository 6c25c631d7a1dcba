//! Metrics Calculator — word-count token approximation and expansion rating.

use serde::{Deserialize, Serialize};

use crate::transform::analyzer::word_count;

/// Expansion ratios at or above this are rated "Needs Optimization".
pub const EFFICIENT_RATIO_LIMIT: f64 = 3.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenMetrics {
    pub original_tokens: usize,
    pub transformed_tokens: usize,
    pub expansion_ratio: f64,
    pub efficiency_rating: String,
}

pub fn calculate_metrics(original: &str, document: &str) -> TokenMetrics {
    let original_tokens = word_count(original);
    let transformed_tokens = word_count(document);

    let expansion_ratio = if original_tokens == 0 {
        1.0
    } else {
        round2(transformed_tokens as f64 / original_tokens as f64)
    };

    TokenMetrics {
        original_tokens,
        transformed_tokens,
        expansion_ratio,
        efficiency_rating: rate_efficiency(expansion_ratio).to_string(),
    }
}

pub fn rate_efficiency(expansion_ratio: f64) -> &'static str {
    if expansion_ratio < EFFICIENT_RATIO_LIMIT {
        "Efficient"
    } else {
        "Needs Optimization"
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
