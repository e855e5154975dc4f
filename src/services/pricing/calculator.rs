// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Price arithmetic helpers.

use crate::error::AppError;
use serde::{Deserialize, Serialize};

/// Hourly rate over a billing period.
pub fn monthly_cost(hourly_rate: f64, quantity: f64, hours: f64) -> f64 {
    hourly_rate * quantity * hours
}

/// Reduce `price` by `percent` (0 to 100).
pub fn apply_discount(price: f64, percent: f64) -> Result<f64, AppError> {
    if !(0.0..=100.0).contains(&percent) {
        return Err(AppError::BadRequest(format!(
            "Discount must be between 0 and 100, got {}",
            percent
        )));
    }
    Ok(price * (1.0 - percent / 100.0))
}

/// Increase `price` by a non-negative `percent`.
pub fn apply_markup(price: f64, percent: f64) -> Result<f64, AppError> {
    if percent < 0.0 || percent.is_nan() {
        return Err(AppError::BadRequest(format!(
            "Markup cannot be negative, got {}",
            percent
        )));
    }
    Ok(price * (1.0 + percent / 100.0))
}

/// Round to a fixed number of decimal places.
pub fn round_price(price: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (price * factor).round() / factor
}

/// Money amounts are reported to the cent.
pub fn round_money(amount: f64) -> f64 {
    round_price(amount, 2)
}

/// Hourly rates keep four decimals.
pub fn round_hourly(rate: f64) -> f64 {
    round_price(rate, 4)
}

/// One band of a tiered price schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceTier {
    /// Units covered by this band
    pub limit: f64,
    pub price_per_unit: f64,
}

/// Cost of `quantity` units across consecutive tiers.
///
/// The last tier's rate applies to anything beyond the sum of all limits.
pub fn tiered_cost(quantity: f64, tiers: &[PriceTier]) -> f64 {
    let mut total = 0.0;
    let mut remaining = quantity;

    for (i, tier) in tiers.iter().enumerate() {
        if remaining <= 0.0 {
            break;
        }
        let applied = remaining.min(tier.limit);
        total += applied * tier.price_per_unit;
        remaining -= applied;

        if remaining > 0.0 && i == tiers.len() - 1 {
            total += remaining * tier.price_per_unit;
        }
    }

    total
}

/// Fixed conversion rates relative to USD.
fn usd_rate(currency: &str) -> f64 {
    match currency.to_ascii_uppercase().as_str() {
        "USD" => 1.0,
        "EUR" => 0.85,
        "GBP" => 0.75,
        "JPY" => 110.0,
        _ => 1.0,
    }
}

/// Convert between currencies using fixed rates; unknown codes count as USD.
pub fn convert_currency(amount: f64, from: &str, to: &str) -> f64 {
    amount / usd_rate(from) * usd_rate(to)
}
