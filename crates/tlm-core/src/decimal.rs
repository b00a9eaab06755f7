//! Price and size precision rules for order submission.
//!
//! Perp prices are limited to 5 significant figures and to
//! `6 - szDecimals` decimal places. Sizes are limited to `szDecimals`
//! decimal places. Uses `rust_decimal` for exact arithmetic so that the
//! string sent to the exchange is exactly the rounded value.

use rust_decimal::{Decimal, RoundingStrategy};

/// Maximum significant figures accepted for a price.
pub const PRICE_SIG_FIGS: u32 = 5;

/// Maximum price decimals for perps before subtracting `szDecimals`.
pub const PERP_MAX_DECIMALS: u32 = 6;

/// Round a price to the exchange's precision rules.
///
/// Significant figures are applied first, integers included
/// (123456 -> 123460), then decimals are capped at `6 - sz_decimals`.
pub fn round_price(price: Decimal, sz_decimals: u32) -> Decimal {
    let max_decimals = PERP_MAX_DECIMALS.saturating_sub(sz_decimals);
    let sig = round_to_sig_figs(price, PRICE_SIG_FIGS);
    sig.round_dp_with_strategy(max_decimals, RoundingStrategy::MidpointNearestEven)
        .normalize()
}

/// Round a size to `sz_decimals` decimal places.
pub fn round_size(size: Decimal, sz_decimals: u32) -> Decimal {
    size.round_dp_with_strategy(sz_decimals, RoundingStrategy::MidpointNearestEven)
        .normalize()
}

/// Format without trailing zeros ("1.500" -> "1.5", "100.0" -> "100").
pub fn format_decimal(value: Decimal) -> String {
    let normalized = value.normalize();
    if normalized.is_zero() {
        return "0".to_string();
    }
    normalized.to_string()
}

/// Round to N significant figures (nearest, ties to even).
fn round_to_sig_figs(value: Decimal, sig_figs: u32) -> Decimal {
    if value.is_zero() || sig_figs == 0 {
        return Decimal::ZERO;
    }

    let magnitude = calculate_magnitude(value.abs());
    // 12345.6 (magnitude 4) with 5 sig figs keeps 0 decimals
    // 0.0012345 (magnitude -3) with 5 sig figs keeps 7 decimals
    let scale = sig_figs as i32 - magnitude - 1;

    if scale >= 0 {
        value.round_dp_with_strategy(scale as u32, RoundingStrategy::MidpointNearestEven)
    } else {
        let factor = Decimal::from(10i64.pow((-scale) as u32));
        (value / factor).round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven) * factor
    }
}

/// Order of magnitude of a positive decimal.
/// 12345 -> 4, 1234.5 -> 3, 0.123 -> -1, 0.00123 -> -3
fn calculate_magnitude(value: Decimal) -> i32 {
    let int_part = value.trunc();
    if !int_part.is_zero() {
        return int_part.to_string().len() as i32 - 1;
    }

    let s = value.to_string();
    let mut magnitude = 0;
    for c in s.chars().skip_while(|c| *c != '.').skip(1) {
        magnitude -= 1;
        if c != '0' {
            break;
        }
    }
    magnitude
}
