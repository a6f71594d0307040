//! Billing math over already-fetched price and measurement series.
//!
//! All functions are pure. Points whose status is not `valid` count as
//! absent, never as zero. Prices are ct/kWh, consumption is kWh; totals
//! are euros unless stated otherwise.

use crate::models::MeasurementPoint;

/// Pair prices with measurements by index, keeping only pairs where both
/// points are valid.
///
/// Alignment is purely positional: both series are assumed to cover the
/// same window at the same resolution. No timestamp cross-check is done,
/// so windows that legitimately differ in length (a 23- or 25-hour DST
/// day) will silently misalign. Known limitation carried over from the
/// upstream behavior.
pub fn pair_valid(
    prices: &[MeasurementPoint],
    measurements: &[MeasurementPoint],
) -> Vec<(f64, f64)> {
    prices
        .iter()
        .zip(measurements.iter())
        .filter_map(|(price, measurement)| {
            Some((price.valid_value()?, measurement.valid_value()?))
        })
        .collect()
}

/// Total cost of consumption priced hour by hour at spot price plus
/// margin, including tax. Returns euros; zero when no pair survives.
pub fn total_spot_cost(
    prices: &[MeasurementPoint],
    measurements: &[MeasurementPoint],
    margin_ct_per_kwh: f64,
    tax_rate: f64,
) -> f64 {
    let total_cents: f64 = pair_valid(prices, measurements)
        .iter()
        .map(|(price, consumption)| ((price + margin_ct_per_kwh) * consumption).abs())
        .sum();
    total_cents * (1.0 + tax_rate) / 100.0
}

/// The ct/kWh delta between the consumption-weighted average price and the
/// plain average price of the window.
///
/// With A = sum of |price * consumption| over surviving pairs, B = average
/// valid price times total valid consumption, the impact is
/// (A - B) / total consumption. A negative impact means consumption was
/// concentrated in cheaper hours. Zero when no pair survives or nothing
/// was consumed.
pub fn usage_impact(prices: &[MeasurementPoint], measurements: &[MeasurementPoint]) -> f64 {
    let pairs = pair_valid(prices, measurements);
    if pairs.is_empty() {
        return 0.0;
    }

    let valid_prices: Vec<f64> = prices.iter().filter_map(|p| p.valid_value()).collect();
    let total_consumption: f64 = measurements
        .iter()
        .filter_map(|m| m.valid_value())
        .map(f64::abs)
        .sum();
    if valid_prices.is_empty() || total_consumption == 0.0 {
        return 0.0;
    }

    let weighted: f64 = pairs
        .iter()
        .map(|(price, consumption)| (price * consumption).abs())
        .sum();
    let average_price =
        valid_prices.iter().map(|p| p.abs()).sum::<f64>() / valid_prices.len() as f64;

    (weighted - average_price * total_consumption) / total_consumption
}

/// Total grid-transfer charge for a window of daily measurements: the
/// per-kWh transfer fee over all valid consumption plus the fixed base
/// price. Returns euros.
pub fn transfer_fee_total(
    daily_measurements: &[MeasurementPoint],
    transfer_fee_ct_per_kwh: f64,
    transfer_base_price_eur: f64,
) -> f64 {
    let total_consumption: f64 = daily_measurements
        .iter()
        .filter_map(|m| m.valid_value())
        .map(f64::abs)
        .sum();
    total_consumption * transfer_fee_ct_per_kwh / 100.0 + transfer_base_price_eur
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MeasurementPoint as Point, MeasurementStatus};

    fn invalid(value: f64) -> Point {
        Point::new(value, MeasurementStatus::Invalid)
    }

    #[test]
    fn pairing_drops_pairs_with_an_invalid_side() {
        let prices = vec![Point::valid(10.0), invalid(20.0), Point::valid(30.0)];
        let measurements = vec![Point::valid(1.0), Point::valid(2.0)];
        let pairs = pair_valid(&prices, &measurements);
        // Length capped at the shorter series, invalid pair dropped.
        assert_eq!(pairs, vec![(10.0, 1.0)]);
    }

    #[test]
    fn pairing_of_empty_series_is_empty() {
        assert!(pair_valid(&[], &[Point::valid(1.0)]).is_empty());
        assert!(pair_valid(&[Point::valid(1.0)], &[]).is_empty());
    }

    #[test]
    fn spot_cost_matches_reference_scenario() {
        // (10.0 + 0.5) * 2.0 * 1.24 / 100 = 0.2604 euros
        let prices = vec![Point::valid(10.0)];
        let measurements = vec![Point::valid(2.0)];
        let cost = total_spot_cost(&prices, &measurements, 0.5, 0.24);
        assert!((cost - 0.2604).abs() < 1e-9);
    }

    #[test]
    fn spot_cost_is_zero_without_pairs() {
        assert_eq!(total_spot_cost(&[], &[], 0.5, 0.24), 0.0);
        let prices = vec![invalid(10.0)];
        let measurements = vec![Point::valid(2.0)];
        assert_eq!(total_spot_cost(&prices, &measurements, 0.5, 0.24), 0.0);
    }

    #[test]
    fn spot_cost_grows_with_margin_magnitude() {
        let prices = vec![Point::valid(10.0), Point::valid(12.0)];
        let measurements = vec![Point::valid(2.0), Point::valid(1.5)];
        let base = total_spot_cost(&prices, &measurements, 0.0, 0.24);
        let with_margin = total_spot_cost(&prices, &measurements, 0.5, 0.24);
        let with_more = total_spot_cost(&prices, &measurements, 1.5, 0.24);
        assert!(base < with_margin);
        assert!(with_margin < with_more);
    }

    #[test]
    fn negative_prices_contribute_their_magnitude() {
        let prices = vec![Point::valid(-5.0)];
        let measurements = vec![Point::valid(2.0)];
        // |(-5.0 + 0.0) * 2.0| * 1.0 / 100
        let cost = total_spot_cost(&prices, &measurements, 0.0, 0.0);
        assert!((cost - 0.10).abs() < 1e-9);
    }

    #[test]
    fn usage_impact_is_zero_for_flat_usage() {
        // Equal consumption every hour weights every price equally, so the
        // weighted average equals the plain average.
        let prices = vec![Point::valid(10.0), Point::valid(20.0)];
        let measurements = vec![Point::valid(3.0), Point::valid(3.0)];
        assert!(usage_impact(&prices, &measurements).abs() < 1e-9);
    }

    #[test]
    fn usage_impact_is_negative_when_usage_follows_cheap_hours() {
        let prices = vec![Point::valid(10.0), Point::valid(20.0)];
        let measurements = vec![Point::valid(4.0), Point::valid(1.0)];
        // Weighted: 40 + 20 = 60; average price 15 * consumption 5 = 75.
        let impact = usage_impact(&prices, &measurements);
        assert!((impact - (60.0 - 75.0) / 5.0).abs() < 1e-9);
        assert!(impact < 0.0);
    }

    #[test]
    fn usage_impact_averages_over_all_valid_prices() {
        // The price average includes valid prices beyond the paired
        // range; the consumption total likewise counts every valid point.
        let prices = vec![Point::valid(10.0), Point::valid(30.0)];
        let measurements = vec![Point::valid(2.0)];
        // A = 20, avg price = 20, total consumption = 2, B = 40.
        let impact = usage_impact(&prices, &measurements);
        assert!((impact - (20.0 - 40.0) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn usage_impact_is_zero_without_pairs_or_consumption() {
        assert_eq!(usage_impact(&[], &[]), 0.0);
        let prices = vec![Point::valid(10.0)];
        let measurements = vec![Point::valid(0.0)];
        assert_eq!(usage_impact(&prices, &measurements), 0.0);
    }

    #[test]
    fn transfer_total_matches_reference_scenario() {
        // 40 kWh * 5.0 ct/kWh / 100 + 3.0 = 5.0 euros
        let daily = vec![
            Point::valid(15.0),
            Point::valid(25.0),
            invalid(100.0),
        ];
        let total = transfer_fee_total(&daily, 5.0, 3.0);
        assert!((total - 5.0).abs() < 1e-9);
    }

    #[test]
    fn transfer_total_of_empty_window_is_the_base_price() {
        assert_eq!(transfer_fee_total(&[], 5.0, 3.0), 3.0);
    }
}
