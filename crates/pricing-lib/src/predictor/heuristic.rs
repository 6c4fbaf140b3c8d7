//! Closed-form price estimate used when no model artifact resolved
//!
//! `price = max(15.0 + (year - 2010) * 0.5 - (km / 10000) * 0.2, 1.0)`
//!
//! Only the model year and odometer reading influence the result. All other
//! attributes are still validated by the assembler before we get here.

use super::features::FeatureVector;
use super::output::round_price;

/// Price of a 2010 car with zero kilometers
pub const BASE_PRICE: f64 = 15.0;

/// Reference model year
pub const BASE_YEAR: i64 = 2010;

/// Added per model year after `BASE_YEAR`
pub const PRICE_PER_YEAR: f64 = 0.5;

/// Subtracted per `DISTANCE_STEP_KM` driven
pub const PRICE_PER_DISTANCE_STEP: f64 = 0.2;

pub const DISTANCE_STEP_KM: f64 = 10_000.0;

/// Lowest price the heuristic will return
pub const HEURISTIC_FLOOR: f64 = 1.0;

/// Deterministic baseline pricer
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicPricer;

impl HeuristicPricer {
    /// Unrounded, unclamped estimate
    pub fn raw(year: i64, kilometers_driven: f64) -> f64 {
        BASE_PRICE + (year - BASE_YEAR) as f64 * PRICE_PER_YEAR
            - (kilometers_driven / DISTANCE_STEP_KM) * PRICE_PER_DISTANCE_STEP
    }

    /// Clamped and rounded estimate
    pub fn estimate(year: i64, kilometers_driven: f64) -> f64 {
        round_price(Self::raw(year, kilometers_driven).max(HEURISTIC_FLOOR))
    }

    pub fn predict(features: &FeatureVector) -> f64 {
        Self::estimate(features.year, features.kilometers_driven)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_reference_record() {
        assert_close(HeuristicPricer::estimate(2015, 50_000.0), 16.5);
    }

    #[test]
    fn test_floor_clamps_old_high_mileage() {
        assert!(HeuristicPricer::raw(1990, 500_000.0) < 0.0);
        assert_eq!(HeuristicPricer::estimate(1990, 500_000.0), 1.0);
    }

    #[test]
    fn test_year_step_adds_half() {
        for year in 2005..2024 {
            let delta = HeuristicPricer::estimate(year + 1, 30_000.0)
                - HeuristicPricer::estimate(year, 30_000.0);
            assert_close(delta, 0.5);
        }
    }

    #[test]
    fn test_distance_step_subtracts_fifth() {
        for step in 0..20 {
            let km = step as f64 * DISTANCE_STEP_KM;
            let delta = HeuristicPricer::estimate(2018, km)
                - HeuristicPricer::estimate(2018, km + DISTANCE_STEP_KM);
            assert_close(delta, 0.2);
        }
    }

    #[test]
    fn test_never_below_floor() {
        for year in [1980_i64, 1995, 2005, 2020] {
            for km in [0.0, 250_000.0, 1_000_000.0, 10_000_000.0] {
                assert!(HeuristicPricer::estimate(year, km) >= HEURISTIC_FLOOR);
            }
        }
    }
}
