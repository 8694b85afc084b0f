use rand::Rng;

use crate::model::device::PricePoint;

/// Fixed monthly compound decay. Placeholder until a real pricing model
/// exists; the contract is monotonic decay with a 10% floor.
pub const MONTHLY_DEPRECIATION_RATE: f64 = 0.05;
pub const VALUE_FLOOR_FRACTION: f64 = 0.10;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;
const SECONDS_PER_MONTH: i64 = 30 * SECONDS_PER_DAY;

/// Elapsed whole months since purchase, minimum 1.
pub fn months_since(purchase_ts: i64, now_ts: i64) -> i64 {
    ((now_ts - purchase_ts) / SECONDS_PER_MONTH).max(1)
}

/// Current value from purchase price and elapsed time: compound 5%/month
/// decay, clamped to 10% of the purchase price, rounded to whole units.
///
/// Pure computation. A non-positive purchase price is the caller's problem
/// and must be rejected before calling in here.
pub fn estimate_current_value(purchase_price: f64, purchase_ts: i64, now_ts: i64) -> f64 {
    let months = months_since(purchase_ts, now_ts);
    let decayed = purchase_price * (1.0 - MONTHLY_DEPRECIATION_RATE).powi(months as i32);
    decayed.max(purchase_price * VALUE_FLOOR_FRACTION).round()
}

/// Daily series of `days` points ending at `now_ts`, jittered around the
/// anchor price with a uniform ±volatility% step. Demo data only — not
/// derived from any market feed.
pub fn synthesize_price_history(
    days: usize,
    anchor_price: f64,
    volatility_pct: f64,
    now_ts: i64,
) -> Vec<PricePoint> {
    let mut rng = rand::thread_rng();
    let mut points = Vec::with_capacity(days);

    for i in (0..days).rev() {
        let change = (rng.gen::<f64>() - 0.5) * volatility_pct;
        let value = (anchor_price * (1.0 + change / 100.0)).max(0.1);

        points.push(PricePoint {
            ts: now_ts - (i as i64) * SECONDS_PER_DAY,
            value: (value * 100.0).round() / 100.0,
            source: "estimate".to_string(),
        });
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;

    const MONTH: i64 = SECONDS_PER_MONTH;

    #[test]
    fn value_stays_within_floor_and_purchase_price() {
        for price in [1.0, 49.99, 999.0, 12_500.0] {
            for months in [0_i64, 1, 2, 6, 24, 120, 600] {
                let value = estimate_current_value(price, 0, months * MONTH);
                assert!(
                    value >= (price * VALUE_FLOOR_FRACTION).floor(),
                    "price {price} months {months}: {value} below floor"
                );
                assert!(
                    value <= price.ceil(),
                    "price {price} months {months}: {value} above purchase price"
                );
            }
        }
    }

    #[test]
    fn two_months_of_decay_on_999() {
        // 999 * 0.95^2 = 901.5975, above the 99.9 floor
        assert_eq!(estimate_current_value(999.0, 0, 2 * MONTH), 902.0);
    }

    #[test]
    fn five_year_old_device_hits_the_floor() {
        let five_years = 5 * 365 * SECONDS_PER_DAY;
        assert_eq!(estimate_current_value(500.0, 0, five_years), 50.0);
    }

    #[test]
    fn fresh_purchase_counts_as_one_month() {
        assert_eq!(months_since(0, 0), 1);
        assert_eq!(months_since(0, SECONDS_PER_DAY), 1);
        assert_eq!(months_since(0, MONTH + SECONDS_PER_DAY), 1);
        assert_eq!(months_since(0, 2 * MONTH), 2);
    }

    #[test]
    fn decay_is_monotonic_in_elapsed_time() {
        let mut last = f64::MAX;
        for months in 1..=80_i64 {
            let value = estimate_current_value(2_000.0, 0, months * MONTH);
            assert!(value <= last, "value rose at month {months}");
            last = value;
        }
    }

    #[test]
    fn history_is_ordered_and_sized() {
        let points = synthesize_price_history(30, 750.0, 2.0, 1_700_000_000);
        assert_eq!(points.len(), 30);
        assert!(points.windows(2).all(|w| w[0].ts < w[1].ts));
        assert_eq!(points.last().unwrap().ts, 1_700_000_000);
        assert!(points.iter().all(|p| p.value > 0.0));
    }
}
