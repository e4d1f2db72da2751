//! Glycemic load of a portion.
//!
//! `load = glycemic_index * (carbs_per_100g / 100 * grams) / 100`, computed in
//! exact decimal arithmetic and rounded to two places, half away from zero
//! (`8.265` becomes `8.27`). Returns `None` when the result does not fit in a
//! `Decimal`.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::Food;

pub const LOAD_DECIMAL_PLACES: u32 = 2;

/// Glycemic load contributed by eating `grams_consumed` of `food`, or `None`
/// on arithmetic overflow.
pub fn compute_glycemic_load(food: &Food, grams_consumed: Decimal) -> Option<Decimal> {
    let carb_grams = food
        .carbs_per_100g
        .checked_div(Decimal::ONE_HUNDRED)?
        .checked_mul(grams_consumed)?;
    let load = Decimal::from(food.glycemic_index)
        .checked_mul(carb_grams)?
        .checked_div(Decimal::ONE_HUNDRED)?;

    Some(load.round_dp_with_strategy(LOAD_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn food(glycemic_index: i32, carbs: &str) -> Food {
        Food {
            id: 1,
            name: "Manzana".into(),
            glycemic_index,
            carbs_per_100g: dec(carbs),
            data_source: None,
        }
    }

    #[test]
    fn apple_portion_rounds_midpoint_up() {
        // 21.75 g of carbs, raw load 8.265
        assert_eq!(compute_glycemic_load(&food(38, "14.5"), dec("150")), Some(dec("8.27")));
    }

    #[test]
    fn exact_load_needs_no_rounding() {
        assert_eq!(compute_glycemic_load(&food(51, "23.0"), dec("100")), Some(dec("11.73")));
    }

    #[test]
    fn rounds_below_midpoint_down() {
        // 10 * 1.234 / 100 = 0.1234
        assert_eq!(compute_glycemic_load(&food(10, "1.234"), dec("100")), Some(dec("0.12")));
    }

    #[test]
    fn zero_carbs_or_index_gives_zero_load() {
        assert_eq!(compute_glycemic_load(&food(70, "0"), dec("250")), Some(Decimal::ZERO));
        assert_eq!(compute_glycemic_load(&food(0, "60"), dec("250")), Some(Decimal::ZERO));
    }

    #[test]
    fn non_decreasing_in_grams() {
        let apple = food(38, "14.5");
        let mut previous = Decimal::ZERO;
        for grams in 1..=600 {
            let load = compute_glycemic_load(&apple, Decimal::from(grams)).unwrap();
            assert!(load >= previous, "load dropped at {grams} g");
            previous = load;
        }
    }

    #[test]
    fn non_decreasing_in_glycemic_index() {
        let mut previous = Decimal::ZERO;
        for index in 0..=150 {
            let load = compute_glycemic_load(&food(index, "14.5"), dec("150")).unwrap();
            assert!(load >= previous, "load dropped at index {index}");
            previous = load;
        }
    }

    #[test]
    fn overflow_is_reported_not_panicked() {
        let dense = food(100, "1000000");
        let huge_portion = Decimal::from_scientific("1e24").unwrap();
        assert_eq!(compute_glycemic_load(&dense, huge_portion), None);
        assert_eq!(compute_glycemic_load(&dense, Decimal::MAX), None);
    }
}
