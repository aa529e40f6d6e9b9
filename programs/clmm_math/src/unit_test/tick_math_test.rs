use crate::constants::*;
use crate::errors::{MathError, Result};
use crate::tick_math::*;
use primitive_types::U256;

#[cfg(test)]
mod tick_math_tests {
    use super::*;

    /// Tests for tick → sqrt price conversion
    mod sqrt_price_at_tick_tests {
        use super::*;

        #[test]
        fn test_tick_zero_is_exactly_q96() -> Result<()> {
            assert_eq!(sqrt_price_at_tick(0)?, Q96);
            Ok(())
        }

        #[test]
        fn test_boundary_ticks_match_sqrt_price_limits() -> Result<()> {
            assert_eq!(sqrt_price_at_tick(MIN_TICK)?, MIN_SQRT_PRICE);
            assert_eq!(sqrt_price_at_tick(MAX_TICK)?, MAX_SQRT_PRICE);
            Ok(())
        }

        #[test]
        fn test_known_tick_values() -> Result<()> {
            // Reference values for the 1.0001 grid in Q64.96
            let cases: [(i32, &str); 4] = [
                (1, "79232123823359799118286999568"),
                (-1, "79224201403219477170569942574"),
                (60, "79466191966197645195421774833"),
                (-600, "76886731765546235930195592750"),
            ];
            for (tick, expected) in cases {
                let expected = U256::from_dec_str(expected).map_err(|_| MathError::MathOverflow)?;
                assert_eq!(sqrt_price_at_tick(tick)?, expected, "tick {tick}");
            }
            Ok(())
        }

        #[test]
        fn test_out_of_bounds_ticks_rejected() {
            assert_eq!(
                sqrt_price_at_tick(MAX_TICK + 1),
                Err(MathError::TickOutOfBounds { tick: MAX_TICK + 1 })
            );
            assert_eq!(
                sqrt_price_at_tick(MIN_TICK - 1),
                Err(MathError::TickOutOfBounds { tick: MIN_TICK - 1 })
            );
        }

        #[test]
        fn test_neighbouring_ticks_strictly_increase() -> Result<()> {
            for tick in [-887271, -100_000, -61, -1, 0, 1, 59, 100_000, 887_271] {
                assert!(sqrt_price_at_tick(tick)? < sqrt_price_at_tick(tick + 1)?);
            }
            Ok(())
        }
    }

    /// Tests for sqrt price → tick conversion
    mod tick_at_sqrt_price_tests {
        use super::*;

        #[test]
        fn test_exact_prices_map_back_to_their_tick() -> Result<()> {
            for tick in [MIN_TICK, -600, -1, 0, 1, 60, 600, MAX_TICK] {
                assert_eq!(tick_at_sqrt_price(sqrt_price_at_tick(tick)?)?, tick);
            }
            Ok(())
        }

        #[test]
        fn test_price_just_below_tick_floors_to_previous_tick() -> Result<()> {
            let sqrt_price = sqrt_price_at_tick(60)? - U256::one();
            assert_eq!(tick_at_sqrt_price(sqrt_price)?, 59);
            Ok(())
        }

        #[test]
        fn test_out_of_range_prices_rejected() {
            let too_low = MIN_SQRT_PRICE - U256::one();
            assert_eq!(
                tick_at_sqrt_price(too_low),
                Err(MathError::SqrtPriceOutOfRange { sqrt_price: too_low })
            );
            assert!(tick_at_sqrt_price(MAX_SQRT_PRICE + U256::one()).is_err());
        }
    }

    /// Tests for tick spacing helpers
    mod usable_tick_tests {
        use super::*;

        #[test]
        fn test_max_usable_tick() -> Result<()> {
            assert_eq!(max_usable_tick(1)?, MAX_TICK);
            assert_eq!(max_usable_tick(60)?, 887220);
            assert_eq!(max_usable_tick(200)?, 887200);
            assert!(max_usable_tick(0).is_err());
            Ok(())
        }

        #[test]
        fn test_nearest_usable_tick_rounding() -> Result<()> {
            assert_eq!(nearest_usable_tick(0, 60)?, 0);
            assert_eq!(nearest_usable_tick(29, 60)?, 0);
            assert_eq!(nearest_usable_tick(30, 60)?, 60);
            assert_eq!(nearest_usable_tick(-29, 60)?, 0);
            assert_eq!(nearest_usable_tick(-31, 60)?, -60);
            assert_eq!(nearest_usable_tick(-30, 60)?, 0);
            assert_eq!(nearest_usable_tick(17, 1)?, 17);
            Ok(())
        }

        #[test]
        fn test_nearest_usable_tick_clamps_to_grid() -> Result<()> {
            assert_eq!(nearest_usable_tick(MAX_TICK, 60)?, 887220);
            assert_eq!(nearest_usable_tick(MIN_TICK, 60)?, -887220);
            Ok(())
        }

        #[test]
        fn test_log_price_tick_conversion() {
            let ticks = ticks_for_log_price(log_price_for_ticks(600.0));
            assert!((ticks - 600.0).abs() < 1e-9);
        }
    }
}
