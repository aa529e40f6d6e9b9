use crate::constants::Q128;
use crate::errors::{MathError, Result};
use crate::fees::*;
use primitive_types::U256;

#[cfg(test)]
mod fees_tests {
    use super::*;

    fn growth(token0: u64, token1: u64) -> FeeGrowth {
        FeeGrowth::new(U256::from(token0), U256::from(token1))
    }

    mod fee_growth_inside_tests {
        use super::*;

        #[test]
        fn test_current_tick_inside_range() {
            let inside = fee_growth_inside(0, -60, growth(10, 1), 60, growth(20, 2), growth(100, 10));
            assert_eq!(inside, growth(70, 7));
        }

        #[test]
        fn test_current_tick_below_range() {
            // Below the range the lower tick's outside value counts growth above it
            let inside = fee_growth_inside(-120, -60, growth(30, 3), 60, growth(20, 2), growth(100, 10));
            assert_eq!(inside, growth(10, 1));
        }

        #[test]
        fn test_current_tick_at_or_above_upper() {
            let inside = fee_growth_inside(60, -60, growth(10, 1), 60, growth(60, 6), growth(100, 10));
            assert_eq!(inside, growth(50, 5));
        }

        #[test]
        fn test_lower_boundary_counts_as_inside() {
            let at_lower = fee_growth_inside(-60, -60, growth(10, 1), 60, growth(20, 2), growth(100, 10));
            assert_eq!(at_lower, growth(70, 7));
        }

        #[test]
        fn test_accumulator_wraparound() {
            // outside values larger than global wrap modulo 2^256
            let inside = fee_growth_inside(0, -60, growth(80, 0), 60, growth(40, 0), growth(100, 0));
            let expected = U256::from(100u64)
                .overflowing_sub(U256::from(80u64))
                .0
                .overflowing_sub(U256::from(40u64))
                .0;
            assert_eq!(inside.token0, expected);
            assert_eq!(inside.token0, U256::MAX - U256::from(19u64));
        }
    }

    mod fees_owed_tests {
        use super::*;

        #[test]
        fn test_fees_scale_with_liquidity() -> Result<()> {
            let last = FeeGrowth::default();
            let now = FeeGrowth::new(Q128 * U256::from(5u64), Q128 / U256::from(2u64));

            assert_eq!(fees_owed(1_000, now, last)?, (5_000, 500));
            assert_eq!(fees_owed(0, now, last)?, (0, 0));
            Ok(())
        }

        #[test]
        fn test_fees_across_accumulator_overflow() -> Result<()> {
            let last = FeeGrowth::new(U256::MAX - Q128 + U256::one(), U256::zero());
            let now = FeeGrowth::new(Q128, U256::zero());

            assert_eq!(fees_owed(7, now, last)?, (14, 0));
            Ok(())
        }

        #[test]
        fn test_unchanged_checkpoint_owes_nothing() -> Result<()> {
            let checkpoint = growth(123_456, 789);
            assert_eq!(fees_owed(u128::MAX, checkpoint, checkpoint)?, (0, 0));
            Ok(())
        }

        #[test]
        fn test_owed_amount_overflow_reported() {
            let now = FeeGrowth::new(U256::MAX, U256::zero());
            assert_eq!(
                fees_owed(u128::MAX, now, FeeGrowth::default()),
                Err(MathError::MathOverflow)
            );
        }
    }
}
