//! Property-based tests for range placement and the rebalance trade

use crate::config::{InitialDeposit, SimulatorConfig};
use crate::market::{MarketStateProvider, PoolState};
use crate::simulator::{even_split, RebalanceSimulator, SimulatorState};
use crate::sink::MemorySink;
use crate::strategy::StrategyKind;
use crate::synthetic::{SyntheticPool, SyntheticPoolConfig};
use clmm_math::tick_math::sqrt_price_at_tick;
use primitive_types::U256;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_even_split_is_balanced_and_never_creates_value(
        tick in -50_000i32..50_000,
        amount0 in 0u128..1_000_000_000_000,
        amount1 in 0u128..1_000_000_000_000,
        fee_pips in 0u32..10_000
    ) {
        let pool = PoolState {
            sqrt_price_x96: sqrt_price_at_tick(tick).unwrap(),
            tick,
            liquidity: 1_000_000_000_000_000,
            fee_growth_global0_x128: U256::zero(),
            fee_growth_global1_x128: U256::zero(),
            fee_pips,
            tick_spacing: 60,
        };
        let price = pool.price();
        let (target0, target1, swap) = even_split(amount0, amount1, &pool, fee_pips as f64 / 1e6).unwrap();

        let before = amount1 as f64 + price * amount0 as f64;
        let after = target1 as f64 + price * target0 as f64;
        prop_assert!(after <= before * (1.0 + 1e-12));
        prop_assert!(swap.fee >= 0.0 && swap.slippage >= 0.0);
        // Integer truncation leaves at most one unit of each token off balance
        prop_assert!((target1 as f64 - price * target0 as f64).abs() <= 1.0 + price);
    }

    #[test]
    fn test_opened_range_brackets_price_on_initialized_ticks(
        seed in any::<u64>(),
        half_width_units in 1i32..20,
        initialized_every in prop_oneof![Just(1i32), Just(2i32)]
    ) {
        // Symmetric widening reaches a grid of twice the spacing from any aligned center
        let pool = SyntheticPool::generate(SyntheticPoolConfig {
            seed,
            blocks: 20,
            initialized_every,
            ..Default::default()
        }).unwrap();
        let simulator = RebalanceSimulator::new(SimulatorConfig {
            strategy: StrategyKind::SimpleRebalance,
            tick_width: 2 * 60 * half_width_units,
            deposit: InitialDeposit::Liquidity(1_000_000),
            max_widening_iterations: 16,
            ..Default::default()
        }).unwrap();

        let block = *pool.blocks().end();
        let (state, _) = simulator.step(SimulatorState::Uninitialized, block, &pool, &mut MemorySink::new()).unwrap();
        let position = state.position().copied().unwrap();
        let tick = pool.pool_state(block).unwrap().tick;

        prop_assert!(position.tick_lower <= tick && tick < position.tick_upper);
        prop_assert!(pool.tick_info(block, position.tick_lower).unwrap().initialized);
        prop_assert!(pool.tick_info(block, position.tick_upper).unwrap().initialized);
        prop_assert!(position.tick_upper - position.tick_lower >= 2 * 60 * half_width_units);
    }
}
