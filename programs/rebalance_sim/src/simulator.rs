//! Block-driven rebalance state machine.
//!
//! The caller owns the [`SimulatorState`] and threads it through [`RebalanceSimulator::step`]
//! one block at a time. The first step mints a position; later steps accrue fees and, once a
//! rebalance period has elapsed, withdraw, swap to an even split and remint around the
//! current price.

use crate::config::{InitialDeposit, SimulatorConfig};
use crate::errors::{Result, SimError};
use crate::market::{MarketSnapshot, MarketStateProvider, PoolState};
use crate::record::{BlockRecord, RecordLog};
use crate::sink::{PositionSink, PositionUpdate};
use crate::strategy::{ConfiguredWidth, OptimizedWidth, StrategyKind, WidthContext, WidthSelector};
use clmm_math::fees::{fees_owed, FeeGrowth};
use clmm_math::liquidity_amounts::{
    amounts_for_liquidity, liquidity_for_amount0, liquidity_for_amount1, liquidity_for_amounts,
};
use clmm_math::tick_math::{max_usable_tick, nearest_usable_tick, sqrt_price_at_tick};
use clmm_math::MathError;
use primitive_types::U256;
use tracing::{debug, info};

/// A live position and its bookkeeping
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionState {
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: u128,
    /// Amounts deposited at the last mint
    pub amount0: u128,
    pub amount1: u128,
    pub last_rebalance_block: u64,
    pub last_processed_block: u64,
    pub cumulative_fees0: u128,
    pub cumulative_fees1: u128,
    pub fee_growth_inside0_last: U256,
    pub fee_growth_inside1_last: U256,
    pub uncollected_fees0: u128,
    pub uncollected_fees1: u128,
    /// Principal left over from the last mint, redeployed at the next rebalance
    pub idle0: u128,
    pub idle1: u128,
    /// Fees collected without compounding, held outside the position
    pub collected_fees0: u128,
    pub collected_fees1: u128,
}

impl PositionState {
    fn fee_growth_inside_last(&self) -> FeeGrowth {
        FeeGrowth::new(self.fee_growth_inside0_last, self.fee_growth_inside1_last)
    }

    /// Principal at the given price, clamped into the position's range
    pub fn principal(&self, sqrt_price_x96: U256) -> Result<(u128, u128)> {
        let lower = sqrt_price_at_tick(self.tick_lower)?;
        let upper = sqrt_price_at_tick(self.tick_upper)?;
        let current = sqrt_price_x96.clamp(lower, upper);
        Ok(amounts_for_liquidity(current, lower, upper, self.liquidity)?)
    }

    /// Everything the position owns at the given price: principal, pending fees and balances
    /// held outside the range
    pub fn holdings(&self, sqrt_price_x96: U256) -> Result<(u128, u128)> {
        let (principal0, principal1) = self.principal(sqrt_price_x96)?;
        let total0 = [self.uncollected_fees0, self.idle0, self.collected_fees0]
            .into_iter()
            .try_fold(principal0, u128::checked_add)
            .ok_or(MathError::MathOverflow)?;
        let total1 = [self.uncollected_fees1, self.idle1, self.collected_fees1]
            .into_iter()
            .try_fold(principal1, u128::checked_add)
            .ok_or(MathError::MathOverflow)?;
        Ok((total0, total1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimulatorState {
    Uninitialized,
    Active(PositionState),
}

impl SimulatorState {
    pub fn position(&self) -> Option<&PositionState> {
        match self {
            SimulatorState::Uninitialized => None,
            SimulatorState::Active(position) => Some(position),
        }
    }
}

/// Trade executed to restore an even split at a rebalance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwapCost {
    /// Token1 value moved across the pool
    pub value_swapped: f64,
    pub fee: f64,
    pub slippage: f64,
}

/// What a step did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepEvent {
    Opened(PositionUpdate),
    /// Fees accrued, range unchanged
    Held { fees0: u128, fees1: u128 },
    Rebalanced {
        update: PositionUpdate,
        collected0: u128,
        collected1: u128,
        swap: SwapCost,
    },
}

pub struct RebalanceSimulator {
    config: SimulatorConfig,
    selector: Box<dyn WidthSelector>,
}

impl RebalanceSimulator {
    pub fn new(config: SimulatorConfig) -> Result<Self> {
        config.validate()?;
        let selector: Box<dyn WidthSelector> = match (config.strategy, config.distribution) {
            (StrategyKind::OptimizedRebalance, Some(distribution)) => {
                Box::new(OptimizedWidth::new(distribution, config.optimizer))
            }
            (StrategyKind::OptimizedRebalance, None) => {
                return Err(SimError::Configuration(
                    "the optimized strategy needs distribution parameters".to_string(),
                ))
            }
            _ => Box::new(ConfiguredWidth(config.tick_width)),
        };
        Ok(Self { config, selector })
    }

    /// Uses a custom width selector in place of the strategy's own
    pub fn with_selector(config: SimulatorConfig, selector: Box<dyn WidthSelector>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, selector })
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Advances the state machine to `block`
    ///
    /// # Errors
    /// * `OutOfOrderBlock` - `block` precedes the last processed block
    /// * `Convergence` - no initialized boundary ticks were found around the new range
    /// * `Configuration` - the configured width does not fit the pool's tick spacing
    /// * provider, sink, math and model errors are propagated unchanged
    pub fn step<P, S>(
        &self,
        state: SimulatorState,
        block: u64,
        provider: &P,
        sink: &mut S,
    ) -> Result<(SimulatorState, StepEvent)>
    where
        P: MarketStateProvider + ?Sized,
        S: PositionSink + ?Sized,
    {
        match state {
            SimulatorState::Uninitialized => self.open(block, provider, sink),
            SimulatorState::Active(position) => self.advance(position, block, provider, sink),
        }
    }

    fn open<P, S>(&self, block: u64, provider: &P, sink: &mut S) -> Result<(SimulatorState, StepEvent)>
    where
        P: MarketStateProvider + ?Sized,
        S: PositionSink + ?Sized,
    {
        let pool = provider.pool_state(block)?;
        self.config.validate_for_spacing(pool.tick_spacing)?;

        let (amount0, amount1) = match self.config.deposit {
            InitialDeposit::Amount0(amount) => (amount, 0),
            InitialDeposit::Amount1(amount) => (0, amount),
            InitialDeposit::Liquidity(_) => (0, 0),
        };
        let width = self.select_width(block, &pool, provider, amount0, amount1)?;
        let (tick_lower, tick_upper) = self.place_range(provider, block, &pool, width)?;

        let sqrt_lower = sqrt_price_at_tick(tick_lower)?;
        let sqrt_upper = sqrt_price_at_tick(tick_upper)?;
        let current = pool.sqrt_price_x96.clamp(sqrt_lower, sqrt_upper);
        let liquidity = match self.config.deposit {
            InitialDeposit::Liquidity(liquidity) => liquidity,
            InitialDeposit::Amount0(amount) => liquidity_for_amount0(current, sqrt_upper, amount)?,
            InitialDeposit::Amount1(amount) => liquidity_for_amount1(sqrt_lower, current, amount)?,
        };
        let (amount0, amount1) = amounts_for_liquidity(current, sqrt_lower, sqrt_upper, liquidity)?;

        let snapshot = MarketSnapshot::with_pool(provider, block, pool, tick_lower, tick_upper)?;
        let checkpoint = snapshot.fee_growth_inside();

        let update = PositionUpdate {
            tick_lower,
            tick_upper,
            liquidity,
            amount0_delta: signed(amount0)?,
            amount1_delta: signed(amount1)?,
        };
        sink.apply(block, &update)?;
        info!(block, tick_lower, tick_upper, liquidity, amount0, amount1, "opened position");

        let position = PositionState {
            tick_lower,
            tick_upper,
            liquidity,
            amount0,
            amount1,
            last_rebalance_block: block,
            last_processed_block: block,
            cumulative_fees0: 0,
            cumulative_fees1: 0,
            fee_growth_inside0_last: checkpoint.token0,
            fee_growth_inside1_last: checkpoint.token1,
            uncollected_fees0: 0,
            uncollected_fees1: 0,
            idle0: 0,
            idle1: 0,
            collected_fees0: 0,
            collected_fees1: 0,
        };
        Ok((SimulatorState::Active(position), StepEvent::Opened(update)))
    }

    fn advance<P, S>(
        &self,
        mut position: PositionState,
        block: u64,
        provider: &P,
        sink: &mut S,
    ) -> Result<(SimulatorState, StepEvent)>
    where
        P: MarketStateProvider + ?Sized,
        S: PositionSink + ?Sized,
    {
        if block < position.last_processed_block {
            return Err(SimError::OutOfOrderBlock {
                block,
                last: position.last_processed_block,
            });
        }

        let snapshot = MarketSnapshot::fetch(provider, block, position.tick_lower, position.tick_upper)?;
        let (fees0, fees1) = accrue_fees(&mut position, &snapshot)?;
        position.last_processed_block = block;

        let due = block >= position.last_rebalance_block.saturating_add(self.config.rebalance_period);
        if !self.config.strategy.rebalances() || !due {
            return Ok((SimulatorState::Active(position), StepEvent::Held { fees0, fees1 }));
        }
        self.rebalance(position, block, snapshot.pool, provider, sink)
    }

    fn rebalance<P, S>(
        &self,
        position: PositionState,
        block: u64,
        pool: PoolState,
        provider: &P,
        sink: &mut S,
    ) -> Result<(SimulatorState, StepEvent)>
    where
        P: MarketStateProvider + ?Sized,
        S: PositionSink + ?Sized,
    {
        let (withdrawn0, withdrawn1) = position.principal(pool.sqrt_price_x96)?;
        let (collected0, collected1) = (position.uncollected_fees0, position.uncollected_fees1);
        let mut amount0 = withdrawn0.checked_add(position.idle0).ok_or(MathError::MathOverflow)?;
        let mut amount1 = withdrawn1.checked_add(position.idle1).ok_or(MathError::MathOverflow)?;
        let (mut kept0, mut kept1) = (position.collected_fees0, position.collected_fees1);
        if self.config.compound_fees {
            amount0 = amount0.checked_add(collected0).ok_or(MathError::MathOverflow)?;
            amount1 = amount1.checked_add(collected1).ok_or(MathError::MathOverflow)?;
        } else {
            kept0 = kept0.checked_add(collected0).ok_or(MathError::MathOverflow)?;
            kept1 = kept1.checked_add(collected1).ok_or(MathError::MathOverflow)?;
        }

        let width = self.select_width(block, &pool, provider, amount0, amount1)?;
        let (tick_lower, tick_upper) = self.place_range(provider, block, &pool, width)?;

        let fee_rate = pool.market_params()?.fee_rate;
        let (target0, target1, swap) = even_split(amount0, amount1, &pool, fee_rate)?;

        let sqrt_lower = sqrt_price_at_tick(tick_lower)?;
        let sqrt_upper = sqrt_price_at_tick(tick_upper)?;
        let current = pool.sqrt_price_x96.clamp(sqrt_lower, sqrt_upper);
        let liquidity = liquidity_for_amounts(current, sqrt_lower, sqrt_upper, target0, target1)?;
        let (deposited0, deposited1) = amounts_for_liquidity(current, sqrt_lower, sqrt_upper, liquidity)?;
        // The side the range cannot absorb stays on the books
        let idle0 = target0.saturating_sub(deposited0);
        let idle1 = target1.saturating_sub(deposited1);

        let update = PositionUpdate {
            tick_lower,
            tick_upper,
            liquidity,
            amount0_delta: signed(deposited0)? - signed(withdrawn0)?,
            amount1_delta: signed(deposited1)? - signed(withdrawn1)?,
        };
        sink.apply(block, &update)?;

        let checkpoint = MarketSnapshot::with_pool(provider, block, pool, tick_lower, tick_upper)?.fee_growth_inside();
        info!(
            block,
            tick_lower,
            tick_upper,
            liquidity,
            collected0,
            collected1,
            idle0,
            idle1,
            swap_fee = swap.fee,
            slippage = swap.slippage,
            "rebalanced position"
        );

        let next = PositionState {
            tick_lower,
            tick_upper,
            liquidity,
            amount0: deposited0,
            amount1: deposited1,
            last_rebalance_block: block,
            last_processed_block: block,
            fee_growth_inside0_last: checkpoint.token0,
            fee_growth_inside1_last: checkpoint.token1,
            uncollected_fees0: 0,
            uncollected_fees1: 0,
            idle0,
            idle1,
            collected_fees0: kept0,
            collected_fees1: kept1,
            ..position
        };
        Ok((
            SimulatorState::Active(next),
            StepEvent::Rebalanced {
                update,
                collected0,
                collected1,
                swap,
            },
        ))
    }

    fn select_width<P: MarketStateProvider + ?Sized>(
        &self,
        block: u64,
        pool: &PoolState,
        provider: &P,
        amount0: u128,
        amount1: u128,
    ) -> Result<i32> {
        let period = self.config.rebalance_period;
        let reference = if self.selector.needs_history() {
            let Some(past) = block.checked_sub(period) else {
                return Err(SimError::MarketState(format!(
                    "block {block} has no history {period} blocks back"
                )));
            };
            Some(provider.pool_state(past)?)
        } else {
            None
        };

        self.selector.select_width(&WidthContext {
            block,
            pool,
            reference_pool: reference.as_ref(),
            amount0,
            amount1,
            rebalance_period: period,
        })
    }

    /// Range of `width` ticks around the current price, widened until both boundaries are
    /// initialized ticks
    ///
    /// Width 0 is the full usable range and is not widened.
    fn place_range<P: MarketStateProvider + ?Sized>(
        &self,
        provider: &P,
        block: u64,
        pool: &PoolState,
        width: i32,
    ) -> Result<(i32, i32)> {
        let spacing = pool.tick_spacing;
        let max_tick = max_usable_tick(spacing)?;
        if width == 0 {
            return Ok((-max_tick, max_tick));
        }

        let center = nearest_usable_tick(pool.tick, spacing)?;
        let half = width / 2;
        let mut lower = center.saturating_sub(half).max(-max_tick);
        let mut upper = center.saturating_add(half).min(max_tick);

        let mut attempt = 0;
        loop {
            let lower_info = provider.tick_info(block, lower)?;
            let upper_info = provider.tick_info(block, upper)?;
            debug!(
                block,
                attempt,
                tick_lower = lower,
                tick_upper = upper,
                lower_initialized = lower_info.initialized,
                upper_initialized = upper_info.initialized,
                "checking range boundaries"
            );
            if lower_info.initialized && upper_info.initialized {
                return Ok((lower, upper));
            }
            let clamped = lower == -max_tick && upper == max_tick;
            if clamped || attempt == self.config.max_widening_iterations {
                return Err(SimError::Convergence {
                    attempts: attempt,
                    tick_lower: lower,
                    tick_upper: upper,
                });
            }
            lower = (lower - spacing).max(-max_tick);
            upper = (upper + spacing).min(max_tick);
            attempt += 1;
        }
    }

    /// Record of the pool and position at `block`
    pub fn record<P: MarketStateProvider + ?Sized>(
        &self,
        state: &SimulatorState,
        block: u64,
        provider: &P,
    ) -> Result<BlockRecord> {
        let pool = provider.pool_state(block)?;
        let mut record = BlockRecord {
            block_number: block,
            value: 0.0,
            tick: pool.tick,
            liquidity: pool.liquidity,
            position_tick_lower: 0,
            position_tick_upper: 0,
            position_liquidity: 0,
            position_amount0: 0,
            position_amount1: 0,
            cumulative_fees0: 0,
            cumulative_fees1: 0,
        };

        if let Some(position) = state.position() {
            let (held0, held1) = position.holdings(pool.sqrt_price_x96)?;
            record = BlockRecord {
                value: held1 as f64 + pool.price() * held0 as f64,
                position_tick_lower: position.tick_lower,
                position_tick_upper: position.tick_upper,
                position_liquidity: position.liquidity,
                position_amount0: position.amount0,
                position_amount1: position.amount1,
                cumulative_fees0: position.cumulative_fees0,
                cumulative_fees1: position.cumulative_fees1,
                ..record
            };
        }
        Ok(record)
    }

    /// Steps through `blocks` in order, appending a record per block to `log` when given
    pub fn run<P, S, I>(
        &self,
        provider: &P,
        sink: &mut S,
        blocks: I,
        mut log: Option<&mut RecordLog>,
    ) -> Result<SimulatorState>
    where
        P: MarketStateProvider + ?Sized,
        S: PositionSink + ?Sized,
        I: IntoIterator<Item = u64>,
    {
        let mut state = SimulatorState::Uninitialized;
        for block in blocks {
            let (next, _event) = self.step(state, block, provider, sink)?;
            state = next;
            if let Some(log) = log.as_deref_mut() {
                log.append(&self.record(&state, block, provider)?)?;
            }
        }
        Ok(state)
    }
}

/// Credits fees earned since the last checkpoint
fn accrue_fees(position: &mut PositionState, snapshot: &MarketSnapshot) -> Result<(u128, u128)> {
    let inside = snapshot.fee_growth_inside();
    let (fees0, fees1) = fees_owed(position.liquidity, inside, position.fee_growth_inside_last())?;

    position.uncollected_fees0 = position.uncollected_fees0.checked_add(fees0).ok_or(MathError::MathOverflow)?;
    position.uncollected_fees1 = position.uncollected_fees1.checked_add(fees1).ok_or(MathError::MathOverflow)?;
    position.cumulative_fees0 = position.cumulative_fees0.checked_add(fees0).ok_or(MathError::MathOverflow)?;
    position.cumulative_fees1 = position.cumulative_fees1.checked_add(fees1).ok_or(MathError::MathOverflow)?;
    position.fee_growth_inside0_last = inside.token0;
    position.fee_growth_inside1_last = inside.token1;
    Ok((fees0, fees1))
}

/// Token amounts worth half the post-trade value each, and the cost of getting there
///
/// The token1 value swapped `d` pays `fee_rate * d` in swap fees and `d^2 / (L * sqrtP)`
/// in price impact against the pool's active liquidity.
pub(crate) fn even_split(amount0: u128, amount1: u128, pool: &PoolState, fee_rate: f64) -> Result<(u128, u128, SwapCost)> {
    let price = pool.price();
    if !(price.is_finite() && price > 0.0) {
        return Err(SimError::MarketState(format!("unusable pool price {price}")));
    }
    let value = amount1 as f64 + price * amount0 as f64;
    let value_swapped = (amount1 as f64 - value / 2.0).abs();

    let slippage = if value_swapped == 0.0 {
        0.0
    } else if pool.liquidity == 0 {
        return Err(SimError::MarketState("pool has no active liquidity to swap against".to_string()));
    } else {
        value_swapped * value_swapped / (pool.liquidity as f64 * price.sqrt())
    };
    let fee = fee_rate * value_swapped;

    let remaining = (value - fee - slippage).max(0.0);
    let target1 = remaining / 2.0;
    let target0 = target1 / price;
    Ok((
        target0 as u128,
        target1 as u128,
        SwapCost {
            value_swapped,
            fee,
            slippage,
        },
    ))
}

fn signed(amount: u128) -> Result<i128> {
    Ok(i128::try_from(amount).map_err(|_| MathError::MathOverflow)?)
}
