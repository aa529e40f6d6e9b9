//! Destinations for position changes produced by the simulator.

use crate::errors::Result;
use serde::Serialize;

/// A mint, rebalance or burn applied to the position
///
/// Token deltas are signed from the pool's point of view: positive amounts are deposited,
/// negative amounts are withdrawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionUpdate {
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: u128,
    pub amount0_delta: i128,
    pub amount1_delta: i128,
}

pub trait PositionSink {
    fn apply(&mut self, block: u64, update: &PositionUpdate) -> Result<()>;
}

/// Keeps every update in order
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub updates: Vec<(u64, PositionUpdate)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&(u64, PositionUpdate)> {
        self.updates.last()
    }
}

impl PositionSink for MemorySink {
    fn apply(&mut self, block: u64, update: &PositionUpdate) -> Result<()> {
        self.updates.push((block, *update));
        Ok(())
    }
}

/// Discards updates
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl PositionSink for NullSink {
    fn apply(&mut self, _block: u64, _update: &PositionUpdate) -> Result<()> {
        Ok(())
    }
}
