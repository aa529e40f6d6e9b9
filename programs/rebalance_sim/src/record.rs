//! Per-block backtest records and their CSV log.

use crate::errors::Result;
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::path::Path;

/// Snapshot of the pool and the simulated position after one block
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRecord {
    pub block_number: u64,
    /// Position principal plus uncollected fees, in token1
    pub value: f64,
    pub tick: i32,
    /// Pool active liquidity
    pub liquidity: u128,
    pub position_tick_lower: i32,
    pub position_tick_upper: i32,
    pub position_liquidity: u128,
    pub position_amount0: u128,
    pub position_amount1: u128,
    pub cumulative_fees0: u128,
    pub cumulative_fees1: u128,
}

/// Append-only CSV log of [`BlockRecord`]s
///
/// The header is written only when the file is new or empty, so reruns extend an existing log.
pub struct RecordLog {
    writer: csv::Writer<File>,
}

impl RecordLog {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let is_empty = file.metadata()?.len() == 0;
        let writer = WriterBuilder::new().has_headers(is_empty).from_writer(file);
        Ok(Self { writer })
    }

    /// Writes one row and flushes it
    pub fn append(&mut self, record: &BlockRecord) -> Result<()> {
        self.writer.serialize(record)?;
        self.writer.flush()?;
        Ok(())
    }
}
