//! Rebalance backtester for concentrated liquidity positions.
//!
//! A [`RebalanceSimulator`] walks a position through market states served by a
//! [`market::MarketStateProvider`], choosing widths with the configured strategy and pushing
//! every mint and rebalance to a [`sink::PositionSink`]. [`synthetic::SyntheticPool`] provides
//! a seeded GBM market for demos and tests.

pub mod config;
pub mod errors;
pub mod logging;
pub mod market;
pub mod record;
pub mod simulator;
pub mod sink;
pub mod strategy;
pub mod synthetic;

pub use config::{BacktestConfig, InitialDeposit, SimulatorConfig};
pub use errors::SimError;
pub use simulator::{PositionState, RebalanceSimulator, SimulatorState, StepEvent};
pub use strategy::StrategyKind;

#[cfg(test)]
pub mod property_based_test;
