//! Simulator configuration loaded from JSON.

use crate::errors::{Result, SimError};
use crate::strategy::StrategyKind;
use crate::synthetic::SyntheticPoolConfig;
use range_model::{DistributionParams, OptimizerConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How the first position is sized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialDeposit {
    /// Fixed liquidity, token amounts follow from the range
    Liquidity(u128),
    /// Fixed token0 amount, token1 derived
    Amount0(u128),
    /// Fixed token1 amount, token0 derived
    Amount1(u128),
}

impl InitialDeposit {
    fn is_zero(&self) -> bool {
        matches!(
            self,
            InitialDeposit::Liquidity(0) | InitialDeposit::Amount0(0) | InitialDeposit::Amount1(0)
        )
    }
}

impl Default for InitialDeposit {
    fn default() -> Self {
        InitialDeposit::Amount1(1_000_000_000_000_000_000)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub strategy: StrategyKind,
    /// Range width in ticks for the configured-width strategies, 0 for the full range
    pub tick_width: i32,
    /// Blocks between rebalances
    pub rebalance_period: u64,
    /// Fold collected fees back into the principal at each rebalance
    pub compound_fees: bool,
    pub deposit: InitialDeposit,
    /// Required by the optimizing strategy
    pub distribution: Option<DistributionParams>,
    pub optimizer: OptimizerConfig,
    pub max_widening_iterations: u32,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::SimpleRebalance,
            tick_width: 1200,
            rebalance_period: 1000,
            compound_fees: false,
            deposit: InitialDeposit::default(),
            distribution: None,
            optimizer: OptimizerConfig::default(),
            max_widening_iterations: 64,
        }
    }
}

impl SimulatorConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rebalance_period == 0 {
            return Err(SimError::Configuration("rebalance_period must be positive".to_string()));
        }
        if self.deposit.is_zero() {
            return Err(SimError::Configuration("initial deposit must be non-zero".to_string()));
        }
        if self.max_widening_iterations == 0 {
            return Err(SimError::Configuration(
                "max_widening_iterations must be positive".to_string(),
            ));
        }
        if self.tick_width < 0 || self.tick_width % 2 != 0 {
            return Err(SimError::Configuration(format!(
                "tick_width must be a non-negative even number of ticks, got {}",
                self.tick_width
            )));
        }

        if self.strategy == StrategyKind::OptimizedRebalance {
            if self.distribution.is_none() {
                return Err(SimError::Configuration(
                    "the optimized strategy needs distribution parameters".to_string(),
                ));
            }
            // Relative liquidity is measured on token amounts
            if matches!(self.deposit, InitialDeposit::Liquidity(_)) {
                return Err(SimError::Configuration(
                    "the optimized strategy needs a token amount deposit".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Checks the configured width against the pool's tick grid
    pub fn validate_for_spacing(&self, tick_spacing: i32) -> Result<()> {
        if tick_spacing <= 0 {
            return Err(SimError::Configuration(format!("invalid tick spacing {tick_spacing}")));
        }
        if self.strategy != StrategyKind::OptimizedRebalance && (self.tick_width / 2) % tick_spacing != 0 {
            return Err(SimError::Configuration(format!(
                "tick_width {} is not an even multiple of tick spacing {}",
                self.tick_width, tick_spacing
            )));
        }
        Ok(())
    }
}

/// A backtest run: the simulated position and the synthetic market it trades against
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub simulator: SimulatorConfig,
    pub market: SyntheticPoolConfig,
}

impl BacktestConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.simulator.validate()?;
        config.market.validate()?;
        config.simulator.validate_for_spacing(config.market.tick_spacing)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() -> Result<()> {
        SimulatorConfig::default().validate()?;
        SimulatorConfig::default().validate_for_spacing(60)?;
        Ok(())
    }

    #[test]
    fn test_partial_json_fills_defaults() -> Result<()> {
        let config = SimulatorConfig::from_json(
            r#"{"strategy": "fixed_width", "tick_width": 240, "deposit": {"amount0": 5000}}"#,
        )?;
        assert_eq!(config.strategy, StrategyKind::FixedWidth);
        assert_eq!(config.tick_width, 240);
        assert_eq!(config.deposit, InitialDeposit::Amount0(5000));
        assert_eq!(config.rebalance_period, 1000);
        Ok(())
    }

    #[test]
    fn test_rejects_invalid_settings() {
        let invalid = [
            SimulatorConfig { rebalance_period: 0, ..Default::default() },
            SimulatorConfig { deposit: InitialDeposit::Liquidity(0), ..Default::default() },
            SimulatorConfig { tick_width: 121, ..Default::default() },
            SimulatorConfig { tick_width: -120, ..Default::default() },
            SimulatorConfig { max_widening_iterations: 0, ..Default::default() },
            SimulatorConfig { strategy: StrategyKind::OptimizedRebalance, ..Default::default() },
        ];
        for config in invalid {
            assert!(matches!(config.validate(), Err(SimError::Configuration(_))), "{config:?}");
        }
    }

    #[test]
    fn test_optimized_strategy_requirements() -> Result<()> {
        let distribution = Some(DistributionParams::new(0.0, 0.001)?);
        let config = SimulatorConfig {
            strategy: StrategyKind::OptimizedRebalance,
            distribution,
            deposit: InitialDeposit::Liquidity(1_000),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SimulatorConfig { deposit: InitialDeposit::Amount1(1_000), ..config };
        config.validate()?;
        // Widths come from the optimizer, so the configured one is not checked
        config.validate_for_spacing(7)?;
        Ok(())
    }

    #[test]
    fn test_width_must_fit_spacing() {
        let config = SimulatorConfig { tick_width: 180, ..Default::default() };
        assert!(config.validate_for_spacing(60).is_err());
        assert!(config.validate_for_spacing(10).is_ok());
        assert!(config.validate_for_spacing(0).is_err());
        // Full range fits every grid
        let config = SimulatorConfig { tick_width: 0, ..Default::default() };
        assert!(config.validate_for_spacing(200).is_ok());
    }
}
