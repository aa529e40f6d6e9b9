//! Range width optimizer and rebalance backtester
//!
//! Usage:
//!   rebalance-sim optimize --sigma 0.001 --tau 100 --fee-rate 0.003 --el 0.1 --theta 2e-5
//!   rebalance-sim fit --input prices.csv
//!   rebalance-sim backtest --config backtest.json --output records.csv

use clap::{Parser, Subcommand, ValueEnum};
use primitive_types::U256;
use range_model::optimizer::RangeProblem;
use range_model::{fit_distribution, DistributionParams, OptimizerConfig, PriceSample, PsiMethod, WidthOptimizer};
use rebalance_sim::logging::init_tracing;
use rebalance_sim::record::RecordLog;
use rebalance_sim::sink::MemorySink;
use rebalance_sim::synthetic::SyntheticPool;
use rebalance_sim::{BacktestConfig, RebalanceSimulator, SimError};
use serde::Deserialize;
use std::error::Error;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "rebalance-sim")]
#[command(version, about = "Concentrated liquidity range optimizer and rebalance backtester", long_about = None)]
struct Cli {
    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the range width maximizing expected value
    Optimize {
        /// Log-price drift per block
        #[arg(long, default_value_t = 0.0)]
        mu: f64,
        /// Log-price volatility per block
        #[arg(long)]
        sigma: f64,
        /// Rebalance period in blocks
        #[arg(long)]
        tau: f64,
        #[arg(long)]
        fee_rate: f64,
        /// Position liquidity relative to the pool's
        #[arg(long, default_value_t = 0.0)]
        el: f64,
        /// Fee yield per unit of virtual liquidity per block
        #[arg(long)]
        theta: f64,
        #[arg(long, default_value_t = 60)]
        tick_spacing: i32,
        #[arg(long, value_enum, default_value_t = PsiArg::ClosedForm)]
        psi: PsiArg,
        /// Simpson panels for the quadrature fee integral
        #[arg(long, default_value_t = 200)]
        panels: u32,
        #[arg(long)]
        max_tick_width: Option<i32>,
    },

    /// Fit drift and volatility to a CSV of block_number,sqrt_price_x96
    Fit {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Run a simulator config against a synthetic market
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// CSV record log, appended to when it exists
        #[arg(short, long, default_value = "records.csv")]
        output: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PsiArg {
    ClosedForm,
    Quadrature,
}

#[derive(Deserialize)]
struct PriceRow {
    block_number: u64,
    sqrt_price_x96: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    match cli.command {
        Commands::Optimize {
            mu,
            sigma,
            tau,
            fee_rate,
            el,
            theta,
            tick_spacing,
            psi,
            panels,
            max_tick_width,
        } => {
            let psi_method = match psi {
                PsiArg::ClosedForm => PsiMethod::ClosedForm,
                PsiArg::Quadrature => PsiMethod::Quadrature { panels },
            };
            let optimizer = WidthOptimizer::new(OptimizerConfig {
                psi_method,
                max_tick_width,
                ..OptimizerConfig::default()
            });
            let result = optimizer.optimize(&RangeProblem {
                distribution: DistributionParams::new(mu, sigma)?,
                tau,
                ef: fee_rate,
                el,
                theta,
                tick_spacing,
            })?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::Fit { input } => {
            let mut reader = csv::Reader::from_path(&input)?;
            let samples = reader
                .deserialize::<PriceRow>()
                .map(|row| {
                    let row = row?;
                    let sqrt_price_x96 = U256::from_dec_str(row.sqrt_price_x96.trim())
                        .map_err(|e| SimError::Configuration(format!("bad sqrt price at block {}: {e:?}", row.block_number)))?;
                    Ok(PriceSample {
                        block_number: row.block_number,
                        sqrt_price_x96,
                    })
                })
                .collect::<Result<Vec<_>, SimError>>()?;
            let params = fit_distribution(&samples)?;
            println!("{}", serde_json::to_string_pretty(&params)?);
        }

        Commands::Backtest { config, output } => {
            let config = BacktestConfig::load(&config)?;
            let pool = SyntheticPool::generate(config.market.clone())?;
            let simulator = RebalanceSimulator::new(config.simulator.clone())?;

            // Leave one period of history for fee yield estimation
            let first = pool.blocks().start() + config.simulator.rebalance_period;
            let last = *pool.blocks().end();
            if first > last {
                return Err(SimError::Configuration(format!(
                    "synthetic market has {} blocks, fewer than one rebalance period",
                    config.market.blocks
                ))
                .into());
            }

            let mut log = RecordLog::open(&output)?;
            let mut sink = MemorySink::new();
            let state = simulator.run(&pool, &mut sink, first..=last, Some(&mut log))?;
            let final_record = simulator.record(&state, last, &pool)?;
            info!(
                blocks = last - first + 1,
                position_updates = sink.updates.len(),
                value = final_record.value,
                cumulative_fees0 = final_record.cumulative_fees0,
                cumulative_fees1 = final_record.cumulative_fees1,
                output = %output.display(),
                "backtest complete"
            );
            println!("{}", serde_json::to_string_pretty(&final_record)?);
        }
    }
    Ok(())
}
