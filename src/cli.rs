//! CLI definition and dispatch.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::{CsvAdapter, read_candles_file};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{Backtest, BacktestConfig};
use crate::domain::config_validation::{validate_backtest_config, window_ms};
use crate::domain::error::BacktestError;
use crate::domain::strategy::ma_cross::{DEFAULT_FAST_PERIOD, DEFAULT_SLOW_PERIOD};
use crate::domain::strategy::trend_reversal::{
    DEFAULT_INCREMENT, DEFAULT_INITIAL_AF, DEFAULT_MAX_AF,
};
use crate::domain::strategy::{MaCrossover, Strategy, StrategyKind, TrendReversal};
use crate::domain::sweep::{self, ParamRange, SweepEntry};
use crate::domain::timeframe::Timeframe;
use crate::logging::init_tracing;
use crate::ports::candle_store::CandleStore;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_INTERVAL: &str = "1h";

#[derive(Parser, Debug)]
#[command(name = "candlebt", about = "OHLCV candle backtester")]
pub struct Cli {
    /// Log filter (overridden by CANDLEBT_LOG)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
    /// Log output format: text or json
    #[arg(long, global = true, default_value = "text")]
    pub log_format: String,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one or both strategies over a market
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        exchange: Option<String>,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        interval: Option<String>,
        /// psar, sma or all
        #[arg(long)]
        strategy: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Grid-search strategy parameters
    Sweep {
        #[arg(short, long)]
        config: PathBuf,
        /// psar or sma
        #[arg(long)]
        strategy: String,
        /// start:end:step or a single value
        #[arg(long)]
        initial_af: Option<String>,
        #[arg(long)]
        max_af: Option<String>,
        #[arg(long)]
        increment: Option<String>,
        #[arg(long)]
        fast: Option<String>,
        #[arg(long)]
        slow: Option<String>,
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Load a CSV file of candles into the SQLite store
    Import {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        exchange: String,
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        file: PathBuf,
    },
    /// List available symbols on an exchange
    ListSymbols {
        #[arg(long)]
        exchange: String,
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range for symbol(s)
    Info {
        #[arg(long)]
        exchange: Option<String>,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Command-line values that take precedence over the `[backtest]` section.
#[derive(Debug, Default, Clone, Copy)]
pub struct BacktestOverrides<'a> {
    pub exchange: Option<&'a str>,
    pub symbol: Option<&'a str>,
    pub interval: Option<&'a str>,
}

/// Range flags for `sweep`; unset flags fall back to the configured value.
#[derive(Debug, Default, Clone)]
pub struct SweepArgs {
    pub initial_af: Option<String>,
    pub max_af: Option<String>,
    pub increment: Option<String>,
    pub fast: Option<String>,
    pub slow: Option<String>,
}

pub fn run(cli: Cli) -> ExitCode {
    if let Err(e) = init_tracing(&cli.log_level, &cli.log_format) {
        eprintln!("error: {e}");
        return ExitCode::from(2);
    }

    let result = match cli.command {
        Command::Backtest {
            config,
            exchange,
            symbol,
            interval,
            strategy,
            dry_run,
        } => {
            let overrides = BacktestOverrides {
                exchange: exchange.as_deref(),
                symbol: symbol.as_deref(),
                interval: interval.as_deref(),
            };
            if dry_run {
                run_dry_run(&config, overrides, strategy.as_deref())
            } else {
                run_backtest(&config, overrides, strategy.as_deref())
            }
        }
        Command::Sweep {
            config,
            strategy,
            initial_af,
            max_af,
            increment,
            fast,
            slow,
            top,
        } => {
            let args = SweepArgs {
                initial_af,
                max_af,
                increment,
                fast,
                slow,
            };
            run_sweep(&config, &strategy, &args, top)
        }
        Command::Import {
            config,
            exchange,
            symbol,
            file,
        } => run_import(&config, &exchange, &symbol, &file),
        Command::ListSymbols { exchange, config } => run_list_symbols(&exchange, &config),
        Command::Info {
            exchange,
            symbol,
            config,
        } => run_info(exchange.as_deref(), symbol.as_deref(), &config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, BacktestError> {
    tracing::info!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

pub fn build_backtest_config(
    config: &dyn ConfigPort,
    overrides: BacktestOverrides<'_>,
) -> Result<BacktestConfig, BacktestError> {
    let exchange = match overrides.exchange {
        Some(e) => e.trim().to_string(),
        None => config.require_string("backtest", "exchange")?,
    };
    let symbol = match overrides.symbol {
        Some(s) => s.trim().to_uppercase(),
        None => config.require_string("backtest", "symbol")?.to_uppercase(),
    };
    let interval = overrides
        .interval
        .map(str::to_string)
        .or_else(|| config.get_string("backtest", "interval"))
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty())
        .unwrap_or_else(|| DEFAULT_INTERVAL.to_string());
    Timeframe::parse(&interval)?;
    let (start_ts, end_ts) = window_ms(config)?;

    Ok(BacktestConfig {
        exchange,
        symbol,
        interval,
        start_ts,
        end_ts,
    })
}

pub fn build_trend_reversal(config: &dyn ConfigPort) -> TrendReversal {
    TrendReversal::new(
        config.get_double("psar", "initial_af", DEFAULT_INITIAL_AF),
        config.get_double("psar", "max_af", DEFAULT_MAX_AF),
        config.get_double("psar", "increment", DEFAULT_INCREMENT),
    )
}

/// Negative periods become zero and are rejected when the strategy runs.
pub fn build_ma_crossover(config: &dyn ConfigPort) -> MaCrossover {
    let period = |key: &str, default: usize| {
        let value = config.get_int("sma", key, default as i64);
        usize::try_from(value).unwrap_or(0)
    };
    MaCrossover::new(
        period("fast_period", DEFAULT_FAST_PERIOD),
        period("slow_period", DEFAULT_SLOW_PERIOD),
    )
}

pub fn build_strategy(kind: StrategyKind, config: &dyn ConfigPort) -> Box<dyn Strategy> {
    match kind {
        StrategyKind::TrendReversal => Box::new(build_trend_reversal(config)),
        StrategyKind::MaCrossover => Box::new(build_ma_crossover(config)),
    }
}

/// `--strategy` wins over `[backtest] strategy`; `all` (the default) runs both.
pub fn resolve_strategies(
    strategy_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<Vec<StrategyKind>, BacktestError> {
    let name = strategy_override
        .map(str::to_string)
        .or_else(|| config.get_string("backtest", "strategy"))
        .unwrap_or_else(|| "all".to_string());

    if name.trim().eq_ignore_ascii_case("all") {
        return Ok(StrategyKind::ALL.to_vec());
    }
    Ok(vec![name.parse::<StrategyKind>()?])
}

pub fn open_store(config: &dyn ConfigPort) -> Result<Box<dyn CandleStore>, BacktestError> {
    let backend = config
        .get_string("store", "backend")
        .unwrap_or_else(|| "sqlite".to_string())
        .trim()
        .to_lowercase();

    match backend.as_str() {
        "csv" => {
            let path = config.require_string("store", "path")?;
            Ok(Box::new(CsvAdapter::new(PathBuf::from(path))?))
        }
        "sqlite" => open_sqlite(config),
        other => Err(BacktestError::ConfigInvalid {
            section: "store".into(),
            key: "backend".into(),
            reason: format!("unknown backend '{other}' (expected sqlite or csv)"),
        }),
    }
}

#[cfg(feature = "sqlite")]
fn open_sqlite(config: &dyn ConfigPort) -> Result<Box<dyn CandleStore>, BacktestError> {
    use crate::adapters::sqlite_adapter::SqliteAdapter;

    Ok(Box::new(SqliteAdapter::from_config(config)?))
}

#[cfg(not(feature = "sqlite"))]
fn open_sqlite(_config: &dyn ConfigPort) -> Result<Box<dyn CandleStore>, BacktestError> {
    Err(sqlite_required())
}

#[cfg(not(feature = "sqlite"))]
fn sqlite_required() -> BacktestError {
    BacktestError::ConfigInvalid {
        section: "store".into(),
        key: "backend".into(),
        reason: "sqlite feature is required".into(),
    }
}

pub fn format_result(name: &str, pnl: f64, max_drawdown: f64, trades: usize) -> String {
    format!("{name} - PnL: {pnl:.2}% | Max Drawdown: {max_drawdown:.2}% | Trades: {trades}")
}

/// Load the market once, run each strategy over it, and return one report
/// line per strategy.
pub fn run_backtest_pipeline(
    store: &dyn CandleStore,
    bt_config: &BacktestConfig,
    kinds: &[StrategyKind],
    config: &dyn ConfigPort,
) -> Result<Vec<String>, BacktestError> {
    let mut backtest = Backtest::load(store, bt_config.clone())?;
    let mut lines = Vec::with_capacity(kinds.len());
    for kind in kinds {
        let strategy = build_strategy(*kind, config);
        tracing::info!(strategy = %strategy, "running backtest");
        backtest.execute_backtest(strategy.as_ref())?;
        lines.push(format_result(
            strategy.name(),
            backtest.pnl(),
            backtest.max_drawdown(),
            backtest.trade_count(),
        ));
    }
    Ok(lines)
}

fn run_backtest(
    config_path: &Path,
    overrides: BacktestOverrides<'_>,
    strategy_override: Option<&str>,
) -> Result<(), BacktestError> {
    let config = load_config(config_path)?;
    validate_backtest_config(&config)?;
    let bt_config = build_backtest_config(&config, overrides)?;
    let kinds = resolve_strategies(strategy_override, &config)?;
    let store = open_store(&config)?;

    for line in run_backtest_pipeline(store.as_ref(), &bt_config, &kinds, &config)? {
        println!("{line}");
    }
    Ok(())
}

pub fn run_dry_run(
    config_path: &Path,
    overrides: BacktestOverrides<'_>,
    strategy_override: Option<&str>,
) -> Result<(), BacktestError> {
    let config = load_config(config_path)?;
    validate_backtest_config(&config)?;
    let bt_config = build_backtest_config(&config, overrides)?;
    let kinds = resolve_strategies(strategy_override, &config)?;

    eprintln!("Config validated successfully");
    eprintln!(
        "\nMarket: {}.{} @ {}",
        bt_config.symbol, bt_config.exchange, bt_config.interval
    );
    eprintln!("Window: {} to {} (ms)", bt_config.start_ts, bt_config.end_ts);
    eprintln!("\nStrategies:");
    for kind in kinds {
        let strategy = build_strategy(kind, &config);
        strategy.validate()?;
        eprintln!("  {strategy}");
    }
    eprintln!("\nDry run complete: configuration is valid");
    Ok(())
}

fn range_arg(
    flag: Option<&str>,
    name: &str,
    configured: f64,
) -> Result<ParamRange, BacktestError> {
    match flag {
        Some(raw) => ParamRange::parse(name, raw),
        None => Ok(ParamRange::single(configured)),
    }
}

/// Sweep one strategy over an already loaded backtest. Entries come back ranked.
pub fn run_sweep_pipeline(
    backtest: &mut Backtest,
    kind: StrategyKind,
    args: &SweepArgs,
    config: &dyn ConfigPort,
) -> Result<Vec<SweepEntry>, BacktestError> {
    let mut entries = match kind {
        StrategyKind::TrendReversal => {
            let base = build_trend_reversal(config);
            sweep::sweep_trend_reversal(
                backtest,
                &range_arg(args.initial_af.as_deref(), "initial_af", base.initial_af)?,
                &range_arg(args.max_af.as_deref(), "max_af", base.max_af)?,
                &range_arg(args.increment.as_deref(), "increment", base.increment)?,
            )?
        }
        StrategyKind::MaCrossover => {
            let base = build_ma_crossover(config);
            sweep::sweep_ma_crossover(
                backtest,
                &range_arg(args.fast.as_deref(), "fast_period", base.fast_period as f64)?,
                &range_arg(args.slow.as_deref(), "slow_period", base.slow_period as f64)?,
            )?
        }
    };
    sweep::rank(&mut entries);
    Ok(entries)
}

fn run_sweep(
    config_path: &Path,
    strategy: &str,
    args: &SweepArgs,
    top: usize,
) -> Result<(), BacktestError> {
    let config = load_config(config_path)?;
    validate_backtest_config(&config)?;
    let kind: StrategyKind = strategy.parse()?;
    let bt_config = build_backtest_config(&config, BacktestOverrides::default())?;
    let store = open_store(&config)?;
    let mut backtest = Backtest::load(store.as_ref(), bt_config)?;

    let entries = run_sweep_pipeline(&mut backtest, kind, args, &config)?;
    if entries.is_empty() {
        eprintln!("No parameter combinations to evaluate");
        return Ok(());
    }

    eprintln!("\n=== Top {} of {} ===", top.min(entries.len()), entries.len());
    for (i, entry) in entries.iter().take(top).enumerate() {
        println!(
            "{:>3}. {}",
            i + 1,
            format_result(&entry.label, entry.pnl, entry.max_drawdown, entry.trades)
        );
    }

    eprintln!("\n=== Pareto Front (PnL vs Max Drawdown) ===");
    for entry in sweep::pareto_front(&entries) {
        println!(
            "  * {}",
            format_result(&entry.label, entry.pnl, entry.max_drawdown, entry.trades)
        );
    }
    Ok(())
}

#[cfg(feature = "sqlite")]
fn run_import(
    config_path: &Path,
    exchange: &str,
    symbol: &str,
    file: &Path,
) -> Result<(), BacktestError> {
    use crate::adapters::sqlite_adapter::SqliteAdapter;

    let config = load_config(config_path)?;
    let candles = read_candles_file(file)?;
    let adapter = SqliteAdapter::create_from_config(&config)?;
    let symbol = symbol.trim().to_uppercase();
    let rows = adapter.insert_candles(exchange, &symbol, &candles)?;
    eprintln!("Imported {rows} candles into {symbol}.{exchange}");
    Ok(())
}

#[cfg(not(feature = "sqlite"))]
fn run_import(
    config_path: &Path,
    _exchange: &str,
    _symbol: &str,
    file: &Path,
) -> Result<(), BacktestError> {
    load_config(config_path)?;
    read_candles_file(file)?;
    Err(sqlite_required())
}

fn run_list_symbols(exchange: &str, config_path: &Path) -> Result<(), BacktestError> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;
    let symbols = store.list_symbols(exchange)?;

    if symbols.is_empty() {
        eprintln!("No symbols found for exchange {exchange}");
    } else {
        for symbol in &symbols {
            println!("{symbol}");
        }
        eprintln!("{} symbols found", symbols.len());
    }
    Ok(())
}

fn format_ts(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ms.to_string())
}

fn run_info(
    exchange: Option<&str>,
    symbol: Option<&str>,
    config_path: &Path,
) -> Result<(), BacktestError> {
    let config = load_config(config_path)?;
    let exchange = match exchange {
        Some(e) => e.to_string(),
        None => config.require_string("backtest", "exchange")?,
    };
    let store = open_store(&config)?;

    let symbols = match symbol {
        Some(s) => vec![s.trim().to_uppercase()],
        None => store.list_symbols(&exchange)?,
    };

    for s in &symbols {
        match store.get_data_range(&exchange, s) {
            Ok(Some((first, last, count))) => {
                println!(
                    "{s}.{exchange}: {count} candles, {} to {}",
                    format_ts(first),
                    format_ts(last)
                );
            }
            Ok(None) => eprintln!("{s}.{exchange}: no data found"),
            Err(e) => eprintln!("error querying {s}.{exchange}: {e}"),
        }
    }
    Ok(())
}
