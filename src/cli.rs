//! CLI definition and dispatch.
//!
//! Settings are read from an optional INI file (sections `[data]`,
//! `[backtest]`, `[strategy]`) and then overridden by command-line flags.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{
    BacktestConfig, BacktestResult, Backtester, DEFAULT_COMMISSION_RATE, DEFAULT_INITIAL_CAPITAL,
};
use crate::domain::config_validation::validate_strategy;
use crate::domain::error::FlowtraderError;
use crate::domain::indicator::compute_indicators;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::strategy::{ConsensusParams, IndicatorValues, MfiHunterParams, StrategyKind};
use crate::domain::sweep::{self, SweepGrid};
use crate::ports::config_port::{ConfigPort, parse_bool};
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "flowtrader", about = "MFI/RSI backtester for Taiwan-listed equities")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command that loads bars.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// INI configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Directory holding <SYMBOL>_history.csv files
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    /// Symbol to load, e.g. 2337.TW
    #[arg(long)]
    pub symbol: Option<String>,
    /// mfi_hunter or rsi_mfi_consensus
    #[arg(long)]
    pub strategy: Option<String>,
    #[arg(long)]
    pub mfi_period: Option<usize>,
    #[arg(long)]
    pub buy_threshold: Option<f64>,
    #[arg(long)]
    pub sell_threshold: Option<f64>,
    #[arg(long)]
    pub initial_capital: Option<Decimal>,
    #[arg(long)]
    pub commission_rate: Option<Decimal>,
    /// Close any open position at the last bar
    #[arg(long)]
    pub liquidate: bool,
}

/// Inclusive `start:end` threshold range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdRange {
    pub start: f64,
    pub end: f64,
}

impl FromStr for ThresholdRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once(':')
            .ok_or_else(|| format!("expected START:END, got '{s}'"))?;
        let parse = |v: &str| match v.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(n),
            Ok(_) => Err(format!("'{v}' is not a finite number")),
            Err(_) => Err(format!("'{v}' is not a number")),
        };
        let range = ThresholdRange {
            start: parse(start)?,
            end: parse(end)?,
        };
        if range.start > range.end {
            return Err(format!("range start {} exceeds end {}", range.start, range.end));
        }
        Ok(range)
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest over one symbol's history
    Backtest {
        #[command(flatten)]
        args: RunArgs,
        /// Directory for equity_curve.csv and trades.csv
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Classify the latest bar (STRONG BUY / BUY / SELL / HOLD)
    Signal {
        #[command(flatten)]
        args: RunArgs,
    },
    /// Backtest every buy/sell threshold pair in a grid
    Sweep {
        #[command(flatten)]
        args: RunArgs,
        #[arg(long, default_value = "20:40")]
        buy_range: ThresholdRange,
        #[arg(long, default_value = "70:90")]
        sell_range: ThresholdRange,
        #[arg(long, default_value_t = 5.0)]
        step: f64,
        /// Number of ranked results to print
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols with cached history
    ListSymbols {
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Everything a run needs, resolved from config file and flags.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub data_dir: PathBuf,
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub backtest: BacktestConfig,
    pub strategy: StrategyKind,
}

pub fn run(cli: Cli) -> ExitCode {
    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Dispatch one command.
pub fn execute(command: Command) -> Result<(), FlowtraderError> {
    match command {
        Command::Backtest { args, output } => run_backtest(&args, output.as_ref()),
        Command::Signal { args } => run_signal(&args),
        Command::Sweep {
            args,
            buy_range,
            sell_range,
            step,
            top,
        } => run_sweep(&args, buy_range, sell_range, step, top),
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { data_dir, config } => {
            run_list_symbols(data_dir.as_ref(), config.as_ref())
        }
    }
}

pub fn load_config(path: Option<&PathBuf>) -> Result<FileConfigAdapter, FlowtraderError> {
    match path {
        Some(path) => {
            eprintln!("Loading config from {}", path.display());
            FileConfigAdapter::from_file(path)
        }
        None => Ok(FileConfigAdapter::empty()),
    }
}

fn get_f64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, FlowtraderError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(FlowtraderError::invalid(
                section,
                key,
                format!("'{raw}' is not a number"),
            )),
        },
    }
}

fn get_level(
    config: &dyn ConfigPort,
    key: &str,
    default: f64,
) -> Result<f64, FlowtraderError> {
    get_f64(config, "strategy", key, default)
}

fn get_flag(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: bool,
) -> Result<bool, FlowtraderError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => parse_bool(&raw).ok_or_else(|| {
            FlowtraderError::invalid(section, key, format!("'{raw}' is not a boolean"))
        }),
    }
}

fn get_decimal(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: Decimal,
) -> Result<Decimal, FlowtraderError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => Decimal::from_str(raw.trim()).map_err(|_| {
            FlowtraderError::invalid(section, key, format!("'{raw}' is not a decimal number"))
        }),
    }
}

fn get_period(
    config: &dyn ConfigPort,
    key: &str,
    default: usize,
) -> Result<usize, FlowtraderError> {
    match config.get_string("strategy", key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
            FlowtraderError::invalid("strategy", key, format!("'{raw}' is not a positive integer"))
        }),
    }
}

fn get_date(
    config: &dyn ConfigPort,
    key: &str,
    default: NaiveDate,
) -> Result<NaiveDate, FlowtraderError> {
    match config.get_string("data", key) {
        None => Ok(default),
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
            FlowtraderError::invalid("data", key, "invalid date format (expected YYYY-MM-DD)")
        }),
    }
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, FlowtraderError> {
    Ok(BacktestConfig {
        initial_capital: get_decimal(
            config,
            "backtest",
            "initial_capital",
            DEFAULT_INITIAL_CAPITAL,
        )?,
        commission_rate: get_decimal(
            config,
            "backtest",
            "commission_rate",
            DEFAULT_COMMISSION_RATE,
        )?,
        liquidate_at_end: get_flag(config, "backtest", "liquidate_at_end", false)?,
        risk_free_rate: get_f64(config, "backtest", "risk_free_rate", 0.0)?,
    })
}

/// Build the strategy named by `name_override`, `[strategy] name`, or
/// `mfi_hunter`, with parameters from `[strategy]` over its defaults.
pub fn build_strategy(
    config: &dyn ConfigPort,
    name_override: Option<&str>,
) -> Result<StrategyKind, FlowtraderError> {
    let name = name_override
        .map(str::to_string)
        .or_else(|| config.get_string("strategy", "name"))
        .unwrap_or_else(|| "mfi_hunter".to_string());
    let base: StrategyKind = name
        .parse()
        .map_err(|reason: String| FlowtraderError::invalid("strategy", "name", reason))?;

    let strategy = match base {
        StrategyKind::MfiHunter(d) => StrategyKind::MfiHunter(MfiHunterParams {
            mfi_period: get_period(config, "mfi_period", d.mfi_period)?,
            buy_threshold: get_level(config, "buy_threshold", d.buy_threshold)?,
            sell_threshold: get_level(config, "sell_threshold", d.sell_threshold)?,
            strong_buy_threshold: get_level(
                config,
                "strong_buy_threshold",
                d.strong_buy_threshold,
            )?,
            strong_buy_size: get_decimal(
                config,
                "strategy",
                "strong_buy_size",
                d.strong_buy_size,
            )?,
            buy_size: get_decimal(config, "strategy", "buy_size", d.buy_size)?,
            position_cap: get_decimal(
                config,
                "strategy",
                "position_cap_fraction",
                d.position_cap,
            )?,
        }),
        StrategyKind::RsiMfiConsensus(d) => StrategyKind::RsiMfiConsensus(ConsensusParams {
            mfi_period: get_period(config, "mfi_period", d.mfi_period)?,
            rsi_period: get_period(config, "rsi_period", d.rsi_period)?,
            mfi_oversold: get_level(config, "buy_threshold", d.mfi_oversold)?,
            mfi_overbought: get_level(config, "sell_threshold", d.mfi_overbought)?,
            rsi_oversold: get_level(config, "rsi_oversold", d.rsi_oversold)?,
            rsi_overbought: get_level(config, "rsi_overbought", d.rsi_overbought)?,
            buy_size: get_decimal(config, "strategy", "buy_size", d.buy_size)?,
            position_cap: get_decimal(
                config,
                "strategy",
                "position_cap_fraction",
                d.position_cap,
            )?,
        }),
    };
    Ok(strategy)
}

fn apply_strategy_overrides(strategy: &mut StrategyKind, args: &RunArgs) {
    match strategy {
        StrategyKind::MfiHunter(p) => {
            if let Some(v) = args.mfi_period {
                p.mfi_period = v;
            }
            if let Some(v) = args.buy_threshold {
                p.buy_threshold = v;
            }
            if let Some(v) = args.sell_threshold {
                p.sell_threshold = v;
            }
        }
        StrategyKind::RsiMfiConsensus(p) => {
            if let Some(v) = args.mfi_period {
                p.mfi_period = v;
            }
            if let Some(v) = args.buy_threshold {
                p.mfi_oversold = v;
            }
            if let Some(v) = args.sell_threshold {
                p.mfi_overbought = v;
            }
        }
    }
}

pub fn build_settings(
    config: &dyn ConfigPort,
    args: &RunArgs,
) -> Result<RunSettings, FlowtraderError> {
    let data_dir = args
        .data_dir
        .clone()
        .or_else(|| config.get_string("data", "dir").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));
    let symbol = args
        .symbol
        .clone()
        .or_else(|| config.get_string("data", "symbol"))
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| FlowtraderError::ConfigMissing {
            section: "data".into(),
            key: "symbol".into(),
        })?;

    let mut backtest = build_backtest_config(config)?;
    if let Some(v) = args.initial_capital {
        backtest.initial_capital = v;
    }
    if let Some(v) = args.commission_rate {
        backtest.commission_rate = v;
    }
    if args.liquidate {
        backtest.liquidate_at_end = true;
    }

    let mut strategy = build_strategy(config, args.strategy.as_deref())?;
    apply_strategy_overrides(&mut strategy, args);

    Ok(RunSettings {
        data_dir,
        symbol,
        start_date: get_date(config, "start_date", NaiveDate::MIN)?,
        end_date: get_date(config, "end_date", NaiveDate::MAX)?,
        backtest,
        strategy,
    })
}

fn resolve_settings(args: &RunArgs) -> Result<RunSettings, FlowtraderError> {
    let config = load_config(args.config.as_ref())?;
    build_settings(&config, args)
}

/// Fetch the configured symbol's bars. Fails with `NoData` when the range
/// is empty.
pub fn load_bars(
    data_port: &dyn DataPort,
    settings: &RunSettings,
) -> Result<Vec<OhlcvBar>, FlowtraderError> {
    let bars = data_port.fetch_ohlcv(&settings.symbol, settings.start_date, settings.end_date)?;
    let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
        return Err(FlowtraderError::NoData {
            symbol: settings.symbol.clone(),
        });
    };
    tracing::info!(
        symbol = %settings.symbol,
        bars = bars.len(),
        first = %first.date,
        last = %last.date,
        "loaded history"
    );
    Ok(bars)
}

/// Load bars through `data_port` and backtest them, optionally writing a
/// report through `report_port`.
pub fn backtest_symbol(
    data_port: &dyn DataPort,
    report_port: Option<(&dyn ReportPort, &str)>,
    settings: &RunSettings,
) -> Result<(Vec<OhlcvBar>, BacktestResult), FlowtraderError> {
    let backtester = Backtester::new(settings.backtest.clone(), settings.strategy.clone())?;
    let bars = load_bars(data_port, settings)?;

    eprintln!(
        "Running backtest: {} ({}), {} bars",
        settings.symbol,
        settings.strategy.name(),
        bars.len()
    );
    let result = backtester.run(&bars)?;

    if let Some((port, output_path)) = report_port {
        port.write(&result, output_path)?;
        eprintln!("\nReport written to: {}", output_path);
    }
    Ok((bars, result))
}

fn run_backtest(args: &RunArgs, output_path: Option<&PathBuf>) -> Result<(), FlowtraderError> {
    let settings = resolve_settings(args)?;
    let data_port = CsvAdapter::new(settings.data_dir.clone());
    let output = output_path.map(|p| p.display().to_string());
    let report = output
        .as_deref()
        .map(|path| (&CsvReportAdapter as &dyn ReportPort, path));

    let (bars, result) = backtest_symbol(&data_port, report, &settings)?;
    print_summary(&settings, &bars, &result);
    Ok(())
}

fn print_summary(settings: &RunSettings, bars: &[OhlcvBar], result: &BacktestResult) {
    let stats = &result.stats;
    eprintln!("\n=== Results: {} ===", settings.symbol);
    if let (Some(first), Some(last)) = (bars.first(), bars.last()) {
        eprintln!("Period:           {} to {}", first.date, last.date);
    }
    eprintln!(
        "Bars:             {} ({} with signals)",
        result.total_bars, result.valid_bars
    );
    eprintln!("Final Equity:     {}", result.final_equity.round_dp(2));
    eprintln!("Equity Peak:      {}", result.equity_peak.round_dp(2));
    eprintln!("Total Return:     {:.2}%", stats.return_pct);
    eprintln!("Annualized:       {:.2}%", stats.annualized_return_pct);
    eprintln!("Max Drawdown:     -{:.1}%", stats.max_drawdown_pct);
    eprintln!("Sharpe Ratio:     {:.2}", stats.sharpe_ratio);
    eprintln!("Sortino Ratio:    {:.2}", stats.sortino_ratio);
    eprintln!("Calmar Ratio:     {:.2}", stats.calmar_ratio);
    eprintln!("Total Trades:     {}", stats.num_trades);
    eprintln!("Win Rate:         {:.1}%", stats.win_rate_pct);
    eprintln!("Profit Factor:    {:.2}", stats.profit_factor);

    match &result.open_position {
        Some(pos) => {
            eprintln!(
                "Open Position:    {} shares @ {} (since {})",
                pos.shares.round_dp(2),
                pos.avg_entry_price.round_dp(2),
                pos.entry_date
            );
            if let Some(close) = bars.last().and_then(|b| Decimal::from_f64(b.close)) {
                eprintln!("Unrealized P&L:   {}", pos.unrealized_pnl(close).round_dp(2));
            }
        }
        None if result.liquidated => eprintln!("Open Position:    liquidated at last close"),
        None => eprintln!("Open Position:    none"),
    }
}

fn run_signal(args: &RunArgs) -> Result<(), FlowtraderError> {
    let settings = resolve_settings(args)?;
    validate_strategy(&settings.strategy)?;
    let bars = load_bars(&CsvAdapter::new(settings.data_dir.clone()), &settings)?;

    let required = settings.strategy.required_indicators();
    let indicators = compute_indicators(&bars, &required);
    let last = bars.len() - 1;
    let values = IndicatorValues::at(&indicators, &required, last);
    let signal = settings.strategy.signal(&values);

    println!("Symbol:    {}", settings.symbol);
    println!("Date:      {}", bars[last].date);
    println!("Close:     {:.2}", bars[last].close);
    for indicator_type in &required {
        let value = indicators
            .get(indicator_type)
            .and_then(|s| s.value_at(last))
            .map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"));
        println!("{:<10} {}", format!("{indicator_type}:"), value);
    }
    println!("Signal:    {signal}");
    Ok(())
}

fn run_sweep(
    args: &RunArgs,
    buy_range: ThresholdRange,
    sell_range: ThresholdRange,
    step: f64,
    top: usize,
) -> Result<(), FlowtraderError> {
    let settings = resolve_settings(args)?;
    let grid = SweepGrid::from_ranges(
        (buy_range.start, buy_range.end),
        (sell_range.start, sell_range.end),
        step,
    )?;
    let bars = load_bars(&CsvAdapter::new(settings.data_dir.clone()), &settings)?;

    eprintln!(
        "Sweeping {} threshold pairs for {} ({})",
        grid.pairs().len(),
        settings.symbol,
        settings.strategy.name()
    );
    let mut entries = sweep::sweep(&bars, &settings.backtest, &settings.strategy, &grid)?;
    sweep::rank_by_return(&mut entries);

    println!(
        "{:>6} {:>6} {:>10} {:>10} {:>7} {:>8}",
        "buy", "sell", "return%", "maxdd%", "trades", "win%"
    );
    for entry in entries.iter().take(top) {
        let stats = &entry.result.stats;
        println!(
            "{:>6.1} {:>6.1} {:>10.2} {:>10.2} {:>7} {:>8.1}",
            entry.buy_threshold,
            entry.sell_threshold,
            stats.return_pct,
            stats.max_drawdown_pct,
            stats.num_trades,
            stats.win_rate_pct
        );
    }
    Ok(())
}

fn run_validate(config_path: &PathBuf) -> Result<(), FlowtraderError> {
    let config = load_config(Some(config_path))?;
    let backtest = build_backtest_config(&config)?;
    let strategy = build_strategy(&config, None)?;
    let backtester = Backtester::new(backtest, strategy)?;

    eprintln!("\nStrategy: {}", backtester.strategy().name());
    for indicator_type in backtester.strategy().required_indicators() {
        eprintln!("  indicator: {indicator_type}");
    }
    eprintln!(
        "Capital:  {}  commission: {}",
        backtester.config().initial_capital,
        backtester.config().commission_rate
    );
    eprintln!("\nConfiguration is valid.");
    Ok(())
}

fn run_list_symbols(
    data_dir: Option<&PathBuf>,
    config_path: Option<&PathBuf>,
) -> Result<(), FlowtraderError> {
    let config = load_config(config_path)?;
    let dir = data_dir
        .cloned()
        .or_else(|| config.get_string("data", "dir").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));

    let symbols = CsvAdapter::new(dir.clone()).list_symbols()?;
    if symbols.is_empty() {
        eprintln!("No symbols found in {}", dir.display());
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    fn args() -> RunArgs {
        RunArgs::default()
    }

    #[test]
    fn backtest_config_defaults() {
        let config = build_backtest_config(&make_config("")).unwrap();
        assert_eq!(config, BacktestConfig::default());
    }

    #[test]
    fn backtest_config_from_ini() {
        let config = build_backtest_config(&make_config(
            "[backtest]\ninitial_capital = 500000\ncommission_rate = 0.001\nliquidate_at_end = yes\nrisk_free_rate = 0.02\n",
        ))
        .unwrap();
        assert_eq!(config.initial_capital, dec!(500000));
        assert_eq!(config.commission_rate, dec!(0.001));
        assert!(config.liquidate_at_end);
        assert_eq!(config.risk_free_rate, 0.02);
    }

    #[test]
    fn backtest_config_rejects_bad_decimal() {
        let err = build_backtest_config(&make_config("[backtest]\ninitial_capital = lots\n"))
            .unwrap_err();
        assert!(
            matches!(err, FlowtraderError::ConfigInvalid { key, .. } if key == "initial_capital")
        );
    }

    #[test]
    fn backtest_config_rejects_bad_risk_free_rate() {
        for raw in ["abc", "inf", "NaN"] {
            let err = build_backtest_config(&make_config(&format!(
                "[backtest]\nrisk_free_rate = {raw}\n"
            )))
            .unwrap_err();
            assert!(
                matches!(&err, FlowtraderError::ConfigInvalid { key, .. } if key == "risk_free_rate"),
                "{raw}: {err}"
            );
        }
    }

    #[test]
    fn backtest_config_rejects_bad_liquidate_flag() {
        let err = build_backtest_config(&make_config("[backtest]\nliquidate_at_end = maybe\n"))
            .unwrap_err();
        assert!(
            matches!(err, FlowtraderError::ConfigInvalid { key, .. } if key == "liquidate_at_end")
        );
    }

    #[test]
    fn backtest_config_flag_spellings() {
        let on = build_backtest_config(&make_config("[backtest]\nliquidate_at_end = On\n"))
            .unwrap();
        assert!(on.liquidate_at_end);
        let off = build_backtest_config(&make_config("[backtest]\nliquidate_at_end = 0\n"))
            .unwrap();
        assert!(!off.liquidate_at_end);
        assert_eq!(off.risk_free_rate, 0.0);
    }

    #[test]
    fn strategy_defaults_to_hunter() {
        let strategy = build_strategy(&make_config(""), None).unwrap();
        assert_eq!(strategy, StrategyKind::MfiHunter(MfiHunterParams::default()));
    }

    #[test]
    fn strategy_from_ini() {
        let strategy = build_strategy(
            &make_config(
                "[strategy]\nname = mfi_hunter\nmfi_period = 14\nbuy_threshold = 30\nsell_threshold = 80\nposition_cap_fraction = 0.5\n",
            ),
            None,
        )
        .unwrap();
        match strategy {
            StrategyKind::MfiHunter(p) => {
                assert_eq!(p.mfi_period, 14);
                assert_eq!(p.buy_threshold, 30.0);
                assert_eq!(p.sell_threshold, 80.0);
                assert_eq!(p.strong_buy_threshold, 20.0);
                assert_eq!(p.position_cap, dec!(0.5));
            }
            other => panic!("unexpected strategy {other:?}"),
        }
    }

    #[test]
    fn consensus_reads_rsi_levels() {
        let strategy = build_strategy(
            &make_config("[strategy]\nname = rsi_mfi_consensus\nrsi_oversold = 25\nbuy_threshold = 30\n"),
            None,
        )
        .unwrap();
        match strategy {
            StrategyKind::RsiMfiConsensus(p) => {
                assert_eq!(p.rsi_oversold, 25.0);
                assert_eq!(p.rsi_overbought, 70.0);
                assert_eq!(p.mfi_oversold, 30.0);
            }
            other => panic!("unexpected strategy {other:?}"),
        }
    }

    #[test]
    fn unknown_strategy_name_is_invalid() {
        let err = build_strategy(&make_config("[strategy]\nname = macd\n"), None).unwrap_err();
        assert!(matches!(err, FlowtraderError::ConfigInvalid { key, .. } if key == "name"));
    }

    #[test]
    fn name_override_beats_config() {
        let strategy = build_strategy(
            &make_config("[strategy]\nname = mfi_hunter\n"),
            Some("rsi_mfi_consensus"),
        )
        .unwrap();
        assert_eq!(strategy.name(), "rsi_mfi_consensus");
    }

    #[test]
    fn negative_period_is_invalid() {
        let err =
            build_strategy(&make_config("[strategy]\nmfi_period = -3\n"), None).unwrap_err();
        assert!(matches!(err, FlowtraderError::ConfigInvalid { key, .. } if key == "mfi_period"));
    }

    #[test]
    fn non_numeric_level_is_invalid() {
        let err = build_strategy(&make_config("[strategy]\nsell_threshold = high\n"), None)
            .unwrap_err();
        assert!(
            matches!(err, FlowtraderError::ConfigInvalid { key, .. } if key == "sell_threshold")
        );
    }

    #[test]
    fn settings_require_symbol() {
        let err = build_settings(&make_config(""), &args()).unwrap_err();
        assert!(matches!(err, FlowtraderError::ConfigMissing { key, .. } if key == "symbol"));
    }

    #[test]
    fn settings_from_config_and_flags() {
        let config = make_config(
            "[data]\ndir = /data\nsymbol = 2337.TW\nstart_date = 2024-01-01\n\n[backtest]\ninitial_capital = 200000\n",
        );
        let overrides = RunArgs {
            buy_threshold: Some(25.0),
            commission_rate: Some(dec!(0)),
            liquidate: true,
            ..args()
        };
        let settings = build_settings(&config, &overrides).unwrap();

        assert_eq!(settings.data_dir, PathBuf::from("/data"));
        assert_eq!(settings.symbol, "2337.TW");
        assert_eq!(
            settings.start_date,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
        assert_eq!(settings.end_date, NaiveDate::MAX);
        assert_eq!(settings.backtest.initial_capital, dec!(200000));
        assert_eq!(settings.backtest.commission_rate, Decimal::ZERO);
        assert!(settings.backtest.liquidate_at_end);
        match settings.strategy {
            StrategyKind::MfiHunter(p) => assert_eq!(p.buy_threshold, 25.0),
            other => panic!("unexpected strategy {other:?}"),
        }
    }

    #[test]
    fn settings_reject_bad_date() {
        let config = make_config("[data]\nsymbol = X\nend_date = 2024/12/31\n");
        let err = build_settings(&config, &args()).unwrap_err();
        assert!(matches!(err, FlowtraderError::ConfigInvalid { key, .. } if key == "end_date"));
    }

    #[test]
    fn threshold_range_parsing() {
        assert_eq!(
            "20:40".parse::<ThresholdRange>().unwrap(),
            ThresholdRange {
                start: 20.0,
                end: 40.0
            }
        );
        assert!("40:20".parse::<ThresholdRange>().is_err());
        assert!("20-40".parse::<ThresholdRange>().is_err());
        assert!("a:40".parse::<ThresholdRange>().is_err());
    }

    #[test]
    fn threshold_range_rejects_non_finite() {
        for raw in ["70:inf", "nan:40", "-inf:40", "20:infinity"] {
            let err = raw.parse::<ThresholdRange>().unwrap_err();
            assert!(err.contains("not a finite number"), "{raw}: {err}");
        }
    }

    #[test]
    fn sweep_rejects_oversized_grid() {
        let err = execute(Command::Sweep {
            args: RunArgs {
                data_dir: Some(PathBuf::from("/nonexistent")),
                symbol: Some("2337.TW".into()),
                ..RunArgs::default()
            },
            buy_range: "0:100".parse().unwrap(),
            sell_range: "0:100".parse().unwrap(),
            step: 1e-12,
            top: 10,
        })
        .unwrap_err();
        assert!(
            matches!(&err, FlowtraderError::ConfigInvalid { key, .. } if key == "step"),
            "{err}"
        );
    }

    #[test]
    fn cli_parses_backtest_flags() {
        let cli = Cli::try_parse_from([
            "flowtrader",
            "backtest",
            "--symbol",
            "2337.TW",
            "--mfi-period",
            "14",
            "--initial-capital",
            "250000",
            "--liquidate",
            "-o",
            "out",
        ])
        .unwrap();
        match cli.command {
            Command::Backtest { args, output } => {
                assert_eq!(args.symbol.as_deref(), Some("2337.TW"));
                assert_eq!(args.mfi_period, Some(14));
                assert_eq!(args.initial_capital, Some(dec!(250000)));
                assert!(args.liquidate);
                assert_eq!(output, Some(PathBuf::from("out")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn cli_parses_sweep_defaults() {
        let cli = Cli::try_parse_from(["flowtrader", "sweep", "--symbol", "X"]).unwrap();
        match cli.command {
            Command::Sweep {
                buy_range,
                sell_range,
                step,
                top,
                ..
            } => {
                assert_eq!(buy_range.start, 20.0);
                assert_eq!(sell_range.end, 90.0);
                assert_eq!(step, 5.0);
                assert_eq!(top, 10);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
