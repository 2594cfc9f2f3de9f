//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report::JsonReport;
use crate::adapters::static_predictor::StaticPredictor;
use crate::adapters::text_report::TextReport;
use crate::domain::analysis::Analyzer;
use crate::domain::backtest::{SignalMode, Simulator};
use crate::domain::config_validation::EngineConfig;
use crate::domain::error::EngineError;
use crate::domain::external::{Component, ExternalScore};
use crate::domain::ohlcv::PriceBar;
use crate::ports::data_port::DataPort;
use crate::ports::predictor_port::{Predictor, collect_scores};
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "equiscore",
    about = "Trading signals, backtests and hybrid stock scores"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Where the price series comes from.
#[derive(clap::Args, Debug, Clone)]
pub struct DataArgs {
    /// CSV file, or a directory of `{SYMBOL}.csv` files
    #[arg(short, long)]
    pub data: PathBuf,
    /// Symbol to load; defaults to the CSV file name
    #[arg(long)]
    pub symbol: Option<String>,
    /// INI configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Print machine-readable JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a price series against one strategy or the ensemble
    Backtest {
        #[command(flatten)]
        data: DataArgs,
        /// rsi, macd, ma-crossover, bollinger or ensemble
        #[arg(short, long, default_value = "ensemble")]
        strategy: SignalMode,
    },
    /// Every strategy's signal at the latest bar, plus the consensus
    Signals {
        #[command(flatten)]
        data: DataArgs,
        /// Hold every signal when this score is below the configured minimum
        #[arg(long)]
        technical_score: Option<f64>,
    },
    /// Blend the technical score with external predictions
    Score {
        #[command(flatten)]
        data: DataArgs,
        /// Probability of an up move, 0 to 1
        #[arg(long)]
        ml_probability: Option<f64>,
        /// Projected price change in percent
        #[arg(long, allow_hyphen_values = true)]
        prophet_change: Option<f64>,
        /// News sentiment polarity, -1 to 1
        #[arg(long, allow_hyphen_values = true)]
        sentiment: Option<f64>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List the symbols available under a data path
    ListSymbols {
        #[arg(short, long)]
        data: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match execute(cli.command, &mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Run one command, writing its report to `out`.
pub fn execute(command: Command, out: &mut dyn Write) -> Result<(), EngineError> {
    match command {
        Command::Backtest { data, strategy } => run_backtest(&data, strategy, out),
        Command::Signals {
            data,
            technical_score,
        } => run_signals(&data, technical_score, out),
        Command::Score {
            data,
            ml_probability,
            prophet_change,
            sentiment,
        } => run_score(&data, ml_probability, prophet_change, sentiment, out),
        Command::Validate { config } => run_validate(&config, out),
        Command::ListSymbols { data } => run_list_symbols(&data, out),
    }
}

pub fn load_config(path: Option<&Path>) -> Result<EngineConfig, EngineError> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "loading config");
            EngineConfig::load(&FileConfigAdapter::from_file(path)?)
        }
        None => Ok(EngineConfig::default()),
    }
}

fn reporter(json: bool) -> Box<dyn ReportPort> {
    if json {
        return Box::new(JsonReport);
    }
    Box::new(TextReport)
}

fn resolve_symbol(adapter: &CsvAdapter, args: &DataArgs) -> Result<String, EngineError> {
    args.symbol
        .clone()
        .or_else(|| adapter.default_symbol())
        .ok_or_else(|| EngineError::ConfigMissing {
            section: "command line".to_string(),
            key: "symbol".to_string(),
        })
}

fn load_bars(
    args: &DataArgs,
    config: &EngineConfig,
    apply_date_range: bool,
) -> Result<(String, Vec<PriceBar>), EngineError> {
    let adapter = CsvAdapter::new(args.data.clone());
    let symbol = resolve_symbol(&adapter, args)?;
    let (start, end) = if apply_date_range {
        (config.backtest.start_date, config.backtest.end_date)
    } else {
        (None, None)
    };
    let bars = adapter.fetch_bars(&symbol, start, end)?;
    if bars.is_empty() {
        return Err(EngineError::NoData { symbol });
    }
    info!(symbol = %symbol, bars = bars.len(), "price series loaded");
    Ok((symbol, bars))
}

fn run_backtest(args: &DataArgs, mode: SignalMode, out: &mut dyn Write) -> Result<(), EngineError> {
    let config = load_config(args.config.as_deref())?;
    let (symbol, bars) = load_bars(args, &config, true)?;

    let simulator = Simulator::new(config.strategy, config.backtest)?;
    let result = simulator.run(&symbol, &bars, mode)?;
    reporter(args.json).write_backtest(&result, out)
}

fn run_signals(
    args: &DataArgs,
    technical_score: Option<f64>,
    out: &mut dyn Write,
) -> Result<(), EngineError> {
    let config = load_config(args.config.as_deref())?;
    let (symbol, bars) = load_bars(args, &config, false)?;

    let analyzer = Analyzer::new(config.strategy, config.weights, config.confidence)?;
    let recommendation = analyzer.signals(&symbol, &bars, technical_score)?;
    reporter(args.json).write_recommendation(&recommendation, out)
}

fn run_score(
    args: &DataArgs,
    ml_probability: Option<f64>,
    prophet_change: Option<f64>,
    sentiment: Option<f64>,
    out: &mut dyn Write,
) -> Result<(), EngineError> {
    let config = load_config(args.config.as_deref())?;
    let (symbol, bars) = load_bars(args, &config, false)?;

    let predictors = [
        StaticPredictor::from_option(
            Component::MlPrediction,
            ml_probability.map(ExternalScore::from_ml_probability),
        ),
        StaticPredictor::from_option(
            Component::Prophet,
            prophet_change.map(ExternalScore::from_prophet_change),
        ),
        StaticPredictor::from_option(
            Component::Sentiment,
            sentiment.map(ExternalScore::from_sentiment_polarity),
        ),
    ];
    let predictors: Vec<&dyn Predictor> = predictors.iter().map(|p| p as &dyn Predictor).collect();
    let externals = collect_scores(&predictors, &symbol, &bars);

    let analyzer = Analyzer::new(config.strategy, config.weights, config.confidence)?;
    let score = analyzer.score(&symbol, &bars, &externals)?;
    info!(symbol = %symbol, final_score = score.final_score, rating = %score.rating, "scored");
    reporter(args.json).write_score(&score, out)
}

fn run_validate(path: &Path, out: &mut dyn Write) -> Result<(), EngineError> {
    let config = load_config(Some(path))?;
    let s = &config.strategy;
    let b = &config.backtest;
    let w = &config.weights;

    writeln!(out, "Configuration OK: {}", path.display())?;
    writeln!(
        out,
        "  strategy:  RSI {}/{}/{}  MACD {}/{}/{}  MA {}/{}  BB {}x{}",
        s.rsi_period,
        s.rsi_oversold,
        s.rsi_overbought,
        s.macd_fast,
        s.macd_slow,
        s.macd_signal,
        s.ma_fast_window,
        s.ma_slow_window,
        s.bollinger_window,
        s.bollinger_k
    )?;
    writeln!(
        out,
        "  risk:      stop {}%  target {}%  trailing {}  risk/trade {}%  max open {}",
        s.stop_loss_pct,
        s.take_profit_pct,
        s.trailing_stop_pct
            .map(|t| format!("{}%", t))
            .unwrap_or_else(|| "off".to_string()),
        s.risk_per_trade_pct,
        s.max_open_trades
    )?;
    writeln!(
        out,
        "  backtest:  capital {}  commission {} + {}%  slippage {}%  shorting {}",
        b.initial_capital,
        b.commission_per_trade,
        b.commission_pct,
        b.slippage_pct,
        if b.allow_shorting { "on" } else { "off" }
    )?;
    writeln!(
        out,
        "  weights:   technical {}  ml {}  prophet {}  sentiment {}",
        w.technical, w.ml_prediction, w.prophet, w.sentiment
    )?;
    Ok(())
}

fn run_list_symbols(data: &Path, out: &mut dyn Write) -> Result<(), EngineError> {
    let adapter = CsvAdapter::new(data.to_path_buf());
    let symbols = adapter.list_symbols()?;
    if symbols.is_empty() {
        eprintln!("No symbols found under {}", data.display());
    }
    for symbol in &symbols {
        writeln!(out, "{}", symbol)?;
    }
    Ok(())
}
