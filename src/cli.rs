//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::{validate_rotation_config, SECTION};
use crate::domain::engine::{
    RebalancingEngine, RotationConfig, SimulationResult, DEFAULT_DELISTING_PENALTY,
    DEFAULT_FEE_RATE, DEFAULT_INITIAL_CAPITAL, DEFAULT_TOP_N,
};
use crate::domain::error::RotatorError;
use crate::domain::metrics::{report_curves, CurvePoint, Metrics};
use crate::domain::panel::PricePanel;
use crate::domain::ranking::MomentumRanker;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::PriceSource;
use crate::ports::report_port::ReportPort;

pub const DEFAULT_EMA_SPAN: usize = 14;
pub const DEFAULT_OUTPUT_DIR: &str = "rotation-report";

#[derive(Parser, Debug)]
#[command(name = "rotator", about = "Top-N momentum rotation backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a rotation backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Price CSV, overrides [data] path
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Report directory, overrides [output] dir
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        top_n: Option<usize>,
        #[arg(long, requires = "end")]
        start: Option<NaiveDate>,
        #[arg(long, requires = "start")]
        end: Option<NaiveDate>,
    },
    /// Print the momentum ranking for one date
    Rank {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        date_format: Option<String>,
    },
    /// Summarise a price CSV
    Info {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long)]
        date_format: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub data: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub top_n: Option<usize>,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

/// Settings for the smoothed and benchmark report series.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSettings {
    pub benchmark: Option<String>,
    pub ema_span: usize,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            benchmark: None,
            ema_span: DEFAULT_EMA_SPAN,
        }
    }
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Backtest {
            config,
            data,
            output,
            top_n,
            start,
            end,
        } => {
            let overrides = Overrides {
                data,
                output,
                top_n,
                date_range: start.zip(end),
            };
            run_backtest(&config, &overrides)
        }
        Command::Rank {
            data,
            date,
            limit,
            date_format,
        } => run_rank(&data, date, limit, date_format),
        Command::Info { data, date_format } => run_info(&data, date_format),
        Command::Validate { config } => run_validate(&config),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, RotatorError> {
    info!("loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

/// Validates the `[rotation]` section and builds the engine config.
pub fn build_rotation_config(config: &dyn ConfigPort) -> Result<RotationConfig, RotatorError> {
    validate_rotation_config(config)?;

    let start = config.get_date(SECTION, "start_date")?;
    let end = config.get_date(SECTION, "end_date")?;

    let rotation = RotationConfig {
        initial_capital: config.get_double(SECTION, "initial_capital", DEFAULT_INITIAL_CAPITAL),
        top_n: config.get_int(SECTION, "top_n", DEFAULT_TOP_N as i64) as usize,
        fee_rate: config.get_double(SECTION, "fee_rate", DEFAULT_FEE_RATE),
        delisting_penalty: config.get_double(
            SECTION,
            "delisting_penalty",
            DEFAULT_DELISTING_PENALTY,
        ),
        date_range: start.zip(end),
    };
    rotation.validate()?;
    Ok(rotation)
}

pub fn build_report_settings(config: &dyn ConfigPort) -> ReportSettings {
    ReportSettings {
        benchmark: config
            .get_string(SECTION, "benchmark")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        ema_span: config.get_int(SECTION, "ema_span", DEFAULT_EMA_SPAN as i64).max(1) as usize,
    }
}

fn csv_source(path: PathBuf, date_format: Option<String>) -> CsvAdapter {
    let adapter = CsvAdapter::new(path);
    match date_format {
        Some(fmt) => adapter.with_date_format(fmt),
        None => adapter,
    }
}

/// Fetches observations and builds the panel. No data at all is an input
/// error; a range that later filters to nothing is not.
pub fn load_panel(source: &dyn PriceSource) -> Result<PricePanel, RotatorError> {
    info!("loading prices from {}", source.describe());
    let observations = source.fetch_observations()?;
    if observations.is_empty() {
        return Err(RotatorError::EmptyPanel);
    }
    let panel = PricePanel::from_observations(observations)?;
    let summary = panel.summary();
    info!(
        rows = summary.rows,
        instruments = summary.instruments,
        dates = summary.dates,
        "price panel ready"
    );
    Ok(panel)
}

fn run_backtest(config_path: &Path, overrides: &Overrides) -> Result<(), RotatorError> {
    // Stage 1: config
    let adapter = load_config(config_path)?;
    let mut rotation = build_rotation_config(&adapter)?;
    if let Some(top_n) = overrides.top_n {
        rotation.top_n = top_n;
    }
    if let Some(range) = overrides.date_range {
        rotation.date_range = Some(range);
    }
    let settings = build_report_settings(&adapter);

    // Stage 2: data source and report sink
    let data_path = match &overrides.data {
        Some(p) => p.clone(),
        None => adapter
            .get_string("data", "path")
            .map(PathBuf::from)
            .ok_or_else(|| RotatorError::ConfigMissing {
                section: "data".into(),
                key: "path".into(),
            })?,
    };
    let source = csv_source(data_path, adapter.get_string("data", "date_format"));
    let output_dir = overrides
        .output
        .clone()
        .or_else(|| adapter.get_string("output", "dir").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

    // Stages 3-5: simulate, summarise, persist
    let outcome = run_backtest_pipeline(
        &source,
        &CsvReportAdapter::new(),
        &rotation,
        &settings,
        &output_dir,
    )?;
    print_summary(&rotation, &settings, &outcome);
    eprintln!("\nReport written to: {}", output_dir.display());
    Ok(())
}

/// Everything a finished backtest produced.
#[derive(Debug)]
pub struct BacktestOutcome {
    pub result: SimulationResult,
    pub metrics: Metrics,
    pub curves: Vec<CurvePoint>,
}

/// Load → simulate → metrics → curves → report.
pub fn run_backtest_pipeline(
    source: &dyn PriceSource,
    report: &dyn ReportPort,
    rotation: &RotationConfig,
    settings: &ReportSettings,
    output_dir: &Path,
) -> Result<BacktestOutcome, RotatorError> {
    let engine = RebalancingEngine::new(rotation.clone())?;
    let panel = load_panel(source)?;
    let result = engine.run(&panel)?;
    let metrics = Metrics::compute(&result, rotation.initial_capital);

    let scoped = match rotation.date_range {
        Some((start, end)) => Cow::Owned(panel.filter_range(start, end)),
        None => Cow::Borrowed(&panel),
    };
    let curves = report_curves(
        &result,
        &scoped,
        settings.benchmark.as_deref(),
        settings.ema_span,
        rotation.initial_capital,
    );

    report.write(&result, &curves, output_dir)?;
    Ok(BacktestOutcome {
        result,
        metrics,
        curves,
    })
}

fn print_summary(rotation: &RotationConfig, settings: &ReportSettings, outcome: &BacktestOutcome) {
    let metrics = &outcome.metrics;
    eprintln!("\n=== Rotation Results (top {}) ===", rotation.top_n);
    eprintln!("Dates:            {}", outcome.result.valuations.len());
    eprintln!("Final Value:      {:.0}", metrics.final_value);
    eprintln!("Total Return:     {:.2}%", metrics.total_return * 100.0);
    eprintln!("Annualized:       {:.2}%", metrics.annualized_return * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", metrics.sharpe_ratio);
    eprintln!("Sortino Ratio:    {:.2}", metrics.sortino_ratio);
    eprintln!("Max Drawdown:     -{:.1}%", metrics.max_drawdown * 100.0);
    eprintln!("Trades:           {} buys, {} sells", metrics.buys, metrics.sells);
    eprintln!("Delisted Sells:   {}", metrics.delisted_sells);
    eprintln!("Fees Paid:        {:.2}", metrics.fees_paid);
    eprintln!("Delisting Losses: {:.2}", metrics.delisting_losses);

    if let Some(last) = outcome.curves.last() {
        eprintln!("EMA{:<2} (last):     {:.0}", settings.ema_span, last.ema);
    }

    if let Some(id) = &settings.benchmark {
        match outcome
            .curves
            .iter()
            .rev()
            .find_map(|c| c.benchmark.map(|value| (c.date, value)))
        {
            Some((date, value)) => eprintln!("Benchmark {}:    {:.0} on {}", id, value, date),
            None => eprintln!("Benchmark {}:    not in panel", id),
        }
    }
}

fn run_rank(
    data: &Path,
    date: NaiveDate,
    limit: usize,
    date_format: Option<String>,
) -> Result<(), RotatorError> {
    let panel = load_panel(&csv_source(data.to_path_buf(), date_format))?;
    let ranking = MomentumRanker.top(&panel, date, limit);
    if ranking.is_empty() {
        eprintln!("No instruments observed on {}", date);
        return Ok(());
    }
    for (i, r) in ranking.iter().enumerate() {
        println!(
            "{:>3}  {:<12} {:>+9.2}%  {}",
            i + 1,
            r.instrument_id,
            r.cumulative_return * 100.0,
            r.price
        );
    }
    Ok(())
}

fn run_info(data: &Path, date_format: Option<String>) -> Result<(), RotatorError> {
    let panel = load_panel(&csv_source(data.to_path_buf(), date_format))?;
    let summary = panel.summary();
    println!("rows:        {}", summary.rows);
    println!("instruments: {}", summary.instruments);
    println!("dates:       {}", summary.dates);
    if let (Some(first), Some(last)) = (summary.first_date, summary.last_date) {
        println!("range:       {} to {}", first, last);
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), RotatorError> {
    let adapter = load_config(config_path)?;
    let rotation = build_rotation_config(&adapter)?;

    eprintln!("initial_capital:   {}", rotation.initial_capital);
    eprintln!("top_n:             {}", rotation.top_n);
    eprintln!("fee_rate:          {}", rotation.fee_rate);
    eprintln!("delisting_penalty: {}", rotation.delisting_penalty);
    match rotation.date_range {
        Some((start, end)) => eprintln!("date_range:        {} to {}", start, end),
        None => eprintln!("date_range:        full panel"),
    }
    eprintln!("\nConfiguration is valid.");
    Ok(())
}
