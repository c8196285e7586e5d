//! TrendStitch CLI — fetch long daily series and preview window plans.
//!
//! Commands:
//! - `fetch` — fetch, stitch, gap-fill and normalize one or more keywords and
//!   write one CSV per keyword
//! - `plan` — print the windows a request would be fetched in, without
//!   touching the network

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use trendstitch_core::domain::Window;
use trendstitch_core::export::{keyword_slug, save_series_csv};
use trendstitch_core::planner::WindowPlanner;
use trendstitch_core::source::HttpSource;
use trendstitch_core::stitch::DEFAULT_OVERLAP_DAYS;
use trendstitch_core::{get_series, EngineConfig, SeriesRequest, StitchError, StitchPolicy};

#[derive(Parser)]
#[command(
    name = "trendstitch",
    about = "TrendStitch CLI — long-range daily popularity series from windowed fetches"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and stitch daily series, one CSV per keyword.
    Fetch {
        /// Keyword to fetch. Repeat for a batch; keywords run one after another.
        #[arg(long = "keyword", required = true)]
        keywords: Vec<String>,

        #[command(flatten)]
        range: RangeArgs,

        /// Timezone correction in minutes (e.g. 480 for UTC+8).
        #[arg(long, allow_hyphen_values = true)]
        tz: Option<i32>,

        /// Seconds to pause after every successful fetch.
        #[arg(long)]
        sleep: Option<f64>,

        /// Print per-chunk progress.
        #[arg(long, default_value_t = false)]
        verbose: bool,

        /// Base URL of the sample service.
        #[arg(long)]
        source_url: String,

        /// Output directory for the CSV files.
        #[arg(long, default_value = "output")]
        out_dir: PathBuf,
    },
    /// Print the planned fetch windows for a date range.
    Plan {
        #[command(flatten)]
        range: RangeArgs,
    },
}

#[derive(clap::Args)]
struct RangeArgs {
    /// Start date (YYYY-MM-DD).
    #[arg(long)]
    start: String,

    /// End date (YYYY-MM-DD).
    #[arg(long)]
    end: String,

    /// Path to a TOML engine config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stitch policy. Overrides the config file.
    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    OverlapAverage,
    SpliceDrop,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch {
            keywords,
            range,
            tz,
            sleep,
            verbose,
            source_url,
            out_dir,
        } => {
            let mut config = load_config(range.config.as_deref(), range.policy)?;
            if let Some(minutes) = tz {
                config.tz_offset_minutes = minutes;
            }
            if let Some(secs) = sleep {
                config.inter_request_delay_secs = secs;
            }
            config.verbose |= verbose;
            config.validate()?;
            run_fetch(&keywords, &range.start, &range.end, &config, &source_url, &out_dir)
        }
        Commands::Plan { range } => {
            let config = load_config(range.config.as_deref(), range.policy)?;
            run_plan(&range.start, &range.end, &config)
        }
    }
}

/// Config file (or the policy's defaults) with the `--policy` override applied.
fn load_config(path: Option<&Path>, policy: Option<PolicyArg>) -> Result<EngineConfig> {
    let mut config = match (path, policy) {
        (Some(path), _) => EngineConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        (None, Some(PolicyArg::SpliceDrop)) => EngineConfig::splice_defaults(),
        (None, _) => EngineConfig::default(),
    };
    match (policy, config.policy) {
        (Some(PolicyArg::SpliceDrop), _) => config.policy = StitchPolicy::SpliceDrop,
        (Some(PolicyArg::OverlapAverage), StitchPolicy::SpliceDrop) => {
            config.policy = StitchPolicy::OverlapAverage {
                overlap_days: DEFAULT_OVERLAP_DAYS,
            }
        }
        _ => {}
    }
    config.validate()?;
    Ok(config)
}

fn run_fetch(
    keywords: &[String],
    start: &str,
    end: &str,
    config: &EngineConfig,
    source_url: &str,
    out_dir: &Path,
) -> Result<()> {
    // Parse every request up front so bad dates fail before any fetch.
    let requests = keywords
        .iter()
        .map(|kw| SeriesRequest::parse(kw, start, end))
        .collect::<Result<Vec<_>, _>>()?;
    let source = HttpSource::new(source_url)?;

    let mut failures: Vec<(String, StitchError)> = Vec::new();
    for request in &requests {
        match get_series(&source, request, config) {
            Ok(points) => {
                let path = out_dir.join(format!(
                    "{}-daily-{}.csv",
                    config.policy,
                    keyword_slug(&request.keyword)
                ));
                save_series_csv(&request.keyword, &points, &path)?;
                println!(
                    "{}: {} points -> {}",
                    request.keyword,
                    points.len(),
                    path.display()
                );
            }
            Err(e) => {
                tracing::warn!(keyword = %request.keyword, stage = %e.stage(), error = %e, "keyword failed");
                failures.push((request.keyword.clone(), e));
            }
        }
    }

    println!(
        "Done: {} succeeded, {} failed",
        requests.len() - failures.len(),
        failures.len()
    );
    if !failures.is_empty() {
        for (keyword, err) in &failures {
            eprintln!("Error for {keyword} ({} stage): {err}", err.stage());
        }
        std::process::exit(1);
    }

    Ok(())
}

fn run_plan(start: &str, end: &str, config: &EngineConfig) -> Result<()> {
    let request = SeriesRequest::parse("plan", start, end)?;
    let planner = WindowPlanner::new(request.start, request.end, config.max_span_days)?;

    let windows = match config.policy {
        StitchPolicy::OverlapAverage { overlap_days } => {
            println!(
                "Policy: {} ({overlap_days} day overlap), newest window first",
                config.policy
            );
            planner.backward(overlap_days)?
        }
        StitchPolicy::SpliceDrop => {
            println!(
                "Policy: {}, assuming every window is served through its last day",
                config.policy
            );
            planner.forward_preview()
        }
    };

    print_windows(&windows);
    Ok(())
}

fn print_windows(windows: &[Window]) {
    println!("{:>4}  {:<10}  {:<10}  {:>5}", "#", "start", "end", "days");
    for (i, w) in windows.iter().enumerate() {
        println!(
            "{:>4}  {:<10}  {:<10}  {:>5}",
            i + 1,
            w.start.to_string(),
            w.end.to_string(),
            w.span_days() + 1
        );
    }
    println!("{} window(s)", windows.len());
}
