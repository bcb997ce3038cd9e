use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use rankrace::{
    RaceIndex,
    controller::{RaceConfig, RaceController},
    core::{Lang, Year},
    dataset::{self, Dataset},
    term::{self, TermSurface},
    worldbank::{self, FetchConfig},
};

#[derive(Parser, Debug)]
#[command(name = "rankrace", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch World Bank GDP data and write the race dataset.
    Fetch(FetchArgs),
    /// Play the race in the terminal.
    Play(PlayArgs),
    /// Print one settled frame at a decimal year.
    Snapshot(SnapshotArgs),
}

#[derive(Parser, Debug)]
struct FetchArgs {
    /// First year of the range.
    #[arg(long, default_value_t = 1960)]
    from: i32,

    /// Last year of the range (inclusive).
    #[arg(long, default_value_t = 2023)]
    to: i32,

    /// Output dataset path.
    #[arg(long, default_value = "gdp_data.json")]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct PlayArgs {
    /// Race dataset JSON.
    #[arg(long = "data", default_value = "gdp_data.json")]
    data_path: PathBuf,

    /// Historical events JSON.
    #[arg(long = "events")]
    events_path: Option<PathBuf>,

    /// Label language.
    #[arg(long, value_enum, default_value_t = LangChoice::En)]
    lang: LangChoice,

    /// Bars on screen.
    #[arg(long, default_value_t = 10)]
    top_n: usize,

    /// Milliseconds of animation per data year.
    #[arg(long, default_value_t = 3000)]
    year_ms: u64,

    /// Milliseconds to hold on a historical event.
    #[arg(long, default_value_t = 3000)]
    pause_ms: u64,
}

#[derive(Parser, Debug)]
struct SnapshotArgs {
    /// Race dataset JSON.
    #[arg(long = "data", default_value = "gdp_data.json")]
    data_path: PathBuf,

    /// Decimal year to sample, e.g. 1987.5.
    #[arg(long)]
    year: f64,

    /// Label language.
    #[arg(long, value_enum, default_value_t = LangChoice::En)]
    lang: LangChoice,

    /// Bars to show.
    #[arg(long, default_value_t = 10)]
    top_n: usize,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LangChoice {
    En,
    Zh,
}

impl From<LangChoice> for Lang {
    fn from(choice: LangChoice) -> Self {
        match choice {
            LangChoice::En => Lang::En,
            LangChoice::Zh => Lang::Zh,
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Fetch(args) => cmd_fetch(args),
        Command::Play(args) => cmd_play(args),
        Command::Snapshot(args) => cmd_snapshot(args),
    }
}

/// Logs go to stderr so stdout stays free for the chart. Quiet by default;
/// RUST_LOG opens it up.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_fetch(args: FetchArgs) -> anyhow::Result<()> {
    let cfg = FetchConfig {
        start_year: Year(args.from),
        end_year: Year(args.to),
        out_path: args.out,
    };
    let count = worldbank::fetch_dataset(&cfg)?;
    eprintln!("wrote {count} records to {}", cfg.out_path.display());
    Ok(())
}

fn cmd_play(args: PlayArgs) -> anyhow::Result<()> {
    let dataset = Dataset::load(&args.data_path)?;
    let events = match &args.events_path {
        Some(path) => dataset::load_events(path)?,
        None => Vec::new(),
    };
    let index = RaceIndex::build(&dataset)?;

    let config = RaceConfig {
        top_n: args.top_n,
        year_duration: Duration::from_millis(args.year_ms),
        pause_duration: Duration::from_millis(args.pause_ms),
        ..RaceConfig::default()
    };
    let mut controller = RaceController::new(index, events, config)?;

    // Surface drops (and restores the terminal) before the summary prints.
    let stats = {
        let mut surface = TermSurface::interactive(args.lang.into())?;
        controller.run_until(&mut surface, || term::quit_requested().unwrap_or(true))?
    };

    eprintln!(
        "drew {} frames, {} event pauses",
        stats.frames_drawn, stats.pauses
    );
    Ok(())
}

fn cmd_snapshot(args: SnapshotArgs) -> anyhow::Result<()> {
    let dataset = Dataset::load(&args.data_path)?;
    let index = RaceIndex::build(&dataset)?;

    let config = RaceConfig {
        top_n: args.top_n,
        ..RaceConfig::default()
    };
    let mut controller = RaceController::new(index, Vec::new(), config)?;
    let mut surface = TermSurface::inline(args.lang.into());
    controller.draw_still(args.year, &mut surface)?;
    Ok(())
}
