use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use bakers_dozen::config::{self, Config, Paths};
use bakers_dozen::constants::{LOG_FILE_NAME, STANDARD_COLUMNS};
use bakers_dozen::{learned, Board, DeckShape, Rank, RunOutcome, SolverHandle, StrategyKind};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "bdsolve", about = "Baker's Dozen solitaire solver")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Deal a board and search for a solution
    Solve(SolveArgs),
    /// Print the board dealt for a seed
    Deal(DealArgs),
    /// Show learned-depth cache statistics
    Cache {
        /// Cache file (default: from config, else the data directory)
        #[arg(long)]
        cache: Option<PathBuf>,
    },
}

#[derive(Args)]
struct DealArgs {
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Highest rank in the deck; lower values give reduced test decks
    #[arg(long, default_value = "13", value_parser = parse_rank)]
    top_rank: Rank,
    #[arg(long, default_value_t = STANDARD_COLUMNS)]
    columns: usize,
}

#[derive(Args)]
struct SolveArgs {
    #[command(flatten)]
    deal: DealArgs,
    #[arg(long, value_enum)]
    strategy: Option<StrategyKind>,
    #[arg(long)]
    max_states: Option<usize>,
    /// Lift the distinct-state bound
    #[arg(long, conflicts_with = "max_states")]
    unbounded: bool,
    #[arg(long)]
    max_depth: Option<u32>,
    #[arg(long)]
    timeout_ms: Option<u64>,
    #[arg(long)]
    ida_height: Option<u32>,
    #[arg(long)]
    branch_limit: Option<usize>,
    /// Seed for the heuristic's tie-breaking noise
    #[arg(long)]
    search_seed: Option<u64>,
    #[arg(long)]
    cache: Option<PathBuf>,
    /// Print the board after every move
    #[arg(long)]
    show: bool,
}

fn parse_rank(s: &str) -> Result<Rank, String> {
    s.parse::<u8>()
        .ok()
        .and_then(Rank::new)
        .ok_or_else(|| format!("`{s}` is not a rank between 1 and 13"))
}

fn init_tracing(paths: &Paths) -> tracing_appender::non_blocking::WorkerGuard {
    std::fs::create_dir_all(&paths.log_dir).ok();
    let file_appender = tracing_appender::rolling::daily(&paths.log_dir, LOG_FILE_NAME);
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(env)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(nb_writer))
        .try_init();
    guard
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let (cfg, paths) = config::load_or_default()?;
    let _guard = init_tracing(&paths);
    tracing::debug!(cfg_file = ?paths.cfg_file, "bdsolve starting");

    match cli.cmd {
        Cmd::Deal(args) => {
            println!("{}", deal(&args)?);
            Ok(())
        }
        Cmd::Cache { cache } => {
            let path = cache.unwrap_or_else(|| cfg.cache_path(&paths));
            let cache = learned::LearnedDepthCache::try_load(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            println!("{}: {} learned states", path.display(), cache.len());
            Ok(())
        }
        Cmd::Solve(args) => solve(args, cfg, &paths),
    }
}

fn deal(args: &DealArgs) -> Result<Board> {
    if args.columns == 0 {
        bail!("a deal needs at least one column");
    }
    Ok(Board::deal(args.seed, DeckShape::reduced(args.top_rank, args.columns)))
}

fn solve(args: SolveArgs, cfg: Config, paths: &Paths) -> Result<()> {
    let board = deal(&args.deal)?;
    let mut options = cfg.search.clone();
    if args.unbounded {
        options.max_states = None;
    }
    if let Some(n) = args.max_states {
        options.max_states = Some(n);
    }
    if let Some(d) = args.max_depth {
        options.max_depth = d;
    }
    if let Some(t) = args.timeout_ms {
        options.timeout_ms = Some(t);
    }
    if let Some(h) = args.ida_height {
        options.ida_height = h;
    }
    if let Some(b) = args.branch_limit {
        options.branch_limit = Some(b);
    }
    if let Some(s) = args.search_seed {
        options.seed = Some(s);
    }
    let strategy = args.strategy.unwrap_or(cfg.strategy);
    let cache_path = args.cache.unwrap_or_else(|| cfg.cache_path(paths));
    let cache = learned::install_shared(&cache_path);

    println!("{board}");
    let mut handle = SolverHandle::new(board, strategy, options, cache)
        .with_grace(cfg.grace())
        .with_watchdog(cfg.watchdog());
    handle.start()?;
    handle.wait(None);
    if handle.is_running() {
        handle.stop();
    }

    let mut moves = 0usize;
    while let Some((mv, after)) = handle.extract_solution() {
        moves += 1;
        println!("{moves:>3}. {mv}");
        if args.show {
            println!("{after}");
        }
    }

    if let Some(report) = handle.report() {
        let verdict = match report.outcome {
            RunOutcome::Solved => "solved".to_string(),
            RunOutcome::Exhausted(reason) => format!("gave up ({reason:?})"),
            other => format!("{other:?}").to_lowercase(),
        };
        println!(
            "{}: {verdict} in {:.2}s, {} states, {} nodes, {moves} moves",
            report.strategy,
            report.elapsed.as_secs_f64(),
            report.states_processed,
            report.nodes_allocated,
        );
    }

    if let Err(e) = learned::save_data() {
        tracing::error!(error = %e, "failed to save learned-depth cache");
    }
    Ok(())
}
