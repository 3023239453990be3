use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use bakers_dozen::constants::STANDARD_COLUMNS;
use bakers_dozen::{
    learned, solve, Board, CancelToken, DeckShape, LearnedDepthCache, Rank, SearchOptions,
    SearchReport, StrategyKind,
};
use clap::{Parser, Subcommand};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "xtask", about = "Dev tools for the Baker's Dozen solver")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
#[command(rename_all = "kebab-case")]
enum Cmd {
    /// Solve a run of seeded deals and append one JSON line per deal
    Bench {
        /// Number of deals, seeds `first_seed..first_seed + deals`
        #[arg(long, default_value_t = 20)]
        deals: u64,
        #[arg(long, default_value_t = 0)]
        first_seed: u64,
        #[arg(long, value_enum, default_value_t = StrategyKind::BestFirst)]
        strategy: StrategyKind,
        #[arg(long)]
        max_states: Option<usize>,
        #[arg(long)]
        timeout_ms: Option<u64>,
        #[arg(long, default_value_t = 13)]
        top_rank: u8,
        #[arg(long, default_value_t = STANDARD_COLUMNS)]
        columns: usize,
        /// Learned-depth cache to read and update; none keeps each run cold
        #[arg(long)]
        cache: Option<PathBuf>,
        /// Output file (JSON lines, appended)
        #[arg(long, default_value = "bench.jsonl")]
        out: PathBuf,
    },
}

#[derive(Debug, Serialize)]
struct BenchRow {
    strategy: String,
    seed: u64,
    solved: bool,
    elapsed_secs: f64,
    states_processed: u64,
    nodes_allocated: u64,
    moves: Option<usize>,
}

impl BenchRow {
    fn new(seed: u64, report: &SearchReport) -> Self {
        Self {
            strategy: report.strategy.clone(),
            seed,
            solved: report.is_solved(),
            elapsed_secs: report.elapsed.as_secs_f64(),
            states_processed: report.states_processed,
            nodes_allocated: report.nodes_allocated,
            moves: report.solution.as_ref().map(|s| s.len()),
        }
    }
}

fn main() -> Result<()> {
    let env = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Bench {
            deals,
            first_seed,
            strategy,
            max_states,
            timeout_ms,
            top_rank,
            columns,
            cache,
            out,
        } => {
            let top_rank = Rank::new(top_rank).context("top rank must be 1..=13")?;
            let shape = DeckShape::reduced(top_rank, columns.max(1));
            let options = SearchOptions {
                max_states: max_states.or(SearchOptions::default().max_states),
                timeout_ms,
                ..SearchOptions::default()
            };
            let cache = match &cache {
                Some(path) => learned::install_shared(path),
                None => Arc::new(LearnedDepthCache::new()),
            };
            let solved = bench(
                &out,
                first_seed..first_seed + deals,
                shape,
                strategy,
                &options,
                &cache,
            )?;
            cache
                .save_data()
                .context("save learned-depth cache")?;
            println!("{solved}/{deals} solved; rows appended to {}", out.display());
        }
    }
    Ok(())
}

fn bench(
    out: &Path,
    seeds: std::ops::Range<u64>,
    shape: DeckShape,
    strategy: StrategyKind,
    options: &SearchOptions,
    cache: &Arc<LearnedDepthCache>,
) -> Result<usize> {
    let mut w = BufWriter::new(open_append(out)?);
    let mut solved = 0;
    for seed in seeds {
        let board = Board::deal(seed, shape);
        let report = solve(
            strategy.build().as_mut(),
            board,
            options.clone(),
            Arc::clone(cache),
            CancelToken::new(),
        );
        let row = BenchRow::new(seed, &report);
        if row.solved {
            solved += 1;
        }
        tracing::info!(
            seed,
            solved = row.solved,
            elapsed_secs = row.elapsed_secs,
            states = row.states_processed,
            "deal finished"
        );
        serde_json::to_writer(&mut w, &row)?;
        w.write_all(b"\n")?;
    }
    w.flush()?;
    Ok(solved)
}

fn open_append(path: &Path) -> Result<File> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open {}", path.display()))
}
