//! Runs a search strategy on a background thread behind a pollable handle.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::board::Board;
use crate::constants::{DEFAULT_GRACE_MS, DEFAULT_WATCHDOG_MS, WORKER_THREAD_NAME};
use crate::error::{Result, SolverError};
use crate::learned::LearnedDepthCache;
use crate::moves::Move;
use crate::solver::{
    solve, CancelToken, RunOutcome, SearchOptions, SearchReport, Strategy, StrategyKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
}

/// One search run: `Idle -> Running -> Completed`.
///
/// Polling calls never block. Only [`SolverHandle::stop`] and
/// [`SolverHandle::wait`] wait for the worker, and both are bounded.
pub struct SolverHandle {
    board: Board,
    strategy: Option<Box<dyn Strategy>>,
    strategy_name: &'static str,
    options: SearchOptions,
    cache: Arc<LearnedDepthCache>,
    cancel: CancelToken,
    grace: Duration,
    watchdog: Duration,
    state: RunState,
    rx: Option<Receiver<SearchReport>>,
    join: Option<JoinHandle<()>>,
    started: Option<Instant>,
    report: Option<SearchReport>,
    cursor: usize,
}

impl SolverHandle {
    pub fn new(
        board: Board,
        kind: StrategyKind,
        options: SearchOptions,
        cache: Arc<LearnedDepthCache>,
    ) -> Self {
        Self::with_strategy(board, kind.build(), options, cache)
    }

    pub fn with_strategy(
        board: Board,
        strategy: Box<dyn Strategy>,
        options: SearchOptions,
        cache: Arc<LearnedDepthCache>,
    ) -> Self {
        Self {
            board,
            strategy_name: strategy.name(),
            strategy: Some(strategy),
            options,
            cache,
            cancel: CancelToken::new(),
            grace: Duration::from_millis(DEFAULT_GRACE_MS),
            watchdog: Duration::from_millis(DEFAULT_WATCHDOG_MS),
            state: RunState::Idle,
            rx: None,
            join: None,
            started: None,
            report: None,
            cursor: 0,
        }
    }

    /// How long `stop` and the watchdog wait for a cancelled worker.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Ceiling on the run when the search options carry no timeout.
    pub fn with_watchdog(mut self, ceiling: Duration) -> Self {
        self.watchdog = ceiling;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn start(&mut self) -> Result<()> {
        if self.state != RunState::Idle {
            return Err(SolverError::AlreadyStarted);
        }
        let Some(mut strategy) = self.strategy.take() else {
            return Err(SolverError::AlreadyStarted);
        };

        let (tx, rx) = mpsc::channel::<SearchReport>();
        let board = self.board.clone();
        let options = self.options.clone();
        let cache = Arc::clone(&self.cache);
        let cancel = self.cancel.clone();
        let join = thread::Builder::new()
            .name(WORKER_THREAD_NAME.into())
            .spawn(move || {
                let report = solve(strategy.as_mut(), board, options, cache, cancel);
                let _ = tx.send(report);
            })
            .map_err(SolverError::Spawn)?;

        self.rx = Some(rx);
        self.join = Some(join);
        self.started = Some(Instant::now());
        self.state = RunState::Running;
        info!(strategy = self.strategy_name, "search started");
        Ok(())
    }

    /// Requests cancellation and waits at most the grace period for the
    /// worker to acknowledge it. A worker that does not is abandoned.
    pub fn stop(&mut self) {
        match self.state {
            RunState::Idle => {
                self.strategy = None;
                self.finish(SearchReport::without_solution(
                    self.strategy_name,
                    RunOutcome::Cancelled,
                    Duration::ZERO,
                ));
            }
            RunState::Running => {
                self.cancel.cancel();
                self.receive(Some(self.grace));
                if self.state == RunState::Running {
                    self.abandon();
                }
            }
            RunState::Completed => {}
        }
    }

    /// Non-blocking poll of the worker.
    pub fn is_running(&mut self) -> bool {
        self.poll();
        self.state == RunState::Running
    }

    /// Blocks until the worker reports, `timeout` passes, or the watchdog
    /// fires. Returns the state afterwards.
    pub fn wait(&mut self, timeout: Option<Duration>) -> RunState {
        if self.state != RunState::Running {
            return self.state;
        }
        let watchdog = self.watchdog_remaining();
        let limit = timeout.map_or(watchdog, |t| t.min(watchdog));
        self.receive(Some(limit));
        self.poll();
        self.state
    }

    /// Steps through the solution: each call yields the next move and the
    /// board after it. `None` while running, after the last step, or when
    /// no solution was found.
    pub fn extract_solution(&mut self) -> Option<(Move, Board)> {
        self.poll();
        let step = self.report.as_ref()?.solution.as_ref()?.steps.get(self.cursor)?;
        self.cursor += 1;
        Some((step.mv, step.board.clone()))
    }

    pub fn report(&self) -> Option<&SearchReport> {
        self.report.as_ref()
    }

    pub fn outcome(&self) -> Option<RunOutcome> {
        self.report.as_ref().map(|r| r.outcome)
    }

    fn poll(&mut self) {
        if self.state != RunState::Running {
            return;
        }
        self.receive(Some(Duration::ZERO));
        if self.state == RunState::Running && self.watchdog_remaining().is_zero() {
            warn!(strategy = self.strategy_name, "watchdog expired; cancelling");
            self.cancel.cancel();
            self.abandon();
        }
    }

    /// Takes the worker's report if it arrives within `limit` (`None` waits
    /// indefinitely). A closed channel without a report is a crash.
    fn receive(&mut self, limit: Option<Duration>) {
        let Some(rx) = self.rx.as_ref() else { return };
        let received = match limit {
            Some(d) if d.is_zero() => rx.try_recv().map_err(|e| match e {
                TryRecvError::Empty => RecvTimeoutError::Timeout,
                TryRecvError::Disconnected => RecvTimeoutError::Disconnected,
            }),
            Some(d) => rx.recv_timeout(d),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(report) => {
                if let Some(join) = self.join.take() {
                    let _ = join.join();
                }
                self.finish(report);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                if let Some(join) = self.join.take() {
                    let _ = join.join();
                }
                error!(strategy = self.strategy_name, "search worker exited without a result");
                self.finish(SearchReport::without_solution(
                    self.strategy_name,
                    RunOutcome::Crashed,
                    self.running_for(),
                ));
            }
        }
    }

    fn abandon(&mut self) {
        // Dropping the handle detaches the thread; it still holds the
        // cancelled token and exits at its next check.
        self.join = None;
        warn!(
            strategy = self.strategy_name,
            grace_ms = self.grace.as_millis() as u64,
            "search worker ignored cancellation; abandoned"
        );
        self.finish(SearchReport::without_solution(
            self.strategy_name,
            RunOutcome::Abandoned,
            self.running_for(),
        ));
    }

    fn finish(&mut self, report: SearchReport) {
        debug!(
            strategy = %report.strategy,
            outcome = ?report.outcome,
            states = report.states_processed,
            "search completed"
        );
        self.rx = None;
        self.report = Some(report);
        self.cursor = 0;
        self.state = RunState::Completed;
    }

    fn running_for(&self) -> Duration {
        self.started.map(|s| s.elapsed()).unwrap_or_default()
    }

    /// Time left before the watchdog fires: `timeout + grace`, or the
    /// ceiling plus grace when the run has no timeout.
    fn watchdog_remaining(&self) -> Duration {
        let limit = self.options.timeout().unwrap_or(self.watchdog) + self.grace;
        limit.saturating_sub(self.running_for())
    }
}

impl Drop for SolverHandle {
    fn drop(&mut self) {
        if self.state == RunState::Running {
            self.cancel.cancel();
        }
    }
}
