// Copyright 2025 Agent Perf Contributors
// SPDX-License-Identifier: Apache-2.0

//! Start, stop and observe background benchmark sessions.
//!
//! At most one session runs at a time. Starting a new session stops the
//! active one. Finished sessions stay queryable by id until more than
//! [`RunnerOptions::max_sessions`] of them have accumulated; the oldest are
//! then dropped.

use agent_perf_adapters::{AgentFactory, DefaultAgentFactory, WARMUP_PROMPT};
use agent_perf_core::{SessionId, SessionSnapshot, SessionStatus, TestConfiguration};
use dashmap::DashMap;
use metrics::counter;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::run::{self, RunContext};

/// Options applied to every run.
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Directory metrics reports are written to; `None` disables reports.
    pub output_dir: Option<PathBuf>,
    /// Prompt for the warm-up call.
    pub warmup_prompt: String,
    /// Finished sessions kept for `status` and `sessions`.
    pub max_sessions: usize,
}

/// Default for [`RunnerOptions::max_sessions`].
pub const DEFAULT_MAX_SESSIONS: usize = 100;

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            output_dir: None,
            warmup_prompt: WARMUP_PROMPT.to_string(),
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

struct SessionEntry {
    session: Arc<watch::Sender<SessionSnapshot>>,
    finished: CancellationToken,
    seq: u64,
}

struct ActiveRun {
    session_id: SessionId,
    token: CancellationToken,
    // Dropping the handle detaches the task; the run finalises on its own.
    _handle: JoinHandle<()>,
}

/// Owns every benchmark session and the single active run.
///
/// `start`, `stop` and `status` never wait on an agent call. Share the
/// manager behind an `Arc`.
///
/// # Example
///
/// ```no_run
/// use agent_perf_core::TestConfiguration;
/// use agent_perf_runner::SessionManager;
///
/// # async fn demo() -> agent_perf_core::Result<()> {
/// let manager = SessionManager::default();
/// let id = manager.start(TestConfiguration::default())?;
/// let snapshot = manager.wait(&id).await.unwrap();
/// println!("{} iterations, avg {:.1} ms", snapshot.current_iteration, snapshot.stats.average_ms);
/// # Ok(())
/// # }
/// ```
pub struct SessionManager {
    sessions: DashMap<SessionId, SessionEntry>,
    active: Mutex<Option<ActiveRun>>,
    next_seq: AtomicU64,
    factory: Arc<dyn AgentFactory>,
    options: Arc<RunnerOptions>,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(Arc::new(DefaultAgentFactory::default()), RunnerOptions::default())
    }
}

impl SessionManager {
    /// Create a manager that builds agents with `factory`.
    pub fn new(factory: Arc<dyn AgentFactory>, options: RunnerOptions) -> Self {
        Self {
            sessions: DashMap::new(),
            active: Mutex::new(None),
            next_seq: AtomicU64::new(0),
            factory,
            options: Arc::new(options),
        }
    }

    /// Options applied to every run.
    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    /// Start a session in the background and return its id.
    ///
    /// Any active session is stopped first. Must be called from within a
    /// Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`agent_perf_core::Error::InvalidInput`] if the configuration
    /// does not validate; no session is created in that case.
    pub fn start(&self, config: TestConfiguration) -> agent_perf_core::Result<SessionId> {
        config.validate()?;

        let mut active = self.lock_active();
        if let Some(previous) = active.take() {
            if self.cancel(&previous) {
                info!(session_id = %previous.session_id, "Stopped previous session");
            }
        }

        let snapshot = SessionSnapshot::start(config);
        let session_id = snapshot.session_id.clone();
        let mode = snapshot.configuration.test_mode;
        let iterations = snapshot.total_iterations;
        let (tx, _) = watch::channel(snapshot);
        let session = Arc::new(tx);
        let finished = CancellationToken::new();
        let token = CancellationToken::new();

        self.sessions.insert(
            session_id.clone(),
            SessionEntry {
                session: Arc::clone(&session),
                finished: finished.clone(),
                seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
            },
        );

        let handle = tokio::spawn(run::execute(RunContext {
            session,
            token: token.clone(),
            finished,
            factory: Arc::clone(&self.factory),
            options: Arc::clone(&self.options),
        }));

        *active = Some(ActiveRun {
            session_id: session_id.clone(),
            token,
            _handle: handle,
        });
        self.evict_finished();

        counter!("agent_perf_sessions_started_total").increment(1);
        info!(session_id = %session_id, mode = %mode, iterations, "Benchmark session started");
        Ok(session_id)
    }

    /// Stop the active session.
    ///
    /// Returns `true` only when a running session was cancelled by this
    /// call. The in-flight agent call, if any, is left to finish but its
    /// result is not recorded.
    pub fn stop(&self) -> bool {
        let mut active = self.lock_active();
        let Some(run) = active.take() else {
            return false;
        };

        let stopped = self.cancel(&run);
        if stopped {
            info!(session_id = %run.session_id, "Benchmark session stopped");
        }
        stopped
    }

    /// Snapshot of `session_id`, or of the most recently started session
    /// when no id (or a blank one) is given.
    pub fn status(&self, session_id: Option<&str>) -> Option<SessionSnapshot> {
        let session = match session_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => self.sessions.get(id).map(|e| Arc::clone(&e.session)),
            None => self.latest(),
        }?;
        let snapshot = session.borrow().clone();
        Some(snapshot)
    }

    /// Watch a session's snapshots as they are published.
    pub fn subscribe(&self, session_id: &str) -> Option<watch::Receiver<SessionSnapshot>> {
        self.sessions.get(session_id).map(|e| e.session.subscribe())
    }

    /// Wait until the session's run has finished, including its report.
    pub async fn wait(&self, session_id: &str) -> Option<SessionSnapshot> {
        let (session, finished) = {
            let entry = self.sessions.get(session_id)?;
            (Arc::clone(&entry.session), entry.finished.clone())
        };
        finished.cancelled().await;
        let snapshot = session.borrow().clone();
        Some(snapshot)
    }

    /// Every session, most recently started first.
    pub fn sessions(&self) -> Vec<SessionSnapshot> {
        let mut all: Vec<(u64, SessionSnapshot)> = self
            .sessions
            .iter()
            .map(|e| (e.seq, e.session.borrow().clone()))
            .collect();
        all.sort_by(|(a_seq, a), (b_seq, b)| {
            (b.start_time, *b_seq).cmp(&(a.start_time, *a_seq))
        });
        all.into_iter().map(|(_, s)| s).collect()
    }

    /// Drop the oldest finished sessions beyond `max_sessions`. Sessions
    /// whose run has not finalised yet are never dropped.
    fn evict_finished(&self) {
        let mut finished: Vec<(u64, SessionId)> = self
            .sessions
            .iter()
            .filter(|e| e.finished.is_cancelled())
            .map(|e| (e.seq, e.key().clone()))
            .collect();
        if finished.len() <= self.options.max_sessions {
            return;
        }
        finished.sort_unstable_by_key(|(seq, _)| *seq);
        let excess = finished.len() - self.options.max_sessions;
        for (_, id) in finished.into_iter().take(excess) {
            self.sessions.remove(&id);
        }
        debug!(evicted = excess, "Evicted finished sessions");
    }

    fn latest(&self) -> Option<Arc<watch::Sender<SessionSnapshot>>> {
        self.sessions
            .iter()
            .map(|e| {
                let start_time = e.session.borrow().start_time;
                ((start_time, e.seq), Arc::clone(&e.session))
            })
            .max_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, session)| session)
    }

    /// Cancel `run` and mark running sessions Stopped. Returns `false` if
    /// the run was already cancelled or had finished.
    fn cancel(&self, run: &ActiveRun) -> bool {
        if run.token.is_cancelled() {
            return false;
        }
        let running = self
            .sessions
            .get(&run.session_id)
            .map(|e| e.session.borrow().status == SessionStatus::Running)
            .unwrap_or(false);
        if !running {
            return false;
        }

        run.token.cancel();
        for entry in self.sessions.iter() {
            entry.session.send_if_modified(|s| s.stop());
        }
        true
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveRun>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
