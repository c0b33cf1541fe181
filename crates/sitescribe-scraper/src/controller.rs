//! Control channel: start, stop and ping requests for one page environment.
//!
//! At most one session runs at a time. The guard slot is a plain
//! [`std::sync::Mutex`] that is never held across an `.await`. The session
//! task releases it through [`SlotRelease`] when it returns or unwinds.

use crate::error::{Result, ScrapeError};
use crate::orchestrator::{ScrapeOrchestrator, ScrapeReport};
use crate::progress::ProgressSink;
use serde::{Deserialize, Serialize};
use sitescribe_browser::PageEnvironment;
use sitescribe_core::{ScrapeOptions, ScrapingConfig, SessionStatus};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Requests accepted on the control channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "options", rename_all = "camelCase")]
pub enum ControlRequest {
    /// Extract the displayed page
    Start(ScrapeOptions),
    /// Discover and extract every documentation page
    StartComprehensive(ScrapeOptions),
    /// Stop the running session; it delivers its partial document itself
    Stop,
    /// Liveness check
    Ping,
}

/// Replies on the control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "response", rename_all = "camelCase")]
pub enum ControlResponse {
    /// A session task was spawned
    Accepted,
    /// A session is already running; nothing was started
    AlreadyActive {
        /// Status of the running session
        status: SessionStatus,
    },
    /// The running session was asked to stop
    StopRequested,
    /// There is no session to stop
    NotRunning,
    /// Reply to [`ControlRequest::Ping`]
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    SinglePage,
    Comprehensive,
}

struct ActiveSession {
    generation: u64,
    status: watch::Receiver<SessionStatus>,
    stop: CancellationToken,
}

impl ActiveSession {
    /// Live status; a cancelled session reads as stopping until it ends.
    fn status(&self) -> SessionStatus {
        let status = *self.status.borrow();
        if self.stop.is_cancelled() && !status.is_terminal() {
            SessionStatus::Stopping
        } else {
            status
        }
    }
}

#[derive(Default)]
struct Slot {
    active: Option<ActiveSession>,
    generation: u64,
}

/// Owns the guard slot and spawns session tasks.
pub struct ScrapeController {
    env: Arc<dyn PageEnvironment>,
    sink: Arc<dyn ProgressSink>,
    config: Arc<ScrapingConfig>,
    slot: Arc<Mutex<Slot>>,
    task: Mutex<Option<JoinHandle<Result<ScrapeReport>>>>,
}

/// Clears the slot for one generation when dropped, including during a
/// panic unwind inside the session task.
struct SlotRelease {
    slot: Arc<Mutex<Slot>>,
    generation: u64,
}

impl Drop for SlotRelease {
    fn drop(&mut self) {
        let mut slot = lock(&self.slot);
        if slot
            .active
            .as_ref()
            .is_some_and(|active| active.generation == self.generation)
        {
            slot.active = None;
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn reply(started: Result<()>) -> ControlResponse {
    match started {
        Ok(()) => ControlResponse::Accepted,
        Err(ScrapeError::SessionAlreadyActive { status }) => {
            tracing::warn!("Start ignored: session already {}", status);
            ControlResponse::AlreadyActive { status }
        }
        Err(e) => {
            tracing::error!("Could not start session: {}", e);
            ControlResponse::NotRunning
        }
    }
}

impl ScrapeController {
    /// Controller for `env`; every session reports to `sink`.
    #[must_use]
    pub fn new(
        env: Arc<dyn PageEnvironment>,
        sink: Arc<dyn ProgressSink>,
        config: ScrapingConfig,
    ) -> Self {
        Self {
            env,
            sink,
            config: Arc::new(config),
            slot: Arc::new(Mutex::new(Slot::default())),
            task: Mutex::new(None),
        }
    }

    /// Answer one control request. Must be called inside a tokio runtime.
    pub fn handle(&self, request: ControlRequest) -> ControlResponse {
        match request {
            ControlRequest::Start(options) => reply(self.try_start(Mode::SinglePage, options)),
            ControlRequest::StartComprehensive(options) => {
                reply(self.try_start(Mode::Comprehensive, options))
            }
            ControlRequest::Stop => self.stop(),
            ControlRequest::Ping => ControlResponse::Ready,
        }
    }

    /// Status of the running session, if any.
    #[must_use]
    pub fn status(&self) -> Option<SessionStatus> {
        lock(&self.slot).active.as_ref().map(ActiveSession::status)
    }

    fn try_start(&self, mode: Mode, options: ScrapeOptions) -> Result<()> {
        let mut slot = lock(&self.slot);
        if let Some(active) = &slot.active {
            return Err(ScrapeError::SessionAlreadyActive {
                status: active.status(),
            });
        }

        slot.generation += 1;
        let generation = slot.generation;
        let stop = CancellationToken::new();
        let (status_tx, status_rx) = watch::channel(match mode {
            Mode::SinglePage => SessionStatus::ScrapingPages,
            Mode::Comprehensive => SessionStatus::Analyzing,
        });
        slot.active = Some(ActiveSession {
            generation,
            status: status_rx,
            stop: stop.clone(),
        });
        drop(slot);

        let env = Arc::clone(&self.env);
        let sink = Arc::clone(&self.sink);
        let config = Arc::clone(&self.config);
        let release = SlotRelease {
            slot: Arc::clone(&self.slot),
            generation,
        };

        tracing::info!("Spawning {:?} session", mode);
        let handle = tokio::spawn(async move {
            let _release = release;
            let orchestrator = ScrapeOrchestrator::new(env.as_ref(), sink.as_ref(), &config)
                .with_stop_token(stop)
                .with_status_sender(status_tx);
            match mode {
                Mode::SinglePage => orchestrator.run_single_page(&options).await,
                Mode::Comprehensive => orchestrator.run_comprehensive(&options).await,
            }
        });
        *lock(&self.task) = Some(handle);
        Ok(())
    }

    fn stop(&self) -> ControlResponse {
        let slot = lock(&self.slot);
        match slot.active.as_ref() {
            Some(active) => {
                tracing::info!("Stop requested");
                active.stop.cancel();
                ControlResponse::StopRequested
            }
            None => ControlResponse::NotRunning,
        }
    }

    /// Wait for the most recently spawned session. Returns `None` if no
    /// session was started since the last join.
    pub async fn join(&self) -> Option<Result<ScrapeReport>> {
        let handle = lock(&self.task).take()?;
        Some(match handle.await {
            Ok(result) => result,
            Err(e) => Err(ScrapeError::Task(e.to_string())),
        })
    }
}
