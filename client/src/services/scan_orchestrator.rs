//! Runs a breach scan alongside the decorative timeline and joins the two.
//!
//! The remote scan and the animation finish in either order. [`ScanJoin`]
//! holds one slot for each and fires exactly once, when both are filled.
//! Progress and the terminal outcome reach the caller through a
//! [`ScanHandle`].

use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{ClientError, ClientResult};
use crate::models::{ScanRecord, SearchTerm};
use crate::repositories::ScanRepository;
use crate::services::animation::{
    AnimationStep, AnimationTimeline, SCAN_STEPS, TimelineEvent, TimelineFrame,
};
use crate::services::scan_history::ScanHistoryCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    Running {
        animation_done: bool,
        result_ready: bool,
    },
    Complete,
}

#[derive(Debug)]
pub enum JoinEvent {
    AnimationComplete,
    ScanSettled(ClientResult<ScanRecord>),
}

#[derive(Debug, PartialEq)]
pub enum JoinTransition {
    /// Nothing visible changes.
    Waiting,
    /// The animation ended first; the result is still outstanding.
    Finalizing,
    Complete(ClientResult<ScanRecord>),
}

/// Two-slot join between the animation and the remote scan.
#[derive(Debug, Default)]
pub struct ScanJoin {
    started: bool,
    animation_done: bool,
    scan_result: Option<ClientResult<ScanRecord>>,
    completed: bool,
}

impl ScanJoin {
    pub fn running() -> Self {
        Self {
            started: true,
            ..Default::default()
        }
    }

    /// Records one event. Returns `Complete` exactly once, on whichever
    /// event fills the second slot; repeated or late events are ignored.
    pub fn apply(&mut self, event: JoinEvent) -> JoinTransition {
        if self.completed || !self.started {
            return JoinTransition::Waiting;
        }

        match event {
            JoinEvent::AnimationComplete if self.animation_done => return JoinTransition::Waiting,
            JoinEvent::AnimationComplete => self.animation_done = true,
            JoinEvent::ScanSettled(_) if self.scan_result.is_some() => {
                return JoinTransition::Waiting;
            }
            JoinEvent::ScanSettled(result) => self.scan_result = Some(result),
        }

        match (self.animation_done, self.scan_result.take()) {
            (true, Some(result)) => {
                self.completed = true;
                JoinTransition::Complete(result)
            }
            (true, None) => JoinTransition::Finalizing,
            (false, pending) => {
                self.scan_result = pending;
                JoinTransition::Waiting
            }
        }
    }

    pub fn phase(&self) -> ScanPhase {
        if self.completed {
            ScanPhase::Complete
        } else if self.started {
            ScanPhase::Running {
                animation_done: self.animation_done,
                result_ready: self.scan_result.is_some(),
            }
        } else {
            ScanPhase::Idle
        }
    }
}

/// What the caller observes while a scan runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanUpdate {
    Progress(TimelineFrame),
    Finalizing,
    Complete(ScanRecord),
    Failed(ClientError),
}

impl ScanUpdate {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanUpdate::Complete(_) | ScanUpdate::Failed(_))
    }
}

/// A running scan. Dropping the handle cancels it.
pub struct ScanHandle {
    updates: mpsc::UnboundedReceiver<ScanUpdate>,
    cancel: CancellationToken,
    driver: Option<JoinHandle<()>>,
}

impl ScanHandle {
    /// Next update, or `None` once the scan is over or cancelled.
    pub async fn next_update(&mut self) -> Option<ScanUpdate> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            update = self.updates.recv() => update,
        }
    }

    /// Skips progress and returns the terminal outcome.
    pub async fn outcome(&mut self) -> Option<ClientResult<ScanRecord>> {
        while let Some(update) = self.next_update().await {
            match update {
                ScanUpdate::Complete(record) => return Some(Ok(record)),
                ScanUpdate::Failed(e) => return Some(Err(e)),
                ScanUpdate::Progress(_) | ScanUpdate::Finalizing => {}
            }
        }
        None
    }

    /// Abandons the scan; no further update is delivered.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for the background work, including the history refresh that
    /// follows a successful scan.
    pub async fn finished(mut self) {
        if let Some(driver) = self.driver.take() {
            if let Err(e) = driver.await {
                warn!("Scan driver ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for ScanHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

pub struct ScanOrchestrator {
    scans: Arc<dyn ScanRepository>,
    history: Arc<ScanHistoryCache>,
    steps: Arc<[AnimationStep]>,
    tick: Duration,
}

impl ScanOrchestrator {
    pub fn new(scans: Arc<dyn ScanRepository>, history: Arc<ScanHistoryCache>, tick: Duration) -> Self {
        Self {
            scans,
            history,
            steps: Arc::from(SCAN_STEPS.as_slice()),
            tick,
        }
    }

    pub fn with_steps(mut self, steps: impl Into<Arc<[AnimationStep]>>) -> Self {
        self.steps = steps.into();
        self
    }

    pub fn history(&self) -> &Arc<ScanHistoryCache> {
        &self.history
    }

    /// Starts a scan for `terms`. Returns `None`, doing nothing, when no
    /// term carries a non-blank value.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn execute_scan(&self, terms: &[SearchTerm]) -> Option<ScanHandle> {
        let keywords: Vec<String> = terms
            .iter()
            .map(|term| term.value.trim())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .collect();
        if keywords.is_empty() {
            debug!("Ignoring scan request without search terms");
            return None;
        }

        info!("Starting scan for {} term(s)", keywords.len());
        let cancel = CancellationToken::new();
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let driver = tokio::spawn(drive_scan(
            self.scans.clone(),
            self.history.clone(),
            AnimationTimeline::new(self.steps.clone(), self.tick),
            keywords,
            updates_tx,
            cancel.clone(),
        ));

        Some(ScanHandle {
            updates: updates_rx,
            cancel,
            driver: Some(driver),
        })
    }
}

async fn drive_scan(
    scans: Arc<dyn ScanRepository>,
    history: Arc<ScanHistoryCache>,
    mut timeline: AnimationTimeline,
    keywords: Vec<String>,
    updates: mpsc::UnboundedSender<ScanUpdate>,
    cancel: CancellationToken,
) {
    let (events_tx, mut events_rx) = mpsc::channel::<JoinEvent>(2);

    let scan_events = events_tx.clone();
    let scan_cancel = cancel.clone();
    let scan_task = tokio::spawn(async move {
        let result = tokio::select! {
            biased;
            _ = scan_cancel.cancelled() => return,
            result = scans.run(&keywords) => result,
        };
        let _ = scan_events.send(JoinEvent::ScanSettled(result)).await;
    });

    let mut frames = timeline.start();
    let progress = updates.clone();
    let animation_task = tokio::spawn(async move {
        while let Some(event) = frames.next().await {
            match event {
                TimelineEvent::Progress(frame) => {
                    if progress.send(ScanUpdate::Progress(frame)).is_err() {
                        return;
                    }
                }
                TimelineEvent::Complete => {
                    let _ = events_tx.send(JoinEvent::AnimationComplete).await;
                }
            }
        }
    });

    let mut join = ScanJoin::running();
    let result = loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            event = events_rx.recv() => event,
        };
        let Some(event) = event else {
            break None;
        };

        match join.apply(event) {
            JoinTransition::Waiting => {}
            JoinTransition::Finalizing => {
                debug!("Animation finished before the scan result");
                let _ = updates.send(ScanUpdate::Finalizing);
            }
            JoinTransition::Complete(result) => break Some(result),
        }
    };

    timeline.cancel();
    let Some(result) = result else {
        info!("Scan cancelled before completion");
        scan_task.abort();
        animation_task.abort();
        return;
    };

    match result {
        Ok(record) => {
            info!(
                "Scan {} complete: {} ({} source(s) breached)",
                record.id,
                record.outcome,
                record.breached_sources.len()
            );
            let _ = updates.send(ScanUpdate::Complete(record));
            if let Err(e) = history.refresh().await {
                warn!("Scan history could not be refreshed: {}", e);
            }
        }
        Err(e) => {
            warn!("Scan failed: {}", e);
            let _ = updates.send(ScanUpdate::Failed(e));
        }
    }
}
