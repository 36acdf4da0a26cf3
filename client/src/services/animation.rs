//! Decorative, time-driven progress sequence shown while a scan runs.
//!
//! The timeline knows nothing about the network. It walks a fixed list of
//! labelled steps, each covering an equal share of 0..=100 percent, and
//! interpolates linearly inside a step.

use async_stream::stream;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationStep {
    pub label: &'static str,
    pub nominal_duration: Duration,
}

impl AnimationStep {
    pub const fn new(label: &'static str, nominal_ms: u64) -> Self {
        Self {
            label,
            nominal_duration: Duration::from_millis(nominal_ms),
        }
    }
}

/// Steps shown during a breach scan.
pub const SCAN_STEPS: [AnimationStep; 5] = [
    AnimationStep::new("Connecting to dark web sources...", 2000),
    AnimationStep::new("Scanning enabled forums...", 3000),
    AnimationStep::new("Searching leaked databases...", 2500),
    AnimationStep::new("Matching keywords...", 2000),
    AnimationStep::new("Analyzing results...", 1500),
];

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineFrame {
    pub step_index: usize,
    pub label: &'static str,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TimelineEvent {
    Progress(TimelineFrame),
    /// Emitted once, right after the 100% frame.
    Complete,
}

pub type TimelineStream = Pin<Box<dyn Stream<Item = TimelineEvent> + Send>>;

#[derive(Debug)]
pub struct AnimationTimeline {
    steps: Arc<[AnimationStep]>,
    tick: Duration,
    cancel: CancellationToken,
}

impl AnimationTimeline {
    pub fn new(steps: impl Into<Arc<[AnimationStep]>>, tick: Duration) -> Self {
        Self {
            steps: steps.into(),
            tick: tick.max(Duration::from_millis(1)),
            cancel: CancellationToken::new(),
        }
    }

    pub fn scan_default(tick: Duration) -> Self {
        Self::new(SCAN_STEPS.to_vec(), tick)
    }

    pub fn steps(&self) -> &[AnimationStep] {
        &self.steps
    }

    pub fn total_duration(&self) -> Duration {
        total_duration(&self.steps)
    }

    /// Starts from step 0 at 0%. Any previous run is cancelled first.
    ///
    /// The stream yields one frame per tick and finishes after
    /// [`TimelineEvent::Complete`], or silently once cancelled.
    pub fn start(&mut self) -> TimelineStream {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();

        let cancel = self.cancel.clone();
        let steps = self.steps.clone();
        let tick = self.tick;

        Box::pin(stream! {
            let total = total_duration(&steps);
            let mut ticker = interval(tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut elapsed = Duration::ZERO;

            loop {
                let cancelled = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => true,
                    _ = ticker.tick() => false,
                };
                if cancelled {
                    debug!("Animation cancelled at {:?}", elapsed);
                    break;
                }

                let frame = frame_at(&steps, elapsed.min(total));
                yield TimelineEvent::Progress(frame);

                // the consumer may have cancelled while holding the frame
                if cancel.is_cancelled() {
                    break;
                }
                if elapsed >= total {
                    yield TimelineEvent::Complete;
                    break;
                }
                elapsed += tick;
            }
        })
    }

    /// Stops the current run; its stream yields nothing further.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn frame_at(&self, elapsed: Duration) -> TimelineFrame {
        frame_at(&self.steps, elapsed)
    }
}

fn total_duration(steps: &[AnimationStep]) -> Duration {
    steps.iter().map(|step| step.nominal_duration).sum()
}

fn frame_at(steps: &[AnimationStep], elapsed: Duration) -> TimelineFrame {
    let Some(last) = steps.last() else {
        return TimelineFrame {
            step_index: 0,
            label: "",
            percent: 100.0,
        };
    };

    let share = 100.0 / steps.len() as f64;
    let mut step_start = Duration::ZERO;
    for (index, step) in steps.iter().enumerate() {
        let step_end = step_start + step.nominal_duration;
        if elapsed < step_end {
            let within = (elapsed - step_start).as_secs_f64() / step.nominal_duration.as_secs_f64();
            return TimelineFrame {
                step_index: index,
                label: step.label,
                percent: ((index as f64 + within) * share).clamp(0.0, 100.0),
            };
        }
        step_start = step_end;
    }

    TimelineFrame {
        step_index: steps.len() - 1,
        label: last.label,
        percent: 100.0,
    }
}
