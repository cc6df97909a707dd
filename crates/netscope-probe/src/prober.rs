//! Bounded-concurrency probe execution
//!
//! One [`Prober::run`] call fans a probe out over a target list with at
//! most `max_workers` targets in flight, runs each target's attempts
//! sequentially inside its worker, and joins everything before returning.
//! Results are indexed by target position, never by completion order.

use crate::settings::ProbeSettings;
use async_trait::async_trait;
use netscope_common::NetscopeResult;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

/// A single measurement against one kind of target.
#[async_trait]
pub trait Probe: Send + Sync + 'static {
    /// What gets probed
    type Target: Clone + Send + Sync + 'static;
    /// What one successful attempt yields
    type Sample: Send + 'static;

    /// Human-readable target name for logs
    fn label(target: &Self::Target) -> String;

    /// Run attempt number `index` (0-based) against `target`.
    ///
    /// The prober enforces the per-attempt deadline; implementations
    /// should not add their own outer timeout.
    async fn attempt(&self, target: &Self::Target, index: u32) -> NetscopeResult<Self::Sample>;
}

/// Raw outcome of all attempts against one target.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSet<S = Duration> {
    /// Successful samples in attempt order
    pub successes: Vec<S>,
    /// Failed or timed-out attempts
    pub failures: u32,
}

impl<S> Default for SampleSet<S> {
    fn default() -> Self {
        Self {
            successes: Vec::new(),
            failures: 0,
        }
    }
}

impl<S> SampleSet<S> {
    /// Total attempts made
    #[inline]
    pub fn attempts(&self) -> u32 {
        self.successes.len() as u32 + self.failures
    }
}

/// Executes probes under a family's [`ProbeSettings`].
#[derive(Debug, Clone)]
pub struct Prober {
    settings: ProbeSettings,
}

impl Prober {
    /// Create a prober
    pub fn new(settings: ProbeSettings) -> Self {
        Self { settings }
    }

    /// Settings in effect
    pub fn settings(&self) -> &ProbeSettings {
        &self.settings
    }

    /// Run every attempt for a single target in the current task.
    pub async fn sample<P: Probe>(&self, probe: &P, target: &P::Target) -> SampleSet<P::Sample> {
        sample_target(probe, target, &self.settings).await
    }

    /// Probe all targets and return `(target, samples)` in target order.
    ///
    /// A target whose worker panics is dropped from the output and logged.
    pub async fn run<P: Probe>(
        &self,
        probe: Arc<P>,
        targets: &[P::Target],
    ) -> Vec<(P::Target, SampleSet<P::Sample>)> {
        let started = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.settings.max_workers.max(1)));
        let settings = Arc::new(self.settings.clone());
        let mut tasks = JoinSet::new();

        for (index, target) in targets.iter().cloned().enumerate() {
            let probe = Arc::clone(&probe);
            let semaphore = Arc::clone(&semaphore);
            let settings = Arc::clone(&settings);

            tasks.spawn(async move {
                // The semaphore is never closed, so acquisition only fails on shutdown.
                let _permit = semaphore.acquire_owned().await.ok();
                let samples = sample_target(probe.as_ref(), &target, &settings).await;
                debug!(
                    target = %P::label(&target),
                    successes = samples.successes.len(),
                    failures = samples.failures,
                    "target sampled"
                );
                (index, samples)
            });
        }

        let mut slots: Vec<Option<SampleSet<P::Sample>>> =
            std::iter::repeat_with(|| None).take(targets.len()).collect();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, samples)) => {
                    if let Some(slot) = slots.get_mut(index) {
                        *slot = Some(samples);
                    }
                }
                Err(err) => warn!(error = %err, "probe worker failed"),
            }
        }

        let results: Vec<_> = targets
            .iter()
            .cloned()
            .zip(slots)
            .filter_map(|(target, slot)| match slot {
                Some(samples) => Some((target, samples)),
                None => {
                    warn!(target = %P::label(&target), "target dropped from report");
                    None
                }
            })
            .collect();

        info!(
            targets = targets.len(),
            measured = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "probe run complete"
        );

        results
    }
}

async fn sample_target<P: Probe>(
    probe: &P,
    target: &P::Target,
    settings: &ProbeSettings,
) -> SampleSet<P::Sample> {
    let mut set = SampleSet::default();

    for index in 0..settings.samples {
        match tokio::time::timeout(settings.timeout, probe.attempt(target, index)).await {
            Ok(Ok(sample)) => set.successes.push(sample),
            Ok(Err(err)) => {
                trace!(target = %P::label(target), attempt = index, error = %err, "attempt failed");
                set.failures += 1;
            }
            Err(_) => {
                trace!(target = %P::label(target), attempt = index, "attempt timed out");
                set.failures += 1;
            }
        }

        if index + 1 == settings.samples {
            break;
        }
        if let Some(delay) = settings.attempt_delay() {
            tokio::time::sleep(delay).await;
        }
    }

    set
}
