//! Single-flight deep-analysis dispatch.
//!
//! One long-lived worker thread receives jobs through a one-slot channel.
//! The sample path never blocks on it: [`DeepAnalysisCoordinator::maybe_trigger`]
//! only enqueues, and [`DeepAnalysisCoordinator::poll`] only picks up a result
//! the worker has already left behind.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::backend::SharedBackend;
use super::prompt::{build_prompt, parse_response, strip_echo, AnalysisRequest};
use crate::alert::{AlertDecision, Provenance};
use crate::config::AnalysisConfig;
use crate::error::{Result, VitalsError};

/// Why a deep analysis was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerReason {
    /// Operator asked for it.
    Manual,
    /// Risk crossed the automatic threshold.
    AutoRisk,
}

/// Coordinator bookkeeping. Snapshots are handed to the alert stabilizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TriggerState {
    pub in_flight: bool,
    pub last_trigger_time: Option<f64>,
    pub last_trigger_reason: Option<TriggerReason>,
    /// Most recent completed analysis, success or fallback.
    pub last_result: Option<AlertDecision>,
    /// Stream time at which `last_result` was picked up by `poll`.
    pub last_result_time: Option<f64>,
    pub dispatched: u64,
    pub refused: u64,
    pub completed: u64,
    pub failed: u64,
}

/// A finished analysis as left by the worker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeepAnalysisResult {
    pub decision: AlertDecision,
    pub reason: TriggerReason,
    /// Stream time of the sample that triggered the analysis.
    pub requested_at: f64,
    /// Wall-clock time spent in the backend.
    pub latency: Duration,
    /// Rendered prompt that produced `decision`, kept for audit.
    pub prompt: String,
}

impl DeepAnalysisResult {
    pub fn is_fallback(&self) -> bool {
        matches!(
            self.decision.provenance,
            Provenance::DeepAnalysisFallback { .. }
        )
    }
}

struct Job {
    request: AnalysisRequest,
    reason: TriggerReason,
}

#[derive(Default)]
struct Shared {
    state: TriggerState,
    completion: Option<DeepAnalysisResult>,
}

#[derive(Clone, Copy)]
struct ParseLimits {
    max_recommendation_chars: usize,
    critical_threshold: f64,
}

/// Owns the worker thread and the trigger state.
///
/// Dropping the coordinator closes the job channel; the worker exits after
/// finishing whatever it is running. It is never joined.
pub struct DeepAnalysisCoordinator {
    config: AnalysisConfig,
    model_id: String,
    shared: Arc<Mutex<Shared>>,
    jobs: SyncSender<Job>,
}

impl std::fmt::Debug for DeepAnalysisCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeepAnalysisCoordinator")
            .field("config", &self.config)
            .field("model_id", &self.model_id)
            .field("state", &self.shared.lock().state)
            .finish()
    }
}

impl DeepAnalysisCoordinator {
    /// Spawn the `deep-analysis` worker.
    ///
    /// `critical_threshold` is used to pick a level when the backend's
    /// answer does not name one.
    pub fn new(
        backend: SharedBackend,
        config: AnalysisConfig,
        critical_threshold: f64,
    ) -> Result<Self> {
        config.validate()?;
        let (jobs, queue) = mpsc::sync_channel(1);
        let shared = Arc::new(Mutex::new(Shared::default()));
        let model_id = backend.model_id().to_string();
        let limits = ParseLimits {
            max_recommendation_chars: config.max_recommendation_chars,
            critical_threshold,
        };

        let worker_shared = Arc::clone(&shared);
        thread::Builder::new()
            .name("deep-analysis".to_string())
            .spawn(move || run_worker(queue, backend, worker_shared, limits))
            .map_err(|e| VitalsError::Worker(format!("failed to spawn worker: {}", e)))?;

        Ok(Self {
            config,
            model_id,
            shared,
            jobs,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn set_auto_analysis(&mut self, enabled: bool) {
        self.config.auto_analysis = enabled;
    }

    /// Whether this sample warrants a dispatch, and why.
    pub fn auto_trigger_reason(&self, risk: f64, manual: bool) -> Option<TriggerReason> {
        if manual {
            Some(TriggerReason::Manual)
        } else if self.config.auto_analysis && risk > self.config.auto_risk_threshold {
            Some(TriggerReason::AutoRisk)
        } else {
            None
        }
    }

    /// Dispatch `request` unless a task is in flight, a finished result has
    /// not been picked up by [`poll`](Self::poll) yet, or the last dispatch
    /// was less than `debounce_window` ago. Returns whether it was sent.
    pub fn maybe_trigger(&self, request: AnalysisRequest, reason: TriggerReason, now: f64) -> bool {
        let mut shared = self.shared.lock();
        let unobserved = shared.completion.is_some();
        let state = &mut shared.state;

        if unobserved {
            state.refused += 1;
            debug!(?reason, "deep analysis refused: previous result not yet observed");
            return false;
        }
        if state.in_flight {
            state.refused += 1;
            debug!(?reason, "deep analysis refused: already in flight");
            return false;
        }
        if let Some(last) = state.last_trigger_time {
            if now - last < self.config.debounce_window {
                state.refused += 1;
                debug!(?reason, since_last = now - last, "deep analysis refused: debounced");
                return false;
            }
        }

        let previous_trigger = (state.last_trigger_time, state.last_trigger_reason);
        state.in_flight = true;
        state.last_trigger_time = Some(now);
        state.last_trigger_reason = Some(reason);

        match self.jobs.try_send(Job { request, reason }) {
            Ok(()) => {
                state.dispatched += 1;
                info!(?reason, at = now, model = %self.model_id, "deep analysis dispatched");
                true
            }
            Err(e) => {
                state.in_flight = false;
                (state.last_trigger_time, state.last_trigger_reason) = previous_trigger;
                state.refused += 1;
                let cause = match e {
                    TrySendError::Full(_) => "queue full",
                    TrySendError::Disconnected(_) => "worker gone",
                };
                warn!(?reason, cause, "deep analysis could not be dispatched");
                false
            }
        }
    }

    /// Pick up a finished analysis, stamping it with stream time `now`.
    pub fn poll(&self, now: f64) -> Option<DeepAnalysisResult> {
        let mut shared = self.shared.lock();
        let result = shared.completion.take()?;
        shared.state.last_result = Some(result.decision.clone());
        shared.state.last_result_time = Some(now);
        debug!(
            level = %result.decision.level,
            fallback = result.is_fallback(),
            "deep analysis result observed"
        );
        Some(result)
    }

    pub fn snapshot(&self) -> TriggerState {
        self.shared.lock().state.clone()
    }

    pub fn is_in_flight(&self) -> bool {
        self.shared.lock().state.in_flight
    }
}

fn run_worker(
    queue: Receiver<Job>,
    backend: SharedBackend,
    shared: Arc<Mutex<Shared>>,
    limits: ParseLimits,
) {
    while let Ok(job) = queue.recv() {
        let started = Instant::now();
        let prompt = build_prompt(&job.request);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| backend.infer(&prompt)))
            .unwrap_or_else(|_| Err(VitalsError::Backend("backend panicked".to_string())))
            .and_then(|raw| {
                parse_response(
                    strip_echo(&raw, &prompt),
                    &job.request,
                    backend.model_id(),
                    limits.max_recommendation_chars,
                    limits.critical_threshold,
                )
            });
        let latency = started.elapsed();

        let (decision, succeeded) = match outcome {
            Ok(decision) => {
                info!(
                    level = %decision.level,
                    latency_ms = latency.as_millis() as u64,
                    "deep analysis completed"
                );
                (decision, true)
            }
            Err(e) => {
                warn!(error = %e, "deep analysis failed, falling back to fast path");
                let fallback = job
                    .request
                    .fast_path
                    .clone()
                    .with_provenance(Provenance::DeepAnalysisFallback {
                        reason: e.to_string(),
                    });
                (fallback, false)
            }
        };

        let mut shared = shared.lock();
        shared.completion = Some(DeepAnalysisResult {
            decision,
            reason: job.reason,
            requested_at: job.request.timestamp,
            latency,
            prompt,
        });
        shared.state.in_flight = false;
        if succeeded {
            shared.state.completed += 1;
        } else {
            shared.state.failed += 1;
        }
    }
    debug!("deep analysis worker exiting");
}
