//! End-to-end generation pipeline.
//!
//! A run walks three strictly ordered phases — research, analysis,
//! simulation — emitting a [`PhaseEvent`] on an optional channel at every
//! transition so a CLI printer or SSE stream can mirror progress. Progress
//! moves on a fixed schedule: research 0→10 on start, 40 on completion;
//! analysis 50→70; simulation 80→100.
//!
//! Each run claims a token from an atomic counter and re-checks it at every
//! phase boundary. A run that loses the token (because a newer run started)
//! aborts with [`LabError::Superseded`] instead of racing the newer run to
//! publish; it emits no further events. A failed run never touches a
//! previously published artifact — the caller only replaces its copy on `Ok`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::error::LabError;
use crate::gateway::TextGenerator;
use crate::{inject, prompts, rewrite, sanitize};

/// Concept summaries keep the first this-many characters of the research.
pub const CONCEPT_LIMIT: usize = 150;

// ---------------------------------------------------------------------------
// Phase model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelinePhase {
    Research,
    Analysis,
    Simulation,
}

impl PipelinePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelinePhase::Research => "research",
            PipelinePhase::Analysis => "analysis",
            PipelinePhase::Simulation => "simulation",
        }
    }
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseStatus {
    Pending,
    Active,
    Completed,
    Error,
}

/// One phase transition, as observed by a subscriber.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseEvent {
    pub phase: PipelinePhase,
    pub status: PhaseStatus,
    /// Overall run progress, 0..=100.
    pub progress: u8,
}

/// The finished, displayable output of a successful run. Immutable; a new
/// run supersedes it rather than mutating it.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationArtifact {
    pub topic: String,
    pub research: String,
    pub concepts: String,
    pub html_code: String,
}

/// Everything a successful run produces: the sandbox-ready artifact plus the
/// unprocessed variant for full-screen, top-level viewing.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub artifact: SimulationArtifact,
    pub raw_html: String,
}

/// First [`CONCEPT_LIMIT`] characters of the research, with an ellipsis
/// marker when truncated.
pub fn concept_summary(research: &str) -> String {
    if research.chars().count() > CONCEPT_LIMIT {
        let head: String = research.chars().take(CONCEPT_LIMIT).collect();
        format!("{head}...")
    } else {
        research.to_string()
    }
}

// ---------------------------------------------------------------------------
// Phase tracker
// ---------------------------------------------------------------------------

struct PhaseTracker {
    tx: Option<mpsc::UnboundedSender<PhaseEvent>>,
    progress: u8,
}

impl PhaseTracker {
    fn new(tx: Option<mpsc::UnboundedSender<PhaseEvent>>) -> Self {
        PhaseTracker { tx, progress: 0 }
    }

    fn emit(&mut self, phase: PipelinePhase, status: PhaseStatus, progress: u8) {
        self.progress = progress;
        if let Some(tx) = &self.tx {
            // A dropped subscriber is not the run's problem.
            let _ = tx.send(PhaseEvent {
                phase,
                status,
                progress,
            });
        }
    }

    /// Mark `phase` errored at the current progress mark.
    fn fail(&mut self, phase: PipelinePhase) {
        let progress = self.progress;
        self.emit(phase, PhaseStatus::Error, progress);
    }
}

// ---------------------------------------------------------------------------
// SimulationPipeline
// ---------------------------------------------------------------------------

pub struct SimulationPipeline<G: TextGenerator> {
    generator: G,
    origin: String,
    current_run: Arc<AtomicU64>,
    event_tx: Option<mpsc::UnboundedSender<PhaseEvent>>,
}

impl<G: TextGenerator> SimulationPipeline<G> {
    /// `origin` is the absolute origin rewritten imports resolve against,
    /// e.g. `http://localhost:8888`.
    pub fn new(generator: G, origin: &str) -> Self {
        SimulationPipeline {
            generator,
            origin: origin.trim_end_matches('/').to_string(),
            current_run: Arc::new(AtomicU64::new(0)),
            event_tx: None,
        }
    }

    /// Subscribe a channel to phase transitions.
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<PhaseEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Invalidate any run still in flight without starting a new one. The
    /// superseded run aborts at its next phase boundary.
    pub fn supersede(&self) {
        self.current_run.fetch_add(1, Ordering::SeqCst);
    }

    fn begin_run(&self) -> u64 {
        self.current_run.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn check_current(&self, run_id: u64) -> Result<(), LabError> {
        if self.current_run.load(Ordering::SeqCst) == run_id {
            Ok(())
        } else {
            tracing::debug!(run_id, "run superseded; discarding remaining work");
            Err(LabError::Superseded)
        }
    }

    /// Execute a full generation run for `topic`, reporting transitions on
    /// the channel configured via [`Self::with_events`], if any.
    pub async fn run(&self, topic: &str) -> Result<RunOutput, LabError> {
        self.run_with_events(topic, self.event_tx.clone()).await
    }

    /// Execute a run reporting transitions on `tx`. Used by the web layer,
    /// where every request brings its own subscriber.
    pub async fn run_with_events(
        &self,
        topic: &str,
        tx: Option<mpsc::UnboundedSender<PhaseEvent>>,
    ) -> Result<RunOutput, LabError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(LabError::InvalidTopic);
        }

        let run_id = self.begin_run();
        let mut tracker = PhaseTracker::new(tx);

        tracker.emit(PipelinePhase::Research, PhaseStatus::Pending, 0);
        tracker.emit(PipelinePhase::Analysis, PhaseStatus::Pending, 0);
        tracker.emit(PipelinePhase::Simulation, PhaseStatus::Pending, 0);

        // Phase 1: research
        tracker.emit(PipelinePhase::Research, PhaseStatus::Active, 10);
        tracing::info!(topic, run_id, "research phase started");
        let research = match self
            .generator
            .generate(&prompts::research_prompt(topic))
            .await
        {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "research phase failed");
                tracker.fail(PipelinePhase::Research);
                return Err(e);
            }
        };
        self.check_current(run_id)?;
        tracker.emit(PipelinePhase::Research, PhaseStatus::Completed, 40);

        // Phase 2: analysis — local truncation, no suspension
        tracker.emit(PipelinePhase::Analysis, PhaseStatus::Active, 50);
        let concepts = concept_summary(&research);
        tracker.emit(PipelinePhase::Analysis, PhaseStatus::Completed, 70);

        // Phase 3: simulation — processed and raw variants. The two calls are
        // independent; neither consumes the other's result.
        tracker.emit(PipelinePhase::Simulation, PhaseStatus::Active, 80);
        tracing::info!(run_id, "simulation phase started");
        let (processed, raw) = tokio::join!(
            self.build_processed(topic, &research),
            self.build_raw(topic, &research)
        );
        self.check_current(run_id)?;
        let html_code = match processed {
            Ok(html) => html,
            Err(e) => {
                tracing::error!(error = %e, "simulation phase failed (processed variant)");
                tracker.fail(PipelinePhase::Simulation);
                return Err(e);
            }
        };
        let raw_html = match raw {
            Ok(html) => html,
            Err(e) => {
                tracing::error!(error = %e, "simulation phase failed (raw variant)");
                tracker.fail(PipelinePhase::Simulation);
                return Err(e);
            }
        };
        tracker.emit(PipelinePhase::Simulation, PhaseStatus::Completed, 100);
        tracing::info!(topic, run_id, "simulation ready");

        Ok(RunOutput {
            artifact: SimulationArtifact {
                topic: topic.to_string(),
                research,
                concepts,
                html_code,
            },
            raw_html,
        })
    }

    /// Embeddable variant: sanitize, rewrite imports for the sandbox origin,
    /// inject the responsive fragment.
    async fn build_processed(&self, topic: &str, research: &str) -> Result<String, LabError> {
        let raw = self
            .generator
            .generate(&prompts::simulation_prompt(topic, research))
            .await?;
        let code = sanitize::extract_document(&raw);
        let code = rewrite::rewrite_imports(&code, &self.origin);
        Ok(inject::inject_responsiveness(&code))
    }

    /// Full-screen variant: fence strip only. Opened as a top-level document,
    /// where CDN references work natively and rewriting would be wasted.
    async fn build_raw(&self, topic: &str, research: &str) -> Result<String, LabError> {
        let raw = self
            .generator
            .generate(&prompts::freestanding_prompt(topic, research))
            .await?;
        Ok(sanitize::extract_code(&raw))
    }
}
