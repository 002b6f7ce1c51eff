//! End-to-end pipeline tests with a canned text generator — phase ordering,
//! progress checkpoints, failure isolation, and artifact post-processing.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use simulab::inject::VIEWPORT_META;
use simulab::pipeline::{PhaseEvent, PhaseStatus, PipelinePhase, SimulationPipeline};
use simulab::{LabError, TextGenerator};

const ORIGIN: &str = "http://localhost:8888";

// -- Mock generator ---------------------------------------------------------

/// Canned generator. Prompts are routed on the markers each prompt builder
/// bakes in: the research prompt asks to "Research the topic", the embeddable
/// simulation prompt carries "MODULE IMPORT RULES", everything else is the
/// freestanding variant.
struct MockGenerator {
    research: String,
    simulation: String,
    freestanding: String,
    fail_research: bool,
    fail_simulation: bool,
    hook: Mutex<Option<Box<dyn Fn() + Send + Sync>>>,
}

impl MockGenerator {
    fn new(research: &str, simulation: &str, freestanding: &str) -> Self {
        MockGenerator {
            research: research.to_string(),
            simulation: simulation.to_string(),
            freestanding: freestanding.to_string(),
            fail_research: false,
            fail_simulation: false,
            hook: Mutex::new(None),
        }
    }

    fn set_hook(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.hook.lock().unwrap() = Some(Box::new(hook));
    }
}

impl TextGenerator for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, LabError> {
        if let Some(hook) = &*self.hook.lock().unwrap() {
            hook();
        }
        if prompt.contains("Research the topic") {
            if self.fail_research {
                return Err(LabError::Transport {
                    status: 500,
                    body: "research backend down".to_string(),
                });
            }
            Ok(self.research.clone())
        } else if prompt.contains("MODULE IMPORT RULES") {
            if self.fail_simulation {
                return Err(LabError::Transport {
                    status: 503,
                    body: "generation backend down".to_string(),
                });
            }
            Ok(self.simulation.clone())
        } else {
            Ok(self.freestanding.clone())
        }
    }
}

const SIM_RESPONSE: &str = r#"```html
<!DOCTYPE html>
<html>
<head>
<title>Sim</title>
</head>
<body>
<div id="simulation-container"></div>
<script type="module">
import * as THREE from "three";
window.camera = null;
</script>
</body>
</html>
```"#;

const RAW_RESPONSE: &str = r#"```html
<!DOCTYPE html>
<html>
<head>
<script type="importmap">{"imports":{"three":"https://unpkg.com/three@0.158.0/build/three.module.js"}}</script>
</head>
<body><canvas></canvas></body>
</html>
```"#;

fn drain(rx: &mut mpsc::UnboundedReceiver<PhaseEvent>) -> Vec<PhaseEvent> {
    let mut events = Vec::new();
    while let Ok(e) = rx.try_recv() {
        events.push(e);
    }
    events
}

fn events_for(events: &[PhaseEvent], phase: PipelinePhase) -> Vec<&PhaseEvent> {
    events.iter().filter(|e| e.phase == phase).collect()
}

// -- Success path -----------------------------------------------------------

#[tokio::test]
async fn test_successful_run_hits_all_progress_checkpoints_in_order() {
    let generator = MockGenerator::new(&"r".repeat(200), SIM_RESPONSE, RAW_RESPONSE);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let pipeline = SimulationPipeline::new(generator, ORIGIN).with_events(tx);

    pipeline.run("Pendulum Motion").await.expect("run");
    let events = drain(&mut rx);

    let progress: Vec<u8> = events.iter().map(|e| e.progress).collect();
    for checkpoint in [0u8, 10, 40, 50, 70, 80, 100] {
        assert!(progress.contains(&checkpoint), "missing {checkpoint}");
    }
    assert!(
        progress.windows(2).all(|w| w[0] <= w[1]),
        "progress regressed: {progress:?}"
    );
    assert!(!events.iter().any(|e| e.status == PhaseStatus::Error));
}

#[tokio::test]
async fn test_successful_run_artifact_is_fully_post_processed() {
    let generator = MockGenerator::new("research text", SIM_RESPONSE, RAW_RESPONSE);
    let pipeline = SimulationPipeline::new(generator, ORIGIN);

    let output = pipeline.run("Pendulum Motion").await.expect("run");
    let html = &output.artifact.html_code;

    assert!(html.contains(VIEWPORT_META));
    assert!(!html.contains(r#"from "three""#));
    assert!(html.contains(r#"from "http://localhost:8888/libs/three.module.js""#));
    assert!(!html.contains("```"));
    assert_eq!(output.artifact.topic, "Pendulum Motion");
    assert_eq!(output.artifact.research, "research text");
    assert_eq!(output.artifact.concepts, "research text");
}

#[tokio::test]
async fn test_raw_variant_is_unprocessed() {
    let generator = MockGenerator::new("research", SIM_RESPONSE, RAW_RESPONSE);
    let pipeline = SimulationPipeline::new(generator, ORIGIN);

    let output = pipeline.run("Orbits").await.expect("run");

    // Fence stripped, but CDN import map left alone and nothing injected.
    assert!(!output.raw_html.contains("```"));
    assert!(output.raw_html.contains("importmap"));
    assert!(output.raw_html.contains("unpkg.com"));
    assert!(!output.raw_html.contains(VIEWPORT_META));
}

#[tokio::test]
async fn test_concept_summary_truncated_at_150_chars() {
    let research = "R".repeat(400);
    let generator = MockGenerator::new(&research, SIM_RESPONSE, RAW_RESPONSE);
    let pipeline = SimulationPipeline::new(generator, ORIGIN);

    let output = pipeline.run("Pendulum Motion").await.expect("run");
    let concepts = &output.artifact.concepts;

    assert_eq!(concepts.len(), 153);
    assert!(concepts.ends_with("..."));
    assert_eq!(&concepts[..150], &research[..150]);
}

#[tokio::test]
async fn test_body_markup_preserved_after_injection() {
    let generator = MockGenerator::new("research", SIM_RESPONSE, RAW_RESPONSE);
    let pipeline = SimulationPipeline::new(generator, ORIGIN);

    let output = pipeline.run("Pendulum Motion").await.expect("run");
    let html = &output.artifact.html_code;

    // The injected fragment lands in <head>; the body is untouched apart
    // from the import rewrite.
    assert!(html.contains(r#"<div id="simulation-container"></div>"#));
    assert!(html.contains("window.camera = null;"));
    let head_at = html.find("<head>").unwrap();
    let meta_at = html.find(VIEWPORT_META).unwrap();
    let title_at = html.find("<title>").unwrap();
    assert!(head_at < meta_at && meta_at < title_at);
}

// -- Failure isolation ------------------------------------------------------

#[tokio::test]
async fn test_research_failure_halts_downstream_phases() {
    let mut generator = MockGenerator::new("unused", SIM_RESPONSE, RAW_RESPONSE);
    generator.fail_research = true;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let pipeline = SimulationPipeline::new(generator, ORIGIN).with_events(tx);

    let err = pipeline.run("Pendulum Motion").await.unwrap_err();
    assert!(matches!(err, LabError::Transport { status: 500, .. }));

    let events = drain(&mut rx);
    let research = events_for(&events, PipelinePhase::Research);
    assert_eq!(research.last().unwrap().status, PhaseStatus::Error);

    // Analysis and simulation never leave pending.
    for phase in [PipelinePhase::Analysis, PipelinePhase::Simulation] {
        let phase_events = events_for(&events, phase);
        assert!(phase_events
            .iter()
            .all(|e| e.status == PhaseStatus::Pending));
    }
    assert!(events.iter().all(|e| e.progress <= 10));
}

#[tokio::test]
async fn test_simulation_failure_marks_only_simulation_phase() {
    let mut generator = MockGenerator::new("research", SIM_RESPONSE, RAW_RESPONSE);
    generator.fail_simulation = true;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let pipeline = SimulationPipeline::new(generator, ORIGIN).with_events(tx);

    let err = pipeline.run("Pendulum Motion").await.unwrap_err();
    assert!(matches!(err, LabError::Transport { status: 503, .. }));

    let events = drain(&mut rx);
    assert_eq!(
        events_for(&events, PipelinePhase::Research).last().unwrap().status,
        PhaseStatus::Completed
    );
    assert_eq!(
        events_for(&events, PipelinePhase::Analysis).last().unwrap().status,
        PhaseStatus::Completed
    );
    assert_eq!(
        events_for(&events, PipelinePhase::Simulation).last().unwrap().status,
        PhaseStatus::Error
    );
    assert!(events.iter().all(|e| e.progress <= 80));
}

#[tokio::test]
async fn test_failed_regeneration_leaves_previous_artifact_intact() {
    let generator = MockGenerator::new("research", SIM_RESPONSE, RAW_RESPONSE);
    let pipeline = SimulationPipeline::new(generator, ORIGIN);
    let first = pipeline.run("Pendulum Motion").await.expect("first run");
    let kept = first.artifact.clone();

    let mut failing = MockGenerator::new("research", SIM_RESPONSE, RAW_RESPONSE);
    failing.fail_simulation = true;
    let pipeline = SimulationPipeline::new(failing, ORIGIN);
    assert!(pipeline.run("Pendulum Motion").await.is_err());

    // The prior artifact is an immutable value; a failed run produced
    // nothing that could replace it.
    assert_eq!(kept.html_code, first.artifact.html_code);
    assert_eq!(kept.topic, "Pendulum Motion");
}

#[tokio::test]
async fn test_empty_topic_rejected_before_any_phase() {
    let generator = MockGenerator::new("research", SIM_RESPONSE, RAW_RESPONSE);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let pipeline = SimulationPipeline::new(generator, ORIGIN).with_events(tx);

    assert!(matches!(
        pipeline.run("   ").await,
        Err(LabError::InvalidTopic)
    ));
    assert!(drain(&mut rx).is_empty());
}

// -- Run supersession -------------------------------------------------------

#[tokio::test]
async fn test_superseded_run_aborts_without_error_events() {
    let generator = Arc::new(MockGenerator::new("research", SIM_RESPONSE, RAW_RESPONSE));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let pipeline = Arc::new(SimulationPipeline::new(generator.clone(), ORIGIN).with_events(tx));

    // Supersede the run from inside its own research call, as a competing
    // run would.
    let racing = Arc::clone(&pipeline);
    generator.set_hook(move || racing.supersede());

    let err = pipeline.run("Pendulum Motion").await.unwrap_err();
    assert!(matches!(err, LabError::Superseded));

    let events = drain(&mut rx);
    assert!(!events.iter().any(|e| e.status == PhaseStatus::Error));
    assert!(!events.iter().any(|e| e.status == PhaseStatus::Completed));
    assert!(events.iter().all(|e| e.progress <= 10));
}
