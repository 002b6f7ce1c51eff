//! Simulab — AI-generated interactive science simulations.
//!
//! The heart of the crate is the generation pipeline: a topic goes through a
//! research prompt, a concept summary, and a code-generation prompt, and the
//! untrusted HTML that comes back is sanitized, has its module imports
//! rewritten for sandboxed execution, and gets a responsiveness fragment
//! injected before it is presented through a transient document handle.
//!
//! Module map:
//! - **prompts**: prompt construction for both generation calls
//! - **gateway**: the `generateContent` client and the `TextGenerator` seam
//! - **sanitize**: markdown-fence stripping of raw model output
//! - **rewrite**: import-map removal and import-specifier rewriting
//! - **inject**: viewport/style/resize-script injection
//! - **pipeline**: the phase state machine orchestrating a run
//! - **sandbox**: exclusive, transient document handles for display
//! - **session**: video-session collaborator client
//! - **web**: embedded lab UI and serving surface
//! - **config** / **error** / **cli**: the usual plumbing

pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod inject;
pub mod pipeline;
pub mod prompts;
pub mod rewrite;
pub mod sanitize;
pub mod sandbox;
pub mod session;
pub mod web;

pub use error::LabError;
pub use gateway::{GeminiClient, TextGenerator};
pub use pipeline::{
    concept_summary, PhaseEvent, PhaseStatus, PipelinePhase, RunOutput, SimulationArtifact,
    SimulationPipeline,
};
pub use sandbox::SandboxStore;
