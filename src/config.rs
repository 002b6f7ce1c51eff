use std::env;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::LabError;
use crate::gateway;
use crate::session;

/// Optional on-disk overlay for [`LabConfig`]. Every field may be omitted;
/// environment variables win over file values.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_endpoint: Option<String>,
    pub tavus_api_key: Option<String>,
    pub persona_id: Option<String>,
    pub libs_dir: Option<String>,
}

/// Resolved application configuration.
#[derive(Debug, Clone)]
pub struct LabConfig {
    /// API key for the text-generation endpoint. Required for any run.
    pub gemini_api_key: String,
    /// Full URL of the `generateContent` endpoint.
    pub gemini_endpoint: String,
    /// API key for the video-session collaborator. Optional: without it the
    /// session routes report the collaborator as unconfigured.
    pub tavus_api_key: Option<String>,
    /// Persona used when creating a video session.
    pub persona_id: String,
    /// Directory of locally hosted library files served under /libs/.
    pub libs_dir: PathBuf,
}

pub const CONFIG_FILE: &str = "simulab.toml";

impl LabConfig {
    /// Load configuration: `simulab.toml` in the working directory (if any),
    /// then environment variables on top.
    pub fn load() -> Result<Self, LabError> {
        let file = match std::fs::read_to_string(CONFIG_FILE) {
            Ok(text) => toml::from_str::<FileConfig>(&text)
                .map_err(|e| LabError::Config(format!("{CONFIG_FILE}: {e}")))?,
            Err(_) => FileConfig::default(),
        };
        Self::from_parts(file)
    }

    fn from_parts(file: FileConfig) -> Result<Self, LabError> {
        let gemini_api_key = env::var("GEMINI_API_KEY")
            .ok()
            .or(file.gemini_api_key)
            .ok_or_else(|| {
                LabError::Config(
                    "GEMINI_API_KEY not set. Export it or add gemini_api_key to simulab.toml."
                        .to_string(),
                )
            })?;

        let gemini_endpoint = env::var("GEMINI_ENDPOINT")
            .ok()
            .or(file.gemini_endpoint)
            .unwrap_or_else(|| gateway::DEFAULT_ENDPOINT.to_string());

        let tavus_api_key = env::var("TAVUS_API_KEY").ok().or(file.tavus_api_key);

        let persona_id = env::var("TAVUS_PERSONA_ID")
            .ok()
            .or(file.persona_id)
            .unwrap_or_else(|| session::DEFAULT_PERSONA_ID.to_string());

        let libs_dir = env::var("SIMULAB_LIBS_DIR")
            .ok()
            .or(file.libs_dir)
            .unwrap_or_else(|| "libs".to_string());

        Ok(LabConfig {
            gemini_api_key,
            gemini_endpoint,
            tavus_api_key,
            persona_id,
            libs_dir: PathBuf::from(libs_dir),
        })
    }
}
