//! Video-session collaborator.
//!
//! Thin client for a Tavus-style conversations API: create a session with a
//! persona, hand the join URL to the page, end the session on request. All
//! media transport is the provider's problem; this crate only holds the id.
//! Failures here are reported and logged, never fatal to the hosting view.

use serde::{Deserialize, Serialize};

use crate::error::LabError;

pub const SESSIONS_ENDPOINT: &str = "https://tavusapi.com/v2/conversations";
/// Stock demo persona.
pub const DEFAULT_PERSONA_ID: &str = "p794081bc1df";
pub const SESSION_NAME: &str = "Interactive Learning Session";

#[derive(Debug, Serialize)]
struct CreateSessionRequest {
    persona_id: String,
    conversation_name: String,
    properties: SessionProperties,
}

#[derive(Debug, Serialize)]
struct SessionProperties {
    max_call_duration: u32,
    participant_left_timeout: u32,
    participant_absent_timeout: u32,
    enable_recording: bool,
    enable_transcription: bool,
}

impl Default for SessionProperties {
    fn default() -> Self {
        SessionProperties {
            max_call_duration: 3600,
            participant_left_timeout: 60,
            participant_absent_timeout: 300,
            enable_recording: false,
            enable_transcription: true,
        }
    }
}

/// A live video session, as returned by the collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub conversation_id: String,
    pub conversation_url: String,
    #[serde(default)]
    pub status: Option<String>,
}

pub struct SessionClient {
    client: reqwest::Client,
    api_key: String,
    persona_id: String,
    endpoint: String,
}

impl SessionClient {
    pub fn new(api_key: &str, persona_id: &str) -> Self {
        SessionClient {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            persona_id: persona_id.to_string(),
            endpoint: SESSIONS_ENDPOINT.to_string(),
        }
    }

    pub async fn create_session(&self) -> Result<Session, LabError> {
        let request = CreateSessionRequest {
            persona_id: self.persona_id.clone(),
            conversation_name: SESSION_NAME.to_string(),
            properties: SessionProperties::default(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("x-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), "session creation failed");
            return Err(LabError::Transport {
                status: status.as_u16(),
                body,
            });
        }

        let session: Session = response
            .json()
            .await
            .map_err(|e| LabError::MalformedResponse(format!("session envelope: {e}")))?;
        tracing::info!(id = %session.conversation_id, "video session created");
        Ok(session)
    }

    pub async fn end_session(&self, conversation_id: &str) -> Result<(), LabError> {
        let response = self
            .client
            .post(format!("{}/{}/end", self.endpoint, conversation_id))
            .header("x-api-key", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), conversation_id, "session end failed");
            return Err(LabError::Transport {
                status: status.as_u16(),
                body,
            });
        }
        tracing::info!(conversation_id, "video session ended");
        Ok(())
    }
}
