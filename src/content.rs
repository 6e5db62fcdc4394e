//! Content collaborator: lesson text and optional narration for a mission
//! are produced by an external asynchronous job. The engine only needs
//! "not ready / ready / failed".
//!
//! Policy: content stuck in `pending` past a bounded wait (default 5
//! minutes) is reported as failed and becomes eligible for a fresh
//! generation attempt; it is never retried infinitely in place. Content
//! failure is recoverable everywhere: the learner proceeds straight to the
//! questions without a lesson.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::util::unix_millis;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentState {
  Pending,
  Ready,
  Failed,
}

#[derive(Clone, Debug, Serialize)]
pub struct ContentStatus {
  pub state: ContentState,
  pub text: Option<String>,
  pub audio_url: Option<String>,
}

impl ContentStatus {
  fn failed() -> Self {
    Self { state: ContentState::Failed, text: None, audio_url: None }
  }
}

#[derive(Deserialize)]
struct RemoteStatus {
  state: ContentState,
  #[serde(default)]
  text: Option<String>,
  #[serde(default)]
  audio_url: Option<String>,
  /// Millis since epoch of the job's last update.
  #[serde(default)]
  updated_at: Option<u64>,
}

/// `pending` older than the stale window counts as failed.
pub fn effective_state(
  state: ContentState,
  updated_at: Option<u64>,
  now: u64,
  stale_after_ms: u64,
) -> ContentState {
  match state {
    ContentState::Pending => match updated_at {
      Some(ts) if now.saturating_sub(ts) > stale_after_ms => ContentState::Failed,
      _ => ContentState::Pending,
    },
    other => other,
  }
}

#[derive(Clone)]
pub struct ContentClient {
  remote: Option<Remote>,
  stale_after_ms: u64,
}

#[derive(Clone)]
struct Remote {
  client: reqwest::Client,
  base_url: String,
}

impl ContentClient {
  /// Construct from env: CONTENT_SERVICE_URL enables the remote job status
  /// lookups; without it every mission reports failed content and the UI
  /// skips the lesson phase.
  pub fn from_env(stale_after_secs: u64) -> Self {
    let remote = std::env::var("CONTENT_SERVICE_URL").ok().map(|base_url| {
      let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_default();
      Remote { client, base_url }
    });
    match &remote {
      Some(r) => info!(target: "trail_backend", base_url = %r.base_url, "Content service enabled."),
      None => info!(target: "trail_backend", "Content service disabled (no CONTENT_SERVICE_URL)."),
    }
    Self { remote, stale_after_ms: stale_after_secs * 1000 }
  }

  #[instrument(level = "info", skip(self), fields(%mission_id))]
  pub async fn get_content_status(&self, mission_id: &str) -> ContentStatus {
    let Some(remote) = &self.remote else {
      return ContentStatus::failed();
    };

    let url = format!(
      "{}/content/{}",
      remote.base_url.trim_end_matches('/'),
      mission_id
    );
    let resp = match remote.client.get(&url).send().await {
      Ok(r) if r.status().is_success() => r,
      Ok(r) => {
        warn!(target: "trail_backend", %mission_id, status = %r.status(), "content status lookup failed");
        return ContentStatus::failed();
      }
      Err(e) => {
        error!(target: "trail_backend", %mission_id, error = %e, "content service unreachable");
        return ContentStatus::failed();
      }
    };

    let status: RemoteStatus = match resp.json().await {
      Ok(s) => s,
      Err(e) => {
        error!(target: "trail_backend", %mission_id, error = %e, "invalid content status payload");
        return ContentStatus::failed();
      }
    };

    let state = effective_state(
      status.state,
      status.updated_at,
      unix_millis(),
      self.stale_after_ms,
    );
    if state == ContentState::Failed && status.state == ContentState::Pending {
      warn!(target: "trail_backend", %mission_id, "content generation stuck; reported failed");
    }
    ContentStatus { state, text: status.text, audio_url: status.audio_url }
  }

  /// Best-effort kick of a fresh generation attempt. Fire and forget: the
  /// learner is never blocked on the job.
  #[instrument(level = "info", skip(self), fields(%mission_id))]
  pub async fn request_generation(&self, mission_id: &str) {
    let Some(remote) = &self.remote else { return };
    let url = format!(
      "{}/content/{}/generate",
      remote.base_url.trim_end_matches('/'),
      mission_id
    );
    if let Err(e) = remote.client.post(&url).send().await {
      warn!(target: "trail_backend", %mission_id, error = %e, "content generation request failed");
    }
  }
}
