//! Question Bank collaborator.
//!
//! The bank is external: given a topic/subject filter and a count it returns
//! an ordered list of question records, `count` or fewer when the pool is
//! smaller, and never errors on scarcity. When the remote bank is not
//! configured or returns nothing, we serve the built-in demo set so a
//! learner is never blocked; that path logs a warning.

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info, instrument, warn};

use crate::domain::Question;
use crate::seeds::demo_questions;

/// Retrieval filter toward the bank: a mission asks by topic when it has
/// one, by subject for catch-all review missions.
#[derive(Clone, Debug)]
pub enum QuestionFilter {
  Topic(String),
  Subject(String),
}

impl QuestionFilter {
  fn query_pair(&self) -> (&'static str, &str) {
    match self {
      QuestionFilter::Topic(id) => ("topic", id),
      QuestionFilter::Subject(id) => ("subject", id),
    }
  }
}

#[derive(Clone)]
pub struct QuestionBank {
  remote: Option<RemoteBank>,
  demo_pool: Vec<Question>,
}

#[derive(Clone)]
struct RemoteBank {
  client: reqwest::Client,
  base_url: String,
}

#[derive(Deserialize)]
struct BankResponse {
  questions: Vec<Question>,
}

impl QuestionBank {
  /// Construct from env: QUESTION_BANK_URL enables the remote bank,
  /// otherwise only the demo pool is served.
  pub fn from_env() -> Self {
    let remote = std::env::var("QUESTION_BANK_URL").ok().map(|base_url| {
      let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_default();
      RemoteBank { client, base_url }
    });
    match &remote {
      Some(r) => info!(target: "trail_backend", base_url = %r.base_url, "Question bank enabled."),
      None => info!(target: "trail_backend", "Question bank disabled (no QUESTION_BANK_URL). Using demo questions."),
    }
    Self { remote, demo_pool: demo_questions() }
  }

  /// Up to `count` questions for the filter. Scarcity is not an error; an
  /// empty result falls back to the demo pool.
  #[instrument(level = "info", skip(self), fields(count))]
  pub async fn fetch_questions(&self, filter: &QuestionFilter, count: u32) -> Vec<Question> {
    if let Some(remote) = &self.remote {
      match remote.fetch(filter, count).await {
        Ok(questions) if !questions.is_empty() => {
          if (questions.len() as u32) < count {
            warn!(
              target: "trail_backend",
              requested = count,
              got = questions.len(),
              "question bank pool smaller than requested"
            );
          }
          return questions;
        }
        Ok(_) => {
          warn!(target: "trail_backend", ?filter, "question bank returned zero questions; using demo set");
        }
        Err(e) => {
          error!(target: "trail_backend", error = %e, "question bank fetch failed; using demo set");
        }
      }
    } else {
      warn!(target: "trail_backend", ?filter, "no question bank configured; using demo set");
    }

    self
      .demo_pool
      .iter()
      .take(count as usize)
      .cloned()
      .collect()
  }
}

impl RemoteBank {
  async fn fetch(&self, filter: &QuestionFilter, count: u32) -> Result<Vec<Question>, String> {
    let (key, value) = filter.query_pair();
    let url = format!("{}/questions", self.base_url.trim_end_matches('/'));
    let resp = self
      .client
      .get(&url)
      .query(&[(key, value), ("limit", &count.to_string())])
      .send()
      .await
      .map_err(|e| format!("request failed: {e}"))?;

    if !resp.status().is_success() {
      return Err(format!("question bank returned HTTP {}", resp.status()));
    }

    let body: BankResponse = resp
      .json()
      .await
      .map_err(|e| format!("invalid bank response: {e}"))?;
    // The bank never over-delivers, but clamp anyway.
    let mut questions = body.questions;
    questions.truncate(count as usize);
    Ok(questions)
  }
}
