//! Progress Restoration: rebuild an in-flight mission session from persisted
//! state.
//!
//! The resume position is recomputed from the frozen question order, not read
//! from the stored index: answers can be saved out of order, which makes the
//! stored index stale. The contract toward the UI is "jump to the first
//! unanswered question; if everything is answered, land on the last question
//! so the learner can submit".

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::{AnswerRecord, MissionProgress, ProgressStatus, StudyMode};

/// What the UI needs to restore a session.
#[derive(Clone, Debug, Serialize)]
pub struct ResumedState {
  pub answers: BTreeMap<String, AnswerRecord>,
  pub current_question_index: usize,
  pub study_mode: StudyMode,
}

/// Index of the first unanswered question in the frozen order; the last
/// index when everything is answered, 0 for an empty order.
pub fn resume_index(
  question_order: &[String],
  answers: &BTreeMap<String, AnswerRecord>,
) -> usize {
  if question_order.is_empty() {
    return 0;
  }
  question_order
    .iter()
    .position(|qid| !answers.contains_key(qid))
    .unwrap_or(question_order.len() - 1)
}

/// Restore a session, or `None` when the mission has no open progress.
pub fn resumed_state(
  progress: &MissionProgress,
  question_order: &[String],
) -> Option<ResumedState> {
  match progress.status {
    ProgressStatus::Completed => None,
    ProgressStatus::InProgress => Some(ResumedState {
      answers: progress.answers.clone(),
      current_question_index: resume_index(question_order, &progress.answers),
      study_mode: progress.mode,
    }),
  }
}
