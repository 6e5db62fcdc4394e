//! Domain models for the adaptive trail engine: catalog entries (subjects,
//! topics), missions and rounds, the per-learner trail, and session progress.
//!
//! All status/type fields are closed enums so every transition site can match
//! exhaustively; a new variant is a compile error at each match site, never a
//! silent fall-through.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Minimum score (0-100) to pass a mission without remediation.
pub const PASSING_SCORE: u8 = 50;

/// Coarse subject grouping used by the question-count limit table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectCategory {
  Legal,
  Language,
  It,
  Quantitative,
}

/// Learner-declared proficiency tier. Also used as topic difficulty tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Level {
  #[default]
  Beginner,
  Intermediate,
  Advanced,
}

/// Immutable catalog entry: one subject of an exam-prep program.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Subject {
  pub id: String,
  pub program_id: String,
  pub name: String,
  /// Relative selection priority; heavier subjects enter the slots first.
  pub weight: u32,
  pub order: u32,
  pub category: SubjectCategory,
  pub topic_count: u32,
}

/// Immutable catalog entry: one topic, owned by exactly one subject.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Topic {
  pub id: String,
  pub subject_id: String,
  pub name: String,
  pub order: u32,
  pub difficulty: Level,
}

/// The two alternation positions holding the currently-active subjects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotName {
  A,
  B,
}

impl SlotName {
  pub fn other(self) -> SlotName {
    match self {
      SlotName::A => SlotName::B,
      SlotName::B => SlotName::A,
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionType {
  Normal,
  Review,
  /// Reserved wire value: round-exam missions exist in stored rows from
  /// other producers, but this engine never generates them.
  RoundExam,
  Technique,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
  Locked,
  Available,
  InProgress,
  Completed,
}

/// One lesson + practice-question unit. Created once per round-generation
/// pass, mutated in place by the state machine, never deleted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Mission {
  pub id: String,
  pub round_id: String,
  pub subject_id: String,
  pub topic_id: Option<String>,
  /// Ordering index within the round, 1-based.
  pub order: u32,
  pub kind: MissionType,
  pub status: MissionStatus,
  /// 0-100, `None` until attempted.
  pub score: Option<u8>,
  pub attempts: u32,
  /// Set on a failing completion; cleared by a passing remediation retry.
  /// Remediation repeats this same mission in place, frozen questions and
  /// all; no extra row is created.
  pub needs_remediation: bool,
  pub remediation_attempt: u32,
  pub completed_at: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
  Locked,
  Active,
  Completed,
}

/// A fixed-size batch of missions, unlocked sequentially.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Round {
  pub id: String,
  pub trail_id: String,
  pub number: u32,
  pub status: RoundStatus,
  pub completed_at: Option<u64>,
}

/// One per (learner, program): the learner's whole personalized path.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Trail {
  pub id: String,
  pub learner_id: String,
  pub program_id: String,
  pub level: Level,
  pub slot_a_subject_id: Option<String>,
  pub slot_b_subject_id: Option<String>,
  /// Subjects retired from the slots after their topics ran out.
  pub review_pool: Vec<String>,
  pub current_round: u32,
  pub created_at: u64,
}

/// Study mode chosen by the learner for a mission attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StudyMode {
  #[default]
  Zen,
  Timed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
  InProgress,
  Completed,
}

/// One recorded answer inside a mission attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
  pub selected_option: String,
  pub is_correct: bool,
}

/// Per (learner, mission) session state. High write rate, last-writer-wins;
/// overwritten on every answer, never merged.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MissionProgress {
  pub learner_id: String,
  pub mission_id: String,
  pub answers: BTreeMap<String, AnswerRecord>,
  /// Advisory only; resume recomputes from the frozen question order.
  pub current_question_index: usize,
  pub mode: StudyMode,
  pub status: ProgressStatus,
  pub score: Option<u8>,
  pub attempts: u32,
  pub remediation_attempts: u32,
  pub started_at: u64,
  pub updated_at: u64,
}

/// A question record as returned by the question bank collaborator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Question {
  pub id: String,
  pub prompt: String,
  pub options: Vec<String>,
  pub correct_option: String,
}

/// Outcome of a finished mission attempt, before the state machine runs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MissionResult {
  pub mission_id: String,
  pub total_questions: u32,
  pub correct_answers: u32,
  /// 0-100.
  pub score: u8,
}
