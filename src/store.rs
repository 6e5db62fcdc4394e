//! Persistence boundary: four logical row families (trails, rounds,
//! missions, mission_progress) plus the frozen per-mission question set.
//!
//! This is an in-memory implementation with the semantics a relational store
//! would give us: row CRUD keyed by id, natural composite keys for progress
//! and frozen questions, and upsert-with-conflict-ignore for the question
//! freeze. Progress saves are last-writer-wins full overwrites; the engine
//! never merges.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::domain::{Mission, MissionProgress, Question, Round, Trail};
use crate::errors::EngineError;

#[derive(Clone, Default)]
pub struct TrailStore {
  trails: Arc<RwLock<HashMap<String, Trail>>>,
  /// (learner_id, program_id) -> trail id.
  trail_by_owner: Arc<RwLock<HashMap<(String, String), String>>>,
  rounds: Arc<RwLock<HashMap<String, Round>>>,
  missions: Arc<RwLock<HashMap<String, Mission>>>,
  /// (learner_id, mission_id) -> progress row.
  progress: Arc<RwLock<HashMap<(String, String), MissionProgress>>>,
  /// mission_id -> ordered question ids, frozen at first open.
  mission_questions: Arc<RwLock<HashMap<String, Vec<String>>>>,
  /// Full question records by id, cached at freeze time so remediation
  /// attempts can serve the identical set without re-asking the bank.
  question_rows: Arc<RwLock<HashMap<String, Question>>>,
}

impl TrailStore {
  pub fn new() -> Self {
    Self::default()
  }

  // ---- trails ----

  pub async fn upsert_trail(&self, trail: Trail) -> Result<(), EngineError> {
    let mut trails = self.trails.write().await;
    let mut by_owner = self.trail_by_owner.write().await;
    by_owner.insert(
      (trail.learner_id.clone(), trail.program_id.clone()),
      trail.id.clone(),
    );
    trails.insert(trail.id.clone(), trail);
    Ok(())
  }

  pub async fn get_trail(&self, trail_id: &str) -> Option<Trail> {
    self.trails.read().await.get(trail_id).cloned()
  }

  pub async fn find_trail(&self, learner_id: &str, program_id: &str) -> Option<Trail> {
    let id = {
      let by_owner = self.trail_by_owner.read().await;
      by_owner
        .get(&(learner_id.to_string(), program_id.to_string()))
        .cloned()
    }?;
    self.get_trail(&id).await
  }

  // ---- rounds ----

  pub async fn upsert_round(&self, round: Round) -> Result<(), EngineError> {
    self.rounds.write().await.insert(round.id.clone(), round);
    Ok(())
  }

  pub async fn get_round(&self, round_id: &str) -> Option<Round> {
    self.rounds.read().await.get(round_id).cloned()
  }

  /// Rounds of a trail in sequence order.
  pub async fn rounds_for_trail(&self, trail_id: &str) -> Vec<Round> {
    let rounds = self.rounds.read().await;
    let mut out: Vec<Round> = rounds
      .values()
      .filter(|r| r.trail_id == trail_id)
      .cloned()
      .collect();
    out.sort_by_key(|r| r.number);
    out
  }

  // ---- missions ----

  pub async fn insert_missions(&self, batch: &[Mission]) -> Result<(), EngineError> {
    let mut missions = self.missions.write().await;
    for m in batch {
      missions.insert(m.id.clone(), m.clone());
    }
    info!(target: "trail_backend", count = batch.len(), "missions inserted");
    Ok(())
  }

  pub async fn put_missions(&self, batch: &[Mission]) -> Result<(), EngineError> {
    let mut missions = self.missions.write().await;
    for m in batch {
      missions.insert(m.id.clone(), m.clone());
    }
    Ok(())
  }

  pub async fn get_mission(&self, mission_id: &str) -> Option<Mission> {
    self.missions.read().await.get(mission_id).cloned()
  }

  /// Missions of a round in ordinal order.
  pub async fn missions_for_round(&self, round_id: &str) -> Vec<Mission> {
    let missions = self.missions.read().await;
    let mut out: Vec<Mission> = missions
      .values()
      .filter(|m| m.round_id == round_id)
      .cloned()
      .collect();
    out.sort_by_key(|m| m.order);
    out
  }

  /// All missions of a trail, round by round in order.
  pub async fn missions_for_trail(&self, trail_id: &str) -> Vec<Mission> {
    let mut out = Vec::new();
    for round in self.rounds_for_trail(trail_id).await {
      out.extend(self.missions_for_round(&round.id).await);
    }
    out
  }

  // ---- mission progress ----

  /// Durable full-row overwrite. The caller must not consider an answer
  /// recorded until this returns Ok.
  pub async fn save_progress(&self, row: MissionProgress) -> Result<(), EngineError> {
    let key = (row.learner_id.clone(), row.mission_id.clone());
    self.progress.write().await.insert(key, row);
    Ok(())
  }

  pub async fn get_progress(
    &self,
    learner_id: &str,
    mission_id: &str,
  ) -> Option<MissionProgress> {
    self
      .progress
      .read()
      .await
      .get(&(learner_id.to_string(), mission_id.to_string()))
      .cloned()
  }

  pub async fn progress_for_learner(&self, learner_id: &str) -> Vec<MissionProgress> {
    self
      .progress
      .read()
      .await
      .values()
      .filter(|p| p.learner_id == learner_id)
      .cloned()
      .collect()
  }

  // ---- frozen question sets ----

  /// Freeze the mission's question list, keyed (mission_id, question_id).
  /// Idempotent: a concurrent or repeated freeze is a duplicate-key conflict
  /// that we silently ignore, returning the list that won. The frozen order
  /// never changes once written.
  pub async fn freeze_mission_questions(
    &self,
    mission_id: &str,
    question_ids: &[String],
  ) -> Result<Vec<String>, EngineError> {
    let mut sets = self.mission_questions.write().await;
    if let Some(existing) = sets.get(mission_id) {
      debug!(target: "trail_backend", mission = %mission_id, "question set already frozen; conflict ignored");
      return Ok(existing.clone());
    }
    sets.insert(mission_id.to_string(), question_ids.to_vec());
    info!(target: "trail_backend", mission = %mission_id, count = question_ids.len(), "question set frozen");
    Ok(question_ids.to_vec())
  }

  pub async fn get_frozen_questions(&self, mission_id: &str) -> Option<Vec<String>> {
    self.mission_questions.read().await.get(mission_id).cloned()
  }

  pub async fn cache_questions(&self, questions: &[Question]) {
    let mut rows = self.question_rows.write().await;
    for q in questions {
      rows.entry(q.id.clone()).or_insert_with(|| q.clone());
    }
  }

  /// Question records in the given id order; ids without a cached record are
  /// skipped.
  pub async fn questions_by_ids(&self, ids: &[String]) -> Vec<Question> {
    let rows = self.question_rows.read().await;
    ids.iter().filter_map(|id| rows.get(id).cloned()).collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Level, ProgressStatus, StudyMode};
  use std::collections::BTreeMap;

  fn trail(id: &str, learner: &str) -> Trail {
    Trail {
      id: id.into(),
      learner_id: learner.into(),
      program_id: "p1".into(),
      level: Level::Beginner,
      slot_a_subject_id: None,
      slot_b_subject_id: None,
      review_pool: Vec::new(),
      current_round: 1,
      created_at: 0,
    }
  }

  fn progress_row(learner: &str, mission: &str, index: usize) -> MissionProgress {
    MissionProgress {
      learner_id: learner.into(),
      mission_id: mission.into(),
      answers: BTreeMap::new(),
      current_question_index: index,
      mode: StudyMode::Zen,
      status: ProgressStatus::InProgress,
      score: None,
      attempts: 1,
      remediation_attempts: 0,
      started_at: 0,
      updated_at: 0,
    }
  }

  #[tokio::test]
  async fn trail_lookup_by_owner() {
    let store = TrailStore::new();
    store.upsert_trail(trail("t1", "u1")).await.unwrap();
    let found = store.find_trail("u1", "p1").await.unwrap();
    assert_eq!(found.id, "t1");
    assert!(store.find_trail("u2", "p1").await.is_none());
  }

  #[tokio::test]
  async fn frozen_questions_ignore_duplicate_writes() {
    let store = TrailStore::new();
    let first = vec!["q1".to_string(), "q2".to_string()];
    let racing = vec!["q9".to_string()];

    let won = store.freeze_mission_questions("m1", &first).await.unwrap();
    assert_eq!(won, first);
    // Second writer loses silently and sees the winner's list.
    let lost = store.freeze_mission_questions("m1", &racing).await.unwrap();
    assert_eq!(lost, first);
    assert_eq!(store.get_frozen_questions("m1").await.unwrap(), first);
  }

  #[tokio::test]
  async fn progress_saves_are_last_writer_wins() {
    let store = TrailStore::new();
    store.save_progress(progress_row("u1", "m1", 1)).await.unwrap();
    store.save_progress(progress_row("u1", "m1", 4)).await.unwrap();
    let row = store.get_progress("u1", "m1").await.unwrap();
    assert_eq!(row.current_question_index, 4);
  }
}
