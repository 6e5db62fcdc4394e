//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This composes the pure engine modules (slots, generator, state machine,
//! remediator, rewards, resume) over the persistence boundary:
//!   - trail onboarding and the trail map
//!   - starting a mission (question freeze, technique gate, content status)
//!   - recording answers (durable before returning)
//!   - finishing a mission (transitions, remediation, rewards, round advance)
//!   - resuming an in-flight session

use std::collections::HashSet;

use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::content::{ContentState, ContentStatus};
use crate::domain::{
  AnswerRecord, Level, Mission, MissionProgress, MissionResult, MissionStatus, MissionType,
  ProgressStatus, Question, Round, RoundStatus, StudyMode, Trail,
};
use crate::errors::EngineError;
use crate::generator::{generate_round_missions, GenContext};
use crate::massification::{
  complete_remediation, mark_needs_remediation, remediation_stats, technique_gate,
  RemediationStats, TechniqueGate,
};
use crate::missions::{apply_completion, current_mission, enter_mission};
use crate::progress::{resume_index, resumed_state, ResumedState};
use crate::questions::QuestionFilter;
use crate::rewards::{question_limit, reward_for_attempt, Reward};
use crate::slots::{initialize_slots, Slots};
use crate::state::AppState;
use crate::util::{score_percent, unix_millis};

/// The trail with its rounds and missions, plus the computed "current"
/// mission (lowest ordinal open mission of the active round).
#[derive(Clone, Debug, Serialize)]
pub struct TrailMap {
  pub trail: Trail,
  pub rounds: Vec<RoundWithMissions>,
  pub current_mission_id: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RoundWithMissions {
  pub round: Round,
  pub missions: Vec<Mission>,
}

/// Outcome of a start request. A technique mission with outstanding
/// remediations does not start; the UI shows the choice screen instead.
/// Served to clients via the protocol DTOs, which strip answer keys.
#[derive(Clone, Debug)]
pub enum StartMission {
  Started {
    mission: Mission,
    questions: Vec<Question>,
    content: ContentStatus,
    resume: Option<ResumedState>,
  },
  ChoiceRequired {
    pending_mission_ids: Vec<String>,
  },
}

#[derive(Clone, Debug, Serialize)]
pub struct FinishReport {
  pub mission_id: String,
  pub status: MissionStatus,
  pub needs_remediation: bool,
  pub score: u8,
  pub xp_awarded: u32,
  pub coins_awarded: u32,
  pub unlocked_mission_id: Option<String>,
  pub round_completed: bool,
  pub next_round_id: Option<String>,
}

fn slots_from_trail(state: &AppState, trail: &Trail) -> Slots {
  Slots {
    slot_a: trail
      .slot_a_subject_id
      .as_deref()
      .and_then(|id| state.catalog.subject(id))
      .cloned(),
    slot_b: trail
      .slot_b_subject_id
      .as_deref()
      .and_then(|id| state.catalog.subject(id))
      .cloned(),
  }
}

/// Generate and persist one round of missions for the trail. Returns `None`
/// when the catalog has nothing left to offer (empty-trail state, not an
/// error). Slot movement and review-pool retirements are written back onto
/// the trail row by the caller.
async fn generate_round(
  state: &AppState,
  trail: &mut Trail,
  number: u32,
  last_subject: Option<String>,
) -> Result<Option<(Round, Vec<Mission>)>, EngineError> {
  let subjects = state.catalog.subjects_for_program(&trail.program_id);

  let completed_topics: HashSet<String> = state
    .store
    .missions_for_trail(&trail.id)
    .await
    .into_iter()
    .filter(|m| m.status == MissionStatus::Completed)
    .filter_map(|m| m.topic_id)
    .collect();

  let mut ctx = GenContext {
    slots: slots_from_trail(state, trail),
    last_mission_subject_id: last_subject,
    review_pool: trail.review_pool.clone(),
  };

  let generated = generate_round_missions(
    &mut ctx,
    &subjects,
    &state.catalog.topics_by_subject,
    &completed_topics,
    state.settings.missions_per_round,
  );

  // Persist slot/pool movement regardless; an exhausted catalog is sticky.
  trail.slot_a_subject_id = ctx.slots.slot_a.map(|s| s.id);
  trail.slot_b_subject_id = ctx.slots.slot_b.map(|s| s.id);
  trail.review_pool = ctx.review_pool;

  if generated.is_empty() {
    warn!(target: "trail", trail = %trail.id, "no missions generated; trail is exhausted");
    return Ok(None);
  }

  let round = Round {
    id: Uuid::new_v4().to_string(),
    trail_id: trail.id.clone(),
    number,
    status: RoundStatus::Active,
    completed_at: None,
  };
  state.store.upsert_round(round.clone()).await?;

  let missions: Vec<Mission> = generated
    .into_iter()
    .enumerate()
    .map(|(i, gm)| Mission {
      id: Uuid::new_v4().to_string(),
      round_id: round.id.clone(),
      subject_id: gm.subject.id,
      topic_id: Some(gm.topic.id),
      order: (i + 1) as u32,
      kind: gm.kind,
      status: if i == 0 { MissionStatus::Available } else { MissionStatus::Locked },
      score: None,
      attempts: 0,
      needs_remediation: false,
      remediation_attempt: 0,
      completed_at: None,
    })
    .collect();
  state.store.insert_missions(&missions).await?;

  trail.current_round = number;
  Ok(Some((round, missions)))
}

/// Create the trail for (learner, program) and generate round 1. Idempotent:
/// an existing trail is returned as-is, never regenerated.
#[instrument(level = "info", skip(state), fields(%learner_id, %program_id))]
pub async fn create_trail(
  state: &AppState,
  learner_id: &str,
  program_id: &str,
  level: Level,
) -> Result<TrailMap, EngineError> {
  if let Some(existing) = state.store.find_trail(learner_id, program_id).await {
    info!(target: "trail", trail = %existing.id, "trail already exists; returning it");
    return trail_map_for(state, existing).await;
  }

  let subjects = state.catalog.subjects_for_program(program_id);
  let slots = initialize_slots(&subjects);
  let mut trail = Trail {
    id: Uuid::new_v4().to_string(),
    learner_id: learner_id.to_string(),
    program_id: program_id.to_string(),
    level,
    slot_a_subject_id: slots.slot_a.map(|s| s.id),
    slot_b_subject_id: slots.slot_b.map(|s| s.id),
    review_pool: Vec::new(),
    current_round: 1,
    created_at: unix_millis(),
  };
  state.store.upsert_trail(trail.clone()).await?;

  generate_round(state, &mut trail, 1, None).await?;
  state.store.upsert_trail(trail.clone()).await?;

  info!(target: "trail", trail = %trail.id, %learner_id, "trail created");
  trail_map_for(state, trail).await
}

/// The learner's trail map, or `None` when no trail exists yet.
#[instrument(level = "debug", skip(state), fields(%learner_id, %program_id))]
pub async fn get_trail_map(
  state: &AppState,
  learner_id: &str,
  program_id: &str,
) -> Result<Option<TrailMap>, EngineError> {
  match state.store.find_trail(learner_id, program_id).await {
    Some(trail) => trail_map_for(state, trail).await.map(Some),
    None => Ok(None),
  }
}

async fn trail_map_for(state: &AppState, trail: Trail) -> Result<TrailMap, EngineError> {
  let rounds = state.store.rounds_for_trail(&trail.id).await;
  let mut out = Vec::with_capacity(rounds.len());
  let mut current_mission_id = None;
  for round in rounds {
    let missions = state.store.missions_for_round(&round.id).await;
    if round.status == RoundStatus::Active && current_mission_id.is_none() {
      current_mission_id = current_mission(&missions).map(|m| m.id.clone());
    }
    out.push(RoundWithMissions { round, missions });
  }
  Ok(TrailMap { trail, rounds: out, current_mission_id })
}

/// Start (or re-enter) a mission: technique gate, state transition, question
/// freeze, attempt bookkeeping, content status.
#[instrument(level = "info", skip(state), fields(%learner_id, %mission_id, ?mode, proceed_anyway))]
pub async fn start_mission(
  state: &AppState,
  learner_id: &str,
  mission_id: &str,
  mode: StudyMode,
  proceed_anyway: bool,
) -> Result<StartMission, EngineError> {
  let mission = state
    .store
    .get_mission(mission_id)
    .await
    .ok_or_else(|| EngineError::MissionNotFound(mission_id.to_string()))?;
  let round = state
    .store
    .get_round(&mission.round_id)
    .await
    .ok_or_else(|| EngineError::RoundNotFound(mission.round_id.clone()))?;
  let trail = state
    .store
    .get_trail(&round.trail_id)
    .await
    .ok_or_else(|| EngineError::TrailNotFound(round.trail_id.clone()))?;

  if mission.kind == MissionType::Technique {
    let trail_missions = state.store.missions_for_trail(&trail.id).await;
    if let TechniqueGate::Blocked { pending_mission_ids } =
      technique_gate(&mission, &trail_missions, proceed_anyway)
    {
      info!(target: "mission", %mission_id, pending = pending_mission_ids.len(), "technique gate blocked start");
      return Ok(StartMission::ChoiceRequired { pending_mission_ids });
    }
  }

  let mut round_missions = state.store.missions_for_round(&round.id).await;
  enter_mission(&mut round_missions, mission_id)?;

  // Freeze the question set on first open. Racing sessions hit the
  // conflict-ignore path in the store and both see the winning list.
  let frozen = match state.store.get_frozen_questions(mission_id).await {
    Some(ids) => ids,
    None => {
      let subject = state
        .catalog
        .subject(&mission.subject_id)
        .ok_or_else(|| EngineError::InvalidRequest(format!("unknown subject {}", mission.subject_id)))?;
      let limit = question_limit(subject.category, trail.level);
      let filter = match (&mission.kind, &mission.topic_id) {
        (MissionType::Normal, Some(topic_id)) => QuestionFilter::Topic(topic_id.clone()),
        _ => QuestionFilter::Subject(mission.subject_id.clone()),
      };
      let fetched = state.bank.fetch_questions(&filter, limit).await;
      state.store.cache_questions(&fetched).await;
      let ids: Vec<String> = fetched.iter().map(|q| q.id.clone()).collect();
      state.store.freeze_mission_questions(mission_id, &ids).await?
    }
  };
  let questions = state.store.questions_by_ids(&frozen).await;

  // Resume an in-flight clean attempt; anything else starts fresh. A
  // remediation retry resets answers but keeps the attempt counters.
  let now = unix_millis();
  let progress = match state.store.get_progress(learner_id, mission_id).await {
    Some(p) if p.status == ProgressStatus::InProgress && !mission.needs_remediation => p,
    existing => {
      let (attempts, remediation_attempts) = existing
        .map(|p| (p.attempts.max(1), p.remediation_attempts))
        .unwrap_or((1, 0));
      let fresh = MissionProgress {
        learner_id: learner_id.to_string(),
        mission_id: mission_id.to_string(),
        answers: Default::default(),
        current_question_index: 0,
        mode,
        status: ProgressStatus::InProgress,
        score: None,
        attempts,
        remediation_attempts,
        started_at: now,
        updated_at: now,
      };
      state.store.save_progress(fresh.clone()).await?;
      fresh
    }
  };

  if let Some(m) = round_missions.iter_mut().find(|m| m.id == mission_id) {
    m.attempts = progress.attempts;
  }
  state.store.put_missions(&round_missions).await?;

  let content = state.content.get_content_status(mission_id).await;
  if content.state == ContentState::Failed {
    // Recoverable: the learner proceeds without a lesson while a fresh
    // generation attempt is kicked off.
    state.content.request_generation(mission_id).await;
  }

  let resume = resumed_state(&progress, &frozen);
  let mission = round_missions
    .into_iter()
    .find(|m| m.id == mission_id)
    .ok_or_else(|| EngineError::MissionNotFound(mission_id.to_string()))?;

  Ok(StartMission::Started { mission, questions, content, resume })
}

#[derive(Clone, Debug)]
pub struct AnswerOutcome {
  pub progress: MissionProgress,
  pub is_correct: bool,
  pub correct_option: String,
}

/// Grade and record one answer. Grading is server-side against the cached
/// question record; the save is durable before this returns, and a write
/// failure is surfaced as a retryable error, never dropped.
#[instrument(level = "info", skip(state, selected_option), fields(%learner_id, %mission_id, %question_id))]
pub async fn record_answer(
  state: &AppState,
  learner_id: &str,
  mission_id: &str,
  question_id: &str,
  selected_option: String,
) -> Result<AnswerOutcome, EngineError> {
  let mission = state
    .store
    .get_mission(mission_id)
    .await
    .ok_or_else(|| EngineError::MissionNotFound(mission_id.to_string()))?;

  // Same admission rule as entering the mission: a locked mission takes no
  // answers, and a cleanly-passed one stays closed so its progress row is
  // never reopened behind the resume contract's back.
  match mission.status {
    MissionStatus::Locked => {
      return Err(EngineError::MissionLocked(mission_id.to_string()));
    }
    MissionStatus::Completed if !mission.needs_remediation => {
      return Err(EngineError::InvalidRequest(format!(
        "mission {mission_id} is already completed"
      )));
    }
    MissionStatus::Available | MissionStatus::InProgress | MissionStatus::Completed => {}
  }

  let frozen = state.store.get_frozen_questions(mission_id).await;
  if let Some(ids) = &frozen {
    if !ids.iter().any(|id| id == question_id) {
      return Err(EngineError::InvalidRequest(format!(
        "question {question_id} is not part of mission {mission_id}"
      )));
    }
  }

  let wanted = [question_id.to_string()];
  let question = state
    .store
    .questions_by_ids(&wanted)
    .await
    .into_iter()
    .next()
    .ok_or_else(|| EngineError::InvalidRequest(format!("unknown question {question_id}")))?;
  let is_correct = question.correct_option == selected_option;

  let now = unix_millis();
  let mut progress = state
    .store
    .get_progress(learner_id, mission_id)
    .await
    .unwrap_or_else(|| MissionProgress {
      learner_id: learner_id.to_string(),
      mission_id: mission_id.to_string(),
      answers: Default::default(),
      current_question_index: 0,
      mode: StudyMode::default(),
      status: ProgressStatus::InProgress,
      score: None,
      attempts: 1,
      remediation_attempts: 0,
      started_at: now,
      updated_at: now,
    });

  progress
    .answers
    .insert(question_id.to_string(), AnswerRecord { selected_option, is_correct });
  progress.current_question_index = frozen
    .as_deref()
    .map(|ids| resume_index(ids, &progress.answers))
    .unwrap_or(progress.answers.len());
  progress.status = ProgressStatus::InProgress;
  progress.updated_at = now;

  state.store.save_progress(progress.clone()).await?;
  Ok(AnswerOutcome { progress, is_correct, correct_option: question.correct_option })
}

/// Finish the current attempt: compute the score over the frozen set, run
/// the state machine and the remediator, award rewards (zero on remediation
/// attempts), and advance the round when it closes.
#[instrument(level = "info", skip(state), fields(%learner_id, %mission_id))]
pub async fn finish_mission(
  state: &AppState,
  learner_id: &str,
  mission_id: &str,
) -> Result<FinishReport, EngineError> {
  let mission = state
    .store
    .get_mission(mission_id)
    .await
    .ok_or_else(|| EngineError::MissionNotFound(mission_id.to_string()))?;
  let round = state
    .store
    .get_round(&mission.round_id)
    .await
    .ok_or_else(|| EngineError::RoundNotFound(mission.round_id.clone()))?;
  let mut trail = state
    .store
    .get_trail(&round.trail_id)
    .await
    .ok_or_else(|| EngineError::TrailNotFound(round.trail_id.clone()))?;
  let mut progress = state
    .store
    .get_progress(learner_id, mission_id)
    .await
    .ok_or_else(|| {
      EngineError::InvalidRequest(format!("mission {mission_id} has no recorded attempt"))
    })?;

  let frozen = state
    .store
    .get_frozen_questions(mission_id)
    .await
    .unwrap_or_default();
  let total = frozen.len().max(progress.answers.len()) as u32;
  let correct = progress.answers.values().filter(|a| a.is_correct).count() as u32;
  let score = score_percent(correct, total);

  let was_remediation = mission.needs_remediation;
  let first_try = !was_remediation && progress.attempts <= 1;

  let now = unix_millis();
  let mut round_missions = state.store.missions_for_round(&round.id).await;
  let outcome = apply_completion(&mut round_missions, mission_id, score, now)?;
  state.store.put_missions(&round_missions).await?;

  if outcome.passed {
    if was_remediation {
      complete_remediation(&mut progress, score, now);
    } else {
      progress.status = ProgressStatus::Completed;
      progress.score = Some(score);
      progress.updated_at = now;
    }
  } else {
    // First fail or another failed retry: the row stays open and the frozen
    // question set stays exactly as it is.
    mark_needs_remediation(&mut progress, score, now);
  }
  state.store.save_progress(progress.clone()).await?;

  let result = MissionResult {
    mission_id: mission_id.to_string(),
    total_questions: total,
    correct_answers: correct,
    score,
  };
  // A failing attempt heads into remediation and earns nothing; rewards are
  // granted on the passing close of a clean attempt only.
  let reward = if outcome.passed {
    reward_for_attempt(&result, was_remediation, first_try)
  } else {
    Reward::default()
  };

  let mut next_round_id = None;
  if outcome.round_completed {
    let mut done = round.clone();
    done.status = RoundStatus::Completed;
    done.completed_at = Some(now);
    state.store.upsert_round(done).await?;

    let last_subject = round_missions.last().map(|m| m.subject_id.clone());
    if let Some((next_round, _)) =
      generate_round(state, &mut trail, round.number + 1, last_subject).await?
    {
      next_round_id = Some(next_round.id);
    }
    state.store.upsert_trail(trail).await?;
  }

  let updated = round_missions
    .into_iter()
    .find(|m| m.id == mission_id)
    .ok_or_else(|| EngineError::MissionNotFound(mission_id.to_string()))?;

  info!(
    target: "mission",
    %mission_id,
    score,
    passed = outcome.passed,
    was_remediation,
    xp = reward.xp,
    coins = reward.coins,
    "mission finished"
  );

  Ok(FinishReport {
    mission_id: mission_id.to_string(),
    status: updated.status,
    needs_remediation: updated.needs_remediation,
    score,
    xp_awarded: reward.xp,
    coins_awarded: reward.coins,
    unlocked_mission_id: outcome.unlocked_mission_id,
    round_completed: outcome.round_completed,
    next_round_id,
  })
}

/// Progress Restoration toward the UI: `None` when there is nothing to
/// resume.
#[instrument(level = "debug", skip(state), fields(%learner_id, %mission_id))]
pub async fn resume_mission(
  state: &AppState,
  learner_id: &str,
  mission_id: &str,
) -> Result<Option<ResumedState>, EngineError> {
  let Some(progress) = state.store.get_progress(learner_id, mission_id).await else {
    return Ok(None);
  };
  let frozen = state
    .store
    .get_frozen_questions(mission_id)
    .await
    .unwrap_or_default();
  Ok(resumed_state(&progress, &frozen))
}

/// Per-learner remediation statistics.
pub async fn remediation_stats_for(state: &AppState, learner_id: &str) -> RemediationStats {
  let rows = state.store.progress_for_learner(learner_id).await;
  remediation_stats(rows.iter())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Level;

  const LEARNER: &str = "u1";
  const PROGRAM: &str = "demo-prep";

  async fn onboarded_state() -> (AppState, TrailMap) {
    let state = AppState::for_tests();
    let map = create_trail(&state, LEARNER, PROGRAM, Level::Beginner)
      .await
      .unwrap();
    (state, map)
  }

  async fn answer_all(state: &AppState, mission_id: &str, correct: bool) {
    let frozen = state.store.get_frozen_questions(mission_id).await.unwrap();
    for q in state.store.questions_by_ids(&frozen).await {
      let selected = if correct {
        q.correct_option.clone()
      } else {
        q.options
          .iter()
          .find(|o| **o != q.correct_option)
          .unwrap()
          .clone()
      };
      let outcome = record_answer(state, LEARNER, mission_id, &q.id, selected)
        .await
        .unwrap();
      assert_eq!(outcome.is_correct, correct);
    }
  }

  async fn start(state: &AppState, mission_id: &str) -> StartMission {
    start_mission(state, LEARNER, mission_id, StudyMode::Zen, false)
      .await
      .unwrap()
  }

  #[tokio::test]
  async fn onboarding_builds_an_alternating_round() {
    let (_state, map) = onboarded_state().await;
    assert_eq!(map.rounds.len(), 1);
    let missions = &map.rounds[0].missions;
    // 6 alternating missions + technique capstone.
    assert_eq!(missions.len(), 7);
    assert_eq!(missions[0].status, MissionStatus::Available);
    assert!(missions[1..].iter().all(|m| m.status == MissionStatus::Locked));
    assert_eq!(missions.last().unwrap().kind, MissionType::Technique);
    for pair in missions[..6].windows(2) {
      assert_ne!(pair[0].subject_id, pair[1].subject_id);
    }
    // Law (weight 9) opens slot A.
    assert_eq!(missions[0].subject_id, "s-law");
    assert_eq!(map.current_mission_id.as_deref(), Some(missions[0].id.as_str()));
  }

  #[tokio::test]
  async fn create_trail_is_idempotent() {
    let (state, map) = onboarded_state().await;
    let again = create_trail(&state, LEARNER, PROGRAM, Level::Advanced)
      .await
      .unwrap();
    assert_eq!(again.trail.id, map.trail.id);
    assert_eq!(again.trail.level, Level::Beginner, "existing trail untouched");
  }

  #[tokio::test]
  async fn perfect_first_try_awards_full_reward() {
    let (state, map) = onboarded_state().await;
    let m1 = map.rounds[0].missions[0].id.clone();

    match start(&state, &m1).await {
      StartMission::Started { questions, .. } => assert!(!questions.is_empty()),
      StartMission::ChoiceRequired { .. } => panic!("normal mission never gates"),
    }
    answer_all(&state, &m1, true).await;
    let report = finish_mission(&state, LEARNER, &m1).await.unwrap();

    assert_eq!(report.score, 100);
    assert!(!report.needs_remediation);
    // Demo pool has 5 questions: 50 base + 20 streak + 50 perfect.
    assert_eq!(report.xp_awarded, 120);
    assert_eq!(report.coins_awarded, 12 + 10);
    let m2 = &map.rounds[0].missions[1].id;
    assert_eq!(report.unlocked_mission_id.as_deref(), Some(m2.as_str()));
  }

  #[tokio::test]
  async fn failing_flags_unlocks_next_and_awards_nothing() {
    let (state, map) = onboarded_state().await;
    let m1 = map.rounds[0].missions[0].id.clone();

    start(&state, &m1).await;
    answer_all(&state, &m1, false).await;
    let report = finish_mission(&state, LEARNER, &m1).await.unwrap();

    assert_eq!(report.score, 0);
    assert_eq!(report.status, MissionStatus::Completed);
    assert!(report.needs_remediation);
    assert_eq!(report.xp_awarded, 0);
    assert_eq!(report.coins_awarded, 0);
    assert!(report.unlocked_mission_id.is_some(), "fail still unlocks next");
  }

  #[tokio::test]
  async fn remediation_reuses_frozen_questions_and_earns_nothing() {
    let (state, map) = onboarded_state().await;
    let m1 = map.rounds[0].missions[0].id.clone();

    start(&state, &m1).await;
    let frozen_before = state.store.get_frozen_questions(&m1).await.unwrap();
    answer_all(&state, &m1, false).await;
    finish_mission(&state, LEARNER, &m1).await.unwrap();

    // Retry: identical ordered question set, fresh answers.
    match start(&state, &m1).await {
      StartMission::Started { questions, resume, .. } => {
        let ids: Vec<String> = questions.iter().map(|q| q.id.clone()).collect();
        assert_eq!(ids, frozen_before);
        let resume = resume.unwrap();
        assert!(resume.answers.is_empty(), "remediation starts clean");
        assert_eq!(resume.current_question_index, 0);
      }
      StartMission::ChoiceRequired { .. } => panic!("not a technique mission"),
    }
    answer_all(&state, &m1, true).await;
    let report = finish_mission(&state, LEARNER, &m1).await.unwrap();

    assert_eq!(report.score, 100);
    assert!(!report.needs_remediation, "flag cleared");
    assert_eq!(report.xp_awarded, 0, "remediation never rewards");
    assert_eq!(report.coins_awarded, 0);
    assert!(report.unlocked_mission_id.is_none(), "no second unlock");

    let frozen_after = state.store.get_frozen_questions(&m1).await.unwrap();
    assert_eq!(frozen_after, frozen_before);

    let stats = remediation_stats_for(&state, LEARNER).await;
    assert_eq!(stats.total, 1);
    assert_eq!(stats.passed, 1);
    assert_eq!(stats.pending, 0);
  }

  #[tokio::test]
  async fn resume_jumps_to_first_unanswered_question() {
    let (state, map) = onboarded_state().await;
    let m1 = map.rounds[0].missions[0].id.clone();

    start(&state, &m1).await;
    let frozen = state.store.get_frozen_questions(&m1).await.unwrap();
    let questions = state.store.questions_by_ids(&frozen).await;
    // Answer q1 and q3 out of order; q2 is the resume point.
    let q1 = questions[0].correct_option.clone();
    record_answer(&state, LEARNER, &m1, &frozen[0], q1).await.unwrap();
    let q3 = questions[2].correct_option.clone();
    record_answer(&state, LEARNER, &m1, &frozen[2], q3).await.unwrap();

    let resumed = resume_mission(&state, LEARNER, &m1).await.unwrap().unwrap();
    assert_eq!(resumed.current_question_index, 1);
    assert_eq!(resumed.answers.len(), 2);

    // Unknown questions are rejected: they would desynchronize the freeze.
    let err = record_answer(&state, LEARNER, &m1, "bogus", "a".into())
      .await
      .unwrap_err();
    assert!(matches!(err, EngineError::InvalidRequest(_)));
  }

  #[tokio::test]
  async fn passed_mission_stops_taking_answers() {
    let (state, map) = onboarded_state().await;
    let m1 = map.rounds[0].missions[0].id.clone();
    let m3 = map.rounds[0].missions[2].id.clone();

    start(&state, &m1).await;
    answer_all(&state, &m1, true).await;
    finish_mission(&state, LEARNER, &m1).await.unwrap();

    // A late save against the passed mission is rejected and the progress
    // row stays closed, so nothing resumes.
    let frozen = state.store.get_frozen_questions(&m1).await.unwrap();
    let q = state.store.questions_by_ids(&frozen).await.remove(0);
    let err = record_answer(&state, LEARNER, &m1, &q.id, q.correct_option.clone())
      .await
      .unwrap_err();
    assert!(matches!(err, EngineError::InvalidRequest(_)));
    assert!(resume_mission(&state, LEARNER, &m1).await.unwrap().is_none());
    let row = state.store.get_progress(LEARNER, &m1).await.unwrap();
    assert_eq!(row.status, ProgressStatus::Completed);

    // Locked missions take no answers either.
    let err = record_answer(&state, LEARNER, &m3, &q.id, q.correct_option)
      .await
      .unwrap_err();
    assert!(matches!(err, EngineError::MissionLocked(_)));
  }

  #[tokio::test]
  async fn technique_mission_gates_on_pending_remediation() {
    let (state, map) = onboarded_state().await;
    let missions = map.rounds[0].missions.clone();
    let technique_id = missions.last().unwrap().id.clone();

    // Fail the first mission to raise the flag, then pass through the rest.
    start(&state, &missions[0].id).await;
    answer_all(&state, &missions[0].id, false).await;
    finish_mission(&state, LEARNER, &missions[0].id).await.unwrap();
    for m in &missions[1..6] {
      start(&state, &m.id).await;
      answer_all(&state, &m.id, true).await;
      finish_mission(&state, LEARNER, &m.id).await.unwrap();
    }

    match start(&state, &technique_id).await {
      StartMission::ChoiceRequired { pending_mission_ids } => {
        assert_eq!(pending_mission_ids, vec![missions[0].id.clone()]);
      }
      StartMission::Started { .. } => panic!("expected the choice screen"),
    }

    // The learner may explicitly proceed anyway.
    let forced = start_mission(&state, LEARNER, &technique_id, StudyMode::Zen, true)
      .await
      .unwrap();
    assert!(matches!(forced, StartMission::Started { .. }));
  }

  #[tokio::test]
  async fn completing_a_round_activates_the_next_one() {
    let (state, map) = onboarded_state().await;
    let missions = map.rounds[0].missions.clone();

    let mut last_report = None;
    for m in &missions {
      start_mission(&state, LEARNER, &m.id, StudyMode::Zen, true)
        .await
        .unwrap();
      answer_all(&state, &m.id, true).await;
      last_report = Some(finish_mission(&state, LEARNER, &m.id).await.unwrap());
    }
    let last_report = last_report.unwrap();
    assert!(last_report.round_completed);
    assert!(last_report.next_round_id.is_some());

    let map = get_trail_map(&state, LEARNER, PROGRAM).await.unwrap().unwrap();
    assert_eq!(map.rounds.len(), 2);
    assert_eq!(map.rounds[0].round.status, RoundStatus::Completed);
    assert_eq!(map.rounds[1].round.status, RoundStatus::Active);
    let next = &map.rounds[1].missions;
    assert!(!next.is_empty());
    assert_eq!(next[0].status, MissionStatus::Available);
    assert_eq!(map.trail.current_round, 2);
    // Round 2 never repeats round 1's completed topics.
    let done: Vec<_> = missions.iter().filter_map(|m| m.topic_id.clone()).collect();
    for m in next.iter().filter(|m| m.kind == MissionType::Normal) {
      assert!(!done.contains(&m.topic_id.clone().unwrap()));
    }
  }
}
