//! Massification Remediator: decides whether a score forces a repeat of the
//! mission, and mediates the repeat-until-pass loop.
//!
//! Rules:
//! - Attempt limit: unlimited.
//! - Rewards on a remediation attempt: none, even for a perfect score.
//! - Questions: exactly the frozen set of the original attempt, never resampled.
//! - Technique missions refuse to start while any mission in the trail still
//!   carries the flag, unless the learner explicitly opts to proceed.

use serde::Serialize;
use tracing::info;

use crate::domain::{Mission, MissionProgress, MissionType, ProgressStatus, PASSING_SCORE};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassAction {
  UnlockNext,
  RemediationRequired,
}

/// Result of the pass check. Total over all scores 0-100.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct PassCheck {
  pub passed: bool,
  pub score: u8,
  pub required_score: u8,
  pub action: PassAction,
}

pub fn check_pass(score: u8) -> PassCheck {
  let passed = score >= PASSING_SCORE;
  PassCheck {
    passed,
    score,
    required_score: PASSING_SCORE,
    action: if passed { PassAction::UnlockNext } else { PassAction::RemediationRequired },
  }
}

/// Stamp a failing attempt onto the learner's progress row. Idempotent per
/// (learner, mission): the row is updated in place and the attempt counters
/// increment, a duplicate record is never created.
pub fn mark_needs_remediation(progress: &mut MissionProgress, score: u8, now: u64) {
  progress.status = ProgressStatus::InProgress;
  progress.score = Some(score);
  progress.attempts += 1;
  progress.remediation_attempts += 1;
  progress.updated_at = now;
  info!(
    target: "mission",
    mission = %progress.mission_id,
    score,
    remediation_attempts = progress.remediation_attempts,
    "marked needs_remediation"
  );
}

/// Close out a remediation attempt. A pass completes the progress row; a
/// fail increments the counter and leaves the row open for the next retry.
/// Returns whether the learner passed.
pub fn complete_remediation(progress: &mut MissionProgress, score: u8, now: u64) -> bool {
  let passed = score >= PASSING_SCORE;
  progress.score = Some(score);
  progress.updated_at = now;
  if passed {
    progress.status = ProgressStatus::Completed;
  } else {
    progress.remediation_attempts += 1;
  }
  info!(
    target: "mission",
    mission = %progress.mission_id,
    score,
    passed,
    "remediation attempt closed"
  );
  passed
}

/// Gate decision for starting a technique mission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum TechniqueGate {
  /// Nothing pending, or the learner chose to proceed anyway.
  Cleared,
  /// Outstanding remediations block the start; the UI shows a choice screen.
  Blocked { pending_mission_ids: Vec<String> },
}

/// A technique mission must surface a choice screen instead of starting when
/// any mission in the trail carries the remediation flag. `proceed_anyway`
/// records the learner's explicit choice to skip clearing them first.
pub fn technique_gate(
  mission: &Mission,
  trail_missions: &[Mission],
  proceed_anyway: bool,
) -> TechniqueGate {
  if mission.kind != MissionType::Technique || proceed_anyway {
    return TechniqueGate::Cleared;
  }
  let pending: Vec<String> = trail_missions
    .iter()
    .filter(|m| m.needs_remediation && m.id != mission.id)
    .map(|m| m.id.clone())
    .collect();
  if pending.is_empty() {
    TechniqueGate::Cleared
  } else {
    TechniqueGate::Blocked { pending_mission_ids: pending }
  }
}

/// Per-learner remediation statistics, derived from progress rows.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct RemediationStats {
  pub total: u32,
  pub passed: u32,
  pub pending: u32,
}

pub fn remediation_stats<'a, I>(rows: I) -> RemediationStats
where
  I: IntoIterator<Item = &'a MissionProgress>,
{
  let mut stats = RemediationStats::default();
  for row in rows {
    if row.remediation_attempts == 0 {
      continue;
    }
    stats.total += 1;
    match row.status {
      ProgressStatus::Completed => stats.passed += 1,
      ProgressStatus::InProgress => stats.pending += 1,
    }
  }
  stats
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{MissionStatus, StudyMode};
  use std::collections::BTreeMap;

  fn progress(mission_id: &str) -> MissionProgress {
    MissionProgress {
      learner_id: "u1".into(),
      mission_id: mission_id.into(),
      answers: BTreeMap::new(),
      current_question_index: 0,
      mode: StudyMode::Zen,
      status: ProgressStatus::InProgress,
      score: None,
      attempts: 1,
      remediation_attempts: 0,
      started_at: 0,
      updated_at: 0,
    }
  }

  fn mission(id: &str, kind: MissionType, flagged: bool) -> Mission {
    Mission {
      id: id.into(),
      round_id: "r1".into(),
      subject_id: "law".into(),
      topic_id: None,
      order: 1,
      kind,
      status: MissionStatus::Completed,
      score: Some(40),
      attempts: 1,
      needs_remediation: flagged,
      remediation_attempt: 0,
      completed_at: None,
    }
  }

  #[test]
  fn check_pass_is_total_at_the_threshold() {
    assert!(!check_pass(0).passed);
    assert!(!check_pass(49).passed);
    assert!(check_pass(50).passed);
    assert!(check_pass(100).passed);
    assert_eq!(check_pass(49).action, PassAction::RemediationRequired);
    assert_eq!(check_pass(50).action, PassAction::UnlockNext);
    assert_eq!(check_pass(42).required_score, 50);
  }

  #[test]
  fn marking_twice_increments_rather_than_duplicates() {
    let mut p = progress("m1");
    mark_needs_remediation(&mut p, 30, 1);
    mark_needs_remediation(&mut p, 45, 2);
    assert_eq!(p.attempts, 3);
    assert_eq!(p.remediation_attempts, 2);
    assert_eq!(p.score, Some(45));
    assert_eq!(p.status, ProgressStatus::InProgress);
  }

  #[test]
  fn remediation_completes_on_pass_and_stays_open_on_fail() {
    let mut p = progress("m1");
    mark_needs_remediation(&mut p, 30, 1);
    assert!(!complete_remediation(&mut p, 45, 2));
    assert_eq!(p.status, ProgressStatus::InProgress);
    assert_eq!(p.remediation_attempts, 2);
    assert!(complete_remediation(&mut p, 70, 3));
    assert_eq!(p.status, ProgressStatus::Completed);
  }

  #[test]
  fn technique_gate_blocks_on_pending_flags() {
    let technique = mission("t1", MissionType::Technique, false);
    let trail = vec![mission("m1", MissionType::Normal, true), technique.clone()];
    match technique_gate(&technique, &trail, false) {
      TechniqueGate::Blocked { pending_mission_ids } => {
        assert_eq!(pending_mission_ids, vec!["m1".to_string()]);
      }
      TechniqueGate::Cleared => panic!("expected blocked"),
    }
    // Explicit learner choice wins.
    assert_eq!(technique_gate(&technique, &trail, true), TechniqueGate::Cleared);
    // Normal missions never gate.
    let normal = mission("m2", MissionType::Normal, false);
    assert_eq!(technique_gate(&normal, &trail, false), TechniqueGate::Cleared);
  }

  #[test]
  fn stats_count_only_rows_with_remediation_attempts() {
    let clean = progress("m1");
    let mut pending = progress("m2");
    mark_needs_remediation(&mut pending, 20, 1);
    let mut recovered = progress("m3");
    mark_needs_remediation(&mut recovered, 20, 1);
    complete_remediation(&mut recovered, 80, 2);

    let stats = remediation_stats([&clean, &pending, &recovered]);
    assert_eq!(stats.total, 2);
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.passed, 1);
  }
}
