//! Mission State Machine: pure transitions over a round's mission set.
//!
//! `locked -> available -> in_progress -> completed`, with the side branch
//! `completed(needs_remediation=true)` that is re-enterable without changing
//! ordering position. Failing a mission still unlocks the next one; the flag
//! keeps the failed mission revisitable. This engine deliberately chooses
//! "failed but progress continues with a flag" over "failed and blocked".

use tracing::info;

use crate::domain::{Mission, MissionStatus};
use crate::errors::EngineError;
use crate::massification::check_pass;

/// What a completion did to the round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionOutcome {
  pub passed: bool,
  /// Was this attempt a remediation retry of an already-flagged mission?
  pub was_remediation: bool,
  /// Id of the mission flipped `locked -> available`, if any.
  pub unlocked_mission_id: Option<String>,
  /// True when every mission in the round is now completed.
  pub round_completed: bool,
}

/// Re-enter a mission for an attempt. Valid from `available`, `in_progress`
/// (idempotent) and from a flagged completion (remediation retry).
pub fn enter_mission(missions: &mut [Mission], mission_id: &str) -> Result<(), EngineError> {
  let mission = missions
    .iter_mut()
    .find(|m| m.id == mission_id)
    .ok_or_else(|| EngineError::MissionNotFound(mission_id.to_string()))?;

  match mission.status {
    MissionStatus::Locked => Err(EngineError::MissionLocked(mission_id.to_string())),
    MissionStatus::Available | MissionStatus::InProgress => {
      mission.status = MissionStatus::InProgress;
      Ok(())
    }
    MissionStatus::Completed => {
      if mission.needs_remediation {
        mission.status = MissionStatus::InProgress;
        Ok(())
      } else {
        Err(EngineError::InvalidRequest(format!(
          "mission {mission_id} is already completed"
        )))
      }
    }
  }
}

/// Apply a finished attempt with the given score (0-100).
///
/// First completion: status becomes `completed`, a failing score additionally
/// sets `needs_remediation`; either way exactly the next ordinal mission is
/// unlocked, and only that one. Remediation retry: a pass clears the flag and
/// stamps completion, a fail leaves it set; no further unlocking either way,
/// the next mission was already unlocked by the first attempt.
pub fn apply_completion(
  missions: &mut [Mission],
  mission_id: &str,
  score: u8,
  now: u64,
) -> Result<TransitionOutcome, EngineError> {
  let idx = missions
    .iter()
    .position(|m| m.id == mission_id)
    .ok_or_else(|| EngineError::MissionNotFound(mission_id.to_string()))?;

  let passed = check_pass(score).passed;
  let was_remediation = missions[idx].needs_remediation;

  {
    let mission = &mut missions[idx];
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

    mission.score = Some(score);
    mission.status = MissionStatus::Completed;
    if was_remediation {
      mission.remediation_attempt += 1;
      if passed {
        mission.needs_remediation = false;
        mission.completed_at = Some(now);
      }
    } else {
      mission.needs_remediation = !passed;
      if passed {
        mission.completed_at = Some(now);
      }
    }
  }

  // Unlock exactly the next ordinal mission, and only on the first
  // completion; a remediation retry changes nothing downstream.
  let mut unlocked = None;
  if !was_remediation {
    let next_order = missions[idx].order + 1;
    if let Some(next) = missions
      .iter_mut()
      .find(|m| m.order == next_order && m.status == MissionStatus::Locked)
    {
      next.status = MissionStatus::Available;
      unlocked = Some(next.id.clone());
    }
  }

  let round_completed = is_round_complete(missions);
  info!(
    target: "mission",
    id = %mission_id,
    score,
    passed,
    was_remediation,
    unlocked = unlocked.as_deref().unwrap_or("-"),
    round_completed,
    "completion applied"
  );

  Ok(TransitionOutcome {
    passed,
    was_remediation,
    unlocked_mission_id: unlocked,
    round_completed,
  })
}

/// A round is complete when every mission is completed, flagged or not.
pub fn is_round_complete(missions: &[Mission]) -> bool {
  !missions.is_empty()
    && missions
      .iter()
      .all(|m| m.status == MissionStatus::Completed)
}

/// The mission the learner should be looking at: the lowest ordinal among
/// available, in-progress, and flagged-for-remediation missions.
pub fn current_mission(missions: &[Mission]) -> Option<&Mission> {
  missions
    .iter()
    .filter(|m| match m.status {
      MissionStatus::Available | MissionStatus::InProgress => true,
      MissionStatus::Completed => m.needs_remediation,
      MissionStatus::Locked => false,
    })
    .min_by_key(|m| m.order)
}
