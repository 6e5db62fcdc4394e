//! Reward Calculator: pure mission-result -> XP/coin deltas, plus the
//! question-count limit table keyed by (subject category x proficiency level).
//!
//! Remediation attempts earn nothing regardless of correctness. That is a
//! business rule, not an oversight: rewards exist for first-pass learning,
//! the remediation loop exists for consolidation.

use serde::Serialize;

use crate::domain::{Level, MissionResult, SubjectCategory};

const XP_PER_CORRECT: u32 = 10;
const STREAK_THRESHOLD: u8 = 80;
const STREAK_BONUS: u32 = 20;
const PERFECT_BONUS: u32 = 50;
const FIRST_TRY_COINS: u32 = 10;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Reward {
  pub xp: u32,
  pub coins: u32,
}

/// Reward for a normal (non-remediation) attempt. `first_try` gates the coin
/// bonus: retries of any kind do not earn it.
pub fn calculate_reward(result: &MissionResult, first_try: bool) -> Reward {
  let base = result.correct_answers * XP_PER_CORRECT;
  let streak = if result.score >= STREAK_THRESHOLD { STREAK_BONUS } else { 0 };
  let perfect = if result.score == 100 { PERFECT_BONUS } else { 0 };

  let xp = base + streak + perfect;
  let coins = xp / 10 + if first_try { FIRST_TRY_COINS } else { 0 };
  Reward { xp, coins }
}

/// Reward for any attempt, remediation-aware. Remediation attempts are
/// always zero, even with a perfect score.
pub fn reward_for_attempt(result: &MissionResult, is_remediation: bool, first_try: bool) -> Reward {
  if is_remediation {
    Reward::default()
  } else {
    calculate_reward(result, first_try)
  }
}

/// How many questions a mission holds, by subject category and learner level.
///
/// Legal subjects carry the heaviest load, quantitative the lightest; higher
/// proficiency raises the ceiling except for IT, where the ceiling is
/// level-independent.
pub fn question_limit(category: SubjectCategory, level: Level) -> u32 {
  match category {
    SubjectCategory::Legal => match level {
      Level::Beginner => 20,
      Level::Intermediate => 25,
      Level::Advanced => 30,
    },
    SubjectCategory::Language => match level {
      Level::Beginner => 15,
      Level::Intermediate => 20,
      Level::Advanced => 25,
    },
    SubjectCategory::It => 10,
    SubjectCategory::Quantitative => match level {
      Level::Beginner => 8,
      Level::Intermediate => 10,
      Level::Advanced => 12,
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn result(correct: u32, total: u32, score: u8) -> MissionResult {
    MissionResult {
      mission_id: "m1".into(),
      total_questions: total,
      correct_answers: correct,
      score,
    }
  }

  #[test]
  fn perfect_first_try_earns_all_bonuses() {
    // 10 correct of 10: xp = 100 + 20 (streak) + 50 (perfect) = 170,
    // coins = 17 + 10 (first try) = 27.
    let r = calculate_reward(&result(10, 10, 100), true);
    assert_eq!(r.xp, 170);
    assert_eq!(r.coins, 27);
  }

  #[test]
  fn streak_bonus_starts_at_eighty() {
    let below = calculate_reward(&result(7, 10, 70), true);
    assert_eq!(below.xp, 70);
    let at = calculate_reward(&result(8, 10, 80), true);
    assert_eq!(at.xp, 100);
  }

  #[test]
  fn retries_lose_the_first_try_coins() {
    let first = calculate_reward(&result(9, 10, 90), true);
    let retry = calculate_reward(&result(9, 10, 90), false);
    assert_eq!(first.xp, retry.xp);
    assert_eq!(first.coins, retry.coins + FIRST_TRY_COINS);
  }

  #[test]
  fn remediation_attempts_earn_nothing() {
    let r = reward_for_attempt(&result(10, 10, 100), true, false);
    assert_eq!(r, Reward::default());
    // And a failing normal attempt is computed as usual by the caller; the
    // zeroing is strictly about remediation.
    let normal = reward_for_attempt(&result(4, 10, 40), false, true);
    assert_eq!(normal.xp, 40);
  }

  #[test]
  fn question_limits_follow_category_and_level() {
    use Level::*;
    use SubjectCategory::*;
    assert_eq!(question_limit(Legal, Beginner), 20);
    assert_eq!(question_limit(Legal, Advanced), 30);
    assert!(question_limit(Legal, Advanced) > question_limit(Quantitative, Advanced));
    // IT is level-independent.
    assert_eq!(question_limit(It, Beginner), question_limit(It, Advanced));
  }
}
