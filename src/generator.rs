//! Mission Generator: produces the ordered mission batch for a round by
//! alternating between the two active subject slots.
//!
//! Absolute rule: no two consecutive missions in a round share a subject,
//! as long as at least two subjects still have remaining topics. Enforced
//! purely by always picking the opposite slot from the previous mission's
//! subject. Slot replacement is an iterative loop bounded by the subject
//! count, so generation terminates even against an exhausted catalog.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::domain::{MissionType, SlotName, Subject, Topic};
use crate::slots::{next_subject_by_weight, Slots};

/// Mutable generation state threaded through one round-generation pass.
/// Slot replacements and review-pool retirements land here; the caller
/// persists the final slot assignment back onto the trail row.
#[derive(Clone, Debug)]
pub struct GenContext {
  pub slots: Slots,
  pub last_mission_subject_id: Option<String>,
  pub review_pool: Vec<String>,
}

/// One generated mission, before it becomes a persisted row.
#[derive(Clone, Debug)]
pub struct GeneratedMission {
  pub subject: Subject,
  pub topic: Topic,
  pub slot: SlotName,
  pub kind: MissionType,
}

fn exclude_ids<'a>(ctx: &'a GenContext) -> Vec<&'a str> {
  let mut ids: Vec<&str> = Vec::new();
  if let Some(s) = &ctx.slots.slot_a {
    ids.push(s.id.as_str());
  }
  if let Some(s) = &ctx.slots.slot_b {
    ids.push(s.id.as_str());
  }
  ids.extend(ctx.review_pool.iter().map(|s| s.as_str()));
  ids
}

/// Which slot is due next, given the previous mission's subject.
/// No previous mission means slot A.
fn due_slot(ctx: &GenContext) -> SlotName {
  match &ctx.last_mission_subject_id {
    None => SlotName::A,
    Some(last) => {
      if ctx.slots.slot_a.as_ref().map(|s| s.id.as_str()) == Some(last.as_str()) {
        SlotName::B
      } else {
        SlotName::A
      }
    }
  }
}

/// Generate the next mission, mutating `ctx` as slots get replaced or
/// retired. Returns `None` only when no subject has a usable topic left.
pub fn generate_next_mission(
  ctx: &mut GenContext,
  subjects: &[Subject],
  topics_by_subject: &HashMap<String, Vec<Topic>>,
  completed_topic_ids: &HashSet<String>,
) -> Option<GeneratedMission> {
  let mut slot = due_slot(ctx);

  // Bounded by the catalog size: each pass either emits a mission or
  // permanently removes one option (retires a subject or empties a slot).
  let max_passes = subjects.len() + 2;
  for _ in 0..max_passes {
    let current = match ctx.slots.get(slot) {
      Some(s) => s.clone(),
      None => {
        // Empty slot: try to promote the next unused subject.
        let exclude = exclude_ids(ctx);
        match next_subject_by_weight(subjects, &exclude) {
          Some(replacement) => {
            info!(target: "trail", slot = ?slot, subject = %replacement.id, "slot refilled");
            ctx.slots.set(slot, Some(replacement.clone()));
            replacement.clone()
          }
          None => {
            // Permanently skipped; collapse to the other slot if it still
            // holds a subject, otherwise generation is over.
            if ctx.slots.get(slot.other()).is_some() {
              slot = slot.other();
              continue;
            }
            debug!(target: "trail", "both slots empty and no replacement subject");
            return None;
          }
        }
      }
    };

    let topics = topics_by_subject
      .get(&current.id)
      .map(|t| t.as_slice())
      .unwrap_or(&[]);

    let mut ordered: Vec<&Topic> = topics.iter().collect();
    ordered.sort_by_key(|t| t.order);

    if let Some(next_topic) = ordered
      .iter()
      .find(|t| !completed_topic_ids.contains(&t.id))
    {
      return Some(GeneratedMission {
        subject: current.clone(),
        topic: (*next_topic).clone(),
        slot,
        kind: MissionType::Normal,
      });
    }

    // Subject finished: retire it to the review pool and vacate the slot so
    // the next call promotes a replacement.
    ctx.review_pool.push(current.id.clone());
    ctx.slots.set(slot, None);

    if let Some(first_topic) = ordered.first() {
      info!(target: "trail", subject = %current.id, "subject exhausted; emitting review mission");
      return Some(GeneratedMission {
        subject: current.clone(),
        topic: (*first_topic).clone(),
        slot,
        kind: MissionType::Review,
      });
    }
    // Subject with no topics at all: nothing reviewable, keep looking.
    debug!(target: "trail", subject = %current.id, "subject has no topics; retired without review");
  }

  None
}

/// Generate the full batch for one round: `size` alternating missions plus
/// exactly one trailing technique mission referencing the batch's final
/// subject with the slot label flipped.
pub fn generate_round_missions(
  ctx: &mut GenContext,
  subjects: &[Subject],
  topics_by_subject: &HashMap<String, Vec<Topic>>,
  completed_topic_ids: &HashSet<String>,
  size: usize,
) -> Vec<GeneratedMission> {
  let mut missions: Vec<GeneratedMission> = Vec::with_capacity(size + 1);
  let mut completed: HashSet<String> = completed_topic_ids.clone();

  for _ in 0..size {
    let Some(mission) = generate_next_mission(ctx, subjects, topics_by_subject, &completed) else {
      break;
    };
    completed.insert(mission.topic.id.clone());
    ctx.last_mission_subject_id = Some(mission.subject.id.clone());
    missions.push(mission);
  }

  if let Some(last) = missions.last().cloned() {
    missions.push(GeneratedMission {
      subject: last.subject,
      topic: last.topic,
      slot: last.slot.other(),
      kind: MissionType::Technique,
    });
  }

  info!(target: "trail", generated = missions.len(), "round batch generated");
  missions
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Level, SubjectCategory};
  use crate::slots::initialize_slots;

  fn subject(id: &str, weight: u32, order: u32) -> Subject {
    Subject {
      id: id.into(),
      program_id: "p1".into(),
      name: id.to_uppercase(),
      weight,
      order,
      category: SubjectCategory::Legal,
      topic_count: 0,
    }
  }

  fn topics(subject_id: &str, count: u32) -> Vec<Topic> {
    (1..=count)
      .map(|i| Topic {
        id: format!("{subject_id}-t{i}"),
        subject_id: subject_id.into(),
        name: format!("{subject_id} topic {i}"),
        order: i,
        difficulty: Level::Beginner,
      })
      .collect()
  }

  fn ctx_for(subjects: &[Subject]) -> GenContext {
    GenContext {
      slots: initialize_slots(subjects),
      last_mission_subject_id: None,
      review_pool: Vec::new(),
    }
  }

  #[test]
  fn round_alternates_subjects_and_ends_with_technique() {
    let subjects = vec![subject("law", 9, 1), subject("math", 5, 2)];
    let mut by_subject = HashMap::new();
    by_subject.insert("law".to_string(), topics("law", 4));
    by_subject.insert("math".to_string(), topics("math", 4));

    let mut ctx = ctx_for(&subjects);
    let batch =
      generate_round_missions(&mut ctx, &subjects, &by_subject, &HashSet::new(), 4);

    assert_eq!(batch.len(), 5);
    let ids: Vec<&str> = batch.iter().map(|m| m.subject.id.as_str()).collect();
    assert_eq!(&ids[..4], &["law", "math", "law", "math"]);
    // Topics follow each subject's own ordering.
    assert_eq!(batch[0].topic.id, "law-t1");
    assert_eq!(batch[2].topic.id, "law-t2");
    // Technique capstone references the final subject with the slot flipped.
    assert_eq!(batch[4].kind, MissionType::Technique);
    assert_eq!(batch[4].subject.id, "math");
    assert_eq!(batch[4].slot, batch[3].slot.other());
  }

  #[test]
  fn no_two_consecutive_normal_missions_share_a_subject() {
    let subjects = vec![subject("law", 9, 1), subject("port", 7, 2), subject("math", 5, 3)];
    let mut by_subject = HashMap::new();
    for s in &subjects {
      by_subject.insert(s.id.clone(), topics(&s.id, 2));
    }

    let mut ctx = ctx_for(&subjects);
    let batch =
      generate_round_missions(&mut ctx, &subjects, &by_subject, &HashSet::new(), 6);

    let normals: Vec<&GeneratedMission> = batch
      .iter()
      .filter(|m| m.kind != MissionType::Technique)
      .collect();
    for pair in normals.windows(2) {
      assert_ne!(pair[0].subject.id, pair[1].subject.id, "consecutive same subject");
    }
  }

  #[test]
  fn exhausted_subject_emits_review_then_gets_replaced() {
    let subjects = vec![subject("law", 9, 1), subject("math", 5, 2), subject("it", 3, 3)];
    let mut by_subject = HashMap::new();
    by_subject.insert("law".to_string(), topics("law", 1));
    by_subject.insert("math".to_string(), topics("math", 4));
    by_subject.insert("it".to_string(), topics("it", 4));

    let mut ctx = ctx_for(&subjects);
    let batch =
      generate_round_missions(&mut ctx, &subjects, &by_subject, &HashSet::new(), 5);

    // law: one normal topic, then a review on its next turn, then retired.
    assert_eq!(batch[0].subject.id, "law");
    assert_eq!(batch[0].kind, MissionType::Normal);
    assert_eq!(batch[2].subject.id, "law");
    assert_eq!(batch[2].kind, MissionType::Review);
    assert_eq!(batch[2].topic.id, "law-t1");
    assert!(ctx.review_pool.contains(&"law".to_string()));
    // The vacated slot gets the next subject by weight.
    assert!(batch[3..].iter().any(|m| m.subject.id == "it"));
  }

  #[test]
  fn empty_catalog_yields_no_missions() {
    let subjects: Vec<Subject> = Vec::new();
    let by_subject = HashMap::new();
    let mut ctx = ctx_for(&subjects);
    let batch =
      generate_round_missions(&mut ctx, &subjects, &by_subject, &HashSet::new(), 6);
    assert!(batch.is_empty());
  }

  #[test]
  fn fully_completed_catalog_terminates() {
    let subjects = vec![subject("law", 9, 1), subject("math", 5, 2)];
    let mut by_subject = HashMap::new();
    by_subject.insert("law".to_string(), topics("law", 2));
    by_subject.insert("math".to_string(), topics("math", 2));

    let completed: HashSet<String> = by_subject
      .values()
      .flatten()
      .map(|t| t.id.clone())
      .collect();

    let mut ctx = ctx_for(&subjects);
    let batch = generate_round_missions(&mut ctx, &subjects, &by_subject, &completed, 10);

    // Each subject reviews once, then both retire; plus the capstone.
    let reviews = batch.iter().filter(|m| m.kind == MissionType::Review).count();
    assert_eq!(reviews, 2);
    assert_eq!(batch.last().unwrap().kind, MissionType::Technique);
    assert!(batch.len() <= 3 + 1);
  }

  #[test]
  fn single_subject_collapses_to_one_slot() {
    let subjects = vec![subject("law", 9, 1)];
    let mut by_subject = HashMap::new();
    by_subject.insert("law".to_string(), topics("law", 3));

    let mut ctx = ctx_for(&subjects);
    let batch =
      generate_round_missions(&mut ctx, &subjects, &by_subject, &HashSet::new(), 3);

    let normals: Vec<&GeneratedMission> = batch
      .iter()
      .filter(|m| m.kind == MissionType::Normal)
      .collect();
    assert_eq!(normals.len(), 3);
    assert!(normals.iter().all(|m| m.subject.id == "law"));
  }
}
