//! Slot Manager: the two "active subject" positions (A and B) that mission
//! generation alternates between.
//!
//! Slot A always holds the heavier of the two initial subjects. When a slot's
//! subject runs out of topics it is retired to the review pool and the next
//! unused subject by descending weight takes the position; with nothing left
//! to promote the slot stays empty and generation collapses to the other
//! slot (or stops when both are empty).

use crate::domain::{SlotName, Subject};

/// The current slot assignment. Invariant: both slots never hold the same
/// subject while alternative subjects exist.
#[derive(Clone, Debug, Default)]
pub struct Slots {
  pub slot_a: Option<Subject>,
  pub slot_b: Option<Subject>,
}

impl Slots {
  pub fn get(&self, name: SlotName) -> Option<&Subject> {
    match name {
      SlotName::A => self.slot_a.as_ref(),
      SlotName::B => self.slot_b.as_ref(),
    }
  }

  pub fn set(&mut self, name: SlotName, subject: Option<Subject>) {
    match name {
      SlotName::A => self.slot_a = subject,
      SlotName::B => self.slot_b = subject,
    }
  }

}

/// Pick the two highest-weight subjects, ties broken by ordering index.
/// The heavier subject lands in slot A.
pub fn initialize_slots(subjects: &[Subject]) -> Slots {
  let mut sorted: Vec<&Subject> = subjects.iter().collect();
  sorted.sort_by(|a, b| b.weight.cmp(&a.weight).then(a.order.cmp(&b.order)));

  Slots {
    slot_a: sorted.first().map(|s| (*s).clone()),
    slot_b: sorted.get(1).map(|s| (*s).clone()),
  }
}

/// Next unused subject by descending weight, excluding the given ids
/// (current slots plus the review pool).
pub fn next_subject_by_weight<'a>(
  subjects: &'a [Subject],
  exclude_ids: &[&str],
) -> Option<&'a Subject> {
  let mut available: Vec<&Subject> = subjects
    .iter()
    .filter(|s| !exclude_ids.contains(&s.id.as_str()))
    .collect();
  available.sort_by(|a, b| b.weight.cmp(&a.weight).then(a.order.cmp(&b.order)));
  available.into_iter().next()
}
