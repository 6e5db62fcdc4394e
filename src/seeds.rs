//! Seed data: a built-in demo catalog and a minimal demo question set.
//!
//! These guarantee the app is useful without external config or a question
//! bank: the catalog backs trail generation when no TOML is provided, and
//! the demo questions are the last-resort pool when the bank returns nothing
//! (a learner is never blocked on scarcity).

use crate::domain::{Level, Question, Subject, SubjectCategory, Topic};

const DEMO_PROGRAM: &str = "demo-prep";

/// Minimal two-subject program exercising both slots.
pub fn seed_subjects() -> Vec<Subject> {
  vec![
    Subject {
      id: "s-law".into(),
      program_id: DEMO_PROGRAM.into(),
      name: "Constitutional Law".into(),
      weight: 9,
      order: 1,
      category: SubjectCategory::Legal,
      topic_count: 3,
    },
    Subject {
      id: "s-port".into(),
      program_id: DEMO_PROGRAM.into(),
      name: "Portuguese".into(),
      weight: 7,
      order: 2,
      category: SubjectCategory::Language,
      topic_count: 3,
    },
    Subject {
      id: "s-math".into(),
      program_id: DEMO_PROGRAM.into(),
      name: "Logical Reasoning".into(),
      weight: 5,
      order: 3,
      category: SubjectCategory::Quantitative,
      topic_count: 2,
    },
    Subject {
      id: "s-it".into(),
      program_id: DEMO_PROGRAM.into(),
      name: "Computer Basics".into(),
      weight: 4,
      order: 4,
      category: SubjectCategory::It,
      topic_count: 2,
    },
  ]
}

pub fn seed_topics() -> Vec<Topic> {
  fn topic(id: &str, subject: &str, name: &str, order: u32, difficulty: Level) -> Topic {
    Topic {
      id: id.into(),
      subject_id: subject.into(),
      name: name.into(),
      order,
      difficulty,
    }
  }

  vec![
    topic("t-law-1", "s-law", "Fundamental rights", 1, Level::Beginner),
    topic("t-law-2", "s-law", "Separation of powers", 2, Level::Intermediate),
    topic("t-law-3", "s-law", "Judicial review", 3, Level::Advanced),
    topic("t-port-1", "s-port", "Reading comprehension", 1, Level::Beginner),
    topic("t-port-2", "s-port", "Verb agreement", 2, Level::Intermediate),
    topic("t-port-3", "s-port", "Cohesion and coherence", 3, Level::Advanced),
    topic("t-math-1", "s-math", "Propositional logic", 1, Level::Beginner),
    topic("t-math-2", "s-math", "Counting and probability", 2, Level::Intermediate),
    topic("t-it-1", "s-it", "Operating systems", 1, Level::Beginner),
    topic("t-it-2", "s-it", "Network fundamentals", 2, Level::Beginner),
  ]
}

/// Small built-in question pool, served when the question bank yields zero
/// items. Generic enough to be answerable for any topic.
pub fn demo_questions() -> Vec<Question> {
  fn q(id: &str, prompt: &str, options: [&str; 4], correct: &str) -> Question {
    Question {
      id: id.into(),
      prompt: prompt.into(),
      options: options.iter().map(|s| s.to_string()).collect(),
      correct_option: correct.into(),
    }
  }

  vec![
    q(
      "demo-q1",
      "A norm that conflicts with the constitution is:",
      ["Valid until repealed", "Unconstitutional", "Always criminal", "A decree"],
      "Unconstitutional",
    ),
    q(
      "demo-q2",
      "Pick the sentence with correct verb agreement:",
      [
        "The results was published.",
        "The results were published.",
        "The results is published.",
        "The results be published.",
      ],
      "The results were published.",
    ),
    q(
      "demo-q3",
      "If P implies Q and P is true, then:",
      ["Q is false", "Q is true", "P is false", "Nothing follows"],
      "Q is true",
    ),
    q(
      "demo-q4",
      "Which of these is an operating system?",
      ["HTTP", "Linux", "SQL", "JSON"],
      "Linux",
    ),
    q(
      "demo-q5",
      "The supremacy of the constitution means ordinary laws:",
      [
        "Override the constitution",
        "Must conform to the constitution",
        "Are never reviewed",
        "Expire yearly",
      ],
      "Must conform to the constitution",
    ),
  ]
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn seed_catalog_is_consistent() {
    let subjects = seed_subjects();
    let topics = seed_topics();
    for topic in &topics {
      assert!(
        subjects.iter().any(|s| s.id == topic.subject_id),
        "topic {} references unknown subject",
        topic.id
      );
    }
    for subject in &subjects {
      let count = topics.iter().filter(|t| t.subject_id == subject.id).count();
      assert_eq!(count as u32, subject.topic_count, "subject {}", subject.id);
    }
  }

  #[test]
  fn demo_questions_have_valid_answers() {
    for q in demo_questions() {
      assert!(q.options.contains(&q.correct_option), "question {}", q.id);
    }
  }
}
