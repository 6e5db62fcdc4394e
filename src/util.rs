//! Small utility helpers used across modules.

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the unix epoch. All persisted timestamps use this.
pub fn unix_millis() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_millis() as u64)
    .unwrap_or(0)
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    s.to_string()
  } else {
    let cut = s
      .char_indices()
      .take_while(|(i, _)| *i <= max)
      .last()
      .map(|(i, _)| i)
      .unwrap_or(0);
    format!("{}… ({} bytes total)", &s[..cut], s.len())
  }
}

/// Integer percentage score, clamped to 0-100.
pub fn score_percent(correct: u32, total: u32) -> u8 {
  if total == 0 {
    return 0;
  }
  let pct = (correct as u64 * 100) / total as u64;
  pct.min(100) as u8
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn truncation_keeps_short_strings_intact() {
    assert_eq!(trunc_for_log("short", 16), "short");
    let long = trunc_for_log(&"x".repeat(100), 8);
    assert!(long.contains("100 bytes total"));
  }

  #[test]
  fn score_percent_rounds_down() {
    assert_eq!(score_percent(0, 10), 0);
    assert_eq!(score_percent(5, 10), 50);
    assert_eq!(score_percent(2, 3), 66);
    assert_eq!(score_percent(10, 10), 100);
    assert_eq!(score_percent(3, 0), 0);
  }
}
