//! Loading the program catalog (subjects + topics) and engine tuning from TOML.
//!
//! See `CatalogConfig` for the expected schema. Any IO/parse error falls back
//! to the built-in seed catalog so the app is always usable.

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::{Level, SubjectCategory};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct CatalogConfig {
  #[serde(default)]
  pub engine: EngineSettings,
  #[serde(default)]
  pub subjects: Vec<SubjectCfg>,
  #[serde(default)]
  pub topics: Vec<TopicCfg>,
}

/// Engine tuning knobs. Defaults match the product rules; override in TOML
/// only for experiments.
#[derive(Clone, Debug, Deserialize)]
pub struct EngineSettings {
  /// Alternating missions per round, before the technique capstone.
  #[serde(default = "default_missions_per_round")]
  pub missions_per_round: usize,
  /// Content stuck in `pending` longer than this is treated as failed.
  #[serde(default = "default_content_stale_secs")]
  pub content_stale_after_secs: u64,
}

fn default_missions_per_round() -> usize {
  6
}

fn default_content_stale_secs() -> u64 {
  5 * 60
}

impl Default for EngineSettings {
  fn default() -> Self {
    Self {
      missions_per_round: default_missions_per_round(),
      content_stale_after_secs: default_content_stale_secs(),
    }
  }
}

/// Subject entry accepted in TOML configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct SubjectCfg {
  #[serde(default)]
  pub id: Option<String>,
  pub program_id: String,
  pub name: String,
  pub weight: u32,
  pub order: u32,
  pub category: SubjectCategory,
}

/// Topic entry accepted in TOML configuration. `subject` references the
/// subject's id (or its configured name as a fallback key).
#[derive(Clone, Debug, Deserialize)]
pub struct TopicCfg {
  #[serde(default)]
  pub id: Option<String>,
  pub subject: String,
  pub name: String,
  pub order: u32,
  #[serde(default = "default_difficulty")]
  pub difficulty: Level,
}

fn default_difficulty() -> Level {
  Level::Beginner
}

/// Attempt to load `CatalogConfig` from CATALOG_CONFIG_PATH. On any
/// parsing/IO error, returns None.
pub fn load_catalog_config_from_env() -> Option<CatalogConfig> {
  let path = std::env::var("CATALOG_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<CatalogConfig>(&s) {
      Ok(cfg) => {
        info!(
          target: "trail_backend",
          %path,
          subjects = cfg.subjects.len(),
          topics = cfg.topics.len(),
          "Loaded catalog config (TOML)"
        );
        Some(cfg)
      }
      Err(e) => {
        error!(target: "trail_backend", %path, error = %e, "Failed to parse TOML catalog");
        None
      }
    },
    Err(e) => {
      error!(target: "trail_backend", %path, error = %e, "Failed to read TOML catalog file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn minimal_catalog_parses_with_defaults() {
    let cfg: CatalogConfig = toml::from_str(
      r#"
      [[subjects]]
      program_id = "prf"
      name = "Constitutional Law"
      weight = 9
      order = 1
      category = "legal"

      [[topics]]
      subject = "Constitutional Law"
      name = "Fundamental rights"
      order = 1
      "#,
    )
    .unwrap();

    assert_eq!(cfg.engine.missions_per_round, 6);
    assert_eq!(cfg.engine.content_stale_after_secs, 300);
    assert_eq!(cfg.subjects.len(), 1);
    assert_eq!(cfg.subjects[0].category, SubjectCategory::Legal);
    assert_eq!(cfg.topics[0].difficulty, Level::Beginner);
  }
}
