//! Application state: the catalog, the row store, and the external
//! collaborators (question bank, content service).
//!
//! The engine itself is a set of pure functions (slots, generator, state
//! machine, remediation, rewards, resume); this module owns the data they
//! run over. Persistence is an explicit boundary (`TrailStore`), never an
//! ambient global.

use std::collections::HashMap;

use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::config::{load_catalog_config_from_env, CatalogConfig, EngineSettings};
use crate::content::ContentClient;
use crate::domain::{Subject, Topic};
use crate::questions::QuestionBank;
use crate::seeds::{seed_subjects, seed_topics};
use crate::store::TrailStore;

/// Read-only subject/topic catalog, seeded or TOML-loaded at startup.
#[derive(Clone, Debug)]
pub struct Catalog {
    pub subjects: Vec<Subject>,
    pub topics_by_subject: HashMap<String, Vec<Topic>>,
}

impl Catalog {
    /// Build from a TOML config, validating references; topics pointing at an
    /// unknown subject are skipped with an error log.
    pub fn from_config(cfg: &CatalogConfig) -> Self {
        let mut subjects: Vec<Subject> = Vec::new();
        for sc in &cfg.subjects {
            let id = sc.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
            subjects.push(Subject {
                id,
                program_id: sc.program_id.clone(),
                name: sc.name.clone(),
                weight: sc.weight,
                order: sc.order,
                category: sc.category,
                topic_count: 0,
            });
        }

        let mut topics_by_subject: HashMap<String, Vec<Topic>> = HashMap::new();
        for tc in &cfg.topics {
            // Topics may reference the subject by id or by configured name.
            let subject = subjects
                .iter()
                .find(|s| s.id == tc.subject || s.name == tc.subject);
            let Some(subject) = subject else {
                error!(target: "trail_backend", topic = %tc.name, subject = %tc.subject, "Skipping topic: unknown subject.");
                continue;
            };
            let topic = Topic {
                id: tc.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string()),
                subject_id: subject.id.clone(),
                name: tc.name.clone(),
                order: tc.order,
                difficulty: tc.difficulty,
            };
            topics_by_subject.entry(subject.id.clone()).or_default().push(topic);
        }

        for subject in &mut subjects {
            if let Some(topics) = topics_by_subject.get_mut(&subject.id) {
                topics.sort_by_key(|t| t.order);
                subject.topic_count = topics.len() as u32;
            }
        }

        Self { subjects, topics_by_subject }
    }

    pub fn from_seeds() -> Self {
        let mut subjects = seed_subjects();
        let mut topics_by_subject: HashMap<String, Vec<Topic>> = HashMap::new();
        for topic in seed_topics() {
            topics_by_subject.entry(topic.subject_id.clone()).or_default().push(topic);
        }
        for topics in topics_by_subject.values_mut() {
            topics.sort_by_key(|t| t.order);
        }
        for subject in &mut subjects {
            subject.topic_count = topics_by_subject
                .get(&subject.id)
                .map(|t| t.len() as u32)
                .unwrap_or(0);
        }
        Self { subjects, topics_by_subject }
    }

    pub fn subject(&self, id: &str) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.id == id)
    }

    pub fn subjects_for_program(&self, program_id: &str) -> Vec<Subject> {
        self.subjects
            .iter()
            .filter(|s| s.program_id == program_id)
            .cloned()
            .collect()
    }

    pub fn topic(&self, topic_id: &str) -> Option<&Topic> {
        self.topics_by_subject
            .values()
            .flatten()
            .find(|t| t.id == topic_id)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: TrailStore,
    pub catalog: Catalog,
    pub bank: QuestionBank,
    pub content: ContentClient,
    pub settings: EngineSettings,
}

impl AppState {
    /// Build state from env: load the TOML catalog (or fall back to seeds),
    /// construct the store and collaborator clients.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg_opt = load_catalog_config_from_env();
        let settings = cfg_opt.as_ref().map(|c| c.engine.clone()).unwrap_or_default();

        let catalog = match &cfg_opt {
            Some(cfg) if !cfg.subjects.is_empty() => Catalog::from_config(cfg),
            _ => {
                info!(target: "trail_backend", "No catalog config; using built-in demo catalog.");
                Catalog::from_seeds()
            }
        };

        // Inventory summary by program.
        let mut count_by_program: HashMap<String, (usize, usize)> = HashMap::new();
        for subject in &catalog.subjects {
            let entry = count_by_program.entry(subject.program_id.clone()).or_insert((0, 0));
            entry.0 += 1;
            entry.1 += subject.topic_count as usize;
        }
        for (program, (subjects, topics)) in count_by_program {
            info!(target: "trail_backend", %program, subjects, topics, "Startup catalog inventory");
        }

        let content = ContentClient::from_env(settings.content_stale_after_secs);

        Self {
            store: TrailStore::new(),
            catalog,
            bank: QuestionBank::from_env(),
            content,
            settings,
        }
    }

    /// State over the seed catalog with no remote collaborators; used by the
    /// engine tests.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            store: TrailStore::new(),
            catalog: Catalog::from_seeds(),
            bank: QuestionBank::from_env(),
            content: ContentClient::from_env(300),
            settings: EngineSettings::default(),
        }
    }
}
