//! Application state: race tuning, topic list and the shared question source.
//!
//! This module owns:
//!   - the race tuning (from TOML or defaults)
//!   - the course list offered to the player
//!   - the question source every session draws from (OpenAI or the local bank)
//!
//! Sessions themselves are not stored here; each WebSocket connection owns its own.

use std::{sync::Arc, time::Duration};

use tracing::{error, info, instrument, warn};

use crate::config::{load_game_config_from_env, RaceTuning};
use crate::domain::Question;
use crate::openai::OpenAI;
use crate::provider::{QuestionBank, QuestionSource};
use crate::seeds::{seed_questions, seed_topics, DEFAULT_TOPIC};
use crate::session::SessionConfig;

/// Upper bound accepted from clients for `numCheckpoints`.
pub const MAX_CHECKPOINTS: u32 = 20;

#[derive(Clone)]
pub struct AppState {
    pub tuning: RaceTuning,
    pub topics: Vec<String>,
    pub source: Arc<dyn QuestionSource>,
    pub online: bool,
}

impl AppState {
    /// Build state from env: load config, merge the TOML bank with the seeds, init OpenAI.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_game_config_from_env().unwrap_or_default();

        let mut local: Vec<(String, Question)> = Vec::new();
        for (i, qc) in cfg.questions.into_iter().enumerate() {
            let topic = qc.topic;
            match Question::try_from(qc.question) {
                Ok(q) => local.push((topic, q)),
                Err(e) => {
                    error!(target: "questions", idx = i, %topic, error = %e, "Skipping bank item: invalid question");
                }
            }
        }
        let bank_size = local.len();
        local.extend(seed_questions().into_iter().map(|(t, q)| (t.to_string(), q)));
        info!(target: "questions", local_bank = bank_size, total = local.len(), "Startup question inventory");

        let topics = if cfg.topics.is_empty() { seed_topics() } else { cfg.topics };

        let openai = OpenAI::from_env();
        if let Some(oa) = &openai {
            info!(target: "quizrace", base_url = %oa.base_url, model = %oa.model, "OpenAI enabled.");
        } else {
            info!(target: "quizrace", "OpenAI disabled (no OPENAI_API_KEY). Using local question bank.");
        }

        let bank = QuestionBank::new(openai, cfg.prompts, local);
        let online = bank.is_online();
        Self::with_source(Arc::new(bank), cfg.race, topics, online)
    }

    pub fn with_source(source: Arc<dyn QuestionSource>, tuning: RaceTuning, topics: Vec<String>, online: bool) -> Self {
        Self { tuning, topics, source, online }
    }

    /// Per-session parameters for a `start_race` request.
    pub fn session_config(&self, topic: Option<&str>, num_checkpoints: Option<u32>) -> SessionConfig {
        let topic = topic
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TOPIC)
            .to_string();

        let requested = num_checkpoints.unwrap_or(self.tuning.num_checkpoints);
        if requested > MAX_CHECKPOINTS {
            warn!(target: "race", requested, max = MAX_CHECKPOINTS, "Checkpoint count clamped");
        }

        let num_checkpoints = requested.min(MAX_CHECKPOINTS);
        SessionConfig {
            topic,
            num_checkpoints,
            // every checkpoint needs its own question
            question_count: self.tuning.question_count.max(num_checkpoints as usize),
            fetch_timeout: Duration::from_secs(self.tuning.fetch_timeout_secs),
            hold_countdown: self.tuning.countdown_waits_for_questions,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
