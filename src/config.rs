//! Loading game configuration (prompts, race tuning, topics, local question bank) from TOML.
//!
//! See `GameConfig`, `Prompts` and `RaceTuning` for the expected schema.

use serde::Deserialize;
use tracing::{info, error};

use crate::domain::RawQuestion;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct GameConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub race: RaceTuning,
  /// Course list offered on the selection screen. Empty means built-in topics.
  #[serde(default)]
  pub topics: Vec<String>,
  #[serde(default)]
  pub questions: Vec<QuestionCfg>,
}

/// Question entry accepted in the TOML bank, tagged with the topic it belongs to.
#[derive(Clone, Debug, Deserialize)]
pub struct QuestionCfg {
  pub topic: String,
  #[serde(flatten)]
  pub question: RawQuestion,
}

/// Per-session race parameters.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RaceTuning {
  pub num_checkpoints: u32,
  /// How many questions to request from the provider.
  pub question_count: usize,
  /// Deadline for one question fetch; after it the player may retry.
  pub fetch_timeout_secs: u64,
  /// Hold the 3-2-1 countdown until the first question has arrived.
  pub countdown_waits_for_questions: bool,
}

impl Default for RaceTuning {
  fn default() -> Self {
    Self {
      num_checkpoints: 5,
      question_count: 5,
      fetch_timeout_secs: 30,
      countdown_waits_for_questions: false,
    }
  }
}

/// Prompts used by the OpenAI client. `{topic}` and `{count}` are substituted.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub question_system: String,
  pub question_user_template: String,
  pub temperature: f32,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      question_system: "You write short computer-science quiz questions for beginners. Respond ONLY with strict JSON.".into(),
      question_user_template: r#"Generate {count} random multiple-choice questions on {topic}.
Give questions that are useful for learning computer science.
Respond with a JSON object {"questions": [...]} where every item has this format:
{
  "isMCQ": true,
  "question": "Your question here?",
  "options": ["Option A", "Option B", "Option C", "Option D"],
  "correctAnswerIdx": index 0-3 of the correct option,
  "explanation": "Explanation for the correct answer"
}
Ensure options are distinct and only one correct answer is provided.
Here is a sample item:
{
  "isMCQ": true,
  "question": "What is the faster programming language?",
  "options": ["Perl", "Python", "Swift", "C"],
  "correctAnswerIdx": 3,
  "explanation": "C compiles ahead of time to native machine code."
}"#.into(),
      temperature: 0.7,
    }
  }
}

/// Attempt to load `GameConfig` from GAME_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_game_config_from_env() -> Option<GameConfig> {
  let path = std::env::var("GAME_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_game_config(&s) {
      Ok(cfg) => {
        info!(target: "quizrace", %path, topics = cfg.topics.len(), bank = cfg.questions.len(), "Loaded game config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "quizrace", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "quizrace", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

pub fn parse_game_config(s: &str) -> Result<GameConfig, toml::de::Error> {
  toml::from_str::<GameConfig>(s)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_config_uses_defaults() {
    let cfg = parse_game_config("").unwrap();
    assert_eq!(cfg.race.num_checkpoints, 5);
    assert_eq!(cfg.race.question_count, 5);
    assert!(!cfg.race.countdown_waits_for_questions);
    assert!(cfg.prompts.question_user_template.contains("{topic}"));
    assert!(cfg.topics.is_empty());
  }

  #[test]
  fn test_partial_race_table_and_bank() {
    let cfg = parse_game_config(r#"
topics = ["Rust Basics"]

[race]
num_checkpoints = 3
countdown_waits_for_questions = true

[[questions]]
topic = "Rust Basics"
question = "Which macro prints a line?"
options = ["print!", "println!", "write!", "format!"]
correctAnswerIdx = 1
explanation = "println! appends a newline."
"#).unwrap();

    assert_eq!(cfg.race.num_checkpoints, 3);
    assert_eq!(cfg.race.fetch_timeout_secs, 30);
    assert!(cfg.race.countdown_waits_for_questions);
    assert_eq!(cfg.topics, vec!["Rust Basics".to_string()]);
    assert_eq!(cfg.questions.len(), 1);
    assert_eq!(cfg.questions[0].question.correct_answer_idx, Some(1));
    assert!(cfg.questions[0].question.is_mcq);
  }
}
