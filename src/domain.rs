//! Domain models: question variants, the raw shape they arrive in, and answer selections.

use serde::{Deserialize, Serialize};

use crate::error::QuestionError;

/// Marker for a blank in a programming question's code listing.
pub const PLACEHOLDER: &str = "___";

/// Every multiple-choice question carries exactly this many options.
pub const MCQ_OPTION_COUNT: usize = 4;

/// A validated question. Immutable once a session has received it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Question {
  Mcq(McqQuestion),
  Programming(ProgrammingQuestion),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct McqQuestion {
  pub question: String,
  pub options: Vec<String>,
  pub correct_answer_idx: usize,
  pub explanation: String,
}

/// Fill-in-the-code question: `code` holds one `PLACEHOLDER` per entry of `correct_sequence`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgrammingQuestion {
  pub question: String,
  pub code: String,
  pub fragments: Vec<String>,
  pub correct_sequence: Vec<String>,
  pub explanation: String,
}

/// What the player handed in for the displayed question.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSelection {
  /// Option index of a multiple-choice question.
  Choice(usize),
  /// Fragment placed in each blank, in order; `None` for an empty blank.
  Arrangement(Vec<Option<String>>),
}

/// Question as produced by the model or written in the TOML bank.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawQuestion {
  #[serde(default = "default_true", rename = "isMCQ", alias = "is_mcq")]
  pub is_mcq: bool,
  pub question: String,
  #[serde(default)]
  pub options: Vec<String>,
  #[serde(default, alias = "correct_answer_idx")]
  pub correct_answer_idx: Option<i64>,
  #[serde(default)]
  pub explanation: String,
  #[serde(default)]
  pub code: String,
  #[serde(default)]
  pub fragments: Vec<String>,
  #[serde(default, alias = "correct_sequence")]
  pub correct_sequence: Vec<String>,
}

fn default_true() -> bool { true }

impl TryFrom<RawQuestion> for Question {
  type Error = QuestionError;

  fn try_from(raw: RawQuestion) -> Result<Self, Self::Error> {
    let malformed = |why: String| QuestionError::MalformedQuestionData(why);

    if raw.question.trim().is_empty() {
      return Err(malformed("empty question text".into()));
    }

    if raw.is_mcq {
      if raw.options.len() != MCQ_OPTION_COUNT {
        return Err(malformed(format!("expected {} options, got {}", MCQ_OPTION_COUNT, raw.options.len())));
      }
      let idx = raw.correct_answer_idx
        .ok_or_else(|| malformed("missing correctAnswerIdx".into()))?;
      if !(0..MCQ_OPTION_COUNT as i64).contains(&idx) {
        return Err(malformed(format!("correctAnswerIdx {} out of range", idx)));
      }
      return Ok(Question::Mcq(McqQuestion {
        question: raw.question,
        options: raw.options,
        correct_answer_idx: idx as usize,
        explanation: raw.explanation,
      }));
    }

    let blanks = raw.code.matches(PLACEHOLDER).count();
    if blanks == 0 {
      return Err(malformed("programming question has no placeholders".into()));
    }
    if blanks != raw.correct_sequence.len() {
      return Err(malformed(format!(
        "{} placeholders but correctSequence has {} entries", blanks, raw.correct_sequence.len()
      )));
    }
    if let Some(missing) = raw.correct_sequence.iter().find(|s| !raw.fragments.contains(*s)) {
      return Err(malformed(format!("fragment '{}' of correctSequence not offered", missing)));
    }

    Ok(Question::Programming(ProgrammingQuestion {
      question: raw.question,
      code: raw.code,
      fragments: raw.fragments,
      correct_sequence: raw.correct_sequence,
      explanation: raw.explanation,
    }))
  }
}

impl Question {
  pub fn text(&self) -> &str {
    match self {
      Question::Mcq(q) => &q.question,
      Question::Programming(q) => &q.question,
    }
  }

  pub fn explanation(&self) -> &str {
    match self {
      Question::Mcq(q) => &q.explanation,
      Question::Programming(q) => &q.explanation,
    }
  }

  /// All-or-nothing answer check. A selection of the wrong kind never matches.
  pub fn is_correct(&self, selection: &AnswerSelection) -> bool {
    match (self, selection) {
      (Question::Mcq(q), AnswerSelection::Choice(idx)) => *idx == q.correct_answer_idx,
      (Question::Programming(q), AnswerSelection::Arrangement(slots)) => {
        slots.len() == q.correct_sequence.len()
          && slots
            .iter()
            .zip(&q.correct_sequence)
            .all(|(slot, expected)| slot.as_deref() == Some(expected.as_str()))
      }
      _ => false,
    }
  }
}
