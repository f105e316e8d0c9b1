//! Errors raised at the question-provider boundary.
//!
//! Both variants are recovered the same way by a session: the gate keeps
//! showing the waiting indicator and the player may ask for a retry.

/// Why a question list could not be obtained.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuestionError {
  /// Transport failure, HTTP error, missing API key or deadline elapsed.
  #[error("question provider unavailable: {0}")]
  ProviderUnavailable(String),

  /// The provider answered, but the payload is not a valid question list.
  #[error("malformed question data: {0}")]
  MalformedQuestionData(String),
}

impl From<reqwest::Error> for QuestionError {
  fn from(e: reqwest::Error) -> Self {
    QuestionError::ProviderUnavailable(e.to_string())
  }
}

impl From<serde_json::Error> for QuestionError {
  fn from(e: serde_json::Error) -> Self {
    QuestionError::MalformedQuestionData(e.to_string())
  }
}

pub type Result<T> = std::result::Result<T, QuestionError>;
