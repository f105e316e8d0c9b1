//! Question sources: the seam between a race session and whatever produces
//! its question list (OpenAI, or the offline bank).
//!
//! A source is asked once per session for `count` questions on a topic and
//! either produces a validated list or fails with a `QuestionError`.

use std::{future::Future, pin::Pin};

use rand::seq::SliceRandom;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::config::Prompts;
use crate::domain::{Question, RawQuestion};
use crate::error::{QuestionError, Result};
use crate::openai::OpenAI;
use crate::seeds::{hard_fallback_question, DEFAULT_TOPIC};
use crate::util::strip_code_fences;

pub type QuestionFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<Question>>> + Send + 'a>>;

pub trait QuestionSource: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Produce an ordered list of questions on `topic`, or fail.
    fn fetch_questions<'a>(&'a self, topic: &'a str, count: usize) -> QuestionFuture<'a>;
}

/// Parse a model reply into validated questions.
///
/// Accepts a bare JSON array or an object with a `questions` array, with or
/// without a Markdown code fence around it. Any invalid item rejects the whole
/// list, so a malformed question never reaches a race.
pub fn parse_question_list(text: &str) -> Result<Vec<Question>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Envelope {
        List(Vec<RawQuestion>),
        Wrapped { questions: Vec<RawQuestion> },
    }

    let body = strip_code_fences(text);
    let raw = match serde_json::from_str::<Envelope>(body)? {
        Envelope::List(items) | Envelope::Wrapped { questions: items } => items,
    };
    if raw.is_empty() {
        return Err(QuestionError::MalformedQuestionData("empty question list".into()));
    }
    raw.into_iter().map(Question::try_from).collect()
}

/// Selection policy used by the server.
///
/// With an OpenAI client, questions are generated and a failure is reported
/// as is (the gate shows the waiting state and offers a retry). Without one,
/// questions are drawn from the TOML bank and the built-in seeds.
pub struct QuestionBank {
    openai: Option<OpenAI>,
    prompts: Prompts,
    local: Vec<(String, Question)>,
}

impl QuestionBank {
    pub fn new(openai: Option<OpenAI>, prompts: Prompts, local: Vec<(String, Question)>) -> Self {
        Self { openai, prompts, local }
    }

    pub fn is_online(&self) -> bool {
        self.openai.is_some()
    }

    /// Pick up to `count` local questions: exact topic matches first, then the general pool.
    pub fn sample_local(&self, topic: &str, count: usize) -> Vec<Question> {
        let mut rng = rand::thread_rng();
        let matches_topic = |t: &str| t.eq_ignore_ascii_case(topic);

        let mut on_topic: Vec<&Question> = self.local.iter()
            .filter(|(t, _)| matches_topic(t.as_str()))
            .map(|(_, q)| q)
            .collect();
        on_topic.shuffle(&mut rng);

        let mut general: Vec<&Question> = self.local.iter()
            .filter(|(t, _)| !matches_topic(t.as_str()) && t.as_str() == DEFAULT_TOPIC)
            .map(|(_, q)| q)
            .collect();
        general.shuffle(&mut rng);

        let mut picked: Vec<Question> = on_topic.into_iter()
            .chain(general)
            .take(count)
            .cloned()
            .collect();
        if picked.is_empty() && count > 0 {
            warn!(target: "questions", %topic, "Local bank has nothing for topic; using hard fallback");
            picked.push(hard_fallback_question());
        }
        picked
    }
}

impl QuestionSource for QuestionBank {
    fn name(&self) -> &str {
        if self.is_online() { "openai" } else { "local_bank" }
    }

    fn fetch_questions<'a>(&'a self, topic: &'a str, count: usize) -> QuestionFuture<'a> {
        Box::pin(self.fetch(topic, count))
    }
}

impl QuestionBank {
    #[instrument(level = "info", skip(self), fields(source = self.name()))]
    async fn fetch(&self, topic: &str, count: usize) -> Result<Vec<Question>> {
        match &self.openai {
            Some(oa) => {
                let questions = oa.generate_questions(&self.prompts, topic, count).await?;
                info!(target: "questions", %topic, count = questions.len(), "Generated questions via OpenAI");
                Ok(questions)
            }
            None => {
                let questions = self.sample_local(topic, count);
                debug!(target: "questions", %topic, count = questions.len(), "Served questions from local bank");
                Ok(questions)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seeds::seed_questions;

    fn offline_bank() -> QuestionBank {
        let local = seed_questions()
            .into_iter()
            .map(|(t, q)| (t.to_string(), q))
            .collect();
        QuestionBank::new(None, Prompts::default(), local)
    }

    #[test]
    fn test_parse_bare_array() {
        let text = r#"[{"isMCQ": true, "question": "Q?", "options": ["a","b","c","d"], "correctAnswerIdx": 0, "explanation": "e"}]"#;
        let qs = parse_question_list(text).unwrap();
        assert_eq!(qs.len(), 1);
    }

    #[test]
    fn test_parse_wrapped_and_fenced() {
        let text = "```json\n{\"questions\": [{\"question\": \"Q?\", \"options\": [\"a\",\"b\",\"c\",\"d\"], \"correctAnswerIdx\": 2}]}\n```";
        let qs = parse_question_list(text).unwrap();
        assert_eq!(qs.len(), 1);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            parse_question_list("not json"),
            Err(QuestionError::MalformedQuestionData(_))
        ));
        assert!(parse_question_list("[]").is_err());
        let three_options = r#"[{"question": "Q?", "options": ["a","b","c"], "correctAnswerIdx": 0}]"#;
        assert!(parse_question_list(three_options).is_err());
    }

    #[test]
    fn test_sample_local_prefers_topic() {
        let bank = offline_bank();
        let qs = bank.sample_local("Python Basics", 3);
        assert_eq!(qs.len(), 3);
        let python: Vec<Question> = seed_questions()
            .into_iter()
            .filter(|(t, _)| *t == "Python Basics")
            .map(|(_, q)| q)
            .collect();
        assert!(qs.iter().all(|q| python.contains(q)));
    }

    #[test]
    fn test_sample_local_tops_up_from_general_pool() {
        let bank = offline_bank();
        let qs = bank.sample_local("C Basics", 5);
        assert_eq!(qs.len(), 5);
    }

    #[test]
    fn test_unknown_topic_never_comes_back_empty() {
        let bank = QuestionBank::new(None, Prompts::default(), Vec::new());
        let qs = bank.sample_local("Haskell", 5);
        assert_eq!(qs, vec![hard_fallback_question()]);
    }

    #[tokio::test]
    async fn test_offline_fetch_uses_local_bank() {
        let bank = offline_bank();
        assert_eq!(bank.name(), "local_bank");
        let qs = bank.fetch_questions(DEFAULT_TOPIC, 4).await.unwrap();
        assert_eq!(qs.len(), 4);
    }
}
