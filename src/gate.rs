//! Question gate: reconciles checkpoint arrivals with the asynchronously
//! delivered question list, scores answers and drives the feedback pulses.
//!
//! `GameSession` is the per-race scoring state. It is owned by the session
//! driver and handed by reference to the functions here; nothing in this
//! module is shared or global.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{AnswerSelection, Question};
use crate::error::QuestionError;
use crate::race::RaceState;

/// Where the question fetch for this session stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    Loading,
    Ready,
    Unavailable,
}

/// Transient feedback shown for `FEEDBACK_PULSE` after an answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pulse {
    Correct,
    Incorrect,
}

/// Identifies one raise of a pulse so that only its own timer may clear it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PulseTicket {
    pub pulse: Pulse,
    pub seq: u64,
}

#[derive(Clone, Debug)]
pub struct GameSession {
    pub questions: Vec<Question>,
    pub current_question_idx: usize,
    pub score: u32,
    pub is_correct: bool,
    pub is_incorrect: bool,
    /// Reset to true whenever a new question comes up.
    pub is_correct_first_time: bool,
    pub provider: ProviderStatus,
    pulse_seq: u64,
}

impl Default for GameSession {
    fn default() -> Self {
        Self {
            questions: Vec::new(),
            current_question_idx: 0,
            score: 0,
            is_correct: false,
            is_incorrect: false,
            is_correct_first_time: true,
            provider: ProviderStatus::Loading,
            pulse_seq: 0,
        }
    }
}

impl GameSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Play Again: scoring restarts, the already fetched questions are kept.
    pub fn restart(&mut self) {
        *self = Self {
            questions: std::mem::take(&mut self.questions),
            provider: self.provider,
            // tickets issued before the restart must never match again
            pulse_seq: self.pulse_seq + 1,
            ..Self::default()
        };
    }

    /// Merge the outcome of the question fetch. The list is populated at most
    /// once; returns whether the result was applied.
    pub fn deliver_questions(&mut self, result: Result<Vec<Question>, QuestionError>) -> bool {
        if self.provider == ProviderStatus::Ready {
            warn!(target: "questions", "Question list already populated; ignoring second delivery");
            return false;
        }
        match result {
            Ok(questions) if !questions.is_empty() => {
                info!(target: "questions", count = questions.len(), "Question list delivered");
                self.questions = questions;
                self.provider = ProviderStatus::Ready;
            }
            Ok(_) => {
                warn!(target: "questions", "Provider returned an empty question list");
                self.provider = ProviderStatus::Unavailable;
            }
            Err(e) => {
                warn!(target: "questions", error = %e, "Question fetch failed; gate stays in waiting state");
                self.provider = ProviderStatus::Unavailable;
            }
        }
        true
    }

    /// A manual retry was requested. Only meaningful after a failure.
    pub fn begin_retry(&mut self) -> bool {
        if self.provider != ProviderStatus::Unavailable {
            return false;
        }
        self.provider = ProviderStatus::Loading;
        true
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_question_idx)
    }

    /// Raise one pulse; the other one is cleared.
    pub fn raise_pulse(&mut self, pulse: Pulse) -> PulseTicket {
        self.pulse_seq += 1;
        self.is_correct = pulse == Pulse::Correct;
        self.is_incorrect = pulse == Pulse::Incorrect;
        PulseTicket { pulse, seq: self.pulse_seq }
    }

    /// Clear a pulse when its timer fires, unless a newer raise superseded it.
    pub fn clear_pulse(&mut self, ticket: PulseTicket) -> bool {
        if ticket.seq != self.pulse_seq {
            debug!(target: "questions", seq = ticket.seq, latest = self.pulse_seq, "Superseded pulse timer ignored");
            return false;
        }
        match ticket.pulse {
            Pulse::Correct => self.is_correct = false,
            Pulse::Incorrect => self.is_incorrect = false,
        }
        true
    }
}

/// What the presentation layer should show below the track.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateView {
    /// Door closed: the race view.
    Racing,
    /// A question is due but none is available (yet).
    Waiting { provider_failed: bool },
    /// Door open on question `idx`.
    Question(usize),
}

pub fn view(race: &RaceState, session: &GameSession) -> GateView {
    if !race.awaiting_answer() {
        return GateView::Racing;
    }
    if session.current_question_idx < session.questions.len() {
        GateView::Question(session.current_question_idx)
    } else {
        GateView::Waiting { provider_failed: session.provider == ProviderStatus::Unavailable }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AnswerOutcome {
    /// `scored` is false when an earlier attempt at the same question failed.
    Correct { scored: bool },
    Incorrect,
    /// No question is on display right now.
    NotPending,
}

#[derive(Clone, Copy, Debug)]
pub struct Verdict {
    pub race: RaceState,
    pub outcome: AnswerOutcome,
    pub pulse: Option<PulseTicket>,
}

/// Score one submission against the displayed question.
///
/// On success the effects land in a fixed order: score, question index,
/// first-attempt flag, race relaunch, then the pulse.
pub fn submit_answer(race: RaceState, session: &mut GameSession, selection: &AnswerSelection) -> Verdict {
    let idx = match view(&race, session) {
        GateView::Question(idx) => idx,
        _ => {
            debug!(target: "questions", "Answer submitted with no question on display");
            return Verdict { race, outcome: AnswerOutcome::NotPending, pulse: None };
        }
    };

    let correct = session.questions[idx].is_correct(selection);
    if !correct {
        session.is_correct_first_time = false;
        let ticket = session.raise_pulse(Pulse::Incorrect);
        info!(target: "questions", idx, "Incorrect answer");
        return Verdict { race, outcome: AnswerOutcome::Incorrect, pulse: Some(ticket) };
    }

    let scored = session.is_correct_first_time;
    if scored {
        session.score += 1;
    }
    session.current_question_idx += 1;
    session.is_correct_first_time = true;
    let race = race.resume_after_answer();
    let ticket = session.raise_pulse(Pulse::Correct);
    info!(target: "questions", idx, scored, score = session.score, "Correct answer");

    Verdict { race, outcome: AnswerOutcome::Correct { scored }, pulse: Some(ticket) }
}
