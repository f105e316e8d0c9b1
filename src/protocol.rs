//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{AnswerSelection, Question};
use crate::gate::{AnswerOutcome, GateView, ProviderStatus};
use crate::race::{checkpoint_targets, CountdownPhase, FINISH_LINE};
use crate::session::SessionView;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    /// Starts (or replaces) the race bound to this connection.
    StartRace {
        #[serde(default)]
        topic: Option<String>,
        #[serde(default, rename = "numCheckpoints")]
        num_checkpoints: Option<u32>,
    },
    Accelerate {
        pressed: bool,
    },
    SubmitAnswer {
        #[serde(default)]
        choice: Option<usize>,
        #[serde(default)]
        arrangement: Option<Vec<Option<String>>>,
    },
    PlayAgain,
    RetryQuestions,
}

impl ClientWsMessage {
    /// Turn a `submit_answer` payload into a selection; exactly one of the two fields must be set.
    pub fn selection(choice: Option<usize>, arrangement: Option<Vec<Option<String>>>) -> Option<AnswerSelection> {
        match (choice, arrangement) {
            (Some(idx), None) => Some(AnswerSelection::Choice(idx)),
            (None, Some(slots)) => Some(AnswerSelection::Arrangement(slots)),
            _ => None,
        }
    }
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Snapshot {
        snapshot: SnapshotOut,
    },
    AnswerResult {
        outcome: AnswerOutcome,
        #[serde(skip_serializing_if = "Option::is_none")]
        explanation: Option<String>,
    },
    Error {
        message: String,
    },
}

/// Renderable session state. Never carries the answer key.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotOut {
    pub session_id: Uuid,
    pub topic: String,
    pub distance: f64,
    pub velocity: f64,
    pub is_accelerating: bool,
    pub is_game_complete: bool,
    pub is_door_closed: bool,
    pub current_checkpoint: u32,
    pub round: u32,
    pub num_checkpoints: u32,
    pub checkpoints: Vec<f64>,
    pub countdown: CountdownPhase,
    pub gate: GateOut,
    pub question: Option<QuestionOut>,
    pub current_question_idx: usize,
    pub question_count: usize,
    pub score: u32,
    pub is_correct: bool,
    pub is_incorrect: bool,
    pub provider: ProviderStatus,
}

#[derive(Debug, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GateOut {
    Racing,
    Waiting {
        #[serde(rename = "providerFailed")]
        provider_failed: bool,
    },
    Question,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionOut {
    Mcq {
        question: String,
        options: Vec<String>,
    },
    Programming {
        question: String,
        code: String,
        fragments: Vec<String>,
        slots: usize,
    },
}

impl From<&Question> for QuestionOut {
    fn from(q: &Question) -> Self {
        match q {
            Question::Mcq(m) => QuestionOut::Mcq {
                question: m.question.clone(),
                options: m.options.clone(),
            },
            Question::Programming(p) => QuestionOut::Programming {
                question: p.question.clone(),
                code: p.code.clone(),
                fragments: p.fragments.clone(),
                slots: p.correct_sequence.len(),
            },
        }
    }
}

impl From<GateView> for GateOut {
    fn from(g: GateView) -> Self {
        match g {
            GateView::Racing => GateOut::Racing,
            GateView::Waiting { provider_failed } => GateOut::Waiting { provider_failed },
            GateView::Question(_) => GateOut::Question,
        }
    }
}

/// Convert the internal session view to the public DTO.
pub fn to_out(v: &SessionView) -> SnapshotOut {
    let r = &v.race;
    SnapshotOut {
        session_id: v.session_id,
        topic: v.topic.clone(),
        distance: r.distance,
        velocity: r.velocity,
        is_accelerating: r.is_accelerating,
        is_game_complete: r.is_game_complete,
        is_door_closed: r.is_door_closed,
        current_checkpoint: r.current_checkpoint,
        round: r.round(),
        num_checkpoints: v.num_checkpoints,
        checkpoints: checkpoint_targets(v.num_checkpoints),
        countdown: r.countdown,
        gate: v.gate.into(),
        question: v.question.as_ref().map(QuestionOut::from),
        current_question_idx: v.current_question_idx,
        question_count: v.question_count,
        score: v.score,
        is_correct: v.is_correct,
        is_incorrect: v.is_incorrect,
        provider: v.provider,
    }
}

//
// HTTP response DTOs
//

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[derive(Serialize)]
pub struct TopicsOut {
    pub topics: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigOut {
    pub finish_line: f64,
    pub num_checkpoints: u32,
    pub checkpoints: Vec<f64>,
    pub question_count: usize,
    pub online: bool,
}

impl ConfigOut {
    pub fn new(num_checkpoints: u32, question_count: usize, online: bool) -> Self {
        Self {
            finish_line: FINISH_LINE,
            num_checkpoints,
            checkpoints: checkpoint_targets(num_checkpoints),
            question_count,
            online,
        }
    }
}
