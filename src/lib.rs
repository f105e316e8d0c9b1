//! QuizRace backend: a checkpoint racing game where every checkpoint is
//! unlocked by answering a programming question.
//!
//! - `race`: pure physics and countdown state machine
//! - `gate`: question gating, first-attempt scoring, feedback pulses
//! - `session`: the per-race event loop tying both to a `QuestionSource`
//! - `routes`: Axum HTTP + WebSocket surface

pub mod config;
pub mod domain;
pub mod error;
pub mod gate;
pub mod openai;
pub mod protocol;
pub mod provider;
pub mod race;
pub mod routes;
pub mod seeds;
pub mod session;
pub mod state;
pub mod telemetry;
pub mod util;
