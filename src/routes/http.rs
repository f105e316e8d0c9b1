//! HTTP endpoint handlers. Read-only helpers for the front end; gameplay runs over `/ws`.

use std::sync::Arc;
use axum::{extract::{Query, State}, Json, response::IntoResponse};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::protocol::*;
use crate::state::{AppState, MAX_CHECKPOINTS};

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_get_topics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  debug!(target: "quizrace", count = state.topics.len(), "HTTP topics served");
  Json(TopicsOut { topics: state.topics.clone() })
}

#[derive(Debug, Deserialize)]
pub struct ConfigQuery {
  #[serde(rename = "numCheckpoints")]
  pub num_checkpoints: Option<u32>,
}

/// Track layout for a given checkpoint count (defaults to the server tuning).
#[instrument(level = "info", skip(state))]
pub async fn http_get_config(
  State(state): State<Arc<AppState>>,
  Query(q): Query<ConfigQuery>,
) -> impl IntoResponse {
  let n = q.num_checkpoints.unwrap_or(state.tuning.num_checkpoints).min(MAX_CHECKPOINTS);
  Json(ConfigOut::new(n, state.tuning.question_count, state.online))
}
