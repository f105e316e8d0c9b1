//! WebSocket upgrade + message loop. Each connection owns at most one race
//! session. Client messages are parsed as JSON and forwarded to the session;
//! snapshots are pushed whenever the session view changes.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument};

use crate::protocol::{to_out, ClientWsMessage, ServerWsMessage};
use crate::session::{SessionHandle, SessionView};
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "quizrace", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// The race bound to one connection, plus its change feed.
struct Bound {
  handle: SessionHandle,
  updates: watch::Receiver<SessionView>,
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "quizrace", "WebSocket connected");
  let mut bound: Option<Bound> = None;

  loop {
    tokio::select! {
      incoming = socket.recv() => {
        let Some(Ok(msg)) = incoming else { break };
        let reply = match msg {
          Message::Text(txt) => match serde_json::from_str::<ClientWsMessage>(&txt) {
            Ok(parsed) => {
              debug!(target: "quizrace", "WS received: {:?}", &parsed);
              handle_client_ws(parsed, &state, &mut bound).await
            }
            Err(e) => Some(ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) }),
          },
          Message::Ping(payload) => {
            let _ = socket.send(Message::Pong(payload)).await;
            None
          }
          Message::Close(_) => break,
          _ => None,
        };
        if let Some(reply) = reply {
          if !send_json(&mut socket, &reply).await { break; }
        }
      }

      changed = wait_for_update(&mut bound) => {
        if changed.is_err() {
          debug!(target: "quizrace", "Session feed closed");
          bound = None;
          continue;
        }
        let snapshot = match &mut bound {
          Some(b) => to_out(&b.updates.borrow_and_update()),
          None => continue,
        };
        if !send_json(&mut socket, &ServerWsMessage::Snapshot { snapshot }).await { break; }
      }
    }
  }

  if let Some(b) = bound.take() {
    b.handle.shutdown();
  }
  info!(target: "quizrace", "WebSocket disconnected");
}

/// Resolves when the bound session publishes a new view; pends forever while unbound.
async fn wait_for_update(bound: &mut Option<Bound>) -> Result<(), watch::error::RecvError> {
  match bound {
    Some(b) => b.updates.changed().await,
    None => std::future::pending().await,
  }
}

async fn send_json(socket: &mut WebSocket, msg: &ServerWsMessage) -> bool {
  let out = serde_json::to_string(msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
  });
  if let Err(e) = socket.send(Message::Text(out)).await {
    error!(target: "quizrace", error = %e, "WS send error");
    return false;
  }
  true
}

#[instrument(level = "info", skip(state, bound))]
async fn handle_client_ws(
  msg: ClientWsMessage,
  state: &AppState,
  bound: &mut Option<Bound>,
) -> Option<ServerWsMessage> {
  let no_race = || Some(ServerWsMessage::Error { message: "No race in progress; send start_race first.".into() });

  match msg {
    ClientWsMessage::Ping => Some(ServerWsMessage::Pong),

    ClientWsMessage::StartRace { topic, num_checkpoints } => {
      let cfg = state.session_config(topic.as_deref(), num_checkpoints);
      info!(target: "race", topic = %cfg.topic, num_checkpoints = cfg.num_checkpoints, "WS start_race");
      if let Some(old) = bound.take() {
        old.handle.shutdown();
      }
      let handle = SessionHandle::spawn(state.source.clone(), cfg);
      let mut updates = handle.subscribe();
      let snapshot = to_out(&updates.borrow_and_update());
      *bound = Some(Bound { handle, updates });
      Some(ServerWsMessage::Snapshot { snapshot })
    }

    ClientWsMessage::Accelerate { pressed } => match bound {
      Some(b) => { b.handle.set_accelerating(pressed); None }
      None => no_race(),
    },

    ClientWsMessage::SubmitAnswer { choice, arrangement } => {
      let Some(b) = bound.as_ref() else { return no_race() };
      let Some(selection) = ClientWsMessage::selection(choice, arrangement) else {
        return Some(ServerWsMessage::Error { message: "submit_answer needs exactly one of choice or arrangement".into() });
      };
      // read the explanation before the gate advances past the question
      let explanation = b.handle.snapshot().question.map(|q| q.explanation().to_string());
      let outcome = b.handle.submit_answer(selection).await;
      let explanation = match outcome {
        crate::gate::AnswerOutcome::Correct { .. } => explanation.filter(|e| !e.is_empty()),
        _ => None,
      };
      info!(target: "questions", ?outcome, "WS submit_answer evaluated");
      Some(ServerWsMessage::AnswerResult { outcome, explanation })
    }

    ClientWsMessage::PlayAgain => match bound {
      Some(b) => { b.handle.play_again(); None }
      None => no_race(),
    },

    ClientWsMessage::RetryQuestions => match bound {
      Some(b) => { b.handle.retry_questions(); None }
      None => no_race(),
    },
  }
}
