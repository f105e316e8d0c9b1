//! Integration tests for the quizrace-backend HTTP API and the offline race flow.
//!
//! Uses tower::ServiceExt::oneshot to test routes directly without binding a port.

use std::{sync::Arc, time::Duration};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use quizrace_backend::{
    config::{Prompts, RaceTuning},
    domain::{AnswerSelection, Question},
    gate::{AnswerOutcome, GateView, ProviderStatus},
    provider::QuestionBank,
    race::{CountdownPhase, FINISH_LINE},
    routes::build_router,
    seeds::{seed_questions, seed_topics},
    session::SessionHandle,
    state::AppState,
};
use tower::ServiceExt;

/// Helper: state backed by the built-in seed bank, no OpenAI.
fn offline_state() -> AppState {
    let local = seed_questions()
        .into_iter()
        .map(|(t, q)| (t.to_string(), q))
        .collect();
    let bank = QuestionBank::new(None, Prompts::default(), local);
    AppState::with_source(Arc::new(bank), RaceTuning::default(), seed_topics(), false)
}

fn app() -> axum::Router {
    build_router(Arc::new(offline_state()))
}

/// Helper: GET `uri` and parse the JSON body.
async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// ==================== GET /api/v1/health ====================

#[tokio::test]
async fn test_health_ok() {
    let (status, body) = get_json("/api/v1/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
}

// ==================== GET /api/v1/topics ====================

#[tokio::test]
async fn test_topics_lists_builtin_courses() {
    let (status, body) = get_json("/api/v1/topics").await;
    assert_eq!(status, StatusCode::OK);
    let topics: Vec<&str> = body["topics"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t.as_str().unwrap())
        .collect();
    assert_eq!(topics, vec!["Programming Basics", "Python Basics", "C Basics", "Java Data Structure Basics"]);
}

// ==================== GET /api/v1/config ====================

#[tokio::test]
async fn test_config_defaults() {
    let (status, body) = get_json("/api/v1/config").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["finishLine"], FINISH_LINE);
    assert_eq!(body["numCheckpoints"], 5);
    assert_eq!(body["online"], false);
    let cps = body["checkpoints"].as_array().unwrap();
    assert_eq!(cps.len(), 5);
    let first = cps[0].as_f64().unwrap();
    assert!((first - FINISH_LINE / 6.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_config_honours_checkpoint_query() {
    let (_, body) = get_json("/api/v1/config?numCheckpoints=4").await;
    assert_eq!(body["numCheckpoints"], 4);
    assert_eq!(body["checkpoints"][0], 2000.0);

    let (_, body) = get_json("/api/v1/config?numCheckpoints=0").await;
    assert!(body["checkpoints"].as_array().unwrap().is_empty());
}

// ==================== WebSocket upgrade ====================

#[tokio::test]
async fn test_ws_without_upgrade_headers_is_rejected() {
    let response = app()
        .oneshot(Request::builder().uri("/ws").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}

// ==================== Offline race ====================

#[tokio::test(start_paused = true)]
async fn test_offline_race_reaches_first_question() {
    let state = offline_state();
    let session = SessionHandle::spawn(state.source.clone(), state.session_config(Some("Python Basics"), Some(3)));

    tokio::time::sleep(Duration::from_millis(100)).await;
    let view = session.snapshot();
    assert_eq!(view.provider, ProviderStatus::Ready);
    assert_eq!(view.question_count, 5);
    assert_eq!(view.race.countdown, CountdownPhase::Counting(3));

    session.set_accelerating(true);
    tokio::time::sleep(Duration::from_secs(9)).await;
    let view = session.snapshot();
    assert_eq!(view.gate, GateView::Question(0));
    assert_eq!(view.race.round(), 1);
    assert!(view.question.is_some());
    assert!(view.race.distance < FINISH_LINE / 4.0 - 99.0 + 1e-6);

    session.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_offline_race_with_extra_checkpoints_finishes() {
    let state = offline_state();
    let cfg = state.session_config(Some("Python Basics"), Some(8));
    assert_eq!(cfg.question_count, 8);
    let session = SessionHandle::spawn(state.source.clone(), cfg);
    session.set_accelerating(true);

    let mut answered = 0;
    for _ in 0..900 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let view = session.snapshot();
        if view.race.is_game_complete {
            break;
        }
        assert_ne!(view.gate, GateView::Waiting { provider_failed: false }, "checkpoint left without a question");
        if let Some(q) = &view.question {
            let selection = match q {
                Question::Mcq(m) => AnswerSelection::Choice(m.correct_answer_idx),
                Question::Programming(p) => {
                    AnswerSelection::Arrangement(p.correct_sequence.iter().cloned().map(Some).collect())
                }
            };
            let outcome = session.submit_answer(selection).await;
            assert!(matches!(outcome, AnswerOutcome::Correct { scored: true }));
            answered += 1;
        }
    }

    let view = session.snapshot();
    assert!(view.race.is_game_complete);
    assert_eq!(answered, 8);
    assert_eq!(view.score, 8);
    assert_eq!(view.race.distance, FINISH_LINE);
}
