//! Session driver: one tokio task per race.
//!
//! The task owns `RaceState` and `GameSession` outright and consumes a single
//! ordered queue: frame ticks from its own interval, player input from the
//! `SessionHandle`, and completions posted back by the one-shot timers and
//! the question fetch it spawns. Each event is handled to completion before
//! the next one is taken, so there is no locking and a frame step can never
//! overlap another.
//!
//! Every asynchronous completion carries the generation it was issued for.
//! Play Again bumps the generation and aborts outstanding timers, so a late
//! countdown tick, pulse expiry or fetch result from a previous life is
//! discarded instead of bleeding into the fresh race.

use std::{sync::Arc, time::Duration};

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::{AnswerSelection, Question};
use crate::error::QuestionError;
use crate::gate::{self, AnswerOutcome, GameSession, GateView, ProviderStatus, PulseTicket};
use crate::provider::QuestionSource;
use crate::race::{CountdownPhase, RaceEvent, RaceState, COUNTDOWN_DURATION, FRAME_RATE};

/// How long the correct / incorrect banner stays up.
pub const FEEDBACK_PULSE: Duration = Duration::from_millis(1000);

/// Fixed for the lifetime of a session.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub topic: String,
    pub num_checkpoints: u32,
    pub question_count: usize,
    pub fetch_timeout: Duration,
    pub hold_countdown: bool,
}

/// Everything the presentation layer renders, published after every event.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionView {
    pub session_id: Uuid,
    pub generation: u64,
    pub topic: String,
    pub num_checkpoints: u32,
    pub race: RaceState,
    pub gate: GateView,
    /// The question on display, if the gate shows one.
    pub question: Option<Question>,
    pub current_question_idx: usize,
    pub question_count: usize,
    pub score: u32,
    pub is_correct: bool,
    pub is_incorrect: bool,
    pub provider: ProviderStatus,
}

#[derive(Debug)]
enum SessionEvent {
    SetAccelerating(bool),
    SubmitAnswer(AnswerSelection, oneshot::Sender<AnswerOutcome>),
    PlayAgain,
    RetryQuestions,
    Shutdown,
    CountdownTick { generation: u64 },
    PulseExpired { generation: u64, ticket: PulseTicket },
    QuestionsLoaded { generation: u64, result: Result<Vec<Question>, QuestionError> },
}

/// Owning handle to a running session. Dropping it stops the session.
pub struct SessionHandle {
    id: Uuid,
    events: mpsc::UnboundedSender<SessionEvent>,
    view: watch::Receiver<SessionView>,
}

impl SessionHandle {
    /// Start a session: kicks off the question fetch and the countdown.
    pub fn spawn(source: Arc<dyn QuestionSource>, cfg: SessionConfig) -> Self {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        let driver = Driver::new(id, cfg, source, tx.clone());
        let view = driver.view_tx.subscribe();
        tokio::spawn(driver.run(rx));
        Self { id, events: tx, view }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn snapshot(&self) -> SessionView {
        self.view.borrow().clone()
    }

    /// Change notifications for the session view.
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    pub fn set_accelerating(&self, pressed: bool) {
        self.post(SessionEvent::SetAccelerating(pressed));
    }

    pub async fn submit_answer(&self, selection: AnswerSelection) -> AnswerOutcome {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.post(SessionEvent::SubmitAnswer(selection, reply_tx));
        reply_rx.await.unwrap_or(AnswerOutcome::NotPending)
    }

    pub fn play_again(&self) {
        self.post(SessionEvent::PlayAgain);
    }

    pub fn retry_questions(&self) {
        self.post(SessionEvent::RetryQuestions);
    }

    pub fn shutdown(&self) {
        self.post(SessionEvent::Shutdown);
    }

    fn post(&self, ev: SessionEvent) {
        if self.events.send(ev).is_err() {
            debug!(target: "race", session = %self.id, "Session already stopped; event dropped");
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        let _ = self.events.send(SessionEvent::Shutdown);
    }
}

struct Driver {
    id: Uuid,
    cfg: SessionConfig,
    source: Arc<dyn QuestionSource>,
    events: mpsc::UnboundedSender<SessionEvent>,
    generation: u64,
    race: RaceState,
    game: GameSession,
    last_frame: Instant,
    countdown_timer: Option<JoinHandle<()>>,
    pulse_timer: Option<JoinHandle<()>>,
    fetch_task: Option<JoinHandle<()>>,
    view_tx: watch::Sender<SessionView>,
}

impl Driver {
    fn new(
        id: Uuid,
        cfg: SessionConfig,
        source: Arc<dyn QuestionSource>,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        let race = RaceState::new(cfg.hold_countdown);
        let game = GameSession::new();
        let view = build_view(id, 0, &cfg, &race, &game);
        let (view_tx, _rx) = watch::channel(view);
        Self {
            id,
            cfg,
            source,
            events,
            generation: 0,
            race,
            game,
            last_frame: Instant::now(),
            countdown_timer: None,
            pulse_timer: None,
            fetch_task: None,
            view_tx,
        }
    }

    #[instrument(level = "info", skip_all, fields(session = %self.id, topic = %self.cfg.topic))]
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<SessionEvent>) {
        info!(target: "race", num_checkpoints = self.cfg.num_checkpoints, source = self.source.name(), "Race session started");
        self.start_fetch();
        self.schedule_countdown();

        let mut frames = interval(Duration::from_micros(1_000_000 / FRAME_RATE));
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.last_frame = Instant::now();

        loop {
            tokio::select! {
                now = frames.tick() => self.on_frame(now),
                ev = rx.recv() => match ev {
                    Some(SessionEvent::Shutdown) | None => break,
                    Some(ev) => self.handle(ev),
                },
            }
            self.publish();
        }

        self.cancel_timers();
        if let Some(fetch) = self.fetch_task.take() {
            fetch.abort();
        }
        info!(target: "race", score = self.game.score, "Race session stopped");
    }

    fn on_frame(&mut self, now: Instant) {
        let dt = now.saturating_duration_since(self.last_frame).as_secs_f64();
        self.last_frame = now;

        let (race, event) = self.race.step(dt, self.cfg.num_checkpoints);
        self.race = race;
        match event {
            Some(RaceEvent::CheckpointCrossed(k)) => {
                info!(target: "race", checkpoint = k, distance = self.race.distance, "Checkpoint reached; door open");
                if let GateView::Waiting { provider_failed } = gate::view(&self.race, &self.game) {
                    info!(target: "questions", provider_failed, "No question available yet; waiting");
                }
            }
            Some(RaceEvent::Finished) => {
                info!(target: "race", score = self.game.score, "Race finished");
            }
            None => {}
        }
    }

    fn handle(&mut self, ev: SessionEvent) {
        match ev {
            SessionEvent::SetAccelerating(pressed) => {
                self.race = self.race.with_accelerating(pressed);
            }

            SessionEvent::SubmitAnswer(selection, reply) => {
                let verdict = gate::submit_answer(self.race, &mut self.game, &selection);
                self.race = verdict.race;
                if let Some(ticket) = verdict.pulse {
                    self.schedule_pulse_expiry(ticket);
                }
                let _ = reply.send(verdict.outcome);
            }

            SessionEvent::PlayAgain => self.reset(),

            SessionEvent::RetryQuestions => {
                if self.game.begin_retry() {
                    info!(target: "questions", "Retrying question fetch");
                    self.start_fetch();
                } else {
                    debug!(target: "questions", provider = ?self.game.provider, "Retry ignored");
                }
            }

            SessionEvent::Shutdown => {}

            SessionEvent::CountdownTick { generation } => {
                if self.is_stale(generation, "countdown tick") {
                    return;
                }
                self.race = self.race.countdown_tick();
                debug!(target: "race", countdown = ?self.race.countdown, "Countdown tick");
                self.countdown_timer = None;
                self.schedule_countdown();
            }

            SessionEvent::PulseExpired { generation, ticket } => {
                if self.is_stale(generation, "pulse expiry") {
                    return;
                }
                self.game.clear_pulse(ticket);
            }

            SessionEvent::QuestionsLoaded { generation, result } => {
                if self.is_stale(generation, "question fetch") {
                    return;
                }
                self.fetch_task = None;
                let result = result.map(|qs| cover_checkpoints(qs, self.cfg.num_checkpoints));
                self.game.deliver_questions(result);
                if self.game.provider == ProviderStatus::Ready
                    && self.race.countdown == CountdownPhase::PreCountdown
                {
                    self.race = self.race.begin_countdown();
                    self.schedule_countdown();
                }
            }
        }
    }

    fn is_stale(&self, generation: u64, what: &str) -> bool {
        if generation != self.generation {
            debug!(target: "race", generation, current = self.generation, what, "Discarding stale async result");
            return true;
        }
        false
    }

    /// Play Again: back to the countdown with score 0. Questions already
    /// fetched are kept; a fetch still in flight is restarted for the new life.
    fn reset(&mut self) {
        self.cancel_timers();
        self.generation += 1;

        self.game.restart();
        let hold = self.cfg.hold_countdown && self.game.provider != ProviderStatus::Ready;
        self.race = RaceState::new(hold);
        self.last_frame = Instant::now();

        if let Some(fetch) = self.fetch_task.take() {
            fetch.abort();
            self.start_fetch();
        }
        self.schedule_countdown();
        info!(target: "race", generation = self.generation, "Race reset");
    }

    fn cancel_timers(&mut self) {
        for timer in [self.countdown_timer.take(), self.pulse_timer.take()].into_iter().flatten() {
            timer.abort();
        }
    }

    fn schedule_countdown(&mut self) {
        if !self.race.countdown_pending() || self.countdown_timer.is_some() {
            return;
        }
        let generation = self.generation;
        self.countdown_timer = Some(self.after(COUNTDOWN_DURATION, SessionEvent::CountdownTick { generation }));
    }

    /// A newer pulse replaces the pending expiry of the previous one.
    fn schedule_pulse_expiry(&mut self, ticket: PulseTicket) {
        if let Some(prev) = self.pulse_timer.take() {
            prev.abort();
        }
        let generation = self.generation;
        self.pulse_timer = Some(self.after(FEEDBACK_PULSE, SessionEvent::PulseExpired { generation, ticket }));
    }

    fn after(&self, delay: Duration, ev: SessionEvent) -> JoinHandle<()> {
        let tx = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(ev);
        })
    }

    fn start_fetch(&mut self) {
        let generation = self.generation;
        let source = self.source.clone();
        let tx = self.events.clone();
        let topic = self.cfg.topic.clone();
        let count = self.cfg.question_count;
        let deadline = self.cfg.fetch_timeout;

        self.fetch_task = Some(tokio::spawn(async move {
            let result = match tokio::time::timeout(deadline, source.fetch_questions(&topic, count)).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(target: "questions", %topic, ?deadline, "Question fetch timed out");
                    Err(QuestionError::ProviderUnavailable(format!(
                        "no questions after {}s", deadline.as_secs()
                    )))
                }
            };
            let _ = tx.send(SessionEvent::QuestionsLoaded { generation, result });
        }));
    }

    fn publish(&self) {
        let next = build_view(self.id, self.generation, &self.cfg, &self.race, &self.game);
        self.view_tx.send_if_modified(|cur| {
            if *cur == next {
                return false;
            }
            *cur = next;
            true
        });
    }
}

/// A source may return fewer questions than the track has checkpoints. Repeat
/// the list so the gate never runs dry with the provider already `Ready`.
fn cover_checkpoints(mut questions: Vec<Question>, num_checkpoints: u32) -> Vec<Question> {
    let needed = num_checkpoints as usize;
    if questions.is_empty() || questions.len() >= needed {
        return questions;
    }
    warn!(target: "questions", got = questions.len(), needed, "Short question list; repeating questions");
    let base = questions.clone();
    questions.extend(base.iter().cycle().take(needed - base.len()).cloned());
    questions
}

fn build_view(id: Uuid, generation: u64, cfg: &SessionConfig, race: &RaceState, game: &GameSession) -> SessionView {
    let gate = gate::view(race, game);
    let question = match gate {
        GateView::Question(idx) => game.questions.get(idx).cloned(),
        _ => None,
    };
    SessionView {
        session_id: id,
        generation,
        topic: cfg.topic.clone(),
        num_checkpoints: cfg.num_checkpoints,
        race: *race,
        gate,
        question,
        current_question_idx: game.current_question_idx,
        question_count: game.questions.len(),
        score: game.score,
        is_correct: game.is_correct,
        is_incorrect: game.is_incorrect,
        provider: game.provider,
    }
}
