//! Race controller: the pre-race countdown and one-dimensional kinematics.
//!
//! Everything in here is pure. `RaceState` is a small `Copy` value and each
//! operation returns the replacement state; the session driver owns the clock
//! and decides when to call `countdown_tick` and `step`. Checkpoint and finish
//! edges come back out as `RaceEvent`s.

use std::time::Duration;

use serde::Serialize;

/// Units/s² while the accelerate control is held.
pub const ACCELERATION: f64 = 600.0;
/// Units/s² while it is released.
pub const DECELERATION: f64 = -25.0;
pub const FINISH_LINE: f64 = 10_000.0;
pub const MAX_VELOCITY: f64 = 1_200.0;
/// Launch impulse applied when the countdown shows "Go".
pub const GO_VELOCITY: f64 = 600.0;
/// Launch impulse applied when the car leaves a checkpoint.
pub const ACCELERATE_VELOCITY: f64 = 500.0;
/// The car stops this far before a checkpoint's nominal distance.
pub const CHECKPOINT_PADDING: f64 = 100.0;

pub const COUNTDOWN_START: u32 = 3;
pub const COUNTDOWN_DURATION: Duration = Duration::from_millis(1000);
pub const FRAME_RATE: u64 = 60;

/// Pre-race countdown sub-state. `Running` is terminal for the countdown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "value", rename_all = "snake_case")]
pub enum CountdownPhase {
    /// Waiting for something (the first question) before counting starts.
    PreCountdown,
    Counting(u32),
    Go,
    Running,
}

/// Discrete edges produced by a physics step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RaceEvent {
    /// The car reached checkpoint `k` (1-based) and the door opened.
    CheckpointCrossed(u32),
    Finished,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RaceState {
    pub distance: f64,
    pub velocity: f64,
    pub is_accelerating: bool,
    pub is_game_complete: bool,
    /// Checkpoint currently being approached (1-based).
    pub current_checkpoint: u32,
    /// `true` shows the race view, `false` the question view.
    pub is_door_closed: bool,
    pub countdown: CountdownPhase,
}

impl RaceState {
    /// Fresh race. With `hold_countdown` the countdown stays in `PreCountdown`
    /// until `begin_countdown` is called.
    pub fn new(hold_countdown: bool) -> Self {
        Self {
            distance: 0.0,
            velocity: 0.0,
            is_accelerating: false,
            is_game_complete: false,
            current_checkpoint: 1,
            is_door_closed: true,
            countdown: if hold_countdown {
                CountdownPhase::PreCountdown
            } else {
                CountdownPhase::Counting(COUNTDOWN_START)
            },
        }
    }

    pub fn begin_countdown(self) -> Self {
        match self.countdown {
            CountdownPhase::PreCountdown => Self {
                countdown: CountdownPhase::Counting(COUNTDOWN_START),
                ..self
            },
            _ => self,
        }
    }

    /// Advance the countdown by one `COUNTDOWN_DURATION` period.
    pub fn countdown_tick(self) -> Self {
        match self.countdown {
            CountdownPhase::Counting(n) if n > 1 => Self {
                countdown: CountdownPhase::Counting(n - 1),
                ..self
            },
            CountdownPhase::Counting(_) => Self {
                countdown: CountdownPhase::Go,
                velocity: GO_VELOCITY,
                ..self
            },
            CountdownPhase::Go => Self {
                countdown: CountdownPhase::Running,
                ..self
            },
            CountdownPhase::PreCountdown | CountdownPhase::Running => self,
        }
    }

    /// Whether the countdown still has a timed transition ahead of it.
    pub fn countdown_pending(&self) -> bool {
        matches!(self.countdown, CountdownPhase::Counting(_) | CountdownPhase::Go)
    }

    /// One physics frame of `dt` seconds.
    ///
    /// Displacement uses the pre-update velocity (`s = ut + ½at²`) while the
    /// new velocity is clamped to `[0, MAX_VELOCITY]`. A pending checkpoint is
    /// tested before the finish line, so however large `dt` is, a single step
    /// crosses at most one checkpoint and never skips one.
    pub fn step(self, dt: f64, num_checkpoints: u32) -> (Self, Option<RaceEvent>) {
        if self.is_game_complete
            || self.countdown != CountdownPhase::Running
            || !self.is_door_closed
        {
            return (self, None);
        }
        let dt = dt.max(0.0);

        let acceleration = if self.is_accelerating { ACCELERATION } else { DECELERATION };
        let velocity = (self.velocity + acceleration * dt).clamp(0.0, MAX_VELOCITY);
        let distance = self.distance + self.velocity * dt + 0.5 * acceleration * dt * dt;

        if self.current_checkpoint <= num_checkpoints {
            let stop_at = checkpoint_target(self.current_checkpoint, num_checkpoints) - CHECKPOINT_PADDING;
            if distance >= stop_at {
                let crossed = self.current_checkpoint;
                let next = Self {
                    distance: stop_at + 1.0,
                    velocity: 0.0,
                    is_door_closed: false,
                    current_checkpoint: crossed + 1,
                    ..self
                };
                return (next, Some(RaceEvent::CheckpointCrossed(crossed)));
            }
        }

        if distance >= FINISH_LINE {
            let next = Self {
                distance: FINISH_LINE,
                velocity: 0.0,
                is_game_complete: true,
                ..self
            };
            return (next, Some(RaceEvent::Finished));
        }

        // Deceleration must never pull the car backwards.
        let distance = distance.max(self.distance);
        (Self { distance, velocity, ..self }, None)
    }

    /// Raw press/release edge. Ignored once the race is over.
    pub fn with_accelerating(self, pressed: bool) -> Self {
        if self.is_game_complete {
            return self;
        }
        Self { is_accelerating: pressed, ..self }
    }

    /// Leave a checkpoint after its question was answered: close the door and relaunch.
    pub fn resume_after_answer(self) -> Self {
        if self.is_game_complete {
            return self;
        }
        Self {
            is_door_closed: true,
            velocity: ACCELERATE_VELOCITY,
            ..self
        }
    }

    /// True while a crossed checkpoint is waiting for its question to be answered.
    pub fn awaiting_answer(&self) -> bool {
        !self.is_door_closed && !self.is_game_complete
    }

    /// Checkpoints already crossed.
    pub fn round(&self) -> u32 {
        self.current_checkpoint.saturating_sub(1)
    }
}

/// Nominal distance of checkpoint `k` (1-based) when the track has `num_checkpoints`.
pub fn checkpoint_target(k: u32, num_checkpoints: u32) -> f64 {
    FINISH_LINE / (num_checkpoints as f64 + 1.0) * k as f64
}

pub fn checkpoint_targets(num_checkpoints: u32) -> Vec<f64> {
    (1..=num_checkpoints)
        .map(|k| checkpoint_target(k, num_checkpoints))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running() -> RaceState {
        RaceState {
            countdown: CountdownPhase::Running,
            ..RaceState::new(false)
        }
    }

    #[test]
    fn test_countdown_sequence_sets_launch_velocity_on_go() {
        let s0 = RaceState::new(false);
        assert_eq!(s0.countdown, CountdownPhase::Counting(3));

        let s1 = s0.countdown_tick();
        let s2 = s1.countdown_tick();
        let s3 = s2.countdown_tick();
        assert_eq!(s1.countdown, CountdownPhase::Counting(2));
        assert_eq!(s2.countdown, CountdownPhase::Counting(1));
        assert_eq!(s3.countdown, CountdownPhase::Go);
        assert_eq!(s2.velocity, 0.0);
        assert_eq!(s3.velocity, GO_VELOCITY);

        let s4 = s3.countdown_tick();
        assert_eq!(s4.countdown, CountdownPhase::Running);
        assert_eq!(s4.velocity, GO_VELOCITY);
        assert!(!s4.countdown_pending());
        assert_eq!(s4.countdown_tick(), s4);
    }

    #[test]
    fn test_held_countdown_waits_for_begin() {
        let s = RaceState::new(true);
        assert_eq!(s.countdown, CountdownPhase::PreCountdown);
        assert_eq!(s.countdown_tick(), s);
        assert_eq!(s.begin_countdown().countdown, CountdownPhase::Counting(3));
        // begin is a no-op once counting
        let counting = s.begin_countdown().countdown_tick();
        assert_eq!(counting.begin_countdown(), counting);
    }

    #[test]
    fn test_no_motion_before_running() {
        let s = RaceState::new(false).with_accelerating(true);
        let (after, ev) = s.step(1.0, 5);
        assert_eq!(after, s);
        assert!(ev.is_none());

        let go = RaceState::new(false).countdown_tick().countdown_tick().countdown_tick();
        assert_eq!(go.step(0.5, 5).0.distance, 0.0);
    }

    #[test]
    fn test_suvat_uses_pre_update_velocity() {
        let s = RaceState { velocity: 100.0, is_accelerating: true, ..running() };
        let (after, ev) = s.step(0.5, 0);
        assert!(ev.is_none());
        assert_eq!(after.velocity, 400.0);
        // 100·0.5 + ½·600·0.25
        assert_eq!(after.distance, 125.0);
    }

    #[test]
    fn test_velocity_clamped_at_max() {
        let mut s = running().with_accelerating(true);
        for _ in 0..3 {
            s = s.step(1.0, 0).0;
            assert!(s.velocity <= MAX_VELOCITY);
        }
        assert_eq!(s.velocity, MAX_VELOCITY);
    }

    #[test]
    fn test_velocity_never_negative() {
        let s = RaceState { velocity: 10.0, distance: 50.0, ..running() };
        let (after, _) = s.step(2.0, 0);
        assert_eq!(after.velocity, 0.0);
        assert!(after.distance >= 50.0);
    }

    #[test]
    fn test_oversized_tick_crosses_exactly_one_checkpoint() {
        // 9699 + ½·600 = 9999 in a single one-second frame.
        let s = RaceState { velocity: 9_699.0, ..running() }.with_accelerating(true);
        let (after, ev) = s.step(1.0, 5);

        assert_eq!(ev, Some(RaceEvent::CheckpointCrossed(1)));
        assert_eq!(after.current_checkpoint, 2);
        let expected = FINISH_LINE / 6.0 - CHECKPOINT_PADDING + 1.0;
        assert!((after.distance - expected).abs() < 1e-9);
        assert_eq!(after.velocity, 0.0);
        assert!(!after.is_door_closed);
        assert!(after.awaiting_answer());
    }

    #[test]
    fn test_checkpoint_clamp_with_four_checkpoints() {
        let s = RaceState { velocity: 9_699.0, ..running() }.with_accelerating(true);
        let (after, ev) = s.step(1.0, 4);
        assert_eq!(ev, Some(RaceEvent::CheckpointCrossed(1)));
        assert_eq!(after.distance, 1_901.0);
    }

    #[test]
    fn test_stall_past_finish_still_stops_at_checkpoint() {
        let s = RaceState { velocity: 50_000.0, ..running() };
        let (after, ev) = s.step(1.0, 5);
        assert_eq!(ev, Some(RaceEvent::CheckpointCrossed(1)));
        assert!(!after.is_game_complete);
    }

    #[test]
    fn test_door_open_freezes_the_car() {
        let s = RaceState { velocity: 9_699.0, ..running() }.with_accelerating(true);
        let (at_checkpoint, _) = s.step(1.0, 5);
        let (frozen, ev) = at_checkpoint.step(1.0, 5);
        assert_eq!(frozen, at_checkpoint);
        assert!(ev.is_none());

        let resumed = frozen.resume_after_answer();
        assert!(resumed.is_door_closed);
        assert_eq!(resumed.velocity, ACCELERATE_VELOCITY);
        assert!(resumed.step(0.1, 5).0.distance > frozen.distance);
    }

    #[test]
    fn test_finish_is_terminal() {
        let s = RaceState {
            distance: 9_990.0,
            velocity: 1_000.0,
            current_checkpoint: 6,
            ..running()
        };
        let (done, ev) = s.step(0.1, 5);
        assert_eq!(ev, Some(RaceEvent::Finished));
        assert!(done.is_game_complete);
        assert_eq!(done.distance, FINISH_LINE);
        assert_eq!(done.velocity, 0.0);

        let pressed = done.with_accelerating(true);
        assert_eq!(pressed, done);
        let (later, ev) = pressed.step(5.0, 5);
        assert_eq!(later, done);
        assert!(ev.is_none());
        assert_eq!(done.resume_after_answer(), done);
    }

    #[test]
    fn test_full_race_is_monotonic_and_bounded() {
        let n = 5;
        let mut s = running();
        let mut last = s.distance;
        let mut crossed = Vec::new();
        let mut frame = 0u32;

        while !s.is_game_complete && frame < 100_000 {
            frame += 1;
            let pressed = frame % 7 != 0;
            let dt = if frame % 97 == 0 { 0.75 } else { 1.0 / 60.0 };
            let (next, ev) = s.with_accelerating(pressed).step(dt, n);
            s = next;
            if let Some(RaceEvent::CheckpointCrossed(k)) = ev {
                crossed.push(k);
                s = s.resume_after_answer();
            }
            assert!(s.distance >= last, "distance went backwards at frame {}", frame);
            assert!(s.current_checkpoint <= n + 1);
            last = s.distance;
        }

        assert!(s.is_game_complete);
        assert_eq!(s.distance, FINISH_LINE);
        assert_eq!(crossed, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_no_checkpoints_runs_straight_to_finish() {
        let s = RaceState { distance: 9_999.0, velocity: 600.0, ..running() };
        let (after, ev) = s.step(0.1, 0);
        assert_eq!(ev, Some(RaceEvent::Finished));
        assert_eq!(after.current_checkpoint, 1);
    }

    #[test]
    fn test_checkpoint_targets_are_evenly_spaced() {
        assert_eq!(checkpoint_targets(4), vec![2_000.0, 4_000.0, 6_000.0, 8_000.0]);
        assert!(checkpoint_targets(0).is_empty());
    }
}
