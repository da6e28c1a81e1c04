//! Generation-gated state machine driving the question/answer/pause rounds.
//!
//! The scheduler never sleeps and never performs I/O: every operation returns
//! the [`Effect`]s the caller must carry out. Delayed work comes back through
//! [`CycleScheduler::wake`] carrying the generation it was scheduled under, and
//! is dropped when that generation is no longer current.

use std::{sync::Arc, time::Duration};

use thiserror::Error;

use crate::{
    config::TriviaSettings,
    state::{
        audience::Audience,
        fetch_gate::FetchGate,
        question::{Question, QuestionQueue},
    },
};

/// Epoch identifier of the scheduling loop.
pub type Generation = u64;

/// Delay before checking again for an audience.
pub const IDLE_POLL: Duration = Duration::from_secs(10);
/// Delay before checking again for a queued question.
pub const STARVATION_POLL: Duration = Duration::from_secs(5);

/// Whether the loop is currently meant to produce rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// No round runs; pending continuations are stale.
    Stopped,
    /// Rounds are being produced under the current generation.
    Running,
}

/// Phase a delayed continuation resumes into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Start (or retry) a round.
    Round,
    /// Reveal the answer of the question asked in this round.
    Reveal(Question),
    /// The pause after the answer is over; start the next round.
    Advance,
}

/// Delayed continuation, bound to the generation it was scheduled under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wake {
    /// Generation captured when the continuation was scheduled.
    pub generation: Generation,
    /// What to do when it fires.
    pub step: Step,
}

/// Side effect requested by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send a line to the audience.
    Broadcast(String),
    /// Call [`CycleScheduler::wake`] with `wake` once `delay` has elapsed.
    Schedule {
        /// How long to wait.
        delay: Duration,
        /// Continuation to deliver.
        wake: Wake,
    },
    /// Ask the refill coordinator for more questions for the given queue epoch.
    RequestRefill {
        /// Queue epoch the resulting batch belongs to.
        epoch: u64,
    },
}

/// Rejection returned by [`CycleScheduler::trigger_now`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("trivia is disabled")]
pub struct TriggerRejected;

/// Timing and refill thresholds captured at reload points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundTiming {
    /// Delay between the question and its answer.
    pub answer_delay: Duration,
    /// Pause between the answer and the next round.
    pub between_delay: Duration,
    /// Queue size under which a refill is requested.
    pub low_water_mark: usize,
}

impl From<&TriviaSettings> for RoundTiming {
    fn from(settings: &TriviaSettings) -> Self {
        Self {
            answer_delay: settings.answer_delay,
            between_delay: settings.between_delay,
            low_water_mark: settings.low_water_mark(),
        }
    }
}

/// Snapshot of the scheduler for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStatus {
    /// Administrative intent.
    pub enabled: bool,
    /// Whether the loop is in the running state.
    pub running: bool,
    /// Current generation.
    pub generation: Generation,
    /// Number of queued questions.
    pub queue_size: usize,
}

/// The trivia loop: owns the queue, the generation counter and the enabled flag.
pub struct CycleScheduler {
    enabled: bool,
    state: LoopState,
    generation: Generation,
    queue: QuestionQueue,
    queue_epoch: u64,
    timing: RoundTiming,
    audience: Arc<dyn Audience>,
    fetch_gate: FetchGate,
}

impl CycleScheduler {
    /// Create a stopped scheduler.
    pub fn new(
        enabled: bool,
        timing: RoundTiming,
        audience: Arc<dyn Audience>,
        fetch_gate: FetchGate,
    ) -> Self {
        Self {
            enabled,
            state: LoopState::Stopped,
            generation: 0,
            queue: QuestionQueue::new(),
            queue_epoch: 0,
            timing,
            audience,
            fetch_gate,
        }
    }

    /// Current loop state.
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Current generation.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Epoch of the queue contents; bumped every time the queue is cleared.
    pub fn queue_epoch(&self) -> u64 {
        self.queue_epoch
    }

    /// Number of queued questions.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Administrative intent.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Status snapshot.
    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            enabled: self.enabled,
            running: self.state == LoopState::Running,
            generation: self.generation,
            queue_size: self.queue.len(),
        }
    }

    /// Initial load: request a refill, then start if enabled.
    pub fn boot(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.push_refill(&mut effects);
        self.start_into(&mut effects);
        effects
    }

    /// Start the loop under a new generation. No-op when disabled or already running.
    pub fn start(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.start_into(&mut effects);
        effects
    }

    fn start_into(&mut self, effects: &mut Vec<Effect>) {
        if !self.enabled || self.state == LoopState::Running {
            return;
        }

        self.state = LoopState::Running;
        self.generation += 1;
        self.run_round(self.generation, effects);
    }

    /// Stop the loop, invalidating every pending continuation.
    pub fn stop(&mut self) {
        self.state = LoopState::Stopped;
        self.generation += 1;
    }

    /// Stop, clear the queue, optionally refill, then start under a fresh generation.
    ///
    /// The loop only resumes when enabled; the generation is bumped either way.
    pub fn restart(&mut self, fetch_immediately: bool) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.stop();
        self.clear_queue();

        if fetch_immediately {
            self.push_refill(&mut effects);
        }

        self.generation += 1;
        if self.enabled {
            self.state = LoopState::Running;
            self.run_round(self.generation, &mut effects);
        }
        effects
    }

    /// Abandon the round in flight and run a fresh one right away.
    pub fn trigger_now(&mut self) -> Result<Vec<Effect>, TriggerRejected> {
        if !self.enabled {
            return Err(TriggerRejected);
        }

        let mut effects = Vec::new();
        self.state = LoopState::Running;
        self.generation += 1;
        self.run_round(self.generation, &mut effects);
        Ok(effects)
    }

    /// Set the enabled flag and start the loop.
    pub fn enable(&mut self) -> Vec<Effect> {
        self.enabled = true;
        self.start()
    }

    /// Clear the enabled flag and stop the loop.
    pub fn disable(&mut self) {
        self.enabled = false;
        self.stop();
    }

    /// Adopt new timing values without touching the running round.
    pub fn apply_settings(&mut self, settings: &TriviaSettings) {
        self.timing = RoundTiming::from(settings);
    }

    /// Adopt new settings and restart from a clean queue.
    ///
    /// When disabled the queue is cleared and the loop stays stopped.
    pub fn reload(&mut self, settings: &TriviaSettings, filters_changed: bool) -> Vec<Effect> {
        self.apply_settings(settings);
        if self.enabled {
            return self.restart(filters_changed);
        }

        self.clear_queue();
        self.stop();
        Vec::new()
    }

    /// The audience went from empty to non-empty.
    pub fn audience_arrived(&mut self) -> Vec<Effect> {
        if !self.enabled {
            return Vec::new();
        }
        self.restart(true)
    }

    /// Stop the loop and drop queued questions.
    pub fn shutdown(&mut self) {
        self.stop();
        self.clear_queue();
    }

    /// Append a refilled batch, unless the queue was cleared since it was requested.
    ///
    /// Returns the number of appended questions, or `None` for a stale batch.
    pub fn accept_refill(&mut self, epoch: u64, questions: Vec<Question>) -> Option<usize> {
        if epoch != self.queue_epoch {
            return None;
        }
        let added = questions.len();
        self.queue.extend(questions);
        Some(added)
    }

    /// Ask for a refill when the loop runs below the low-water mark and no fetch is in flight.
    ///
    /// Called after a stale batch was discarded, so the refill skipped during a reset still
    /// happens before the next starvation poll.
    pub fn refill_if_low(&self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.enabled
            && self.state == LoopState::Running
            && self.queue.len() < self.timing.low_water_mark
            && !self.fetch_gate.is_claimed()
        {
            self.push_refill(&mut effects);
        }
        effects
    }

    /// Resume a delayed continuation. Stale continuations produce nothing.
    pub fn wake(&mut self, wake: Wake) -> Vec<Effect> {
        let mut effects = Vec::new();
        if !self.is_current(wake.generation) {
            return effects;
        }

        match wake.step {
            Step::Round | Step::Advance => self.run_round(wake.generation, &mut effects),
            Step::Reveal(question) => {
                if self.audience.is_empty() {
                    return effects;
                }
                effects.push(Effect::Broadcast(question.answer_line()));
                effects.push(Effect::Schedule {
                    delay: self.timing.between_delay,
                    wake: Wake {
                        generation: wake.generation,
                        step: Step::Advance,
                    },
                });
            }
        }
        effects
    }

    fn run_round(&mut self, generation: Generation, effects: &mut Vec<Effect>) {
        if !self.is_current(generation) {
            return;
        }

        if self.audience.is_empty() {
            effects.push(Self::retry(IDLE_POLL, generation));
            return;
        }

        if self.queue.len() < self.timing.low_water_mark && !self.fetch_gate.is_claimed() {
            self.push_refill(effects);
        }

        let Some(question) = self.queue.pop_front() else {
            effects.push(Self::retry(STARVATION_POLL, generation));
            return;
        };

        effects.extend(question.question_lines().into_iter().map(Effect::Broadcast));
        effects.push(Effect::Schedule {
            delay: self.timing.answer_delay,
            wake: Wake {
                generation,
                step: Step::Reveal(question),
            },
        });
    }

    fn is_current(&self, generation: Generation) -> bool {
        self.enabled && self.state == LoopState::Running && generation == self.generation
    }

    fn clear_queue(&mut self) {
        self.queue.clear();
        self.queue_epoch += 1;
    }

    fn push_refill(&self, effects: &mut Vec<Effect>) {
        let already_requested = effects
            .iter()
            .any(|effect| matches!(effect, Effect::RequestRefill { .. }));
        if !already_requested {
            effects.push(Effect::RequestRefill {
                epoch: self.queue_epoch,
            });
        }
    }

    fn retry(delay: Duration, generation: Generation) -> Effect {
        Effect::Schedule {
            delay,
            wake: Wake {
                generation,
                step: Step::Round,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::state::audience::AudienceTracker;

    fn timing() -> RoundTiming {
        RoundTiming {
            answer_delay: Duration::from_secs(15),
            between_delay: Duration::from_secs(10),
            low_water_mark: 5,
        }
    }

    fn present_audience() -> Arc<AudienceTracker> {
        let audience = Arc::new(AudienceTracker::new());
        audience.join(Uuid::new_v4());
        audience
    }

    fn scheduler(enabled: bool, audience: Arc<AudienceTracker>) -> CycleScheduler {
        CycleScheduler::new(enabled, timing(), audience, FetchGate::new())
    }

    fn arithmetic() -> Question {
        Question::new(
            "2+2=?",
            vec!["3".into(), "4".into(), "5".into(), "6".into()],
            1,
        )
        .unwrap()
    }

    fn broadcasts(effects: &[Effect]) -> Vec<&str> {
        effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::Broadcast(line) => Some(line.as_str()),
                _ => None,
            })
            .collect()
    }

    fn scheduled(effects: &[Effect]) -> Vec<&Effect> {
        effects
            .iter()
            .filter(|effect| matches!(effect, Effect::Schedule { .. }))
            .collect()
    }

    fn single_wake(effects: &[Effect]) -> Wake {
        match scheduled(effects).as_slice() {
            [Effect::Schedule { wake, .. }] => wake.clone(),
            other => panic!("expected exactly one scheduled continuation, got {other:?}"),
        }
    }

    #[test]
    fn full_round_broadcasts_question_then_answer() {
        let mut sm = scheduler(false, present_audience());
        sm.accept_refill(0, vec![arithmetic()]);

        let effects = sm.enable();
        assert_eq!(sm.generation(), 1);
        assert_eq!(
            broadcasts(&effects),
            vec!["Question: 2+2=?", "A) 3", "B) 4", "C) 5", "D) 6"]
        );
        let reveal = match scheduled(&effects).as_slice() {
            [Effect::Schedule { delay, wake }] => {
                assert_eq!(*delay, Duration::from_secs(15));
                wake.clone()
            }
            other => panic!("unexpected schedule: {other:?}"),
        };

        let effects = sm.wake(reveal);
        assert_eq!(broadcasts(&effects), vec!["Answer: B) 4"]);
        let advance = match scheduled(&effects).as_slice() {
            [Effect::Schedule { delay, wake }] => {
                assert_eq!(*delay, Duration::from_secs(10));
                wake.clone()
            }
            other => panic!("unexpected schedule: {other:?}"),
        };
        assert_eq!(advance.step, Step::Advance);

        // Queue is now empty: the next attempt asks for a refill and polls again.
        let effects = sm.wake(advance);
        assert!(broadcasts(&effects).is_empty());
        assert!(effects.contains(&Effect::RequestRefill { epoch: 0 }));
        let retry = single_wake(&effects);
        assert_eq!(retry.step, Step::Round);
        assert_eq!(retry.generation, 1);
    }

    #[test]
    fn empty_audience_defers_without_broadcast() {
        let mut sm = scheduler(true, Arc::new(AudienceTracker::new()));
        sm.accept_refill(0, vec![arithmetic()]);

        let effects = sm.start();
        assert!(broadcasts(&effects).is_empty());
        assert!(
            !effects
                .iter()
                .any(|effect| matches!(effect, Effect::RequestRefill { .. }))
        );
        assert_eq!(
            effects,
            vec![Effect::Schedule {
                delay: IDLE_POLL,
                wake: Wake {
                    generation: sm.generation(),
                    step: Step::Round,
                },
            }]
        );
        assert_eq!(sm.queue_len(), 1);
    }

    #[test]
    fn starved_round_requests_refill_only_when_gate_is_free() {
        let gate = FetchGate::new();
        let mut sm = CycleScheduler::new(true, timing(), present_audience(), gate.clone());

        let effects = sm.start();
        assert_eq!(
            effects,
            vec![
                Effect::RequestRefill { epoch: 0 },
                Effect::Schedule {
                    delay: STARVATION_POLL,
                    wake: Wake {
                        generation: 1,
                        step: Step::Round,
                    },
                },
            ]
        );

        let _permit = gate.try_claim().unwrap();
        let effects = sm.wake(Wake {
            generation: 1,
            step: Step::Round,
        });
        assert_eq!(
            effects,
            vec![Effect::Schedule {
                delay: STARVATION_POLL,
                wake: Wake {
                    generation: 1,
                    step: Step::Round,
                },
            }]
        );
    }

    #[test]
    fn stop_invalidates_every_pending_continuation() {
        let mut sm = scheduler(true, present_audience());
        sm.accept_refill(0, vec![arithmetic(), arithmetic()]);

        let reveal = single_wake(&sm.start());
        sm.stop();

        assert!(sm.wake(reveal.clone()).is_empty());
        assert!(
            sm.wake(Wake {
                generation: reveal.generation,
                step: Step::Advance,
            })
            .is_empty()
        );
        assert_eq!(sm.state(), LoopState::Stopped);
    }

    #[test]
    fn start_while_running_is_a_no_op() {
        let mut sm = scheduler(true, present_audience());
        sm.start();
        let generation = sm.generation();

        assert!(sm.start().is_empty());
        assert_eq!(sm.generation(), generation);
    }

    #[test]
    fn restart_bumps_twice_and_clears_queue() {
        let mut sm = scheduler(true, present_audience());
        sm.accept_refill(0, vec![arithmetic(), arithmetic(), arithmetic()]);
        let stale = single_wake(&sm.start());
        let before = sm.generation();

        let effects = sm.restart(true);
        assert_eq!(sm.generation(), before + 2);
        assert_eq!(sm.queue_len(), 0);
        assert_eq!(sm.queue_epoch(), 1);
        assert_eq!(sm.state(), LoopState::Running);

        let refills = effects
            .iter()
            .filter(|effect| matches!(effect, Effect::RequestRefill { .. }))
            .count();
        assert_eq!(refills, 1);
        assert!(effects.contains(&Effect::RequestRefill { epoch: 1 }));

        assert!(sm.wake(stale).is_empty());
    }

    #[test]
    fn restart_while_disabled_stays_stopped() {
        let mut sm = scheduler(false, present_audience());
        let effects = sm.restart(false);

        assert!(effects.is_empty());
        assert_eq!(sm.generation(), 2);
        assert_eq!(sm.state(), LoopState::Stopped);
        assert!(!sm.enable().is_empty());
        assert_eq!(sm.state(), LoopState::Running);
    }

    #[test]
    fn trigger_now_supersedes_round_in_flight() {
        let mut sm = scheduler(true, present_audience());
        sm.accept_refill(0, vec![arithmetic(), arithmetic()]);
        let first = single_wake(&sm.start());

        let effects = sm.trigger_now().unwrap();
        assert_eq!(broadcasts(&effects).len(), 5);
        assert_eq!(sm.queue_len(), 0);

        assert!(sm.wake(first).is_empty());
    }

    #[test]
    fn trigger_now_rejected_when_disabled() {
        let mut sm = scheduler(false, present_audience());
        assert_eq!(sm.trigger_now(), Err(TriggerRejected));
        assert_eq!(sm.generation(), 0);
    }

    #[test]
    fn reveal_is_skipped_when_audience_left() {
        let audience = Arc::new(AudienceTracker::new());
        let member = Uuid::new_v4();
        audience.join(member);
        let mut sm = scheduler(true, audience.clone());
        sm.accept_refill(0, vec![arithmetic()]);

        let reveal = single_wake(&sm.start());
        audience.leave(member);

        assert!(sm.wake(reveal).is_empty());
    }

    #[test]
    fn stale_refill_batches_are_discarded() {
        let mut sm = scheduler(true, present_audience());
        assert_eq!(sm.accept_refill(0, vec![arithmetic()]), Some(1));

        sm.restart(false);
        assert_eq!(sm.accept_refill(0, vec![arithmetic()]), None);
        assert_eq!(sm.accept_refill(1, vec![arithmetic()]), Some(1));
    }

    #[test]
    fn reload_while_disabled_clears_and_stops() {
        let mut sm = scheduler(false, present_audience());
        sm.accept_refill(0, vec![arithmetic()]);

        let settings = TriviaSettings {
            answer_delay: Duration::from_secs(3),
            ..TriviaSettings::default()
        };
        assert!(sm.reload(&settings, true).is_empty());
        assert_eq!(sm.queue_len(), 0);
        assert_eq!(sm.state(), LoopState::Stopped);
    }

    #[test]
    fn reload_uses_new_timing_for_next_round() {
        let mut sm = scheduler(true, present_audience());
        let settings = TriviaSettings {
            answer_delay: Duration::from_secs(3),
            ..TriviaSettings::default()
        };
        sm.reload(&settings, false);
        sm.accept_refill(sm.queue_epoch(), vec![arithmetic()]);

        let effects = sm.trigger_now().unwrap();
        assert!(scheduled(&effects).iter().any(|effect| matches!(
            effect,
            Effect::Schedule { delay, .. } if *delay == Duration::from_secs(3)
        )));
    }

    #[test]
    fn no_two_generations_broadcast_after_restarts() {
        let mut sm = scheduler(true, present_audience());
        let questions = (0..6).map(|_| arithmetic()).collect();
        sm.accept_refill(0, questions);

        let mut pending = vec![single_wake(&sm.start())];
        for _ in 0..3 {
            pending.extend(
                sm.trigger_now()
                    .unwrap()
                    .into_iter()
                    .filter_map(|effect| match effect {
                        Effect::Schedule { wake, .. } => Some(wake),
                        _ => None,
                    }),
            );
        }

        let current = sm.generation();
        for wake in pending {
            let effects = sm.wake(wake.clone());
            if wake.generation != current {
                assert!(effects.is_empty());
            }
        }
    }

    #[test]
    fn audience_arrival_restarts_only_when_enabled() {
        let mut sm = scheduler(false, present_audience());
        assert!(sm.audience_arrived().is_empty());
        assert_eq!(sm.generation(), 0);

        sm.enable();
        let before = sm.generation();
        let effects = sm.audience_arrived();
        assert_eq!(sm.generation(), before + 2);
        assert!(effects.contains(&Effect::RequestRefill { epoch: 1 }));
    }

    #[test]
    fn boot_requests_initial_refill_and_starts() {
        let mut sm = scheduler(true, present_audience());
        let effects = sm.boot();

        assert_eq!(effects[0], Effect::RequestRefill { epoch: 0 });
        assert_eq!(sm.state(), LoopState::Running);
        assert_eq!(
            effects
                .iter()
                .filter(|effect| matches!(effect, Effect::RequestRefill { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn refill_skipped_during_reset_is_requested_once_the_stale_batch_lands() {
        let gate = FetchGate::new();
        let mut sm = CycleScheduler::new(true, timing(), present_audience(), gate.clone());
        sm.boot();
        let stale_epoch = sm.queue_epoch();
        let in_flight = gate.try_claim().unwrap();

        let effects = sm.restart(true);
        let new_epoch = sm.queue_epoch();
        assert_ne!(stale_epoch, new_epoch);
        assert!(effects.contains(&Effect::RequestRefill { epoch: new_epoch }));
        assert!(sm.refill_if_low().is_empty());

        drop(in_flight);
        assert_eq!(sm.accept_refill(stale_epoch, vec![arithmetic()]), None);
        assert_eq!(
            sm.refill_if_low(),
            vec![Effect::RequestRefill { epoch: new_epoch }]
        );
    }

    #[test]
    fn no_refill_after_stale_batch_while_disabled() {
        let mut sm = scheduler(false, present_audience());
        sm.restart(true);
        assert_eq!(sm.accept_refill(0, vec![arithmetic()]), None);
        assert!(sm.refill_if_low().is_empty());
    }
}
