//! The single task that owns the scheduler and the question queue.
//!
//! Every state transition, queue mutation and generation check happens inside
//! [`CycleRunner::run`]. Timers and refills run elsewhere and report back
//! through the runner's inbox.

use std::sync::Arc;

use tokio::{
    sync::{mpsc, oneshot},
    time::sleep,
};
use tracing::{debug, info};

use crate::{
    config::TriviaSettings,
    dao::question_source::QuestionSource,
    error::ServiceError,
    services::{
        broadcast::Broadcaster,
        refill::{RefillBatch, RefillCoordinator, RefillRequest},
    },
    state::{
        audience::Audience,
        fetch_gate::FetchGate,
        scheduler::{CycleScheduler, Effect, RoundTiming, SchedulerStatus, TriggerRejected, Wake},
    },
};

/// Messages processed by the runner, in arrival order.
#[derive(Debug)]
pub enum RunnerCommand {
    /// Set the enabled flag and start the loop.
    Enable,
    /// Clear the enabled flag and stop the loop.
    Disable,
    /// Adopt new settings and restart from a clean queue.
    Reload {
        /// Settings to adopt.
        settings: TriviaSettings,
        /// Whether the question filters changed, forcing an immediate refill.
        filters_changed: bool,
    },
    /// Adopt new settings, then stop, clear the queue and start over.
    Restart {
        /// Settings to adopt.
        settings: TriviaSettings,
        /// Whether to request a refill before the first round.
        fetch_immediately: bool,
    },
    /// Adopt new settings without restarting the loop.
    UpdateSettings(TriviaSettings),
    /// Run a fresh round right away.
    TriggerNow(oneshot::Sender<Result<(), TriggerRejected>>),
    /// The audience went from empty to non-empty.
    AudienceArrived,
    /// Report the scheduler status.
    Status(oneshot::Sender<SchedulerStatus>),
    /// A delayed continuation is due.
    Wake(Wake),
    /// A refill produced questions.
    RefillDone(RefillBatch),
    /// Stop the loop, drop the queue and exit.
    Shutdown,
}

/// Cloneable front door to the runner used by the control surface.
#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<RunnerCommand>,
}

impl SchedulerHandle {
    fn send(&self, command: RunnerCommand) -> Result<(), ServiceError> {
        self.tx
            .send(command)
            .map_err(|_| ServiceError::SchedulerUnavailable)
    }

    /// Enable trivia and start the loop if it is stopped.
    pub fn enable(&self) -> Result<(), ServiceError> {
        self.send(RunnerCommand::Enable)
    }

    /// Disable trivia and stop the loop.
    pub fn disable(&self) -> Result<(), ServiceError> {
        self.send(RunnerCommand::Disable)
    }

    /// Restart with `settings`, refilling immediately when the filters changed.
    pub fn reload(
        &self,
        settings: TriviaSettings,
        filters_changed: bool,
    ) -> Result<(), ServiceError> {
        self.send(RunnerCommand::Reload {
            settings,
            filters_changed,
        })
    }

    /// Adopt `settings` and restart from an empty queue, whether enabled or not.
    pub fn restart(
        &self,
        settings: TriviaSettings,
        fetch_immediately: bool,
    ) -> Result<(), ServiceError> {
        self.send(RunnerCommand::Restart {
            settings,
            fetch_immediately,
        })
    }

    /// Hand new settings to the loop without restarting it.
    pub fn update_settings(&self, settings: TriviaSettings) -> Result<(), ServiceError> {
        self.send(RunnerCommand::UpdateSettings(settings))
    }

    /// Notify the loop that the first audience member arrived.
    pub fn audience_arrived(&self) -> Result<(), ServiceError> {
        self.send(RunnerCommand::AudienceArrived)
    }

    /// Ask the loop to stop and exit.
    pub fn shutdown(&self) -> Result<(), ServiceError> {
        self.send(RunnerCommand::Shutdown)
    }

    /// Abandon the current round and run a new one now.
    pub async fn trigger_now(&self) -> Result<(), ServiceError> {
        let (reply, response) = oneshot::channel();
        self.send(RunnerCommand::TriggerNow(reply))?;
        response
            .await
            .map_err(|_| ServiceError::SchedulerUnavailable)?
            .map_err(|rejected| ServiceError::InvalidState(rejected.to_string()))
    }

    /// Current scheduler status.
    pub async fn status(&self) -> Result<SchedulerStatus, ServiceError> {
        let (reply, response) = oneshot::channel();
        self.send(RunnerCommand::Status(reply))?;
        response
            .await
            .map_err(|_| ServiceError::SchedulerUnavailable)
    }
}

/// Owns the scheduler and executes the effects it requests.
pub struct CycleRunner {
    scheduler: CycleScheduler,
    coordinator: RefillCoordinator,
    broadcaster: Arc<dyn Broadcaster>,
    settings: TriviaSettings,
    inbox: mpsc::UnboundedReceiver<RunnerCommand>,
    outbox: mpsc::UnboundedSender<RunnerCommand>,
}

impl CycleRunner {
    /// Wire a runner and the handle that drives it.
    pub fn new(
        settings: TriviaSettings,
        audience: Arc<dyn Audience>,
        source: Arc<dyn QuestionSource>,
        broadcaster: Arc<dyn Broadcaster>,
        gate: FetchGate,
    ) -> (Self, SchedulerHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = CycleScheduler::new(
            settings.start_enabled,
            RoundTiming::from(&settings),
            Arc::clone(&audience),
            gate.clone(),
        );
        let coordinator = RefillCoordinator::new(source, audience, gate);

        let runner = Self {
            scheduler,
            coordinator,
            broadcaster,
            settings,
            inbox: rx,
            outbox: tx.clone(),
        };
        (runner, SchedulerHandle { tx })
    }

    /// Process commands until [`RunnerCommand::Shutdown`].
    pub async fn run(mut self) {
        info!(enabled = self.scheduler.is_enabled(), "trivia loop booting");
        let effects = self.scheduler.boot();
        self.execute(effects);

        while let Some(command) = self.inbox.recv().await {
            match command {
                RunnerCommand::Enable => {
                    let effects = self.scheduler.enable();
                    info!(generation = self.scheduler.generation(), "trivia enabled");
                    self.execute(effects);
                }
                RunnerCommand::Disable => {
                    self.scheduler.disable();
                    info!(generation = self.scheduler.generation(), "trivia disabled");
                }
                RunnerCommand::Reload {
                    settings,
                    filters_changed,
                } => {
                    let effects = self.scheduler.reload(&settings, filters_changed);
                    self.settings = settings;
                    info!(
                        generation = self.scheduler.generation(),
                        filters_changed, "trivia loop reloaded"
                    );
                    self.execute(effects);
                }
                RunnerCommand::Restart {
                    settings,
                    fetch_immediately,
                } => {
                    self.scheduler.apply_settings(&settings);
                    self.settings = settings;
                    let effects = self.scheduler.restart(fetch_immediately);
                    info!(
                        generation = self.scheduler.generation(),
                        fetch_immediately, "trivia loop restarted"
                    );
                    self.execute(effects);
                }
                RunnerCommand::UpdateSettings(settings) => {
                    self.scheduler.apply_settings(&settings);
                    self.settings = settings;
                }
                RunnerCommand::TriggerNow(reply) => {
                    let outcome = self.scheduler.trigger_now().map(|effects| {
                        info!(
                            generation = self.scheduler.generation(),
                            "triggered next trivia round"
                        );
                        self.execute(effects);
                    });
                    let _ = reply.send(outcome);
                }
                RunnerCommand::AudienceArrived => {
                    if self.scheduler.is_enabled() {
                        info!("first audience member arrived; restarting trivia loop");
                    }
                    let effects = self.scheduler.audience_arrived();
                    self.execute(effects);
                }
                RunnerCommand::Status(reply) => {
                    let _ = reply.send(self.scheduler.status());
                }
                RunnerCommand::Wake(wake) => {
                    let effects = self.scheduler.wake(wake);
                    self.execute(effects);
                }
                RunnerCommand::RefillDone(batch) => {
                    let (epoch, questions) = batch.into_parts();
                    match self.scheduler.accept_refill(epoch, questions) {
                        Some(added) => info!(
                            added,
                            queue_size = self.scheduler.queue_len(),
                            "queued fetched questions"
                        ),
                        None => {
                            debug!(
                                epoch,
                                current = self.scheduler.queue_epoch(),
                                "discarding questions fetched before the queue was reset"
                            );
                            let effects = self.scheduler.refill_if_low();
                            self.execute(effects);
                        }
                    }
                }
                RunnerCommand::Shutdown => {
                    self.scheduler.shutdown();
                    info!("trivia loop stopped");
                    break;
                }
            }
        }
    }

    fn execute(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Broadcast(line) => {
                    let line = format!("{}{}", self.settings.chat_prefix, line);
                    self.broadcaster.send(&line);
                }
                Effect::Schedule { delay, wake } => {
                    let outbox = self.outbox.clone();
                    tokio::spawn(async move {
                        sleep(delay).await;
                        let _ = outbox.send(RunnerCommand::Wake(wake));
                    });
                }
                Effect::RequestRefill { epoch } => {
                    let request = RefillRequest {
                        amount: self.settings.refill_amount(),
                        filters: self.settings.filters(),
                        epoch,
                        timeout: self.settings.fetch_timeout,
                    };
                    let outbox = self.outbox.clone();
                    self.coordinator.request_refill(request, move |batch| {
                        let _ = outbox.send(RunnerCommand::RefillDone(batch));
                    });
                }
            }
        }
    }
}
