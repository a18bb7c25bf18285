//! Control loop between an agent and a robot link
//!
//! Every step reads the latest sensor snapshot, values it, rolls the robot
//! along the actor's action, waits one step interval, values the new state
//! and learns from the TD error. Collisions seen during the interval latch
//! the punishment for that step and are added to the collision log.

use std::time::Duration;

use rollnet_link::{RobotLink, RollCommand, SensorFeed, SensorHub, SensorSnapshot};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::{ActorCritic, AgentError, CollisionLog, Result, TrainerConfig};

/// Number of state features fed to both networks
pub const FEATURE_COUNT: usize = 3;

/// `[x / arena_scale, y / arena_scale, |v| / speed_scale]`
#[must_use]
pub fn features(snapshot: &SensorSnapshot, arena_scale: f64, speed_scale: f64) -> [f64; FEATURE_COUNT] {
    let arena_scale = non_zero(arena_scale);
    [
        snapshot.x / arena_scale,
        snapshot.y / arena_scale,
        snapshot.speed() / non_zero(speed_scale),
    ]
}

fn non_zero(scale: f64) -> f64 {
    if scale.abs() > f64::EPSILON {
        scale
    } else {
        1.0
    }
}

/// Why the control loop stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    /// The robot reported critical power
    PowerCritical,
    /// Shutdown was requested
    Interrupted,
    /// The configured number of steps was reached
    StepLimit,
    /// The link dropped
    LinkLost,
    /// A step failed
    Failed(String),
}

/// Outcome of [`Trainer::run`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Learning steps completed
    pub steps: usize,
    /// Collisions reported during the run
    pub collisions: usize,
    /// Mean absolute TD error over all steps
    pub mean_abs_td: f64,
    /// Why the loop stopped
    pub exit: ExitReason,
    /// Whether the weights were written at shutdown
    pub weights_saved: bool,
    /// Whether the collision log was written at shutdown
    pub collision_log_saved: bool,
}

/// Drives an [`ActorCritic`] through a [`RobotLink`]
pub struct Trainer<L: RobotLink> {
    agent: ActorCritic,
    link: L,
    feed: SensorFeed,
    log: CollisionLog,
    config: TrainerConfig,
    steps: usize,
    collisions: usize,
    td_sum: f64,
}

impl<L: RobotLink> Trainer<L> {
    /// Attach to `link`; the agent must take [`FEATURE_COUNT`] features
    pub fn new(agent: ActorCritic, mut link: L, log: CollisionLog, config: TrainerConfig) -> Result<Self> {
        if agent.config().features != FEATURE_COUNT {
            return Err(AgentError::Config(format!(
                "the control loop feeds {FEATURE_COUNT} features, agent expects {}",
                agent.config().features
            )));
        }

        let feed = SensorHub::attach(&mut link);
        Ok(Self {
            agent,
            link,
            feed,
            log,
            config,
            steps: 0,
            collisions: 0,
            td_sum: 0.0,
        })
    }

    /// Connect, run until power is critical, the step limit is hit or
    /// `shutdown` turns `true`, then save and disconnect.
    ///
    /// Dropping the sender side of `shutdown` also stops the loop. Weights
    /// and the collision log are saved on every exit path once connected;
    /// failures there are logged and reported in the summary.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<RunSummary> {
        self.link.connect().await?;
        info!(
            step_interval_ms = self.config.step_interval_ms,
            max_steps = ?self.config.max_steps,
            "control loop started"
        );
        self.wait_for_telemetry().await;

        let exit = match self.drive(&mut shutdown).await {
            Ok(exit) => exit,
            Err(e) => {
                error!(error = %e, step = self.steps, "control loop failed");
                ExitReason::Failed(e.to_string())
            }
        };
        let (weights_saved, collision_log_saved) = self.shut_down().await;

        let summary = RunSummary {
            steps: self.steps,
            collisions: self.collisions,
            mean_abs_td: self.mean_abs_td(),
            exit,
            weights_saved,
            collision_log_saved,
        };
        info!(
            steps = summary.steps,
            collisions = summary.collisions,
            mean_abs_td = summary.mean_abs_td,
            exit = ?summary.exit,
            "control loop finished"
        );
        Ok(summary)
    }

    async fn wait_for_telemetry(&mut self) {
        if self.feed.latest().sequence > 0 {
            return;
        }
        let timeout = Duration::from_millis(self.config.link_timeout_ms);
        match tokio::time::timeout(timeout, self.feed.changed()).await {
            Ok(true) => {}
            Ok(false) => warn!("telemetry source closed before the first snapshot"),
            Err(_) => warn!(?timeout, "no telemetry yet, starting from an empty snapshot"),
        }
    }

    async fn drive(&mut self, shutdown: &mut watch::Receiver<bool>) -> Result<ExitReason> {
        let discount = self.agent.config().discount;
        let learning_rate = self.agent.config().learning_rate;
        let max_speed = self.agent.config().max_speed;

        let mut ticker = interval(Duration::from_millis(self.config.step_interval_ms.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            if *shutdown.borrow() {
                return Ok(ExitReason::Interrupted);
            }
            if self.config.max_steps.is_some_and(|max| self.steps >= max) {
                return Ok(ExitReason::StepLimit);
            }
            if !self.link.is_connected() {
                return Ok(ExitReason::LinkLost);
            }
            let before = self.feed.latest();
            if before.power.is_critical() {
                info!(step = self.steps, "power critical");
                return Ok(ExitReason::PowerCritical);
            }

            let state = self.features(&before);
            let state_o = self.agent.state_value(&state)?;
            let action = self.agent.action(&state, max_speed)?;
            self.link.roll(action.to_command(true)).await?;

            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return Ok(ExitReason::Interrupted);
                    }
                    ticker.tick().await;
                }
            }

            if self.record_collisions() > 0 {
                self.agent.set_collision();
            }

            let after = self.feed.latest();
            let state_n = self.agent.state_value(&self.features(&after))?;
            let collided = self.agent.collided();
            let td = self.agent.learn(state_n, state_o, discount, learning_rate)?;
            self.agent.reset_collision();

            self.steps += 1;
            self.td_sum += td.abs();
            debug!(
                step = self.steps,
                speed = action.speed,
                heading = action.heading,
                state_o,
                state_n,
                td,
                collided,
                "step"
            );

            self.checkpoint().await;
        }
    }

    /// Move reported collisions into the log; returns how many there were
    fn record_collisions(&mut self) -> usize {
        let points = self.feed.drain_collisions();
        self.collisions += points.len();
        let count = points.len();
        for point in points {
            if self.log.record(point) {
                debug!(%point, "new collision point");
            }
        }
        count
    }

    async fn checkpoint(&self) {
        let Some(every) = self.config.checkpoint_every.filter(|n| *n > 0) else {
            return;
        };
        if self.steps % every == 0 {
            if let Err(e) = self.agent.save(&self.config.weights_path).await {
                warn!(error = %e, step = self.steps, "checkpoint failed");
            }
        }
    }

    /// Persist first, then stop and disconnect; each part runs regardless
    /// of the others failing. Collisions reported since the last step are
    /// logged before saving.
    async fn shut_down(&mut self) -> (bool, bool) {
        let pending = self.record_collisions();
        if pending > 0 {
            debug!(pending, "logged collisions from the unfinished step");
        }

        let weights_saved = match self.agent.save(&self.config.weights_path).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    path = %self.config.weights_path.display(),
                    error = %e,
                    "failed to save weights"
                );
                false
            }
        };

        let collision_log_saved = match self.log.save(&self.config.collision_log_path).await {
            Ok(points) => {
                info!(points, "collision log saved");
                true
            }
            Err(e) => {
                error!(
                    path = %self.config.collision_log_path.display(),
                    error = %e,
                    "failed to save collision log"
                );
                false
            }
        };

        if self.link.is_connected() {
            if let Err(e) = self.link.roll(RollCommand::stop()).await {
                error!(error = %e, "failed to stop the robot");
            }
        }
        if let Err(e) = self.link.disconnect().await {
            error!(error = %e, "failed to disconnect");
        }

        (weights_saved, collision_log_saved)
    }

    fn features(&self, snapshot: &SensorSnapshot) -> [f64; FEATURE_COUNT] {
        features(snapshot, self.config.arena_scale, self.config.speed_scale)
    }

    #[allow(clippy::cast_precision_loss)]
    fn mean_abs_td(&self) -> f64 {
        if self.steps == 0 {
            0.0
        } else {
            self.td_sum / self.steps as f64
        }
    }

    /// The agent being trained
    pub fn agent(&self) -> &ActorCritic {
        &self.agent
    }

    /// Collision points recorded so far
    pub fn collision_log(&self) -> &CollisionLog {
        &self.log
    }

    /// The robot link
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Take the agent, link and collision log back
    pub fn into_parts(self) -> (ActorCritic, L, CollisionLog) {
        (self.agent, self.link, self.log)
    }
}
