//! Simulated rolling robot in a square, walled arena
//!
//! The robot starts near the centre, rolls at the commanded speed and
//! heading, and reports a collision each time it runs into a wall. Its
//! battery drains one tick at a time until the power state turns critical.
//! Telemetry is produced by a tokio task standing in for the transport's
//! I/O thread.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    CollisionPoint, EventCallback, EventKind, LinkError, PowerState, RobotLink, RollCommand,
    TelemetryEvent,
};

type Subscribers = Arc<RwLock<Vec<(EventKind, EventCallback)>>>;

/// Simulation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Distance from the centre to each wall (cm)
    pub arena_half_size: f64,
    /// Speed reached at command speed 255 (cm/s)
    pub top_speed: f64,
    /// Time between telemetry events (ms)
    pub telemetry_period_ms: u64,
    /// Ticks until the battery is critical; `None` never drains
    pub battery_ticks: Option<u64>,
    /// How long `disconnect` waits for the I/O task (ms)
    pub join_timeout_ms: u64,
    /// Seed for the start position
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            arena_half_size: 150.0,
            top_speed: 100.0,
            telemetry_period_ms: 20,
            battery_ticks: Some(30_000),
            join_timeout_ms: 1_000,
            seed: None,
        }
    }
}

impl SimConfig {
    /// Reject an arena or speed the simulation cannot integrate
    pub fn validate(&self) -> crate::Result<()> {
        if !self.arena_half_size.is_finite() || self.arena_half_size <= 0.0 {
            return Err(LinkError::InvalidConfig(format!(
                "arena_half_size must be a positive number, got {}",
                self.arena_half_size
            )));
        }
        if !self.top_speed.is_finite() || self.top_speed < 0.0 {
            return Err(LinkError::InvalidConfig(format!(
                "top_speed must be a non-negative number, got {}",
                self.top_speed
            )));
        }
        Ok(())
    }
}

/// A [`RobotLink`] to a simulated robot
pub struct SimulatedRobot {
    config: SimConfig,
    subscribers: Subscribers,
    commands: Option<watch::Sender<RollCommand>>,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SimulatedRobot {
    /// Create a disconnected simulated robot
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            subscribers: Arc::new(RwLock::new(Vec::new())),
            commands: None,
            stop: None,
            task: None,
        }
    }

    /// Simulation parameters
    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }
}

#[async_trait]
impl RobotLink for SimulatedRobot {
    async fn connect(&mut self) -> crate::Result<()> {
        if self.task.is_some() {
            return Err(LinkError::AlreadyConnected);
        }
        self.config.validate()?;

        let (command_tx, command_rx) = watch::channel(RollCommand::stop());
        let (stop_tx, stop_rx) = oneshot::channel();
        let world = World::new(&self.config);
        let subscribers = Arc::clone(&self.subscribers);
        let period = Duration::from_millis(self.config.telemetry_period_ms.max(1));

        self.task = Some(tokio::spawn(run_world(
            world,
            subscribers,
            command_rx,
            stop_rx,
            period,
        )));
        self.commands = Some(command_tx);
        self.stop = Some(stop_tx);

        info!("Simulated robot connected");
        Ok(())
    }

    async fn disconnect(&mut self) -> crate::Result<()> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        self.commands = None;
        if let Some(stop) = self.stop.take() {
            // The task may have ended on its own already.
            let _ = stop.send(());
        }

        let timeout = Duration::from_millis(self.config.join_timeout_ms);
        let abort = task.abort_handle();
        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(())) => {
                info!("Simulated robot disconnected");
                Ok(())
            }
            Ok(Err(e)) => Err(LinkError::TaskFailed(e.to_string())),
            Err(_) => {
                warn!(?timeout, "I/O task did not stop, aborting it");
                abort.abort();
                Err(LinkError::JoinTimeout(timeout))
            }
        }
    }

    async fn roll(&mut self, command: RollCommand) -> crate::Result<()> {
        let commands = self.commands.as_ref().ok_or(LinkError::NotConnected)?;
        commands
            .send(command)
            .map_err(|_| LinkError::Transport("simulation task has stopped".to_string()))?;
        debug!(?command, "roll");
        Ok(())
    }

    fn subscribe(&mut self, kind: EventKind, callback: EventCallback) {
        match self.subscribers.write() {
            Ok(mut subscribers) => subscribers.push((kind, callback)),
            Err(poisoned) => poisoned.into_inner().push((kind, callback)),
        }
    }

    fn is_connected(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

/// Physical state of the simulated robot
struct World {
    half_size: f64,
    top_speed: f64,
    x: f64,
    y: f64,
    speed_x: f64,
    speed_y: f64,
    touching_wall: bool,
    ticks: u64,
    battery_ticks: Option<u64>,
    power: PowerState,
}

impl World {
    fn new(config: &SimConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let spread = config.arena_half_size / 4.0;
        let (x, y) = if spread > 0.0 {
            (rng.gen_range(-spread..=spread), rng.gen_range(-spread..=spread))
        } else {
            (0.0, 0.0)
        };

        Self {
            half_size: config.arena_half_size,
            top_speed: config.top_speed,
            x,
            y,
            speed_x: 0.0,
            speed_y: 0.0,
            touching_wall: false,
            ticks: 0,
            battery_ticks: config.battery_ticks,
            power: PowerState::Ok,
        }
    }

    /// Advance by `dt` seconds under `command`; returns the events produced
    fn step(&mut self, command: RollCommand, dt: f64) -> Vec<TelemetryEvent> {
        let mut events = Vec::with_capacity(3);

        if command.drive {
            let speed = f64::from(command.speed) / f64::from(u8::MAX) * self.top_speed;
            let heading = f64::from(command.heading).to_radians();
            self.speed_x = speed * heading.sin();
            self.speed_y = speed * heading.cos();
        } else {
            self.speed_x = 0.0;
            self.speed_y = 0.0;
        }

        let mut x = self.x + self.speed_x * dt;
        let mut y = self.y + self.speed_y * dt;
        let mut hit = false;
        if x.abs() > self.half_size {
            x = x.clamp(-self.half_size, self.half_size);
            self.speed_x = 0.0;
            hit = true;
        }
        if y.abs() > self.half_size {
            y = y.clamp(-self.half_size, self.half_size);
            self.speed_y = 0.0;
            hit = true;
        }
        self.x = x;
        self.y = y;

        events.push(self.motion());
        if hit && !self.touching_wall {
            #[allow(clippy::cast_possible_truncation)]
            let point = CollisionPoint::new(self.x.round() as i32, self.y.round() as i32, 0);
            events.push(TelemetryEvent::Collision(point));
        }
        self.touching_wall = hit;

        self.ticks += 1;
        let power = self.power_state();
        if power != self.power {
            self.power = power;
            events.push(TelemetryEvent::Power(power));
        }

        events
    }

    fn motion(&self) -> TelemetryEvent {
        TelemetryEvent::Motion {
            x: self.x,
            y: self.y,
            speed_x: self.speed_x,
            speed_y: self.speed_y,
        }
    }

    fn power_state(&self) -> PowerState {
        match self.battery_ticks {
            None => PowerState::Ok,
            Some(total) if self.ticks >= total => PowerState::Critical,
            Some(total) if self.ticks >= total / 2 => PowerState::Low,
            Some(_) => PowerState::Ok,
        }
    }
}

fn publish(subscribers: &Subscribers, event: &TelemetryEvent) {
    let subscribers = match subscribers.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    for (kind, callback) in subscribers.iter() {
        if *kind == event.kind() {
            callback(event);
        }
    }
}

async fn run_world(
    mut world: World,
    subscribers: Subscribers,
    commands: watch::Receiver<RollCommand>,
    mut stop: oneshot::Receiver<()>,
    period: Duration,
) {
    let dt = period.as_secs_f64();
    let mut ticker = tokio::time::interval(period);

    publish(&subscribers, &world.motion());
    publish(&subscribers, &TelemetryEvent::Power(world.power));
    loop {
        tokio::select! {
            _ = &mut stop => break,
            _ = ticker.tick() => {}
        }

        let command = *commands.borrow();
        for event in world.step(command, dt) {
            publish(&subscribers, &event);
        }
    }
    debug!(ticks = world.ticks, "simulation task stopped");
}
