//! Turning link callbacks into a snapshot channel
//!
//! The link's I/O task is the only writer: every callback merges its event
//! into the current [`SensorSnapshot`] held by a `watch` channel. The control
//! loop is the only reader and always sees a complete, immutable snapshot.
//! Collision points also go through an unbounded channel so that several
//! collisions between two reads are all recorded.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::{CollisionPoint, EventKind, RobotLink, SensorSnapshot, TelemetryEvent};

/// Subscribes to a link and publishes merged snapshots
pub struct SensorHub;

impl SensorHub {
    /// Subscribe to telemetry, collision and power events of `link`
    pub fn attach<L: RobotLink + ?Sized>(link: &mut L) -> SensorFeed {
        let (snapshot_tx, snapshot_rx) = watch::channel(SensorSnapshot::default());
        let (collision_tx, collision_rx) = mpsc::unbounded_channel();
        let snapshot_tx = Arc::new(snapshot_tx);

        for kind in [EventKind::Telemetry, EventKind::Collision, EventKind::Power] {
            let snapshot_tx = Arc::clone(&snapshot_tx);
            let collision_tx = collision_tx.clone();
            link.subscribe(
                kind,
                Box::new(move |event: &TelemetryEvent| {
                    if let TelemetryEvent::Collision(point) = event {
                        debug!(%point, "collision reported");
                        // The feed may already be gone during shutdown.
                        let _ = collision_tx.send(*point);
                    }
                    snapshot_tx.send_modify(|snapshot| snapshot.apply(event));
                }),
            );
        }

        SensorFeed {
            snapshots: snapshot_rx,
            collisions: collision_rx,
        }
    }
}

/// Reader side of a [`SensorHub`]
pub struct SensorFeed {
    snapshots: watch::Receiver<SensorSnapshot>,
    collisions: mpsc::UnboundedReceiver<CollisionPoint>,
}

impl SensorFeed {
    /// Latest snapshot, marking it as seen
    pub fn latest(&mut self) -> SensorSnapshot {
        *self.snapshots.borrow_and_update()
    }

    /// Wait until a snapshot newer than the last one read is published.
    ///
    /// Returns `false` if the publishing side has been dropped.
    pub async fn changed(&mut self) -> bool {
        self.snapshots.changed().await.is_ok()
    }

    /// Collision points reported since the last call
    pub fn drain_collisions(&mut self) -> Vec<CollisionPoint> {
        let mut points = Vec::new();
        while let Ok(point) = self.collisions.try_recv() {
            points.push(point);
        }
        points
    }
}
