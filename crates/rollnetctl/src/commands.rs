// Command implementations for rollnetctl

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rollnet_agent::{ActorCritic, CollisionLog, Trainer, WeightSnapshot};
use rollnet_core::NetworkSnapshot;
use rollnet_link::SimulatedRobot;
use std::path::Path;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::settings::Settings;

pub async fn run(settings: Settings, seed: Option<u64>, fresh: bool) -> Result<()> {
    let Settings {
        agent: agent_config,
        trainer: trainer_config,
        sim,
    } = settings;

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let agent = if fresh {
        ActorCritic::new(agent_config, &mut rng)?
    } else {
        ActorCritic::load_or_init(&trainer_config.weights_path, agent_config, &mut rng).await?
    };

    let log = match CollisionLog::load(&trainer_config.collision_log_path).await {
        Ok(log) => log,
        Err(e) => {
            warn!(
                path = %trainer_config.collision_log_path.display(),
                error = %e,
                "ignoring unreadable collision log"
            );
            CollisionLog::new()
        }
    };
    info!(known_collisions = log.len(), "starting run");

    let robot = SimulatedRobot::new(sim);
    let mut trainer = Trainer::new(agent, robot, log, trainer_config)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, shutting down");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for Ctrl-C");
                // Keep the sender alive so the run is not cut short
                std::future::pending::<()>().await;
            }
        }
    });

    let summary = trainer.run(shutdown_rx).await.context("Control loop failed")?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if !summary.weights_saved || !summary.collision_log_saved {
        bail!("run finished but not everything was saved");
    }
    Ok(())
}

pub async fn inspect(path: &Path, json: bool) -> Result<()> {
    let Some(weights) = WeightSnapshot::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?
    else {
        bail!("no weight snapshot at {}", path.display());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&weights)?);
        return Ok(());
    }

    println!("Weight snapshot: {}", path.display());
    println!("  Format version: {}", weights.format_version);
    println!("  Saved at:       {}", weights.saved_at);
    println!("  Updates:        {}", weights.updates);
    print_network("Actor", &weights.actor);
    print_network("Critic", &weights.critic);
    Ok(())
}

fn print_network(name: &str, network: &NetworkSnapshot) {
    let weights: Vec<f64> = network.connections.iter().map(|c| c.weight).collect();
    println!("  {name}:");
    println!("    Topology:    {:?}", network.topology);
    println!("    Connections: {}", weights.len());
    if weights.is_empty() {
        return;
    }

    #[allow(clippy::cast_precision_loss)]
    let mean = weights.iter().sum::<f64>() / weights.len() as f64;
    let min = weights.iter().copied().fold(f64::INFINITY, f64::min);
    let max = weights.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    println!("    Weights:     min {min:.4}  mean {mean:.4}  max {max:.4}");
}

pub async fn collisions(path: &Path) -> Result<()> {
    let log = CollisionLog::load(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    for point in log.iter() {
        println!("{point}");
    }
    println!("{} distinct collision points", log.len());
    Ok(())
}
