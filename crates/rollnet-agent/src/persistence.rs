//! Weight snapshots on disk
//!
//! Both networks are stored in one bincode blob, gzip-compressed. Loading is
//! soft-failing: a missing file means "start fresh", anything unreadable is
//! reported and [`ActorCritic::load_or_init`] falls back to new weights.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use rand::Rng;
use rollnet_core::{Network, NetworkSnapshot};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};

use crate::{ActorCritic, AgentConfig, PersistError};

/// Version written into every snapshot
pub const FORMAT_VERSION: u32 = 1;

/// Both networks of an agent, as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightSnapshot {
    /// Snapshot format version
    pub format_version: u32,
    /// When the snapshot was taken
    pub saved_at: DateTime<Utc>,
    /// Learning steps taken by the agent
    pub updates: u64,
    /// Actor network
    pub actor: NetworkSnapshot,
    /// Critic network
    pub critic: NetworkSnapshot,
}

impl WeightSnapshot {
    /// Serialise and compress
    pub fn encode(&self) -> Result<Vec<u8>, PersistError> {
        let data = bincode::serialize(self)?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&data)?;
        Ok(encoder.finish()?)
    }

    /// Decompress and deserialise
    pub fn decode(bytes: &[u8]) -> Result<Self, PersistError> {
        let mut decoder = GzDecoder::new(bytes);
        let mut data = Vec::new();
        decoder.read_to_end(&mut data)?;

        let snapshot: Self = bincode::deserialize(&data)?;
        if snapshot.format_version != FORMAT_VERSION {
            return Err(PersistError::UnsupportedVersion(snapshot.format_version));
        }
        Ok(snapshot)
    }

    /// Read a snapshot file; `Ok(None)` if it does not exist
    pub async fn read(path: &Path) -> Result<Option<Self>, PersistError> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Self::decode(&bytes).map(Some)
    }

    /// Write the snapshot through a temporary file and rename it into place
    pub async fn write(&self, path: &Path) -> Result<(), PersistError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let tmp = with_suffix(path, ".tmp");
        fs::write(&tmp, self.encode()?).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }
}

/// `path` with `suffix` appended to its file name
pub(crate) fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    path.with_file_name(name)
}

impl ActorCritic {
    /// Capture both networks
    #[must_use]
    pub fn snapshot(&self) -> WeightSnapshot {
        WeightSnapshot {
            format_version: FORMAT_VERSION,
            saved_at: Utc::now(),
            updates: self.updates(),
            actor: self.actor().snapshot(),
            critic: self.critic().snapshot(),
        }
    }

    /// Rebuild an agent from a snapshot taken with the same topologies as `config`
    pub fn from_weights(config: AgentConfig, weights: &WeightSnapshot) -> Result<Self, PersistError> {
        if weights.actor.topology != config.actor_topology()
            || weights.critic.topology != config.critic_topology()
        {
            return Err(PersistError::Incompatible(format!(
                "snapshot has actor {:?} and critic {:?}, configuration wants {:?} and {:?}",
                weights.actor.topology,
                weights.critic.topology,
                config.actor_topology(),
                config.critic_topology()
            )));
        }

        let actor = Network::from_snapshot(&weights.actor)?;
        let critic = Network::from_snapshot(&weights.critic)?;
        let mut agent = Self::from_networks(config, actor, critic)
            .map_err(|e| PersistError::Incompatible(e.to_string()))?;
        agent.set_updates(weights.updates);
        Ok(agent)
    }

    /// Save both networks to `path`
    pub async fn save(&self, path: &Path) -> Result<(), PersistError> {
        self.snapshot().write(path).await?;
        info!(path = %path.display(), updates = self.updates(), "saved weights");
        Ok(())
    }

    /// Load an agent saved with [`ActorCritic::save`].
    ///
    /// Returns `Ok(None)` when there is no file at `path`.
    pub async fn load(path: &Path, config: AgentConfig) -> Result<Option<Self>, PersistError> {
        let Some(weights) = WeightSnapshot::read(path).await? else {
            return Ok(None);
        };
        let agent = Self::from_weights(config, &weights)?;
        info!(
            path = %path.display(),
            saved_at = %weights.saved_at,
            updates = weights.updates,
            "loaded weights"
        );
        Ok(Some(agent))
    }

    /// Load saved weights, or start from random ones when there are none
    /// or they cannot be used
    pub async fn load_or_init<R: Rng + ?Sized>(
        path: &Path,
        config: AgentConfig,
        rng: &mut R,
    ) -> crate::Result<Self> {
        match Self::load(path, config.clone()).await {
            Ok(Some(agent)) => return Ok(agent),
            Ok(None) => info!(path = %path.display(), "no saved weights, starting fresh"),
            Err(e) => warn!(
                path = %path.display(),
                error = %e,
                "could not load saved weights, starting fresh"
            ),
        }
        Self::new(config, rng)
    }
}
