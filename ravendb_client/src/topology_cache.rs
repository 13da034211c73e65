use std::{
    fs,
    path::{Path, PathBuf},
};

use sha2::{Digest, Sha256};
use tracing::instrument;
use url::Url;

use crate::topology::{Topology, ETAG_FORCED};

const CACHE_FILE_EXTENSION: &str = "raven-topology";

/// On-disk store of the last topology fetched for each (url, database) pair.
///
/// Lets a client start against a cluster whose seed urls are temporarily unreachable.
/// Writes are best effort: a failure to persist is logged and otherwise ignored. Nothing
/// coordinates between processes sharing a directory, the last writer wins.
#[derive(Clone, Debug)]
pub struct TopologyCache {
    location: Option<PathBuf>,
}

impl TopologyCache {
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: Some(location.into()),
        }
    }

    /// A cache that stores nothing and never finds anything.
    pub fn disabled() -> Self {
        Self { location: None }
    }

    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Hex encoded SHA-256 of the url and database name.
    pub fn cache_key(url: &Url, database: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(database.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn path_for(&self, url: &Url, database: &str) -> Option<PathBuf> {
        self.location.as_ref().map(|dir| {
            dir.join(format!(
                "{}.{}",
                Self::cache_key(url, database),
                CACHE_FILE_EXTENSION
            ))
        })
    }

    /// Persists `topology` under the key of the node it was fetched from.
    #[instrument(level = "debug", skip(self, topology), fields(etag = topology.etag))]
    pub fn save(&self, url: &Url, database: &str, topology: &Topology) {
        let Some(path) = self.path_for(url, database) else {
            return;
        };

        if let Err(e) = write_atomically(&path, topology) {
            tracing::debug!(
                "Could not write topology cache file `{}`. Caused by: {}",
                path.display(),
                e
            );
        }
    }

    /// Persists `topology` under every seed url, so a later bootstrap from any of them finds
    /// the newest topology no matter which node served it.
    pub fn save_for_seeds(&self, seeds: &[Url], database: &str, topology: &Topology) {
        for seed in seeds {
            self.save(seed, database, topology);
        }
    }

    /// Loads the cached topology for a node. The etag is replaced with [`ETAG_FORCED`] so any
    /// topology fetched from a live node afterwards wins.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, url: &Url, database: &str) -> Option<Topology> {
        let path = self.path_for(url, database)?;
        let bytes = fs::read(&path).ok()?;

        match serde_json::from_slice::<Topology>(&bytes) {
            Ok(mut topology) if !topology.nodes.is_empty() => {
                topology.etag = ETAG_FORCED;
                Some(topology)
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(
                    "Ignoring unreadable topology cache file `{}`. Caused by: {}",
                    path.display(),
                    e
                );
                None
            }
        }
    }

    /// Tries the cache entry of every seed url in order and returns the first usable one.
    pub fn try_load_from_cache(&self, urls: &[Url], database: &str) -> Option<Topology> {
        urls.iter().find_map(|url| {
            let topology = self.load(url, database);
            if topology.is_some() {
                tracing::info!("Loaded topology for `{}` from cache", url);
            }
            topology
        })
    }
}

fn write_atomically(path: &Path, topology: &Topology) -> anyhow::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let staging = path.with_extension("tmp");
    fs::write(&staging, serde_json::to_vec(topology)?)?;
    fs::rename(&staging, path)?;
    Ok(())
}
