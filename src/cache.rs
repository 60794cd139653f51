//! Proto-round caching.
//!
//! A proto-round depends only on `(teams, appearances, zones, spacing)`,
//! so it can be stored once and reused across runs. Caching is best
//! effort: a miss, an unreadable file or a stale entry just means the
//! proto-round is solved again.

use crate::cp::CpSolver;
use crate::error::Result;
use crate::proto::ProtoRoundBuilder;
use crate::schedule::{Params, ProtoRound};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Identifies a proto-round by the parameters it was solved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub num_teams: usize,
    pub appearances_per_round: usize,
    pub num_zones: usize,
    pub spacing: usize,
}

impl From<&Params> for CacheKey {
    fn from(params: &Params) -> Self {
        Self {
            num_teams: params.num_teams,
            appearances_per_round: params.appearances_per_round,
            num_zones: params.num_zones,
            spacing: params.spacing,
        }
    }
}

impl CacheKey {
    /// `pround-T-A-Z-S.json`
    pub fn file_name(&self) -> String {
        format!(
            "pround-{}-{}-{}-{}.json",
            self.num_teams, self.appearances_per_round, self.num_zones, self.spacing
        )
    }

    fn params(&self) -> Params {
        Params::new(
            self.num_teams,
            self.appearances_per_round,
            self.num_zones,
            self.spacing,
        )
    }
}

/// Storage for solved proto-rounds.
pub trait ProtoRoundCache {
    /// Returns the stored proto-round, or `None` on a miss or any failure.
    fn load(&self, key: &CacheKey) -> Option<ProtoRound>;

    /// Stores a proto-round. Failures are logged and otherwise ignored.
    fn store(&self, key: &CacheKey, proto: &ProtoRound);
}

/// Disables caching.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl ProtoRoundCache for NoCache {
    fn load(&self, _key: &CacheKey) -> Option<ProtoRound> {
        None
    }

    fn store(&self, _key: &CacheKey, _proto: &ProtoRound) {}
}

/// JSON files in a directory, one per key.
#[derive(Debug, Clone)]
pub struct DirCache {
    dir: PathBuf,
}

impl Default for DirCache {
    fn default() -> Self {
        Self::in_temp_dir()
    }
}

impl DirCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `u-matchplan-cache` under the system temp directory.
    pub fn in_temp_dir() -> Self {
        Self::new(std::env::temp_dir().join("u-matchplan-cache"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    fn read(&self, path: &Path) -> Result<ProtoRound> {
        let data = fs::read_to_string(path)?;
        let raw: ProtoRound = serde_json::from_str(&data)?;
        // Re-check the shape; the file may have been edited by hand.
        ProtoRound::new(raw.matches().to_vec())
    }

    fn write(&self, path: &Path, proto: &ProtoRound) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let data = serde_json::to_string_pretty(proto)?;
        fs::write(path, data)?;
        Ok(())
    }
}

impl ProtoRoundCache for DirCache {
    fn load(&self, key: &CacheKey) -> Option<ProtoRound> {
        let path = self.path_for(key);
        if !path.exists() {
            debug!(path = %path.display(), "proto-round cache miss");
            return None;
        }
        match self.read(&path) {
            Ok(proto) => match proto.verify(&key.params()) {
                Ok(()) => {
                    debug!(path = %path.display(), "proto-round cache hit");
                    Some(proto)
                }
                Err(err) => {
                    warn!(path = %path.display(), reason = %err, "cached proto-round does not match its key");
                    None
                }
            },
            Err(reason) => {
                warn!(path = %path.display(), reason = %reason, "unreadable proto-round cache entry");
                None
            }
        }
    }

    fn store(&self, key: &CacheKey, proto: &ProtoRound) {
        let path = self.path_for(key);
        if let Err(reason) = self.write(&path, proto) {
            warn!(path = %path.display(), reason = %reason, "could not write proto-round cache entry");
        }
    }
}

/// Loads the proto-round for `params` from `cache`, solving and storing it
/// on a miss.
pub fn build_cached<S: CpSolver>(
    builder: &ProtoRoundBuilder<S>,
    cache: &dyn ProtoRoundCache,
    params: &Params,
) -> Result<ProtoRound> {
    params.validate()?;
    let key = CacheKey::from(params);
    if let Some(proto) = cache.load(&key) {
        return Ok(proto);
    }
    let proto = builder.build(params)?;
    cache.store(&key, &proto);
    info!(file = %key.file_name(), "proto-round solved");
    Ok(proto)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScheduleError;
    use tempfile::TempDir;

    fn params() -> Params {
        Params::new(4, 1, 2, 1)
    }

    #[test]
    fn test_file_name() {
        assert_eq!(CacheKey::from(&Params::new(8, 2, 4, 1)).file_name(), "pround-8-2-4-1.json");
    }

    #[test]
    fn test_store_then_load() {
        let dir = TempDir::new().unwrap();
        let cache = DirCache::new(dir.path().join("nested"));
        let key = CacheKey::from(&params());
        assert!(cache.load(&key).is_none());

        let proto = ProtoRoundBuilder::new().build(&params()).unwrap();
        cache.store(&key, &proto);
        assert!(cache.path_for(&key).exists());
        assert_eq!(cache.load(&key), Some(proto));
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = DirCache::new(dir.path());
        let key = CacheKey::from(&params());
        fs::write(cache.path_for(&key), "not json").unwrap();
        assert!(cache.load(&key).is_none());
        assert!(matches!(
            cache.read(&cache.path_for(&key)),
            Err(ScheduleError::CacheFormat(_))
        ));
    }

    #[test]
    fn test_unwritable_dir_is_io_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "").unwrap();
        let cache = DirCache::new(blocker.join("sub"));
        let key = CacheKey::from(&params());
        let proto = ProtoRoundBuilder::new().build(&params()).unwrap();
        assert!(matches!(
            cache.write(&cache.path_for(&key), &proto),
            Err(ScheduleError::CacheIo(_))
        ));
        cache.store(&key, &proto);
        assert!(cache.load(&key).is_none());
    }

    #[test]
    fn test_mismatched_entry_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = DirCache::new(dir.path());
        let other = ProtoRound::new(vec![vec![0, 1, 2], vec![3, 4, 5]]).unwrap();
        let key = CacheKey::from(&params());
        cache.store(&key, &other);
        assert!(cache.load(&key).is_none());
    }

    #[test]
    fn test_build_cached_uses_stored_entry() {
        let dir = TempDir::new().unwrap();
        let cache = DirCache::new(dir.path());
        let builder = ProtoRoundBuilder::new();

        let first = build_cached(&builder, &cache, &params()).unwrap();
        // Replace with a different but valid proto-round for the same key.
        let swapped = ProtoRound::new(vec![vec![0, 2], vec![1, 3]]).unwrap();
        cache.store(&CacheKey::from(&params()), &swapped);

        let second = build_cached(&builder, &cache, &params()).unwrap();
        assert_ne!(first, second);
        assert_eq!(second, swapped);
    }

    #[test]
    fn test_no_cache_always_solves() {
        let proto = build_cached(&ProtoRoundBuilder::new(), &NoCache, &params()).unwrap();
        assert_eq!(proto.num_matches(), 2);
    }

    #[test]
    fn test_invalid_params_fail_before_cache() {
        let dir = TempDir::new().unwrap();
        let cache = DirCache::new(dir.path());
        assert!(build_cached(&ProtoRoundBuilder::new(), &cache, &Params::new(4, 1, 5, 0)).is_err());
    }
}
