//! Learned-depth cache: best known distance-to-goal for states that have
//! appeared on a discovered solution path, persisted as JSON between runs.

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::board::StateKey;
use crate::constants::CACHE_FORMAT_VERSION;
use crate::error::{Result, SolverError};

static SHARED: OnceCell<Arc<LearnedDepthCache>> = OnceCell::new();

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    depths: HashMap<u64, u32>,
}

/// Thread-safe `StateKey -> depth` map. Entries only ever decrease.
#[derive(Debug, Default)]
pub struct LearnedDepthCache {
    depths: RwLock<HashMap<u64, u32>>,
    origin: Option<PathBuf>,
}

impl LearnedDepthCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the cache at `path`. A missing, unreadable or malformed file
    /// yields an empty cache; the problem is logged.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(cache) => cache,
            Err(e) => {
                warn!(error = %e, "starting with an empty learned-depth cache");
                Self {
                    depths: RwLock::default(),
                    origin: Some(path.to_path_buf()),
                }
            }
        }
    }

    pub fn try_load(path: &Path) -> Result<Self> {
        let depths = match read_file(path)? {
            Some(file) => file.depths,
            None => HashMap::new(),
        };
        debug!(path = %path.display(), entries = depths.len(), "loaded learned-depth cache");
        Ok(Self {
            depths: RwLock::new(depths),
            origin: Some(path.to_path_buf()),
        })
    }

    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }

    pub fn get(&self, key: StateKey) -> Option<u32> {
        self.depths
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key.0)
            .copied()
    }

    /// Records `depth` for `key` unless a smaller depth is already known.
    /// Returns true if the entry changed.
    pub fn record(&self, key: StateKey, depth: u32) -> bool {
        let mut map = self.depths.write().unwrap_or_else(PoisonError::into_inner);
        improve(&mut map, key.0, depth)
    }

    /// Applies a whole solution path under one lock.
    pub fn merge_path(&self, entries: &[(StateKey, u32)]) -> usize {
        let mut map = self.depths.write().unwrap_or_else(PoisonError::into_inner);
        entries
            .iter()
            .filter(|&&(key, depth)| improve(&mut map, key.0, depth))
            .count()
    }

    pub fn len(&self) -> usize {
        self.depths
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes the cache to `path`, first folding in whatever is already on
    /// disk so concurrent writers only ever lose improvements.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut merged = match read_file(path) {
            Ok(Some(file)) => file.depths,
            Ok(None) => HashMap::new(),
            Err(e) => {
                warn!(error = %e, "ignoring unreadable cache file while saving");
                HashMap::new()
            }
        };
        {
            let map = self.depths.read().unwrap_or_else(PoisonError::into_inner);
            for (&k, &d) in map.iter() {
                improve(&mut merged, k, d);
            }
        }
        let file = CacheFile {
            version: CACHE_FORMAT_VERSION,
            depths: merged,
        };
        write_atomic(path, &file)?;
        info!(path = %path.display(), entries = file.depths.len(), "saved learned-depth cache");
        Ok(())
    }

    /// Saves back to the file this cache was loaded from, if any.
    pub fn save_data(&self) -> Result<()> {
        match &self.origin {
            Some(path) => self.save(path),
            None => Ok(()),
        }
    }
}

fn improve(map: &mut HashMap<u64, u32>, key: u64, depth: u32) -> bool {
    match map.get_mut(&key) {
        Some(existing) if *existing <= depth => false,
        Some(existing) => {
            *existing = depth;
            true
        }
        None => {
            map.insert(key, depth);
            true
        }
    }
}

fn read_file(path: &Path) -> Result<Option<CacheFile>> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(SolverError::CacheIo {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_slice(&data)
        .map(Some)
        .map_err(|source| SolverError::CacheFormat {
            path: path.to_path_buf(),
            source,
        })
}

fn write_atomic(path: &Path, file: &CacheFile) -> Result<()> {
    let io_err = |source| SolverError::CacheIo {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(io_err)?;
    }
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec(file).map_err(|source| SolverError::CacheFormat {
        path: path.to_path_buf(),
        source,
    })?;
    {
        let mut f = fs::File::create(&tmp).map_err(io_err)?;
        f.write_all(&data).map_err(io_err)?;
        f.sync_all().ok();
    }
    fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}

/// Installs the process-wide cache, loading it from `path` on first call.
/// Later calls return the already installed instance.
pub fn install_shared(path: &Path) -> Arc<LearnedDepthCache> {
    SHARED
        .get_or_init(|| Arc::new(LearnedDepthCache::load(path)))
        .clone()
}

/// The process-wide cache; empty and unpersisted if never installed.
pub fn shared() -> Arc<LearnedDepthCache> {
    SHARED
        .get_or_init(|| Arc::new(LearnedDepthCache::new()))
        .clone()
}

/// Saves the process-wide cache back to where it was loaded from.
pub fn save_data() -> Result<()> {
    match SHARED.get() {
        Some(cache) => cache.save_data(),
        None => Ok(()),
    }
}
