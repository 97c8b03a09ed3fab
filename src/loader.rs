//! Per-project access to data tables by logical file name (`Items.json`, `Map003.json`, ...).

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use log::{debug, warn};
use serde_json::Value;

use crate::adapter;
use crate::archive::RgssArchive;
use crate::err::{ArchiveError, Result, RpgDataError};
use crate::marshal;
use crate::resource::strip_bom;
use crate::utils::FastMap;

/// Engine generation of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Engine {
    /// MV/MZ: plain JSON files.
    #[default]
    Mv,
    /// VX: `.rvdata` files, optionally inside `Game.rgss2a`/`Game.rgssad`.
    Vx,
    /// VX Ace: `.rvdata2` files, optionally inside `Game.rgss3a`.
    VxAce,
}

impl Engine {
    /// Parses an engine name, falling back to [`Engine::Mv`] for anything unrecognized.
    pub fn from_name_lenient(name: &str) -> Self {
        name.parse().unwrap_or_default()
    }

    pub fn is_legacy(self) -> bool {
        !matches!(self, Engine::Mv)
    }

    /// Archive file names this engine ships with, in lookup order.
    pub fn archive_names(self) -> &'static [&'static str] {
        match self {
            Engine::Mv => &[],
            Engine::Vx => &["Game.rgss2a", "Game.rgssad"],
            Engine::VxAce => &["Game.rgss3a"],
        }
    }
}

impl FromStr for Engine {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mv" | "mz" => Ok(Engine::Mv),
            "vx" => Ok(Engine::Vx),
            "vxace" | "vx_ace" | "ace" => Ok(Engine::VxAce),
            other => Err(format!("unknown engine `{other}`")),
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Engine::Mv => "mv",
            Engine::Vx => "vx",
            Engine::VxAce => "vxace",
        })
    }
}

/// Where a table's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    Disk(PathBuf),
    Archive(String),
}

/// Locates, decodes and memoizes data tables.
///
/// The cache maps the lowercased logical name to the decoded value, or to `None` when the
/// file is missing or failed to decode, so a known-bad file is not retried.
#[derive(Debug)]
pub struct DataLoader {
    data_dir: PathBuf,
    engine: Engine,
    archive: Option<RgssArchive>,
    cache: Mutex<FastMap<String, Option<Arc<Value>>>>,
}

impl DataLoader {
    pub fn new(data_dir: impl Into<PathBuf>, engine: Engine) -> Self {
        DataLoader {
            data_dir: data_dir.into(),
            engine,
            archive: None,
            cache: Mutex::new(FastMap::default()),
        }
    }

    /// Opens `archive_path` as the fallback source for legacy engines.
    pub fn with_archive_path(
        data_dir: impl Into<PathBuf>,
        engine: Engine,
        archive_path: impl AsRef<Path>,
    ) -> std::result::Result<Self, ArchiveError> {
        let archive = RgssArchive::open(archive_path)?;
        Ok(Self::new(data_dir, engine).with_archive(archive))
    }

    /// Uses `archive` as the fallback source. Ignored for MV projects.
    pub fn with_archive(mut self, archive: RgssArchive) -> Self {
        if self.engine.is_legacy() {
            self.archive = Some(archive);
        } else {
            debug!("ignoring archive for an MV project");
        }
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn engine(&self) -> Engine {
        self.engine
    }

    pub fn archive(&self) -> Option<&RgssArchive> {
        self.archive.as_ref()
    }

    /// File names to try for a logical name, e.g. `Items.json` → `Items.rvdata2`, `Items.rvdata`.
    fn legacy_candidates(name: &str) -> Vec<String> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".rvdata2") || lower.ends_with(".rvdata") {
            return vec![name.to_owned()];
        }

        let base = if lower.ends_with(".json") {
            &name[..name.len() - ".json".len()]
        } else {
            name
        };
        vec![format!("{base}.rvdata2"), format!("{base}.rvdata")]
    }

    fn locate(&self, name: &str) -> Option<Source> {
        if !self.engine.is_legacy() {
            let path = self.data_dir.join(name);
            return path.is_file().then_some(Source::Disk(path));
        }

        let candidates = Self::legacy_candidates(name);
        if let Some(path) = candidates
            .iter()
            .map(|c| self.data_dir.join(c))
            .find(|p| p.is_file())
        {
            return Some(Source::Disk(path));
        }

        let archive = self.archive.as_ref()?;
        candidates
            .iter()
            .flat_map(|c| [format!("Data\\{c}"), format!("data\\{c}"), c.clone()])
            .find(|entry| archive.has_entry(entry))
            .map(Source::Archive)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.locate(name).is_some()
    }

    /// Loads a table, `None` when it is missing or cannot be decoded.
    pub fn load(&self, name: &str) -> Option<Arc<Value>> {
        let key = name.to_lowercase();
        if let Some(cached) = self.cached(&key) {
            return cached;
        }

        let loaded = match self.try_load(name) {
            Ok(value) => value.map(Arc::new),
            Err(e) => {
                warn!("failed to load `{}`: {}", name, e);
                None
            }
        };

        // Decoding is deterministic, so a racing caller stores an equal value.
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, loaded.clone());
        }
        loaded
    }

    fn cached(&self, key: &str) -> Option<Option<Arc<Value>>> {
        self.cache.lock().ok()?.get(key).cloned()
    }

    /// Uncached load that reports why a present file could not be decoded.
    pub fn try_load(&self, name: &str) -> Result<Option<Value>> {
        let Some(source) = self.locate(name) else {
            debug!("`{}` not found", name);
            return Ok(None);
        };
        debug!("loading `{}` from {:?}", name, source);

        let bytes = match &source {
            Source::Disk(path) => fs::read(path).map_err(|e| RpgDataError::FailedToRead {
                path: path.clone(),
                source: e,
            })?,
            Source::Archive(entry) => match &self.archive {
                Some(archive) => archive.read_entry(entry)?,
                None => return Ok(None),
            },
        };

        if !self.engine.is_legacy() {
            let value = serde_json::from_slice(strip_bom(&bytes)).map_err(|e| RpgDataError::Json {
                path: self.data_dir.join(name),
                source: e,
            })?;
            return Ok(Some(value));
        }

        let node = marshal::load(&bytes).map_err(|e| RpgDataError::Deserialization {
            name: name.to_owned(),
            source: e,
        })?;
        Ok(Some(adapter::adapt(name, &node)))
    }

    /// Forgets every memoized table.
    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensure_env_logger_initialized;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_engine_names() {
        assert_eq!(Engine::from_name_lenient("VXAce"), Engine::VxAce);
        assert_eq!(Engine::from_name_lenient("vx"), Engine::Vx);
        assert_eq!(Engine::from_name_lenient("2003"), Engine::Mv);
        assert_eq!(Engine::VxAce.to_string(), "vxace");
    }

    #[test]
    fn test_legacy_candidates() {
        assert_eq!(
            DataLoader::legacy_candidates("Items.json"),
            vec!["Items.rvdata2", "Items.rvdata"]
        );
        assert_eq!(
            DataLoader::legacy_candidates("Map001.rvdata"),
            vec!["Map001.rvdata"]
        );
        assert_eq!(
            DataLoader::legacy_candidates("Troops"),
            vec!["Troops.rvdata2", "Troops.rvdata"]
        );
    }

    #[test]
    fn test_mv_loads_json_and_caches_failures() {
        ensure_env_logger_initialized();
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Items.json"), "\u{feff}[null, {\"id\": 1}]").unwrap();
        fs::write(dir.path().join("Broken.json"), "{not json").unwrap();

        let loader = DataLoader::new(dir.path(), Engine::Mv);
        assert_eq!(
            loader.load("Items.json").as_deref(),
            Some(&json!([null, {"id": 1}]))
        );
        assert!(loader.exists("Broken.json"));
        assert!(loader.load("Broken.json").is_none());
        assert!(loader.try_load("Broken.json").is_err());
        assert!(loader.load("Missing.json").is_none());

        // Served from the cache even after the file changes.
        fs::write(dir.path().join("Broken.json"), "[]").unwrap();
        assert!(loader.load("broken.JSON").is_none());
        loader.clear_cache();
        assert_eq!(loader.load("Broken.json").as_deref(), Some(&json!([])));
    }

    #[test]
    fn test_legacy_prefers_disk_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("MapInfos.rvdata"), b"\x04\x08[\x00").unwrap();

        let loader = DataLoader::new(dir.path(), Engine::Vx);
        assert!(loader.exists("MapInfos.json"));
        assert_eq!(loader.load("MapInfos.json").as_deref(), Some(&json!([])));
    }
}
