use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};
use serde_json::Value;

use crate::database::Database;
use crate::err::{Result, RpgDataError};
use crate::event::{Event, EventInterpreter, EventResult, MapContext};
use crate::loader::{DataLoader, Engine};
use crate::utils::ValueExt;

/// How a project session is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSettings {
    engine: Engine,
    archive: Option<PathBuf>,
    detect_archive: bool,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        ProjectSettings {
            engine: Engine::Mv,
            archive: None,
            detect_archive: true,
        }
    }
}

impl ProjectSettings {
    pub fn new() -> Self {
        ProjectSettings::default()
    }

    pub fn engine(mut self, engine: Engine) -> Self {
        self.engine = engine;
        self
    }

    /// Uses this archive instead of looking for the engine's default archive names.
    pub fn archive(mut self, archive: Option<impl Into<PathBuf>>) -> Self {
        self.archive = archive.map(Into::into);
        self
    }

    /// Whether to look for `Game.rgss3a`/`Game.rgss2a`/`Game.rgssad` next to the data directory.
    pub fn detect_archive(mut self, detect_archive: bool) -> Self {
        self.detect_archive = detect_archive;
        self
    }

    pub fn get_engine(&self) -> Engine {
        self.engine
    }

    pub fn get_archive(&self) -> Option<&Path> {
        self.archive.as_deref()
    }

    pub fn should_detect_archive(&self) -> bool {
        self.detect_archive
    }
}

/// The archive to open for a legacy project: the explicit one, else the engine's default names
/// in the data directory's parent and then the data directory itself.
pub fn resolve_archive_path(data_dir: &Path, settings: &ProjectSettings) -> Option<PathBuf> {
    if let Some(explicit) = settings.get_archive() {
        return Some(explicit.to_path_buf());
    }
    if !settings.get_engine().is_legacy() || !settings.should_detect_archive() {
        return None;
    }

    let roots = [data_dir.parent(), Some(data_dir)];
    settings
        .get_engine()
        .archive_names()
        .iter()
        .flat_map(|name| roots.iter().flatten().map(move |root| root.join(name)))
        .find(|candidate| candidate.is_file())
}

/// One opened project: its loader, database and the interpreters borrowing them.
#[derive(Debug)]
pub struct ProjectSession {
    loader: DataLoader,
    database: Database,
}

impl ProjectSession {
    /// Opens the project whose data files live in `data_dir`.
    ///
    /// Fails when the archive is unusable or when `MapInfos` cannot be found anywhere; every
    /// other table is optional.
    pub fn open(data_dir: impl AsRef<Path>, settings: &ProjectSettings) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let engine = settings.get_engine();

        let loader = match resolve_archive_path(data_dir, settings) {
            Some(archive) => {
                debug!("using archive `{}`", archive.display());
                DataLoader::with_archive_path(data_dir, engine, &archive)?
            }
            None => DataLoader::new(data_dir, engine),
        };

        if !loader.exists("MapInfos.json") {
            return Err(RpgDataError::game_data_invalid(format!(
                "no MapInfos table in `{}`",
                data_dir.display()
            )));
        }

        let database = Database::load(&loader);
        info!(
            "opened {} project at `{}`",
            engine,
            data_dir.display()
        );
        Ok(ProjectSession { loader, database })
    }

    pub fn loader(&self) -> &DataLoader {
        &self.loader
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn engine(&self) -> Engine {
        self.loader.engine()
    }

    /// A fresh interpreter without map context.
    pub fn interpreter(&self) -> EventInterpreter<'_> {
        EventInterpreter::new(&self.database)
    }

    pub fn map_file_name(map_id: i64) -> String {
        format!("Map{map_id:03}.json")
    }

    pub fn load_map(&self, map_id: i64) -> Option<Arc<Value>> {
        self.loader.load(&Self::map_file_name(map_id))
    }

    pub fn map_context(&self, map_id: i64, map: &Value) -> MapContext {
        self.interpreter()
            .map_context(map_id, &self.database.map_name(map_id), map)
    }

    /// Every event of a map, interpreted with that map as context. `None` if the map is missing.
    pub fn interpret_map(&self, map_id: i64) -> Option<Vec<EventResult>> {
        let map = self.load_map(map_id)?;
        let interpreter = self.interpreter();
        let ctx = self.map_context(map_id, &map);

        Some(
            map.list("events")
                .iter()
                .filter_map(Event::from_value)
                .map(|event| interpreter.interpret_event_in(&event, Some(&ctx)))
                .collect(),
        )
    }
}
