//! Reading RPG Maker game data (MV/MZ JSON, VX/VX Ace Marshal and RGSSAD archives) into one
//! canonical JSON shape, plus the derived views built on it: name tables, the map tree, readable
//! event listings, an item/enemy/skill catalog and Markdown map exports.
//!
//! ```no_run
//! use rpgdata::{Engine, ProjectSession, ProjectSettings};
//!
//! let settings = ProjectSettings::new().engine(Engine::VxAce);
//! let session = ProjectSession::open("game/Data", &settings).unwrap();
//! for node in session.database().map_tree() {
//!     println!("{} {}", node.id, node.name);
//! }
//! ```
#![deny(unused_must_use)]
#![forbid(unsafe_code)]

#[macro_use]
mod macros;

pub mod adapter;
pub mod archive;
pub mod database;
pub mod encyclopedia;
pub mod err;
pub mod event;
pub mod export;
pub mod external;
pub mod loader;
pub mod marshal;
pub mod passability;
pub mod resource;
pub mod session;
pub mod utils;

pub use crate::archive::{ArchiveEntry, ArchiveVersion, RgssArchive};
pub use crate::database::{Database, MapTreeNode};
pub use crate::encyclopedia::{Encyclopedia, build_encyclopedia};
pub use crate::err::{ArchiveError, ResourceError, Result, RpgDataError};
pub use crate::event::{EventInterpreter, EventResult, MapContext};
pub use crate::export::{MapExport, MapExporter};
pub use crate::external::{ExternalDecrypter, JavaDecrypter};
pub use crate::loader::{DataLoader, Engine};
pub use crate::passability::{PassageFlags, compute_passability, passable_cells};
pub use crate::resource::{PrepareReport, ResourceSettings, prepare_resources};
pub use crate::session::{ProjectSession, ProjectSettings};

// For tests, we only initialize logging once.
#[cfg(test)]
use std::sync::Once;

#[cfg(test)]
static LOGGER_INIT: Once = Once::new();

// Rust runs the tests concurrently, so unless we synchronize logging access
// it will crash when attempting to run `cargo test` with some logging facilities.
#[cfg(test)]
pub fn ensure_env_logger_initialized() {
    use std::io::Write;

    LOGGER_INIT.call_once(|| {
        let mut builder = env_logger::Builder::from_default_env();
        builder
            .format(|buf, record| writeln!(buf, "[{}] - {}", record.level(), record.args()))
            .init();
    });
}
