//! Decoding of event instruction streams into readable, cross-referenced lines.

mod interpreter;
mod model;
mod opcode;
mod params;
mod refs;
mod translate;

pub use self::interpreter::{
    CommandLine, EventInterpreter, EventKind, EventResult, LineClass, PageResult, PageVisual,
    classify_event, is_story_page, trigger_name,
};
pub use self::model::{Command, Conditions, Event, Page};
pub use self::opcode::Opcode;
pub use self::params::Params;
pub use self::refs::{
    CrossRef, Encounter, EncounterRef, ItemRef, MapContext, RefKind, TransferRef, TroopEnemy,
    TroopRef,
};
