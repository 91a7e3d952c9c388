//! Config Store (§4.1) — loads/saves the brain manifest (`.brain`) and the
//! consumer manifest (`.neurons`).
//!
//! Neither format is TOML/JSON5 despite those crates being available
//! elsewhere in this codebase: both require exact preservation of
//! user-chosen `[MAP]` keys and entry ordering across a load/save round
//! trip, which a generic deserializer would not guarantee.

mod section;

pub mod brain;
pub mod consumer;

pub use brain::{load_brain, BrainManifest, ExportPermission};
pub use consumer::{
	load_consumer, parse_mapping_string, BrainEntry, ConflictStrategy, ConsumerManifest, MapEntry,
	Mapping, MappingKind, SyncPolicy,
};

// vim: ts=4
