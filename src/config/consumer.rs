//! Consumer manifest (`.neurons`) — §3 `ConsumerManifest`, §4.1

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use super::section::{format_section, parse_bool, parse_sections};
use crate::error::ConfigError;
use crate::validation::path::{validate_path_relative, validate_path_safe};

/// `[BRAIN:<id>]` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrainEntry {
	pub id: String,
	pub remote: String,
	pub branch: String,
}

/// `CONFLICT_STRATEGY` policy values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictStrategy {
	PreferBrain,
	PreferLocal,
	Prompt,
}

impl Default for ConflictStrategy {
	fn default() -> Self {
		ConflictStrategy::Prompt
	}
}

impl FromStr for ConflictStrategy {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"prefer_brain" => Ok(Self::PreferBrain),
			"prefer_local" => Ok(Self::PreferLocal),
			"prompt" => Ok(Self::Prompt),
			other => Err(format!(
				"unknown conflict strategy: {}. Valid options: prefer_brain, prefer_local, prompt",
				other
			)),
		}
	}
}

impl fmt::Display for ConflictStrategy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::PreferBrain => write!(f, "prefer_brain"),
			Self::PreferLocal => write!(f, "prefer_local"),
			Self::Prompt => write!(f, "prompt"),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncPolicy {
	pub auto_sync_on_pull: bool,
	pub conflict_strategy: ConflictStrategy,
	pub allow_local_modifications: bool,
	pub allow_push_to_brain: bool,
}

impl Default for SyncPolicy {
	fn default() -> Self {
		SyncPolicy {
			auto_sync_on_pull: true,
			conflict_strategy: ConflictStrategy::default(),
			allow_local_modifications: true,
			allow_push_to_brain: false,
		}
	}
}

/// One `[MAP]` entry, preserving the user-chosen section key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntry {
	pub key: String,
	pub brain_id: String,
	pub source: String,
	pub destination: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingKind {
	File,
	Dir,
}

/// Resolved runtime mapping (§3 `Mapping`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
	pub brain_id: String,
	pub source: String,
	pub destination: String,
	pub kind: MappingKind,
}

#[derive(Debug, Clone)]
pub struct ConsumerManifest {
	/// Ordered by first introduction
	pub brains: Vec<BrainEntry>,
	pub sync_policy: SyncPolicy,
	/// Ordered as they appear in `[MAP]`
	pub map: Vec<MapEntry>,
}

impl ConsumerManifest {
	pub fn new() -> Self {
		ConsumerManifest { brains: Vec::new(), sync_policy: SyncPolicy::default(), map: Vec::new() }
	}

	pub fn brain(&self, id: &str) -> Option<&BrainEntry> {
		self.brains.iter().find(|b| b.id == id)
	}

	/// Resolve `[MAP]` entries into validated runtime `Mapping`s (§3 invariants).
	pub fn mappings(&self) -> Result<Vec<Mapping>, ConfigError> {
		let mut result = Vec::with_capacity(self.map.len());
		let mut seen_destinations = std::collections::HashSet::new();

		for entry in &self.map {
			if self.brain(&entry.brain_id).is_none() {
				return Err(ConfigError::unknown_brain(
					format!("[MAP].{}", entry.key),
					format!("brain_id '{}' not present in [BRAINS]", entry.brain_id),
				));
			}

			if !seen_destinations.insert(entry.destination.clone()) {
				return Err(ConfigError::duplicate_key(
					format!("[MAP].{}", entry.key),
					format!("destination '{}' is mapped more than once", entry.destination),
				));
			}

			let source_is_dir = entry.source.ends_with('/');
			let destination_is_dir = entry.destination.ends_with('/');
			if source_is_dir != destination_is_dir {
				return Err(ConfigError::bad_syntax(
					format!("[MAP].{}", entry.key),
					"source and destination trailing slash must agree",
				));
			}

			let dest_path = std::path::Path::new(entry.destination.trim_end_matches('/'));
			validate_path_relative(dest_path)
				.map_err(|e| ConfigError::bad_syntax(format!("[MAP].{}", entry.key), e.to_string()))?;
			validate_path_safe(dest_path)
				.map_err(|e| ConfigError::bad_syntax(format!("[MAP].{}", entry.key), e.to_string()))?;

			let kind = if destination_is_dir { MappingKind::Dir } else { MappingKind::File };
			result.push(Mapping {
				brain_id: entry.brain_id.clone(),
				source: entry.source.clone(),
				destination: entry.destination.clone(),
				kind,
			});
		}

		Ok(result)
	}

	pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
		std::fs::write(path, self.serialize())?;
		Ok(())
	}

	pub fn serialize(&self) -> String {
		let mut out = String::new();

		for brain in &self.brains {
			out.push_str(&format_section(
				&format!("BRAIN:{}", brain.id),
				&[("REMOTE".to_string(), brain.remote.clone()), ("BRANCH".to_string(), brain.branch.clone())],
			));
			out.push('\n');
		}

		out.push_str(&format_section(
			"SYNC_POLICY",
			&[
				("AUTO_SYNC_ON_PULL".to_string(), self.sync_policy.auto_sync_on_pull.to_string()),
				("CONFLICT_STRATEGY".to_string(), self.sync_policy.conflict_strategy.to_string()),
				(
					"ALLOW_LOCAL_MODIFICATIONS".to_string(),
					self.sync_policy.allow_local_modifications.to_string(),
				),
				("ALLOW_PUSH_TO_BRAIN".to_string(), self.sync_policy.allow_push_to_brain.to_string()),
			],
		));
		out.push('\n');

		let map_entries: Vec<(String, String)> = self
			.map
			.iter()
			.map(|m| (m.key.clone(), format_mapping_string(&m.brain_id, &m.source, &m.destination)))
			.collect();
		out.push_str(&format_section("MAP", &map_entries));

		if !out.ends_with('\n') {
			out.push('\n');
		}
		out
	}
}

impl Default for ConsumerManifest {
	fn default() -> Self {
		Self::new()
	}
}

/// Parse `brain_id "::" source "::" destination` (§6 mapping string grammar).
pub fn parse_mapping_string(s: &str) -> Result<(String, String, String), ConfigError> {
	let parts: Vec<&str> = s.splitn(3, "::").collect();
	if parts.len() != 3 {
		return Err(ConfigError::bad_syntax(
			"<mapping string>",
			format!("expected 'brain_id::source::destination', got: {}", s),
		));
	}
	let brain_id = parts[0].to_string();
	if brain_id.is_empty() || !brain_id.chars().all(|c| c.is_ascii_alphanumeric() || "._-".contains(c)) {
		return Err(ConfigError::bad_syntax(
			"<mapping string>",
			format!("invalid brain_id: {}", brain_id),
		));
	}
	Ok((brain_id, parts[1].to_string(), parts[2].to_string()))
}

fn format_mapping_string(brain_id: &str, source: &str, destination: &str) -> String {
	format!("{}::{}::{}", brain_id, source, destination)
}

pub fn load_consumer(path: &Path) -> Result<ConsumerManifest, ConfigError> {
	let text = std::fs::read_to_string(path)?;
	parse_consumer(&text)
}

pub fn parse_consumer(text: &str) -> Result<ConsumerManifest, ConfigError> {
	let sections = parse_sections(text)?;

	let mut brains = Vec::new();
	for section in sections.iter().filter(|s| s.header.starts_with("BRAIN:")) {
		let id = section.header.trim_start_matches("BRAIN:").to_string();
		let remote = section
			.get("REMOTE")
			.ok_or_else(|| {
				ConfigError::missing_field(format!("[{}]", section.header), "missing required REMOTE field")
			})?
			.to_string();
		let branch = section.get("BRANCH").unwrap_or("main").to_string();
		brains.push(BrainEntry { id, remote, branch });
	}

	if brains.is_empty() {
		return Err(ConfigError::missing_field("[BRAIN:*]", "at least one [BRAIN:<id>] entry is required"));
	}

	let sync_policy = if let Some(section) = sections.iter().find(|s| s.header == "SYNC_POLICY") {
		SyncPolicy {
			auto_sync_on_pull: match section.get("AUTO_SYNC_ON_PULL") {
				Some(v) => parse_bool("[SYNC_POLICY].AUTO_SYNC_ON_PULL", v)?,
				None => true,
			},
			conflict_strategy: match section.get("CONFLICT_STRATEGY") {
				Some(v) => ConflictStrategy::from_str(v)
					.map_err(|e| ConfigError::bad_syntax("[SYNC_POLICY].CONFLICT_STRATEGY", e))?,
				None => ConflictStrategy::default(),
			},
			allow_local_modifications: match section.get("ALLOW_LOCAL_MODIFICATIONS") {
				Some(v) => parse_bool("[SYNC_POLICY].ALLOW_LOCAL_MODIFICATIONS", v)?,
				None => true,
			},
			allow_push_to_brain: match section.get("ALLOW_PUSH_TO_BRAIN") {
				Some(v) => parse_bool("[SYNC_POLICY].ALLOW_PUSH_TO_BRAIN", v)?,
				None => false,
			},
		}
	} else {
		SyncPolicy::default()
	};

	let map_section = sections
		.iter()
		.find(|s| s.header == "MAP")
		.ok_or_else(|| ConfigError::missing_field("[MAP]", "Missing required [MAP] section"))?;

	let mut map = Vec::new();
	for (key, value) in &map_section.entries {
		let (brain_id, source, destination) = parse_mapping_string(value)
			.map_err(|e| ConfigError::bad_syntax(format!("[MAP].{}", key), e.message))?;
		map.push(MapEntry { key: key.clone(), brain_id, source, destination });
	}

	Ok(ConsumerManifest { brains, sync_policy, map })
}


// vim: ts=4
