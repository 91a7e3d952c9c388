//! Brain manifest (`.brain`) — §3 `BrainManifest`, §4.1

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use super::section::{format_list, format_section, parse_bool, parse_list, parse_sections, RawSection};
use crate::error::ConfigError;

/// Export permission for a path pattern in `[EXPORT]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportPermission {
	ReadOnly,
	ReadWrite,
}

impl FromStr for ExportPermission {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"readonly" => Ok(Self::ReadOnly),
			"readwrite" => Ok(Self::ReadWrite),
			other => Err(format!("unknown export permission: {}. Valid options: readonly, readwrite", other)),
		}
	}
}

impl fmt::Display for ExportPermission {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::ReadOnly => write!(f, "readonly"),
			Self::ReadWrite => write!(f, "readwrite"),
		}
	}
}

/// Parsed `.brain` manifest (§3)
#[derive(Debug, Clone)]
pub struct BrainManifest {
	pub id: String,
	pub description: Option<String>,
	/// Ordered pattern -> permission
	pub export: Vec<(String, ExportPermission)>,
	/// Ordered principal -> patterns
	pub access: Vec<(String, Vec<String>)>,
	/// Raw, ordered key -> value bag (REQUIRE_REVIEW, PROTECTED_PATHS, NOTIFY_LIST, ...)
	pub update_policy: Vec<(String, String)>,
}

impl BrainManifest {
	pub fn new(id: impl Into<String>) -> Self {
		BrainManifest {
			id: id.into(),
			description: None,
			export: Vec::new(),
			access: Vec::new(),
			update_policy: Vec::new(),
		}
	}

	/// `UPDATE_POLICY.REQUIRE_REVIEW`, default false when absent.
	pub fn require_review(&self) -> Result<bool, ConfigError> {
		match self.update_policy.iter().find(|(k, _)| k == "REQUIRE_REVIEW") {
			Some((_, v)) => parse_bool("UPDATE_POLICY.REQUIRE_REVIEW", v),
			None => Ok(false),
		}
	}

	/// `UPDATE_POLICY.PROTECTED_PATHS`, default empty when absent.
	pub fn protected_paths(&self) -> Vec<String> {
		self.update_policy
			.iter()
			.find(|(k, _)| k == "PROTECTED_PATHS")
			.map(|(_, v)| parse_list(v))
			.unwrap_or_default()
	}

	/// Look up the export permission for an exact pattern.
	pub fn export_permission(&self, pattern: &str) -> Option<ExportPermission> {
		self.export.iter().find(|(p, _)| p == pattern).map(|(_, perm)| *perm)
	}

	pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
		std::fs::write(path, self.serialize())?;
		Ok(())
	}

	pub fn serialize(&self) -> String {
		let mut out = String::new();

		let mut brain_entries = vec![("ID".to_string(), self.id.clone())];
		if let Some(desc) = &self.description {
			brain_entries.push(("DESCRIPTION".to_string(), desc.clone()));
		}
		out.push_str(&format_section("BRAIN", &brain_entries));
		out.push('\n');

		let export_entries: Vec<(String, String)> =
			self.export.iter().map(|(p, perm)| (p.clone(), perm.to_string())).collect();
		out.push_str(&format_section("EXPORT", &export_entries));

		if !self.access.is_empty() {
			out.push('\n');
			let access_entries: Vec<(String, String)> =
				self.access.iter().map(|(principal, patterns)| (principal.clone(), format_list(patterns))).collect();
			out.push_str(&format_section("ACCESS", &access_entries));
		}

		if !self.update_policy.is_empty() {
			out.push('\n');
			out.push_str(&format_section("UPDATE_POLICY", &self.update_policy));
		}

		if !out.ends_with('\n') {
			out.push('\n');
		}
		out
	}
}

pub fn load_brain(path: &Path) -> Result<BrainManifest, ConfigError> {
	let text = std::fs::read_to_string(path)?;
	parse_brain(&text)
}

pub fn parse_brain(text: &str) -> Result<BrainManifest, ConfigError> {
	let sections = parse_sections(text)?;

	let brain_section: &RawSection = sections
		.iter()
		.find(|s| s.header == "BRAIN")
		.ok_or_else(|| ConfigError::missing_field("[BRAIN]", "missing required [BRAIN] section"))?;

	let id = brain_section
		.get("ID")
		.filter(|v| !v.is_empty())
		.ok_or_else(|| ConfigError::missing_field("[BRAIN].ID", "missing required ID field"))?
		.to_string();
	let description = brain_section.get("DESCRIPTION").map(|s| s.to_string());

	let export_section = sections
		.iter()
		.find(|s| s.header == "EXPORT")
		.ok_or_else(|| ConfigError::missing_field("[EXPORT]", "missing required [EXPORT] section"))?;

	if export_section.entries.is_empty() {
		return Err(ConfigError::missing_field("[EXPORT]", "at least one EXPORT entry is required"));
	}

	let mut export = Vec::new();
	for (pattern, value) in &export_section.entries {
		let perm = ExportPermission::from_str(value)
			.map_err(|e| ConfigError::bad_syntax(format!("[EXPORT].{}", pattern), e))?;
		export.push((pattern.clone(), perm));
	}

	let access = sections
		.iter()
		.find(|s| s.header == "ACCESS")
		.map(|s| s.entries.iter().map(|(k, v)| (k.clone(), parse_list(v))).collect())
		.unwrap_or_default();

	let update_policy = sections
		.iter()
		.find(|s| s.header == "UPDATE_POLICY")
		.map(|s| s.entries.clone())
		.unwrap_or_default();

	Ok(BrainManifest { id, description, export, access, update_policy })
}


// vim: ts=4
