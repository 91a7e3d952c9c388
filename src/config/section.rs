//! Shared section/key-value parsing for the `.brain`/`.neurons` text format (§4.1)
//!
//! Both manifest formats are section-based key/value text: `[HEADER]` lines
//! introduce a section, `key = value` lines populate it, `#` starts a
//! comment, blank lines are ignored. This module only understands that much
//! structure; the higher-level `bool`/list/enum semantics live in
//! `brain.rs`/`consumer.rs`.

use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub struct RawSection {
	/// Text between the brackets, e.g. "BRAIN" or "BRAIN:core-lib"
	pub header: String,
	/// Key/value pairs in file order
	pub entries: Vec<(String, String)>,
}

impl RawSection {
	pub fn get(&self, key: &str) -> Option<&str> {
		self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
	}
}

pub fn parse_sections(text: &str) -> Result<Vec<RawSection>, ConfigError> {
	let mut sections = Vec::new();
	let mut current: Option<RawSection> = None;

	for (idx, raw_line) in text.lines().enumerate() {
		let lineno = idx + 1;
		let line = raw_line.trim();

		if line.is_empty() || line.starts_with('#') {
			continue;
		}

		if line.starts_with('[') {
			if !line.ends_with(']') {
				return Err(ConfigError::bad_syntax(
					lineno.to_string(),
					format!("malformed section header: {}", raw_line),
				));
			}
			if let Some(sec) = current.take() {
				sections.push(sec);
			}
			let header = line[1..line.len() - 1].to_string();
			current = Some(RawSection { header, entries: Vec::new() });
			continue;
		}

		let sec = current.as_mut().ok_or_else(|| {
			ConfigError::bad_syntax(lineno.to_string(), "entry found outside of any section")
		})?;

		let eq = line.find('=').ok_or_else(|| {
			ConfigError::bad_syntax(lineno.to_string(), format!("expected 'key = value', got: {}", raw_line))
		})?;
		let key = line[..eq].trim().to_string();
		let value = line[eq + 1..].trim().to_string();

		if key.is_empty() {
			return Err(ConfigError::bad_syntax(lineno.to_string(), "empty key"));
		}
		if sec.entries.iter().any(|(k, _)| k == &key) {
			return Err(ConfigError::duplicate_key(
				lineno.to_string(),
				format!("duplicate key '{}' in [{}]", key, sec.header),
			));
		}
		sec.entries.push((key, value));
	}

	if let Some(sec) = current.take() {
		sections.push(sec);
	}

	Ok(sections)
}

pub fn format_section(header: &str, entries: &[(String, String)]) -> String {
	let mut out = format!("[{}]\n", header);
	for (k, v) in entries {
		out.push_str(&format!("{} = {}\n", k, v));
	}
	out
}

pub fn parse_bool(location: &str, value: &str) -> Result<bool, ConfigError> {
	match value.to_lowercase().as_str() {
		"true" => Ok(true),
		"false" => Ok(false),
		other => Err(ConfigError::bad_syntax(
			location.to_string(),
			format!("expected true/false, got: {}", other),
		)),
	}
}

pub fn parse_list(value: &str) -> Vec<String> {
	if value.is_empty() {
		return Vec::new();
	}
	value.split(',').map(|s| s.trim().to_string()).collect()
}

pub fn format_list(items: &[String]) -> String {
	items.join(", ")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_basic_sections() {
		let text = "[BRAIN]\nID = my_brain\nDESCRIPTION = demo\n\n[EXPORT]\nfoo = readonly\n";
		let sections = parse_sections(text).unwrap();
		assert_eq!(sections.len(), 2);
		assert_eq!(sections[0].header, "BRAIN");
		assert_eq!(sections[0].get("ID"), Some("my_brain"));
		assert_eq!(sections[1].get("foo"), Some("readonly"));
	}

	#[test]
	fn test_comments_and_blank_lines_ignored() {
		let text = "# a comment\n[BRAIN]\n\nID = x\n";
		let sections = parse_sections(text).unwrap();
		assert_eq!(sections[0].get("ID"), Some("x"));
	}

	#[test]
	fn test_duplicate_key_errors() {
		let text = "[BRAIN]\nID = a\nID = b\n";
		let err = parse_sections(text).unwrap_err();
		assert_eq!(err.kind, crate::error::ConfigErrorKind::DuplicateKey);
	}

	#[test]
	fn test_entry_outside_section_errors() {
		let text = "ID = a\n";
		let err = parse_sections(text).unwrap_err();
		assert_eq!(err.kind, crate::error::ConfigErrorKind::BadSyntax);
	}

	#[test]
	fn test_repeatable_headers_preserved_separately() {
		let text = "[BRAIN:a]\nREMOTE = x\n[BRAIN:b]\nREMOTE = y\n";
		let sections = parse_sections(text).unwrap();
		assert_eq!(sections.len(), 2);
		assert_eq!(sections[0].header, "BRAIN:a");
		assert_eq!(sections[1].header, "BRAIN:b");
	}

	#[test]
	fn test_parse_list() {
		assert_eq!(parse_list("a, b ,c"), vec!["a", "b", "c"]);
		assert_eq!(parse_list(""), Vec::<String>::new());
	}
}

// vim: ts=4
