//! Requirements Merger (§4.4) — line-oriented parser/merger for
//! `name[==version]`-style dependency manifests.

use std::collections::HashMap;

/// One line of a requirements file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
	/// A dependency line: `name`, `name==version`, or `name>=version` etc.
	/// `version` is only populated for an exact `==` pin, matching the
	/// reference distillation's behavior for other comparators.
	Requirement { name: String, version: Option<String> },
	/// A comment (`#...`), blank line, or any other line preserved verbatim.
	Other(String),
}

/// Parsed, ordered view of a requirements file.
#[derive(Debug, Clone, Default)]
pub struct RequirementsFile {
	pub lines: Vec<Line>,
}

impl RequirementsFile {
	/// Case-insensitive lookup of a requirement's version (empty string if unpinned).
	pub fn get(&self, name: &str) -> Option<&str> {
		let needle = name.to_lowercase();
		self.lines.iter().find_map(|line| match line {
			Line::Requirement { name, version } if name.to_lowercase() == needle => {
				Some(version.as_deref().unwrap_or(""))
			}
			_ => None,
		})
	}
}

/// Parse the name/version out of a single (comment-stripped, trimmed) spec.
fn split_name_version(spec: &str) -> (String, Option<String>) {
	let boundary =
		spec.find(|c: char| c == '=' || c == '<' || c == '>' || c == '!' || c == '~' || c.is_whitespace());

	let (name, remainder) = match boundary {
		Some(idx) => (spec[..idx].trim().to_string(), spec[idx..].trim()),
		None => (spec.trim().to_string(), ""),
	};

	let version = remainder.strip_prefix("==").map(|v| v.trim().to_string());
	(name, version)
}

/// `parse(text) → RequirementsFile` (§4.4)
pub fn parse(text: &str) -> RequirementsFile {
	let mut lines = Vec::new();

	for raw in text.lines() {
		let trimmed = raw.trim();
		let spec = match trimmed.find('#') {
			Some(idx) => trimmed[..idx].trim(),
			None => trimmed,
		};

		if spec.is_empty() {
			lines.push(Line::Other(raw.to_string()));
			continue;
		}

		let (name, version) = split_name_version(spec);
		lines.push(Line::Requirement { name, version });
	}

	RequirementsFile { lines }
}

fn render_requirement(name: &str, version: &Option<String>) -> String {
	match version {
		Some(v) => format!("{}=={}", name, v),
		None => name.to_string(),
	}
}

/// `merge(consumer, neuron) → text` (§4.4)
///
/// Union of names; on a shared name the neuron's version wins, including
/// when the neuron is unpinned and the consumer was pinned. Consumer line
/// order (and its comments/blank lines) is preserved for names it already
/// had; new names are appended in the neuron's relative order. Trailing
/// newline is normalized to exactly one.
pub fn merge(consumer: &str, neuron: &str) -> String {
	let consumer_file = parse(consumer);
	let neuron_file = parse(neuron);

	let mut neuron_versions: HashMap<String, Option<String>> = HashMap::new();
	let mut neuron_order: Vec<String> = Vec::new();
	for line in &neuron_file.lines {
		if let Line::Requirement { name, version } = line {
			let key = name.to_lowercase();
			if !neuron_versions.contains_key(&key) {
				neuron_order.push(name.clone());
			}
			neuron_versions.insert(key, version.clone());
		}
	}

	let mut consumed: std::collections::HashSet<String> = std::collections::HashSet::new();
	let mut out_lines: Vec<String> = Vec::new();

	for line in &consumer_file.lines {
		match line {
			Line::Other(raw) => out_lines.push(raw.clone()),
			Line::Requirement { name, version } => {
				let key = name.to_lowercase();
				if let Some(neuron_version) = neuron_versions.get(&key) {
					out_lines.push(render_requirement(name, neuron_version));
					consumed.insert(key);
				} else {
					out_lines.push(render_requirement(name, version));
				}
			}
		}
	}

	for name in &neuron_order {
		let key = name.to_lowercase();
		if !consumed.contains(&key) {
			let version = neuron_versions.get(&key).cloned().unwrap_or(None);
			out_lines.push(render_requirement(name, &version));
		}
	}

	let mut result = out_lines.join("\n");
	result.push('\n');
	result
}


// vim: ts=4
