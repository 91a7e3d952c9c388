//! Glob-style path matching for export permissions and protected paths (§4.2)

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fmt;

/// Error building a pattern set
#[derive(Debug)]
pub struct MatcherError {
	pub message: String,
}

impl fmt::Display for MatcherError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.message)
	}
}

impl std::error::Error for MatcherError {}

/// A compiled set of path patterns, anchored at the repository root.
///
/// A trailing `/` on a source pattern means "this directory and everything
/// beneath it" and is expanded into the directory's own `**` subtree; a bare
/// pattern with no trailing slash only matches files directly.
pub struct PathMatcher {
	set: GlobSet,
}

impl PathMatcher {
	pub fn new(patterns: &[String]) -> Result<Self, MatcherError> {
		let mut builder = GlobSetBuilder::new();
		for pattern in patterns {
			for expanded in expand_pattern(pattern) {
				let glob = Glob::new(&expanded)
					.map_err(|e| MatcherError { message: format!("{}: {}", pattern, e) })?;
				builder.add(glob);
			}
		}
		let set = builder
			.build()
			.map_err(|e| MatcherError { message: format!("failed to build pattern set: {}", e) })?;
		Ok(PathMatcher { set })
	}

	/// Does `path` match any compiled pattern?
	pub fn matches(&self, path: &str) -> bool {
		self.set.is_match(path)
	}
}

/// Expand a single raw pattern into the concrete glob(s) it stands for.
fn expand_pattern(pattern: &str) -> Vec<String> {
	if let Some(prefix) = pattern.strip_suffix('/') {
		vec![prefix.to_string(), format!("{}/**", prefix)]
	} else {
		vec![pattern.to_string()]
	}
}

/// Does `path` match any pattern, compiling a fresh matcher?
///
/// Convenience for one-off checks (e.g. a single `UPDATE_POLICY.PROTECTED_PATHS`
/// test) where building a `PathMatcher` once isn't worth the ceremony.
pub fn any_matches(patterns: &[String], path: &str) -> Result<bool, MatcherError> {
	Ok(PathMatcher::new(patterns)?.matches(path))
}


// vim: ts=4
