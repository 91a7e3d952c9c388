//! Conflict Resolver (§4.7) — brain-vs-local resolution for a single mapped
//! file, narrowed from N-way node resolution to the two-sided brain/local
//! case this system actually has.

use crate::config::ConflictStrategy;
use crate::logging::warn;

/// Which side's content wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
	Brain,
	Local,
}

/// `{resolution, content}` (§4.7). `content` is owned so the materializer
/// can apply it without borrowing back into the caller's buffers.
#[derive(Debug, Clone)]
pub struct Resolved {
	pub resolution: Resolution,
	pub content: Vec<u8>,
}

/// `resolve(...)` (§4.7).
///
/// `is_interactive` is supplied by the caller (the CLI Frontend); this
/// function never reads stdin itself, keeping it synchronously testable.
/// The actual `y`/`n` prompt for the `prompt` strategy is asked by the CLI
/// Frontend *before* a sync run starts (it has no per-conflict callback into
/// this library), so by the time `resolve` runs, `prompt` has already
/// degraded to one of `prefer_brain`/`prefer_local` at the policy layer for
/// an interactive session; a `Prompt` value reaching here at all means no
/// answer was obtained (non-interactive session, or a caller that passed the
/// policy through unresolved), and always falls back to `prefer_brain` with
/// a warning, per §4.7's implementation note.
pub fn resolve(
	strategy: ConflictStrategy,
	allow_local_modifications: bool,
	is_interactive: bool,
	brain_bytes: &[u8],
	local_bytes: &[u8],
	destination: &str,
) -> Resolved {
	if !allow_local_modifications {
		warn!(destination, "ALLOW_LOCAL_MODIFICATIONS=false; forcing brain version over local edits");
		return Resolved { resolution: Resolution::Brain, content: brain_bytes.to_vec() };
	}

	match strategy {
		ConflictStrategy::PreferBrain => Resolved { resolution: Resolution::Brain, content: brain_bytes.to_vec() },
		ConflictStrategy::PreferLocal => Resolved { resolution: Resolution::Local, content: local_bytes.to_vec() },
		ConflictStrategy::Prompt => {
			warn!(destination, is_interactive, "prompt strategy reached the resolver unresolved; defaulting to prefer_brain");
			Resolved { resolution: Resolution::Brain, content: brain_bytes.to_vec() }
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_prefer_brain() {
		let r = resolve(ConflictStrategy::PreferBrain, true, true, b"brain", b"local", "dest.txt");
		assert_eq!(r.resolution, Resolution::Brain);
		assert_eq!(r.content, b"brain");
	}

	#[test]
	fn test_prefer_local() {
		let r = resolve(ConflictStrategy::PreferLocal, true, true, b"brain", b"local", "dest.txt");
		assert_eq!(r.resolution, Resolution::Local);
		assert_eq!(r.content, b"local");
	}

	#[test]
	fn test_prompt_non_interactive_falls_back_to_brain() {
		let r = resolve(ConflictStrategy::Prompt, true, false, b"brain", b"local", "dest.txt");
		assert_eq!(r.resolution, Resolution::Brain);
	}

	#[test]
	fn test_allow_local_modifications_false_forces_brain_even_with_prefer_local() {
		let r = resolve(ConflictStrategy::PreferLocal, false, true, b"brain", b"local", "dest.txt");
		assert_eq!(r.resolution, Resolution::Brain);
		assert_eq!(r.content, b"brain");
	}
}

// vim: ts=4
