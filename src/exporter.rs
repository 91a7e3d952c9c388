//! Exporter (§4.9) — pushes a consumer's local edit of a brain-mapped file
//! back into the brain, subject to export permission, protected paths, and
//! the consumer's own push policy.

use std::path::Path;

use crate::baseline::{fingerprint, BaselineEntry, BaselineStore};
use crate::cache;
use crate::config::brain::{BrainManifest, ExportPermission};
use crate::config::consumer::{ConsumerManifest, Mapping};
use crate::error::{ExportError, SyncrError};
use crate::matcher::PathMatcher;

#[derive(Debug, Clone)]
pub struct ExportResult {
	pub destination: String,
	pub source: String,
	pub commit: String,
}

fn strip_trailing_slash(s: &str) -> &str {
	s.strip_suffix('/').unwrap_or(s)
}

/// Find the mapping containing `local_path` and the brain-relative source
/// path the local path corresponds to (directory offset appended for
/// directory mappings, per §4.9 step 2).
fn resolve_source<'a>(mappings: &'a [Mapping], local_path: &str) -> Option<(&'a Mapping, String)> {
	for mapping in mappings {
		let dest = strip_trailing_slash(&mapping.destination);
		if local_path == dest {
			return Some((mapping, mapping.source.clone()));
		}
		if let Some(rel) = local_path.strip_prefix(&format!("{}/", dest)) {
			let source_root = strip_trailing_slash(&mapping.source);
			return Some((mapping, format!("{}/{}", source_root, rel)));
		}
	}
	None
}

/// `export(config, brain_manifest, consumer_root, local_path, force) → Result` (§4.9)
pub async fn export(
	syncr_dir: &Path,
	consumer_root: &Path,
	manifest: &ConsumerManifest,
	local_path: &str,
	force: bool,
) -> Result<ExportResult, SyncrError> {
	let mappings = manifest.mappings()?;
	let (mapping, source) = resolve_source(&mappings, local_path)
		.ok_or_else(|| SyncrError::from(ExportError::NotMapped { path: local_path.to_string() }))?;

	let brain_entry = manifest.brain(&mapping.brain_id).ok_or_else(|| {
		SyncrError::from(ExportError::NotMapped { path: local_path.to_string() })
	})?;

	let handle = cache::ensure(
		syncr_dir,
		&brain_entry.id,
		&brain_entry.remote,
		&brain_entry.branch,
		std::slice::from_ref(&mapping.source),
	)
	.await?;

	let brain_manifest_bytes = cache::read_file(&handle, ".brain").await?;
	let brain_manifest = crate::config::brain::parse_brain(&String::from_utf8_lossy(&brain_manifest_bytes))?;

	if export_permission_for(&brain_manifest, &source) != Some(ExportPermission::ReadWrite) {
		return Err(SyncrError::from(ExportError::ReadOnly { path: source }));
	}

	if !force {
		let protected = brain_manifest.protected_paths();
		let protected_matcher =
			PathMatcher::new(&protected).map_err(|e| SyncrError::Other { message: e.to_string() })?;
		if protected_matcher.matches(&source) {
			return Err(SyncrError::from(ExportError::Protected { path: source }));
		}
	}

	if !manifest.sync_policy.allow_push_to_brain {
		return Err(SyncrError::from(ExportError::PushDisallowed));
	}

	let local_bytes = std::fs::read(consumer_root.join(local_path))?;
	cache::write_path(&handle, &source, &local_bytes).await?;
	cache::commit(&handle, &format!("export: update {}", source)).await.map_err(|e| ExportError::Push { message: e.to_string() })?;
	cache::push(&handle, &brain_entry.branch).await.map_err(|e| ExportError::Push { message: e.to_string() })?;

	let commit = cache::head_commit(&handle).await?;

	let baseline = BaselineStore::open(&consumer_root.join(".syncr").join("baseline.redb"))?;
	let fp = fingerprint(&local_bytes);
	baseline.set(local_path, &BaselineEntry { brain_head: commit.clone(), brain_fingerprint: fp.clone(), local_fingerprint: fp })?;

	Ok(ExportResult { destination: local_path.to_string(), source, commit })
}

fn export_permission_for(manifest: &BrainManifest, source: &str) -> Option<ExportPermission> {
	// Most specific literal match wins; falls back to matching via the Path
	// Matcher's own glob semantics against each declared pattern.
	if let Some(perm) = manifest.export_permission(source) {
		return Some(perm);
	}
	manifest.export.iter().rev().find_map(|(pattern, perm)| {
		let matcher = PathMatcher::new(std::slice::from_ref(pattern)).ok()?;
		if matcher.matches(source) {
			Some(*perm)
		} else {
			None
		}
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::consumer::{BrainEntry, MapEntry};
	use std::process::Command as StdCommand;
	use tempfile::TempDir;

	fn init_bare_remote(dir: &Path) {
		StdCommand::new("git").arg("init").arg("--bare").arg(dir).output().unwrap();
	}

	fn seed_remote(remote: &Path, brain_text: &str, files: &[(&str, &str)]) {
		let work = TempDir::new().unwrap();
		StdCommand::new("git").current_dir(work.path()).args(["init"]).output().unwrap();
		StdCommand::new("git").current_dir(work.path()).args(["config", "user.email", "t@example.com"]).output().unwrap();
		StdCommand::new("git").current_dir(work.path()).args(["config", "user.name", "t"]).output().unwrap();
		std::fs::write(work.path().join(".brain"), brain_text).unwrap();
		for (path, content) in files {
			let full = work.path().join(path);
			std::fs::create_dir_all(full.parent().unwrap()).unwrap();
			std::fs::write(&full, content).unwrap();
		}
		StdCommand::new("git").current_dir(work.path()).args(["add", "-A"]).output().unwrap();
		StdCommand::new("git").current_dir(work.path()).args(["commit", "-m", "seed"]).output().unwrap();
		StdCommand::new("git").current_dir(work.path()).args(["branch", "-M", "main"]).output().unwrap();
		StdCommand::new("git")
			.current_dir(work.path())
			.args(["remote", "add", "origin", remote.to_str().unwrap()])
			.output()
			.unwrap();
		StdCommand::new("git").current_dir(work.path()).args(["push", "origin", "main"]).output().unwrap();
	}

	fn manifest_with_map(brain_id: &str, remote: &str, source: &str, destination: &str, allow_push: bool) -> ConsumerManifest {
		let mut manifest = ConsumerManifest::new();
		manifest.brains.push(BrainEntry { id: brain_id.to_string(), remote: remote.to_string(), branch: "main".to_string() });
		manifest.sync_policy.allow_push_to_brain = allow_push;
		manifest.map.push(MapEntry {
			key: "k".to_string(),
			brain_id: brain_id.to_string(),
			source: source.to_string(),
			destination: destination.to_string(),
		});
		manifest
	}

	#[tokio::test]
	async fn test_export_readonly_is_rejected() {
		let remote_dir = TempDir::new().unwrap();
		init_bare_remote(remote_dir.path());
		let brain_text = "[BRAIN]\nID = b\n\n[EXPORT]\ncore_logic/utils.py = readonly\n";
		seed_remote(remote_dir.path(), brain_text, &[("core_logic/utils.py", "x = 1\n")]);

		let syncr_dir = TempDir::new().unwrap();
		let consumer_dir = TempDir::new().unwrap();
		std::fs::create_dir_all(consumer_dir.path().join("vendor")).unwrap();
		std::fs::write(consumer_dir.path().join("vendor/utils.py"), "x = 2\n").unwrap();

		let manifest = manifest_with_map("b", remote_dir.path().to_str().unwrap(), "core_logic/utils.py", "vendor/utils.py", true);

		let err = export(syncr_dir.path(), consumer_dir.path(), &manifest, "vendor/utils.py", false).await.unwrap_err();
		assert!(matches!(err, SyncrError::Export(ExportError::ReadOnly { .. })));
	}

	#[tokio::test]
	async fn test_export_protected_path_is_rejected_without_force() {
		let remote_dir = TempDir::new().unwrap();
		init_bare_remote(remote_dir.path());
		let brain_text = "[BRAIN]\nID = b\n\n[EXPORT]\ncore_logic/constants.py = readwrite\n\n[UPDATE_POLICY]\nPROTECTED_PATHS = core_logic/constants.py\n";
		seed_remote(remote_dir.path(), brain_text, &[("core_logic/constants.py", "Y = 1\n")]);

		let syncr_dir = TempDir::new().unwrap();
		let consumer_dir = TempDir::new().unwrap();
		std::fs::create_dir_all(consumer_dir.path().join("vendor")).unwrap();
		std::fs::write(consumer_dir.path().join("vendor/constants.py"), "Y = 2\n").unwrap();

		let manifest =
			manifest_with_map("b", remote_dir.path().to_str().unwrap(), "core_logic/constants.py", "vendor/constants.py", true);

		let err = export(syncr_dir.path(), consumer_dir.path(), &manifest, "vendor/constants.py", false).await.unwrap_err();
		assert!(matches!(err, SyncrError::Export(ExportError::Protected { .. })));
	}

	#[tokio::test]
	async fn test_export_push_disallowed_by_policy() {
		let remote_dir = TempDir::new().unwrap();
		init_bare_remote(remote_dir.path());
		let brain_text = "[BRAIN]\nID = b\n\n[EXPORT]\ncore_logic/utils.py = readwrite\n";
		seed_remote(remote_dir.path(), brain_text, &[("core_logic/utils.py", "x = 1\n")]);

		let syncr_dir = TempDir::new().unwrap();
		let consumer_dir = TempDir::new().unwrap();
		std::fs::create_dir_all(consumer_dir.path().join("vendor")).unwrap();
		std::fs::write(consumer_dir.path().join("vendor/utils.py"), "x = 2\n").unwrap();

		let manifest = manifest_with_map("b", remote_dir.path().to_str().unwrap(), "core_logic/utils.py", "vendor/utils.py", false);

		let err = export(syncr_dir.path(), consumer_dir.path(), &manifest, "vendor/utils.py", false).await.unwrap_err();
		assert!(matches!(err, SyncrError::Export(ExportError::PushDisallowed)));
	}

	#[tokio::test]
	async fn test_export_succeeds_and_pushes() {
		let remote_dir = TempDir::new().unwrap();
		init_bare_remote(remote_dir.path());
		let brain_text = "[BRAIN]\nID = b\n\n[EXPORT]\ncore_logic/utils.py = readwrite\n";
		seed_remote(remote_dir.path(), brain_text, &[("core_logic/utils.py", "x = 1\n")]);

		let syncr_dir = TempDir::new().unwrap();
		let consumer_dir = TempDir::new().unwrap();
		std::fs::create_dir_all(consumer_dir.path().join("vendor")).unwrap();
		std::fs::write(consumer_dir.path().join("vendor/utils.py"), "x = 2\n").unwrap();

		let manifest = manifest_with_map("b", remote_dir.path().to_str().unwrap(), "core_logic/utils.py", "vendor/utils.py", true);

		let result = export(syncr_dir.path(), consumer_dir.path(), &manifest, "vendor/utils.py", false).await.unwrap();
		assert_eq!(result.source, "core_logic/utils.py");
		assert_eq!(result.commit.len(), 40);
	}
}

// vim: ts=4
