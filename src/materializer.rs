//! Neuron Materializer (§4.5) — applies one mapping's brain content to the
//! consumer tree, dispatching through the Diff & Baseline classifier and,
//! on genuine conflicts, the Conflict Resolver.

use std::path::{Path, PathBuf};

use crate::baseline::{classify, fingerprint, BaselineAccess, BaselineEntry, BaselineStore};
use crate::cache::{self, CacheHandle};
use crate::config::consumer::{Mapping, MappingKind};
use crate::config::SyncPolicy;
use crate::conflict::{self, Resolution};
use crate::error::{SyncError, SyncrError};
use crate::logging::{debug, warn};
use crate::requirements;

/// Outcome of applying a single mapping (§4.5 "Result shape").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
	Success,
	Skipped,
	Conflict,
	Error,
}

#[derive(Debug, Clone)]
pub struct SyncResult {
	pub status: SyncStatus,
	pub destination: String,
	pub requirements_merged: bool,
	pub message: Option<String>,
}

impl SyncResult {
	fn error(destination: &str, message: impl Into<String>) -> Self {
		SyncResult { status: SyncStatus::Error, destination: destination.to_string(), requirements_merged: false, message: Some(message.into()) }
	}
}

fn strip_trailing_slash(s: &str) -> &str {
	s.strip_suffix('/').unwrap_or(s)
}

/// Per-file decision, shared by the file-mapping path and each file visited
/// under a directory mapping.
async fn sync_file<B: BaselineAccess>(
	consumer_root: &Path,
	cache_handle: &CacheHandle,
	brain_head: &str,
	source: &str,
	dest_rel: &str,
	policy: &SyncPolicy,
	baseline: &B,
	is_interactive: bool,
) -> Result<(SyncStatus, Option<String>), SyncrError> {
	let brain_bytes = cache::read_file(cache_handle, source).await?;

	let dest_path = consumer_root.join(dest_rel);
	let local_exists = dest_path.exists();

	if !local_exists {
		if let Some(parent) = dest_path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		std::fs::write(&dest_path, &brain_bytes)?;
		let fp = fingerprint(&brain_bytes);
		baseline.set(dest_rel, &BaselineEntry { brain_head: brain_head.to_string(), brain_fingerprint: fp.clone(), local_fingerprint: fp })?;
		return Ok((SyncStatus::Success, None));
	}

	let local_bytes = std::fs::read(&dest_path)?;
	let existing_baseline = baseline.get(dest_rel)?;
	let diff = classify(Some(&local_bytes), &brain_bytes, existing_baseline.as_ref());

	let (status, message, final_bytes) = match (diff.brain_changed, diff.local_changed) {
		// True no-op: destination already matches the last-synced brain
		// content. Skip without touching the baseline store at all.
		(false, false) => return Ok((SyncStatus::Skipped, None)),
		(true, false) => {
			std::fs::write(&dest_path, &brain_bytes)?;
			(SyncStatus::Success, None, brain_bytes.clone())
		}
		(false, true) => (SyncStatus::Skipped, Some("local changes preserved".to_string()), local_bytes),
		(true, true) => {
			let resolved = conflict::resolve(
				policy.conflict_strategy,
				policy.allow_local_modifications,
				is_interactive,
				&brain_bytes,
				&local_bytes,
				dest_rel,
			);
			let bytes = if resolved.resolution == Resolution::Brain {
				std::fs::write(&dest_path, &resolved.content)?;
				resolved.content.clone()
			} else {
				local_bytes
			};
			(SyncStatus::Conflict, Some(format!("resolved to {:?}", resolved.resolution)), bytes)
		}
	};

	let brain_fp = fingerprint(&brain_bytes);
	let local_fp = fingerprint(&final_bytes);
	baseline.set(dest_rel, &BaselineEntry { brain_head: brain_head.to_string(), brain_fingerprint: brain_fp, local_fingerprint: local_fp })?;

	Ok((status, message))
}

/// Side-merge of a sibling `<source>requirements.txt`, if the brain has one.
/// Independent of the content write; failures here never affect `status`.
async fn merge_sibling_requirements(consumer_root: &Path, cache_handle: &CacheHandle, source: &str) -> bool {
	let sibling_source = format!("{}requirements.txt", strip_trailing_slash(source));

	let neuron_text = match cache::read_file(cache_handle, &sibling_source).await {
		Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
		Err(_) => return false,
	};

	let consumer_reqs_path = consumer_root.join("requirements.txt");
	let consumer_text = std::fs::read_to_string(&consumer_reqs_path).unwrap_or_default();

	let merged = requirements::merge(&consumer_text, &neuron_text);
	match std::fs::write(&consumer_reqs_path, merged) {
		Ok(()) => true,
		Err(e) => {
			warn!(source, "failed to write merged requirements.txt: {}", e);
			false
		}
	}
}

/// `syncOne(consumer_root, cache, mapping, policy, baseline) → Result` (§4.5)
pub async fn sync_one<B: BaselineAccess>(
	consumer_root: &Path,
	cache_handle: &CacheHandle,
	brain_head: &str,
	mapping: &Mapping,
	policy: &SyncPolicy,
	baseline: &B,
	is_interactive: bool,
) -> SyncResult {
	let cache_path: PathBuf = cache_handle.path(&mapping.source);
	let cache_meta = match tokio::fs::metadata(&cache_path).await {
		Ok(m) => m,
		Err(_) => {
			// Brain no longer has this path; nothing to materialize this run.
			return SyncResult {
				status: SyncStatus::Skipped,
				destination: mapping.destination.clone(),
				requirements_merged: false,
				message: Some("source absent from brain at pinned branch".to_string()),
			};
		}
	};

	let actual_kind = if cache_meta.is_dir() { MappingKind::Dir } else { MappingKind::File };
	if actual_kind != mapping.kind {
		let err: SyncrError = SyncError::TypeMismatch { destination: mapping.destination.clone() }.into();
		return SyncResult::error(&mapping.destination, err.to_string());
	}

	let result = match mapping.kind {
		MappingKind::File => {
			match sync_file(consumer_root, cache_handle, brain_head, &mapping.source, &mapping.destination, policy, baseline, is_interactive).await {
				Ok((status, message)) => SyncResult { status, destination: mapping.destination.clone(), requirements_merged: false, message },
				Err(e) => SyncResult::error(&mapping.destination, e.to_string()),
			}
		}
		MappingKind::Dir => match sync_dir(consumer_root, cache_handle, brain_head, mapping, policy, baseline, is_interactive).await {
			Ok(result) => result,
			Err(e) => SyncResult::error(&mapping.destination, e.to_string()),
		},
	};

	let requirements_merged = merge_sibling_requirements(consumer_root, cache_handle, &mapping.source).await;

	SyncResult { requirements_merged, ..result }
}

async fn sync_dir<B: BaselineAccess>(
	consumer_root: &Path,
	cache_handle: &CacheHandle,
	brain_head: &str,
	mapping: &Mapping,
	policy: &SyncPolicy,
	baseline: &B,
	is_interactive: bool,
) -> Result<SyncResult, SyncrError> {
	let rel_files = cache::list_dir(cache_handle, &mapping.source).await?;

	let source_root = strip_trailing_slash(&mapping.source);
	let dest_root = strip_trailing_slash(&mapping.destination);

	let mut saw_error = false;
	let mut saw_conflict = false;
	let mut saw_success = false;

	for rel in &rel_files {
		let source_path = format!("{}/{}", source_root, rel);
		let dest_path = format!("{}/{}", dest_root, rel);
		debug!(source = %source_path, destination = %dest_path, "materializing directory member");

		match sync_file(consumer_root, cache_handle, brain_head, &source_path, &dest_path, policy, baseline, is_interactive).await {
			Ok((SyncStatus::Success, _)) => saw_success = true,
			Ok((SyncStatus::Conflict, _)) => saw_conflict = true,
			Ok((SyncStatus::Skipped, _)) => {}
			Ok((SyncStatus::Error, _)) => saw_error = true,
			Err(_) => saw_error = true,
		}
	}

	let status = if saw_error {
		SyncStatus::Error
	} else if saw_conflict {
		SyncStatus::Conflict
	} else if saw_success {
		SyncStatus::Success
	} else {
		SyncStatus::Skipped
	};

	Ok(SyncResult { status, destination: mapping.destination.clone(), requirements_merged: false, message: None })
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::ConflictStrategy;
	use tempfile::TempDir;

	fn default_policy() -> SyncPolicy {
		SyncPolicy::default()
	}

	async fn setup_cache(files: &[(&str, &str)]) -> (TempDir, CacheHandle) {
		let tmp = TempDir::new().unwrap();
		for (path, content) in files {
			let full = tmp.path().join(path);
			tokio::fs::create_dir_all(full.parent().unwrap()).await.unwrap();
			tokio::fs::write(&full, content).await.unwrap();
		}
		(tmp, CacheHandle { brain_id: "test_brain".to_string(), root: tmp.path().to_path_buf() })
	}

	#[tokio::test]
	async fn test_new_file_is_created() {
		let (_cache_tmp, handle) = setup_cache(&[("core_logic/utils.py", "x = 1\n")]).await;
		let consumer_tmp = TempDir::new().unwrap();
		let baseline = BaselineStore::open(&consumer_tmp.path().join("baseline.redb")).unwrap();

		let mapping = Mapping {
			brain_id: "test_brain".to_string(),
			source: "core_logic/utils.py".to_string(),
			destination: "vendor/utils.py".to_string(),
			kind: MappingKind::File,
		};

		let result = sync_one(consumer_tmp.path(), &handle, "headcommit", &mapping, &default_policy(), &baseline, false).await;
		assert_eq!(result.status, SyncStatus::Success);
		assert!(consumer_tmp.path().join("vendor/utils.py").exists());
	}

	#[tokio::test]
	async fn test_unchanged_is_skipped() {
		let (_cache_tmp, handle) = setup_cache(&[("f.py", "same\n")]).await;
		let consumer_tmp = TempDir::new().unwrap();
		let baseline = BaselineStore::open(&consumer_tmp.path().join("baseline.redb")).unwrap();
		let mapping =
			Mapping { brain_id: "b".to_string(), source: "f.py".to_string(), destination: "f.py".to_string(), kind: MappingKind::File };

		let first = sync_one(consumer_tmp.path(), &handle, "h1", &mapping, &default_policy(), &baseline, false).await;
		assert_eq!(first.status, SyncStatus::Success);

		let second = sync_one(consumer_tmp.path(), &handle, "h1", &mapping, &default_policy(), &baseline, false).await;
		assert_eq!(second.status, SyncStatus::Skipped);
	}

	#[tokio::test]
	async fn test_true_noop_sync_does_not_rewrite_baseline() {
		let (_cache_tmp, handle) = setup_cache(&[("f.py", "same\n")]).await;
		let consumer_tmp = TempDir::new().unwrap();
		let baseline = BaselineStore::open(&consumer_tmp.path().join("baseline.redb")).unwrap();
		let mapping =
			Mapping { brain_id: "b".to_string(), source: "f.py".to_string(), destination: "f.py".to_string(), kind: MappingKind::File };

		let first = sync_one(consumer_tmp.path(), &handle, "h1", &mapping, &default_policy(), &baseline, false).await;
		assert_eq!(first.status, SyncStatus::Success);
		let entry_after_first = baseline.get("f.py").unwrap().unwrap();

		// Third call: nothing changed on either side since the last sync.
		let second = sync_one(consumer_tmp.path(), &handle, "h1", &mapping, &default_policy(), &baseline, false).await;
		assert_eq!(second.status, SyncStatus::Skipped);
		let entry_after_second = baseline.get("f.py").unwrap().unwrap();
		assert_eq!(entry_after_first, entry_after_second, "no-op sync must not rewrite the baseline entry");
	}

	#[tokio::test]
	async fn test_local_only_change_preserved() {
		let (_cache_tmp, handle) = setup_cache(&[("f.py", "brain v1\n")]).await;
		let consumer_tmp = TempDir::new().unwrap();
		let baseline = BaselineStore::open(&consumer_tmp.path().join("baseline.redb")).unwrap();
		let mapping =
			Mapping { brain_id: "b".to_string(), source: "f.py".to_string(), destination: "f.py".to_string(), kind: MappingKind::File };

		sync_one(consumer_tmp.path(), &handle, "h1", &mapping, &default_policy(), &baseline, false).await;
		std::fs::write(consumer_tmp.path().join("f.py"), "edited locally\n").unwrap();

		let result = sync_one(consumer_tmp.path(), &handle, "h1", &mapping, &default_policy(), &baseline, false).await;
		assert_eq!(result.status, SyncStatus::Skipped);
		assert_eq!(std::fs::read_to_string(consumer_tmp.path().join("f.py")).unwrap(), "edited locally\n");
	}

	#[tokio::test]
	async fn test_brain_only_change_overwrites() {
		let (cache_tmp, handle) = setup_cache(&[("f.py", "brain v1\n")]).await;
		let consumer_tmp = TempDir::new().unwrap();
		let baseline = BaselineStore::open(&consumer_tmp.path().join("baseline.redb")).unwrap();
		let mapping =
			Mapping { brain_id: "b".to_string(), source: "f.py".to_string(), destination: "f.py".to_string(), kind: MappingKind::File };

		sync_one(consumer_tmp.path(), &handle, "h1", &mapping, &default_policy(), &baseline, false).await;
		std::fs::write(cache_tmp.path().join("f.py"), "brain v2\n").unwrap();

		let result = sync_one(consumer_tmp.path(), &handle, "h2", &mapping, &default_policy(), &baseline, false).await;
		assert_eq!(result.status, SyncStatus::Success);
		assert_eq!(std::fs::read_to_string(consumer_tmp.path().join("f.py")).unwrap(), "brain v2\n");
	}

	#[tokio::test]
	async fn test_both_changed_is_conflict_and_prefers_brain_by_default() {
		let (cache_tmp, handle) = setup_cache(&[("f.py", "brain v1\n")]).await;
		let consumer_tmp = TempDir::new().unwrap();
		let baseline = BaselineStore::open(&consumer_tmp.path().join("baseline.redb")).unwrap();
		let mut policy = default_policy();
		policy.conflict_strategy = ConflictStrategy::PreferBrain;
		let mapping =
			Mapping { brain_id: "b".to_string(), source: "f.py".to_string(), destination: "f.py".to_string(), kind: MappingKind::File };

		sync_one(consumer_tmp.path(), &handle, "h1", &mapping, &policy, &baseline, false).await;
		std::fs::write(cache_tmp.path().join("f.py"), "brain v2\n").unwrap();
		std::fs::write(consumer_tmp.path().join("f.py"), "local edit\n").unwrap();

		let result = sync_one(consumer_tmp.path(), &handle, "h2", &mapping, &policy, &baseline, false).await;
		assert_eq!(result.status, SyncStatus::Conflict);
		assert_eq!(std::fs::read_to_string(consumer_tmp.path().join("f.py")).unwrap(), "brain v2\n");
	}

	#[tokio::test]
	async fn test_directory_mapping_creates_new_files_and_preserves_destination_only_files() {
		let (_cache_tmp, handle) = setup_cache(&[("pkg/a.py", "a"), ("pkg/nested/b.py", "b")]).await;
		let consumer_tmp = TempDir::new().unwrap();
		tokio::fs::create_dir_all(consumer_tmp.path().join("vendor/pkg")).await.unwrap();
		std::fs::write(consumer_tmp.path().join("vendor/pkg/local_only.py"), "keep me").unwrap();
		let baseline = BaselineStore::open(&consumer_tmp.path().join("baseline.redb")).unwrap();

		let mapping =
			Mapping { brain_id: "b".to_string(), source: "pkg/".to_string(), destination: "vendor/pkg/".to_string(), kind: MappingKind::Dir };

		let result = sync_one(consumer_tmp.path(), &handle, "h1", &mapping, &default_policy(), &baseline, false).await;
		assert_eq!(result.status, SyncStatus::Success);
		assert!(consumer_tmp.path().join("vendor/pkg/a.py").exists());
		assert!(consumer_tmp.path().join("vendor/pkg/nested/b.py").exists());
		assert_eq!(std::fs::read_to_string(consumer_tmp.path().join("vendor/pkg/local_only.py")).unwrap(), "keep me");
	}

	#[tokio::test]
	async fn test_sibling_requirements_merge() {
		let (_cache_tmp, handle) =
			setup_cache(&[("libs/utils/strings.py", "code"), ("libs/utils/strings.pyrequirements.txt", "six==1.16.0\n")]).await;
		let consumer_tmp = TempDir::new().unwrap();
		let baseline = BaselineStore::open(&consumer_tmp.path().join("baseline.redb")).unwrap();

		let mapping = Mapping {
			brain_id: "b".to_string(),
			source: "libs/utils/strings.py".to_string(),
			destination: "vendor/strings.py".to_string(),
			kind: MappingKind::File,
		};

		let result = sync_one(consumer_tmp.path(), &handle, "h1", &mapping, &default_policy(), &baseline, false).await;
		assert!(result.requirements_merged);
		let merged = std::fs::read_to_string(consumer_tmp.path().join("requirements.txt")).unwrap();
		assert!(merged.contains("six==1.16.0"));
	}

	#[tokio::test]
	async fn test_no_sibling_requirements_is_not_an_error() {
		let (_cache_tmp, handle) = setup_cache(&[("f.py", "code")]).await;
		let consumer_tmp = TempDir::new().unwrap();
		let baseline = BaselineStore::open(&consumer_tmp.path().join("baseline.redb")).unwrap();
		let mapping =
			Mapping { brain_id: "b".to_string(), source: "f.py".to_string(), destination: "f.py".to_string(), kind: MappingKind::File };

		let result = sync_one(consumer_tmp.path(), &handle, "h1", &mapping, &default_policy(), &baseline, false).await;
		assert_eq!(result.status, SyncStatus::Success);
		assert!(!result.requirements_merged);
	}
}

// vim: ts=4
