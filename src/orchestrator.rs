//! Sync Orchestrator (§4.8) — resolves every mapping's brain cache, walks
//! mappings in file order, and returns partial results on failure.

use std::collections::HashMap;
use std::path::Path;

use crate::baseline::BaselineStore;
use crate::cache::{self, CacheHandle};
use crate::config::consumer::{ConsumerManifest, Mapping};
use crate::error::{SyncError, SyncrError};
use crate::lock::ConsumerLock;
use crate::logging::{error, info};
use crate::materializer::{self, SyncResult, SyncStatus};

/// Fan out `BrainCache::ensure` across every referenced brain id
/// concurrently (§5); the per-mapping materialization loop below stays
/// strictly sequential.
async fn ensure_all(
	syncr_dir: &Path,
	manifest: &ConsumerManifest,
	mappings: &[Mapping],
) -> HashMap<String, Result<CacheHandle, SyncrError>> {
	let mut required_paths: HashMap<String, Vec<String>> = HashMap::new();
	for m in mappings {
		required_paths.entry(m.brain_id.clone()).or_default().push(m.source.clone());
	}

	let mut tasks = Vec::new();
	for (brain_id, paths) in required_paths {
		let Some(entry) = manifest.brain(&brain_id) else {
			continue;
		};
		let entry = entry.clone();
		let syncr_dir = syncr_dir.to_path_buf();
		tasks.push(tokio::spawn(async move {
			let handle = cache::ensure(&syncr_dir, &entry.id, &entry.remote, &entry.branch, &paths).await;
			(entry.id, handle.map_err(SyncrError::from))
		}));
	}

	let mut out = HashMap::new();
	for task in tasks {
		match task.await {
			Ok((brain_id, result)) => {
				out.insert(brain_id, result);
			}
			Err(e) => {
				// Join error (panic in the task); surfaced per-brain isn't
				// possible without its id, so this is dropped from the map
				// and every mapping referencing it reports "unknown brain".
				error!("brain cache task panicked: {}", e);
			}
		}
	}
	out
}

/// `syncAll(config, consumer_root) → list<Result>` (§4.8)
pub async fn sync_all(
	syncr_dir: &Path,
	consumer_root: &Path,
	manifest: &ConsumerManifest,
	is_interactive: bool,
) -> Result<Vec<SyncResult>, SyncrError> {
	let _lock = ConsumerLock::acquire(consumer_root)?;

	let mappings = manifest.mappings()?;
	info!(count = mappings.len(), "starting sync");

	let handles = ensure_all(syncr_dir, manifest, &mappings).await;
	let store = BaselineStore::open(&consumer_root.join(".syncr").join("baseline.redb"))?;
	// One write transaction spans every mapping in this run; it commits once
	// at the end, so `syncAll` rewrites the baseline file exactly once (§4.6).
	let batch = store.begin_batch()?;

	let mut results = Vec::with_capacity(mappings.len());
	for mapping in &mappings {
		let result = match handles.get(&mapping.brain_id) {
			Some(Ok(handle)) => {
				let head = cache::head_commit(handle).await.unwrap_or_default();
				materializer::sync_one(consumer_root, handle, &head, mapping, &manifest.sync_policy, &batch, is_interactive).await
			}
			Some(Err(e)) => SyncResult {
				status: SyncStatus::Error,
				destination: mapping.destination.clone(),
				requirements_merged: false,
				message: Some(e.to_string()),
			},
			None => SyncResult {
				status: SyncStatus::Error,
				destination: mapping.destination.clone(),
				requirements_merged: false,
				message: Some(format!("no cache handle for brain '{}'", mapping.brain_id)),
			},
		};
		results.push(result);
	}

	batch.commit()?;
	Ok(results)
}

/// `syncOne(config, consumer_root, destination)` (§4.8)
pub async fn sync_one(
	syncr_dir: &Path,
	consumer_root: &Path,
	manifest: &ConsumerManifest,
	destination: &str,
	is_interactive: bool,
) -> Result<SyncResult, SyncrError> {
	let _lock = ConsumerLock::acquire(consumer_root)?;

	let mappings = manifest.mappings()?;
	let mapping = mappings
		.iter()
		.find(|m| m.destination == destination)
		.ok_or_else(|| SyncrError::from(SyncError::UnknownDestination { destination: destination.to_string() }))?;

	let brain = manifest
		.brain(&mapping.brain_id)
		.ok_or_else(|| SyncrError::from(SyncError::UnknownDestination { destination: destination.to_string() }))?;

	let handle = cache::ensure(syncr_dir, &brain.id, &brain.remote, &brain.branch, std::slice::from_ref(&mapping.source)).await?;
	let head = cache::head_commit(&handle).await?;
	let baseline = BaselineStore::open(&consumer_root.join(".syncr").join("baseline.redb"))?;

	Ok(materializer::sync_one(consumer_root, &handle, &head, mapping, &manifest.sync_policy, &baseline, is_interactive).await)
}


// vim: ts=4
