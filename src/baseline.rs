//! Diff & Baseline (§4.6) — per-mapping `redb` table recording the last
//! synced brain commit and the content fingerprints observed at that point,
//! used to classify brain-side and local-side drift.

use std::path::Path;

use redb::{ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

use crate::error::SyncrError;

/// Key: mapping destination (unique per consumer, §3). Value: bincode-encoded `BaselineEntry`.
const BASELINE_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("baseline");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineEntry {
	pub brain_head: String,
	pub brain_fingerprint: String,
	pub local_fingerprint: String,
}

/// Result of `classify` (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffStatus {
	pub brain_changed: bool,
	pub local_changed: bool,
}

/// `blake3` digest of raw bytes, as lowercase hex.
pub fn fingerprint(bytes: &[u8]) -> String {
	blake3::hash(bytes).to_hex().to_string()
}

pub struct BaselineStore {
	db: redb::Database,
}

impl BaselineStore {
	/// Open (creating if absent) the baseline database at `<syncr_dir>/baseline.redb`.
	pub fn open(db_path: &Path) -> Result<Self, SyncrError> {
		let db = redb::Database::create(db_path)
			.map_err(|e| SyncrError::Other { message: format!("opening baseline store: {}", e) })?;
		{
			let write_txn = db
				.begin_write()
				.map_err(|e| SyncrError::Other { message: format!("opening baseline store: {}", e) })?;
			write_txn
				.open_table(BASELINE_TABLE)
				.map_err(|e| SyncrError::Other { message: format!("opening baseline store: {}", e) })?;
			write_txn
				.commit()
				.map_err(|e| SyncrError::Other { message: format!("opening baseline store: {}", e) })?;
		}
		Ok(BaselineStore { db })
	}

	pub fn get(&self, destination: &str) -> Result<Option<BaselineEntry>, SyncrError> {
		let read_txn = self.db.begin_read().map_err(|e| SyncrError::Other { message: e.to_string() })?;
		let table = read_txn.open_table(BASELINE_TABLE).map_err(|e| SyncrError::Other { message: e.to_string() })?;
		match table.get(destination).map_err(|e| SyncrError::Other { message: e.to_string() })? {
			Some(entry) => {
				let bytes = entry.value().to_vec();
				let decoded: BaselineEntry = bincode::deserialize(&bytes)
					.map_err(|e| SyncrError::Other { message: format!("corrupt baseline entry: {}", e) })?;
				Ok(Some(decoded))
			}
			None => Ok(None),
		}
	}

	pub fn set(&self, destination: &str, entry: &BaselineEntry) -> Result<(), SyncrError> {
		let bytes = bincode::serialize(entry)
			.map_err(|e| SyncrError::Other { message: format!("encoding baseline entry: {}", e) })?;
		let write_txn = self.db.begin_write().map_err(|e| SyncrError::Other { message: e.to_string() })?;
		{
			let mut table =
				write_txn.open_table(BASELINE_TABLE).map_err(|e| SyncrError::Other { message: e.to_string() })?;
			table.insert(destination, bytes.as_slice()).map_err(|e| SyncrError::Other { message: e.to_string() })?;
		}
		write_txn.commit().map_err(|e| SyncrError::Other { message: e.to_string() })?;
		Ok(())
	}

	/// Remove every baseline row for `brain_id`'s mappings (Open Question #2: invalidated on branch change).
	pub fn clear_brain(&self, destinations: &[String]) -> Result<(), SyncrError> {
		let write_txn = self.db.begin_write().map_err(|e| SyncrError::Other { message: e.to_string() })?;
		{
			let mut table =
				write_txn.open_table(BASELINE_TABLE).map_err(|e| SyncrError::Other { message: e.to_string() })?;
			for destination in destinations {
				table.remove(destination.as_str()).map_err(|e| SyncrError::Other { message: e.to_string() })?;
			}
		}
		write_txn.commit().map_err(|e| SyncrError::Other { message: e.to_string() })?;
		Ok(())
	}

	/// Open a single write transaction spanning every mapping of one run.
	/// The caller must call `commit()` on the returned batch exactly once,
	/// after every mapping has been materialized, so the baseline file is
	/// rewritten at most once per `syncAll` run (§4.6).
	pub fn begin_batch(&self) -> Result<BaselineBatch, SyncrError> {
		let txn = self.db.begin_write().map_err(|e| SyncrError::Other { message: e.to_string() })?;
		Ok(BaselineBatch { txn })
	}
}

/// A deferred-commit view onto one `BaselineStore`, shared across every
/// mapping of a single `syncAll` run.
pub struct BaselineBatch {
	txn: redb::WriteTransaction,
}

impl BaselineBatch {
	/// Finalize every `set` recorded on this batch in one write-transaction commit.
	pub fn commit(self) -> Result<(), SyncrError> {
		self.txn.commit().map_err(|e| SyncrError::Other { message: e.to_string() })
	}
}

/// Shared read/write surface `sync_file`/`sync_one` use to record baseline
/// entries, so the materializer can run against either a `BaselineStore`
/// (one commit per call) or a `BaselineBatch` (one commit per run).
pub trait BaselineAccess {
	fn get(&self, destination: &str) -> Result<Option<BaselineEntry>, SyncrError>;
	fn set(&self, destination: &str, entry: &BaselineEntry) -> Result<(), SyncrError>;
}

impl BaselineAccess for BaselineStore {
	fn get(&self, destination: &str) -> Result<Option<BaselineEntry>, SyncrError> {
		BaselineStore::get(self, destination)
	}

	fn set(&self, destination: &str, entry: &BaselineEntry) -> Result<(), SyncrError> {
		BaselineStore::set(self, destination, entry)
	}
}

impl BaselineAccess for BaselineBatch {
	fn get(&self, destination: &str) -> Result<Option<BaselineEntry>, SyncrError> {
		let table = self.txn.open_table(BASELINE_TABLE).map_err(|e| SyncrError::Other { message: e.to_string() })?;
		match table.get(destination).map_err(|e| SyncrError::Other { message: e.to_string() })? {
			Some(entry) => {
				let bytes = entry.value().to_vec();
				let decoded: BaselineEntry = bincode::deserialize(&bytes)
					.map_err(|e| SyncrError::Other { message: format!("corrupt baseline entry: {}", e) })?;
				Ok(Some(decoded))
			}
			None => Ok(None),
		}
	}

	fn set(&self, destination: &str, entry: &BaselineEntry) -> Result<(), SyncrError> {
		let bytes = bincode::serialize(entry)
			.map_err(|e| SyncrError::Other { message: format!("encoding baseline entry: {}", e) })?;
		let mut table =
			self.txn.open_table(BASELINE_TABLE).map_err(|e| SyncrError::Other { message: e.to_string() })?;
		table.insert(destination, bytes.as_slice()).map_err(|e| SyncrError::Other { message: e.to_string() })?;
		Ok(())
	}
}

/// `classify(destination, brain_bytes, baseline) → {brain_changed, local_changed}` (§4.6)
pub fn classify(local_bytes: Option<&[u8]>, brain_bytes: &[u8], baseline: Option<&BaselineEntry>) -> DiffStatus {
	let brain_fp = fingerprint(brain_bytes);

	let brain_changed = match baseline {
		Some(b) => b.brain_fingerprint != brain_fp,
		None => true,
	};

	let local_changed = match local_bytes {
		None => false,
		Some(bytes) => {
			let local_fp = fingerprint(bytes);
			match baseline {
				Some(b) => b.local_fingerprint != local_fp,
				None => local_fp != brain_fp,
			}
		}
	};

	DiffStatus { brain_changed, local_changed }
}


// vim: ts=4
