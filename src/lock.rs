//! Advisory lock over a consumer root, preventing concurrent sync runs
//!
//! One exclusive lock file lives adjacent to `.neurons`. Acquiring it while
//! held returns a `BusyError`-shaped message rather than blocking.

use std::path;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use crate::error::SyncrError;

const LOCK_FILE_NAME: &str = ".neurons.lock";

/// Global lock file path - used for signal handler cleanup
static LOCK_FILE_PATH: OnceLock<std::sync::Mutex<Option<path::PathBuf>>> = OnceLock::new();

/// Exclusive advisory lock on a consumer root.
///
/// Automatically cleaned up on drop or on signal termination.
pub struct ConsumerLock {
	path: path::PathBuf,
}

impl ConsumerLock {
	/// Acquire an exclusive lock on the consumer root.
	pub fn acquire(consumer_root: &path::Path) -> Result<Self, SyncrError> {
		let lock_path = consumer_root.join(LOCK_FILE_NAME);

		if lock_path.exists() {
			return Err(SyncrError::Busy { lock_path: lock_path.display().to_string() });
		}

		let pid = std::process::id();
		std::fs::write(&lock_path, pid.to_string())?;

		let lock_storage_mutex = LOCK_FILE_PATH.get_or_init(|| std::sync::Mutex::new(None));
		if let Ok(mut lock_storage) = lock_storage_mutex.lock() {
			*lock_storage = Some(lock_path.clone());
		}

		Ok(ConsumerLock { path: lock_path })
	}

	fn remove_now(&self) {
		let _ = std::fs::remove_file(&self.path);
		if let Some(mutex) = LOCK_FILE_PATH.get() {
			if let Ok(mut lock_storage) = mutex.lock() {
				*lock_storage = None;
			}
		}
	}
}

impl Drop for ConsumerLock {
	fn drop(&mut self) {
		self.remove_now();
	}
}

/// Setup signal handlers so the lock file is removed on SIGTERM/SIGINT.
pub fn setup_signal_handlers() {
	tokio::spawn(async {
		use tokio::signal;

		let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(stream) => stream,
			Err(e) => {
				warn!("Failed to setup SIGTERM handler: {}", e);
				return;
			}
		};

		let mut sigint = match signal::unix::signal(signal::unix::SignalKind::interrupt()) {
			Ok(stream) => stream,
			Err(e) => {
				warn!("Failed to setup SIGINT handler: {}", e);
				return;
			}
		};

		tokio::select! {
			_ = sigterm.recv() => {
				debug!("Received SIGTERM, cleaning up lock file...");
				cleanup_lock_file();
				std::process::exit(130);
			}
			_ = sigint.recv() => {
				debug!("Received SIGINT, cleaning up lock file...");
				cleanup_lock_file();
				std::process::exit(130);
			}
		}
	});
}

fn cleanup_lock_file() {
	if let Some(lock_storage_mutex) = LOCK_FILE_PATH.get() {
		if let Ok(lock_storage) = lock_storage_mutex.lock() {
			if let Some(lock_path) = lock_storage.as_ref() {
				let _ = std::fs::remove_file(lock_path);
				info!("Lock file cleaned up on signal termination: {}", lock_path.display());
			}
		}
	}
}


// vim: ts=4
