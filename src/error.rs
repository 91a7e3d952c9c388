//! Error types for brain/neuron synchronization

use std::error::Error;
use std::fmt;
use std::io;

/// Helper function to reduce Box::new() boilerplate when wrapping errors
#[inline]
pub fn boxed_error<E: Error + Send + Sync + 'static>(e: E) -> Box<dyn Error + Send + Sync> {
	Box::new(e)
}

/// Top-level error type returned at the process boundary (CLI exit-code decision).
///
/// Component functions return their own narrower error type; this enum only
/// aggregates them where results are collected for reporting.
#[derive(Debug)]
pub enum SyncrError {
	/// Malformed or inconsistent `.brain`/`.neurons` (nested)
	Config(ConfigError),

	/// Remote/fetch/checkout/push failure on a brain cache (nested)
	Cache(CacheError),

	/// Type mismatch, unknown destination, unreadable file (nested)
	Sync(SyncError),

	/// `prompt` strategy in a non-interactive context with no acceptable default
	ConflictUnresolved { destination: String },

	/// Export-path failure (nested)
	Export(ExportError),

	/// Advisory lock already held
	Busy { lock_path: String },

	/// I/O error not otherwise classified
	Io(io::Error),

	/// Generic error message
	Other { message: String },
}

impl fmt::Display for SyncrError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SyncrError::Config(e) => write!(f, "configuration error: {}", e),
			SyncrError::Cache(e) => write!(f, "brain cache error: {}", e),
			SyncrError::Sync(e) => write!(f, "sync error: {}", e),
			SyncrError::ConflictUnresolved { destination } => {
				write!(f, "conflict on {} could not be resolved non-interactively", destination)
			}
			SyncrError::Export(e) => write!(f, "export error: {}", e),
			SyncrError::Busy { lock_path } => {
				write!(f, "sync already in progress (lock held at {})", lock_path)
			}
			SyncrError::Io(e) => write!(f, "I/O error: {}", e),
			SyncrError::Other { message } => write!(f, "{}", message),
		}
	}
}

impl Error for SyncrError {}

impl From<io::Error> for SyncrError {
	fn from(e: io::Error) -> Self {
		SyncrError::Io(e)
	}
}

impl From<ConfigError> for SyncrError {
	fn from(e: ConfigError) -> Self {
		SyncrError::Config(e)
	}
}

impl From<CacheError> for SyncrError {
	fn from(e: CacheError) -> Self {
		SyncrError::Cache(e)
	}
}

impl From<SyncError> for SyncrError {
	fn from(e: SyncError) -> Self {
		SyncrError::Sync(e)
	}
}

impl From<ExportError> for SyncrError {
	fn from(e: ExportError) -> Self {
		SyncrError::Export(e)
	}
}

/// Config Store errors (§4.1, §7 `ConfigError`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigErrorKind {
	MissingField,
	UnknownBrain,
	BadSyntax,
	DuplicateKey,
}

#[derive(Debug, Clone)]
pub struct ConfigError {
	pub kind: ConfigErrorKind,
	pub location: String,
	pub message: String,
}

impl ConfigError {
	pub fn new(kind: ConfigErrorKind, location: impl Into<String>, message: impl Into<String>) -> Self {
		ConfigError { kind, location: location.into(), message: message.into() }
	}

	pub fn missing_field(location: impl Into<String>, message: impl Into<String>) -> Self {
		Self::new(ConfigErrorKind::MissingField, location, message)
	}

	pub fn unknown_brain(location: impl Into<String>, message: impl Into<String>) -> Self {
		Self::new(ConfigErrorKind::UnknownBrain, location, message)
	}

	pub fn bad_syntax(location: impl Into<String>, message: impl Into<String>) -> Self {
		Self::new(ConfigErrorKind::BadSyntax, location, message)
	}

	pub fn duplicate_key(location: impl Into<String>, message: impl Into<String>) -> Self {
		Self::new(ConfigErrorKind::DuplicateKey, location, message)
	}
}

impl fmt::Display for ConfigError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:?} at {}: {}", self.kind, self.location, self.message)
	}
}

impl Error for ConfigError {}

impl From<io::Error> for ConfigError {
	fn from(e: io::Error) -> Self {
		ConfigError::bad_syntax("<file>", e.to_string())
	}
}

/// Brain Cache errors (§4.3, §7 `CacheError`)
#[derive(Debug)]
pub enum CacheError {
	Fetch { brain_id: String, message: String },
	Checkout { brain_id: String, message: String },
	Push { brain_id: String, message: String },
	Io(io::Error),
}

impl fmt::Display for CacheError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			CacheError::Fetch { brain_id, message } => {
				write!(f, "fetch failed for brain '{}': {}", brain_id, message)
			}
			CacheError::Checkout { brain_id, message } => {
				write!(f, "checkout failed for brain '{}': {}", brain_id, message)
			}
			CacheError::Push { brain_id, message } => {
				write!(f, "push failed for brain '{}': {}", brain_id, message)
			}
			CacheError::Io(e) => write!(f, "I/O error: {}", e),
		}
	}
}

impl Error for CacheError {}

impl From<io::Error> for CacheError {
	fn from(e: io::Error) -> Self {
		CacheError::Io(e)
	}
}

/// Neuron Materializer / Sync Orchestrator errors (§7 `SyncError`)
#[derive(Debug)]
pub enum SyncError {
	TypeMismatch { destination: String },
	UnknownDestination { destination: String },
	UnreadableFile { path: String, source: io::Error },
	Io(io::Error),
}

impl fmt::Display for SyncError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SyncError::TypeMismatch { destination } => {
				write!(f, "mapping kind mismatch at {}", destination)
			}
			SyncError::UnknownDestination { destination } => {
				write!(f, "no mapping for destination {}", destination)
			}
			SyncError::UnreadableFile { path, source } => {
				write!(f, "cannot read {}: {}", path, source)
			}
			SyncError::Io(e) => write!(f, "I/O error: {}", e),
		}
	}
}

impl Error for SyncError {}

impl From<io::Error> for SyncError {
	fn from(e: io::Error) -> Self {
		SyncError::Io(e)
	}
}

/// Exporter errors (§4.9, §7 `ExportError`)
#[derive(Debug)]
pub enum ExportError {
	NotMapped { path: String },
	ReadOnly { path: String },
	Protected { path: String },
	PushDisallowed,
	Push { message: String },
	Io(io::Error),
}

impl fmt::Display for ExportError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ExportError::NotMapped { path } => write!(f, "{} is not under any mapping", path),
			ExportError::ReadOnly { path } => write!(f, "{} is exported read-only", path),
			ExportError::Protected { path } => {
				write!(f, "{} matches a protected path; use --force to override", path)
			}
			ExportError::PushDisallowed => {
				write!(f, "ALLOW_PUSH_TO_BRAIN is false for this consumer")
			}
			ExportError::Push { message } => write!(f, "push failed: {}", message),
			ExportError::Io(e) => write!(f, "I/O error: {}", e),
		}
	}
}

impl Error for ExportError {}

impl From<io::Error> for ExportError {
	fn from(e: io::Error) -> Self {
		ExportError::Io(e)
	}
}

// vim: ts=4
