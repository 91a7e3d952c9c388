//! # brainsync
//!
//! Shares selected files and directories ("neurons") from a brain repository
//! into many consumer repositories: fetches from a brain at a pinned branch,
//! materializes only the requested subtrees, detects local divergence,
//! resolves conflicts by policy, merges dependency manifests, and can export
//! consumer-side edits back to the brain.

#![deny(unsafe_code)]
#![warn(dead_code)]

pub mod baseline;
pub mod cache;
pub mod config;
pub mod conflict;
pub mod error;
pub mod exporter;
pub mod lock;
pub mod logging;
pub mod matcher;
pub mod materializer;
pub mod orchestrator;
pub mod requirements;
pub mod validation;

pub use config::{BrainManifest, ConsumerManifest};
pub use error::SyncrError;
pub use materializer::{SyncResult, SyncStatus};

// vim: ts=4
