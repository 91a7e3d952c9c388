//! Brain Cache (§4.3) — a local, sparse, branch-pinned git working copy per
//! brain id, populated only with the paths a consumer's `[MAP]` needs.
//!
//! All git operations shell out to the host's `git` binary via
//! `tokio::process::Command`, matching the subprocess-spawning style already
//! used for inter-process connections elsewhere in this codebase. No
//! embedded git library is linked.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::error::CacheError;

/// A materialized, sparse working copy of one brain, pinned to a branch.
#[derive(Debug, Clone)]
pub struct CacheHandle {
	pub brain_id: String,
	pub root: PathBuf,
}

impl CacheHandle {
	/// Absolute path to `source` within the working copy.
	pub fn path(&self, source: &str) -> PathBuf {
		self.root.join(source)
	}
}

async fn run_git(root: &Path, args: &[&str], brain_id: &str, fail: impl Fn(String) -> CacheError) -> Result<String, CacheError> {
	let output = Command::new("git")
		.current_dir(root)
		.args(args)
		.stdin(Stdio::null())
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.output()
		.await
		.map_err(|e| fail(format!("failed to spawn git {:?}: {}", args, e)))?;

	if !output.status.success() {
		let stderr = String::from_utf8_lossy(&output.stderr);
		return Err(fail(format!("git {:?} failed in {}: {}", args, brain_id, stderr.trim())));
	}

	Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// `ensure(brain_id, remote, branch, required_paths) → CacheHandle` (§4.3)
pub async fn ensure(
	syncr_dir: &Path,
	brain_id: &str,
	remote: &str,
	branch: &str,
	required_paths: &[String],
) -> Result<CacheHandle, CacheError> {
	let root = syncr_dir.join("brains").join(brain_id);
	let fetch_err = |brain_id: &str| move |message: String| CacheError::Fetch { brain_id: brain_id.to_string(), message };
	let checkout_err = |brain_id: &str| move |message: String| CacheError::Checkout { brain_id: brain_id.to_string(), message };

	let is_new = !root.join(".git").exists();

	if is_new {
		tokio::fs::create_dir_all(&root)
			.await
			.map_err(|e| CacheError::Fetch { brain_id: brain_id.to_string(), message: e.to_string() })?;
		run_git(&root, &["init"], brain_id, checkout_err(brain_id)).await?;
		run_git(&root, &["remote", "add", "origin", remote], brain_id, checkout_err(brain_id)).await?;
		run_git(&root, &["sparse-checkout", "init", "--cone"], brain_id, checkout_err(brain_id)).await?;
	} else {
		run_git(&root, &["remote", "set-url", "origin", remote], brain_id, checkout_err(brain_id)).await?;
	}

	let mut sparse_args: Vec<&str> = vec!["sparse-checkout", "set"];
	for p in required_paths {
		sparse_args.push(p.as_str());
	}
	run_git(&root, &sparse_args, brain_id, checkout_err(brain_id)).await?;

	run_git(&root, &["fetch", "origin", branch], brain_id, fetch_err(brain_id)).await?;

	if is_new {
		run_git(&root, &["checkout", "FETCH_HEAD"], brain_id, checkout_err(brain_id)).await?;
	} else {
		let remote_ref = format!("origin/{}", branch);
		run_git(&root, &["reset", "--hard", &remote_ref], brain_id, checkout_err(brain_id)).await?;
	}

	Ok(CacheHandle { brain_id: brain_id.to_string(), root })
}

/// `readFile(handle, source) → bytes` (§4.3)
pub async fn read_file(handle: &CacheHandle, source: &str) -> Result<Vec<u8>, CacheError> {
	tokio::fs::read(handle.path(source)).await.map_err(CacheError::Io)
}

/// `listDir(handle, source) → iter<file-entry>` (§4.3)
///
/// Returns paths relative to `source`, recursively, in no particular order.
pub async fn list_dir(handle: &CacheHandle, source: &str) -> Result<Vec<String>, CacheError> {
	let root = handle.path(source);
	let mut out = Vec::new();
	let mut stack = vec![PathBuf::new()];

	while let Some(rel) = stack.pop() {
		let dir = root.join(&rel);
		let mut entries = tokio::fs::read_dir(&dir).await.map_err(CacheError::Io)?;
		while let Some(entry) = entries.next_entry().await.map_err(CacheError::Io)? {
			if entry.file_name() == ".git" {
				continue;
			}
			let entry_rel = rel.join(entry.file_name());
			let file_type = entry.file_type().await.map_err(CacheError::Io)?;
			if file_type.is_dir() {
				stack.push(entry_rel);
			} else {
				out.push(entry_rel.to_string_lossy().replace('\\', "/"));
			}
		}
	}

	Ok(out)
}

/// `writePath(handle, source, bytes)` (§4.3)
pub async fn write_path(handle: &CacheHandle, source: &str, bytes: &[u8]) -> Result<(), CacheError> {
	let dest = handle.path(source);
	if let Some(parent) = dest.parent() {
		tokio::fs::create_dir_all(parent).await.map_err(CacheError::Io)?;
	}
	tokio::fs::write(dest, bytes).await.map_err(CacheError::Io)
}

/// `commit(handle, message)` (§4.3)
pub async fn commit(handle: &CacheHandle, message: &str) -> Result<(), CacheError> {
	let push_err = |brain_id: &str| move |m: String| CacheError::Push { brain_id: brain_id.to_string(), message: m };
	run_git(&handle.root, &["add", "-A"], &handle.brain_id, push_err(&handle.brain_id)).await?;
	run_git(&handle.root, &["commit", "-m", message], &handle.brain_id, push_err(&handle.brain_id)).await?;
	Ok(())
}

/// `push(handle)` (§4.3)
pub async fn push(handle: &CacheHandle, branch: &str) -> Result<(), CacheError> {
	let push_err = |brain_id: &str| move |m: String| CacheError::Push { brain_id: brain_id.to_string(), message: m };
	let refspec = format!("HEAD:{}", branch);
	run_git(&handle.root, &["push", "origin", &refspec], &handle.brain_id, push_err(&handle.brain_id)).await?;
	Ok(())
}

/// `headCommit(handle) → string` (§4.3)
pub async fn head_commit(handle: &CacheHandle) -> Result<String, CacheError> {
	let fetch_err = |brain_id: &str| move |m: String| CacheError::Fetch { brain_id: brain_id.to_string(), message: m };
	run_git(&handle.root, &["rev-parse", "HEAD"], &handle.brain_id, fetch_err(&handle.brain_id)).await
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::process::Command as StdCommand;
	use tempfile::TempDir;

	fn init_bare_remote(dir: &Path) {
		StdCommand::new("git").arg("init").arg("--bare").arg(dir).output().unwrap();
	}

	fn seed_remote(remote: &Path, files: &[(&str, &str)]) {
		let work = TempDir::new().unwrap();
		StdCommand::new("git").current_dir(work.path()).args(["init"]).output().unwrap();
		StdCommand::new("git")
			.current_dir(work.path())
			.args(["config", "user.email", "t@example.com"])
			.output()
			.unwrap();
		StdCommand::new("git")
			.current_dir(work.path())
			.args(["config", "user.name", "t"])
			.output()
			.unwrap();
		for (path, content) in files {
			let full = work.path().join(path);
			std::fs::create_dir_all(full.parent().unwrap()).unwrap();
			std::fs::write(&full, content).unwrap();
		}
		StdCommand::new("git").current_dir(work.path()).args(["add", "-A"]).output().unwrap();
		StdCommand::new("git")
			.current_dir(work.path())
			.args(["commit", "-m", "seed"])
			.output()
			.unwrap();
		StdCommand::new("git")
			.current_dir(work.path())
			.args(["branch", "-M", "main"])
			.output()
			.unwrap();
		StdCommand::new("git")
			.current_dir(work.path())
			.args(["remote", "add", "origin", remote.to_str().unwrap()])
			.output()
			.unwrap();
		StdCommand::new("git").current_dir(work.path()).args(["push", "origin", "main"]).output().unwrap();
	}

	#[tokio::test]
	async fn test_ensure_materializes_required_paths() {
		let remote_dir = TempDir::new().unwrap();
		init_bare_remote(remote_dir.path());
		seed_remote(remote_dir.path(), &[("core_logic/utils.py", "x = 1\n"), ("unrelated/file.txt", "skip\n")]);

		let syncr_dir = TempDir::new().unwrap();
		let handle = ensure(
			syncr_dir.path(),
			"my_local_brain",
			remote_dir.path().to_str().unwrap(),
			"main",
			&["core_logic".to_string()],
		)
		.await
		.unwrap();

		let bytes = read_file(&handle, "core_logic/utils.py").await.unwrap();
		assert_eq!(bytes, b"x = 1\n");
	}

	#[tokio::test]
	async fn test_list_dir_recurses() {
		let remote_dir = TempDir::new().unwrap();
		init_bare_remote(remote_dir.path());
		seed_remote(remote_dir.path(), &[("pkg/a.py", "a"), ("pkg/nested/b.py", "b")]);

		let syncr_dir = TempDir::new().unwrap();
		let handle =
			ensure(syncr_dir.path(), "brain", remote_dir.path().to_str().unwrap(), "main", &["pkg".to_string()])
				.await
				.unwrap();

		let mut entries = list_dir(&handle, "pkg").await.unwrap();
		entries.sort();
		assert_eq!(entries, vec!["a.py".to_string(), "nested/b.py".to_string()]);
	}

	#[tokio::test]
	async fn test_head_commit_is_stable_hash() {
		let remote_dir = TempDir::new().unwrap();
		init_bare_remote(remote_dir.path());
		seed_remote(remote_dir.path(), &[("f.txt", "x")]);

		let syncr_dir = TempDir::new().unwrap();
		let handle =
			ensure(syncr_dir.path(), "brain", remote_dir.path().to_str().unwrap(), "main", &["f.txt".to_string()])
				.await
				.unwrap();

		let head = head_commit(&handle).await.unwrap();
		assert_eq!(head.len(), 40);
	}
}

// vim: ts=4
