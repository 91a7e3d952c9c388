use clap::{Arg, ArgAction, Command};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use brainsync::config::brain::{BrainManifest, ExportPermission};
use brainsync::config::consumer::{
	load_consumer, parse_mapping_string, BrainEntry, ConsumerManifest,
};
use brainsync::error::SyncrError;
use brainsync::logging::{error, info, init_tracing};
use brainsync::materializer::SyncStatus;
use brainsync::{baseline, exporter, orchestrator};

const NEURONS_FILE: &str = ".neurons";
const BRAIN_FILE: &str = ".brain";

fn cli() -> Command {
	Command::new("brainsync")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Share files and directories between a brain repository and many consumers")
		.subcommand_required(true)
		.subcommand(
			Command::new("brain-init")
				.about("Write a new .brain manifest in the working directory")
				.arg(Arg::new("id").long("id").required(true))
				.arg(Arg::new("description").long("description"))
				.arg(
					Arg::new("export")
						.long("export")
						.value_name("PATTERN=PERMISSION")
						.action(ArgAction::Append),
				),
		)
		.subcommand(
			Command::new("add-brain")
				.about("Add or update a [BRAIN:<id>] entry")
				.arg(Arg::new("id").required(true))
				.arg(Arg::new("remote").required(true))
				.arg(Arg::new("branch")),
		)
		.subcommand(
			Command::new("add-neuron")
				.about("Add a mapping and immediately materialize it")
				.arg(Arg::new("mapping").value_name("brain_id::source::destination").required(true)),
		)
		.subcommand(
			Command::new("remove-neuron")
				.about("Drop a mapping")
				.arg(Arg::new("destination").required(true))
				.arg(Arg::new("delete").long("delete").action(ArgAction::SetTrue)),
		)
		.subcommand(
			Command::new("sync")
				.about("Synchronize neurons from their brains")
				.arg(Arg::new("destination")),
		)
		.subcommand(
			Command::new("list")
				.about("Enumerate mappings")
				.arg(Arg::new("verbose").short('v').long("verbose").action(ArgAction::SetTrue)),
		)
		.subcommand(
			Command::new("export")
				.about("Push a consumer-side edit back into its brain")
				.arg(Arg::new("path").required(true))
				.arg(Arg::new("force").long("force").action(ArgAction::SetTrue)),
		)
		.subcommand(Command::new("status").about("git status passthrough"))
		.subcommand(Command::new("pull").about("git pull passthrough, then auto-sync"))
		.subcommand(Command::new("push").about("git push passthrough"))
		.subcommand(
			Command::new("clone")
				.about("git clone passthrough, then auto-sync")
				.arg(Arg::new("args").action(ArgAction::Append).num_args(1..)),
		)
		.subcommand(
			Command::new("checkout")
				.about("git checkout passthrough")
				.arg(Arg::new("args").action(ArgAction::Append).num_args(1..)),
		)
		.subcommand(
			Command::new("init")
				.about("git init passthrough")
				.arg(Arg::new("args").action(ArgAction::Append).num_args(0..)),
		)
}

fn syncr_dir(consumer_root: &Path) -> PathBuf {
	consumer_root.join(".syncr")
}

fn load_manifest(consumer_root: &Path) -> Result<ConsumerManifest, SyncrError> {
	Ok(load_consumer(&consumer_root.join(NEURONS_FILE))?)
}

fn parse_export_arg(raw: &str) -> Result<(String, ExportPermission), SyncrError> {
	let (pattern, perm) = raw
		.split_once('=')
		.ok_or_else(|| SyncrError::Other { message: format!("invalid --export value (expected PATTERN=PERMISSION): {}", raw) })?;
	let permission: ExportPermission = perm
		.parse()
		.map_err(|e: String| SyncrError::Other { message: e })?;
	Ok((pattern.to_string(), permission))
}

fn handle_brain_init(matches: &clap::ArgMatches) -> Result<(), SyncrError> {
	let path = PathBuf::from(BRAIN_FILE);
	if path.exists() {
		return Err(SyncrError::Other { message: format!("{} already exists", BRAIN_FILE) });
	}

	let id = matches.get_one::<String>("id").expect("required");
	let mut manifest = BrainManifest::new(id.clone());
	manifest.description = matches.get_one::<String>("description").cloned();

	if let Some(values) = matches.get_many::<String>("export") {
		for raw in values {
			manifest.export.push(parse_export_arg(raw)?);
		}
	}
	if manifest.export.is_empty() {
		return Err(SyncrError::Other { message: "at least one --export entry is required".to_string() });
	}

	manifest.save(&path)?;
	info!(id = id.as_str(), "wrote {}", BRAIN_FILE);
	Ok(())
}

fn handle_add_brain(matches: &clap::ArgMatches) -> Result<(), SyncrError> {
	let consumer_root = PathBuf::from(".");
	let neurons_path = consumer_root.join(NEURONS_FILE);

	let mut manifest = if neurons_path.exists() {
		load_manifest(&consumer_root)?
	} else {
		ConsumerManifest::new()
	};

	let id = matches.get_one::<String>("id").expect("required").clone();
	let remote = matches.get_one::<String>("remote").expect("required").clone();
	let branch = matches.get_one::<String>("branch").cloned().unwrap_or_else(|| "main".to_string());

	let branch_changed = manifest.brain(&id).map(|b| b.branch != branch).unwrap_or(false);

	manifest.brains.retain(|b| b.id != id);
	manifest.brains.push(BrainEntry { id: id.clone(), remote, branch });
	manifest.save(&neurons_path)?;

	if branch_changed {
		let destinations: Vec<String> = manifest
			.mappings()?
			.into_iter()
			.filter(|m| m.brain_id == id)
			.map(|m| m.destination)
			.collect();
		if !destinations.is_empty() {
			let store = baseline::BaselineStore::open(&syncr_dir(&consumer_root).join("baseline.redb"))?;
			store.clear_brain(&destinations)?;
			info!(brain_id = id.as_str(), "branch changed, baseline invalidated for this brain's mappings");
		}
	}

	info!(brain_id = id.as_str(), "added/updated brain entry");
	Ok(())
}

async fn handle_add_neuron(matches: &clap::ArgMatches) -> Result<(), SyncrError> {
	let consumer_root = PathBuf::from(".");
	let neurons_path = consumer_root.join(NEURONS_FILE);
	let mut manifest = load_manifest(&consumer_root)?;

	let raw = matches.get_one::<String>("mapping").expect("required");
	let (brain_id, source, destination) = parse_mapping_string(raw)?;

	manifest.map.push(brainsync::config::consumer::MapEntry {
		key: destination.trim_end_matches('/').replace('/', "_"),
		brain_id,
		source,
		destination: destination.clone(),
	});
	manifest.mappings()?; // validate before persisting
	manifest.save(&neurons_path)?;

	let result = orchestrator::sync_one(&syncr_dir(&consumer_root), &consumer_root, &manifest, &destination, false).await?;
	print_result(&result);
	Ok(())
}

fn handle_remove_neuron(matches: &clap::ArgMatches) -> Result<(), SyncrError> {
	let consumer_root = PathBuf::from(".");
	let neurons_path = consumer_root.join(NEURONS_FILE);
	let mut manifest = load_manifest(&consumer_root)?;

	let destination = matches.get_one::<String>("destination").expect("required").clone();
	let before = manifest.map.len();
	manifest.map.retain(|m| m.destination != destination);
	if manifest.map.len() == before {
		return Err(SyncrError::from(brainsync::error::SyncError::UnknownDestination { destination }));
	}
	manifest.save(&neurons_path)?;

	let store = baseline::BaselineStore::open(&syncr_dir(&consumer_root).join("baseline.redb"))?;
	store.clear_brain(std::slice::from_ref(&destination))?;

	if matches.get_flag("delete") {
		let target = consumer_root.join(destination.trim_end_matches('/'));
		if target.is_dir() {
			std::fs::remove_dir_all(&target)?;
		} else if target.exists() {
			std::fs::remove_file(&target)?;
		}
	}

	info!(destination = destination.as_str(), "removed mapping");
	Ok(())
}

fn print_result(result: &brainsync::materializer::SyncResult) {
	match result.status {
		SyncStatus::Success => println!("{}: synced", result.destination),
		SyncStatus::Skipped => println!("{}: skipped{}", result.destination, suffix(result)),
		SyncStatus::Conflict => println!("{}: conflict resolved{}", result.destination, suffix(result)),
		SyncStatus::Error => println!("{}: ERROR{}", result.destination, suffix(result)),
	}
}

fn suffix(result: &brainsync::materializer::SyncResult) -> String {
	result.message.as_ref().map(|m| format!(" ({})", m)).unwrap_or_default()
}

async fn handle_sync(matches: &clap::ArgMatches, is_interactive: bool) -> Result<bool, SyncrError> {
	let consumer_root = PathBuf::from(".");
	let manifest = load_manifest(&consumer_root)?;

	let mut all_ok = true;
	if let Some(destination) = matches.get_one::<String>("destination") {
		let result = orchestrator::sync_one(&syncr_dir(&consumer_root), &consumer_root, &manifest, destination, is_interactive).await?;
		all_ok = result.status != SyncStatus::Error;
		print_result(&result);
	} else {
		let results = orchestrator::sync_all(&syncr_dir(&consumer_root), &consumer_root, &manifest, is_interactive).await?;
		for result in &results {
			if result.status == SyncStatus::Error {
				all_ok = false;
			}
			print_result(result);
		}
	}
	Ok(all_ok)
}

fn handle_list(matches: &clap::ArgMatches) -> Result<(), SyncrError> {
	let consumer_root = PathBuf::from(".");
	let manifest = load_manifest(&consumer_root)?;
	let mappings = manifest.mappings()?;
	let verbose = matches.get_flag("verbose");

	let store = if verbose {
		Some(baseline::BaselineStore::open(&syncr_dir(&consumer_root).join("baseline.redb"))?)
	} else {
		None
	};

	for mapping in &mappings {
		println!("{}::{}::{}", mapping.brain_id, mapping.source, mapping.destination);
		if let Some(store) = &store {
			match store.get(&mapping.destination)? {
				Some(entry) => println!("    brain_head={} (last computed state, not re-diffed)", entry.brain_head),
				None => println!("    not yet synced"),
			}
		}
	}
	Ok(())
}

async fn handle_export(matches: &clap::ArgMatches) -> Result<(), SyncrError> {
	let consumer_root = PathBuf::from(".");
	let manifest = load_manifest(&consumer_root)?;
	let path = matches.get_one::<String>("path").expect("required");
	let force = matches.get_flag("force");

	let result = exporter::export(&syncr_dir(&consumer_root), &consumer_root, &manifest, path, force).await?;
	println!("{}: exported to {} at {}", result.destination, result.source, result.commit);
	Ok(())
}

async fn run_git(args: &[&str]) -> Result<std::process::ExitStatus, SyncrError> {
	tokio::process::Command::new("git")
		.args(args)
		.status()
		.await
		.map_err(SyncrError::from)
}

async fn auto_sync_if_configured(consumer_root: &Path) -> Result<bool, SyncrError> {
	let neurons_path = consumer_root.join(NEURONS_FILE);
	if !neurons_path.exists() {
		return Ok(true);
	}
	let manifest = load_manifest(consumer_root)?;
	if !manifest.sync_policy.auto_sync_on_pull {
		return Ok(true);
	}
	info!("AUTO_SYNC_ON_PULL is enabled, running sync");
	let results = orchestrator::sync_all(&syncr_dir(consumer_root), consumer_root, &manifest, false).await?;
	for result in &results {
		print_result(result);
	}
	Ok(results.iter().all(|r| r.status != SyncStatus::Error))
}

fn collect_passthrough_args(matches: &clap::ArgMatches) -> Vec<String> {
	matches.get_many::<String>("args").map(|v| v.cloned().collect()).unwrap_or_default()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
	init_tracing();
	brainsync::lock::setup_signal_handlers();

	let matches = cli().get_matches();
	let consumer_root = PathBuf::from(".");

	let result: Result<bool, SyncrError> = match matches.subcommand() {
		Some(("brain-init", sub)) => handle_brain_init(sub).map(|_| true),
		Some(("add-brain", sub)) => handle_add_brain(sub).map(|_| true),
		Some(("add-neuron", sub)) => handle_add_neuron(sub).await.map(|_| true),
		Some(("remove-neuron", sub)) => handle_remove_neuron(sub).map(|_| true),
		Some(("sync", sub)) => handle_sync(sub, std::io::stdin().is_terminal()).await,
		Some(("list", sub)) => handle_list(sub).map(|_| true),
		Some(("export", sub)) => handle_export(sub).await.map(|_| true),
		Some(("status", _)) => run_git(&["status"]).await.map(|s| s.success()),
		Some(("push", _)) => run_git(&["push"]).await.map(|s| s.success()),
		Some(("pull", _)) => async {
			let status = run_git(&["pull"]).await?;
			if !status.success() {
				return Ok(false);
			}
			auto_sync_if_configured(&consumer_root).await
		}
		.await,
		Some(("clone", sub)) => {
			let args = collect_passthrough_args(sub);
			let mut full = vec!["clone".to_string()];
			full.extend(args.clone());
			async {
				let status = tokio::process::Command::new("git")
					.args(&full)
					.status()
					.await
					.map_err(SyncrError::from)?;
				if !status.success() {
					return Ok(false);
				}
				// best-effort: the clone target is the last positional arg, or "."
				let target = args.last().cloned().unwrap_or_else(|| ".".to_string());
				auto_sync_if_configured(Path::new(&target)).await
			}
			.await
		}
		Some(("checkout", sub)) => {
			let mut full = vec!["checkout".to_string()];
			full.extend(collect_passthrough_args(sub));
			run_git(&full.iter().map(String::as_str).collect::<Vec<_>>()).await.map(|s| s.success())
		}
		Some(("init", sub)) => {
			let mut full = vec!["init".to_string()];
			full.extend(collect_passthrough_args(sub));
			run_git(&full.iter().map(String::as_str).collect::<Vec<_>>()).await.map(|s| s.success())
		}
		_ => unreachable!("subcommand_required enforces one of the above"),
	};

	match result {
		Ok(true) => ExitCode::from(0),
		Ok(false) => ExitCode::from(1),
		Err(e) => {
			error!("{}", e);
			eprintln!("error: {}", e);
			ExitCode::from(1)
		}
	}
}

// vim: ts=4
