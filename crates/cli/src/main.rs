//! Kestrel command-line driver.
//!
//! Runs every named file through the file parse path, waits for the parse
//! queue and the diagnostics store to settle, then prints one line per task
//! item. Exits with status 1 when any error was reported.

mod bracket;
mod cli;
mod entry;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use cli::Cli;
use kestrel_analysis::{AnalysisConfig, AnalysisHost};
use kestrel_diagnostics::{DiagnosticsStore, TaskCategory, TaskItem};
use kestrel_worker::UiThread;
use tracing::info;

use crate::bracket::BracketBackend;
use crate::entry::FileEntry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	setup_tracing(cli.verbose);

	let config = match &cli.config {
		Some(path) => AnalysisConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
		None => AnalysisConfig::default(),
	};
	info!(files = cli.files.len(), "kestrel.start");

	let ui = Arc::new(UiThread::spawn("kestrel-ui").context("spawning ui thread")?);
	let store = DiagnosticsStore::builder(ui.clone()).config(config.diagnostics.clone()).build();
	let host = AnalysisHost::new(config, store.clone(), Arc::new(BracketBackend));

	for path in &cli.files {
		if !path.exists() {
			tracing::warn!(path = %path.display(), "kestrel.file_missing");
		}
		host.enqueue_file(Arc::new(FileEntry::new(path)), path.clone());
	}
	host.wait_idle().await;
	store.flush().await.context("flushing diagnostics")?;

	let tasks = store.task_items();
	for task in &tasks {
		println!("{}", format_task(task));
	}
	let errors = tasks.iter().filter(|task| task.category == TaskCategory::Error).count();
	info!(diagnostics = tasks.len(), errors, "kestrel.done");

	store.dispose();
	ui.shutdown();

	if errors > 0 {
		std::process::exit(1);
	}
	Ok(())
}

fn category_label(category: TaskCategory) -> &'static str {
	match category {
		TaskCategory::Error => "error",
		TaskCategory::Warning => "warning",
		TaskCategory::Message => "note",
	}
}

/// `file:line:col: category: message`, one-based.
fn format_task(task: &TaskItem) -> String {
	format!(
		"{}:{}:{}: {}: {}",
		task.file,
		task.line + 1,
		task.column + 1,
		category_label(task.category),
		task.message
	)
}

fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_env("KESTREL_LOG")
		.or_else(|_| EnvFilter::try_from_default_env())
		.unwrap_or_else(|_| {
			if verbose {
				EnvFilter::new("kestrel=debug,info")
			} else {
				EnvFilter::new("kestrel=info,warn")
			}
		});

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}
