#![allow(unused_crate_dependencies)]

mod common;

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use common::{RecordingEntry, harness};
use kestrel_analysis::{FileSource, ParseCookie};
use kestrel_diagnostics::{DiagnosticItem, DiagnosticLevel, EntryKey, Severity, SnapshotVersion, SourcePosition, SourceSpan};
use pretty_assertions::assert_eq;

struct Locked {
	reads: AtomicU32,
}

impl FileSource for Locked {
	fn read(&self, _path: &Path) -> io::Result<String> {
		self.reads.fetch_add(1, Ordering::SeqCst);
		Err(io::Error::from(io::ErrorKind::PermissionDenied))
	}
}

fn stale_item() -> DiagnosticItem {
	let span = SourceSpan::new(SourcePosition::new(0, 0, 0), SourcePosition::new(5, 0, 5));
	DiagnosticItem::new("stale", span, Severity::Error, DiagnosticLevel::SYNTAX, Some(SnapshotVersion::new(9)))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn file_on_disk_is_parsed_and_published() {
	let h = harness(10);
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("module.py");
	std::fs::write(&path, "import os\n\nprint(os)\n").unwrap();
	let path_str = path.to_string_lossy().into_owned();
	let entry = RecordingEntry::new(Some(path_str.as_str()));

	h.host.enqueue_file(entry.clone(), path.clone());
	h.host.wait_idle().await;
	h.host.store().flush().await.unwrap();

	let key = EntryKey::parser(Some(path_str.as_str()));
	let messages: Vec<_> = h.host.store().items(&key).iter().map(|i| i.message().to_string()).collect();
	assert_eq!(messages, vec!["import os", "print(os)"]);
	assert_eq!(entry.updates.lock().clone(), vec![(true, Some(ParseCookie::File { path }))]);

	let tasks = h.host.store().task_items();
	assert_eq!(tasks.len(), 2);
	assert_eq!(tasks[0].file, path_str);
	assert_eq!((tasks[1].line, tasks[1].column), (2, 0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn missing_file_clears_stale_diagnostics_with_one_update() {
	let h = harness(10);
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("gone.py");
	let path_str = path.to_string_lossy().into_owned();
	let key = EntryKey::parser(Some(path_str.as_str()));
	h.host.store().append(key.clone(), vec![stale_item()]).unwrap();
	h.host.store().flush().await.unwrap();
	assert_eq!(h.host.store().items(&key).len(), 1);

	let entry = RecordingEntry::new(Some(path_str.as_str()));
	h.host.enqueue_file(entry.clone(), path.clone());
	h.host.wait_idle().await;
	h.host.store().flush().await.unwrap();

	assert!(h.host.store().items(&key).is_empty());
	assert_eq!(entry.updates.lock().clone(), vec![(false, Some(ParseCookie::File { path }))]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn locked_file_gives_up_after_configured_attempts() {
	let h = harness(10);
	let source = Arc::new(Locked { reads: AtomicU32::new(0) });
	let host = h.host.clone().with_file_source(source.clone());
	let entry = RecordingEntry::new(Some("locked.py"));

	host.enqueue_file(entry.clone(), "locked.py");
	host.wait_idle().await;

	assert_eq!(source.reads.load(Ordering::SeqCst), host.config().file_retry.attempts);
	assert_eq!(entry.update_count(), 1);
	assert_eq!(entry.last_update().map(|(tree, _)| tree), Some(false));
}
