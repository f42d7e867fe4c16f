//! Parse path for sources without a live buffer.
//!
//! Opening can fail transiently while another process holds the file; those
//! reads are retried with a fixed backoff. Whatever happens, the project
//! entry gets exactly one tree update and the store gets one replace, so a
//! failed read shows up as "no diagnostics" rather than stale ones.

use std::io;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::time::Instant;

use kestrel_diagnostics::{DiagnosticItem, DiagnosticLevel, DiagnosticsStore, EntryKey};
use kestrel_worker::panic_message;

use crate::{AnalysisError, BufferSnapshot, FileRetryConfig, ParseCookie, ParseOutcome, ParserBackend, ProjectEntry};

/// Reads source text from storage.
pub trait FileSource: Send + Sync {
	fn read(&self, path: &Path) -> io::Result<String>;
}

/// [`FileSource`] backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSource;

impl FileSource for FsSource {
	fn read(&self, path: &Path) -> io::Result<String> {
		std::fs::read_to_string(path)
	}
}

/// Returns true for errors caused by another holder of the file.
pub fn is_transient(err: &io::Error) -> bool {
	// ERROR_SHARING_VIOLATION and ERROR_LOCK_VIOLATION.
	if cfg!(windows) && matches!(err.raw_os_error(), Some(32 | 33)) {
		return true;
	}
	matches!(
		err.kind(),
		io::ErrorKind::PermissionDenied | io::ErrorKind::WouldBlock | io::ErrorKind::ResourceBusy
	)
}

/// Reads `path`, retrying transient failures up to `retry.attempts` times.
pub fn read_with_retry(source: &dyn FileSource, path: &Path, retry: &FileRetryConfig) -> Result<String, AnalysisError> {
	let attempts = retry.attempts.max(1);
	let mut attempt = 0;
	loop {
		attempt += 1;
		match source.read(path) {
			Ok(text) => return Ok(text),
			Err(err) if is_transient(&err) => {
				if attempt >= attempts {
					return Err(AnalysisError::RetriesExhausted {
						path: path.to_path_buf(),
						attempts,
					});
				}
				tracing::trace!(path = %path.display(), attempt, error = %err, "analysis.file_retry");
				std::thread::sleep(retry.backoff());
			}
			Err(error) => {
				return Err(AnalysisError::Io {
					path: path.to_path_buf(),
					source: error,
				});
			}
		}
	}
}

/// Everything a file parse needs, borrowed from the host.
pub(crate) struct FileParse<'a> {
	pub source: &'a dyn FileSource,
	pub backend: &'a dyn ParserBackend,
	pub store: &'a DiagnosticsStore,
	pub retry: &'a FileRetryConfig,
}

impl FileParse<'_> {
	pub(crate) fn run(&self, entry: &dyn ProjectEntry, path: PathBuf) {
		let started = Instant::now();
		let outcome = match read_with_retry(self.source, &path, self.retry) {
			Ok(text) => self.parse(&path, text),
			Err(AnalysisError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
				tracing::debug!(path = %path.display(), "analysis.file_missing");
				ParseOutcome::default()
			}
			Err(err) => {
				tracing::warn!(error = %err, "analysis.file_unreadable");
				ParseOutcome::default()
			}
		};

		let version = Some(BufferSnapshot::FILE_VERSION);
		let items = outcome
			.diagnostics
			.into_iter()
			.map(|d| DiagnosticItem::new(d.message, d.span, d.severity, DiagnosticLevel::SYNTAX, version))
			.collect::<Vec<_>>();
		tracing::debug!(
			path = %path.display(),
			diagnostics = items.len(),
			elapsed_ms = started.elapsed().as_millis() as u64,
			"analysis.file_parsed"
		);
		let display = path.to_string_lossy();
		let key = EntryKey::parser(Some(&*display));
		if let Err(err) = self.store.replace(key, items, DiagnosticLevel::SYNTAX) {
			tracing::debug!(path = %path.display(), error = %err, "analysis.publish_dropped");
		}
		entry.update_tree(outcome.tree, Some(ParseCookie::File { path }));
	}

	fn parse(&self, path: &Path, text: String) -> ParseOutcome {
		let snapshot = BufferSnapshot::from_file(text);
		match catch_unwind(AssertUnwindSafe(|| self.backend.parse(std::slice::from_ref(&snapshot)))) {
			Ok(outcome) => outcome,
			Err(payload) => {
				let message = panic_message(payload.as_ref()).unwrap_or_else(|| "<opaque panic payload>".to_string());
				tracing::warn!(path = %path.display(), panic = %message, "analysis.parse_panicked");
				ParseOutcome::default()
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicU32, Ordering};

	use super::*;

	struct Flaky {
		failures: u32,
		kind: io::ErrorKind,
		calls: AtomicU32,
	}

	impl FileSource for Flaky {
		fn read(&self, _path: &Path) -> io::Result<String> {
			let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
			if call <= self.failures {
				Err(io::Error::from(self.kind))
			} else {
				Ok("ok".to_string())
			}
		}
	}

	fn retry(attempts: u32) -> FileRetryConfig {
		FileRetryConfig { attempts, backoff_ms: 1 }
	}

	#[test]
	fn transient_failures_are_retried() {
		let source = Flaky {
			failures: 3,
			kind: io::ErrorKind::PermissionDenied,
			calls: AtomicU32::new(0),
		};
		let text = read_with_retry(&source, Path::new("a.py"), &retry(10)).unwrap();
		assert_eq!(text, "ok");
		assert_eq!(source.calls.load(Ordering::SeqCst), 4);
	}

	#[test]
	fn retries_stop_at_the_bound() {
		let source = Flaky {
			failures: u32::MAX,
			kind: io::ErrorKind::PermissionDenied,
			calls: AtomicU32::new(0),
		};
		let err = read_with_retry(&source, Path::new("a.py"), &retry(4)).unwrap_err();
		assert!(matches!(err, AnalysisError::RetriesExhausted { attempts: 4, .. }));
		assert_eq!(source.calls.load(Ordering::SeqCst), 4);
	}

	#[test]
	fn missing_file_is_not_retried() {
		let source = Flaky {
			failures: u32::MAX,
			kind: io::ErrorKind::NotFound,
			calls: AtomicU32::new(0),
		};
		let err = read_with_retry(&source, Path::new("a.py"), &retry(10)).unwrap_err();
		assert!(matches!(err, AnalysisError::Io { .. }));
		assert_eq!(source.calls.load(Ordering::SeqCst), 1);
	}
}
