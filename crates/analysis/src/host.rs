use std::path::PathBuf;
use std::sync::Arc;

use kestrel_diagnostics::DiagnosticsStore;

use crate::file_parse::FileParse;
use crate::{AnalysisConfig, BufferParser, FileSource, FsSource, ParseQueue, ParserBackend, ProjectEntry, TextBuffer};

/// Wires configuration, the parse queue, the store, and a parser together.
#[derive(Clone)]
pub struct AnalysisHost {
	config: Arc<AnalysisConfig>,
	queue: ParseQueue,
	store: DiagnosticsStore,
	backend: Arc<dyn ParserBackend>,
	files: Arc<dyn FileSource>,
}

impl AnalysisHost {
	pub fn new(config: AnalysisConfig, store: DiagnosticsStore, backend: Arc<dyn ParserBackend>) -> Self {
		let queue = ParseQueue::new(config.max_concurrent_parses);
		Self {
			config: Arc::new(config),
			queue,
			store,
			backend,
			files: Arc::new(FsSource),
		}
	}

	/// Replaces the filesystem used by [`enqueue_file`](Self::enqueue_file).
	pub fn with_file_source(mut self, files: Arc<dyn FileSource>) -> Self {
		self.files = files;
		self
	}

	pub fn config(&self) -> &AnalysisConfig {
		&self.config
	}

	pub fn queue(&self) -> &ParseQueue {
		&self.queue
	}

	pub fn store(&self) -> &DiagnosticsStore {
		&self.store
	}

	/// Starts analysis of `buffers` as one group and schedules a first parse.
	pub fn attach(&self, entry: Arc<dyn ProjectEntry>, buffers: Vec<Arc<dyn TextBuffer>>) -> Arc<BufferParser> {
		let parser = BufferParser::new(entry, Arc::clone(&self.backend), self.store.clone(), self.queue.clone(), self.config.debounce());
		for buffer in buffers {
			if let Err(err) = parser.add_buffer(buffer) {
				tracing::debug!(error = %err, "analysis.attach_skipped");
			}
		}
		parser.request_reparse();
		parser
	}

	/// Parses `path` from storage on the parse queue.
	pub fn enqueue_file(&self, entry: Arc<dyn ProjectEntry>, path: impl Into<PathBuf>) {
		let path = path.into();
		let host = self.clone();
		self.queue.submit(move || {
			FileParse {
				source: host.files.as_ref(),
				backend: host.backend.as_ref(),
				store: &host.store,
				retry: &host.config.file_retry,
			}
			.run(entry.as_ref(), path);
		});
	}

	/// Resolves once every queued parse has finished.
	pub async fn wait_idle(&self) {
		self.queue.wait_idle().await;
	}
}
