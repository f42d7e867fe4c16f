use std::path::Path;

use kestrel_analysis::{ParseCookie, ProjectEntry, SyntaxTree};

use crate::bracket::BracketTree;

/// Project entry for a file named on the command line.
pub struct FileEntry {
	path: String,
}

impl FileEntry {
	pub fn new(path: &Path) -> Self {
		Self {
			path: path.to_string_lossy().into_owned(),
		}
	}
}

impl ProjectEntry for FileEntry {
	fn file_path(&self) -> Option<&str> {
		Some(&self.path)
	}

	fn on_analysis_stopped(&self) {
		tracing::debug!(path = %self.path, "kestrel.analysis_stopped");
	}

	fn update_tree(&self, tree: Option<SyntaxTree>, cookie: Option<ParseCookie>) {
		let depth = tree.as_ref().and_then(|tree| tree.downcast_ref::<BracketTree>()).map(|tree| tree.max_depth);
		tracing::debug!(path = %self.path, depth = ?depth, cookie = ?cookie, "kestrel.tree_updated");
	}
}
