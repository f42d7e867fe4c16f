use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identity of a diagnostics source: file path plus logical sub-source.
///
/// Filepath comparison is case-insensitive, moniker comparison is exact.
/// [`EntryKey::EMPTY`] (both parts absent) marks ephemeral sources such as a
/// REPL; as a clear target it addresses every key.
#[derive(Clone)]
pub struct EntryKey {
	filepath: Option<Arc<str>>,
	moniker: Option<Arc<str>>,
}

impl EntryKey {
	/// Moniker under which parser diagnostics are stored.
	pub const PARSER_MONIKER: &'static str = "parser";

	pub const EMPTY: Self = Self {
		filepath: None,
		moniker: None,
	};

	pub fn new(filepath: Option<&str>, moniker: Option<&str>) -> Self {
		Self {
			filepath: filepath.map(Arc::from),
			moniker: moniker.map(Arc::from),
		}
	}

	/// Key for parser diagnostics of the source at `filepath`.
	pub fn parser(filepath: Option<&str>) -> Self {
		Self::new(filepath, Some(Self::PARSER_MONIKER))
	}

	pub fn filepath(&self) -> Option<&str> {
		self.filepath.as_deref()
	}

	pub fn moniker(&self) -> Option<&str> {
		self.moniker.as_deref()
	}

	pub fn is_empty(&self) -> bool {
		self.filepath.is_none() && self.moniker.is_none()
	}

	/// Returns true if items under this key belong in the navigable task list.
	pub fn is_navigable(&self) -> bool {
		self.filepath.is_some()
	}

	/// Case-insensitive filepath prefix test. Keys without a filepath never match.
	pub fn filepath_starts_with(&self, prefix: &str) -> bool {
		let Some(path) = self.filepath.as_deref() else {
			return false;
		};
		let mut path = path.chars().flat_map(char::to_lowercase);
		prefix.chars().flat_map(char::to_lowercase).all(|p| path.next() == Some(p))
	}
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
	a.eq_ignore_ascii_case(b) || a.chars().flat_map(char::to_lowercase).eq(b.chars().flat_map(char::to_lowercase))
}

impl PartialEq for EntryKey {
	fn eq(&self, other: &Self) -> bool {
		let paths = match (self.filepath.as_deref(), other.filepath.as_deref()) {
			(Some(a), Some(b)) => eq_ignore_case(a, b),
			(None, None) => true,
			_ => false,
		};
		paths && self.moniker == other.moniker
	}
}

impl Eq for EntryKey {}

impl Hash for EntryKey {
	fn hash<H: Hasher>(&self, state: &mut H) {
		match self.filepath.as_deref() {
			Some(path) => {
				state.write_u8(1);
				for c in path.chars().flat_map(char::to_lowercase) {
					c.hash(state);
				}
			}
			None => state.write_u8(0),
		}
		self.moniker.hash(state);
	}
}

impl fmt::Debug for EntryKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "EntryKey({self})")
	}
}

impl fmt::Display for EntryKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match (self.filepath(), self.moniker()) {
			(None, None) => f.write_str("<empty>"),
			(path, moniker) => write!(f, "{}#{}", path.unwrap_or("<ephemeral>"), moniker.unwrap_or("")),
		}
	}
}
