use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::EntryKey;

/// Handle of a live text buffer (view) that can display squiggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u64);

impl std::fmt::Display for BufferId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "buffer#{}", self.0)
	}
}

/// Which live buffers render squiggles for which [`EntryKey`].
///
/// Independent of the diagnostics table: a key may be registered before any
/// diagnostics exist for it, and diagnostics may exist with no live buffer.
#[derive(Debug, Default)]
pub struct ErrorSourceRegistry {
	inner: Mutex<FxHashMap<EntryKey, FxHashSet<BufferId>>>,
}

impl ErrorSourceRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Subscribes `buffer` to squiggle updates for `key`. Returns false if already subscribed.
	pub fn add(&self, key: EntryKey, buffer: BufferId) -> bool {
		self.inner.lock().entry(key).or_default().insert(buffer)
	}

	/// Unsubscribes `buffer` from `key`, dropping the key once no buffer remains.
	pub fn remove(&self, key: &EntryKey, buffer: BufferId) -> bool {
		let mut inner = self.inner.lock();
		let Some(buffers) = inner.get_mut(key) else {
			return false;
		};
		let removed = buffers.remove(&buffer);
		if buffers.is_empty() {
			inner.remove(key);
		}
		removed
	}

	/// Unsubscribes `buffer` from every key. Returns the number of keys it left.
	pub fn remove_buffer(&self, buffer: BufferId) -> usize {
		let mut removed = 0;
		self.inner.lock().retain(|_, buffers| {
			if buffers.remove(&buffer) {
				removed += 1;
			}
			!buffers.is_empty()
		});
		removed
	}

	pub fn buffers(&self, key: &EntryKey) -> Vec<BufferId> {
		let mut buffers: Vec<_> = self.inner.lock().get(key).map(|set| set.iter().copied().collect()).unwrap_or_default();
		buffers.sort_unstable();
		buffers
	}

	/// Copies the registry out so callers never hold its lock.
	pub fn snapshot(&self) -> Vec<(EntryKey, Vec<BufferId>)> {
		self.inner
			.lock()
			.iter()
			.map(|(key, buffers)| (key.clone(), buffers.iter().copied().collect()))
			.collect()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.lock().is_empty()
	}
}
