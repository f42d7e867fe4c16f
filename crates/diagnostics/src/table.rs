//! Keyed diagnostic lists owned by the store's consumer.

use rustc_hash::FxHashMap;

use crate::{DiagnosticItem, DiagnosticLevel, EntryKey};

/// Mapping from [`EntryKey`] to its diagnostics, in insertion order.
///
/// Every mutator returns whether the table changed. Keys whose list becomes
/// empty are dropped.
#[derive(Debug, Default, Clone)]
pub struct DiagnosticsTable {
	entries: FxHashMap<EntryKey, Vec<DiagnosticItem>>,
}

impl DiagnosticsTable {
	pub fn new() -> Self {
		Self::default()
	}

	/// Replaces the `level` slice of `key` with `items`; other levels are kept.
	pub fn replace(&mut self, key: EntryKey, items: Vec<DiagnosticItem>, level: DiagnosticLevel) -> bool {
		match self.entries.get_mut(&key) {
			None => {
				if items.is_empty() {
					return false;
				}
				self.entries.insert(key, items);
				true
			}
			Some(existing) => {
				let before = existing.len();
				existing.retain(|item| !level.matches(item.level()));
				let changed = existing.len() != before || !items.is_empty();
				existing.extend(items);
				if existing.is_empty() {
					self.entries.remove(&key);
				}
				changed
			}
		}
	}

	pub fn append(&mut self, key: EntryKey, items: Vec<DiagnosticItem>) -> bool {
		if items.is_empty() {
			return false;
		}
		self.entries.entry(key).or_default().extend(items);
		true
	}

	/// Clears `level` items under `key`, or under every key when `key` is
	/// [`EntryKey::EMPTY`].
	pub fn clear(&mut self, key: &EntryKey, level: DiagnosticLevel) -> bool {
		if key.is_empty() {
			if level == DiagnosticLevel::ALL {
				let changed = !self.entries.is_empty();
				self.entries.clear();
				return changed;
			}
			return self.retain_keys(|_| true, level);
		}

		if level == DiagnosticLevel::ALL {
			return self.entries.remove(key).is_some();
		}
		let Some(items) = self.entries.get_mut(key) else {
			return false;
		};
		let before = items.len();
		items.retain(|item| !level.matches(item.level()));
		let changed = items.len() != before;
		if items.is_empty() {
			self.entries.remove(key);
		}
		changed
	}

	/// Clears `level` items under every key whose filepath starts with `prefix`
	/// (case-insensitive).
	pub fn clear_prefix(&mut self, prefix: &str, level: DiagnosticLevel) -> bool {
		self.retain_keys(|key| key.filepath_starts_with(prefix), level)
	}

	fn retain_keys(&mut self, selects: impl Fn(&EntryKey) -> bool, level: DiagnosticLevel) -> bool {
		let mut changed = false;
		self.entries.retain(|key, items| {
			if !selects(key) {
				return true;
			}
			let before = items.len();
			items.retain(|item| !level.matches(item.level()));
			changed |= items.len() != before;
			!items.is_empty()
		});
		changed
	}

	pub fn get(&self, key: &EntryKey) -> Option<&[DiagnosticItem]> {
		self.entries.get(key).map(Vec::as_slice)
	}

	pub fn contains_key(&self, key: &EntryKey) -> bool {
		self.entries.contains_key(key)
	}

	pub fn keys(&self) -> impl Iterator<Item = &EntryKey> {
		self.entries.keys()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&EntryKey, &[DiagnosticItem])> {
		self.entries.iter().map(|(key, items)| (key, items.as_slice()))
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}
