#![allow(unused_crate_dependencies)]

use kestrel_diagnostics::{DiagnosticItem, DiagnosticLevel, DiagnosticsTable, EntryKey, Severity, SnapshotVersion, SourcePosition, SourceSpan};
use proptest::prelude::*;

const PATHS: [&str; 4] = ["src/a.py", "SRC/A.PY", "src/b.py", "lib/c.py"];
const PREFIXES: [&str; 3] = ["src/", "LIB/", "nothing/"];
const LEVELS: [DiagnosticLevel; 4] = [DiagnosticLevel::SYNTAX, DiagnosticLevel::SEMANTICS, DiagnosticLevel::BUILD, DiagnosticLevel::ALL];

#[derive(Debug, Clone)]
enum Op {
	Replace { path: usize, levels: Vec<usize>, mask: usize },
	Append { path: usize, levels: Vec<usize> },
	Clear { path: Option<usize>, mask: usize },
	ClearPrefix { prefix: usize, mask: usize },
}

fn arb_op() -> impl Strategy<Value = Op> {
	let path = 0..PATHS.len();
	let item_levels = prop::collection::vec(0..3usize, 0..4);
	let mask = 0..LEVELS.len();
	prop_oneof![
		(path.clone(), item_levels.clone(), mask.clone()).prop_map(|(path, levels, mask)| Op::Replace { path, levels, mask }),
		(path.clone(), item_levels).prop_map(|(path, levels)| Op::Append { path, levels }),
		(prop::option::of(path), mask.clone()).prop_map(|(path, mask)| Op::Clear { path, mask }),
		(0..PREFIXES.len(), mask).prop_map(|(prefix, mask)| Op::ClearPrefix { prefix, mask }),
	]
}

fn key(path: usize) -> EntryKey {
	EntryKey::parser(Some(PATHS[path]))
}

fn items(levels: &[usize], tag: usize) -> Vec<DiagnosticItem> {
	let span = SourceSpan::new(SourcePosition::new(0, 0, 0), SourcePosition::new(1, 0, 1));
	levels
		.iter()
		.enumerate()
		.map(|(n, &level)| DiagnosticItem::new(format!("{tag}.{n}"), span, Severity::Error, LEVELS[level], Some(SnapshotVersion::new(1))))
		.collect()
}

fn owned(table: &DiagnosticsTable, key: &EntryKey) -> Vec<DiagnosticItem> {
	table.get(key).map(<[_]>::to_vec).unwrap_or_default()
}

proptest! {
	/// Every mutation leaves exactly the items its semantics promise, and no key
	/// is ever left holding an empty list.
	#[test]
	fn mutations_follow_level_semantics(ops in prop::collection::vec(arb_op(), 1..40)) {
		let mut table = DiagnosticsTable::new();
		for (tag, op) in ops.into_iter().enumerate() {
			let before = table.clone();
			match op {
				Op::Replace { path, levels, mask } => {
					let key = key(path);
					let new = items(&levels, tag);
					let mut expected: Vec<_> = owned(&before, &key).into_iter().filter(|i| !LEVELS[mask].matches(i.level())).collect();
					expected.extend(new.iter().cloned());
					table.replace(key.clone(), new, LEVELS[mask]);
					prop_assert_eq!(owned(&table, &key), expected);
				}
				Op::Append { path, levels } => {
					let key = key(path);
					let new = items(&levels, tag);
					let mut expected = owned(&before, &key);
					expected.extend(new.iter().cloned());
					table.append(key.clone(), new);
					prop_assert_eq!(owned(&table, &key), expected);
				}
				Op::Clear { path, mask } => {
					let target = path.map(key).unwrap_or(EntryKey::EMPTY);
					table.clear(&target, LEVELS[mask]);
					for key in before.keys() {
						let hit = target.is_empty() || key == &target;
						let remaining = owned(&table, key);
						if hit {
							prop_assert!(remaining.iter().all(|i| !LEVELS[mask].matches(i.level())));
						} else {
							prop_assert_eq!(remaining, owned(&before, key));
						}
					}
				}
				Op::ClearPrefix { prefix, mask } => {
					table.clear_prefix(PREFIXES[prefix], LEVELS[mask]);
					for key in before.keys() {
						let remaining = owned(&table, key);
						if key.filepath_starts_with(PREFIXES[prefix]) {
							prop_assert!(remaining.iter().all(|i| !LEVELS[mask].matches(i.level())));
						} else {
							prop_assert_eq!(remaining, owned(&before, key));
						}
					}
				}
			}
			prop_assert!(table.iter().all(|(_, items)| !items.is_empty()));
			prop_assert!(table.len() <= 3);
		}
	}
}
