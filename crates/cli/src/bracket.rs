//! Demo parser: reports unbalanced brackets.
//!
//! Skips double-quoted strings and `#` line comments.

use std::sync::Arc;

use kestrel_analysis::{BufferSnapshot, ParseOutcome, ParsedDiagnostic, ParserBackend, SyntaxTree};
use kestrel_diagnostics::{Severity, SourcePosition, SourceSpan};

/// Deepest nesting seen; handed to the project entry as the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracketTree {
	pub max_depth: usize,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BracketBackend;

fn closer_for(open: char) -> char {
	match open {
		'(' => ')',
		'[' => ']',
		_ => '}',
	}
}

fn span_at(pos: SourcePosition, ch: char) -> SourceSpan {
	let end = SourcePosition::new(pos.offset + ch.len_utf8(), pos.line, pos.column + 1);
	SourceSpan::new(pos, end)
}

fn scan(text: &str, diagnostics: &mut Vec<ParsedDiagnostic>) -> usize {
	let mut stack: Vec<(char, SourcePosition)> = Vec::new();
	let mut max_depth = 0;
	let (mut line, mut column) = (0u32, 0u32);
	let mut in_string = false;
	let mut in_comment = false;

	for (offset, ch) in text.char_indices() {
		let pos = SourcePosition::new(offset, line, column);
		if ch == '\n' {
			line += 1;
			column = 0;
			in_comment = false;
			continue;
		}
		column += 1;

		if in_comment {
			continue;
		}
		if in_string {
			in_string = ch != '"';
			continue;
		}
		match ch {
			'#' => in_comment = true,
			'"' => in_string = true,
			'(' | '[' | '{' => {
				stack.push((ch, pos));
				max_depth = max_depth.max(stack.len());
			}
			')' | ']' | '}' => match stack.last() {
				Some(&(open, _)) if closer_for(open) == ch => {
					stack.pop();
				}
				Some(&(open, _)) => diagnostics.push(ParsedDiagnostic {
					span: span_at(pos, ch),
					message: format!("expected `{}`, found `{ch}`", closer_for(open)),
					severity: Severity::SyntaxError,
				}),
				None => diagnostics.push(ParsedDiagnostic {
					span: span_at(pos, ch),
					message: format!("unexpected `{ch}`"),
					severity: Severity::SyntaxError,
				}),
			},
			_ => {}
		}
	}

	for (open, pos) in stack {
		diagnostics.push(ParsedDiagnostic {
			span: span_at(pos, open),
			message: format!("unclosed `{open}`"),
			severity: Severity::Error,
		});
	}
	max_depth
}

impl ParserBackend for BracketBackend {
	fn parse(&self, snapshots: &[BufferSnapshot]) -> ParseOutcome {
		let mut diagnostics = Vec::new();
		let max_depth = snapshots.iter().map(|s| scan(&s.text, &mut diagnostics)).max().unwrap_or(0);
		let tree: SyntaxTree = Arc::new(BracketTree { max_depth });
		ParseOutcome {
			tree: Some(tree),
			diagnostics,
		}
	}
}
