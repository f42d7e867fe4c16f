//! Error types for analysis and configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the analysis pipeline.
///
/// None of these stop the pipeline; callers log them and degrade to an empty
/// result for the affected source.
#[derive(Debug, Error)]
pub enum AnalysisError {
	/// A source file could not be read.
	#[error("I/O error reading {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// The file stayed locked for every retry.
	#[error("{path} still busy after {attempts} attempts")]
	RetriesExhausted { path: PathBuf, attempts: u32 },

	/// The buffer group has been disposed.
	#[error("buffer group is disposed")]
	Disposed,
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// Error parsing TOML syntax or shape.
	#[error("TOML parse error: {0}")]
	Parse(#[from] toml::de::Error),

	/// A value parsed but is out of range.
	#[error("invalid configuration: {0}")]
	Invalid(String),
}
