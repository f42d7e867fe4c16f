use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "kestrel")]
#[command(about = "Analyze source files and report diagnostics")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
	/// Files to analyze
	#[arg(required = true, value_name = "FILE")]
	pub files: Vec<PathBuf>,

	/// Analysis settings (TOML)
	#[arg(short, long, value_name = "PATH")]
	pub config: Option<PathBuf>,

	/// Verbose logging
	#[arg(short, long)]
	pub verbose: bool,
}
