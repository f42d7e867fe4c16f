/// Execution classes used for scheduling and observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Latency-sensitive work such as debounce timer callbacks.
	Interactive,
	/// Long-lived async work (diagnostics consumer loop, refresh requests).
	Background,
	/// Blocking I/O (opening source files from disk).
	IoBlocking,
	/// CPU-bound blocking work (running the external parser).
	CpuBlocking,
}

impl TaskClass {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Interactive => "interactive",
			Self::Background => "background",
			Self::IoBlocking => "io_blocking",
			Self::CpuBlocking => "cpu_blocking",
		}
	}
}
