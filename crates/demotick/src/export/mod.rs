//! CSV export of per-tick player telemetry.
//!
//! - **Format**: column layout and fixed-precision number formatting
//! - **Sink**: one open CSV file with its header
//! - **Session**: round-aware routing of rows to sinks

mod format;
mod session;
mod sink;

pub use format::{ColumnSet, TickRow, format_position, format_view_direction};
pub use session::{ExportSession, ExportSummary};
pub use sink::{CsvSink, SinkSummary};
