//! # demotick
//!
//! Per-tick player telemetry export for game replays.
//!
//! This crate provides:
//! - The replay decoding contract (`DemoParser`, `GameState`, events)
//! - A CS2 (`PBDEMS2`) demo parser built on `source2-demo`
//! - A frame log parser for pre-decoded replays, plain or gzip-compressed
//! - The export session writing `all_ticks.csv` or one `round_<N>.csv` per round
//!
//! ## Example
//!
//! ```ignore
//! use demotick::{ExportConfig, export_demo};
//!
//! let config = ExportConfig::builder()
//!     .demo_path("protestdemo.dem")
//!     .split_rounds(true)
//!     .build();
//! let summary = export_demo(config)?;
//! println!("{} rows", summary.rows_written);
//! ```

pub mod config;
pub mod demo;
pub mod error;
pub mod export;
pub mod prelude;

pub use config::{ExportConfig, ExportConfigBuilder};
pub use demo::{
    DemoEvent, DemoEventHandler, DemoFormat, DemoHeader, DemoParser, FrameLogParser, GameState,
    ParseStats, Player, Source2DemoParser, Stance, Team, Vector3, open_demo, open_reader,
};
pub use error::{Error, Result};
pub use export::{ColumnSet, CsvSink, ExportSession, ExportSummary, SinkSummary, TickRow};

use tracing::{debug, info};

/// Export the replay named by `config`
///
/// Opens the demo before touching the output folder, so an unreadable or
/// unsupported input leaves no files behind.
pub fn export_demo(config: ExportConfig) -> Result<ExportSummary> {
    let mut parser = open_demo(&config.demo_path)?;
    export_with_parser(parser.as_mut(), config)
}

/// Export from an already opened parser
pub fn export_with_parser(
    parser: &mut dyn DemoParser,
    config: ExportConfig,
) -> Result<ExportSummary> {
    let mut session = ExportSession::new(config)?;
    let stats = parser.parse_to_end(&mut session)?;

    if let Some(header) = parser.header() {
        info!("Parsed {} (tick rate {})", header.map_name, header.tick_rate);
    }
    debug!(
        "Parse complete: {} round starts, {} frames",
        stats.round_starts, stats.frames
    );

    session.finish()
}
