//! Tick export session.
//!
//! [`ExportSession`] owns all state of one export run and reacts to replay
//! events as a [`DemoEventHandler`]:
//!
//! - `RoundStart` (split mode only): close the open round file and open
//!   `round_<N>.csv`
//! - `FrameDone`: write one row per playing participant to the open file,
//!   unless the tick repeats the previous one
//!
//! Without round splitting a single `all_ticks.csv` is opened up front and
//! stays open until [`ExportSession::finish`].

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::format::TickRow;
use super::sink::{CsvSink, SinkSummary};
use crate::config::{ALL_TICKS_FILE, ExportConfig, round_file_name};
use crate::demo::{DemoEventHandler, GameState};
use crate::error::{Error, Result};

/// Totals for a finished export
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub output_dir: PathBuf,
    /// Round files opened (always 0 without splitting)
    pub rounds: u32,
    /// Distinct ticks that reached an open file
    pub ticks_exported: u64,
    /// `FrameDone` notifications repeating the previous tick
    pub duplicate_ticks: u64,
    /// Ticks seen before the first round file was opened
    pub ticks_without_sink: u64,
    pub rows_written: u64,
    /// Closed files in the order they were opened
    pub files: Vec<SinkSummary>,
}

pub struct ExportSession {
    config: ExportConfig,
    output_dir: PathBuf,
    /// Number given to the next round file
    next_round: u32,
    sink: Option<CsvSink>,
    last_tick: Option<i32>,
    summary: ExportSummary,
}

impl ExportSession {
    /// Create the output folder and, without round splitting, `all_ticks.csv`
    pub fn new(config: ExportConfig) -> Result<Self> {
        let output_dir = config.output_dir()?;
        fs::create_dir_all(&output_dir).map_err(|source| Error::CreateOutputDir {
            path: output_dir.clone(),
            source,
        })?;

        let sink = if config.split_rounds {
            None
        } else {
            Some(CsvSink::create(
                output_dir.join(ALL_TICKS_FILE),
                config.columns,
            )?)
        };

        info!(
            "Exporting {} to {} (split_rounds={}, columns={})",
            config.demo_path.display(),
            output_dir.display(),
            config.split_rounds,
            config.columns
        );

        Ok(Self {
            summary: ExportSummary {
                output_dir: output_dir.clone(),
                ..ExportSummary::default()
            },
            config,
            output_dir,
            next_round: 1,
            sink,
            last_tick: None,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path of the file currently receiving rows
    pub fn current_path(&self) -> Option<&Path> {
        self.sink.as_ref().map(|sink| sink.path())
    }

    /// Round number of the open round file, `None` outside split mode or before the first round
    pub fn current_round(&self) -> Option<u32> {
        if self.config.split_rounds && self.sink.is_some() {
            Some(self.next_round - 1)
        } else {
            None
        }
    }

    pub fn last_tick(&self) -> Option<i32> {
        self.last_tick
    }

    fn close_sink(&mut self) -> Result<()> {
        if let Some(sink) = self.sink.take() {
            let closed = sink.finish()?;
            self.summary.rows_written += closed.rows;
            self.summary.files.push(closed);
        }
        Ok(())
    }

    fn start_round(&mut self) -> Result<()> {
        self.close_sink()?;

        let round = self.next_round;
        let path = self.output_dir.join(round_file_name(round));
        let sink = CsvSink::create(&path, self.config.columns)?;
        info!("Started round {} -> writing to {}", round, path.display());

        self.sink = Some(sink);
        self.summary.rounds = round;
        self.next_round += 1;
        Ok(())
    }

    /// Close the open file and return the run totals
    pub fn finish(mut self) -> Result<ExportSummary> {
        self.close_sink()?;
        info!(
            "Export finished: {} rows over {} ticks in {} file(s)",
            self.summary.rows_written,
            self.summary.ticks_exported,
            self.summary.files.len()
        );
        Ok(self.summary)
    }
}

impl DemoEventHandler for ExportSession {
    fn on_round_start(&mut self) -> Result<()> {
        if self.config.split_rounds {
            self.start_round()?;
        }
        Ok(())
    }

    fn on_frame_done(&mut self, state: &GameState) -> Result<()> {
        let tick = state.tick();
        // Only the immediately preceding tick is compared
        if self.last_tick == Some(tick) {
            self.summary.duplicate_ticks += 1;
            return Ok(());
        }
        self.last_tick = Some(tick);

        let Some(sink) = self.sink.as_mut() else {
            if self.summary.ticks_without_sink == 0 {
                warn!("Skipping frames before the first round start (tick {})", tick);
            }
            self.summary.ticks_without_sink += 1;
            return Ok(());
        };

        for player in state.playing() {
            sink.write_row(&TickRow::new(tick, player))?;
        }
        self.summary.ticks_exported += 1;
        Ok(())
    }
}
