use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::format::{ColumnSet, TickRow};
use crate::error::{Error, Result};

/// An open CSV file. The header row is written on creation.
pub struct CsvSink {
    path: PathBuf,
    columns: ColumnSet,
    writer: csv::Writer<File>,
    rows: u64,
}

/// What a closed sink left on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkSummary {
    pub path: PathBuf,
    pub rows: u64,
}

impl CsvSink {
    pub fn create<P: Into<PathBuf>>(path: P, columns: ColumnSet) -> Result<Self> {
        let path = path.into();
        let file = File::create(&path).map_err(|source| Error::CreateSink {
            path: path.clone(),
            source,
        })?;

        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(file);
        writer.write_record(columns.header())?;

        Ok(Self {
            path,
            columns,
            writer,
            rows: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn write_row(&mut self, row: &TickRow) -> Result<()> {
        self.writer.write_record(self.columns.format_row(row))?;
        self.rows += 1;
        Ok(())
    }

    /// Flush buffered rows and close the file
    pub fn finish(mut self) -> Result<SinkSummary> {
        self.writer.flush()?;
        debug!("Closed {} ({} rows)", self.path.display(), self.rows);
        Ok(SinkSummary {
            path: self.path,
            rows: self.rows,
        })
    }
}
