//! CSV pose trace.
//!
//! One header line followed by one row per processed frame:
//!
//! ```text
//! id,x,y,z,yaw,pitch,roll
//! 1,10.02,5.01,0.03,0.051,0.001,-0.002
//! 2,10.54,5.02,0.03,0.052,0.001,-0.002
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::LocalizationRecord;

/// Header row of the trace.
pub const TRACE_HEADER: &str = "id,x,y,z,yaw,pitch,roll";

/// Error type for trace recording.
#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Record id {got} is not after {last}")]
    OutOfOrder { last: u64, got: u64 },
}

pub type Result<T> = std::result::Result<T, RecorderError>;

/// What a finished trace contains.
#[derive(Debug, Clone, PartialEq)]
pub struct RecorderSummary {
    pub path: PathBuf,
    pub rows: u64,
    pub cumulative_fitness: f64,
}

/// Append-only trace writer.
///
/// Rows are flushed as they are written so the trace survives an abrupt
/// stop. Ids must strictly increase.
///
/// # Example
///
/// ```ignore
/// let mut recorder = ResultRecorder::create("result.csv")?;
/// recorder.append(&record)?;
/// let summary = recorder.finish(tracker.stats().cumulative_fitness)?;
/// ```
#[derive(Debug)]
pub struct ResultRecorder {
    writer: BufWriter<File>,
    path: PathBuf,
    last_id: Option<u64>,
    rows: u64,
}

impl ResultRecorder {
    /// Create (or truncate) the trace file and write the header.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", TRACE_HEADER)?;
        writer.flush()?;

        log::info!("Saving results to {}", path.display());

        Ok(Self {
            writer,
            path,
            last_id: None,
            rows: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows written so far (header excluded).
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Append one row. An id not greater than the previous one is rejected
    /// and nothing is written.
    pub fn append(&mut self, record: &LocalizationRecord) -> Result<()> {
        if let Some(last) = self.last_id
            && record.id <= last
        {
            return Err(RecorderError::OutOfOrder {
                last,
                got: record.id,
            });
        }

        writeln!(self.writer, "{}", record.to_csv_row())?;
        self.writer.flush()?;

        self.last_id = Some(record.id);
        self.rows += 1;
        Ok(())
    }

    /// Flush, close and report.
    pub fn finish(mut self, cumulative_fitness: f64) -> Result<RecorderSummary> {
        self.writer.flush()?;
        log::info!("ICP score: {:.6}", cumulative_fitness);
        log::info!("Wrote {} rows to {}", self.rows, self.path.display());

        Ok(RecorderSummary {
            path: self.path,
            rows: self.rows,
            cumulative_fitness,
        })
    }
}
