//! Daily log files.
//!
//! Every log line also lands in `<dir>/publish_<YYYYmmdd>.log`, one file per
//! local calendar day, appended across runs.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const FILE_PREFIX: &str = "publish_";

/// Writer appending to the current day's log file.
///
/// The file is reopened in append mode on every write, so a long-running
/// process rolls over to the next day's file on its own.
#[derive(Debug, Clone)]
pub struct DailyLogFile {
    dir: PathBuf,
}

impl DailyLogFile {
    /// Create `dir` if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, day: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{}{}.log", FILE_PREFIX, day.format("%Y%m%d")))
    }

    pub fn current_path(&self) -> PathBuf {
        self.path_for(Local::now().date_naive())
    }
}

impl Write for DailyLogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.current_path())?;
        file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes everything to both `primary` and `copy`.
///
/// Failures on `copy` are dropped so a full disk never silences the console.
pub struct Tee<A, B> {
    primary: A,
    copy: B,
}

impl<A: Write, B: Write> Tee<A, B> {
    pub fn new(primary: A, copy: B) -> Self {
        Self { primary, copy }
    }
}

impl<A: Write, B: Write> Write for Tee<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.primary.write_all(buf)?;
        let _ = self.copy.write_all(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let _ = self.copy.flush();
        self.primary.flush()
    }
}
