//! Result table persistence
//!
//! A finished job is written as a two-column CSV (`URL`, `Index Status`) named
//! after the job, inside the configured results directory.

use crate::error::{Error, Result};
use crate::types::ResultRow;
use regex::Regex;
use std::path::{Path, PathBuf};

const MAX_NAME_CHARS: usize = 120;
const HEADER: [&str; 2] = ["URL", "Index Status"];

/// Writes result tables into one directory
pub struct ResultWriter {
    dir: PathBuf,
    unsafe_chars: Regex,
    whitespace: Regex,
}

impl ResultWriter {
    /// Create a writer for `dir`; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| Error::Other(format!("invalid pattern {}: {}", pattern, e)))
        };

        Ok(Self {
            dir: dir.into(),
            unsafe_chars: compile(r"[^\w\-. ]+")?,
            whitespace: compile(r"\s+")?,
        })
    }

    /// Turn a job name into a file stem safe on every platform
    pub fn safe_filename(&self, name: &str) -> String {
        let name = name.trim();
        let name = self.unsafe_chars.replace_all(name, "_");
        let name = self.whitespace.replace_all(&name, "_");
        let name: String = name.chars().take(MAX_NAME_CHARS).collect();
        if name.is_empty() {
            "job".to_string()
        } else {
            name
        }
    }

    /// Absolute location of a previously written result file
    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// Write `rows` as `<safe job name>.csv`, replacing any existing file
    ///
    /// Returns the file name (without directory).
    pub async fn write(&self, job_name: &str, rows: Vec<ResultRow>) -> Result<String> {
        let filename = format!("{}.csv", self.safe_filename(job_name));
        let path = self.dir.join(&filename);

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| Error::Persistence {
                path: self.dir.clone(),
                source,
            })?;

        let target = path.clone();
        let written = tokio::task::spawn_blocking(move || write_table(&target, &rows))
            .await
            .map_err(|e| Error::Other(format!("result writer task failed: {}", e)))?;

        written.map_err(|source| Error::Persistence {
            path: path.clone(),
            source,
        })?;

        tracing::info!(path = %path.display(), "results written");
        Ok(filename)
    }
}

fn write_table(path: &Path, rows: &[ResultRow]) -> std::io::Result<()> {
    let mut writer = csv::WriterBuilder::new().from_path(path)?;
    writer.write_record(HEADER)?;
    for row in rows {
        writer.write_record([row.url.as_str(), row.status.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}
