//! Daily rotating file sink
//!
//! Writes to `<dir>/<filename>` and rotates when the local date changes or,
//! if `maxSize` is set, when the file grows past it. Rotated files are named
//! `<filename>.<YYYY-MM-DD>` with a `.N` suffix when a day rotates more than
//! once, optionally gzip-compressed, and pruned down to `maxFiles`.

use crate::core::{
    format::RecordFormat, LogRecord, LoggerError, Result, Severity, Sink, SinkOptions,
};
use chrono::{DateTime, Local, NaiveDate};
use serde_json::Value;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub struct FileSink {
    path: PathBuf,
    level: Severity,
    format: RecordFormat,
    max_size: Option<u64>,
    max_files: Option<usize>,
    compress: bool,
    writer: Option<BufWriter<File>>,
    current_size: u64,
    /// Local date the current file belongs to
    opened_on: NaiveDate,
}

impl FileSink {
    /// Create a file sink with default options
    ///
    /// # Errors
    ///
    /// Returns error if the file or its directory cannot be created
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (file, size, opened_on) = Self::open(&path)?;

        Ok(Self {
            path,
            level: Severity::Http,
            format: RecordFormat::default(),
            max_size: None,
            max_files: None,
            compress: false,
            writer: Some(BufWriter::new(file)),
            current_size: size,
            opened_on,
        })
    }

    /// Build from a `log.file` block.
    ///
    /// Options: `dir`, `filename`, `level`, `label`, `json`, `prettyPrint`,
    /// `timestamp`, `maxSize`, `maxFiles`, `compress`.
    pub fn from_options(options: &Value) -> Result<Self> {
        let opts = SinkOptions::new("file", options);
        let dir = PathBuf::from(opts.string_or("dir", "."));
        let path = dir.join(opts.string_or("filename", "app.log"));

        let mut sink = Self::new(path)?;
        sink.level = opts.level_or(Severity::Http)?;
        sink.format = RecordFormat::from_options(&opts, RecordFormat::default());
        sink.max_size = opts.u64("maxSize")?;
        sink.max_files = opts.u64("maxFiles")?.map(|n| n as usize);
        sink.compress = opts.bool_or("compress", false);
        Ok(sink)
    }

    #[must_use]
    pub fn with_level(mut self, level: Severity) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_max_size(mut self, bytes: u64) -> Self {
        self.max_size = Some(bytes);
        self
    }

    #[must_use]
    pub fn with_max_files(mut self, count: usize) -> Self {
        self.max_files = Some(count);
        self
    }

    #[must_use]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    fn open(path: &Path) -> Result<(File, u64, NaiveDate)> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                LoggerError::io_operation(
                    "create log directory",
                    format!("Failed to create directory '{}'", parent.display()),
                    e,
                )
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                LoggerError::io_operation(
                    "open log file",
                    format!("Failed to open '{}'", path.display()),
                    e,
                )
            })?;

        let metadata = file.metadata()?;
        let modified: DateTime<Local> = metadata
            .modified()
            .unwrap_or_else(|_| SystemTime::now())
            .into();
        Ok((file, metadata.len(), modified.date_naive()))
    }

    fn should_rotate(&self, today: NaiveDate) -> bool {
        let size_exceeded = self
            .max_size
            .is_some_and(|max| self.current_size > 0 && self.current_size >= max);
        size_exceeded || today != self.opened_on
    }

    fn rotate(&mut self, today: NaiveDate) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        let rotated = self.rotated_path();
        if self.path.exists() {
            fs::rename(&self.path, &rotated).map_err(|e| {
                LoggerError::io_operation(
                    "rotate log file",
                    format!("Failed to move '{}' aside", self.path.display()),
                    e,
                )
            })?;

            if self.compress {
                compress_file(&rotated)?;
            }
        }

        self.prune_backups();

        let (file, size, _) = Self::open(&self.path)?;
        self.writer = Some(BufWriter::new(file));
        self.current_size = size;
        self.opened_on = today;
        Ok(())
    }

    /// First free `<file>.<date>[.N]` name for the current file
    fn rotated_path(&self) -> PathBuf {
        let base = format!("{}.{}", self.file_name(), self.opened_on.format("%Y-%m-%d"));
        let mut candidate = self.path.with_file_name(&base);
        let mut n = 1;
        while candidate.exists() || gz_path(&candidate).exists() {
            candidate = self.path.with_file_name(format!("{}.{}", base, n));
            n += 1;
        }
        candidate
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "app.log".to_string())
    }

    /// Delete the oldest rotated files beyond `max_files`
    fn prune_backups(&self) {
        let Some(max_files) = self.max_files else {
            return;
        };
        let dir = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(dir) => dir.to_path_buf(),
            None => PathBuf::from("."),
        };
        let prefix = format!("{}.", self.file_name());

        let Ok(entries) = fs::read_dir(&dir) else {
            return;
        };
        let mut backups: Vec<(SystemTime, PathBuf)> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                name.starts_with(&prefix) && !name.ends_with(".tmp")
            })
            .filter_map(|entry| {
                let modified = entry.metadata().and_then(|m| m.modified()).ok()?;
                Some((modified, entry.path()))
            })
            .collect();

        if backups.len() <= max_files {
            return;
        }
        backups.sort();
        let excess = backups.len() - max_files;
        for (_, path) in backups.into_iter().take(excess) {
            if let Err(e) = fs::remove_file(&path) {
                eprintln!(
                    "[LOGGER WARNING] Failed to remove old log file {}: {}",
                    path.display(),
                    e
                );
            }
        }
    }
}

impl Sink for FileSink {
    fn write(&mut self, record: &LogRecord) -> Result<()> {
        if !record.level.passes(self.level) {
            return Ok(());
        }

        let today = Local::now().date_naive();
        if self.should_rotate(today) {
            if let Err(e) = self.rotate(today) {
                eprintln!(
                    "[LOGGER WARNING] Log rotation failed: {}. Continuing with current file.",
                    e
                );
                if self.writer.is_none() {
                    let (file, size, _) = Self::open(&self.path)?;
                    self.writer = Some(BufWriter::new(file));
                    self.current_size = size;
                }
                // Avoid retrying on every write
                self.opened_on = today;
                self.current_size = 0;
            }
        }

        let mut line = self.format.render(record);
        line.push('\n');

        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::write("file", "writer not initialized"))?;
        writer.write_all(line.as_bytes()).map_err(|e| {
            LoggerError::io_operation(
                "write log file",
                format!("Failed to write to '{}'", self.path.display()),
                e,
            )
        })?;
        self.current_size += line.len() as u64;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush()?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.flush();
        }
    }
}

fn gz_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".gz");
    PathBuf::from(name)
}

/// Gzip `path` into `path.gz`, removing the original only after success
fn compress_file(path: &Path) -> Result<()> {
    let gz = gz_path(path);
    let mut tmp = gz.as_os_str().to_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let result = (|| -> std::io::Result<()> {
        let mut reader = BufReader::with_capacity(64 * 1024, File::open(path)?);
        let output = BufWriter::with_capacity(64 * 1024, File::create(&tmp)?);
        let mut encoder = flate2::write::GzEncoder::new(output, flate2::Compression::default());
        std::io::copy(&mut reader, &mut encoder)?;
        encoder.finish()?.flush()?;
        fs::rename(&tmp, &gz)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(LoggerError::io_operation(
            "compress log file",
            format!("Failed to compress '{}'", path.display()),
            e,
        ));
    }

    if let Err(e) = fs::remove_file(path) {
        eprintln!(
            "[LOGGER WARNING] Compressed {} but could not remove the original: {}",
            path.display(),
            e
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Read;
    use tempfile::tempdir;

    fn rotated_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with("app.log."))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_from_options_writes_lines() -> Result<()> {
        let dir = tempdir()?;
        let mut sink = FileSink::from_options(&json!({
            "dir": dir.path().to_str().unwrap(),
            "filename": "app.log",
            "level": "info",
            "label": "svc"
        }))?;

        sink.write(&LogRecord::new(Severity::Info, "hello %s", vec![json!("world")]))?;
        sink.write(&LogRecord::new(Severity::Debug, "filtered", Vec::new()))?;
        sink.flush()?;

        let content = fs::read_to_string(dir.path().join("app.log"))?;
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("info: [svc] hello world"));
        Ok(())
    }

    #[test]
    fn test_json_lines() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("app.log");
        let mut sink = FileSink::from_options(&json!({
            "dir": dir.path().to_str().unwrap(),
            "json": true
        }))?;

        sink.write(&LogRecord::new(Severity::Error, "disk failure", vec![json!({"code": 5})]))?;
        sink.flush()?;

        let content = fs::read_to_string(&path)?;
        let parsed: Value = serde_json::from_str(content.trim())?;
        assert_eq!(parsed["message"], "disk failure");
        assert_eq!(parsed["code"], 5);
        Ok(())
    }

    #[test]
    fn test_size_rotation_and_retention() -> Result<()> {
        let dir = tempdir()?;
        let mut sink = FileSink::new(dir.path().join("app.log"))?
            .with_max_size(10)
            .with_max_files(2);

        for i in 0..5 {
            sink.write(&LogRecord::new(Severity::Info, &format!("message number {}", i), Vec::new()))?;
        }
        sink.flush()?;

        let rotated = rotated_files(dir.path());
        assert_eq!(rotated.len(), 2, "rotated files: {:?}", rotated);
        let current = fs::read_to_string(dir.path().join("app.log"))?;
        assert!(current.contains("message number 4"));
        Ok(())
    }

    #[test]
    fn test_date_change_rotates() -> Result<()> {
        let dir = tempdir()?;
        let mut sink = FileSink::new(dir.path().join("app.log"))?;
        sink.write(&LogRecord::new(Severity::Info, "yesterday", Vec::new()))?;

        let yesterday = sink.opened_on.pred_opt().unwrap();
        sink.opened_on = yesterday;
        sink.write(&LogRecord::new(Severity::Info, "today", Vec::new()))?;
        sink.flush()?;

        let expected = format!("app.log.{}", yesterday.format("%Y-%m-%d"));
        assert_eq!(rotated_files(dir.path()), vec![expected.clone()]);
        let old = fs::read_to_string(dir.path().join(expected))?;
        assert!(old.contains("yesterday"));
        Ok(())
    }

    #[test]
    fn test_compressed_rotation() -> Result<()> {
        let dir = tempdir()?;
        let mut sink = FileSink::new(dir.path().join("app.log"))?
            .with_max_size(5)
            .with_compression(true);

        sink.write(&LogRecord::new(Severity::Info, "first entry", Vec::new()))?;
        sink.write(&LogRecord::new(Severity::Info, "second entry", Vec::new()))?;
        sink.flush()?;

        let rotated = rotated_files(dir.path());
        assert_eq!(rotated.len(), 1);
        assert!(rotated[0].ends_with(".gz"));

        let mut decoder = flate2::read::GzDecoder::new(File::open(dir.path().join(&rotated[0]))?);
        let mut text = String::new();
        decoder.read_to_string(&mut text)?;
        assert!(text.contains("first entry"));
        Ok(())
    }

    #[test]
    fn test_unwritable_directory_fails_construction() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"not a directory").unwrap();

        let result = FileSink::new(blocker.join("app.log"));
        assert!(result.is_err());
    }
}
