use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use crate::error::Error;

/// Tee writer duplicating every write to each of its destinations.
///
/// Destinations are written in the order they were added. A failing
/// destination aborts the write and its error is returned; the ones before
/// it already hold the data.
#[derive(Default)]
pub struct MultiSink {
    targets: Vec<Box<dyn Write + Send>>,
}

impl MultiSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a destination, builder style.
    pub fn with(mut self, target: impl Write + Send + 'static) -> Self {
        self.targets.push(Box::new(target));
        self
    }

    pub fn push(&mut self, target: impl Write + Send + 'static) {
        self.targets.push(Box::new(target));
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl Write for MultiSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for target in &mut self.targets {
            target.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        for target in &mut self.targets {
            target.flush()?;
        }
        Ok(())
    }
}

/// Opens `path` for appending, creating the file and its parent directory if needed.
pub fn open_append(path: &Path) -> Result<File, Error> {
    let io_err = |source| Error::Io { path: path.to_path_buf(), source };

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(io_err)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_err)
}
