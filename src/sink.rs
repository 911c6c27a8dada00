//! Application sink the receiver delivers payload to.
//!
//! The ARQ layer does not know what happens to the bytes it reassembles; it
//! drives a [`TransferSink`] through the three stages of a transfer.  The
//! server binary writes to a file via [`FileSink`]; tests plug in in-memory
//! sinks to observe exactly which writes happen.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

/// Capability interface between the receiver core and the application.
pub trait TransferSink: Send {
    /// A transfer is starting (a session-start request arrived).
    fn begin(&mut self) -> io::Result<()>;

    /// One in-order payload unit.  Failure is reported back to the client as
    /// a warning and the unit is redelivered later.
    fn write(&mut self, data: &[u8]) -> io::Result<()>;

    /// The transfer finished (a session-close request arrived).
    fn end(&mut self);
}

// ---------------------------------------------------------------------------
// FileSink
// ---------------------------------------------------------------------------

/// Writes a transfer to a file, truncating it on each new session.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: Option<File>,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }
}

impl TransferSink for FileSink {
    fn begin(&mut self) -> io::Result<()> {
        // A fresh session restarts the output file; an aborted previous
        // transfer is discarded.
        self.file = Some(File::create(&self.path)?);
        log::info!("[server] writing transfer to {}", self.path.display());
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.write_all(data),
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "no transfer in progress",
            )),
        }
    }

    fn end(&mut self) {
        // Dropping the handle closes (and flushes) the file.
        self.file = None;
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(tag: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("arq-sink-{tag}-{}", std::process::id()));
        p
    }

    #[test]
    fn write_without_begin_fails() {
        let mut sink = FileSink::new(temp_path("nobegin"));
        assert!(sink.write(b"x").is_err());
    }

    #[test]
    fn begin_write_end_produces_the_file() {
        let path = temp_path("basic");
        let mut sink = FileSink::new(&path);
        sink.begin().unwrap();
        sink.write(b"abc\n").unwrap();
        sink.write(b"de\n").unwrap();
        sink.end();
        assert_eq!(std::fs::read(&path).unwrap(), b"abc\nde\n");
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn second_begin_truncates() {
        let path = temp_path("truncate");
        let mut sink = FileSink::new(&path);
        sink.begin().unwrap();
        sink.write(b"old contents").unwrap();
        sink.begin().unwrap();
        sink.write(b"new").unwrap();
        sink.end();
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
        std::fs::remove_file(&path).ok();
    }
}
