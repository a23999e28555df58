//! Kernel interface channel.
//!
//! Framing: the kernel treats each `write(2)` on the attr file as one
//! complete message, so a request is submitted with a single write syscall
//! and a short write is rejected outright, never continued across calls.
//! The read side returns the NUL-free text the kernel produces to describe
//! current confinement.

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::{AttrSink, AttrSource, BrimCode, BrimError};

mod probe;

pub use probe::is_enabled;

/// Read-write handle to the calling thread's confinement-control file.
///
/// Single-owner: one channel per task. Two threads writing the same handle
/// can interleave what the kernel must see as one message boundary, so any
/// sharing has to be serialized outside this type. The handle is released
/// on drop on every exit path.
#[derive(Debug)]
pub struct KernelChannel {
    file: File,
    path: PathBuf,
}

impl KernelChannel {
    /// Probes for the attr interface and opens it read-write.
    pub fn open() -> Result<Self, BrimError> {
        let path = probe::interface_path()?;
        Self::open_at(&path)
    }

    /// Opens a specific control file, bypassing discovery.
    pub fn open_at(path: &Path) -> Result<Self, BrimError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => BrimError::kernel(BrimCode::Unavailable, e),
                ErrorKind::PermissionDenied => BrimError::kernel(BrimCode::Permission, e),
                _ => BrimError::io(e),
            })?;

        Ok(Self { file, path: path.to_path_buf() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes one framed request. Exactly one syscall reaches the kernel;
    /// a short count means the message boundary was lost and the request
    /// cannot be resumed.
    pub fn write_request(&mut self, bytes: &[u8]) -> Result<(), BrimError> {
        log::trace!("attr write, {} bytes", bytes.len());
        let n = self.file.write(bytes)?;
        if n != bytes.len() {
            return Err(BrimError::new(BrimCode::Io)
                .ctx(format_args!("short write: {n} of {} bytes", bytes.len())));
        }
        Ok(())
    }

    /// Reads one framed response describing current confinement.
    pub fn read_current(&mut self) -> Result<Vec<u8>, BrimError> {
        self.file.seek(SeekFrom::Start(0))?;
        let mut raw = Vec::new();
        self.file.read_to_end(&mut raw)?;
        log::trace!("attr read, {} bytes", raw.len());
        Ok(raw)
    }
}

impl AttrSink for KernelChannel {
    type Error = BrimError;
    fn send_request(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.write_request(bytes)
    }
}

impl AttrSource for KernelChannel {
    type Error = BrimError;
    fn recv_current(&mut self) -> Result<Vec<u8>, Self::Error> {
        self.read_current()
    }
}
