//! Extensions for digest hashers.
use md5::Digest;
use std::io::{Result, Write};

/// A writer that tees everything written into a digest hasher.
pub struct HashedWriter<W: Write, D: Digest> {
    inner: W,
    hasher: D,
    written: u64,
}

impl<W: Write, D: Digest> HashedWriter<W, D> {
    /// Creates a new `HashedWriter` wrapping the given writer.
    pub fn new(inner: W) -> Self {
        HashedWriter {
            inner,
            hasher: D::new(),
            written: 0,
        }
    }

    /// Returns the number of bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Finishes hashing and returns the inner writer together with the
    /// digest of everything written.
    pub fn finish(self) -> (W, Vec<u8>) {
        (self.inner, self.hasher.finalize().to_vec())
    }
}

impl<W: Write, D: Digest> Write for HashedWriter<W, D> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let written = self.inner.write(buf)?;
        self.hasher.update(&buf[..written]);
        self.written += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }
}
