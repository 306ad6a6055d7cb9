//! Blob clusters.
//!
//! A cluster frame is one plain compression tag byte followed by the framed
//! body: `count + 1` little-endian `u32` offsets (the first one equals the
//! size of the offset table, the last one the size of table plus data) and
//! the concatenated blob bytes. The body goes through the codec selected by
//! the tag.
use crate::ext::io::*;
use crate::types::Compression;
use anyhow::Result;
use std::io::Write;
#[cfg(any(feature = "zlib", feature = "bzip2", feature = "lzma"))]
use std::io::Read;

/// An ordered group of blobs serialized together, optionally compressed as
/// a unit.
#[derive(Debug)]
pub struct Cluster {
    compression: Compression,
    offsets: Vec<u32>,
    data: Vec<u8>,
}

impl Cluster {
    pub fn new(compression: Compression) -> Self {
        Cluster {
            compression,
            offsets: Vec::new(),
            data: Vec::new(),
        }
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn set_compression(&mut self, compression: Compression) {
        self.compression = compression;
    }

    /// Appends a blob.
    pub fn append(&mut self, blob: &[u8]) {
        self.offsets.push(self.data.len() as u32);
        self.data.extend_from_slice(blob);
    }

    /// Number of blobs in the cluster.
    pub fn count(&self) -> usize {
        self.offsets.len()
    }

    /// Uncompressed payload bytes accumulated so far.
    pub fn byte_size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Removes all blobs. The compression tag is kept.
    pub fn clear(&mut self) {
        self.offsets.clear();
        self.data.clear();
    }

    /// Returns the blob at `idx`.
    pub fn blob(&self, idx: usize) -> Result<&[u8]> {
        if idx >= self.offsets.len() {
            anyhow::bail!("blob index {} out of range", idx);
        }
        let start = self.offsets[idx] as usize;
        let end = self
            .offsets
            .get(idx + 1)
            .map(|&o| o as usize)
            .unwrap_or(self.data.len());
        Ok(&self.data[start..end])
    }

    fn body_bytes(&self) -> Vec<u8> {
        // count + 1 entries: each blob start, then the end of the data,
        // all relative to the start of the body. An empty cluster is a
        // single entry.
        let table_size = 4 * self.offsets.len() as u32 + 4;
        let mut body = Vec::with_capacity(table_size as usize + self.data.len());
        for &offset in &self.offsets {
            body.extend_from_slice(&(table_size + offset).to_le_bytes());
        }
        body.extend_from_slice(&(table_size + self.data.len() as u32).to_le_bytes());
        body.extend_from_slice(&self.data);
        body
    }

    /// Serializes the cluster frame.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_u8(u8::from(self.compression))?;
        let body = self.body_bytes();
        match self.compression {
            Compression::None => out.write_all(&body)?,
            #[cfg(feature = "zlib")]
            Compression::Zlib => {
                let mut encoder =
                    flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(&body)?;
                out.write_all(&encoder.finish()?)?;
            }
            #[cfg(feature = "bzip2")]
            Compression::Bzip2 => {
                let mut encoder =
                    bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
                encoder.write_all(&body)?;
                out.write_all(&encoder.finish()?)?;
            }
            #[cfg(feature = "lzma")]
            Compression::Lzma => {
                let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
                encoder.write_all(&body)?;
                out.write_all(&encoder.finish()?)?;
            }
            #[allow(unreachable_patterns)]
            other => anyhow::bail!("{} support is not enabled", other.as_ref()),
        }
        Ok(())
    }

    /// Parses a cluster frame.
    pub fn read_from(frame: &[u8]) -> Result<Cluster> {
        if frame.is_empty() {
            anyhow::bail!("empty cluster frame");
        }
        let compression = Compression::try_from(frame[0])
            .map_err(|tag| anyhow::anyhow!("unknown cluster compression tag {}", tag))?;
        let body = match compression {
            Compression::None => frame[1..].to_vec(),
            #[cfg(feature = "zlib")]
            Compression::Zlib => {
                let mut body = Vec::new();
                flate2::read::ZlibDecoder::new(&frame[1..]).read_to_end(&mut body)?;
                body
            }
            #[cfg(feature = "bzip2")]
            Compression::Bzip2 => {
                let mut body = Vec::new();
                bzip2::read::BzDecoder::new(&frame[1..]).read_to_end(&mut body)?;
                body
            }
            #[cfg(feature = "lzma")]
            Compression::Lzma => {
                let mut body = Vec::new();
                xz2::read::XzDecoder::new(&frame[1..]).read_to_end(&mut body)?;
                body
            }
            #[allow(unreachable_patterns)]
            other => anyhow::bail!("{} support is not enabled", other.as_ref()),
        };
        let mut reader = MemReaderRef::new(&body);
        let table_size = reader.read_u32()?;
        if table_size < 4 || table_size % 4 != 0 || table_size as usize > body.len() {
            anyhow::bail!("corrupt cluster offset table");
        }
        let count = (table_size / 4 - 1) as usize;
        let mut ends = Vec::with_capacity(count);
        for _ in 0..count {
            ends.push(reader.read_u32()?);
        }
        let mut offsets = Vec::with_capacity(count);
        let mut previous = table_size;
        if count > 0 {
            offsets.push(0);
        }
        for &end in ends.iter().take(count.saturating_sub(1)) {
            if end < previous || end as usize > body.len() {
                anyhow::bail!("corrupt cluster blob boundary");
            }
            offsets.push(end - table_size);
            previous = end;
        }
        if let Some(&last) = ends.last() {
            if last as usize != body.len() {
                anyhow::bail!("cluster data size mismatch");
            }
        }
        Ok(Cluster {
            compression,
            offsets,
            data: body[table_size as usize..].to_vec(),
        })
    }
}
