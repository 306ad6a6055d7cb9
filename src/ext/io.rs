//! Extensions for IO operations.
//!
//! The archive format is little-endian throughout, so only little-endian
//! helpers are provided.
use std::io::*;

/// A trait to help to read data from a reader.
pub trait ReadExt {
    /// Reads a [u8] from the reader.
    fn read_u8(&mut self) -> Result<u8>;
    /// Reads a [u16] from the reader in little-endian order.
    fn read_u16(&mut self) -> Result<u16>;
    /// Reads a [u32] from the reader in little-endian order.
    fn read_u32(&mut self) -> Result<u32>;
    /// Reads a [u64] from the reader in little-endian order.
    fn read_u64(&mut self) -> Result<u64>;

    /// Reads bytes up to (and consuming) the next NUL byte.
    /// The NUL byte is not included in the result.
    fn read_cstring_bytes(&mut self) -> Result<Vec<u8>>;

    /// Reads some data from the reader into a vector.
    fn read_exact_vec(&mut self, len: usize) -> Result<Vec<u8>>;
}

impl<T: Read> ReadExt for T {
    fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }
    fn read_u16(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }
    fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }
    fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    fn read_cstring_bytes(&mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        loop {
            let mut byte = [0u8; 1];
            self.read_exact(&mut byte)?;
            if byte[0] == 0 {
                break;
            }
            buf.push(byte[0]);
        }
        Ok(buf)
    }

    fn read_exact_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }
}

/// A trait to help to write data to a writer.
pub trait WriteExt {
    /// Writes a [u8] to the writer.
    fn write_u8(&mut self, value: u8) -> Result<()>;
    /// Writes a [u16] to the writer in little-endian order.
    fn write_u16(&mut self, value: u16) -> Result<()>;
    /// Writes a [u32] to the writer in little-endian order.
    fn write_u32(&mut self, value: u32) -> Result<()>;
    /// Writes a [u64] to the writer in little-endian order.
    fn write_u64(&mut self, value: u64) -> Result<()>;
    /// Writes the bytes followed by a NUL terminator.
    fn write_cstring_bytes(&mut self, value: &[u8]) -> Result<()>;
}

impl<T: Write> WriteExt for T {
    fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_all(&value.to_le_bytes())
    }
    fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_all(&value.to_le_bytes())
    }
    fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_all(&value.to_le_bytes())
    }
    fn write_u64(&mut self, value: u64) -> Result<()> {
        self.write_all(&value.to_le_bytes())
    }
    fn write_cstring_bytes(&mut self, value: &[u8]) -> Result<()> {
        self.write_all(value)?;
        self.write_all(&[0])
    }
}

/// A trait to help to write data to a writer at a specific offset.
///
/// The stream position is restored after the write.
pub trait WriteAt {
    /// Writes all data to the writer at a specific offset.
    fn write_all_at(&mut self, offset: u64, buf: &[u8]) -> Result<()>;

    /// Writes a [u32] at a specific offset in little-endian order.
    fn write_u32_at(&mut self, offset: u64, value: u32) -> Result<()> {
        self.write_all_at(offset, &value.to_le_bytes())
    }
    /// Writes a [u64] at a specific offset in little-endian order.
    fn write_u64_at(&mut self, offset: u64, value: u64) -> Result<()> {
        self.write_all_at(offset, &value.to_le_bytes())
    }
}

impl<T: Write + Seek> WriteAt for T {
    fn write_all_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        let current_pos = self.stream_position()?;
        self.seek(SeekFrom::Start(offset))?;
        self.write_all(buf)?;
        self.seek(SeekFrom::Start(current_pos))?;
        Ok(())
    }
}

/// A memory reader that can read data from a slice of bytes.
#[derive(Clone)]
pub struct MemReaderRef<'a> {
    /// The data to read from.
    pub data: &'a [u8],
    /// The current position in the data.
    pub pos: usize,
}

impl<'a> MemReaderRef<'a> {
    /// Creates a new `MemReaderRef` with the given data.
    pub fn new(data: &'a [u8]) -> Self {
        MemReaderRef { data, pos: 0 }
    }

    /// Checks if the reader has reached the end of the data.
    pub fn is_eof(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Returns the data not yet consumed.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos.min(self.data.len())..]
    }
}

impl<'a> std::fmt::Debug for MemReaderRef<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemReaderRef")
            .field("pos", &self.pos)
            .field("data_length", &self.data.len())
            .finish_non_exhaustive()
    }
}

impl<'a> Read for MemReaderRef<'a> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.pos >= self.data.len() {
            return Ok(0);
        }
        let bytes_to_read = buf.len().min(self.data.len() - self.pos);
        buf[..bytes_to_read].copy_from_slice(&self.data[self.pos..self.pos + bytes_to_read]);
        self.pos += bytes_to_read;
        Ok(bytes_to_read)
    }
}

impl<'a> Seek for MemReaderRef<'a> {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let new_pos = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(offset) => self.data.len() as i64 + offset,
            SeekFrom::Current(offset) => self.pos as i64 + offset,
        };
        if new_pos < 0 || new_pos > self.data.len() as i64 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "Seek position is outside of the data",
            ));
        }
        self.pos = new_pos as usize;
        Ok(self.pos as u64)
    }

    fn stream_position(&mut self) -> Result<u64> {
        Ok(self.pos as u64)
    }
}

/// A memory writer that can write data to a vector of bytes.
pub struct MemWriter {
    /// The data to write to.
    pub data: Vec<u8>,
    /// The current position in the data.
    pub pos: usize,
}

impl MemWriter {
    /// Creates a new `MemWriter` with an empty data vector.
    pub fn new() -> Self {
        MemWriter {
            data: Vec::new(),
            pos: 0,
        }
    }

    /// Returns the inner data of the writer.
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl Default for MemWriter {
    fn default() -> Self {
        MemWriter::new()
    }
}

impl std::fmt::Debug for MemWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemWriter")
            .field("pos", &self.pos)
            .field("data_length", &self.data.len())
            .finish_non_exhaustive()
    }
}

impl Write for MemWriter {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if self.pos + buf.len() > self.data.len() {
            self.data.resize(self.pos + buf.len(), 0);
        }
        self.data[self.pos..self.pos + buf.len()].copy_from_slice(buf);
        self.pos += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl Seek for MemWriter {
    /// Seeks to a new position in the writer.
    /// Seeking beyond the end does not resize the data until something is
    /// written there.
    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let new_pos = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(offset) => self.data.len() as i64 + offset,
            SeekFrom::Current(offset) => self.pos as i64 + offset,
        };
        if new_pos < 0 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "Seek position is negative",
            ));
        }
        self.pos = new_pos as usize;
        Ok(self.pos as u64)
    }

    fn stream_position(&mut self) -> Result<u64> {
        Ok(self.pos as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_ints() {
        let mut out = MemWriter::new();
        out.write_u8(0xAB).unwrap();
        out.write_u16(0x1234).unwrap();
        out.write_u32(0xDEADBEEF).unwrap();
        out.write_u64(0x0102030405060708).unwrap();
        let data = out.into_inner();
        let mut reader = MemReaderRef::new(&data);
        assert_eq!(reader.read_u8().unwrap(), 0xAB);
        assert_eq!(reader.read_u16().unwrap(), 0x1234);
        assert_eq!(reader.read_u32().unwrap(), 0xDEADBEEF);
        assert_eq!(reader.read_u64().unwrap(), 0x0102030405060708);
        assert!(reader.is_eof());
    }

    #[test]
    fn test_cstring() {
        let mut out = MemWriter::new();
        out.write_cstring_bytes(b"text/html").unwrap();
        out.write_u8(0).unwrap();
        let data = out.into_inner();
        let mut reader = MemReaderRef::new(&data);
        assert_eq!(reader.read_cstring_bytes().unwrap(), b"text/html");
        assert_eq!(reader.read_cstring_bytes().unwrap(), b"");
    }

    #[test]
    fn test_write_at_preserves_position() {
        let mut out = MemWriter::new();
        out.write_u32(0).unwrap();
        out.write_u32(7).unwrap();
        out.write_u32_at(0, 42).unwrap();
        assert_eq!(out.stream_position().unwrap(), 8);
        let data = out.into_inner();
        assert_eq!(&data[0..4], &42u32.to_le_bytes());
        assert_eq!(&data[4..8], &7u32.to_le_bytes());
    }
}
