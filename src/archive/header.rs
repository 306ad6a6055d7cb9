//! Archive file header.
use crate::ext::io::*;
use anyhow::Result;
use std::io::{Read, Write};

pub const MAGIC: u32 = 0x044D495A;
pub const VERSION: u32 = 4;
/// Fixed header size in bytes.
pub const SIZE: u64 = 88;

/// The fixed record at offset 0, all fields little-endian.
///
/// The position fields are absolute file offsets of the corresponding
/// sections; `main_page` and `layout_page` are URL-order article indices or
/// `u32::MAX` when unset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub uuid: [u8; 16],
    pub article_count: u32,
    pub cluster_count: u32,
    pub url_ptr_pos: u64,
    pub title_idx_pos: u64,
    pub cluster_ptr_pos: u64,
    pub mime_list_pos: u64,
    pub main_page: u32,
    pub layout_page: u32,
    pub checksum_pos: u64,
    pub geo_idx_pos: u64,
}

impl Default for Header {
    fn default() -> Self {
        Header {
            uuid: [0; 16],
            article_count: 0,
            cluster_count: 0,
            url_ptr_pos: u64::MAX,
            title_idx_pos: u64::MAX,
            cluster_ptr_pos: u64::MAX,
            mime_list_pos: u64::MAX,
            main_page: u32::MAX,
            layout_page: u32::MAX,
            checksum_pos: u64::MAX,
            geo_idx_pos: u64::MAX,
        }
    }
}

impl Header {
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_u32(MAGIC)?;
        out.write_u32(VERSION)?;
        out.write_all(&self.uuid)?;
        out.write_u32(self.article_count)?;
        out.write_u32(self.cluster_count)?;
        out.write_u64(self.url_ptr_pos)?;
        out.write_u64(self.title_idx_pos)?;
        out.write_u64(self.cluster_ptr_pos)?;
        out.write_u64(self.mime_list_pos)?;
        out.write_u32(self.main_page)?;
        out.write_u32(self.layout_page)?;
        out.write_u64(self.checksum_pos)?;
        out.write_u64(self.geo_idx_pos)?;
        Ok(())
    }

    pub fn read_from<R: Read>(reader: &mut R) -> Result<Header> {
        let magic = reader.read_u32()?;
        if magic != MAGIC {
            anyhow::bail!("not an archive file (magic 0x{:08X})", magic);
        }
        let version = reader.read_u32()?;
        if version != VERSION {
            anyhow::bail!("unsupported archive version {}", version);
        }
        let mut uuid = [0u8; 16];
        reader.read_exact(&mut uuid)?;
        Ok(Header {
            uuid,
            article_count: reader.read_u32()?,
            cluster_count: reader.read_u32()?,
            url_ptr_pos: reader.read_u64()?,
            title_idx_pos: reader.read_u64()?,
            cluster_ptr_pos: reader.read_u64()?,
            mime_list_pos: reader.read_u64()?,
            main_page: reader.read_u32()?,
            layout_page: reader.read_u32()?,
            checksum_pos: reader.read_u64()?,
            geo_idx_pos: reader.read_u64()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_and_roundtrip() {
        let header = Header {
            uuid: *b"0123456789ABCDEF",
            article_count: 3,
            cluster_count: 2,
            url_ptr_pos: 89,
            title_idx_pos: 113,
            cluster_ptr_pos: 300,
            mime_list_pos: 88,
            main_page: 0,
            layout_page: u32::MAX,
            checksum_pos: 500,
            geo_idx_pos: 125,
        };
        let mut out = Vec::new();
        header.write_to(&mut out).unwrap();
        assert_eq!(out.len() as u64, SIZE);
        let back = Header::read_from(&mut MemReaderRef::new(&out)).unwrap();
        assert_eq!(back, header);
    }

    #[test]
    fn test_bad_magic_is_rejected() {
        let mut out = Vec::new();
        Header::default().write_to(&mut out).unwrap();
        out[0] ^= 0xFF;
        assert!(Header::read_from(&mut MemReaderRef::new(&out)).is_err());
    }
}
