//! Directory entries.
use crate::ext::io::*;
use anyhow::Result;
use int_enum::IntEnum;
use std::cmp::Ordering;
use std::io::Write;

#[repr(u16)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntEnum)]
/// Directory entry kind, stored as the leading tag of the payload.
pub enum DirentKind {
    Article = 0,
    Deleted = 0xFFFD,
    Linktarget = 0xFFFE,
    Redirect = 0xFFFF,
}

/// One article's metadata record.
///
/// `aid`, `redirect_aid` and `compress` only exist while the archive is
/// built; everything else ends up on disk.
#[derive(Clone, Debug)]
pub struct Dirent {
    pub aid: String,
    pub namespace: u8,
    pub url: String,
    pub title: String,
    pub parameter: Vec<u8>,
    pub kind: DirentKind,
    pub version: u32,
    /// Index into the writer's MIME type table (articles only).
    pub mime_type_idx: u16,
    pub compress: bool,
    /// Cluster number and position within it (articles only).
    pub cluster: u32,
    pub blob_idx: u32,
    pub redirect_aid: String,
    /// Resolved target index (redirects only).
    pub redirect_idx: u32,
    /// Final URL-order index.
    pub idx: u32,
}

impl Default for Dirent {
    fn default() -> Self {
        Dirent {
            aid: String::new(),
            namespace: 0,
            url: String::new(),
            title: String::new(),
            parameter: Vec::new(),
            kind: DirentKind::Article,
            version: 0,
            mime_type_idx: 0,
            compress: false,
            cluster: 0,
            blob_idx: 0,
            redirect_aid: String::new(),
            redirect_idx: 0,
            idx: 0,
        }
    }
}

// Fixed preamble: kind u16, mime u16, parameter len u16, namespace u8,
// version u32.
const PREAMBLE_SIZE: u64 = 11;

impl Dirent {
    pub fn is_article(&self) -> bool {
        self.kind == DirentKind::Article
    }

    pub fn is_redirect(&self) -> bool {
        self.kind == DirentKind::Redirect
    }

    /// Title used for alphabetical ordering; an empty title sorts as the
    /// URL.
    pub fn sort_title(&self) -> &str {
        if self.title.is_empty() {
            &self.url
        } else {
            &self.title
        }
    }

    /// Orders by `(namespace, url)`, bytewise.
    pub fn compare_url(a: &Dirent, b: &Dirent) -> Ordering {
        a.namespace
            .cmp(&b.namespace)
            .then_with(|| a.url.as_bytes().cmp(b.url.as_bytes()))
    }

    /// Orders by `(namespace, title)` with empty titles falling back to the
    /// URL.
    pub fn compare_title(a: &Dirent, b: &Dirent) -> Ordering {
        a.namespace
            .cmp(&b.namespace)
            .then_with(|| a.sort_title().as_bytes().cmp(b.sort_title().as_bytes()))
    }

    /// Size of the on-disk payload in bytes.
    pub fn disk_size(&self) -> u64 {
        let mut size = PREAMBLE_SIZE;
        size += match self.kind {
            DirentKind::Article => 8,
            DirentKind::Redirect => 4,
            DirentKind::Linktarget | DirentKind::Deleted => 0,
        };
        size += self.url.len() as u64 + 1;
        if !self.title.is_empty() {
            size += self.title.len() as u64 + 1;
        }
        size + self.parameter.len() as u64
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        if self.parameter.len() > u16::MAX as usize {
            anyhow::bail!("parameter of {} exceeds 65535 bytes", self.url);
        }
        out.write_u16(u16::from(self.kind))?;
        out.write_u16(if self.is_article() {
            self.mime_type_idx
        } else {
            0
        })?;
        out.write_u16(self.parameter.len() as u16)?;
        out.write_u8(self.namespace)?;
        out.write_u32(self.version)?;
        match self.kind {
            DirentKind::Article => {
                out.write_u32(self.cluster)?;
                out.write_u32(self.blob_idx)?;
            }
            DirentKind::Redirect => out.write_u32(self.redirect_idx)?,
            DirentKind::Linktarget | DirentKind::Deleted => {}
        }
        out.write_cstring_bytes(self.url.as_bytes())?;
        if !self.title.is_empty() {
            out.write_cstring_bytes(self.title.as_bytes())?;
        }
        out.write_all(&self.parameter)?;
        Ok(())
    }

    /// Parses a payload. `payload` must span exactly one dirent; whether a
    /// title is present is inferred from the bytes left over after the URL.
    pub fn read_from(payload: &[u8]) -> Result<Dirent> {
        let mut reader = MemReaderRef::new(payload);
        let kind_tag = reader.read_u16()?;
        let kind = DirentKind::try_from(kind_tag)
            .map_err(|tag| anyhow::anyhow!("unknown dirent kind tag 0x{:04X}", tag))?;
        let mime_type_idx = reader.read_u16()?;
        let parameter_len = reader.read_u16()? as usize;
        let namespace = reader.read_u8()?;
        let version = reader.read_u32()?;
        let mut dirent = Dirent {
            namespace,
            version,
            kind,
            mime_type_idx,
            ..Dirent::default()
        };
        match kind {
            DirentKind::Article => {
                dirent.cluster = reader.read_u32()?;
                dirent.blob_idx = reader.read_u32()?;
            }
            DirentKind::Redirect => dirent.redirect_idx = reader.read_u32()?,
            DirentKind::Linktarget | DirentKind::Deleted => {}
        }
        let url = reader.read_cstring_bytes()?;
        dirent.url = String::from_utf8(url)?;
        if reader.remaining().len() > parameter_len {
            let title = reader.read_cstring_bytes()?;
            dirent.title = String::from_utf8(title)?;
        }
        dirent.parameter = reader.read_exact_vec(parameter_len)?;
        if !reader.is_eof() {
            anyhow::bail!("trailing bytes after dirent {}", dirent.url);
        }
        Ok(dirent)
    }
}
