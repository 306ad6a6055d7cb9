//! Archive reading and lookup.
use crate::archive::cluster::Cluster;
use crate::archive::dirent::{Dirent, DirentKind};
use crate::archive::geo::{ArticleGeoPoint, GeoPoint};
use crate::archive::geoindex;
use crate::archive::header::Header;
use crate::ext::io::*;
use anyhow::{Context, Result};
use std::io::{BufReader, Read, Seek, SeekFrom};

/// A finished archive opened for lookup.
pub struct Archive<R: Read + Seek> {
    reader: R,
    header: Header,
    mime_types: Vec<String>,
    geo_index: Vec<u8>,
}

impl Archive<BufReader<std::fs::File>> {
    pub fn open(filename: &str) -> Result<Self> {
        let file = std::fs::File::open(filename)
            .with_context(|| format!("failed to open archive {}", filename))?;
        Archive::from_reader(BufReader::new(file))
    }
}

impl<R: Read + Seek> Archive<R> {
    pub fn from_reader(mut reader: R) -> Result<Self> {
        let header = Header::read_from(&mut reader)?;
        reader.seek(SeekFrom::Start(header.mime_list_pos))?;
        let mut mime_types = Vec::new();
        loop {
            let name = reader.read_cstring_bytes()?;
            if name.is_empty() {
                break;
            }
            mime_types.push(String::from_utf8(name)?);
        }
        // The geo section carries its own end offset in the third header
        // field.
        reader.seek(SeekFrom::Start(header.geo_idx_pos))?;
        let _index_count = reader.read_u32()?;
        let _start = reader.read_u32()?;
        let geo_end = reader.read_u32()?;
        reader.seek(SeekFrom::Start(header.geo_idx_pos))?;
        let geo_index = reader.read_exact_vec(geo_end as usize)?;
        Ok(Archive {
            reader,
            header,
            mime_types,
            geo_index,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn article_count(&self) -> u32 {
        self.header.article_count
    }

    pub fn cluster_count(&self) -> u32 {
        self.header.cluster_count
    }

    /// MIME type names in id order (lexicographically ascending on disk).
    pub fn mime_types(&self) -> &[String] {
        &self.mime_types
    }

    fn url_ptr(&mut self, idx: u32) -> Result<u64> {
        self.reader
            .seek(SeekFrom::Start(self.header.url_ptr_pos + u64::from(idx) * 8))?;
        Ok(self.reader.read_u64()?)
    }

    fn cluster_ptr(&mut self, cluster: u32) -> Result<u64> {
        if cluster >= self.header.cluster_count {
            anyhow::bail!("cluster number {} out of range", cluster);
        }
        self.reader.seek(SeekFrom::Start(
            self.header.cluster_ptr_pos + u64::from(cluster) * 8,
        ))?;
        Ok(self.reader.read_u64()?)
    }

    /// Reads the dirent at URL-order index `idx`.
    pub fn dirent(&mut self, idx: u32) -> Result<Dirent> {
        if idx >= self.header.article_count {
            anyhow::bail!("article index {} out of range", idx);
        }
        let start = self.url_ptr(idx)?;
        let end = if idx + 1 < self.header.article_count {
            self.url_ptr(idx + 1)?
        } else {
            self.header.cluster_ptr_pos
        };
        self.reader.seek(SeekFrom::Start(start))?;
        let payload = self.reader.read_exact_vec((end - start) as usize)?;
        let mut dirent = Dirent::read_from(&payload)?;
        dirent.idx = idx;
        Ok(dirent)
    }

    /// Reads the dirent at position `pos` of the title index.
    pub fn dirent_by_title(&mut self, pos: u32) -> Result<Dirent> {
        if pos >= self.header.article_count {
            anyhow::bail!("title index position {} out of range", pos);
        }
        self.reader.seek(SeekFrom::Start(
            self.header.title_idx_pos + u64::from(pos) * 4,
        ))?;
        let idx = self.reader.read_u32()?;
        self.dirent(idx)
    }

    /// Binary search by `(namespace, url)`. Returns whether the article
    /// was found and its URL-order index; on a miss the index is the lower
    /// bound.
    pub fn find(&mut self, namespace: u8, url: &str) -> Result<(bool, u32)> {
        let mut lower = 0u32;
        let mut upper = self.header.article_count;
        while lower < upper {
            let probe = lower + (upper - lower) / 2;
            let dirent = self.dirent(probe)?;
            let ordering = dirent
                .namespace
                .cmp(&namespace)
                .then_with(|| dirent.url.as_bytes().cmp(url.as_bytes()));
            if ordering == std::cmp::Ordering::Less {
                lower = probe + 1;
            } else {
                upper = probe;
            }
        }
        if lower < self.header.article_count {
            let dirent = self.dirent(lower)?;
            if dirent.namespace == namespace && dirent.url == url {
                return Ok((true, lower));
            }
        }
        Ok((false, lower))
    }

    /// Binary search by `(namespace, title)` through the title index.
    /// Returns whether the article was found and the title index position;
    /// on a miss the position is the lower bound.
    pub fn find_by_title(&mut self, namespace: u8, title: &str) -> Result<(bool, u32)> {
        let mut lower = 0u32;
        let mut upper = self.header.article_count;
        while lower < upper {
            let probe = lower + (upper - lower) / 2;
            let dirent = self.dirent_by_title(probe)?;
            let ordering = dirent
                .namespace
                .cmp(&namespace)
                .then_with(|| dirent.sort_title().as_bytes().cmp(title.as_bytes()));
            if ordering == std::cmp::Ordering::Less {
                lower = probe + 1;
            } else {
                upper = probe;
            }
        }
        if lower < self.header.article_count {
            let dirent = self.dirent_by_title(lower)?;
            if dirent.namespace == namespace && dirent.sort_title() == title {
                return Ok((true, lower));
            }
        }
        Ok((false, lower))
    }

    /// Returns the blob of the article at `idx`. Redirects have no blob;
    /// follow [Dirent::redirect_idx] first.
    pub fn get_data(&mut self, idx: u32) -> Result<Vec<u8>> {
        let dirent = self.dirent(idx)?;
        if dirent.kind != DirentKind::Article {
            anyhow::bail!("article {} has no data (kind {:?})", idx, dirent.kind);
        }
        let start = self.cluster_ptr(dirent.cluster)?;
        let end = if dirent.cluster + 1 < self.header.cluster_count {
            self.cluster_ptr(dirent.cluster + 1)?
        } else {
            self.header.checksum_pos
        };
        self.reader.seek(SeekFrom::Start(start))?;
        let frame = self.reader.read_exact_vec((end - start) as usize)?;
        let cluster = Cluster::read_from(&frame)?;
        Ok(cluster.blob(dirent.blob_idx as usize)?.to_vec())
    }

    /// Collects articles inside the closed rectangle `[min, max]`, up to
    /// `limit`. Returns `true` when the limit cut the search short.
    pub fn find_articles_by_geo_area(
        &mut self,
        min: &GeoPoint,
        max: &GeoPoint,
        limit: usize,
        results: &mut Vec<ArticleGeoPoint>,
    ) -> Result<bool> {
        geoindex::find_in_area(&self.geo_index, min, max, limit, results)
    }

    /// Returns up to `limit` articles ordered by distance from `point`.
    pub fn find_closest_articles(
        &mut self,
        point: &GeoPoint,
        limit: usize,
    ) -> Result<Vec<ArticleGeoPoint>> {
        geoindex::find_closest(&self.geo_index, point, limit)
    }

    /// Verifies the trailing MD5 digest against the file contents.
    pub fn verify_checksum(&mut self) -> Result<bool> {
        use md5::{Digest, Md5};
        self.reader.seek(SeekFrom::Start(0))?;
        let mut hasher = Md5::new();
        let mut remaining = self.header.checksum_pos;
        let mut buf = [0u8; 8192];
        while remaining > 0 {
            let want = buf.len().min(remaining as usize);
            let got = self.reader.read(&mut buf[..want])?;
            if got == 0 {
                anyhow::bail!("archive truncated before checksum");
            }
            hasher.update(&buf[..got]);
            remaining -= got as u64;
        }
        let mut stored = [0u8; 16];
        self.reader.read_exact(&mut stored)?;
        Ok(hasher.finalize().as_slice() == stored)
    }
}
