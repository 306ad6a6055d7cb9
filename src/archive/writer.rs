//! Archive creation.
//!
//! [ArchiveCreator::create] runs the five build phases: collect and index
//! directory entries, materialize the title permutation, pack blobs into
//! clusters spilled to a temporary file, build the geo index, then lay out
//! and write the final file with an MD5 digest trailer.
use crate::archive::cluster::Cluster;
use crate::archive::dirent::{Dirent, DirentKind};
use crate::archive::geo::{self, ArticleGeoPoint, GeoPoint};
use crate::archive::geoindex;
use crate::archive::header::{self, Header};
use crate::archive::mime::MimeTypeRegistry;
use crate::archive::source::ArticleSource;
use crate::ext::hash::HashedWriter;
use crate::ext::io::*;
use crate::types::Compression;
use anyhow::{Context, Result};
use md5::Md5;
use std::io::{BufWriter, Seek, Write};

pub struct ArchiveCreator {
    min_chunk_size: u32,
    compression: Compression,
    dirents: Vec<Dirent>,
    title_idx: Vec<u32>,
    cluster_offsets: Vec<u64>,
    clusters_size: u64,
    geo_points: Vec<ArticleGeoPoint>,
    geo_index: Vec<u8>,
    mime_types: MimeTypeRegistry,
    header: Header,
    is_empty: bool,
}

impl Default for ArchiveCreator {
    fn default() -> Self {
        ArchiveCreator::new()
    }
}

impl ArchiveCreator {
    pub fn new() -> Self {
        ArchiveCreator {
            min_chunk_size: 960,
            compression: Compression::strongest_enabled(),
            dirents: Vec::new(),
            title_idx: Vec::new(),
            cluster_offsets: Vec::new(),
            clusters_size: 0,
            geo_points: Vec::new(),
            geo_index: Vec::new(),
            mime_types: MimeTypeRegistry::new(),
            header: Header::default(),
            is_empty: true,
        }
    }

    pub fn from_args(args: &crate::args::Arg) -> Self {
        let mut creator = ArchiveCreator::new();
        creator.min_chunk_size = args.min_chunk_size;
        creator.compression = args.compression();
        creator
    }

    /// Minimal uncompressed cluster size in KiB before a flush.
    pub fn set_min_chunk_size(&mut self, kib: u32) {
        self.min_chunk_size = kib;
    }

    pub fn set_compression(&mut self, compression: Compression) {
        self.compression = compression;
    }

    /// Builds the archive at `filename` from `source`.
    ///
    /// The cluster spill file lives next to the output with a `.tmp`
    /// suffix; it is removed on success and left behind on failure.
    pub fn create(&mut self, filename: &str, source: &mut dyn ArticleSource) -> Result<()> {
        let basename = filename.strip_suffix(".zarc").unwrap_or(filename);
        let tmpname = format!("{}.tmp", basename);

        eprintln!("create directory entries");
        self.create_dirents(source)?;
        eprintln!("{} directory entries created", self.dirents.len());

        eprintln!("create title index");
        self.create_title_index();

        eprintln!("create clusters");
        self.create_clusters(source, &tmpname)?;
        eprintln!("{} clusters created", self.cluster_offsets.len());

        eprintln!("create geo index");
        self.create_geo_index()?;
        eprintln!("{} geo points indexed", self.geo_points.len());

        eprintln!("fill header");
        self.fill_header(source);

        eprintln!("write archive");
        self.write_archive(filename, &tmpname)?;

        std::fs::remove_file(&tmpname)
            .with_context(|| format!("failed to remove spill file {}", tmpname))?;
        eprintln!("ready");
        Ok(())
    }

    /// Drains the source, drops redirects without a known target, orders
    /// everything by `(namespace, url)` and resolves redirect aids to
    /// final indices.
    fn create_dirents(&mut self, source: &mut dyn ArticleSource) -> Result<()> {
        while let Some(article) = source.next_article() {
            let mut dirent = Dirent {
                aid: article.aid(),
                namespace: article.namespace(),
                url: article.url(),
                title: article.title(),
                parameter: article.parameter(),
                ..Dirent::default()
            };
            if article.is_redirect() {
                dirent.kind = DirentKind::Redirect;
                dirent.redirect_aid = article.redirect_aid();
            } else if article.is_linktarget() {
                dirent.kind = DirentKind::Linktarget;
            } else if article.is_deleted() {
                dirent.kind = DirentKind::Deleted;
            } else {
                dirent.kind = DirentKind::Article;
                dirent.mime_type_idx = self.mime_types.intern(&article.mime_type())?;
                dirent.compress = article.should_compress();
            }
            self.dirents.push(dirent);
        }

        self.dirents.sort_by(|a, b| a.aid.cmp(&b.aid));

        // Remove redirects whose target aid does not exist. The vector
        // stays aid-sorted, so the lookups below remain valid.
        let resolvable: Vec<bool> = self
            .dirents
            .iter()
            .map(|dirent| {
                !dirent.is_redirect()
                    || self
                        .dirents
                        .binary_search_by(|probe| {
                            probe.aid.as_str().cmp(dirent.redirect_aid.as_str())
                        })
                        .is_ok()
            })
            .collect();
        let dropped = resolvable.iter().filter(|&&ok| !ok).count();
        if dropped > 0 {
            let mut keep = resolvable.into_iter();
            self.dirents.retain(|_| keep.next().unwrap_or(false));
            eprintln!("removed {} invalid redirects", dropped);
            for _ in 0..dropped {
                crate::COUNTER.inc_ignored();
            }
        }

        self.dirents.sort_by(Dirent::compare_url);
        for (idx, dirent) in self.dirents.iter_mut().enumerate() {
            dirent.idx = idx as u32;
        }

        self.dirents.sort_by(|a, b| a.aid.cmp(&b.aid));

        // Translate redirect aids to indices. A miss here would contradict
        // the removal pass above.
        let mut resolved = Vec::new();
        for (pos, dirent) in self.dirents.iter().enumerate() {
            if !dirent.is_redirect() {
                continue;
            }
            match self.dirents.binary_search_by(|probe| {
                probe.aid.as_str().cmp(dirent.redirect_aid.as_str())
            }) {
                Ok(target) => resolved.push((pos, self.dirents[target].idx)),
                Err(_) => {
                    anyhow::bail!(
                        "internal error: redirect aid {} not found",
                        dirent.redirect_aid
                    )
                }
            }
        }
        for (pos, target_idx) in resolved {
            self.dirents[pos].redirect_idx = target_idx;
        }

        self.dirents.sort_by(Dirent::compare_url);
        Ok(())
    }

    /// Materializes the `(namespace, title)` permutation of dirent indices.
    fn create_title_index(&mut self) {
        self.title_idx = self.dirents.iter().map(|dirent| dirent.idx).collect();
        let dirents = &self.dirents;
        self.title_idx.sort_by(|&a, &b| {
            Dirent::compare_title(&dirents[a as usize], &dirents[b as usize])
        });
    }

    /// Packs article blobs into clusters written to the spill file and
    /// collects geo points on the way.
    fn create_clusters(&mut self, source: &mut dyn ArticleSource, tmpname: &str) -> Result<()> {
        let file = std::fs::File::create(tmpname)
            .with_context(|| format!("failed to create spill file {}", tmpname))?;
        let mut out = BufWriter::new(file);
        let mut cluster = Cluster::new(self.compression);
        let mut progress = 0;

        for i in 0..self.dirents.len() {
            while progress < i * 100 / self.dirents.len() + 1 {
                eprintln!("{}% ready", progress);
                progress += 10;
            }

            if !self.dirents[i].is_article() {
                continue;
            }
            let blob = source.get_data(&self.dirents[i].aid)?;
            self.add_geo_point(&blob, self.dirents[i].idx);
            if !blob.is_empty() {
                self.is_empty = false;
            }

            if self.dirents[i].compress {
                self.dirents[i].cluster = self.cluster_offsets.len() as u32;
                self.dirents[i].blob_idx = cluster.count() as u32;
                cluster.append(&blob);
                if cluster.byte_size() >= u64::from(self.min_chunk_size) * 1024 {
                    eprintln!(
                        "compress cluster with {} articles, {} bytes; current url \"{}\"",
                        cluster.count(),
                        cluster.byte_size(),
                        self.dirents[i].url
                    );
                    self.cluster_offsets.push(out.stream_position()?);
                    cluster.write_to(&mut out)?;
                    cluster.clear();
                }
            } else {
                if cluster.count() > 0 {
                    self.cluster_offsets.push(out.stream_position()?);
                    cluster.write_to(&mut out)?;
                    cluster.clear();
                }
                self.dirents[i].cluster = self.cluster_offsets.len() as u32;
                self.dirents[i].blob_idx = 0;
                self.cluster_offsets.push(out.stream_position()?);
                let mut single = Cluster::new(Compression::None);
                single.append(&blob);
                single.write_to(&mut out)?;
            }
            crate::COUNTER.inc_ok();
        }

        if cluster.count() > 0 {
            self.cluster_offsets.push(out.stream_position()?);
            cluster.write_to(&mut out)?;
        }

        out.flush()?;
        self.clusters_size = out.stream_position()?;
        Ok(())
    }

    fn add_geo_point(&mut self, blob: &[u8], index: u32) {
        if let Some((latitude, longitude)) = geo::extract_geo_position(blob) {
            self.geo_points.push(ArticleGeoPoint {
                point: GeoPoint::from_micro_degrees(latitude, longitude),
                index,
            });
        }
    }

    fn create_geo_index(&mut self) -> Result<()> {
        self.geo_index = geoindex::build(&mut self.geo_points)?;
        Ok(())
    }

    fn fill_header(&mut self, source: &mut dyn ArticleSource) {
        let main_aid = source.main_page();
        let layout_aid = source.layout_page();
        self.header.main_page = u32::MAX;
        self.header.layout_page = u32::MAX;
        if main_aid.is_some() || layout_aid.is_some() {
            for dirent in &self.dirents {
                if main_aid.as_deref() == Some(dirent.aid.as_str()) {
                    self.header.main_page = dirent.idx;
                }
                if layout_aid.as_deref() == Some(dirent.aid.as_str()) {
                    self.header.layout_page = dirent.idx;
                }
            }
        }
        self.header.uuid = source.uuid();
        self.header.article_count = self.dirents.len() as u32;
        self.header.cluster_count = self.cluster_offsets.len() as u32;
        self.header.mime_list_pos = self.mime_list_pos();
        self.header.url_ptr_pos = self.url_ptr_pos();
        self.header.title_idx_pos = self.title_idx_pos();
        self.header.geo_idx_pos = self.geo_idx_pos();
        self.header.cluster_ptr_pos = self.cluster_ptr_pos();
        self.header.checksum_pos = self.checksum_pos();
    }

    /// Streams every section through an MD5 tee and appends the digest.
    fn write_archive(&mut self, filename: &str, tmpname: &str) -> Result<()> {
        let file = std::fs::File::create(filename)
            .with_context(|| format!("failed to create archive {}", filename))?;
        let mut out = HashedWriter::<_, Md5>::new(BufWriter::new(file));

        self.header.write_to(&mut out)?;

        // The MIME list is emitted sorted; rewrite every article's id
        // through the permutation first.
        let (sorted_names, mapping) = self.mime_types.sorted();
        for dirent in &mut self.dirents {
            if dirent.is_article() {
                dirent.mime_type_idx = mapping[dirent.mime_type_idx as usize];
            }
        }
        for name in &sorted_names {
            out.write_cstring_bytes(name.as_bytes())?;
        }
        out.write_u8(0)?;

        let mut offset = self.index_pos();
        for dirent in &self.dirents {
            out.write_u64(offset)?;
            offset += dirent.disk_size();
        }

        for &title_entry in &self.title_idx {
            out.write_u32(title_entry)?;
        }

        out.write_all(&self.geo_index)?;

        for dirent in &self.dirents {
            dirent.write_to(&mut out)?;
        }

        // `offset` sits at the cluster pointer array now; the cluster data
        // base follows it.
        offset += self.cluster_offsets.len() as u64 * 8;
        for &cluster_offset in &self.cluster_offsets {
            out.write_u64(offset + cluster_offset)?;
        }

        if !self.is_empty {
            let mut spill = std::fs::File::open(tmpname)
                .with_context(|| format!("failed to open spill file {}", tmpname))?;
            std::io::copy(&mut spill, &mut out)?;
        } else {
            eprintln!("no data found");
        }

        if out.bytes_written() != self.header.checksum_pos {
            anyhow::bail!(
                "internal error: wrote {} bytes, checksum expected at {}",
                out.bytes_written(),
                self.header.checksum_pos
            );
        }
        let (mut file, digest) = out.finish();
        file.write_all(&digest)?;
        file.flush()?;
        Ok(())
    }

    pub fn article_count(&self) -> usize {
        self.dirents.len()
    }

    pub fn cluster_count(&self) -> usize {
        self.cluster_offsets.len()
    }

    fn mime_list_pos(&self) -> u64 {
        header::SIZE
    }

    fn mime_list_size(&self) -> u64 {
        1 + self
            .mime_types
            .names()
            .map(|name| name.len() as u64 + 1)
            .sum::<u64>()
    }

    fn url_ptr_pos(&self) -> u64 {
        self.mime_list_pos() + self.mime_list_size()
    }

    fn url_ptr_size(&self) -> u64 {
        self.dirents.len() as u64 * 8
    }

    fn title_idx_pos(&self) -> u64 {
        self.url_ptr_pos() + self.url_ptr_size()
    }

    fn title_idx_size(&self) -> u64 {
        self.title_idx.len() as u64 * 4
    }

    fn geo_idx_pos(&self) -> u64 {
        self.title_idx_pos() + self.title_idx_size()
    }

    fn geo_idx_size(&self) -> u64 {
        self.geo_index.len() as u64
    }

    /// Start of the dirent payload section.
    fn index_pos(&self) -> u64 {
        self.geo_idx_pos() + self.geo_idx_size()
    }

    fn index_size(&self) -> u64 {
        self.dirents.iter().map(|dirent| dirent.disk_size()).sum()
    }

    fn cluster_ptr_pos(&self) -> u64 {
        self.index_pos() + self.index_size()
    }

    fn cluster_ptr_size(&self) -> u64 {
        self.cluster_offsets.len() as u64 * 8
    }

    fn checksum_pos(&self) -> u64 {
        self.cluster_ptr_pos() + self.cluster_ptr_size() + self.clusters_size
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::archive::source::{MemoryArticle, MemorySource};
    use md5::Digest;

    fn article(aid: &str, ns: u8, url: &str, title: &str, data: &[u8]) -> MemoryArticle {
        MemoryArticle {
            aid: aid.to_string(),
            namespace: ns,
            url: url.to_string(),
            title: title.to_string(),
            mime_type: "text/html".to_string(),
            compress: true,
            data: data.to_vec(),
            ..MemoryArticle::default()
        }
    }

    fn redirect(aid: &str, ns: u8, url: &str, target_aid: &str) -> MemoryArticle {
        MemoryArticle {
            aid: aid.to_string(),
            namespace: ns,
            url: url.to_string(),
            redirect_aid: Some(target_aid.to_string()),
            ..MemoryArticle::default()
        }
    }

    pub(crate) fn temp_path(name: &str) -> String {
        let path = std::env::temp_dir().join(format!("zarc-test-{}-{}", std::process::id(), name));
        path.to_string_lossy().into_owned()
    }

    fn build(name: &str, source: &mut MemorySource) -> (String, ArchiveCreator) {
        let filename = temp_path(name);
        let mut creator = ArchiveCreator::new();
        creator.set_compression(Compression::None);
        creator.create(&filename, source).unwrap();
        (filename, creator)
    }

    #[test]
    fn test_empty_source_layout() {
        let mut source = MemorySource::new();
        source.uuid = *b"empty-uuid-test!";
        let (filename, creator) = build("empty", &mut source);
        let data = std::fs::read(&filename).unwrap();
        std::fs::remove_file(&filename).unwrap();
        // header + "\0" mime list + 12 byte geo header + md5
        assert_eq!(data.len(), 88 + 1 + 12 + 16);
        assert_eq!(creator.article_count(), 0);
        assert_eq!(creator.cluster_count(), 0);
        let header = Header::read_from(&mut MemReaderRef::new(&data)).unwrap();
        assert_eq!(header.article_count, 0);
        assert_eq!(header.cluster_count, 0);
        assert_eq!(header.mime_list_pos, 88);
        assert_eq!(header.url_ptr_pos, 89);
        assert_eq!(header.title_idx_pos, 89);
        assert_eq!(header.geo_idx_pos, 89);
        assert_eq!(header.cluster_ptr_pos, 101);
        assert_eq!(header.checksum_pos, 101);
        assert_eq!(header.main_page, u32::MAX);
        assert_eq!(header.layout_page, u32::MAX);
        assert_eq!(data[88], 0); // empty mime list
        assert_eq!(
            &data[89..101],
            &[1, 0, 0, 0, 12, 0, 0, 0, 12, 0, 0, 0] // geo header
        );
        let digest = Md5::digest(&data[..101]);
        assert_eq!(&data[101..], digest.as_slice());
    }

    #[test]
    fn test_dirents_are_url_sorted_with_dense_indices() {
        let mut source = MemorySource::new();
        source.push(article("3", b'B', "b", "", b"x"));
        source.push(article("1", b'A', "z", "", b"x"));
        source.push(article("2", b'A', "a", "", b"x"));
        let filename = temp_path("sorted");
        let mut creator = ArchiveCreator::new();
        creator.set_compression(Compression::None);
        creator.create(&filename, &mut source).unwrap();
        std::fs::remove_file(&filename).unwrap();
        let urls: Vec<(u8, &str)> = creator
            .dirents
            .iter()
            .map(|d| (d.namespace, d.url.as_str()))
            .collect();
        assert_eq!(urls, [(b'A', "a"), (b'A', "z"), (b'B', "b")]);
        for (pos, dirent) in creator.dirents.iter().enumerate() {
            assert_eq!(dirent.idx as usize, pos);
        }
    }

    #[test]
    fn test_redirect_resolution_and_invalid_drop() {
        let mut source = MemorySource::new();
        source.push(article("alpha", b'A', "target", "Target", b"content"));
        source.push(article("beta", b'A', "other", "Other", b"content"));
        source.push(redirect("rho", b'A', "moved", "alpha"));
        source.push(redirect("sigma", b'A', "gone", "unknown-aid"));
        let (filename, creator) = build("redirects", &mut source);
        std::fs::remove_file(&filename).unwrap();
        // The unresolvable redirect is silently dropped.
        assert_eq!(creator.article_count(), 3);
        let moved = creator
            .dirents
            .iter()
            .find(|d| d.url == "moved")
            .expect("redirect dirent");
        let target = creator
            .dirents
            .iter()
            .find(|d| d.url == "target")
            .expect("target dirent");
        assert_eq!(moved.kind, DirentKind::Redirect);
        assert_eq!(moved.redirect_idx, target.idx);
    }

    #[test]
    fn test_title_index_orders_by_title() {
        let mut source = MemorySource::new();
        source.push(article("1", b'A', "zzz", "Apple", b"x"));
        source.push(article("2", b'A', "aaa", "Zebra", b"x"));
        source.push(article("3", b'A', "mmm", "", b"x")); // sorts as url "mmm"
        let (filename, creator) = build("titles", &mut source);
        std::fs::remove_file(&filename).unwrap();
        let titles: Vec<&str> = creator
            .title_idx
            .iter()
            .map(|&i| creator.dirents[i as usize].sort_title())
            .collect();
        assert_eq!(titles, ["Apple", "Zebra", "mmm"]);
    }

    #[test]
    fn test_cluster_flush_at_min_chunk_size() {
        // 500 KiB compressible blobs with a 1024 KiB threshold: the third
        // append reaches 1500 KiB and flushes the cluster it was placed in,
        // so the fourth blob starts cluster 1.
        let mut source = MemorySource::new();
        let blob = vec![b'a'; 500 * 1024];
        source.push(article("1", b'A', "a", "", &blob));
        source.push(article("2", b'A', "b", "", &blob));
        source.push(article("3", b'A', "c", "", &blob));
        source.push(article("4", b'A', "d", "", &blob));
        let filename = temp_path("flush");
        let mut creator = ArchiveCreator::new();
        creator.set_compression(Compression::None);
        creator.set_min_chunk_size(1024);
        creator.create(&filename, &mut source).unwrap();
        std::fs::remove_file(&filename).unwrap();
        assert_eq!(creator.cluster_count(), 2);
        let by_url = |url: &str| {
            creator
                .dirents
                .iter()
                .find(|d| d.url == url)
                .unwrap()
                .clone()
        };
        assert_eq!((by_url("a").cluster, by_url("a").blob_idx), (0, 0));
        assert_eq!((by_url("b").cluster, by_url("b").blob_idx), (0, 1));
        assert_eq!((by_url("c").cluster, by_url("c").blob_idx), (0, 2));
        assert_eq!((by_url("d").cluster, by_url("d").blob_idx), (1, 0));
    }

    #[test]
    fn test_mixed_compressible_yields_three_clusters() {
        let mut source = MemorySource::new();
        source.push(article("1", b'A', "a", "", b"compressible a"));
        let mut plain = article("2", b'A', "b", "", b"stored as-is");
        plain.compress = false;
        source.push(plain);
        source.push(article("3", b'A', "c", "", b"compressible c"));
        let (filename, creator) = build("mixed", &mut source);
        std::fs::remove_file(&filename).unwrap();
        // a buffers; b flushes [a] then emits its own uncompressed
        // singleton; c buffers and flushes at the end.
        assert_eq!(creator.cluster_count(), 3);
        let by_url = |url: &str| creator.dirents.iter().find(|d| d.url == url).unwrap().clone();
        assert_eq!((by_url("a").cluster, by_url("a").blob_idx), (0, 0));
        assert_eq!((by_url("b").cluster, by_url("b").blob_idx), (1, 0));
        assert_eq!((by_url("c").cluster, by_url("c").blob_idx), (2, 0));
    }

    #[test]
    fn test_mime_list_sorted_and_ids_rewritten() {
        let mut source = MemorySource::new();
        let mut a = article("1", b'A', "page", "", b"x");
        a.mime_type = "text/html".to_string();
        let mut b = article("2", b'I', "pic", "", b"x");
        b.mime_type = "image/png".to_string();
        let mut c = article("3", b'A', "data", "", b"x");
        c.mime_type = "application/json".to_string();
        source.push(a);
        source.push(b);
        source.push(c);
        let (filename, creator) = build("mime", &mut source);
        let data = std::fs::read(&filename).unwrap();
        std::fs::remove_file(&filename).unwrap();
        // Emitted names must ascend lexicographically.
        let mut reader = MemReaderRef::new(&data);
        reader
            .seek(std::io::SeekFrom::Start(creator.header.mime_list_pos))
            .unwrap();
        let mut names = Vec::new();
        loop {
            let name = reader.read_cstring_bytes().unwrap();
            if name.is_empty() {
                break;
            }
            names.push(String::from_utf8(name).unwrap());
        }
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(names.len(), 3);
        // Rewritten ids point at the sorted positions.
        for dirent in &creator.dirents {
            if dirent.is_article() {
                let expected = match dirent.url.as_str() {
                    "page" => "text/html",
                    "pic" => "image/png",
                    "data" => "application/json",
                    other => panic!("unexpected url {}", other),
                };
                assert_eq!(names[dirent.mime_type_idx as usize], expected);
            }
        }
    }

    #[test]
    fn test_url_pointers_land_on_dirents() {
        let mut source = MemorySource::new();
        source.push(article("1", b'A', "first", "First", b"hello"));
        source.push(article("2", b'A', "second", "", b"world"));
        source.push(redirect("3", b'A', "third", "1"));
        let (filename, creator) = build("urlptr", &mut source);
        let data = std::fs::read(&filename).unwrap();
        std::fs::remove_file(&filename).unwrap();
        let header = Header::read_from(&mut MemReaderRef::new(&data)).unwrap();
        for i in 0..header.article_count as usize {
            let ptr_bytes: [u8; 8] = data[header.url_ptr_pos as usize + i * 8..]
                [..8]
                .try_into()
                .unwrap();
            let ptr = u64::from_le_bytes(ptr_bytes) as usize;
            let end = if i + 1 < header.article_count as usize {
                let next: [u8; 8] = data[header.url_ptr_pos as usize + (i + 1) * 8..][..8]
                    .try_into()
                    .unwrap();
                u64::from_le_bytes(next) as usize
            } else {
                header.cluster_ptr_pos as usize
            };
            let dirent = Dirent::read_from(&data[ptr..end]).unwrap();
            assert_eq!(dirent.url, creator.dirents[i].url);
        }
    }

    #[test]
    fn test_checksum_covers_everything_before_it() {
        let mut source = MemorySource::new();
        source.push(article("1", b'A', "x", "X", b"hi"));
        let (filename, _) = build("checksum", &mut source);
        let data = std::fs::read(&filename).unwrap();
        std::fs::remove_file(&filename).unwrap();
        let header = Header::read_from(&mut MemReaderRef::new(&data)).unwrap();
        let pos = header.checksum_pos as usize;
        assert_eq!(data.len(), pos + 16);
        let digest = Md5::digest(&data[..pos]);
        assert_eq!(&data[pos..], digest.as_slice());
    }

    #[test]
    fn test_main_and_layout_page_recorded() {
        let mut source = MemorySource::new();
        source.push(article("home", b'A', "index", "Home", b"x"));
        source.push(article("style", b'M', "layout", "Layout", b"x"));
        source.main_page = Some("home".to_string());
        source.layout_page = Some("style".to_string());
        let (filename, creator) = build("mainpage", &mut source);
        std::fs::remove_file(&filename).unwrap();
        let home = creator.dirents.iter().find(|d| d.url == "index").unwrap();
        let layout = creator.dirents.iter().find(|d| d.url == "layout").unwrap();
        assert_eq!(creator.header.main_page, home.idx);
        assert_eq!(creator.header.layout_page, layout.idx);
    }

    #[test]
    fn test_spill_file_removed_on_success() {
        let mut source = MemorySource::new();
        source.push(article("1", b'A', "x", "", b"hi"));
        let (filename, _) = build("spill", &mut source);
        assert!(!std::path::Path::new(&format!("{}.tmp", filename)).exists());
        std::fs::remove_file(&filename).unwrap();
    }

    #[test]
    fn test_geo_points_extracted_into_index() {
        let mut source = MemorySource::new();
        source.push(article(
            "1",
            b'A',
            "munich",
            "Munich",
            b"<html><meta name=\"geo.position\" content=\"48.137154;11.576124\"></html>",
        ));
        source.push(article("2", b'A', "nowhere", "Nowhere", b"<html>plain</html>"));
        let (filename, creator) = build("geo", &mut source);
        std::fs::remove_file(&filename).unwrap();
        assert_eq!(creator.geo_points.len(), 1);
        let munich = creator.dirents.iter().find(|d| d.url == "munich").unwrap();
        assert_eq!(creator.geo_points[0].index, munich.idx);
        let lat = crate::archive::geo::Latitude::to_micro_degrees(
            creator.geo_points[0].point.latitude,
        );
        assert!((lat - 48_137_154).abs() <= 1);
    }
}
