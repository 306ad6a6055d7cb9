use anyhow::{Context, Result};
use md5::{Digest, Md5};
use std::path::{Path, PathBuf};
use zarc_tool::archive::reader::Archive;
use zarc_tool::archive::source::{ArticleSource, MemoryArticle, SourceArticle};
use zarc_tool::archive::writer::ArchiveCreator;
use zarc_tool::args;
use zarc_tool::utils::files;
use zarc_tool::COUNTER;

fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "txt" => "text/plain",
        "js" => "application/javascript",
        "json" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

fn namespace_for(mime_type: &str) -> u8 {
    if mime_type == "text/html" {
        b'A'
    } else if mime_type.starts_with("image/") {
        b'I'
    } else {
        b'M'
    }
}

fn should_compress(mime_type: &str) -> bool {
    // Media formats already carry their own compression.
    mime_type.starts_with("text/")
        || mime_type == "application/javascript"
        || mime_type == "application/json"
        || mime_type == "image/svg+xml"
}

/// Feeds the files of a directory tree to the archive writer. The aid of a
/// file is its relative path.
struct DirectorySource {
    root: PathBuf,
    files: Vec<PathBuf>,
    cursor: usize,
    uuid: [u8; 16],
}

impl DirectorySource {
    fn new(root: &str) -> Result<Self> {
        let root = PathBuf::from(root);
        let found = files::find_files(&root)
            .with_context(|| format!("failed to scan directory {}", root.display()))?;
        let uuid: [u8; 16] = Md5::digest(root.to_string_lossy().as_bytes()).into();
        Ok(DirectorySource {
            root,
            files: found,
            cursor: 0,
            uuid,
        })
    }
}

impl ArticleSource for DirectorySource {
    fn next_article(&mut self) -> Option<Box<dyn SourceArticle>> {
        let path = self.files.get(self.cursor)?.clone();
        self.cursor += 1;
        let url = files::relative_url(&self.root, &path);
        let mime_type = mime_type_for(&path);
        let title = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Some(Box::new(MemoryArticle {
            aid: url.clone(),
            namespace: namespace_for(mime_type),
            url,
            title,
            mime_type: mime_type.to_string(),
            compress: should_compress(mime_type),
            ..MemoryArticle::default()
        }))
    }

    fn get_data(&mut self, aid: &str) -> Result<Vec<u8>> {
        let path = self.root.join(aid);
        files::read_file(&path).with_context(|| format!("failed to read {}", path.display()))
    }

    fn main_page(&self) -> Option<String> {
        self.files
            .iter()
            .map(|path| files::relative_url(&self.root, path))
            .find(|url| url == "index.html" || url.ends_with("/index.html"))
    }

    fn uuid(&self) -> [u8; 16] {
        self.uuid
    }
}

fn pack(arg: &args::Arg, input: &str, output: &Option<String>) -> Result<()> {
    let output = match output {
        Some(output) => output.clone(),
        None => format!("{}.zarc", input.trim_end_matches(['/', '\\'])),
    };
    let mut source = DirectorySource::new(input)?;
    if source.files.is_empty() {
        eprintln!("no files found in {}", input);
    }
    let mut creator = ArchiveCreator::from_args(arg);
    creator.create(&output, &mut source)?;
    eprintln!(
        "packed {} articles into {} clusters: {}",
        creator.article_count(),
        creator.cluster_count(),
        output
    );
    Ok(())
}

fn info(input: &str) -> Result<()> {
    let mut archive = Archive::open(input)?;
    let header = archive.header().clone();
    println!("uuid: {}", hex(&header.uuid));
    println!("articles: {}", header.article_count);
    println!("clusters: {}", header.cluster_count);
    println!("mime list at: {}", header.mime_list_pos);
    println!("url pointers at: {}", header.url_ptr_pos);
    println!("title index at: {}", header.title_idx_pos);
    println!("geo index at: {}", header.geo_idx_pos);
    println!("cluster pointers at: {}", header.cluster_ptr_pos);
    println!("checksum at: {}", header.checksum_pos);
    if header.main_page != u32::MAX {
        let dirent = archive.dirent(header.main_page)?;
        println!("main page: {}/{}", dirent.namespace as char, dirent.url);
    }
    println!("mime types: {}", archive.mime_types().join(", "));
    let checksum_ok = archive.verify_checksum()?;
    println!("checksum: {}", if checksum_ok { "ok" } else { "MISMATCH" });
    if !checksum_ok {
        anyhow::bail!("checksum mismatch in {}", input);
    }
    Ok(())
}

fn hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02x}", b)).collect()
}

fn main() {
    let arg = args::parse_args();
    let result = match &arg.command {
        args::Command::Pack { input, output } => pack(&arg, input, output),
        args::Command::Info { input } => info(input),
    };
    if let Err(error) = result {
        COUNTER.inc_error();
        eprintln!("{}", *COUNTER);
        eprintln!("error: {:?}", error);
        std::process::exit(1);
    }
    eprintln!("{}", *COUNTER);
}
