//! Input contract for the archive writer.
use anyhow::Result;
use std::collections::HashMap;

/// One article as reported by a source.
///
/// The writer reads every field in a single pass, so implementations may be
/// backed by a non-replayable stream.
pub trait SourceArticle {
    /// Opaque source-assigned identifier, unique per article.
    fn aid(&self) -> String;
    /// Namespace byte partitioning the URL space.
    fn namespace(&self) -> u8;
    fn url(&self) -> String;
    /// Display title. Empty means "same as the URL".
    fn title(&self) -> String;
    /// Opaque bytes carried through into the directory entry.
    fn parameter(&self) -> Vec<u8> {
        Vec::new()
    }
    /// MIME type name. Only meaningful for plain articles.
    fn mime_type(&self) -> String;
    /// Whether this article's blob may share a compressed cluster.
    fn should_compress(&self) -> bool;
    fn is_redirect(&self) -> bool {
        false
    }
    fn is_linktarget(&self) -> bool {
        false
    }
    fn is_deleted(&self) -> bool {
        false
    }
    /// Aid of the redirect target. Only meaningful for redirects.
    fn redirect_aid(&self) -> String {
        String::new()
    }
}

/// A pull source of articles.
pub trait ArticleSource {
    /// Returns the next article, or [None] when the source is exhausted.
    /// This is a single-shot iteration.
    fn next_article(&mut self) -> Option<Box<dyn SourceArticle>>;

    /// Fetches the blob of an article by aid. Called once per plain article
    /// while clusters are packed.
    fn get_data(&mut self, aid: &str) -> Result<Vec<u8>>;

    /// Aid of the main page, if any.
    fn main_page(&self) -> Option<String> {
        None
    }

    /// Aid of the layout page, if any.
    fn layout_page(&self) -> Option<String> {
        None
    }

    /// Archive UUID recorded in the header.
    fn uuid(&self) -> [u8; 16];
}

/// An article held in memory, for sources assembled programmatically.
#[derive(Clone, Debug, Default)]
pub struct MemoryArticle {
    pub aid: String,
    pub namespace: u8,
    pub url: String,
    pub title: String,
    pub parameter: Vec<u8>,
    pub mime_type: String,
    pub compress: bool,
    /// Target aid when this entry is a redirect.
    pub redirect_aid: Option<String>,
    pub linktarget: bool,
    pub deleted: bool,
    pub data: Vec<u8>,
}

impl SourceArticle for MemoryArticle {
    fn aid(&self) -> String {
        self.aid.clone()
    }
    fn namespace(&self) -> u8 {
        self.namespace
    }
    fn url(&self) -> String {
        self.url.clone()
    }
    fn title(&self) -> String {
        self.title.clone()
    }
    fn parameter(&self) -> Vec<u8> {
        self.parameter.clone()
    }
    fn mime_type(&self) -> String {
        self.mime_type.clone()
    }
    fn should_compress(&self) -> bool {
        self.compress
    }
    fn is_redirect(&self) -> bool {
        self.redirect_aid.is_some()
    }
    fn is_linktarget(&self) -> bool {
        self.linktarget
    }
    fn is_deleted(&self) -> bool {
        self.deleted
    }
    fn redirect_aid(&self) -> String {
        self.redirect_aid.clone().unwrap_or_default()
    }
}

/// An in-memory [ArticleSource].
#[derive(Default)]
pub struct MemorySource {
    articles: Vec<MemoryArticle>,
    data: HashMap<String, Vec<u8>>,
    cursor: usize,
    pub main_page: Option<String>,
    pub layout_page: Option<String>,
    pub uuid: [u8; 16],
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, article: MemoryArticle) {
        self.data
            .insert(article.aid.clone(), article.data.clone());
        self.articles.push(article);
    }
}

impl ArticleSource for MemorySource {
    fn next_article(&mut self) -> Option<Box<dyn SourceArticle>> {
        let article = self.articles.get(self.cursor)?.clone();
        self.cursor += 1;
        Some(Box::new(article))
    }

    fn get_data(&mut self, aid: &str) -> Result<Vec<u8>> {
        self.data
            .get(aid)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no data for aid {}", aid))
    }

    fn main_page(&self) -> Option<String> {
        self.main_page.clone()
    }

    fn layout_page(&self) -> Option<String> {
        self.layout_page.clone()
    }

    fn uuid(&self) -> [u8; 16] {
        self.uuid
    }
}
