//! A Rust library for creating and reading zarc web content archives.
//!
//! An archive packs a set of web articles (identified by a namespace byte
//! plus a URL) together with a title index, compressed blob clusters and an
//! optional geographic index into a single random-access file.
pub mod archive;
pub mod args;
pub mod ext;
pub mod types;
pub mod utils;

lazy_static::lazy_static! {
    pub static ref COUNTER: utils::counter::Counter = utils::counter::Counter::new();
}
