//! Basic types
use int_enum::IntEnum;

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, IntEnum)]
/// Cluster compression
///
/// The discriminants are the tag bytes written at the start of every
/// cluster frame.
pub enum Compression {
    /// No compression
    None = 1,
    /// Zlib (deflate with zlib header)
    Zlib = 2,
    /// Bzip2
    Bzip2 = 3,
    /// LZMA (xz container)
    Lzma = 4,
}

impl Compression {
    /// Returns the strongest compression enabled at build time, or
    /// [Compression::None] when every codec feature is disabled.
    pub fn strongest_enabled() -> Self {
        if cfg!(feature = "lzma") {
            Compression::Lzma
        } else if cfg!(feature = "bzip2") {
            Compression::Bzip2
        } else if cfg!(feature = "zlib") {
            Compression::Zlib
        } else {
            Compression::None
        }
    }
}

impl AsRef<str> for Compression {
    /// Returns the codec name.
    fn as_ref(&self) -> &str {
        match self {
            Compression::None => "none",
            Compression::Zlib => "zlib",
            Compression::Bzip2 => "bzip2",
            Compression::Lzma => "lzma",
        }
    }
}
