use clap::{ArgAction, ArgGroup, Parser, Subcommand};

fn parse_min_chunk_size(value: &str) -> Result<u32, String> {
    clap_num::number_range(value, 1, 1048576)
}

/// Tools for creating and inspecting zarc web content archives
#[derive(Parser, Debug)]
#[clap(group = ArgGroup::new("compressiong").multiple(false))]
#[command(version, about)]
pub struct Arg {
    #[arg(short = 's', long, value_name = "N", value_parser = parse_min_chunk_size, default_value_t = 960, global = true)]
    /// Minimal size of a compressed cluster in KiB
    pub min_chunk_size: u32,
    #[cfg(feature = "zlib")]
    #[arg(long, action = ArgAction::SetTrue, global = true, group = "compressiong")]
    /// Compress clusters with zlib
    pub zlib: bool,
    #[cfg(feature = "bzip2")]
    #[arg(long, action = ArgAction::SetTrue, global = true, group = "compressiong")]
    /// Compress clusters with bzip2
    pub bzip2: bool,
    #[cfg(feature = "lzma")]
    #[arg(long, action = ArgAction::SetTrue, global = true, group = "compressiong")]
    /// Compress clusters with lzma
    pub lzma: bool,
    #[command(subcommand)]
    /// Command
    pub command: Command,
}

impl Arg {
    /// Returns the compression selected on the command line, falling back to
    /// the strongest codec enabled at build time.
    pub fn compression(&self) -> crate::types::Compression {
        use crate::types::Compression;
        let mut compression = Compression::strongest_enabled();
        #[cfg(feature = "zlib")]
        if self.zlib {
            compression = Compression::Zlib;
        }
        #[cfg(feature = "bzip2")]
        if self.bzip2 {
            compression = Compression::Bzip2;
        }
        #[cfg(feature = "lzma")]
        if self.lzma {
            compression = Compression::Lzma;
        }
        compression
    }
}

#[derive(Subcommand, Debug)]
/// Commands
pub enum Command {
    /// Pack a directory tree into an archive
    Pack {
        /// Input directory
        input: String,
        /// Output archive file
        output: Option<String>,
    },
    /// Show header fields and counts of an archive
    Info {
        /// Archive file
        input: String,
    },
}

pub fn parse_args() -> Arg {
    Arg::parse()
}
