//! Utilities for File Operations
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Reads a whole file into a vector.
pub fn read_file<P: AsRef<Path>>(path: P) -> io::Result<Vec<u8>> {
    fs::read(path)
}

/// Finds all files in the specified directory and its subdirectories.
/// The result is sorted by path.
pub fn find_files(path: &Path) -> io::Result<Vec<PathBuf>> {
    let mut result = Vec::new();
    collect_files(path, &mut result)?;
    result.sort();
    Ok(result)
}

fn collect_files(path: &Path, result: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, result)?;
        } else if path.is_file() {
            result.push(path);
        }
    }
    Ok(())
}

/// Returns the relative path from `root` to `target` as a string with `/`
/// separators.
pub fn relative_url(root: &Path, target: &Path) -> String {
    let rel = target.strip_prefix(root).unwrap_or(target);
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    parts.join("/")
}
