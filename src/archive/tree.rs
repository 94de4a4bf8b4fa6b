use std::collections::HashMap;
use std::fmt;
use std::io::{Cursor, Read, Write};

use bytes::Bytes;
use thiserror::Error;
use tracing::debug;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::utils::is_safe_relative_path;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("not a valid zip archive: {0}")]
    Malformed(#[source] ZipError),

    #[error("corrupt entry {path}: {source}")]
    Corrupt {
        path: String,
        source: std::io::Error,
    },

    #[error("directory {0} does not exist in the archive")]
    MissingDirectory(String),

    #[error("invalid archive path: {0}")]
    InvalidPath(String),

    #[error("failed to write archive: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, ArchiveError>;

#[derive(Clone)]
enum EntryKind {
    Directory,
    File(Bytes),
}

#[derive(Clone)]
struct ArchiveEntry {
    path: String,
    kind: EntryKind,
    unix_mode: Option<u32>,
    stored: bool,
}

impl ArchiveEntry {
    fn weight(&self) -> u64 {
        match &self.kind {
            EntryKind::Directory => 1,
            EntryKind::File(data) => data.len() as u64 + 1,
        }
    }
}

/// Editable in-memory copy of a zip archive.
///
/// Entries keep the order they had in the source archive; new entries are
/// appended. Directory paths always end with `/`.
#[derive(Clone, Default)]
pub struct ArchiveTree {
    entries: Vec<ArchiveEntry>,
    index: HashMap<String, usize>,
}

impl fmt::Debug for ArchiveTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveTree")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl ArchiveTree {
    /// Parse `bytes` as a zip archive and load every entry into memory.
    pub fn open(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(ArchiveError::Malformed)?;
        let mut tree = ArchiveTree::default();

        for i in 0..archive.len() {
            let mut file = archive.by_index(i).map_err(ArchiveError::Malformed)?;
            let path = file.name().to_string();
            let unix_mode = file.unix_mode();
            let stored = file.compression() == CompressionMethod::Stored;

            let kind = if file.is_dir() {
                EntryKind::Directory
            } else {
                // The declared size comes from the archive itself and may lie.
                let mut data = Vec::new();
                file.read_to_end(&mut data)
                    .map_err(|source| ArchiveError::Corrupt {
                        path: path.clone(),
                        source,
                    })?;
                EntryKind::File(Bytes::from(data))
            };

            tree.insert(ArchiveEntry {
                path,
                kind,
                unix_mode,
                stored,
            });
        }

        debug!(entries = tree.len(), "Archive opened");
        Ok(tree)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.path.as_str())
    }

    /// Contents of the file at `path`, if there is one.
    pub fn file(&self, path: &str) -> Option<&[u8]> {
        let entry = &self.entries[*self.index.get(path)?];
        match &entry.kind {
            EntryKind::File(data) => Some(&data[..]),
            EntryKind::Directory => None,
        }
    }

    /// A directory exists when it has its own entry or anything lives below it.
    pub fn has_directory(&self, dir: &str) -> bool {
        dir.is_empty()
            || self.index.contains_key(dir)
            || self.entries.iter().any(|entry| entry.path.starts_with(dir))
    }

    /// Handle scoped to the directory `path`.
    ///
    /// With `create_missing` the directory and its parents are added when absent;
    /// otherwise a missing directory is an error.
    pub fn subtree(&mut self, path: &str, create_missing: bool) -> Result<Subtree<'_>> {
        let prefix = normalize_dir(path)?;
        if let Some(file) = self.file_ancestor(&prefix) {
            return Err(ArchiveError::InvalidPath(format!(
                "{prefix} (already a file at {file})"
            )));
        }
        if !self.has_directory(&prefix) {
            if !create_missing {
                return Err(ArchiveError::MissingDirectory(prefix));
            }
            self.ensure_directories(&prefix);
        }
        Ok(Subtree { tree: self, prefix })
    }

    /// The directory extras are injected into. Created when the base lacks it.
    pub fn injection_dir(&mut self, path: &str) -> Result<Subtree<'_>> {
        self.subtree(path, true)
    }

    /// Write every entry into a fresh zip, reporting the completed fraction
    /// after each one.
    pub fn serialize<F>(&self, mut on_progress: F) -> Result<Vec<u8>>
    where
        F: FnMut(f32),
    {
        let total: u64 = self.entries.iter().map(ArchiveEntry::weight).sum();
        let mut written = 0u64;
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        for entry in &self.entries {
            let method = if entry.stored {
                CompressionMethod::Stored
            } else {
                CompressionMethod::Deflated
            };
            let mut options = SimpleFileOptions::default().compression_method(method);
            if let Some(mode) = entry.unix_mode {
                options = options.unix_permissions(mode);
            }

            match &entry.kind {
                EntryKind::Directory => zip
                    .add_directory(entry.path.as_str(), options)
                    .map_err(serialization_error)?,
                EntryKind::File(data) => {
                    zip.start_file(entry.path.as_str(), options)
                        .map_err(serialization_error)?;
                    zip.write_all(data)
                        .map_err(|e| ArchiveError::Serialization(e.to_string()))?;
                }
            }

            written += entry.weight();
            on_progress(written as f32 / total as f32);
        }

        let cursor = zip.finish().map_err(serialization_error)?;
        let bytes = cursor.into_inner();
        debug!(entries = self.len(), bytes = bytes.len(), "Archive serialized");
        Ok(bytes)
    }

    /// First parent of `path` that is stored as a file rather than a directory.
    fn file_ancestor<'p>(&self, path: &'p str) -> Option<&'p str> {
        path.match_indices('/')
            .map(|(i, _)| &path[..i])
            .find(|ancestor| self.file(ancestor).is_some())
    }

    fn insert(&mut self, entry: ArchiveEntry) {
        match self.index.get(&entry.path) {
            Some(&slot) => self.entries[slot] = entry,
            None => {
                self.index.insert(entry.path.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    /// Add directory entries for `dir` and every parent that does not exist yet.
    fn ensure_directories(&mut self, dir: &str) {
        let mut current = String::new();
        for part in dir.split('/').filter(|p| !p.is_empty()) {
            current.push_str(part);
            current.push('/');
            if !self.has_directory(&current) {
                self.insert(ArchiveEntry {
                    path: current.clone(),
                    kind: EntryKind::Directory,
                    unix_mode: None,
                    stored: true,
                });
            }
        }
    }
}

/// Mutable view of one directory inside an [`ArchiveTree`].
pub struct Subtree<'a> {
    tree: &'a mut ArchiveTree,
    prefix: String,
}

impl Subtree<'_> {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Insert or overwrite `prefix/filename`. The last write wins.
    ///
    /// Returns the full archive path of the entry.
    pub fn add_file(&mut self, filename: &str, data: impl Into<Bytes>) -> Result<String> {
        let relative = normalize_file(filename)?;
        let path = format!("{}{}", self.prefix, relative);

        if self.tree.has_directory(&format!("{path}/")) {
            return Err(ArchiveError::InvalidPath(format!(
                "{path} (already a directory)"
            )));
        }
        if let Some(file) = self.tree.file_ancestor(&path) {
            return Err(ArchiveError::InvalidPath(format!(
                "{path} (already a file at {file})"
            )));
        }

        if let Some((parent, _)) = path.rsplit_once('/') {
            self.tree.ensure_directories(parent);
        }

        self.tree.insert(ArchiveEntry {
            path: path.clone(),
            kind: EntryKind::File(data.into()),
            unix_mode: None,
            stored: false,
        });
        Ok(path)
    }
}

fn normalize_parts(path: &str) -> Result<Vec<&str>> {
    let parts: Vec<&str> = path
        .split(['/', '\\'])
        .filter(|part| !part.is_empty() && *part != ".")
        .collect();
    if !parts.is_empty() && !is_safe_relative_path(path) {
        return Err(ArchiveError::InvalidPath(path.to_string()));
    }
    Ok(parts)
}

/// `"a\\b"` and `"./a/b"` both become `"a/b/"`; the root is `""`.
fn normalize_dir(path: &str) -> Result<String> {
    let parts = normalize_parts(path)?;
    Ok(parts.iter().map(|part| format!("{part}/")).collect())
}

fn normalize_file(filename: &str) -> Result<String> {
    let parts = normalize_parts(filename)?;
    if parts.is_empty() || filename.ends_with('/') {
        return Err(ArchiveError::InvalidPath(filename.to_string()));
    }
    Ok(parts.join("/"))
}

fn serialization_error(e: ZipError) -> ArchiveError {
    ArchiveError::Serialization(e.to_string())
}
