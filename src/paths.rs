//! Catalog and local path assembly.
//!
//! A path is built from a container fragment (collection or directory) and an
//! optional leaf fragment (data object or file). The kind records which of
//! the two was given; callers enforce any pairing rules between kinds.

use crate::document::{RawDocument, keys};
use crate::error::Result;
use std::fmt;
use std::path::Path;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathKind {
    Collection,
    DataObject,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocalKind {
    Directory,
    File,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogPath {
    pub path: String,
    pub kind: PathKind,
}

impl CatalogPath {
    pub fn is_collection(&self) -> bool {
        self.kind == PathKind::Collection
    }
}

impl fmt::Display for CatalogPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalPath {
    pub path: String,
    pub kind: LocalKind,
}

impl LocalPath {
    pub fn is_directory(&self) -> bool {
        self.kind == LocalKind::Directory
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.path)
    }
}

impl fmt::Display for LocalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Resolve `collection`/`coll` plus optional `data_object`/`obj`.
pub fn resolve_catalog_path(document: &RawDocument) -> Result<CatalogPath> {
    let collection = document.text(keys::COLLECTION)?.require()?;
    match document.text(keys::DATA_OBJECT)?.optional() {
        Some(object) => Ok(CatalogPath {
            path: join_clean(&collection, &object),
            kind: PathKind::DataObject,
        }),
        None => {
            debug!("no data object key in input document");
            Ok(CatalogPath {
                path: clean_path(&collection),
                kind: PathKind::Collection,
            })
        }
    }
}

/// Resolve `directory`/`dir` plus optional `file`.
pub fn resolve_local_path(document: &RawDocument) -> Result<LocalPath> {
    let directory = document.text(keys::DIRECTORY)?.require()?;
    match document.text(keys::FILE)?.optional() {
        Some(file) => Ok(LocalPath {
            path: join_clean(&directory, &file),
            kind: LocalKind::File,
        }),
        None => {
            debug!("no file key in input document");
            Ok(LocalPath {
                path: clean_path(&directory),
                kind: LocalKind::Directory,
            })
        }
    }
}

fn join_clean(parent: &str, child: &str) -> String {
    clean_path(&format!("{parent}/{child}"))
}

/// Lexically normalize a slash-separated path.
///
/// Repeated separators and `.` segments are dropped, `..` consumes the
/// preceding segment (and is discarded at the root), and no trailing
/// separator is kept. An empty result becomes `.` (or `/` when rooted).
pub fn clean_path(raw: &str) -> String {
    let rooted = raw.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if rooted => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    match (rooted, joined.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}
