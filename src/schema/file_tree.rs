//! A root file plus everything it transitively includes
//!
//! Includes are deduplicated by canonical path: a diamond or a
//! self-import contributes exactly one entry.

use serde::Serialize;
use std::path::{Path, PathBuf};

/// A canonical root path, the root value, and one entry per distinct
/// transitively included file, in depth-first load order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileTree<T> {
    root_path: PathBuf,
    root: T,
    includes: Vec<(PathBuf, T)>,
}

impl<T> FileTree<T> {
    pub fn new(root_path: PathBuf, root: T) -> Self {
        FileTree {
            root_path,
            root,
            includes: Vec::new(),
        }
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn root(&self) -> &T {
        &self.root
    }

    /// Number of included files (the root is not counted).
    pub fn include_count(&self) -> usize {
        self.includes.len()
    }

    /// Registers an included file. Callers are responsible for
    /// canonicalising `path` and for deduplication.
    pub fn insert(&mut self, path: PathBuf, value: T) {
        self.includes.push((path, value));
    }

    pub fn contains(&self, path: &Path) -> bool {
        path == self.root_path || self.includes.iter().any(|(p, _)| p == path)
    }

    pub fn get(&self, path: &Path) -> Option<&T> {
        if path == self.root_path {
            return Some(&self.root);
        }
        self.includes
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, value)| value)
    }

    /// Iterates the root first, then includes in load order.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &T)> {
        std::iter::once((self.root_path.as_path(), &self.root))
            .chain(self.includes.iter().map(|(p, v)| (p.as_path(), v)))
    }
}
