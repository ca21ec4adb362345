//! Include resolution for schema file trees
//!
//! The loader walks `include` directives depth-first, parsing each
//! file exactly once. Deduplication is by canonical path, so diamond
//! imports and self-imports are absorbed silently.
//!
//! The concrete grammar lives outside this crate: the loader is
//! generic over a [`SchemaParser`] collaborator that turns file
//! content into the syntax model.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::ast::Schema;
use super::errors::{LoadError, LoadResult};
use super::file_tree::FileTree;

/// Turns the text of one schema file into the syntax model.
///
/// Implemented by the (external) parser. Parse failures are reported
/// with a source location; the loader attributes them to the file it
/// was reading.
pub trait SchemaParser {
    fn parse(&self, path: &Path, source: &str) -> Result<Schema, ParseDiagnostic>;
}

/// A parse failure at a source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDiagnostic {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// Resolves a root schema file and its transitive includes into a
/// [`FileTree`].
///
/// Include strings are searched first relative to the directory of
/// the importing file, then in the configured include directories,
/// in order; the first existing match wins.
pub struct SchemaLoader<'p> {
    parser: &'p dyn SchemaParser,
    include_dirs: Vec<PathBuf>,
}

impl<'p> SchemaLoader<'p> {
    pub fn new(parser: &'p dyn SchemaParser, include_dirs: Vec<PathBuf>) -> Self {
        SchemaLoader {
            parser,
            include_dirs,
        }
    }

    /// Loads `root` and every file it transitively includes.
    ///
    /// # Errors
    ///
    /// * [`LoadError::FileNotFound`] if an include matches no file on
    ///   the include path.
    /// * [`LoadError::ParseError`] if any file fails to parse.
    /// * [`LoadError::Io`] if a read or canonicalisation fails.
    pub fn load(&self, root: &Path) -> LoadResult<FileTree<Schema>> {
        let root_canonical = canonicalize(root)?;
        let root_schema = self.parse_file(&root_canonical)?;

        let mut loaded = HashSet::new();
        loaded.insert(root_canonical.clone());

        let root_dir = parent_dir(&root_canonical);
        let includes = root_schema.includes.clone();
        let mut tree = FileTree::new(root_canonical, root_schema);

        self.load_includes(&includes, &root_dir, &mut loaded, &mut tree)?;

        tracing::debug!(
            root = %tree.root_path().display(),
            includes = tree.include_count(),
            "schema file tree loaded"
        );
        Ok(tree)
    }

    /// Depth-first walk over one file's include list.
    fn load_includes(
        &self,
        includes: &[String],
        importer_dir: &Path,
        loaded: &mut HashSet<PathBuf>,
        tree: &mut FileTree<Schema>,
    ) -> LoadResult<()> {
        for include in includes {
            let path = self.resolve_include(include, importer_dir)?;
            if !loaded.insert(path.clone()) {
                continue;
            }

            let schema = self.parse_file(&path)?;
            tracing::trace!(file = %path.display(), "include resolved");

            let nested = schema.includes.clone();
            let nested_dir = parent_dir(&path);
            tree.insert(path, schema);
            self.load_includes(&nested, &nested_dir, loaded, tree)?;
        }
        Ok(())
    }

    /// Maps an include string to a canonical path, or reports every
    /// directory that was probed.
    fn resolve_include(&self, include: &str, importer_dir: &Path) -> LoadResult<PathBuf> {
        let mut searched = Vec::with_capacity(1 + self.include_dirs.len());
        searched.push(importer_dir.to_path_buf());
        searched.extend(self.include_dirs.iter().cloned());

        for dir in &searched {
            let candidate = dir.join(include);
            if candidate.exists() {
                return canonicalize(&candidate);
            }
        }

        Err(LoadError::FileNotFound {
            include: include.to_string(),
            searched,
        })
    }

    fn parse_file(&self, path: &Path) -> LoadResult<Schema> {
        let source = fs::read_to_string(path).map_err(|e| LoadError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        self.parser
            .parse(path, &source)
            .map_err(|diag| LoadError::ParseError {
                file: path.to_path_buf(),
                line: diag.line,
                column: diag.column,
                message: diag.message,
            })
    }
}

fn canonicalize(path: &Path) -> LoadResult<PathBuf> {
    path.canonicalize().map_err(|e| LoadError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
