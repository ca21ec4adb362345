//! Loader error types

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for schema loading.
pub type LoadResult<T> = Result<T, LoadError>;

/// Errors surfaced while resolving and parsing a schema file tree.
#[derive(Debug, Error)]
pub enum LoadError {
    /// An include string matched no file on the include path.
    #[error("include \"{include}\" not found (searched {})", format_dirs(.searched))]
    FileNotFound {
        include: String,
        /// Directories probed, in search order.
        searched: Vec<PathBuf>,
    },

    /// A file was found but its content failed to parse.
    #[error("{}:{line}:{column}: {message}", .file.display())]
    ParseError {
        file: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    /// Reading or canonicalising a file failed.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn format_dirs(dirs: &[PathBuf]) -> String {
    let joined: Vec<String> = dirs.iter().map(|d| d.display().to_string()).collect();
    joined.join(", ")
}
