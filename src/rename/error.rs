use std::path::PathBuf;

/// Errors that can occur while renaming run files
#[derive(Debug, thiserror::Error)]
pub enum RenameError {
    /// Filename does not split into the expected tokens
    #[error("Cannot parse run file name {file:?}: expected at least {expected} tokens, found {found}")]
    MalformedName {
        /// Offending file name
        file: String,
        /// Minimum number of tokens required
        expected: usize,
        /// Number of tokens found
        found: usize,
    },

    /// The next sequence index no longer fits in the five-digit prefix
    #[error("Sequence index {sequence} for {file} exceeds the five-digit prefix")]
    SequenceOverflow {
        /// File that would have received the index
        file: PathBuf,
        /// Index that does not fit
        sequence: u32,
    },

    /// The canonical name is already taken by another file
    #[error("Refusing to overwrite existing file: {0}")]
    TargetExists(PathBuf),

    /// Directory walk failed
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Rename on the filesystem failed
    #[error("Failed to rename {path}: {source}")]
    Io {
        /// Source path of the rename
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}
