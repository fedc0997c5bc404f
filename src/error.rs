//! Error types for the sample-profile annotator.
//!
//! Errors here are split along the taxonomy of possible failures: I/O and
//! structural problems reading the on-disk profile are recoverable (the
//! caller gets a `Result` and can fall back to disabling sample profiling),
//! while violations of the format's own invariants (an inline stack deeper
//! than `MAX_STACK`, a zero line number inside an index entry) are
//! programming errors and abort via `assert!`/`debug_assert!` instead of
//! flowing through this enum.

use std::path::PathBuf;

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading or consulting a sample profile.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An I/O error occurred while reading the profile file.
    #[error("error reading `{path}`: {source}")]
    Io {
        /// Path of the file being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file header's magic number does not match this format.
    #[error("`{0}` is not a sample profile (bad magic number)")]
    BadMagic(PathBuf),

    /// The file header declares a version this crate doesn't understand.
    #[error("`{path}` has unsupported sample-profile format version {version}")]
    UnsupportedVersion {
        /// Path of the file being read.
        path: PathBuf,
        /// The unsupported version found in the header.
        version: u32,
    },

    /// Both the branch-probabilities flag and the sample-profile flag were
    /// set; they are mutually exclusive and branch-probabilities wins.
    #[error(
        "sample profiling and -fbranch-probabilities-generate are mutually exclusive; \
         disabling sample profiling"
    )]
    ConfigConflict,
}
