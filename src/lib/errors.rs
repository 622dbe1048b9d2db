//! Custom error types for fgmeth operations.

use thiserror::Error;

/// Result type alias for fgmeth operations
pub type Result<T> = std::result::Result<T, FgmethError>;

/// Error type for fgmeth operations
#[derive(Error, Debug)]
pub enum FgmethError {
    /// Invalid parameter value provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// The parameter name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// File format error
    #[error("Invalid {file_type} file '{path}': {reason}")]
    InvalidFileFormat {
        /// Type of file (e.g., "SAM", "FASTA")
        file_type: String,
        /// Path to the file
        path: String,
        /// Explanation of the problem
        reason: String,
    },

    /// SAM references a chromosome absent from the reference FASTA
    #[error("Chromosome '{chromosome}' not found in the reference FASTA")]
    UnknownChromosome {
        /// The chromosome name from the alignment record
        chromosome: String,
    },

    /// Alignment positions went backwards within one chromosome
    #[error(
        "Input alignment file is not sorted: position {pos} follows {last_pos} on '{chromosome}'"
    )]
    InputNotSorted {
        /// The chromosome on which the violation occurred
        chromosome: String,
        /// The offending record's position
        pos: u64,
        /// The previous record's position
        last_pos: u64,
    },

    /// Malformed SAM record
    #[error("Malformed SAM record: {reason}")]
    MalformedRecord {
        /// Explanation of the problem
        reason: String,
    },

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
