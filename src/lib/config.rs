//! Immutable run configuration for the pileup engine.
//!
//! All process-wide settings (conversion pair, CG-only mode, window block
//! size, thread count, name policy) are resolved once at startup and passed
//! to the core as a read-only [`TableConfig`] record.

use crate::errors::{FgmethError, Result};

/// Default number of reference bases materialized per window advance.
pub const DEFAULT_LOADING_BLOCK_SIZE: u64 = 1_000_000;

/// Returns the Watson-Crick complement of an uppercase nucleotide.
///
/// # Errors
/// Returns an error for any byte outside `A`, `C`, `G`, `T`.
pub fn complement(base: u8) -> Result<u8> {
    match base {
        b'A' => Ok(b'T'),
        b'T' => Ok(b'A'),
        b'C' => Ok(b'G'),
        b'G' => Ok(b'C'),
        other => Err(FgmethError::InvalidParameter {
            parameter: "base-change".to_string(),
            reason: format!("'{}' is not a nucleotide (expected A, C, G or T)", other as char),
        }),
    }
}

/// The conversion pair under observation, e.g. `C,T` for bisulfite-style
/// C→T conversion, together with the complements used on the minus strand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseChange {
    /// Reference base a conversion starts from (plus strand).
    pub from: u8,
    /// Read base a conversion turns into (plus strand).
    pub to: u8,
    /// Complement of `from`; marks minus-strand positions of interest.
    pub from_complement: u8,
    /// Complement of `to`; the minus-strand converted read base.
    pub to_complement: u8,
}

impl BaseChange {
    /// Parses a `--base-change` argument of the form `X,Y`.
    ///
    /// Both letters are upcased. The complements are computed (A↔T, C↔G);
    /// for the canonical `C,T` this yields the `G`/`A` pair.
    ///
    /// # Errors
    /// Returns an error if the argument is not two comma-separated
    /// nucleotide letters.
    pub fn parse(arg: &str) -> Result<Self> {
        let bytes = arg.as_bytes();
        if bytes.len() != 3 || bytes[1] != b',' {
            return Err(FgmethError::InvalidParameter {
                parameter: "base-change".to_string(),
                reason: format!("expected two comma-separated letters (e.g. C,T), got '{arg}'"),
            });
        }
        let from = bytes[0].to_ascii_uppercase();
        let to = bytes[2].to_ascii_uppercase();
        Ok(Self { from, to, from_complement: complement(from)?, to_complement: complement(to)? })
    }
}

/// Policy applied to FASTA header names so they match SAM-side naming.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NamePolicy {
    /// Use header names as written.
    #[default]
    AsIs,
    /// Strip a leading `chr` prefix from header names.
    StripChrPrefix,
    /// Prepend `chr` to header names that lack it.
    AddChrPrefix,
}

impl NamePolicy {
    /// Applies the policy to a chromosome name.
    #[must_use]
    pub fn apply(&self, name: &str) -> String {
        match self {
            NamePolicy::AsIs => name.to_string(),
            NamePolicy::StripChrPrefix => {
                name.strip_prefix("chr").unwrap_or(name).to_string()
            }
            NamePolicy::AddChrPrefix => {
                if name.starts_with("chr") {
                    name.to_string()
                } else {
                    format!("chr{name}")
                }
            }
        }
    }
}

/// Immutable configuration for one pileup run.
#[derive(Debug, Clone)]
pub struct TableConfig {
    /// The conversion pair and its complements.
    pub base_change: BaseChange,
    /// Restrict positions of interest to CpG dinucleotides.
    pub cg_only: bool,
    /// Count only uniquely mapped reads (`NH:i:1`).
    pub unique_only: bool,
    /// Count only multi-mapped reads (`NH:i` > 1).
    pub multiple_only: bool,
    /// Number of aggregator worker threads (minimum 1).
    pub threads: usize,
    /// Reference bases materialized per window advance.
    pub loading_block_size: u64,
    /// FASTA header name rewriting policy.
    pub name_policy: NamePolicy,
}

impl TableConfig {
    /// Creates a configuration with default block size and a single worker.
    #[must_use]
    pub fn new(base_change: BaseChange) -> Self {
        Self {
            base_change,
            cg_only: false,
            unique_only: false,
            multiple_only: false,
            threads: 1,
            loading_block_size: DEFAULT_LOADING_BLOCK_SIZE,
            name_policy: NamePolicy::AsIs,
        }
    }

    /// Validates cross-field constraints.
    ///
    /// # Errors
    /// Returns an error if both `unique_only` and `multiple_only` are set or
    /// if the thread count is zero.
    pub fn validate(&self) -> Result<()> {
        if self.unique_only && self.multiple_only {
            return Err(FgmethError::InvalidParameter {
                parameter: "unique-only/multiple-only".to_string(),
                reason: "the two filters are mutually exclusive".to_string(),
            });
        }
        if self.threads == 0 {
            return Err(FgmethError::InvalidParameter {
                parameter: "threads".to_string(),
                reason: "must be >= 1".to_string(),
            });
        }
        if self.loading_block_size == 0 {
            return Err(FgmethError::InvalidParameter {
                parameter: "loading-block-size".to_string(),
                reason: "must be >= 1".to_string(),
            });
        }
        Ok(())
    }
}
