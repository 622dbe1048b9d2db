#![deny(unsafe_code)]
// Clippy lint configuration for CI
// These lints are allowed because:
// - cast_*: Genomic coordinate math intentionally casts between numeric types
// - missing_*_doc: Documentation improvements tracked separately
// - needless_pass_by_value: Some APIs designed for ownership transfer
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::needless_pass_by_value,
    clippy::module_name_repetitions,
    clippy::uninlined_format_args
)]

//! # fgmeth - Streaming Conversion Pileup Library
//!
//! Core functionality for tabulating converted vs. unconverted base
//! observations from a sorted SAM file against a reference FASTA, as
//! produced by three-nucleotide (bisulfite-style) aligners.
//!
//! ## Overview
//!
//! - **[`reference`]** - Memory-mapped FASTA with a chromosome offset index
//! - **[`window`]** - The sliding window of active reference positions
//! - **[`position`]** - Per-position tallies with per-read deduplication
//! - **[`decoder`]** - SAM record decoding (CIGAR/MD walk, conversion calls)
//! - **[`engine`]** - The dispatcher / aggregator / writer pipeline
//! - **[`channels`]** - Inter-stage queues and free pools
//!
//! ### Utilities
//!
//! - **[`config`]** - Immutable run configuration
//! - **[`errors`]** - Structured error types
//! - **[`validation`]** - Input validation with clear messages
//! - **[`logging`]** / **[`progress`]** - Formatting and throughput tracking
//!
//! ## Quick Start
//!
//! ```no_run
//! use fgmeth_lib::config::{BaseChange, TableConfig};
//! use fgmeth_lib::engine;
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = TableConfig::new(BaseChange::parse("C,T")?);
//! let output = Box::new(std::io::stdout());
//! let rows = engine::run(&config, Path::new("sorted.sam"), Path::new("ref.fa"), output)?;
//! # Ok(())
//! # }
//! ```

pub mod channels;
pub mod config;
pub mod decoder;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod position;
pub mod progress;
pub mod reference;
pub mod validation;
pub mod window;
