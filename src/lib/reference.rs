//! Memory-mapped reference FASTA access.
//!
//! The reference is mapped read-only and scanned once up front to record the
//! byte offset of each chromosome's first sequence line. Sequence bytes are
//! then consumed through a forward line reader anchored at a caller-held
//! offset, so the window loader can resume exactly where it stopped.

use anyhow::{Context, Result};
use log::debug;
use memchr::memchr;
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

use crate::config::NamePolicy;
use crate::errors::FgmethError;

/// A read-only memory map of a reference FASTA with a name → offset index.
///
/// The index maps each chromosome name (after the configured
/// [`NamePolicy`] rewriting) to the byte offset just past its `>` header
/// line, i.e. the start of its first sequence line. It is sorted by name for
/// binary-search lookup.
pub struct ReferenceMap {
    mmap: Mmap,
    index: Vec<(String, usize)>,
}

impl ReferenceMap {
    /// Opens and indexes a reference FASTA.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or mapped, or if it
    /// contains no `>` header at all.
    pub fn open<P: AsRef<Path>>(path: P, policy: NamePolicy) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open reference FASTA: {}", path.display()))?;
        // SAFETY: the map is read-only and the file is not truncated while in use.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file) }
            .with_context(|| format!("Failed to mmap reference FASTA: {}", path.display()))?;

        let index = Self::build_index(&mmap, policy);
        if index.is_empty() {
            return Err(FgmethError::InvalidFileFormat {
                file_type: "Reference FASTA".to_string(),
                path: path.display().to_string(),
                reason: "no '>' sequence headers found".to_string(),
            }
            .into());
        }
        debug!("Indexed {} reference sequences from {}", index.len(), path.display());
        Ok(Self { mmap, index })
    }

    /// One forward pass over the mapped bytes recording
    /// `(name, offset-just-after-header-line)` for every `>` line, then a
    /// sort by name for binary lookup.
    fn build_index(data: &[u8], policy: NamePolicy) -> Vec<(String, usize)> {
        let mut index = Vec::new();
        let mut offset = 0usize;
        while offset < data.len() {
            let line_end = match memchr(b'\n', &data[offset..]) {
                Some(i) => offset + i,
                None => data.len(),
            };
            let line = &data[offset..line_end];
            let after = (line_end + 1).min(data.len());
            if line.first() == Some(&b'>') {
                let name = Self::header_name(line, policy);
                index.push((name, after));
            }
            offset = after;
            if line_end == data.len() {
                break;
            }
        }
        index.sort_by(|a, b| a.0.cmp(&b.0));
        index
    }

    /// Extracts the chromosome name from a `>` header line: everything after
    /// the marker up to the first whitespace, with the name policy applied.
    fn header_name(line: &[u8], policy: NamePolicy) -> String {
        let body = &line[1..];
        let end = body.iter().position(|b| b.is_ascii_whitespace()).unwrap_or(body.len());
        let raw = String::from_utf8_lossy(&body[..end]);
        policy.apply(&raw)
    }

    /// Returns the byte offset of the first sequence line of `name`.
    ///
    /// # Errors
    /// Returns [`FgmethError::UnknownChromosome`] if the FASTA has no such
    /// sequence.
    pub fn seek(&self, name: &str) -> std::result::Result<usize, FgmethError> {
        self.index
            .binary_search_by(|(n, _)| n.as_str().cmp(name))
            .map(|i| self.index[i].1)
            .map_err(|_| FgmethError::UnknownChromosome { chromosome: name.to_string() })
    }

    /// Reads the line starting at `*offset` and advances the offset past the
    /// trailing newline. Returns `None` at end of file; empty lines yield
    /// `Some(&[])`.
    pub fn read_line(&self, offset: &mut usize) -> Option<&[u8]> {
        let data: &[u8] = &self.mmap;
        if *offset >= data.len() {
            return None;
        }
        let start = *offset;
        let end = match memchr(b'\n', &data[start..]) {
            Some(i) => start + i,
            None => data.len(),
        };
        *offset = (end + 1).min(data.len());
        Some(&data[start..end])
    }

    /// Indexed chromosome names, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.index.iter().map(|(n, _)| n.as_str())
    }
}
