//! The sliding window of active reference positions.
//!
//! The window holds a contiguous, strictly increasing run of [`Position`]
//! records for the chromosome currently being tabulated. The dispatcher
//! appends freshly materialized reference bases at the tail and retires
//! finished blocks from the head; aggregators index into it read-only and
//! mutate individual positions under each position's own lock.
//!
//! Coordinates: `base_count` counts materialized bases of the current
//! chromosome (so the next base gets 1-based location `base_count + 1`), and
//! `covered` is the base count the window has been extended to. Records with
//! `pos <= covered - block` are always fully inside the window.

use std::collections::VecDeque;

use crate::channels::Channels;
use crate::config::TableConfig;
use crate::errors::FgmethError;
use crate::position::{Position, Strand};
use crate::reference::ReferenceMap;

/// Ordered arena of active reference positions.
pub struct PositionWindow {
    positions: VecDeque<Position>,
    chromosome: String,
    base_count: u64,
    covered: u64,
    last_base: u8,
    block: u64,
}

impl PositionWindow {
    /// Creates an empty window advancing in blocks of `block` bases.
    #[must_use]
    pub fn new(block: u64) -> Self {
        Self {
            positions: VecDeque::new(),
            chromosome: String::new(),
            base_count: 0,
            covered: 0,
            last_base: b'X',
            block,
        }
    }

    /// Name of the chromosome currently materialized.
    pub fn chromosome(&self) -> &str {
        &self.chromosome
    }

    /// Number of active positions.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// True when no positions are materialized.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// O(1) translation of a 1-based reference location to a window index.
    pub fn index_of(&self, location: u64) -> Option<usize> {
        let first = self.positions.front()?.location;
        if location < first {
            return None;
        }
        let index = (location - first) as usize;
        (index < self.positions.len()).then_some(index)
    }

    /// Position at a window index.
    pub fn get(&self, index: usize) -> Option<&Position> {
        self.positions.get(index)
    }

    /// Seeks the reference to `name` and materializes the chromosome's first
    /// `2 * block` bases (or all of them, whichever is shorter).
    ///
    /// # Errors
    /// Returns [`FgmethError::UnknownChromosome`] if the reference FASTA has
    /// no sequence of that name.
    pub fn load_new_chromosome(
        &mut self,
        name: &str,
        reference: &ReferenceMap,
        offset: &mut usize,
        config: &TableConfig,
        channels: &Channels,
    ) -> Result<(), FgmethError> {
        debug_assert!(self.positions.is_empty(), "window must be retired before a reload");
        *offset = reference.seek(name)?;
        self.chromosome.clear();
        self.chromosome.push_str(name);
        self.base_count = 0;
        self.covered = 2 * self.block;
        self.last_base = b'X';
        self.fill_until_covered(reference, offset, config, channels);
        Ok(())
    }

    /// Extends coverage by one block and materializes up to it.
    pub fn load_more(
        &mut self,
        reference: &ReferenceMap,
        offset: &mut usize,
        config: &TableConfig,
        channels: &Channels,
    ) {
        self.covered += self.block;
        self.fill_until_covered(reference, offset, config, channels);
    }

    fn fill_until_covered(
        &mut self,
        reference: &ReferenceMap,
        offset: &mut usize,
        config: &TableConfig,
        channels: &Channels,
    ) {
        while let Some(line) = reference.read_line(offset) {
            if line.is_empty() {
                continue;
            }
            if line[0] == b'>' {
                // Next chromosome's header: end of this sequence.
                break;
            }
            self.append_sequence_line(line, config, channels);
            if self.base_count >= self.covered {
                return;
            }
        }
    }

    /// Materializes one FASTA sequence line, assigning strands of interest.
    pub fn append_sequence_line(
        &mut self,
        line: &[u8],
        config: &TableConfig,
        channels: &Channels,
    ) {
        for (i, raw) in line.iter().enumerate() {
            let base = raw.to_ascii_uppercase();
            let mut position = channels.fetch_position();
            position.materialize(&self.chromosome, self.base_count + i as u64);

            if config.cg_only {
                if self.last_base == b'C' && base == b'G' {
                    if let Some(previous) = self.positions.back_mut() {
                        previous.strand = Strand::Plus;
                    }
                    position.strand = Strand::Minus;
                }
            } else if base == config.base_change.from {
                position.strand = Strand::Plus;
            } else if base == config.base_change.from_complement {
                position.strand = Strand::Minus;
            }

            self.positions.push_back(position);
            self.last_base = base;
        }
        self.base_count += line.len() as u64;
    }

    /// Retires the head block: every position with
    /// `location < covered - block` leaves the window, going to the output
    /// pool when it carries observations on a strand of interest and back to
    /// the free pool otherwise.
    pub fn retire_block(&mut self, channels: &Channels) {
        let threshold = self.covered.saturating_sub(self.block);
        while self.positions.front().is_some_and(|front| front.location < threshold) {
            if let Some(position) = self.positions.pop_front() {
                Self::dispose(position, channels);
            }
        }
    }

    /// Retires every remaining position (end of chromosome or end of input).
    /// The dedup ledgers of emitted positions are dropped here; a position
    /// is immutable once enqueued for output.
    pub fn retire_all(&mut self, channels: &Channels) {
        while let Some(position) = self.positions.pop_front() {
            if position.strand == Strand::NotOfInterest || position.is_empty() {
                channels.recycle_position(position);
            } else {
                position.clear_unique_ids();
                channels.output_position_pool.push(position);
            }
        }
    }

    fn dispose(position: Position, channels: &Channels) {
        if position.strand == Strand::NotOfInterest || position.is_empty() {
            channels.recycle_position(position);
        } else {
            channels.output_position_pool.push(position);
        }
    }
}
