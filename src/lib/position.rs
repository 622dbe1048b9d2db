//! Per-position tally records.
//!
//! A [`Position`] holds everything observed at one reference coordinate: the
//! converted and unconverted quality strings plus the per-read dedup ledger.
//! Aggregator threads merge observations concurrently, so the mutable tally
//! state sits behind the Position's own mutex; identity fields (chromosome,
//! location, strand) are written only by the dispatcher while it holds the
//! window write lock.

use parking_lot::{Mutex, MutexGuard};

/// Strand of interest for a reference position.
///
/// `Plus` marks a reference base equal to the conversion source, `Minus` its
/// complement. Positions that are neither are never emitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strand {
    /// Reference base equals `convert_from`.
    Plus,
    /// Reference base equals the complement of `convert_from`.
    Minus,
    /// Not a position of interest.
    #[default]
    NotOfInterest,
}

impl Strand {
    /// The single-character TSV representation.
    #[must_use]
    pub fn as_char(self) -> char {
        match self {
            Strand::Plus => '+',
            Strand::Minus => '-',
            Strand::NotOfInterest => '?',
        }
    }
}

/// One read's contribution at one position, keyed by the stable read-name
/// hash so that no read counts twice at the same coordinate.
#[derive(Debug, Clone, Copy)]
pub struct UniqueObservation {
    /// Stable 64-bit hash of the read name.
    pub read_name_id: u64,
    /// Whether the surviving vote was a converted base.
    pub is_converted: bool,
    /// The quality byte contributed by the vote.
    pub quality: u8,
    /// Set when the read's votes conflicted and were both retracted.
    pub removed: bool,
}

/// The mutable tally state of a position.
#[derive(Debug, Default)]
pub struct Tallies {
    /// One raw quality byte per accepted converted observation.
    pub converted_qualities: Vec<u8>,
    /// One raw quality byte per accepted unconverted observation.
    pub unconverted_qualities: Vec<u8>,
    /// Contributing reads, strictly ascending by `read_name_id`.
    pub unique_ids: Vec<UniqueObservation>,
}

impl Tallies {
    fn clear(&mut self) {
        self.converted_qualities.clear();
        self.unconverted_qualities.clear();
        self.unique_ids.clear();
    }

    /// Records `read_name_id`'s vote, returning `true` when the quality byte
    /// should be appended to the matching tally string.
    ///
    /// Cases:
    /// - unseen read: insert at the sorted slot, accept;
    /// - already retracted: ignore;
    /// - repeat of the same vote: ignore (idempotent per read);
    /// - conflicting vote: retract the prior contribution (drop the first
    ///   byte equal to the stored quality from its tally string), mark the
    ///   entry removed, and reject the new vote.
    fn merge_observation(&mut self, read_name_id: u64, converted: bool, quality: u8) -> bool {
        // Sorted input keeps most inserts at the tail.
        if self.unique_ids.last().is_none_or(|last| read_name_id > last.read_name_id) {
            self.unique_ids.push(UniqueObservation {
                read_name_id,
                is_converted: converted,
                quality,
                removed: false,
            });
            return true;
        }

        match self.unique_ids.binary_search_by_key(&read_name_id, |u| u.read_name_id) {
            Ok(index) => {
                let existing = self.unique_ids[index];
                if existing.removed || existing.is_converted == converted {
                    return false;
                }
                self.unique_ids[index].removed = true;
                let qualities = if existing.is_converted {
                    &mut self.converted_qualities
                } else {
                    &mut self.unconverted_qualities
                };
                if let Some(i) = qualities.iter().position(|&q| q == existing.quality) {
                    qualities.remove(i);
                }
                false
            }
            Err(index) => {
                self.unique_ids.insert(
                    index,
                    UniqueObservation {
                        read_name_id,
                        is_converted: converted,
                        quality,
                        removed: false,
                    },
                );
                true
            }
        }
    }
}

/// One reference coordinate of the pileup window.
#[derive(Debug, Default)]
pub struct Position {
    /// Reference chromosome name.
    pub chromosome: String,
    /// 1-based reference coordinate.
    pub location: u64,
    /// Strand of interest; `NotOfInterest` positions are recycled unwritten.
    pub strand: Strand,
    tallies: Mutex<Tallies>,
}

impl Position {
    /// Creates an unmaterialized position (used to seed the free pool).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-points a recycled position at a new reference base.
    /// `zero_based` is the running base count within the chromosome.
    pub fn materialize(&mut self, chromosome: &str, zero_based: u64) {
        self.chromosome.clear();
        self.chromosome.push_str(chromosome);
        self.location = zero_based + 1;
        self.strand = Strand::NotOfInterest;
    }

    /// Clears all state ahead of a return to the free pool, keeping buffer
    /// capacity.
    pub fn reset(&mut self) {
        self.chromosome.clear();
        self.location = 0;
        self.strand = Strand::NotOfInterest;
        self.tallies.get_mut().clear();
    }

    /// Merges one observation under this position's lock.
    pub fn append_base(&self, read_name_id: u64, converted: bool, quality: u8) {
        let mut tallies = self.tallies.lock();
        if tallies.merge_observation(read_name_id, converted, quality) {
            if converted {
                tallies.converted_qualities.push(quality);
            } else {
                tallies.unconverted_qualities.push(quality);
            }
        }
    }

    /// True when no observation survived at this position.
    pub fn is_empty(&self) -> bool {
        let tallies = self.tallies.lock();
        tallies.converted_qualities.is_empty() && tallies.unconverted_qualities.is_empty()
    }

    /// Locks and returns the tally state.
    pub fn tallies(&self) -> MutexGuard<'_, Tallies> {
        self.tallies.lock()
    }

    /// Drops the dedup ledger; called once a position is final and the
    /// per-read identities are no longer needed.
    pub fn clear_unique_ids(&self) {
        let mut tallies = self.tallies.lock();
        tallies.unique_ids.clear();
        tallies.unique_ids.shrink_to_fit();
    }
}
