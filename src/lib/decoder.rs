//! SAM alignment decoding.
//!
//! Turns one SAM record line into an [`Alignment`]: the mapped flag, the
//! 1-based leftmost reference location, a stable 64-bit read-name hash, and
//! one observation per reference base the read covers. Conversion calls come
//! from walking CIGAR together with the `MD:Z` tag, which reconstructs the
//! reference base under every aligned read base without touching the FASTA.
//!
//! The `--unique-only` / `--multiple-only` filters are applied here, based
//! on the `NH:i` tag: a filtered record is reported as unmapped and never
//! reaches the window.

use bstr::ByteSlice;
use std::io::Cursor;

use crate::config::TableConfig;
use crate::errors::{FgmethError, Result};

/// SAM FLAG bit: segment unmapped.
const FLAG_UNMAPPED: u16 = 0x4;

/// One observation of a reference base by a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseObservation {
    /// 0-based offset from [`Alignment::location`].
    pub ref_pos: usize,
    /// Raw quality byte of the read base.
    pub qual: u8,
    /// True when the read base shows the configured conversion.
    pub converted: bool,
    /// True when the observation carries no conversion signal and must be
    /// skipped.
    pub remove: bool,
}

/// A decoded SAM record.
#[derive(Debug, Default)]
pub struct Alignment {
    /// False for unmapped, `*`-reference, or filtered-out records.
    pub mapped: bool,
    /// Reference chromosome name.
    pub chromosome: String,
    /// 1-based leftmost reference base covered.
    pub location: u64,
    /// Stable hash of the read name; identical reads always hash alike.
    pub read_name_id: u64,
    /// Observations at each covered reference base, ordered by `ref_pos`.
    pub bases: Vec<BaseObservation>,
}

/// Hashes a read name to its stable 64-bit identifier.
#[must_use]
pub fn read_name_id(name: &[u8]) -> u64 {
    // Slice reads cannot fail; seed 0 keeps the id reproducible across runs.
    murmur3::murmur3_x64_128(&mut Cursor::new(name), 0).map_or(0, |h| h as u64)
}

/// Decodes one SAM record line.
///
/// # Errors
/// Returns [`FgmethError::MalformedRecord`] when the record has fewer than
/// the eleven mandatory fields, a non-numeric FLAG/POS, an unparsable CIGAR,
/// or a mapped record without a consistent `MD:Z` tag.
pub fn decode(line: &[u8], config: &TableConfig) -> Result<Alignment> {
    let mut fields = line.split_str("\t");
    let qname = next_field(&mut fields, "QNAME")?;
    let flag: u16 = parse_int(next_field(&mut fields, "FLAG")?, "FLAG")?;
    let rname = next_field(&mut fields, "RNAME")?;
    let pos: u64 = parse_int(next_field(&mut fields, "POS")?, "POS")?;
    let _mapq = next_field(&mut fields, "MAPQ")?;
    let cigar = next_field(&mut fields, "CIGAR")?;
    let _rnext = next_field(&mut fields, "RNEXT")?;
    let _pnext = next_field(&mut fields, "PNEXT")?;
    let _tlen = next_field(&mut fields, "TLEN")?;
    let seq = next_field(&mut fields, "SEQ")?;
    let qual = next_field(&mut fields, "QUAL")?;

    let mut alignment = Alignment {
        mapped: false,
        chromosome: String::from_utf8_lossy(rname).into_owned(),
        location: pos,
        read_name_id: read_name_id(qname),
        bases: Vec::new(),
    };

    if flag & FLAG_UNMAPPED != 0 || rname == b"*" || pos == 0 || cigar == b"*" || seq == b"*" {
        return Ok(alignment);
    }

    let mut md_tag = None;
    let mut hit_count: u64 = 1;
    for tag in fields {
        if let Some(value) = tag.strip_prefix(b"MD:Z:") {
            md_tag = Some(value);
        } else if let Some(value) = tag.strip_prefix(b"NH:i:") {
            hit_count = parse_int(value, "NH")?;
        }
    }

    if (config.unique_only && hit_count > 1) || (config.multiple_only && hit_count <= 1) {
        return Ok(alignment);
    }

    let md = md_tag.ok_or_else(|| FgmethError::MalformedRecord {
        reason: "mapped record lacks an MD:Z tag".to_string(),
    })?;

    alignment.mapped = true;
    alignment.bases = walk(cigar, seq, qual, md, config)?;
    Ok(alignment)
}

fn next_field<'a>(
    fields: &mut impl Iterator<Item = &'a [u8]>,
    name: &str,
) -> Result<&'a [u8]> {
    fields.next().ok_or_else(|| FgmethError::MalformedRecord {
        reason: format!("missing mandatory field {name}"),
    })
}

fn parse_int<T: std::str::FromStr>(bytes: &[u8], name: &str) -> Result<T> {
    bytes
        .to_str()
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| FgmethError::MalformedRecord {
            reason: format!("field {name} is not a valid number: '{}'", bytes.as_bstr()),
        })
}

/// Walks CIGAR and MD in lockstep, emitting one observation per aligned
/// reference base. Insertions and soft clips consume read bases only;
/// deletions and reference skips consume reference without observations.
fn walk(
    cigar: &[u8],
    seq: &[u8],
    qual: &[u8],
    md: &[u8],
    config: &TableConfig,
) -> Result<Vec<BaseObservation>> {
    let change = &config.base_change;
    let has_qualities = qual != b"*";
    let mut md = MdWalker::new(md);
    let mut bases = Vec::with_capacity(seq.len());
    let mut read_cursor = 0usize;
    let mut ref_cursor = 0usize;

    for (len, op) in CigarIter::new(cigar) {
        let (len, op) = (len?, op);
        match op {
            b'M' | b'=' | b'X' => {
                for k in 0..len {
                    let read_base = *seq.get(read_cursor + k).ok_or_else(|| {
                        FgmethError::MalformedRecord {
                            reason: "CIGAR consumes more read bases than SEQ holds".to_string(),
                        }
                    })?;
                    let read_base = read_base.to_ascii_uppercase();
                    let ref_base = md.next_aligned(read_base)?.to_ascii_uppercase();

                    let (converted, mut remove) = if ref_base == change.from {
                        match read_base {
                            b if b == change.from => (false, false),
                            b if b == change.to => (true, false),
                            _ => (false, true),
                        }
                    } else if ref_base == change.from_complement {
                        match read_base {
                            b if b == change.from_complement => (false, false),
                            b if b == change.to_complement => (true, false),
                            _ => (false, true),
                        }
                    } else {
                        (false, true)
                    };

                    let quality = if has_qualities {
                        qual.get(read_cursor + k).copied().unwrap_or(b'!')
                    } else {
                        remove = true;
                        b'!'
                    };

                    bases.push(BaseObservation {
                        ref_pos: ref_cursor + k,
                        qual: quality,
                        converted,
                        remove,
                    });
                }
                read_cursor += len;
                ref_cursor += len;
            }
            b'I' | b'S' => read_cursor += len,
            b'D' => {
                md.skip_deletion(len)?;
                ref_cursor += len;
            }
            b'N' => ref_cursor += len,
            b'H' | b'P' => {}
            other => {
                return Err(FgmethError::MalformedRecord {
                    reason: format!("unknown CIGAR operation '{}'", other as char),
                });
            }
        }
    }
    Ok(bases)
}

/// Iterator over `(length, op)` pairs of a CIGAR string.
struct CigarIter<'a> {
    bytes: &'a [u8],
}

impl<'a> CigarIter<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }
}

impl Iterator for CigarIter<'_> {
    type Item = (Result<usize>, u8);

    fn next(&mut self) -> Option<Self::Item> {
        if self.bytes.is_empty() {
            return None;
        }
        let digits = self.bytes.iter().take_while(|b| b.is_ascii_digit()).count();
        if digits == 0 || digits == self.bytes.len() {
            self.bytes = &[];
            return Some((
                Err(FgmethError::MalformedRecord {
                    reason: "CIGAR operation without a length or trailing length".to_string(),
                }),
                0,
            ));
        }
        let len: usize = std::str::from_utf8(&self.bytes[..digits])
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let op = self.bytes[digits];
        self.bytes = &self.bytes[digits + 1..];
        Some((Ok(len), op))
    }
}

/// Incremental MD:Z walker: yields the reference base under each aligned
/// read base and consumes deletion runs.
struct MdWalker<'a> {
    bytes: &'a [u8],
    pending_matches: usize,
}

impl<'a> MdWalker<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pending_matches: 0 }
    }

    fn take_number(&mut self) -> Option<usize> {
        let digits = self.bytes.iter().take_while(|b| b.is_ascii_digit()).count();
        if digits == 0 {
            return None;
        }
        let n = std::str::from_utf8(&self.bytes[..digits])
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        self.bytes = &self.bytes[digits..];
        Some(n)
    }

    /// Reference base under the next aligned read base: the read base itself
    /// inside a match run, or the mismatch letter MD records.
    fn next_aligned(&mut self, read_base: u8) -> Result<u8> {
        loop {
            if self.pending_matches > 0 {
                self.pending_matches -= 1;
                return Ok(read_base);
            }
            if let Some(n) = self.take_number() {
                self.pending_matches = n;
                continue;
            }
            return match self.bytes.first() {
                Some(&b) if b.is_ascii_alphabetic() => {
                    self.bytes = &self.bytes[1..];
                    Ok(b)
                }
                _ => Err(FgmethError::MalformedRecord {
                    reason: "MD tag ran out before the CIGAR did".to_string(),
                }),
            };
        }
    }

    /// Consumes a `^`-introduced deletion of `len` reference bases.
    fn skip_deletion(&mut self, len: usize) -> Result<()> {
        if self.pending_matches == 0 {
            if let Some(n) = self.take_number() {
                self.pending_matches = n;
            }
        }
        if self.pending_matches > 0 || self.bytes.first() != Some(&b'^') {
            return Err(FgmethError::MalformedRecord {
                reason: "MD tag disagrees with a CIGAR deletion".to_string(),
            });
        }
        self.bytes = &self.bytes[1..];
        for _ in 0..len {
            match self.bytes.first() {
                Some(b) if b.is_ascii_alphabetic() => self.bytes = &self.bytes[1..],
                _ => {
                    return Err(FgmethError::MalformedRecord {
                        reason: "MD deletion shorter than the CIGAR deletion".to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}
