//! The writer: drains finalized positions into the TSV table.
//!
//! Positions arrive in ascending `(chromosome-as-encountered, location)`
//! order because the dispatcher retires the window head in order. Each
//! position is written as one row and recycled back to the free pool.

use std::io::{BufWriter, Write};

use crate::channels::{Channels, BACKPRESSURE_SLEEP};

/// The fixed header row of the output table.
pub const HEADER: &str = "ref\tpos\tstrand\tconvertedBaseQualities\tconvertedBaseCount\t\
                          unconvertedBaseQualities\tunconvertedBaseCount";

/// Writer loop: runs until shutdown and the output pool is empty.
/// Returns the number of rows written (excluding the header).
pub(crate) fn run(channels: &Channels, output: Box<dyn Write + Send>) -> u64 {
    let mut out = BufWriter::new(output);
    let mut rows = 0u64;

    let result = (|| -> std::io::Result<()> {
        writeln!(out, "{HEADER}")?;
        loop {
            if let Some(position) = channels.output_position_pool.pop() {
                {
                    let tallies = position.tallies();
                    write!(
                        out,
                        "{}\t{}\t{}\t",
                        position.chromosome,
                        position.location,
                        position.strand.as_char()
                    )?;
                    out.write_all(&tallies.converted_qualities)?;
                    write!(out, "\t{}\t", tallies.converted_qualities.len())?;
                    out.write_all(&tallies.unconverted_qualities)?;
                    writeln!(out, "\t{}", tallies.unconverted_qualities.len())?;
                }
                channels.recycle_position(position);
                rows += 1;
            } else if channels.working() {
                std::thread::sleep(BACKPRESSURE_SLEEP);
            } else {
                break;
            }
        }
        out.flush()
    })();

    if let Err(error) = result {
        // Route the failure to the dispatcher so the run exits non-zero.
        channels.fail(error.into());
    }
    rows
}
