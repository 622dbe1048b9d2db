//! The dispatcher: single-threaded scan of the memory-mapped SAM file.
//!
//! For every record line the dispatcher classifies the record, enforces the
//! sorted-input contract, advances the window when the record's position
//! crosses the reload boundary, and hands the raw line to the aggregators.
//! Window advances happen only at full quiescence: the line pool is drained,
//! every worker lock is cycled, and the window write lock is held for the
//! mutation itself.

use bstr::ByteSlice;
use memchr::memchr_iter;

use crate::channels::{BACKPRESSURE_SLEEP, LINE_POOL_CAP_PER_WORKER, OUTPUT_POOL_FLUSH_GATE};
use crate::errors::{FgmethError, Result};
use crate::progress::ProgressTracker;

use super::Shared;

/// Scans the SAM bytes and drives the window. Returns the number of
/// dispatched record lines.
pub(crate) fn run(shared: &Shared, sam: &[u8]) -> Result<u64> {
    let progress = ProgressTracker::new("Dispatched alignment records");
    let line_cap = LINE_POOL_CAP_PER_WORKER * shared.config.threads;
    let block = shared.config.loading_block_size;

    let mut current_chromosome: Vec<u8> = Vec::new();
    let mut ref_offset = 0usize;
    let mut reload_pos: u64 = 0;
    let mut last_pos: u64 = 0;

    let mut start = 0usize;
    let mut line_ends = memchr_iter(b'\n', sam);
    loop {
        if !shared.channels.working() {
            break;
        }
        let line = match line_ends.next() {
            Some(end) => {
                let line = &sam[start..end];
                start = end + 1;
                line
            }
            None if start < sam.len() => {
                let line = &sam[start..];
                start = sam.len();
                line
            }
            None => break,
        };

        if line.is_empty() || line[0] == b'@' {
            continue;
        }
        let Some((rname, pos)) = chromosome_and_pos(line)? else {
            continue;
        };

        // Keep the parse backlog bounded before producing more work.
        while shared.channels.line_pool.len() > line_cap && shared.channels.working() {
            std::thread::sleep(BACKPRESSURE_SLEEP);
        }

        if rname != current_chromosome.as_slice() {
            drain_and_quiesce(shared);
            if !shared.channels.working() {
                break;
            }
            let name = String::from_utf8_lossy(rname).into_owned();
            let mut window = shared.window.write();
            window.retire_all(&shared.channels);
            window.load_new_chromosome(
                &name,
                &shared.reference,
                &mut ref_offset,
                &shared.config,
                &shared.channels,
            )?;
            drop(window);
            current_chromosome.clear();
            current_chromosome.extend_from_slice(rname);
            reload_pos = block;
            last_pos = 0;
        }

        while pos > reload_pos {
            drain_and_quiesce(shared);
            if !shared.channels.working() {
                break;
            }
            let mut window = shared.window.write();
            window.retire_block(&shared.channels);
            window.load_more(&shared.reference, &mut ref_offset, &shared.config, &shared.channels);
            drop(window);
            reload_pos += block;
        }
        if !shared.channels.working() {
            break;
        }

        if pos < last_pos {
            return Err(FgmethError::InputNotSorted {
                chromosome: String::from_utf8_lossy(rname).into_owned(),
                pos,
                last_pos,
            });
        }

        let mut buffer = shared.channels.fetch_line_buffer();
        buffer.extend_from_slice(line);
        shared.channels.line_pool.push(buffer);
        last_pos = pos;
        progress.log_if_needed(1);
    }

    // End of input: let the aggregators finish, flush the window, and wait
    // for the writer to catch up before signalling shutdown.
    drain_line_pool(shared);
    quiesce(shared);
    shared.window.write().retire_all(&shared.channels);
    while !shared.channels.output_position_pool.is_empty() && shared.channels.working() {
        std::thread::sleep(BACKPRESSURE_SLEEP);
    }
    shared.channels.shut_down();
    progress.log_final();
    Ok(progress.count())
}

/// Extracts SAM fields 3 (RNAME) and 4 (POS) from a record line.
/// Returns `None` for unplaced (`*`) records.
fn chromosome_and_pos(line: &[u8]) -> Result<Option<(&[u8], u64)>> {
    let mut fields = line.split_str("\t");
    let rname = fields.nth(2).ok_or_else(|| FgmethError::MalformedRecord {
        reason: "record has no RNAME field".to_string(),
    })?;
    let pos_bytes = fields.next().ok_or_else(|| FgmethError::MalformedRecord {
        reason: "record has no POS field".to_string(),
    })?;
    if rname == b"*" {
        return Ok(None);
    }
    let pos = pos_bytes.to_str().ok().and_then(|s| s.parse().ok()).ok_or_else(|| {
        FgmethError::MalformedRecord {
            reason: format!("POS is not a valid number: '{}'", pos_bytes.as_bstr()),
        }
    })?;
    Ok(Some((rname, pos)))
}

/// Waits until the aggregators have consumed every queued line and the
/// writer has worked the output pool back under the flush gate.
fn drain_line_pool(shared: &Shared) {
    while (!shared.channels.line_pool.is_empty()
        || shared.channels.output_position_pool.len() > OUTPUT_POOL_FLUSH_GATE)
        && shared.channels.working()
    {
        std::thread::sleep(BACKPRESSURE_SLEEP);
    }
}

/// Cycles every worker lock, forcing any in-flight aggregation to complete.
fn quiesce(shared: &Shared) {
    for lock in &shared.worker_locks {
        drop(lock.lock());
    }
}

fn drain_and_quiesce(shared: &Shared) {
    drain_line_pool(shared);
    quiesce(shared);
}
