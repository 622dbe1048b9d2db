//! Aggregator workers: decode queued SAM lines and merge observations.
//!
//! Each worker holds its own lock while it processes a line. The lock never
//! serializes workers against each other; it exists so the dispatcher can
//! cycle all worker locks and know no aggregation is in flight before it
//! mutates the window.

use crate::channels::BACKPRESSURE_SLEEP;
use crate::decoder::{self, Alignment};
use crate::position::Strand;

use super::Shared;

/// Worker loop: runs until cooperative shutdown.
pub(crate) fn run(shared: &Shared, worker_id: usize) {
    let lock = &shared.worker_locks[worker_id];

    while shared.channels.working() {
        let guard = lock.lock();
        let Some(line) = shared.channels.line_pool.pop() else {
            drop(guard);
            std::thread::sleep(BACKPRESSURE_SLEEP);
            continue;
        };

        match decoder::decode(&line, &shared.config) {
            Ok(alignment) => {
                shared.channels.recycle_line(line);
                if alignment.mapped && !alignment.bases.is_empty() {
                    merge(shared, &alignment);
                }
            }
            Err(error) => {
                shared.channels.recycle_line(line);
                shared.channels.fail(error);
            }
        }
        drop(guard);
    }
}

/// Merges every live observation of one alignment into the window.
fn merge(shared: &Shared, alignment: &Alignment) {
    let mut window = shared.window.read();
    while window.is_empty() {
        // The dispatcher only queues lines for a materialized chromosome, so
        // this wait is a guard against startup races. The guard is dropped
        // each pass so the dispatcher's write lock can make progress.
        drop(window);
        if !shared.channels.working() {
            return;
        }
        std::thread::sleep(BACKPRESSURE_SLEEP);
        window = shared.window.read();
    }

    let Some(base_index) = window.index_of(alignment.location) else {
        return;
    };
    for observation in &alignment.bases {
        if observation.remove {
            continue;
        }
        let Some(position) = window.get(base_index + observation.ref_pos) else {
            break;
        };
        debug_assert_eq!(position.location, alignment.location + observation.ref_pos as u64);
        if position.strand == Strand::NotOfInterest {
            continue;
        }
        position.append_base(alignment.read_name_id, observation.converted, observation.qual);
    }
}
