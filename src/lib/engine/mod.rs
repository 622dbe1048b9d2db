//! The streaming pileup engine.
//!
//! One run couples three thread roles over shared state:
//!
//! ```text
//! ┌────────────┐    ┌──────────────┐    ┌────────────┐
//! │ Dispatcher │───>│ Aggregators  │───>│   Writer   │
//! │ (1 thread) │    │ (N threads)  │    │ (1 thread) │
//! └────────────┘    └──────────────┘    └────────────┘
//!      │                   │                   │
//!      ▼                   ▼                   ▼
//!   SAM mmap scan,      decode lines,      drain output
//!   window advance      merge into window  pool to TSV
//! ```
//!
//! The dispatcher owns window mutation (behind the write side of an
//! `RwLock`) and enforces sort order; aggregators take the read side and
//! mutate individual positions under each position's own lock; the writer
//! only ever sees positions after retirement. Quiescence for window
//! advances is guaranteed twice over: the dispatcher acquires every worker's
//! lock (so no aggregation is in flight) and then the window write lock.

mod dispatcher;
mod worker;
mod writer;

use anyhow::{Context, Result};
use log::info;
use memmap2::Mmap;
use parking_lot::{Mutex, RwLock};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::thread;

use crate::channels::Channels;
use crate::config::TableConfig;
use crate::logging::OperationTimer;
use crate::reference::ReferenceMap;
use crate::window::PositionWindow;

/// State shared by the dispatcher, the aggregators and the writer.
pub(crate) struct Shared {
    pub(crate) config: TableConfig,
    pub(crate) reference: ReferenceMap,
    pub(crate) window: RwLock<PositionWindow>,
    pub(crate) channels: Channels,
    /// One lock per aggregator; held by the worker while it processes a
    /// line, acquired in bulk by the dispatcher as a quiescence barrier.
    pub(crate) worker_locks: Vec<Mutex<()>>,
}

/// Runs one pileup end to end and returns the number of emitted rows.
///
/// # Errors
/// Returns an error for unreadable inputs, an unknown chromosome, unsorted
/// alignments, a malformed SAM record, or an output write failure.
pub fn run(
    config: &TableConfig,
    alignments_path: &Path,
    reference_path: &Path,
    output: Box<dyn Write + Send>,
) -> Result<u64> {
    let reference = ReferenceMap::open(reference_path, config.name_policy)?;

    let sam_file = File::open(alignments_path)
        .with_context(|| format!("Failed to open SAM file: {}", alignments_path.display()))?;
    // SAFETY: the map is read-only and the file is not truncated while in use.
    #[allow(unsafe_code)]
    let sam = unsafe { Mmap::map(&sam_file) }
        .with_context(|| format!("Failed to mmap SAM file: {}", alignments_path.display()))?;

    let shared = Shared {
        config: config.clone(),
        reference,
        window: RwLock::new(PositionWindow::new(config.loading_block_size)),
        channels: Channels::new(),
        worker_locks: (0..config.threads).map(|_| Mutex::new(())).collect(),
    };

    info!(
        "Tabulating {} against {} with {} worker thread(s)",
        alignments_path.display(),
        reference_path.display(),
        config.threads
    );
    let timer = OperationTimer::new("Tabulating alignments");

    let (records, rows) = thread::scope(|scope| -> Result<(u64, u64)> {
        for worker_id in 0..config.threads {
            let shared = &shared;
            scope.spawn(move || worker::run(shared, worker_id));
        }
        let writer_handle = {
            let shared = &shared;
            scope.spawn(move || writer::run(&shared.channels, output))
        };

        let dispatch_result = dispatcher::run(&shared, &sam);
        // Always release the other threads, even on a dispatch failure.
        shared.channels.shut_down();

        let rows = writer_handle.join().map_err(|_| anyhow::anyhow!("writer thread panicked"))?;
        let records = dispatch_result?;
        Ok((records, rows))
    })?;

    if let Some(failure) = shared.channels.take_failure() {
        return Err(failure.into());
    }

    timer.log_completion(records);
    info!("Wrote {rows} table rows");
    Ok(rows)
}
