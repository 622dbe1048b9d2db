//! Integration tests for the fgmeth pileup engine.
//!
//! These tests drive [`fgmeth_lib::engine::run`] end to end over fixture
//! FASTA/SAM files and assert on the emitted table.

mod helpers;
mod test_boundaries;
mod test_determinism;
mod test_scenarios;
