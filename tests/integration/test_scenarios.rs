//! End-to-end scenarios: strand calls, per-read dedup, conflicting votes,
//! sort-order enforcement, CG-only mode, chromosome switches.

use crate::helpers::*;

#[test]
fn test_basic_strand_and_conversion_calls() {
    // chr1 = ACGTACGT: C at 2/6 (plus strand), G at 3/7 (minus strand).
    let fasta = create_test_fasta(&[("chr1", "ACGTACGT")]);
    // The read matches except C→T at offset 5 and G→A at offset 6.
    let sam = create_test_sam(&[sam_record(
        "read1", 0, "chr1", 1, "8M", "ACGTATAT", "IIIIIIII", "5C0G1", &[],
    )]);

    let table = run_table(&default_config(), &sam, &fasta).unwrap();
    let rows = parse_table(&table);
    assert_row_invariants(&rows);
    assert_sorted_by_encounter(&rows);

    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0].pos, 2);
    assert_eq!(rows[0].strand, '+');
    assert_eq!(rows[0].unconverted_qualities, "I");
    assert_eq!(rows[0].converted_count, 0);

    assert_eq!(rows[1].pos, 3);
    assert_eq!(rows[1].strand, '-');
    assert_eq!(rows[1].unconverted_qualities, "I");

    assert_eq!(rows[2].pos, 6);
    assert_eq!(rows[2].strand, '+');
    assert_eq!(rows[2].converted_qualities, "I");
    assert_eq!(rows[2].unconverted_count, 0);

    assert_eq!(rows[3].pos, 7);
    assert_eq!(rows[3].strand, '-');
    assert_eq!(rows[3].converted_qualities, "I");
}

#[test]
fn test_duplicate_read_counts_once() {
    let fasta = create_test_fasta(&[("chr1", "ACGTACGT")]);
    // Two alignment records of the same read, both reporting a converted C
    // at position 6 with quality H.
    let converted = sam_record("dup", 0, "chr1", 6, "1M", "T", "H", "C", &[]);
    let sam = create_test_sam(&[converted.clone(), converted]);

    let table = run_table(&default_config(), &sam, &fasta).unwrap();
    let rows = parse_table(&table);

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].pos, 6);
    assert_eq!(rows[0].converted_qualities, "H");
    assert_eq!(rows[0].converted_count, 1);
    assert_eq!(rows[0].unconverted_count, 0);
}

#[test]
fn test_conflicting_votes_cancel_and_position_is_omitted() {
    let fasta = create_test_fasta(&[("chr1", "ACGTACGT")]);
    let sam = create_test_sam(&[
        sam_record("flip", 0, "chr1", 6, "1M", "T", "H", "C", &[]), // converted
        sam_record("flip", 0, "chr1", 6, "1M", "C", "J", "1", &[]), // unconverted
    ]);

    let table = run_table(&default_config(), &sam, &fasta).unwrap();
    let rows = parse_table(&table);
    // Both votes retract; the emptied position is never written.
    assert!(rows.is_empty(), "expected no rows, got {rows:?}");
}

#[test]
fn test_unsorted_input_is_fatal() {
    let fasta = create_test_fasta(&[("chr1", &"C".repeat(120))]);
    let sam = create_test_sam(&[
        matching_record("r1", "chr1", 100, "CC"),
        matching_record("r2", "chr1", 50, "CC"),
    ]);

    let error = run_table(&default_config(), &sam, &fasta).unwrap_err();
    assert!(format!("{error}").contains("not sorted"), "unexpected error: {error}");
}

#[test]
fn test_cg_only_restricts_to_cpg_pairs() {
    // chr1 = ACACG: the only CpG is positions 4 (C) and 5 (G). The C at
    // position 2 is not followed by G and stays out of interest.
    let fasta = create_test_fasta(&[("chr1", "ACACG")]);
    let sam = create_test_sam(&[matching_record("read1", "chr1", 1, "ACACG")]);

    let mut config = default_config();
    config.cg_only = true;
    let table = run_table(&config, &sam, &fasta).unwrap();
    let rows = parse_table(&table);
    assert_row_invariants(&rows);

    assert_eq!(rows.len(), 2);
    assert_eq!((rows[0].pos, rows[0].strand), (4, '+'));
    assert_eq!(rows[0].unconverted_qualities, "I");
    assert_eq!((rows[1].pos, rows[1].strand), (5, '-'));
    assert_eq!(rows[1].unconverted_qualities, "I");
    assert!(find_row(&rows, "chr1", 2).is_none());
}

#[test]
fn test_chromosomes_flush_in_encounter_order() {
    let fasta = create_test_fasta(&[("chr1", "AACGTT"), ("chr2", "TTGCAA")]);
    // chr2 is encountered first in the SAM; its rows must all precede chr1's.
    let sam = create_test_sam(&[
        matching_record("r1", "chr2", 3, "GC"),
        matching_record("r2", "chr1", 3, "CG"),
    ]);

    let table = run_table(&default_config(), &sam, &fasta).unwrap();
    let rows = parse_table(&table);
    assert_row_invariants(&rows);
    assert_sorted_by_encounter(&rows);

    let order: Vec<(&str, u64, char)> =
        rows.iter().map(|r| (r.reference.as_str(), r.pos, r.strand)).collect();
    assert_eq!(
        order,
        vec![("chr2", 3, '-'), ("chr2", 4, '+'), ("chr1", 3, '+'), ("chr1", 4, '-')]
    );
}

#[test]
fn test_unique_only_drops_multimapped_records() {
    let fasta = create_test_fasta(&[("chr1", "ACGTACGT")]);
    let sam = create_test_sam(&[
        sam_record("multi", 0, "chr1", 6, "1M", "C", "I", "1", &["NH:i:3"]),
        sam_record("uniq", 0, "chr1", 6, "1M", "C", "J", "1", &["NH:i:1"]),
    ]);

    let mut config = default_config();
    config.unique_only = true;
    let table = run_table(&config, &sam, &fasta).unwrap();
    let rows = parse_table(&table);

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].unconverted_qualities, "J");
}

#[test]
fn test_multiple_only_drops_unique_records() {
    let fasta = create_test_fasta(&[("chr1", "ACGTACGT")]);
    let sam = create_test_sam(&[
        sam_record("multi", 0, "chr1", 6, "1M", "C", "I", "1", &["NH:i:3"]),
        sam_record("uniq", 0, "chr1", 6, "1M", "C", "J", "1", &["NH:i:1"]),
    ]);

    let mut config = default_config();
    config.multiple_only = true;
    let table = run_table(&config, &sam, &fasta).unwrap();
    let rows = parse_table(&table);

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].unconverted_qualities, "I");
}
