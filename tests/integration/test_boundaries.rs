//! Boundary behaviors: degenerate inputs and window-advance edges.

use crate::helpers::*;

#[test]
fn test_header_only_sam_emits_header_only() {
    let fasta = create_test_fasta(&[("chr1", "ACGT")]);
    let sam = create_test_sam(&[]);

    let table = run_table(&default_config(), &sam, &fasta).unwrap();
    assert!(parse_table(&table).is_empty());
}

#[test]
fn test_unplaced_records_are_skipped() {
    let fasta = create_test_fasta(&[("chr1", "ACGT")]);
    let sam = create_test_sam(&[
        sam_record("u1", 4, "*", 0, "*", "*", "*", "", &[]),
        sam_record("u2", 4, "*", 0, "*", "*", "*", "", &[]),
    ]);

    let table = run_table(&default_config(), &sam, &fasta).unwrap();
    assert!(parse_table(&table).is_empty());
}

#[test]
fn test_unknown_chromosome_is_fatal() {
    let fasta = create_test_fasta(&[("chr1", "ACGT")]);
    let sam = create_test_sam(&[matching_record("r1", "chrX", 1, "AC")]);

    let error = run_table(&default_config(), &sam, &fasta).unwrap_err();
    assert!(format!("{error}").contains("not found"), "unexpected error: {error}");
}

#[test]
fn test_malformed_record_is_fatal() {
    let fasta = create_test_fasta(&[("chr1", "ACGT")]);
    let sam = create_test_sam(&["r1\t0\tchr1\tnotanumber\t60\t1M".to_string()]);

    let error = run_table(&default_config(), &sam, &fasta).unwrap_err();
    assert!(format!("{error}").contains("Malformed"), "unexpected error: {error}");
}

#[test]
fn test_read_spanning_block_boundary_contributes_everywhere() {
    // Small blocks so the window advances mid-chromosome: the first read
    // spans the first reload boundary (8), the second forces two advances.
    let reference = "C".repeat(24);
    let fasta = create_test_fasta(&[("chr1", &reference)]);
    let sam = create_test_sam(&[
        matching_record("r1", "chr1", 5, &"C".repeat(8)), // covers 5..=12
        matching_record("r2", "chr1", 17, &"C".repeat(4)), // covers 17..=20
    ]);

    let mut config = default_config();
    config.loading_block_size = 8;
    let table = run_table(&config, &sam, &fasta).unwrap();
    let rows = parse_table(&table);
    assert_row_invariants(&rows);
    assert_sorted_by_encounter(&rows);

    let positions: Vec<u64> = rows.iter().map(|r| r.pos).collect();
    let expected: Vec<u64> = (5..=12).chain(17..=20).collect();
    assert_eq!(positions, expected);
    for row in &rows {
        assert_eq!(row.strand, '+');
        assert_eq!(row.unconverted_qualities, "I");
        assert_eq!(row.converted_count, 0);
    }
}

#[test]
fn test_record_at_exact_reload_boundary() {
    let reference = "C".repeat(20);
    let fasta = create_test_fasta(&[("chr1", &reference)]);
    let sam = create_test_sam(&[matching_record("r1", "chr1", 8, &"C".repeat(4))]);

    let mut config = default_config();
    config.loading_block_size = 8;
    let table = run_table(&config, &sam, &fasta).unwrap();
    let rows = parse_table(&table);

    let positions: Vec<u64> = rows.iter().map(|r| r.pos).collect();
    assert_eq!(positions, vec![8, 9, 10, 11]);
}

#[test]
fn test_multiline_fasta_sequences() {
    // 12 chr1 bases split over three FASTA lines.
    let fasta = {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, ">chr1\nACGT\nACGT\nACGT\n").unwrap();
        file.flush().unwrap();
        file
    };
    let sam = create_test_sam(&[matching_record("r1", "chr1", 1, "ACGTACGTACGT")]);

    let table = run_table(&default_config(), &sam, &fasta).unwrap();
    let rows = parse_table(&table);

    let positions: Vec<u64> = rows.iter().map(|r| r.pos).collect();
    assert_eq!(positions, vec![2, 3, 6, 7, 10, 11]);
}

#[test]
fn test_lowercase_reference_bases_are_upcased() {
    let fasta = create_test_fasta(&[("chr1", "acgtacgt")]);
    let sam = create_test_sam(&[matching_record("r1", "chr1", 1, "ACGTACGT")]);

    let table = run_table(&default_config(), &sam, &fasta).unwrap();
    let rows = parse_table(&table);
    let positions: Vec<u64> = rows.iter().map(|r| r.pos).collect();
    assert_eq!(positions, vec![2, 3, 6, 7]);
}
