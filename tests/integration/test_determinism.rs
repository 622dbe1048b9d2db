//! Determinism and concurrency: identical reruns, interleaving
//! insensitivity, and multi-worker aggregation.

use crate::helpers::*;

#[test]
fn test_reruns_are_byte_identical() {
    let fasta = create_test_fasta(&[("chr1", "ACGTACGT")]);
    let sam = create_test_sam(&[
        sam_record("read1", 0, "chr1", 1, "8M", "ACGTATAT", "IIIIIIII", "5C0G1", &[]),
        sam_record("read2", 0, "chr1", 6, "1M", "C", "J", "1", &[]),
    ]);

    let config = default_config();
    let first = run_table(&config, &sam, &fasta).unwrap();
    let second = run_table(&config, &sam, &fasta).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_interleaving_preserves_quality_multisets() {
    let fasta = create_test_fasta(&[("chr1", "ACGTACGT")]);
    // Three distinct reads voting unconverted at position 6 with distinct
    // quality bytes, in two different input orders.
    let a = sam_record("ra", 0, "chr1", 6, "1M", "C", "A", "1", &[]);
    let b = sam_record("rb", 0, "chr1", 6, "1M", "C", "B", "1", &[]);
    let c = sam_record("rc", 0, "chr1", 6, "1M", "C", "C", "1", &[]);
    let sam_one = create_test_sam(&[a.clone(), b.clone(), c.clone()]);
    let sam_two = create_test_sam(&[c, a, b]);

    let config = default_config();
    let rows_one = parse_table(&run_table(&config, &sam_one, &fasta).unwrap());
    let rows_two = parse_table(&run_table(&config, &sam_two, &fasta).unwrap());

    let row_one = find_row(&rows_one, "chr1", 6).unwrap();
    let row_two = find_row(&rows_two, "chr1", 6).unwrap();
    assert_eq!(
        quality_multiset(&row_one.unconverted_qualities),
        quality_multiset(&row_two.unconverted_qualities)
    );
    assert_eq!(row_one.unconverted_count, 3);
    assert_eq!(row_two.unconverted_count, 3);
}

#[test]
fn test_many_workers_agree_with_single_worker() {
    let fasta = create_test_fasta(&[("chr1", &"ACGT".repeat(50))]);
    // 100 distinct reads piled on the same 8 leading bases.
    let records: Vec<String> = (0..100)
        .map(|i| matching_record(&format!("r{i}"), "chr1", 1, "ACGTACGT"))
        .collect();
    let sam = create_test_sam(&records);

    let single = default_config();
    let mut parallel = default_config();
    parallel.threads = 4;

    let rows_single = parse_table(&run_table(&single, &sam, &fasta).unwrap());
    let rows_parallel = parse_table(&run_table(&parallel, &sam, &fasta).unwrap());
    assert_row_invariants(&rows_parallel);
    assert_sorted_by_encounter(&rows_parallel);

    assert_eq!(rows_single.len(), rows_parallel.len());
    for (a, b) in rows_single.iter().zip(&rows_parallel) {
        assert_eq!((a.reference.as_str(), a.pos, a.strand), (b.reference.as_str(), b.pos, b.strand));
        assert_eq!(
            quality_multiset(&a.unconverted_qualities),
            quality_multiset(&b.unconverted_qualities)
        );
        assert_eq!(a.unconverted_count, 100);
        assert_eq!(b.unconverted_count, 100);
    }
}

#[test]
fn test_read_contributes_at_most_one_byte_per_position() {
    let fasta = create_test_fasta(&[("chr1", "ACGTACGT")]);
    // The same read appears four times (e.g. supplementary records), always
    // voting the same way at the same positions.
    let record = matching_record("samename", "chr1", 1, "ACGTACGT");
    let sam = create_test_sam(&[record.clone(), record.clone(), record.clone(), record]);

    let table = run_table(&default_config(), &sam, &fasta).unwrap();
    let rows = parse_table(&table);
    assert_row_invariants(&rows);

    for row in &rows {
        assert_eq!(row.converted_count + row.unconverted_count, 1, "row {row:?}");
    }
}
