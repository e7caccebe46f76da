//! Integration tests for results documents.

use memsim_console::common::TransportError;
use memsim_console::stats::{Pid, ResultsDocument, ResultsSummary};

const SAMPLE: &str = r#"{
    "tlb_stats": {
        "hits": [[1001, 40], [1002, 10], [1001, 20]],
        "hit_rate": [[1001, 0.5], ["1002", 0.25], [1001, 1.0]]
    },
    "total_faults": 7,
    "page_faults": [[1001, 3], [1002, 4]]
}"#;

/// Tests parsing a complete results document.
#[test]
fn test_parse_results() {
    let doc = ResultsDocument::from_slice(SAMPLE.as_bytes()).unwrap();
    assert_eq!(doc.total_faults, 7);
    assert_eq!(doc.tlb_stats.hits.len(), 3);
    assert_eq!(doc.tlb_stats.hit_rate[1].0, Pid::Text("1002".to_string()));
    assert!(doc.time_series.is_none());
}

/// Tests per-process aggregation.
#[test]
fn test_summary() {
    let doc = ResultsDocument::from_slice(SAMPLE.as_bytes()).unwrap();
    let summary = ResultsSummary::from(&doc);

    assert_eq!(summary.total_faults, 7);
    let p1 = &summary.processes[&Pid::Number(1001)];
    assert_eq!(p1.tlb_hits, 60);
    assert_eq!(p1.page_faults, 3);
    assert_eq!(p1.mean_hit_rate(), Some(0.75));

    let p2 = &summary.processes[&Pid::Number(1002)];
    assert_eq!(p2.tlb_hits, 10);
    assert_eq!(p2.mean_hit_rate(), None);
}

/// Tests that optional series may be absent.
#[test]
fn test_minimal_document() {
    let doc = ResultsDocument::from_slice(br#"{"total_faults": 0}"#).unwrap();
    assert!(doc.tlb_stats.hits.is_empty());
    assert!(ResultsSummary::from(&doc).processes.is_empty());
}

/// Tests rejection of malformed documents.
#[test]
fn test_invalid_documents() {
    let cases: [&[u8]; 4] = [
        b"not json",
        br#"{"tlb_stats": {}}"#,
        br#"{"total_faults": -1}"#,
        br#"{"total_faults": 1, "tlb_stats": {"hit_rate": [[1, 1.5]]}}"#,
    ];
    for case in cases {
        assert!(matches!(
            ResultsDocument::from_slice(case),
            Err(TransportError::InvalidResponse(_))
        ));
    }
}

/// Tests that huge counts saturate instead of overflowing.
#[test]
fn test_summary_saturates() {
    let json = format!(
        r#"{{"total_faults": 1, "tlb_stats": {{"hits": [[1, {max}], [1, {max}]]}}, "page_faults": [[1, {max}], [1, 1]]}}"#,
        max = u64::MAX
    );
    let doc = ResultsDocument::from_slice(json.as_bytes()).unwrap();
    let summary = ResultsSummary::from(&doc);

    let totals = &summary.processes[&Pid::Number(1)];
    assert_eq!(totals.tlb_hits, u64::MAX);
    assert_eq!(totals.page_faults, u64::MAX);
}
