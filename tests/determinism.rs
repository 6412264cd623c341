use plagcheck::{
    canonicalize, fingerprint_document, CanonicalizeConfig, CheckOutcome, FingerprintConfig,
    FingerprintSet, PlagiarismChecker, PlagiarismResult, UploadRequest,
};

const ESSAY: &str = "Plate tectonics explains how the rigid outer shell of the Earth is broken \
    into slowly moving plates whose collisions raise mountain ranges, open ocean basins and \
    trigger the earthquakes recorded along their boundaries.";

fn fingerprints(text: &str) -> FingerprintSet {
    let doc = canonicalize("det", text, &CanonicalizeConfig::default()).expect("canonicalize");
    fingerprint_document(&doc, &FingerprintConfig::default()).expect("fingerprint")
}

async fn run_once() -> PlagiarismResult {
    let checker = PlagiarismChecker::in_memory().unwrap();
    for (student, text) in [(1, ESSAY), (2, "an unrelated essay on the history of printing presses in europe")] {
        checker
            .upload(UploadRequest::new(7, student, "essay.txt", text))
            .await
            .unwrap();
    }
    let target = checker
        .upload(UploadRequest::new(7, 3, "copy.txt", ESSAY.to_uppercase()))
        .await
        .unwrap();
    match checker.check(target.submission.id).await.unwrap() {
        CheckOutcome::Completed(result) => result,
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn equivalent_inputs_fingerprint_identically() {
    let a = fingerprints(ESSAY);
    let b = fingerprints(&format!("  {}  ", ESSAY.to_lowercase().replace(' ', "   ")));
    assert_eq!(a.distinct_hashes(), b.distinct_hashes());
    assert_eq!(a.meta, b.meta);
}

#[test]
fn repeated_runs_are_identical() {
    let first = fingerprints(ESSAY);
    for _ in 0..5 {
        assert_eq!(fingerprints(ESSAY), first);
    }
}

#[test]
fn seed_changes_hashes() {
    let doc = canonicalize("det", ESSAY, &CanonicalizeConfig::default()).unwrap();
    let a = fingerprint_document(&doc, &FingerprintConfig::default()).unwrap();
    let b = fingerprint_document(&doc, &FingerprintConfig::default().with_seed(42)).unwrap();
    assert_ne!(a.distinct_hashes(), b.distinct_hashes());
    assert!(!a.is_compatible_with(&b));
}

#[tokio::test]
async fn independent_checkers_agree() {
    let mut first = run_once().await;
    let second = run_once().await;
    first.computed_at = second.computed_at;
    assert_eq!(first, second);
    assert!((first.similarity_score - 100.0).abs() < 1e-9);
}
