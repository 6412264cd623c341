use std::sync::Arc;

use plagcheck::{
    ConfigLoadError, EngineError, InMemoryStore, PlagcheckConfig, PlagiarismChecker,
    SubmissionStatus, UploadRequest,
};

const ESSAY: &str = "Mitochondria generate most of the chemical energy needed to power the \
    biochemical reactions of the cell, storing it in adenosine triphosphate molecules.";

#[tokio::test]
async fn corrupt_docx_is_recorded_as_extraction_failure() {
    let checker = PlagiarismChecker::in_memory().unwrap();
    let receipt = checker
        .upload(UploadRequest::new(1, 1, "essay.docx", &b"PK\x03\x04 not really a zip"[..]))
        .await
        .unwrap();

    let err = receipt.extraction_error.expect("extraction should fail");
    assert_eq!(err.code(), "EXTRACTION_FAILURE");
    let failure = receipt.submission.last_failure.expect("failure recorded");
    assert_eq!(failure.code, "EXTRACTION_FAILURE");
    assert_eq!(receipt.submission.status, SubmissionStatus::Uploaded);
}

#[tokio::test]
async fn failed_extraction_can_be_fixed_by_resubmitting() {
    let checker = PlagiarismChecker::in_memory().unwrap();
    let broken = checker
        .upload(UploadRequest::new(1, 1, "essay.pdf", &b"not a pdf"[..]))
        .await
        .unwrap();
    assert!(broken.extraction_error.is_some());

    let fixed = checker
        .upload(UploadRequest::new(1, 1, "essay.txt", ESSAY))
        .await
        .unwrap();
    assert!(fixed.resubmission);
    assert!(fixed.extraction_error.is_none());
    assert_eq!(fixed.submission.id, broken.submission.id);
    assert!(fixed.submission.last_failure.is_none());
    assert!(checker.check(fixed.submission.id).await.is_ok());
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let checker = PlagiarismChecker::in_memory().unwrap();
    for err in [
        checker.check(9).await.unwrap_err(),
        checker.request_check(9).await.map(|_| ()).unwrap_err(),
        checker.grade(9, 50, None).await.map(|_| ()).unwrap_err(),
        checker.withdraw(9).await.unwrap_err(),
        checker.submission(9).await.map(|_| ()).unwrap_err(),
    ] {
        assert_eq!(err.code(), "NOT_FOUND", "{err}");
    }
}

#[tokio::test]
async fn grade_out_of_range_is_rejected() {
    let checker = PlagiarismChecker::in_memory().unwrap();
    let id = checker
        .upload(UploadRequest::new(1, 1, "essay.txt", ESSAY))
        .await
        .unwrap()
        .submission
        .id;
    checker.check(id).await.unwrap();

    assert_eq!(
        checker.grade(id, 250, None).await.unwrap_err(),
        EngineError::InvalidGrade { score: 250 }
    );
    assert_eq!(
        checker.submission(id).await.unwrap().status,
        SubmissionStatus::Checked
    );
}

#[tokio::test]
async fn grading_before_check_is_an_invalid_transition() {
    let checker = PlagiarismChecker::in_memory().unwrap();
    let id = checker
        .upload(UploadRequest::new(1, 1, "essay.txt", ESSAY))
        .await
        .unwrap()
        .submission
        .id;

    let err = checker.grade(id, 70, None).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition(ref t) if t.from == SubmissionStatus::Uploaded));
}

#[test]
fn invalid_config_is_refused_at_construction() {
    let mut cfg = PlagcheckConfig::default();
    cfg.fingerprint.k = 0;
    let err = PlagiarismChecker::new(cfg, Arc::new(InMemoryStore::new())).unwrap_err();
    assert_eq!(err.code(), "INVALID_CONFIG");

    let err = PlagcheckConfig::from_yaml("matcher:\n  min_relevance: 150\n").unwrap_err();
    assert!(matches!(err, ConfigLoadError::Validation(_)));
}

#[test]
fn error_codes_are_stable() {
    assert_eq!(
        EngineError::CheckInProgress { submission_id: 1 }.code(),
        "CHECK_IN_PROGRESS"
    );
    assert_eq!(
        EngineError::ReferencedByResults {
            submission_id: 1,
            referenced_by: vec![2]
        }
        .code(),
        "REFERENCED_BY_RESULTS"
    );
    assert_eq!(
        EngineError::PayloadTooLarge("x".into()).code(),
        "PAYLOAD_TOO_LARGE"
    );
}
