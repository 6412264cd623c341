//! End-to-end checks through the public `PlagiarismChecker` API.

use std::io::{Cursor, Write};
use std::sync::Arc;

use bytes::Bytes;
use plagcheck::{
    CheckOutcome, InMemoryStore, PlagcheckConfig, PlagiarismChecker, PlagiarismResult, ResultFlag,
    Severity, SubmissionId, SubmissionStatus, UploadRequest,
};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const FOX: &str = "the quick brown fox jumps over the lazy dog";

async fn upload(
    checker: &PlagiarismChecker,
    student: u64,
    file_name: &str,
    content: impl Into<Bytes>,
) -> SubmissionId {
    checker
        .upload(UploadRequest::new(1, student, file_name, content))
        .await
        .expect("upload")
        .submission
        .id
}

async fn check(checker: &PlagiarismChecker, id: SubmissionId) -> PlagiarismResult {
    match checker.check(id).await.expect("check") {
        CheckOutcome::Completed(result) => result,
        CheckOutcome::Discarded { reason } => panic!("check discarded: {reason}"),
    }
}

fn docx(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{p}</w:t></w:r></w:p>"))
        .collect();
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("word/document.xml", SimpleFileOptions::default())
        .unwrap();
    write!(
        writer,
        r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    )
    .unwrap();
    writer.finish().unwrap().into_inner()
}

#[tokio::test]
async fn identical_short_texts_match_fully() {
    let checker = PlagiarismChecker::in_memory().unwrap();
    let s1 = upload(&checker, 1, "s1.txt", FOX).await;
    let s2 = upload(&checker, 2, "s2.txt", FOX).await;

    let result = check(&checker, s2).await;
    assert!((result.similarity_score - 100.0).abs() < 1e-9);
    assert_eq!(result.matches.len(), 1);
    assert_eq!(result.matches[0].matched_submission_id, s1);
    assert_eq!(result.severity, Severity::Critical);
    assert!(result
        .render_report()
        .starts_with("=== Plagiarism Detection Report ===\nSimilarity Score: 100.00%"));
}

#[tokio::test]
async fn single_shared_shingle_stays_below_relevance() {
    // w = 1 keeps every shingle, so 44 tokens give exactly 40 fingerprints.
    let mut cfg = PlagcheckConfig::default();
    cfg.fingerprint.w = 1;
    let checker = PlagiarismChecker::new(cfg, Arc::new(InMemoryStore::new())).unwrap();

    let s1 = upload(&checker, 1, "s1.txt", FOX).await;
    let filler: Vec<String> = (0..39).map(|i| format!("filler{i}")).collect();
    let s3_text = format!("the quick brown fox jumps {}", filler.join(" "));
    let s3 = upload(&checker, 3, "s3.txt", s3_text).await;

    let result = check(&checker, s3).await;
    assert!((result.similarity_score - 2.5).abs() < 1e-9);
    assert_eq!(result.candidates_considered, 1);
    assert_eq!(result.total_comparisons, 1);
    assert_eq!(result.matched_comparisons, 0);
    assert!(result.matches.iter().all(|m| m.matched_submission_id != s1));
    assert_eq!(result.severity, Severity::Low);
}

#[tokio::test]
async fn too_few_tokens_is_checked_with_a_flag() {
    let checker = PlagiarismChecker::in_memory().unwrap();
    upload(&checker, 1, "s1.txt", FOX).await;
    let short = upload(&checker, 2, "short.txt", "brown fox jumps").await;

    let result = check(&checker, short).await;
    assert_eq!(result.similarity_score, 0.0);
    assert_eq!(result.flags, vec![ResultFlag::InsufficientContent]);
    assert_eq!(
        checker.submission(short).await.unwrap().status,
        SubmissionStatus::Checked
    );
}

#[tokio::test]
async fn png_upload_is_unsupported() {
    let checker = PlagiarismChecker::in_memory().unwrap();
    let receipt = checker
        .upload(UploadRequest::new(1, 1, "diagram.png", vec![0x89, b'P', b'N', b'G']))
        .await
        .unwrap();
    assert_eq!(
        receipt.extraction_error.map(|e| e.code()),
        Some("UNSUPPORTED_FORMAT")
    );
    assert_eq!(receipt.submission.status, SubmissionStatus::Uploaded);

    let err = checker.check(receipt.submission.id).await.unwrap_err();
    assert_eq!(err.code(), "UNSUPPORTED_FORMAT");
    assert_eq!(
        checker.submission(receipt.submission.id).await.unwrap().status,
        SubmissionStatus::Uploaded
    );
}

#[tokio::test]
async fn containment_is_measured_from_the_target() {
    let checker = PlagiarismChecker::in_memory().unwrap();
    let long = format!(
        "{FOX} while the farmer watched from the porch and wondered why the dog \
         never bothered to chase anything at all during the long summer afternoons"
    );
    let whole = upload(&checker, 1, "long.txt", long).await;
    let excerpt = upload(&checker, 2, "excerpt.txt", FOX).await;

    let from_excerpt = check(&checker, excerpt).await;
    let from_whole = check(&checker, whole).await;
    assert!((from_excerpt.similarity_score - 100.0).abs() < 1e-9);
    assert!(from_whole.similarity_score < from_excerpt.similarity_score);

    // Overlap is symmetric.
    if let Some(reverse) = from_whole.matches.first() {
        assert!((from_excerpt.matches[0].overlap - reverse.overlap).abs() < 1e-9);
    }
}

#[tokio::test]
async fn docx_and_txt_of_the_same_text_match() {
    let checker = PlagiarismChecker::in_memory().unwrap();
    let paragraph = "Cells divide through mitosis, producing two daughter cells that carry \
                     identical copies of the parent genome and continue the cycle of growth";
    let txt = upload(&checker, 1, "essay.txt", paragraph).await;
    let doc = upload(&checker, 2, "essay.docx", docx(&[paragraph])).await;

    let result = check(&checker, doc).await;
    assert!((result.similarity_score - 100.0).abs() < 1e-9);
    assert_eq!(result.matches[0].matched_submission_id, txt);
}

#[tokio::test]
async fn assignment_results_show_every_checked_submission() {
    let checker = PlagiarismChecker::in_memory().unwrap();
    let s1 = upload(&checker, 1, "s1.txt", FOX).await;
    let s2 = upload(&checker, 2, "s2.txt", FOX).await;
    let unchecked = upload(&checker, 3, "s3.txt", "an entirely different essay about rivers and lakes").await;
    check(&checker, s1).await;
    check(&checker, s2).await;

    let ids: Vec<SubmissionId> = checker
        .assignment_results(1)
        .await
        .unwrap()
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    assert_eq!(ids, vec![s1, s2]);
    assert!(!ids.contains(&unchecked));
}

#[tokio::test]
async fn full_lifecycle_to_graded() {
    let checker = PlagiarismChecker::in_memory().unwrap();
    let id = upload(&checker, 1, "s1.txt", FOX).await;
    check(&checker, id).await;

    let graded = checker.grade(id, 92, Some("good".into())).await.unwrap();
    assert_eq!(graded.status, SubmissionStatus::Graded);
    assert_eq!(graded.score, Some(92));
    assert_eq!(graded.feedback.as_deref(), Some("good"));
    assert!(graded.plagiarism_result.is_some());
}
