//! Submission endpoints under `/api/submissions`.
//!
//! JSON bodies use camelCase field names.

use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use plagcheck::{
    CheckAck, DocumentFormat, FailureRecord, MatchDetail, PlagiarismResult,
    ResultFlag, Severity, Submission, SubmissionId, SubmissionStatus, UploadReceipt,
    UploadRequest,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Submission record without its document bytes.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub id: SubmissionId,
    pub assignment_id: u64,
    pub student_id: u64,
    pub file_name: String,
    pub format: Option<DocumentFormat>,
    pub file_size: usize,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: SubmissionStatus,
    pub revision: u32,
    pub score: Option<u8>,
    pub feedback: Option<String>,
    pub similarity_score: Option<f64>,
    pub last_failure: Option<FailureRecord>,
}

impl From<Submission> for SubmissionResponse {
    fn from(s: Submission) -> Self {
        Self {
            id: s.id,
            assignment_id: s.assignment_id,
            student_id: s.student_id,
            file_size: s.document.content.len(),
            file_name: s.document.file_name,
            format: s.document.format,
            submitted_at: s.submitted_at,
            updated_at: s.updated_at,
            status: s.status,
            revision: s.revision,
            score: s.score,
            feedback: s.feedback,
            similarity_score: s.plagiarism_result.map(|r| r.similarity_score),
            last_failure: s.last_failure,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    #[serde(flatten)]
    pub submission: SubmissionResponse,
    pub resubmission: bool,
    pub check_requested: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_error: Option<ExtractionErrorView>,
}

#[derive(Debug, Serialize)]
pub struct ExtractionErrorView {
    pub code: &'static str,
    pub message: String,
}

impl From<UploadReceipt> for UploadResponse {
    fn from(receipt: UploadReceipt) -> Self {
        Self {
            submission: receipt.submission.into(),
            resubmission: receipt.resubmission,
            check_requested: receipt.check_requested,
            extraction_error: receipt.extraction_error.map(|err| ExtractionErrorView {
                code: err.code(),
                message: err.to_string(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GradeRequest {
    pub score: u32,
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckAckResponse {
    pub submission_id: SubmissionId,
    pub status: SubmissionStatus,
    pub requested_at: DateTime<Utc>,
}

impl From<CheckAck> for CheckAckResponse {
    fn from(ack: CheckAck) -> Self {
        Self {
            submission_id: ack.submission_id,
            status: ack.status,
            requested_at: ack.requested_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchView {
    pub matched_submission_id: SubmissionId,
    pub shared_fingerprint_count: usize,
    pub score: f64,
    pub overlap: f64,
}

impl From<&MatchDetail> for MatchView {
    fn from(m: &MatchDetail) -> Self {
        Self {
            matched_submission_id: m.matched_submission_id,
            shared_fingerprint_count: m.shared_fingerprint_count,
            score: m.score,
            overlap: m.overlap,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultView {
    pub similarity_score: f64,
    pub average_score: f64,
    pub total_comparisons: usize,
    pub matched_comparisons: usize,
    pub candidates_considered: usize,
    pub severity: Severity,
    pub flags: Vec<ResultFlag>,
    pub matches: Vec<MatchView>,
    pub highlighted_text: Option<String>,
    pub report: String,
    pub computed_at: DateTime<Utc>,
}

impl From<&PlagiarismResult> for ResultView {
    fn from(r: &PlagiarismResult) -> Self {
        Self {
            similarity_score: r.similarity_score,
            average_score: r.average_score,
            total_comparisons: r.total_comparisons,
            matched_comparisons: r.matched_comparisons,
            candidates_considered: r.candidates_considered,
            severity: r.severity,
            flags: r.flags.clone(),
            matches: r.matches.iter().map(MatchView::from).collect(),
            highlighted_text: r.highlighted_text.clone(),
            report: r.render_report(),
            computed_at: r.computed_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlagiarismResponse {
    pub submission_id: SubmissionId,
    pub status: SubmissionStatus,
    /// False until a check has completed.
    pub computed: bool,
    pub result: Option<ResultView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResultEntry {
    pub submission_id: SubmissionId,
    #[serde(flatten)]
    pub result: ResultView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResultsResponse {
    pub assignment_id: u64,
    pub results: Vec<AssignmentResultEntry>,
}

fn parse_id(raw: &str, field: &str) -> ServerResult<u64> {
    raw.trim()
        .parse()
        .map_err(|_| ServerError::BadRequest(format!("{field} must be a positive integer, got '{raw}'")))
}

/// POST /api/submissions/upload
///
/// Multipart form with `assignmentId`, `studentId` and `file`.
pub async fn upload_submission(
    State(state): State<Arc<ServerState>>,
    mut multipart: Multipart,
) -> ServerResult<impl IntoResponse> {
    let mut assignment_id = None;
    let mut student_id = None;
    let mut file: Option<(String, Bytes)> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "assignmentId" => assignment_id = Some(parse_id(&field.text().await?, &name)?),
            "studentId" => student_id = Some(parse_id(&field.text().await?, &name)?),
            "file" => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| ServerError::BadRequest("file part has no file name".into()))?;
                file = Some((file_name, field.bytes().await?));
            }
            _ => {}
        }
    }

    let assignment_id =
        assignment_id.ok_or_else(|| ServerError::BadRequest("assignmentId is required".into()))?;
    let student_id =
        student_id.ok_or_else(|| ServerError::BadRequest("studentId is required".into()))?;
    let (file_name, content) =
        file.ok_or_else(|| ServerError::BadRequest("file is required".into()))?;

    let receipt = state
        .checker
        .upload(UploadRequest::new(assignment_id, student_id, file_name, content))
        .await?;
    Ok((StatusCode::CREATED, Json(UploadResponse::from(receipt))))
}

/// GET /api/submissions/{id}
pub async fn get_submission(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> ServerResult<Json<SubmissionResponse>> {
    let id = parse_id(&id, "id")?;
    Ok(Json(state.checker.submission(id).await?.into()))
}

/// DELETE /api/submissions/{id}
pub async fn withdraw_submission(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> ServerResult<StatusCode> {
    let id = parse_id(&id, "id")?;
    state.checker.withdraw(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/submissions/assignment/{assignmentId}
pub async fn assignment_submissions(
    State(state): State<Arc<ServerState>>,
    Path(assignment_id): Path<String>,
) -> ServerResult<Json<Vec<SubmissionResponse>>> {
    let assignment_id = parse_id(&assignment_id, "assignmentId")?;
    let submissions = state.checker.assignment_submissions(assignment_id).await?;
    Ok(Json(submissions.into_iter().map(Into::into).collect()))
}

/// GET /api/submissions/student/{studentId}
pub async fn student_submissions(
    State(state): State<Arc<ServerState>>,
    Path(student_id): Path<String>,
) -> ServerResult<Json<Vec<SubmissionResponse>>> {
    let student_id = parse_id(&student_id, "studentId")?;
    let submissions = state.checker.student_submissions(student_id).await?;
    Ok(Json(submissions.into_iter().map(Into::into).collect()))
}

/// POST /api/submissions/{id}/grade
pub async fn grade_submission(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    Json(body): Json<GradeRequest>,
) -> ServerResult<Json<SubmissionResponse>> {
    let id = parse_id(&id, "id")?;
    let graded = state.checker.grade(id, body.score, body.feedback).await?;
    Ok(Json(graded.into()))
}

/// POST /api/submissions/{id}/check-plagiarism
///
/// Answers 202 once the submission is `CHECKING`; the comparison finishes in
/// the background.
pub async fn check_plagiarism(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> ServerResult<impl IntoResponse> {
    let id = parse_id(&id, "id")?;
    let ack = state.checker.request_check(id).await?;
    Ok((StatusCode::ACCEPTED, Json(CheckAckResponse::from(ack))))
}

/// GET /api/submissions/{id}/plagiarism
pub async fn get_plagiarism(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> ServerResult<Json<PlagiarismResponse>> {
    let id = parse_id(&id, "id")?;
    let submission = state.checker.submission(id).await?;
    let result = submission.plagiarism_result.as_ref().map(ResultView::from);
    Ok(Json(PlagiarismResponse {
        submission_id: id,
        status: submission.status,
        computed: result.is_some(),
        result,
    }))
}

/// GET /api/submissions/assignment/{assignmentId}/plagiarism-results
pub async fn assignment_plagiarism_results(
    State(state): State<Arc<ServerState>>,
    Path(assignment_id): Path<String>,
) -> ServerResult<Json<AssignmentResultsResponse>> {
    let assignment_id = parse_id(&assignment_id, "assignmentId")?;
    let results = state
        .checker
        .assignment_results(assignment_id)
        .await?
        .iter()
        .map(|(submission_id, result)| AssignmentResultEntry {
            submission_id: *submission_id,
            result: result.into(),
        })
        .collect();
    Ok(Json(AssignmentResultsResponse {
        assignment_id,
        results,
    }))
}
