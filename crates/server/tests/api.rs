use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use plagcheck::PlagiarismChecker;
use serde_json::{json, Value};
use server::{build_router, ServerConfig, ServerState};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const BOUNDARY: &str = "plagcheck-test-boundary";

const ESSAY: &str = "The industrial revolution transformed manufacturing across Europe. \
    Steam engines replaced water wheels and factories grew around coal fields. \
    Workers moved from farms into crowded cities searching for steady wages.";

fn app() -> Router {
    let checker = PlagiarismChecker::in_memory().unwrap();
    let state = ServerState::with_checker(ServerConfig::default(), checker);
    build_router(Arc::new(state))
}

fn multipart_body(assignment_id: &str, student_id: &str, file_name: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in [("assignmentId", assignment_id), ("studentId", student_id)] {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(assignment_id: &str, student_id: &str, file_name: &str, content: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/submissions/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(
            assignment_id,
            student_id,
            file_name,
            content,
        )))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn upload_essay(app: &Router, student: &str) -> u64 {
    let (status, body) = send(app, upload_request("7", student, "essay.txt", ESSAY.as_bytes())).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_u64().unwrap()
}

async fn wait_for_result(app: &Router, id: u64) -> Value {
    for _ in 0..200 {
        let (status, body) = send(app, get(&format!("/api/submissions/{id}/plagiarism"))).await;
        assert_eq!(status, StatusCode::OK);
        if body["computed"] == json!(true) {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("check for {id} never completed");
}

#[tokio::test]
async fn upload_returns_created_submission() {
    let app = app();
    let (status, body) = send(&app, upload_request("7", "42", "essay.txt", ESSAY.as_bytes())).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["assignmentId"], json!(7));
    assert_eq!(body["studentId"], json!(42));
    assert_eq!(body["fileName"], json!("essay.txt"));
    assert_eq!(body["format"], json!("txt"));
    assert_eq!(body["status"], json!("UPLOADED"));
    assert_eq!(body["resubmission"], json!(false));
    assert!(body.get("extractionError").is_none());
}

#[tokio::test]
async fn unsupported_upload_is_stored_with_extraction_error() {
    let app = app();
    let png = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
    let (status, body) = send(&app, upload_request("7", "42", "scan.png", &png)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], json!("UPLOADED"));
    assert_eq!(body["extractionError"]["code"], json!("UNSUPPORTED_FORMAT"));
}

#[tokio::test]
async fn upload_without_student_is_bad_request() {
    let app = app();
    let mut body = Vec::new();
    body.extend_from_slice(
        format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"assignmentId\"\r\n\r\n7\r\n--{BOUNDARY}--\r\n")
            .as_bytes(),
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/submissions/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("BAD_REQUEST"));
}

#[tokio::test]
async fn submissions_are_listed_by_assignment_and_student() {
    let app = app();
    let first = upload_essay(&app, "1").await;
    let second = upload_essay(&app, "2").await;

    let (status, body) = send(&app, get(&format!("/api/submissions/{first}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], json!(first));

    let (_, body) = send(&app, get("/api/submissions/assignment/7")).await;
    let ids: Vec<u64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&first) && ids.contains(&second));

    let (_, body) = send(&app, get("/api/submissions/student/2")).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], json!(second));
}

#[tokio::test]
async fn check_is_accepted_then_result_is_published() {
    let app = app();
    let first = upload_essay(&app, "1").await;
    let second = upload_essay(&app, "2").await;

    let (status, body) = send(&app, get(&format!("/api/submissions/{second}/plagiarism"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["computed"], json!(false));

    let (status, body) = send(
        &app,
        post_empty(&format!("/api/submissions/{second}/check-plagiarism")),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], json!("CHECKING"));

    let body = wait_for_result(&app, second).await;
    assert_eq!(body["status"], json!("CHECKED"));
    let result = &body["result"];
    assert_eq!(result["similarityScore"], json!(100.0));
    assert_eq!(result["severity"], json!("CRITICAL"));
    assert_eq!(result["matches"][0]["matchedSubmissionId"], json!(first));
    assert!(result["report"].as_str().unwrap().contains("CRITICAL"));

    let (status, body) = send(&app, get("/api/submissions/assignment/7/plagiarism-results")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["assignmentId"], json!(7));
    assert_eq!(body["results"][0]["submissionId"], json!(second));
}

#[tokio::test]
async fn grading_and_withdrawal_follow_the_lifecycle() {
    let app = app();
    let first = upload_essay(&app, "1").await;
    let second = upload_essay(&app, "2").await;

    let (status, body) = send(
        &app,
        post_json(&format!("/api/submissions/{second}/grade"), json!({ "score": 80 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], json!("INVALID_TRANSITION"));

    send(&app, post_empty(&format!("/api/submissions/{second}/check-plagiarism"))).await;
    wait_for_result(&app, second).await;

    // The first essay is referenced by the second's matches.
    let (status, body) = send(&app, delete(&format!("/api/submissions/{first}"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], json!("REFERENCED_BY_RESULTS"));
    assert_eq!(body["error"]["details"]["referencedBy"], json!([second]));

    let (status, body) = send(
        &app,
        post_json(
            &format!("/api/submissions/{second}/grade"),
            json!({ "score": 250 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("BAD_REQUEST"));

    let (status, body) = send(
        &app,
        post_json(
            &format!("/api/submissions/{second}/grade"),
            json!({ "score": 80, "feedback": "see me" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("GRADED"));
    assert_eq!(body["score"], json!(80));
    assert_eq!(body["feedback"], json!("see me"));

    let (status, _) = send(&app, delete(&format!("/api/submissions/{second}"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn withdrawn_submission_is_gone() {
    let app = app();
    let id = upload_essay(&app, "1").await;

    let (status, body) = send(&app, delete(&format!("/api/submissions/{id}"))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, body) = send(&app, get(&format!("/api/submissions/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], json!("NOT_FOUND"));
}

#[tokio::test]
async fn malformed_ids_and_unknown_routes() {
    let app = app();

    let (status, body) = send(&app, get("/api/submissions/abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("BAD_REQUEST"));

    let (status, body) = send(&app, get("/api/nowhere")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], json!("NOT_FOUND"));
}

#[tokio::test]
async fn health_and_readiness() {
    let app = app();

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("healthy"));

    let (status, body) = send(&app, get("/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ready"));

    let (status, body) = send(&app, get("/api/metadata")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["checksInFlight"], json!(0));
}

#[tokio::test]
async fn responses_carry_request_id() {
    let app = app();
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "abc-123")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "abc-123");
}
