//! plagcheck server: HTTP REST API for assignment submissions
//!
//! Exposes the [`plagcheck::PlagiarismChecker`] lifecycle over HTTP:
//!
//! - **Submissions**: multipart upload, lookup by id, assignment or student,
//!   grading and withdrawal
//! - **Plagiarism**: background checks with a 202 acknowledgement, per
//!   submission results and assignment-wide rankings
//! - **Health & Metrics**: liveness/readiness probes and Prometheus metrics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `GET /` - API information
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `GET /metrics` - Prometheus metrics
//! - `POST /api/submissions/upload` - Upload a document (multipart)
//! - `GET /api/submissions/{id}` - Get a submission
//! - `DELETE /api/submissions/{id}` - Withdraw a submission
//! - `POST /api/submissions/{id}/grade` - Grade a checked submission
//! - `POST /api/submissions/{id}/check-plagiarism` - Start a check
//! - `GET /api/submissions/{id}/plagiarism` - Plagiarism result
//! - `GET /api/submissions/assignment/{assignmentId}` - Assignment submissions
//! - `GET /api/submissions/assignment/{assignmentId}/plagiarism-results` - Ranked results
//! - `GET /api/submissions/student/{studentId}` - Student submissions

pub mod config;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
