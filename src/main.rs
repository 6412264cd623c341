use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use plagcheck::{CheckOutcome, InMemoryStore, PlagcheckConfig, PlagiarismChecker, UploadRequest};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: plagcheck [--config FILE] [--json] FILE FILE...";

/// Check a handful of local files against each other as one assignment.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config_path: Option<PathBuf> = None;
    let mut json = false;
    let mut files = Vec::new();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config_path = Some(args.next().ok_or(USAGE)?.into()),
            "--json" => json = true,
            "-h" | "--help" => {
                println!("{USAGE}");
                return Ok(());
            }
            _ => files.push(PathBuf::from(arg)),
        }
    }
    if files.len() < 2 {
        return Err(USAGE.into());
    }

    let cfg = match config_path {
        Some(path) => PlagcheckConfig::from_file(path)?,
        None => PlagcheckConfig::default(),
    };
    let checker = PlagiarismChecker::new(cfg, Arc::new(InMemoryStore::new()))?;

    const ASSIGNMENT: u64 = 1;
    let mut uploaded = Vec::with_capacity(files.len());
    for (student, path) in (1u64..).zip(&files) {
        let content = std::fs::read(path)?;
        let receipt = checker
            .upload(UploadRequest::new(ASSIGNMENT, student, file_name(path), content))
            .await?;
        if let Some(err) = &receipt.extraction_error {
            eprintln!("{}: {err}", path.display());
        }
        uploaded.push((path, receipt.submission.id));
    }

    for (path, id) in &uploaded {
        match checker.check(*id).await {
            Ok(CheckOutcome::Completed(result)) if json => {
                println!("{}", serde_json::to_string(&result)?);
            }
            Ok(CheckOutcome::Completed(result)) => {
                println!("## {}", path.display());
                print!("{}", result.render_report());
                for m in &result.matches {
                    let other = uploaded
                        .iter()
                        .find(|(_, other)| *other == m.matched_submission_id)
                        .map(|(p, _)| p.display().to_string())
                        .unwrap_or_else(|| m.matched_submission_id.to_string());
                    println!("  {other}: {:.2}%", m.score);
                }
                println!();
            }
            Ok(CheckOutcome::Discarded { reason }) => {
                eprintln!("{}: result discarded ({reason})", path.display());
            }
            Err(err) => eprintln!("{}: {err}", path.display()),
        }
    }

    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
