use ocimodel::{ErrorCode, ErrorResponse, media_types};
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;

use crate::error::{HarnessError, Result};
use crate::paths;
use crate::request::{Harness, Request};

const INVALID_REFERENCE: &str = "sha256:totallywrong";
const INVALID_MANIFEST: &[u8] = b"{\"schemaVersion\": \"two\", \"layers\": 7}";

/// A rejected manifest must come with an error envelope using a known code.
pub async fn invalid_manifest(harness: &Harness) -> Result<()> {
    // Not a valid `Reference`, so the path is spelled out by hand
    let path = format!("{}{INVALID_REFERENCE}", paths::manifests(harness.repo()));
    let response = Request::put(path)
        .desc("PUT invalid manifest")
        .header(CONTENT_TYPE.as_str(), media_types::IMAGE_MANIFEST)
        .body(INVALID_MANIFEST)
        .want_status([StatusCode::BAD_REQUEST, StatusCode::NOT_FOUND])
        .send(harness)
        .await?;

    if response.status() != StatusCode::BAD_REQUEST {
        return Ok(());
    }

    let envelope: ErrorResponse = response.json()?;
    let Some(first) = envelope.errors.first() else {
        return Err(HarnessError::NoErrors {
            want: "a distribution error code".to_string(),
        });
    };
    if first.code.parse::<ErrorCode>().is_err() {
        let known: Vec<&str> = ErrorCode::ALL.iter().map(ErrorCode::as_str).collect();
        return Err(HarnessError::mismatch("error code", known, &first.code));
    }

    Ok(())
}
