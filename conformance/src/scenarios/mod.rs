//! Sequences of requests that each encode one compliance check.

pub mod delete;
pub mod discovery;
pub mod errors;
pub mod pull;

use bytes::Bytes;
use ocimodel::{OciDigest, Reference, media_types};
use reqwest::StatusCode;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use tracing::info;

use crate::checks::Checks;
use crate::error::{HarnessError, Result};
use crate::paths;
use crate::request::{Harness, Request, Response};

/// Header some registries return with the digest of the served content
pub const DOCKER_CONTENT_DIGEST: &str = "Docker-Content-Digest";

/// Run every scenario in a fixed order, reporting each failed scenario.
///
/// All scenarios share the configured repository, so a registry that keeps
/// tags around (for instance one answering 405 to deletes) can make the
/// discovery scenario see more tags than it pushed.
pub async fn run_all(harness: &Harness) -> Result<()> {
    let mut checks = Checks::new("conformance");

    checks.record("delete blob", delete::delete_blob(harness).await);
    checks.record("delete tag", delete::delete_tag(harness).await);
    checks.record("content discovery", discovery::content_discovery(harness).await);
    checks.record("pull blob", pull::pull_blob(harness).await);
    checks.record("pull manifest", pull::pull_manifest(harness).await);
    checks.record("invalid manifest", errors::invalid_manifest(harness).await);

    let result = checks.finish();
    if result.is_ok() {
        info!("all scenarios passed against {}", harness.config().host);
    }
    result
}

/// Monolithic blob upload: `POST /v2/{repo}/blobs/uploads/?digest=...`
pub(crate) fn push_blob(repo: &str, content: &Bytes, digest: &OciDigest) -> Request {
    Request::post(paths::blob_uploads(repo))
        .desc("POST blob")
        .query("digest", digest.to_string())
        .header(CONTENT_TYPE.as_str(), media_types::OCTET_STREAM)
        .header(CONTENT_LENGTH.as_str(), content.len().to_string())
        .body(content.clone())
        .want_status([StatusCode::CREATED])
}

/// `PUT /v2/{repo}/manifests/{reference}` with an image manifest body
pub(crate) fn push_manifest(repo: &str, reference: &Reference, manifest: &Bytes) -> Request {
    Request::put(paths::manifest(repo, reference))
        .desc("PUT manifest")
        .header(CONTENT_TYPE.as_str(), media_types::IMAGE_MANIFEST)
        .header(CONTENT_LENGTH.as_str(), manifest.len().to_string())
        .body(manifest.clone())
        .want_status([StatusCode::CREATED])
}

/// Serialized manifest fixture
pub(crate) fn manifest_body() -> Result<Bytes> {
    let bytes = crate::fixtures::image_manifest()
        .to_bytes()
        .map_err(HarnessError::Serialize)?;
    Ok(Bytes::from(bytes))
}

/// The fetched body must hash to the digest it was requested by.
pub(crate) fn check_content_digest(response: &Response, want: &OciDigest) -> Result<()> {
    let got = response.digest();
    if got == *want {
        Ok(())
    } else {
        Err(HarnessError::mismatch("content digest", want.to_string(), got.to_string()))
    }
}

/// `Docker-Content-Digest` is optional, but when present it must name the content.
pub(crate) fn check_digest_header(response: &Response, want: &OciDigest) -> Result<()> {
    match response.header(DOCKER_CONTENT_DIGEST) {
        Some(got) if got != want.to_string() => Err(HarnessError::mismatch(
            DOCKER_CONTENT_DIGEST,
            want.to_string(),
            got,
        )),
        _ => Ok(()),
    }
}
