use bytes::Bytes;
use ocimodel::{ErrorCode, OciDigest, Reference};
use reqwest::StatusCode;

use super::{check_content_digest, check_digest_header, manifest_body, push_blob, push_manifest};
use crate::checks::Checks;
use crate::error::Result;
use crate::fixtures::{self, BLOB_CONTENT, NON_EXISTENT_TAG};
use crate::paths;
use crate::request::{Harness, Request};

/// Push a blob, then fetch it back and probe a blob that was never pushed.
pub async fn pull_blob(harness: &Harness) -> Result<()> {
    let repo = harness.repo();
    let content = Bytes::from_static(BLOB_CONTENT);
    let digest = OciDigest::sha256(&content);
    let non_existent_digest = fixtures::non_existent_digest();

    push_blob(repo, &content, &digest).send(harness).await?;

    let mut checks = Checks::new("pull blob");

    let get = Request::get(paths::blob(repo, &digest))
        .desc("GET blob")
        .want_status([StatusCode::OK]);
    if let Some(response) = checks.request(harness, &get).await {
        checks.record("GET blob content", check_content_digest(&response, &digest));
        checks.record("GET blob digest header", check_digest_header(&response, &digest));
    }

    let head = Request::head(paths::blob(repo, &digest))
        .desc("HEAD blob")
        .want_status([StatusCode::OK]);
    if let Some(response) = checks.request(harness, &head).await {
        checks.record("HEAD blob digest header", check_digest_header(&response, &digest));
    }

    for request in [
        Request::get(paths::blob(repo, &non_existent_digest))
            .desc("GET non-existent blob")
            .want_status([StatusCode::NOT_FOUND])
            .want_error_code(ErrorCode::BlobUnknown),
        Request::head(paths::blob(repo, &non_existent_digest))
            .desc("HEAD non-existent blob")
            .want_status([StatusCode::NOT_FOUND]),
    ] {
        checks.request(harness, &request).await;
    }

    checks.finish()
}

/// Push the manifest fixture under the configured tag, then fetch it by digest and tag.
pub async fn pull_manifest(harness: &Harness) -> Result<()> {
    let repo = harness.repo();
    let tag = Reference::tag(harness.config().tag.as_str())?;
    let manifest = manifest_body()?;
    let digest = OciDigest::sha256(&manifest);
    let by_digest = Reference::from(digest.clone());
    let non_existent_digest = Reference::from(fixtures::non_existent_digest());
    let non_existent_tag = Reference::tag(NON_EXISTENT_TAG)?;

    push_manifest(repo, &tag, &manifest).send(harness).await?;

    let mut checks = Checks::new("pull manifest");

    let get_by_digest = Request::get(paths::manifest(repo, &by_digest))
        .desc("GET manifest by digest")
        .want_status([StatusCode::OK]);
    if let Some(response) = checks.request(harness, &get_by_digest).await {
        checks.record("GET manifest content", check_content_digest(&response, &digest));
        checks.record("GET manifest digest header", check_digest_header(&response, &digest));
    }

    for request in [
        Request::get(paths::manifest(repo, &tag))
            .desc("GET manifest by tag")
            .want_status([StatusCode::OK]),
        Request::head(paths::manifest(repo, &by_digest))
            .desc("HEAD manifest by digest")
            .want_status([StatusCode::OK]),
        Request::head(paths::manifest(repo, &tag))
            .desc("HEAD manifest by tag")
            .want_status([StatusCode::OK]),
        Request::get(paths::manifest(repo, &non_existent_digest))
            .desc("GET non-existent manifest by digest")
            .want_status([StatusCode::NOT_FOUND])
            .want_error_code(ErrorCode::ManifestUnknown),
        Request::head(paths::manifest(repo, &non_existent_digest))
            .desc("HEAD non-existent manifest by digest")
            .want_status([StatusCode::NOT_FOUND]),
        Request::get(paths::manifest(repo, &non_existent_tag))
            .desc("GET non-existent manifest by tag")
            .want_status([StatusCode::NOT_FOUND])
            .want_error_code(ErrorCode::ManifestUnknown),
        Request::head(paths::manifest(repo, &non_existent_tag))
            .desc("HEAD non-existent manifest by tag")
            .want_status([StatusCode::NOT_FOUND]),
    ] {
        checks.request(harness, &request).await;
    }

    // TODO: invalid repository names should yield 400 NAME_INVALID and unknown ones 404 NAME_UNKNOWN
    checks.finish()
}
