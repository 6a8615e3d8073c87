use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use ocimodel::{OciDigest, Reference, TagList};
use reqwest::StatusCode;
use tracing::info;

use super::{manifest_body, push_blob, push_manifest};
use crate::error::{HarnessError, Result};
use crate::fixtures::BLOB_CONTENT;
use crate::paths;
use crate::request::{Harness, Request};

const DELETE_STATUS: [StatusCode; 2] = [StatusCode::ACCEPTED, StatusCode::METHOD_NOT_ALLOWED];

/// Push a uniquely named tag, delete it and make sure it is gone.
pub async fn delete_tag(harness: &Harness) -> Result<()> {
    let repo = harness.repo();
    let manifest = manifest_body()?;
    let tag = unique_tag();
    let reference = Reference::tag(tag.as_str())?;
    let path = paths::manifest(repo, &reference);

    push_manifest(repo, &reference, &manifest)
        .desc("PUT tag")
        .send(harness)
        .await?;

    Request::get(&path)
        .desc("GET tag")
        .want_status([StatusCode::OK])
        .send(harness)
        .await?;

    let deleted = Request::delete(&path)
        .desc("DELETE tag")
        .want_status(DELETE_STATUS)
        .send(harness)
        .await?;

    if deleted.status() == StatusCode::METHOD_NOT_ALLOWED {
        info!("registry does not support deleting tags");
        Request::get(&path)
            .desc("GET tag after refused delete")
            .want_status([StatusCode::OK])
            .send(harness)
            .await?;
        return Ok(());
    }

    Request::get(&path)
        .desc("GET deleted tag")
        .want_status([StatusCode::NOT_FOUND])
        .send(harness)
        .await?;

    let tags: TagList = Request::get(paths::tags(repo))
        .desc("GET tags")
        .want_status([StatusCode::OK])
        .send(harness)
        .await?
        .json()?;
    if tags.tags.contains(&tag) {
        return Err(HarnessError::Mismatch {
            what: "tag list".to_string(),
            want: format!("no {tag:?}"),
            got: format!("{:?}", tags.tags),
        });
    }

    Ok(())
}

/// Push a blob, delete it and make sure it is gone.
pub async fn delete_blob(harness: &Harness) -> Result<()> {
    let repo = harness.repo();
    let content = Bytes::from_static(BLOB_CONTENT);
    let digest = OciDigest::sha256(&content);
    let path = paths::blob(repo, &digest);

    push_blob(repo, &content, &digest).send(harness).await?;

    Request::get(&path)
        .desc("GET blob")
        .want_status([StatusCode::OK])
        .send(harness)
        .await?;

    let deleted = Request::delete(&path)
        .desc("DELETE blob")
        .want_status(DELETE_STATUS)
        .send(harness)
        .await?;

    if deleted.status() == StatusCode::METHOD_NOT_ALLOWED {
        info!("registry does not support deleting blobs");
        Request::get(&path)
            .desc("GET blob after refused delete")
            .want_status([StatusCode::OK])
            .send(harness)
            .await?;
        return Ok(());
    }

    Request::get(&path)
        .desc("GET deleted blob")
        .want_status([StatusCode::NOT_FOUND])
        .send(harness)
        .await?;

    Ok(())
}

fn unique_tag() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("tag-{}", now.as_secs())
}
