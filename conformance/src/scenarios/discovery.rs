use ocimodel::{Reference, TagList};
use reqwest::StatusCode;

use super::{manifest_body, push_manifest};
use crate::checks::Checks;
use crate::error::{HarnessError, Result};
use crate::paths;
use crate::request::{Harness, Request};

const NUM_TAGS: usize = 4;

/// Push `tag-0..tag-3`, then page through the tag list with `n` and `last`.
pub async fn content_discovery(harness: &Harness) -> Result<()> {
    let repo = harness.repo();
    let manifest = manifest_body()?;
    let want_tags: Vec<String> = (0..NUM_TAGS).map(|i| format!("tag-{i}")).collect();

    for tag in &want_tags {
        push_manifest(repo, &Reference::tag(tag.as_str())?, &manifest)
            .desc(format!("PUT {tag}"))
            .send(harness)
            .await?;
    }

    let mut checks = Checks::new("content discovery");

    let get_tags = Request::get(paths::tags(repo)).desc("get tags");
    checks.record("get tags", expect_tags(harness, get_tags, &want_tags).await);

    // Limit tags using `n` query parameter.
    let n = NUM_TAGS / 2;
    let limit_tags = Request::get(paths::tags(repo))
        .desc("limit tags")
        .query("n", n.to_string());
    checks.record("limit tags", expect_tags(harness, limit_tags, &want_tags[..n]).await);

    // Start tag list using `last` query parameter.
    let last = &want_tags[NUM_TAGS / 2];
    let start_tags = Request::get(paths::tags(repo))
        .desc("start tag list")
        .query("last", last.as_str());
    checks.record(
        "start tag list",
        expect_tags(harness, start_tags, &want_tags[NUM_TAGS / 2 + 1..]).await,
    );

    checks.finish()
}

async fn expect_tags(harness: &Harness, request: Request, want: &[String]) -> Result<()> {
    let got: TagList = request
        .want_status([StatusCode::OK])
        .send(harness)
        .await?
        .json()?;

    let want = TagList {
        name: harness.repo().to_string(),
        tags: want.to_vec(),
    };
    if got == want {
        Ok(())
    } else {
        Err(HarnessError::mismatch("tag list", want, got))
    }
}
