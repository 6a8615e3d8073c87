//! Request paths of the distribution API, all rooted at [`API_PREFIX`].

use ocimodel::{OciDigest, Reference};

pub const API_PREFIX: &str = "/v2/";

/// Collection path, `/v2/{repo}/manifests/`
pub fn manifests(repo: &str) -> String {
    format!("/v2/{repo}/manifests/")
}

pub fn manifest(repo: &str, reference: &Reference) -> String {
    format!("{}{reference}", manifests(repo))
}

pub fn blob(repo: &str, digest: &OciDigest) -> String {
    format!("/v2/{repo}/blobs/{digest}")
}

pub fn blob_uploads(repo: &str) -> String {
    format!("/v2/{repo}/blobs/uploads/")
}

pub fn tags(repo: &str) -> String {
    format!("/v2/{repo}/tags/list")
}
