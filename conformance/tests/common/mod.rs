#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, Request, State},
    http::{HeaderMap, HeaderName, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use conformance::{ConformanceConfig, Harness};
use ocimodel::{
    ErrorCode, ErrorInfo, ErrorResponse, ImageManifest, OciDigest, Reference, ReferenceError,
    TagList, media_types,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

const DOCKER_CONTENT_DIGEST: HeaderName = HeaderName::from_static("docker-content-digest");

/// Behaviour switches for the in-process registry
#[derive(Debug, Clone, Default)]
pub struct RegistryOptions {
    /// Base64 basic-auth token every request must carry
    pub auth: Option<String>,
    /// Answer deletes with 405
    pub deletes_disabled: bool,
    /// Serve tags newest first, which a conforming registry must not do
    pub reverse_tag_order: bool,
    /// Append a byte to every blob served by GET
    pub corrupt_blob_content: bool,
    /// Send a `Docker-Content-Digest` that names other content
    pub wrong_digest_header: bool,
    /// Answer deletes with 202 without removing anything
    pub delete_is_noop: bool,
    /// Keep deleted tags in the tag list
    pub stale_tag_list: bool,
    /// Report rejected manifests with a code outside the distribution set
    pub vendor_error_codes: bool,
    /// Send `"tags": null` for a repository without tags
    pub null_empty_tags: bool,
}

/// Error code sent for rejected manifests when `vendor_error_codes` is set
pub const VENDOR_MANIFEST_CODE: &str = "X_MANIFEST_REJECTED";

/// Minimal in-memory registry serving the endpoints the scenarios exercise
pub struct TestRegistry {
    addr: SocketAddr,
    server: JoinHandle<()>,
}

impl TestRegistry {
    pub async fn start() -> Self {
        Self::start_with(RegistryOptions::default()).await
    }

    pub async fn start_with(options: RegistryOptions) -> Self {
        // Use a random available port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let state = Arc::new(RegistryState {
            options,
            repositories: RwLock::default(),
        });
        let app = registry_router(state);

        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, server }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn config(&self) -> ConformanceConfig {
        ConformanceConfig {
            host: self.url(),
            ..ConformanceConfig::default()
        }
    }

    pub fn harness(&self) -> Harness {
        Harness::new(self.config())
    }
}

impl Drop for TestRegistry {
    fn drop(&mut self) {
        self.server.abort();
    }
}

struct StoredManifest {
    media_type: String,
    content: Bytes,
}

#[derive(Default)]
struct Repository {
    blobs: HashMap<OciDigest, Bytes>,
    manifests: HashMap<OciDigest, StoredManifest>,
    // Kept in insertion order
    tags: Vec<(String, OciDigest)>,
    // Deleted tags still listed when `stale_tag_list` is set
    stale_tags: Vec<String>,
}

impl Repository {
    fn tag_digest(&self, tag: &str) -> Option<&OciDigest> {
        self.tags.iter().find(|(t, _)| t == tag).map(|(_, digest)| digest)
    }

    fn set_tag(&mut self, tag: String, digest: OciDigest) {
        match self.tags.iter_mut().find(|(t, _)| *t == tag) {
            Some(entry) => entry.1 = digest,
            None => self.tags.push((tag, digest)),
        }
    }
}

struct RegistryState {
    options: RegistryOptions,
    repositories: RwLock<HashMap<String, Repository>>,
}

type AppState = Arc<RegistryState>;

enum RegistryError {
    BlobUnknown(String),
    BlobUploadInvalid(String),
    DigestInvalid(String),
    ManifestInvalid(String),
    ManifestUnknown(String),
    NameUnknown(String),
    Unsupported(String),
    Unauthorized,
    Vendor(StatusCode, &'static str, String),
}

impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            RegistryError::BlobUnknown(msg) => (StatusCode::NOT_FOUND, ErrorCode::BlobUnknown, msg),
            RegistryError::BlobUploadInvalid(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BlobUploadInvalid, msg)
            }
            RegistryError::DigestInvalid(msg) => (StatusCode::BAD_REQUEST, ErrorCode::DigestInvalid, msg),
            RegistryError::ManifestInvalid(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::ManifestInvalid, msg)
            }
            RegistryError::ManifestUnknown(msg) => {
                (StatusCode::NOT_FOUND, ErrorCode::ManifestUnknown, msg)
            }
            RegistryError::NameUnknown(msg) => (StatusCode::NOT_FOUND, ErrorCode::NameUnknown, msg),
            RegistryError::Unsupported(msg) => {
                (StatusCode::METHOD_NOT_ALLOWED, ErrorCode::Unsupported, msg)
            }
            RegistryError::Vendor(status, code, message) => {
                let body = ErrorResponse {
                    errors: vec![ErrorInfo {
                        code: code.to_string(),
                        message,
                        detail: None,
                    }],
                };
                return (status, Json(body)).into_response();
            }
            RegistryError::Unauthorized => {
                let body = ErrorResponse::single(ErrorCode::Unauthorized, "authentication required");
                return (
                    StatusCode::UNAUTHORIZED,
                    [(header::WWW_AUTHENTICATE, r#"Basic realm="registry""#)],
                    Json(body),
                )
                    .into_response();
            }
        };

        (status, Json(ErrorResponse::single(code, message))).into_response()
    }
}

type Result<T> = std::result::Result<T, RegistryError>;

fn registry_router(state: AppState) -> Router {
    Router::new()
        .route("/v2/", get(api_version_check))
        .route("/v2/{name}/tags/list", get(list_tags))
        .route(
            "/v2/{name}/manifests/{reference}",
            get(get_manifest).put(put_manifest).delete(delete_manifest),
        )
        .route("/v2/{name}/blobs/{digest}", get(get_blob).delete(delete_blob))
        .route("/v2/{name}/blobs/uploads/", post(upload_blob))
        .layer(middleware::from_fn_with_state(state.clone(), require_basic_auth))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn require_basic_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(token) = &state.options.auth else {
        return next.run(request).await;
    };

    let expected = format!("Basic {token}");
    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if provided == Some(expected.as_str()) {
        next.run(request).await
    } else {
        RegistryError::Unauthorized.into_response()
    }
}

async fn api_version_check() -> StatusCode {
    StatusCode::OK
}

#[derive(Debug, Deserialize)]
struct TagsQuery {
    n: Option<usize>,
    last: Option<String>,
}

async fn list_tags(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<TagsQuery>,
) -> Result<Response> {
    let repositories = state.repositories.read().await;
    let repository = repositories
        .get(&name)
        .ok_or_else(|| RegistryError::NameUnknown(format!("repository {name} not known")))?;

    let mut tags: Vec<String> = repository.tags.iter().map(|(tag, _)| tag.clone()).collect();
    tags.extend(repository.stale_tags.iter().cloned());
    if state.options.reverse_tag_order {
        tags.reverse();
    }

    // Apply pagination if requested
    if let Some(last) = &params.last {
        if let Some(pos) = tags.iter().position(|t| t == last) {
            tags = tags.split_off(pos + 1);
        }
    }
    if let Some(n) = params.n {
        tags.truncate(n);
    }

    if tags.is_empty() && state.options.null_empty_tags {
        return Ok(Json(serde_json::json!({ "name": name, "tags": null })).into_response());
    }
    Ok(Json(TagList { name, tags }).into_response())
}

/// Value of `Docker-Content-Digest` for content stored under `digest`
fn served_digest(state: &RegistryState, digest: &OciDigest) -> String {
    if state.options.wrong_digest_header {
        OciDigest::sha256(format!("not {digest}")).to_string()
    } else {
        digest.to_string()
    }
}

fn resolve_manifest<'a>(
    repositories: &'a HashMap<String, Repository>,
    name: &str,
    reference: &str,
) -> Result<(OciDigest, &'a StoredManifest)> {
    let unknown = || RegistryError::ManifestUnknown(format!("manifest {name}:{reference} not known"));

    let repository = repositories.get(name).ok_or_else(unknown)?;
    let digest = match reference.parse::<Reference>().map_err(|_| unknown())? {
        Reference::Digest(digest) => digest,
        Reference::Tag(tag) => repository.tag_digest(&tag).cloned().ok_or_else(unknown)?,
    };
    let manifest = repository.manifests.get(&digest).ok_or_else(unknown)?;
    Ok((digest, manifest))
}

async fn get_manifest(
    State(state): State<AppState>,
    Path((name, reference)): Path<(String, String)>,
) -> Result<Response> {
    let repositories = state.repositories.read().await;
    let (digest, manifest) = resolve_manifest(&repositories, &name, &reference)?;

    info!("Serving manifest {}:{} ({})", name, reference, digest);
    Ok((
        [
            (header::CONTENT_TYPE, manifest.media_type.clone()),
            (DOCKER_CONTENT_DIGEST, served_digest(&state, &digest)),
        ],
        manifest.content.clone(),
    )
        .into_response())
}

async fn put_manifest(
    State(state): State<AppState>,
    Path((name, reference)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let manifest: ImageManifest = serde_json::from_slice(&body).map_err(|e| {
        if state.options.vendor_error_codes {
            RegistryError::Vendor(StatusCode::BAD_REQUEST, VENDOR_MANIFEST_CODE, e.to_string())
        } else {
            RegistryError::ManifestInvalid(e.to_string())
        }
    })?;
    let digest = OciDigest::sha256(&body);

    let reference: Reference = reference.parse().map_err(|e: ReferenceError| match e {
        ReferenceError::InvalidDigest(_) => RegistryError::DigestInvalid(e.to_string()),
        ReferenceError::InvalidTag(_) => RegistryError::ManifestInvalid(e.to_string()),
    })?;
    if let Some(expected) = reference.as_digest() {
        if *expected != digest {
            return Err(RegistryError::DigestInvalid(format!(
                "manifest digest is {digest}, not {expected}"
            )));
        }
    }

    let media_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or(manifest.media_type);

    let mut repositories = state.repositories.write().await;
    let repository = repositories.entry(name.clone()).or_default();
    repository.manifests.insert(
        digest.clone(),
        StoredManifest {
            media_type,
            content: body,
        },
    );
    if let Reference::Tag(tag) = reference {
        repository.set_tag(tag, digest.clone());
    }

    info!("Stored manifest {}@{}", name, digest);
    Ok((
        StatusCode::CREATED,
        [
            (header::LOCATION, format!("/v2/{name}/manifests/{digest}")),
            (DOCKER_CONTENT_DIGEST, digest.to_string()),
        ],
    )
        .into_response())
}

async fn delete_manifest(
    State(state): State<AppState>,
    Path((name, reference)): Path<(String, String)>,
) -> Result<StatusCode> {
    if state.options.deletes_disabled {
        return Err(RegistryError::Unsupported("manifest deletion is disabled".to_string()));
    }
    if state.options.delete_is_noop {
        return Ok(StatusCode::ACCEPTED);
    }

    let unknown = || RegistryError::ManifestUnknown(format!("manifest {name}:{reference} not known"));
    let mut repositories = state.repositories.write().await;
    let repository = repositories.get_mut(&name).ok_or_else(unknown)?;

    match reference.parse::<Reference>().map_err(|_| unknown())? {
        Reference::Tag(tag) => {
            let before = repository.tags.len();
            repository.tags.retain(|(t, _)| *t != tag);
            if repository.tags.len() == before {
                return Err(unknown());
            }
            if state.options.stale_tag_list {
                repository.stale_tags.push(tag);
            }
        }
        Reference::Digest(digest) => {
            repository.manifests.remove(&digest).ok_or_else(unknown)?;
            repository.tags.retain(|(_, d)| *d != digest);
        }
    }

    info!("Deleted manifest {}:{}", name, reference);
    Ok(StatusCode::ACCEPTED)
}

async fn get_blob(
    State(state): State<AppState>,
    Path((name, digest)): Path<(String, String)>,
) -> Result<Response> {
    let unknown = || RegistryError::BlobUnknown(format!("blob {digest} not known"));
    let parsed: OciDigest = digest.parse().map_err(|_| unknown())?;

    let repositories = state.repositories.read().await;
    let mut content = repositories
        .get(&name)
        .and_then(|repository| repository.blobs.get(&parsed))
        .ok_or_else(unknown)?
        .to_vec();
    if state.options.corrupt_blob_content {
        content.push(b'!');
    }

    Ok((
        [
            (header::CONTENT_TYPE, media_types::OCTET_STREAM.to_string()),
            (DOCKER_CONTENT_DIGEST, served_digest(&state, &parsed)),
        ],
        content,
    )
        .into_response())
}

async fn delete_blob(
    State(state): State<AppState>,
    Path((name, digest)): Path<(String, String)>,
) -> Result<StatusCode> {
    if state.options.deletes_disabled {
        return Err(RegistryError::Unsupported("blob deletion is disabled".to_string()));
    }
    if state.options.delete_is_noop {
        return Ok(StatusCode::ACCEPTED);
    }

    let mut repositories = state.repositories.write().await;
    digest
        .parse::<OciDigest>()
        .ok()
        .and_then(|d| repositories.get_mut(&name)?.blobs.remove(&d))
        .ok_or_else(|| RegistryError::BlobUnknown(format!("blob {digest} not known")))?;

    info!("Deleted blob {}@{}", name, digest);
    Ok(StatusCode::ACCEPTED)
}

#[derive(Debug, Deserialize)]
struct UploadQuery {
    digest: Option<String>,
}

async fn upload_blob(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<UploadQuery>,
    body: Bytes,
) -> Result<Response> {
    // Only monolithic uploads are served
    let digest = params.digest.ok_or_else(|| {
        RegistryError::BlobUploadInvalid("upload sessions are not supported".to_string())
    })?;
    let digest: OciDigest = digest
        .parse()
        .map_err(|e: ocimodel::DigestError| RegistryError::DigestInvalid(e.to_string()))?;
    if !digest.verify(&body) {
        return Err(RegistryError::DigestInvalid(format!(
            "content does not match {digest}"
        )));
    }

    let mut repositories = state.repositories.write().await;
    repositories
        .entry(name.clone())
        .or_default()
        .blobs
        .insert(digest.clone(), body);

    info!("Stored blob {}@{}", name, digest);
    Ok((
        StatusCode::CREATED,
        [
            (header::LOCATION, format!("/v2/{name}/blobs/{digest}")),
            (DOCKER_CONTENT_DIGEST, digest.to_string()),
        ],
    )
        .into_response())
}
