use std::borrow::Cow;
use std::collections::BTreeMap;

use bytes::Bytes;
use ocimodel::{ErrorResponse, OciDigest};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client as ReqwestClient, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{info, instrument, warn};

use crate::config::ConformanceConfig;
use crate::error::{HarnessError, Result};
use crate::paths::API_PREFIX;

/// Executes [`Request`]s against the configured registry.
pub struct Harness {
    config: ConformanceConfig,
    client: ReqwestClient,
}

impl Harness {
    pub fn new(config: ConformanceConfig) -> Self {
        Self {
            config,
            client: ReqwestClient::new(),
        }
    }

    /// Build a harness from the `OCI_*` environment
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(ConformanceConfig::load()?))
    }

    pub fn config(&self) -> &ConformanceConfig {
        &self.config
    }

    /// Repository under test
    pub fn repo(&self) -> &str {
        &self.config.repo
    }

    /// Resolve `path` against the configured host and append `query`.
    pub fn url(&self, path: &str, query: &BTreeMap<String, String>) -> Result<Url> {
        if !path.starts_with(API_PREFIX) {
            return Err(HarnessError::InvalidPath(path.to_string()));
        }

        let raw = format!("{}{}", self.config.host, path);
        let mut url = Url::parse(&raw).map_err(|e| HarnessError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;

        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }
}

/// A single call against the registry together with what it must return.
#[derive(Debug, Clone)]
pub struct Request {
    desc: String,
    method: Method,
    path: String,
    query: BTreeMap<String, String>,
    headers: BTreeMap<String, String>,
    body: Option<Bytes>,

    want_status: Vec<StatusCode>,
    want_error_code: Option<String>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            desc: format!("{method} {path}"),
            method,
            path,
            query: BTreeMap::new(),
            headers: BTreeMap::new(),
            body: None,
            want_status: Vec::new(),
            want_error_code: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn head(path: impl Into<String>) -> Self {
        Self::new(Method::HEAD, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Human readable name used in logs and failure reports
    pub fn desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = desc.into();
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Status codes the call may answer with; any other code fails the request.
    pub fn want_status(mut self, codes: impl IntoIterator<Item = StatusCode>) -> Self {
        self.want_status = codes.into_iter().collect();
        self
    }

    /// Require a single-entry error envelope carrying `code`.
    ///
    /// Takes an [`ErrorCode`](ocimodel::ErrorCode) or any vendor specific code.
    pub fn want_error_code(mut self, code: impl Into<String>) -> Self {
        self.want_error_code = Some(code.into());
        self
    }

    pub fn description(&self) -> &str {
        &self.desc
    }

    /// Perform the call, buffer the whole body and validate it.
    #[instrument(name = "request", skip_all, fields(desc = %self.desc))]
    pub async fn send(&self, harness: &Harness) -> Result<Response> {
        if self.want_status.is_empty() {
            return Err(HarnessError::InvalidRequest(format!(
                "{}: no acceptable status codes",
                self.desc
            )));
        }

        let url = harness.url(&self.path, &self.query)?;
        let headers = self.header_map(harness.config())?;

        let mut request = harness
            .client
            .request(self.method.clone(), url.clone())
            .headers(headers);
        if let Some(body) = &self.body {
            request = request.body(body.clone());
        }

        let response = request.send().await?;
        let status = response.status();
        info!("{} {}: {}", self.method, url, status.as_u16());

        let headers = response.headers().clone();
        let body = response.bytes().await?;

        self.match_status(status, &url, &body)?;
        self.match_error_code(&body)?;

        Ok(Response {
            status,
            headers,
            body,
        })
    }

    fn header_map(&self, config: &ConformanceConfig) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let invalid = |reason: String| HarnessError::InvalidHeader {
                name: name.clone(),
                reason,
            };
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
            let header_value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
            headers.append(header_name, header_value);
        }

        if let Some(authorization) = config.authorization() {
            if !headers.contains_key(AUTHORIZATION) {
                let value = HeaderValue::from_str(&authorization).map_err(|e| {
                    HarnessError::InvalidHeader {
                        name: AUTHORIZATION.to_string(),
                        reason: e.to_string(),
                    }
                })?;
                headers.insert(AUTHORIZATION, value);
            }
        }

        Ok(headers)
    }

    fn match_status(&self, got: StatusCode, url: &Url, body: &[u8]) -> Result<()> {
        if self.want_status.contains(&got) {
            return Ok(());
        }

        let body = String::from_utf8_lossy(body).into_owned();
        warn!("response body: {}", body);
        Err(HarnessError::UnexpectedStatus {
            method: self.method.to_string(),
            url: url.to_string(),
            got: got.as_u16(),
            want: self.want_status.iter().map(StatusCode::as_u16).collect(),
            body,
        })
    }

    fn match_error_code(&self, body: &[u8]) -> Result<()> {
        let Some(want) = &self.want_error_code else {
            return Ok(());
        };

        let envelope: ErrorResponse =
            serde_json::from_slice(body).map_err(HarnessError::ErrorEnvelope)?;
        match envelope.errors.as_slice() {
            [] => Err(HarnessError::NoErrors { want: want.clone() }),
            [error] if error.code == *want => Ok(()),
            [error] => Err(HarnessError::ErrorCodeMismatch {
                got: error.code.clone(),
                want: want.clone(),
            }),
            errors => Err(HarnessError::TooManyErrors { got: errors.len() }),
        }
    }
}

/// Buffered outcome of a successful [`Request::send`]
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Value of header `name`, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Decode the body as JSON into `T`
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(HarnessError::Decode)
    }

    /// Digest of the buffered body
    pub fn digest(&self) -> OciDigest {
        OciDigest::sha256(&self.body)
    }
}
