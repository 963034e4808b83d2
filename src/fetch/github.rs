//! GitHub contents API client

use crate::error::PullError;
use crate::fetch::remote::{ContentApi, EntryKind, RemoteEntry};
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Default endpoint for github.com
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// GitHub-backed content source for one repository
///
/// Lists directories through `GET /repos/{owner}/{repo}/contents/{path}?ref=`
/// and downloads blobs from the `download_url` each file entry carries. The
/// bearer token goes with every listing call, but with a download only when
/// the blob is served from the API's own origin.
#[derive(Clone)]
pub struct GitHubApi {
    client: Client,
    api_base: Url,
    authorization: Option<HeaderValue>,
    owner: String,
    repo: String,
}

#[derive(Deserialize)]
struct ApiEntry {
    name: String,
    path: String,
    #[serde(rename = "type")]
    entry_type: String,
    download_url: Option<String>,
}

/// The contents endpoint answers with an array for directories and a single
/// object when the path names a file
#[derive(Deserialize)]
#[serde(untagged)]
enum ListingBody {
    Many(Vec<ApiEntry>),
    One(ApiEntry),
}

impl GitHubApi {
    /// Create a client for `owner/repo`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `api_base` is not a valid base URL
    /// - The token contains characters not allowed in a header
    /// - The HTTP client cannot be built
    pub fn new(
        api_base: &str,
        owner: &str,
        repo: &str,
        token: Option<&str>,
        timeout: Duration,
    ) -> Result<Self> {
        let api_base = Url::parse(api_base).map_err(|e| {
            return PullError::configuration(format!("Invalid API URL '{api_base}': {e}"));
        })?;
        if api_base.cannot_be_a_base() {
            return Err(PullError::configuration(format!("Invalid API URL '{api_base}'")).into());
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("subpull/", env!("CARGO_PKG_VERSION"))),
        );
        let authorization = token
            .map(|token| {
                let mut value =
                    HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                        return PullError::validation("The token contains invalid characters");
                    })?;
                value.set_sensitive(true);
                Ok::<_, PullError>(value)
            })
            .transpose()?;

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| PullError::configuration(format!("Cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base,
            authorization,
            owner: owner.to_owned(),
            repo: repo.to_owned(),
        })
    }

    /// Build the listing URL for `path` at `reference`
    #[must_use]
    pub fn contents_url(&self, path: &str, reference: &str) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["repos", &self.owner, &self.repo, "contents"])
                .extend(path.split('/').filter(|s| !s.is_empty()));
        }
        url.query_pairs_mut().append_pair("ref", reference);
        url
    }

    /// Bearer header for a download from `url`, if it shares the API origin
    fn download_authorization(&self, url: &str) -> Option<&HeaderValue> {
        let authorization = self.authorization.as_ref()?;
        let target = Url::parse(url).ok()?;
        (target.origin() == self.api_base.origin()).then_some(authorization)
    }

    fn convert(entry: ApiEntry) -> Option<RemoteEntry> {
        let kind = match entry.entry_type.as_str() {
            "file" => EntryKind::File,
            "dir" => EntryKind::Directory,
            other => {
                debug!("Skipping '{}' of type {other}", entry.path);
                return None;
            }
        };
        Some(RemoteEntry {
            name: entry.name,
            path: entry.path,
            download_url: if kind == EntryKind::File {
                entry.download_url
            } else {
                None
            },
            kind,
        })
    }
}

fn describe_send_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "request timed out".to_owned()
    } else {
        err.to_string()
    }
}

#[async_trait]
impl ContentApi for GitHubApi {
    async fn list(&self, path: &str, reference: &str) -> Result<Vec<RemoteEntry>> {
        let url = self.contents_url(path, reference);
        debug!("Listing {url}");

        let mut builder = self.client.get(url);
        if let Some(authorization) = &self.authorization {
            builder = builder.header(AUTHORIZATION, authorization.clone());
        }
        let response = builder
            .send()
            .await
            .map_err(|e| PullError::remote_listing(path, describe_send_error(&e)))?;

        match response.status() {
            status if status.is_success() => {
                let body: ListingBody = response.json().await.map_err(|e| {
                    return PullError::remote_listing(path, format!("unexpected response: {e}"));
                })?;
                let entries = match body {
                    ListingBody::Many(entries) => entries,
                    ListingBody::One(entry) => vec![entry],
                };
                Ok(entries.into_iter().filter_map(Self::convert).collect())
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(PullError::remote_listing(
                path,
                format!(
                    "authentication failed or token lacks scope ({})",
                    response.status()
                ),
            )
            .into()),
            StatusCode::NOT_FOUND => Err(PullError::remote_listing(
                path,
                format!("not found in {}/{} at '{reference}'", self.owner, self.repo),
            )
            .into()),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(PullError::remote_listing(
                    path,
                    format!("unexpected status {status}: {}", body.trim()),
                )
                .into())
            }
        }
    }

    async fn download(&self, entry: &RemoteEntry) -> Result<Bytes> {
        let url = entry.download_url.as_deref().ok_or_else(|| {
            return PullError::download(&entry.path, "entry has no download URL");
        })?;
        debug!("Downloading {url}");

        let mut builder = self.client.get(url);
        if let Some(authorization) = self.download_authorization(url) {
            builder = builder.header(AUTHORIZATION, authorization.clone());
        }
        let response = builder
            .send()
            .await
            .map_err(|e| PullError::download(&entry.path, describe_send_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PullError::download(&entry.path, format!("unexpected status {status}")).into());
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PullError::download(&entry.path, describe_send_error(&e)))?;
        Ok(bytes)
    }
}
