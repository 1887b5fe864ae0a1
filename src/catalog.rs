//! Remote dataset catalog access.
//!
//! The pipeline never talks to the catalog through a global handle: a
//! `CatalogClient` is constructed once per run and passed into every loader,
//! so tests can substitute a fake without touching the network.

use std::env;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::info;

use crate::constants::catalog::{DEFAULT_ENDPOINT, ENV_KEY, ENV_USERNAME};
use crate::errors::PipelineError;
use crate::types::DatasetRef;

/// One search result from the catalog.
#[derive(Clone, Debug, PartialEq)]
pub struct CatalogEntry {
    /// Dataset reference in `owner/slug` form.
    pub dataset_ref: DatasetRef,
    /// Human-readable dataset title.
    pub title: String,
    /// Last time the dataset was updated upstream.
    pub last_updated: DateTime<Utc>,
}

/// Catalog operations used by the loaders.
pub trait CatalogClient: Send + Sync {
    /// Search the catalog for datasets matching `query`.
    fn search(&self, query: &str) -> Result<Vec<CatalogEntry>, PipelineError>;

    /// Download the dataset archive into `dest_dir`.
    ///
    /// Returns the path of the downloaded zip.
    fn download(&self, dataset_ref: &str, dest_dir: &Path) -> Result<PathBuf, PipelineError>;
}

/// Kaggle REST API client.
pub struct KaggleClient {
    endpoint: String,
    credentials: Option<(String, String)>,
}

impl KaggleClient {
    /// Create an unauthenticated client against the public endpoint.
    pub fn new() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            credentials: None,
        }
    }

    /// Create a client with credentials from `KAGGLE_USERNAME`/`KAGGLE_KEY`
    /// when both are set.
    pub fn from_env() -> Self {
        let credentials = match (env::var(ENV_USERNAME), env::var(ENV_KEY)) {
            (Ok(username), Ok(key)) if !username.is_empty() && !key.is_empty() => {
                Some((username, key))
            }
            _ => None,
        };
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            credentials,
        }
    }

    /// Override the API endpoint (used by tests against a local server).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set explicit credentials.
    pub fn with_credentials(mut self, username: impl Into<String>, key: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), key.into()));
        self
    }

    fn auth_header(&self) -> Option<String> {
        let (username, key) = self.credentials.as_ref()?;
        Some(format!("Basic {}", BASE64.encode(format!("{username}:{key}"))))
    }
}

impl Default for KaggleClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogClient for KaggleClient {
    fn search(&self, query: &str) -> Result<Vec<CatalogEntry>, PipelineError> {
        let endpoint = format!("{}/datasets/list", self.endpoint);
        info!("[petdata:catalog] searching datasets for '{query}'");
        let mut request = ureq::get(&endpoint)
            .query("search", query)
            .query("sortBy", "hottest");
        if let Some(auth) = self.auth_header() {
            request = request.header("Authorization", &auth);
        }
        let response = request
            .call()
            .map_err(|err| PipelineError::Catalog(format!("dataset search failed: {err}")))?;
        let body = response
            .into_body()
            .read_to_string()
            .map_err(|err| PipelineError::Catalog(format!("failed reading search response: {err}")))?;
        parse_search_response(&body)
    }

    fn download(&self, dataset_ref: &str, dest_dir: &Path) -> Result<PathBuf, PipelineError> {
        let endpoint = format!("{}/datasets/download/{dataset_ref}", self.endpoint);
        let target = dest_dir.join(format!("{}.zip", slug_for_ref(dataset_ref)));
        fs::create_dir_all(dest_dir)?;

        info!("[petdata:catalog] downloading dataset {dataset_ref} -> {}", target.display());
        let mut request = ureq::get(&endpoint);
        if let Some(auth) = self.auth_header() {
            request = request.header("Authorization", &auth);
        }
        let response = request.call().map_err(|err| {
            PipelineError::Catalog(format!("failed downloading dataset '{dataset_ref}': {err}"))
        })?;

        // Stage into a .part file so a torn download never looks complete.
        let temp_target = target.with_extension("part");
        let mut reader = response.into_body().into_reader();
        let mut file = File::create(&temp_target)?;
        io::copy(&mut reader, &mut file).map_err(|err| {
            PipelineError::Catalog(format!("failed writing archive '{}': {err}", target.display()))
        })?;
        fs::rename(&temp_target, &target)?;
        Ok(target)
    }
}

/// Extract the slug component of an `owner/slug` reference.
pub fn slug_for_ref(dataset_ref: &str) -> &str {
    dataset_ref.rsplit('/').next().unwrap_or(dataset_ref)
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(rename = "ref")]
    dataset_ref: String,
    #[serde(default)]
    title: String,
    #[serde(rename = "lastUpdated", default)]
    last_updated: Option<String>,
}

/// Parse the dataset-list JSON payload into catalog entries.
///
/// Entries with an unparseable `lastUpdated` fall back to the epoch so the
/// most-recent pick still works across the rest.
pub fn parse_search_response(body: &str) -> Result<Vec<CatalogEntry>, PipelineError> {
    let raw: Vec<RawEntry> = serde_json::from_str(body)
        .map_err(|err| PipelineError::Catalog(format!("failed parsing search response: {err}")))?;
    Ok(raw
        .into_iter()
        .map(|entry| CatalogEntry {
            last_updated: entry
                .last_updated
                .as_deref()
                .and_then(parse_catalog_timestamp)
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            dataset_ref: entry.dataset_ref,
            title: entry.title,
        })
        .collect())
}

fn parse_catalog_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    // Some payloads omit the offset entirely.
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
