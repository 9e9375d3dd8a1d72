use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

use super::credential;
use crate::core::config::PathquillConfig;

const INITIAL_RETRY_DELAY_MS: u64 = 500;

const MAX_RETRY_DELAY_MS: u64 = 10_000;

#[derive(Debug, Error)]
pub enum BricksError {
    #[error("Credential error: {0}")]
    Credential(String),
    #[error("Unknown asset: {0}")]
    UnknownAsset(String),
    #[error("Registry error: {0}")]
    Registry(String),
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),
    #[error("Checksum mismatch for {path}: expected {expected}, got {actual}")]
    Checksum {
        path: String,
        expected: String,
        actual: String,
    },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Retry exhausted after {0} attempts: {1}")]
    RetryExhausted(u32, String),
}

/// Signed listing of the files backing one asset.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetManifest {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    pub files: Vec<AssetFileEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetFileEntry {
    pub path: String,
    pub url: String,
    pub sha256: String,
    #[serde(default)]
    pub bytes: Option<u64>,
}

/// An asset fully present on disk.
#[derive(Debug, Clone)]
pub struct LocalAsset {
    pub name: String,
    pub files: Vec<PathBuf>,
    /// Identity of the manifest contents; the store uses it to decide whether
    /// re-materialization is needed.
    pub digest: String,
}

/// Client for the scientific-data registry. Fetches asset manifests and
/// mirrors the listed files into the local asset cache, verifying checksums.
pub struct BricksClient {
    registry: Url,
    token: String,
    assets_dir: PathBuf,
    client: Client,
    max_retries: u32,
}

impl BricksClient {
    /// Validates and persists the access token, then returns a ready client.
    /// Runs on every request so a changed token takes effect immediately.
    pub fn configure(config: &PathquillConfig, token: &str) -> Result<Self, BricksError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(BricksError::Credential(
                "access token must not be empty".to_string(),
            ));
        }

        let registry = Url::parse(&config.registry_url).map_err(|e| {
            BricksError::Registry(format!("invalid registry URL '{}': {e}", config.registry_url))
        })?;

        credential::save_token(&config.data_dir(), token)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()?;

        info!("bricks client configured for {}", registry);
        Ok(Self {
            registry,
            token: token.to_string(),
            assets_dir: config.assets_dir(),
            client,
            max_retries: config.max_retries.max(1),
        })
    }

    /// Token persisted by an earlier configure, if any.
    pub fn saved_token(config: &PathquillConfig) -> Result<Option<String>, BricksError> {
        credential::load_token(&config.data_dir())
    }

    /// Makes sure every file of the asset is present and verified locally,
    /// downloading what is missing or stale.
    pub async fn ensure_asset(&self, name: &str) -> Result<LocalAsset, BricksError> {
        let manifest = self.fetch_manifest(name).await?;
        if manifest.files.is_empty() {
            return Err(BricksError::InvalidManifest(format!(
                "asset '{name}' lists no files"
            )));
        }

        let asset_dir = self.assets_dir.join(name);
        tokio::fs::create_dir_all(&asset_dir).await?;

        let mut files = Vec::with_capacity(manifest.files.len());
        for entry in &manifest.files {
            let dest = asset_dir.join(sanitize_rel_path(&entry.path)?);
            if is_current(&dest, &entry.sha256)? {
                debug!("{} is up to date", dest.display());
            } else {
                self.download(entry, &dest).await?;
            }
            files.push(dest);
        }

        let digest = manifest_digest(&manifest);
        info!("asset '{}' available locally ({} files)", name, files.len());
        Ok(LocalAsset {
            name: name.to_string(),
            files,
            digest,
        })
    }

    async fn fetch_manifest(&self, name: &str) -> Result<AssetManifest, BricksError> {
        let url = self
            .registry
            .join(&format!("api/assets/{name}/manifest"))
            .map_err(|e| BricksError::Registry(format!("bad manifest URL for '{name}': {e}")))?;

        let mut delay = Duration::from_millis(INITIAL_RETRY_DELAY_MS);
        let mut last_error = String::new();

        for attempt in 1..=self.max_retries {
            debug!("fetching manifest for '{}' (attempt {})", name, attempt);
            match self.try_fetch_manifest(&url, name).await {
                Ok(manifest) => return Ok(manifest),
                Err(e) if !is_transient(&e) => return Err(e),
                Err(e) => {
                    warn!("manifest fetch for '{}' failed (attempt {}): {}", name, attempt, e);
                    last_error = e.to_string();
                }
            }
            if attempt < self.max_retries {
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(Duration::from_millis(MAX_RETRY_DELAY_MS));
            }
        }

        Err(BricksError::RetryExhausted(self.max_retries, last_error))
    }

    async fn try_fetch_manifest(&self, url: &Url, name: &str) -> Result<AssetManifest, BricksError> {
        let response = self
            .client
            .get(url.clone())
            .bearer_auth(&self.token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response.json().await?),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(BricksError::Credential(
                "access token rejected by the registry".to_string(),
            )),
            StatusCode::NOT_FOUND => Err(BricksError::UnknownAsset(name.to_string())),
            status => Err(BricksError::Registry(format!(
                "registry answered HTTP {} for asset '{}'",
                status.as_u16(),
                name
            ))),
        }
    }

    async fn download(&self, entry: &AssetFileEntry, dest: &Path) -> Result<(), BricksError> {
        let mut delay = Duration::from_millis(INITIAL_RETRY_DELAY_MS);
        let mut last_error = String::new();

        for attempt in 1..=self.max_retries {
            info!("downloading {} (attempt {})", entry.path, attempt);
            match self.try_download(entry, dest).await {
                Ok(()) => return Ok(()),
                Err(e) if !is_transient(&e) => return Err(e),
                Err(e) => {
                    warn!("download of {} failed (attempt {}): {}", entry.path, attempt, e);
                    last_error = e.to_string();
                }
            }
            if attempt < self.max_retries {
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(Duration::from_millis(MAX_RETRY_DELAY_MS));
            }
        }

        Err(BricksError::RetryExhausted(self.max_retries, last_error))
    }

    async fn try_download(&self, entry: &AssetFileEntry, dest: &Path) -> Result<(), BricksError> {
        let response = self
            .client
            .get(&entry.url)
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?;

        let part = partial_path(dest);
        let mut file = tokio::fs::File::create(&part).await?;
        let mut hasher = Sha256::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            hasher.update(&chunk);
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);

        let actual = hex::encode(hasher.finalize());
        if !actual.eq_ignore_ascii_case(entry.sha256.trim()) {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(BricksError::Checksum {
                path: entry.path.clone(),
                expected: entry.sha256.clone(),
                actual,
            });
        }

        tokio::fs::rename(&part, dest).await?;
        debug!("verified {} ({})", dest.display(), actual);
        Ok(())
    }
}

/// Relative path from a manifest, rejected unless it stays inside the asset
/// directory.
fn sanitize_rel_path(path: &str) -> Result<PathBuf, BricksError> {
    let rel = Path::new(path);
    let safe = !path.is_empty()
        && rel
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if safe {
        Ok(rel.to_path_buf())
    } else {
        Err(BricksError::InvalidManifest(format!(
            "unsafe file path '{path}'"
        )))
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("download");
    dest.with_file_name(format!("{name}.part"))
}

fn is_current(dest: &Path, expected_sha256: &str) -> Result<bool, BricksError> {
    if !dest.exists() {
        return Ok(false);
    }
    Ok(file_digest(dest)?.eq_ignore_ascii_case(expected_sha256.trim()))
}

fn file_digest(path: &Path) -> Result<String, BricksError> {
    use std::io::Read;

    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Identity of a manifest: the hash of its file list and their checksums.
fn manifest_digest(manifest: &AssetManifest) -> String {
    let mut hasher = Sha256::new();
    for entry in &manifest.files {
        hasher.update(entry.path.as_bytes());
        hasher.update(b"\0");
        hasher.update(entry.sha256.as_bytes());
        hasher.update(b"\0");
    }
    hex::encode(hasher.finalize())
}

fn is_transient(err: &BricksError) -> bool {
    match err {
        BricksError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        BricksError::Registry(msg) => msg.contains("HTTP 5"),
        _ => false,
    }
}
