//! Making a source's files available locally.
//!
//! Three strategies exist:
//! - [`FetchPlan::ExternalFolder`]: another process fills the folder; only
//!   its existence is checked
//! - [`FetchPlan::Archive`]: a zip archive is streamed next to the folder,
//!   verified against an optional SHA-256 and extracted into the data root
//! - [`FetchPlan::SingleFile`]: one file is streamed into the folder
//!
//! Fetching never fails loudly: every problem is logged and reported as
//! `false`, which makes the caller skip the source.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{IngestionError, Result};

/// How a source's folder gets filled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchPlan {
    ExternalFolder,
    Archive {
        url: String,
        archive_name: String,
        sha256: Option<String>,
        force: bool,
    },
    SingleFile {
        url: String,
        file_name: String,
    },
}

/// HTTP client shared by all adapters.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .tcp_nodelay(true)
            .build()?;
        Ok(Self { client })
    }

    /// Ensure `data_root/folder` exists, downloading it if needed.
    #[instrument(skip(self, plan, data_root, folder), fields(folder = %folder))]
    pub async fn fetch_if_absent(&self, plan: &FetchPlan, data_root: &Path, folder: &str) -> bool {
        let out_folder = data_root.join(folder);
        match plan {
            FetchPlan::ExternalFolder => {
                if out_folder.is_dir() {
                    info!(path = %out_folder.display(), "Folder already exists");
                    true
                } else {
                    warn!(path = %out_folder.display(), "Folder does not exist");
                    false
                }
            }
            FetchPlan::Archive {
                url,
                archive_name,
                sha256,
                force,
            } => {
                let archive = data_root.join(archive_name);
                self.fetch_archive(url, &archive, sha256.as_deref(), *force, data_root, &out_folder)
                    .await
            }
            FetchPlan::SingleFile { url, file_name } => {
                match self.fetch_single_file(url, &out_folder, file_name).await {
                    Ok(()) => true,
                    Err(e) => {
                        error!(url = %url, error = %e, "Could not download file");
                        false
                    }
                }
            }
        }
    }

    async fn fetch_archive(
        &self,
        url: &str,
        archive: &Path,
        sha256: Option<&str>,
        force: bool,
        data_root: &Path,
        out_folder: &Path,
    ) -> bool {
        if force {
            info!(
                folder = %out_folder.display(),
                archive = %archive.display(),
                "Forced download, removing existing folder and archive"
            );
            if let Err(e) = remove_existing(out_folder, archive).await {
                error!(error = %e, "Could not remove previous download");
                return false;
            }
        } else if out_folder.exists() {
            info!(path = %out_folder.display(), "Folder already exists, skipping download");
            return true;
        } else if archive.exists() {
            info!(archive = %archive.display(), "Archive already exists, extracting");
            return self.verify_and_extract(archive, sha256, data_root, out_folder).await;
        }

        if let Err(e) = self.download(url, archive).await {
            error!(url = %url, error = %e, "Could not download archive");
            return false;
        }
        self.verify_and_extract(archive, sha256, data_root, out_folder).await
    }

    async fn verify_and_extract(
        &self,
        archive: &Path,
        sha256: Option<&str>,
        data_root: &Path,
        out_folder: &Path,
    ) -> bool {
        if let Some(expected) = sha256 {
            if let Err(e) = verify_sha256(archive, expected).await {
                error!(error = %e, "Archive failed verification, removing it");
                if let Err(e) = fs::remove_file(archive).await {
                    warn!(archive = %archive.display(), error = %e, "Could not remove archive");
                }
                return false;
            }
        }

        let (src, dest) = (archive.to_path_buf(), data_root.to_path_buf());
        let extracted = tokio::task::spawn_blocking(move || extract_zip(&src, &dest))
            .await
            .map_err(|e| IngestionError::Archive(e.to_string()))
            .and_then(|r| r);
        match extracted {
            Ok(entries) => {
                info!(archive = %archive.display(), entries = entries, "Extraction successful");
            }
            Err(e) => {
                error!(archive = %archive.display(), error = %e, "Could not extract archive");
                return false;
            }
        }

        if let Err(e) = fs::remove_file(archive).await {
            warn!(archive = %archive.display(), error = %e, "Could not remove archive");
        }

        if !out_folder.is_dir() {
            error!(
                folder = %out_folder.display(),
                "Archive did not contain the expected folder"
            );
            return false;
        }
        true
    }

    async fn fetch_single_file(&self, url: &str, out_folder: &Path, file_name: &str) -> Result<()> {
        fs::create_dir_all(out_folder).await?;
        let target = out_folder.join(file_name);
        if target.exists() {
            info!(path = %target.display(), "File already exists, skipping download");
            return Ok(());
        }
        self.download(url, &target).await.map(|_| ())
    }

    /// Stream `url` into `target` through a `.partial` file.
    #[instrument(skip(self, target), fields(url = %url))]
    pub async fn download(&self, url: &str, target: &Path) -> Result<u64> {
        let partial = partial_path(target);
        info!(path = %target.display(), "Starting download");

        let response = self.client.get(url).send().await?.error_for_status()?;

        let downloaded = match write_stream(response, &partial).await {
            Ok(bytes) => bytes,
            Err(e) => {
                if let Err(remove) = fs::remove_file(&partial).await {
                    debug!(path = %partial.display(), error = %remove, "No partial file to remove");
                }
                return Err(e);
            }
        };

        if fs::rename(&partial, target).await.is_err() {
            // rename fails across filesystems
            fs::copy(&partial, target).await?;
            fs::remove_file(&partial).await?;
        }

        info!(path = %target.display(), bytes = downloaded, "Download completed");
        Ok(downloaded)
    }
}

async fn write_stream(response: reqwest::Response, partial: &Path) -> Result<u64> {
    let mut file = fs::File::create(partial).await?;
    let mut stream = response.bytes_stream();
    let mut downloaded = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
    }

    file.flush().await?;
    file.sync_all().await?;
    Ok(downloaded)
}

/// Lowercase hex SHA-256 of a file.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

async fn verify_sha256(path: &Path, expected: &str) -> Result<()> {
    let owned = path.to_path_buf();
    let actual = tokio::task::spawn_blocking(move || sha256_file(&owned))
        .await
        .map_err(|e| IngestionError::FileRead(io::Error::new(io::ErrorKind::Other, e)))??;

    if !actual.eq_ignore_ascii_case(expected) {
        return Err(IngestionError::HashMismatch {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            actual,
        });
    }
    debug!(path = %path.display(), "SHA-256 verified");
    Ok(())
}

/// Extract every entry of a zip archive below `dest`. Entries whose names
/// would escape `dest` are rejected.
pub fn extract_zip(archive: &Path, dest: &Path) -> Result<usize> {
    let mut zip = zip::ZipArchive::new(File::open(archive)?)?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let relative = entry
            .enclosed_name()
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                IngestionError::Archive(format!("unsafe entry name '{}'", entry.name()))
            })?;
        let out_path = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)?;
        io::copy(&mut entry, &mut out)?;
    }

    Ok(zip.len())
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    target.with_file_name(name)
}

async fn remove_existing(folder: &Path, archive: &Path) -> io::Result<()> {
    if folder.exists() {
        fs::remove_dir_all(folder).await?;
    }
    if archive.exists() {
        fs::remove_file(archive).await?;
    }
    Ok(())
}
