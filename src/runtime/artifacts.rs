use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::Utc;
use reqwest::Client;
use tokio::{fs, io::AsyncWriteExt, time::timeout};
use url::Url;
use uuid::Uuid;

use crate::{config::ArtifactsConfig, service::Transport, utils::http::create_download_client};

use super::RuntimeError;

/// A file in the scratch directory. Whoever holds the value owns the file; it is
/// removed on [`discard`](Self::discard) or, failing that, on drop.
#[derive(Debug)]
pub struct TemporaryVideoFile {
    path: PathBuf,
    extension: String,
    removed: bool,
}

impl TemporaryVideoFile {
    fn new(path: PathBuf, extension: &str) -> Self {
        Self {
            path,
            extension: extension.to_string(),
            removed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub async fn exists(&self) -> bool {
        fs::try_exists(&self.path).await.unwrap_or(false)
    }

    /// Deletes the file now. Failures are logged, never returned.
    pub async fn discard(mut self) {
        self.removed = true;
        match fs::remove_file(&self.path).await {
            Ok(()) => debug!("Removed temporary file {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove temporary file {}: {}", self.path.display(), e),
        }
    }
}

impl Drop for TemporaryVideoFile {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed temporary file {} on drop", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove temporary file {}: {}", self.path.display(), e),
        }
    }
}

/// Owns the scratch directory: unique file names, downloads and relay uploads.
pub struct ArtifactManager {
    scratch_dir: PathBuf,
    client: Client,
    download_timeout: Duration,
}

impl ArtifactManager {
    pub fn new(config: &ArtifactsConfig) -> Result<Self, RuntimeError> {
        Ok(Self {
            scratch_dir: config.scratch_dir.clone(),
            client: create_download_client()?,
            download_timeout: config.download_timeout,
        })
    }

    #[cfg(test)]
    pub fn for_tests(scratch_dir: &Path) -> Self {
        Self::new(&ArtifactsConfig {
            scratch_dir: scratch_dir.to_path_buf(),
            download_timeout: Duration::from_secs(5),
        })
        .expect("download client")
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Wipes and recreates the scratch directory. Run once at startup.
    pub async fn prepare(&self) -> Result<(), RuntimeError> {
        match fs::remove_dir_all(&self.scratch_dir).await {
            Ok(()) => info!("Purged scratch directory {}", self.scratch_dir.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        fs::create_dir_all(&self.scratch_dir).await?;
        Ok(())
    }

    /// Reserves a unique path. Nothing is created on disk.
    pub fn allocate(&self, extension: &str) -> TemporaryVideoFile {
        let name = format!("{}-{}.{}", Utc::now().timestamp_millis(), Uuid::new_v4().simple(), extension);
        TemporaryVideoFile::new(self.scratch_dir.join(name), extension)
    }

    pub async fn download(&self, url: &Url) -> Result<TemporaryVideoFile, RuntimeError> {
        self.download_with_timeout(url, self.download_timeout).await
    }

    /// Streams `url` into a new scratch file. On timeout the transfer future is
    /// dropped, which closes the connection, and the partial file is removed.
    pub async fn download_with_timeout(&self, url: &Url, limit: Duration) -> Result<TemporaryVideoFile, RuntimeError> {
        let file = self.allocate("mp4");
        info!("Downloading {} to {}", url, file.path().display());

        match timeout(limit, self.fetch_to(url, file.path())).await {
            Ok(Ok(bytes)) => {
                info!("Downloaded {} bytes from {}", bytes, url);
                Ok(file)
            }
            Ok(Err(e)) => {
                warn!("Download of {} failed: {}", url, e);
                Err(e)
            }
            Err(_) => {
                warn!("Download of {} timed out after {:?}", url, limit);
                Err(RuntimeError::Timeout(limit))
            }
        }
    }

    async fn fetch_to(&self, url: &Url, path: &Path) -> Result<u64, RuntimeError> {
        let mut response = self.client.get(url.clone()).send().await?.error_for_status()?;
        let mut output = fs::File::create(path).await?;

        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            output.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        output.flush().await?;

        Ok(written)
    }

    /// Uploads the file to the relay chat and returns the file id. The file is
    /// deleted whatever the upload outcome.
    pub async fn relay(&self, file: TemporaryVideoFile, transport: &dyn Transport) -> Result<String, RuntimeError> {
        debug!("Relaying {} file {}", file.extension(), file.path().display());
        let uploaded = transport.upload_to_relay(file.path()).await;
        file.discard().await;

        let file_id = uploaded?;
        debug!("Relay upload produced file id {}", file_id);
        Ok(file_id)
    }
}
