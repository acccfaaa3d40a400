use std::{
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::{Child, Command},
    task::JoinHandle,
    time::timeout,
};
use url::Url;

use crate::platform::{traits::DurationProbe, PlatformError};

const VIDEO_FORMAT: &str = "bestvideo[height<=1080][ext=mp4]+bestaudio[ext=m4a]/best[height<=1080][ext=mp4]/best[height<=1080]";
const STDERR_TAIL_LINES: usize = 5;

/// Downloads a video straight into `output` with an external tool.
#[async_trait]
pub trait LocalExtractor: Send + Sync {
    async fn extract(&self, url: &Url, output: &Path) -> Result<(), PlatformError>;
}

#[derive(Debug, Deserialize)]
struct VideoInfo {
    duration: Option<f64>,
    #[serde(default)]
    fulltitle: Option<String>,
}

#[derive(Clone, Debug)]
pub struct YtDlp {
    binary: PathBuf,
    cookies: Option<PathBuf>,
    timeout: Duration,
}

impl YtDlp {
    pub fn new(binary: PathBuf, cookies: Option<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary,
            cookies,
            timeout,
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.binary);
        if let Some(cookies) = &self.cookies {
            command.arg("--cookies").arg(cookies);
        }
        command
            .arg("--no-playlist")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    async fn fetch_info(&self, url: &Url) -> Result<VideoInfo, PlatformError> {
        let mut command = self.command();
        command.args(["--dump-json", "--no-download", "--no-warnings", url.as_str()]);

        // `kill_on_drop` takes the process down if the deadline drops the future.
        let output = timeout(self.timeout, command.output())
            .await
            .map_err(|_| PlatformError::Timeout(self.timeout))??;

        if !output.status.success() {
            return Err(PlatformError::ExtractionError(format!(
                "metadata lookup exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        serde_json::from_slice::<VideoInfo>(&output.stdout)
            .map_err(|e| PlatformError::ParsingError(format!("yt-dlp info: {}", e)))
    }
}

#[async_trait]
impl DurationProbe for YtDlp {
    async fn duration(&self, url: &Url) -> Result<Duration, PlatformError> {
        let info = self.fetch_info(url).await?;
        debug!("yt-dlp info for {}: {:?}", url, info.fulltitle);

        let secs = info
            .duration
            .filter(|d| d.is_finite() && *d >= 0.0)
            .ok_or_else(|| PlatformError::MetadataError(format!("no duration reported for {}", url)))?;

        Ok(Duration::from_secs_f64(secs))
    }
}

#[async_trait]
impl LocalExtractor for YtDlp {
    async fn extract(&self, url: &Url, output: &Path) -> Result<(), PlatformError> {
        let mut command = self.command();
        command
            .args(["--newline", "-f", VIDEO_FORMAT, "--merge-output-format", "mp4", "-o"])
            .arg(output)
            .arg(url.as_str());

        info!("Starting yt-dlp for {}", url);
        let mut child = command.spawn()?;
        let progress = log_lines(child.stdout.take(), false);
        let stderr = log_lines(child.stderr.take(), true);

        let status = match timeout(self.timeout, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                abort(&mut child).await;
                return Err(PlatformError::Timeout(self.timeout));
            }
        };

        let _ = progress.await;
        let stderr_tail = stderr.await.unwrap_or_default();

        if status.success() {
            info!("yt-dlp finished for {}", url);
            Ok(())
        } else {
            Err(PlatformError::ExtractionError(format!(
                "yt-dlp exited with {}: {}",
                status,
                stderr_tail.join(" | ")
            )))
        }
    }
}

async fn abort(child: &mut Child) {
    warn!("yt-dlp timed out, killing process {:?}", child.id());
    if let Err(e) = child.kill().await {
        error!("Failed to kill yt-dlp: {}", e);
    }
}

/// Forwards tool output to the log and keeps the last few lines for error reports.
fn log_lines<R>(stream: Option<R>, is_stderr: bool) -> JoinHandle<Vec<String>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut tail = Vec::new();
        let Some(stream) = stream else {
            return tail;
        };

        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if is_stderr {
                warn!("yt-dlp: {}", line);
                if tail.len() == STDERR_TAIL_LINES {
                    tail.remove(0);
                }
                tail.push(line);
            } else {
                debug!("yt-dlp: {}", line);
            }
        }
        tail
    })
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use super::*;

    fn fake_tool(dir: &Path, script: &str) -> PathBuf {
        let path = dir.join("yt-dlp");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", script)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn url() -> Url {
        Url::parse("https://vk.com/video-1_2").unwrap()
    }

    #[tokio::test]
    async fn test_duration_from_dump_json() {
        let dir = tempfile::tempdir().unwrap();
        let tool = fake_tool(dir.path(), r#"echo '{"duration": 240.0, "fulltitle": "clip"}'"#);

        let ytdlp = YtDlp::new(tool, None, Duration::from_secs(5));

        assert_eq!(ytdlp.duration(&url()).await.unwrap(), Duration::from_secs(240));
    }

    #[tokio::test]
    async fn test_extract_writes_to_output_argument() {
        let dir = tempfile::tempdir().unwrap();
        // The output path is the argument following `-o`.
        let tool = fake_tool(
            dir.path(),
            r#"while [ "$#" -gt 0 ]; do if [ "$1" = "-o" ]; then shift; echo video > "$1"; fi; shift; done"#,
        );
        let output = dir.path().join("out.mp4");

        YtDlp::new(tool, None, Duration::from_secs(5))
            .extract(&url(), &output)
            .await
            .unwrap();

        assert!(output.exists());
    }

    #[tokio::test]
    async fn test_extract_failure_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let tool = fake_tool(dir.path(), "echo 'ERROR: Unsupported URL' >&2; exit 1");

        let result = YtDlp::new(tool, None, Duration::from_secs(5))
            .extract(&url(), &dir.path().join("out.mp4"))
            .await;

        assert!(matches!(result, Err(PlatformError::ExtractionError(msg)) if msg.contains("Unsupported URL")));
    }

    #[tokio::test]
    async fn test_extract_timeout_kills_process() {
        let dir = tempfile::tempdir().unwrap();
        let tool = fake_tool(dir.path(), "sleep 30");

        let started = std::time::Instant::now();
        let result = YtDlp::new(tool, None, Duration::from_millis(300))
            .extract(&url(), &dir.path().join("out.mp4"))
            .await;

        assert!(matches!(result, Err(PlatformError::Timeout(_))));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
