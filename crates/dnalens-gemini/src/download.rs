//! Streams remote creatives into scoped temporary files.

use std::path::{Path, PathBuf};

use reqwest::{Client, Url};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

use crate::error::DownloadError;

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "webm", "m4v", "mkv", "avi"];

/// Suffix for the staged file, taken from the URL path when it names a video.
fn suffix_for(url: &str) -> String {
    let extension = Url::parse(url).ok().and_then(|parsed| {
        let last = parsed.path_segments()?.next_back()?.to_owned();
        let ext = Path::new(&last).extension()?.to_str()?.to_ascii_lowercase();
        VIDEO_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
    });
    format!(".{}", extension.as_deref().unwrap_or("mp4"))
}

/// Best-effort MIME type for a local video file.
#[must_use]
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        _ => "video/mp4",
    }
}

/// Read timeouts surface either directly or as an `io::ErrorKind::TimedOut`
/// somewhere in the source chain of a body error.
fn is_timeout(err: &reqwest::Error) -> bool {
    if err.is_timeout() {
        return true;
    }
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        if cause
            .downcast_ref::<std::io::Error>()
            .is_some_and(|io| io.kind() == std::io::ErrorKind::TimedOut)
        {
            return true;
        }
        source = std::error::Error::source(cause);
    }
    false
}

/// Downloads `url` into a new temporary file under `temp_dir` (or the OS
/// temp dir). The file is removed when the returned handle is dropped, so
/// every exit path of the caller cleans up.
///
/// # Errors
///
/// Returns [`DownloadError`] when the host stays idle past the client's
/// read timeout, on a non-2xx status, transport failure
/// or a local write failure. A partially written file is removed before
/// the error is returned.
pub(crate) async fn download_to_temp(
    client: &Client,
    url: &str,
    temp_dir: Option<&Path>,
) -> Result<NamedTempFile, DownloadError> {
    let transport = |source: reqwest::Error| {
        if is_timeout(&source) {
            DownloadError::Timeout {
                url: url.to_owned(),
            }
        } else {
            DownloadError::Transport {
                url: url.to_owned(),
                source,
            }
        }
    };

    let mut response = client.get(url).send().await.map_err(transport)?;
    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::Status {
            url: url.to_owned(),
            status: status.as_u16(),
        });
    }

    let staging_dir = temp_dir.map_or_else(std::env::temp_dir, Path::to_path_buf);
    let io_err = |path: PathBuf| move |source: std::io::Error| DownloadError::Io { path, source };

    let temp = tempfile::Builder::new()
        .prefix("dnalens-")
        .suffix(&suffix_for(url))
        .tempfile_in(&staging_dir)
        .map_err(io_err(staging_dir.clone()))?;

    let mut out = tokio::fs::OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(temp.path())
        .await
        .map_err(io_err(temp.path().to_path_buf()))?;

    let mut written: u64 = 0;
    while let Some(chunk) = response.chunk().await.map_err(transport)? {
        out.write_all(&chunk)
            .await
            .map_err(io_err(temp.path().to_path_buf()))?;
        written += chunk.len() as u64;
    }
    out.flush()
        .await
        .map_err(io_err(temp.path().to_path_buf()))?;

    tracing::debug!(url, bytes = written, path = %temp.path().display(), "creative downloaded");
    Ok(temp)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::GeminiClient;

    fn download_client(timeout: Duration) -> Client {
        GeminiClient::build_download_client(timeout).expect("client")
    }

    /// Serves one response whose body trickles out a byte at a time.
    async fn trickle_host(body_len: usize, every: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut request = [0_u8; 1024];
            let _ = socket.read(&mut request).await;
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: video/mp4\r\nContent-Length: {body_len}\r\nConnection: close\r\n\r\n"
            );
            socket.write_all(head.as_bytes()).await.expect("head");
            for _ in 0..body_len {
                tokio::time::sleep(every).await;
                socket.write_all(b"x").await.expect("byte");
                socket.flush().await.expect("flush");
            }
        });
        format!("http://{addr}/ad.mp4")
    }

    #[tokio::test]
    async fn stalled_host_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ad.mp4"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"video".to_vec())
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;
        let url = format!("{}/ad.mp4", server.uri());

        let err = download_to_temp(&download_client(Duration::from_millis(300)), &url, None)
            .await
            .expect_err("stalled host");
        assert!(
            matches!(err, DownloadError::Timeout { url: ref timed_out } if *timed_out == url),
            "expected timeout, got {err:?}"
        );
    }

    #[tokio::test]
    async fn slow_but_steady_host_completes() {
        let url = trickle_host(12, Duration::from_millis(200)).await;
        let dir = tempfile::tempdir().unwrap();

        let staged = download_to_temp(
            &download_client(Duration::from_secs(1)),
            &url,
            Some(dir.path()),
        )
        .await
        .expect("steady transfer longer than the timeout");
        assert_eq!(std::fs::read(staged.path()).unwrap(), vec![b'x'; 12]);
    }

    #[test]
    fn suffix_follows_known_video_extension() {
        assert_eq!(suffix_for("https://cdn.example/ads/clip.MOV?sig=1"), ".mov");
        assert_eq!(suffix_for("https://cdn.example/ads/clip.webm"), ".webm");
    }

    #[test]
    fn suffix_defaults_to_mp4() {
        assert_eq!(suffix_for("https://cdn.example/ads/12345"), ".mp4");
        assert_eq!(suffix_for("https://cdn.example/page.html"), ".mp4");
        assert_eq!(suffix_for("not a url"), ".mp4");
    }

    #[test]
    fn mime_types_by_extension() {
        assert_eq!(mime_for_path(Path::new("a.mp4")), "video/mp4");
        assert_eq!(mime_for_path(Path::new("a.MOV")), "video/quicktime");
        assert_eq!(mime_for_path(Path::new("a.webm")), "video/webm");
        assert_eq!(mime_for_path(Path::new("no_extension")), "video/mp4");
    }
}
