//! Byte transfer to a signed URL.

use crate::{ProgressSink, UploadProgress};
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE};
use reqwest::{Body, Client, StatusCode};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tagrelay_error::{UploadError, UploadErrorKind, UploadResult};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::{debug, error};

/// Everything a transfer needs besides the file and URL.
pub(crate) struct Transfer<'a> {
    pub http: &'a Client,
    pub chunk_size: usize,
    pub timeout: Duration,
    pub progress: &'a Arc<dyn ProgressSink>,
}

impl Transfer<'_> {
    /// Send the whole file as one PUT whose body is read lazily.
    pub async fn streamed(&self, path: &Path, url: &str, total: u64) -> UploadResult<()> {
        let file = open(path).await?;
        let chunk_size = self.chunk_size;
        let progress = Arc::clone(self.progress);
        let owned_path: PathBuf = path.to_path_buf();

        let body = async_stream::stream! {
            let mut file = file;
            let mut buf = vec![0_u8; chunk_size];
            let mut sent = 0_u64;
            loop {
                match read_chunk(&mut file, &mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        yield Ok::<Vec<u8>, std::io::Error>(buf[..n].to_vec());
                        sent += n as u64;
                        progress.on_progress(&owned_path, UploadProgress { bytes_sent: sent, total });
                    }
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        };

        let response = self
            .http
            .put(url)
            .header(CONTENT_TYPE, content_type_for(path))
            .header(CONTENT_LENGTH, total)
            .body(Body::wrap_stream(body))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                error!(path = %path.display(), error = %e, "Streamed upload failed");
                UploadError::new(UploadErrorKind::Transfer(e.to_string()))
            })?;

        check_status(response.status(), "streamed body")?;
        // The transport may drop the body once Content-Length is met, before
        // the stream resumes past its final yield.
        self.progress
            .on_progress(path, UploadProgress { bytes_sent: total, total });
        Ok(())
    }

    /// Send the file as sequential PUTs, one per chunk, in byte order.
    pub async fn chunked(&self, path: &Path, url: &str, total: u64) -> UploadResult<()> {
        let mut file = open(path).await?;
        let mut buf = vec![0_u8; self.chunk_size];
        let mut sent = 0_u64;
        let mut index = 0_u32;

        loop {
            let n = read_chunk(&mut file, &mut buf).await.map_err(|e| {
                UploadError::new(UploadErrorKind::FileRead(format!("{}: {}", path.display(), e)))
            })?;
            // An empty file still needs one request so the URL receives a body.
            if n == 0 && (index > 0 || total > 0) {
                break;
            }
            index += 1;

            let range = if n == 0 {
                format!("bytes */{}", total)
            } else {
                format!("bytes {}-{}/{}", sent, sent + n as u64 - 1, total)
            };
            debug!(path = %path.display(), chunk = index, range = %range, "Sending chunk");

            let response = self
                .http
                .put(url)
                .header(CONTENT_TYPE, content_type_for(path))
                .header(CONTENT_RANGE, range)
                .body(buf[..n].to_vec())
                .timeout(self.timeout)
                .send()
                .await
                .map_err(|e| {
                    error!(path = %path.display(), chunk = index, error = %e, "Chunk upload failed");
                    UploadError::new(UploadErrorKind::Transfer(format!("chunk {}: {}", index, e)))
                })?;
            check_status(response.status(), &format!("chunk {}", index))?;

            sent += n as u64;
            self.progress.on_progress(path, UploadProgress { bytes_sent: sent, total });
            if n == 0 {
                break;
            }
        }
        Ok(())
    }
}

async fn open(path: &Path) -> UploadResult<File> {
    File::open(path).await.map_err(|e| {
        UploadError::new(UploadErrorKind::FileRead(format!("{}: {}", path.display(), e)))
    })
}

/// Fill `buf` from `file`, returning fewer bytes only at end of file.
async fn read_chunk(file: &mut File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

fn check_status(status: StatusCode, unit: &str) -> UploadResult<()> {
    if status == StatusCode::OK || status == StatusCode::NO_CONTENT {
        return Ok(());
    }
    Err(UploadError::new(UploadErrorKind::Transfer(format!(
        "{} rejected with HTTP {}",
        unit,
        status.as_u16()
    ))))
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_200_and_204_succeed() {
        assert!(check_status(StatusCode::OK, "unit").is_ok());
        assert!(check_status(StatusCode::NO_CONTENT, "unit").is_ok());
        assert!(check_status(StatusCode::CREATED, "unit").is_err());
        assert!(check_status(StatusCode::INTERNAL_SERVER_ERROR, "unit").is_err());
    }

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(content_type_for(Path::new("a/b.MP4")), "video/mp4");
        assert_eq!(content_type_for(Path::new("a/b.jpg")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("a/b")), "application/octet-stream");
    }
}
