// qBittorrent global transfer limit endpoints
//
// The WebUI speaks bytes/s; callers speak KiB/s. Conversion lives here so
// nothing above the client ever sees raw byte rates.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Error;
use crate::qbittorrent::client::QbitClient;

const BYTES_PER_KIB: i64 = 1024;

/// Global download/upload limits in KiB/s. Zero or negative means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferLimits {
    pub download_kib: i64,
    pub upload_kib: i64,
}

impl QbitClient {
    /// Global download limit in bytes/s.
    ///
    /// `GET /api/v2/transfer/downloadLimit`
    pub async fn download_limit(&self) -> Result<i64, Error> {
        let body = self.get_text("transfer/downloadLimit").await?;
        parse_rate(&body)
    }

    /// Global upload limit in bytes/s.
    ///
    /// `GET /api/v2/transfer/uploadLimit`
    pub async fn upload_limit(&self) -> Result<i64, Error> {
        let body = self.get_text("transfer/uploadLimit").await?;
        parse_rate(&body)
    }

    /// `POST /api/v2/transfer/setDownloadLimit` with `limit=<bytes/s>`
    pub async fn set_download_limit(&self, bytes_per_sec: i64) -> Result<(), Error> {
        debug!(limit = bytes_per_sec, "setting global download limit");
        self.post_form(
            "transfer/setDownloadLimit",
            &[("limit", bytes_per_sec.to_string())],
        )
        .await?;
        Ok(())
    }

    /// `POST /api/v2/transfer/setUploadLimit` with `limit=<bytes/s>`
    pub async fn set_upload_limit(&self, bytes_per_sec: i64) -> Result<(), Error> {
        debug!(limit = bytes_per_sec, "setting global upload limit");
        self.post_form(
            "transfer/setUploadLimit",
            &[("limit", bytes_per_sec.to_string())],
        )
        .await?;
        Ok(())
    }

    /// Both global limits, converted to KiB/s.
    pub async fn transfer_limits(&self) -> Result<TransferLimits, Error> {
        let download = self.download_limit().await?;
        let upload = self.upload_limit().await?;
        Ok(TransferLimits {
            download_kib: download / BYTES_PER_KIB,
            upload_kib: upload / BYTES_PER_KIB,
        })
    }

    /// Apply both global limits (KiB/s), writing only directions that differ
    /// from the WebUI's current value.
    pub async fn set_transfer_limits(&self, limits: TransferLimits) -> Result<(), Error> {
        // Compared in bytes/s: 1500 B/s truncates to 1 KiB/s but is not 1024.
        let upload = limits.upload_kib.saturating_mul(BYTES_PER_KIB);
        if self.upload_limit().await? != upload {
            self.set_upload_limit(upload).await?;
        }
        let download = limits.download_kib.saturating_mul(BYTES_PER_KIB);
        if self.download_limit().await? != download {
            self.set_download_limit(download).await?;
        }
        Ok(())
    }
}

/// The limit endpoints return a bare integer body.
fn parse_rate(body: &str) -> Result<i64, Error> {
    body.trim()
        .parse::<i64>()
        .map_err(|e| Error::Deserialization {
            message: format!("expected an integer rate: {e}"),
            body: body.to_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::parse_rate;

    #[test]
    fn parse_rate_accepts_trailing_newline() {
        assert_eq!(parse_rate("102400\n").ok(), Some(102_400));
    }

    #[test]
    fn parse_rate_rejects_garbage() {
        assert!(parse_rate("unlimited").is_err());
    }
}
