// qBittorrent Web API HTTP client
//
// Wraps `reqwest::Client` with `/api/v2` URL construction and status
// mapping. Endpoint groups (auth, transfer) are implemented as inherent
// methods in separate files to keep this module focused on transport.

use reqwest::StatusCode;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Raw HTTP client for a single qBittorrent WebUI.
///
/// Authentication is cookie based: a successful login stores the `SID`
/// cookie in the client's jar and every later request carries it.
#[derive(Clone)]
pub struct QbitClient {
    http: reqwest::Client,
    base_url: Url,
    timeout_secs: u64,
}

impl QbitClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// If the config doesn't already include a cookie jar, one is created
    /// automatically (session auth requires cookies). `base_url` is the
    /// WebUI root, e.g. `http://192.168.1.10:8080`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let config = if transport.cookie_jar.is_some() {
            transport.clone()
        } else {
            transport.clone().with_cookie_jar()
        };
        let http = config.build_client()?;
        Ok(Self {
            http,
            base_url,
            timeout_secs: config.timeout_secs(),
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            timeout_secs: 0,
        }
    }

    /// The underlying HTTP client (for auth flows that need direct access).
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// The WebUI base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build a full URL for an API path: `{base}/api/v2/{path}`.
    ///
    /// Keeps any sub-path the WebUI is mounted under (reverse proxies).
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/api/v2/{path}"))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and return the response body as text.
    pub(crate) async fn get_text(&self, path: &str) -> Result<String, Error> {
        let url = self.api_url(path)?;
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        self.read_body(resp).await
    }

    /// Send a form-encoded POST request and return the response body.
    pub(crate) async fn post_form(
        &self,
        path: &str,
        form: &[(&str, String)],
    ) -> Result<String, Error> {
        let url = self.api_url(path)?;
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        self.read_body(resp).await
    }

    /// Map response status codes onto crate errors, returning the body on success.
    async fn read_body(&self, resp: reqwest::Response) -> Result<String, Error> {
        let status = resp.status();

        if status == StatusCode::FORBIDDEN {
            return Err(Error::SessionExpired);
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        resp.text().await.map_err(|e| self.transport_error(e))
    }

    /// Timeouts get their own variant so callers can report the configured bound.
    pub(crate) fn transport_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() && self.timeout_secs > 0 {
            Error::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            Error::Transport(err)
        }
    }
}
