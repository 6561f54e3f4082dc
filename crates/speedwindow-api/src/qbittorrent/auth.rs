// qBittorrent session authentication
//
// Cookie-based login plus a cheap version probe used to decide
// whether a WebUI is reachable and the session is still valid.

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::error::Error;
use crate::qbittorrent::client::QbitClient;

/// Body qBittorrent returns for a successful login.
const LOGIN_OK: &str = "Ok.";

impl QbitClient {
    /// Authenticate with the WebUI using username/password.
    ///
    /// `POST /api/v2/auth/login` with a form body. qBittorrent answers
    /// HTTP 200 in both cases and distinguishes success (`Ok.`) from bad
    /// credentials (`Fails.`) in the body. HTTP 403 means the IP is banned.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<(), Error> {
        let url = self.api_url("auth/login")?;
        debug!("logging in at {}", url);

        let resp = self
            .http()
            .post(url)
            // CSRF protection compares Referer/Origin with the WebUI host.
            .header(reqwest::header::REFERER, self.base_url().as_str())
            .form(&[
                ("username", username),
                ("password", password.expose_secret()),
            ])
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if status == StatusCode::FORBIDDEN {
            return Err(Error::Banned);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: format!("login failed (HTTP {status}): {body}"),
            });
        }

        let body = resp.text().await.map_err(|e| self.transport_error(e))?;
        if body.trim() != LOGIN_OK {
            return Err(Error::Authentication {
                message: "invalid username or password".into(),
            });
        }

        debug!("login successful");
        Ok(())
    }

    /// The qBittorrent application version, e.g. `v4.6.2`.
    ///
    /// `GET /api/v2/app/version`. Requires a valid session unless the
    /// WebUI whitelists the caller's subnet, so it doubles as a liveness probe.
    pub async fn version(&self) -> Result<String, Error> {
        let body = self.get_text("app/version").await?;
        Ok(body.trim().to_owned())
    }
}
