#![allow(clippy::unwrap_used)]
// Integration tests for `QbitClient` using wiremock.

use url::Url;
use wiremock::matchers::{body_string, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use speedwindow_api::{Error, QbitClient, TransferLimits, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, QbitClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = QbitClient::new(base_url, &TransportConfig::default()).unwrap();
    (server, client)
}

async fn mount_limits(server: &MockServer, download: i64, upload: i64) {
    Mock::given(method("GET"))
        .and(path("/api/v2/transfer/downloadLimit"))
        .respond_with(ResponseTemplate::new(200).set_body_string(download.to_string()))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/transfer/uploadLimit"))
        .respond_with(ResponseTemplate::new(200).set_body_string(upload.to_string()))
        .mount(server)
        .await;
}

// ── Authentication tests ────────────────────────────────────────────

#[tokio::test]
async fn test_login_success_sets_session_cookie() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/auth/login"))
        .and(body_string_contains("username=admin"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "SID=abc123; path=/")
                .set_body_string("Ok."),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v2/app/version"))
        .and(header("cookie", "SID=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_string("v4.6.2"))
        .mount(&server)
        .await;

    let secret: secrecy::SecretString = "adminadmin".to_string().into();
    client.login("admin", &secret).await.unwrap();
    assert_eq!(client.version().await.unwrap(), "v4.6.2");
}

#[tokio::test]
async fn test_login_bad_credentials() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Fails."))
        .mount(&server)
        .await;

    let secret: secrecy::SecretString = "wrong".to_string().into();
    let result = client.login("admin", &secret).await;

    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_login_banned() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/auth/login"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Your IP address has been banned"))
        .mount(&server)
        .await;

    let secret: secrecy::SecretString = "wrong".to_string().into();
    let result = client.login("admin", &secret).await;
    assert!(matches!(result, Err(Error::Banned)), "got: {result:?}");
}

#[tokio::test]
async fn test_forbidden_api_call_means_session_expired() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/app/version"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .mount(&server)
        .await;

    let err = client.version().await.unwrap_err();
    assert!(err.is_auth_expired(), "got: {err:?}");
}

// ── Transfer limit tests ────────────────────────────────────────────

#[tokio::test]
async fn test_transfer_limits_are_converted_to_kib() {
    let (server, client) = setup().await;
    mount_limits(&server, 512_000, 0).await;

    let limits = client.transfer_limits().await.unwrap();
    assert_eq!(
        limits,
        TransferLimits {
            download_kib: 500,
            upload_kib: 0,
        }
    );
}

#[tokio::test]
async fn test_set_transfer_limits_only_writes_changed_direction() {
    let (server, client) = setup().await;
    mount_limits(&server, 102_400, 204_800).await;

    Mock::given(method("POST"))
        .and(path("/api/v2/transfer/setDownloadLimit"))
        .and(body_string("limit=51200"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v2/transfer/setUploadLimit"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    client
        .set_transfer_limits(TransferLimits {
            download_kib: 50,
            upload_kib: 200,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_set_transfer_limits_compares_exact_byte_rates() {
    let (server, client) = setup().await;
    // 1500 B/s reads back as 1 KiB/s but is not the 1024 B/s we want.
    mount_limits(&server, 1500, 2048).await;

    Mock::given(method("POST"))
        .and(path("/api/v2/transfer/setDownloadLimit"))
        .and(body_string("limit=1024"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v2/transfer/setUploadLimit"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    client
        .set_transfer_limits(TransferLimits {
            download_kib: 1,
            upload_kib: 2,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_set_transfer_limits_forwards_unlimited_sentinel() {
    let (server, client) = setup().await;
    mount_limits(&server, 102_400, 102_400).await;

    Mock::given(method("POST"))
        .and(path("/api/v2/transfer/setDownloadLimit"))
        .and(body_string("limit=0"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v2/transfer/setUploadLimit"))
        .and(body_string("limit=-1024"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client
        .set_transfer_limits(TransferLimits {
            download_kib: 0,
            upload_kib: -1,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_non_numeric_limit_body_is_a_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/transfer/downloadLimit"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let result = client.download_limit().await;
    assert!(
        matches!(result, Err(Error::Deserialization { .. })),
        "got: {result:?}"
    );
}

#[tokio::test]
async fn test_server_error_maps_to_api_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/transfer/setUploadLimit"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let result = client.set_upload_limit(1024).await;
    assert!(
        matches!(result, Err(Error::Api { status: 500, .. })),
        "got: {result:?}"
    );
}

#[tokio::test]
async fn test_base_url_sub_path_is_preserved() {
    let server = MockServer::start().await;
    let base_url = Url::parse(&format!("{}/qbt/", server.uri())).unwrap();
    let client = QbitClient::with_client(reqwest::Client::new(), base_url);

    Mock::given(method("GET"))
        .and(path("/qbt/api/v2/app/version"))
        .respond_with(ResponseTemplate::new(200).set_body_string("v5.0.0\n"))
        .mount(&server)
        .await;

    assert_eq!(client.version().await.unwrap(), "v5.0.0");
}
