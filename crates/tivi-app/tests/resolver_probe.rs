//! Resolver probe behaviour against a live HTTP fixture: HEAD rejection
//! falls back to GET, redirects are followed, and the post-redirect URL is
//! what reaches the player.

use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{any, get};
use axum::Router;

use tivi_app::resolver::{MimeHint, StreamResolver};
use tivi_core::config::ResolverConfig;
use tivi_core::model::Channel;

async fn guarded(method: Method) -> Response {
    // header-only requests are rejected the way picky IPTV relays do
    if method == Method::HEAD {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }
    Redirect::temporary("/stream/index.m3u8").into_response()
}

async fn manifest() -> Response {
    (
        [(header::CONTENT_TYPE, "application/vnd.apple.mpegurl")],
        "#EXTM3U\n",
    )
        .into_response()
}

async fn ua_gate(headers: HeaderMap) -> Response {
    let ua = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if ua == "TiviTV/1.0" {
        Redirect::temporary("/stream/index.m3u8").into_response()
    } else {
        Redirect::temporary("/denied").into_response()
    }
}

async fn denied() -> Response {
    (StatusCode::FORBIDDEN, "no").into_response()
}

async fn serve_fixture() -> String {
    let app = Router::new()
        .route("/guarded", any(guarded))
        .route("/ua-gate", any(ua_gate))
        .route("/denied", get(denied))
        .route("/stream/index.m3u8", get(manifest));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn channel(url: &str, user_agent: Option<&str>) -> Channel {
    Channel {
        id: "pl_1".to_string(),
        number: 1,
        name: "Fixture".to_string(),
        group: "General".to_string(),
        url: url.to_string(),
        user_agent: user_agent.map(|s| s.to_string()),
        logo_url: None,
        drm_license: None,
        is_favorite: false,
    }
}

fn resolver() -> StreamResolver {
    StreamResolver::new(&ResolverConfig {
        connect_timeout_secs: 2,
        request_timeout_secs: 5,
    })
}

#[tokio::test]
async fn head_rejection_falls_back_to_get_and_follows_redirects() {
    let base = serve_fixture().await;
    let ch = channel(&format!("{base}/guarded"), None);

    let descriptor = resolver().resolve(&ch).await;

    assert_eq!(descriptor.url, format!("{base}/stream/index.m3u8"));
    assert_eq!(descriptor.mime_hint, Some(MimeHint::Hls));
}

#[tokio::test]
async fn channel_user_agent_is_sent_on_the_probe() {
    let base = serve_fixture().await;
    let ch = channel(&format!("{base}/ua-gate"), Some("TiviTV/1.0"));

    let descriptor = resolver().resolve(&ch).await;
    assert_eq!(descriptor.url, format!("{base}/stream/index.m3u8"));

    // without the playlist's agent the gate bounces the probe elsewhere
    let anon = channel(&format!("{base}/ua-gate"), None);
    let descriptor = resolver().resolve(&anon).await;
    assert_eq!(descriptor.url, format!("{base}/denied"));
}

#[tokio::test]
async fn unreachable_host_falls_back_to_the_raw_url() {
    // nothing listens here; the port was bound and dropped
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = format!("http://{addr}/live/stream");
    let descriptor = resolver().resolve(&channel(&url, None)).await;

    assert_eq!(descriptor.url, url);
    assert_eq!(descriptor.mime_hint, None);
}

#[tokio::test]
async fn plain_ts_url_skips_the_network_entirely() {
    // no server at all; the fast path must not touch the wire
    let descriptor = resolver()
        .resolve(&channel("http://127.0.0.1:9/segment.ts", None))
        .await;
    assert_eq!(descriptor.url, "http://127.0.0.1:9/segment.ts");
    assert_eq!(descriptor.mime_hint, Some(MimeHint::TransportStream));
}
