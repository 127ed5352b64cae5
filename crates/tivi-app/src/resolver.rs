//! Stream resolution: a bounded network probe that follows redirects,
//! sniffs the container format, and derives the DRM configuration.
//!
//! The probe is HEAD-first — redirect-heavy IPTV relays usually honour it and
//! it transfers no body — with a full GET fallback for servers that reject
//! header-only requests. Resolution never fails: any network problem returns
//! the channel's original URL with no hint and lets the player probe the
//! format itself.

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use reqwest::StatusCode;
use tracing::{debug, warn};

use tivi_core::config::ResolverConfig;
use tivi_core::model::Channel;

/// Container hint handed to the player alongside the resolved URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MimeHint {
    Hls,
    TransportStream,
    Dash,
}

impl MimeHint {
    pub fn content_type(&self) -> &'static str {
        match self {
            MimeHint::Hls => "application/x-mpegURL",
            MimeHint::TransportStream => "video/MP2T",
            MimeHint::Dash => "application/dash+xml",
        }
    }
}

/// DRM configuration derived from the playlist's license string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrmConfig {
    /// Keys delivered inline as a clear-key JSON document.
    ClearKey { license_json: String },
    /// License fetched from a Widevine-class server.
    Widevine { license_url: String },
}

/// Everything the player needs to tune a channel.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDescriptor {
    pub url: String,
    pub mime_hint: Option<MimeHint>,
    pub drm: Option<DrmConfig>,
}

#[derive(Clone)]
pub struct StreamResolver {
    client: reqwest::Client,
}

impl StreamResolver {
    pub fn new(config: &ResolverConfig) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// Resolve a channel's raw URL into a playable descriptor. Infallible:
    /// probe failures fall back to the original URL with no mime hint.
    pub async fn resolve(&self, channel: &Channel) -> StreamDescriptor {
        let drm = channel.drm_license.as_deref().map(classify_drm);

        // Fast path: a plain transport-stream segment URL with no query
        // string needs no probing.
        if url_path(&channel.url).ends_with(".ts") && !channel.url.contains('?') {
            return StreamDescriptor {
                url: channel.url.clone(),
                mime_hint: Some(MimeHint::TransportStream),
                drm,
            };
        }

        match self.probe(channel).await {
            Some((final_url, content_type)) => {
                let mime_hint = classify(&final_url, content_type.as_deref());
                debug!(url = %channel.url, final_url = %final_url, ?mime_hint, "probe ok");
                StreamDescriptor {
                    url: final_url,
                    mime_hint,
                    drm,
                }
            }
            None => {
                warn!(url = %channel.url, "probe failed, falling back to raw url");
                StreamDescriptor {
                    url: channel.url.clone(),
                    mime_hint: None,
                    drm,
                }
            }
        }
    }

    /// HEAD first, GET on method rejection or transport error. Returns the
    /// post-redirect URL and the content type of the successful attempt.
    async fn probe(&self, channel: &Channel) -> Option<(String, Option<String>)> {
        let head = self
            .request(reqwest::Method::HEAD, channel)
            .send()
            .await;

        match head {
            Ok(resp) if !method_rejected(resp.status()) => Some(describe(resp)),
            _ => {
                let resp = self.request(reqwest::Method::GET, channel).send().await.ok()?;
                Some(describe(resp))
            }
        }
    }

    fn request(&self, method: reqwest::Method, channel: &Channel) -> reqwest::RequestBuilder {
        let mut req = self.client.request(method, &channel.url);
        if let Some(ua) = &channel.user_agent {
            req = req.header(reqwest::header::USER_AGENT, ua);
        }
        req
    }
}

fn method_rejected(status: StatusCode) -> bool {
    status == StatusCode::METHOD_NOT_ALLOWED || status == StatusCode::NOT_IMPLEMENTED
}

fn describe(resp: reqwest::Response) -> (String, Option<String>) {
    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    (resp.url().to_string(), content_type)
}

/// The URL path without scheme/host/query, for extension checks.
fn url_path(url: &str) -> &str {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    match without_query.find("://") {
        Some(pos) => match without_query[pos + 3..].find('/') {
            Some(slash) => &without_query[pos + 3 + slash..],
            None => "",
        },
        None => without_query,
    }
}

/// Classify the container from the final URL path and content type.
/// Priority: HLS manifest, then transport stream, then DASH manifest.
pub fn classify(final_url: &str, content_type: Option<&str>) -> Option<MimeHint> {
    let path = url_path(final_url);
    let ct = content_type.unwrap_or("").to_ascii_lowercase();

    if path.ends_with(".m3u8") || ct.contains("mpegurl") {
        return Some(MimeHint::Hls);
    }

    let last_segment = path.rsplit('/').next().unwrap_or("");
    let numeric_segment = !last_segment.is_empty() && last_segment.bytes().all(|b| b.is_ascii_digit());
    if path.ends_with(".ts") || numeric_segment || ct.contains("mp2t") {
        return Some(MimeHint::TransportStream);
    }

    if path.ends_with(".mpd") || ct.contains("dash+xml") {
        return Some(MimeHint::Dash);
    }

    None
}

/// Classify a playlist license string. A `hex:hex` pair (and not a URL) is an
/// inline clear-key; anything else is treated as a license-server URL.
pub fn classify_drm(license: &str) -> DrmConfig {
    if !license.contains("://") {
        if let Some((kid, key)) = license.split_once(':') {
            if is_hex(kid) && is_hex(key) {
                if let (Ok(kid_bytes), Ok(key_bytes)) = (hex::decode(kid), hex::decode(key)) {
                    return DrmConfig::ClearKey {
                        license_json: clearkey_json(&kid_bytes, &key_bytes),
                    };
                }
            }
        }
    }
    DrmConfig::Widevine {
        license_url: license.to_string(),
    }
}

fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.len() % 2 == 0 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Build the W3C clear-key license document: key id and key as unpadded
/// base64url.
fn clearkey_json(kid: &[u8], key: &[u8]) -> String {
    serde_json::json!({
        "keys": [{
            "kty": "oct",
            "kid": URL_SAFE_NO_PAD.encode(kid),
            "k": URL_SAFE_NO_PAD.encode(key),
        }],
        "type": "temporary",
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_hls_by_extension_and_content_type() {
        assert_eq!(
            classify("http://host/live/stream.m3u8", None),
            Some(MimeHint::Hls)
        );
        assert_eq!(
            classify("http://host/live/master.m3u8?token=abc", None),
            Some(MimeHint::Hls)
        );
        assert_eq!(
            classify("http://host/play", Some("application/vnd.apple.mpegurl")),
            Some(MimeHint::Hls)
        );
    }

    #[test]
    fn classify_transport_stream_variants() {
        assert_eq!(
            classify("http://host/live/1234.ts", None),
            Some(MimeHint::TransportStream)
        );
        // purely numeric final path segment, the xtream-style URL shape
        assert_eq!(
            classify("http://host/live/user/pass/48231", None),
            Some(MimeHint::TransportStream)
        );
        assert_eq!(
            classify("http://host/play", Some("video/MP2T")),
            Some(MimeHint::TransportStream)
        );
    }

    #[test]
    fn classify_dash_and_unknown() {
        assert_eq!(
            classify("http://host/manifest.mpd", None),
            Some(MimeHint::Dash)
        );
        assert_eq!(
            classify("http://host/play", Some("application/dash+xml")),
            Some(MimeHint::Dash)
        );
        assert_eq!(classify("http://host/stream", None), None);
        assert_eq!(classify("http://host/stream", Some("text/html")), None);
    }

    #[test]
    fn hls_wins_over_segment_markers() {
        // manifest indicators take priority over the numeric-segment rule
        assert_eq!(
            classify("http://host/123/index.m3u8", Some("video/MP2T")),
            Some(MimeHint::Hls)
        );
    }

    #[test]
    fn clear_key_license_encodes_base64url_no_pad() {
        let drm = classify_drm("aa11:bb22");
        let DrmConfig::ClearKey { license_json } = drm else {
            panic!("expected clear-key");
        };
        let doc: serde_json::Value = serde_json::from_str(&license_json).unwrap();
        assert_eq!(doc["keys"][0]["kid"], "qhE");
        assert_eq!(doc["keys"][0]["k"], "uyI");
        assert_eq!(doc["type"], "temporary");
    }

    #[test]
    fn url_license_classified_as_widevine() {
        assert_eq!(
            classify_drm("https://license.example/wv"),
            DrmConfig::Widevine {
                license_url: "https://license.example/wv".to_string()
            }
        );
        // colon-separated but not hex: still a license URL
        assert_eq!(
            classify_drm("zz11:gg22"),
            DrmConfig::Widevine {
                license_url: "zz11:gg22".to_string()
            }
        );
    }

    #[test]
    fn url_path_strips_host_and_query() {
        assert_eq!(url_path("http://host:8080/a/b.ts?x=1"), "/a/b.ts");
        assert_eq!(url_path("http://host"), "");
        assert_eq!(url_path("/relative/path.m3u8"), "/relative/path.m3u8");
    }
}
