//! M3U-style playlist parsing and loading.
//!
//! The format is line oriented and deliberately lenient: `#EXTINF:` carries
//! the display name plus optional quoted attributes, `#KODIPROP:` carries a
//! DRM license for the next URL line, and any other non-comment line is a
//! stream URL. Malformed metadata never fails a parse; it degrades to the
//! pending defaults.

use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, warn};

use crate::model::{Catalog, Channel, Playlist, PlaylistKind};

const DRM_DIRECTIVE: &str = "#KODIPROP:inputstream.adaptive.license_key=";
const USER_AGENT_MARKER: &str = "User-Agent=";

#[derive(Debug, thiserror::Error)]
pub enum PlaylistError {
    #[error("failed to fetch playlist: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to read playlist file: {0}")]
    Io(#[from] std::io::Error),
}

/// Parse raw playlist text into a catalog. Total: unreadable input yields an
/// empty catalog, never an error.
///
/// Pending metadata carries from directive lines to the next URL line. Name
/// and DRM license reset after each emitted channel; group and logo persist
/// until overridden, matching the loose grouping convention of the format.
pub fn parse(raw: &str, playlist_id: &str, favorite_ids: &HashSet<String>) -> Catalog {
    let mut channels: Vec<Channel> = Vec::new();

    let mut name = "Unknown".to_string();
    let mut group = "General".to_string();
    let mut logo: Option<String> = None;
    let mut drm: Option<String> = None;
    let mut number: u32 = 1;

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix("#EXTINF:") {
            name = rest.rsplit(',').next().unwrap_or("").trim().to_string();
            if name.is_empty() {
                name = "Unknown".to_string();
            }
            if let Some(v) = quoted_attr(line, "group-title=\"") {
                group = v;
            }
            if let Some(v) = quoted_attr(line, "tvg-logo=\"") {
                logo = Some(v);
            }
            continue;
        }

        if let Some(value) = line.strip_prefix(DRM_DIRECTIVE) {
            drm = Some(value.to_string());
            continue;
        }

        if line.starts_with('#') {
            continue;
        }

        // URL line. An optional pipe-delimited attribute block can carry a
        // per-channel user agent.
        let (url, user_agent) = match line.split_once('|') {
            Some((url, attrs)) => {
                let ua = attrs
                    .find(USER_AGENT_MARKER)
                    .map(|pos| attrs[pos + USER_AGENT_MARKER.len()..].to_string());
                (url.to_string(), ua)
            }
            None => (line.to_string(), None),
        };

        let id = format!("{playlist_id}_{number}");
        channels.push(Channel {
            is_favorite: favorite_ids.contains(&id),
            id,
            number,
            name: std::mem::replace(&mut name, "Unknown".to_string()),
            group: group.clone(),
            url,
            user_agent,
            logo_url: logo.clone(),
            drm_license: drm.take(),
        });
        number += 1;
    }

    debug!(channels = channels.len(), playlist_id, "playlist parsed");
    Catalog::from_channels(channels)
}

/// Extract the value of a quoted attribute like `group-title="…"`.
/// First occurrence wins; a missing closing quote counts as absent.
fn quoted_attr(line: &str, marker: &str) -> Option<String> {
    let start = line.find(marker)? + marker.len();
    let rest = &line[start..];
    rest.find('"').map(|end| rest[..end].to_string())
}

/// Fetch a playlist's text and parse it. Remote sources go through HTTP with
/// bounded timeouts; local sources are plain file reads. Failures here are
/// the one error class the UI surfaces to the user.
pub async fn load(
    playlist: &Playlist,
    favorite_ids: &HashSet<String>,
) -> Result<Catalog, PlaylistError> {
    let raw = match playlist.kind {
        PlaylistKind::Remote => {
            let client = reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(15))
                .timeout(Duration::from_secs(30))
                .build()?;
            client
                .get(&playlist.source)
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?
        }
        PlaylistKind::Local => tokio::fs::read_to_string(&playlist.source)
            .await
            .inspect_err(|e| warn!("cannot read playlist {}: {e}", playlist.source))?,
    };
    Ok(parse(&raw, &playlist.id, favorite_ids))
}
