//! Key-value preference store backing playlists, favourites, recents, and
//! last-played state.
//!
//! Persistence is one JSON document on disk. Reads that fail for any reason
//! (missing file, bad JSON, I/O error) degrade silently to defaults, and
//! write failures are logged and otherwise swallowed: favourites and recents
//! must never block playback. This asymmetry with playlist loading — where
//! errors are surfaced — is deliberate, inherited behaviour.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{Channel, Playlist};

/// Maximum number of entries kept in the most-recently-used list.
pub const RECENTS_CAP: usize = 10;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PrefsData {
    #[serde(default)]
    playlists: Vec<Playlist>,
    #[serde(default)]
    active_playlist_id: Option<String>,
    #[serde(default)]
    favorite_ids: HashSet<String>,
    #[serde(default)]
    recents: Vec<Channel>,
    #[serde(default)]
    last_played_id: Option<String>,
}

pub struct Prefs {
    path: PathBuf,
}

impl Prefs {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location under the platform data dir.
    pub fn open_default() -> Self {
        Self::new(crate::platform::data_dir().join("prefs.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> PrefsData {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_default(),
            Err(_) => PrefsData::default(),
        }
    }

    fn write(&self, data: &PrefsData) {
        let result = (|| -> anyhow::Result<()> {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let json = serde_json::to_string_pretty(data)?;
            std::fs::write(&self.path, json)?;
            Ok(())
        })();
        if let Err(e) = result {
            debug!("prefs write failed ({}): {e}", self.path.display());
        }
    }

    // ── Playlists ─────────────────────────────────────────────────────────────

    /// Register a playlist. The first playlist ever added becomes active.
    pub fn add_playlist(&self, playlist: Playlist) {
        let mut data = self.read();
        data.playlists.push(playlist.clone());
        if data.playlists.len() == 1 {
            data.active_playlist_id = Some(playlist.id);
        }
        self.write(&data);
    }

    pub fn playlists(&self) -> Vec<Playlist> {
        self.read().playlists
    }

    pub fn set_active_playlist(&self, id: &str) {
        let mut data = self.read();
        data.active_playlist_id = Some(id.to_string());
        self.write(&data);
    }

    pub fn active_playlist(&self) -> Option<Playlist> {
        let data = self.read();
        let id = data.active_playlist_id.as_deref()?;
        data.playlists.iter().find(|p| p.id == id).cloned()
    }

    // ── Favourites ────────────────────────────────────────────────────────────

    /// Flip membership in the favourite set. Returns the new membership.
    pub fn toggle_favorite(&self, channel_id: &str) -> bool {
        let mut data = self.read();
        let now_favorite = if data.favorite_ids.contains(channel_id) {
            data.favorite_ids.remove(channel_id);
            false
        } else {
            data.favorite_ids.insert(channel_id.to_string());
            true
        };
        self.write(&data);
        now_favorite
    }

    pub fn favorite_ids(&self) -> HashSet<String> {
        self.read().favorite_ids
    }

    // ── Recents / last played ─────────────────────────────────────────────────

    /// Prepend a channel snapshot to the MRU list: any prior entry with the
    /// same id is removed first, then the list is truncated to the cap.
    pub fn add_recent(&self, channel: &Channel) {
        let mut data = self.read();
        data.recents.retain(|c| c.id != channel.id);
        data.recents.insert(0, channel.clone());
        data.recents.truncate(RECENTS_CAP);
        self.write(&data);
    }

    pub fn recents(&self) -> Vec<Channel> {
        self.read().recents
    }

    pub fn set_last_played(&self, channel_id: &str) {
        let mut data = self.read();
        data.last_played_id = Some(channel_id.to_string());
        self.write(&data);
    }

    pub fn last_played(&self) -> Option<String> {
        self.read().last_played_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PlaylistKind;

    fn temp_prefs() -> (tempfile::TempDir, Prefs) {
        let dir = tempfile::tempdir().unwrap();
        let prefs = Prefs::new(dir.path().join("prefs.json"));
        (dir, prefs)
    }

    fn ch(id: &str, number: u32) -> Channel {
        Channel {
            id: id.to_string(),
            number,
            name: format!("ch {number}"),
            group: "General".to_string(),
            url: format!("http://host/{number}"),
            user_agent: None,
            logo_url: None,
            drm_license: None,
            is_favorite: false,
        }
    }

    #[test]
    fn missing_file_reads_as_defaults() {
        let (_dir, prefs) = temp_prefs();
        assert!(prefs.playlists().is_empty());
        assert!(prefs.favorite_ids().is_empty());
        assert!(prefs.recents().is_empty());
        assert_eq!(prefs.last_played(), None);
    }

    #[test]
    fn corrupt_file_reads_as_defaults() {
        let (_dir, prefs) = temp_prefs();
        std::fs::write(prefs.path(), "not json {").unwrap();
        assert!(prefs.playlists().is_empty());
    }

    #[test]
    fn first_playlist_becomes_active() {
        let (_dir, prefs) = temp_prefs();
        let first = Playlist::new("One", "http://host/a.m3u", PlaylistKind::Remote);
        let second = Playlist::new("Two", "http://host/b.m3u", PlaylistKind::Remote);
        prefs.add_playlist(first.clone());
        prefs.add_playlist(second);
        assert_eq!(prefs.active_playlist().unwrap().id, first.id);
        assert_eq!(prefs.playlists().len(), 2);
    }

    #[test]
    fn toggle_favorite_twice_restores_membership() {
        let (_dir, prefs) = temp_prefs();
        assert!(prefs.toggle_favorite("pl_3"));
        assert!(prefs.favorite_ids().contains("pl_3"));
        assert!(!prefs.toggle_favorite("pl_3"));
        assert!(prefs.favorite_ids().is_empty());
    }

    #[test]
    fn recents_cap_at_ten_most_recent_first() {
        let (_dir, prefs) = temp_prefs();
        for i in 1..=11 {
            prefs.add_recent(&ch(&format!("pl_{i}"), i));
        }
        let recents = prefs.recents();
        assert_eq!(recents.len(), RECENTS_CAP);
        assert_eq!(recents[0].id, "pl_11");
        // the oldest entry fell off
        assert!(!recents.iter().any(|c| c.id == "pl_1"));
    }

    #[test]
    fn recents_dedup_same_id_to_head() {
        let (_dir, prefs) = temp_prefs();
        prefs.add_recent(&ch("pl_1", 1));
        prefs.add_recent(&ch("pl_2", 2));
        prefs.add_recent(&ch("pl_1", 1));
        let recents = prefs.recents();
        assert_eq!(recents.len(), 2);
        assert_eq!(recents[0].id, "pl_1");
        assert_eq!(recents[1].id, "pl_2");
    }

    #[test]
    fn last_played_round_trip() {
        let (_dir, prefs) = temp_prefs();
        prefs.set_last_played("pl_7");
        assert_eq!(prefs.last_played().as_deref(), Some("pl_7"));
    }
}
