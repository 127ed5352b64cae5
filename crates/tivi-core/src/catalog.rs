//! CatalogStore — owns the loaded catalog and writes favourite/recents
//! mutations through to the preference store.
//!
//! The catalog is replaced wholesale on every load; dependent views watch the
//! monotonic `rev` counter to know when to refresh.

use crate::model::{Catalog, Channel, ChannelGroup, FAVORITES_GROUP};
use crate::prefs::Prefs;

pub struct CatalogStore {
    catalog: Catalog,
    prefs: Prefs,
    /// Bumped on every visible change (load or favourite flip).
    rev: u64,
}

impl CatalogStore {
    pub fn new(prefs: Prefs) -> Self {
        Self {
            catalog: Catalog::default(),
            prefs,
            rev: 0,
        }
    }

    pub fn prefs(&self) -> &Prefs {
        &self.prefs
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn rev(&self) -> u64 {
        self.rev
    }

    /// Replace the current catalog with a freshly parsed one.
    pub fn load(&mut self, catalog: Catalog) {
        self.catalog = catalog;
        self.rev += 1;
    }

    /// Flip a channel's favourite state: persisted set, every in-memory copy
    /// of the channel, and the synthetic "Favorites" group.
    pub fn toggle_favorite(&mut self, channel_id: &str) {
        let now_favorite = self.prefs.toggle_favorite(channel_id);

        for group in &mut self.catalog.groups {
            for ch in &mut group.channels {
                if ch.id == channel_id {
                    ch.is_favorite = now_favorite;
                }
            }
        }
        for ch in &mut self.catalog.flat {
            if ch.id == channel_id {
                ch.is_favorite = now_favorite;
            }
        }
        self.rebuild_favorites_group();
        self.rev += 1;
    }

    fn rebuild_favorites_group(&mut self) {
        self.catalog.groups.retain(|g| g.name != FAVORITES_GROUP);
        let favs: Vec<Channel> = self
            .catalog
            .group(crate::model::ALL_CHANNELS_GROUP)
            .map(|g| g.channels.iter().filter(|c| c.is_favorite).cloned().collect())
            .unwrap_or_default();
        if !favs.is_empty() {
            self.catalog.groups.push(ChannelGroup {
                name: FAVORITES_GROUP.to_string(),
                channels: favs,
            });
        }
    }

    /// Record a play for the MRU list and last-played restore point.
    pub fn add_recent(&self, channel: &Channel) {
        self.prefs.add_recent(channel);
        self.prefs.set_last_played(&channel.id);
    }

    /// Parse-order, id-deduplicated channel list: the zapping and
    /// channel-stepping domain.
    pub fn flat(&self) -> &[Channel] {
        &self.catalog.flat
    }

    pub fn channel_by_number(&self, number: u32) -> Option<&Channel> {
        self.catalog.flat.iter().find(|c| c.number == number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ALL_CHANNELS_GROUP;
    use crate::playlist;
    use std::collections::HashSet;

    fn store_with(raw: &str) -> (tempfile::TempDir, CatalogStore) {
        let dir = tempfile::tempdir().unwrap();
        let prefs = Prefs::new(dir.path().join("prefs.json"));
        let mut store = CatalogStore::new(prefs);
        let favs = store.prefs().favorite_ids();
        store.load(playlist::parse(raw, "pl", &favs));
        (dir, store)
    }

    const THREE: &str = "\
#EXTINF:-1 group-title=\"News\",One
http://host/1
#EXTINF:-1 group-title=\"News\",Two
http://host/2
#EXTINF:-1 group-title=\"Sports\",Three
http://host/3
";

    #[test]
    fn load_replaces_catalog_and_bumps_rev() {
        let (_dir, mut store) = store_with(THREE);
        let rev = store.rev();
        store.load(Catalog::default());
        assert!(store.catalog().is_empty());
        assert_eq!(store.rev(), rev + 1);
    }

    #[test]
    fn toggle_favorite_flips_every_copy() {
        let (_dir, mut store) = store_with(THREE);
        store.toggle_favorite("pl_2");

        let news = store.catalog().group("News").unwrap();
        assert!(news.channels.iter().find(|c| c.id == "pl_2").unwrap().is_favorite);
        let all = store.catalog().group(ALL_CHANNELS_GROUP).unwrap();
        assert!(all.channels.iter().find(|c| c.id == "pl_2").unwrap().is_favorite);
        assert!(store.flat().iter().find(|c| c.id == "pl_2").unwrap().is_favorite);
        let favs = store.catalog().group(FAVORITES_GROUP).unwrap();
        assert_eq!(favs.channels.len(), 1);

        // Toggling back restores the original state everywhere.
        store.toggle_favorite("pl_2");
        assert!(store.catalog().group(FAVORITES_GROUP).is_none());
        assert!(!store.flat().iter().any(|c| c.is_favorite));
        assert!(store.prefs().favorite_ids().is_empty());
    }

    #[test]
    fn channel_by_number_uses_flat_order() {
        let (_dir, store) = store_with(THREE);
        assert_eq!(store.channel_by_number(3).unwrap().name, "Three");
        assert!(store.channel_by_number(50).is_none());
    }

    #[test]
    fn add_recent_records_last_played() {
        let (_dir, store) = store_with(THREE);
        let ch = store.flat()[1].clone();
        store.add_recent(&ch);
        assert_eq!(store.prefs().recents()[0].id, "pl_2");
        assert_eq!(store.prefs().last_played().as_deref(), Some("pl_2"));
    }
}
