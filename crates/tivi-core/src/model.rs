//! Shared data model: playlists, channels, and the grouped catalog.

use serde::{Deserialize, Serialize};

/// Name of the synthetic group containing every parsed channel.
pub const ALL_CHANNELS_GROUP: &str = "All Channels";

/// Name of the synthetic group containing the favourite subset.
pub const FAVORITES_GROUP: &str = "Favorites";

/// A registered playlist source. Immutable once created; removal happens by
/// dropping it from the persisted playlist list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    /// URL for remote playlists, filesystem path for local ones.
    pub source: String,
    pub kind: PlaylistKind,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PlaylistKind {
    Remote,
    Local,
}

impl Playlist {
    /// Create a playlist with a fresh id. Ids only need to be unique within
    /// one preference store, so a timestamp plus a random suffix is enough.
    pub fn new(name: impl Into<String>, source: impl Into<String>, kind: PlaylistKind) -> Self {
        use rand::Rng;
        let suffix: u32 = rand::thread_rng().gen_range(0..0xFFFF);
        Self {
            id: format!("pl{}{:04x}", chrono::Utc::now().timestamp_millis(), suffix),
            name: name.into(),
            source: source.into(),
            kind,
        }
    }
}

/// One channel entry produced by a parse pass.
///
/// `id` is derived from the playlist id and the line sequence number, so it is
/// stable across re-parses only while the source line order is stable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Channel {
    pub id: String,
    /// 1-based sequential number within the parse pass; zap target.
    pub number: u32,
    pub name: String,
    pub group: String,
    pub url: String,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub drm_license: Option<String>,
    #[serde(default)]
    pub is_favorite: bool,
}

/// A placeholder programme-guide row. There is no real EPG source; the guide
/// column is filled with synthetic entries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Program {
    pub title: String,
    pub time_label: String,
}

/// Generate a dummy schedule starting at 08:00.
pub fn placeholder_programs() -> Vec<Program> {
    use rand::seq::SliceRandom;
    const SHOWS: &[&str] = &["News", "Sports", "Movie", "Kids", "Doc", "Weather"];
    let mut rng = rand::thread_rng();
    (0..=10)
        .map(|slot| Program {
            title: SHOWS.choose(&mut rng).unwrap_or(&"News").to_string(),
            time_label: format!("{}:00", 8 + slot),
        })
        .collect()
}

/// The guide slot covering the current local hour. Hours outside the
/// schedule clamp to its edges.
pub fn current_program() -> Option<Program> {
    use chrono::Timelike;
    let programs = placeholder_programs();
    let hour = chrono::Local::now().hour() as usize;
    let slot = hour.saturating_sub(8).min(programs.len() - 1);
    programs.into_iter().nth(slot)
}

/// A named, ordered slice of the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelGroup {
    pub name: String,
    pub channels: Vec<Channel>,
}

/// The parsed channel catalog: channels grouped by `group-title` in first-seen
/// order, plus a flattened id-deduplicated list used for numeric zapping and
/// channel-up/down stepping.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Catalog {
    pub groups: Vec<ChannelGroup>,
    pub flat: Vec<Channel>,
}

impl Catalog {
    /// Build the grouped catalog from the channels of one parse pass.
    ///
    /// Real groups keep first-seen order; "All Channels" (full parse-order
    /// list) is appended whenever anything parsed, and "Favorites" only when
    /// at least one favourite exists. `flat` keeps the first occurrence of
    /// each distinct id.
    pub fn from_channels(channels: Vec<Channel>) -> Self {
        let mut groups: Vec<ChannelGroup> = Vec::new();
        for ch in &channels {
            match groups.iter_mut().find(|g| g.name == ch.group) {
                Some(g) => g.channels.push(ch.clone()),
                None => groups.push(ChannelGroup {
                    name: ch.group.clone(),
                    channels: vec![ch.clone()],
                }),
            }
        }

        if !channels.is_empty() {
            groups.push(ChannelGroup {
                name: ALL_CHANNELS_GROUP.to_string(),
                channels: channels.clone(),
            });

            let favs: Vec<Channel> = channels.iter().filter(|c| c.is_favorite).cloned().collect();
            if !favs.is_empty() {
                groups.push(ChannelGroup {
                    name: FAVORITES_GROUP.to_string(),
                    channels: favs,
                });
            }
        }

        let mut flat: Vec<Channel> = Vec::new();
        for ch in channels {
            if !flat.iter().any(|c| c.id == ch.id) {
                flat.push(ch);
            }
        }

        Self { groups, flat }
    }

    pub fn is_empty(&self) -> bool {
        self.flat.is_empty()
    }

    pub fn group(&self, name: &str) -> Option<&ChannelGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn group_names(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.name.as_str()).collect()
    }

    /// Position of a group by name, for focus restoration.
    pub fn group_index(&self, name: &str) -> Option<usize> {
        self.groups.iter().position(|g| g.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch(id: &str, number: u32, group: &str, fav: bool) -> Channel {
        Channel {
            id: id.to_string(),
            number,
            name: format!("ch {number}"),
            group: group.to_string(),
            url: format!("http://example.com/{number}"),
            user_agent: None,
            logo_url: None,
            drm_license: None,
            is_favorite: fav,
        }
    }

    #[test]
    fn groups_keep_first_seen_order() {
        let catalog = Catalog::from_channels(vec![
            ch("p_1", 1, "News", false),
            ch("p_2", 2, "Sports", false),
            ch("p_3", 3, "News", false),
        ]);
        assert_eq!(
            catalog.group_names(),
            vec!["News", "Sports", ALL_CHANNELS_GROUP]
        );
        assert_eq!(catalog.group("News").unwrap().channels.len(), 2);
    }

    #[test]
    fn favorites_group_only_when_present() {
        let without = Catalog::from_channels(vec![ch("p_1", 1, "News", false)]);
        assert!(without.group(FAVORITES_GROUP).is_none());

        let with = Catalog::from_channels(vec![
            ch("p_1", 1, "News", false),
            ch("p_2", 2, "News", true),
        ]);
        let favs = with.group(FAVORITES_GROUP).unwrap();
        assert_eq!(favs.channels.len(), 1);
        assert_eq!(favs.channels[0].id, "p_2");
    }

    #[test]
    fn empty_parse_produces_no_synthetic_groups() {
        let catalog = Catalog::from_channels(Vec::new());
        assert!(catalog.groups.is_empty());
        assert!(catalog.is_empty());
    }

    #[test]
    fn flat_dedups_by_id_keeping_first() {
        let catalog = Catalog::from_channels(vec![
            ch("p_1", 1, "A", false),
            ch("p_1", 2, "B", false),
            ch("p_2", 3, "A", false),
        ]);
        assert_eq!(catalog.flat.len(), 2);
        assert_eq!(catalog.flat[0].number, 1);
        // "All Channels" still carries the duplicate.
        assert_eq!(catalog.group(ALL_CHANNELS_GROUP).unwrap().channels.len(), 3);
    }

    #[test]
    fn placeholder_guide_has_eleven_slots() {
        let programs = placeholder_programs();
        assert_eq!(programs.len(), 11);
        assert_eq!(programs[0].time_label, "8:00");
    }

    #[test]
    fn current_program_falls_inside_the_schedule() {
        let program = current_program().unwrap();
        let hour: u32 = program.time_label.strip_suffix(":00").unwrap().parse().unwrap();
        assert!((8..=18).contains(&hour));
    }
}
