//! The remote-control navigation state machine.
//!
//! `NavModel` is pure state: it consumes key symbols and selection events,
//! and returns `Effect`s for the controller to execute. Exactly one screen
//! is active at a time; Search and Drawer are modal, remember where they
//! were opened from, and close each other.

use tivi_core::model::{Catalog, Channel, ALL_CHANNELS_GROUP};

use crate::action::{DrawerEntry, Effect, Key};

/// Which surface currently owns input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Video only; the default once something has played.
    PlayerOnly,
    /// Category + channel lists over the video.
    Overlay,
    /// Text filter + results list.
    Search,
    /// Settings drawer.
    Drawer,
}

/// Which of the two overlay lists has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayFocus {
    Categories,
    Channels,
}

/// Accumulated zap digits plus the generation counter that keys the debounce
/// timer. Each new digit bumps the generation, so a timer that fires for an
/// older generation is stale and ignored.
#[derive(Debug, Default)]
pub struct NumberBuffer {
    digits: String,
    generation: u64,
}

impl NumberBuffer {
    /// Append a digit and return the new generation.
    pub fn push(&mut self, digit: u8) -> u64 {
        self.digits.push(char::from(b'0' + digit.min(9)));
        self.generation += 1;
        self.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn digits(&self) -> &str {
        &self.digits
    }

    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }

    /// Drain the buffer, returning the accumulated digits.
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.digits)
    }

    pub fn clear(&mut self) {
        self.digits.clear();
    }
}

pub struct NavModel {
    screen: Screen,
    /// Where a modal (Search/Drawer) returns to on Back.
    return_screen: Screen,
    focus: OverlayFocus,
    selected_group: usize,
    /// Selected row within the current group's channel list.
    selected_channel: usize,
    drawer_entries: Vec<DrawerEntry>,
    drawer_index: usize,
    search_query: String,
    search_results: Vec<Channel>,
    search_index: usize,
    current_channel: Option<Channel>,
    has_played: bool,
    zap: NumberBuffer,
}

impl NavModel {
    pub fn new() -> Self {
        Self {
            screen: Screen::PlayerOnly,
            return_screen: Screen::PlayerOnly,
            focus: OverlayFocus::Categories,
            selected_group: 0,
            selected_channel: 0,
            drawer_entries: vec![DrawerEntry::OpenSearch],
            drawer_index: 0,
            search_query: String::new(),
            search_results: Vec::new(),
            search_index: 0,
            current_channel: None,
            has_played: false,
            zap: NumberBuffer::default(),
        }
    }

    // ── Accessors for the rendering shell ─────────────────────────────────────

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn focus(&self) -> OverlayFocus {
        self.focus
    }

    pub fn selected_group(&self) -> usize {
        self.selected_group
    }

    pub fn selected_channel(&self) -> usize {
        self.selected_channel
    }

    pub fn current_channel(&self) -> Option<&Channel> {
        self.current_channel.as_ref()
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn search_results(&self) -> &[Channel] {
        &self.search_results
    }

    pub fn zap_digits(&self) -> &str {
        self.zap.digits()
    }

    pub fn drawer_entries(&self) -> &[DrawerEntry] {
        &self.drawer_entries
    }

    /// Rebuild the drawer surface: search entry first, then one entry per
    /// registered playlist.
    pub fn set_drawer_playlists(&mut self, playlists: &[(String, String)]) {
        self.drawer_entries = std::iter::once(DrawerEntry::OpenSearch)
            .chain(playlists.iter().map(|(id, name)| DrawerEntry::SelectPlaylist {
                id: id.clone(),
                name: name.clone(),
            }))
            .collect();
        self.drawer_index = 0;
    }

    /// Called after the catalog is replaced: selections reset, the remembered
    /// current channel survives so overlay re-entry can re-sync against the
    /// new catalog.
    pub fn catalog_reloaded(&mut self) {
        self.selected_group = 0;
        self.selected_channel = 0;
        self.search_results.clear();
        self.search_index = 0;
    }

    // ── Key handling ──────────────────────────────────────────────────────────

    pub fn handle_key(&mut self, key: Key, catalog: &Catalog) -> Vec<Effect> {
        // Digits feed the zap buffer from any non-modal state.
        if let Key::Digit(d) = key {
            if matches!(self.screen, Screen::PlayerOnly | Screen::Overlay) {
                let generation = self.zap.push(d);
                return vec![Effect::StartZapTimer { generation }];
            }
        }

        match self.screen {
            Screen::PlayerOnly => self.handle_player_key(key, catalog),
            Screen::Overlay => self.handle_overlay_key(key, catalog),
            Screen::Search => self.handle_search_key(key),
            Screen::Drawer => self.handle_drawer_key(key),
        }
    }

    fn handle_player_key(&mut self, key: Key, catalog: &Catalog) -> Vec<Effect> {
        match key {
            Key::Confirm | Key::Menu => {
                self.open_overlay(catalog);
                vec![]
            }
            Key::Right => {
                self.open_drawer();
                vec![]
            }
            Key::Search => {
                self.open_search();
                vec![]
            }
            Key::ChannelUp => self.step_channel(1, catalog),
            Key::ChannelDown => self.step_channel(-1, catalog),
            _ => vec![],
        }
    }

    fn handle_overlay_key(&mut self, key: Key, catalog: &Catalog) -> Vec<Effect> {
        match key {
            Key::Back => {
                // Leaving the overlay only makes sense once something plays;
                // before that there is nothing underneath it.
                if self.has_played {
                    self.screen = Screen::PlayerOnly;
                }
                vec![]
            }
            Key::Right if self.focus == OverlayFocus::Categories => {
                self.focus = OverlayFocus::Channels;
                vec![]
            }
            Key::Left if self.focus == OverlayFocus::Channels => {
                self.focus = OverlayFocus::Categories;
                vec![]
            }
            Key::Up => {
                self.move_overlay_selection(-1, catalog);
                vec![]
            }
            Key::Down => {
                self.move_overlay_selection(1, catalog);
                vec![]
            }
            Key::Confirm => {
                if self.focus == OverlayFocus::Channels {
                    if let Some(ch) = self.selected_channel_entry(catalog).cloned() {
                        return self.play_selection(ch);
                    }
                }
                vec![]
            }
            Key::Search => {
                self.open_search();
                vec![]
            }
            Key::Favorite => {
                if self.focus == OverlayFocus::Channels {
                    if let Some(ch) = self.selected_channel_entry(catalog) {
                        return vec![Effect::ToggleFavorite(ch.id.clone())];
                    }
                }
                vec![]
            }
            _ => vec![],
        }
    }

    fn handle_search_key(&mut self, key: Key) -> Vec<Effect> {
        match key {
            Key::Back => {
                self.close_search();
                vec![]
            }
            Key::Up => {
                self.search_index = self.search_index.saturating_sub(1);
                vec![]
            }
            Key::Down => {
                if self.search_index + 1 < self.search_results.len() {
                    self.search_index += 1;
                }
                vec![]
            }
            Key::Confirm => {
                if let Some(ch) = self.search_results.get(self.search_index).cloned() {
                    self.close_search();
                    return self.play_selection(ch);
                }
                vec![]
            }
            _ => vec![],
        }
    }

    fn handle_drawer_key(&mut self, key: Key) -> Vec<Effect> {
        match key {
            Key::Back => {
                self.screen = self.return_screen;
                vec![]
            }
            Key::Up => {
                self.drawer_index = self.drawer_index.saturating_sub(1);
                vec![]
            }
            Key::Down => {
                if self.drawer_index + 1 < self.drawer_entries.len() {
                    self.drawer_index += 1;
                }
                vec![]
            }
            Key::Confirm => match self.drawer_entries.get(self.drawer_index).cloned() {
                Some(DrawerEntry::OpenSearch) => {
                    self.open_search();
                    vec![]
                }
                Some(DrawerEntry::SelectPlaylist { id, .. }) => {
                    self.screen = self.return_screen;
                    vec![Effect::SwitchPlaylist(id)]
                }
                None => vec![],
            },
            _ => vec![],
        }
    }

    // ── Selection events (pointer path) ───────────────────────────────────────

    /// A category row was activated: retarget the channel list, reset its
    /// scroll, keep the screen as-is.
    pub fn category_selected(&mut self, index: usize, catalog: &Catalog) {
        if index < catalog.groups.len() {
            self.selected_group = index;
            self.selected_channel = 0;
        }
    }

    /// A channel row was activated: play it.
    pub fn channel_selected(&mut self, channel: Channel) -> Vec<Effect> {
        self.play_selection(channel)
    }

    /// The search query changed: recompute the case-insensitive name filter.
    pub fn search_input(&mut self, query: String, catalog: &Catalog) {
        let needle = query.to_lowercase();
        self.search_results = if needle.is_empty() {
            Vec::new()
        } else {
            catalog
                .flat
                .iter()
                .filter(|c| c.name.to_lowercase().contains(&needle))
                .cloned()
                .collect()
        };
        self.search_query = query;
        self.search_index = 0;
    }

    /// The zap debounce expired. Only the newest generation commits; the
    /// buffer clears whether or not the lookup matches.
    pub fn zap_timer_fired(&mut self, generation: u64, catalog: &Catalog) -> Vec<Effect> {
        if generation != self.zap.generation() || self.zap.is_empty() {
            return vec![];
        }
        let digits = self.zap.take();
        let found = digits
            .parse::<u32>()
            .ok()
            .and_then(|n| catalog.flat.iter().find(|c| c.number == n).cloned());
        match found {
            Some(ch) => self.play_selection(ch),
            None => vec![Effect::Notice(format!("Channel {digits} not found"))],
        }
    }

    // ── Transitions ───────────────────────────────────────────────────────────

    /// Open the overlay, re-syncing focus to the remembered current channel.
    /// Prefers the synthetic "All Channels" group; falls back to the owning
    /// group, and to the category list when the channel is gone.
    fn open_overlay(&mut self, catalog: &Catalog) {
        self.screen = Screen::Overlay;
        self.focus = OverlayFocus::Categories;

        let Some(current) = self.current_channel.clone() else {
            return;
        };

        let target = catalog
            .group_index(ALL_CHANNELS_GROUP)
            .and_then(|gi| {
                catalog.groups[gi]
                    .channels
                    .iter()
                    .position(|c| c.id == current.id)
                    .map(|ci| (gi, ci))
            })
            .or_else(|| {
                catalog.group_index(&current.group).and_then(|gi| {
                    catalog.groups[gi]
                        .channels
                        .iter()
                        .position(|c| c.id == current.id)
                        .map(|ci| (gi, ci))
                })
            });

        if let Some((group, row)) = target {
            self.selected_group = group;
            self.selected_channel = row;
            self.focus = OverlayFocus::Channels;
        }
    }

    /// Route the user to the drawer, e.g. when the active playlist failed to
    /// load and picking another one is the only way forward.
    pub fn show_drawer(&mut self) {
        self.open_drawer();
    }

    fn open_drawer(&mut self) {
        self.return_screen = match self.screen {
            Screen::Search | Screen::Drawer => self.return_screen,
            other => other,
        };
        self.screen = Screen::Drawer;
        self.drawer_index = 0;
    }

    fn open_search(&mut self) {
        self.return_screen = match self.screen {
            Screen::Search | Screen::Drawer => self.return_screen,
            other => other,
        };
        self.screen = Screen::Search;
        self.search_query.clear();
        self.search_results.clear();
        self.search_index = 0;
    }

    fn close_search(&mut self) {
        self.search_query.clear();
        self.search_results.clear();
        self.search_index = 0;
        self.screen = self.return_screen;
    }

    fn move_overlay_selection(&mut self, delta: i64, catalog: &Catalog) {
        match self.focus {
            OverlayFocus::Categories => {
                let len = catalog.groups.len();
                if len == 0 {
                    return;
                }
                let next = clamp_step(self.selected_group, delta, len);
                if next != self.selected_group {
                    // moving the category focus retargets the channel list
                    self.selected_group = next;
                    self.selected_channel = 0;
                }
            }
            OverlayFocus::Channels => {
                let len = catalog
                    .groups
                    .get(self.selected_group)
                    .map(|g| g.channels.len())
                    .unwrap_or(0);
                if len == 0 {
                    return;
                }
                self.selected_channel = clamp_step(self.selected_channel, delta, len);
            }
        }
    }

    fn selected_channel_entry<'a>(&self, catalog: &'a Catalog) -> Option<&'a Channel> {
        catalog
            .groups
            .get(self.selected_group)?
            .channels
            .get(self.selected_channel)
    }

    /// Step the current channel through the flattened catalog. No wraparound.
    fn step_channel(&mut self, delta: i64, catalog: &Catalog) -> Vec<Effect> {
        let Some(current) = &self.current_channel else {
            return vec![];
        };
        let Some(idx) = catalog.flat.iter().position(|c| c.id == current.id) else {
            return vec![];
        };
        let next = idx as i64 + delta;
        if next < 0 || next as usize >= catalog.flat.len() {
            return vec![];
        }
        let ch = catalog.flat[next as usize].clone();
        self.play_selection(ch)
    }

    /// Shared play path: remember the channel, land on PlayerOnly, and ask
    /// the controller to run resolution + handoff.
    fn play_selection(&mut self, channel: Channel) -> Vec<Effect> {
        self.current_channel = Some(channel.clone());
        self.has_played = true;
        self.screen = Screen::PlayerOnly;
        vec![Effect::Play(channel)]
    }
}

impl Default for NavModel {
    fn default() -> Self {
        Self::new()
    }
}

fn clamp_step(index: usize, delta: i64, len: usize) -> usize {
    let next = index as i64 + delta;
    next.clamp(0, len as i64 - 1) as usize
}
