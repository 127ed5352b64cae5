//! Abstract input symbols and the event/effect enums that decouple the
//! navigation state machine from whatever delivers input or renders lists.

use tivi_core::model::{Catalog, Channel};

use crate::resolver::StreamDescriptor;

/// Remote-control key symbols as delivered by the shell. The physical event
/// source (crossterm in the bundled binary, a TV input stack elsewhere) maps
/// its own codes onto these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Digit(u8),
    Up,
    Down,
    Left,
    Right,
    Confirm,
    Back,
    Menu,
    ChannelUp,
    ChannelDown,
    Search,
    Favorite,
}

/// One entry in the settings drawer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawerEntry {
    OpenSearch,
    /// Switch the active playlist and reload.
    SelectPlaylist { id: String, name: String },
}

/// Everything that flows through the controller's single event channel.
/// All state mutation is serialized through handling these.
#[derive(Debug)]
pub enum Event {
    Key(Key),
    /// The search text changed (the shell owns text editing).
    SearchInput(String),
    /// A category row was activated by pointer/click.
    CategorySelected(usize),
    /// A channel row was activated by pointer/click.
    ChannelSelected(Channel),
    /// A zap debounce timer expired. Stale generations are discarded.
    ZapTimerFired(u64),
    /// Background playlist load finished.
    CatalogLoaded(Catalog),
    /// Background playlist load failed; the message is user-visible.
    CatalogFailed(String),
    /// A stream probe finished. Stale generations are discarded.
    ResolveFinished {
        generation: u64,
        channel: Channel,
        descriptor: StreamDescriptor,
    },
    Quit,
}

/// What the state machine asks the controller to do. The machine itself
/// performs no I/O.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Run play-selection for this channel.
    Play(Channel),
    /// Replace any pending zap debounce timer with one for this generation.
    StartZapTimer { generation: u64 },
    /// Show a transient user-visible notice.
    Notice(String),
    /// Reload the catalog from this playlist id.
    SwitchPlaylist(String),
    /// Flip this channel id's favourite state in the catalog store.
    ToggleFavorite(String),
}
