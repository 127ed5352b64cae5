//! App — the controller that owns all mutable state and runs the event loop.
//!
//! Architecture:
//! - `App` owns the `NavModel`, the `CatalogStore`, the resolver, and the
//!   player; a `tokio::mpsc` channel carries `Event`s in from the input shell
//!   and from background tasks.
//! - The state machine returns `Effect`s; `App` executes each one. All
//!   mutation is serialized through `handle_event`, so background work
//!   (playlist loads, stream probes, zap timers) reports back by sending an
//!   event instead of touching state.
//! - Generation counters guard the two racy paths: zap debounce timers and
//!   stream resolution. A result tagged with a superseded generation is
//!   dropped on arrival.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use tivi_core::catalog::CatalogStore;
use tivi_core::config::Config;
use tivi_core::model::{Catalog, Channel, Playlist};
use tivi_core::playlist;
use tivi_core::prefs::Prefs;

use crate::action::{Effect, Event};
use crate::nav::{NavModel, Screen};
use crate::player::Player;
use crate::resolver::{StreamDescriptor, StreamResolver};

pub struct App {
    nav: NavModel,
    store: CatalogStore,
    resolver: Arc<StreamResolver>,
    player: Box<dyn Player>,
    config: Config,
    /// Clone handed to every spawned task so results come back as events.
    event_tx: mpsc::Sender<Event>,
    /// Generation of the most recent play request; stale probe results are
    /// discarded against this.
    resolve_generation: u64,
    /// Published after every handled event so the input shell can follow
    /// screen changes (it owns text editing while Search is up).
    screen_tx: watch::Sender<Screen>,
}

impl App {
    pub fn new(
        config: Config,
        prefs: Prefs,
        player: Box<dyn Player>,
        event_tx: mpsc::Sender<Event>,
    ) -> Self {
        let resolver = Arc::new(StreamResolver::new(&config.resolver));
        Self {
            nav: NavModel::new(),
            store: CatalogStore::new(prefs),
            resolver,
            player,
            config,
            event_tx,
            resolve_generation: 0,
            screen_tx: watch::channel(Screen::PlayerOnly).0,
        }
    }

    pub fn screen_watch(&self) -> watch::Receiver<Screen> {
        self.screen_tx.subscribe()
    }

    pub async fn run(mut self, mut event_rx: mpsc::Receiver<Event>) -> anyhow::Result<()> {
        self.refresh_drawer();

        match self.store.prefs().active_playlist() {
            Some(pl) => self.spawn_catalog_load(pl),
            None => {
                self.notice("No playlists registered; add one from the drawer");
                self.nav.show_drawer();
            }
        }
        self.screen_tx.send_replace(self.nav.screen());

        while let Some(event) = event_rx.recv().await {
            if matches!(event, Event::Quit) {
                break;
            }
            self.handle_event(event);
            self.screen_tx.send_replace(self.nav.screen());
        }

        self.player.release();
        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        let effects = match event {
            Event::Key(key) => self.nav.handle_key(key, self.store.catalog()),
            Event::SearchInput(query) => {
                self.nav.search_input(query, self.store.catalog());
                vec![]
            }
            Event::CategorySelected(index) => {
                self.nav.category_selected(index, self.store.catalog());
                vec![]
            }
            Event::ChannelSelected(channel) => self.nav.channel_selected(channel),
            Event::ZapTimerFired(generation) => {
                self.nav.zap_timer_fired(generation, self.store.catalog())
            }
            Event::CatalogLoaded(catalog) => {
                self.catalog_loaded(catalog);
                vec![]
            }
            Event::CatalogFailed(message) => {
                self.catalog_failed(&message);
                vec![]
            }
            Event::ResolveFinished {
                generation,
                channel,
                descriptor,
            } => {
                self.resolve_finished(generation, &channel, descriptor);
                vec![]
            }
            Event::Quit => vec![],
        };

        for effect in effects {
            self.execute(effect);
        }
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::Play(channel) => self.play_selection(channel),
            Effect::StartZapTimer { generation } => {
                let tx = self.event_tx.clone();
                let debounce = Duration::from_millis(self.config.zap.debounce_ms);
                tokio::spawn(async move {
                    tokio::time::sleep(debounce).await;
                    let _ = tx.send(Event::ZapTimerFired(generation)).await;
                });
            }
            Effect::Notice(message) => self.notice(&message),
            Effect::SwitchPlaylist(id) => self.switch_playlist(&id),
            Effect::ToggleFavorite(channel_id) => {
                self.store.toggle_favorite(&channel_id);
            }
        }
    }

    /// Start playing a channel: record it as recent, then probe the stream in
    /// the background under a fresh generation.
    fn play_selection(&mut self, channel: Channel) {
        self.store.add_recent(&channel);
        self.resolve_generation += 1;
        let generation = self.resolve_generation;

        let resolver = Arc::clone(&self.resolver);
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let descriptor = resolver.resolve(&channel).await;
            let _ = tx
                .send(Event::ResolveFinished {
                    generation,
                    channel,
                    descriptor,
                })
                .await;
        });
    }

    /// A probe finished. Hand the descriptor to the player unless the user
    /// has zapped away since the probe started.
    fn resolve_finished(&mut self, generation: u64, channel: &Channel, descriptor: StreamDescriptor) {
        if generation != self.resolve_generation {
            debug!(
                channel = %channel.name,
                generation,
                current = self.resolve_generation,
                "discarding stale stream resolution"
            );
            return;
        }

        info!(channel = %channel.name, url = %descriptor.url, "tuning");
        self.player.set_source(&descriptor);
        let started = self.player.prepare().and_then(|_| self.player.play());
        match started {
            Ok(()) => {
                if let Some(program) = tivi_core::model::current_program() {
                    self.notice(&format!(
                        "{} {} ({} {})",
                        channel.number, channel.name, program.time_label, program.title
                    ));
                }
            }
            // playback failure never unwinds navigation
            Err(e) => self.notice(&format!("Playback failed for {}: {e}", channel.name)),
        }
    }

    fn catalog_loaded(&mut self, catalog: Catalog) {
        if catalog.is_empty() {
            self.notice("Playlist loaded but contains no channels");
        }
        self.store.load(catalog);
        self.nav.catalog_reloaded();
        self.refresh_drawer();

        // Resume the last-played channel once, on the first successful load.
        if self.nav.current_channel().is_none() {
            if let Some(id) = self.store.prefs().last_played() {
                if let Some(ch) = self.store.flat().iter().find(|c| c.id == id).cloned() {
                    let effects = self.nav.channel_selected(ch);
                    for effect in effects {
                        self.execute(effect);
                    }
                }
            }
        }
    }

    /// A playlist load failed. The error is user-visible, and with nothing
    /// loaded the drawer is the only useful place to be.
    fn catalog_failed(&mut self, message: &str) {
        warn!("playlist load failed: {message}");
        self.notice(&format!("Playlist load failed: {message}"));
        if self.store.catalog().is_empty() {
            self.nav.show_drawer();
        }
    }

    fn switch_playlist(&mut self, id: &str) {
        self.store.prefs().set_active_playlist(id);
        match self.store.prefs().active_playlist() {
            Some(pl) => self.spawn_catalog_load(pl),
            None => self.notice("Selected playlist no longer exists"),
        }
    }

    fn spawn_catalog_load(&self, playlist: Playlist) {
        info!(name = %playlist.name, source = %playlist.source, "loading playlist");
        let favorites = self.store.prefs().favorite_ids();
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let event = match playlist::load(&playlist, &favorites).await {
                Ok(catalog) => Event::CatalogLoaded(catalog),
                Err(e) => Event::CatalogFailed(e.to_string()),
            };
            let _ = tx.send(event).await;
        });
    }

    fn refresh_drawer(&mut self) {
        let playlists: Vec<(String, String)> = self
            .store
            .prefs()
            .playlists()
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();
        self.nav.set_drawer_playlists(&playlists);
    }

    /// Transient user-visible message. The bundled shell is line-oriented, so
    /// a notice is a printed line; it also lands in the log. The terminal is
    /// in raw mode, hence the explicit carriage return.
    fn notice(&self, message: &str) {
        use std::io::Write;
        info!("{message}");
        print!("* {message}\r\n");
        let _ = std::io::stdout().flush();
    }
}
