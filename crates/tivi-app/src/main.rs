use crossterm::event::{self, Event as TermEvent, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tokio::sync::{mpsc, watch};

use tivi_core::model::{Playlist, PlaylistKind};
use tivi_core::prefs::Prefs;

use tivi_app::action::{Event, Key};
use tivi_app::app::App;
use tivi_app::nav::Screen;
use tivi_app::player::LogPlayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = tivi_core::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let log_path = data_dir.join("tivi.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; default to debug for app code but suppress
    // connection-level DEBUG from HTTP client internals.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    // Print log path to stderr so the operator can tail it immediately.
    eprintln!("tivi log: {}", log_path.display());

    tracing::info!("tivi starting…");

    let config = tivi_core::config::Config::load().unwrap_or_default();
    let prefs = Prefs::open_default();

    // A playlist source on the command line is registered (and made active)
    // before the app starts: `tivi <url-or-path> [name]`.
    let mut args = std::env::args().skip(1);
    if let Some(source) = args.next() {
        let name = args.next().unwrap_or_else(|| source.clone());
        let kind = if source.starts_with("http://") || source.starts_with("https://") {
            PlaylistKind::Remote
        } else {
            PlaylistKind::Local
        };
        let playlist = Playlist::new(name, source, kind);
        let id = playlist.id.clone();
        prefs.add_playlist(playlist);
        prefs.set_active_playlist(&id);
    }

    let (event_tx, event_rx) = mpsc::channel::<Event>(64);

    let app = App::new(config, prefs, Box::new(LogPlayer::default()), event_tx.clone());
    let screen_rx = app.screen_watch();

    enable_raw_mode()?;
    spawn_input_reader(event_tx, screen_rx);

    let result = app.run(event_rx).await;
    disable_raw_mode()?;
    result
}

/// Blocking crossterm read loop on a dedicated thread, forwarding mapped key
/// symbols into the event channel. While the Search screen is up the shell
/// owns text editing and sends the whole query on every change.
fn spawn_input_reader(event_tx: mpsc::Sender<Event>, screen_rx: watch::Receiver<Screen>) {
    tokio::task::spawn_blocking(move || {
        let mut query = String::new();
        let mut was_search = false;
        loop {
            let Ok(term_event) = event::read() else {
                let _ = event_tx.blocking_send(Event::Quit);
                return;
            };
            let TermEvent::Key(key) = term_event else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }

            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                let _ = event_tx.blocking_send(Event::Quit);
                return;
            }

            let in_search = *screen_rx.borrow() == Screen::Search;
            if in_search && !was_search {
                query.clear();
            }
            was_search = in_search;

            let event = if in_search {
                match key.code {
                    KeyCode::Char(c) => {
                        query.push(c);
                        Some(Event::SearchInput(query.clone()))
                    }
                    KeyCode::Backspace => {
                        query.pop();
                        Some(Event::SearchInput(query.clone()))
                    }
                    KeyCode::Esc => Some(Event::Key(Key::Back)),
                    KeyCode::Enter => Some(Event::Key(Key::Confirm)),
                    KeyCode::Up => Some(Event::Key(Key::Up)),
                    KeyCode::Down => Some(Event::Key(Key::Down)),
                    _ => None,
                }
            } else {
                map_key(key.code)
            };

            if let Some(event) = event {
                let quitting = matches!(event, Event::Quit);
                if event_tx.blocking_send(event).is_err() || quitting {
                    return;
                }
            }
        }
    });
}

fn map_key(code: KeyCode) -> Option<Event> {
    let key = match code {
        KeyCode::Char(c @ '0'..='9') => Key::Digit(c as u8 - b'0'),
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Enter => Key::Confirm,
        KeyCode::Esc | KeyCode::Backspace => Key::Back,
        KeyCode::Char('m') => Key::Menu,
        KeyCode::PageUp => Key::ChannelUp,
        KeyCode::PageDown => Key::ChannelDown,
        KeyCode::Char('/') | KeyCode::Char('s') => Key::Search,
        KeyCode::Char('f') => Key::Favorite,
        KeyCode::Char('q') => return Some(Event::Quit),
        _ => return None,
    };
    Some(Event::Key(key))
}
