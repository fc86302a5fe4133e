//! Focus timer core: a Pomodoro countdown, a persisted daily streak and a
//! controller that keeps an embedded ambient-video player in sync.
//!
//! Presentation is left to the host. It feeds user actions and player status
//! messages in, and listens to [`events::AppEvent`]s coming out.

pub mod audio;
pub mod catalog;
mod commands;
pub mod events;
pub mod media;
pub mod scope;
pub mod settings;
pub mod storage;
pub mod streak;
pub mod timer;
pub mod todo;
mod utils;

use std::sync::Arc;

use anyhow::{Context, Result};
use commands::{dispatch, Command, HELP};
use events::EventBus;
use log::{info, warn};
use media::{ChannelTransport, MediaSyncConfig, MediaSyncController, PlayerTransport};
use settings::{AppConfig, SettingsStore, SETTINGS_FILE};
use storage::{FileStore, KeyValueStore, MemoryStore};
use streak::StreakTracker;
use timer::TimerController;
use todo::TodoList;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
};

/// State shared by everything the composing view talks to.
pub(crate) struct AppState {
    pub(crate) timer: TimerController,
    pub(crate) streak: Arc<StreakTracker>,
    pub(crate) media: MediaSyncController,
    pub(crate) todos: TodoList,
    pub(crate) settings: SettingsStore,
    pub(crate) events: EventBus,
}

impl AppState {
    pub(crate) async fn bootstrap(config: &AppConfig, transport: Arc<dyn PlayerTransport>) -> Self {
        let store: Arc<dyn KeyValueStore> = match FileStore::new(&config.data_dir) {
            Ok(store) => Arc::new(store),
            Err(err) => {
                warn!("persistent storage unavailable, keeping state in memory: {err:#}");
                Arc::new(MemoryStore::new())
            }
        };
        Self::with_store(config, transport, store).await
    }

    pub(crate) async fn with_store(
        config: &AppConfig,
        transport: Arc<dyn PlayerTransport>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let settings = SettingsStore::new(config.data_dir.join(SETTINGS_FILE));
        let user = settings.get();
        let events = EventBus::new();

        let streak = Arc::new(StreakTracker::load(store.clone(), user.streak_day.today()));
        let timer = TimerController::new(
            user.timer_config(),
            events.clone(),
            streak.clone(),
            audio::alert_for(user.alert_enabled),
            user.streak_day,
            config.debug,
        );
        let media = MediaSyncController::new(
            transport,
            events.clone(),
            MediaSyncConfig::default(),
            user.volume,
        );
        let todos = TodoList::load(store);

        let state = Self {
            timer,
            streak,
            media,
            todos,
            settings,
            events,
        };
        state.select_video(&user.video_id).await;
        state.set_theme(&user.theme_id);
        state
    }

    pub(crate) async fn set_durations(
        &self,
        work_minutes: u32,
        break_minutes: u32,
    ) -> Result<timer::TimerSnapshot> {
        let user = self.settings.update(|s| {
            s.work_minutes = work_minutes;
            s.break_minutes = break_minutes;
        })?;
        Ok(self.timer.reconfigure(user.timer_config()).await)
    }

    pub(crate) async fn set_volume(&self, level: u8) {
        self.media.set_volume(level).await;
        let level = level.min(100);
        if let Err(err) = self.settings.update(|s| s.volume = level) {
            warn!("failed to save volume: {err:#}");
        }
    }

    pub(crate) async fn select_video(&self, id: &str) -> &'static catalog::VideoEntry {
        let video = catalog::resolve_video(id);
        self.media.select_video(video.id).await;
        if let Err(err) = self.settings.update(|s| s.video_id = video.id.to_string()) {
            warn!("failed to save video selection: {err:#}");
        }
        video
    }

    pub(crate) fn set_theme(&self, id: &str) -> &'static catalog::ThemeEntry {
        let theme = catalog::resolve_theme(id);
        if let Err(err) = self.settings.update(|s| s.theme_id = theme.id.to_string()) {
            warn!("failed to save theme: {err:#}");
        }
        self.events.emit(events::AppEvent::ThemeResolved {
            theme_id: theme.id.to_string(),
        });
        theme
    }

    pub(crate) async fn shutdown(&self) {
        if let Err(err) = self.timer.pause().await {
            log::debug!("timer already idle at shutdown: {err}");
        }
        self.media.shutdown().await;
    }
}

/// Runs the headless host: commands on stdin, events as JSON lines on stdout.
pub fn run() -> Result<()> {
    let config = AppConfig::from_env();

    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::new()
        .filter_level(if config.debug {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .parse_default_env()
        .init();

    info!("ambifocus starting up (data dir {})", config.data_dir.display());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build async runtime")?;
    runtime.block_on(serve(config))
}

async fn serve(config: AppConfig) -> Result<()> {
    let (transport, mut player_rx) = ChannelTransport::new();
    let state = AppState::bootstrap(&config, Arc::new(transport)).await;

    let mut events_rx = state.events.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events_rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(line) => println!("{line}"),
                    Err(err) => warn!("failed to encode {}: {err}", event.name()),
                },
                Err(RecvError::Lagged(skipped)) => warn!("event printer skipped {skipped} events"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Stand-in for the embedded player: outbound control messages are only logged.
    let player = tokio::spawn(async move {
        while let Some(message) = player_rx.recv().await {
            log::debug!("player <- {message}");
        }
    });

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        match line.parse::<Command>() {
            Ok(Command::Quit) => break,
            Ok(command) => match dispatch(&state, command).await {
                Ok(reply) => println!("{reply}"),
                Err(err) => eprintln!("error: {err}"),
            },
            Err(err) => eprintln!("error: {err:#}"),
        }
    }

    state.shutdown().await;
    printer.abort();
    player.abort();
    info!("ambifocus shut down");
    Ok(())
}
