use serde::Serialize;
use tokio::sync::broadcast;

use crate::timer::{TimerMode, TimerSnapshot};

const EVENT_CAPACITY: usize = 256;

/// Everything the core tells the presentation layer about.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case", tag = "event", content = "payload")]
pub enum AppEvent {
    TimerStateChanged(TimerSnapshot),
    /// Raised on every start so the view can switch to its focus presentation.
    TimerStarted(TimerSnapshot),
    TimerHeartbeat(TimerSnapshot),
    #[serde(rename_all = "camelCase")]
    SessionCompleted {
        completed_mode: TimerMode,
        next_mode: TimerMode,
        skipped: bool,
        /// Post-increment streak when a work session counted toward it.
        streak: Option<u32>,
    },
    #[serde(rename_all = "camelCase")]
    StreakUpdated { count: u32, total_sessions: u64 },
    #[serde(rename_all = "camelCase")]
    PosterShown { video_id: String, poster_url: String },
    #[serde(rename_all = "camelCase")]
    PosterHidden { video_id: String },
    #[serde(rename_all = "camelCase")]
    PlayerReloaded { video_id: String, attempt: u32 },
    #[serde(rename_all = "camelCase")]
    AudioUnlockRequired { video_id: String },
    VolumeChanged { level: u8 },
    #[serde(rename_all = "camelCase")]
    VideoSelected { video_id: String },
    #[serde(rename_all = "camelCase")]
    ThemeResolved { theme_id: String },
}

impl AppEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AppEvent::TimerStateChanged(_) => "timer-state-changed",
            AppEvent::TimerStarted(_) => "timer-started",
            AppEvent::TimerHeartbeat(_) => "timer-heartbeat",
            AppEvent::SessionCompleted { .. } => "session-completed",
            AppEvent::StreakUpdated { .. } => "streak-updated",
            AppEvent::PosterShown { .. } => "poster-shown",
            AppEvent::PosterHidden { .. } => "poster-hidden",
            AppEvent::PlayerReloaded { .. } => "player-reloaded",
            AppEvent::AudioUnlockRequired { .. } => "audio-unlock-required",
            AppEvent::VolumeChanged { .. } => "volume-changed",
            AppEvent::VideoSelected { .. } => "video-selected",
            AppEvent::ThemeResolved { .. } => "theme-resolved",
        }
    }
}

/// Fan-out of [`AppEvent`]s to any number of subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AppEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }

    /// Publishing with no subscribers is not an error.
    pub fn emit(&self, event: AppEvent) {
        log::debug!("emit {}", event.name());
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
pub(crate) fn drain(rx: &mut broadcast::Receiver<AppEvent>) -> Vec<AppEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
