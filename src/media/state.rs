use serde::Serialize;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use super::player::PlayerStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaSyncConfig {
    /// Floor for how long the poster stays up after a load request.
    pub load_grace: Duration,
    /// How long the player may sit in Buffering/Unstarted before a reload.
    pub stall_timeout: Duration,
    /// Period of the play/volume re-assertion loop.
    pub command_interval: Duration,
}

impl Default for MediaSyncConfig {
    fn default() -> Self {
        Self {
            load_grace: Duration::from_secs(2),
            stall_timeout: Duration::from_secs(3),
            command_interval: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Default)]
pub struct MediaPlaybackState {
    pub video_id: String,
    /// Identifies the current player instance; replaced on every load.
    pub instance: String,
    pub volume: u8,
    pub loaded: bool,
    pub status: PlayerStatus,
    pub desired_playing: bool,
    pub audio_blocked: bool,
    pub mounted: bool,
    pub reloads: u32,
    pub stall_timer: Option<CancellationToken>,
}

impl MediaPlaybackState {
    pub fn new(volume: u8) -> Self {
        Self {
            volume: volume.min(100),
            desired_playing: true,
            ..Self::default()
        }
    }

    pub fn clear_stall_timer(&mut self) {
        if let Some(token) = self.stall_timer.take() {
            token.cancel();
        }
    }

    pub fn snapshot(&self) -> MediaSnapshot {
        MediaSnapshot {
            video_id: self.video_id.clone(),
            volume: self.volume,
            muted: self.volume == 0,
            loaded: self.loaded,
            status: self.status,
            audio_blocked: self.audio_blocked,
            reloads: self.reloads,
            stall_pending: self.stall_timer.is_some(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MediaSnapshot {
    pub video_id: String,
    pub volume: u8,
    pub muted: bool,
    pub loaded: bool,
    pub status: PlayerStatus,
    pub audio_blocked: bool,
    pub reloads: u32,
    pub stall_pending: bool,
}
