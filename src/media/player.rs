//! Control channel of the embedded video player.
//!
//! Outbound commands are one-way text messages in the iframe-API shape
//! `{"event":"command","func":...,"args":[...]}`; inbound messages are
//! `{"event":"onReady"}`, `{"event":"onStateChange","info":<code>}` and
//! `{"event":"onAutoplayBlocked"}`.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum PlayerStatus {
    #[default]
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
}

impl PlayerStatus {
    /// Maps a player state code. Codes outside the known set (such as "cued")
    /// are treated as not started.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => PlayerStatus::Ended,
            1 => PlayerStatus::Playing,
            2 => PlayerStatus::Paused,
            3 => PlayerStatus::Buffering,
            _ => PlayerStatus::Unstarted,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            PlayerStatus::Unstarted => -1,
            PlayerStatus::Ended => 0,
            PlayerStatus::Playing => 1,
            PlayerStatus::Paused => 2,
            PlayerStatus::Buffering => 3,
        }
    }

    pub fn is_stalled(self) -> bool {
        matches!(self, PlayerStatus::Buffering | PlayerStatus::Unstarted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerCommand {
    /// Start a fresh player instance on `video_id`.
    Load { video_id: String, instance: String },
    Play,
    Pause,
    Mute,
    Unmute,
    SetVolume(u8),
}

impl PlayerCommand {
    pub fn func(&self) -> &'static str {
        match self {
            PlayerCommand::Load { .. } => "loadVideoById",
            PlayerCommand::Play => "playVideo",
            PlayerCommand::Pause => "pauseVideo",
            PlayerCommand::Mute => "mute",
            PlayerCommand::Unmute => "unMute",
            PlayerCommand::SetVolume(_) => "setVolume",
        }
    }

    pub fn to_message(&self) -> String {
        let args = match self {
            PlayerCommand::Load { video_id, instance } => {
                json!([{ "videoId": video_id, "instance": instance }])
            }
            PlayerCommand::SetVolume(level) => json!([level]),
            _ => json!([]),
        };
        json!({ "event": "command", "func": self.func(), "args": args }).to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    Ready,
    StateChange(PlayerStatus),
    /// The host refused to autoplay with sound.
    AutoplayBlocked,
}

impl PlayerEvent {
    pub fn from_message(raw: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(raw).with_context(|| format!("player message is not JSON: {raw}"))?;
        let event = value
            .get("event")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("player message has no event field: {raw}"))?;
        match event {
            "onReady" => Ok(PlayerEvent::Ready),
            "onAutoplayBlocked" => Ok(PlayerEvent::AutoplayBlocked),
            "onStateChange" => {
                let code = value
                    .get("info")
                    .and_then(Value::as_i64)
                    .ok_or_else(|| anyhow!("onStateChange without numeric info: {raw}"))?;
                Ok(PlayerEvent::StateChange(PlayerStatus::from_code(code)))
            }
            other => Err(anyhow!("unknown player event '{other}'")),
        }
    }
}

/// One-way delivery of commands to the player. Delivery is never confirmed.
pub trait PlayerTransport: Send + Sync {
    fn send(&self, command: &PlayerCommand) -> Result<()>;
}

/// Encodes commands and hands the text to whoever hosts the player.
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl PlayerTransport for ChannelTransport {
    fn send(&self, command: &PlayerCommand) -> Result<()> {
        self.tx
            .send(command.to_message())
            .map_err(|_| anyhow!("player channel closed"))
    }
}

/// Keeps every command it is given.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingTransport {
    sent: std::sync::Mutex<Vec<PlayerCommand>>,
}

#[cfg(test)]
impl RecordingTransport {
    pub(crate) fn sent(&self) -> Vec<PlayerCommand> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub(crate) fn clear(&self) {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[cfg(test)]
impl PlayerTransport for RecordingTransport {
    fn send(&self, command: &PlayerCommand) -> Result<()> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(command.clone());
        Ok(())
    }
}
