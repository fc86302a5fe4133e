//! Built-in ambient videos and colour themes.
//!
//! Lookups never fail: an unknown id resolves to [`DEFAULT_VIDEO_ID`] or
//! [`DEFAULT_THEME_ID`].

use rand::seq::SliceRandom;
use serde::Serialize;

const ENABLE_LOGS: bool = true;

use crate::log_warn;

pub const DEFAULT_VIDEO_ID: &str = "jfKfPfyJRdk";
pub const DEFAULT_THEME_ID: &str = "midnight";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VideoEntry {
    pub id: &'static str,
    pub title: &'static str,
    /// Theme that suits the scene when the user has not picked one.
    pub theme_id: &'static str,
}

impl VideoEntry {
    pub fn poster_url(&self) -> String {
        poster_url(self.id)
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ThemeEntry {
    pub id: &'static str,
    pub name: &'static str,
}

pub const VIDEOS: &[VideoEntry] = &[
    VideoEntry {
        id: DEFAULT_VIDEO_ID,
        title: "Lofi study room",
        theme_id: "midnight",
    },
    VideoEntry {
        id: "4xDzrJKXOOY",
        title: "Synthwave night drive",
        theme_id: "neon",
    },
    VideoEntry {
        id: "mPZkdNFkNps",
        title: "Rain on a window",
        theme_id: "storm",
    },
    VideoEntry {
        id: "xNN7iTA57jM",
        title: "Forest creek",
        theme_id: "forest",
    },
    VideoEntry {
        id: "UgHKb_7884o",
        title: "Crackling fireplace",
        theme_id: "ember",
    },
];

pub const THEMES: &[ThemeEntry] = &[
    ThemeEntry {
        id: DEFAULT_THEME_ID,
        name: "Midnight",
    },
    ThemeEntry {
        id: "neon",
        name: "Neon",
    },
    ThemeEntry {
        id: "storm",
        name: "Storm",
    },
    ThemeEntry {
        id: "forest",
        name: "Forest",
    },
    ThemeEntry {
        id: "ember",
        name: "Ember",
    },
];

pub fn poster_url(video_id: &str) -> String {
    format!("https://i.ytimg.com/vi/{video_id}/hqdefault.jpg")
}

pub fn default_video() -> &'static VideoEntry {
    &VIDEOS[0]
}

pub fn resolve_video(id: &str) -> &'static VideoEntry {
    match VIDEOS.iter().find(|video| video.id == id) {
        Some(video) => video,
        None => {
            log_warn!("unknown video id '{id}', using {DEFAULT_VIDEO_ID}");
            default_video()
        }
    }
}

pub fn resolve_theme(id: &str) -> &'static ThemeEntry {
    match THEMES.iter().find(|theme| theme.id == id) {
        Some(theme) => theme,
        None => {
            log_warn!("unknown theme id '{id}', using {DEFAULT_THEME_ID}");
            &THEMES[0]
        }
    }
}

/// Picks a random video other than `current` when the catalog allows it.
pub fn shuffle(current: &str) -> &'static VideoEntry {
    let candidates: Vec<&'static VideoEntry> =
        VIDEOS.iter().filter(|video| video.id != current).collect();
    candidates
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or_else(default_video)
}
