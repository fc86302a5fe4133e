use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    catalog,
    events::{AppEvent, EventBus},
    scope::TaskScope,
};

use super::{
    player::{PlayerCommand, PlayerEvent, PlayerStatus, PlayerTransport},
    state::{MediaPlaybackState, MediaSnapshot, MediaSyncConfig},
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Keeps the embedded player loaded, playing and at the requested volume.
///
/// The player is only reachable through fire-and-forget commands, so the
/// controller re-asserts the desired state on a fixed period and reacts to
/// whatever status the player reports. All scheduled work for a video lives
/// in one [`TaskScope`] that is replaced whenever the video changes.
#[derive(Clone)]
pub struct MediaSyncController {
    state: Arc<Mutex<MediaPlaybackState>>,
    scope: Arc<std::sync::Mutex<Option<TaskScope>>>,
    transport: Arc<dyn PlayerTransport>,
    events: EventBus,
    config: MediaSyncConfig,
}

impl MediaSyncController {
    pub fn new(
        transport: Arc<dyn PlayerTransport>,
        events: EventBus,
        config: MediaSyncConfig,
        volume: u8,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(MediaPlaybackState::new(volume))),
            scope: Arc::new(std::sync::Mutex::new(None)),
            transport,
            events,
            config,
        }
    }

    pub async fn snapshot(&self) -> MediaSnapshot {
        self.state.lock().await.snapshot()
    }

    /// Switches the player to `video_id`, tearing down everything scheduled
    /// for the previous video. Selecting the video already mounted is a no-op.
    pub async fn select_video(&self, video_id: &str) {
        let mut state = self.state.lock().await;
        if state.mounted && state.video_id == video_id {
            return;
        }

        state.clear_stall_timer();
        state.video_id = video_id.to_string();
        state.status = PlayerStatus::Unstarted;
        state.mounted = true;
        state.reloads = 0;

        let scope = TaskScope::new();
        scope.spawn_every(self.config.command_interval, {
            let this = self.clone();
            move || {
                let this = this.clone();
                async move { this.reassert().await }
            }
        });
        self.begin_load(&mut state, &scope);
        self.replace_scope(Some(scope));

        log_info!("selected video {video_id}");
        self.events.emit(AppEvent::VideoSelected {
            video_id: video_id.to_string(),
        });
    }

    pub async fn set_volume(&self, level: u8) {
        let level = level.min(100);
        let mut state = self.state.lock().await;
        let previous = state.volume;
        if previous == level {
            return;
        }
        state.volume = level;
        self.events.emit(AppEvent::VolumeChanged { level });

        if !state.mounted {
            return;
        }
        // Keep the blocked-autoplay mute until the user enables audio.
        if state.audio_blocked {
            log_debug!("volume {level} held until audio is enabled");
            return;
        }
        if level == 0 {
            self.send(PlayerCommand::Mute);
        } else {
            if previous == 0 {
                self.send(PlayerCommand::Unmute);
            }
            self.send(PlayerCommand::SetVolume(level));
        }
    }

    /// Lets the host pause or resume the ambient video. While paused is
    /// desired the controller stops forcing playback.
    pub async fn set_playing(&self, playing: bool) {
        let mut state = self.state.lock().await;
        state.desired_playing = playing;
        if !playing {
            state.clear_stall_timer();
        }
        if !state.mounted {
            return;
        }
        if playing {
            self.send(PlayerCommand::Play);
        } else {
            self.send(PlayerCommand::Pause);
        }
    }

    pub async fn handle_player_event(&self, event: PlayerEvent) {
        let mut state = self.state.lock().await;
        if !state.mounted {
            log_debug!("ignoring {event:?}: player not mounted");
            return;
        }

        match event {
            PlayerEvent::Ready => {
                log_debug!("player ready for {}", state.video_id);
                self.assert_desired(&state);
            }
            PlayerEvent::AutoplayBlocked => {
                if !state.audio_blocked {
                    log_warn!("autoplay with sound blocked for {}", state.video_id);
                    state.audio_blocked = true;
                    self.events.emit(AppEvent::AudioUnlockRequired {
                        video_id: state.video_id.clone(),
                    });
                }
                self.send(PlayerCommand::Mute);
                if state.desired_playing {
                    self.send(PlayerCommand::Play);
                }
            }
            PlayerEvent::StateChange(status) => {
                state.status = status;
                if status == PlayerStatus::Playing {
                    state.clear_stall_timer();
                    return;
                }
                if !state.desired_playing {
                    return;
                }
                self.send(PlayerCommand::Play);
                if status.is_stalled() && state.stall_timer.is_none() {
                    self.arm_stall_timer(&mut state);
                }
            }
        }
    }

    /// Called from the "enable audio" affordance after autoplay was blocked.
    pub async fn enable_audio(&self) {
        let mut state = self.state.lock().await;
        state.audio_blocked = false;
        if !state.mounted {
            return;
        }
        self.assert_volume(&state);
        if state.desired_playing {
            self.send(PlayerCommand::Play);
        }
    }

    /// Stops every scheduled task. Nothing is sent to the player afterwards
    /// until a video is selected again; volume and play requests made in the
    /// meantime are only recorded.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        state.clear_stall_timer();
        state.mounted = false;
        state.loaded = false;
        self.replace_scope(None);
        log_info!("media sync stopped");
    }

    fn begin_load(&self, state: &mut MediaPlaybackState, scope: &TaskScope) {
        state.instance = Uuid::new_v4().to_string();
        state.loaded = false;

        self.events.emit(AppEvent::PosterShown {
            video_id: state.video_id.clone(),
            poster_url: catalog::poster_url(&state.video_id),
        });
        self.send(PlayerCommand::Load {
            video_id: state.video_id.clone(),
            instance: state.instance.clone(),
        });

        let this = self.clone();
        let instance = state.instance.clone();
        scope.spawn_after(self.config.load_grace, async move {
            this.finish_load(instance).await;
        });
    }

    async fn finish_load(&self, instance: String) {
        let mut state = self.state.lock().await;
        if !state.mounted || state.instance != instance {
            return;
        }
        state.loaded = true;
        self.events.emit(AppEvent::PosterHidden {
            video_id: state.video_id.clone(),
        });
        self.assert_desired(&state);
    }

    fn arm_stall_timer(&self, state: &mut MediaPlaybackState) {
        let guard = self.scope.lock().unwrap_or_else(|e| e.into_inner());
        let Some(scope) = guard.as_ref() else {
            return;
        };
        let this = self.clone();
        let instance = state.instance.clone();
        let token = scope.spawn_after(self.config.stall_timeout, async move {
            this.on_stall_timeout(instance).await;
        });
        state.stall_timer = Some(token);
    }

    async fn on_stall_timeout(&self, instance: String) {
        let mut state = self.state.lock().await;
        if !state.mounted || state.instance != instance {
            return;
        }
        state.stall_timer = None;
        if state.status == PlayerStatus::Playing {
            return;
        }

        state.reloads = state.reloads.saturating_add(1);
        state.status = PlayerStatus::Unstarted;
        log_warn!(
            "player stalled on {} for {:?}, reloading (attempt {})",
            state.video_id,
            self.config.stall_timeout,
            state.reloads
        );
        self.events.emit(AppEvent::PlayerReloaded {
            video_id: state.video_id.clone(),
            attempt: state.reloads,
        });

        let guard = self.scope.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(scope) = guard.as_ref() {
            self.begin_load(&mut state, scope);
        }
    }

    async fn reassert(&self) {
        let state = self.state.lock().await;
        if !state.mounted || !state.loaded {
            return;
        }
        self.assert_desired(&state);
    }

    fn assert_desired(&self, state: &MediaPlaybackState) {
        self.send(if state.desired_playing {
            PlayerCommand::Play
        } else {
            PlayerCommand::Pause
        });
        self.assert_volume(state);
    }

    fn assert_volume(&self, state: &MediaPlaybackState) {
        if state.volume == 0 || state.audio_blocked {
            self.send(PlayerCommand::Mute);
        } else {
            self.send(PlayerCommand::Unmute);
            self.send(PlayerCommand::SetVolume(state.volume));
        }
    }

    fn replace_scope(&self, scope: Option<TaskScope>) {
        let mut guard = self.scope.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(old) = guard.take() {
            old.cancel();
        }
        *guard = scope;
    }

    fn send(&self, command: PlayerCommand) {
        if let Err(err) = self.transport.send(&command) {
            log_warn!("dropped player command {}: {err:#}", command.func());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::drain;
    use crate::media::player::RecordingTransport;
    use anyhow::{anyhow, Result};
    use tokio::time::{sleep, Duration};

    fn controller(volume: u8) -> (MediaSyncController, Arc<RecordingTransport>, EventBus) {
        let transport = Arc::new(RecordingTransport::default());
        let events = EventBus::new();
        let media = MediaSyncController::new(
            transport.clone(),
            events.clone(),
            MediaSyncConfig::default(),
            volume,
        );
        (media, transport, events)
    }

    fn loads_for(sent: &[PlayerCommand], id: &str) -> usize {
        sent.iter()
            .filter(|command| matches!(command, PlayerCommand::Load { video_id, .. } if video_id == id))
            .count()
    }

    #[tokio::test(start_paused = true)]
    async fn selecting_a_video_shows_poster_until_grace_elapses() {
        let (media, transport, events) = controller(40);
        let mut rx = events.subscribe();

        media.select_video("abc").await;
        assert_eq!(loads_for(&transport.sent(), "abc"), 1);
        let emitted = drain(&mut rx);
        assert!(emitted.contains(&AppEvent::PosterShown {
            video_id: "abc".into(),
            poster_url: catalog::poster_url("abc"),
        }));
        assert!(!media.snapshot().await.loaded);

        sleep(Duration::from_millis(1900)).await;
        assert!(!media.snapshot().await.loaded);

        sleep(Duration::from_millis(200)).await;
        assert!(media.snapshot().await.loaded);
        assert!(drain(&mut rx).contains(&AppEvent::PosterHidden {
            video_id: "abc".into()
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn command_loop_reasserts_play_and_volume_once_loaded() {
        let (media, transport, _events) = controller(40);
        media.select_video("abc").await;
        sleep(Duration::from_millis(2100)).await;
        transport.clear();

        sleep(Duration::from_millis(1000)).await;
        let sent = transport.sent();
        assert_eq!(
            sent,
            vec![
                PlayerCommand::Play,
                PlayerCommand::Unmute,
                PlayerCommand::SetVolume(40),
                PlayerCommand::Play,
                PlayerCommand::Unmute,
                PlayerCommand::SetVolume(40),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn loop_stays_quiet_before_load_completes() {
        let (media, transport, _events) = controller(40);
        media.select_video("abc").await;
        transport.clear();
        sleep(Duration::from_millis(1600)).await;
        assert!(transport.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unmute_precedes_set_volume_when_leaving_zero() {
        let (media, transport, events) = controller(0);
        media.select_video("abc").await;
        let mut rx = events.subscribe();
        transport.clear();
        media.set_volume(30).await;
        assert_eq!(
            transport.sent(),
            vec![PlayerCommand::Unmute, PlayerCommand::SetVolume(30)]
        );
        assert_eq!(drain(&mut rx), vec![AppEvent::VolumeChanged { level: 30 }]);

        transport.clear();
        media.set_volume(55).await;
        assert_eq!(transport.sent(), vec![PlayerCommand::SetVolume(55)]);

        transport.clear();
        media.set_volume(0).await;
        assert_eq!(transport.sent(), vec![PlayerCommand::Mute]);

        transport.clear();
        media.set_volume(0).await;
        assert!(transport.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn volume_is_clamped_to_one_hundred() {
        let (media, transport, _events) = controller(50);
        media.select_video("abc").await;
        transport.clear();
        media.set_volume(250).await;
        assert_eq!(transport.sent(), vec![PlayerCommand::SetVolume(100)]);
        assert_eq!(media.snapshot().await.volume, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn non_playing_status_reissues_play_immediately() {
        let (media, transport, _events) = controller(40);
        media.select_video("abc").await;
        transport.clear();

        media
            .handle_player_event(PlayerEvent::StateChange(PlayerStatus::Paused))
            .await;
        assert_eq!(transport.sent(), vec![PlayerCommand::Play]);
        assert!(!media.snapshot().await.stall_pending);
    }

    #[tokio::test(start_paused = true)]
    async fn unrecovered_buffering_triggers_exactly_one_reload() {
        let (media, transport, events) = controller(40);
        media.select_video("abc").await;
        let mut rx = events.subscribe();
        transport.clear();

        media
            .handle_player_event(PlayerEvent::StateChange(PlayerStatus::Buffering))
            .await;
        // A second stall report does not push the deadline back.
        sleep(Duration::from_secs(1)).await;
        media
            .handle_player_event(PlayerEvent::StateChange(PlayerStatus::Buffering))
            .await;

        sleep(Duration::from_millis(2100)).await;
        let snapshot = media.snapshot().await;
        assert_eq!(snapshot.reloads, 1);
        assert!(!snapshot.stall_pending);
        assert_eq!(loads_for(&transport.sent(), "abc"), 1);
        assert!(drain(&mut rx).contains(&AppEvent::PlayerReloaded {
            video_id: "abc".into(),
            attempt: 1,
        }));

        sleep(Duration::from_secs(10)).await;
        assert_eq!(media.snapshot().await.reloads, 1);
        assert_eq!(loads_for(&transport.sent(), "abc"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn playing_before_timeout_cancels_reload() {
        let (media, transport, _events) = controller(40);
        media.select_video("abc").await;
        transport.clear();

        media
            .handle_player_event(PlayerEvent::StateChange(PlayerStatus::Buffering))
            .await;
        assert!(media.snapshot().await.stall_pending);

        sleep(Duration::from_secs(1)).await;
        media
            .handle_player_event(PlayerEvent::StateChange(PlayerStatus::Playing))
            .await;
        assert!(!media.snapshot().await.stall_pending);

        sleep(Duration::from_secs(5)).await;
        assert_eq!(media.snapshot().await.reloads, 0);
        assert_eq!(loads_for(&transport.sent(), "abc"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn switching_video_cancels_pending_stall_reload() {
        let (media, transport, _events) = controller(40);
        media.select_video("old").await;
        media
            .handle_player_event(PlayerEvent::StateChange(PlayerStatus::Unstarted))
            .await;
        sleep(Duration::from_secs(1)).await;

        media.select_video("new").await;
        transport.clear();
        sleep(Duration::from_secs(5)).await;

        let sent = transport.sent();
        assert_eq!(loads_for(&sent, "old"), 0);
        assert_eq!(loads_for(&sent, "new"), 0);
        let snapshot = media.snapshot().await;
        assert_eq!(snapshot.video_id, "new");
        assert_eq!(snapshot.reloads, 0);
        assert!(snapshot.loaded);
    }

    #[tokio::test(start_paused = true)]
    async fn reselecting_the_same_video_is_a_no_op() {
        let (media, transport, _events) = controller(40);
        media.select_video("abc").await;
        media.select_video("abc").await;
        assert_eq!(loads_for(&transport.sent(), "abc"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_all_player_traffic() {
        let (media, transport, _events) = controller(40);
        media.select_video("abc").await;
        media
            .handle_player_event(PlayerEvent::StateChange(PlayerStatus::Buffering))
            .await;
        sleep(Duration::from_millis(500)).await;

        media.shutdown().await;
        transport.clear();
        sleep(Duration::from_secs(10)).await;
        assert!(transport.sent().is_empty());
        assert_eq!(media.snapshot().await.reloads, 0);

        media
            .handle_player_event(PlayerEvent::StateChange(PlayerStatus::Paused))
            .await;
        assert!(transport.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn host_requests_after_shutdown_are_only_recorded() {
        let (media, transport, _events) = controller(40);
        media.select_video("abc").await;
        media.shutdown().await;
        transport.clear();

        media.set_volume(0).await;
        media.set_volume(20).await;
        media.set_playing(true).await;
        media.enable_audio().await;
        assert!(transport.sent().is_empty());
        assert_eq!(media.snapshot().await.volume, 20);

        // The recorded volume is applied once a video is mounted again.
        media.select_video("xyz").await;
        sleep(Duration::from_millis(2100)).await;
        let sent = transport.sent();
        assert!(sent.contains(&PlayerCommand::SetVolume(20)));
        assert_eq!(loads_for(&sent, "xyz"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn blocked_autoplay_requests_unlock_then_restores_audio() {
        let (media, transport, events) = controller(25);
        media.select_video("abc").await;
        let mut rx = events.subscribe();
        transport.clear();

        media.handle_player_event(PlayerEvent::AutoplayBlocked).await;
        assert_eq!(transport.sent(), vec![PlayerCommand::Mute, PlayerCommand::Play]);
        assert_eq!(
            drain(&mut rx),
            vec![AppEvent::AudioUnlockRequired {
                video_id: "abc".into()
            }]
        );
        assert!(media.snapshot().await.audio_blocked);

        transport.clear();
        media.enable_audio().await;
        assert_eq!(
            transport.sent(),
            vec![
                PlayerCommand::Unmute,
                PlayerCommand::SetVolume(25),
                PlayerCommand::Play
            ]
        );
        assert!(!media.snapshot().await.audio_blocked);
    }

    #[tokio::test(start_paused = true)]
    async fn volume_changes_stay_muted_while_autoplay_is_blocked() {
        let (media, transport, _events) = controller(0);
        media.select_video("abc").await;
        media.handle_player_event(PlayerEvent::AutoplayBlocked).await;
        transport.clear();

        media.set_volume(35).await;
        assert!(transport.sent().is_empty());
        assert_eq!(media.snapshot().await.volume, 35);

        media.enable_audio().await;
        assert_eq!(
            transport.sent(),
            vec![
                PlayerCommand::Unmute,
                PlayerCommand::SetVolume(35),
                PlayerCommand::Play
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn ready_reasserts_play_and_volume() {
        let (media, transport, _events) = controller(60);
        media.select_video("abc").await;
        transport.clear();

        media.handle_player_event(PlayerEvent::Ready).await;
        assert_eq!(
            transport.sent(),
            vec![
                PlayerCommand::Play,
                PlayerCommand::Unmute,
                PlayerCommand::SetVolume(60)
            ]
        );

        media.set_volume(0).await;
        transport.clear();
        media.handle_player_event(PlayerEvent::Ready).await;
        assert_eq!(transport.sent(), vec![PlayerCommand::Play, PlayerCommand::Mute]);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_and_status_events_interleave_without_side_effects() {
        let (media, transport, _events) = controller(40);
        media.select_video("abc").await;
        sleep(Duration::from_millis(2100)).await;
        transport.clear();

        media
            .handle_player_event(PlayerEvent::StateChange(PlayerStatus::Buffering))
            .await;
        sleep(Duration::from_millis(500)).await;
        media
            .handle_player_event(PlayerEvent::StateChange(PlayerStatus::Playing))
            .await;
        media
            .handle_player_event(PlayerEvent::StateChange(PlayerStatus::Playing))
            .await;
        sleep(Duration::from_millis(500)).await;

        let reassert = [
            PlayerCommand::Play,
            PlayerCommand::Unmute,
            PlayerCommand::SetVolume(40),
        ];
        let mut expected = vec![PlayerCommand::Play];
        expected.extend(reassert.clone());
        expected.extend(reassert);
        assert_eq!(transport.sent(), expected);

        sleep(Duration::from_secs(5)).await;
        let snapshot = media.snapshot().await;
        assert_eq!(snapshot.status, PlayerStatus::Playing);
        assert_eq!(snapshot.reloads, 0);
        assert!(!snapshot.stall_pending);
        assert_eq!(loads_for(&transport.sent(), "abc"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn desired_pause_suppresses_self_healing() {
        let (media, transport, _events) = controller(25);
        media.select_video("abc").await;
        media.set_playing(false).await;
        transport.clear();

        media
            .handle_player_event(PlayerEvent::StateChange(PlayerStatus::Paused))
            .await;
        media
            .handle_player_event(PlayerEvent::StateChange(PlayerStatus::Buffering))
            .await;
        assert!(transport.sent().is_empty());
        assert!(!media.snapshot().await.stall_pending);
    }

    struct ClosedTransport;

    impl PlayerTransport for ClosedTransport {
        fn send(&self, _command: &PlayerCommand) -> Result<()> {
            Err(anyhow!("channel closed"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failures_are_swallowed() {
        let media = MediaSyncController::new(
            Arc::new(ClosedTransport),
            EventBus::new(),
            MediaSyncConfig::default(),
            10,
        );
        media.select_video("abc").await;
        media.set_volume(0).await;
        media
            .handle_player_event(PlayerEvent::StateChange(PlayerStatus::Buffering))
            .await;
        sleep(Duration::from_secs(4)).await;
        assert_eq!(media.snapshot().await.reloads, 1);
    }
}
