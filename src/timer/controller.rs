use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use serde::Serialize;
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

use crate::{
    audio::AlertCue,
    events::{AppEvent, EventBus},
    streak::{DayAnchor, StreakTracker},
};

use super::{TimerConfig, TimerEvent, TimerMode, TimerState};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub mode: TimerMode,
    pub running: bool,
    pub remaining_seconds: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub display: String,
    pub work_duration_secs: u32,
    pub break_duration_secs: u32,
}

impl From<&TimerState> for TimerSnapshot {
    fn from(state: &TimerState) -> Self {
        Self {
            mode: state.mode,
            running: state.running,
            remaining_seconds: state.remaining_secs,
            minutes: state.minutes(),
            seconds: state.seconds(),
            display: state.display(),
            work_duration_secs: state.config.work_duration_secs,
            break_duration_secs: state.config.break_duration_secs,
        }
    }
}

/// Drives [`TimerState`] with a one-per-second tick task and wires session
/// completion to the streak tracker and the alert cue.
#[derive(Clone)]
pub struct TimerController {
    state: Arc<Mutex<TimerState>>,
    events: EventBus,
    streak: Arc<StreakTracker>,
    alert: Arc<dyn AlertCue>,
    day_anchor: DayAnchor,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    tick_interval: Duration,
    heartbeat_every_ticks: u32,
}

impl TimerController {
    pub fn new(
        config: TimerConfig,
        events: EventBus,
        streak: Arc<StreakTracker>,
        alert: Arc<dyn AlertCue>,
        day_anchor: DayAnchor,
        debug_mode: bool,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(TimerState::new(config))),
            events,
            streak,
            alert,
            day_anchor,
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: Duration::from_secs(1),
            heartbeat_every_ticks: if debug_mode { 1 } else { 10 },
        }
    }

    pub async fn get_snapshot(&self) -> TimerSnapshot {
        TimerSnapshot::from(&*self.state.lock().await)
    }

    pub async fn start(&self) -> Result<TimerSnapshot> {
        let snapshot = {
            let mut state = self.state.lock().await;
            state
                .start()
                .ok_or_else(|| anyhow!("timer already running"))?;
            TimerSnapshot::from(&*state)
        };

        self.spawn_ticker().await;

        log_info!("{} session started at {}", snapshot.mode.as_str(), snapshot.display);
        self.events.emit(AppEvent::TimerStarted(snapshot.clone()));
        self.events.emit(AppEvent::TimerStateChanged(snapshot.clone()));
        Ok(snapshot)
    }

    pub async fn pause(&self) -> Result<TimerSnapshot> {
        let snapshot = {
            let mut state = self.state.lock().await;
            state
                .pause()
                .ok_or_else(|| anyhow!("timer is not running"))?;
            TimerSnapshot::from(&*state)
        };

        self.cancel_ticker().await;
        self.events.emit(AppEvent::TimerStateChanged(snapshot.clone()));
        Ok(snapshot)
    }

    pub async fn reset(&self) -> TimerSnapshot {
        let snapshot = {
            let mut state = self.state.lock().await;
            state.reset();
            TimerSnapshot::from(&*state)
        };

        self.cancel_ticker().await;
        self.events.emit(AppEvent::TimerStateChanged(snapshot.clone()));
        snapshot
    }

    /// Ends the current session early. Skipped work sessions do not count
    /// toward the streak.
    pub async fn skip(&self) -> TimerSnapshot {
        let (event, snapshot) = {
            let mut state = self.state.lock().await;
            let event = state.skip();
            (event, TimerSnapshot::from(&*state))
        };

        self.cancel_ticker().await;
        self.on_transition(event, snapshot.clone());
        snapshot
    }

    pub async fn reconfigure(&self, config: TimerConfig) -> TimerSnapshot {
        let snapshot = {
            let mut state = self.state.lock().await;
            state.reconfigure(config);
            TimerSnapshot::from(&*state)
        };
        self.events.emit(AppEvent::TimerStateChanged(snapshot.clone()));
        snapshot
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let this = self.clone();
        let tick_interval = self.tick_interval;
        let heartbeat_every = self.heartbeat_every_ticks.max(1);

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + tick_interval, tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut ticks: u32 = 0;
            loop {
                interval.tick().await;

                let (event, snapshot) = {
                    let mut guard = this.state.lock().await;
                    if !guard.running {
                        break;
                    }
                    let event = guard.tick();
                    (event, TimerSnapshot::from(&*guard))
                };

                if let Some(event) = event {
                    this.on_transition(event, snapshot);
                    break;
                }

                ticks = ticks.wrapping_add(1);
                if ticks % heartbeat_every == 0 {
                    this.events.emit(AppEvent::TimerHeartbeat(snapshot));
                }
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }

    fn on_transition(&self, event: TimerEvent, snapshot: TimerSnapshot) {
        let TimerEvent::SessionCompleted {
            completed,
            next,
            skipped,
        } = event
        else {
            self.events.emit(AppEvent::TimerStateChanged(snapshot));
            return;
        };

        let counts = completed == TimerMode::Work && !skipped;
        let streak = if counts {
            let count = self.streak.increment(self.day_anchor.today());
            let record = self.streak.record();
            self.events.emit(AppEvent::StreakUpdated {
                count,
                total_sessions: record.total_sessions,
            });
            if let Err(err) = self.alert.play() {
                log_warn!("completion alert failed: {err:#}");
            }
            Some(count)
        } else {
            None
        };

        log_info!(
            "{} session {} (streak {:?})",
            completed.as_str(),
            if skipped { "skipped" } else { "completed" },
            streak
        );

        self.events.emit(AppEvent::SessionCompleted {
            completed_mode: completed,
            next_mode: next,
            skipped,
            streak,
        });
        self.events.emit(AppEvent::TimerStateChanged(snapshot));
    }
}
