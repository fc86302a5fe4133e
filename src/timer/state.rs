use serde::{Deserialize, Serialize};

pub const DEFAULT_WORK_SECS: u32 = 25 * 60;
pub const DEFAULT_BREAK_SECS: u32 = 5 * 60;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TimerMode {
    #[default]
    Work,
    Break,
}

impl TimerMode {
    pub fn next(self) -> Self {
        match self {
            TimerMode::Work => TimerMode::Break,
            TimerMode::Break => TimerMode::Work,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimerMode::Work => "work",
            TimerMode::Break => "break",
        }
    }
}

/// Configured session lengths. Both are strictly positive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimerConfig {
    pub work_duration_secs: u32,
    pub break_duration_secs: u32,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            work_duration_secs: DEFAULT_WORK_SECS,
            break_duration_secs: DEFAULT_BREAK_SECS,
        }
    }
}

impl TimerConfig {
    /// Builds a config from minute values, substituting defaults for zeros.
    pub fn from_minutes(work_minutes: u32, break_minutes: u32) -> Self {
        let defaults = Self::default();
        Self {
            work_duration_secs: match work_minutes {
                0 => defaults.work_duration_secs,
                m => m.saturating_mul(60),
            },
            break_duration_secs: match break_minutes {
                0 => defaults.break_duration_secs,
                m => m.saturating_mul(60),
            },
        }
    }

    pub fn duration_for(&self, mode: TimerMode) -> u32 {
        match mode {
            TimerMode::Work => self.work_duration_secs.max(1),
            TimerMode::Break => self.break_duration_secs.max(1),
        }
    }
}

/// Transition notifications produced by [`TimerState`].
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum TimerEvent {
    Started,
    Paused,
    Reset,
    #[serde(rename_all = "camelCase")]
    SessionCompleted {
        completed: TimerMode,
        next: TimerMode,
        /// True when the session was ended early by the user.
        skipped: bool,
    },
}

/// Countdown state machine. Pure: one call to [`TimerState::tick`] per second
/// of running time, no clocks inside.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub mode: TimerMode,
    pub remaining_secs: u32,
    pub running: bool,
    pub config: TimerConfig,
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new(TimerConfig::default())
    }
}

impl TimerState {
    pub fn new(config: TimerConfig) -> Self {
        Self {
            mode: TimerMode::Work,
            remaining_secs: config.duration_for(TimerMode::Work),
            running: false,
            config,
        }
    }

    pub fn start(&mut self) -> Option<TimerEvent> {
        if self.running {
            return None;
        }
        self.running = true;
        Some(TimerEvent::Started)
    }

    pub fn pause(&mut self) -> Option<TimerEvent> {
        if !self.running {
            return None;
        }
        self.running = false;
        Some(TimerEvent::Paused)
    }

    /// Advances the countdown by one second.
    ///
    /// The session completes on the tick that brings the countdown to zero,
    /// or immediately if it was already sitting at zero. Either way at most
    /// one mode flip happens per call.
    pub fn tick(&mut self) -> Option<TimerEvent> {
        if !self.running {
            return None;
        }
        if self.remaining_secs > 0 {
            self.remaining_secs -= 1;
            if self.remaining_secs > 0 {
                return None;
            }
        }
        Some(self.complete(false))
    }

    pub fn reset(&mut self) -> TimerEvent {
        self.remaining_secs = self.config.duration_for(self.mode);
        self.running = false;
        TimerEvent::Reset
    }

    /// Ends the current session early.
    pub fn skip(&mut self) -> TimerEvent {
        self.complete(true)
    }

    /// Applies new durations. The current countdown is only rewritten when the
    /// timer is idle at the start of a session.
    pub fn reconfigure(&mut self, config: TimerConfig) {
        let untouched = !self.running && self.remaining_secs == self.config.duration_for(self.mode);
        self.config = config;
        if untouched {
            self.remaining_secs = config.duration_for(self.mode);
        }
    }

    pub fn minutes(&self) -> u32 {
        self.remaining_secs / 60
    }

    pub fn seconds(&self) -> u32 {
        self.remaining_secs % 60
    }

    pub fn display(&self) -> String {
        format!("{:02}:{:02}", self.minutes(), self.seconds())
    }

    fn complete(&mut self, skipped: bool) -> TimerEvent {
        let completed = self.mode;
        self.mode = completed.next();
        self.remaining_secs = self.config.duration_for(self.mode);
        self.running = false;
        TimerEvent::SessionCompleted {
            completed,
            next: self.mode,
            skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short(work: u32, brk: u32) -> TimerState {
        TimerState::new(TimerConfig {
            work_duration_secs: work,
            break_duration_secs: brk,
        })
    }

    #[test]
    fn starts_idle_in_work_mode() {
        let state = TimerState::default();
        assert_eq!(state.mode, TimerMode::Work);
        assert_eq!(state.remaining_secs, 1500);
        assert!(!state.running);
        assert_eq!(state.display(), "25:00");
    }

    #[test]
    fn start_and_pause_are_only_valid_from_the_opposite_state() {
        let mut state = TimerState::default();
        assert_eq!(state.pause(), None);
        assert_eq!(state.start(), Some(TimerEvent::Started));
        assert_eq!(state.start(), None);
        assert_eq!(state.pause(), Some(TimerEvent::Paused));
        assert!(!state.running);
    }

    #[test]
    fn ticks_are_ignored_while_paused() {
        let mut state = short(10, 5);
        assert_eq!(state.tick(), None);
        assert_eq!(state.remaining_secs, 10);
    }

    #[test]
    fn full_work_session_flips_to_break_after_exactly_w_ticks() {
        let mut state = TimerState::default();
        state.start();
        for _ in 0..1499 {
            assert_eq!(state.tick(), None);
        }
        assert_eq!(state.remaining_secs, 1);
        assert_eq!(
            state.tick(),
            Some(TimerEvent::SessionCompleted {
                completed: TimerMode::Work,
                next: TimerMode::Break,
                skipped: false,
            })
        );
        assert_eq!(state.mode, TimerMode::Break);
        assert_eq!(state.remaining_secs, 300);
        assert!(!state.running);

        // Session does not continue on its own.
        assert_eq!(state.tick(), None);
        assert_eq!(state.remaining_secs, 300);
    }

    #[test]
    fn break_completion_returns_to_work() {
        let mut state = short(3, 2);
        state.mode = TimerMode::Break;
        state.remaining_secs = 2;
        state.start();
        state.tick();
        let event = state.tick();
        assert!(matches!(
            event,
            Some(TimerEvent::SessionCompleted {
                completed: TimerMode::Break,
                next: TimerMode::Work,
                ..
            })
        ));
        assert_eq!(state.remaining_secs, 3);
    }

    #[test]
    fn tick_at_zero_completes_without_going_negative() {
        let mut state = short(5, 2);
        state.remaining_secs = 0;
        state.start();
        let event = state.tick();
        assert!(matches!(event, Some(TimerEvent::SessionCompleted { .. })));
        assert_eq!(state.mode, TimerMode::Break);
        assert_eq!(state.remaining_secs, 2);
    }

    #[test]
    fn pause_resume_round_trip_preserves_remaining() {
        let mut state = short(60, 5);
        state.start();
        for _ in 0..17 {
            state.tick();
        }
        let before = state.remaining_secs;
        state.pause();
        state.start();
        assert_eq!(state.remaining_secs, before);
        assert!(state.running);
    }

    #[test]
    fn reset_restores_current_mode_duration() {
        let mut state = short(60, 30);
        state.start();
        state.tick();
        assert_eq!(state.reset(), TimerEvent::Reset);
        assert_eq!(state.remaining_secs, 60);
        assert!(!state.running);

        state.mode = TimerMode::Break;
        state.remaining_secs = 4;
        state.reset();
        assert_eq!(state.mode, TimerMode::Break);
        assert_eq!(state.remaining_secs, 30);
    }

    #[test]
    fn skip_flips_mode_and_marks_event_as_skipped() {
        let mut state = short(60, 30);
        state.start();
        let event = state.skip();
        assert_eq!(
            event,
            TimerEvent::SessionCompleted {
                completed: TimerMode::Work,
                next: TimerMode::Break,
                skipped: true,
            }
        );
        assert!(!state.running);
        assert_eq!(state.remaining_secs, 30);
    }

    #[test]
    fn zero_minute_config_falls_back_to_defaults() {
        let config = TimerConfig::from_minutes(0, 10);
        assert_eq!(config.work_duration_secs, DEFAULT_WORK_SECS);
        assert_eq!(config.break_duration_secs, 600);
    }

    #[test]
    fn reconfigure_only_rewrites_an_untouched_countdown() {
        let mut state = short(60, 30);
        state.reconfigure(TimerConfig {
            work_duration_secs: 120,
            break_duration_secs: 30,
        });
        assert_eq!(state.remaining_secs, 120);

        state.start();
        state.tick();
        state.reconfigure(TimerConfig {
            work_duration_secs: 90,
            break_duration_secs: 30,
        });
        assert_eq!(state.remaining_secs, 119);
    }
}
