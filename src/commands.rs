//! Line-oriented commands accepted by the host binary.

use anyhow::{anyhow, bail, Result};
use std::str::FromStr;

use crate::{
    catalog,
    media::{PlayerEvent, PlayerStatus},
    AppState,
};

pub const HELP: &str = "\
commands:
  start | pause | reset | skip | status | durations <work min> <break min>
  volume <0-100> | video <id> | video play | video pause | shuffle | videos | theme <id>
  player <ready|unstarted|ended|playing|paused|buffering|blocked|{json}>
  unlock
  streak | streak reset
  todo add <text> | todo done <n> | todo rm <n> | todo clear | todo list
  help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Pause,
    Reset,
    Skip,
    Status,
    Durations { work_minutes: u32, break_minutes: u32 },
    Volume(u8),
    Video(String),
    Playback(bool),
    Shuffle,
    Videos,
    Theme(String),
    Player(PlayerEvent),
    Unlock,
    Streak,
    StreakReset,
    TodoAdd(String),
    TodoDone(usize),
    TodoRemove(usize),
    TodoClear,
    TodoList,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };

        let command = match (head.to_ascii_lowercase().as_str(), rest) {
            ("start", "") => Command::Start,
            ("pause", "") => Command::Pause,
            ("reset", "") => Command::Reset,
            ("skip", "") => Command::Skip,
            ("status", "") => Command::Status,
            ("durations", args) => parse_durations(args)?,
            ("volume", level) => {
                let level: u16 = level
                    .parse()
                    .map_err(|_| anyhow!("volume expects a number between 0 and 100"))?;
                Command::Volume(level.min(100) as u8)
            }
            ("video", "play") => Command::Playback(true),
            ("video", "pause") => Command::Playback(false),
            ("video", id) if !id.is_empty() => Command::Video(id.to_string()),
            ("shuffle", "") => Command::Shuffle,
            ("videos", "") => Command::Videos,
            ("theme", id) if !id.is_empty() => Command::Theme(id.to_string()),
            ("player", arg) if !arg.is_empty() => Command::Player(parse_player_event(arg)?),
            ("unlock", "") => Command::Unlock,
            ("streak", "") => Command::Streak,
            ("streak", "reset") => Command::StreakReset,
            ("todo", args) => parse_todo(args)?,
            ("help", _) => Command::Help,
            ("quit" | "exit", _) => Command::Quit,
            ("", _) => bail!("empty command"),
            _ => bail!("unknown command '{line}' (try `help`)"),
        };
        Ok(command)
    }
}

fn parse_player_event(arg: &str) -> Result<PlayerEvent> {
    if arg.starts_with('{') {
        return PlayerEvent::from_message(arg);
    }
    let event = match arg.to_ascii_lowercase().as_str() {
        "ready" => PlayerEvent::Ready,
        "blocked" => PlayerEvent::AutoplayBlocked,
        "unstarted" => PlayerEvent::StateChange(PlayerStatus::Unstarted),
        "ended" => PlayerEvent::StateChange(PlayerStatus::Ended),
        "playing" => PlayerEvent::StateChange(PlayerStatus::Playing),
        "paused" => PlayerEvent::StateChange(PlayerStatus::Paused),
        "buffering" => PlayerEvent::StateChange(PlayerStatus::Buffering),
        other => bail!("unknown player event '{other}'"),
    };
    Ok(event)
}

fn parse_durations(args: &str) -> Result<Command> {
    let minutes: Vec<u32> = args
        .split_whitespace()
        .map(str::parse)
        .collect::<Result<_, _>>()
        .map_err(|_| anyhow!("usage: durations <work minutes> <break minutes>"))?;
    match minutes.as_slice() {
        [work, brk] if *work > 0 && *brk > 0 => Ok(Command::Durations {
            work_minutes: *work,
            break_minutes: *brk,
        }),
        _ => bail!("usage: durations <work minutes> <break minutes>, both above zero"),
    }
}

fn parse_todo(args: &str) -> Result<Command> {
    let (verb, rest) = match args.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (args, ""),
    };
    match verb {
        "add" if !rest.is_empty() => Ok(Command::TodoAdd(rest.to_string())),
        "done" => Ok(Command::TodoDone(parse_position(rest)?)),
        "rm" => Ok(Command::TodoRemove(parse_position(rest)?)),
        "clear" => Ok(Command::TodoClear),
        "list" | "" => Ok(Command::TodoList),
        _ => bail!("usage: todo add <text> | done <n> | rm <n> | clear | list"),
    }
}

/// Converts a 1-based position typed by the user into an index.
fn parse_position(raw: &str) -> Result<usize> {
    match raw.parse::<usize>() {
        Ok(position) if position > 0 => Ok(position - 1),
        _ => Err(anyhow!("expected a task number starting at 1, got '{raw}'")),
    }
}

pub async fn dispatch(state: &AppState, command: Command) -> Result<String, String> {
    match command {
        Command::Start => {
            let snapshot = state.timer.start().await.map_err(|e| e.to_string())?;
            Ok(format!("{} started ({})", snapshot.mode.as_str(), snapshot.display))
        }
        Command::Pause => {
            let snapshot = state.timer.pause().await.map_err(|e| e.to_string())?;
            Ok(format!("paused at {}", snapshot.display))
        }
        Command::Reset => {
            let snapshot = state.timer.reset().await;
            Ok(format!("{} reset to {}", snapshot.mode.as_str(), snapshot.display))
        }
        Command::Skip => {
            let snapshot = state.timer.skip().await;
            Ok(format!("skipped to {} ({})", snapshot.mode.as_str(), snapshot.display))
        }
        Command::Status => {
            let timer = state.timer.get_snapshot().await;
            let media = state.media.snapshot().await;
            let streak = state.streak.record();
            Ok(format!(
                "{} {} {} | video {} ({:?}, loaded={}, volume={}) | streak {} ({} total)",
                timer.mode.as_str(),
                timer.display,
                if timer.running { "running" } else { "paused" },
                media.video_id,
                media.status,
                media.loaded,
                media.volume,
                streak.count,
                streak.total_sessions
            ))
        }
        Command::Durations {
            work_minutes,
            break_minutes,
        } => {
            let snapshot = state
                .set_durations(work_minutes, break_minutes)
                .await
                .map_err(|e| e.to_string())?;
            Ok(format!(
                "work {work_minutes}m / break {break_minutes}m, now {} {}",
                snapshot.mode.as_str(),
                snapshot.display
            ))
        }
        Command::Volume(level) => {
            state.set_volume(level).await;
            Ok(format!("volume {level}"))
        }
        Command::Video(id) => {
            let video = state.select_video(&id).await;
            Ok(format!("video {} ({})", video.id, video.title))
        }
        Command::Playback(playing) => {
            state.media.set_playing(playing).await;
            Ok(format!("ambient video {}", if playing { "playing" } else { "paused" }))
        }
        Command::Shuffle => {
            let current = state.media.snapshot().await.video_id;
            let video = state.select_video(catalog::shuffle(&current).id).await;
            Ok(format!("video {} ({})", video.id, video.title))
        }
        Command::Videos => Ok(catalog::VIDEOS
            .iter()
            .map(|video| format!("{}  {}", video.id, video.title))
            .collect::<Vec<_>>()
            .join("\n")),
        Command::Theme(id) => {
            let theme = state.set_theme(&id);
            Ok(format!("theme {} ({})", theme.id, theme.name))
        }
        Command::Player(event) => {
            state.media.handle_player_event(event).await;
            Ok(format!("player event {event:?} delivered"))
        }
        Command::Unlock => {
            state.media.enable_audio().await;
            Ok("audio enabled".to_string())
        }
        Command::Streak => {
            let record = state.streak.record();
            Ok(format!(
                "streak {} (last {}, {} sessions total)",
                record.count,
                record
                    .last_update_date
                    .map(|date| date.to_string())
                    .unwrap_or_else(|| "never".to_string()),
                record.total_sessions
            ))
        }
        Command::StreakReset => {
            state.streak.reset();
            Ok("streak reset".to_string())
        }
        Command::TodoAdd(text) => {
            let item = state.todos.add(&text).map_err(|e| e.to_string())?;
            Ok(format!("added '{}'", item.text))
        }
        Command::TodoDone(index) => {
            let item = state.todos.toggle(index).map_err(|e| e.to_string())?;
            Ok(format!(
                "'{}' marked {}",
                item.text,
                if item.done { "done" } else { "open" }
            ))
        }
        Command::TodoRemove(index) => {
            let item = state.todos.remove(index).map_err(|e| e.to_string())?;
            Ok(format!("removed '{}'", item.text))
        }
        Command::TodoClear => Ok(format!("cleared {} finished tasks", state.todos.clear_completed())),
        Command::TodoList => {
            let items = state.todos.list();
            if items.is_empty() {
                return Ok("no tasks".to_string());
            }
            Ok(items
                .iter()
                .enumerate()
                .map(|(i, item)| format!("{}. [{}] {}", i + 1, if item.done { "x" } else { " " }, item.text))
                .collect::<Vec<_>>()
                .join("\n"))
        }
        Command::Help => Ok(HELP.to_string()),
        Command::Quit => Ok("bye".to_string()),
    }
}
