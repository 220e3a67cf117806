use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::CommandError;
use crate::pomodoro::PomodoroMode;

/// Everything a front end can ask the controller to do.
///
/// Task fields hold a reference (id, id prefix or 1-based position) that is
/// resolved against the current list when the command is applied.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Command {
    Start,
    Pause,
    Toggle,
    Reset,
    Switch,
    SetMode { mode: PomodoroMode },
    SetDurations { work_minutes: u32, break_minutes: u32 },
    AddTask { name: String },
    ToggleTask { id: String },
    DeleteTask { id: String },
    RenameTask { id: String, name: String },
    SelectTask { id: String },
    ClearSelection,
    Status,
}

pub const HELP: &str = "\
commands:
  start | pause | toggle       run or stop the countdown
  reset                        refill the current session and stop
  switch                       jump to the other session and stop
  mode work|break              pick a session and stop
  durations <work> <break>     e.g. `durations 50 10` or `durations 1h 15m`
  add <name>                   add a task at the top of the list
  done <task>                  toggle a task's done flag
  rm <task>                    delete a task
  rename <task> <name>         rename a task
  select <task> | unselect     choose the task credited with pomodoros
  list | status                show timer and tasks
  quit
<task> is a list position, a task id or an unambiguous id prefix.";

/// Parse one interactive input line.
pub fn parse_line(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "start" => Command::Start,
        "pause" => Command::Pause,
        "toggle" => Command::Toggle,
        "reset" => Command::Reset,
        "switch" | "skip" => Command::Switch,
        "mode" => Command::SetMode {
            mode: parse_mode(require(rest, "mode", "work or break")?)?,
        },
        "durations" | "dur" => {
            let mut parts = rest.split_whitespace();
            let work = parts.next().ok_or(CommandError::MissingArgument {
                command: "durations",
                what: "a work duration",
            })?;
            let brk = parts.next().ok_or(CommandError::MissingArgument {
                command: "durations",
                what: "a break duration",
            })?;
            Command::SetDurations {
                work_minutes: parse_minutes(work)?,
                break_minutes: parse_minutes(brk)?,
            }
        }
        "add" => Command::AddTask {
            name: rest.to_string(),
        },
        "done" => Command::ToggleTask {
            id: require(rest, "done", "a task")?.to_string(),
        },
        "rm" | "delete" => Command::DeleteTask {
            id: require(rest, "rm", "a task")?.to_string(),
        },
        "rename" => {
            let (id, name) = rest
                .split_once(char::is_whitespace)
                .ok_or(CommandError::MissingArgument {
                    command: "rename",
                    what: "a task and a new name",
                })?;
            Command::RenameTask {
                id: id.to_string(),
                name: name.trim().to_string(),
            }
        }
        "select" => Command::SelectTask {
            id: require(rest, "select", "a task")?.to_string(),
        },
        "unselect" => Command::ClearSelection,
        "status" | "list" | "ls" => Command::Status,
        _ => return Err(CommandError::Unknown(word.to_string())),
    };
    Ok(command)
}

fn require<'a>(
    rest: &'a str,
    command: &'static str,
    what: &'static str,
) -> Result<&'a str, CommandError> {
    if rest.is_empty() {
        Err(CommandError::MissingArgument { command, what })
    } else {
        Ok(rest)
    }
}

fn parse_mode(text: &str) -> Result<PomodoroMode, CommandError> {
    match text.to_ascii_lowercase().as_str() {
        "work" | "focus" => Ok(PomodoroMode::Work),
        "break" | "rest" => Ok(PomodoroMode::Break),
        _ => Err(CommandError::InvalidMode(text.to_string())),
    }
}

static DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(\d+)h)?(?:(\d+)m)?(?:(\d+)s)?$").expect("duration pattern is valid")
});

/// Parse `25`, `25m`, `90s` or `1h30m` into whole minutes, rounding seconds up.
pub fn parse_minutes(text: &str) -> Result<u32, CommandError> {
    let invalid = || CommandError::InvalidDuration(text.to_string());
    let text = text.trim().to_ascii_lowercase();
    if let Ok(minutes) = text.parse::<u32>() {
        return Ok(minutes);
    }

    let captures = DURATION.captures(&text).ok_or_else(invalid)?;
    let field = |index: usize, scale: u64| -> Result<Option<u64>, CommandError> {
        captures
            .get(index)
            .map(|m| {
                m.as_str()
                    .parse::<u64>()
                    .ok()
                    .and_then(|n| n.checked_mul(scale))
                    .ok_or_else(invalid)
            })
            .transpose()
    };
    let parts = [field(1, 3600)?, field(2, 60)?, field(3, 1)?];
    if parts.iter().all(Option::is_none) {
        return Err(invalid());
    }

    let seconds: u64 = parts.into_iter().flatten().sum();
    u32::try_from(seconds.div_ceil(60)).map_err(|_| invalid())
}
