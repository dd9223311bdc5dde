use std::fmt;
use std::str::FromStr;

use cbt_core::model::OptionKey;

/// One line of terminal input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Answer(OptionKey),
    Next,
    Prev,
    /// 0-based target index.
    GoTo(usize),
    Submit,
    Exit,
    View,
    Reload,
    Refresh,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    Empty,
    Unknown(String),
    InvalidQuestionNumber(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Empty => write!(f, "type a command (h for help)"),
            CommandError::Unknown(raw) => write!(f, "unknown command: {raw} (h for help)"),
            CommandError::InvalidQuestionNumber(raw) => {
                write!(f, "expected a question number starting at 1, got: {raw}")
            }
        }
    }
}

impl std::error::Error for CommandError {}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err(CommandError::Empty);
        };
        let head = head.to_ascii_lowercase();

        let command = match head.as_str() {
            "start" => Command::Start,
            "a" | "b" | "c" | "d" => {
                let key = head
                    .parse::<OptionKey>()
                    .map_err(|_| CommandError::Unknown(head.clone()))?;
                Command::Answer(key)
            }
            "n" | "next" => Command::Next,
            "p" | "prev" => Command::Prev,
            "g" | "go" => {
                let raw = words.next().unwrap_or_default();
                let number = raw
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| CommandError::InvalidQuestionNumber(raw.to_string()))?;
                Command::GoTo(number - 1)
            }
            "s" | "submit" => Command::Submit,
            "x" | "exit" => Command::Exit,
            "v" | "view" => Command::View,
            "reload" => Command::Reload,
            "refresh" => Command::Refresh,
            "h" | "help" | "?" => Command::Help,
            "q" | "quit" => Command::Quit,
            _ => return Err(CommandError::Unknown(head)),
        };
        Ok(command)
    }
}

pub const HELP: &str = "\
Commands:
  start          begin a new attempt (restarts any current one)
  a | b | c | d  choose an option for the current question
  n | p          next / previous question
  g <number>     jump to question <number>
  s              submit now
  x              back to the welcome screen (abandons a running attempt)
  v              show the current screen again
  reload         rebuild the engine from storage
  refresh        re-fetch the question bank
  q              quit (a running attempt resumes next time)";
