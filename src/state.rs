use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::mpsc::{SendError, Sender};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Position {
    pub const ALL: [Position; 4] = [
        Position::TopLeft,
        Position::TopRight,
        Position::BottomLeft,
        Position::BottomRight,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Position::TopLeft => "top-left",
            Position::TopRight => "top-right",
            Position::BottomLeft => "bottom-left",
            Position::BottomRight => "bottom-right",
        }
    }

    /// Human-readable menu label.
    pub fn label(self) -> &'static str {
        match self {
            Position::TopLeft => "Top Left",
            Position::TopRight => "Top Right",
            Position::BottomLeft => "Bottom Left",
            Position::BottomRight => "Bottom Right",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPosition(pub String);

impl fmt::Display for UnknownPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown position '{}'", self.0)
    }
}

impl std::error::Error for UnknownPosition {}

/// Exact match only; callers normalise case first.
impl FromStr for Position {
    type Err = UnknownPosition;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Position::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPosition(s.to_string()))
    }
}

/// User requests coming from the tray or from a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Toggle,
    Move(Position),
    Quit,
}

/// What the window has to do after a command was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    SetVisible(bool),
    Reposition(Position),
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayState {
    pub position: Position,
    pub visible: bool,
}

impl DisplayState {
    pub fn new(position: Position) -> Self {
        Self {
            position,
            visible: true,
        }
    }

    pub fn apply(&mut self, command: Command) -> Effect {
        match command {
            Command::Toggle => {
                self.visible = !self.visible;
                Effect::SetVisible(self.visible)
            }
            Command::Move(position) => {
                self.position = position;
                Effect::Reposition(position)
            }
            Command::Quit => Effect::Quit,
        }
    }
}

/// Sending half of the command queue. Every send wakes the GUI thread so the
/// queue is drained even while the window is idle or hidden.
#[derive(Clone)]
pub struct CommandSender {
    tx: Sender<Command>,
    wake: Arc<dyn Fn() + Send + Sync>,
}

impl CommandSender {
    pub fn new(tx: Sender<Command>, wake: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            tx,
            wake: Arc::new(wake),
        }
    }

    pub fn send(&self, command: Command) -> Result<(), SendError<Command>> {
        self.tx.send(command)?;
        (self.wake)();
        Ok(())
    }

    /// Fire-and-forget send for producers that outlive the overlay.
    pub fn dispatch(&self, command: Command) {
        if self.send(command).is_err() {
            debug!(?command, "overlay already closed, dropping command");
        }
    }
}

impl fmt::Debug for CommandSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSender").finish_non_exhaustive()
    }
}
