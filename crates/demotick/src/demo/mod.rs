//! Replay decoding contract.
//!
//! The exporter never touches the replay container itself. It talks to a
//! [`DemoParser`], which advances the replay tick by tick and exposes:
//!
//! - a stream of [`DemoEvent`]s (`RoundStart`, `FrameDone`)
//! - a [`GameState`] snapshot describing the world as of the latest tick
//!
//! Parsers can be consumed pull-style through [`DemoParser::next_event`] or
//! push-style through [`DemoParser::parse_to_end`], which dispatches every
//! event to a [`DemoEventHandler`].
//!
//! CS2 replays are decoded by [`Source2DemoParser`]; pre-decoded frame logs
//! are read by [`FrameLogParser`]. [`open_demo`] picks the right one for a
//! file on disk.

mod format;
mod frame_log;
mod source2;

#[cfg(test)]
pub mod mock;

pub use format::{DemoFormat, open_demo, open_reader};
pub use frame_log::FrameLogParser;
pub use source2::Source2DemoParser;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Team a participant is assigned to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    #[default]
    Unassigned,
    Spectator,
    Terrorist,
    CounterTerrorist,
}

impl Team {
    /// Only T and CT participants are actually playing
    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Terrorist | Self::CounterTerrorist)
    }
}

/// World-space position
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl From<[f64; 3]> for Vector3 {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<Vector3> for [f64; 3] {
    fn from(v: Vector3) -> Self {
        [v.x, v.y, v.z]
    }
}

/// Crouch state of a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stance {
    #[serde(default)]
    pub ducking: bool,
    #[serde(default)]
    pub ducking_in_progress: bool,
    #[serde(default)]
    pub unducking_in_progress: bool,
    #[serde(default = "default_standing")]
    pub standing: bool,
}

fn default_standing() -> bool {
    true
}

impl Default for Stance {
    fn default() -> Self {
        Self {
            ducking: false,
            ducking_in_progress: false,
            unducking_in_progress: false,
            standing: true,
        }
    }
}

/// A participant as seen in one snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub team: Team,
    pub position: Vector3,
    /// Yaw in degrees
    pub view_direction_x: f32,
    /// Pitch in degrees
    pub view_direction_y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stance: Option<Stance>,
}

/// Snapshot of the replay world as of the latest tick advance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameState {
    tick: i32,
    participants: Vec<Player>,
}

impl GameState {
    pub fn new(tick: i32, participants: Vec<Player>) -> Self {
        Self { tick, participants }
    }

    /// In-game tick of this snapshot
    pub fn tick(&self) -> i32 {
        self.tick
    }

    /// Every connected participant, spectators included
    pub fn participants(&self) -> &[Player] {
        &self.participants
    }

    /// Participants currently on T or CT, in snapshot order
    pub fn playing(&self) -> impl Iterator<Item = &Player> {
        self.participants.iter().filter(|p| p.team.is_playing())
    }
}

/// Informational metadata some replays carry ahead of the first frame
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoHeader {
    #[serde(default)]
    pub map_name: String,
    #[serde(default)]
    pub tick_rate: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoEvent {
    RoundStart,
    /// The snapshot returned by [`DemoParser::game_state`] now reflects a new frame
    FrameDone,
}

/// Receiver for events dispatched by [`DemoParser::parse_to_end`]
pub trait DemoEventHandler {
    fn on_round_start(&mut self) -> Result<()>;

    fn on_frame_done(&mut self, state: &GameState) -> Result<()>;
}

/// Event counts observed by a full parse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub round_starts: u64,
    pub frames: u64,
}

/// Source of replay events
///
/// A parser yields a lazy, finite, non-restartable sequence of events.
/// Once [`next_event`](Self::next_event) returns `Ok(None)` the replay is
/// exhausted.
pub trait DemoParser {
    /// Advance to the next event, `Ok(None)` at end of stream
    fn next_event(&mut self) -> Result<Option<DemoEvent>>;

    /// Snapshot as of the latest `FrameDone`
    fn game_state(&self) -> &GameState;

    /// Header metadata, if the replay carried any so far
    fn header(&self) -> Option<&DemoHeader> {
        None
    }

    /// Drive the replay to its end, dispatching every event in order
    ///
    /// Stops at the first error from either the parser or the handler.
    fn parse_to_end(&mut self, handler: &mut dyn DemoEventHandler) -> Result<ParseStats> {
        dispatch_events(self, handler)
    }
}

/// Pull every remaining event from `parser` and hand it to `handler`
pub(crate) fn dispatch_events<P: DemoParser + ?Sized>(
    parser: &mut P,
    handler: &mut dyn DemoEventHandler,
) -> Result<ParseStats> {
    let mut stats = ParseStats::default();
    while let Some(event) = parser.next_event()? {
        match event {
            DemoEvent::RoundStart => {
                stats.round_starts += 1;
                handler.on_round_start()?;
            }
            DemoEvent::FrameDone => {
                stats.frames += 1;
                handler.on_frame_done(parser.game_state())?;
            }
        }
    }
    Ok(stats)
}
