//! Frame log reader
//!
//! A frame log is a JSON Lines dump of an already decoded replay. Each
//! non-blank line is one record, tagged by its `event` field:
//!
//! ```text
//! {"event":"header","map_name":"de_inferno","tick_rate":64}
//! {"event":"round_start"}
//! {"event":"frame_done","tick":120,"players":[...]}
//! ```

use std::io::BufRead;

use serde::Deserialize;
use tracing::debug;

use super::{DemoEvent, DemoHeader, DemoParser, GameState, Player};
use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Record {
    Header(DemoHeader),
    RoundStart,
    FrameDone {
        tick: i32,
        #[serde(default)]
        players: Vec<Player>,
    },
}

/// [`DemoParser`] over a frame log stream
pub struct FrameLogParser<R> {
    reader: R,
    buf: String,
    line: usize,
    finished: bool,
    header: Option<DemoHeader>,
    state: GameState,
}

impl<R: BufRead> FrameLogParser<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: String::new(),
            line: 0,
            finished: false,
            header: None,
            state: GameState::default(),
        }
    }

    /// 1-based number of the last line read
    pub fn line(&self) -> usize {
        self.line
    }

    fn read_record(&mut self) -> Result<Option<Record>> {
        loop {
            self.buf.clear();
            let read = self
                .reader
                .read_line(&mut self.buf)
                .map_err(|e| Error::parse(self.line + 1, e.to_string()))?;
            if read == 0 {
                return Ok(None);
            }
            self.line += 1;

            let text = self.buf.trim();
            if text.is_empty() {
                continue;
            }

            let record = serde_json::from_str(text)
                .map_err(|e| Error::parse(self.line, e.to_string()))?;
            return Ok(Some(record));
        }
    }
}

impl<R: BufRead> DemoParser for FrameLogParser<R> {
    fn next_event(&mut self) -> Result<Option<DemoEvent>> {
        if self.finished {
            return Ok(None);
        }

        loop {
            let Some(record) = self.read_record()? else {
                self.finished = true;
                return Ok(None);
            };

            match record {
                Record::Header(header) => {
                    debug!(
                        "Frame log header: map={}, tick_rate={}",
                        header.map_name, header.tick_rate
                    );
                    self.header = Some(header);
                }
                Record::RoundStart => return Ok(Some(DemoEvent::RoundStart)),
                Record::FrameDone { tick, players } => {
                    self.state = GameState::new(tick, players);
                    return Ok(Some(DemoEvent::FrameDone));
                }
            }
        }
    }

    fn game_state(&self) -> &GameState {
        &self.state
    }

    fn header(&self) -> Option<&DemoHeader> {
        self.header.as_ref()
    }
}
