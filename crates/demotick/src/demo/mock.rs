//! Scripted parser and CS2 replay fixtures for tests

use std::collections::VecDeque;

use source2_demo::proto::{
    CDemoFileInfo, CDemoPacket, CSvcMsgGameEvent, CSvcMsgGameEventList, CSvcMsgServerInfo,
    EBaseGameEvents, EDemoCommands, Message, SvcMessages, csvc_msg_game_event_list,
};
use source2_demo::writer::{BitsWriter, BitstreamWriter, write_demo_message};

use super::{DemoEvent, DemoParser, GameState, Player, Team, Vector3};
use crate::error::{Error, Result};

enum Step {
    RoundStart,
    Frame(GameState),
    Fail(String),
}

/// Replays a fixed event script
pub struct ScriptedDemo {
    steps: VecDeque<Step>,
    state: GameState,
}

impl ScriptedDemo {
    pub fn builder() -> ScriptedDemoBuilder {
        ScriptedDemoBuilder::default()
    }

    /// A playing participant at the origin looking straight ahead
    pub fn player(name: &str, team: Team) -> Player {
        Player {
            name: name.to_string(),
            team,
            position: Vector3::default(),
            view_direction_x: 0.0,
            view_direction_y: 0.0,
            stance: None,
        }
    }
}

impl DemoParser for ScriptedDemo {
    fn next_event(&mut self) -> Result<Option<DemoEvent>> {
        match self.steps.pop_front() {
            None => Ok(None),
            Some(Step::RoundStart) => Ok(Some(DemoEvent::RoundStart)),
            Some(Step::Frame(state)) => {
                self.state = state;
                Ok(Some(DemoEvent::FrameDone))
            }
            Some(Step::Fail(message)) => Err(Error::parse(0, message)),
        }
    }

    fn game_state(&self) -> &GameState {
        &self.state
    }
}

#[derive(Default)]
pub struct ScriptedDemoBuilder {
    steps: VecDeque<Step>,
}

impl ScriptedDemoBuilder {
    pub fn round_start(mut self) -> Self {
        self.steps.push_back(Step::RoundStart);
        self
    }

    /// Frame where every named player is a terrorist at the origin
    pub fn frame(self, tick: i32, names: &[&str]) -> Self {
        let players = names
            .iter()
            .map(|name| ScriptedDemo::player(name, Team::Terrorist))
            .collect();
        self.frame_with(tick, players)
    }

    pub fn frame_with(mut self, tick: i32, players: Vec<Player>) -> Self {
        self.steps.push_back(Step::Frame(GameState::new(tick, players)));
        self
    }

    /// `ticks` consecutive frames starting at `first_tick`
    pub fn frames(mut self, first_tick: i32, ticks: i32, names: &[&str]) -> Self {
        for tick in first_tick..first_tick + ticks {
            self = self.frame(tick, names);
        }
        self
    }

    pub fn fail(mut self, message: &str) -> Self {
        self.steps.push_back(Step::Fail(message.to_string()));
        self
    }

    pub fn build(self) -> ScriptedDemo {
        ScriptedDemo {
            steps: self.steps,
            state: GameState::default(),
        }
    }
}

const ROUND_START_EVENT_ID: i32 = 40;

/// Builds a minimal `PBDEMS2` replay in memory
///
/// The first packet carries server info and the game event list; every
/// packet after that is one tick. No entities are sent, so snapshots are
/// empty.
pub struct Cs2ReplayBuilder {
    map_name: String,
    tick_rate: u32,
    packets: Vec<(u32, bool)>,
}

impl Cs2ReplayBuilder {
    pub fn new(map_name: &str, tick_rate: u32) -> Self {
        Self {
            map_name: map_name.to_string(),
            tick_rate,
            packets: Vec::new(),
        }
    }

    /// Empty packet at `tick`
    pub fn frame(mut self, tick: u32) -> Self {
        self.packets.push((tick, false));
        self
    }

    /// Packet at `tick` carrying a `round_start` game event
    pub fn round_start(mut self, tick: u32) -> Self {
        self.packets.push((tick, true));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let file_info = CDemoFileInfo {
            playback_ticks: self.packets.last().map(|(tick, _)| *tick as i32),
            ..Default::default()
        };
        let server_info = CSvcMsgServerInfo {
            map_name: Some(self.map_name),
            tick_interval: Some(1.0 / self.tick_rate as f32),
            ..Default::default()
        }
        .encode_to_vec();
        let event_list = CSvcMsgGameEventList {
            descriptors: vec![csvc_msg_game_event_list::DescriptorT {
                eventid: Some(ROUND_START_EVENT_ID),
                name: Some("round_start".to_string()),
                keys: Vec::new(),
            }],
        }
        .encode_to_vec();
        let round_start = CSvcMsgGameEvent {
            eventid: Some(ROUND_START_EVENT_ID),
            ..Default::default()
        }
        .encode_to_vec();

        // Magic, then the offset of the file info message, which comes first
        let mut replay = b"PBDEMS2\0".to_vec();
        replay.extend_from_slice(&16_u32.to_le_bytes());
        replay.extend_from_slice(&[0; 4]);
        write_demo_message(
            &mut replay,
            EDemoCommands::DemFileInfo,
            0,
            &file_info.encode_to_vec(),
        )
        .unwrap();
        write_demo_message(&mut replay, EDemoCommands::DemSyncTick, 0, &[]).unwrap();

        for (i, (tick, with_round_start)) in self.packets.iter().enumerate() {
            let mut messages: Vec<(i32, &[u8])> = Vec::new();
            if i == 0 {
                messages.push((SvcMessages::SvcServerInfo as i32, server_info.as_slice()));
                messages.push((
                    EBaseGameEvents::GeSource1LegacyGameEventList as i32,
                    event_list.as_slice(),
                ));
            }
            if *with_round_start {
                messages.push((
                    EBaseGameEvents::GeSource1LegacyGameEvent as i32,
                    round_start.as_slice(),
                ));
            }
            let packet = CDemoPacket {
                data: Some(packet_data(&messages)),
            };
            write_demo_message(
                &mut replay,
                EDemoCommands::DemPacket,
                *tick,
                &packet.encode_to_vec(),
            )
            .unwrap();
        }
        replay
    }
}

fn packet_data(messages: &[(i32, &[u8])]) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut writer = BitstreamWriter::new(&mut out);
        for (msg_type, payload) in messages {
            writer.write_ubit_var(*msg_type as u32).unwrap();
            writer.write_var_u32(payload.len() as u32).unwrap();
            writer.write_bytes(payload).unwrap();
        }
        writer.flush().unwrap();
    }
    out
}
