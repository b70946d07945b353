//! CS2 (`PBDEMS2`) replay decoding on top of `source2-demo`
//!
//! Player state is read from the entity table at the end of every tick. Each
//! `CCSPlayerController` contributes a name and team, and the pawn it points
//! at contributes origin, eye angles and crouch flags.

use std::collections::VecDeque;

use source2_demo::prelude::{
    Context, DemoRunner, Entity, FieldValue, GameEvent, Interests, Message, Observer,
    ObserverResult, Parser, ParserError, SvcMessages,
};
use source2_demo::proto::CSvcMsgServerInfo;
use tracing::debug;

use super::{
    DemoEvent, DemoEventHandler, DemoHeader, DemoParser, GameState, ParseStats, Player, Stance,
    Team, Vector3, dispatch_events,
};
use crate::error::{Error, Result};

const CONTROLLER_CLASS: &str = "CCSPlayerController";
const PAWN_CLASS: &str = "CCSPlayerPawn";
const ROUND_START_EVENT: &str = "round_start";

/// World units covered by one grid cell
const CELL_WIDTH: f64 = 512.0;
/// Cell 0 starts this far below the origin
const MAX_COORD: f64 = 16384.0;

const FL_DUCKING: u32 = 1 << 1;
const FL_ANIMDUCKING: u32 = 1 << 2;

/// Decodes a CS2 replay held in memory
///
/// [`parse_to_end`](DemoParser::parse_to_end) streams snapshots straight to
/// the handler. Pull-style [`next_event`](DemoParser::next_event) decodes the
/// whole replay on its first call and then hands out buffered events.
pub struct Source2DemoParser {
    replay: Option<Vec<u8>>,
    pending: VecDeque<Step>,
    state: GameState,
    header: Option<DemoHeader>,
}

enum Step {
    RoundStart,
    Frame(GameState),
}

impl Source2DemoParser {
    /// Check the container header; entity decoding starts with the first event
    pub fn new(replay: Vec<u8>) -> Result<Self> {
        if !file_info_offset(&replay).is_some_and(|offset| offset < replay.len()) {
            return Err(Error::Decode(ParserError::ReplayEncodingError));
        }
        let playback_ticks = Parser::new(&replay)
            .map_err(decode_error)?
            .replay_info()
            .playback_ticks();
        debug!("CS2 demo: {} bytes, {} playback ticks", replay.len(), playback_ticks);

        Ok(Self {
            replay: Some(replay),
            pending: VecDeque::new(),
            state: GameState::default(),
            header: None,
        })
    }

    /// Run the replay to its end, feeding `handler` as ticks complete
    fn decode(
        &mut self,
        replay: &[u8],
        handler: &mut dyn DemoEventHandler,
    ) -> Result<(ParseStats, GameState)> {
        let mut parser = Parser::new(replay).map_err(decode_error)?;
        let observer = parser.add_observer(TickObserver::new(handler));
        parser.run_to_end().map_err(decode_error)?;

        let mut observer = observer.borrow_mut();
        self.header = observer.header.take();
        Ok((observer.stats, std::mem::take(&mut observer.state)))
    }
}

impl DemoParser for Source2DemoParser {
    fn next_event(&mut self) -> Result<Option<DemoEvent>> {
        if let Some(replay) = self.replay.take() {
            let mut recorder = StepRecorder::default();
            self.decode(&replay, &mut recorder)?;
            self.pending = recorder.steps;
        }

        match self.pending.pop_front() {
            None => Ok(None),
            Some(Step::RoundStart) => Ok(Some(DemoEvent::RoundStart)),
            Some(Step::Frame(state)) => {
                self.state = state;
                Ok(Some(DemoEvent::FrameDone))
            }
        }
    }

    fn game_state(&self) -> &GameState {
        &self.state
    }

    fn header(&self) -> Option<&DemoHeader> {
        self.header.as_ref()
    }

    fn parse_to_end(&mut self, handler: &mut dyn DemoEventHandler) -> Result<ParseStats> {
        match self.replay.take() {
            Some(replay) => {
                let (stats, state) = self.decode(&replay, handler)?;
                self.state = state;
                Ok(stats)
            }
            None => dispatch_events(self, handler),
        }
    }
}

/// Buffers events for pull-style consumption
#[derive(Default)]
struct StepRecorder {
    steps: VecDeque<Step>,
}

impl DemoEventHandler for StepRecorder {
    fn on_round_start(&mut self) -> Result<()> {
        self.steps.push_back(Step::RoundStart);
        Ok(())
    }

    fn on_frame_done(&mut self, state: &GameState) -> Result<()> {
        self.steps.push_back(Step::Frame(state.clone()));
        Ok(())
    }
}

/// Translates parser callbacks into [`DemoEventHandler`] calls
struct TickObserver<'h> {
    handler: &'h mut dyn DemoEventHandler,
    state: GameState,
    header: Option<DemoHeader>,
    stats: ParseStats,
}

impl<'h> TickObserver<'h> {
    fn new(handler: &'h mut dyn DemoEventHandler) -> Self {
        Self {
            handler,
            state: GameState::default(),
            header: None,
            stats: ParseStats::default(),
        }
    }
}

impl Observer for TickObserver<'_> {
    fn interests(&self) -> Interests {
        Interests::ENTITY_STATE
            | Interests::TICK_END
            | Interests::BASE_GAME_EVENT
            | Interests::SVC_MESSAGE
    }

    fn on_svc_message(
        &mut self,
        _ctx: &Context,
        msg_type: SvcMessages,
        msg: &[u8],
    ) -> ObserverResult {
        if msg_type == SvcMessages::SvcServerInfo {
            let header = header_from_server_info(&CSvcMsgServerInfo::decode(msg)?);
            debug!("Server info: map {}, tick rate {}", header.map_name, header.tick_rate);
            self.header = Some(header);
        }
        Ok(())
    }

    fn on_game_event(&mut self, _ctx: &Context, event: &GameEvent) -> ObserverResult {
        if event.name() == ROUND_START_EVENT {
            self.stats.round_starts += 1;
            self.handler.on_round_start()?;
        }
        Ok(())
    }

    fn on_tick_end(&mut self, ctx: &Context) -> ObserverResult {
        // u32::MAX until the first packet arrives
        let Ok(tick) = i32::try_from(ctx.tick()) else {
            return Ok(());
        };

        self.state = GameState::new(tick, players(ctx));
        self.stats.frames += 1;
        self.handler.on_frame_done(&self.state)?;
        Ok(())
    }
}

/// Handler errors come back wrapped as observer errors; unwrap them so sink
/// failures keep their own variant
fn decode_error(err: ParserError) -> Error {
    match err {
        ParserError::ObserverError(inner) => match inner.downcast::<Error>() {
            Ok(err) => err,
            Err(inner) => Error::Decode(ParserError::ObserverError(inner)),
        },
        err => Error::Decode(err),
    }
}

fn file_info_offset(replay: &[u8]) -> Option<usize> {
    let bytes: [u8; 4] = replay.get(8..12)?.try_into().ok()?;
    usize::try_from(u32::from_le_bytes(bytes)).ok()
}

fn field<T>(entity: &Entity, name: &str) -> Option<T>
where
    for<'v> &'v FieldValue: TryInto<T>,
{
    entity.get_property(name).ok()?.try_into().ok()
}

fn players(ctx: &Context) -> Vec<Player> {
    ctx.entities()
        .iter()
        .filter(|entity| entity.class().name() == CONTROLLER_CLASS)
        .filter_map(|controller| player(ctx, controller))
        .collect()
}

/// Controllers without a resolvable pawn are left out of the snapshot
fn player(ctx: &Context, controller: &Entity) -> Option<Player> {
    let name: String = field(controller, "m_iszPlayerName")?;
    let team = team_from_number(field(controller, "m_iTeamNum").unwrap_or_default());
    let pawn = field::<u32>(controller, "m_hPlayerPawn")
        .and_then(|handle| ctx.entities().get_by_handle(handle as usize).ok())
        .filter(|pawn| pawn.class().name() == PAWN_CLASS)?;

    let [pitch, yaw, _roll] = field::<[f32; 3]>(pawn, "m_angEyeAngles").unwrap_or_default();
    Some(Player {
        name,
        team,
        position: pawn_position(pawn)?,
        view_direction_x: yaw,
        view_direction_y: pitch,
        stance: field(pawn, "m_fFlags").map(stance_from_flags),
    })
}

fn pawn_position(pawn: &Entity) -> Option<Vector3> {
    let axis = |cell: &str, offset: &str| {
        Some(coord_from_cell(field(pawn, cell)?, field(pawn, offset)?))
    };
    Some(Vector3::new(
        axis("CBodyComponent.m_cellX", "CBodyComponent.m_vecX")?,
        axis("CBodyComponent.m_cellY", "CBodyComponent.m_vecY")?,
        axis("CBodyComponent.m_cellZ", "CBodyComponent.m_vecZ")?,
    ))
}

fn coord_from_cell(cell: u32, offset: f32) -> f64 {
    f64::from(cell) * CELL_WIDTH - MAX_COORD + f64::from(offset)
}

fn team_from_number(team: i32) -> Team {
    match team {
        1 => Team::Spectator,
        2 => Team::Terrorist,
        3 => Team::CounterTerrorist,
        _ => Team::Unassigned,
    }
}

fn stance_from_flags(flags: u32) -> Stance {
    let ducked = flags & FL_DUCKING != 0;
    let duck_held = flags & FL_ANIMDUCKING != 0;
    Stance {
        ducking: ducked && duck_held,
        ducking_in_progress: !ducked && duck_held,
        unducking_in_progress: ducked && !duck_held,
        standing: !ducked && !duck_held,
    }
}

fn header_from_server_info(info: &CSvcMsgServerInfo) -> DemoHeader {
    let interval = info.tick_interval();
    DemoHeader {
        map_name: info.map_name().to_string(),
        tick_rate: if interval > 0.0 {
            (1.0 / interval).round() as u32
        } else {
            0
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::mock::Cs2ReplayBuilder;

    fn replay() -> Vec<u8> {
        Cs2ReplayBuilder::new("de_mirage", 64)
            .frame(1)
            .round_start(2)
            .frame(3)
            .round_start(4)
            .frame(5)
            .build()
    }

    #[derive(Default)]
    struct Recorder {
        seen: Vec<String>,
    }

    impl DemoEventHandler for Recorder {
        fn on_round_start(&mut self) -> Result<()> {
            self.seen.push("round".to_string());
            Ok(())
        }

        fn on_frame_done(&mut self, state: &GameState) -> Result<()> {
            self.seen.push(format!("frame {}", state.tick()));
            Ok(())
        }
    }

    struct FailOnFrame;

    impl DemoEventHandler for FailOnFrame {
        fn on_round_start(&mut self) -> Result<()> {
            Ok(())
        }

        fn on_frame_done(&mut self, _state: &GameState) -> Result<()> {
            Err(Error::Io(std::io::Error::other("disk full")))
        }
    }

    #[test]
    fn test_parse_to_end_streams_rounds_and_ticks() {
        let mut parser = Source2DemoParser::new(replay()).unwrap();
        let mut recorder = Recorder::default();

        let stats = parser.parse_to_end(&mut recorder).unwrap();

        assert_eq!(
            recorder.seen,
            vec!["frame 1", "round", "frame 2", "frame 3", "round", "frame 4", "frame 5"]
        );
        assert_eq!(
            stats,
            ParseStats {
                round_starts: 2,
                frames: 5
            }
        );
        assert_eq!(parser.game_state().tick(), 5);
        assert!(parser.game_state().participants().is_empty());
    }

    #[test]
    fn test_next_event_yields_buffered_events() {
        let mut parser = Source2DemoParser::new(replay()).unwrap();
        assert!(parser.header().is_none());

        assert_eq!(parser.next_event().unwrap(), Some(DemoEvent::FrameDone));
        assert_eq!(parser.game_state().tick(), 1);
        assert_eq!(parser.next_event().unwrap(), Some(DemoEvent::RoundStart));
        assert_eq!(parser.next_event().unwrap(), Some(DemoEvent::FrameDone));
        assert_eq!(parser.game_state().tick(), 2);

        let header = parser.header().unwrap();
        assert_eq!(header.map_name, "de_mirage");
        assert_eq!(header.tick_rate, 64);

        // The rest goes through the push driver
        let mut recorder = Recorder::default();
        let stats = parser.parse_to_end(&mut recorder).unwrap();
        assert_eq!(recorder.seen, vec!["frame 3", "round", "frame 4", "frame 5"]);
        assert_eq!(stats.frames, 3);
        assert_eq!(parser.next_event().unwrap(), None);
    }

    #[test]
    fn test_handler_error_keeps_its_variant() {
        let mut parser = Source2DemoParser::new(replay()).unwrap();
        match parser.parse_to_end(&mut FailOnFrame) {
            Err(Error::Io(e)) => assert_eq!(e.to_string(), "disk full"),
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("handler error should stop the parse"),
        }
    }

    #[test]
    fn test_bad_file_info_offset() {
        let mut bytes = b"PBDEMS2\0".to_vec();
        bytes.extend_from_slice(&0xffff_u32.to_le_bytes());
        bytes.extend_from_slice(&[0; 12]);

        assert!(matches!(
            Source2DemoParser::new(bytes),
            Err(Error::Decode(ParserError::ReplayEncodingError))
        ));
    }

    #[test]
    fn test_coord_from_cell() {
        assert_eq!(coord_from_cell(32, 0.0), 0.0);
        assert_eq!(coord_from_cell(32, 100.5), 100.5);
        assert_eq!(coord_from_cell(30, 12.25), -1011.75);
        assert_eq!(coord_from_cell(0, 0.0), -16384.0);
    }

    #[test]
    fn test_team_from_number() {
        assert_eq!(team_from_number(0), Team::Unassigned);
        assert_eq!(team_from_number(1), Team::Spectator);
        assert_eq!(team_from_number(2), Team::Terrorist);
        assert_eq!(team_from_number(3), Team::CounterTerrorist);
        assert_eq!(team_from_number(7), Team::Unassigned);
    }

    #[test]
    fn test_stance_from_flags() {
        // FL_ONGROUND only
        assert_eq!(stance_from_flags(1), Stance::default());

        let crouched = stance_from_flags(1 | FL_DUCKING | FL_ANIMDUCKING);
        assert!(crouched.ducking);
        assert!(!crouched.standing);

        let going_down = stance_from_flags(FL_ANIMDUCKING);
        assert!(going_down.ducking_in_progress);
        assert!(!going_down.ducking);

        let going_up = stance_from_flags(FL_DUCKING);
        assert!(going_up.unducking_in_progress);
        assert!(!going_up.standing);
    }

    #[test]
    fn test_header_from_server_info() {
        let info = CSvcMsgServerInfo {
            map_name: Some("de_ancient".to_string()),
            tick_interval: Some(1.0 / 64.0),
            ..Default::default()
        };
        assert_eq!(
            header_from_server_info(&info),
            DemoHeader {
                map_name: "de_ancient".to_string(),
                tick_rate: 64
            }
        );

        let header = header_from_server_info(&CSvcMsgServerInfo::default());
        assert_eq!(header.tick_rate, 0);
    }
}
