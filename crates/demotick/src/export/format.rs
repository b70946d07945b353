//! CSV column layout and row formatting
//!
//! Numbers use `core::fmt` fixed precision: positions with 2 decimals, view
//! directions with 4. Formatting rounds the exact binary value of the float,
//! so `1.005_f64` (stored as 1.00499999...) becomes `1.00`.

use strum::Display;

use crate::demo::{Player, Stance, Vector3};

const STANDARD_COLUMNS: [&str; 7] = [
    "tick",
    "player_name",
    "pos_x",
    "pos_y",
    "pos_z",
    "view_dir_x",
    "view_dir_y",
];

const STANCE_COLUMNS: [&str; 4] = [
    "is_ducking",
    "is_ducking_in_progress",
    "is_unducking_in_progress",
    "is_standing",
];

/// Which columns a sink writes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ColumnSet {
    /// `tick,player_name,pos_x,pos_y,pos_z,view_dir_x,view_dir_y`
    #[default]
    Standard,
    /// Standard columns followed by the four stance flags
    WithStance,
}

impl ColumnSet {
    pub fn header(&self) -> Vec<&'static str> {
        let mut columns = STANDARD_COLUMNS.to_vec();
        if *self == Self::WithStance {
            columns.extend_from_slice(&STANCE_COLUMNS);
        }
        columns
    }

    pub fn format_row(&self, row: &TickRow) -> Vec<String> {
        let mut values = vec![
            row.tick.to_string(),
            row.player_name.to_string(),
            format_position(row.position.x),
            format_position(row.position.y),
            format_position(row.position.z),
            format_view_direction(row.view_dir_x),
            format_view_direction(row.view_dir_y),
        ];
        if *self == Self::WithStance {
            let stance = row.stance;
            values.extend(
                [
                    stance.ducking,
                    stance.ducking_in_progress,
                    stance.unducking_in_progress,
                    stance.standing,
                ]
                .map(|flag| u8::from(flag).to_string()),
            );
        }
        values
    }
}

/// One exported row: a player as seen at one tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickRow<'a> {
    pub tick: i32,
    pub player_name: &'a str,
    pub position: Vector3,
    pub view_dir_x: f32,
    pub view_dir_y: f32,
    pub stance: Stance,
}

impl<'a> TickRow<'a> {
    pub fn new(tick: i32, player: &'a Player) -> Self {
        Self {
            tick,
            player_name: &player.name,
            position: player.position,
            view_dir_x: player.view_direction_x,
            view_dir_y: player.view_direction_y,
            stance: player.stance.unwrap_or_default(),
        }
    }
}

pub fn format_position(value: f64) -> String {
    format!("{:.2}", value)
}

pub fn format_view_direction(value: f32) -> String {
    format!("{:.4}", value)
}
