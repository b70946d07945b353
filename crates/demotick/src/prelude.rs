//! Prelude module for convenient imports
//!
//! ```ignore
//! use demotick::prelude::*;
//! ```
//!
//! This brings the following into scope:
//!
//! - Configuration: `ExportConfig`, `ColumnSet`
//! - Replay contract: `DemoParser`, `DemoEventHandler`, `GameState`, `Player`
//! - Export: `ExportSession`, `ExportSummary`, `export_demo`
//! - Error handling: `Error`, `Result`

pub use crate::config::ExportConfig;
pub use crate::demo::{DemoEvent, DemoEventHandler, DemoParser, GameState, Player, open_demo};
pub use crate::error::{Error, Result};
pub use crate::export::{ColumnSet, ExportSession, ExportSummary};
pub use crate::export_demo;
