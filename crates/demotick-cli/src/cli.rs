//! Command-line arguments.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use demotick::config::DEFAULT_DEMO_PATH;
use demotick::{ColumnSet, ExportConfig};

/// Long options that may also be spelled with a single dash (`-demo x.dem`)
const LONG_OPTIONS: &[&str] = &["demo", "split-rounds", "out-dir", "stance", "help", "version"];

#[derive(Parser, Debug)]
#[command(name = "demotick", version)]
#[command(about = "Export per-tick player positions and view directions from replays to CSV")]
pub struct Args {
    /// Path to the demo file
    #[arg(long, default_value = DEFAULT_DEMO_PATH)]
    pub demo: PathBuf,

    /// If true, split output per round into separate CSV files
    #[arg(
        long,
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub split_rounds: bool,

    /// Directory to create the per-demo output folder in
    #[arg(long, env = "DEMOTICK_OUT_DIR")]
    pub out_dir: Option<PathBuf>,

    /// Append crouch state columns to every row
    #[arg(long)]
    pub stance: bool,
}

impl Args {
    pub fn to_config(&self) -> ExportConfig {
        let mut builder = ExportConfig::builder()
            .demo_path(&self.demo)
            .split_rounds(self.split_rounds)
            .columns(if self.stance {
                ColumnSet::WithStance
            } else {
                ColumnSet::Standard
            });
        if let Some(ref out_dir) = self.out_dir {
            builder = builder.output_root(out_dir);
        }
        builder.build()
    }
}

/// Rewrite `-name` / `-name=value` to `--name` / `--name=value` for known long options
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut rest_is_positional = false;
    args.into_iter()
        .enumerate()
        .map(|(i, arg)| {
            if i == 0 || rest_is_positional {
                return arg;
            }
            let Some(text) = arg.to_str() else {
                return arg;
            };
            if text == "--" {
                rest_is_positional = true;
                return arg;
            }
            match text.strip_prefix('-') {
                Some(body) if !body.starts_with('-') => {
                    let name = body.split('=').next().unwrap_or(body);
                    if LONG_OPTIONS.contains(&name) {
                        OsString::from(format!("-{}", text))
                    } else {
                        arg
                    }
                }
                _ => arg,
            }
        })
        .collect()
}
