//! Export command for writing tick CSV files.

use anyhow::{Context, Result};
use tracing::debug;

use crate::cli::Args;

/// Export the demo named on the command line
pub fn run(args: &Args) -> Result<()> {
    let config = args.to_config();
    debug!("Export config: {:?}", config);

    let summary = demotick::export_demo(config)
        .with_context(|| format!("Failed to export {}", args.demo.display()))?;

    for file in &summary.files {
        eprintln!("  {} ({} rows)", file.path.display(), file.rows);
    }
    if summary.ticks_without_sink > 0 {
        eprintln!(
            "Skipped {} ticks before the first round start",
            summary.ticks_without_sink
        );
    }

    println!(
        "Done! Output written to folder: {}",
        summary.output_dir.display()
    );
    Ok(())
}
