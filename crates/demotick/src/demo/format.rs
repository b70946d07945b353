//! Input container detection

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use strum::Display;
use tracing::debug;

use super::{DemoParser, FrameLogParser, Source2DemoParser};
use crate::error::{Error, Result};

const HL2_DEMO_MAGIC: &[u8] = b"HL2DEMO\0";
const SOURCE2_DEMO_MAGIC: &[u8] = b"PBDEMS2\0";
const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];

/// Container format recognised from the leading bytes of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DemoFormat {
    #[strum(serialize = "CS:GO demo (HL2DEMO)")]
    Hl2Demo,
    #[strum(serialize = "CS2 demo (PBDEMS2)")]
    Source2,
    #[strum(serialize = "gzip frame log")]
    GzipFrameLog,
    #[strum(serialize = "frame log")]
    FrameLog,
}

impl DemoFormat {
    pub fn sniff(prefix: &[u8]) -> Self {
        if prefix.starts_with(HL2_DEMO_MAGIC) {
            Self::Hl2Demo
        } else if prefix.starts_with(SOURCE2_DEMO_MAGIC) {
            Self::Source2
        } else if prefix.starts_with(GZIP_MAGIC) {
            Self::GzipFrameLog
        } else {
            Self::FrameLog
        }
    }
}

/// Open a replay file and pick a parser for it
pub fn open_demo<P: AsRef<Path>>(path: P) -> Result<Box<dyn DemoParser>> {
    let path = path.as_ref();
    let open_err = |source| Error::OpenDemo {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(open_err)?;
    let mut reader = BufReader::new(file);
    let format = DemoFormat::sniff(reader.fill_buf().map_err(open_err)?);
    debug!("Detected {} for {}", format, path.display());

    from_reader(format, reader)
}

fn from_reader<R: BufRead + 'static>(
    format: DemoFormat,
    mut reader: R,
) -> Result<Box<dyn DemoParser>> {
    match format {
        DemoFormat::Source2 => {
            let mut replay = Vec::new();
            reader.read_to_end(&mut replay)?;
            Ok(Box::new(Source2DemoParser::new(replay)?))
        }
        DemoFormat::FrameLog => Ok(Box::new(FrameLogParser::new(reader))),
        DemoFormat::GzipFrameLog => Ok(Box::new(FrameLogParser::new(BufReader::new(
            GzDecoder::new(reader),
        )))),
        DemoFormat::Hl2Demo => Err(Error::UnsupportedContainer { format }),
    }
}

/// Read from any source, detecting the format from its first bytes
pub fn open_reader<R: Read + 'static>(reader: R) -> Result<Box<dyn DemoParser>> {
    let mut reader = BufReader::new(reader);
    let format = DemoFormat::sniff(reader.fill_buf()?);
    from_reader(format, reader)
}
