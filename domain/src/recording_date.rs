//! Resolution of the recording date of a video.
//!
//! Sources are tried starting at the preferred one and falling through
//! metadata → file modification time → manual entry.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use log::*;
use service::config::DateSource;
use std::fs;
use std::path::Path;

use crate::error::{Error, InternalErrorKind};
use crate::media::MediaTools;

/// Format accepted for manually entered recording dates.
pub const MANUAL_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// When a recording was made and where that information came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordingDate {
    pub at: DateTime<Local>,
    pub source: DateSource,
}

pub fn resolve(
    video: &Path,
    preferred: DateSource,
    manual: Option<&str>,
    dry_run: bool,
    tools: &dyn MediaTools,
) -> Result<RecordingDate, Error> {
    info!("Extracting date and time using source: {}", preferred);

    if preferred == DateSource::Metadata {
        if let Some(at) = from_metadata(video, tools) {
            return Ok(RecordingDate {
                at,
                source: DateSource::Metadata,
            });
        }
        warn!("Metadata extraction failed, falling back to file_mtime");
    }

    if preferred != DateSource::Manual {
        if let Some(at) = from_file_mtime(video) {
            return Ok(RecordingDate {
                at,
                source: DateSource::FileMtime,
            });
        }
        warn!("File modification time extraction failed, falling back to manual input");
    }

    from_manual(manual, dry_run).map(|at| RecordingDate {
        at,
        source: DateSource::Manual,
    })
}

fn from_metadata(video: &Path, tools: &dyn MediaTools) -> Option<DateTime<Local>> {
    info!("Extracting date and time from video metadata...");
    match tools.probe_creation_time(video) {
        Ok(Some(created)) => {
            let at = created.with_timezone(&Local);
            info!("Found creation time from metadata: {}", at);
            Some(at)
        }
        Ok(None) => {
            warn!("No creation_time found in video metadata");
            None
        }
        Err(e) => {
            warn!("Could not extract datetime from metadata: {}", e);
            None
        }
    }
}

fn from_file_mtime(video: &Path) -> Option<DateTime<Local>> {
    info!("Extracting date and time from file modification time...");
    match fs::metadata(video).and_then(|m| m.modified()) {
        Ok(modified) => {
            let at = DateTime::<Local>::from(modified);
            info!("Using file modification time: {}", at);
            Some(at)
        }
        Err(e) => {
            warn!("Could not use file modification time: {}", e);
            None
        }
    }
}

fn from_manual(manual: Option<&str>, dry_run: bool) -> Result<DateTime<Local>, Error> {
    match manual {
        Some(raw) => {
            let at = parse_manual(raw)?;
            info!("Using manually entered time: {}", at);
            Ok(at)
        }
        None if dry_run => {
            let at = Local::now();
            info!("DRY RUN: Using placeholder time: {}", at);
            Ok(at)
        }
        None => Err(Error::internal(
            InternalErrorKind::Config,
            "No recording date available; set RECORDED_AT (YYYY-MM-DD HH:MM)",
        )),
    }
}

/// Parse a manual date in [`MANUAL_DATE_FORMAT`] as local time.
pub fn parse_manual(raw: &str) -> Result<DateTime<Local>, Error> {
    let naive = NaiveDateTime::parse_from_str(raw.trim(), MANUAL_DATE_FORMAT).map_err(|e| {
        Error::internal(
            InternalErrorKind::Config,
            format!("Invalid RECORDED_AT '{}': {}", raw, e),
        )
    })?;
    Local.from_local_datetime(&naive).earliest().ok_or_else(|| {
        Error::internal(
            InternalErrorKind::Config,
            format!("RECORDED_AT '{}' does not exist in the local time zone", raw),
        )
    })
}

/// Name of the timestamped target directory, e.g. `2025-03-14_09.30`.
pub fn directory_name(at: &DateTime<Local>) -> String {
    at.format("%Y-%m-%d_%H.%M").to_string()
}
