use clap::Parser;
use dotenvy::dotenv;
use log::{warn, LevelFilter};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Default Gemini API base URL used when `GEMINI_BASE_URL` is not set.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model used when `GEMINI_MODEL` is not set.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-pro";

/// Where the recording timestamp of a video should preferably come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateSource {
    Metadata,
    FileMtime,
    Manual,
}

#[derive(Debug, PartialEq, Eq)]
pub struct DateSourceParseError;

impl FromStr for DateSource {
    type Err = DateSourceParseError;
    fn from_str(source: &str) -> Result<DateSource, Self::Err> {
        match source.trim().to_lowercase().as_str() {
            "metadata" => Ok(DateSource::Metadata),
            "file_mtime" => Ok(DateSource::FileMtime),
            "manual" => Ok(DateSource::Manual),
            _ => Err(DateSourceParseError),
        }
    }
}

impl fmt::Display for DateSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DateSource::Metadata => write!(f, "metadata"),
            DateSource::FileMtime => write!(f, "file_mtime"),
            DateSource::Manual => write!(f, "manual"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about = "Turn a meeting recording into meeting documentation", long_about = None)]
pub struct Config {
    /// Path to the meeting recording to process
    #[arg(long, env)]
    video: PathBuf,

    /// Prompt template file, or one of the shortcuts "only transcript" / "without transcript"
    #[arg(long, env)]
    prompt: Option<String>,

    /// Notes about the meeting, written to note.txt next to the results
    #[arg(long, env)]
    notes: Option<String>,

    /// Use this directory for the results instead of a timestamp-named one
    #[arg(short = 'd', long = "directory", env = "TARGET_DIRECTORY")]
    target_directory: Option<PathBuf>,

    /// Log every action instead of performing it
    #[arg(long, env)]
    pub dry_run: bool,

    /// Keep extracted frames after a successful run
    #[arg(long, env)]
    pub no_cleanup: bool,

    /// Raise the log level to DEBUG
    #[arg(long, env)]
    pub debug: bool,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::value_parser!(LevelFilter),
        )]
    pub log_level_filter: LevelFilter,

    /// Path to the ffmpeg executable
    #[arg(long, env, default_value = "ffmpeg")]
    ffmpeg_path: String,

    /// Path to the ffprobe executable; derived from the ffmpeg path when unset
    #[arg(long, env)]
    ffprobe_path: Option<String>,

    /// Path to the HandBrakeCLI executable
    #[arg(long, env, default_value = "HandBrakeCLI")]
    handbrake_path: String,

    /// HandBrake preset file, resolved against the templates directory
    #[arg(long, env, default_value = "Meeting.json")]
    handbrake_preset_file: PathBuf,

    /// Name of the preset inside the preset file
    #[arg(long, env, default_value = "Meeting")]
    handbrake_preset_name: String,

    /// Seconds between two extracted frames
    #[arg(long, env, default_value_t = 60, value_parser = clap::value_parser!(u32).range(1..))]
    pub frame_interval: u32,

    /// Prompt template used when no --prompt is given
    #[arg(long, env, default_value = "prompt.txt")]
    default_prompt: String,

    /// Directory holding prompt templates and the HandBrake preset
    #[arg(long, env, default_value = ".")]
    templates_dir: PathBuf,

    /// Gemini model to generate the documentation with
    #[arg(long, env, default_value = DEFAULT_GEMINI_MODEL)]
    gemini_model: String,

    /// The API key to use when calling the Gemini API.
    #[arg(long, env, hide_env_values = true)]
    gemini_api_key: Option<String>,

    /// The base URL of the Gemini API.
    /// Override in tests to point at a mock server.
    #[arg(long, env, default_value = DEFAULT_GEMINI_BASE_URL)]
    gemini_base_url: String,

    /// Preferred source of the recording date: metadata, file_mtime or manual
    #[arg(long, env, default_value = "metadata")]
    preferred_date_source: String,

    /// Recording date to use for the manual date source, formatted "YYYY-MM-DD HH:MM"
    #[arg(long, env)]
    recorded_at: Option<String>,

    /// JSON file with per-model limits; built-in limits are used when it does not exist
    #[arg(long, env, default_value = "model_limits.json")]
    model_limits_file: PathBuf,

    /// Timeout in seconds for a single HTTP request to the Gemini API
    #[arg(long, env, default_value_t = 600)]
    pub request_timeout_secs: u64,

    /// Seconds to wait before the first retry of an unavailable model; doubles per retry
    #[arg(long, env, default_value_t = 60)]
    pub retry_base_delay_secs: u64,

    /// Retries after the initial generation attempt
    #[arg(long, env, default_value_t = 5)]
    pub max_retries: u32,
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn video(&self) -> &Path {
        &self.video
    }

    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn target_directory(&self) -> Option<&Path> {
        self.target_directory.as_deref()
    }

    /// The log level actually applied: `--debug` raises anything quieter to DEBUG.
    pub fn effective_log_level(&self) -> LevelFilter {
        if self.debug && self.log_level_filter < LevelFilter::Debug {
            LevelFilter::Debug
        } else {
            self.log_level_filter
        }
    }

    pub fn ffmpeg_path(&self) -> &str {
        &self.ffmpeg_path
    }

    /// Returns the ffprobe executable, falling back to the ffmpeg path with
    /// "ffmpeg" replaced by "ffprobe" in its file name.
    pub fn ffprobe_path(&self) -> String {
        if let Some(path) = &self.ffprobe_path {
            return path.clone();
        }
        let ffmpeg = Path::new(&self.ffmpeg_path);
        match ffmpeg.file_name().and_then(|name| name.to_str()) {
            Some(name) => ffmpeg
                .with_file_name(name.replace("ffmpeg", "ffprobe"))
                .to_string_lossy()
                .into_owned(),
            None => "ffprobe".to_string(),
        }
    }

    pub fn handbrake_path(&self) -> &str {
        &self.handbrake_path
    }

    /// Returns the HandBrake preset file resolved against the templates directory.
    pub fn handbrake_preset_file(&self) -> PathBuf {
        self.templates_dir.join(&self.handbrake_preset_file)
    }

    pub fn handbrake_preset_name(&self) -> &str {
        &self.handbrake_preset_name
    }

    pub fn default_prompt(&self) -> &str {
        &self.default_prompt
    }

    pub fn templates_dir(&self) -> &Path {
        &self.templates_dir
    }

    pub fn gemini_model(&self) -> &str {
        &self.gemini_model
    }

    /// Returns the Gemini API key, if configured.
    pub fn gemini_api_key(&self) -> Option<String> {
        self.gemini_api_key.clone()
    }

    /// Returns the Gemini API base URL.
    pub fn gemini_base_url(&self) -> &str {
        &self.gemini_base_url
    }

    /// Returns the preferred date source. Unknown values are reported and
    /// replaced by `metadata`.
    pub fn preferred_date_source(&self) -> DateSource {
        match self.preferred_date_source.parse::<DateSource>() {
            Ok(source) => source,
            Err(_) => {
                warn!(
                    "Invalid PREFERRED_DATE_SOURCE '{}', using 'metadata'",
                    self.preferred_date_source
                );
                DateSource::Metadata
            }
        }
    }

    pub fn recorded_at(&self) -> Option<&str> {
        self.recorded_at.as_deref()
    }

    pub fn model_limits_file(&self) -> &Path {
        &self.model_limits_file
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_secs(self.retry_base_delay_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["meeting_docs_rs"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_directory_short_flag() {
        let config = parse(&["--video", "call.mp4", "-d", "out/standup"]);
        assert_eq!(config.video(), Path::new("call.mp4"));
        assert_eq!(config.target_directory(), Some(Path::new("out/standup")));
    }

    #[test]
    fn test_flags() {
        let config = parse(&["--video", "call.mp4", "--dry-run", "--no-cleanup"]);
        assert!(config.dry_run);
        assert!(config.no_cleanup);
    }

    #[test]
    fn test_debug_raises_log_level() {
        let config = parse(&["--video", "call.mp4", "--debug", "-l", "WARN"]);
        assert_eq!(config.effective_log_level(), LevelFilter::Debug);

        let config = parse(&["--video", "call.mp4", "--debug", "-l", "TRACE"]);
        assert_eq!(config.effective_log_level(), LevelFilter::Trace);

        let config = parse(&["--video", "call.mp4", "-l", "WARN"]);
        assert_eq!(config.effective_log_level(), LevelFilter::Warn);
    }

    #[test]
    fn test_ffprobe_path_is_derived_from_ffmpeg() {
        let config = parse(&["--video", "call.mp4", "--ffmpeg-path", "/opt/ffmpeg/bin/ffmpeg"]);
        assert_eq!(config.ffprobe_path(), "/opt/ffmpeg/bin/ffprobe");

        let config = parse(&["--video", "call.mp4"]);
        assert_eq!(config.ffprobe_path(), "ffprobe");

        let config = parse(&["--video", "call.mp4", "--ffmpeg-path", "tools/ffmpeg-7.exe"]);
        assert_eq!(config.ffprobe_path(), "tools/ffprobe-7.exe");

        let config = parse(&[
            "--video",
            "call.mp4",
            "--ffmpeg-path",
            "/opt/ffmpeg/bin/ffmpeg",
            "--ffprobe-path",
            "/usr/bin/ffprobe",
        ]);
        assert_eq!(config.ffprobe_path(), "/usr/bin/ffprobe");
    }

    #[test]
    fn test_preset_file_resolves_against_templates_dir() {
        let config = parse(&[
            "--video",
            "call.mp4",
            "--templates-dir",
            "/etc/meeting",
            "--handbrake-preset-file",
            "Meeting.json",
        ]);
        assert_eq!(
            config.handbrake_preset_file(),
            PathBuf::from("/etc/meeting/Meeting.json")
        );
    }

    #[test]
    fn test_preferred_date_source() {
        let config = parse(&["--video", "call.mp4", "--preferred-date-source", "file_mtime"]);
        assert_eq!(config.preferred_date_source(), DateSource::FileMtime);

        let config = parse(&["--video", "call.mp4", "--preferred-date-source", "MANUAL"]);
        assert_eq!(config.preferred_date_source(), DateSource::Manual);
    }

    #[test]
    fn test_invalid_preferred_date_source_falls_back_to_metadata() {
        let config = parse(&["--video", "call.mp4", "--preferred-date-source", "exif"]);
        assert_eq!(config.preferred_date_source(), DateSource::Metadata);
    }

    #[test]
    fn test_zero_frame_interval_is_rejected() {
        assert!(
            Config::try_parse_from(["meeting_docs_rs", "--video", "a.mp4", "--frame-interval", "0"])
                .is_err()
        );
    }

    #[test]
    fn test_retry_settings() {
        let config = parse(&[
            "--video",
            "call.mp4",
            "--retry-base-delay-secs",
            "2",
            "--max-retries",
            "3",
            "--request-timeout-secs",
            "30",
        ]);
        assert_eq!(config.retry_base_delay(), Duration::from_secs(2));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }
}
