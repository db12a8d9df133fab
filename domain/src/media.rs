//! External media tools: HandBrakeCLI for transcoding, ffmpeg for audio and
//! frame extraction, ffprobe for metadata.

use chrono::{DateTime, FixedOffset};
use log::*;
use serde::Deserialize;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

/// Failure of an external tool invocation.
#[derive(Debug)]
pub enum ToolError {
    /// The executable could not be started.
    Spawn { tool: String, reason: String },
    /// The tool ran and exited unsuccessfully.
    Failed {
        tool: String,
        status: Option<i32>,
        stderr: String,
    },
    /// The tool reported success but its output is missing or empty.
    MissingOutput { tool: String, path: PathBuf },
    /// A required input such as a preset file does not exist.
    MissingInput { tool: String, path: PathBuf },
    /// The tool's output could not be interpreted.
    Parse { tool: String, reason: String },
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolError::Spawn { tool, reason } => write!(f, "Could not start {}: {}", tool, reason),
            ToolError::Failed {
                tool,
                status,
                stderr,
            } => match status {
                Some(code) => write!(f, "{} failed with exit code {}: {}", tool, code, stderr.trim()),
                None => write!(f, "{} was terminated: {}", tool, stderr.trim()),
            },
            ToolError::MissingOutput { tool, path } => write!(
                f,
                "{} reported success but produced no output at {}",
                tool,
                path.display()
            ),
            ToolError::MissingInput { tool, path } => {
                write!(f, "{} input not found: {}", tool, path.display())
            }
            ToolError::Parse { tool, reason } => {
                write!(f, "Could not parse {} output: {}", tool, reason)
            }
        }
    }
}

impl std::error::Error for ToolError {}

/// Media operations a processing run needs.
///
/// Calls are synchronous and return the path they produced.
pub trait MediaTools: Send + Sync {
    /// Convert and compress `input` into `output`.
    fn transcode(&self, input: &Path, output: &Path) -> Result<PathBuf, ToolError>;

    /// Copy the audio track of `video` into `output` without re-encoding.
    fn extract_audio(&self, video: &Path, output: &Path) -> Result<PathBuf, ToolError>;

    /// Write one JPEG every `interval_secs` seconds into `frames_dir`.
    fn extract_frames(
        &self,
        video: &Path,
        frames_dir: &Path,
        interval_secs: u32,
    ) -> Result<PathBuf, ToolError>;

    /// Playback length of a media file.
    fn probe_duration(&self, media: &Path) -> Result<Duration, ToolError>;

    /// `creation_time` tag from the container metadata, if present.
    fn probe_creation_time(&self, media: &Path) -> Result<Option<DateTime<FixedOffset>>, ToolError>;
}

/// Paths and presets of the installed media tools.
#[derive(Debug, Clone)]
pub struct ToolPaths {
    pub ffmpeg: String,
    pub ffprobe: String,
    pub handbrake: String,
    pub handbrake_preset_file: PathBuf,
    pub handbrake_preset_name: String,
}

impl ToolPaths {
    pub fn from_config(config: &service::config::Config) -> Self {
        Self {
            ffmpeg: config.ffmpeg_path().to_string(),
            ffprobe: config.ffprobe_path(),
            handbrake: config.handbrake_path().to_string(),
            handbrake_preset_file: config.handbrake_preset_file(),
            handbrake_preset_name: config.handbrake_preset_name().to_string(),
        }
    }
}

/// [`MediaTools`] backed by the real executables.
///
/// In dry-run mode every mutating command is logged instead of executed;
/// probes still run because they only read the input.
pub struct ExternalTools {
    paths: ToolPaths,
    dry_run: bool,
}

impl ExternalTools {
    pub fn new(paths: ToolPaths, dry_run: bool) -> Self {
        Self { paths, dry_run }
    }

    fn transcode_command(&self, input: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(&self.paths.handbrake);
        cmd.arg("--preset-import-file")
            .arg(&self.paths.handbrake_preset_file)
            .arg("-Z")
            .arg(&self.paths.handbrake_preset_name)
            .arg("-i")
            .arg(input)
            .arg("-o")
            .arg(output);
        cmd
    }

    fn audio_command(&self, video: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(&self.paths.ffmpeg);
        cmd.arg("-i")
            .arg(video)
            .args(["-vn", "-c:a", "copy"])
            .arg(output);
        cmd
    }

    fn frames_command(&self, video: &Path, frames_dir: &Path, interval_secs: u32) -> Command {
        let mut cmd = Command::new(&self.paths.ffmpeg);
        cmd.arg("-i")
            .arg(video)
            .arg("-vf")
            .arg(format!("fps=1/{}", interval_secs))
            .args(["-q:v", "2"])
            .arg(frames_dir.join("frame_%04d.jpg"));
        cmd
    }

    /// Run `cmd` unless in dry-run mode. Returns `false` when skipped.
    fn execute(&self, tool: &str, mut cmd: Command) -> Result<bool, ToolError> {
        if self.dry_run {
            info!("DRY RUN: Would run: {}", command_line(&cmd));
            return Ok(false);
        }
        debug!("Running: {}", command_line(&cmd));
        run(tool, &mut cmd)?;
        Ok(true)
    }
}

impl MediaTools for ExternalTools {
    fn transcode(&self, input: &Path, output: &Path) -> Result<PathBuf, ToolError> {
        info!("Converting video with HandBrakeCLI using JSON preset...");
        let preset = &self.paths.handbrake_preset_file;
        if !preset.exists() {
            return Err(ToolError::MissingInput {
                tool: "HandBrakeCLI".to_string(),
                path: preset.clone(),
            });
        }

        if self.execute("HandBrakeCLI", self.transcode_command(input, output))? {
            ensure_non_empty("HandBrakeCLI", output)?;
            info!("Video conversion completed");
        }
        Ok(output.to_path_buf())
    }

    fn extract_audio(&self, video: &Path, output: &Path) -> Result<PathBuf, ToolError> {
        info!("Extracting audio...");
        if self.execute("ffmpeg", self.audio_command(video, output))? {
            ensure_non_empty("ffmpeg", output)?;
            info!("Audio extraction completed");
        }
        Ok(output.to_path_buf())
    }

    fn extract_frames(
        &self,
        video: &Path,
        frames_dir: &Path,
        interval_secs: u32,
    ) -> Result<PathBuf, ToolError> {
        info!("Extracting frames...");
        if !self.dry_run {
            fs::create_dir_all(frames_dir).map_err(|e| ToolError::Spawn {
                tool: "ffmpeg".to_string(),
                reason: format!("cannot create {}: {}", frames_dir.display(), e),
            })?;
        }
        if self.execute("ffmpeg", self.frames_command(video, frames_dir, interval_secs))? {
            info!("Frame extraction completed");
        }
        Ok(frames_dir.to_path_buf())
    }

    fn probe_duration(&self, media: &Path) -> Result<Duration, ToolError> {
        let mut cmd = Command::new(&self.paths.ffprobe);
        cmd.args([
            "-v",
            "quiet",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(media);
        let stdout = run("ffprobe", &mut cmd)?;
        parse_duration(&stdout)
    }

    fn probe_creation_time(&self, media: &Path) -> Result<Option<DateTime<FixedOffset>>, ToolError> {
        let mut cmd = Command::new(&self.paths.ffprobe);
        cmd.args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(media);
        let stdout = run("ffprobe", &mut cmd)?;
        parse_creation_time(&stdout)
    }
}

fn run(tool: &str, cmd: &mut Command) -> Result<String, ToolError> {
    let output = cmd.output().map_err(|e| ToolError::Spawn {
        tool: tool.to_string(),
        reason: e.to_string(),
    })?;

    if !output.status.success() {
        return Err(ToolError::Failed {
            tool: tool.to_string(),
            status: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn ensure_non_empty(tool: &str, path: &Path) -> Result<(), ToolError> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.len() > 0 => Ok(()),
        _ => Err(ToolError::MissingOutput {
            tool: tool.to_string(),
            path: path.to_path_buf(),
        }),
    }
}

fn command_line(cmd: &Command) -> String {
    let mut parts: Vec<OsString> = vec![cmd.get_program().to_os_string()];
    parts.extend(cmd.get_args().map(|arg| arg.to_os_string()));
    parts
        .iter()
        .map(|part| part.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_duration(stdout: &str) -> Result<Duration, ToolError> {
    let seconds: f64 = stdout.trim().parse().map_err(|_| ToolError::Parse {
        tool: "ffprobe".to_string(),
        reason: format!("'{}' is not a duration in seconds", stdout.trim()),
    })?;
    Duration::try_from_secs_f64(seconds).map_err(|e| ToolError::Parse {
        tool: "ffprobe".to_string(),
        reason: e.to_string(),
    })
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: ProbeFormat,
}

#[derive(Deserialize, Default)]
struct ProbeFormat {
    #[serde(default)]
    tags: ProbeTags,
}

#[derive(Deserialize, Default)]
struct ProbeTags {
    creation_time: Option<String>,
}

fn parse_creation_time(stdout: &str) -> Result<Option<DateTime<FixedOffset>>, ToolError> {
    let probe: ProbeOutput = serde_json::from_str(stdout).map_err(|e| ToolError::Parse {
        tool: "ffprobe".to_string(),
        reason: e.to_string(),
    })?;

    match probe.format.tags.creation_time {
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(Some)
            .map_err(|e| ToolError::Parse {
                tool: "ffprobe".to_string(),
                reason: format!("creation_time '{}': {}", raw, e),
            }),
        None => Ok(None),
    }
}
