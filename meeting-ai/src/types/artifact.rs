//! Types for local artifacts submitted with a generation request.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const SECONDS_PER_HOUR: f64 = 3600.0;

/// Kind of media an artifact carries.
///
/// Images count toward the per-prompt image budget, audio toward the audio
/// file and duration budgets. Video and text attachments are not budgeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Video,
    Audio,
    Image,
    Text,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Video => "video",
            ArtifactKind::Audio => "audio",
            ArtifactKind::Image => "image",
            ArtifactKind::Text => "text",
        }
    }
}

/// A locally stored file to submit to the generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Playback length, known for audio and video.
    pub duration: Option<Duration>,
}

impl Artifact {
    pub fn new(kind: ArtifactKind, path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        Self {
            kind,
            path: path.into(),
            size_bytes,
            duration: None,
        }
    }

    /// Build an artifact from a file on disk, reading its size.
    pub fn from_file(kind: ArtifactKind, path: &Path) -> std::io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        Ok(Self::new(kind, path, metadata.len()))
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / BYTES_PER_MB
    }

    /// Playback length in hours. An unknown duration reads as 0.0, so audio
    /// that could not be probed is treated as within the duration budget.
    pub fn duration_hours(&self) -> f64 {
        self.duration
            .map(|d| d.as_secs_f64() / SECONDS_PER_HOUR)
            .unwrap_or(0.0)
    }

    /// File name used when presenting the artifact upstream.
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }
}

/// Ordered artifacts for one generation request.
///
/// Order is preserved when the request is assembled: the prompt comes first,
/// then artifacts in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtifactSet {
    artifacts: Vec<Artifact>,
}

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, artifact: Artifact) {
        self.artifacts.push(artifact);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter()
    }

    pub fn of_kind(&self, kind: ArtifactKind) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter().filter(move |a| a.kind == kind)
    }

    pub fn count(&self, kind: ArtifactKind) -> usize {
        self.of_kind(kind).count()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

impl FromIterator<Artifact> for ArtifactSet {
    fn from_iter<I: IntoIterator<Item = Artifact>>(iter: I) -> Self {
        Self {
            artifacts: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ArtifactSet {
    type Item = &'a Artifact;
    type IntoIter = std::slice::Iter<'a, Artifact>;

    fn into_iter(self) -> Self::IntoIter {
        self.artifacts.iter()
    }
}
