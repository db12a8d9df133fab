//! Prompt template selection.

use log::*;
use std::path::{Path, PathBuf};

use crate::error::{Error, InternalErrorKind};

/// Template that asks for a transcript only; no frames are extracted for it.
pub const ONLY_TRANSCRIPT_TEMPLATE: &str = "prompt_only_transcript.txt";
/// Template that analyses visual content without a transcript.
pub const WITHOUT_TRANSCRIPT_TEMPLATE: &str = "prompt_wo_transcript.txt";

/// Map a user supplied prompt name to a template file name.
///
/// Shortcuts are matched case-insensitively; anything else is taken as a
/// file name.
pub fn resolve_shortcut(prompt: &str) -> &str {
    match prompt.trim().to_lowercase().as_str() {
        "only transcript" => ONLY_TRANSCRIPT_TEMPLATE,
        "without transcript" => WITHOUT_TRANSCRIPT_TEMPLATE,
        _ => prompt.trim(),
    }
}

/// A prompt template chosen for a run.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    pub name: String,
    pub path: PathBuf,
}

impl PromptTemplate {
    /// Select the template for `prompt`, falling back to `default_prompt`,
    /// and check that it exists under `templates_dir`.
    pub fn select(
        prompt: Option<&str>,
        default_prompt: &str,
        templates_dir: &Path,
    ) -> Result<Self, Error> {
        info!("Selecting prompt template...");
        let name = resolve_shortcut(prompt.unwrap_or(default_prompt)).to_string();
        let candidate = Path::new(&name);
        let path = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            templates_dir.join(candidate)
        };

        if !path.is_file() {
            return Err(Error::internal(
                InternalErrorKind::Template,
                format!("Prompt template not found: {}", path.display()),
            ));
        }

        Ok(Self { name, path })
    }

    /// Whether frames should be extracted and sent for this template.
    pub fn wants_frames(&self) -> bool {
        self.path.file_name().and_then(|n| n.to_str()) != Some(ONLY_TRANSCRIPT_TEMPLATE)
    }
}
