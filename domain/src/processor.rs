//! One processing run: from a meeting recording to `meeting.md`.
//!
//! The run resolves the recording date, prepares the target directory,
//! transcodes the video, extracts audio and frames, stages the prompt and
//! notes, and hands the artifacts to the resilient generator. Everything the
//! run creates is recorded in a [`CleanupSet`] so a failed run leaves nothing
//! behind except the original video.

use log::*;
use meeting_ai::limits::log_model_limits;
use meeting_ai::traits::generation::Provider;
use meeting_ai::types::artifact::{Artifact, ArtifactKind, ArtifactSet};
use meeting_ai::{CleanupSet, GenerationJob, Generator};
use service::config::{Config, DateSource};
use service::logging::RunLog;
use std::fs;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, InternalErrorKind};
use crate::media::MediaTools;
use crate::prompt::PromptTemplate;
use crate::recording_date::{self, RecordingDate};

/// Files a run creates inside its target directory.
#[derive(Debug, Clone, PartialEq)]
pub struct RunPaths {
    pub target_dir: PathBuf,
    pub small_video: PathBuf,
    pub audio: PathBuf,
    pub frames_dir: PathBuf,
    pub meeting_md: PathBuf,
    pub prompt: PathBuf,
    pub note: PathBuf,
    pub process_log: PathBuf,
}

impl RunPaths {
    pub fn new(target_dir: PathBuf) -> Self {
        Self {
            small_video: target_dir.join("small.mp4"),
            audio: target_dir.join("audio.m4a"),
            frames_dir: target_dir.join("frames"),
            meeting_md: target_dir.join("meeting.md"),
            prompt: target_dir.join("prompt.txt"),
            note: target_dir.join("note.txt"),
            process_log: target_dir.join("process.log"),
            target_dir,
        }
    }
}

/// Per-run settings taken from [`Config`].
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub video: PathBuf,
    pub prompt: Option<String>,
    pub notes: Option<String>,
    pub target_directory: Option<PathBuf>,
    /// Parent of timestamp-named target directories.
    pub base_dir: PathBuf,
    pub default_prompt: String,
    pub templates_dir: PathBuf,
    pub frame_interval: u32,
    pub date_source: DateSource,
    pub recorded_at: Option<String>,
    pub model: String,
    pub dry_run: bool,
    pub no_cleanup: bool,
}

impl RunOptions {
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Ok(Self {
            video: config.video().to_path_buf(),
            prompt: config.prompt().map(str::to_string),
            notes: config.notes().map(str::to_string),
            target_directory: config.target_directory().map(Path::to_path_buf),
            base_dir: std::env::current_dir()?,
            default_prompt: config.default_prompt().to_string(),
            templates_dir: config.templates_dir().to_path_buf(),
            frame_interval: config.frame_interval,
            date_source: config.preferred_date_source(),
            recorded_at: config.recorded_at().map(str::to_string),
            model: config.gemini_model().to_string(),
            dry_run: config.dry_run,
            no_cleanup: config.no_cleanup,
        })
    }
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub paths: RunPaths,
    pub recording_date: RecordingDate,
    /// Set when a document was generated and saved.
    pub document: Option<PathBuf>,
}

pub struct Processor<P: Provider, T: MediaTools> {
    options: RunOptions,
    tools: T,
    generator: Generator<P>,
    run_log: Option<RunLog>,
    cancel: CancellationToken,
}

impl<P: Provider, T: MediaTools> Processor<P, T> {
    pub fn new(options: RunOptions, tools: T, generator: Generator<P>) -> Self {
        Self {
            options,
            tools,
            generator,
            run_log: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Send the run's log output to `process.log` once the target directory exists.
    pub fn with_run_log(mut self, run_log: RunLog) -> Self {
        self.run_log = Some(run_log);
        self
    }

    /// Stop between steps once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn run(&self) -> Result<RunOutcome, Error> {
        info!("Starting processing of video: {}", self.options.video.display());
        let mut cleanup = CleanupSet::new();

        match self.process(&mut cleanup).await {
            Ok(outcome) => {
                info!("Processing completed successfully!");
                Ok(outcome)
            }
            Err(err) => {
                error!("Error during processing: {}", err);
                if let Some(run_log) = &self.run_log {
                    if let Err(e) = run_log.close() {
                        warn!("Failed to close process log: {}", e);
                    }
                }
                cleanup.run();
                Err(err)
            }
        }
    }

    async fn process(&self, cleanup: &mut CleanupSet) -> Result<RunOutcome, Error> {
        let options = &self.options;
        if !options.video.is_file() {
            return Err(Error::internal(
                InternalErrorKind::Io,
                format!("Video file not found: {}", options.video.display()),
            ));
        }

        let template = PromptTemplate::select(
            options.prompt.as_deref(),
            &options.default_prompt,
            &options.templates_dir,
        )?;

        let recording_date = recording_date::resolve(
            &options.video,
            options.date_source,
            options.recorded_at.as_deref(),
            options.dry_run,
            &self.tools,
        )?;

        let paths = self.prepare_target_directory(&recording_date, cleanup)?;
        self.check_cancelled()?;

        self.track(&paths.small_video, cleanup);
        self.tools.transcode(&options.video, &paths.small_video)?;
        self.check_cancelled()?;

        self.track(&paths.audio, cleanup);
        self.tools.extract_audio(&paths.small_video, &paths.audio)?;
        self.check_cancelled()?;

        if template.wants_frames() {
            self.track(&paths.frames_dir, cleanup);
            self.tools
                .extract_frames(&paths.small_video, &paths.frames_dir, options.frame_interval)?;
            self.check_cancelled()?;
        }

        info!("Creating meeting.md...");
        self.write_file(&paths.meeting_md, "", cleanup)?;

        info!("Copying prompt template: {}", template.name);
        if options.dry_run {
            info!("DRY RUN: Would copy prompt template: {}", template.name);
        } else {
            cleanup.record(&paths.prompt);
            fs::copy(&template.path, &paths.prompt)?;
        }

        info!("Creating note.txt...");
        self.write_file(&paths.note, options.notes.as_deref().unwrap_or_default(), cleanup)?;

        let document = if options.dry_run {
            if let Ok(limits) = self.generator.registry().resolve(&options.model) {
                log_model_limits(&options.model, limits);
            }
            info!("DRY RUN: Would upload files to Gemini and save results");
            None
        } else {
            Some(self.generate_document(&paths).await?)
        };

        if !options.no_cleanup {
            self.remove_frames(&paths);
        }

        Ok(RunOutcome {
            paths,
            recording_date,
            document,
        })
    }

    fn prepare_target_directory(
        &self,
        recording_date: &RecordingDate,
        cleanup: &mut CleanupSet,
    ) -> Result<RunPaths, Error> {
        let (target_dir, explicit) = match &self.options.target_directory {
            Some(dir) => (dir.clone(), true),
            None => (
                self.options
                    .base_dir
                    .join(recording_date::directory_name(&recording_date.at)),
                false,
            ),
        };
        let paths = RunPaths::new(target_dir);

        if self.options.dry_run {
            info!("DRY RUN: Would use target directory: {}", paths.target_dir.display());
            return Ok(paths);
        }

        if paths.target_dir.exists() {
            info!("Using existing target directory: {}", paths.target_dir.display());
        } else {
            cleanup.record(&paths.target_dir);
            fs::create_dir_all(&paths.target_dir)?;
            if explicit {
                info!("Using specified target directory: {}", paths.target_dir.display());
            } else {
                info!("Created target directory: {}", paths.target_dir.display());
            }
        }

        if let Some(run_log) = &self.run_log {
            if !paths.process_log.exists() {
                cleanup.record(&paths.process_log);
            }
            run_log.attach(&paths.process_log)?;
        }

        Ok(paths)
    }

    async fn generate_document(&self, paths: &RunPaths) -> Result<PathBuf, Error> {
        info!("Uploading to Google Gemini...");
        let model = &self.options.model;
        let prompt = fs::read_to_string(&paths.prompt)?;

        let limits = self.generator.registry().resolve(model)?;
        log_model_limits(model, limits);

        let provider = self.generator.provider();
        match provider.count_tokens(model, &prompt).await {
            Ok(tokens) => {
                info!("Prompt tokens: {}", tokens);
                if tokens > limits.max_input_tokens {
                    warn!(
                        "Prompt tokens ({}) exceed limit ({})",
                        tokens, limits.max_input_tokens
                    );
                }
            }
            Err(err) => warn!("Could not count prompt tokens: {}", err),
        }

        let job = GenerationJob {
            model: model.clone(),
            prompt,
            artifacts: self.collect_artifacts(paths)?,
            ..Default::default()
        };

        // Run files stay put until `run` has closed the process log.
        let result = self.generator.generate(&job, &mut CleanupSet::new()).await;
        match provider.release().await {
            Ok(_) => {}
            Err(err) => warn!("Failed to clean up uploaded files: {}", err),
        }
        let document = result?;

        fs::write(&paths.meeting_md, &document.text)?;
        info!(
            "Gemini analysis completed after {} attempt(s) and saved to meeting.md",
            document.attempts
        );
        Ok(paths.meeting_md.clone())
    }

    /// Audio first, then frames in name order, then the notes if non-empty.
    fn collect_artifacts(&self, paths: &RunPaths) -> Result<ArtifactSet, Error> {
        let mut artifacts = ArtifactSet::new();

        if paths.audio.exists() {
            let mut audio = Artifact::from_file(ArtifactKind::Audio, &paths.audio)?;
            match self.tools.probe_duration(&paths.audio) {
                Ok(duration) => audio = audio.with_duration(duration),
                Err(err) => warn!("Could not check audio duration: {}", err),
            }
            artifacts.push(audio);
        }

        if paths.frames_dir.is_dir() {
            let mut frames: Vec<PathBuf> = fs::read_dir(&paths.frames_dir)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| {
                    path.extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg"))
                })
                .collect();
            frames.sort();
            for frame in frames {
                artifacts.push(Artifact::from_file(ArtifactKind::Image, &frame)?);
            }
        }

        if fs::metadata(&paths.note).map(|m| m.len() > 0).unwrap_or(false) {
            artifacts.push(Artifact::from_file(ArtifactKind::Text, &paths.note)?);
        }

        debug!("Collected {} artifact(s) for generation", artifacts.len());
        Ok(artifacts)
    }

    fn track(&self, path: &Path, cleanup: &mut CleanupSet) {
        if !self.options.dry_run {
            cleanup.record(path);
        }
    }

    fn write_file(&self, path: &Path, contents: &str, cleanup: &mut CleanupSet) -> Result<(), Error> {
        if self.options.dry_run {
            info!("DRY RUN: Would create {}", path.display());
            return Ok(());
        }
        cleanup.record(path);
        fs::write(path, contents)?;
        Ok(())
    }

    fn remove_frames(&self, paths: &RunPaths) {
        info!("Cleaning up temporary files...");
        if self.options.dry_run {
            info!("DRY RUN: Would clean up temporary files");
            return;
        }
        if paths.frames_dir.exists() {
            match fs::remove_dir_all(&paths.frames_dir) {
                Ok(()) => info!("Removed frames directory"),
                Err(err) => warn!("Failed to remove frames directory: {}", err),
            }
        }
    }

    fn check_cancelled(&self) -> Result<(), Error> {
        if self.cancel.is_cancelled() {
            return Err(Error::internal(
                InternalErrorKind::Cancelled,
                "Processing cancelled",
            ));
        }
        Ok(())
    }
}
