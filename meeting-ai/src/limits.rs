//! Per-model limits registry.
//!
//! The registry is the single source of truth for what a generation model may
//! accept: it resolves model names to their [`ModelLimits`], clamps generation
//! parameters into their valid ranges and checks artifact sets against the
//! model's budgets.

use log::*;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{BudgetError, BudgetKind, ConfigurationError};
use crate::types::artifact::{ArtifactKind, ArtifactSet};
use crate::types::limits::{
    ClampWarning, GenerationParameters, ModelLimits, ParameterDefaults, ParameterRange,
    ValidatedParameters, CANDIDATE_COUNT_RANGE, TEMPERATURE_RANGE, TOP_K_RANGE, TOP_P_RANGE,
};

/// Model used by the built-in limits when no document is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";

/// Immutable map of model name to limits, loaded once per process.
#[derive(Debug, Clone, PartialEq)]
pub struct Registry {
    models: BTreeMap<String, ModelLimits>,
}

impl Registry {
    /// Parse a limits document mapping model name to limits.
    ///
    /// Fails fast on unparsable JSON, missing or non-numeric required fields
    /// and bounds that are not strictly positive.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigurationError> {
        let models: BTreeMap<String, ModelLimits> = serde_json::from_str(json)
            .map_err(|e| ConfigurationError::Malformed(e.to_string()))?;

        for (model, limits) in &models {
            check_positive(model, limits)?;
        }

        Ok(Self { models })
    }

    /// Read a limits document from disk.
    pub fn from_path(path: &Path) -> Result<Self, ConfigurationError> {
        let json = std::fs::read_to_string(path).map_err(|e| ConfigurationError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let registry = Self::from_json_str(&json)?;
        info!(
            "Loaded limits for {} model(s) from {}",
            registry.models.len(),
            path.display()
        );
        Ok(registry)
    }

    /// Load from `path` when it exists, otherwise fall back to the built-in
    /// limits. A file that exists but cannot be parsed is an error.
    pub fn load_or_builtin(path: &Path) -> Result<Self, ConfigurationError> {
        if path.exists() {
            Self::from_path(path)
        } else {
            info!(
                "Model limits file {} not found, using built-in limits",
                path.display()
            );
            Ok(Self::builtin())
        }
    }

    /// Limits for the Gemini models the processor supports out of the box.
    pub fn builtin() -> Self {
        let gemini = |max_output_tokens| ModelLimits {
            max_input_tokens: 1_048_576,
            max_output_tokens,
            max_images_per_prompt: 3000,
            max_image_size_mb: 7.0,
            max_audio_length_hours: 8.4,
            max_audio_files_per_prompt: 1,
            parameter_defaults: ParameterDefaults::default(),
        };

        let models = BTreeMap::from([
            (DEFAULT_MODEL.to_string(), gemini(65_535)),
            ("gemini-2.5-flash".to_string(), gemini(65_535)),
            ("gemini-2.0-flash".to_string(), gemini(8_192)),
        ]);

        Self { models }
    }

    /// Look up the limits of a configured model. Never guesses a fallback.
    pub fn resolve(&self, model: &str) -> Result<&ModelLimits, ConfigurationError> {
        self.models
            .get(model)
            .ok_or_else(|| ConfigurationError::UnknownModel(model.to_string()))
    }

    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    /// Merge caller overrides onto the model defaults and clamp every value
    /// into its valid range.
    ///
    /// Never fails: each out-of-range value is moved to the nearest bound and
    /// reported as a [`ClampWarning`].
    pub fn validate_parameters(
        &self,
        params: &GenerationParameters,
        limits: &ModelLimits,
    ) -> (ValidatedParameters, Vec<ClampWarning>) {
        let defaults = &limits.parameter_defaults;
        let mut warnings = Vec::new();

        let temperature = clamp_param(
            "temperature",
            params.temperature.unwrap_or(defaults.temperature),
            TEMPERATURE_RANGE,
            &mut warnings,
        );
        let top_p = clamp_param(
            "top_p",
            params.top_p.unwrap_or(defaults.top_p),
            TOP_P_RANGE,
            &mut warnings,
        );
        let top_k = clamp_param(
            "top_k",
            params.top_k.unwrap_or(defaults.top_k) as f64,
            TOP_K_RANGE,
            &mut warnings,
        );
        let candidate_count = clamp_param(
            "candidate_count",
            params.candidate_count.unwrap_or(defaults.candidate_count) as f64,
            CANDIDATE_COUNT_RANGE,
            &mut warnings,
        );
        let output_range = ParameterRange::new(1.0, limits.max_output_tokens as f64);
        let max_output_tokens = clamp_param(
            "max_output_tokens",
            params
                .max_output_tokens
                .map(|v| v as f64)
                .unwrap_or(output_range.max),
            output_range,
            &mut warnings,
        );

        let validated = ValidatedParameters {
            temperature,
            top_p,
            top_k: top_k as u32,
            candidate_count: candidate_count as u32,
            max_output_tokens: max_output_tokens.min(u32::MAX as f64) as u32,
        };

        (validated, warnings)
    }

    /// Check an artifact set against the model's budgets.
    ///
    /// Returns the first violation in a stable order: image count, image size,
    /// audio file count, audio duration.
    pub fn check_artifact_budget(
        &self,
        artifacts: &ArtifactSet,
        limits: &ModelLimits,
    ) -> Result<(), BudgetError> {
        let image_count = artifacts.count(ArtifactKind::Image) as u64;
        if image_count > limits.max_images_per_prompt {
            return Err(BudgetError {
                kind: BudgetKind::ImageCount,
                limit: limits.max_images_per_prompt as f64,
                actual: image_count as f64,
            });
        }

        if let Some(oversized) = artifacts
            .of_kind(ArtifactKind::Image)
            .find(|image| image.size_mb() > limits.max_image_size_mb)
        {
            return Err(BudgetError {
                kind: BudgetKind::ImageSize,
                limit: limits.max_image_size_mb,
                actual: oversized.size_mb(),
            });
        }

        let audio_count = artifacts.count(ArtifactKind::Audio) as u64;
        if audio_count > limits.max_audio_files_per_prompt {
            return Err(BudgetError {
                kind: BudgetKind::AudioCount,
                limit: limits.max_audio_files_per_prompt as f64,
                actual: audio_count as f64,
            });
        }

        if let Some(too_long) = artifacts
            .of_kind(ArtifactKind::Audio)
            .find(|audio| audio.duration_hours() > limits.max_audio_length_hours)
        {
            return Err(BudgetError {
                kind: BudgetKind::AudioDuration,
                limit: limits.max_audio_length_hours,
                actual: too_long.duration_hours(),
            });
        }

        Ok(())
    }
}

fn clamp_param(
    parameter: &'static str,
    value: f64,
    range: ParameterRange,
    warnings: &mut Vec<ClampWarning>,
) -> f64 {
    if range.contains(value) {
        return value;
    }

    // NaN fails `contains` and clamps to the lower bound.
    let clamped = if value.is_nan() {
        range.min
    } else {
        range.clamp(value)
    };
    warnings.push(ClampWarning {
        parameter,
        original: value,
        clamped,
        range,
    });
    clamped
}

fn check_positive(model: &str, limits: &ModelLimits) -> Result<(), ConfigurationError> {
    let bounds = [
        ("max_input_tokens", limits.max_input_tokens as f64),
        ("max_output_tokens", limits.max_output_tokens as f64),
        ("max_images_per_prompt", limits.max_images_per_prompt as f64),
        ("max_image_size_mb", limits.max_image_size_mb),
        ("max_audio_length_hours", limits.max_audio_length_hours),
        (
            "max_audio_files_per_prompt",
            limits.max_audio_files_per_prompt as f64,
        ),
    ];

    match bounds.iter().find(|(_, value)| *value <= 0.0) {
        Some((field, value)) => Err(ConfigurationError::NonPositive {
            model: model.to_string(),
            field,
            value: *value,
        }),
        None => Ok(()),
    }
}

/// Log a model's limits and parameter defaults, one entry per line.
pub fn log_model_limits(model: &str, limits: &ModelLimits) {
    info!("Using model limits for {}:", model);
    info!("  • max_input_tokens: {}", limits.max_input_tokens);
    info!("  • max_output_tokens: {}", limits.max_output_tokens);
    info!("  • max_images_per_prompt: {}", limits.max_images_per_prompt);
    info!("  • max_image_size_mb: {}", limits.max_image_size_mb);
    info!("  • max_audio_length_hours: {}", limits.max_audio_length_hours);
    info!(
        "  • max_audio_files_per_prompt: {}",
        limits.max_audio_files_per_prompt
    );
    let defaults = &limits.parameter_defaults;
    info!("  • parameter_defaults:");
    info!("    • temperature: {}", defaults.temperature);
    info!("    • top_p: {}", defaults.top_p);
    info!("    • top_k: {}", defaults.top_k);
    info!("    • candidate_count: {}", defaults.candidate_count);
}
