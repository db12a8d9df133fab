//! Types for model limits and generation parameters.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Resource budgets a generation model accepts per prompt.
///
/// Loaded once from the limits document and immutable for the run. Every
/// numeric bound is strictly positive; the registry rejects documents that
/// declare otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelLimits {
    pub max_input_tokens: u64,
    pub max_output_tokens: u64,
    pub max_images_per_prompt: u64,
    pub max_image_size_mb: f64,
    pub max_audio_length_hours: f64,
    pub max_audio_files_per_prompt: u64,
    #[serde(default)]
    pub parameter_defaults: ParameterDefaults,
}

/// Default sampling parameters declared for a model.
///
/// Values are kept as declared; they go through clamping like any caller
/// supplied value before being sent upstream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterDefaults {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: i64,
    pub candidate_count: i64,
}

impl Default for ParameterDefaults {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            top_p: 0.95,
            top_k: 64,
            candidate_count: 1,
        }
    }
}

/// Caller overrides applied on top of a model's parameter defaults.
///
/// Unset fields keep the model default.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerationParameters {
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub top_k: Option<i64>,
    pub candidate_count: Option<i64>,
    pub max_output_tokens: Option<i64>,
}

/// Parameters after clamping, guaranteed to lie inside their valid ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValidatedParameters {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub candidate_count: u32,
    pub max_output_tokens: u32,
}

/// Closed interval a parameter must lie in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterRange {
    pub min: f64,
    pub max: f64,
}

impl ParameterRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }
}

impl fmt::Display for ParameterRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}-{}]", self.min, self.max)
    }
}

pub const TEMPERATURE_RANGE: ParameterRange = ParameterRange::new(0.0, 2.0);
pub const TOP_P_RANGE: ParameterRange = ParameterRange::new(0.0, 1.0);
pub const TOP_K_RANGE: ParameterRange = ParameterRange::new(1.0, u32::MAX as f64);
pub const CANDIDATE_COUNT_RANGE: ParameterRange = ParameterRange::new(1.0, 8.0);

/// Record of a parameter that was moved back inside its valid range.
#[derive(Debug, Clone, PartialEq)]
pub struct ClampWarning {
    pub parameter: &'static str,
    pub original: f64,
    pub clamped: f64,
    pub range: ParameterRange,
}

impl fmt::Display for ClampWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} is outside valid range {}, clamping to {}",
            self.parameter, self.original, self.range, self.clamped
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_clamp_to_nearest_bound() {
        assert_eq!(TEMPERATURE_RANGE.clamp(2.5), 2.0);
        assert_eq!(TEMPERATURE_RANGE.clamp(-0.1), 0.0);
        assert_eq!(TOP_P_RANGE.clamp(0.5), 0.5);
    }

    #[test]
    fn test_parameter_defaults_deserialize_as_declared() {
        let defaults: ParameterDefaults = serde_json::from_str(
            r#"{"temperature": 3.0, "top_p": 0.9, "top_k": 0, "candidate_count": 12}"#,
        )
        .unwrap();
        assert_eq!(defaults.temperature, 3.0);
        assert_eq!(defaults.top_k, 0);
        assert_eq!(defaults.candidate_count, 12);
    }

    #[test]
    fn test_clamp_warning_display() {
        let warning = ClampWarning {
            parameter: "temperature",
            original: 2.5,
            clamped: 2.0,
            range: TEMPERATURE_RANGE,
        };
        assert_eq!(
            warning.to_string(),
            "temperature 2.5 is outside valid range [0-2], clamping to 2"
        );
    }
}
