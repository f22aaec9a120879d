//! Pipeline configuration: every tunable the core components read, with the
//! defaults from the extraction-and-grounding spec, loadable from
//! `LANGEXTRACT_*` environment variables via the `config` crate.

use std::time::Duration;

/// How strictly `PromptValidator` treats example extractions that fail to
/// align cleanly against their own example text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationLevel {
    /// Skip validation entirely.
    Off,
    /// Log problems but proceed.
    #[default]
    Warning,
    /// Reject the pipeline run if any example extraction is `Unaligned`.
    Error,
}

impl TryFrom<&str> for ValidationLevel {
    type Error = String;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        match value.to_uppercase().as_str() {
            "OFF" => Ok(ValidationLevel::Off),
            "WARNING" => Ok(ValidationLevel::Warning),
            "ERROR" => Ok(ValidationLevel::Error),
            other => Err(format!("unknown validation level: {}", other)),
        }
    }
}

/// Every tunable consumed by the chunker, annotator, aligner and validator.
///
/// Field defaults mirror the extraction pipeline's documented defaults so a
/// bare `PipelineConfig::default()` is a reasonable starting point.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_char_buffer: usize,
    pub max_tokens_per_chunk: Option<usize>,
    pub extraction_passes: usize,
    pub max_workers: usize,
    pub fuzzy_threshold: f64,
    pub lesser_threshold: f64,
    pub accept_lesser: bool,
    pub fuzzy_slack: f64,
    pub context_window_chars: usize,
    pub validation_level: ValidationLevel,
    pub max_retries: usize,
    pub request_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_char_buffer: 1000,
            max_tokens_per_chunk: None,
            extraction_passes: 1,
            max_workers: 10,
            fuzzy_threshold: 0.75,
            lesser_threshold: 0.5,
            accept_lesser: true,
            fuzzy_slack: 0.25,
            context_window_chars: 200,
            validation_level: ValidationLevel::Warning,
            max_retries: 2,
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Error raised when a loaded or hand-built config violates an invariant
/// `Pipeline::new` must hold before wiring components together.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("extraction_passes must be >= 1, got {0}")]
    ZeroExtractionPasses(usize),

    #[error("max_workers must be >= 1, got {0}")]
    ZeroMaxWorkers(usize),

    #[error("fuzzy_threshold must be in (0, 1], got {0}")]
    InvalidFuzzyThreshold(f64),

    #[error("lesser_threshold must be in (0, 1], got {0}")]
    InvalidLesserThreshold(f64),

    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid validation_level: {0}")]
    InvalidValidationLevel(String),
}

impl PipelineConfig {
    /// Validates the invariants the annotator and aligner assume hold.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.extraction_passes < 1 {
            return Err(ConfigError::ZeroExtractionPasses(self.extraction_passes));
        }
        if self.max_workers < 1 {
            return Err(ConfigError::ZeroMaxWorkers(self.max_workers));
        }
        if !(self.fuzzy_threshold > 0.0 && self.fuzzy_threshold <= 1.0) {
            return Err(ConfigError::InvalidFuzzyThreshold(self.fuzzy_threshold));
        }
        if !(self.lesser_threshold > 0.0 && self.lesser_threshold <= 1.0) {
            return Err(ConfigError::InvalidLesserThreshold(self.lesser_threshold));
        }
        Ok(())
    }

    /// Loads overrides from `LANGEXTRACT_*` environment variables layered on
    /// top of the documented defaults, the same way callers already read
    /// `LANGEXTRACT_API_KEY` from the environment.
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        let defaults = Self::default();

        let settings = config::Config::builder()
            .set_default("max_char_buffer", defaults.max_char_buffer as i64)?
            .set_default("extraction_passes", defaults.extraction_passes as i64)?
            .set_default("max_workers", defaults.max_workers as i64)?
            .set_default("fuzzy_threshold", defaults.fuzzy_threshold)?
            .set_default("lesser_threshold", defaults.lesser_threshold)?
            .set_default("accept_lesser", defaults.accept_lesser)?
            .set_default("fuzzy_slack", defaults.fuzzy_slack)?
            .set_default("context_window_chars", defaults.context_window_chars as i64)?
            .set_default("validation_level", "WARNING")?
            .set_default("max_retries", defaults.max_retries as i64)?
            .set_default("request_timeout_secs", defaults.request_timeout.as_secs() as i64)?
            .add_source(config::Environment::with_prefix("LANGEXTRACT"))
            .build()?;

        let validation_level_str: String = settings.get("validation_level")?;
        let validation_level = ValidationLevel::try_from(validation_level_str.as_str())
            .map_err(ConfigError::InvalidValidationLevel)?;

        Ok(Self {
            max_char_buffer: settings.get::<i64>("max_char_buffer")? as usize,
            max_tokens_per_chunk: None,
            extraction_passes: settings.get::<i64>("extraction_passes")? as usize,
            max_workers: settings.get::<i64>("max_workers")? as usize,
            fuzzy_threshold: settings.get("fuzzy_threshold")?,
            lesser_threshold: settings.get("lesser_threshold")?,
            accept_lesser: settings.get("accept_lesser")?,
            fuzzy_slack: settings.get("fuzzy_slack")?,
            context_window_chars: settings.get::<i64>("context_window_chars")? as usize,
            validation_level,
            max_retries: settings.get::<i64>("max_retries")? as usize,
            request_timeout: Duration::from_secs(settings.get::<i64>("request_timeout_secs")? as u64),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_documented_defaults() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.max_char_buffer, 1000);
        assert_eq!(cfg.extraction_passes, 1);
        assert_eq!(cfg.max_workers, 10);
        assert_eq!(cfg.fuzzy_threshold, 0.75);
        assert_eq!(cfg.lesser_threshold, 0.5);
        assert!(cfg.accept_lesser);
        assert_eq!(cfg.fuzzy_slack, 0.25);
        assert_eq!(cfg.context_window_chars, 200);
        assert_eq!(cfg.validation_level, ValidationLevel::Warning);
        assert_eq!(cfg.max_retries, 2);
        assert_eq!(cfg.request_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_validate_rejects_zero_passes() {
        let mut cfg = PipelineConfig::default();
        cfg.extraction_passes = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroExtractionPasses(0))));
    }

    #[test]
    fn test_validate_rejects_out_of_range_fuzzy_threshold() {
        let mut cfg = PipelineConfig::default();
        cfg.fuzzy_threshold = 1.5;
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidFuzzyThreshold(_))));
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validation_level_parses_case_insensitively() {
        assert_eq!(ValidationLevel::try_from("error").unwrap(), ValidationLevel::Error);
        assert_eq!(ValidationLevel::try_from("Warning").unwrap(), ValidationLevel::Warning);
        assert!(ValidationLevel::try_from("bogus").is_err());
    }

    #[test]
    fn test_from_env_without_overrides_matches_default() {
        let cfg = PipelineConfig::from_env().expect("defaults alone should load");
        assert_eq!(cfg.max_char_buffer, PipelineConfig::default().max_char_buffer);
    }
}
