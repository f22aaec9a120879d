//! Pre-flight validation of few-shot examples against the same aligner the
//! pipeline will later run over model output, so a badly-worded example
//! (one whose `extraction_text` doesn't actually occur in its own `text`)
//! is caught before spending a single inference call on it.

use crate::aligner::{AlignmentConfig, Aligner};
use crate::config::ValidationLevel;
use crate::data::{AlignmentStatus, ExampleData};
use crate::error::{AlignmentReportEntry, AlignmentReportError};

/// Runs every `ExampleData`'s extractions through the `Aligner` and applies
/// the configured `ValidationLevel` policy.
pub struct PromptValidator {
    aligner: Aligner,
    level: ValidationLevel,
}

impl PromptValidator {
    pub fn new(alignment_config: AlignmentConfig, level: ValidationLevel) -> Self {
        Self {
            aligner: Aligner::new(alignment_config),
            level,
        }
    }

    /// Validates every example, returning the full report regardless of
    /// level, and `Err` only when `level == Error` and at least one
    /// extraction came back `Unaligned`.
    pub fn validate(&self, examples: &[ExampleData]) -> std::result::Result<Vec<AlignmentReportEntry>, AlignmentReportError> {
        if matches!(self.level, ValidationLevel::Off) {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();

        for (example_idx, example) in examples.iter().enumerate() {
            let widened: Vec<_> = example.extractions.iter().enumerate().map(|(i, e)| e.to_extraction(i)).collect();
            let aligned = self.aligner.align(&widened, &example.text, 0, 0);

            for (extraction_idx, grounded) in aligned.iter().enumerate() {
                let status = grounded.alignment_status.unwrap_or(AlignmentStatus::Unaligned);
                if status != AlignmentStatus::Exact {
                    entries.push(AlignmentReportEntry {
                        example_index: example_idx,
                        extraction_index: extraction_idx,
                        status,
                        reason: reason_for(status, &grounded.extraction_text),
                    });
                }
            }
        }

        if matches!(self.level, ValidationLevel::Error) && entries.iter().any(|e| e.status == AlignmentStatus::Unaligned) {
            return Err(AlignmentReportError { entries });
        }

        for entry in &entries {
            log::warn!(
                "example {} extraction {}: {} ({})",
                entry.example_index,
                entry.extraction_index,
                entry.reason,
                entry.status
            );
        }

        Ok(entries)
    }
}

fn reason_for(status: AlignmentStatus, extraction_text: &str) -> String {
    match status {
        AlignmentStatus::Exact => format!("exact match for \"{}\"", extraction_text),
        AlignmentStatus::Fuzzy => format!("only a fuzzy match found for \"{}\"", extraction_text),
        AlignmentStatus::Lesser => format!("only a non-contiguous match found for \"{}\"", extraction_text),
        AlignmentStatus::Unaligned => format!("\"{}\" does not occur in the example text", extraction_text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ExampleExtraction;

    fn example(text: &str, extractions: Vec<(&str, &str)>) -> ExampleData {
        ExampleData::new(
            text.to_string(),
            extractions
                .into_iter()
                .map(|(class, extraction_text)| ExampleExtraction::new(class.to_string(), extraction_text.to_string(), None))
                .collect(),
        )
    }

    #[test]
    fn test_off_level_skips_validation_entirely() {
        let validator = PromptValidator::new(AlignmentConfig::default(), ValidationLevel::Off);
        let examples = vec![example("Alice went home.", vec![("person", "nonexistent name")])];
        let report = validator.validate(&examples).unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn test_warning_level_reports_but_does_not_fail() {
        let validator = PromptValidator::new(AlignmentConfig::default(), ValidationLevel::Warning);
        let examples = vec![example("Alice went home.", vec![("person", "nonexistent name")])];
        let report = validator.validate(&examples).unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].status, AlignmentStatus::Unaligned);
    }

    #[test]
    fn test_error_level_fails_on_unaligned_extraction() {
        let validator = PromptValidator::new(AlignmentConfig::default(), ValidationLevel::Error);
        let examples = vec![example("Alice went home.", vec![("person", "nonexistent name")])];
        let result = validator.validate(&examples);
        assert!(result.is_err());
    }

    #[test]
    fn test_error_level_passes_when_all_exact() {
        let validator = PromptValidator::new(AlignmentConfig::default(), ValidationLevel::Error);
        let examples = vec![example("Alice went home.", vec![("person", "Alice")])];
        let report = validator.validate(&examples).unwrap();
        assert!(report.is_empty());
    }
}
