//! Thin top-level entry point wiring validation, chunking, inference and
//! alignment together, the way a top-level `extract()` free function would
//! wire up an `Annotator` for its callers. `Pipeline` owns the
//! multi-document/multi-pass surface and the one-time pre-flight example
//! validation; `Annotator` stays a pure chunk-level concurrent executor.

use tokio_util::sync::CancellationToken;

use crate::aligner::AlignmentConfig;
use crate::annotator::Annotator;
use crate::config::PipelineConfig;
use crate::data::{AnnotatedDocument, Document, ExampleData, FormatType};
use crate::error::{AlignmentReportEntry, LangExtractError};
use crate::inference::{resolve_provider, BaseLanguageModel, ProviderSettings};
use crate::prompting::{self, PromptTemplateStructured};
use crate::validator::PromptValidator;

/// Runs one configured extraction setup: a resolved language model, a
/// rendered few-shot prompt, and the chunking/alignment/retry machinery
/// `Annotator` provides.
pub struct Pipeline {
    annotator: Annotator<Box<dyn BaseLanguageModel>>,
    alignment_report: Vec<AlignmentReportEntry>,
}

impl Pipeline {
    /// Builds a `Pipeline`, validating `config` and resolving `model_id` to
    /// a concrete provider, then running the few-shot `examples` through
    /// `PromptValidator` once up front so a malformed example is caught
    /// before any inference call is made.
    pub fn new(
        model_id: &str,
        prompt_description: &str,
        examples: Vec<ExampleData>,
        provider_settings: ProviderSettings,
        format_type: FormatType,
        fence_output: bool,
        config: PipelineConfig,
    ) -> std::result::Result<Self, LangExtractError> {
        config.validate()?;

        let language_model = resolve_provider(model_id, provider_settings)?;

        let template = PromptTemplateStructured {
            description: prompt_description.to_string(),
            examples: examples.iter().map(prompting::ExampleData::from).collect(),
        };

        let alignment_config = AlignmentConfig {
            fuzzy_alignment_threshold: config.fuzzy_threshold,
            fuzzy_slack: config.fuzzy_slack,
            accept_match_lesser: config.accept_lesser,
            lesser_threshold: config.lesser_threshold,
            ..Default::default()
        };

        let validator = PromptValidator::new(alignment_config, config.validation_level);
        let alignment_report = validator.validate(&examples)?;

        let annotator = Annotator::new(language_model, template, format_type, None, fence_output, config);

        Ok(Self { annotator, alignment_report })
    }

    /// The pre-flight validation report gathered when this `Pipeline` was
    /// built. Empty when `validation_level` is `Off` or every example
    /// aligned exactly.
    pub fn alignment_report(&self) -> &[AlignmentReportEntry] {
        &self.alignment_report
    }

    /// Extracts structured data from a single ad hoc text input.
    pub async fn extract_text(
        &self,
        text: &str,
        additional_context: Option<&str>,
        cancellation: CancellationToken,
    ) -> std::result::Result<AnnotatedDocument, LangExtractError> {
        self.annotator.annotate_text(text, additional_context, cancellation).await
    }

    /// Extracts structured data from a batch of documents, running the
    /// configured number of extraction passes and merging recall across
    /// them.
    pub async fn extract_documents(
        &self,
        documents: Vec<Document>,
        cancellation: CancellationToken,
    ) -> std::result::Result<Vec<AnnotatedDocument>, LangExtractError> {
        self.annotator.annotate_documents(documents, cancellation).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ExampleExtraction;
    use crate::inference::ProviderSettings;

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
    fn test_new_rejects_invalid_config() {
        let mut config = PipelineConfig::default();
        config.extraction_passes = 0;
        let result = Pipeline::new(
            "llama3",
            "Extract names.",
            vec![example("Alice went home.", vec![("person", "Alice")])],
            ProviderSettings::default(),
            FormatType::Json,
            true,
            config,
        );
        assert!(matches!(result, Err(LangExtractError::Config(_))));
    }

    #[test]
    fn test_new_rejects_unaligned_example_at_error_level() {
        let mut config = PipelineConfig::default();
        config.validation_level = crate::config::ValidationLevel::Error;
        let result = Pipeline::new(
            "llama3",
            "Extract names.",
            vec![example("Alice went home.", vec![("person", "nonexistent name")])],
            ProviderSettings::default(),
            FormatType::Json,
            true,
            config,
        );
        assert!(matches!(result, Err(LangExtractError::AlignmentReport(_))));
    }

    #[test]
    fn test_new_succeeds_with_aligned_examples_and_ollama_fallback() {
        let config = PipelineConfig::default();
        let pipeline = Pipeline::new(
            "llama3",
            "Extract names.",
            vec![example("Alice went home.", vec![("person", "Alice")])],
            ProviderSettings::default(),
            FormatType::Json,
            true,
            config,
        );
        assert!(pipeline.is_ok());
        assert!(pipeline.unwrap().alignment_report().is_empty());
    }
}
