//! Orchestrates chunking, concurrent inference, normalization, and alignment
//! for one or more documents.
//!
//! Each chunk is submitted to the language model as an independent task;
//! `buffer_unordered(max_workers)` bounds how many run at once, the way
//! `modularflow-langextract-rust`'s batch processor does. Completion order is
//! not the same as submission order, so results are carried home keyed by
//! their original index and only flattened back into document order at the
//! end — determinism comes from that bookkeeping, not from stream order.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::aligner::{AlignmentConfig, Aligner};
use crate::chunking::{ChunkIterator, TextChunk};
use crate::config::PipelineConfig;
use crate::data::{AnnotatedDocument, Document, Extraction, FormatType};
use crate::error::LangExtractError;
use crate::inference::BaseLanguageModel;
use crate::logging::{self, ProgressEvent};
use crate::pass_merger;
use crate::prompting::{self, PromptTemplateStructured, QAPromptGenerator};
use crate::resolver::FormatNormalizer;

const ATTRIBUTE_SUFFIX: &str = "_attributes";

/// Raised when `restrict_repeats` is set and the same document id is
/// submitted twice in one call.
#[derive(Debug, Clone)]
pub struct DocumentRepeatError(pub String);

impl std::fmt::Display for DocumentRepeatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DocumentRepeatError: {}", self.0)
    }
}
impl std::error::Error for DocumentRepeatError {}

/// Breaks every document into chunks, in document order, raising
/// `DocumentRepeatError` if `restrict_repeats` and a document id repeats.
pub fn document_chunk_iterator(
    documents: Vec<Document>,
    max_char_buffer: usize,
    max_tokens: Option<usize>,
    restrict_repeats: bool,
) -> std::result::Result<Vec<TextChunk>, DocumentRepeatError> {
    let mut visited_ids = HashSet::new();
    let mut chunks = Vec::new();
    for mut document in documents {
        let document_id = document.document_id();
        if restrict_repeats && visited_ids.contains(&document_id) {
            return Err(DocumentRepeatError(format!("Document id {} is already visited.", document_id)));
        }
        let tokenized_text = document.tokenized_text().clone();
        let chunk_iter = ChunkIterator::with_max_tokens(&tokenized_text, max_char_buffer, max_tokens, Some(document.clone()));
        visited_ids.insert(document_id);
        chunks.extend(chunk_iter);
    }
    Ok(chunks)
}

/// A chunk ready for inference, carrying everything needed to ground the
/// model's response back into document-global coordinates.
struct ChunkJob {
    doc_index: usize,
    prompt: String,
    chunk_text: String,
    token_offset: usize,
    char_offset: usize,
}

/// Annotates documents with extractions using a language model.
pub struct Annotator<L: BaseLanguageModel> {
    language_model: Arc<L>,
    prompt_generator: QAPromptGenerator,
    format_normalizer: FormatNormalizer,
    aligner: Arc<Aligner>,
    config: PipelineConfig,
}

impl<L: BaseLanguageModel + 'static> Annotator<L> {
    pub fn new(
        language_model: L,
        prompt_template: PromptTemplateStructured,
        format_type: FormatType,
        attribute_suffix: Option<&str>,
        fence_output: bool,
        config: PipelineConfig,
    ) -> Self {
        let mut prompt_generator = QAPromptGenerator::new(prompt_template);
        prompt_generator.format_type = prompting::FormatType::try_from(match format_type {
            FormatType::Yaml => "yaml",
            FormatType::Json => "json",
        })
        .unwrap_or(prompting::FormatType::YAML);
        let attribute_suffix = attribute_suffix.unwrap_or(ATTRIBUTE_SUFFIX).to_string();
        prompt_generator.attribute_suffix = attribute_suffix.clone();
        prompt_generator.fence_output = fence_output;

        let format_normalizer = FormatNormalizer::new(fence_output, Some("_index".to_string()), Some("_attributes".to_string()), matches!(format_type, FormatType::Yaml));

        let alignment_config = AlignmentConfig {
            fuzzy_alignment_threshold: config.fuzzy_threshold,
            fuzzy_slack: config.fuzzy_slack,
            accept_match_lesser: config.accept_lesser,
            lesser_threshold: config.lesser_threshold,
            attribute_suffix,
            ..Default::default()
        };

        Self {
            language_model: Arc::new(language_model),
            prompt_generator,
            format_normalizer,
            aligner: Arc::new(Aligner::new(alignment_config)),
            config,
        }
    }

    /// Annotates a batch of documents, running `extraction_passes` sequential
    /// passes and merging recall across them.
    pub async fn annotate_documents(&self, mut documents: Vec<Document>, cancellation: CancellationToken) -> std::result::Result<Vec<AnnotatedDocument>, LangExtractError> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        // Assign every document's id up front, on the instances that will be
        // cloned for each pass — `document_id()` lazily generates a random id
        // the first time it's called, so calling it independently on separate
        // clones would hand back different ids for the "same" document and
        // break the chunk-to-document matching below.
        let doc_ids: Vec<String> = documents.iter_mut().map(|d| d.document_id()).collect();
        let doc_texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();

        let mut per_doc_passes: Vec<Vec<Vec<Extraction>>> = vec![Vec::new(); documents.len()];

        for pass_num in 0..self.config.extraction_passes {
            logging::report_progress(ProgressEvent::PassStarted {
                pass_number: pass_num + 1,
                total_passes: self.config.extraction_passes,
            });

            let pass_extractions = self.run_single_pass(documents.clone(), cancellation.clone()).await?;
            for (doc_index, extractions) in pass_extractions.into_iter().enumerate() {
                per_doc_passes[doc_index].push(extractions);
            }
        }

        let mut results = Vec::with_capacity(documents.len());
        for (doc_index, passes) in per_doc_passes.into_iter().enumerate() {
            let merged = pass_merger::merge_non_overlapping_extractions(&passes);
            let mut annotated = AnnotatedDocument::new(Some(doc_ids[doc_index].clone()), None, Some(doc_texts[doc_index].clone()));
            annotated.extractions = Some(merged);
            annotated.sort_extractions();
            results.push(annotated);
        }

        Ok(results)
    }

    /// Runs one extraction pass over every document, returning extractions
    /// grouped by the document's position in `documents`.
    async fn run_single_pass(&self, documents: Vec<Document>, cancellation: CancellationToken) -> std::result::Result<Vec<Vec<Extraction>>, LangExtractError> {
        let chunks = document_chunk_iterator(documents.clone(), self.config.max_char_buffer, self.config.max_tokens_per_chunk, true)
            .map_err(|e| LangExtractError::InvalidInput(e.to_string()))?;

        let mut doc_id_by_index: Vec<String> = Vec::with_capacity(documents.len());
        {
            let mut docs_for_ids = documents.clone();
            for d in &mut docs_for_ids {
                doc_id_by_index.push(d.document_id());
            }
        }

        let mut jobs: Vec<ChunkJob> = Vec::with_capacity(chunks.len());
        let mut trailing_by_doc: std::collections::HashMap<String, String> = std::collections::HashMap::new();

        let mut chunks = chunks;
        for chunk in &mut chunks {
            let doc_id = chunk.document_id().unwrap_or_default();
            let doc_index = doc_id_by_index.iter().position(|id| id == &doc_id).unwrap_or(0);

            let chunk_text = chunk.chunk_text().map_err(|e| LangExtractError::InvalidInput(e.to_string()))?.to_string();
            let char_offset = chunk.char_interval().map(|ci| ci.start_pos.unwrap_or(0)).unwrap_or(0);
            let token_offset = chunk.token_interval.start_index;
            let additional_context = chunk.additional_context().map(|s| s.to_string());

            let trailing_tail = if self.config.context_window_chars > 0 {
                trailing_by_doc.get(&doc_id).map(|prev| prompting::trailing_window(prev, self.config.context_window_chars).to_string())
            } else {
                None
            };

            let prompt = self
                .prompt_generator
                .render_with_trailing_context(&chunk_text, additional_context.as_deref(), trailing_tail.as_deref());

            trailing_by_doc.insert(doc_id, chunk_text.clone());

            jobs.push(ChunkJob {
                doc_index,
                prompt,
                chunk_text,
                token_offset,
                char_offset,
            });
        }

        let total_chunks = jobs.len();
        logging::report_progress(ProgressEvent::ChunkingStarted {
            total_chars: documents.iter().map(|d| d.text.len()).sum(),
            chunk_count: total_chunks,
            strategy: "sentence-boundary".to_string(),
        });

        let language_model = Arc::clone(&self.language_model);
        let format_normalizer = self.format_normalizer.clone();
        let aligner = Arc::clone(&self.aligner);
        let max_retries = self.config.max_retries;
        let request_timeout = self.config.request_timeout;
        let max_workers = self.config.max_workers;

        // `buffer_unordered` completes tasks out of order; each result carries
        // its original submission index so the loop below can restore order
        // before grouping by document, which is what makes the returned
        // extraction list deterministic regardless of worker interleaving.
        let mut indexed_results: Vec<(usize, usize, Vec<Extraction>)> = stream::iter(jobs.into_iter().enumerate())
            .map(|(i, job)| {
                let language_model = Arc::clone(&language_model);
                let format_normalizer = format_normalizer.clone();
                let aligner = Arc::clone(&aligner);
                let cancellation = cancellation.clone();
                async move {
                    let extractions = infer_and_resolve(
                        language_model.as_ref(),
                        &format_normalizer,
                        aligner.as_ref(),
                        job.prompt,
                        job.chunk_text,
                        job.token_offset,
                        job.char_offset,
                        max_retries,
                        request_timeout,
                        &cancellation,
                    )
                    .await;
                    (i, job.doc_index, extractions)
                }
            })
            .buffer_unordered(max_workers)
            .collect::<Vec<_>>()
            .await;

        indexed_results.sort_by_key(|(i, _, _)| *i);

        let mut chunks_processed = 0;
        let mut per_doc: Vec<Vec<Extraction>> = vec![Vec::new(); documents.len()];
        for (_, doc_index, extractions) in indexed_results {
            per_doc[doc_index].extend(extractions);
            chunks_processed += 1;
            logging::report_progress(ProgressEvent::BatchProgress {
                chunks_processed,
                total_chunks,
            });
        }

        Ok(per_doc)
    }

    /// Convenience entry point for a single ad hoc text input.
    pub async fn annotate_text(&self, text: &str, additional_context: Option<&str>, cancellation: CancellationToken) -> std::result::Result<AnnotatedDocument, LangExtractError> {
        let start_time = Instant::now();
        let document = Document::new(text.to_string(), None, additional_context.map(|s| s.to_string()));
        let mut annotated = self.annotate_documents(vec![document], cancellation).await?;
        let result = annotated.remove(0);

        let num_extractions = result.extractions.as_ref().map_or(0, |v| v.len());
        logging::report_progress(ProgressEvent::ProcessingCompleted {
            total_extractions: num_extractions,
            processing_time_ms: start_time.elapsed().as_millis() as u64,
        });

        Ok(result)
    }
}

/// Calls the model with retry (exponential backoff, ±20% jitter) and a
/// per-attempt timeout, then normalizes and aligns the first successful
/// response. Exhausting retries yields an empty extraction list plus a
/// warning, rather than failing the whole pass.
#[allow(clippy::too_many_arguments)]
async fn infer_and_resolve<L: BaseLanguageModel>(
    language_model: &L,
    format_normalizer: &FormatNormalizer,
    aligner: &Aligner,
    prompt: String,
    chunk_text: String,
    token_offset: usize,
    char_offset: usize,
    max_retries: usize,
    request_timeout: Duration,
    cancellation: &CancellationToken,
) -> Vec<Extraction> {
    let mut delay = Duration::from_millis(250);

    for attempt in 0..=max_retries {
        if cancellation.is_cancelled() {
            return Vec::new();
        }

        let call = tokio::time::timeout(request_timeout, language_model.infer(std::slice::from_ref(&prompt), None)).await;

        let raw_output = match call {
            Ok(Ok(outputs)) => outputs.into_iter().next().and_then(|scored| scored.into_iter().next()).and_then(|s| s.output),
            Ok(Err(_infer_err)) => None,
            Err(_elapsed) => None,
        };

        if let Some(raw_output) = raw_output {
            match format_normalizer.resolve(&raw_output, false) {
                Ok(bare_extractions) => {
                    return aligner.align(&bare_extractions, &chunk_text, token_offset, char_offset);
                }
                Err(e) => {
                    log::debug!("format parse failed on attempt {}: {}", attempt + 1, e);
                }
            }
        }

        if attempt < max_retries {
            let jitter = 1.0 + (simple_jitter() - 0.5) * 0.4;
            let sleep_for = Duration::from_millis((delay.as_millis() as f64 * jitter).max(1.0) as u64);
            logging::report_progress(ProgressEvent::RetryAttempt {
                operation: "chunk inference".to_string(),
                attempt: attempt + 1,
                max_attempts: max_retries + 1,
                delay_ms: sleep_for.as_millis() as u64,
            });
            tokio::time::sleep(sleep_for).await;
            delay *= 2;
        }
    }

    log::warn!("chunk exhausted {} retries, yielding no extractions", max_retries);
    Vec::new()
}

fn simple_jitter() -> f64 {
    use rand::Rng;
    rand::thread_rng().gen::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_chunk_iterator_rejects_repeat_ids() {
        let doc = Document::new("Alice went home.".to_string(), Some("dup".to_string()), None);
        let result = document_chunk_iterator(vec![doc.clone(), doc], 1000, None, true);
        assert!(result.is_err());
    }

    #[test]
    fn test_document_chunk_iterator_chunks_single_document() {
        let doc = Document::new("Alice went home. Bob stayed out.".to_string(), None, None);
        let chunks = document_chunk_iterator(vec![doc], 1000, None, true).unwrap();
        assert!(!chunks.is_empty());
    }
}
