//! Progress reporting, separate from the `log` crate's diagnostic logging.
//!
//! `log::*` macros carry developer-facing diagnostics (warnings, traces);
//! `ProgressEvent` carries pipeline-stage events meant for an end user or a
//! calling application to render however it likes (console, log file, or a
//! UI). The two are deliberately decoupled: swapping progress handlers never
//! changes what gets written to the diagnostic log.

use std::sync::{Arc, OnceLock};

/// A single reportable moment in the pipeline's lifecycle.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    ProcessingStarted {
        text_length: usize,
        model: String,
        provider: String,
    },
    ChunkingStarted {
        total_chars: usize,
        chunk_count: usize,
        strategy: String,
    },
    PassStarted {
        pass_number: usize,
        total_passes: usize,
    },
    BatchProgress {
        chunks_processed: usize,
        total_chunks: usize,
    },
    ModelCall {
        provider: String,
        model: String,
        input_length: usize,
    },
    ModelResponse {
        success: bool,
        output_length: Option<usize>,
    },
    ValidationCompleted {
        extractions_found: usize,
        aligned_count: usize,
        unaligned_count: usize,
    },
    RetryAttempt {
        operation: String,
        attempt: usize,
        max_attempts: usize,
        delay_ms: u64,
    },
    ProcessingCompleted {
        total_extractions: usize,
        processing_time_ms: u64,
    },
    Error {
        operation: String,
        error: String,
    },
}

/// Receives and renders `ProgressEvent`s.
pub trait ProgressHandler: Send + Sync {
    fn handle_progress(&self, event: ProgressEvent);
}

/// Writes human-readable lines to stdout/stderr, tagged by pipeline stage.
pub struct ConsoleProgressHandler {
    pub show_progress: bool,
}

impl ConsoleProgressHandler {
    pub fn new() -> Self {
        Self { show_progress: true }
    }

    pub fn quiet() -> Self {
        Self { show_progress: false }
    }

    fn tag(&self, tag: &str, message: &str) -> String {
        format!("[{}] {}", tag, message)
    }
}

impl Default for ConsoleProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressHandler for ConsoleProgressHandler {
    fn handle_progress(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::ProcessingStarted { text_length, model, provider } => {
                if self.show_progress {
                    println!("{}", self.tag("inference", &format!("{}/{} -- {} chars input", provider, model, text_length)));
                }
            }
            ProgressEvent::ChunkingStarted { total_chars, chunk_count, strategy } => {
                if self.show_progress {
                    println!("{}", self.tag("chunking", &format!("{} chunks ({} strategy, {} chars total)", chunk_count, strategy, total_chars)));
                }
            }
            ProgressEvent::PassStarted { pass_number, total_passes } => {
                if self.show_progress {
                    println!("{}", self.tag("pass", &format!("starting pass {}/{}", pass_number, total_passes)));
                }
            }
            ProgressEvent::BatchProgress { chunks_processed, total_chunks } => {
                if self.show_progress {
                    println!("{}", self.tag("progress", &format!("{}/{} chunks processed", chunks_processed, total_chunks)));
                }
            }
            ProgressEvent::ModelCall { .. } | ProgressEvent::ModelResponse { .. } => {}
            ProgressEvent::ValidationCompleted { extractions_found, aligned_count, unaligned_count } => {
                if self.show_progress {
                    println!(
                        "{}",
                        self.tag(
                            "validation",
                            &format!("{} extractions ({} aligned, {} unaligned)", extractions_found, aligned_count, unaligned_count)
                        )
                    );
                }
            }
            ProgressEvent::RetryAttempt { operation, attempt, max_attempts, delay_ms } => {
                if self.show_progress {
                    println!("{}", self.tag("retry", &format!("{} failed (attempt {}/{}), retrying in {}ms", operation, attempt, max_attempts, delay_ms)));
                }
            }
            ProgressEvent::ProcessingCompleted { total_extractions, processing_time_ms } => {
                if self.show_progress {
                    println!("{}", self.tag("done", &format!("{} extractions found in {}ms", total_extractions, processing_time_ms)));
                }
            }
            ProgressEvent::Error { operation, error } => {
                eprintln!("{}", self.tag("error", &format!("{}: {}", operation, error)));
            }
        }
    }
}

/// Discards every event. Used when embedding the pipeline in a larger
/// application that wants no stdout chatter.
pub struct SilentProgressHandler;

impl ProgressHandler for SilentProgressHandler {
    fn handle_progress(&self, _event: ProgressEvent) {}
}

/// Routes events through the `log` crate instead of stdout, for
/// applications that already centralize logging.
pub struct LogProgressHandler;

impl ProgressHandler for LogProgressHandler {
    fn handle_progress(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::ProcessingStarted { text_length, model, provider } => {
                log::info!("starting extraction with {} model {} ({} chars)", provider, model, text_length);
            }
            ProgressEvent::ChunkingStarted { total_chars, chunk_count, strategy } => {
                log::info!("chunked document into {} {} chunks ({} chars)", chunk_count, strategy, total_chars);
            }
            ProgressEvent::PassStarted { pass_number, total_passes } => {
                log::debug!("starting pass {}/{}", pass_number, total_passes);
            }
            ProgressEvent::BatchProgress { chunks_processed, total_chunks } => {
                log::debug!("processed {}/{} chunks", chunks_processed, total_chunks);
            }
            ProgressEvent::ModelCall { provider, model, input_length } => {
                log::trace!("calling {} model {} with {} chars input", provider, model, input_length);
            }
            ProgressEvent::ModelResponse { success, output_length } => {
                if success {
                    log::trace!("received response: {} chars", output_length.unwrap_or(0));
                } else {
                    log::warn!("model call failed to produce a response");
                }
            }
            ProgressEvent::ValidationCompleted { extractions_found, aligned_count, unaligned_count } => {
                log::debug!("validation: {} extractions ({} aligned, {} unaligned)", extractions_found, aligned_count, unaligned_count);
            }
            ProgressEvent::RetryAttempt { operation, attempt, max_attempts, delay_ms } => {
                log::warn!("retry {}/{} for {}, waiting {}ms", attempt, max_attempts, operation, delay_ms);
            }
            ProgressEvent::ProcessingCompleted { total_extractions, processing_time_ms } => {
                log::info!("extraction completed: {} extractions in {}ms", total_extractions, processing_time_ms);
            }
            ProgressEvent::Error { operation, error } => {
                log::error!("{}: {}", operation, error);
            }
        }
    }
}

static PROGRESS_HANDLER: OnceLock<Arc<dyn ProgressHandler>> = OnceLock::new();

/// Installs the process-wide progress handler. Only the first call takes
/// effect; later calls are ignored, matching `log::set_logger`'s semantics.
pub fn init_progress_handler(handler: Arc<dyn ProgressHandler>) {
    let _ = PROGRESS_HANDLER.set(handler);
}

fn get_progress_handler() -> Arc<dyn ProgressHandler> {
    PROGRESS_HANDLER.get_or_init(|| Arc::new(ConsoleProgressHandler::new())).clone()
}

pub fn report_progress(event: ProgressEvent) {
    get_progress_handler().handle_progress(event);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_handler_tags_message() {
        let handler = ConsoleProgressHandler::new();
        let message = handler.tag("inference", "hello");
        assert_eq!(message, "[inference] hello");
    }

    #[test]
    fn test_silent_handler_does_not_panic() {
        let handler = SilentProgressHandler;
        handler.handle_progress(ProgressEvent::Error {
            operation: "test".to_string(),
            error: "boom".to_string(),
        });
    }

    #[test]
    fn test_quiet_console_handler_suppresses_progress() {
        let handler = ConsoleProgressHandler::quiet();
        assert!(!handler.show_progress);
    }
}
