//! Simple character extraction example using the LangExtract library.
//!
//! This example demonstrates a basic extraction workflow using the
//! DeepSeek model.
//!
//! To run this example:
//! 1. Set your DEEPSEEK_API_KEY environment variable
//! 2. Run: cargo run --example simple_extraction

use langextract::{config::PipelineConfig, data::AttributeValue, data::FormatType, inference::ProviderSettings, pipeline::Pipeline};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Define the prompt description
    let prompt_description = r#"
Extract important entities from the text including:
- Characters (people mentioned)
- Emotions (feelings expressed)
- Locations (places mentioned)

Extract the exact text as it appears. Provide one attribute per extraction.
    "#
    .trim();

    // 2. Input text to process
    let input_text = "Romeo loved Juliet deeply. They met in Verona, feeling joy and sadness.";

    // 3. Get API key from environment
    let api_key = std::env::var("DEEPSEEK_API_KEY").expect("Please set DEEPSEEK_API_KEY environment variable");

    // 4. Build the pipeline: DeepSeek model, no few-shot examples, default config
    let provider_settings = ProviderSettings {
        api_key: Some(api_key),
        temperature: Some(0.1),
        max_workers: Some(1),
        ..Default::default()
    };

    let pipeline = Pipeline::new(
        "deepseek-chat",
        prompt_description,
        vec![], // Empty examples for simplicity
        provider_settings,
        FormatType::Yaml,
        true, // fenced output
        PipelineConfig::default(),
    )?;

    // 5. Run extraction
    println!("Input text: {}", input_text);
    println!("Processing with DeepSeek...\n");

    let result = pipeline
        .extract_text(input_text, Some("simple_example"), CancellationToken::new())
        .await?;

    // 6. Display results
    println!("=== Extraction Results ===");

    match &result.extractions {
        Some(extractions) if !extractions.is_empty() => {
            for (i, extraction) in extractions.iter().enumerate() {
                println!("{}. [{}] \"{}\"", i + 1, extraction.extraction_class, extraction.extraction_text);

                if let Some(attributes) = &extraction.attributes {
                    for (key, value) in attributes {
                        match value {
                            AttributeValue::Str(s) => println!("   {}: {}", key, s),
                            AttributeValue::List(v) => println!("   {}: {:?}", key, v),
                            AttributeValue::Num(v) => println!("   {}: {}", key, v),
                            AttributeValue::Bool(v) => println!("   {}: {}", key, v),
                            AttributeValue::Null => println!("   {}: null", key),
                        }
                    }
                }
                println!();
            }
        }
        _ => println!("No extractions found."),
    }

    println!("=== Done ===");
    Ok(())
}
