//! Character extraction example using the LangExtract library.
//!
//! This example demonstrates how to extract characters, emotions, and relationships
//! from text using a DeepSeek language model.

use std::collections::HashMap;

use langextract::{
    config::PipelineConfig,
    data::{AttributeValue, ExampleData, ExampleExtraction, FormatType},
    inference::ProviderSettings,
    pipeline::Pipeline,
};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Define the prompt and extraction rules
    let prompt_description = r#"
Extract characters, emotions, and relationships in order of appearance.
Use exact text for extractions. Do not paraphrase or overlap entities.
Provide meaningful attributes for each entity to add context.
    "#
    .trim();

    // 2. Provide a high-quality example to guide the model
    let mut romeo_attributes = HashMap::new();
    romeo_attributes.insert("emotional_state".to_string(), AttributeValue::Str("wonder".to_string()));

    let mut emotion_attributes = HashMap::new();
    emotion_attributes.insert("feeling".to_string(), AttributeValue::Str("gentle awe".to_string()));

    let mut relationship_attributes = HashMap::new();
    relationship_attributes.insert("type".to_string(), AttributeValue::Str("metaphor".to_string()));

    let examples = vec![ExampleData::new(
        "ROMEO. But soft! What light through yonder window breaks? It is the east, and Juliet is the sun.".to_string(),
        vec![
            ExampleExtraction::new("character".to_string(), "ROMEO".to_string(), Some(romeo_attributes)),
            ExampleExtraction::new("emotion".to_string(), "But soft!".to_string(), Some(emotion_attributes)),
            ExampleExtraction::new(
                "relationship".to_string(),
                "Juliet is the sun".to_string(),
                Some(relationship_attributes),
            ),
        ],
    )];

    // The input text to be processed
    let input_text = "Lady Juliet gazed longingly at the stars, her heart aching for Romeo";

    // 3. Initialize the DeepSeek language model through the pipeline
    // Make sure to set your DEEPSEEK_API_KEY environment variable
    let api_key = std::env::var("DEEPSEEK_API_KEY").expect("DEEPSEEK_API_KEY environment variable not set");

    let provider_settings = ProviderSettings {
        api_key: Some(api_key),
        temperature: Some(0.1),
        max_workers: Some(1),
        ..Default::default()
    };

    let mut config = PipelineConfig::default();
    config.max_char_buffer = 2000;

    let pipeline = Pipeline::new(
        "deepseek-chat",
        prompt_description,
        examples,
        provider_settings,
        FormatType::Yaml,
        true, // fence_output
        config,
    )?;

    // 4. Run the extraction
    println!("Running extraction on: {}", input_text);
    println!("Using DeepSeek model...");

    let result = pipeline
        .extract_text(input_text, Some("example_doc"), CancellationToken::new())
        .await?;

    // 5. Display results
    println!("\n=== Extraction Results ===");
    if let Some(extractions) = &result.extractions {
        for (i, extraction) in extractions.iter().enumerate() {
            println!("{}. Class: {}", i + 1, extraction.extraction_class);
            println!("   Text: {}", extraction.extraction_text);
            if let Some(attributes) = &extraction.attributes {
                println!("   Attributes:");
                for (key, value) in attributes {
                    match value {
                        AttributeValue::Str(s) => println!("     {}: {}", key, s),
                        AttributeValue::List(v) => println!("     {}: {:?}", key, v),
                        AttributeValue::Num(v) => println!("     {}: {}", key, v),
                        AttributeValue::Bool(v) => println!("     {}: {}", key, v),
                        AttributeValue::Null => println!("     {}: null", key),
                    }
                }
            }
            if let Some(char_interval) = &extraction.char_interval {
                println!("   Position: {:?} - {:?}", char_interval.start_pos, char_interval.end_pos);
            }
            println!();
        }
    } else {
        println!("No extractions found.");
    }

    // 6. Save results (simplified for this example)
    println!("\n=== Summary ===");
    println!("✓ Extraction completed successfully");
    println!("✓ Found {} extractions", result.extractions.as_ref().map_or(0, |e| e.len()));

    // Note: File I/O and visualization features are in `langextract::io`.

    Ok(())
}
