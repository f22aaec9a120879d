//! Getting Started with LangExtract
//!
//! This is the simplest possible example to get you started with LangExtract.
//! It demonstrates basic text extraction using the DeepSeek model.
//!
//! To run this example:
//! 1. Set your DEEPSEEK_API_KEY environment variable:
//!    export DEEPSEEK_API_KEY="your-api-key-here"
//! 2. Run: cargo run --example getting_started

use langextract::{
    config::PipelineConfig,
    data::{AttributeValue, FormatType},
    inference::ProviderSettings,
    pipeline::Pipeline,
};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🚀 LangExtract Getting Started Example");
    println!("======================================\n");

    // Step 1: Get your API key
    let api_key = std::env::var("DEEPSEEK_API_KEY").expect("❌ Please set the DEEPSEEK_API_KEY environment variable");

    println!("✅ API key loaded");

    // Step 2: Set up the pipeline: DeepSeek model, a simple prompt, default config
    let provider_settings = ProviderSettings {
        api_key: Some(api_key),
        temperature: Some(0.1),
        max_workers: Some(1),
        ..Default::default()
    };

    let pipeline = Pipeline::new(
        "deepseek-chat",
        "Extract names of people mentioned in the text.",
        vec![], // No examples needed for this simple task
        provider_settings,
        FormatType::Yaml,
        true, // fenced output
        PipelineConfig::default(),
    )?;

    println!("✅ Pipeline created");

    // Step 3: Your input text
    let text = "Alice met Bob at the coffee shop. Charlie joined them later for lunch.";

    println!("📝 Input text: {}", text);
    println!("\n🔄 Processing...");

    // Step 4: Run the extraction
    let result = pipeline.extract_text(text, None, CancellationToken::new()).await?;

    // Step 5: Display the results
    println!("\n🎉 Extraction Results:");
    println!("======================");

    match &result.extractions {
        Some(extractions) if !extractions.is_empty() => {
            for (i, extraction) in extractions.iter().enumerate() {
                println!("{}. 👤 {}", i + 1, extraction.extraction_text);
                if let Some(attributes) = &extraction.attributes {
                    for (key, value) in attributes {
                        match value {
                            AttributeValue::Str(v) => println!("   📋 {}: {}", key, v),
                            AttributeValue::List(v) => println!("   📋 {}: {:?}", key, v),
                            AttributeValue::Num(v) => println!("   📋 {}: {}", key, v),
                            AttributeValue::Bool(v) => println!("   📋 {}: {}", key, v),
                            AttributeValue::Null => println!("   📋 {}: null", key),
                        }
                    }
                }
            }
        }
        _ => println!("😔 No extractions found. Try adjusting your prompt."),
    }

    println!("\n✨ Done! You've successfully run your first LangExtract example.");
    println!("💡 Try modifying the prompt or input text to see different results.");

    Ok(())
}
