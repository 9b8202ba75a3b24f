//! Prompt construction
//!
//! The built-in default produces a single user message. An administrator
//! configuration produces a fixed system message followed by a user message
//! carrying the configured role, guidance, and focus areas. Building never fails.

use super::config_resolver::ResolvedConfiguration;
use super::inference_client::ChatMessage;
use crate::models::{AnalysisConfiguration, AnalysisRequest};

pub const SYSTEM_MESSAGE: &str = "You are a cross-border trade compliance assistant. \
Always respond with a single valid JSON object that matches the requested fields, \
with no additional commentary outside the JSON.";

pub const IMAGE_NOTE: &str = "Note: A product image was provided, but visual content cannot be \
interpreted. This analysis is based on the text description only.";

pub const RESPONSE_SCHEMA: &str = r#"Respond ONLY with a JSON object containing these fields:
{
  "hsCode": "the Harmonized System tariff classification code",
  "tariffRate": the import duty rate as a percentage number,
  "requirements": ["regulatory requirements for import"],
  "restrictions": ["import restrictions or prohibitions"],
  "documentation": ["documents required for customs clearance"],
  "estimatedProcessingTime": "expected customs processing time",
  "confidence": a number between 0 and 1 for your confidence in this assessment,
  "analysis": "a narrative explanation of the assessment"
}"#;

/// Messages for a submission under the resolved configuration
pub fn build(request: &AnalysisRequest, resolved: &ResolvedConfiguration) -> Vec<ChatMessage> {
    if resolved.is_default() {
        vec![ChatMessage::user(default_prompt(request))]
    } else {
        vec![
            ChatMessage::system(SYSTEM_MESSAGE),
            ChatMessage::user(custom_prompt(request, &resolved.configuration)),
        ]
    }
}

fn default_prompt(request: &AnalysisRequest) -> String {
    let mut prompt = String::from(
        "Analyze the following product for cross-border trade compliance. Determine its tariff \
         classification, applicable duty rate, import requirements, restrictions, and the \
         documentation needed to ship it from the origin country to the destination country.\n\n",
    );
    prompt.push_str(&product_fields(request));
    push_image_note(&mut prompt, request);
    prompt.push('\n');
    prompt.push_str(RESPONSE_SCHEMA);
    prompt
}

fn custom_prompt(request: &AnalysisRequest, config: &AnalysisConfiguration) -> String {
    let mut prompt = format!("{}\n\n", config.system_role);
    prompt.push_str(&format!(
        "Provide a {} compliance analysis of the following product.\n\n",
        config.analysis_depth.as_str()
    ));
    prompt.push_str("Product Information:\n");
    prompt.push_str(&product_fields(request));

    if let Some(instruction) = config.category_instruction(request.product_category) {
        prompt.push_str(&format!("\nCategory-specific guidance: {}\n", instruction));
    }

    if !config.focus_areas.is_empty() {
        prompt.push_str("\nFocus on the following areas:\n");
        for (i, area) in config.focus_areas.iter().enumerate() {
            prompt.push_str(&format!("{}. {}\n", i + 1, area));
        }
    }

    if !config.validation_rules.is_empty() {
        prompt.push_str("\nBefore answering, check your assessment against these rules:\n");
        for rule in &config.validation_rules {
            prompt.push_str(&format!("- {}\n", rule));
        }
    }

    if let Some(custom) = config
        .custom_instructions
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        prompt.push_str(&format!("\nAdditional instructions: {}\n", custom));
    }

    push_image_note(&mut prompt, request);
    prompt.push('\n');
    prompt.push_str(RESPONSE_SCHEMA);
    prompt
}

fn product_fields(request: &AnalysisRequest) -> String {
    format!(
        "Product Name: {}\nDescription: {}\nCategory: {}\nOrigin Country: {}\nDestination Country: {}\nProduct Image: {}\n",
        request.product_name,
        request.product_description,
        request.product_category.map(|c| c.as_str()).unwrap_or(""),
        request.origin_country,
        request.destination_country,
        if request.image.is_some() { "provided" } else { "not provided" },
    )
}

fn push_image_note(prompt: &mut String, request: &AnalysisRequest) {
    if request.image.is_some() {
        prompt.push('\n');
        prompt.push_str(IMAGE_NOTE);
        prompt.push('\n');
    }
}
